// crates/cw_foundation/src/validation.rs

//! 运行时验证工具
//!
//! 提供验证报告和错误/警告类型，用于组织几何与字段数据的校验结果。
//! 错误阻止运行启动，警告只记录日志。
//!
//! # 示例
//!
//! ```
//! use cw_foundation::validation::{ValidationReport, ValidationError};
//!
//! let mut report = ValidationReport::new();
//! report.add_error(ValidationError::OutOfRange {
//!     field: "conductivity",
//!     index: 7,
//!     value: 1.5,
//!     min: 0.0,
//!     max: 1.0,
//! });
//! assert!(report.has_errors());
//! ```

use std::fmt;

/// 验证报告
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// 错误列表
    pub errors: Vec<ValidationError>,
    /// 警告列表
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// 创建空的验证报告
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加错误
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 是否有警告
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 是否通过（无错误）
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// 合并另一个报告
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "验证报告: {} 个错误, {} 个警告",
            self.errors.len(),
            self.warnings.len()
        )?;
        for (i, err) in self.errors.iter().enumerate() {
            writeln!(f, "  错误 {}: {}", i + 1, err)?;
        }
        for (i, warn) in self.warnings.iter().enumerate() {
            writeln!(f, "  警告 {}: {}", i + 1, warn)?;
        }
        Ok(())
    }
}

/// 验证错误类型
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// 最外层缺少空节点边界
    MissingBoundaryPadding {
        /// 缺失边界的维度（0=x, 1=y, 2=z）
        axis: usize,
    },
    /// 字段尺寸与网格不一致
    ShapeMismatch {
        /// 字段名
        field: &'static str,
        /// 期望的节点数
        expected: usize,
        /// 实际的节点数
        actual: usize,
    },
    /// 数值超出允许范围
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 节点下标
        index: usize,
        /// 实际值
        value: f64,
        /// 下界
        min: f64,
        /// 上界
        max: f64,
    },
    /// 非有限值
    NonFinite {
        /// 字段名
        field: &'static str,
        /// 节点下标
        index: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBoundaryPadding { axis } => {
                write!(f, "维度 {} 的最外层存在非空节点，模板无法定义", axis)
            }
            Self::ShapeMismatch {
                field,
                expected,
                actual,
            } => write!(f, "字段 {} 尺寸不匹配: 期望 {}, 实际 {}", field, expected, actual),
            Self::OutOfRange {
                field,
                index,
                value,
                min,
                max,
            } => write!(
                f,
                "字段 {} 节点 {} 的值 {} 超出范围 [{}, {}]",
                field, index, value, min, max
            ),
            Self::NonFinite { field, index } => {
                write!(f, "字段 {} 节点 {} 为非有限值", field, index)
            }
        }
    }
}

/// 验证警告类型
#[derive(Debug, Clone)]
pub enum ValidationWarning {
    /// 心肌节点上的纤维方向为零向量（退化为各向同性）
    DegenerateFiber {
        /// 节点下标
        index: usize,
    },
    /// 存在与周围完全隔离的心肌节点
    IsolatedNodes {
        /// 隔离节点数量
        count: usize,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateFiber { index } => {
                write!(f, "节点 {} 的纤维方向为零向量，按各向同性处理", index)
            }
            Self::IsolatedNodes { count } => {
                write!(f, "{} 个心肌节点与周围完全隔离，扩散下保持惰性", count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_merge() {
        let mut a = ValidationReport::new();
        a.add_error(ValidationError::MissingBoundaryPadding { axis: 0 });

        let mut b = ValidationReport::new();
        b.add_warning(ValidationWarning::IsolatedNodes { count: 2 });

        a.merge(b);
        assert!(a.has_errors());
        assert!(a.has_warnings());
        assert!(!a.is_valid());
    }

    #[test]
    fn test_report_display() {
        let mut report = ValidationReport::new();
        report.add_error(ValidationError::NonFinite {
            field: "fibers",
            index: 3,
        });
        let text = format!("{}", report);
        assert!(text.contains("fibers"));
        assert!(text.contains("1 个错误"));
    }
}
