// crates/cw_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `CwError` 枚举和 `CwResult` 类型别名，用于整个项目的错误处理。
//!
//! # 设计原则
//!
//! 1. **层次化**: 基础层只定义核心错误分类，不引用任何物理概念的具体类型
//! 2. **易用性**: 提供便捷的构造方法
//! 3. **快速失败**: 配置/几何错误在初始化阶段立即返回，运行绝不带病启动
//!
//! # 示例
//!
//! ```
//! use cw_foundation::error::{CwError, CwResult};
//!
//! fn read_config() -> CwResult<()> {
//!     Err(CwError::config("时间步长必须为正"))
//! }
//! ```

use thiserror::Error;

/// 统一结果类型
pub type CwResult<T> = Result<T, CwError>;

/// CorWave 错误类型
///
/// 核心错误类型，用于整个项目。按关注点分组：
/// 配置、几何、运行时三类。
#[derive(Error, Debug)]
pub enum CwError {
    // ========================================================================
    // 配置相关错误
    // ========================================================================
    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 描述性错误信息
        message: String,
    },

    /// 无效参数
    #[error("无效参数 {name}: {value} ({reason})")]
    InvalidParameter {
        /// 参数名
        name: &'static str,
        /// 实际值
        value: f64,
        /// 违反的约束
        reason: String,
    },

    // ========================================================================
    // 几何/字段相关错误
    // ========================================================================
    /// 几何错误（边界缺失、节点类型非法等）
    #[error("几何错误: {message}")]
    Geometry {
        /// 描述性错误信息
        message: String,
    },

    /// 字段尺寸不匹配
    #[error("字段 {field} 尺寸不匹配: 期望 {expected}, 实际 {actual}")]
    ShapeMismatch {
        /// 字段名
        field: &'static str,
        /// 期望的节点数
        expected: usize,
        /// 实际的节点数
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {name}={index}, 上限 {limit}")]
    IndexOutOfRange {
        /// 索引名
        name: &'static str,
        /// 实际索引
        index: usize,
        /// 合法上限（不含）
        limit: usize,
    },

    // ========================================================================
    // 运行时错误
    // ========================================================================
    /// 状态机非法迁移
    #[error("非法状态迁移: 期望 {expected}, 当前 {actual}")]
    InvalidState {
        /// 期望的状态
        expected: &'static str,
        /// 实际的状态
        actual: String,
    },

    /// 数值不稳定（检测到非有限场值）
    #[error("数值不稳定: 第 {step} 步 (t={time}) 检测到非有限场值")]
    NumericalInstability {
        /// 发生的步号
        step: usize,
        /// 发生的模拟时刻
        time: f64,
    },
}

impl CwError {
    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 创建几何错误
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry {
            message: message.into(),
        }
    }

    /// 创建无效参数错误
    pub fn invalid_parameter(
        name: &'static str,
        value: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        }
    }

    /// 是否为配置类错误（含几何与参数错误）
    ///
    /// 配置类错误意味着运行从未开始，调用方应修正输入后重建。
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::InvalidParameter { .. }
                | Self::Geometry { .. }
                | Self::ShapeMismatch { .. }
                | Self::IndexOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CwError::ShapeMismatch {
            field: "conductivity",
            expected: 100,
            actual: 99,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("conductivity"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_is_configuration() {
        assert!(CwError::config("x").is_configuration());
        assert!(CwError::geometry("x").is_configuration());
        assert!(!CwError::NumericalInstability { step: 3, time: 0.03 }.is_configuration());
    }
}
