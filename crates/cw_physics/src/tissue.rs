// crates/cw_physics/src/tissue.rs

//! 心肌组织几何
//!
//! 提供节点类型网格、电导率场与纤维方向场的强类型容器。
//! 组织本身是纯数据，除校验外不承载行为；扩散模板在
//! [`crate::stencil`] 中由组织派生。
//!
//! # 布局设计
//!
//! 所有字段采用行主序扁平数组：
//! ```text
//! 2D: idx = i * nj + j
//! 3D: idx = (i * nj + j) * nk + k
//! ```
//!
//! # 边界不变量
//!
//! 每个维度最外层必须全部为空节点，模板才能在不做越界
//! 检查的情况下访问邻居。[`CardiacTissue::validate`] 强制
//! 该约束，求解器初始化时快速失败。

use cw_foundation::validation::{ValidationError, ValidationReport, ValidationWarning};
use glam::{DVec2, DVec3};

/// 节点类型
///
/// 空节点与纤维化节点在通量意义下完全等价（零流出通量的
/// 扩散汇）；区分二者仅为下游分析/可视化保留语义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NodeKind {
    /// 空节点（组织外）
    #[default]
    Empty = 0,
    /// 心肌节点（参与扩散与反应）
    Myocyte = 1,
    /// 纤维化节点（组织内的不导电损伤）
    Fibrosis = 2,
}

impl NodeKind {
    /// 是否参与扩散与反应
    #[inline]
    pub fn is_conductive(self) -> bool {
        matches!(self, Self::Myocyte)
    }
}

/// 网格形状（2D 或 3D）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridShape {
    /// 二维网格 ni × nj
    Dim2 {
        /// x 方向节点数
        ni: usize,
        /// y 方向节点数
        nj: usize,
    },
    /// 三维网格 ni × nj × nk
    Dim3 {
        /// x 方向节点数
        ni: usize,
        /// y 方向节点数
        nj: usize,
        /// z 方向节点数
        nk: usize,
    },
}

impl GridShape {
    /// 总节点数
    #[inline]
    pub fn n_nodes(&self) -> usize {
        match *self {
            Self::Dim2 { ni, nj } => ni * nj,
            Self::Dim3 { ni, nj, nk } => ni * nj * nk,
        }
    }

    /// 空间维数
    #[inline]
    pub fn ndim(&self) -> usize {
        match self {
            Self::Dim2 { .. } => 2,
            Self::Dim3 { .. } => 3,
        }
    }

    /// 各维度长度，2D 时第三维为 1
    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        match *self {
            Self::Dim2 { ni, nj } => (ni, nj, 1),
            Self::Dim3 { ni, nj, nk } => (ni, nj, nk),
        }
    }

    /// 二维扁平下标
    #[inline]
    pub fn index2(&self, i: usize, j: usize) -> usize {
        let (_, nj, _) = self.dims();
        i * nj + j
    }

    /// 三维扁平下标（2D 网格要求 k = 0）
    #[inline]
    pub fn index3(&self, i: usize, j: usize, k: usize) -> usize {
        let (_, nj, nk) = self.dims();
        (i * nj + j) * nk + k
    }

    /// 扁平下标还原为 (i, j, k)
    #[inline]
    pub fn coords_of(&self, idx: usize) -> (usize, usize, usize) {
        let (_, nj, nk) = self.dims();
        let k = idx % nk;
        let rest = idx / nk;
        (rest / nj, rest % nj, k)
    }
}

/// 纤维方向场
///
/// 每个节点一个方向向量；非心肌节点上的方向无意义，被忽略。
/// 构建模板时非零向量会被归一化，零向量退化为各向同性。
#[derive(Debug, Clone)]
pub enum FiberField {
    /// 二维方向场
    TwoDim(Vec<DVec2>),
    /// 三维方向场
    ThreeDim(Vec<DVec3>),
}

impl FiberField {
    /// 均匀二维方向场
    pub fn uniform_2d(n_nodes: usize, direction: DVec2) -> Self {
        Self::TwoDim(vec![direction; n_nodes])
    }

    /// 均匀三维方向场
    pub fn uniform_3d(n_nodes: usize, direction: DVec3) -> Self {
        Self::ThreeDim(vec![direction; n_nodes])
    }

    /// 场长度（节点数）
    pub fn len(&self) -> usize {
        match self {
            Self::TwoDim(v) => v.len(),
            Self::ThreeDim(v) => v.len(),
        }
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 方向维数
    pub fn ndim(&self) -> usize {
        match self {
            Self::TwoDim(_) => 2,
            Self::ThreeDim(_) => 3,
        }
    }
}

/// 心肌组织
///
/// 节点类型网格 + 电导率场 + 可选纤维方向场。
/// 字段公开以便外部网格构建协作方直接填充，
/// [`Self::validate`] 在求解器初始化时统一把关。
#[derive(Debug, Clone)]
pub struct CardiacTissue {
    /// 网格形状
    pub shape: GridShape,
    /// 节点类型场
    pub kinds: Vec<NodeKind>,
    /// 电导率场，取值 [0, 1]，乘在局部扩散系数上
    pub conductivity: Vec<f64>,
    /// 纤维方向场；`None` 表示各向同性组织
    pub fibers: Option<FiberField>,
    /// 沿纤维方向的扩散系数倍率
    pub d_al: f64,
    /// 垂直纤维方向的扩散系数倍率
    pub d_ac: f64,
}

impl CardiacTissue {
    /// 创建全心肌二维组织（最外层自动置空）
    pub fn uniform_2d(ni: usize, nj: usize) -> Self {
        let shape = GridShape::Dim2 { ni, nj };
        let mut tissue = Self {
            shape,
            kinds: vec![NodeKind::Myocyte; shape.n_nodes()],
            conductivity: vec![1.0; shape.n_nodes()],
            fibers: None,
            d_al: 1.0,
            d_ac: 1.0,
        };
        tissue.add_boundaries();
        tissue
    }

    /// 创建全心肌三维组织（最外层自动置空）
    pub fn uniform_3d(ni: usize, nj: usize, nk: usize) -> Self {
        let shape = GridShape::Dim3 { ni, nj, nk };
        let mut tissue = Self {
            shape,
            kinds: vec![NodeKind::Myocyte; shape.n_nodes()],
            conductivity: vec![1.0; shape.n_nodes()],
            fibers: None,
            d_al: 1.0,
            d_ac: 1.0,
        };
        tissue.add_boundaries();
        tissue
    }

    /// 总节点数
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.shape.n_nodes()
    }

    /// 将每个维度的最外层节点置为空
    ///
    /// 自定义网格填充完 `kinds` 后必须调用一次，
    /// 否则 [`Self::validate`] 会拒绝该组织。
    pub fn add_boundaries(&mut self) {
        let (ni, nj, nk) = self.shape.dims();
        let is_3d = self.shape.ndim() == 3;

        for i in 0..ni {
            for j in 0..nj {
                for k in 0..nk {
                    let on_boundary = i == 0
                        || i == ni - 1
                        || j == 0
                        || j == nj - 1
                        || (is_3d && (k == 0 || k == nk - 1));
                    if on_boundary {
                        self.kinds[self.shape.index3(i, j, k)] = NodeKind::Empty;
                    }
                }
            }
        }
    }

    /// 按布尔掩膜把心肌节点改为纤维化节点
    ///
    /// 掩膜为真且节点当前是心肌时生效；掩膜尺寸不符时整体忽略。
    pub fn apply_fibrosis_mask(&mut self, mask: &[bool]) {
        if mask.len() != self.n_nodes() {
            log::warn!(
                "纤维化掩膜尺寸不匹配 (期望 {}, 实际 {})，忽略",
                self.n_nodes(),
                mask.len()
            );
            return;
        }
        for (kind, &m) in self.kinds.iter_mut().zip(mask) {
            if m && *kind == NodeKind::Myocyte {
                *kind = NodeKind::Fibrosis;
            }
        }
    }

    /// 心肌节点布尔掩膜
    pub fn myocyte_mask(&self) -> Vec<bool> {
        self.kinds.iter().map(|k| k.is_conductive()).collect()
    }

    /// 心肌节点的扁平下标列表
    pub fn myocyte_indexes(&self) -> Vec<usize> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| k.is_conductive())
            .map(|(i, _)| i)
            .collect()
    }

    /// 节点是否为心肌
    #[inline]
    pub fn is_myocyte(&self, idx: usize) -> bool {
        self.kinds[idx].is_conductive()
    }

    /// 校验组织数据
    ///
    /// 检查项：
    /// - 字段尺寸与网格一致
    /// - 每个维度最外层全为空节点
    /// - 心肌节点电导率在 [0, 1] 且有限
    /// - 纤维向量有限；心肌节点上的零向量记为警告
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let n = self.n_nodes();

        if self.kinds.len() != n {
            report.add_error(ValidationError::ShapeMismatch {
                field: "kinds",
                expected: n,
                actual: self.kinds.len(),
            });
            // 后续检查都依赖尺寸一致，直接返回
            return report;
        }
        if self.conductivity.len() != n {
            report.add_error(ValidationError::ShapeMismatch {
                field: "conductivity",
                expected: n,
                actual: self.conductivity.len(),
            });
            return report;
        }
        if let Some(fibers) = &self.fibers {
            if fibers.len() != n {
                report.add_error(ValidationError::ShapeMismatch {
                    field: "fibers",
                    expected: n,
                    actual: fibers.len(),
                });
                return report;
            }
            if fibers.ndim() != self.shape.ndim() {
                report.add_error(ValidationError::ShapeMismatch {
                    field: "fibers(ndim)",
                    expected: self.shape.ndim(),
                    actual: fibers.ndim(),
                });
                return report;
            }
        }

        self.check_boundary_padding(&mut report);
        self.check_node_fields(&mut report);
        report
    }

    fn check_boundary_padding(&self, report: &mut ValidationReport) {
        let (ni, nj, nk) = self.shape.dims();
        let is_3d = self.shape.ndim() == 3;
        let mut bad_axis = [false; 3];

        for i in 0..ni {
            for j in 0..nj {
                for k in 0..nk {
                    if self.kinds[self.shape.index3(i, j, k)] == NodeKind::Empty {
                        continue;
                    }
                    if i == 0 || i == ni - 1 {
                        bad_axis[0] = true;
                    }
                    if j == 0 || j == nj - 1 {
                        bad_axis[1] = true;
                    }
                    if is_3d && (k == 0 || k == nk - 1) {
                        bad_axis[2] = true;
                    }
                }
            }
        }

        for (axis, &bad) in bad_axis.iter().enumerate() {
            if bad {
                report.add_error(ValidationError::MissingBoundaryPadding { axis });
            }
        }
    }

    fn check_node_fields(&self, report: &mut ValidationReport) {
        for (idx, kind) in self.kinds.iter().enumerate() {
            if !kind.is_conductive() {
                continue;
            }
            let c = self.conductivity[idx];
            if !c.is_finite() {
                report.add_error(ValidationError::NonFinite {
                    field: "conductivity",
                    index: idx,
                });
            } else if !(0.0..=1.0).contains(&c) {
                report.add_error(ValidationError::OutOfRange {
                    field: "conductivity",
                    index: idx,
                    value: c,
                    min: 0.0,
                    max: 1.0,
                });
            }

            if let Some(fibers) = &self.fibers {
                let (finite, zero) = match fibers {
                    FiberField::TwoDim(v) => (v[idx].is_finite(), v[idx] == DVec2::ZERO),
                    FiberField::ThreeDim(v) => (v[idx].is_finite(), v[idx] == DVec3::ZERO),
                };
                if !finite {
                    report.add_error(ValidationError::NonFinite {
                        field: "fibers",
                        index: idx,
                    });
                } else if zero {
                    report.add_warning(ValidationWarning::DegenerateFiber { index: idx });
                }
            }
        }
    }
}
