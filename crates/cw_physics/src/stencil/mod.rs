// crates/cw_physics/src/stencil/mod.rs

//! 扩散模板
//!
//! 从组织几何、电导率场与纤维方向场派生每节点的邻居耦合
//! 权重，并执行一次显式扩散子步。
//!
//! # 算法
//!
//! 单域各向异性扩散 `∂u/∂t = ∇·(D∇u)`，其中局部张量
//! ```text
//! D = c · (D_ac·I + (D_al − D_ac)·f fᵀ)
//! ```
//! `c` 为节点电导率，`f` 为纤维方向。张量投影到网格轴上，
//! 轴向项用面调和平均，交叉导数项用角点差分对。
//!
//! # 守恒性
//!
//! 所有面通量都以反对称方式同时累加到面两侧节点
//! （owner 加、neighbor 减），离散算子因此精确守恒 Σu，
//! 且每行权重和为零——常数场是不动点，静息电位不漂移。
//!
//! # 无通量边界
//!
//! 任一侧为非心肌节点的面权重恒为零。空节点与纤维化节点
//! 由此天然成为零通量汇；完全隔离的心肌节点在扩散下惰性，
//! 这是预期行为而非错误。
//!
//! # 稳定性
//!
//! 显式格式要求 `dt` 满足稳定界，调用方负责选取
//! `dt`/`dr`。[`StencilWeights::estimate_stable_dt`] 给出
//! Gershgorin 估计，违反时仅记录警告，不拒绝配置。

mod anisotropic;
mod isotropic;

use cw_foundation::error::{CwError, CwResult};
use rayon::prelude::*;

use crate::tissue::{CardiacTissue, FiberField, GridShape, NodeKind};

/// 默认并行阈值（节点数）
const DEFAULT_PARALLEL_THRESHOLD: usize = 1000;

/// 2D 模板槽位数（3×3 邻域）
pub const SLOTS_2D: usize = 9;
/// 3D 模板槽位数（3×3×3 邻域）
pub const SLOTS_3D: usize = 27;

/// 扩散模板权重
///
/// 几何派生的只读系数，每节点一行、每邻居方向一个槽位。
/// 组织、电导率或纤维变化后须重新构建；相同输入重建得到
/// 完全相同的系数。
#[derive(Debug, Clone, PartialEq)]
pub struct StencilWeights {
    shape: GridShape,
    slots: usize,
    center: usize,
    offsets: Vec<isize>,
    weights: Vec<f64>,
    parallel_threshold: usize,
}

impl StencilWeights {
    /// 从组织构建模板
    ///
    /// `d_model` 为细胞模型的基准扩散系数；沿/垂直纤维方向的
    /// 有效系数为 `d_model · tissue.d_al` 与 `d_model · tissue.d_ac`。
    /// 无纤维场时走各向同性路径（使用沿向系数）。
    pub fn build(tissue: &CardiacTissue, d_model: f64) -> CwResult<Self> {
        if !d_model.is_finite() || d_model < 0.0 {
            return Err(CwError::invalid_parameter(
                "d_model",
                d_model,
                "扩散系数必须为非负有限值",
            ));
        }
        check_stencil_preconditions(tissue)?;

        let shape = tissue.shape;
        let d_al = d_model * tissue.d_al;
        let d_ac = d_model * tissue.d_ac;

        let (slots, weights) = match &tissue.fibers {
            None => {
                if (tissue.d_al - tissue.d_ac).abs() > 1e-14 {
                    log::debug!(
                        "无纤维场，d_al={} / d_ac={} 的各向异性设置被忽略",
                        tissue.d_al,
                        tissue.d_ac
                    );
                }
                isotropic::build(tissue, d_al)
            }
            Some(FiberField::TwoDim(fibers)) => anisotropic::build_2d(tissue, fibers, d_al, d_ac),
            Some(FiberField::ThreeDim(fibers)) => anisotropic::build_3d(tissue, fibers, d_al, d_ac),
        };

        let offsets = neighbor_offsets(shape);
        debug_assert_eq!(offsets.len(), slots);

        Ok(Self {
            shape,
            slots,
            center: slots / 2,
            offsets,
            weights,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        })
    }

    /// 设置并行阈值
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// 网格形状
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// 每节点槽位数
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// 某节点的权重行
    pub fn row(&self, node: usize) -> &[f64] {
        &self.weights[node * self.slots..(node + 1) * self.slots]
    }

    /// 执行一次显式扩散子步
    ///
    /// 对每个节点计算
    /// `u_new[i] = u[i] + dt/dr² · Σ_s w_s · u[i+off_s]`
    /// 写入全新缓冲区，绝不原地读改写。非心肌节点的行全零，
    /// 结果即透传 `u[i]`。
    pub fn apply(&self, u: &[f64], u_new: &mut [f64], dt: f64, dr: f64) -> CwResult<()> {
        let n = self.shape.n_nodes();
        if u.len() != n {
            return Err(CwError::ShapeMismatch {
                field: "u",
                expected: n,
                actual: u.len(),
            });
        }
        if u_new.len() != n {
            return Err(CwError::ShapeMismatch {
                field: "u_new",
                expected: n,
                actual: u_new.len(),
            });
        }

        let coef = dt / (dr * dr);
        let slots = self.slots;
        let kernel = |i: usize| -> f64 {
            let row = &self.weights[i * slots..(i + 1) * slots];
            let mut acc = 0.0;
            for (s, &w) in row.iter().enumerate() {
                // 零权重同时屏蔽了边界层节点的越界邻居
                if w != 0.0 {
                    let nb = (i as isize + self.offsets[s]) as usize;
                    acc += w * u[nb];
                }
            }
            u[i] + coef * acc
        };

        if n >= self.parallel_threshold {
            u_new
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, out)| *out = kernel(i));
        } else {
            for (i, out) in u_new.iter_mut().enumerate() {
                *out = kernel(i);
            }
        }
        Ok(())
    }

    /// 估计显式格式的稳定时间步长
    ///
    /// Gershgorin 界：`dt ≤ 2·dr² / max_i(|w_center| + Σ|w_off|)`。
    /// 各向同性 D 下退化为经典的 `dr²/(2·ndim·D)`。
    pub fn estimate_stable_dt(&self, dr: f64) -> f64 {
        let mut max_row = 0.0f64;
        for node in 0..self.shape.n_nodes() {
            let row_sum: f64 = self.row(node).iter().map(|w| w.abs()).sum();
            max_row = max_row.max(row_sum);
        }
        if max_row < 1e-300 {
            return f64::MAX;
        }
        2.0 * dr * dr / max_row
    }

    /// 统计权重全零（隔离）的心肌节点数量
    pub fn count_isolated(&self, tissue: &CardiacTissue) -> usize {
        (0..self.shape.n_nodes())
            .filter(|&i| {
                tissue.is_myocyte(i) && self.row(i).iter().all(|&w| w == 0.0)
            })
            .count()
    }
}

/// 模板前置条件检查：字段尺寸一致、最外层为空
fn check_stencil_preconditions(tissue: &CardiacTissue) -> CwResult<()> {
    let n = tissue.n_nodes();
    if tissue.kinds.len() != n {
        return Err(CwError::ShapeMismatch {
            field: "kinds",
            expected: n,
            actual: tissue.kinds.len(),
        });
    }
    if tissue.conductivity.len() != n {
        return Err(CwError::ShapeMismatch {
            field: "conductivity",
            expected: n,
            actual: tissue.conductivity.len(),
        });
    }
    if let Some(fibers) = &tissue.fibers {
        if fibers.len() != n {
            return Err(CwError::ShapeMismatch {
                field: "fibers",
                expected: n,
                actual: fibers.len(),
            });
        }
    }

    let (ni, nj, nk) = tissue.shape.dims();
    let is_3d = tissue.shape.ndim() == 3;
    for i in 0..ni {
        for j in 0..nj {
            for k in 0..nk {
                let on_boundary = i == 0
                    || i == ni - 1
                    || j == 0
                    || j == nj - 1
                    || (is_3d && (k == 0 || k == nk - 1));
                if on_boundary && tissue.kinds[tissue.shape.index3(i, j, k)] != NodeKind::Empty {
                    return Err(CwError::geometry(
                        "最外层存在非空节点，须先调用 add_boundaries()",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// 各槽位对应的扁平下标偏移
fn neighbor_offsets(shape: GridShape) -> Vec<isize> {
    match shape {
        GridShape::Dim2 { nj, .. } => {
            let mut offsets = Vec::with_capacity(SLOTS_2D);
            for di in -1isize..=1 {
                for dj in -1isize..=1 {
                    offsets.push(di * nj as isize + dj);
                }
            }
            offsets
        }
        GridShape::Dim3 { nj, nk, .. } => {
            let mut offsets = Vec::with_capacity(SLOTS_3D);
            for di in -1isize..=1 {
                for dj in -1isize..=1 {
                    for dk in -1isize..=1 {
                        offsets.push((di * nj as isize + dj) * nk as isize + dk);
                    }
                }
            }
            offsets
        }
    }
}

/// 2D 槽位下标
#[inline]
pub(crate) fn slot_2d(di: isize, dj: isize) -> usize {
    ((di + 1) * 3 + (dj + 1)) as usize
}

/// 3D 槽位下标
#[inline]
pub(crate) fn slot_3d(di: isize, dj: isize, dk: isize) -> usize {
    (((di + 1) * 3 + (dj + 1)) * 3 + (dk + 1)) as usize
}

/// 面系数的调和平均（保证正定性；任一侧为零则面不导通）
#[inline]
pub(crate) fn harmonic_mean(a: f64, b: f64) -> f64 {
    if a + b > 1e-14 {
        2.0 * a * b / (a + b)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_foundation::float::approx_eq;
    use glam::DVec2;

    #[test]
    fn test_build_rejects_missing_padding() {
        let mut tissue = CardiacTissue::uniform_2d(6, 6);
        tissue.kinds[0] = NodeKind::Myocyte;
        assert!(StencilWeights::build(&tissue, 1.0).is_err());
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut tissue = CardiacTissue::uniform_2d(12, 10);
        tissue.fibers = Some(FiberField::uniform_2d(
            tissue.n_nodes(),
            DVec2::new(0.6, 0.8),
        ));
        tissue.d_ac = 1.0 / 9.0;

        let a = StencilWeights::build(&tissue, 1.0).unwrap();
        let b = StencilWeights::build(&tissue, 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rows_sum_to_zero() {
        let mut tissue = CardiacTissue::uniform_2d(10, 10);
        tissue.fibers = Some(FiberField::uniform_2d(
            tissue.n_nodes(),
            DVec2::new(1.0, 1.0),
        ));
        tissue.d_ac = 0.2;
        let stencil = StencilWeights::build(&tissue, 1.0).unwrap();

        for node in 0..tissue.n_nodes() {
            let sum: f64 = stencil.row(node).iter().sum();
            assert!(
                approx_eq(sum, 0.0, 1e-12),
                "节点 {} 行和 {} 非零",
                node,
                sum
            );
        }
    }

    #[test]
    fn test_empty_rows_for_non_myocytes() {
        let mut tissue = CardiacTissue::uniform_2d(8, 8);
        let fib = tissue.shape.index2(3, 3);
        tissue.kinds[fib] = NodeKind::Fibrosis;
        let stencil = StencilWeights::build(&tissue, 1.0).unwrap();

        assert!(stencil.row(0).iter().all(|&w| w == 0.0));
        assert!(stencil.row(fib).iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_estimate_stable_dt_isotropic() {
        let tissue = CardiacTissue::uniform_2d(16, 16);
        let stencil = StencilWeights::build(&tissue, 1.0).unwrap();
        // 2D、D=1: 经典界 dr²/4
        let dt = stencil.estimate_stable_dt(0.25);
        assert!(approx_eq(dt, 0.25 * 0.25 / 4.0, 1e-12));
    }

    #[test]
    fn test_isolated_node_is_inert() {
        let mut tissue = CardiacTissue::uniform_2d(7, 7);
        // 把 (3,3) 周围一圈全部纤维化，使其隔离
        for (di, dj) in [
            (-1, -1), (-1, 0), (-1, 1), (0, -1),
            (0, 1), (1, -1), (1, 0), (1, 1),
        ] {
            let idx = tissue
                .shape
                .index2((3 + di) as usize, (3 + dj) as usize);
            tissue.kinds[idx] = NodeKind::Fibrosis;
        }
        let stencil = StencilWeights::build(&tissue, 1.0).unwrap();
        assert_eq!(stencil.count_isolated(&tissue), 1);

        let mut u = vec![0.0; tissue.n_nodes()];
        u[tissue.shape.index2(3, 3)] = 1.0;
        let mut u_new = vec![0.0; tissue.n_nodes()];
        stencil.apply(&u, &mut u_new, 0.01, 0.25).unwrap();
        assert_eq!(u_new[tissue.shape.index2(3, 3)], 1.0);
    }

    #[test]
    fn test_apply_shape_mismatch() {
        let tissue = CardiacTissue::uniform_2d(6, 6);
        let stencil = StencilWeights::build(&tissue, 1.0).unwrap();
        let u = vec![0.0; 10];
        let mut u_new = vec![0.0; tissue.n_nodes()];
        assert!(stencil.apply(&u, &mut u_new, 0.01, 0.25).is_err());
    }
}
