// crates/cw_physics/src/stencil/anisotropic.rs

//! 各向异性模板构建
//!
//! 纤维场存在时，把局部张量
//! `D = c·(D_ac·I + (D_al − D_ac)·f fᵀ)`
//! 投影到网格轴：轴向分量（Dxx 等）在面上取调和平均，
//! 交叉分量（Dxy 等）取算术平均（可带符号），交叉导数
//! 用面两侧的角点差分对估计，每对乘 1/4。
//!
//! 差分对任一端为非心肌节点时整对丢弃——保持每行权重
//! 和为零，边界附近只损失该方向的梯度信息，不产生伪源。

use glam::{DVec2, DVec3};

use super::{harmonic_mean, slot_2d, slot_3d, SLOTS_2D, SLOTS_3D};
use crate::tissue::CardiacTissue;

/// 2D 各向异性模板（9 点），返回 (槽位数, 权重)
pub(super) fn build_2d(
    tissue: &CardiacTissue,
    fibers: &[DVec2],
    d_al: f64,
    d_ac: f64,
) -> (usize, Vec<f64>) {
    let shape = tissue.shape;
    let (ni, nj, _) = shape.dims();
    let n = shape.n_nodes();
    let delta = d_al - d_ac;

    // 节点张量分量；非心肌节点为零
    let mut dxx = vec![0.0; n];
    let mut dyy = vec![0.0; n];
    let mut dxy = vec![0.0; n];
    for idx in 0..n {
        if !tissue.is_myocyte(idx) {
            continue;
        }
        let f = fibers[idx].normalize_or_zero();
        let c = tissue.conductivity[idx];
        dxx[idx] = c * (d_ac + delta * f.x * f.x);
        dyy[idx] = c * (d_ac + delta * f.y * f.y);
        dxy[idx] = c * delta * f.x * f.y;
    }

    let mut weights = vec![0.0; n * SLOTS_2D];
    let myo = |i: usize, j: usize| tissue.is_myocyte(shape.index2(i, j));

    // 行 row 增加系数 c × u[row + (di,dj)]
    macro_rules! add {
        ($row:expr, $di:expr, $dj:expr, $c:expr) => {
            weights[$row * SLOTS_2D + slot_2d($di, $dj)] += $c;
        };
    }

    // x 方向面: p=(i,j) 与 e=(i+1,j)
    for i in 0..ni - 1 {
        for j in 0..nj {
            if !myo(i, j) || !myo(i + 1, j) {
                continue;
            }
            let p = shape.index2(i, j);
            let e = shape.index2(i + 1, j);

            let g = harmonic_mean(dxx[p], dxx[e]);
            if g != 0.0 {
                add!(p, 1, 0, g);
                add!(p, 0, 0, -g);
                add!(e, -1, 0, g);
                add!(e, 0, 0, -g);
            }

            let dxy_f = 0.5 * (dxy[p] + dxy[e]);
            if dxy_f != 0.0 {
                let c = 0.25 * dxy_f;
                // p 侧差分对 (i,j±1)
                if myo(i, j + 1) && myo(i, j - 1) {
                    add!(p, 0, 1, c);
                    add!(p, 0, -1, -c);
                    add!(e, -1, 1, -c);
                    add!(e, -1, -1, c);
                }
                // e 侧差分对 (i+1,j±1)
                if myo(i + 1, j + 1) && myo(i + 1, j - 1) {
                    add!(p, 1, 1, c);
                    add!(p, 1, -1, -c);
                    add!(e, 0, 1, -c);
                    add!(e, 0, -1, c);
                }
            }
        }
    }

    // y 方向面: p=(i,j) 与 q=(i,j+1)
    for i in 0..ni {
        for j in 0..nj - 1 {
            if !myo(i, j) || !myo(i, j + 1) {
                continue;
            }
            let p = shape.index2(i, j);
            let q = shape.index2(i, j + 1);

            let g = harmonic_mean(dyy[p], dyy[q]);
            if g != 0.0 {
                add!(p, 0, 1, g);
                add!(p, 0, 0, -g);
                add!(q, 0, -1, g);
                add!(q, 0, 0, -g);
            }

            let dxy_f = 0.5 * (dxy[p] + dxy[q]);
            if dxy_f != 0.0 {
                let c = 0.25 * dxy_f;
                // p 侧差分对 (i±1,j)
                if myo(i + 1, j) && myo(i - 1, j) {
                    add!(p, 1, 0, c);
                    add!(p, -1, 0, -c);
                    add!(q, 1, -1, -c);
                    add!(q, -1, -1, c);
                }
                // q 侧差分对 (i±1,j+1)
                if myo(i + 1, j + 1) && myo(i - 1, j + 1) {
                    add!(p, 1, 1, c);
                    add!(p, -1, 1, -c);
                    add!(q, 1, 0, -c);
                    add!(q, -1, 0, c);
                }
            }
        }
    }

    (SLOTS_2D, weights)
}

/// 3D 各向异性模板（19 点，按 27 槽位存储），返回 (槽位数, 权重)
pub(super) fn build_3d(
    tissue: &CardiacTissue,
    fibers: &[DVec3],
    d_al: f64,
    d_ac: f64,
) -> (usize, Vec<f64>) {
    let shape = tissue.shape;
    let (ni, nj, nk) = shape.dims();
    let n = shape.n_nodes();
    let delta = d_al - d_ac;

    // 对称张量的六个独立分量
    let mut diag = vec![[0.0f64; 3]; n];
    let mut off = vec![[0.0f64; 3]; n]; // [dxy, dxz, dyz]
    for idx in 0..n {
        if !tissue.is_myocyte(idx) {
            continue;
        }
        let f = fibers[idx].normalize_or_zero();
        let c = tissue.conductivity[idx];
        diag[idx] = [
            c * (d_ac + delta * f.x * f.x),
            c * (d_ac + delta * f.y * f.y),
            c * (d_ac + delta * f.z * f.z),
        ];
        off[idx] = [
            c * delta * f.x * f.y,
            c * delta * f.x * f.z,
            c * delta * f.y * f.z,
        ];
    }

    let mut weights = vec![0.0; n * SLOTS_3D];

    let in_bounds = |c: [isize; 3]| {
        c[0] >= 0
            && c[0] < ni as isize
            && c[1] >= 0
            && c[1] < nj as isize
            && c[2] >= 0
            && c[2] < nk as isize
    };
    let flat = |c: [isize; 3]| shape.index3(c[0] as usize, c[1] as usize, c[2] as usize);
    let myo = |c: [isize; 3]| in_bounds(c) && tissue.is_myocyte(flat(c));

    // 行 row（坐标）增加系数 c × u[nb]（坐标）
    let add = |weights: &mut Vec<f64>, row: [isize; 3], nb: [isize; 3], c: f64| {
        let slot = slot_3d(nb[0] - row[0], nb[1] - row[1], nb[2] - row[2]);
        weights[flat(row) * SLOTS_3D + slot] += c;
    };

    // 轴向单位向量
    const AXES: [[isize; 3]; 3] = [[1, 0, 0], [0, 1, 0], [0, 0, 1]];
    // 面方向 a 对应的两个交叉分量下标 (张量分量, 梯度轴)
    const CROSS: [[(usize, usize); 2]; 3] = [
        [(0, 1), (1, 2)], // x 面: dxy×∂y, dxz×∂z
        [(0, 0), (2, 2)], // y 面: dxy×∂x, dyz×∂z
        [(1, 0), (2, 1)], // z 面: dxz×∂x, dyz×∂y
    ];

    for (a, axis) in AXES.iter().enumerate() {
        for i in 0..ni as isize {
            for j in 0..nj as isize {
                for k in 0..nk as isize {
                    let p = [i, j, k];
                    let e = [i + axis[0], j + axis[1], k + axis[2]];
                    if !in_bounds(e) || !myo(p) || !myo(e) {
                        continue;
                    }
                    let (pf, ef) = (flat(p), flat(e));

                    let g = harmonic_mean(diag[pf][a], diag[ef][a]);
                    if g != 0.0 {
                        add(&mut weights, p, e, g);
                        add(&mut weights, p, p, -g);
                        add(&mut weights, e, p, g);
                        add(&mut weights, e, e, -g);
                    }

                    for &(comp, grad_axis) in &CROSS[a] {
                        let d_f = 0.5 * (off[pf][comp] + off[ef][comp]);
                        if d_f == 0.0 {
                            continue;
                        }
                        let c = 0.25 * d_f;
                        let gv = AXES[grad_axis];
                        for base in [p, e] {
                            let hi = [base[0] + gv[0], base[1] + gv[1], base[2] + gv[2]];
                            let lo = [base[0] - gv[0], base[1] - gv[1], base[2] - gv[2]];
                            if !myo(hi) || !myo(lo) {
                                continue;
                            }
                            add(&mut weights, p, hi, c);
                            add(&mut weights, p, lo, -c);
                            add(&mut weights, e, hi, -c);
                            add(&mut weights, e, lo, c);
                        }
                    }
                }
            }
        }
    }

    (SLOTS_3D, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::StencilWeights;
    use crate::tissue::FiberField;

    /// 纤维沿 x 轴时，张量退化为对角阵：x 向权重 D_al，y 向 D_ac，无对角项
    #[test]
    fn test_axis_aligned_fibers_decouple() {
        let mut tissue = CardiacTissue::uniform_2d(10, 10);
        tissue.fibers = Some(FiberField::uniform_2d(tissue.n_nodes(), DVec2::X));
        tissue.d_al = 1.0;
        tissue.d_ac = 1.0 / 9.0;
        let stencil = StencilWeights::build(&tissue, 1.0).unwrap();

        let row = stencil.row(tissue.shape.index2(5, 5));
        assert!((row[slot_2d(1, 0)] - 1.0).abs() < 1e-12);
        assert!((row[slot_2d(0, 1)] - 1.0 / 9.0).abs() < 1e-12);
        assert_eq!(row[slot_2d(1, 1)], 0.0);
        assert_eq!(row[slot_2d(-1, 1)], 0.0);
    }

    /// 45° 纤维产生非零对角权重
    #[test]
    fn test_diagonal_fibers_couple_corners() {
        let mut tissue = CardiacTissue::uniform_2d(10, 10);
        let f = DVec2::new(1.0, 1.0);
        tissue.fibers = Some(FiberField::uniform_2d(tissue.n_nodes(), f));
        tissue.d_al = 1.0;
        tissue.d_ac = 1.0 / 9.0;
        let stencil = StencilWeights::build(&tissue, 1.0).unwrap();

        let row = stencil.row(tissue.shape.index2(5, 5));
        // dxy = (D_al−D_ac)/2 = 4/9; 每个角点累计 2×(dxy/4)
        let expected = 2.0 * (4.0 / 9.0) / 4.0;
        assert!((row[slot_2d(1, 1)] - expected).abs() < 1e-12);
        assert!((row[slot_2d(-1, -1)] - expected).abs() < 1e-12);
        assert!((row[slot_2d(1, -1)] + expected).abs() < 1e-12);
        assert!((row[slot_2d(-1, 1)] + expected).abs() < 1e-12);
    }

    /// 等比例张量（d_al = d_ac）下与各向同性模板一致
    #[test]
    fn test_isotropic_limit_matches() {
        let mut with_fibers = CardiacTissue::uniform_2d(8, 8);
        with_fibers.fibers = Some(FiberField::uniform_2d(
            with_fibers.n_nodes(),
            DVec2::new(0.6, 0.8),
        ));
        let a = StencilWeights::build(&with_fibers, 0.7).unwrap();

        let without = CardiacTissue::uniform_2d(8, 8);
        let b = StencilWeights::build(&without, 0.7).unwrap();

        for node in 0..without.n_nodes() {
            for (wa, wb) in a.row(node).iter().zip(b.row(node)) {
                assert!((wa - wb).abs() < 1e-12);
            }
        }
    }

    /// 3D 纤维沿 z 轴：z 向权重 D_al，x/y 向 D_ac
    #[test]
    fn test_3d_axis_aligned() {
        let mut tissue = CardiacTissue::uniform_3d(6, 6, 6);
        tissue.fibers = Some(FiberField::uniform_3d(tissue.n_nodes(), DVec3::Z));
        tissue.d_al = 1.0;
        tissue.d_ac = 0.25;
        let stencil = StencilWeights::build(&tissue, 1.0).unwrap();

        let row = stencil.row(tissue.shape.index3(3, 3, 3));
        assert!((row[slot_3d(0, 0, 1)] - 1.0).abs() < 1e-12);
        assert!((row[slot_3d(1, 0, 0)] - 0.25).abs() < 1e-12);
        assert!((row[slot_3d(0, 1, 0)] - 0.25).abs() < 1e-12);
    }

    /// 常数场是不动点（行和为零），含纤维化阻塞的几何下亦然
    #[test]
    fn test_constant_field_fixed_point_with_obstacle() {
        let mut tissue = CardiacTissue::uniform_2d(12, 12);
        tissue.fibers = Some(FiberField::uniform_2d(
            tissue.n_nodes(),
            DVec2::new(1.0, 0.5),
        ));
        tissue.d_ac = 0.2;
        for j in 3..9 {
            let idx = tissue.shape.index2(6, j);
            tissue.kinds[idx] = crate::tissue::NodeKind::Fibrosis;
        }
        let stencil = StencilWeights::build(&tissue, 1.0).unwrap();

        let u = vec![-84.5; tissue.n_nodes()];
        let mut u_new = vec![0.0; tissue.n_nodes()];
        stencil.apply(&u, &mut u_new, 0.01, 0.25).unwrap();
        for (a, b) in u.iter().zip(&u_new) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
