// crates/cw_physics/src/stencil/isotropic.rs

//! 各向同性模板构建
//!
//! 无纤维场时的轴向五点（2D）/七点（3D）模板。
//! 面系数取两侧 `电导率 × D` 的调和平均，任一侧为
//! 非心肌节点时面权重为零（无通量）。

use super::{harmonic_mean, slot_2d, slot_3d, SLOTS_2D, SLOTS_3D};
use crate::tissue::{CardiacTissue, GridShape};

/// 构建各向同性模板，返回 (槽位数, 权重)
pub(super) fn build(tissue: &CardiacTissue, d: f64) -> (usize, Vec<f64>) {
    match tissue.shape {
        GridShape::Dim2 { .. } => (SLOTS_2D, build_2d(tissue, d)),
        GridShape::Dim3 { .. } => (SLOTS_3D, build_3d(tissue, d)),
    }
}

fn build_2d(tissue: &CardiacTissue, d: f64) -> Vec<f64> {
    let shape = tissue.shape;
    let (ni, nj, _) = shape.dims();
    let mut weights = vec![0.0; shape.n_nodes() * SLOTS_2D];

    let mut add = |node: usize, di: isize, dj: isize, c: f64| {
        weights[node * SLOTS_2D + slot_2d(di, dj)] += c;
    };

    // x 方向面
    for i in 0..ni - 1 {
        for j in 0..nj {
            let p = shape.index2(i, j);
            let e = shape.index2(i + 1, j);
            if !tissue.is_myocyte(p) || !tissue.is_myocyte(e) {
                continue;
            }
            let g = harmonic_mean(tissue.conductivity[p] * d, tissue.conductivity[e] * d);
            if g == 0.0 {
                continue;
            }
            add(p, 1, 0, g);
            add(p, 0, 0, -g);
            add(e, -1, 0, g);
            add(e, 0, 0, -g);
        }
    }

    // y 方向面
    for i in 0..ni {
        for j in 0..nj - 1 {
            let p = shape.index2(i, j);
            let n = shape.index2(i, j + 1);
            if !tissue.is_myocyte(p) || !tissue.is_myocyte(n) {
                continue;
            }
            let g = harmonic_mean(tissue.conductivity[p] * d, tissue.conductivity[n] * d);
            if g == 0.0 {
                continue;
            }
            add(p, 0, 1, g);
            add(p, 0, 0, -g);
            add(n, 0, -1, g);
            add(n, 0, 0, -g);
        }
    }

    weights
}

fn build_3d(tissue: &CardiacTissue, d: f64) -> Vec<f64> {
    let shape = tissue.shape;
    let (ni, nj, nk) = shape.dims();
    let mut weights = vec![0.0; shape.n_nodes() * SLOTS_3D];

    let mut add = |node: usize, di: isize, dj: isize, dk: isize, c: f64| {
        weights[node * SLOTS_3D + slot_3d(di, dj, dk)] += c;
    };

    let axes: [(isize, isize, isize); 3] = [(1, 0, 0), (0, 1, 0), (0, 0, 1)];
    for &(ax, ay, az) in &axes {
        let (ei, ej, ek) = (
            ni - ax as usize,
            nj - ay as usize,
            nk - az as usize,
        );
        for i in 0..ei {
            for j in 0..ej {
                for k in 0..ek {
                    let p = shape.index3(i, j, k);
                    let q = shape.index3(
                        i + ax as usize,
                        j + ay as usize,
                        k + az as usize,
                    );
                    if !tissue.is_myocyte(p) || !tissue.is_myocyte(q) {
                        continue;
                    }
                    let g = harmonic_mean(
                        tissue.conductivity[p] * d,
                        tissue.conductivity[q] * d,
                    );
                    if g == 0.0 {
                        continue;
                    }
                    add(p, ax, ay, az, g);
                    add(p, 0, 0, 0, -g);
                    add(q, -ax, -ay, -az, g);
                    add(q, 0, 0, 0, -g);
                }
            }
        }
    }

    weights
}
