// crates/cw_physics/tests/conservation.rs

//! 守恒性与边界验证测试
//!
//! # 测试覆盖
//!
//! - 纯扩散下封闭组织的总电荷守恒（无通量边界守恒律）
//! - 空/纤维化节点全程保持静息值
//! - 均匀电导、无纤维时点刺激扩散的轴对称性
//! - 模板重建的确定性

use cw_physics::prelude::*;
use cw_physics::RunConfig;
use glam::DVec2;

/// 确定性的非均匀初始场
fn seeded_field(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 + 0.5 * ((i * 2654435761) % 1000) as f64 / 1000.0)
        .collect()
}

#[test]
fn test_diffusion_only_conserves_total_charge_isotropic() {
    let tissue = CardiacTissue::uniform_2d(24, 24);
    let stencil = StencilWeights::build(&tissue, 1.0).unwrap();

    let mut u = seeded_field(tissue.n_nodes());
    // 非心肌节点清零，便于对总量求和
    for (idx, v) in u.iter_mut().enumerate() {
        if !tissue.is_myocyte(idx) {
            *v = 0.0;
        }
    }
    let total_before: f64 = u.iter().sum();

    let mut u_next = vec![0.0; tissue.n_nodes()];
    for _ in 0..200 {
        stencil.apply(&u, &mut u_next, 0.01, 0.25).unwrap();
        std::mem::swap(&mut u, &mut u_next);
    }

    let total_after: f64 = u.iter().sum();
    assert!(
        (total_before - total_after).abs() < 1e-9 * total_before.abs().max(1.0),
        "总电荷漂移: {} → {}",
        total_before,
        total_after
    );
}

#[test]
fn test_diffusion_only_conserves_total_charge_anisotropic() {
    let mut tissue = CardiacTissue::uniform_2d(20, 20);
    tissue.fibers = Some(FiberField::uniform_2d(
        tissue.n_nodes(),
        DVec2::new(1.0, 1.0),
    ));
    tissue.d_al = 1.0;
    tissue.d_ac = 1.0 / 9.0;
    // 纤维化孔洞不破坏守恒
    for j in 8..12 {
        let idx = tissue.shape.index2(10, j);
        tissue.kinds[idx] = NodeKind::Fibrosis;
    }
    let stencil = StencilWeights::build(&tissue, 1.0).unwrap();

    let mut u = seeded_field(tissue.n_nodes());
    for (idx, v) in u.iter_mut().enumerate() {
        if !tissue.is_myocyte(idx) {
            *v = 0.0;
        }
    }
    let total_before: f64 = u.iter().sum();

    let mut u_next = vec![0.0; tissue.n_nodes()];
    for _ in 0..500 {
        stencil.apply(&u, &mut u_next, 0.005, 0.25).unwrap();
        std::mem::swap(&mut u, &mut u_next);
    }

    let total_after: f64 = u.iter().sum();
    assert!(
        (total_before - total_after).abs() < 1e-9 * total_before.abs().max(1.0),
        "总电荷漂移: {} → {}",
        total_before,
        total_after
    );
}

#[test]
fn test_diffusion_only_conserves_in_3d() {
    let tissue = CardiacTissue::uniform_3d(10, 10, 6);
    let stencil = StencilWeights::build(&tissue, 0.5).unwrap();

    let mut u = seeded_field(tissue.n_nodes());
    for (idx, v) in u.iter_mut().enumerate() {
        if !tissue.is_myocyte(idx) {
            *v = 0.0;
        }
    }
    let total_before: f64 = u.iter().sum();

    let mut u_next = vec![0.0; tissue.n_nodes()];
    for _ in 0..100 {
        stencil.apply(&u, &mut u_next, 0.01, 0.25).unwrap();
        std::mem::swap(&mut u, &mut u_next);
    }
    let total_after: f64 = u.iter().sum();
    assert!((total_before - total_after).abs() < 1e-9 * total_before.abs().max(1.0));
}

#[test]
fn test_non_conductive_nodes_stay_at_rest() {
    let mut tissue = CardiacTissue::uniform_2d(20, 20);
    // 组织中部一块纤维化损伤
    for i in 8..12 {
        for j in 8..12 {
            let idx = tissue.shape.index2(i, j);
            tissue.kinds[idx] = NodeKind::Fibrosis;
        }
    }
    let fibrotic: Vec<usize> = tissue
        .kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| **k != NodeKind::Myocyte)
        .map(|(i, _)| i)
        .collect();

    let model = CellModel::AlievPanfilov(AlievPanfilov::new());
    let rest = model.rest_potential();
    let config = RunConfig::builder().dt(0.01).dr(0.25).t_max(5.0).build();

    let mut stims = StimSequence::new();
    stims.add(Stimulus::voltage(
        0.0,
        1.0,
        StimRegion::Box(BoxRegion::rect(1, 4, 1, 19)),
    ));

    let mut runner = ModelRunner::new(tissue, model, config);
    runner.set_stim_sequence(stims);
    runner.initialize().unwrap();

    // 全程逐步检查，不只看末态
    for _ in 0..500 {
        runner.step().unwrap();
        for &idx in &fibrotic {
            assert_eq!(
                runner.u()[idx],
                rest,
                "非心肌节点 {} 偏离静息值",
                idx
            );
        }
    }
}

#[test]
fn test_point_stimulus_spreads_symmetrically() {
    // 均匀电导、无纤维场：点刺激的扩散场在轴置换下对称
    let n = 21;
    let tissue = CardiacTissue::uniform_2d(n, n);
    let center = tissue.shape.index2(10, 10);
    let stencil = StencilWeights::build(&tissue, 1.0).unwrap();

    let mut u = vec![0.0; tissue.n_nodes()];
    u[center] = 1.0;
    let mut u_next = vec![0.0; tissue.n_nodes()];
    for _ in 0..100 {
        stencil.apply(&u, &mut u_next, 0.01, 0.25).unwrap();
        std::mem::swap(&mut u, &mut u_next);
    }

    for i in 0..n {
        for j in 0..n {
            let a = u[tissue.shape.index2(i, j)];
            // 转置对称
            let b = u[tissue.shape.index2(j, i)];
            // 两轴反射对称
            let c = u[tissue.shape.index2(n - 1 - i, j)];
            let d = u[tissue.shape.index2(i, n - 1 - j)];
            assert!((a - b).abs() < 1e-12);
            assert!((a - c).abs() < 1e-12);
            assert!((a - d).abs() < 1e-12);
        }
    }
}

#[test]
fn test_stencil_rebuild_identical() {
    let mut tissue = CardiacTissue::uniform_2d(16, 16);
    tissue.fibers = Some(FiberField::uniform_2d(
        tissue.n_nodes(),
        DVec2::new(0.8, 0.6),
    ));
    tissue.d_ac = 0.25;
    for idx in [50, 77, 130] {
        tissue.conductivity[idx] = 0.5;
    }

    let a = StencilWeights::build(&tissue, 0.7).unwrap();
    let b = StencilWeights::build(&tissue, 0.7).unwrap();
    assert_eq!(a, b);
}
