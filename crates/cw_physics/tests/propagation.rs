// crates/cw_physics/tests/propagation.rs

//! 波传播验证测试
//!
//! # 测试覆盖
//!
//! - 平面波激活：刺激区激活时刻 ≈ 0，激活时间随距离单调递增
//! - 3D 缆线上的波前速度落在已知范围
//! - 各向异性组织中沿纤维方向传播更快

use cw_physics::prelude::*;
use cw_physics::RunConfig;
use glam::DVec2;

#[test]
fn test_planar_wave_activation_times() {
    let n = 100;
    let tissue = CardiacTissue::uniform_2d(n, n);
    let shape = tissue.shape;
    let model = CellModel::AlievPanfilov(AlievPanfilov::new());
    let config = RunConfig::builder().dt(0.01).dr(0.25).t_max(16.0).build();

    let mut stims = StimSequence::new();
    // t=0 对 x ∈ [1,4) 的整条带施加电压 1
    stims.add(Stimulus::voltage(
        0.0,
        1.0,
        StimRegion::Box(BoxRegion::rect(1, 4, 1, n - 1)),
    ));

    let mut trackers = TrackerSequence::new();
    trackers.add(ActivationTimeTracker::new(0.5, TrackerWindow::every_step()));

    let mut runner = ModelRunner::new(tissue, model, config);
    runner.set_stim_sequence(stims);
    runner.set_tracker_sequence(trackers);
    runner.run().unwrap();

    let tracker = runner
        .trackers()
        .get_as::<ActivationTimeTracker>(0)
        .unwrap();
    let at = tracker.output();

    // 刺激区在 t=0 即激活
    for i in 1..4 {
        for j in 1..n - 1 {
            assert_eq!(at[shape.index2(i, j)], 0.0, "刺激区节点 ({},{}) 激活非零", i, j);
        }
    }

    // 沿传播方向激活时间严格递增（取中线，只检查已激活段）
    let j = n / 2;
    let mut prev = 0.0;
    let mut reached = 4;
    for i in 4..n - 1 {
        let t = at[shape.index2(i, j)];
        if t.is_nan() {
            break;
        }
        assert!(t > prev, "激活时间在 i={} 处不递增: {} ≤ {}", i, t, prev);
        prev = t;
        reached = i;
    }
    // t_max=16 足够波前扫过大半组织
    assert!(reached > n / 2, "波前只到达 i={}", reached);

    // 空边界节点永不激活
    assert!(at[shape.index2(0, j)].is_nan());
    assert!(at[shape.index2(n - 1, j)].is_nan());
}

#[test]
fn test_cable_wavefront_speed() {
    // 12×3×3 缆线，电流刺激左端，波前速度应在已知范围内
    let (ni, nj, nk) = (12, 3, 3);
    let tissue = CardiacTissue::uniform_3d(ni, nj, nk);
    let shape = tissue.shape;
    let model = CellModel::AlievPanfilov(AlievPanfilov::new());
    let dr = 0.25;
    let config = RunConfig::builder().dt(0.01).dr(dr).t_max(3.0).build();

    let mut stims = StimSequence::new();
    stims.add(Stimulus::current(
        0.0,
        5.0,
        0.5,
        StimRegion::Box(BoxRegion::cuboid(0, 5, 0, nj, 0, nk)),
    ));

    let mut trackers = TrackerSequence::new();
    trackers.add(ActivationTimeTracker::new(0.5, TrackerWindow::every_step()));

    let mut runner = ModelRunner::new(tissue, model, config);
    runner.set_stim_sequence(stims);
    runner.set_tracker_sequence(trackers);
    runner.run().unwrap();

    let tracker = runner
        .trackers()
        .get_as::<ActivationTimeTracker>(0)
        .unwrap();
    let at = tracker.output()[shape.index3(10, 1, 1)];
    assert!(!at.is_nan(), "波前未到达缆线末端");

    // 距刺激区边缘 5 个节点
    let speed = 5.0 * dr / at;
    assert!(
        (1.3..=2.2).contains(&speed),
        "波前速度超出预期范围: {}",
        speed
    );
}

#[test]
fn test_fiber_direction_speeds_up_propagation() {
    // 纤维沿 x 轴：从中心点刺激出发，x 向激活快于 y 向
    let n = 41;
    let mut tissue = CardiacTissue::uniform_2d(n, n);
    tissue.fibers = Some(FiberField::uniform_2d(tissue.n_nodes(), DVec2::X));
    tissue.d_al = 1.0;
    tissue.d_ac = 1.0 / 9.0;
    let shape = tissue.shape;

    let model = CellModel::AlievPanfilov(AlievPanfilov::new());
    let config = RunConfig::builder().dt(0.01).dr(0.25).t_max(10.0).build();

    let c = n / 2;
    let mut stims = StimSequence::new();
    stims.add(Stimulus::voltage(
        0.0,
        1.0,
        StimRegion::Box(BoxRegion::rect(c - 2, c + 3, c - 2, c + 3)),
    ));

    let mut trackers = TrackerSequence::new();
    trackers.add(ActivationTimeTracker::new(0.5, TrackerWindow::every_step()));

    let mut runner = ModelRunner::new(tissue, model, config);
    runner.set_stim_sequence(stims);
    runner.set_tracker_sequence(trackers);
    runner.run().unwrap();

    let tracker = runner
        .trackers()
        .get_as::<ActivationTimeTracker>(0)
        .unwrap();
    let at = tracker.output();

    let offset = 15;
    let along = at[shape.index2(c + offset, c)];
    let across = at[shape.index2(c, c + offset)];
    assert!(!along.is_nan(), "沿纤维方向未激活");
    assert!(
        across.is_nan() || across > 1.5 * along,
        "各向异性传播不明显: along={}, across={:?}",
        along,
        across
    );
}
