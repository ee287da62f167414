// crates/cw_physics/tests/tracker_tests.rs

//! 观测器集成测试
//!
//! # 测试覆盖
//!
//! - 采样窗口与步距规则（{5,7,9} 精确采样步）
//! - 动作电位幅值与时程（Aliev–Panfilov 已知特征）
//! - 多变量观测器的门控变量幅值
//! - 周期观测器与伪 ECG 的端到端行为

use cw_physics::prelude::*;
use cw_physics::RunConfig;
use glam::DVec3;

/// 3D 缆线模型：电流刺激左端触发单次传播
fn cable_runner(t_max: f64) -> ModelRunner {
    let (ni, nj, nk) = (12, 3, 3);
    let tissue = CardiacTissue::uniform_3d(ni, nj, nk);
    let model = CellModel::AlievPanfilov(AlievPanfilov::new());
    let config = RunConfig::builder().dt(0.01).dr(0.25).t_max(t_max).build();

    let mut stims = StimSequence::new();
    stims.add(Stimulus::current(
        0.0,
        5.0,
        0.5,
        StimRegion::Box(BoxRegion::cuboid(0, 5, 0, nj, 0, nk)),
    ));

    let mut runner = ModelRunner::new(tissue, model, config);
    runner.set_stim_sequence(stims);
    runner
}

#[test]
fn test_window_samples_exact_steps() {
    // dt=1, t_max=20, 窗口 [5,10], 步距 2 → 恰好采样步 {5,7,9}
    let tissue = CardiacTissue::uniform_2d(8, 8);
    let cell = tissue.shape.index2(4, 4);
    let model = CellModel::AlievPanfilov(AlievPanfilov::new());
    // dr 放大保证 dt=1 时扩散仍稳定
    let config = RunConfig::builder().dt(1.0).dr(10.0).t_max(20.0).build();

    let mut trackers = TrackerSequence::new();
    trackers.add(ActionPotentialTracker::new(
        vec![cell],
        TrackerWindow::new(5.0, 10.0, 2),
    ));

    let mut runner = ModelRunner::new(tissue, model, config);
    runner.set_tracker_sequence(trackers);
    runner.run().unwrap();
    assert_eq!(runner.stats().steps_completed, 20);

    let tracker = runner
        .trackers()
        .get_as::<ActionPotentialTracker>(0)
        .unwrap();
    assert_eq!(tracker.output()[0].len(), 3, "采样数应恰为 {{5,7,9}} 三次");
}

#[test]
fn test_action_potential_amplitude_and_duration() {
    let mut runner = cable_runner(30.0);
    let cell = runner.tissue().shape.index3(10, 1, 1);

    let mut trackers = TrackerSequence::new();
    trackers.add(ActionPotentialTracker::new(
        vec![cell],
        TrackerWindow::every_step(),
    ));
    runner.set_tracker_sequence(trackers);
    runner.run().unwrap();

    let tracker = runner
        .trackers()
        .get_as::<ActionPotentialTracker>(0)
        .unwrap();
    let u = &tracker.output()[0];
    assert_eq!(u.len(), 3000);

    // Aliev–Panfilov 幅值归一化到 1
    let peak = u.iter().cloned().fold(f64::MIN, f64::max);
    assert!((peak - 1.0).abs() < 0.02, "幅值异常: {}", peak);

    // 阈值 0.1 的上冲与复极都应出现，APD 在已知范围
    let threshold = 0.1;
    let dt = 0.01;
    let up = u
        .windows(2)
        .position(|w| w[0] < threshold && w[1] >= threshold)
        .expect("未找到上冲");
    let down = u[up..]
        .windows(2)
        .position(|w| w[0] > threshold && w[1] <= threshold)
        .expect("未找到复极");
    let apd = down as f64 * dt;
    assert!((20.0..=30.0).contains(&apd), "APD 超出预期范围: {}", apd);
}

#[test]
fn test_multi_variable_tracker_gate_amplitude() {
    let mut runner = cable_runner(30.0);
    let cell = runner.tissue().shape.index3(10, 1, 1);

    let mut trackers = TrackerSequence::new();
    trackers.add(MultiVariableTracker::new(
        cell,
        vec!["u".to_string(), "v".to_string()],
        TrackerWindow::every_step(),
    ));
    runner.set_tracker_sequence(trackers);
    runner.run().unwrap();

    let tracker = runner
        .trackers()
        .get_as::<MultiVariableTracker>(0)
        .unwrap();
    let v = tracker.output("v").unwrap();
    assert!(!v.is_empty());

    // Aliev–Panfilov 恢复变量峰值约为 2
    let v_max = v.iter().cloned().fold(f64::MIN, f64::max);
    assert!((v_max - 2.0).abs() < 0.1, "v 峰值异常: {}", v_max);
}

#[test]
fn test_period_tracker_measures_pacing_interval() {
    // 周期性电流刺激产生稳定节律，周期观测器应测得刺激周期
    let n = 20;
    let tissue = CardiacTissue::uniform_2d(n, n);
    let cell = tissue.shape.index2(10, 10);
    let model = CellModel::AlievPanfilov(AlievPanfilov::new());
    let config = RunConfig::builder().dt(0.01).dr(0.25).t_max(120.0).build();

    let mut stims = StimSequence::new();
    // 每 40 个时间单位一个电压刺激
    for beat in 0..3 {
        stims.add(Stimulus::voltage(
            40.0 * beat as f64,
            1.0,
            StimRegion::Box(BoxRegion::rect(1, n - 1, 1, n - 1)),
        ));
    }

    let mut trackers = TrackerSequence::new();
    trackers.add(PeriodTracker::new(
        vec![cell],
        0.5,
        TrackerWindow::every_step(),
    ));

    let mut runner = ModelRunner::new(tissue, model, config);
    runner.set_stim_sequence(stims);
    runner.set_tracker_sequence(trackers);
    runner.run().unwrap();

    let tracker = runner.trackers().get_as::<PeriodTracker>(0).unwrap();
    let periods = &tracker.output()[0];
    assert_eq!(periods.len(), 2, "3 次激活应产生 2 个间隔");
    for &p in periods {
        assert!((p - 40.0).abs() < 1.0, "周期异常: {}", p);
    }
}

#[test]
fn test_ecg_tracker_produces_biphasic_signal() {
    // 平面波扫过组织，近场电极应记录到双相伪 ECG
    let n = 50;
    let tissue = CardiacTissue::uniform_2d(n, n);
    let model = CellModel::AlievPanfilov(AlievPanfilov::new());
    let config = RunConfig::builder().dt(0.01).dr(0.25).t_max(10.0).build();

    let mut stims = StimSequence::new();
    stims.add(Stimulus::voltage(
        0.0,
        1.0,
        StimRegion::Box(BoxRegion::rect(1, 4, 1, n - 1)),
    ));

    let mut trackers = TrackerSequence::new();
    trackers.add(EcgTracker::new(
        vec![DVec3::new(n as f64 / 2.0, n as f64 / 2.0, 10.0)],
        TrackerWindow::every_step(),
    ));

    let mut runner = ModelRunner::new(tissue, model, config);
    runner.set_stim_sequence(stims);
    runner.set_tracker_sequence(trackers);
    runner.run().unwrap();

    let tracker = runner.trackers().get_as::<EcgTracker>(0).unwrap();
    let ecg = &tracker.output()[0];
    assert_eq!(ecg.len(), 1000);

    let max = ecg.iter().cloned().fold(f64::MIN, f64::max);
    let min = ecg.iter().cloned().fold(f64::MAX, f64::min);
    assert!(max > 1e-3, "ECG 正相缺失: {}", max);
    assert!(min < -1e-3, "ECG 负相缺失: {}", min);
}
