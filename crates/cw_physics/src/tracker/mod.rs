// crates/cw_physics/src/tracker/mod.rs

//! 观测器引擎
//!
//! 被动观测器的有序集合。主循环在反应子步之后、时钟推进
//! 之前按插入顺序调用一次 [`TrackerSequence::sample`]；
//! 每个观测器根据自己的时间窗与步距独立决定是否采样，
//! 只读访问场数据，在自身累加器上派生输出。
//!
//! 观测器绝不修改共享仿真场——[`SampleContext`] 只暴露
//! 不可变引用，违反该约束在类型层面即不可能。
//!
//! # 采样窗口规则
//!
//! 窗口 `[start_time, end_time]` 内、且自首个活跃步起每隔
//! `step_interval` 步采样一次。例如 `dt=1`、窗口 `[5, 10]`、
//! 步距 2 时采样步恰为 {5, 7, 9}，无差一错位。

mod action_potential;
mod activation;
mod ecg;
mod multi_variable;
mod period;

pub use action_potential::ActionPotentialTracker;
pub use activation::ActivationTimeTracker;
pub use ecg::EcgTracker;
pub use multi_variable::MultiVariableTracker;
pub use period::PeriodTracker;

use std::any::Any;

use cw_foundation::error::CwResult;
use cw_foundation::float::{ge_within, le_within};

use crate::models::CellModel;
use crate::tissue::CardiacTissue;

/// 一次采样可见的只读上下文
#[derive(Clone, Copy)]
pub struct SampleContext<'a> {
    /// 当前步号（从 0 起）
    pub step: usize,
    /// 当前模拟时刻
    pub time: f64,
    /// 时间步长
    pub dt: f64,
    /// 空间步长
    pub dr: f64,
    /// 电压场
    pub u: &'a [f64],
    /// 细胞模型（门控变量只读访问）
    pub model: &'a CellModel,
    /// 组织几何
    pub tissue: &'a CardiacTissue,
}

/// 观测器接口
pub trait Tracker: Send {
    /// 观测器名称（日志与诊断用）
    fn name(&self) -> &'static str;

    /// 运行前初始化：解析下标、分配累加器
    fn initialize(&mut self, tissue: &CardiacTissue, model: &CellModel, dt: f64) -> CwResult<()>;

    /// 每步调用一次；是否真正采样由观测器自行判断
    fn sample(&mut self, ctx: &SampleContext<'_>);

    /// 向下转型入口，用于取回具体观测器的输出
    fn as_any(&self) -> &dyn Any;
}

/// 采样时间窗
#[derive(Debug, Clone)]
pub struct TrackerWindow {
    /// 窗口起始时刻
    pub start_time: f64,
    /// 窗口结束时刻（含）
    pub end_time: f64,
    /// 采样步距
    pub step_interval: usize,
    first_active_step: Option<usize>,
}

impl Default for TrackerWindow {
    fn default() -> Self {
        Self::every_step()
    }
}

impl TrackerWindow {
    /// 自定义窗口
    pub fn new(start_time: f64, end_time: f64, step_interval: usize) -> Self {
        Self {
            start_time,
            end_time,
            step_interval: step_interval.max(1),
            first_active_step: None,
        }
    }

    /// 全程每步采样
    pub fn every_step() -> Self {
        Self {
            start_time: 0.0,
            end_time: f64::INFINITY,
            step_interval: 1,
            first_active_step: None,
        }
    }

    /// 重置活跃状态（重新初始化时调用）
    pub fn reset(&mut self) {
        self.first_active_step = None;
    }

    /// 判断当前 (step, time) 是否采样
    ///
    /// 步距从首个落入窗口的步起计数。
    pub fn is_active(&mut self, step: usize, time: f64) -> bool {
        if !ge_within(time, self.start_time) || !le_within(time, self.end_time) {
            return false;
        }
        let first = *self.first_active_step.get_or_insert(step);
        (step - first) % self.step_interval == 0
    }
}

/// 观测器序列
#[derive(Default)]
pub struct TrackerSequence {
    trackers: Vec<Box<dyn Tracker>>,
}

impl TrackerSequence {
    /// 创建空序列
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加观测器
    pub fn add<T: Tracker + 'static>(&mut self, tracker: T) {
        self.trackers.push(Box::new(tracker));
    }

    /// 观测器数量
    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// 初始化全部观测器
    pub fn initialize(
        &mut self,
        tissue: &CardiacTissue,
        model: &CellModel,
        dt: f64,
    ) -> CwResult<()> {
        for tracker in &mut self.trackers {
            tracker.initialize(tissue, model, dt)?;
        }
        Ok(())
    }

    /// 按插入顺序采样
    pub fn sample(&mut self, ctx: &SampleContext<'_>) {
        for tracker in &mut self.trackers {
            tracker.sample(ctx);
        }
    }

    /// 按下标取观测器
    pub fn get(&self, idx: usize) -> Option<&dyn Tracker> {
        self.trackers.get(idx).map(|b| b.as_ref())
    }

    /// 按下标取具体类型的观测器
    pub fn get_as<T: 'static>(&self, idx: usize) -> Option<&T> {
        self.trackers.get(idx)?.as_any().downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_rule_exact_sample_steps() {
        // dt=1, 窗口 [5,10], 步距 2 → 采样步 {5,7,9}
        let mut window = TrackerWindow::new(5.0, 10.0, 2);
        let dt = 1.0;
        let sampled: Vec<usize> = (0..20)
            .filter(|&step| window.is_active(step, step as f64 * dt))
            .collect();
        assert_eq!(sampled, vec![5, 7, 9]);
    }

    #[test]
    fn test_window_every_step() {
        let mut window = TrackerWindow::every_step();
        let sampled: Vec<usize> = (0..5)
            .filter(|&step| window.is_active(step, step as f64 * 0.1))
            .collect();
        assert_eq!(sampled, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_window_interval_counts_from_first_active() {
        // 窗口从 t=0.3 开始，dt=0.1 → 首个活跃步 3，步距 3 → {3,6,9}
        let mut window = TrackerWindow::new(0.3, 1.0, 3);
        let sampled: Vec<usize> = (0..12)
            .filter(|&step| window.is_active(step, step as f64 * 0.1))
            .collect();
        assert_eq!(sampled, vec![3, 6, 9]);
    }

    #[test]
    fn test_window_reset() {
        let mut window = TrackerWindow::new(0.0, 10.0, 2);
        assert!(window.is_active(4, 4.0));
        window.reset();
        // 重置后从新的首个活跃步重新计数
        assert!(window.is_active(5, 5.0));
        assert!(!window.is_active(6, 6.0));
    }
}
