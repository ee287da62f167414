// crates/cw_physics/src/tracker/period.rs

//! 周期观测器
//!
//! 在若干探测节点上记录相邻两次激活（上升沿越阈）之间的
//! 时间间隔，用于测量螺旋波等再入活动的周期。

use std::any::Any;

use cw_foundation::error::{CwError, CwResult};

use super::{SampleContext, Tracker, TrackerWindow};
use crate::models::CellModel;
use crate::tissue::CardiacTissue;

/// 周期观测器
#[derive(Debug, Clone)]
pub struct PeriodTracker {
    /// 采样窗口
    pub window: TrackerWindow,
    /// 激活阈值
    pub threshold: f64,
    detectors: Vec<usize>,
    prev: Vec<f64>,
    last_activation: Vec<f64>,
    output: Vec<Vec<f64>>,
}

impl PeriodTracker {
    /// 创建观测器，`detectors` 为探测节点的扁平下标
    pub fn new(detectors: Vec<usize>, threshold: f64, window: TrackerWindow) -> Self {
        Self {
            window,
            threshold,
            detectors,
            prev: Vec::new(),
            last_activation: Vec::new(),
            output: Vec::new(),
        }
    }

    /// 每个探测节点的激活间隔序列
    pub fn output(&self) -> &[Vec<f64>] {
        &self.output
    }
}

impl Tracker for PeriodTracker {
    fn name(&self) -> &'static str {
        "period"
    }

    fn initialize(&mut self, tissue: &CardiacTissue, model: &CellModel, _dt: f64) -> CwResult<()> {
        for &idx in &self.detectors {
            if idx >= tissue.n_nodes() {
                return Err(CwError::IndexOutOfRange {
                    name: "detector_index",
                    index: idx,
                    limit: tissue.n_nodes(),
                });
            }
        }
        let n = self.detectors.len();
        self.prev = vec![model.rest_potential(); n];
        self.last_activation = vec![f64::NAN; n];
        self.output = vec![Vec::new(); n];
        self.window.reset();
        Ok(())
    }

    fn sample(&mut self, ctx: &SampleContext<'_>) {
        if !self.window.is_active(ctx.step, ctx.time) {
            return;
        }
        for (d, &idx) in self.detectors.iter().enumerate() {
            let u = ctx.u[idx];
            if self.prev[d] < self.threshold && u >= self.threshold {
                let last = self.last_activation[d];
                if !last.is_nan() {
                    self.output[d].push(ctx.time - last);
                }
                self.last_activation[d] = ctx.time;
            }
            self.prev[d] = u;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlievPanfilov;

    #[test]
    fn test_intervals_between_crossings() {
        let tissue = CardiacTissue::uniform_2d(5, 5);
        let model = CellModel::AlievPanfilov(AlievPanfilov::new());
        let idx = tissue.shape.index2(2, 2);
        let mut tracker = PeriodTracker::new(vec![idx], 0.5, TrackerWindow::every_step());
        tracker.initialize(&tissue, &model, 1.0).unwrap();

        let mut u = vec![0.0; tissue.n_nodes()];
        // 周期 4 的方波: 在 t=1,5,9 上冲
        for step in 0..12usize {
            u[idx] = if step % 4 == 1 || step % 4 == 2 { 1.0 } else { 0.0 };
            let ctx = SampleContext {
                step,
                time: step as f64,
                dt: 1.0,
                dr: 0.25,
                u: &u,
                model: &model,
                tissue: &tissue,
            };
            tracker.sample(&ctx);
        }
        assert_eq!(tracker.output()[0], vec![4.0, 4.0]);
    }
}
