// crates/cw_physics/src/tracker/action_potential.rs

//! 动作电位观测器
//!
//! 在一个或多个固定节点上记录完整的电压时间序列。

use std::any::Any;

use cw_foundation::error::{CwError, CwResult};

use super::{SampleContext, Tracker, TrackerWindow};
use crate::models::CellModel;
use crate::tissue::CardiacTissue;

/// 动作电位观测器
#[derive(Debug, Clone)]
pub struct ActionPotentialTracker {
    /// 采样窗口
    pub window: TrackerWindow,
    cells: Vec<usize>,
    output: Vec<Vec<f64>>,
}

impl ActionPotentialTracker {
    /// 创建观测器，`cells` 为待测节点的扁平下标
    pub fn new(cells: Vec<usize>, window: TrackerWindow) -> Self {
        Self {
            window,
            cells,
            output: Vec::new(),
        }
    }

    /// 待测节点下标
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// 每个待测节点的电压序列
    pub fn output(&self) -> &[Vec<f64>] {
        &self.output
    }
}

impl Tracker for ActionPotentialTracker {
    fn name(&self) -> &'static str {
        "action_potential"
    }

    fn initialize(&mut self, tissue: &CardiacTissue, _model: &CellModel, _dt: f64) -> CwResult<()> {
        // 越界下标在装配阶段报错，不静默采错节点
        for &idx in &self.cells {
            if idx >= tissue.n_nodes() {
                return Err(CwError::IndexOutOfRange {
                    name: "cell_index",
                    index: idx,
                    limit: tissue.n_nodes(),
                });
            }
        }
        self.output = vec![Vec::new(); self.cells.len()];
        self.window.reset();
        Ok(())
    }

    fn sample(&mut self, ctx: &SampleContext<'_>) {
        if !self.window.is_active(ctx.step, ctx.time) {
            return;
        }
        for (series, &idx) in self.output.iter_mut().zip(&self.cells) {
            series.push(ctx.u[idx]);
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
    fn test_out_of_range_cell_rejected() {
        let tissue = CardiacTissue::uniform_2d(5, 5);
        let model = CellModel::AlievPanfilov(AlievPanfilov::new());
        let mut tracker = ActionPotentialTracker::new(vec![999], TrackerWindow::every_step());
        assert!(tracker.initialize(&tissue, &model, 0.01).is_err());
    }

    #[test]
    fn test_series_follows_step_interval() {
        let tissue = CardiacTissue::uniform_2d(5, 5);
        let model = CellModel::AlievPanfilov(AlievPanfilov::new());
        let idx = tissue.shape.index2(2, 2);
        let mut tracker =
            ActionPotentialTracker::new(vec![idx], TrackerWindow::new(0.0, f64::INFINITY, 2));
        tracker.initialize(&tissue, &model, 1.0).unwrap();

        let mut u = vec![0.0; tissue.n_nodes()];
        for step in 0..6 {
            u[idx] = step as f64;
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
        // 步距 2 → 采样步 {0,2,4}
        assert_eq!(tracker.output()[0], vec![0.0, 2.0, 4.0]);
    }
}
