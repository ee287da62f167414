// crates/cw_physics/src/tracker/activation.rs

//! 激活时间观测器
//!
//! 逐节点记录电压首次以上升沿越过阈值的时刻。
//! 未激活节点（含全部非心肌节点）输出保持 NaN。

use std::any::Any;

use cw_foundation::error::CwResult;

use super::{SampleContext, Tracker, TrackerWindow};
use crate::models::CellModel;
use crate::tissue::CardiacTissue;

/// 激活时间观测器
#[derive(Debug, Clone)]
pub struct ActivationTimeTracker {
    /// 采样窗口
    pub window: TrackerWindow,
    /// 激活阈值
    pub threshold: f64,
    output: Vec<f64>,
    prev: Vec<f64>,
}

impl ActivationTimeTracker {
    /// 创建观测器
    pub fn new(threshold: f64, window: TrackerWindow) -> Self {
        Self {
            window,
            threshold,
            output: Vec::new(),
            prev: Vec::new(),
        }
    }

    /// 逐节点激活时刻（未激活为 NaN）
    pub fn output(&self) -> &[f64] {
        &self.output
    }
}

impl Tracker for ActivationTimeTracker {
    fn name(&self) -> &'static str {
        "activation_time"
    }

    fn initialize(&mut self, tissue: &CardiacTissue, model: &CellModel, _dt: f64) -> CwResult<()> {
        self.output = vec![f64::NAN; tissue.n_nodes()];
        // 上升沿基线取静息电位
        self.prev = vec![model.rest_potential(); tissue.n_nodes()];
        self.window.reset();
        Ok(())
    }

    fn sample(&mut self, ctx: &SampleContext<'_>) {
        if !self.window.is_active(ctx.step, ctx.time) {
            return;
        }
        for (idx, (&u, out)) in ctx.u.iter().zip(self.output.iter_mut()).enumerate() {
            let prev = self.prev[idx];
            if out.is_nan() && prev < self.threshold && u >= self.threshold {
                *out = ctx.time;
            }
            self.prev[idx] = u;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
