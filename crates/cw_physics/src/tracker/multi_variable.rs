// crates/cw_physics/src/tracker/multi_variable.rs

//! 多变量观测器
//!
//! 在单个节点上记录若干命名状态变量（含电压 `u`）的
//! 时间序列，输出按变量名索引。

use std::any::Any;
use std::collections::HashMap;

use cw_foundation::error::{CwError, CwResult};

use super::{SampleContext, Tracker, TrackerWindow};
use crate::models::CellModel;
use crate::tissue::CardiacTissue;

/// 多变量观测器
#[derive(Debug, Clone)]
pub struct MultiVariableTracker {
    /// 采样窗口
    pub window: TrackerWindow,
    cell: usize,
    var_names: Vec<String>,
    output: HashMap<String, Vec<f64>>,
}

impl MultiVariableTracker {
    /// 创建观测器，`cell` 为待测节点扁平下标
    pub fn new(cell: usize, var_names: Vec<String>, window: TrackerWindow) -> Self {
        Self {
            window,
            cell,
            var_names,
            output: HashMap::new(),
        }
    }

    /// 按变量名取时间序列
    pub fn output(&self, name: &str) -> Option<&[f64]> {
        self.output.get(name).map(|v| v.as_slice())
    }
}

impl Tracker for MultiVariableTracker {
    fn name(&self) -> &'static str {
        "multi_variable"
    }

    fn initialize(&mut self, tissue: &CardiacTissue, model: &CellModel, _dt: f64) -> CwResult<()> {
        if self.cell >= tissue.n_nodes() {
            return Err(CwError::IndexOutOfRange {
                name: "cell_index",
                index: self.cell,
                limit: tissue.n_nodes(),
            });
        }
        for name in &self.var_names {
            if !model.state_var_names().contains(&name.as_str()) {
                return Err(CwError::config(format!(
                    "模型 {} 没有状态变量 '{}'",
                    model.kind(),
                    name
                )));
            }
        }
        self.output = self
            .var_names
            .iter()
            .map(|n| (n.clone(), Vec::new()))
            .collect();
        self.window.reset();
        Ok(())
    }

    fn sample(&mut self, ctx: &SampleContext<'_>) {
        if !self.window.is_active(ctx.step, ctx.time) {
            return;
        }
        for name in &self.var_names {
            let value = if name == "u" {
                ctx.u[self.cell]
            } else {
                match ctx.model.state_var(name, self.cell) {
                    Some(v) => v,
                    None => continue,
                }
            };
            if let Some(series) = self.output.get_mut(name) {
                series.push(value);
            }
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
    fn test_unknown_variable_rejected() {
        let tissue = CardiacTissue::uniform_2d(5, 5);
        let model = CellModel::AlievPanfilov(AlievPanfilov::new());
        let mut tracker = MultiVariableTracker::new(
            tissue.shape.index2(2, 2),
            vec!["cai".to_string()],
            TrackerWindow::every_step(),
        );
        assert!(tracker.initialize(&tissue, &model, 0.01).is_err());
    }

    #[test]
    fn test_tracks_voltage_and_gate() {
        let tissue = CardiacTissue::uniform_2d(5, 5);
        let mut ap = AlievPanfilov::new();
        ap.initialize(tissue.n_nodes());
        let model = CellModel::AlievPanfilov(ap);

        let idx = tissue.shape.index2(2, 2);
        let mut tracker = MultiVariableTracker::new(
            idx,
            vec!["u".to_string(), "v".to_string()],
            TrackerWindow::every_step(),
        );
        tracker.initialize(&tissue, &model, 0.01).unwrap();

        let mut u = vec![0.0; tissue.n_nodes()];
        u[idx] = 0.7;
        let ctx = SampleContext {
            step: 0,
            time: 0.0,
            dt: 0.01,
            dr: 0.25,
            u: &u,
            model: &model,
            tissue: &tissue,
        };
        tracker.sample(&ctx);

        assert_eq!(tracker.output("u").unwrap(), &[0.7]);
        assert_eq!(tracker.output("v").unwrap(), &[0.0]);
    }
}
