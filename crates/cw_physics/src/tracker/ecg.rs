// crates/cw_physics/src/tracker/ecg.rs

//! 伪 ECG 观测器
//!
//! 以无限均匀容积导体近似计算电极处的远场电位：
//! ```text
//! φ(e) = Σ_n ∇²u(n) / r(n, e)
//! ```
//! 其中拉普拉斯项只对心肌-心肌节点对计算（与扩散算子的
//! 无通量边界一致），距离按节点间距 `dr` 换算。
//! 每个电极得到一条时间序列。

use std::any::Any;

use cw_foundation::error::CwResult;
use cw_foundation::float::safe_div;
use glam::DVec3;

use super::{SampleContext, Tracker, TrackerWindow};
use crate::models::CellModel;
use crate::tissue::CardiacTissue;

/// 伪 ECG 观测器
#[derive(Debug, Clone)]
pub struct EcgTracker {
    /// 采样窗口
    pub window: TrackerWindow,
    /// 电极位置（节点坐标单位，可含离面高度）
    electrodes: Vec<DVec3>,
    /// 预计算的心肌节点列表
    myo_nodes: Vec<usize>,
    /// 每电极对每个心肌节点的 1/r
    inv_r: Vec<Vec<f64>>,
    output: Vec<Vec<f64>>,
}

impl EcgTracker {
    /// 创建观测器
    pub fn new(electrodes: Vec<DVec3>, window: TrackerWindow) -> Self {
        Self {
            window,
            electrodes,
            myo_nodes: Vec::new(),
            inv_r: Vec::new(),
            output: Vec::new(),
        }
    }

    /// 每个电极的伪 ECG 序列
    pub fn output(&self) -> &[Vec<f64>] {
        &self.output
    }
}

impl Tracker for EcgTracker {
    fn name(&self) -> &'static str {
        "ecg"
    }

    fn initialize(&mut self, tissue: &CardiacTissue, _model: &CellModel, _dt: f64) -> CwResult<()> {
        self.myo_nodes = tissue.myocyte_indexes();
        self.inv_r = self
            .electrodes
            .iter()
            .map(|e| {
                self.myo_nodes
                    .iter()
                    .map(|&idx| {
                        let (i, j, k) = tissue.shape.coords_of(idx);
                        let pos = DVec3::new(i as f64, j as f64, k as f64);
                        // 电极落在节点上时该节点贡献置零
                        safe_div(1.0, (pos - *e).length(), 1e-6)
                    })
                    .collect()
            })
            .collect();
        self.output = vec![Vec::new(); self.electrodes.len()];
        self.window.reset();
        Ok(())
    }

    fn sample(&mut self, ctx: &SampleContext<'_>) {
        if !self.window.is_active(ctx.step, ctx.time) {
            return;
        }

        // 心肌内部的轴向拉普拉斯（非心肌邻居按无通量跳过）
        let shape = ctx.tissue.shape;
        let (_, nj, nk) = shape.dims();
        let axis_offsets: [isize; 3] = [(nj * nk) as isize, nk as isize, 1];
        let n_axes = shape.ndim();

        let lap: Vec<f64> = self
            .myo_nodes
            .iter()
            .map(|&idx| {
                let mut acc = 0.0;
                for &off in axis_offsets.iter().take(n_axes) {
                    for nb in [idx as isize - off, idx as isize + off] {
                        let nb = nb as usize;
                        if ctx.tissue.is_myocyte(nb) {
                            acc += ctx.u[nb] - ctx.u[idx];
                        }
                    }
                }
                acc
            })
            .collect();

        let inv_dr = 1.0 / ctx.dr;
        for (e, series) in self.output.iter_mut().enumerate() {
            let phi: f64 = lap
                .iter()
                .zip(&self.inv_r[e])
                .map(|(l, ir)| l * ir)
                .sum();
            series.push(phi * inv_dr);
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

    /// 均匀场的拉普拉斯为零 → ECG 为零
    #[test]
    fn test_uniform_field_gives_zero() {
        let tissue = CardiacTissue::uniform_2d(8, 8);
        let model = CellModel::AlievPanfilov(AlievPanfilov::new());
        let mut tracker = EcgTracker::new(
            vec![DVec3::new(4.0, 4.0, 10.0)],
            TrackerWindow::every_step(),
        );
        tracker.initialize(&tissue, &model, 0.01).unwrap();

        let u = vec![0.7; tissue.n_nodes()];
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
        assert!(tracker.output()[0][0].abs() < 1e-12);
    }

    /// 波前经过时信号非零且随距离衰减
    #[test]
    fn test_wavefront_produces_signal() {
        let tissue = CardiacTissue::uniform_2d(10, 10);
        let model = CellModel::AlievPanfilov(AlievPanfilov::new());
        let near = DVec3::new(5.0, 5.0, 1.0);
        let far = DVec3::new(5.0, 5.0, 50.0);
        let mut tracker = EcgTracker::new(vec![near, far], TrackerWindow::every_step());
        tracker.initialize(&tissue, &model, 0.01).unwrap();

        // 左半平面激活的阶跃场
        let mut u = vec![0.0; tissue.n_nodes()];
        for i in 1..5 {
            for j in 1..9 {
                u[tissue.shape.index2(i, j)] = 1.0;
            }
        }
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

        let near_signal = tracker.output()[0][0].abs();
        let far_signal = tracker.output()[1][0].abs();
        assert!(near_signal > 0.0);
        assert!(far_signal < near_signal);
    }
}
