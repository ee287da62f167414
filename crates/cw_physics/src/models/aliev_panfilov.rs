// crates/cw_physics/src/models/aliev_panfilov.rs

//! Aliev–Panfilov 双变量唯象模型
//!
//! 单恢复变量 + 三次非线性源项，电压归一化到 [0, 1]，
//! 在保持波传播与折返等基本特征的同时计算量最小。
//!
//! 参考: Aliev & Panfilov, A simple two-variable model of
//! cardiac excitation, Chaos Solitons Fractals 7(3), 1996.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 模型参数（文献默认值）
#[derive(Debug, Clone)]
pub struct AlievPanfilovParams {
    /// 兴奋阈值
    pub a: f64,
    /// 非线性源项强度
    pub k: f64,
    /// 基础恢复速率
    pub eap: f64,
    /// 恢复速率系数
    pub mu_1: f64,
    /// 恢复速率偏移
    pub mu_2: f64,
    /// 电压初值
    pub init_u: f64,
    /// 恢复变量初值
    pub init_v: f64,
}

impl Default for AlievPanfilovParams {
    fn default() -> Self {
        Self {
            a: 0.1,
            k: 8.0,
            eap: 0.01,
            mu_1: 0.2,
            mu_2: 0.3,
            init_u: 0.0,
            init_v: 0.0,
        }
    }
}

/// 单节点状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlievPanfilovNode {
    /// 恢复变量
    pub v: f64,
}

/// Aliev–Panfilov 模型
#[derive(Debug, Clone)]
pub struct AlievPanfilov {
    /// 模型参数
    pub params: AlievPanfilovParams,
    nodes: Vec<AlievPanfilovNode>,
}

impl Default for AlievPanfilov {
    fn default() -> Self {
        Self::new()
    }
}

impl AlievPanfilov {
    /// 使用默认参数创建
    pub fn new() -> Self {
        Self::with_params(AlievPanfilovParams::default())
    }

    /// 使用自定义参数创建
    pub fn with_params(params: AlievPanfilovParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn d_model(&self) -> f64 {
        1.0
    }

    pub(crate) fn rest_potential(&self) -> f64 {
        self.params.init_u
    }

    pub(crate) fn state_var_names(&self) -> &'static [&'static str] {
        &["u", "v"]
    }

    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[AlievPanfilovNode] {
        &self.nodes
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<AlievPanfilovNode>) {
        self.nodes = nodes;
    }

    pub(crate) fn initialize(&mut self, n_nodes: usize) {
        self.nodes = vec![
            AlievPanfilovNode {
                v: self.params.init_v,
            };
            n_nodes
        ];
    }

    pub(crate) fn step_reaction(&mut self, u_new: &mut [f64], u: &[f64], mask: &[bool], dt: f64) {
        let p = &self.params;
        u_new
            .par_iter_mut()
            .zip(self.nodes.par_iter_mut())
            .zip(u.par_iter())
            .zip(mask.par_iter())
            .for_each(|(((u_out, node), &u0), &active)| {
                if !active {
                    return;
                }
                // 恢复变量由旧电压推进
                node.v += -dt
                    * (p.eap + (p.mu_1 * node.v) / (p.mu_2 + u0))
                    * (node.v + p.k * u0 * (u0 - p.a - 1.0));
                // 反应项累加进扩散后的电压
                *u_out += dt * (-p.k * u0 * (u0 - p.a) * (u0 - 1.0) - u0 * node.v);
            });
    }

    pub(crate) fn state_var(&self, name: &str, idx: usize) -> Option<f64> {
        match name {
            "v" => self.nodes.get(idx).map(|n| n.v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 静息态 (u=0, v=0) 是不动点
    #[test]
    fn test_rest_state_is_fixed_point() {
        let mut model = AlievPanfilov::new();
        model.initialize(4);

        let u = vec![0.0; 4];
        let mut u_new = vec![0.0; 4];
        let mask = vec![true; 4];
        for _ in 0..100 {
            model.step_reaction(&mut u_new, &u, &mask, 0.01);
        }
        assert!(u_new.iter().all(|&v| v.abs() < 1e-12));
        assert!(model.nodes.iter().all(|n| n.v.abs() < 1e-12));
    }

    /// 阈上激励产生完整动作电位：上冲接近 1，最终复极回静息
    #[test]
    fn test_single_cell_action_potential() {
        let mut model = AlievPanfilov::new();
        model.initialize(1);
        let mask = vec![true];
        let dt = 0.01;

        let mut u = vec![0.3]; // 阈上初值
        let mut peak = 0.0f64;
        for _ in 0..20_000 {
            let u_old = u.clone();
            model.step_reaction(&mut u, &u_old, &mask, dt);
            peak = peak.max(u[0]);
            assert!(u[0].is_finite());
        }
        assert!(peak > 0.95, "峰值过低: {}", peak);
        assert!(u[0].abs() < 0.05, "未复极: {}", u[0]);
    }
}
