// crates/cw_physics/src/models/bueno_orovio.rs

//! Bueno–Orovio 四变量最小模型
//!
//! 在 Fenton–Karma 基础上增加第二恢复变量 `s`，可定量复现
//! 人心室动作电位形态与恢复特性。默认取心外膜（EPI）
//! 参数集。
//!
//! 参考: Bueno-Orovio, Cherry & Fenton, Minimal model for
//! human ventricular action potentials in tissue,
//! J Theor Biol 253, 2008.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::rush_larsen;

/// 模型参数（EPI 参数集）
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct BuenoOrovioParams {
    pub u_o: f64,
    pub u_u: f64,
    pub theta_v: f64,
    pub theta_w: f64,
    pub theta_v_minus: f64,
    pub theta_o: f64,
    pub tau_v1_minus: f64,
    pub tau_v2_minus: f64,
    pub tau_v_plus: f64,
    pub tau_w1_minus: f64,
    pub tau_w2_minus: f64,
    pub k_w_minus: f64,
    pub u_w_minus: f64,
    pub tau_w_plus: f64,
    pub tau_fi: f64,
    pub tau_o1: f64,
    pub tau_o2: f64,
    pub tau_so1: f64,
    pub tau_so2: f64,
    pub k_so: f64,
    pub u_so: f64,
    pub tau_s1: f64,
    pub tau_s2: f64,
    pub k_s: f64,
    pub u_s: f64,
    pub tau_si: f64,
    pub tau_w_inf: f64,
    pub w_inf_star: f64,
    pub init_u: f64,
    pub init_v: f64,
    pub init_w: f64,
    pub init_s: f64,
}

impl Default for BuenoOrovioParams {
    fn default() -> Self {
        Self {
            u_o: 0.0,
            u_u: 1.55,
            theta_v: 0.3,
            theta_w: 0.13,
            theta_v_minus: 0.006,
            theta_o: 0.006,
            tau_v1_minus: 60.0,
            tau_v2_minus: 1150.0,
            tau_v_plus: 1.4506,
            tau_w1_minus: 60.0,
            tau_w2_minus: 15.0,
            k_w_minus: 65.0,
            u_w_minus: 0.03,
            tau_w_plus: 200.0,
            tau_fi: 0.11,
            tau_o1: 400.0,
            tau_o2: 6.0,
            tau_so1: 30.0181,
            tau_so2: 0.9957,
            k_so: 2.0458,
            u_so: 0.65,
            tau_s1: 2.7342,
            tau_s2: 16.0,
            k_s: 2.0994,
            u_s: 0.9087,
            tau_si: 1.8875,
            tau_w_inf: 0.07,
            w_inf_star: 0.94,
            init_u: 0.0,
            init_v: 1.0,
            init_w: 1.0,
            init_s: 0.0,
        }
    }
}

/// 单节点状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BuenoOrovioNode {
    /// 快门控
    pub v: f64,
    /// 慢门控
    pub w: f64,
    /// 第二恢复变量
    pub s: f64,
}

/// Bueno–Orovio 模型
#[derive(Debug, Clone)]
pub struct BuenoOrovio {
    /// 模型参数
    pub params: BuenoOrovioParams,
    nodes: Vec<BuenoOrovioNode>,
}

impl Default for BuenoOrovio {
    fn default() -> Self {
        Self::new()
    }
}

impl BuenoOrovio {
    /// 使用默认参数创建
    pub fn new() -> Self {
        Self::with_params(BuenoOrovioParams::default())
    }

    /// 使用自定义参数创建
    pub fn with_params(params: BuenoOrovioParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn d_model(&self) -> f64 {
        // 文献值 1.171 cm²/s
        1.171
    }

    pub(crate) fn rest_potential(&self) -> f64 {
        self.params.init_u
    }

    pub(crate) fn state_var_names(&self) -> &'static [&'static str] {
        &["u", "v", "w", "s"]
    }

    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[BuenoOrovioNode] {
        &self.nodes
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<BuenoOrovioNode>) {
        self.nodes = nodes;
    }

    pub(crate) fn initialize(&mut self, n_nodes: usize) {
        self.nodes = vec![
            BuenoOrovioNode {
                v: self.params.init_v,
                w: self.params.init_w,
                s: self.params.init_s,
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

                // 电压相关时间常数与稳态
                let tau_v_minus = if u0 >= p.theta_v_minus {
                    p.tau_v2_minus
                } else {
                    p.tau_v1_minus
                };
                let tau_w_minus = p.tau_w1_minus
                    + (p.tau_w2_minus - p.tau_w1_minus)
                        * (1.0 + (p.k_w_minus * (u0 - p.u_w_minus)).tanh())
                        / 2.0;
                let tau_so = p.tau_so1
                    + (p.tau_so2 - p.tau_so1) * (1.0 + (p.k_so * (u0 - p.u_so)).tanh()) / 2.0;
                let tau_s = if u0 >= p.theta_w { p.tau_s2 } else { p.tau_s1 };
                let tau_o = if u0 >= p.theta_o { p.tau_o2 } else { p.tau_o1 };

                let v_inf = if u0 < p.theta_v_minus { 1.0 } else { 0.0 };
                let w_inf = if u0 < p.theta_o {
                    1.0 - u0 / p.tau_w_inf
                } else {
                    p.w_inf_star
                };

                // 门控：v/w 前向 Euler，s 用指数更新（线性弛豫闭式解）
                if u0 >= p.theta_v {
                    node.v += -dt * node.v / p.tau_v_plus;
                } else {
                    node.v += dt * (v_inf - node.v) / tau_v_minus;
                }
                if u0 >= p.theta_w {
                    node.w += -dt * node.w / p.tau_w_plus;
                } else {
                    node.w += dt * (w_inf - node.w) / tau_w_minus;
                }
                let s_inf = (1.0 + (p.k_s * (u0 - p.u_s)).tanh()) / 2.0;
                node.s = rush_larsen(node.s, s_inf, tau_s, dt);

                // 三股电流
                let j_fi = if u0 >= p.theta_v {
                    -node.v * (u0 - p.theta_v) * (p.u_u - u0) / p.tau_fi
                } else {
                    0.0
                };
                let j_so = if u0 >= p.theta_w {
                    1.0 / tau_so
                } else {
                    (u0 - p.u_o) / tau_o
                };
                let j_si = if u0 >= p.theta_w {
                    -node.w * node.s / p.tau_si
                } else {
                    0.0
                };

                *u_out += -dt * (j_fi + j_so + j_si);
            });
    }

    pub(crate) fn state_var(&self, name: &str, idx: usize) -> Option<f64> {
        let node = self.nodes.get(idx)?;
        match name {
            "v" => Some(node.v),
            "w" => Some(node.w),
            "s" => Some(node.s),
            _ => None,
        }
    }
}
