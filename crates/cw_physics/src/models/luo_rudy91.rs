// crates/cw_physics/src/models/luo_rudy91.rs

//! Luo–Rudy 1991 心室离子模型
//!
//! 六个 Hodgkin–Huxley 门控 + 胞内钙浓度，电压单位 mV，
//! 时间单位 ms。所有门控用 Rush–Larsen 指数更新。
//!
//! 参考: Luo & Rudy, A model of the ventricular cardiac
//! action potential, Circ Res 68, 1991.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::rush_larsen;

/// 模型参数（文献默认值）
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct LuoRudy91Params {
    /// 快钠电导 [mS/cm²]
    pub gna: f64,
    /// 慢内向（钙）电导
    pub gsi: f64,
    /// 时变钾电导基准
    pub gk: f64,
    /// 内向整流钾电导
    pub gk1: f64,
    /// 平台钾电导
    pub gkp: f64,
    /// 背景电导
    pub gb: f64,
    /// 胞外钾浓度 [mM]
    pub ko: f64,
    /// 胞内钾浓度 [mM]
    pub ki: f64,
    /// 胞外钠浓度 [mM]
    pub nao: f64,
    /// 胞内钠浓度 [mM]
    pub nai: f64,
    /// Na/K 通透比
    pub pr_nak: f64,
    pub init_u: f64,
    pub init_m: f64,
    pub init_h: f64,
    pub init_j: f64,
    pub init_d: f64,
    pub init_f: f64,
    pub init_x: f64,
    pub init_cai: f64,
}

impl Default for LuoRudy91Params {
    fn default() -> Self {
        Self {
            gna: 23.0,
            gsi: 0.09,
            gk: 0.282,
            gk1: 0.6047,
            gkp: 0.0183,
            gb: 0.03921,
            ko: 5.4,
            ki: 145.0,
            nao: 140.0,
            nai: 18.0,
            pr_nak: 0.01833,
            init_u: -84.5,
            init_m: 0.0017,
            init_h: 0.9832,
            init_j: 0.9945,
            init_d: 3.0e-6,
            init_f: 1.0,
            init_x: 0.0057,
            init_cai: 2.0e-4,
        }
    }
}

/// 单节点状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct LuoRudy91Node {
    pub m: f64,
    pub h: f64,
    pub j: f64,
    pub d: f64,
    pub f: f64,
    pub x: f64,
    pub cai: f64,
}

/// Luo–Rudy 1991 模型
#[derive(Debug, Clone)]
pub struct LuoRudy91 {
    /// 模型参数
    pub params: LuoRudy91Params,
    nodes: Vec<LuoRudy91Node>,
}

impl Default for LuoRudy91 {
    fn default() -> Self {
        Self::new()
    }
}

const RTONF: f64 = 26.71376;

impl LuoRudy91 {
    /// 使用默认参数创建
    pub fn new() -> Self {
        Self::with_params(LuoRudy91Params::default())
    }

    /// 使用自定义参数创建
    pub fn with_params(params: LuoRudy91Params) -> Self {
        Self {
            params,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn d_model(&self) -> f64 {
        0.1
    }

    pub(crate) fn rest_potential(&self) -> f64 {
        self.params.init_u
    }

    pub(crate) fn state_var_names(&self) -> &'static [&'static str] {
        &["u", "m", "h", "j", "d", "f", "x", "cai"]
    }

    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[LuoRudy91Node] {
        &self.nodes
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<LuoRudy91Node>) {
        self.nodes = nodes;
    }

    pub(crate) fn initialize(&mut self, n_nodes: usize) {
        let p = &self.params;
        self.nodes = vec![
            LuoRudy91Node {
                m: p.init_m,
                h: p.init_h,
                j: p.init_j,
                d: p.init_d,
                f: p.init_f,
                x: p.init_x,
                cai: p.init_cai,
            };
            n_nodes
        ];
    }

    pub(crate) fn step_reaction(&mut self, u_new: &mut [f64], u: &[f64], mask: &[bool], dt: f64) {
        let p = self.params.clone();
        let ena = RTONF * (p.nao / p.nai).ln();
        let ek = RTONF * ((p.ko + p.pr_nak * p.nao) / (p.ki + p.pr_nak * p.nai)).ln();
        let ek1 = RTONF * (p.ko / p.ki).ln();
        let gk_eff = p.gk * (p.ko / 5.4).sqrt();

        u_new
            .par_iter_mut()
            .zip(self.nodes.par_iter_mut())
            .zip(u.par_iter())
            .zip(mask.par_iter())
            .for_each(|(((u_out, node), &v), &active)| {
                if !active {
                    return;
                }

                // 钠门控速率
                let dm = v + 47.13;
                let alpha_m = if dm.abs() < 1e-7 {
                    // 0/0 可去奇点的极限值
                    3.2
                } else {
                    0.32 * dm / (1.0 - (-0.1 * dm).exp())
                };
                let beta_m = 0.08 * (-v / 11.0).exp();

                let (alpha_h, beta_h, alpha_j, beta_j) = if v >= -40.0 {
                    (
                        0.0,
                        1.0 / (0.13 * (1.0 + (-(v + 10.66) / 11.1).exp())),
                        0.0,
                        0.3 * (-2.535e-7 * v).exp() / (1.0 + (-0.1 * (v + 32.0)).exp()),
                    )
                } else {
                    (
                        0.135 * (-(80.0 + v) / 6.8).exp(),
                        3.56 * (0.079 * v).exp() + 3.1e5 * (0.35 * v).exp(),
                        (-1.2714e5 * (0.2444 * v).exp() - 3.474e-5 * (-0.04391 * v).exp())
                            * (v + 37.78)
                            / (1.0 + (0.311 * (v + 79.23)).exp()),
                        0.1212 * (-0.01052 * v).exp() / (1.0 + (-0.1378 * (v + 40.14)).exp()),
                    )
                };

                // 慢内向电流门控
                let alpha_d = 0.095 * (-0.01 * (v - 5.0)).exp()
                    / (1.0 + (-0.072 * (v - 5.0)).exp());
                let beta_d = 0.07 * (-0.017 * (v + 44.0)).exp()
                    / (1.0 + (0.05 * (v + 44.0)).exp());
                let alpha_f = 0.012 * (-0.008 * (v + 28.0)).exp()
                    / (1.0 + (0.15 * (v + 28.0)).exp());
                let beta_f = 0.0065 * (-0.02 * (v + 30.0)).exp()
                    / (1.0 + (-0.2 * (v + 30.0)).exp());

                // 时变钾电流门控
                let alpha_x = 0.0005 * (0.083 * (v + 50.0)).exp()
                    / (1.0 + (0.057 * (v + 50.0)).exp());
                let beta_x = 0.0013 * (-0.06 * (v + 20.0)).exp()
                    / (1.0 + (-0.04 * (v + 20.0)).exp());

                // Rush–Larsen 更新全部门控
                let update = |x: f64, a: f64, b: f64| {
                    let tau = 1.0 / (a + b);
                    rush_larsen(x, a * tau, tau, dt)
                };
                node.m = update(node.m, alpha_m, beta_m);
                node.h = update(node.h, alpha_h, beta_h);
                node.j = update(node.j, alpha_j, beta_j);
                node.d = update(node.d, alpha_d, beta_d);
                node.f = update(node.f, alpha_f, beta_f);
                node.x = update(node.x, alpha_x, beta_x);

                // 膜电流
                let ina = p.gna * node.m * node.m * node.m * node.h * node.j * (v - ena);

                let esi = 7.7 - 13.0287 * node.cai.ln();
                let isi = p.gsi * node.d * node.f * (v - esi);
                node.cai += dt * (-1.0e-4 * isi + 0.07 * (1.0e-4 - node.cai));

                let xi = if v > -100.0 {
                    2.837 * ((0.04 * (v + 77.0)).exp() - 1.0)
                        / ((v + 77.0) * (0.04 * (v + 35.0)).exp())
                } else {
                    1.0
                };
                let ik = gk_eff * node.x * xi * (v - ek);

                let ak1 = 1.02 / (1.0 + (0.2385 * (v - ek1 - 59.215)).exp());
                let bk1 = (0.49124 * (0.08032 * (v - ek1 + 5.476)).exp()
                    + (0.06175 * (v - ek1 - 594.31)).exp())
                    / (1.0 + (-0.5143 * (v - ek1 + 4.753)).exp());
                let ik1 = p.gk1 * (ak1 / (ak1 + bk1)) * (v - ek1);

                let kp = 1.0 / (1.0 + ((7.488 - v) / 5.98).exp());
                let ikp = p.gkp * kp * (v - ek1);

                let ib = p.gb * (v + 59.87);

                *u_out -= dt * (ina + isi + ik + ik1 + ikp + ib);
            });
    }

    pub(crate) fn state_var(&self, name: &str, idx: usize) -> Option<f64> {
        let node = self.nodes.get(idx)?;
        match name {
            "m" => Some(node.m),
            "h" => Some(node.h),
            "j" => Some(node.j),
            "d" => Some(node.d),
            "f" => Some(node.f),
            "x" => Some(node.x),
            "cai" => Some(node.cai),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 静息电位附近长时间积分不漂移出生理范围
    #[test]
    fn test_rest_state_stays_polarized() {
        let mut model = LuoRudy91::new();
        model.initialize(1);
        let mask = vec![true];
        let dt = 0.01;
        let mut u = vec![model.rest_potential()];
        for _ in 0..100_000 {
            let u_old = u.clone();
            model.step_reaction(&mut u, &u_old, &mask, dt);
            assert!(u[0].is_finite());
        }
        assert!(u[0] > -90.0 && u[0] < -75.0, "静息漂移: {}", u[0]);
    }

    /// 阈上去极化触发上冲过 0 mV 的动作电位
    #[test]
    fn test_action_potential_upstroke() {
        let mut model = LuoRudy91::new();
        model.initialize(1);
        let mask = vec![true];
        let dt = 0.01;
        let mut u = vec![-50.0]; // 阈上
        let mut peak = -100.0f64;
        for _ in 0..50_000 {
            let u_old = u.clone();
            model.step_reaction(&mut u, &u_old, &mask, dt);
            peak = peak.max(u[0]);
            assert!(u[0].is_finite());
        }
        assert!(peak > 0.0, "上冲不足: {}", peak);
        assert!(u[0] < -70.0, "未复极: {}", u[0]);
    }
}
