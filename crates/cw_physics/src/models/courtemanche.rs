// crates/cw_physics/src/models/courtemanche.rs

//! Courtemanche–Ramirez–Nattel 1998 人心房离子模型
//!
//! 12 个膜通道门控、3 个肌浆网释放门控与 5 个离子浓度，
//! 共 21 个状态变量。门控用 Rush–Larsen 指数更新，浓度用
//! 前向 Euler。电压单位 mV，时间单位 ms。
//!
//! 参考: Courtemanche, Ramirez & Nattel, Ionic mechanisms
//! underlying human atrial action potential properties,
//! Am J Physiol 275, 1998.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::rush_larsen;

/// 模型参数（文献默认值）
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct CourtemancheParams {
    // 物理常数
    pub r: f64,
    pub t: f64,
    pub f: f64,
    /// 膜电容 [pF]
    pub cm: f64,
    // 细胞体积 [μm³]
    pub vi: f64,
    pub vup: f64,
    pub vrel: f64,
    // 胞外离子浓度 [mM]
    pub ko: f64,
    pub nao: f64,
    pub cao: f64,
    // 通道电导 [nS/pF]
    pub gna: f64,
    pub gk1: f64,
    pub gto: f64,
    pub gkr: f64,
    pub gks: f64,
    pub gcal: f64,
    pub gbca: f64,
    pub gbna: f64,
    // 泵与交换体
    pub inak_max: f64,
    pub km_nai: f64,
    pub km_ko: f64,
    pub inaca_max: f64,
    pub km_na: f64,
    pub km_ca: f64,
    pub ksat: f64,
    pub gamma: f64,
    pub ipca_max: f64,
    // 钙缓冲
    pub trpn_max: f64,
    pub km_trpn: f64,
    pub cmdn_max: f64,
    pub km_cmdn: f64,
    pub csqn_max: f64,
    pub km_csqn: f64,
    // 肌浆网钙处理
    pub krel: f64,
    pub kup: f64,
    pub iup_max: f64,
    pub caup_max: f64,
    pub tau_tr: f64,
    pub tau_fca: f64,
    pub tau_u: f64,
    /// 门控速率的 Q10 因子
    pub kq10: f64,
    // 初始条件
    pub init_u: f64,
    pub init_nai: f64,
    pub init_ki: f64,
    pub init_cai: f64,
    pub init_caup: f64,
    pub init_carel: f64,
}

impl Default for CourtemancheParams {
    fn default() -> Self {
        Self {
            r: 8.3143,
            t: 310.0,
            f: 96.4867,
            cm: 100.0,
            vi: 13668.0,
            vup: 1109.52,
            vrel: 96.48,
            ko: 5.4,
            nao: 140.0,
            cao: 1.8,
            gna: 7.8,
            gk1: 0.09,
            gto: 0.1652,
            gkr: 0.029411765,
            gks: 0.12941176,
            gcal: 0.12375,
            gbca: 0.001131,
            gbna: 0.0006744375,
            inak_max: 0.59933874,
            km_nai: 10.0,
            km_ko: 1.5,
            inaca_max: 1600.0,
            km_na: 87.5,
            km_ca: 1.38,
            ksat: 0.1,
            gamma: 0.35,
            ipca_max: 0.275,
            trpn_max: 0.07,
            km_trpn: 0.0005,
            cmdn_max: 0.05,
            km_cmdn: 0.00238,
            csqn_max: 10.0,
            km_csqn: 0.8,
            krel: 30.0,
            kup: 0.00092,
            iup_max: 0.005,
            caup_max: 15.0,
            tau_tr: 180.0,
            tau_fca: 2.0,
            tau_u: 8.0,
            kq10: 3.0,
            init_u: -81.18,
            init_nai: 11.17,
            init_ki: 139.0,
            init_cai: 1.013e-4,
            init_caup: 1.488,
            init_carel: 1.488,
        }
    }
}

/// 单节点状态（电压除外的 20 个变量）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct CourtemancheNode {
    pub m: f64,
    pub h: f64,
    pub j: f64,
    pub oa: f64,
    pub oi: f64,
    pub ua: f64,
    pub ui: f64,
    pub xr: f64,
    pub xs: f64,
    pub d: f64,
    pub f: f64,
    pub fca: f64,
    pub u: f64,
    pub v: f64,
    pub w: f64,
    pub nai: f64,
    pub ki: f64,
    pub cai: f64,
    pub caup: f64,
    pub carel: f64,
}

/// Courtemanche 1998 模型
#[derive(Debug, Clone)]
pub struct Courtemanche {
    /// 模型参数
    pub params: CourtemancheParams,
    nodes: Vec<CourtemancheNode>,
}

impl Default for Courtemanche {
    fn default() -> Self {
        Self::new()
    }
}

impl Courtemanche {
    /// 使用默认参数创建
    pub fn new() -> Self {
        Self::with_params(CourtemancheParams::default())
    }

    /// 使用自定义参数创建
    pub fn with_params(params: CourtemancheParams) -> Self {
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
        &[
            "u", "m", "h", "j", "oa", "oi", "ua", "ui", "xr", "xs", "d", "f", "fca", "uu",
            "vv", "ww", "nai", "ki", "cai", "caup", "carel",
        ]
    }

    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[CourtemancheNode] {
        &self.nodes
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<CourtemancheNode>) {
        self.nodes = nodes;
    }

    pub(crate) fn initialize(&mut self, n_nodes: usize) {
        let p = &self.params;
        self.nodes = vec![
            CourtemancheNode {
                m: 2.908e-3,
                h: 9.649e-1,
                j: 9.775e-1,
                oa: 3.043e-2,
                oi: 9.992e-1,
                ua: 4.966e-3,
                ui: 9.986e-1,
                xr: 3.296e-5,
                xs: 1.869e-2,
                d: 1.367e-4,
                f: 9.996e-1,
                fca: 7.755e-1,
                u: 0.0,
                v: 1.0,
                w: 9.992e-1,
                nai: p.init_nai,
                ki: p.init_ki,
                cai: p.init_cai,
                caup: p.init_caup,
                carel: p.init_carel,
            };
            n_nodes
        ];
    }

    pub(crate) fn step_reaction(&mut self, u_new: &mut [f64], u: &[f64], mask: &[bool], dt: f64) {
        let p = self.params.clone();
        let rtonf = p.r * p.t / p.f;

        u_new
            .par_iter_mut()
            .zip(self.nodes.par_iter_mut())
            .zip(u.par_iter())
            .zip(mask.par_iter())
            .for_each(|(((u_out, node), &v), &active)| {
                if !active {
                    return;
                }

                let ek = rtonf * (p.ko / node.ki).ln();
                let ena = rtonf * (p.nao / node.nai).ln();
                let eca = 0.5 * rtonf * (p.cao / node.cai).ln();
                let vfrt = v / rtonf;

                // 快钠电流门控（LR 型速率）
                let dm = v + 47.13;
                let alpha_m = if dm.abs() < 1e-7 {
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
                let rl_rates = |x: f64, a: f64, b: f64| {
                    let tau = 1.0 / (a + b);
                    rush_larsen(x, a * tau, tau, dt)
                };
                node.m = rl_rates(node.m, alpha_m, beta_m);
                node.h = rl_rates(node.h, alpha_h, beta_h);
                node.j = rl_rates(node.j, alpha_j, beta_j);
                let ina = p.gna * node.m * node.m * node.m * node.h * node.j * (v - ena);

                // 瞬时外向钾电流
                let alpha_oa =
                    0.65 / ((-(v + 10.0) / 8.5).exp() + (-(v - 30.0) / 59.0).exp());
                let beta_oa = 0.65 / (2.5 + ((v + 82.0) / 17.0).exp());
                let tau_oa = 1.0 / ((alpha_oa + beta_oa) * p.kq10);
                let oa_inf = 1.0 / (1.0 + (-(v + 20.47) / 17.54).exp());
                let alpha_oi = 1.0 / (18.53 + ((v + 113.7) / 10.95).exp());
                let beta_oi = 1.0 / (35.56 + (-(v + 1.26) / 7.44).exp());
                let tau_oi = 1.0 / ((alpha_oi + beta_oi) * p.kq10);
                let oi_inf = 1.0 / (1.0 + ((v + 43.1) / 5.3).exp());
                node.oa = rush_larsen(node.oa, oa_inf, tau_oa, dt);
                node.oi = rush_larsen(node.oi, oi_inf, tau_oi, dt);
                let ito = p.gto * node.oa * node.oa * node.oa * node.oi * (v - ek);

                // 超快延迟整流钾电流
                let alpha_ua =
                    0.65 / ((-(v + 10.0) / 8.5).exp() + (-(v - 30.0) / 59.0).exp());
                let beta_ua = 0.65 / (2.5 + ((v + 82.0) / 17.0).exp());
                let tau_ua = 1.0 / ((alpha_ua + beta_ua) * p.kq10);
                let ua_inf = 1.0 / (1.0 + (-(v + 30.3) / 9.6).exp());
                let alpha_ui = 1.0 / (21.0 + (-(v - 185.0) / 28.0).exp());
                let beta_ui = ((v - 158.0) / 16.0).exp();
                let tau_ui = 1.0 / ((alpha_ui + beta_ui) * p.kq10);
                let ui_inf = 1.0 / (1.0 + ((v - 99.45) / 27.48).exp());
                node.ua = rush_larsen(node.ua, ua_inf, tau_ua, dt);
                node.ui = rush_larsen(node.ui, ui_inf, tau_ui, dt);
                let gkur = 0.005 + 0.05 / (1.0 + (-(v - 15.0) / 13.0).exp());
                let ikur = gkur * node.ua * node.ua * node.ua * node.ui * (v - ek);

                // 快延迟整流钾电流
                let dxr = v + 14.1;
                let alpha_xr = if dxr.abs() < 1e-7 {
                    0.0015
                } else {
                    0.0003 * dxr / (1.0 - (-dxr / 5.0).exp())
                };
                let dxr2 = v - 3.3328;
                let beta_xr = if dxr2.abs() < 1e-7 {
                    3.7836118e-4
                } else {
                    7.3898e-5 * dxr2 / ((dxr2 / 5.1237).exp() - 1.0)
                };
                let tau_xr = 1.0 / (alpha_xr + beta_xr);
                let xr_inf = 1.0 / (1.0 + (-(v + 14.1) / 6.5).exp());
                node.xr = rush_larsen(node.xr, xr_inf, tau_xr, dt);
                let ikr = p.gkr * node.xr * (v - ek) / (1.0 + ((v + 15.0) / 22.4).exp());

                // 慢延迟整流钾电流
                let dxs = v - 19.9;
                let (alpha_xs, beta_xs) = if dxs.abs() < 1e-7 {
                    (6.8e-4, 3.15e-4)
                } else {
                    (
                        4.0e-5 * dxs / (1.0 - (-dxs / 17.0).exp()),
                        3.5e-5 * dxs / ((dxs / 9.0).exp() - 1.0),
                    )
                };
                let tau_xs = 0.5 / (alpha_xs + beta_xs);
                let xs_inf = 1.0 / (1.0 + (-dxs / 12.7).exp()).sqrt();
                node.xs = rush_larsen(node.xs, xs_inf, tau_xs, dt);
                let iks = p.gks * node.xs * node.xs * (v - ek);

                // L 型钙电流
                let dv10 = v + 10.0;
                let tau_d = if dv10.abs() < 1e-7 {
                    // 0/0 可去奇点: lim = 1/(2·0.035·6.24)
                    1.0 / (0.035 * 6.24 * 2.0)
                } else {
                    (1.0 - (-dv10 / 6.24).exp())
                        / (0.035 * dv10 * (1.0 + (-dv10 / 6.24).exp()))
                };
                let d_inf = 1.0 / (1.0 + (-dv10 / 8.0).exp());
                let tau_f = 9.0 / (0.0197 * (-0.0337 * 0.0337 * dv10 * dv10).exp() + 0.02);
                let f_inf = 1.0 / (1.0 + ((v + 28.0) / 6.9).exp());
                let fca_inf = 1.0 / (1.0 + node.cai / 0.00035);
                node.d = rush_larsen(node.d, d_inf, tau_d, dt);
                node.f = rush_larsen(node.f, f_inf, tau_f, dt);
                node.fca = rush_larsen(node.fca, fca_inf, p.tau_fca, dt);
                let ical = p.gcal * node.d * node.f * node.fca * (v - 65.0);

                // 内向整流钾电流
                let ik1 = p.gk1 * (v - ek) / (1.0 + (0.07 * (v + 80.0)).exp());

                // 泵与交换体
                let sigma = ((p.nao / 67.3).exp() - 1.0) / 7.0;
                let fnak = 1.0
                    / (1.0 + 0.1245 * (-0.1 * vfrt).exp() + 0.0365 * sigma * (-vfrt).exp());
                let inak = p.inak_max * fnak * (p.ko / (p.ko + p.km_ko))
                    / (1.0 + (p.km_nai / node.nai).powf(1.5));
                let inaca = p.inaca_max
                    * ((p.gamma * vfrt).exp() * node.nai * node.nai * node.nai * p.cao
                        - ((p.gamma - 1.0) * vfrt).exp() * p.nao * p.nao * p.nao * node.cai)
                    / ((p.km_na.powi(3) + p.nao.powi(3))
                        * (p.km_ca + p.cao)
                        * (1.0 + p.ksat * ((p.gamma - 1.0) * vfrt).exp()));
                let ipca = p.ipca_max * node.cai / (0.0005 + node.cai);
                let ibna = p.gbna * (v - ena);
                let ibca = p.gbca * (v - eca);

                // 肌浆网钙释放、转运与摄取
                let irel = p.krel * node.u * node.u * node.v * node.w * (node.carel - node.cai);
                let itr = (node.caup - node.carel) / p.tau_tr;
                let iup = p.iup_max / (1.0 + p.kup / node.cai);
                let iup_leak = p.iup_max * node.caup / p.caup_max;

                // 释放门控（fn 为膜/释放钙通量的混合驱动量）
                let fn_drive = 1.0e-12 * p.vrel * irel
                    - (5.0e-13 / p.f) * (0.5 * ical - 0.2 * inaca) * p.cm;
                let u_inf = 1.0 / (1.0 + (-(fn_drive - 3.4175e-13) / 13.67e-16).exp());
                let v_inf =
                    1.0 - 1.0 / (1.0 + (-(fn_drive - 6.835e-14) / 13.67e-16).exp());
                let tau_v = 1.91 + 2.09 / (1.0 + (-(fn_drive - 3.4175e-13) / 13.67e-16).exp());
                let w_inf = 1.0 - 1.0 / (1.0 + (-(v - 40.0) / 17.0).exp());
                let dvw = v - 7.9;
                let tau_w = if dvw.abs() < 1e-7 {
                    6.0 * 0.2 / 1.3
                } else {
                    6.0 * (1.0 - (-dvw / 5.0).exp())
                        / ((1.0 + 0.3 * (-dvw / 5.0).exp()) * dvw)
                };
                node.u = rush_larsen(node.u, u_inf, p.tau_u, dt);
                node.v = rush_larsen(node.v, v_inf, tau_v, dt);
                node.w = rush_larsen(node.w, w_inf, tau_w, dt);

                // 离子浓度（前向 Euler）
                let f_vi = p.f * p.vi;
                node.nai += dt * (-3.0 * inak - 3.0 * inaca - ibna - ina) * p.cm / f_vi;
                node.ki +=
                    dt * (2.0 * inak - ik1 - ito - ikur - ikr - iks) * p.cm / f_vi;

                let b1 = (2.0 * inaca - ipca - ical - ibca) * p.cm / (2.0 * f_vi)
                    + (p.vup * (iup_leak - iup) + irel * p.vrel) / p.vi;
                let b2 = 1.0
                    + p.trpn_max * p.km_trpn / ((node.cai + p.km_trpn) * (node.cai + p.km_trpn))
                    + p.cmdn_max * p.km_cmdn
                        / ((node.cai + p.km_cmdn) * (node.cai + p.km_cmdn));
                node.cai += dt * b1 / b2;

                node.caup += dt * (iup - iup_leak - itr * p.vrel / p.vup);
                node.carel += dt * (itr - irel)
                    / (1.0
                        + p.csqn_max * p.km_csqn
                            / ((node.carel + p.km_csqn) * (node.carel + p.km_csqn)));

                *u_out -= dt
                    * (ina + ik1 + ito + ikur + ikr + iks + ical + ipca + inak + inaca + ibna
                        + ibca);
            });
    }

    pub(crate) fn state_var(&self, name: &str, idx: usize) -> Option<f64> {
        let node = self.nodes.get(idx)?;
        match name {
            "m" => Some(node.m),
            "h" => Some(node.h),
            "j" => Some(node.j),
            "oa" => Some(node.oa),
            "oi" => Some(node.oi),
            "ua" => Some(node.ua),
            "ui" => Some(node.ui),
            "xr" => Some(node.xr),
            "xs" => Some(node.xs),
            "d" => Some(node.d),
            "f" => Some(node.f),
            "fca" => Some(node.fca),
            "uu" => Some(node.u),
            "vv" => Some(node.v),
            "ww" => Some(node.w),
            "nai" => Some(node.nai),
            "ki" => Some(node.ki),
            "cai" => Some(node.cai),
            "caup" => Some(node.caup),
            "carel" => Some(node.carel),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 静息电位附近长时间积分保持极化且有限
    #[test]
    fn test_rest_state_stays_polarized() {
        let mut model = Courtemanche::new();
        model.initialize(1);
        let mask = vec![true];
        let dt = 0.02;
        let mut u = vec![model.rest_potential()];
        for _ in 0..50_000 {
            let u_old = u.clone();
            model.step_reaction(&mut u, &u_old, &mask, dt);
            assert!(u[0].is_finite());
        }
        assert!(u[0] > -90.0 && u[0] < -70.0, "静息漂移: {}", u[0]);
    }

    /// 去极化触发上冲与复极
    #[test]
    fn test_action_potential_upstroke() {
        let mut model = Courtemanche::new();
        model.initialize(1);
        let mask = vec![true];
        let dt = 0.02;
        let mut u = vec![model.rest_potential()];
        let mut peak = -100.0f64;
        for step in 0..30_000 {
            if step < 100 {
                u[0] += dt * 30.0;
            }
            let u_old = u.clone();
            model.step_reaction(&mut u, &u_old, &mask, dt);
            peak = peak.max(u[0]);
            assert!(u[0].is_finite());
        }
        assert!(peak > -10.0, "上冲不足: {}", peak);
        assert!(u[0] < -65.0, "未复极: {}", u[0]);
    }
}
