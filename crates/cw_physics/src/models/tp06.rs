// crates/cw_physics/src/models/tp06.rs

//! ten Tusscher–Panfilov 2006 (TP06) 人心室离子模型
//!
//! 19 个动态状态变量（电压、离子浓度、通道门控、缓冲），
//! 含次膜空间 (cass) 与肌浆网 (casr) 的完整钙处理。
//! 门控用 Rush–Larsen 指数更新；缓冲钙浓度用解析根式解，
//! 避免缓冲方程的刚性。电压单位 mV，时间单位 ms。
//!
//! 参考: ten Tusscher & Panfilov, Alternans and spiral
//! breakup in a human ventricular tissue model,
//! Am J Physiol Heart Circ Physiol 291, 2006.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::rush_larsen;

/// 模型参数（EPI 细胞，文献默认值）
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct Tp06Params {
    // 胞外离子浓度 [mM]
    pub ko: f64,
    pub cao: f64,
    pub nao: f64,
    // 细胞体积 [μL]
    pub vc: f64,
    pub vsr: f64,
    pub vss: f64,
    // 缓冲参数
    pub bufc: f64,
    pub kbufc: f64,
    pub bufsr: f64,
    pub kbufsr: f64,
    pub bufss: f64,
    pub kbufss: f64,
    // 钙处理参数
    pub vmaxup: f64,
    pub kup: f64,
    pub vrel: f64,
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
    pub ec: f64,
    pub maxsr: f64,
    pub minsr: f64,
    pub vleak: f64,
    pub vxfer: f64,
    // 物理常数
    pub r: f64,
    pub f: f64,
    pub t: f64,
    pub rtonf: f64,
    pub capacitance: f64,
    // 通道电导
    pub gkr: f64,
    pub gks: f64,
    pub gk1: f64,
    pub gto: f64,
    pub gna: f64,
    pub gbna: f64,
    pub gcal: f64,
    pub gbca: f64,
    pub gpca: f64,
    pub kpca: f64,
    pub gpk: f64,
    // Na/K 泵
    pub pkna: f64,
    pub kmk: f64,
    pub kmna: f64,
    pub knak: f64,
    // Na/Ca 交换体
    pub knaca: f64,
    pub kmnai: f64,
    pub kmca: f64,
    pub ksat: f64,
    pub n: f64,
    // 初始条件
    pub init_u: f64,
    pub init_cai: f64,
    pub init_casr: f64,
    pub init_cass: f64,
    pub init_nai: f64,
    pub init_ki: f64,
}

impl Default for Tp06Params {
    fn default() -> Self {
        Self {
            ko: 5.4,
            cao: 2.0,
            nao: 140.0,
            vc: 0.016404,
            vsr: 0.001094,
            vss: 0.00005468,
            bufc: 0.2,
            kbufc: 0.001,
            bufsr: 10.0,
            kbufsr: 0.3,
            bufss: 0.4,
            kbufss: 0.00025,
            vmaxup: 0.006375,
            kup: 0.00025,
            vrel: 0.102,
            k1: 0.15,
            k2: 0.045,
            k3: 0.060,
            k4: 0.005,
            ec: 1.5,
            maxsr: 2.5,
            minsr: 1.0,
            vleak: 0.00036,
            vxfer: 0.0038,
            r: 8314.472,
            f: 96485.3415,
            t: 310.0,
            rtonf: 26.71376,
            capacitance: 0.185,
            gkr: 0.153,
            gks: 0.392,
            gk1: 5.405,
            gto: 0.294,
            gna: 14.838,
            gbna: 0.00029,
            gcal: 0.00003980,
            gbca: 0.000592,
            gpca: 0.1238,
            kpca: 0.0005,
            gpk: 0.0146,
            pkna: 0.03,
            kmk: 1.0,
            kmna: 40.0,
            knak: 2.724,
            knaca: 1000.0,
            kmnai: 87.5,
            kmca: 1.38,
            ksat: 0.1,
            n: 0.35,
            init_u: -84.5,
            init_cai: 0.00007,
            init_casr: 1.3,
            init_cass: 0.00007,
            init_nai: 7.67,
            init_ki: 138.3,
        }
    }
}

/// 单节点状态（电压除外的 19 个变量）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Tp06Node {
    pub cai: f64,
    pub casr: f64,
    pub cass: f64,
    pub nai: f64,
    pub ki: f64,
    pub m: f64,
    pub h: f64,
    pub j: f64,
    pub xr1: f64,
    pub xr2: f64,
    pub xs: f64,
    pub r: f64,
    pub s: f64,
    pub d: f64,
    pub f: f64,
    pub f2: f64,
    pub fcass: f64,
    pub rr: f64,
    pub oo: f64,
}

/// TP06 模型
#[derive(Debug, Clone)]
pub struct Tp06 {
    /// 模型参数
    pub params: Tp06Params,
    nodes: Vec<Tp06Node>,
}

impl Default for Tp06 {
    fn default() -> Self {
        Self::new()
    }
}

impl Tp06 {
    /// 使用默认参数创建
    pub fn new() -> Self {
        Self::with_params(Tp06Params::default())
    }

    /// 使用自定义参数创建
    pub fn with_params(params: Tp06Params) -> Self {
        Self {
            params,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn d_model(&self) -> f64 {
        0.154
    }

    pub(crate) fn rest_potential(&self) -> f64 {
        self.params.init_u
    }

    pub(crate) fn state_var_names(&self) -> &'static [&'static str] {
        &[
            "u", "cai", "casr", "cass", "nai", "ki", "m", "h", "j", "xr1", "xr2", "xs", "r",
            "s", "d", "f", "f2", "fcass", "rr", "oo",
        ]
    }

    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[Tp06Node] {
        &self.nodes
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<Tp06Node>) {
        self.nodes = nodes;
    }

    pub(crate) fn initialize(&mut self, n_nodes: usize) {
        let p = &self.params;
        self.nodes = vec![
            Tp06Node {
                cai: p.init_cai,
                casr: p.init_casr,
                cass: p.init_cass,
                nai: p.init_nai,
                ki: p.init_ki,
                m: 0.0,
                h: 0.75,
                j: 0.75,
                xr1: 0.0,
                xr2: 1.0,
                xs: 0.0,
                r: 0.0,
                s: 1.0,
                d: 0.0,
                f: 1.0,
                f2: 1.0,
                fcass: 1.0,
                rr: 1.0,
                oo: 0.0,
            };
            n_nodes
        ];
    }

    pub(crate) fn step_reaction(&mut self, u_new: &mut [f64], u: &[f64], mask: &[bool], dt: f64) {
        let p = self.params.clone();
        let inverse_vc_f2 = 1.0 / (2.0 * p.vc * p.f);
        let inverse_vc_f = 1.0 / (p.vc * p.f);
        let inverse_vss_f2 = 1.0 / (2.0 * p.vss * p.f);

        u_new
            .par_iter_mut()
            .zip(self.nodes.par_iter_mut())
            .zip(u.par_iter())
            .zip(mask.par_iter())
            .for_each(|(((u_out, node), &v), &active)| {
                if !active {
                    return;
                }

                let ek = p.rtonf * (p.ko / node.ki).ln();
                let ena = p.rtonf * (p.nao / node.nai).ln();
                let eks = p.rtonf
                    * ((p.ko + p.pkna * p.nao) / (node.ki + p.pkna * node.nai)).ln();
                let eca = 0.5 * p.rtonf * (p.cao / node.cai).ln();

                // 快钠电流
                let alpha_m = 1.0 / (1.0 + ((-60.0 - v) / 5.0).exp());
                let beta_m = 0.1 / (1.0 + ((v + 35.0) / 5.0).exp())
                    + 0.1 / (1.0 + ((v - 50.0) / 200.0).exp());
                let tau_m = alpha_m * beta_m;
                let m_inf = {
                    let e = 1.0 + ((-56.86 - v) / 9.03).exp();
                    1.0 / (e * e)
                };
                let (alpha_h, beta_h) = if v >= -40.0 {
                    (0.0, 0.77 / (0.13 * (1.0 + (-(v + 10.66) / 11.1).exp())))
                } else {
                    (
                        0.057 * (-(v + 80.0) / 6.8).exp(),
                        2.7 * (0.079 * v).exp() + 3.1e5 * (0.3485 * v).exp(),
                    )
                };
                let tau_h = 1.0 / (alpha_h + beta_h);
                let h_inf = {
                    let e = 1.0 + ((v + 71.55) / 7.43).exp();
                    1.0 / (e * e)
                };
                let (alpha_j, beta_j) = if v >= -40.0 {
                    (
                        0.0,
                        0.6 * (0.057 * v).exp() / (1.0 + (-0.1 * (v + 32.0)).exp()),
                    )
                } else {
                    (
                        (-2.5428e4 * (0.2444 * v).exp() - 6.948e-6 * (-0.04391 * v).exp())
                            * (v + 37.78)
                            / (1.0 + (0.311 * (v + 79.23)).exp()),
                        0.02424 * (-0.01052 * v).exp()
                            / (1.0 + (-0.1378 * (v + 40.14)).exp()),
                    )
                };
                let tau_j = 1.0 / (alpha_j + beta_j);
                let j_inf = h_inf;

                node.m = rush_larsen(node.m, m_inf, tau_m, dt);
                node.h = rush_larsen(node.h, h_inf, tau_h, dt);
                node.j = rush_larsen(node.j, j_inf, tau_j, dt);
                let ina = p.gna * node.m * node.m * node.m * node.h * node.j * (v - ena);

                // L 型钙电流
                let d_inf = 1.0 / (1.0 + ((-8.0 - v) / 7.5).exp());
                let ad = 1.4 / (1.0 + ((-35.0 - v) / 13.0).exp()) + 0.25;
                let bd = 1.4 / (1.0 + ((v + 5.0) / 5.0).exp());
                let cd = 1.0 / (1.0 + ((50.0 - v) / 20.0).exp());
                let tau_d = ad * bd + cd;
                let f_inf = 1.0 / (1.0 + ((v + 20.0) / 7.0).exp());
                let af = 1102.5 * (-(v + 27.0) * (v + 27.0) / 225.0).exp();
                let bf = 200.0 / (1.0 + ((13.0 - v) / 10.0).exp());
                let cf = 180.0 / (1.0 + ((v + 30.0) / 10.0).exp()) + 20.0;
                let tau_f = af + bf + cf;
                let f2_inf = 0.67 / (1.0 + ((v + 35.0) / 7.0).exp()) + 0.33;
                let af2 = 600.0 * (-(v + 25.0) * (v + 25.0) / 170.0).exp();
                let bf2 = 31.0 / (1.0 + ((25.0 - v) / 10.0).exp());
                let cf2 = 16.0 / (1.0 + ((v + 30.0) / 10.0).exp());
                let tau_f2 = af2 + bf2 + cf2;
                let css_ratio = (node.cass / 0.05) * (node.cass / 0.05);
                let fcass_inf = 0.6 / (1.0 + css_ratio) + 0.4;
                let tau_fcass = 80.0 / (1.0 + css_ratio) + 2.0;

                node.d = rush_larsen(node.d, d_inf, tau_d, dt);
                node.f = rush_larsen(node.f, f_inf, tau_f, dt);
                node.f2 = rush_larsen(node.f2, f2_inf, tau_f2, dt);
                node.fcass = rush_larsen(node.fcass, fcass_inf, tau_fcass, dt);

                let vf_rt = (v - 15.0) * p.f / (p.r * p.t);
                let ical = p.gcal * node.d * node.f * node.f2 * node.fcass
                    * 4.0
                    * (v - 15.0)
                    * (p.f * p.f / (p.r * p.t))
                    * (0.25 * (2.0 * vf_rt).exp() * node.cass - p.cao)
                    / ((2.0 * vf_rt).exp() - 1.0);

                // 瞬时外向电流
                let r_inf = 1.0 / (1.0 + ((20.0 - v) / 6.0).exp());
                let s_inf = 1.0 / (1.0 + ((v + 20.0) / 5.0).exp());
                let tau_r = 9.5 * (-(v + 40.0) * (v + 40.0) / 1800.0).exp() + 0.8;
                let tau_s = 85.0 * (-(v + 45.0) * (v + 45.0) / 320.0).exp()
                    + 5.0 / (1.0 + ((v - 20.0) / 5.0).exp())
                    + 3.0;
                node.s = rush_larsen(node.s, s_inf, tau_s, dt);
                node.r = rush_larsen(node.r, r_inf, tau_r, dt);
                let ito = p.gto * node.r * node.s * (v - ek);

                // 快延迟整流钾电流
                let xr1_inf = 1.0 / (1.0 + ((-26.0 - v) / 7.0).exp());
                let axr1 = 450.0 / (1.0 + ((-45.0 - v) / 10.0).exp());
                let bxr1 = 6.0 / (1.0 + ((v + 30.0) / 11.5).exp());
                let tau_xr1 = axr1 * bxr1;
                let xr2_inf = 1.0 / (1.0 + ((v + 88.0) / 24.0).exp());
                let axr2 = 3.0 / (1.0 + ((-60.0 - v) / 20.0).exp());
                let bxr2 = 1.12 / (1.0 + ((v - 60.0) / 20.0).exp());
                let tau_xr2 = axr2 * bxr2;
                node.xr1 = rush_larsen(node.xr1, xr1_inf, tau_xr1, dt);
                node.xr2 = rush_larsen(node.xr2, xr2_inf, tau_xr2, dt);
                let ikr = p.gkr * (p.ko / 5.4).sqrt() * node.xr1 * node.xr2 * (v - ek);

                // 慢延迟整流钾电流
                let xs_inf = 1.0 / (1.0 + ((-5.0 - v) / 14.0).exp());
                let axs = 1400.0 / (1.0 + ((5.0 - v) / 6.0).exp()).sqrt();
                let bxs = 1.0 / (1.0 + ((v - 35.0) / 15.0).exp());
                let tau_xs = axs * bxs + 80.0;
                node.xs = rush_larsen(node.xs, xs_inf, tau_xs, dt);
                let iks = p.gks * node.xs * node.xs * (v - eks);

                // 内向整流钾电流
                let ak1 = 0.1 / (1.0 + (0.06 * (v - ek - 200.0)).exp());
                let bk1 = (3.0 * (0.0002 * (v - ek + 100.0)).exp()
                    + (0.1 * (v - ek - 10.0)).exp())
                    / (1.0 + (-0.5 * (v - ek)).exp());
                let ik1 = p.gk1 * (ak1 / (ak1 + bk1)) * (v - ek);

                // 交换体与泵
                let vfrt = v * p.f / (p.r * p.t);
                let inaca = p.knaca
                    * (1.0 / (p.kmnai * p.kmnai * p.kmnai + p.nao * p.nao * p.nao))
                    * (1.0 / (p.kmca + p.cao))
                    * (1.0 / (1.0 + p.ksat * ((p.n - 1.0) * vfrt).exp()))
                    * ((p.n * vfrt).exp() * node.nai * node.nai * node.nai * p.cao
                        - ((p.n - 1.0) * vfrt).exp() * p.nao * p.nao * p.nao * node.cai
                            * 2.5);
                let rec_inak =
                    1.0 / (1.0 + 0.1245 * (-0.1 * vfrt).exp() + 0.0353 * (-vfrt).exp());
                let inak = p.knak * (p.ko / (p.ko + p.kmk)) * (node.nai / (node.nai + p.kmna))
                    * rec_inak;
                let ipca = p.gpca * node.cai / (p.kpca + node.cai);
                let rec_ipk = 1.0 / (1.0 + ((25.0 - v) / 5.98).exp());
                let ipk = p.gpk * rec_ipk * (v - ek);
                let ibna = p.gbna * (v - ena);
                let ibca = p.gbca * (v - eca);

                // 肌浆网钙释放
                let k_casr = p.maxsr
                    - (p.maxsr - p.minsr)
                        / (1.0 + (p.ec / node.casr) * (p.ec / node.casr));
                let k1_eff = p.k1 / k_casr;
                let k2_eff = p.k2 * k_casr;
                node.rr += dt * (p.k4 * (1.0 - node.rr) - k2_eff * node.cass * node.rr);
                node.oo = k1_eff * node.cass * node.cass * node.rr
                    / (p.k3 + k1_eff * node.cass * node.cass);
                let irel = p.vrel * node.oo * (node.casr - node.cass);

                let ileak = p.vleak * (node.casr - node.cai);
                let iup = p.vmaxup / (1.0 + (p.kup * p.kup) / (node.cai * node.cai));
                let ixfer = p.vxfer * (node.cass - node.cai);

                // 缓冲钙浓度的解析根式更新
                let ca_csqn = p.bufsr * node.casr / (node.casr + p.kbufsr);
                let d_casr = dt * (iup - irel - ileak);
                let bjsr = p.bufsr - ca_csqn - d_casr - node.casr + p.kbufsr;
                let cjsr = p.kbufsr * (ca_csqn + d_casr + node.casr);
                node.casr = ((bjsr * bjsr + 4.0 * cjsr).sqrt() - bjsr) / 2.0;

                let ca_ss_buf = p.bufss * node.cass / (node.cass + p.kbufss);
                let d_cass = dt
                    * (-ixfer * (p.vc / p.vss) + irel * (p.vsr / p.vss)
                        + (-ical * inverse_vss_f2 * p.capacitance));
                let bcss = p.bufss - ca_ss_buf - d_cass - node.cass + p.kbufss;
                let ccss = p.kbufss * (ca_ss_buf + d_cass + node.cass);
                node.cass = ((bcss * bcss + 4.0 * ccss).sqrt() - bcss) / 2.0;

                let ca_buf = p.bufc * node.cai / (node.cai + p.kbufc);
                let d_cai = dt
                    * ((-(ibca + ipca - 2.0 * inaca) * inverse_vc_f2 * p.capacitance)
                        - (iup - ileak) * (p.vsr / p.vc)
                        + ixfer);
                let bc = p.bufc - ca_buf - d_cai - node.cai + p.kbufc;
                let cc = p.kbufc * (ca_buf + d_cai + node.cai);
                node.cai = ((bc * bc + 4.0 * cc).sqrt() - bc) / 2.0;

                node.nai +=
                    dt * (-(ina + ibna + 3.0 * inak + 3.0 * inaca) * inverse_vc_f * p.capacitance);
                node.ki += dt
                    * (-(ik1 + ito + ikr + iks - 2.0 * inak + ipk)
                        * inverse_vc_f
                        * p.capacitance);

                *u_out -= dt
                    * (ikr + iks + ik1 + ito + ina + ibna + ical + ibca + inak + inaca + ipca
                        + ipk);
            });
    }

    pub(crate) fn state_var(&self, name: &str, idx: usize) -> Option<f64> {
        let node = self.nodes.get(idx)?;
        match name {
            "cai" => Some(node.cai),
            "casr" => Some(node.casr),
            "cass" => Some(node.cass),
            "nai" => Some(node.nai),
            "ki" => Some(node.ki),
            "m" => Some(node.m),
            "h" => Some(node.h),
            "j" => Some(node.j),
            "xr1" => Some(node.xr1),
            "xr2" => Some(node.xr2),
            "xs" => Some(node.xs),
            "r" => Some(node.r),
            "s" => Some(node.s),
            "d" => Some(node.d),
            "f" => Some(node.f),
            "f2" => Some(node.f2),
            "fcass" => Some(node.fcass),
            "rr" => Some(node.rr),
            "oo" => Some(node.oo),
            _ => None,
        }
    }
}
