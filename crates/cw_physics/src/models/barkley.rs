// crates/cw_physics/src/models/barkley.rs

//! Barkley 可激发介质模型
//!
//! 快-慢双变量系统，常用于螺旋波动力学研究。
//!
//! 参考: Barkley, A model for fast computer simulation of
//! waves in excitable media, Physica D 49, 1991.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 模型参数（文献默认值）
#[derive(Debug, Clone)]
pub struct BarkleyParams {
    /// 激活变量动力学参数
    pub a: f64,
    /// 阈值偏移
    pub b: f64,
    /// 快慢时间尺度比
    pub eps: f64,
    /// 电压初值
    pub init_u: f64,
    /// 恢复变量初值
    pub init_v: f64,
}

impl Default for BarkleyParams {
    fn default() -> Self {
        Self {
            a: 0.75,
            b: 0.06,
            eps: 0.02,
            init_u: 0.0,
            init_v: 0.0,
        }
    }
}

/// 单节点状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BarkleyNode {
    /// 恢复变量
    pub v: f64,
}

/// Barkley 模型
#[derive(Debug, Clone)]
pub struct Barkley {
    /// 模型参数
    pub params: BarkleyParams,
    nodes: Vec<BarkleyNode>,
}

impl Default for Barkley {
    fn default() -> Self {
        Self::new()
    }
}

impl Barkley {
    /// 使用默认参数创建
    pub fn new() -> Self {
        Self::with_params(BarkleyParams::default())
    }

    /// 使用自定义参数创建
    pub fn with_params(params: BarkleyParams) -> Self {
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

    pub(crate) fn nodes(&self) -> &[BarkleyNode] {
        &self.nodes
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<BarkleyNode>) {
        self.nodes = nodes;
    }

    pub(crate) fn initialize(&mut self, n_nodes: usize) {
        self.nodes = vec![
            BarkleyNode {
                v: self.params.init_v,
            };
            n_nodes
        ];
    }

    pub(crate) fn step_reaction(&mut self, u_new: &mut [f64], u: &[f64], mask: &[bool], dt: f64) {
        let p = &self.params;
        let inv_eps = 1.0 / p.eps;
        u_new
            .par_iter_mut()
            .zip(self.nodes.par_iter_mut())
            .zip(u.par_iter())
            .zip(mask.par_iter())
            .for_each(|(((u_out, node), &u0), &active)| {
                if !active {
                    return;
                }
                *u_out += dt * inv_eps * u0 * (1.0 - u0) * (u0 - (node.v + p.b) / p.a);
                node.v += dt * (u0 - node.v);
            });
    }

    pub(crate) fn state_var(&self, name: &str, idx: usize) -> Option<f64> {
        match name {
            "v" => self.nodes.get(idx).map(|n| n.v),
            _ => None,
        }
    }
}
