// crates/cw_physics/src/models/mod.rs

//! 细胞膜动力学模型
//!
//! 八种离子/唯象模型的封闭变体集合。模型集合固定且性能
//! 敏感，采用带标签枚举静态分发，不走 trait 对象；
//! [`CellModel`] 对仿真主循环暴露统一接口
//! （`initialize` / `step_reaction` / 状态变量访问）。
//!
//! # 反应子步约定
//!
//! `step_reaction(u_new, u, mask, dt)` 在扩散写入 `u_new`
//! 之后调用：门控变量由旧电压 `u` 推进，反应项累加进
//! `u_new`。非心肌节点（掩膜为假）永不推进，保持静息值，
//! 维持扩散算子的无通量假设。
//!
//! # 积分方法
//!
//! 唯象变量用前向 Euler；具有已知稳态/时间常数形式的门控
//! 变量用 Rush–Larsen 指数更新，使离子模型在较粗 `dt` 下
//! 保持稳定。所有核都是纯状态变换：无 I/O、无随机性，
//! 给定 `(u, 状态, dt)` 完全确定。
//!
//! # 状态布局
//!
//! 每模型一个 `Copy` 节点状态结构体（AoS `Vec<Node>`），
//! serde 派生用于检查点快照。

mod aliev_panfilov;
mod barkley;
mod bueno_orovio;
mod courtemanche;
mod fenton_karma;
mod luo_rudy91;
mod mitchell_schaeffer;
mod tp06;

pub use aliev_panfilov::{AlievPanfilov, AlievPanfilovNode, AlievPanfilovParams};
pub use barkley::{Barkley, BarkleyNode, BarkleyParams};
pub use bueno_orovio::{BuenoOrovio, BuenoOrovioNode, BuenoOrovioParams};
pub use courtemanche::{Courtemanche, CourtemancheNode, CourtemancheParams};
pub use fenton_karma::{FentonKarma, FentonKarmaNode, FentonKarmaParams};
pub use luo_rudy91::{LuoRudy91, LuoRudy91Node, LuoRudy91Params};
pub use mitchell_schaeffer::{MitchellSchaeffer, MitchellSchaefferNode, MitchellSchaefferParams};
pub use tp06::{Tp06, Tp06Node, Tp06Params};

use cw_foundation::error::{CwError, CwResult};
use serde::{Deserialize, Serialize};

/// 模型种类标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Aliev–Panfilov 双变量唯象模型
    AlievPanfilov,
    /// Barkley 可激发介质模型
    Barkley,
    /// Mitchell–Schaeffer 双变量模型
    MitchellSchaeffer,
    /// Fenton–Karma 三变量模型
    FentonKarma,
    /// Bueno–Orovio 四变量最小模型
    BuenoOrovio,
    /// Luo–Rudy 1991 心室离子模型
    LuoRudy91,
    /// ten Tusscher–Panfilov 2006 人心室离子模型
    Tp06,
    /// Courtemanche 1998 人心房离子模型
    Courtemanche,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AlievPanfilov => "Aliev-Panfilov",
            Self::Barkley => "Barkley",
            Self::MitchellSchaeffer => "Mitchell-Schaeffer",
            Self::FentonKarma => "Fenton-Karma",
            Self::BuenoOrovio => "Bueno-Orovio",
            Self::LuoRudy91 => "Luo-Rudy 1991",
            Self::Tp06 => "TP06",
            Self::Courtemanche => "Courtemanche",
        };
        write!(f, "{}", name)
    }
}

/// 细胞模型（封闭变体）
#[derive(Debug, Clone)]
pub enum CellModel {
    /// Aliev–Panfilov
    AlievPanfilov(AlievPanfilov),
    /// Barkley
    Barkley(Barkley),
    /// Mitchell–Schaeffer
    MitchellSchaeffer(MitchellSchaeffer),
    /// Fenton–Karma
    FentonKarma(FentonKarma),
    /// Bueno–Orovio
    BuenoOrovio(BuenoOrovio),
    /// Luo–Rudy 1991
    LuoRudy91(LuoRudy91),
    /// TP06
    Tp06(Tp06),
    /// Courtemanche
    Courtemanche(Courtemanche),
}

macro_rules! dispatch {
    ($m:expr, $method:ident ( $($arg:expr),* )) => {
        match $m {
            CellModel::AlievPanfilov(m) => m.$method($($arg),*),
            CellModel::Barkley(m) => m.$method($($arg),*),
            CellModel::MitchellSchaeffer(m) => m.$method($($arg),*),
            CellModel::FentonKarma(m) => m.$method($($arg),*),
            CellModel::BuenoOrovio(m) => m.$method($($arg),*),
            CellModel::LuoRudy91(m) => m.$method($($arg),*),
            CellModel::Tp06(m) => m.$method($($arg),*),
            CellModel::Courtemanche(m) => m.$method($($arg),*),
        }
    };
}

impl CellModel {
    /// 模型种类
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::AlievPanfilov(_) => ModelKind::AlievPanfilov,
            Self::Barkley(_) => ModelKind::Barkley,
            Self::MitchellSchaeffer(_) => ModelKind::MitchellSchaeffer,
            Self::FentonKarma(_) => ModelKind::FentonKarma,
            Self::BuenoOrovio(_) => ModelKind::BuenoOrovio,
            Self::LuoRudy91(_) => ModelKind::LuoRudy91,
            Self::Tp06(_) => ModelKind::Tp06,
            Self::Courtemanche(_) => ModelKind::Courtemanche,
        }
    }

    /// 模型基准扩散系数
    pub fn d_model(&self) -> f64 {
        dispatch!(self, d_model())
    }

    /// 静息电位（电压场初值）
    pub fn rest_potential(&self) -> f64 {
        dispatch!(self, rest_potential())
    }

    /// 状态变量名（电压 `u` 在前）
    pub fn state_var_names(&self) -> &'static [&'static str] {
        dispatch!(self, state_var_names())
    }

    /// 按节点数分配并填充初始门控状态
    pub fn initialize(&mut self, n_nodes: usize) {
        dispatch!(self, initialize(n_nodes))
    }

    /// 推进一个反应子步（仅掩膜为真的节点）
    pub fn step_reaction(&mut self, u_new: &mut [f64], u: &[f64], mask: &[bool], dt: f64) {
        debug_assert_eq!(u_new.len(), u.len());
        debug_assert_eq!(u.len(), mask.len());
        dispatch!(self, step_reaction(u_new, u, mask, dt))
    }

    /// 读取某节点的命名状态变量（`u` 除外，由电压场承载）
    pub fn state_var(&self, name: &str, idx: usize) -> Option<f64> {
        dispatch!(self, state_var(name, idx))
    }

    /// 已分配的节点数
    pub fn n_nodes(&self) -> usize {
        dispatch!(self, n_nodes())
    }

    /// 抓取门控状态快照
    pub fn snapshot(&self) -> ModelStateSnapshot {
        match self {
            Self::AlievPanfilov(m) => ModelStateSnapshot::AlievPanfilov(m.nodes().to_vec()),
            Self::Barkley(m) => ModelStateSnapshot::Barkley(m.nodes().to_vec()),
            Self::MitchellSchaeffer(m) => {
                ModelStateSnapshot::MitchellSchaeffer(m.nodes().to_vec())
            }
            Self::FentonKarma(m) => ModelStateSnapshot::FentonKarma(m.nodes().to_vec()),
            Self::BuenoOrovio(m) => ModelStateSnapshot::BuenoOrovio(m.nodes().to_vec()),
            Self::LuoRudy91(m) => ModelStateSnapshot::LuoRudy91(m.nodes().to_vec()),
            Self::Tp06(m) => ModelStateSnapshot::Tp06(m.nodes().to_vec()),
            Self::Courtemanche(m) => ModelStateSnapshot::Courtemanche(m.nodes().to_vec()),
        }
    }

    /// 从快照恢复门控状态
    ///
    /// 快照的模型种类与节点数必须与当前模型一致。
    pub fn restore(&mut self, snapshot: &ModelStateSnapshot) -> CwResult<()> {
        let expected = self.n_nodes();
        if snapshot.n_nodes() != expected {
            return Err(CwError::ShapeMismatch {
                field: "model_snapshot",
                expected,
                actual: snapshot.n_nodes(),
            });
        }
        match (self, snapshot) {
            (Self::AlievPanfilov(m), ModelStateSnapshot::AlievPanfilov(s)) => {
                m.set_nodes(s.clone())
            }
            (Self::Barkley(m), ModelStateSnapshot::Barkley(s)) => m.set_nodes(s.clone()),
            (Self::MitchellSchaeffer(m), ModelStateSnapshot::MitchellSchaeffer(s)) => {
                m.set_nodes(s.clone())
            }
            (Self::FentonKarma(m), ModelStateSnapshot::FentonKarma(s)) => m.set_nodes(s.clone()),
            (Self::BuenoOrovio(m), ModelStateSnapshot::BuenoOrovio(s)) => m.set_nodes(s.clone()),
            (Self::LuoRudy91(m), ModelStateSnapshot::LuoRudy91(s)) => m.set_nodes(s.clone()),
            (Self::Tp06(m), ModelStateSnapshot::Tp06(s)) => m.set_nodes(s.clone()),
            (Self::Courtemanche(m), ModelStateSnapshot::Courtemanche(s)) => {
                m.set_nodes(s.clone())
            }
            (model, snap) => {
                return Err(CwError::config(format!(
                    "快照模型种类不匹配: 当前 {}, 快照 {}",
                    model.kind(),
                    snap.kind()
                )));
            }
        }
        Ok(())
    }
}

/// 门控状态快照
///
/// 与时钟和电压场一起构成可序列化检查点；持久化本身交由
/// 外部协作方完成。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelStateSnapshot {
    /// Aliev–Panfilov 状态
    AlievPanfilov(Vec<AlievPanfilovNode>),
    /// Barkley 状态
    Barkley(Vec<BarkleyNode>),
    /// Mitchell–Schaeffer 状态
    MitchellSchaeffer(Vec<MitchellSchaefferNode>),
    /// Fenton–Karma 状态
    FentonKarma(Vec<FentonKarmaNode>),
    /// Bueno–Orovio 状态
    BuenoOrovio(Vec<BuenoOrovioNode>),
    /// Luo–Rudy 1991 状态
    LuoRudy91(Vec<LuoRudy91Node>),
    /// TP06 状态
    Tp06(Vec<Tp06Node>),
    /// Courtemanche 状态
    Courtemanche(Vec<CourtemancheNode>),
}

impl ModelStateSnapshot {
    /// 快照的节点数
    pub fn n_nodes(&self) -> usize {
        match self {
            Self::AlievPanfilov(v) => v.len(),
            Self::Barkley(v) => v.len(),
            Self::MitchellSchaeffer(v) => v.len(),
            Self::FentonKarma(v) => v.len(),
            Self::BuenoOrovio(v) => v.len(),
            Self::LuoRudy91(v) => v.len(),
            Self::Tp06(v) => v.len(),
            Self::Courtemanche(v) => v.len(),
        }
    }

    /// 快照的模型种类
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::AlievPanfilov(_) => ModelKind::AlievPanfilov,
            Self::Barkley(_) => ModelKind::Barkley,
            Self::MitchellSchaeffer(_) => ModelKind::MitchellSchaeffer,
            Self::FentonKarma(_) => ModelKind::FentonKarma,
            Self::BuenoOrovio(_) => ModelKind::BuenoOrovio,
            Self::LuoRudy91(_) => ModelKind::LuoRudy91,
            Self::Tp06(_) => ModelKind::Tp06,
            Self::Courtemanche(_) => ModelKind::Courtemanche,
        }
    }
}

/// Rush–Larsen 指数更新：`x ← x_inf − (x_inf − x)·exp(−dt/tau)`
#[inline]
pub(crate) fn rush_larsen(x: f64, x_inf: f64, tau: f64, dt: f64) -> f64 {
    x_inf - (x_inf - x) * (-dt / tau).exp()
}
