// crates/cw_physics/src/lib.rs

//! CorWave 求解层
//!
//! 心肌组织电波传播的单域反应扩散积分引擎：显式固定步长
//! 格式交替执行空间扩散子步与逐节点膜动力学 ODE 子步，
//! 支持各向异性/异质组织、刺激协议与流式观测。
//!
//! # 模块概览
//!
//! - [`tissue`]: 组织几何（节点类型、电导率、纤维方向）
//! - [`stencil`]: 扩散模板的构建与显式扩散子步
//! - [`models`]: 八种细胞膜动力学模型（封闭变体）
//! - [`stim`]: 刺激引擎（电压钳制 / 电流注入）
//! - [`tracker`]: 观测器引擎（激活时间、动作电位等）
//! - [`engine`]: 主循环状态机与检查点快照
//!
//! # 示例
//!
//! ```
//! use cw_physics::prelude::*;
//!
//! let tissue = CardiacTissue::uniform_2d(32, 32);
//! let model = CellModel::AlievPanfilov(AlievPanfilov::new());
//! let config = RunConfig::builder().dt(0.01).dr(0.25).t_max(1.0).build();
//!
//! let mut stims = StimSequence::new();
//! stims.add(Stimulus::voltage(
//!     0.0,
//!     1.0,
//!     StimRegion::Box(BoxRegion::rect(1, 4, 1, 31)),
//! ));
//!
//! let mut runner = ModelRunner::new(tissue, model, config);
//! runner.set_stim_sequence(stims);
//! runner.run().unwrap();
//! assert_eq!(runner.state(), RunState::Completed);
//! ```

#![warn(clippy::all)]

pub mod engine;
pub mod models;
pub mod stencil;
pub mod stim;
pub mod tissue;
pub mod tracker;

// 重导出常用类型
pub use engine::{ModelRunner, RunConfig, RunConfigBuilder, RunState, RunnerSnapshot, RunnerStats};
pub use models::{
    AlievPanfilov, Barkley, BuenoOrovio, CellModel, Courtemanche, FentonKarma, LuoRudy91,
    MitchellSchaeffer, ModelKind, ModelStateSnapshot, Tp06,
};
pub use stencil::StencilWeights;
pub use stim::{BoxRegion, StimKind, StimRegion, StimSequence, Stimulus};
pub use tissue::{CardiacTissue, FiberField, GridShape, NodeKind};
pub use tracker::{
    ActionPotentialTracker, ActivationTimeTracker, EcgTracker, MultiVariableTracker,
    PeriodTracker, SampleContext, Tracker, TrackerSequence, TrackerWindow,
};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::engine::{ModelRunner, RunConfig, RunState, RunnerSnapshot};
    pub use crate::models::{
        AlievPanfilov, Barkley, BuenoOrovio, CellModel, Courtemanche, FentonKarma, LuoRudy91,
        MitchellSchaeffer, ModelKind, Tp06,
    };
    pub use crate::stencil::StencilWeights;
    pub use crate::stim::{BoxRegion, StimRegion, StimSequence, Stimulus};
    pub use crate::tissue::{CardiacTissue, FiberField, GridShape, NodeKind};
    pub use crate::tracker::{
        ActionPotentialTracker, ActivationTimeTracker, EcgTracker, MultiVariableTracker,
        PeriodTracker, Tracker, TrackerSequence, TrackerWindow,
    };
}
