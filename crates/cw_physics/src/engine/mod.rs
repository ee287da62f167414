// crates/cw_physics/src/engine/mod.rs

//! 仿真引擎
//!
//! 固定步长显式时间循环的编排层：
//!
//! - `runner` - 主循环状态机（刺激 → 扩散 → 反应 → 观测）
//! - `snapshot` - 可序列化检查点快照

mod runner;
mod snapshot;

pub use runner::{ModelRunner, RunConfig, RunConfigBuilder, RunState, RunnerStats};
pub use snapshot::RunnerSnapshot;
