// crates/cw_physics/src/engine/runner.rs

//! 主循环状态机
//!
//! [`ModelRunner`] 持有组织、模板、细胞模型、刺激与观测器，
//! 驱动 `t = 0 → t_max` 的固定步长时间循环。
//!
//! # 每步顺序（严格串行，不可重排）
//!
//! 1. 刺激施加（写 `u`）
//! 2. 扩散子步（`u → u_next`，全新缓冲区）
//! 3. 反应子步（细胞模型，累加进 `u_next`，仅心肌节点）
//! 4. 缓冲区交换
//! 5. 观测器采样（只读）
//! 6. 时钟推进 `t = step × dt`
//!
//! 扩散/反应内部按节点数据并行，但任意两个子步之间绝不
//! 并发；步间是唯一的取消点。
//!
//! # 状态机
//!
//! ```text
//! Uninitialized → Initialized → Running → Completed
//!                      ↘            ↘
//!                        Failed（配置错误 / 数值不稳定）
//! ```
//!
//! 循环单趟执行，重跑需构建新实例；暂停/续跑通过
//! [`ModelRunner::snapshot`] / [`ModelRunner::restore`] 实现。

use cw_foundation::error::{CwError, CwResult};
use cw_foundation::float::{first_non_finite, lt_within};

use crate::models::CellModel;
use crate::stencil::StencilWeights;
use crate::stim::StimSequence;
use crate::tissue::CardiacTissue;
use crate::tracker::{SampleContext, TrackerSequence};

use super::snapshot::RunnerSnapshot;

// ============================================================
// 运行配置
// ============================================================

/// 运行配置
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// 时间步长
    pub dt: f64,
    /// 空间步长
    pub dr: f64,
    /// 总模拟时长
    pub t_max: f64,
    /// 是否启用非有限值守卫
    pub check_finite: bool,
    /// 守卫检查间隔（步）
    pub check_interval: usize,
    /// 扩散核并行阈值（节点数）
    pub parallel_threshold: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            dr: 0.25,
            t_max: 100.0,
            check_finite: true,
            check_interval: 100,
            parallel_threshold: 1000,
        }
    }
}

impl RunConfig {
    /// 创建构建器
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// 校验配置
    pub fn validate(&self) -> CwResult<()> {
        for (name, value) in [("dt", self.dt), ("dr", self.dr), ("t_max", self.t_max)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CwError::invalid_parameter(name, value, "必须为正有限值"));
            }
        }
        if self.check_interval == 0 {
            return Err(CwError::invalid_parameter(
                "check_interval",
                0.0,
                "检查间隔至少为 1 步",
            ));
        }
        Ok(())
    }
}

/// 配置构建器
#[derive(Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// 设置时间步长
    pub fn dt(mut self, dt: f64) -> Self {
        self.config.dt = dt;
        self
    }

    /// 设置空间步长
    pub fn dr(mut self, dr: f64) -> Self {
        self.config.dr = dr;
        self
    }

    /// 设置总模拟时长
    pub fn t_max(mut self, t_max: f64) -> Self {
        self.config.t_max = t_max;
        self
    }

    /// 设置非有限值守卫
    pub fn check_finite(mut self, enable: bool) -> Self {
        self.config.check_finite = enable;
        self
    }

    /// 设置守卫检查间隔
    pub fn check_interval(mut self, interval: usize) -> Self {
        self.config.check_interval = interval.max(1);
        self
    }

    /// 设置并行阈值
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_threshold = threshold;
        self
    }

    /// 构建配置
    pub fn build(self) -> RunConfig {
        self.config
    }
}

// ============================================================
// 状态机与统计
// ============================================================

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// 未初始化
    #[default]
    Uninitialized,
    /// 已初始化，可以启动
    Initialized,
    /// 循环进行中
    Running,
    /// 正常跑完 `t_max`
    Completed,
    /// 配置错误或数值不稳定
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "未初始化",
            Self::Initialized => "已初始化",
            Self::Running => "运行中",
            Self::Completed => "已完成",
            Self::Failed => "已失败",
        };
        write!(f, "{}", name)
    }
}

/// 运行统计
#[derive(Debug, Clone, Default)]
pub struct RunnerStats {
    /// 已完成步数
    pub steps_completed: usize,
    /// 守卫检查次数
    pub guard_checks: usize,
    /// 最近一次守卫检查时的电压最小值
    pub u_min: f64,
    /// 最近一次守卫检查时的电压最大值
    pub u_max: f64,
}

impl RunnerStats {
    /// 生成诊断摘要
    pub fn summary(&self) -> String {
        format!(
            "steps={}, guard_checks={}, u∈[{:.4}, {:.4}]",
            self.steps_completed, self.guard_checks, self.u_min, self.u_max
        )
    }
}

// ============================================================
// 主循环
// ============================================================

/// 仿真主循环
pub struct ModelRunner {
    tissue: CardiacTissue,
    model: CellModel,
    config: RunConfig,
    stims: StimSequence,
    trackers: TrackerSequence,
    stencil: Option<StencilWeights>,
    u: Vec<f64>,
    u_next: Vec<f64>,
    myo_mask: Vec<bool>,
    step_index: usize,
    time: f64,
    state: RunState,
    stats: RunnerStats,
    progress: Option<Box<dyn FnMut(usize, f64) + Send>>,
}

impl ModelRunner {
    /// 创建运行器
    pub fn new(tissue: CardiacTissue, model: CellModel, config: RunConfig) -> Self {
        Self {
            tissue,
            model,
            config,
            stims: StimSequence::new(),
            trackers: TrackerSequence::new(),
            stencil: None,
            u: Vec::new(),
            u_next: Vec::new(),
            myo_mask: Vec::new(),
            step_index: 0,
            time: 0.0,
            state: RunState::Uninitialized,
            stats: RunnerStats::default(),
            progress: None,
        }
    }

    /// 设置刺激序列
    pub fn set_stim_sequence(&mut self, stims: StimSequence) {
        self.stims = stims;
    }

    /// 设置观测器序列
    pub fn set_tracker_sequence(&mut self, trackers: TrackerSequence) {
        self.trackers = trackers;
    }

    /// 设置进度回调（尽力而为，每步调用一次）
    pub fn set_progress_callback(&mut self, callback: Box<dyn FnMut(usize, f64) + Send>) {
        self.progress = Some(callback);
    }

    // =========================================================
    // 访问器
    // =========================================================

    /// 电压场
    pub fn u(&self) -> &[f64] {
        &self.u
    }

    /// 当前模拟时刻
    pub fn time(&self) -> f64 {
        self.time
    }

    /// 下一个待执行的步号
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// 当前状态
    pub fn state(&self) -> RunState {
        self.state
    }

    /// 运行统计
    pub fn stats(&self) -> &RunnerStats {
        &self.stats
    }

    /// 组织几何
    pub fn tissue(&self) -> &CardiacTissue {
        &self.tissue
    }

    /// 细胞模型
    pub fn model(&self) -> &CellModel {
        &self.model
    }

    /// 观测器序列（取回输出用）
    pub fn trackers(&self) -> &TrackerSequence {
        &self.trackers
    }

    /// 运行配置
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    // =========================================================
    // 初始化
    // =========================================================

    /// 校验配置与几何、构建模板、填充初始状态
    ///
    /// 只能从未初始化状态调用一次；任何校验失败都使运行器
    /// 进入失败态，运行从未开始。
    pub fn initialize(&mut self) -> CwResult<()> {
        if self.state != RunState::Uninitialized {
            return Err(CwError::InvalidState {
                expected: "Uninitialized",
                actual: self.state.to_string(),
            });
        }
        match self.initialize_inner() {
            Ok(()) => {
                self.state = RunState::Initialized;
                Ok(())
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    fn initialize_inner(&mut self) -> CwResult<()> {
        self.config.validate()?;

        let report = self.tissue.validate();
        for warning in &report.warnings {
            log::warn!("组织校验: {}", warning);
        }
        if report.has_errors() {
            return Err(CwError::geometry(report.to_string()));
        }

        let stencil = StencilWeights::build(&self.tissue, self.model.d_model())?
            .with_parallel_threshold(self.config.parallel_threshold);

        // 稳定界是调用方责任，违反只警告不拒绝
        let dt_stable = stencil.estimate_stable_dt(self.config.dr);
        if self.config.dt > dt_stable {
            log::warn!(
                "dt={} 超出显式格式稳定界估计 {:.3e}，结果可能发散",
                self.config.dt,
                dt_stable
            );
        }
        let isolated = stencil.count_isolated(&self.tissue);
        if isolated > 0 {
            log::debug!("{} 个心肌节点在扩散下隔离", isolated);
        }

        let n = self.tissue.n_nodes();
        self.myo_mask = self.tissue.myocyte_mask();
        self.model.initialize(n);
        let rest = self.model.rest_potential();
        self.u = vec![rest; n];
        self.u_next = vec![rest; n];
        self.stencil = Some(stencil);

        self.stims.initialize(&self.tissue)?;
        self.trackers.initialize(&self.tissue, &self.model, self.config.dt)?;

        self.step_index = 0;
        self.time = 0.0;
        self.stats = RunnerStats {
            u_min: rest,
            u_max: rest,
            ..RunnerStats::default()
        };

        log::info!(
            "初始化完成: 模型 {}, {} 节点, dt={}, dr={}, 计划 {} 步",
            self.model.kind(),
            n,
            self.config.dt,
            self.config.dr,
            (self.config.t_max / self.config.dt).ceil() as usize
        );
        Ok(())
    }

    // =========================================================
    // 时间推进
    // =========================================================

    /// 执行一个完整时间步
    pub fn step(&mut self) -> CwResult<()> {
        match self.state {
            RunState::Initialized | RunState::Running => {}
            _ => {
                return Err(CwError::InvalidState {
                    expected: "Initialized/Running",
                    actual: self.state.to_string(),
                });
            }
        }
        self.state = RunState::Running;

        let dt = self.config.dt;
        let dr = self.config.dr;
        let t = self.time;

        // 1. 刺激
        self.stims.apply(t, dt, &mut self.u);

        // 2. 扩散（全新缓冲区，无通量边界由零权重行保证）
        let stencil = self.stencil.as_ref().ok_or_else(|| CwError::InvalidState {
            expected: "stencil built",
            actual: "missing".to_string(),
        })?;
        stencil.apply(&self.u, &mut self.u_next, dt, dr)?;

        // 3. 反应（仅心肌节点，累加进扩散后的电压）
        self.model
            .step_reaction(&mut self.u_next, &self.u, &self.myo_mask, dt);

        // 4. 交换缓冲区
        std::mem::swap(&mut self.u, &mut self.u_next);

        // 5. 观测
        let ctx = SampleContext {
            step: self.step_index,
            time: t,
            dt,
            dr,
            u: &self.u,
            model: &self.model,
            tissue: &self.tissue,
        };
        self.trackers.sample(&ctx);

        // 可选的非有限值守卫
        if self.config.check_finite && self.step_index % self.config.check_interval == 0 {
            if let Some(idx) = first_non_finite(&self.u) {
                log::warn!(
                    "第 {} 步 (t={}) 节点 {} 出现非有限电压",
                    self.step_index,
                    t,
                    idx
                );
                self.state = RunState::Failed;
                return Err(CwError::NumericalInstability {
                    step: self.step_index,
                    time: t,
                });
            }
            self.stats.guard_checks += 1;
            let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
            for &v in &self.u {
                lo = lo.min(v);
                hi = hi.max(v);
            }
            self.stats.u_min = lo;
            self.stats.u_max = hi;
        }

        if let Some(callback) = &mut self.progress {
            callback(self.step_index, t);
        }

        // 6. 时钟单调推进（乘法成形，避免累加漂移）
        self.step_index += 1;
        self.time = self.step_index as f64 * dt;
        self.stats.steps_completed = self.step_index;
        Ok(())
    }

    /// 从 `t=0`（或恢复点）跑到 `t_max`
    pub fn run(&mut self) -> CwResult<()> {
        if self.state == RunState::Uninitialized {
            self.initialize()?;
        }
        if self.state != RunState::Initialized {
            return Err(CwError::InvalidState {
                expected: "Initialized",
                actual: self.state.to_string(),
            });
        }

        while lt_within(self.time, self.config.t_max) {
            self.step()?;
        }
        self.state = RunState::Completed;
        log::info!("运行完成: {}", self.stats.summary());
        Ok(())
    }

    // =========================================================
    // 检查点
    // =========================================================

    /// 抓取当前快照（状态场 + 时钟）
    pub fn snapshot(&self) -> CwResult<RunnerSnapshot> {
        if self.state == RunState::Uninitialized {
            return Err(CwError::InvalidState {
                expected: "Initialized/Running/Completed",
                actual: self.state.to_string(),
            });
        }
        Ok(RunnerSnapshot {
            step: self.step_index,
            time: self.time,
            u: self.u.clone(),
            model_state: self.model.snapshot(),
        })
    }

    /// 从快照恢复并回到可运行状态
    ///
    /// 要求运行器已初始化且几何/模型与快照一致。观测器
    /// 累加器不在快照范围内，恢复后从当前时刻继续累积。
    pub fn restore(&mut self, snapshot: &RunnerSnapshot) -> CwResult<()> {
        if self.state == RunState::Uninitialized {
            return Err(CwError::InvalidState {
                expected: "Initialized/Running/Completed",
                actual: self.state.to_string(),
            });
        }
        let n = self.tissue.n_nodes();
        if snapshot.n_nodes() != n {
            return Err(CwError::ShapeMismatch {
                field: "snapshot.u",
                expected: n,
                actual: snapshot.n_nodes(),
            });
        }
        self.model.restore(&snapshot.model_state)?;
        self.u.copy_from_slice(&snapshot.u);
        self.u_next.fill(0.0);
        self.step_index = snapshot.step;
        self.time = snapshot.time;
        self.stims.restore_to(snapshot.time, self.config.dt);
        self.state = RunState::Initialized;
        Ok(())
    }
}
