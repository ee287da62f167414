// crates/cw_physics/src/stim.rs

//! 刺激引擎
//!
//! 按时间顺序调度的刺激事件队列。每步由主循环在扩散子步
//! 之前调用一次 [`StimSequence::apply`]，处于时间窗内的
//! 刺激按插入顺序生效：
//!
//! - **电压钳制**: 时钟首次到达 `time` 时把区域内电压覆写为
//!   固定值，之后标记为已执行。
//! - **电流注入**: `t ∈ [time, time+duration)` 期间每步向
//!   区域内电压累加 `value × dt`。
//!
//! 生效区域总是与心肌掩膜求交——空/纤维化节点无法被刺激。
//! 区域内心肌节点过少导致波无法自持（源-汇失配）是物理
//! 结果，不是错误，引擎不会为此报错。

use cw_foundation::error::{CwError, CwResult};
use cw_foundation::float::{ge_within, lt_within};

use crate::tissue::{CardiacTissue, GridShape};

/// 刺激模式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StimKind {
    /// 电压钳制：覆写为固定值
    Voltage {
        /// 钳制电压
        value: f64,
    },
    /// 电流注入：持续累加 `value × dt`
    Current {
        /// 注入电流强度
        value: f64,
        /// 注入持续时长
        duration: f64,
    },
}

/// 坐标盒区域（半开区间 `[x1, x2) × [y1, y2) × [z1, z2)`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxRegion {
    /// x 下界
    pub x1: usize,
    /// x 上界（不含）
    pub x2: usize,
    /// y 下界
    pub y1: usize,
    /// y 上界（不含）
    pub y2: usize,
    /// z 下界
    pub z1: usize,
    /// z 上界（不含）
    pub z2: usize,
}

impl BoxRegion {
    /// 二维矩形区域
    pub fn rect(x1: usize, x2: usize, y1: usize, y2: usize) -> Self {
        Self {
            x1,
            x2,
            y1,
            y2,
            z1: 0,
            z2: 1,
        }
    }

    /// 三维长方体区域
    pub fn cuboid(x1: usize, x2: usize, y1: usize, y2: usize, z1: usize, z2: usize) -> Self {
        Self {
            x1,
            x2,
            y1,
            y2,
            z1,
            z2,
        }
    }
}

/// 刺激空间区域
#[derive(Debug, Clone)]
pub enum StimRegion {
    /// 坐标盒
    Box(BoxRegion),
    /// 与网格同形状的布尔掩膜
    Mask(Vec<bool>),
}

/// 单个刺激事件
///
/// 调度后不可变；执行状态由序列在初始化/推进时维护。
#[derive(Debug, Clone)]
pub struct Stimulus {
    /// 生效时刻
    pub time: f64,
    /// 刺激模式
    pub kind: StimKind,
    /// 空间区域
    pub region: StimRegion,
    /// 解析后的目标节点（已与心肌掩膜求交）
    node_ids: Vec<usize>,
    /// 电压钳制是否已执行
    passed: bool,
}

impl Stimulus {
    /// 创建电压钳制刺激
    pub fn voltage(time: f64, value: f64, region: StimRegion) -> Self {
        Self {
            time,
            kind: StimKind::Voltage { value },
            region,
            node_ids: Vec::new(),
            passed: false,
        }
    }

    /// 创建电流注入刺激
    pub fn current(time: f64, value: f64, duration: f64, region: StimRegion) -> Self {
        Self {
            time,
            kind: StimKind::Current { value, duration },
            region,
            node_ids: Vec::new(),
            passed: false,
        }
    }

    /// 校验时间参数
    fn validate(&self) -> CwResult<()> {
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(CwError::invalid_parameter(
                "stim.time",
                self.time,
                "刺激时刻必须为非负有限值",
            ));
        }
        if let StimKind::Current { duration, .. } = self.kind {
            if !duration.is_finite() || duration < 0.0 {
                return Err(CwError::invalid_parameter(
                    "stim.duration",
                    duration,
                    "注入时长必须为非负有限值",
                ));
            }
        }
        Ok(())
    }

    /// 解析区域为心肌节点下标列表
    fn resolve(&mut self, tissue: &CardiacTissue) -> CwResult<()> {
        let shape = tissue.shape;
        let (ni, nj, nk) = shape.dims();

        let mut ids = Vec::new();
        match &self.region {
            StimRegion::Box(b) => {
                if matches!(shape, GridShape::Dim2 { .. }) && b.z2 > 1 {
                    return Err(CwError::geometry("二维网格的刺激区域不能指定 z 范围"));
                }
                // 越界部分截断到网格内
                let (x2, y2, z2) = (b.x2.min(ni), b.y2.min(nj), b.z2.min(nk));
                if b.x2 > ni || b.y2 > nj || b.z2 > nk {
                    log::warn!(
                        "刺激区域超出网格范围，截断为 [{}..{}) × [{}..{}) × [{}..{})",
                        b.x1,
                        x2,
                        b.y1,
                        y2,
                        b.z1,
                        z2
                    );
                }
                for i in b.x1..x2 {
                    for j in b.y1..y2 {
                        for k in b.z1..z2 {
                            let idx = shape.index3(i, j, k);
                            if tissue.is_myocyte(idx) {
                                ids.push(idx);
                            }
                        }
                    }
                }
            }
            StimRegion::Mask(mask) => {
                if mask.len() != tissue.n_nodes() {
                    return Err(CwError::ShapeMismatch {
                        field: "stim_mask",
                        expected: tissue.n_nodes(),
                        actual: mask.len(),
                    });
                }
                for (idx, &m) in mask.iter().enumerate() {
                    if m && tissue.is_myocyte(idx) {
                        ids.push(idx);
                    }
                }
            }
        }

        if ids.is_empty() {
            // 空区域不是错误：按永久无操作处理
            log::warn!("t={} 的刺激区域不含心肌节点，将不产生任何效果", self.time);
        }
        self.node_ids = ids;
        self.passed = false;
        Ok(())
    }

    /// 在当前时刻对电压场施加刺激
    fn apply(&mut self, time: f64, dt: f64, u: &mut [f64]) {
        if self.passed {
            return;
        }
        match self.kind {
            StimKind::Voltage { value } => {
                if ge_within(time, self.time) {
                    for &idx in &self.node_ids {
                        u[idx] = value;
                    }
                    self.passed = true;
                }
            }
            StimKind::Current { value, duration } => {
                let end = self.time + duration;
                if !lt_within(time, end) {
                    self.passed = true;
                    return;
                }
                if ge_within(time, self.time) {
                    for &idx in &self.node_ids {
                        u[idx] += value * dt;
                    }
                }
            }
        }
    }
}

/// 刺激序列
///
/// 持有全部刺激事件，按插入顺序施加。
#[derive(Debug, Clone, Default)]
pub struct StimSequence {
    stims: Vec<Stimulus>,
}

impl StimSequence {
    /// 创建空序列
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加刺激
    pub fn add(&mut self, stim: Stimulus) {
        self.stims.push(stim);
    }

    /// 刺激数量
    pub fn len(&self) -> usize {
        self.stims.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.stims.is_empty()
    }

    /// 解析全部区域并重置执行状态
    pub fn initialize(&mut self, tissue: &CardiacTissue) -> CwResult<()> {
        for stim in &mut self.stims {
            stim.validate()?;
            stim.resolve(tissue)?;
        }
        Ok(())
    }

    /// 按插入顺序施加当前时刻的全部刺激
    pub fn apply(&mut self, time: f64, dt: f64, u: &mut [f64]) {
        for stim in &mut self.stims {
            stim.apply(time, dt, u);
        }
    }

    /// 恢复到检查点时刻对应的执行状态
    ///
    /// 时刻 `time` 为下一个待执行步的时间：最后已执行的步
    /// 时刻为 `time − dt`，此前已生效的电压钳制不得再次触发。
    pub fn restore_to(&mut self, time: f64, dt: f64) {
        let last_ran = time - dt;
        for stim in &mut self.stims {
            stim.passed = match stim.kind {
                StimKind::Voltage { .. } => ge_within(last_ran, stim.time),
                StimKind::Current { duration, .. } => ge_within(last_ran, stim.time + duration),
            };
        }
    }
}
