// crates/cw_physics/src/engine/snapshot.rs

//! 检查点快照
//!
//! 全部状态场 + 时钟，足以在同一模板下按位复现地续跑。
//! 本模块只定义可序列化的数据载体；落盘/读取由外部
//! 持久化协作方完成。观测器累加器不在快照范围内。

use serde::{Deserialize, Serialize};

use crate::models::ModelStateSnapshot;

/// 运行快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSnapshot {
    /// 下一个待执行的步号
    pub step: usize,
    /// 对应的模拟时刻
    pub time: f64,
    /// 电压场
    pub u: Vec<f64>,
    /// 细胞模型门控状态
    pub model_state: ModelStateSnapshot,
}

impl RunnerSnapshot {
    /// 快照覆盖的节点数
    pub fn n_nodes(&self) -> usize {
        self.u.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlievPanfilovNode, ModelStateSnapshot};

    #[test]
    fn test_serde_roundtrip() {
        let snap = RunnerSnapshot {
            step: 42,
            time: 0.42,
            u: vec![0.0, 0.5, 1.0],
            model_state: ModelStateSnapshot::AlievPanfilov(vec![
                AlievPanfilovNode { v: 0.1 };
                3
            ]),
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: RunnerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.step, 42);
        assert_eq!(back.u, snap.u);
        assert_eq!(back.n_nodes(), 3);
    }
}
