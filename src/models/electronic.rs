//! # 电子结构与收敛轨迹数据模型
//!
//! k 点本征值、能量分解、离子/电子收敛轨迹。
//!
//! ## 依赖关系
//! - 被 `parsers/` 使用
//! - 使用 `models/structure.rs`

use super::structure::Structure;
use serde::Serialize;

/// 单个自旋通道的本征值与占据数
///
/// `energies` 与 `occupations` 等长且逐项对应。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpinChannel {
    pub energies: Vec<f64>,
    pub occupations: Vec<f64>,
    /// +0.5 / -0.5；非共线计算只输出一个 +0.5 通道
    pub spin: f64,
}

impl SpinChannel {
    pub fn new(energies: Vec<f64>, occupations: Vec<f64>, spin: f64) -> Self {
        SpinChannel {
            energies,
            occupations,
            spin,
        }
    }
}

/// 单个 k 点的本征值记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenvalueRecord {
    /// 分数坐标
    pub kpoint: [f64; 3],
    pub weight: f64,
    pub eigenvalues: Vec<SpinChannel>,
}

/// 能量分解项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyContribution {
    pub name: String,
    pub value: f64,
}

impl EnergyContribution {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        EnergyContribution {
            name: name.into(),
            value,
        }
    }
}

/// 单个离子步内的电子自洽迭代
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectronicSteps {
    pub units: &'static str,
    pub data: Vec<f64>,
}

/// 离子弛豫的一步
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IonicStep {
    /// eV
    pub energy: f64,
    pub structure: Structure,
    pub electronic: ElectronicSteps,
}
