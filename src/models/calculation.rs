//! # 计算结果摘要
//!
//! `collect` 批量命令为每个计算目录生成的一行摘要。
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 使用
//! - 被 `parsers/mod.rs` 填充

use crate::parsers::Application;
use serde::Serialize;

/// 单个计算目录的摘要
#[derive(Debug, Clone, Serialize)]
pub struct CalculationSummary {
    /// 计算目录名
    pub name: String,

    /// 使用的程序
    pub application: Application,

    /// 总能量 (eV)
    pub total_energy_ev: Option<f64>,

    /// Fermi 能 (eV)
    pub fermi_energy_ev: Option<f64>,

    /// 原子数
    pub num_atoms: Option<usize>,

    /// 离子步数
    pub ionic_steps: Option<usize>,
}

impl CalculationSummary {
    pub fn new(name: impl Into<String>, application: Application) -> Self {
        CalculationSummary {
            name: name.into(),
            application,
            total_energy_ev: None,
            fermi_energy_ev: None,
            num_atoms: None,
            ionic_steps: None,
        }
    }

    /// 计算每原子能量
    pub fn energy_per_atom(&self) -> Option<f64> {
        match (self.total_energy_ev, self.num_atoms) {
            (Some(e), Some(n)) if n > 0 => Some(e / n as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_per_atom() {
        let mut s = CalculationSummary::new("si", Application::Espresso);
        assert_eq!(s.energy_per_atom(), None);

        s.total_energy_ev = Some(-20.0);
        s.num_atoms = Some(2);
        assert_eq!(s.energy_per_atom(), Some(-10.0));

        s.num_atoms = Some(0);
        assert_eq!(s.energy_per_atom(), None);
    }
}
