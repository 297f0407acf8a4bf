//! # 数据模型模块
//!
//! 定义统一的结构、电子结构、谱学数据模型与输出封装。
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `commands/` 使用
//! - 子模块: structure, electronic, spectra, property, calculation

pub mod calculation;
pub mod electronic;
pub mod property;
pub mod spectra;
pub mod structure;

pub use calculation::CalculationSummary;
pub use electronic::{EigenvalueRecord, ElectronicSteps, EnergyContribution, IonicStep, SpinChannel};
pub use property::{Property, PropertyData, PropertyKind};
pub use spectra::{
    Dos, HubbardU, HubbardV, PartialDos, PhononDispersion, PhononDos, PotentialProfile,
    QpointUnit, ReactionPath, SpinDos,
};
pub use structure::{Basis, CoordinateUnit, Labeled, Lattice, LatticeUnit, Structure};
