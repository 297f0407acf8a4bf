//! # 物理量枚举与输出封装
//!
//! `PropertyKind` 是可提取物理量的封闭集合；`Property` 是交给下游
//! 序列化/校验层的输出结构（名称 + 单位 + 数据）。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`（按物理量分发）和 `commands/` 使用

use super::electronic::{EigenvalueRecord, EnergyContribution, IonicStep};
use super::spectra::{
    Dos, HubbardU, HubbardV, PhononDispersion, PhononDos, PotentialProfile, ReactionPath,
};
use super::structure::{Basis, Labeled, Lattice};
use crate::units::Mat33;
use clap::ValueEnum;
use serde::Serialize;

/// 可提取的物理量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum PropertyKind {
    TotalEnergy,
    FermiEnergy,
    TotalEnergyContributions,
    StressTensor,
    AtomicForces,
    EigenvaluesAtKpoints,
    ConvergenceElectronic,
    ConvergenceIonic,
    FinalBasis,
    FinalLatticeVectors,
    ReciprocalLatticeVectors,
    Dos,
    PhononDos,
    PhononDispersions,
    HubbardU,
    HubbardV,
    PotentialProfile,
    ReactionEnergies,
}

impl PropertyKind {
    /// 所有物理量，按声明顺序
    pub fn all() -> &'static [PropertyKind] {
        <PropertyKind as ValueEnum>::value_variants()
    }

    /// 序列化使用的名称
    pub fn name(self) -> &'static str {
        match self {
            PropertyKind::TotalEnergy => "total_energy",
            PropertyKind::FermiEnergy => "fermi_energy",
            PropertyKind::TotalEnergyContributions => "total_energy_contributions",
            PropertyKind::StressTensor => "stress_tensor",
            PropertyKind::AtomicForces => "atomic_forces",
            PropertyKind::EigenvaluesAtKpoints => "eigenvalues_at_kpoints",
            PropertyKind::ConvergenceElectronic => "convergence_electronic",
            PropertyKind::ConvergenceIonic => "convergence_ionic",
            PropertyKind::FinalBasis => "final_basis",
            PropertyKind::FinalLatticeVectors => "final_lattice_vectors",
            PropertyKind::ReciprocalLatticeVectors => "reciprocal_lattice_vectors",
            PropertyKind::Dos => "dos",
            PropertyKind::PhononDos => "phonon_dos",
            PropertyKind::PhononDispersions => "phonon_dispersions",
            PropertyKind::HubbardU => "hubbard_u",
            PropertyKind::HubbardV => "hubbard_v",
            PropertyKind::PotentialProfile => "potential_profile",
            PropertyKind::ReactionEnergies => "reaction_energies",
        }
    }

    /// 输出单位
    pub fn units(self) -> Option<&'static str> {
        match self {
            PropertyKind::TotalEnergy
            | PropertyKind::FermiEnergy
            | PropertyKind::TotalEnergyContributions
            | PropertyKind::EigenvaluesAtKpoints
            | PropertyKind::ConvergenceElectronic
            | PropertyKind::ConvergenceIonic
            | PropertyKind::Dos
            | PropertyKind::HubbardU
            | PropertyKind::HubbardV
            | PropertyKind::PotentialProfile
            | PropertyKind::ReactionEnergies => Some("eV"),
            PropertyKind::StressTensor => Some("kbar"),
            PropertyKind::AtomicForces => Some("eV/angstrom"),
            PropertyKind::PhononDos | PropertyKind::PhononDispersions => Some("cm-1"),
            PropertyKind::FinalBasis
            | PropertyKind::FinalLatticeVectors
            | PropertyKind::ReciprocalLatticeVectors => None,
        }
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 物理量数据
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyData {
    Scalar(f64),
    Tensor(Mat33),
    Vectors(Vec<Labeled<[f64; 3]>>),
    Contributions(Vec<EnergyContribution>),
    Eigenvalues(Vec<EigenvalueRecord>),
    ElectronicConvergence(Vec<Vec<f64>>),
    IonicConvergence(Vec<IonicStep>),
    Basis(Basis),
    Lattice(Lattice),
    Dos(Dos),
    PhononDos(PhononDos),
    PhononDispersion(PhononDispersion),
    HubbardU(Vec<HubbardU>),
    HubbardV(Vec<HubbardV>),
    PotentialProfile(PotentialProfile),
    ReactionPath(ReactionPath),
}

/// 交给下游序列化层的单个物理量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: PropertyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<&'static str>,
    pub data: PropertyData,
}

impl Property {
    pub fn new(name: PropertyKind, data: PropertyData) -> Self {
        Property {
            name,
            units: name.units(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_names_match_serde() {
        for kind in PropertyKind::all() {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.name());
        }
    }

    #[test]
    fn test_property_envelope() {
        let p = Property::new(PropertyKind::TotalEnergy, PropertyData::Scalar(-258.6));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["name"], "total_energy");
        assert_eq!(json["units"], "eV");
        assert_eq!(json["data"], -258.6);

        let basis = Property::new(
            PropertyKind::FinalBasis,
            PropertyData::Basis(Basis::from_lists(
                vec![],
                vec![],
                crate::models::CoordinateUnit::Crystal,
                1,
            )),
        );
        let json = serde_json::to_value(&basis).unwrap();
        assert!(json.get("units").is_none());
    }
}
