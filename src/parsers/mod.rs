//! # 解析器模块
//!
//! 各应用程序的解析门面与统一的能力契约。
//!
//! 每个门面组合一个 `TextSource`（标准输出 + 模式注册表），按需再加 XML 导航器与
//! 数据文件读取。某个物理量在本次计算中不存在时返回 `Ok(None)`；
//! 只有真正的不一致（版本不支持、奇异矩阵、轨迹错位）才是错误。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `extract/`, `xml/`, `models/`, `units`
//! - 子模块: espresso, vasp, nwchem, sniff

pub mod espresso;
pub mod nwchem;
pub mod sniff;
pub mod vasp;

use crate::batch::FileCollector;
use crate::error::Result;
use crate::models::{
    Basis, Dos, EigenvalueRecord, EnergyContribution, HubbardU, HubbardV, IonicStep, Labeled,
    Lattice, PhononDispersion, PhononDos, PotentialProfile, Property, PropertyData, PropertyKind,
    ReactionPath,
};
use crate::units::Mat33;
use clap::ValueEnum;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 嗅探标准输出来源时读取的行数
pub const SNIFF_LINES: usize = 50;

/// 每个应用解析器必须提供的物理量
///
/// 未实现的方法表示该应用从不报告此物理量。
pub trait CalculationParser {
    fn application(&self) -> Application;

    /// 总能 (eV)
    fn total_energy(&self) -> Result<Option<f64>> {
        Ok(None)
    }

    /// 费米能 (eV)
    fn fermi_energy(&self) -> Result<Option<f64>> {
        Ok(None)
    }

    fn total_energy_contributions(&self) -> Result<Option<Vec<EnergyContribution>>> {
        Ok(None)
    }

    /// 应力张量 (kbar)
    fn stress_tensor(&self) -> Result<Option<Mat33>> {
        Ok(None)
    }

    /// 原子受力 (eV/Å)
    fn atomic_forces(&self) -> Result<Option<Vec<Labeled<[f64; 3]>>>> {
        Ok(None)
    }

    fn eigenvalues_at_kpoints(&self) -> Result<Option<Vec<EigenvalueRecord>>> {
        Ok(None)
    }

    fn convergence_electronic(&self) -> Result<Option<Vec<Vec<f64>>>> {
        Ok(None)
    }

    fn convergence_ionic(&self) -> Result<Option<Vec<IonicStep>>> {
        Ok(None)
    }

    fn final_basis(&self) -> Result<Option<Basis>> {
        Ok(None)
    }

    fn final_lattice_vectors(&self) -> Result<Option<Lattice>> {
        Ok(None)
    }

    fn reciprocal_lattice_vectors(&self) -> Result<Option<Lattice>> {
        Ok(None)
    }

    fn dos(&self) -> Result<Option<Dos>> {
        Ok(None)
    }

    fn phonon_dos(&self) -> Result<Option<PhononDos>> {
        Ok(None)
    }

    fn phonon_dispersions(&self) -> Result<Option<PhononDispersion>> {
        Ok(None)
    }

    fn hubbard_u(&self) -> Result<Option<Vec<HubbardU>>> {
        Ok(None)
    }

    fn hubbard_v(&self) -> Result<Option<Vec<HubbardV>>> {
        Ok(None)
    }

    fn potential_profile(&self) -> Result<Option<PotentialProfile>> {
        Ok(None)
    }

    fn reaction_energies(&self) -> Result<Option<ReactionPath>> {
        Ok(None)
    }

    fn nspins(&self) -> Result<Option<usize>> {
        Ok(None)
    }

    fn number_of_atoms(&self) -> Result<Option<usize>> {
        Ok(self.final_basis()?.map(|b| b.len()))
    }
}

/// 支持的应用程序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Application {
    /// Quantum ESPRESSO (pw.x 及后处理程序)
    Espresso,
    /// VASP (vasprun.xml + OUTCAR)
    Vasp,
    /// NWChem
    Nwchem,
}

impl Application {
    pub fn name(self) -> &'static str {
        match self {
            Application::Espresso => "espresso",
            Application::Vasp => "vasp",
            Application::Nwchem => "nwchem",
        }
    }

    /// 未指定标准输出文件时的候选文件名模式
    pub fn stdout_patterns(self) -> &'static str {
        match self {
            Application::Espresso => "*.out,*.log,*.pwo",
            Application::Vasp => "OUTCAR",
            Application::Nwchem => "*.out,*.log,*.nwo",
        }
    }

    /// 标准输出开头的识别标记
    pub fn stdout_markers(self) -> &'static [&'static str] {
        match self {
            Application::Espresso => &["Program PWSCF", "SternheimerGW"],
            Application::Vasp => &["vasp."],
            Application::Nwchem => &["Northwest Computational Chemistry Package"],
        }
    }

    /// 构造该应用的解析器
    pub fn open(self, config: &ParserConfig) -> Result<Box<dyn CalculationParser>> {
        match self {
            Application::Espresso => Ok(Box::new(espresso::EspressoParser::open(config)?)),
            Application::Vasp => Ok(Box::new(vasp::VaspParser::open(config)?)),
            Application::Nwchem => Ok(Box::new(nwchem::NwchemParser::open(config)?)),
        }
    }
}

impl std::fmt::Display for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 解析器配置
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// 计算工作目录
    pub work_dir: PathBuf,
    /// 标准输出文件（相对工作目录或绝对路径）
    pub stdout_file: Option<PathBuf>,
    /// 声明的程序版本（仅 ESPRESSO 使用）
    pub version: Option<String>,
}

impl ParserConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        ParserConfig {
            work_dir: work_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_stdout(mut self, stdout_file: impl Into<PathBuf>) -> Self {
        self.stdout_file = Some(stdout_file.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 工作目录下的文件路径
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    /// 定位标准输出文件
    ///
    /// 显式指定时直接使用；否则在工作目录顶层按应用的文件名模式查找，
    /// 优先选择开头带有应用识别标记的文件。
    pub fn stdout_path(&self, app: Application) -> Option<PathBuf> {
        if let Some(file) = &self.stdout_file {
            return Some(self.resolve(file));
        }

        let candidates = FileCollector::new(&self.work_dir)
            .with_pattern(app.stdout_patterns())
            .collect();

        candidates
            .iter()
            .find(|c| sniff::head_contains_any(c, app.stdout_markers(), SNIFF_LINES))
            .or_else(|| candidates.first())
            .cloned()
    }
}

impl PropertyKind {
    /// 从解析器取出该物理量；缺失时返回 `Ok(None)`，空集合视为缺失
    pub fn extract(self, parser: &dyn CalculationParser) -> Result<Option<Property>> {
        let data = match self {
            PropertyKind::TotalEnergy => parser.total_energy()?.map(PropertyData::Scalar),
            PropertyKind::FermiEnergy => parser.fermi_energy()?.map(PropertyData::Scalar),
            PropertyKind::TotalEnergyContributions => non_empty(parser.total_energy_contributions()?)
                .map(PropertyData::Contributions),
            PropertyKind::StressTensor => parser.stress_tensor()?.map(PropertyData::Tensor),
            PropertyKind::AtomicForces => {
                non_empty(parser.atomic_forces()?).map(PropertyData::Vectors)
            }
            PropertyKind::EigenvaluesAtKpoints => {
                non_empty(parser.eigenvalues_at_kpoints()?).map(PropertyData::Eigenvalues)
            }
            PropertyKind::ConvergenceElectronic => non_empty(parser.convergence_electronic()?)
                .map(PropertyData::ElectronicConvergence),
            PropertyKind::ConvergenceIonic => {
                non_empty(parser.convergence_ionic()?).map(PropertyData::IonicConvergence)
            }
            PropertyKind::FinalBasis => parser
                .final_basis()?
                .filter(|b| !b.is_empty())
                .map(PropertyData::Basis),
            PropertyKind::FinalLatticeVectors => {
                parser.final_lattice_vectors()?.map(PropertyData::Lattice)
            }
            PropertyKind::ReciprocalLatticeVectors => {
                parser.reciprocal_lattice_vectors()?.map(PropertyData::Lattice)
            }
            PropertyKind::Dos => parser.dos()?.map(PropertyData::Dos),
            PropertyKind::PhononDos => parser.phonon_dos()?.map(PropertyData::PhononDos),
            PropertyKind::PhononDispersions => parser
                .phonon_dispersions()?
                .filter(|d| !d.qpoints.is_empty())
                .map(PropertyData::PhononDispersion),
            PropertyKind::HubbardU => non_empty(parser.hubbard_u()?).map(PropertyData::HubbardU),
            PropertyKind::HubbardV => non_empty(parser.hubbard_v()?).map(PropertyData::HubbardV),
            PropertyKind::PotentialProfile => {
                parser.potential_profile()?.map(PropertyData::PotentialProfile)
            }
            PropertyKind::ReactionEnergies => {
                parser.reaction_energies()?.map(PropertyData::ReactionPath)
            }
        };

        Ok(data.map(|d| Property::new(self, d)))
    }
}

fn non_empty<T>(values: Option<Vec<T>>) -> Option<Vec<T>> {
    values.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    struct Fixed;

    impl CalculationParser for Fixed {
        fn application(&self) -> Application {
            Application::Nwchem
        }

        fn total_energy(&self) -> Result<Option<f64>> {
            Ok(Some(-2084.4))
        }

        fn atomic_forces(&self) -> Result<Option<Vec<Labeled<[f64; 3]>>>> {
            Ok(Some(vec![]))
        }
    }

    #[test]
    fn test_property_extract_absence_and_defaults() {
        let parser = Fixed;

        let energy = PropertyKind::TotalEnergy.extract(&parser).unwrap().unwrap();
        assert_eq!(energy.data, PropertyData::Scalar(-2084.4));
        assert_eq!(energy.units, Some("eV"));

        assert!(PropertyKind::AtomicForces.extract(&parser).unwrap().is_none());
        assert!(PropertyKind::PhononDos.extract(&parser).unwrap().is_none());
        assert_eq!(parser.number_of_atoms().unwrap(), None);
    }

    #[test]
    fn test_stdout_path_prefers_marked_file() {
        let dir = TempDir::new("stdout").unwrap();
        fs::write(dir.path().join("a_dos.out"), "dos.x output\n").unwrap();
        fs::write(
            dir.path().join("b_scf.out"),
            "\n     Program PWSCF v.6.5 starts on 10Jan2020\n",
        )
        .unwrap();

        let config = ParserConfig::new(dir.path());
        let stdout = config.stdout_path(Application::Espresso).unwrap();
        assert!(stdout.ends_with("b_scf.out"));

        let explicit = ParserConfig::new(dir.path()).with_stdout("a_dos.out");
        assert_eq!(
            explicit.stdout_path(Application::Espresso),
            Some(dir.path().join("a_dos.out"))
        );
    }

    #[test]
    fn test_application_names() {
        assert_eq!(Application::Espresso.to_string(), "espresso");
        assert_eq!(
            serde_json::to_value(Application::Nwchem).unwrap(),
            "nwchem"
        );
    }
}
