//! # Quantum ESPRESSO 解析门面
//!
//! 组合三类来源：
//! - pw.x 标准输出（`stdout.rs`）：能量、受力、应力、收敛轨迹
//! - `*.save` 下的 XML（`xml/`）：费米能、晶格、原子基、k 点本征值
//! - 后处理程序的数据文件（`files.rs`）
//!
//! 同一物理量两处都有时优先 XML，XML 缺失时退回文本。
//! 标准输出开头带有 SternheimerGW 标记时，本征值改由 GW 准粒子块给出。
//!
//! ## 版本
//! 决定 XML 纪元的版本依次取：显式配置 → 标准输出中的 `Program PWSCF v.X`
//! → 默认版本 5.4.0。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 的 `Application::open` 调用
//! - 子模块: patterns, stdout, xml, gw, files

pub mod files;
pub mod gw;
pub mod patterns;
pub mod stdout;
pub mod xml;

use self::patterns::ESPRESSO_PATTERNS;
use self::xml::{EspressoXml, Version, DEFAULT_VERSION};
use super::{sniff, Application, CalculationParser, ParserConfig, SNIFF_LINES};
use crate::error::{ExtractError, Result};
use crate::extract::TextSource;
use crate::models::{
    Basis, Dos, EigenvalueRecord, EnergyContribution, HubbardU, HubbardV, IonicStep, Labeled,
    Lattice, PhononDispersion, PhononDos, PotentialProfile, ReactionPath,
};
use crate::units::Mat33;
use log::{debug, info, warn};
use std::path::PathBuf;

/// ESPRESSO 计算的解析器
#[derive(Debug)]
pub struct EspressoParser {
    work_dir: PathBuf,
    stdout: TextSource,
    version: Version,
    xml: Option<EspressoXml>,
    is_gw: bool,
}

impl EspressoParser {
    pub fn open(config: &ParserConfig) -> Result<Self> {
        let stdout = match config.stdout_path(Application::Espresso) {
            Some(path) => TextSource::load(&path, ESPRESSO_PATTERNS)?,
            None => {
                debug!("No ESPRESSO output in {}", config.work_dir.display());
                TextSource::from_text("", ESPRESSO_PATTERNS)?
            }
        };

        let version = resolve_version(config.version.as_deref(), &stdout)?;
        let xml = EspressoXml::open(&config.work_dir, &version)?;

        let is_gw = match stdout.path() {
            Some(path) => sniff::head_contains(path, gw::GW_MARKER, SNIFF_LINES),
            None => false,
        };
        if is_gw {
            info!("SternheimerGW output detected");
        }

        Ok(EspressoParser {
            work_dir: config.work_dir.clone(),
            stdout,
            version,
            xml,
            is_gw,
        })
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn xml(&self) -> Option<&EspressoXml> {
        self.xml.as_ref()
    }

    pub fn stdout(&self) -> &TextSource {
        &self.stdout
    }

    fn inverse_reciprocal(&self) -> Result<Option<Mat33>> {
        match &self.xml {
            Some(x) => x.inverse_reciprocal_lattice_vectors(),
            None => Ok(None),
        }
    }
}

/// 显式版本 → 标准输出推断 → 默认版本
fn resolve_version(explicit: Option<&str>, stdout: &TextSource) -> Result<Version> {
    if let Some(v) = explicit {
        return Version::parse(v);
    }
    if let Some(v) = stdout::program_version(stdout)? {
        debug!("ESPRESSO version {} read from output", v);
        return Version::parse(&v);
    }
    debug!("ESPRESSO version unknown, assuming {}", DEFAULT_VERSION);
    Version::parse(DEFAULT_VERSION)
}

impl CalculationParser for EspressoParser {
    fn application(&self) -> Application {
        Application::Espresso
    }

    fn total_energy(&self) -> Result<Option<f64>> {
        match stdout::total_energy(&self.stdout)? {
            Some(e) => Ok(Some(e)),
            None => Ok(self.xml.as_ref().and_then(EspressoXml::total_energy)),
        }
    }

    fn fermi_energy(&self) -> Result<Option<f64>> {
        if let Some(e) = self.xml.as_ref().and_then(EspressoXml::fermi_energy) {
            return Ok(Some(e));
        }
        stdout::fermi_energy(&self.stdout)
    }

    fn total_energy_contributions(&self) -> Result<Option<Vec<EnergyContribution>>> {
        Ok(Some(stdout::total_energy_contributions(&self.stdout)?))
    }

    fn stress_tensor(&self) -> Result<Option<Mat33>> {
        stdout::stress_tensor(&self.stdout)
    }

    fn atomic_forces(&self) -> Result<Option<Vec<Labeled<[f64; 3]>>>> {
        let nat = self.number_of_atoms()?;
        Ok(Some(stdout::atomic_forces(&self.stdout, nat)?))
    }

    fn eigenvalues_at_kpoints(&self) -> Result<Option<Vec<EigenvalueRecord>>> {
        if self.is_gw {
            return gw::eigenvalues_at_kpoints(&self.stdout);
        }
        match &self.xml {
            Some(x) => x.eigenvalues_at_kpoints(),
            None => Ok(None),
        }
    }

    fn convergence_electronic(&self) -> Result<Option<Vec<Vec<f64>>>> {
        Ok(Some(stdout::convergence_electronic(&self.stdout)?))
    }

    fn convergence_ionic(&self) -> Result<Option<Vec<IonicStep>>> {
        stdout::convergence_ionic(&self.stdout)
    }

    fn final_basis(&self) -> Result<Option<Basis>> {
        if let Some(x) = &self.xml {
            if let Some(b) = x.final_basis()? {
                return Ok(Some(b));
            }
        }
        // 没有 XML 时取轨迹最后一步的结构
        Ok(self.final_structure()?.map(|s| s.basis))
    }

    fn final_lattice_vectors(&self) -> Result<Option<Lattice>> {
        if let Some(l) = self.xml.as_ref().and_then(|x| x.final_lattice_vectors(false)) {
            return Ok(Some(l));
        }
        Ok(self.final_structure()?.and_then(|s| s.lattice))
    }

    fn reciprocal_lattice_vectors(&self) -> Result<Option<Lattice>> {
        Ok(self.xml.as_ref().and_then(|x| x.final_lattice_vectors(true)))
    }

    fn dos(&self) -> Result<Option<Dos>> {
        files::dos(&self.work_dir)
    }

    fn phonon_dos(&self) -> Result<Option<PhononDos>> {
        files::phonon_dos(&self.work_dir)
    }

    fn phonon_dispersions(&self) -> Result<Option<PhononDispersion>> {
        let inverse = self.inverse_reciprocal()?;
        files::phonon_dispersions(&self.work_dir, &self.stdout, inverse.as_ref())
    }

    fn hubbard_u(&self) -> Result<Option<Vec<HubbardU>>> {
        files::hubbard_u(&self.work_dir, &self.stdout)
    }

    fn hubbard_v(&self) -> Result<Option<Vec<HubbardV>>> {
        files::hubbard_v(&self.work_dir, &self.stdout)
    }

    fn potential_profile(&self) -> Result<Option<PotentialProfile>> {
        files::potential_profile(&self.work_dir)
    }

    fn reaction_energies(&self) -> Result<Option<ReactionPath>> {
        files::reaction_energies(&self.work_dir)
    }

    fn nspins(&self) -> Result<Option<usize>> {
        Ok(self.xml.as_ref().and_then(EspressoXml::nspins))
    }

    fn number_of_atoms(&self) -> Result<Option<usize>> {
        match stdout::number_of_atoms(&self.stdout)? {
            Some(n) => Ok(Some(n)),
            None => Ok(self.final_basis()?.map(|b| b.len())),
        }
    }
}

impl EspressoParser {
    /// 文本来源的最终结构：弛豫轨迹的最后一步，否则为初始结构。
    /// 轨迹错位时同样退回初始结构。
    fn final_structure(&self) -> Result<Option<crate::models::Structure>> {
        match stdout::convergence_ionic(&self.stdout) {
            Ok(Some(steps)) => {
                if let Some(last) = steps.into_iter().last() {
                    return Ok(Some(last.structure));
                }
            }
            Ok(None) => {}
            Err(e @ ExtractError::TrajectoryMisaligned { .. }) => {
                warn!("{}; using the initial structure", e);
            }
            Err(e) => return Err(e),
        }
        stdout::initial_structure(&self.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CoordinateUnit, PropertyKind};
    use crate::units::{self, BOHR_TO_ANGSTROM};
    use approx::assert_relative_eq;
    use std::fs;
    use tempdir::TempDir;

    fn relax_dir() -> TempDir {
        let dir = TempDir::new("espresso").unwrap();
        fs::write(dir.path().join("relax.out"), stdout::tests::relax_output()).unwrap();
        dir
    }

    #[test]
    fn test_version_resolution_order() {
        let src = TextSource::from_text(stdout::tests::relax_output(), ESPRESSO_PATTERNS).unwrap();
        assert_eq!(resolve_version(Some("6.2"), &src).unwrap().to_string(), "6.2");
        assert_eq!(resolve_version(None, &src).unwrap().to_string(), "6.5");

        let empty = TextSource::from_text("", ESPRESSO_PATTERNS).unwrap();
        assert_eq!(resolve_version(None, &empty).unwrap().to_string(), DEFAULT_VERSION);
    }

    #[test]
    fn test_text_only_calculation() {
        let dir = relax_dir();
        let parser = EspressoParser::open(&ParserConfig::new(dir.path())).unwrap();

        assert!(parser.xml().is_none());
        assert_eq!(parser.number_of_atoms().unwrap(), Some(2));
        assert_relative_eq!(
            parser.total_energy().unwrap().unwrap(),
            -15.82 * units::RYDBERG_TO_EV
        );
        assert_eq!(parser.fermi_energy().unwrap(), Some(6.2));
        assert_eq!(parser.atomic_forces().unwrap().unwrap().len(), 2);
        assert!(parser.eigenvalues_at_kpoints().unwrap().is_none());
        assert!(parser.reciprocal_lattice_vectors().unwrap().is_none());

        // 没有 XML，最终结构来自轨迹最后一步
        let basis = parser.final_basis().unwrap().unwrap();
        assert_eq!(basis.units, CoordinateUnit::Crystal);
        assert_eq!(basis.len(), 2);
        let lattice = parser.final_lattice_vectors().unwrap().unwrap();
        assert_relative_eq!(lattice.alat, 10.2 * BOHR_TO_ANGSTROM);
    }

    #[test]
    fn test_misaligned_trajectory_falls_back_to_initial_structure() {
        let dir = TempDir::new("espresso").unwrap();
        let broken = stdout::tests::relax_output().replace("ATOMIC_POSITIONS", "ATOMIC_SPECIES");
        fs::write(dir.path().join("relax.out"), broken).unwrap();
        let parser = EspressoParser::open(&ParserConfig::new(dir.path())).unwrap();

        assert!(parser.convergence_ionic().is_err());

        let initial = stdout::initial_structure(&parser.stdout).unwrap().unwrap();
        assert_eq!(parser.final_basis().unwrap(), Some(initial.basis));
        assert_eq!(parser.final_lattice_vectors().unwrap(), initial.lattice);
        assert_eq!(parser.number_of_atoms().unwrap(), Some(2));
    }

    #[test]
    fn test_xml_preferred_over_text() {
        let dir = relax_dir();
        let save = dir.path().join("pwscf.save");
        fs::create_dir_all(&save).unwrap();
        fs::write(save.join("data-file-schema.xml"), xml::modern::tests::SCHEMA_FILE).unwrap();

        let parser = EspressoParser::open(&ParserConfig::new(dir.path())).unwrap();
        assert_eq!(parser.version().to_string(), "6.5");
        assert!(parser.xml().is_some());
        assert_eq!(parser.nspins().unwrap(), Some(2));

        let reciprocal = parser.reciprocal_lattice_vectors().unwrap().unwrap();
        assert_eq!(reciprocal.vectors[1], [1.0, 1.0, 1.0]);

        let property = PropertyKind::EigenvaluesAtKpoints
            .extract(&parser)
            .unwrap()
            .unwrap();
        assert_eq!(property.units, Some("eV"));
    }

    #[test]
    fn test_gw_output_switches_eigenvalue_source() {
        let dir = TempDir::new("espresso").unwrap();
        fs::write(
            dir.path().join("gw.out"),
            "\n     Program SternheimerGW v.0.15 starts\n\n     GWKpoint cart :   0.0 0.0 0.0\n     GWKpoint cryst:   0.0000   0.0000   0.0000\n     GW qp energy (eV)   -6.10   5.81\n",
        )
        .unwrap();

        let parser = EspressoParser::open(&ParserConfig::new(dir.path())).unwrap();
        let records = parser.eigenvalues_at_kpoints().unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].eigenvalues[0].energies, vec![-6.10, 5.81]);
    }

    #[test]
    fn test_unsupported_declared_version() {
        let dir = relax_dir();
        let config = ParserConfig::new(dir.path()).with_version("4.3");
        assert!(EspressoParser::open(&config).is_err());
    }
}
