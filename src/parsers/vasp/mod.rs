//! # VASP 解析门面
//!
//! `vasprun.xml` 提供费米能、结构、本征值、态密度与收敛轨迹；
//! `OUTCAR` 提供总能、能量分项、应力与受力。两者都有的物理量以 OUTCAR 为准，
//! OUTCAR 缺失时退回 vasprun.xml。
//!
//! 打开时检查 vasprun.xml 声明的生成器版本，只接受主版本 5 与 6。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 的 `Application::open` 调用
//! - 子模块: patterns, vasprun

pub mod patterns;
pub mod vasprun;

use self::patterns::{CONTRIBUTIONS, OUTCAR_PATTERNS};
use self::vasprun::Vasprun;
use super::{Application, CalculationParser, ParserConfig};
use crate::batch::FileCollector;
use crate::error::Result;
use crate::extract::TextSource;
use crate::models::{
    Basis, Dos, EigenvalueRecord, EnergyContribution, IonicStep, Labeled, Lattice,
};
use crate::units::Mat33;
use crate::xml::XmlTree;
use log::{debug, warn};

const VASPRUN: &str = "vasprun.xml";

/// Voigt 顺序 (XX YY ZZ XY YZ ZX) → 对称 3×3
pub fn voigt_to_matrix(v: &[f64]) -> Option<Mat33> {
    match v {
        [xx, yy, zz, xy, yz, zx] => Some([[*xx, *xy, *zx], [*xy, *yy, *yz], [*zx, *yz, *zz]]),
        _ => None,
    }
}

#[derive(Debug)]
pub struct VaspParser {
    outcar: TextSource,
    vasprun: Option<Vasprun>,
}

impl VaspParser {
    pub fn open(config: &ParserConfig) -> Result<Self> {
        let outcar = match config.stdout_path(Application::Vasp) {
            Some(path) => TextSource::load(&path, OUTCAR_PATTERNS)?,
            None => TextSource::from_text("", OUTCAR_PATTERNS)?,
        };

        let vasprun = match FileCollector::new(&config.work_dir).with_pattern(VASPRUN).first() {
            Some(path) => XmlTree::from_file(&path)?.map(Vasprun::new),
            None => {
                debug!("No {} in {}", VASPRUN, config.work_dir.display());
                None
            }
        };
        if let Some(v) = &vasprun {
            v.check_version()?;
        }

        Ok(VaspParser { outcar, vasprun })
    }

    fn query_vasprun<T>(&self, f: impl FnOnce(&Vasprun) -> Option<T>) -> Option<T> {
        self.vasprun.as_ref().and_then(f)
    }
}

impl CalculationParser for VaspParser {
    fn application(&self) -> Application {
        Application::Vasp
    }

    fn total_energy(&self) -> Result<Option<f64>> {
        match self.outcar.float("total_energy")? {
            Some(e) => Ok(Some(e)),
            None => Ok(self.query_vasprun(Vasprun::total_energy)),
        }
    }

    fn fermi_energy(&self) -> Result<Option<f64>> {
        match self.query_vasprun(Vasprun::fermi_energy) {
            Some(e) => Ok(Some(e)),
            None => self.outcar.float("fermi_energy"),
        }
    }

    fn total_energy_contributions(&self) -> Result<Option<Vec<EnergyContribution>>> {
        let mut contributions = Vec::new();
        for (pattern, name) in CONTRIBUTIONS {
            if let Some(v) = self.outcar.float(pattern)? {
                contributions.push(EnergyContribution::new(*name, v));
            }
        }
        Ok(Some(contributions))
    }

    fn stress_tensor(&self) -> Result<Option<Mat33>> {
        let rows = self.outcar.extract("stress_voigt")?.as_f64_rows();
        if let Some(last) = rows.last() {
            match voigt_to_matrix(last) {
                Some(m) => return Ok(Some(m)),
                None => warn!("OUTCAR stress has {} components, expected 6", last.len()),
            }
        }
        Ok(self.query_vasprun(Vasprun::stress_tensor))
    }

    fn atomic_forces(&self) -> Result<Option<Vec<Labeled<[f64; 3]>>>> {
        if let Some(nions) = self.outcar.int("number_of_atoms")? {
            let rows = self.outcar.vec3_rows("atomic_forces", nions as i32)?;
            if !rows.is_empty() {
                return Ok(Some(
                    rows.into_iter()
                        .enumerate()
                        .map(|(i, value)| Labeled { id: i + 1, value })
                        .collect(),
                ));
            }
        }
        Ok(self.query_vasprun(Vasprun::atomic_forces))
    }

    fn eigenvalues_at_kpoints(&self) -> Result<Option<Vec<EigenvalueRecord>>> {
        Ok(self.query_vasprun(Vasprun::eigenvalues_at_kpoints))
    }

    fn convergence_electronic(&self) -> Result<Option<Vec<Vec<f64>>>> {
        Ok(self.query_vasprun(|v| Some(v.convergence_electronic())))
    }

    fn convergence_ionic(&self) -> Result<Option<Vec<IonicStep>>> {
        Ok(self.query_vasprun(Vasprun::convergence_ionic))
    }

    fn final_basis(&self) -> Result<Option<Basis>> {
        Ok(self.query_vasprun(Vasprun::final_basis))
    }

    fn final_lattice_vectors(&self) -> Result<Option<Lattice>> {
        Ok(self.query_vasprun(Vasprun::final_lattice_vectors))
    }

    fn reciprocal_lattice_vectors(&self) -> Result<Option<Lattice>> {
        Ok(self.query_vasprun(Vasprun::reciprocal_lattice_vectors))
    }

    fn dos(&self) -> Result<Option<Dos>> {
        Ok(self.query_vasprun(Vasprun::dos))
    }

    fn nspins(&self) -> Result<Option<usize>> {
        match self.query_vasprun(Vasprun::nspins) {
            Some(n) => Ok(Some(n)),
            None => Ok(self.outcar.int("ispin")?.map(|n| n as usize)),
        }
    }

    fn number_of_atoms(&self) -> Result<Option<usize>> {
        match self.outcar.int("number_of_atoms")? {
            Some(n) => Ok(Some(n as usize)),
            None => Ok(self.query_vasprun(Vasprun::final_basis).map(|b| b.len())),
        }
    }
}
