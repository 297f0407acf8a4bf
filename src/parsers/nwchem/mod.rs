//! # NWChem 解析门面
//!
//! 只读标准输出。分子计算没有晶格，本征值只在 Γ 点给出，
//! 能量统一由 Hartree 换算为 eV。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 的 `Application::open` 调用
//! - 子模块: patterns

pub mod patterns;

use self::patterns::{CONTRIBUTIONS, GEOMETRY_BLOCK, MO_SECTION, NWCHEM_PATTERNS, SCF_BLOCK};
use super::{Application, CalculationParser, ParserConfig};
use crate::error::Result;
use crate::extract::{block_regex, extract_blocks, split_blocks, TextSource, Value};
use crate::models::{Basis, CoordinateUnit, EigenvalueRecord, EnergyContribution, SpinChannel};
use crate::units::HARTREE_TO_EV;
use log::debug;

#[derive(Debug)]
pub struct NwchemParser {
    stdout: TextSource,
}

/// 一段分子轨道分析；闭壳层时 alpha 与 beta 均为假
struct MoSection<'t> {
    beta: bool,
    alpha: bool,
    text: &'t str,
}

impl NwchemParser {
    pub fn open(config: &ParserConfig) -> Result<Self> {
        let stdout = match config.stdout_path(Application::Nwchem) {
            Some(path) => TextSource::load(&path, NWCHEM_PATTERNS)?,
            None => TextSource::from_text("", NWCHEM_PATTERNS)?,
        };
        Ok(NwchemParser { stdout })
    }

    pub fn program_version(&self) -> Result<Option<String>> {
        Ok(self.stdout.extract("program_version")?.as_string())
    }

    fn mo_sections(&self) -> Result<Vec<MoSection<'_>>> {
        let re = block_regex("nwchem_mo_section", MO_SECTION)?;
        Ok(split_blocks(self.stdout.text(), &re)
            .into_iter()
            .map(|text| {
                let kind = re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str());
                MoSection {
                    beta: kind == Some("Beta"),
                    alpha: kind == Some("Alpha"),
                    text,
                }
            })
            .collect())
    }

    fn channel(&self, section: &str, spin: f64) -> Result<SpinChannel> {
        let (occupations, energies): (Vec<f64>, Vec<f64>) = self
            .stdout
            .extract_in(section, "mo_vector")?
            .as_f64_rows()
            .into_iter()
            .filter(|r| r.len() == 2)
            .map(|r| (r[0], r[1] * HARTREE_TO_EV))
            .unzip();
        Ok(SpinChannel::new(energies, occupations, spin))
    }
}

impl CalculationParser for NwchemParser {
    fn application(&self) -> Application {
        Application::Nwchem
    }

    fn total_energy(&self) -> Result<Option<f64>> {
        Ok(self.stdout.float("total_energy")?.map(|e| e * HARTREE_TO_EV))
    }

    fn total_energy_contributions(&self) -> Result<Option<Vec<EnergyContribution>>> {
        let mut contributions = Vec::new();
        for (pattern, name) in CONTRIBUTIONS {
            if let Some(v) = self.stdout.float(pattern)? {
                contributions.push(EnergyContribution::new(*name, v * HARTREE_TO_EV));
            }
        }
        Ok(Some(contributions))
    }

    /// 最后一个 "Output coordinates in angstroms" 块
    fn final_basis(&self) -> Result<Option<Basis>> {
        let re = block_regex("nwchem_geometry", GEOMETRY_BLOCK)?;
        let block = match extract_blocks(self.stdout.text(), &re, |b| b).pop() {
            Some(b) => b,
            None => return Ok(None),
        };

        let sites = self
            .stdout
            .extract_in(block, "geometry_row")?
            .as_rows()
            .iter()
            .filter_map(|row| match row.as_slice() {
                [Value::Str(id), Value::Str(tag), Value::Str(x), Value::Str(y), Value::Str(z)] => {
                    let coord = [
                        crate::extract::parse_f64(x)?,
                        crate::extract::parse_f64(y)?,
                        crate::extract::parse_f64(z)?,
                    ];
                    Some((id.parse::<usize>().ok()?, tag.clone(), coord))
                }
                _ => None,
            })
            .collect::<Vec<_>>();

        if sites.is_empty() {
            return Ok(None);
        }
        Ok(Some(Basis::from_sites(sites, CoordinateUnit::Cartesian)))
    }

    /// Γ 点本征值；开壳层输出 alpha (+0.5) 与 beta (-0.5) 两个通道
    fn eigenvalues_at_kpoints(&self) -> Result<Option<Vec<EigenvalueRecord>>> {
        let sections = self.mo_sections()?;
        let last = match sections.last() {
            Some(s) => s,
            None => {
                debug!("No molecular orbital analysis in NWChem output");
                return Ok(None);
            }
        };

        let eigenvalues = if last.beta {
            let alpha = sections.iter().rev().find(|s| s.alpha);
            let mut channels = Vec::new();
            if let Some(a) = alpha {
                channels.push(self.channel(a.text, 0.5)?);
            }
            channels.push(self.channel(last.text, -0.5)?);
            channels
        } else {
            vec![self.channel(last.text, 0.5)?]
        };

        if eigenvalues.iter().all(|c| c.energies.is_empty()) {
            return Ok(None);
        }

        Ok(Some(vec![EigenvalueRecord {
            kpoint: [0.0, 0.0, 0.0],
            weight: 1.0,
            eigenvalues,
        }]))
    }

    /// 每次 SCF 的迭代能量 (eV)
    fn convergence_electronic(&self) -> Result<Option<Vec<Vec<f64>>>> {
        let re = block_regex("nwchem_scf", SCF_BLOCK)?;
        let mut steps = Vec::new();
        for block in split_blocks(self.stdout.text(), &re) {
            let energies: Vec<f64> = self
                .stdout
                .extract_in(block, "scf_iteration")?
                .as_f64_vec()
                .into_iter()
                .map(|e| e * HARTREE_TO_EV)
                .collect();
            if !energies.is_empty() {
                steps.push(energies);
            }
        }
        Ok(Some(steps))
    }

    fn nspins(&self) -> Result<Option<usize>> {
        let sections = self.mo_sections()?;
        Ok(sections
            .last()
            .map(|s| if s.beta || s.alpha { 2 } else { 1 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;
    use tempdir::TempDir;

    const WATER: &str = r#"
              Northwest Computational Chemistry Package (NWChem) 6.8
              ------------------------------------------------------

                             Geometry "geometry" -> ""
                             -------------------------

 Output coordinates in angstroms (scale by  1.889725989 to convert to a.u.)

  No.       Tag          Charge          X              Y              Z
 ---- ---------------- ---------- -------------- -------------- --------------
    1 O                    8.0000     0.00000000     0.00000000     0.12000000
    2 H                    1.0000     0.00000000     0.76000000    -0.47000000
    3 H                    1.0000     0.00000000    -0.76000000    -0.47000000

      Atomic Mass
      -----------

      O                 15.994910
      H                  1.007825

         ----------------------------------------------
         convergence    iter        energy       DeltaE   RMS-Dens  Diis-err    time
 ---------------- ----- ----------------- --------- --------- ---------  ------
     d= 0,ls=0.0,diis     1    -76.3783517208 -8.55D+01  2.94D-02  3.93D-01     0.3
     d= 0,ls=0.0,diis     2    -76.4000000000 -2.17D-02  1.50D-02  4.97D-01     0.5
     d= 0,ls=0.0,diis     3    -76.4197379235 -1.97D-02  1.00D-03  1.00D-03     0.7

         Total DFT energy =      -76.419737923537
      One electron energy =     -123.023468265591
           Coulomb energy =       46.835826356400
    Exchange-Corr. energy =       -9.351462474184
 Nuclear repulsion energy =        9.119366459838

                       DFT Final Molecular Orbital Analysis
                       ------------------------------------

 Vector    1  Occ=2.000000D+00  E=-1.913801D+01
              MO Center= -2.2D-13,  7.4D-14,  9.5D-02, r^2= 1.5D-02
 Vector    2  Occ=2.000000D+00  E=-9.973140D-01
              MO Center=  5.0D-12, -4.3D-12, -1.1D-01, r^2= 5.0D-01
 Vector    3  Occ=0.000000D+00  E= 4.500000D-02
              MO Center=  1.0D-12,  2.0D-12, -3.0D-01, r^2= 1.2D+00

 center of mass
 --------------
"#;

    const OPEN_SHELL: &str = r#"
                    DFT Final Alpha Molecular Orbital Analysis
                    ------------------------------------------

 Vector    1  Occ=1.000000D+00  E=-5.000000D-01
 Vector    2  Occ=0.000000D+00  E= 1.000000D-01

                     DFT Final Beta Molecular Orbital Analysis
                     -----------------------------------------

 Vector    1  Occ=0.000000D+00  E=-2.000000D-01
"#;

    fn parser(text: &str) -> NwchemParser {
        NwchemParser {
            stdout: TextSource::from_text(text, NWCHEM_PATTERNS).unwrap(),
        }
    }

    #[test]
    fn test_energies_in_ev() {
        let p = parser(WATER);
        assert_relative_eq!(
            p.total_energy().unwrap().unwrap(),
            -76.419737923537 * HARTREE_TO_EV,
            epsilon = 1e-9
        );

        let contributions = p.total_energy_contributions().unwrap().unwrap();
        let names: Vec<&str> = contributions.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["one_electron", "coulomb", "xc", "nuclear_repulsion"]);
        assert_relative_eq!(
            contributions[3].value,
            9.119366459838 * HARTREE_TO_EV,
            epsilon = 1e-9
        );
        assert_eq!(p.program_version().unwrap().as_deref(), Some("6.8"));
    }

    #[test]
    fn test_final_basis_is_cartesian_one_based() {
        let basis = parser(WATER).final_basis().unwrap().unwrap();
        assert_eq!(basis.len(), 3);
        assert_eq!(basis.units, CoordinateUnit::Cartesian);
        assert_eq!(basis.elements[0].id, 1);
        assert_eq!(basis.elements[2].value, "H");
        assert_eq!(basis.coordinates[1].value, [0.0, 0.76, -0.47]);
        assert_eq!(parser(WATER).number_of_atoms().unwrap(), Some(3));
    }

    #[test]
    fn test_closed_shell_gamma_eigenvalues() {
        let p = parser(WATER);
        let records = p.eigenvalues_at_kpoints().unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kpoint, [0.0, 0.0, 0.0]);
        assert_eq!(records[0].weight, 1.0);

        let channel = &records[0].eigenvalues[0];
        assert_eq!(records[0].eigenvalues.len(), 1);
        assert_eq!(channel.spin, 0.5);
        assert_eq!(channel.occupations, vec![2.0, 2.0, 0.0]);
        assert_relative_eq!(channel.energies[1], -0.997314 * HARTREE_TO_EV, epsilon = 1e-9);
        assert_eq!(p.nspins().unwrap(), Some(1));
    }

    #[test]
    fn test_open_shell_has_two_channels() {
        let p = parser(OPEN_SHELL);
        let records = p.eigenvalues_at_kpoints().unwrap().unwrap();
        let channels = &records[0].eigenvalues;

        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].spin, 0.5);
        assert_eq!(channels[0].energies.len(), 2);
        assert_eq!(channels[1].spin, -0.5);
        assert_eq!(channels[1].occupations, vec![0.0]);
        assert_eq!(p.nspins().unwrap(), Some(2));
    }

    #[test]
    fn test_convergence_electronic() {
        let steps = parser(WATER).convergence_electronic().unwrap().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].len(), 3);
        assert_relative_eq!(steps[0][2], -76.4197379235 * HARTREE_TO_EV, epsilon = 1e-9);
    }

    #[test]
    fn test_open_from_work_dir() {
        let dir = TempDir::new("nwchem").unwrap();
        fs::write(dir.path().join("water.nwo"), WATER).unwrap();

        let p = NwchemParser::open(&ParserConfig::new(dir.path())).unwrap();
        assert!(p.total_energy().unwrap().is_some());
        assert!(p.final_lattice_vectors().unwrap().is_none());
    }

    #[test]
    fn test_empty_output_reports_nothing() {
        let p = parser("");
        assert!(p.total_energy().unwrap().is_none());
        assert!(p.final_basis().unwrap().is_none());
        assert!(p.eigenvalues_at_kpoints().unwrap().is_none());
        assert_eq!(p.convergence_electronic().unwrap(), Some(vec![]));
    }
}
