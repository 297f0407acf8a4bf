//! # pw.x 标准输出
//!
//! 从 pw.x 日志中提取的物理量：总能与分项、费米能、应力、受力、初始结构，
//! 以及弛豫过程的电子/离子收敛轨迹。
//!
//! ## 轨迹对齐
//! 每个离子步以一次 SCF 的 "!" 能量行结束。几何块（`CELL_PARAMETERS` /
//! `ATOMIC_POSITIONS`）在该步弛豫**之后**打印，所以第 i 步的结构是第 i-1 个
//! 几何块，第 0 步使用日志头部的初始结构。`Begin final coordinates` 之后的块
//! 只在步数需要时（vc-relax 的最终 SCF）补到末尾。
//!
//! ## 依赖关系
//! - 被 `parsers/espresso/mod.rs` 使用
//! - 使用 `extract/` 与 `patterns.rs`

use super::patterns::{CONTRIBUTIONS, GEOMETRY_BLOCK, IONIC_STEP_BLOCK};
use crate::error::Result;
use crate::extract::{align_lagged, block_regex, extract_blocks, parse_f64, parse_floats, TextSource};
use crate::models::{
    Basis, CoordinateUnit, ElectronicSteps, EnergyContribution, IonicStep, Labeled, Lattice,
    LatticeUnit, Structure,
};
use crate::units::{self, EnergyUnit, LengthUnit, Mat33};
use log::{debug, warn};

const FINAL_COORDINATES: &str = "Begin final coordinates";
const SCF_START: &str = "Self-consistent Calculation";

fn ry_to_ev(v: f64) -> f64 {
    units::to_ev(v, EnergyUnit::Rydberg)
}

/// 总能 (eV)，取最后一个 "!" 行
pub fn total_energy(src: &TextSource) -> Result<Option<f64>> {
    Ok(src.float("total_energy")?.map(ry_to_ev))
}

/// 费米能 (eV)；绝缘体退回最高占据能级
pub fn fermi_energy(src: &TextSource) -> Result<Option<f64>> {
    match src.float("fermi_energy")? {
        Some(e) => Ok(Some(e)),
        None => src.float("highest_occupied_level"),
    }
}

pub fn program_version(src: &TextSource) -> Result<Option<String>> {
    Ok(src.extract("program_version")?.as_string())
}

pub fn number_of_atoms(src: &TextSource) -> Result<Option<usize>> {
    Ok(src.int("number_of_atoms")?.map(|n| n as usize))
}

/// 晶格参数 (bohr)
pub fn alat(src: &TextSource) -> Result<Option<f64>> {
    src.float("alat")
}

/// 最后一次 SCF 的能量分项 (eV)
pub fn total_energy_contributions(src: &TextSource) -> Result<Vec<EnergyContribution>> {
    let mut contributions = Vec::new();
    for (pattern, name) in CONTRIBUTIONS {
        if let Some(v) = src.float(pattern)? {
            contributions.push(EnergyContribution::new(*name, ry_to_ev(v)));
        }
    }
    Ok(contributions)
}

/// 最后一次应力计算 (kbar)
pub fn stress_tensor(src: &TextSource) -> Result<Option<Mat33>> {
    let rows = src.extract("stress_tensor")?.as_vec3_rows();
    match rows.as_slice() {
        [a, b, c] => Ok(Some([*a, *b, *c])),
        [] => Ok(None),
        other => {
            warn!("Stress tensor has {} rows, expected 3", other.len());
            Ok(None)
        }
    }
}

/// 最后一次受力计算 (eV/Å)，只取紧随标记的 `nat` 行总力
pub fn atomic_forces(src: &TextSource, nat: Option<usize>) -> Result<Vec<Labeled<[f64; 3]>>> {
    let occurrences = nat.map(|n| n as i32).unwrap_or(0);
    let rows = src.extract_n("atomic_forces", occurrences)?.as_f64_rows();

    Ok(rows
        .into_iter()
        .filter(|r| r.len() == 4)
        .map(|r| Labeled {
            id: r[0] as usize,
            value: units::scale_vector([r[1], r[2], r[3]], units::RY_PER_BOHR_TO_EV_PER_ANGSTROM),
        })
        .collect())
}

/// 日志头部（第一次 SCF 之前）
fn header(text: &str) -> &str {
    match text.find(SCF_START) {
        Some(pos) => &text[..pos],
        None => text,
    }
}

/// 日志头部的初始结构：晶格 Å，原子基为晶体坐标，编号从 1 开始
pub fn initial_structure(src: &TextSource) -> Result<Option<Structure>> {
    let head = header(src.text());

    let alat = match src.extract_in(head, "alat")?.as_f64() {
        Some(a) => a,
        None => return Ok(None),
    };
    let axes = src.extract_in(head, "crystal_axes")?.as_vec3_rows();
    if axes.len() != 3 {
        debug!("Crystal axes not found in header");
        return Ok(None);
    }

    let vectors = units::scale_alat(&[axes[0], axes[1], axes[2]], alat, LengthUnit::Bohr);
    let lattice = Lattice {
        vectors,
        alat: units::to_angstrom(alat, LengthUnit::Bohr),
        units: LatticeUnit::Angstrom,
    };

    let nat = match src.extract_in(head, "number_of_atoms")?.as_i64() {
        Some(n) => n as i32,
        None => return Ok(None),
    };
    let species = src.extract_in_n(head, "initial_species", nat)?.as_string_vec();
    let positions = src.extract_in_n(head, "initial_positions", nat)?.as_vec3_rows();
    if species.len() != positions.len() || species.len() != nat as usize {
        warn!(
            "Initial positions incomplete: {} species, {} positions, {} atoms",
            species.len(),
            positions.len(),
            nat
        );
        return Ok(None);
    }

    let factor = alat * units::BOHR_TO_ANGSTROM;
    let cartesian = positions
        .into_iter()
        .map(|p| units::scale_vector(p, factor))
        .collect();
    let basis = Basis::from_lists(species, cartesian, CoordinateUnit::Cartesian, 1).to_crystal(&lattice)?;

    Ok(Some(Structure {
        lattice: Some(lattice),
        basis,
    }))
}

/// `ATOMIC_POSITIONS` 的坐标单位
#[derive(Debug, Clone, Copy, PartialEq)]
enum PositionUnit {
    Crystal,
    Alat,
    Bohr,
    Angstrom,
}

/// 头行中括号内（或关键字后）的单位标记
fn header_option(line: &str) -> String {
    let rest = line
        .split_once(|c: char| c.is_whitespace() || c == '(' || c == '{')
        .map(|(_, r)| r)
        .unwrap_or("");
    rest.trim()
        .trim_matches(|c| c == '(' || c == ')' || c == '{' || c == '}')
        .trim()
        .to_lowercase()
}

/// 一个几何块的原始内容
#[derive(Debug, Clone, PartialEq)]
struct GeometryBlock {
    /// 新晶格 (Å)；没有 `CELL_PARAMETERS` 时沿用上一个晶格
    cell: Option<Mat33>,
    unit: PositionUnit,
    /// `alat` 单位坐标的换算长度 (bohr)
    alat: f64,
    species: Vec<String>,
    coordinates: Vec<[f64; 3]>,
}

fn parse_geometry_block(block: &str, initial_alat: f64) -> Option<GeometryBlock> {
    let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());
    let mut alat = initial_alat;
    let mut cell = None;

    let mut line = lines.next()?;
    if line.to_uppercase().starts_with("CELL_PARAMETERS") {
        let option = header_option(line);
        if let Some((_, value)) = option.split_once('=') {
            alat = parse_f64(value).unwrap_or(initial_alat);
        }

        let mut rows = [[0.0; 3]; 3];
        for row in rows.iter_mut() {
            match parse_floats(lines.next()?).as_deref() {
                Some([x, y, z]) => *row = [*x, *y, *z],
                _ => return None,
            }
        }

        cell = Some(if option.starts_with("bohr") {
            units::scale_alat(&rows, 1.0, LengthUnit::Bohr)
        } else if option.starts_with("angstrom") {
            rows
        } else {
            units::scale_alat(&rows, alat, LengthUnit::Bohr)
        });

        line = lines.next()?;
    }

    let option = header_option(line);
    let unit = if option.starts_with("crystal") {
        PositionUnit::Crystal
    } else if option.starts_with("bohr") {
        PositionUnit::Bohr
    } else if option.starts_with("angstrom") {
        PositionUnit::Angstrom
    } else {
        PositionUnit::Alat
    };

    let mut species = Vec::new();
    let mut coordinates = Vec::new();
    for l in lines {
        let mut words = l.split_whitespace();
        let element = match words.next() {
            Some(e) => e,
            None => continue,
        };
        let xyz: Vec<f64> = words.take(3).filter_map(parse_f64).collect();
        if xyz.len() == 3 {
            species.push(element.to_string());
            coordinates.push([xyz[0], xyz[1], xyz[2]]);
        }
    }

    Some(GeometryBlock {
        cell,
        unit,
        alat,
        species,
        coordinates,
    })
}

impl GeometryBlock {
    /// 以给定晶格（块中没有新晶格时）构造结构
    fn into_structure(self, previous: &Lattice) -> Result<Structure> {
        let lattice = match self.cell {
            Some(vectors) => Lattice {
                vectors,
                alat: units::to_angstrom(self.alat, LengthUnit::Bohr),
                units: LatticeUnit::Angstrom,
            },
            None => previous.clone(),
        };

        let (coordinates, coord_unit) = match self.unit {
            PositionUnit::Crystal => (self.coordinates, CoordinateUnit::Crystal),
            PositionUnit::Angstrom => (self.coordinates, CoordinateUnit::Cartesian),
            PositionUnit::Bohr => (
                self.coordinates
                    .into_iter()
                    .map(|c| units::scale_vector(c, units::BOHR_TO_ANGSTROM))
                    .collect(),
                CoordinateUnit::Cartesian,
            ),
            PositionUnit::Alat => (
                self.coordinates
                    .into_iter()
                    .map(|c| units::scale_vector(c, self.alat * units::BOHR_TO_ANGSTROM))
                    .collect(),
                CoordinateUnit::Cartesian,
            ),
        };

        let basis = Basis::from_lists(self.species, coordinates, coord_unit, 1).to_crystal(&lattice)?;
        Ok(Structure {
            lattice: Some(lattice),
            basis,
        })
    }
}

/// 每个离子步的 SCF 文本块
fn ionic_step_blocks(text: &str) -> Result<Vec<&str>> {
    let re = block_regex("ionic_step", IONIC_STEP_BLOCK)?;
    Ok(extract_blocks(text, &re, |b| b))
}

/// 一个 SCF 块内的逐次迭代能量 (eV)，末尾为收敛能量
fn scf_energies(src: &TextSource, block: &str) -> Result<Vec<f64>> {
    let mut energies = src.extract_in(block, "iteration_energy")?.as_f64_vec();
    if let Some(last) = src.extract_in(block, "total_energy")?.as_f64() {
        energies.push(last);
    }
    Ok(energies.into_iter().map(ry_to_ev).collect())
}

/// 每个离子步的电子迭代能量 (eV)
pub fn convergence_electronic(src: &TextSource) -> Result<Vec<Vec<f64>>> {
    ionic_step_blocks(src.text())?
        .into_iter()
        .map(|block| scf_energies(src, block))
        .collect()
}

/// 弛豫轨迹：能量、结构与电子收敛，结构按一步滞后对齐
pub fn convergence_ionic(src: &TextSource) -> Result<Option<Vec<IonicStep>>> {
    let blocks = ionic_step_blocks(src.text())?;
    if blocks.is_empty() {
        return Ok(None);
    }

    let initial = match initial_structure(src)? {
        Some(s) => s,
        None => {
            warn!("Cannot build ionic trajectory without the initial structure");
            return Ok(None);
        }
    };
    let initial_alat = alat(src)?.unwrap_or(1.0);

    let mut energies = Vec::with_capacity(blocks.len());
    let mut electronic = Vec::with_capacity(blocks.len());
    for block in &blocks {
        let steps = scf_energies(src, block)?;
        match steps.last() {
            Some(e) => energies.push(*e),
            None => continue,
        }
        electronic.push(steps);
    }

    let re = block_regex("geometry", GEOMETRY_BLOCK)?;
    let (intermediate, finale) = match src.text().find(FINAL_COORDINATES) {
        Some(pos) => src.text().split_at(pos),
        None => (src.text(), ""),
    };

    let mut geometries: Vec<GeometryBlock> = extract_blocks(intermediate, &re, |b| {
        parse_geometry_block(b, initial_alat)
    })
    .into_iter()
    .flatten()
    .collect();

    let final_geometry = extract_blocks(finale, &re, |b| parse_geometry_block(b, initial_alat))
        .into_iter()
        .flatten()
        .next();
    if geometries.len() + 1 < energies.len() {
        if let Some(g) = final_geometry {
            geometries.push(g);
        }
    }

    let mut structures = Vec::with_capacity(geometries.len());
    let mut lattice = match &initial.lattice {
        Some(l) => l.clone(),
        None => return Ok(None),
    };
    for g in geometries {
        let s = g.into_structure(&lattice)?;
        if let Some(l) = &s.lattice {
            lattice = l.clone();
        }
        structures.push(s);
    }

    let aligned = align_lagged(energies.len(), &initial, structures)?;

    Ok(Some(
        energies
            .into_iter()
            .zip(electronic)
            .zip(aligned)
            .map(|((energy, data), structure)| IonicStep {
                energy,
                structure,
                electronic: ElectronicSteps { units: "eV", data },
            })
            .collect(),
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::parsers::espresso::patterns::ESPRESSO_PATTERNS;
    use approx::assert_relative_eq;

    const HEADER: &str = "
     Program PWSCF v.6.5 starts on 10Jan2020 at 10:00:00

     bravais-lattice index     =            2
     lattice parameter (alat)  =      10.2000  a.u.
     unit-cell volume          =     265.3020 (a.u.)^3
     number of atoms/cell      =            2
     number of atomic types    =            1

     crystal axes: (cart. coord. in units of alat)
               a(1) = (  -0.500000   0.000000   0.500000 )
               a(2) = (   0.000000   0.500000   0.500000 )
               a(3) = (  -0.500000   0.500000   0.000000 )

   Cartesian axes

     site n.     atom                  positions (alat units)
         1           Si  tau(   1) = (   0.0000000   0.0000000   0.0000000  )
         2           Si  tau(   2) = (   0.2600000   0.2500000   0.2500000  )
";

    fn scf(first: f64, last: f64) -> String {
        format!(
            "
     Self-consistent Calculation

     iteration #  1     ecut=    12.00 Ry     beta= 0.70
     total energy              =     {:.8} Ry
     estimated scf accuracy    <       0.06 Ry

     iteration #  2     ecut=    12.00 Ry     beta= 0.70
     End of self-consistent calculation

     the Fermi energy is     6.2000 ev

!    total energy              =     {:.8} Ry
     estimated scf accuracy    <          4.3E-09 Ry

     The total energy is the sum of the following terms:
     one-electron contribution =       4.80 Ry
     hartree contribution      =       1.10 Ry
     xc contribution           =      -4.80 Ry
     ewald contribution        =     -16.10 Ry

     Forces acting on atoms (cartesian axes, Ry/au):

     atom    1 type  1   force =    -0.00100000    0.00000000    0.00000000
     atom    2 type  1   force =     0.00100000    0.00000000    0.00000000
     The non-local contrib.  to forces
     atom    1 type  1   force =    -0.50000000    0.00000000    0.00000000
     atom    2 type  1   force =     0.50000000    0.00000000    0.00000000

     Computing stress (Cartesian axis) and pressure

          total   stress  (Ry/bohr**3)                   (kbar)     P=       -4.20
  -0.00002857   0.00000000   0.00000000           -4.20        0.00        0.00
   0.00000000  -0.00002857   0.00000000            0.00       -4.20        0.00
   0.00000000   0.00000000  -0.00002857            0.00        0.00       -4.20
",
            first, last
        )
    }

    fn positions(x: f64) -> String {
        format!(
            "
ATOMIC_POSITIONS (alat)
Si            0.0000000000        0.0000000000        0.0000000000
Si            {:.10}        0.2500000000        0.2500000000

     Writing output data file ./pwscf.save/
",
            x
        )
    }

    /// 三步 relax：两个中间几何块，外加 final coordinates
    pub fn relax_output() -> String {
        let mut text = HEADER.to_string();
        text.push_str(&scf(-15.7, -15.80));
        text.push_str(&positions(0.2550));
        text.push_str(&scf(-15.79, -15.81));
        text.push_str(&positions(0.2500));
        text.push_str(&scf(-15.805, -15.82));
        text.push_str("\nBegin final coordinates\n");
        text.push_str(&positions(0.2500));
        text.push_str("End final coordinates\n");
        text
    }

    fn source(text: &str) -> TextSource {
        TextSource::from_text(text, ESPRESSO_PATTERNS).unwrap()
    }

    #[test]
    fn test_final_flagged_energy() {
        let src = source(&relax_output());
        assert_relative_eq!(total_energy(&src).unwrap().unwrap(), -15.82 * units::RYDBERG_TO_EV);
        assert_eq!(fermi_energy(&src).unwrap(), Some(6.2));
        assert_eq!(program_version(&src).unwrap(), Some("6.5".to_string()));
        assert_eq!(number_of_atoms(&src).unwrap(), Some(2));
    }

    #[test]
    fn test_unflagged_energy_is_not_final() {
        let src = source("     total energy              =     -19.00890332 Ry\n");
        assert_eq!(total_energy(&src).unwrap(), None);
    }

    #[test]
    fn test_contributions_stress_forces() {
        let src = source(&relax_output());

        let contributions = total_energy_contributions(&src).unwrap();
        assert_eq!(contributions.len(), 4);
        assert_eq!(contributions[0].name, "one_electron");
        assert_relative_eq!(contributions[3].value, -16.10 * units::RYDBERG_TO_EV);

        let stress = stress_tensor(&src).unwrap().unwrap();
        assert_eq!(stress[0], [-4.20, 0.0, 0.0]);
        assert_eq!(stress[2], [0.0, 0.0, -4.20]);

        let forces = atomic_forces(&src, Some(2)).unwrap();
        assert_eq!(forces.len(), 2);
        assert_eq!(forces[1].id, 2);
        assert_relative_eq!(forces[1].value[0], 0.001 * units::RY_PER_BOHR_TO_EV_PER_ANGSTROM);
    }

    #[test]
    fn test_initial_structure() {
        let src = source(&relax_output());
        let s = initial_structure(&src).unwrap().unwrap();

        let lattice = s.lattice.unwrap();
        assert_relative_eq!(lattice.vectors[0][0], -0.5 * 10.2 * units::BOHR_TO_ANGSTROM);
        assert_eq!(s.basis.len(), 2);
        assert_eq!(s.basis.elements[0].id, 1);
        assert_eq!(s.basis.units, CoordinateUnit::Crystal);
    }

    #[test]
    fn test_electronic_convergence_per_step() {
        let src = source(&relax_output());
        let steps = convergence_electronic(&src).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].len(), 2);
        assert_relative_eq!(steps[2][1], -15.82 * units::RYDBERG_TO_EV);
    }

    #[test]
    fn test_ionic_trajectory_is_lagged() {
        let src = source(&relax_output());
        let steps = convergence_ionic(&src).unwrap().unwrap();
        assert_eq!(steps.len(), 3);

        let initial = initial_structure(&src).unwrap().unwrap();
        assert_eq!(steps[0].structure, initial);

        // 第 1 步使用第一个几何块 (x = 0.255 alat)
        let cart = steps[1]
            .structure
            .basis
            .to_cartesian(steps[1].structure.lattice.as_ref().unwrap());
        assert_relative_eq!(
            cart.coordinates[1].value[0],
            0.255 * 10.2 * units::BOHR_TO_ANGSTROM,
            epsilon = 1e-8
        );
        assert_relative_eq!(steps[2].energy, -15.81 * units::RYDBERG_TO_EV);
        assert_eq!(steps[2].electronic.units, "eV");
    }

    #[test]
    fn test_geometry_block_with_cell() {
        let block = "CELL_PARAMETERS (alat= 10.00000000)\n  -0.5 0.0 0.5\n   0.0 0.5 0.5\n  -0.5 0.5 0.0\n\nATOMIC_POSITIONS (crystal)\nSi 0.0 0.0 0.0\nSi 0.25 0.25 0.25 0 0 0\n";
        let g = parse_geometry_block(block, 10.2).unwrap();
        assert_eq!(g.alat, 10.0);
        assert_eq!(g.unit, PositionUnit::Crystal);
        assert_eq!(g.species.len(), 2);
        assert_relative_eq!(g.cell.unwrap()[0][0], -5.0 * units::BOHR_TO_ANGSTROM);

        let re = block_regex("geometry", GEOMETRY_BLOCK).unwrap();
        let found = extract_blocks(block, &re, |b| b.to_string());
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("CELL_PARAMETERS"));
    }

    #[test]
    fn test_missing_geometry_blocks_is_error() {
        let mut text = HEADER.to_string();
        text.push_str(&scf(-15.7, -15.80));
        text.push_str(&scf(-15.79, -15.81));
        text.push_str(&scf(-15.805, -15.82));
        let src = source(&text);
        assert!(convergence_ionic(&src).is_err());
    }

    #[test]
    fn test_single_scf_has_one_step() {
        let mut text = HEADER.to_string();
        text.push_str(&scf(-15.7, -15.80));
        let steps = convergence_ionic(&source(&text)).unwrap().unwrap();
        assert_eq!(steps.len(), 1);
    }
}
