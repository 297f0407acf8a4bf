//! # ESPRESSO 后处理数据文件
//!
//! 各后处理程序写出的列式数据文件，在工作目录下按文件名查找：
//!
//! | 物理量 | 程序 | 文件 |
//! |--------|------|------|
//! | 电子态密度 | dos.x / projwfc.x | `*.dos`, `*.pdos_tot`, `*pdos_atm#*` |
//! | 声子态密度 | matdyn.x | `*.dos`（频率表头） |
//! | 声子色散 | matdyn.x | `matdyn.modes` |
//! | Hubbard U/V | hp.x | `*Hubbard_parameters.dat` |
//! | 平均势 | average.x | `avg.dat` |
//! | 反应路径 | neb.x | `<prefix>.dat`（与 `<prefix>.path` 同名） |
//!
//! ## 依赖关系
//! - 被 `parsers/espresso/mod.rs` 使用
//! - 使用 `extract/table.rs`, `extract/blocks.rs`, `batch/collector.rs`

use crate::batch::{FileCollector, DEFAULT_SEARCH_DEPTH};
use crate::error::Result;
use crate::extract::{
    block_regex, columns, read_numeric_table, read_text_lossy, split_blocks, TextSource,
};
use crate::models::{
    Dos, HubbardU, HubbardV, PhononDispersion, PhononDos, PotentialProfile, QpointUnit,
    ReactionPath, SpinDos,
};
use crate::parsers::sniff;
use crate::units::{self, EnergyUnit, Mat33};
use log::{debug, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const SPIN_UP: f64 = 0.5;
const SPIN_DOWN: f64 = -0.5;

fn find_all(work_dir: &Path, pattern: &str) -> Vec<PathBuf> {
    FileCollector::new(work_dir)
        .with_pattern(pattern)
        .max_depth(DEFAULT_SEARCH_DEPTH)
        .collect()
}

fn find_first(work_dir: &Path, pattern: &str) -> Option<PathBuf> {
    FileCollector::new(work_dir)
        .with_pattern(pattern)
        .max_depth(DEFAULT_SEARCH_DEPTH)
        .first()
}

fn is_electronic_dos(path: &Path) -> bool {
    sniff::head_contains(path, "E (eV)", 1)
}

fn is_phonon_dos(path: &Path) -> bool {
    if sniff::head_contains(path, "Frequency", 1) {
        return true;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    !is_electronic_dos(path) && (name.contains("matdyn") || name.contains("phdos"))
}

/// 总态密度列：非自旋 [E, dos, int]，自旋 [E, up, dw, int]
fn total_channels(cols: &[Vec<f64>], spin_polarized: bool) -> Vec<SpinDos> {
    if spin_polarized && cols.len() >= 3 {
        vec![
            SpinDos {
                spin: SPIN_UP,
                values: cols[1].clone(),
            },
            SpinDos {
                spin: SPIN_DOWN,
                values: cols[2].clone(),
            },
        ]
    } else if cols.len() >= 2 {
        vec![SpinDos {
            spin: SPIN_UP,
            values: cols[1].clone(),
        }]
    } else {
        vec![]
    }
}

fn total_dos(work_dir: &Path) -> Result<Option<Dos>> {
    // dos.x 输出优先，其次是 projwfc.x 的 pdos_tot
    let path = match find_all(work_dir, "*.dos")
        .into_iter()
        .find(|p| is_electronic_dos(p))
        .or_else(|| find_first(work_dir, "*.pdos_tot"))
    {
        Some(p) => p,
        None => return Ok(None),
    };
    debug!("Reading DOS from {}", path.display());

    let table = match read_numeric_table(&path)? {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(None),
    };
    let cols = columns(&table);
    let spin_polarized = sniff::head_contains(&path, "dosup", 1);

    Ok(Some(Dos {
        energy: cols[0].clone(),
        total: total_channels(&cols, spin_polarized),
        partial: vec![],
    }))
}

/// `prefix.pdos_atm#1(Si)_wfc#2(p)` → ("Si", "p")
fn pdos_labels(path: &Path) -> Option<(String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"pdos_atm#\d+\(([^)]+)\)_wfc#\d+\(([^)]+)\)").expect("pdos file name regex")
    });
    let name = path.file_name()?.to_string_lossy().into_owned();
    let caps = re.captures(&name)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

fn add_projections(dos: &mut Dos, work_dir: &Path) -> Result<()> {
    for path in find_all(work_dir, "*pdos_atm#*") {
        let (element, orbital) = match pdos_labels(&path) {
            Some(l) => l,
            None => continue,
        };
        let table = match read_numeric_table(&path)? {
            Some(t) if !t.is_empty() => t,
            _ => continue,
        };
        let cols = columns(&table);

        // 列：E, ldos（自旋时为 ldosup, ldosdw），随后是各磁量子数的分量
        if sniff::head_contains(&path, "ldosup", 1) && cols.len() >= 3 {
            dos.add_partial(&element, &orbital, SPIN_UP, cols[1].clone());
            dos.add_partial(&element, &orbital, SPIN_DOWN, cols[2].clone());
        } else if cols.len() >= 2 {
            dos.add_partial(&element, &orbital, SPIN_UP, cols[1].clone());
        }
    }
    Ok(())
}

/// 电子态密度 (eV)，附带按元素与轨道累加的投影态密度
pub fn dos(work_dir: &Path) -> Result<Option<Dos>> {
    let mut dos = match total_dos(work_dir)? {
        Some(d) => d,
        None => return Ok(None),
    };
    add_projections(&mut dos, work_dir)?;
    Ok(Some(dos))
}

/// 声子态密度 (cm⁻¹)
pub fn phonon_dos(work_dir: &Path) -> Result<Option<PhononDos>> {
    let path = match find_all(work_dir, "*.dos").into_iter().find(|p| is_phonon_dos(p)) {
        Some(p) => p,
        None => return Ok(None),
    };

    let cols = match read_numeric_table(&path)? {
        Some(t) => columns(&t),
        None => return Ok(None),
    };
    if cols.len() < 2 {
        return Ok(None);
    }

    Ok(Some(PhononDos {
        frequency: cols[0].clone(),
        total: cols[1].clone(),
    }))
}

/// 声子色散；给出倒格矢逆矩阵时 q 点换成晶体坐标
pub fn phonon_dispersions(
    work_dir: &Path,
    patterns: &TextSource,
    inverse_reciprocal: Option<&Mat33>,
) -> Result<Option<PhononDispersion>> {
    let path = match find_first(work_dir, "matdyn.modes,*.modes") {
        Some(p) => p,
        None => return Ok(None),
    };
    let text = read_text_lossy(&path)?;

    let re = block_regex("qpoint", r"(?m)^\s*q\s*=")?;
    let mut qpoints = Vec::new();
    let mut frequencies = Vec::new();
    for block in split_blocks(&text, &re) {
        let q = match patterns.extract_in(block, "phonon_qpoint")?.as_vec3_rows().first() {
            Some(q) => *q,
            None => continue,
        };
        let freqs = patterns.extract_in(block, "phonon_frequency")?.as_f64_vec();
        if freqs.is_empty() {
            continue;
        }
        qpoints.push(q);
        frequencies.push(freqs);
    }

    if qpoints.is_empty() {
        return Ok(None);
    }

    let (qpoints, qpoint_units) = match inverse_reciprocal {
        Some(inv) => (
            qpoints
                .into_iter()
                .map(|q| units::vec_mat_mul(q, inv))
                .collect::<Vec<_>>(),
            QpointUnit::Crystal,
        ),
        None => (qpoints, QpointUnit::CartesianTwoPiOverAlat),
    };

    Ok(Some(PhononDispersion {
        qpoints,
        qpoint_units,
        frequencies,
    }))
}

fn hubbard_blocks(work_dir: &Path) -> Result<Option<String>> {
    let path = match find_first(work_dir, "*Hubbard_parameters.dat") {
        Some(p) => p,
        None => return Ok(None),
    };
    read_text_lossy(&path).map(Some)
}

fn hubbard_section<'t>(text: &'t str, kind: &str) -> Result<Vec<&'t str>> {
    let re = block_regex("hubbard", r"(?m)^\s*Hubbard (U|V) parameters:")?;
    let marker = format!("Hubbard {} parameters:", kind);
    Ok(split_blocks(text, &re)
        .into_iter()
        .filter(|b| b.contains(&marker))
        .collect())
}

/// hp.x 的 Hubbard U (eV)
pub fn hubbard_u(work_dir: &Path, patterns: &TextSource) -> Result<Option<Vec<HubbardU>>> {
    let text = match hubbard_blocks(work_dir)? {
        Some(t) => t,
        None => return Ok(None),
    };

    let mut values = Vec::new();
    for block in hubbard_section(&text, "U")? {
        for row in patterns.extract_in(block, "hubbard_u_row")?.as_rows() {
            let (id, value) = match (row[0].as_i64(), row[3].as_f64()) {
                (Some(i), Some(v)) => (i as usize, v),
                _ => continue,
            };
            let orbital = row[2].as_str().filter(|s| !s.is_empty()).map(str::to_string);
            values.push(HubbardU {
                id,
                atom: row[1].as_str().unwrap_or_default().to_string(),
                orbital,
                value,
            });
        }
    }

    Ok(if values.is_empty() { None } else { Some(values) })
}

/// hp.x 的 Hubbard V (eV)，距离换算为 Å
pub fn hubbard_v(work_dir: &Path, patterns: &TextSource) -> Result<Option<Vec<HubbardV>>> {
    let text = match hubbard_blocks(work_dir)? {
        Some(t) => t,
        None => return Ok(None),
    };

    let mut values = Vec::new();
    for block in hubbard_section(&text, "V")? {
        for row in patterns.extract_in(block, "hubbard_v_row")?.as_rows() {
            let parsed = (
                row[0].as_i64(),
                row[2].as_i64(),
                row[4].as_f64(),
                row[5].as_f64(),
            );
            if let (Some(id), Some(neighbor_id), Some(distance), Some(value)) = parsed {
                values.push(HubbardV {
                    id: id as usize,
                    atom: row[1].as_str().unwrap_or_default().to_string(),
                    neighbor_id: neighbor_id as usize,
                    neighbor_atom: row[3].as_str().unwrap_or_default().to_string(),
                    distance: distance * units::BOHR_TO_ANGSTROM,
                    value,
                });
            }
        }
    }

    Ok(if values.is_empty() { None } else { Some(values) })
}

/// average.x 的平面/宏观平均势：z 换算为 Å，势换算为 eV
pub fn potential_profile(work_dir: &Path) -> Result<Option<PotentialProfile>> {
    let path = match find_first(work_dir, "avg.dat") {
        Some(p) => p,
        None => return Ok(None),
    };
    let cols = match read_numeric_table(&path)? {
        Some(t) => columns(&t),
        None => return Ok(None),
    };
    if cols.len() < 3 {
        warn!("{} has {} columns, expected 3", path.display(), cols.len());
        return Ok(None);
    }

    Ok(Some(PotentialProfile {
        z: cols[0].iter().map(|z| z * units::BOHR_TO_ANGSTROM).collect(),
        planar: units::all_to_ev(&cols[1], EnergyUnit::Rydberg),
        macroscopic: units::all_to_ev(&cols[2], EnergyUnit::Rydberg),
    }))
}

/// neb.x 的反应路径：与 `*.path` 同名的 `.dat` 文件
pub fn reaction_energies(work_dir: &Path) -> Result<Option<ReactionPath>> {
    let path = match find_first(work_dir, "*.path") {
        Some(p) => p.with_extension("dat"),
        None => return Ok(None),
    };
    let cols = match read_numeric_table(&path)? {
        Some(t) => columns(&t),
        None => return Ok(None),
    };
    if cols.len() < 2 {
        return Ok(None);
    }

    Ok(Some(ReactionPath {
        coordinates: cols[0].clone(),
        energies: cols[1].clone(),
    }))
}
