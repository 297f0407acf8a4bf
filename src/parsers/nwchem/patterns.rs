//! # NWChem 输出模式表
//!
//! 能量以 Hartree 给出；本征值行使用 Fortran `D` 指数。

use crate::extract::{OutputType, PatternSpec};

/// 能量分项：(模式名, 输出名)
pub const CONTRIBUTIONS: &[(&str, &str)] = &[
    ("contribution_one_electron", "one_electron"),
    ("contribution_two_electron", "two_electron"),
    ("contribution_coulomb", "coulomb"),
    ("contribution_xc", "xc"),
    ("contribution_nuclear_repulsion", "nuclear_repulsion"),
];

macro_rules! energy_line {
    ($name:literal, $label:literal) => {
        PatternSpec {
            name: $name,
            regex: concat!($label, r"\s*=\s*([-+]?\d+\.\d+)"),
            output_type: OutputType::Float,
            start_flag: None,
            occurrences: -1,
            match_groups: &[],
        }
    };
}

pub const NWCHEM_PATTERNS: &[PatternSpec] = &[
    energy_line!("total_energy", r"Total (?:DFT|SCF) energy"),
    energy_line!("contribution_one_electron", r"One[ -]electron energy"),
    energy_line!("contribution_two_electron", r"Two[ -]electron energy"),
    energy_line!("contribution_coulomb", r"Coulomb energy"),
    energy_line!("contribution_xc", r"Exchange-Corr\. energy"),
    energy_line!("contribution_nuclear_repulsion", r"^\s*Nuclear repulsion energy"),
    PatternSpec {
        name: "program_version",
        regex: r"Northwest Computational Chemistry Package \(NWChem\)\s+(\d+(?:\.\d+)*)",
        output_type: OutputType::Str,
        start_flag: None,
        occurrences: 1,
        match_groups: &[],
    },
    // 每行：编号 标签 电荷 x y z (Å)
    PatternSpec {
        name: "geometry_row",
        regex: r"^[ \t]*(\d+)[ \t]+([A-Za-z][\w-]*)[ \t]+[-+]?\d+\.\d+[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]*$",
        output_type: OutputType::Str,
        start_flag: None,
        occurrences: 0,
        match_groups: &[1, 2, 3, 4, 5],
    },
    PatternSpec {
        name: "scf_iteration",
        regex: r"^[ \t]*d=\s*\d+,ls=[\d.]+,diis[ \t]+\d+[ \t]+([-+]?\d+\.\d+)",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: 0,
        match_groups: &[],
    },
    PatternSpec {
        name: "mo_vector",
        regex: r"Vector\s+\d+\s+Occ=\s*([-+]?\d+\.\d+[DE][-+]\d+)\s+E=\s*([-+]?\d+\.\d+[DE][-+]\d+)",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: 0,
        match_groups: &[1, 2],
    },
];

/// 最终几何块（Å）
pub const GEOMETRY_BLOCK: &str = concat!(
    r"(?m)Output coordinates in angstroms[^\n]*\n(?:[^\n]*\n){3}",
    r"(?:[ \t]*\d+[ \t]+\S+(?:[ \t]+[-+]?\d+\.\d+){4}[ \t]*\n?)+"
);

/// 每次 SCF 的迭代表头
pub const SCF_BLOCK: &str = r"(?m)^\s*convergence\s+iter\s+energy";

/// 分子轨道分析段落；捕获组区分 alpha/beta
pub const MO_SECTION: &str = r"(?m)^\s*\w+ Final (?:(Alpha|Beta) )?Molecular Orbital Analysis";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PatternRegistry;

    #[test]
    fn test_registry_compiles() {
        let registry = PatternRegistry::new(NWCHEM_PATTERNS).unwrap();
        for (name, _) in CONTRIBUTIONS {
            assert!(registry.get(name).is_ok());
        }
    }
}
