//! # OUTCAR 模式表

use crate::extract::{OutputType, PatternSpec};

const FREE_ENERGY_BLOCK: &str = "Free energy of the ion-electron system";

macro_rules! contribution {
    ($name:literal, $tag:literal) => {
        PatternSpec {
            name: $name,
            regex: concat!(r"\b", $tag, r"\s*=\s*([-+]?\d+\.\d+)"),
            output_type: OutputType::Float,
            start_flag: Some(FREE_ENERGY_BLOCK),
            occurrences: 1,
            match_groups: &[],
        }
    };
}

/// 能量分项：(模式名, 输出名)
pub const CONTRIBUTIONS: &[(&str, &str)] = &[
    ("contribution_alpha_z", "alpha_z"),
    ("contribution_ewald", "ewald"),
    ("contribution_hartree", "hartree"),
    ("contribution_exchange", "exchange"),
    ("contribution_xc", "xc"),
    ("contribution_entropy", "entropy"),
    ("contribution_eigenvalues", "eigenvalues"),
    ("contribution_atomic", "atomic"),
];

pub const OUTCAR_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        name: "total_energy",
        regex: r"free\s+energy\s+TOTEN\s+=\s+([-+]?\d+\.\d+)\s+eV",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: -1,
        match_groups: &[],
    },
    PatternSpec {
        name: "fermi_energy",
        regex: r"E-fermi\s*:\s*([-+]?\d+\.\d+)",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: -1,
        match_groups: &[],
    },
    PatternSpec {
        name: "number_of_atoms",
        regex: r"NIONS\s*=\s*(\d+)",
        output_type: OutputType::Int,
        start_flag: None,
        occurrences: 1,
        match_groups: &[],
    },
    PatternSpec {
        name: "ispin",
        regex: r"ISPIN\s*=\s*(\d)",
        output_type: OutputType::Int,
        start_flag: None,
        occurrences: 1,
        match_groups: &[],
    },
    // XX YY ZZ XY YZ ZX
    PatternSpec {
        name: "stress_voigt",
        regex: r"in kB\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: -1,
        match_groups: &[1, 2, 3, 4, 5, 6],
    },
    PatternSpec {
        name: "atomic_forces",
        regex: r"^[ \t]*[-+]?\d+\.\d+[ \t]+[-+]?\d+\.\d+[ \t]+[-+]?\d+\.\d+[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]*$",
        output_type: OutputType::Float,
        start_flag: Some("TOTAL-FORCE (eV/Angst)"),
        occurrences: 0,
        match_groups: &[1, 2, 3],
    },
    contribution!("contribution_alpha_z", "PSCENC"),
    contribution!("contribution_ewald", "TEWEN"),
    contribution!("contribution_hartree", "DENC"),
    contribution!("contribution_exchange", "EXHF"),
    contribution!("contribution_xc", "XCENC"),
    contribution!("contribution_entropy", "EENTRO"),
    contribution!("contribution_eigenvalues", "EBANDS"),
    contribution!("contribution_atomic", "EATOM"),
];
