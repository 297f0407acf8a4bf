//! # ESPRESSO 标准输出模式表
//!
//! pw.x 输出中的物理量。能量行以 Ry 给出，由调用方换算为 eV。

use crate::extract::{OutputType, PatternSpec};

macro_rules! contribution {
    ($name:literal, $label:literal) => {
        PatternSpec {
            name: $name,
            regex: concat!($label, r"\s*=\s*([-+]?\d+\.\d+)\s+Ry"),
            output_type: OutputType::Float,
            start_flag: Some("!"),
            occurrences: -1,
            match_groups: &[],
        }
    };
}

/// 能量分项：(模式名, 输出名)
pub const CONTRIBUTIONS: &[(&str, &str)] = &[
    ("contribution_one_electron", "one_electron"),
    ("contribution_hartree", "hartree"),
    ("contribution_xc", "xc"),
    ("contribution_ewald", "ewald"),
    ("contribution_smearing", "smearing"),
    ("contribution_one_center_paw", "one_center_paw"),
    ("contribution_hubbard", "hubbard"),
];

pub const ESPRESSO_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        name: "program_version",
        regex: r"Program PWSCF v\.?\s*(\d+(?:\.\d+)*)",
        output_type: OutputType::Str,
        start_flag: None,
        occurrences: 1,
        match_groups: &[],
    },
    // 只认 `!` 标记的收敛能量行；SCF 迭代中的 `total energy =` 行由 iteration_energy 收集
    PatternSpec {
        name: "total_energy",
        regex: r"^!\s+total energy\s+=\s+([-+]?\d+\.\d+)\s+Ry",
        output_type: OutputType::Float,
        start_flag: Some("!"),
        occurrences: -1,
        match_groups: &[],
    },
    PatternSpec {
        name: "final_total_energies",
        regex: r"^!\s+total energy\s+=\s+([-+]?\d+\.\d+)\s+Ry",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: 0,
        match_groups: &[],
    },
    // 单次迭代的能量行不带 "!" 前缀
    PatternSpec {
        name: "iteration_energy",
        regex: r"^[ \t]+total energy\s+=\s+([-+]?\d+\.\d+)\s+Ry",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: 0,
        match_groups: &[],
    },
    PatternSpec {
        name: "fermi_energy",
        regex: r"the Fermi energy is\s+([-+]?\d+\.\d+)\s+ev",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: -1,
        match_groups: &[],
    },
    PatternSpec {
        name: "highest_occupied_level",
        regex: r"highest occupied(?:, lowest unoccupied)? level \(ev\):\s+([-+]?\d+\.\d+)",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: -1,
        match_groups: &[],
    },
    PatternSpec {
        name: "number_of_atoms",
        regex: r"number of atoms/cell\s+=\s+(\d+)",
        output_type: OutputType::Int,
        start_flag: None,
        occurrences: 1,
        match_groups: &[],
    },
    PatternSpec {
        name: "alat",
        regex: r"lattice parameter \(alat\)\s+=\s+([-+]?\d+\.\d+)\s+a\.u\.",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: 1,
        match_groups: &[],
    },
    PatternSpec {
        name: "crystal_axes",
        regex: r"a\((\d)\)\s*=\s*\(\s*([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s*\)",
        output_type: OutputType::Float,
        start_flag: Some("crystal axes:"),
        occurrences: 3,
        match_groups: &[2, 3, 4],
    },
    PatternSpec {
        name: "initial_species",
        regex: r"^\s*\d+\s+([A-Za-z][\w-]*)\s+tau\(\s*\d+\)\s*=",
        output_type: OutputType::Str,
        start_flag: Some("positions (alat units)"),
        occurrences: 0,
        match_groups: &[],
    },
    PatternSpec {
        name: "initial_positions",
        regex: r"tau\(\s*\d+\)\s*=\s*\(\s*([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s*\)",
        output_type: OutputType::Float,
        start_flag: Some("positions (alat units)"),
        occurrences: 0,
        match_groups: &[1, 2, 3],
    },
    PatternSpec {
        name: "stress_tensor",
        regex: r"^[ \t]*([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]*$",
        output_type: OutputType::Float,
        start_flag: Some("total   stress"),
        occurrences: 3,
        match_groups: &[4, 5, 6],
    },
    PatternSpec {
        name: "atomic_forces",
        regex: r"atom\s+(\d+)\s+type\s+\d+\s+force\s+=\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)",
        output_type: OutputType::Float,
        start_flag: Some("Forces acting on atoms"),
        occurrences: 0,
        match_groups: &[1, 2, 3, 4],
    },
    contribution!("contribution_one_electron", "one-electron contribution"),
    contribution!("contribution_hartree", "hartree contribution"),
    contribution!("contribution_xc", "xc contribution"),
    contribution!("contribution_ewald", "ewald contribution"),
    contribution!("contribution_smearing", r"smearing contrib\. \(-TS\)"),
    contribution!("contribution_one_center_paw", r"one-center paw contrib\."),
    contribution!("contribution_hubbard", "Hubbard energy"),
    // SternheimerGW 输出，每个 k 点一块
    PatternSpec {
        name: "gw_kpoint_crystal",
        regex: r"GWKpoint cryst:\s*([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: 1,
        match_groups: &[1, 2, 3],
    },
    PatternSpec {
        name: "gw_qp_energies",
        regex: r"GW qp energy \(eV\)((?:\s+[-+]?\d+\.\d+)+)",
        output_type: OutputType::Str,
        start_flag: None,
        occurrences: 1,
        match_groups: &[],
    },
    // matdyn.modes
    PatternSpec {
        name: "phonon_qpoint",
        regex: r"q\s*=\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: 1,
        match_groups: &[1, 2, 3],
    },
    PatternSpec {
        name: "phonon_frequency",
        regex: r"(?:freq|omega)\s*\(\s*\d+\)\s*=\s*[-+]?\d+\.\d+\s*\[THz\]\s*=\s*([-+]?\d+\.\d+)\s*\[cm-1\]",
        output_type: OutputType::Float,
        start_flag: None,
        occurrences: 0,
        match_groups: &[],
    },
    // hp.x Hubbard_parameters.dat
    PatternSpec {
        name: "hubbard_u_row",
        regex: r"^\s*(\d+)\s+\d+\s+\S+\s+-?\d+\s+\d+\s+(\S+)(?:[ \t]+([A-Za-z0-9]+))?[ \t]+([-+]?\d+\.\d+)[ \t]*$",
        output_type: OutputType::Str,
        start_flag: None,
        occurrences: 0,
        match_groups: &[1, 2, 3, 4],
    },
    PatternSpec {
        name: "hubbard_v_row",
        regex: r"^\s*(\d+)\s+(\S+)\s+(\d+)\s+(\S+)\s+([-+]?\d+\.\d+)\s+([-+]?\d+\.\d+)[ \t]*$",
        output_type: OutputType::Str,
        start_flag: None,
        occurrences: 0,
        match_groups: &[1, 2, 3, 4, 5, 6],
    },
];

/// 几何块：可选的 CELL_PARAMETERS 后接 ATOMIC_POSITIONS
pub const GEOMETRY_BLOCK: &str = concat!(
    r"(?m)(?:^CELL_PARAMETERS[^\n]*\n(?:[ \t]*[-+]?\d[^\n]*\n){3}\s*)?",
    r"^ATOMIC_POSITIONS[^\n]*\n(?:[ \t]*[A-Za-z][\w-]*(?:[ \t]+[-+]?\d+\.?\d*(?:[eE][-+]?\d+)?){3}[^\n]*\n?)+"
);

/// 一个离子步：从 SCF 开始到收敛的 "!" 能量行
pub const IONIC_STEP_BLOCK: &str = r"(?ms)Self-consistent Calculation.*?^!\s+total energy[^\n]*";
