//! # 单位与坐标换算
//!
//! 无状态的数值变换：原子单位 → eV/Å、分数坐标 ↔ 笛卡尔坐标、
//! alat 相对晶格 → 绝对长度。所有函数都返回新值，不修改输入。
//!
//! 注意顺序：alat 缩放必须先于分数 → 笛卡尔投影，
//! 投影假定晶格矢量已是绝对长度。
//!
//! ## 依赖关系
//! - 被 `models/`、`parsers/` 使用
//! - 无外部模块依赖

use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};

/// 3x3 矩阵，行向量表示 a, b, c
pub type Mat33 = [[f64; 3]; 3];

// ─────────────────────────────────────────────────────────────
// 物理常数 (CODATA 2018)
// ─────────────────────────────────────────────────────────────

pub const HARTREE_TO_EV: f64 = 27.211386245988;
pub const RYDBERG_TO_EV: f64 = HARTREE_TO_EV / 2.0;
pub const BOHR_TO_ANGSTROM: f64 = 0.529177210903;

pub const RY_PER_BOHR_TO_EV_PER_ANGSTROM: f64 = RYDBERG_TO_EV / BOHR_TO_ANGSTROM;
pub const HARTREE_PER_BOHR_TO_EV_PER_ANGSTROM: f64 = HARTREE_TO_EV / BOHR_TO_ANGSTROM;

/// 1 Ry/bohr³ = 147105.08 kbar
pub const RY_PER_BOHR3_TO_KBAR: f64 = 147_105.078_0;

/// 1 THz = 33.35641 cm⁻¹
pub const THZ_TO_CM1: f64 = 33.356_409_519_815;

/// 能量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyUnit {
    Hartree,
    Rydberg,
    Ev,
}

impl EnergyUnit {
    /// 换算到 eV 的系数
    pub fn factor(self) -> f64 {
        match self {
            EnergyUnit::Hartree => HARTREE_TO_EV,
            EnergyUnit::Rydberg => RYDBERG_TO_EV,
            EnergyUnit::Ev => 1.0,
        }
    }

    /// 从文件中的单位标记识别（大小写不敏感）
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "hartree" | "ha" | "au" | "a.u." => Some(EnergyUnit::Hartree),
            "rydberg" | "ry" => Some(EnergyUnit::Rydberg),
            "ev" => Some(EnergyUnit::Ev),
            _ => None,
        }
    }
}

/// 长度单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    Bohr,
    Angstrom,
}

impl LengthUnit {
    pub fn factor(self) -> f64 {
        match self {
            LengthUnit::Bohr => BOHR_TO_ANGSTROM,
            LengthUnit::Angstrom => 1.0,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "bohr" | "a.u." | "au" => Some(LengthUnit::Bohr),
            "angstrom" | "ang" | "a" => Some(LengthUnit::Angstrom),
            _ => None,
        }
    }
}

/// 能量换算到 eV
pub fn to_ev(value: f64, unit: EnergyUnit) -> f64 {
    value * unit.factor()
}

/// 批量能量换算到 eV
pub fn all_to_ev(values: &[f64], unit: EnergyUnit) -> Vec<f64> {
    values.iter().map(|v| to_ev(*v, unit)).collect()
}

/// 长度换算到 Å
pub fn to_angstrom(value: f64, unit: LengthUnit) -> f64 {
    value * unit.factor()
}

/// 向量逐分量缩放
pub fn scale_vector(v: [f64; 3], factor: f64) -> [f64; 3] {
    [v[0] * factor, v[1] * factor, v[2] * factor]
}

/// 以 alat 为单位的晶格矢量 → 绝对长度 (Å)
///
/// 每个分量乘以 alat 与长度单位常数。
pub fn scale_alat(vectors: &Mat33, alat: f64, unit: LengthUnit) -> Mat33 {
    let factor = alat * unit.factor();
    [
        scale_vector(vectors[0], factor),
        scale_vector(vectors[1], factor),
        scale_vector(vectors[2], factor),
    ]
}

/// `scale_alat` 的逆变换
pub fn unscale_alat(vectors: &Mat33, alat: f64, unit: LengthUnit) -> Mat33 {
    let factor = 1.0 / (alat * unit.factor());
    [
        scale_vector(vectors[0], factor),
        scale_vector(vectors[1], factor),
        scale_vector(vectors[2], factor),
    ]
}

/// 行向量乘矩阵：`v · M`
pub fn vec_mat_mul(v: [f64; 3], m: &Mat33) -> [f64; 3] {
    [
        v[0] * m[0][0] + v[1] * m[1][0] + v[2] * m[2][0],
        v[0] * m[0][1] + v[1] * m[1][1] + v[2] * m[2][1],
        v[0] * m[0][2] + v[1] * m[1][2] + v[2] * m[2][2],
    ]
}

/// 行列式
pub fn determinant(m: &Mat33) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// 3x3 矩阵求逆，奇异矩阵返回错误
pub fn invert_3x3(m: &Mat33) -> Result<Mat33> {
    let det = determinant(m);

    if det.abs() < 1e-12 {
        return Err(ExtractError::SingularMatrix(format!(
            "determinant {:e} of {:?}",
            det, m
        )));
    }

    Ok([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
        ],
    ])
}

/// 分数坐标 → 笛卡尔坐标：`coord · lattice`
pub fn frac_to_cart(coords: &[[f64; 3]], lattice: &Mat33) -> Vec<[f64; 3]> {
    coords.iter().map(|c| vec_mat_mul(*c, lattice)).collect()
}

/// 笛卡尔坐标 → 分数坐标：`coord · lattice⁻¹`
pub fn cart_to_frac(coords: &[[f64; 3]], lattice: &Mat33) -> Result<Vec<[f64; 3]>> {
    let inv = invert_3x3(lattice)?;
    Ok(coords.iter().map(|c| vec_mat_mul(*c, &inv)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FCC: Mat33 = [[-0.5, 0.0, 0.5], [0.0, 0.5, 0.5], [-0.5, 0.5, 0.0]];

    #[test]
    fn test_rydberg_is_half_hartree() {
        assert_relative_eq!(RYDBERG_TO_EV, 13.605693122994, epsilon = 1e-9);
        assert_relative_eq!(to_ev(-19.00890332, EnergyUnit::Rydberg), -258.6293, epsilon = 1e-3);
    }

    #[test]
    fn test_alat_round_trip() {
        let alat = 10.2;
        let scaled = scale_alat(&FCC, alat, LengthUnit::Bohr);
        assert_relative_eq!(scaled[0][0], -0.5 * 10.2 * BOHR_TO_ANGSTROM, epsilon = 1e-12);

        let back = unscale_alat(&scaled, alat, LengthUnit::Bohr);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(back[i][j], FCC[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_frac_cart_round_trip() {
        let lattice = scale_alat(&FCC, 10.2, LengthUnit::Bohr);
        let frac = vec![[0.0, 0.0, 0.0], [0.25, 0.25, 0.25], [0.1, 0.7, 0.33]];

        let cart = frac_to_cart(&frac, &lattice);
        let back = cart_to_frac(&cart, &lattice).unwrap();

        for (a, b) in frac.iter().zip(back.iter()) {
            for k in 0..3 {
                assert_relative_eq!(a[k], b[k], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_singular_matrix_is_error() {
        let flat = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
        assert!(matches!(
            invert_3x3(&flat),
            Err(ExtractError::SingularMatrix(_))
        ));
    }

    #[test]
    fn test_unit_labels() {
        assert_eq!(EnergyUnit::from_label("Hartree"), Some(EnergyUnit::Hartree));
        assert_eq!(EnergyUnit::from_label(" Ry "), Some(EnergyUnit::Rydberg));
        assert_eq!(LengthUnit::from_label("Bohr"), Some(LengthUnit::Bohr));
        assert_eq!(LengthUnit::from_label("furlong"), None);
    }
}
