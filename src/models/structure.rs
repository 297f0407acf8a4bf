//! # 晶体结构数据模型
//!
//! 晶格、基（原子种类 + 坐标）与结构。所有解析器在门面层统一输出
//! 以 Å 表示的正空间晶格。
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `models/electronic.rs` 使用
//! - 使用 `units.rs` 做坐标变换

use crate::error::Result;
use crate::units::{self, Mat33};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// 晶格矢量的单位标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatticeUnit {
    Angstrom,
    Bohr,
    /// 以 alat 为单位
    Alat,
    /// 倒空间，以 2π/alat 为单位
    #[serde(rename = "2pi/alat")]
    TwoPiOverAlat,
    /// 倒空间，Å⁻¹（不含 2π）
    #[serde(rename = "1/angstrom")]
    InverseAngstrom,
}

/// 晶格
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    pub vectors: Mat33,
    /// 晶格参数 alat（与 vectors 同一长度单位）
    pub alat: f64,
    pub units: LatticeUnit,
}

impl Serialize for Lattice {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Lattice", 5)?;
        s.serialize_field("a", &self.vectors[0])?;
        s.serialize_field("b", &self.vectors[1])?;
        s.serialize_field("c", &self.vectors[2])?;
        s.serialize_field("alat", &self.alat)?;
        s.serialize_field("units", &self.units)?;
        s.end()
    }
}

/// 坐标单位标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateUnit {
    /// 分数坐标
    Crystal,
    /// 笛卡尔坐标 (Å)
    Cartesian,
}

/// 带编号的值，`id` 在基的 elements/coordinates 之间一一对应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Labeled<T> {
    pub id: usize,
    pub value: T,
}

/// 基：原子种类列表与坐标列表，按 id 对齐
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Basis {
    pub elements: Vec<Labeled<String>>,
    pub coordinates: Vec<Labeled<[f64; 3]>>,
    pub units: CoordinateUnit,
}

impl Basis {
    /// 由 (id, 元素, 坐标) 三元组构建，保证两列表 id 对齐
    pub fn from_sites(sites: Vec<(usize, String, [f64; 3])>, units: CoordinateUnit) -> Self {
        let mut elements = Vec::with_capacity(sites.len());
        let mut coordinates = Vec::with_capacity(sites.len());

        for (id, element, coord) in sites {
            elements.push(Labeled { id, value: element });
            coordinates.push(Labeled { id, value: coord });
        }

        Basis {
            elements,
            coordinates,
            units,
        }
    }

    /// 由元素与坐标列表构建，id 从 `first_id` 开始连续编号
    pub fn from_lists(
        elements: Vec<String>,
        coordinates: Vec<[f64; 3]>,
        units: CoordinateUnit,
        first_id: usize,
    ) -> Self {
        let sites = elements
            .into_iter()
            .zip(coordinates)
            .enumerate()
            .map(|(i, (el, c))| (first_id + i, el, c))
            .collect();
        Basis::from_sites(sites, units)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// elements 与 coordinates 的 id 序列是否逐项一致
    pub fn ids_aligned(&self) -> bool {
        self.elements.len() == self.coordinates.len()
            && self
                .elements
                .iter()
                .zip(&self.coordinates)
                .all(|(e, c)| e.id == c.id)
    }

    fn map_coordinates(&self, units: CoordinateUnit, values: Vec<[f64; 3]>) -> Basis {
        Basis {
            elements: self.elements.clone(),
            coordinates: self
                .coordinates
                .iter()
                .zip(values)
                .map(|(c, value)| Labeled { id: c.id, value })
                .collect(),
            units,
        }
    }

    fn raw_coordinates(&self) -> Vec<[f64; 3]> {
        self.coordinates.iter().map(|c| c.value).collect()
    }

    /// 转换为分数坐标（晶格须为 Å 表示的正空间晶格）
    pub fn to_crystal(&self, lattice: &Lattice) -> Result<Basis> {
        match self.units {
            CoordinateUnit::Crystal => Ok(self.clone()),
            CoordinateUnit::Cartesian => {
                let frac = units::cart_to_frac(&self.raw_coordinates(), &lattice.vectors)?;
                Ok(self.map_coordinates(CoordinateUnit::Crystal, frac))
            }
        }
    }

    /// 转换为笛卡尔坐标 (Å)
    pub fn to_cartesian(&self, lattice: &Lattice) -> Basis {
        match self.units {
            CoordinateUnit::Cartesian => self.clone(),
            CoordinateUnit::Crystal => {
                let cart = units::frac_to_cart(&self.raw_coordinates(), &lattice.vectors);
                self.map_coordinates(CoordinateUnit::Cartesian, cart)
            }
        }
    }
}

/// 结构：晶格（分子体系可缺省）+ 基
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Structure {
    pub lattice: Option<Lattice>,
    pub basis: Basis,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn angstrom_lattice(vectors: Mat33) -> Lattice {
        Lattice {
            vectors,
            alat: 1.0,
            units: LatticeUnit::Angstrom,
        }
    }

    #[test]
    fn test_basis_ids_aligned() {
        let basis = Basis::from_lists(
            vec!["Si".into(), "Si".into()],
            vec![[0.0; 3], [0.25; 3]],
            CoordinateUnit::Crystal,
            1,
        );
        assert_eq!(basis.len(), 2);
        assert!(basis.ids_aligned());
        assert_eq!(basis.elements[1].id, 2);
    }

    #[test]
    fn test_basis_crystal_cartesian_round_trip() {
        let lattice = angstrom_lattice([[0.0, 2.7, 2.7], [2.7, 0.0, 2.7], [2.7, 2.7, 0.0]]);
        let basis = Basis::from_lists(
            vec!["Si".into(), "Si".into()],
            vec![[0.0; 3], [0.25, 0.25, 0.25]],
            CoordinateUnit::Crystal,
            0,
        );

        let cart = basis.to_cartesian(&lattice);
        assert_eq!(cart.units, CoordinateUnit::Cartesian);
        assert_relative_eq!(cart.coordinates[1].value[0], 1.35, epsilon = 1e-12);

        let back = cart.to_crystal(&lattice).unwrap();
        assert!(back.ids_aligned());
        assert_relative_eq!(back.coordinates[1].value[2], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_lattice_serializes_as_abc() {
        let lattice = angstrom_lattice([[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 3.0]]);
        let json = serde_json::to_value(&lattice).unwrap();
        assert_eq!(json["b"][1], 2.0);
        assert_eq!(json["units"], "angstrom");
    }
}
