//! # ESPRESSO XML 导航器与版本分派
//!
//! 两个模式纪元各自持有标签路径与解码规则，在构造时按版本一次性选定：
//! - `Legacy`: `data-file.xml`，带类型属性，经共享转换表解码
//! - `Modern`: `data-file-schema.xml`，固定标签结构
//!
//! 纪元之上是统一契约：费米能、自旋数、正/倒格矢、k 点本征值、最终原子基。
//! k 点坐标由笛卡尔 (2π/alat) 经倒格矢逆矩阵换成晶体坐标；
//! 原子坐标先由 bohr 换成 Å，再投影到晶体坐标。
//!
//! ## 依赖关系
//! - 被 `parsers/espresso/mod.rs` 使用
//! - 子模块: version, legacy, modern

pub mod legacy;
pub mod modern;
pub mod version;

use crate::batch::{FileCollector, DEFAULT_SEARCH_DEPTH};
use crate::error::Result;
use crate::models::{Basis, EigenvalueRecord, Labeled, Lattice, LatticeUnit, SpinChannel};
use crate::units::{self, LengthUnit, Mat33};
use crate::xml::XmlTree;
use log::{debug, info};
use std::path::Path;

pub use legacy::LegacyXml;
pub use modern::ModernXml;
pub use version::{SchemaEpoch, Version, DEFAULT_VERSION, MODERN_SCHEMA_THRESHOLD};

/// 纪元导航器输出的原始 k 点：笛卡尔坐标 (2π/alat)，能量已为 eV
#[derive(Debug, Clone, PartialEq)]
pub struct RawKpoint {
    pub cartesian: [f64; 3],
    pub weight: f64,
    pub channels: Vec<SpinChannel>,
}

/// 按纪元区分的导航器
#[derive(Debug, Clone)]
pub enum EspressoXml {
    Legacy(LegacyXml),
    Modern(ModernXml),
}

impl EspressoXml {
    /// 按版本选定纪元，在工作目录下查找对应的 XML 文件
    ///
    /// 版本不受支持时报错；文件不存在或无法解析时返回 `Ok(None)`。
    pub fn open(work_dir: &Path, version: &Version) -> Result<Option<EspressoXml>> {
        let epoch = SchemaEpoch::for_version(version)?;
        info!("ESPRESSO {} uses {:?} XML schema", version, epoch);

        let path = match FileCollector::new(work_dir)
            .with_pattern(epoch.file_name())
            .max_depth(DEFAULT_SEARCH_DEPTH)
            .first()
        {
            Some(p) => p,
            None => {
                debug!("No {} below {}", epoch.file_name(), work_dir.display());
                return Ok(None);
            }
        };

        let tree = match XmlTree::from_file(&path)? {
            Some(t) => t,
            None => return Ok(None),
        };

        Ok(Some(EspressoXml::from_tree(epoch, tree, &path)))
    }

    pub fn from_tree(epoch: SchemaEpoch, tree: XmlTree, path: &Path) -> EspressoXml {
        match epoch {
            SchemaEpoch::Legacy => EspressoXml::Legacy(LegacyXml::new(tree, path)),
            SchemaEpoch::Modern => EspressoXml::Modern(ModernXml::new(tree)),
        }
    }

    pub fn epoch(&self) -> SchemaEpoch {
        match self {
            EspressoXml::Legacy(_) => SchemaEpoch::Legacy,
            EspressoXml::Modern(_) => SchemaEpoch::Modern,
        }
    }

    /// 费米能 (eV)
    pub fn fermi_energy(&self) -> Option<f64> {
        match self {
            EspressoXml::Legacy(x) => x.fermi_energy(),
            EspressoXml::Modern(x) => x.fermi_energy(),
        }
    }

    pub fn total_energy(&self) -> Option<f64> {
        match self {
            EspressoXml::Legacy(_) => None,
            EspressoXml::Modern(x) => x.total_energy(),
        }
    }

    pub fn nspins(&self) -> Option<usize> {
        match self {
            EspressoXml::Legacy(x) => x.nspins(),
            EspressoXml::Modern(x) => x.nspins(),
        }
    }

    /// 晶格参数 (bohr)
    pub fn alat(&self) -> Option<f64> {
        match self {
            EspressoXml::Legacy(x) => x.alat(),
            EspressoXml::Modern(x) => x.alat(),
        }
    }

    fn direct_lattice_bohr(&self) -> Option<Mat33> {
        match self {
            EspressoXml::Legacy(x) => x.direct_lattice_bohr(),
            EspressoXml::Modern(x) => x.direct_lattice_bohr(),
        }
    }

    fn reciprocal_lattice(&self) -> Option<Mat33> {
        match self {
            EspressoXml::Legacy(x) => x.reciprocal_lattice(),
            EspressoXml::Modern(x) => x.reciprocal_lattice(),
        }
    }

    /// 最终晶格：正格矢以 Å 给出；倒格矢保持 2π/alat 单位
    pub fn final_lattice_vectors(&self, reciprocal: bool) -> Option<Lattice> {
        let alat = units::to_angstrom(self.alat()?, LengthUnit::Bohr);

        if reciprocal {
            return Some(Lattice {
                vectors: self.reciprocal_lattice()?,
                alat,
                units: LatticeUnit::TwoPiOverAlat,
            });
        }

        let bohr = self.direct_lattice_bohr()?;
        Some(Lattice {
            vectors: units::scale_alat(&bohr, 1.0, LengthUnit::Bohr),
            alat,
            units: LatticeUnit::Angstrom,
        })
    }

    /// 倒格矢矩阵的逆；奇异矩阵是致命错误
    pub fn inverse_reciprocal_lattice_vectors(&self) -> Result<Option<Mat33>> {
        match self.reciprocal_lattice() {
            Some(rec) => Ok(Some(units::invert_3x3(&rec)?)),
            None => Ok(None),
        }
    }

    /// k 点本征值，k 点为晶体坐标
    pub fn eigenvalues_at_kpoints(&self) -> Result<Option<Vec<EigenvalueRecord>>> {
        let raw = match self {
            EspressoXml::Legacy(x) => x.raw_kpoints()?,
            EspressoXml::Modern(x) => x.raw_kpoints(),
        };
        let raw = match raw {
            Some(r) => r,
            None => return Ok(None),
        };

        let inverse = match self.inverse_reciprocal_lattice_vectors()? {
            Some(m) => m,
            None => return Ok(None),
        };

        Ok(Some(to_crystal_records(raw, &inverse)))
    }

    /// 最终原子基：晶体坐标，编号沿用各纪元的约定
    pub fn final_basis(&self) -> Result<Option<Basis>> {
        let raw = match self {
            EspressoXml::Legacy(x) => x.basis_bohr(),
            EspressoXml::Modern(x) => x.basis_bohr(),
        };
        let (raw, lattice) = match (raw, self.final_lattice_vectors(false)) {
            (Some(b), Some(l)) => (b, l),
            _ => return Ok(None),
        };

        let angstrom = Basis {
            coordinates: raw
                .coordinates
                .iter()
                .map(|c| Labeled {
                    id: c.id,
                    value: units::scale_vector(c.value, units::BOHR_TO_ANGSTROM),
                })
                .collect(),
            ..raw
        };
        Ok(Some(angstrom.to_crystal(&lattice)?))
    }
}

/// 笛卡尔 k 点 → 晶体坐标：`k · B⁻¹`
pub fn to_crystal_records(raw: Vec<RawKpoint>, inverse_reciprocal: &Mat33) -> Vec<EigenvalueRecord> {
    raw.into_iter()
        .map(|k| EigenvalueRecord {
            kpoint: units::vec_mat_mul(k.cartesian, inverse_reciprocal),
            weight: k.weight,
            eigenvalues: k.channels,
        })
        .collect()
}
