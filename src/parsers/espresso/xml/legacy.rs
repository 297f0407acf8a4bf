//! # 旧版 ESPRESSO XML (`data-file.xml`)
//!
//! 原始值带有 `type`/`size`/`columns` 属性，统一交给 `xml::cast` 解码。
//! k 点本征值通常放在 `K00001/eigenval.xml` 这样的链接文件里
//! （LSDA 时为 `DATAFILE.1`/`DATAFILE.2` 两个链接），也可能直接内嵌。
//! 原子编号从 1 开始（`ATOM.1`, `ATOM.2`, ...）。

use super::RawKpoint;
use crate::error::Result;
use crate::models::{Basis, CoordinateUnit, SpinChannel};
use crate::units::{self, EnergyUnit, LengthUnit, Mat33};
use crate::xml::{cast_tagged, XmlNode, XmlTree, XmlValue, ESPRESSO_LOGICAL};
use log::{debug, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LegacyXml {
    tree: XmlTree,
    /// `data-file.xml` 所在目录，用于解析 `iotk_link`
    dir: PathBuf,
}

fn value(node: &XmlNode) -> Option<XmlValue> {
    cast_tagged(node, &ESPRESSO_LOGICAL)
}

fn vec3_of(node: &XmlNode) -> Option<[f64; 3]> {
    match value(node)?.to_f64_vec().as_slice() {
        [x, y, z] => Some([*x, *y, *z]),
        _ => None,
    }
}

/// `UNITS` 属性中的能量单位，缺省 Hartree
fn energy_unit_of(node: Option<&XmlNode>) -> EnergyUnit {
    node.and_then(|n| n.attr("UNITS").or_else(|| n.attr("Units")))
        .and_then(EnergyUnit::from_label)
        .unwrap_or(EnergyUnit::Hartree)
}

impl LegacyXml {
    pub fn new(tree: XmlTree, path: &Path) -> Self {
        LegacyXml {
            tree,
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }

    fn value(&self, path: &str) -> Option<XmlValue> {
        self.tree.find(path).and_then(value)
    }

    fn flag(&self, path: &str) -> Option<bool> {
        self.value(path)?.as_bool()
    }

    fn real(&self, path: &str) -> Option<f64> {
        self.value(path)?.as_f64()
    }

    fn int(&self, path: &str) -> Option<i64> {
        self.value(path)?.as_i64()
    }

    pub fn is_lsda(&self) -> bool {
        self.flag("SPIN/LSDA").unwrap_or(false)
    }

    pub fn is_noncolin(&self) -> bool {
        self.flag("SPIN/NON-COLINEAR_CALCULATION").unwrap_or(false)
    }

    pub fn nspins(&self) -> Option<usize> {
        self.tree.find("SPIN")?;
        Some(if self.is_lsda() { 2 } else { 1 })
    }

    fn energy_unit(&self) -> EnergyUnit {
        energy_unit_of(self.tree.find("BAND_STRUCTURE_INFO/UNITS_FOR_ENERGIES"))
    }

    /// 费米能 (eV)
    pub fn fermi_energy(&self) -> Option<f64> {
        let fermi = self.real("BAND_STRUCTURE_INFO/FERMI_ENERGY")?;
        Some(units::to_ev(fermi, self.energy_unit()))
    }

    pub fn number_of_bands(&self) -> Option<usize> {
        self.int("BAND_STRUCTURE_INFO/NUMBER_OF_BANDS")
            .map(|n| n as usize)
    }

    /// 晶格参数 (bohr)
    pub fn alat(&self) -> Option<f64> {
        self.real("CELL/LATTICE_PARAMETER")
    }

    fn length_unit(&self, path: &str) -> LengthUnit {
        self.tree
            .find(path)
            .and_then(|n| n.attr("UNITS"))
            .and_then(LengthUnit::from_label)
            .unwrap_or(LengthUnit::Bohr)
    }

    /// 正格矢 (bohr)
    pub fn direct_lattice_bohr(&self) -> Option<Mat33> {
        let a1 = vec3_of(self.tree.find("CELL/DIRECT_LATTICE_VECTORS/a1")?)?;
        let a2 = vec3_of(self.tree.find("CELL/DIRECT_LATTICE_VECTORS/a2")?)?;
        let a3 = vec3_of(self.tree.find("CELL/DIRECT_LATTICE_VECTORS/a3")?)?;

        let unit = self.length_unit("CELL/DIRECT_LATTICE_VECTORS/UNITS_FOR_DIRECT_LATTICE_VECTORS");
        let factor = unit.factor() / LengthUnit::Bohr.factor();
        Some([
            units::scale_vector(a1, factor),
            units::scale_vector(a2, factor),
            units::scale_vector(a3, factor),
        ])
    }

    /// 倒格矢 (2π/alat)
    pub fn reciprocal_lattice(&self) -> Option<Mat33> {
        let b1 = vec3_of(self.tree.find("CELL/RECIPROCAL_LATTICE_VECTORS/b1")?)?;
        let b2 = vec3_of(self.tree.find("CELL/RECIPROCAL_LATTICE_VECTORS/b2")?)?;
        let b3 = vec3_of(self.tree.find("CELL/RECIPROCAL_LATTICE_VECTORS/b3")?)?;
        Some([b1, b2, b3])
    }

    /// 原子位置（笛卡尔, bohr），编号从 1 开始
    pub fn basis_bohr(&self) -> Option<Basis> {
        let nat = self.int("IONS/NUMBER_OF_ATOMS")? as usize;
        let unit = self.length_unit("IONS/UNITS_FOR_ATOMIC_POSITIONS");
        let factor = unit.factor() / LengthUnit::Bohr.factor();

        let mut sites = Vec::with_capacity(nat);
        for id in 1..=nat {
            let atom = self.tree.find(&format!("IONS/ATOM.{}", id))?;
            let species = atom.attr("SPECIES")?.trim().to_string();
            let tau = crate::extract::parse_floats(atom.attr("tau")?)?;
            if tau.len() != 3 {
                warn!("ATOM.{} has {} position components", id, tau.len());
                return None;
            }
            sites.push((id, species, units::scale_vector([tau[0], tau[1], tau[2]], factor)));
        }

        Some(Basis::from_sites(sites, CoordinateUnit::Cartesian))
    }

    fn kpoint_nodes(&self) -> Vec<&XmlNode> {
        let eigenvalues = match self.tree.find("EIGENVALUES") {
            Some(n) => n,
            None => return vec![],
        };

        let nks = self
            .int("BAND_STRUCTURE_INFO/NUMBER_OF_K-POINTS")
            .map(|n| n as usize);

        match nks {
            Some(n) => (1..=n)
                .filter_map(|i| eigenvalues.child(&format!("K-POINT.{}", i)))
                .collect(),
            None => eigenvalues
                .children
                .iter()
                .filter(|c| c.name.starts_with("K-POINT."))
                .collect(),
        }
    }

    /// 读取一个自旋通道：链接文件优先，其次内嵌的 EIGENVALUES/OCCUPATIONS
    fn read_channel(&self, kpoint: &XmlNode, link_tag: &str, spin: f64) -> Result<Option<SpinChannel>> {
        if let Some(link) = kpoint.child(link_tag).and_then(|n| n.attr("iotk_link")) {
            let path = self.dir.join(link.trim().trim_start_matches("./"));
            let linked = match XmlTree::from_file(&path)? {
                Some(t) => t,
                None => {
                    debug!("Linked eigenvalue file missing: {}", path.display());
                    return Ok(None);
                }
            };
            return Ok(channel_from(linked.root(), spin));
        }

        Ok(channel_from(kpoint, spin))
    }

    /// 原始 k 点列表（笛卡尔 2π/alat，能量 eV）
    pub fn raw_kpoints(&self) -> Result<Option<Vec<RawKpoint>>> {
        let nodes = self.kpoint_nodes();
        if nodes.is_empty() {
            return Ok(None);
        }

        let lsda = self.is_lsda();
        let mut kpoints = Vec::with_capacity(nodes.len());

        for node in nodes {
            let cartesian = match node.child("K-POINT_COORDS").and_then(vec3_of) {
                Some(k) => k,
                None => {
                    warn!("<{}> has no K-POINT_COORDS", node.name);
                    return Ok(None);
                }
            };
            let weight = node.child("WEIGHT").and_then(value).and_then(|v| v.as_f64()).unwrap_or(0.0);

            let channels = if lsda {
                let up = self.read_channel(node, "DATAFILE.1", 0.5)?;
                let down = self.read_channel(node, "DATAFILE.2", -0.5)?;
                match (up, down) {
                    (Some(u), Some(d)) => vec![u, d],
                    _ => return Ok(None),
                }
            } else {
                match self.read_channel(node, "DATAFILE", 0.5)? {
                    Some(c) => vec![c],
                    None => return Ok(None),
                }
            };

            kpoints.push(RawKpoint {
                cartesian,
                weight,
                channels,
            });
        }

        Ok(Some(kpoints))
    }
}

/// 从 EIGENVALUES/OCCUPATIONS 子元素构造通道，能量换算为 eV
fn channel_from(node: &XmlNode, spin: f64) -> Option<SpinChannel> {
    let unit = energy_unit_of(
        node.child("UNITS_FOR_ENERGIES")
            .or_else(|| node.child("INFO")),
    );

    let energies = value(node.child("EIGENVALUES")?)?.to_f64_vec();
    let occupations = node
        .child("OCCUPATIONS")
        .and_then(value)
        .map(|v| v.to_f64_vec())
        .unwrap_or_else(|| vec![0.0; energies.len()]);

    if energies.len() != occupations.len() {
        warn!(
            "Eigenvalue/occupation length mismatch: {} vs {}",
            energies.len(),
            occupations.len()
        );
        return None;
    }

    Some(SpinChannel::new(
        units::all_to_ev(&energies, unit),
        occupations,
        spin,
    ))
}
