//! # 新版 ESPRESSO XML (`data-file-schema.xml`)
//!
//! 没有类型属性，每个标签按固定格式逐个处理。所有能量以 Hartree 存储，
//! 长度以 bohr 存储。原子编号从 0 开始。
//!
//! LSDA 时 `eigenvalues`/`occupations` 把两个自旋通道首尾相接，
//! 这里在名义能带数处对半切开（前半 +0.5，后半 -0.5），不校验两通道能带数是否相等。

use super::RawKpoint;
use crate::models::{Basis, CoordinateUnit, SpinChannel};
use crate::units::{self, EnergyUnit, Mat33};
use crate::xml::{XmlNode, XmlTree, ESPRESSO_LOGICAL};
use log::warn;

const BAND_STRUCTURE: &str = "output/band_structure";
const ATOMIC_STRUCTURE: &str = "output/atomic_structure";

#[derive(Debug, Clone)]
pub struct ModernXml {
    tree: XmlTree,
}

impl ModernXml {
    pub fn new(tree: XmlTree) -> Self {
        ModernXml { tree }
    }

    fn text(&self, path: &str) -> Option<&str> {
        self.tree.find_text(path)
    }

    fn flag(&self, path: &str) -> Option<bool> {
        ESPRESSO_LOGICAL.parse(self.text(path)?)
    }

    fn float(&self, path: &str) -> Option<f64> {
        self.tree.find(path)?.float()
    }

    fn count(&self, path: &str) -> Option<usize> {
        self.text(path)?.parse().ok()
    }

    pub fn is_lsda(&self) -> bool {
        self.flag(&format!("{}/lsda", BAND_STRUCTURE)).unwrap_or(false)
    }

    pub fn is_noncolin(&self) -> bool {
        self.flag(&format!("{}/noncolin", BAND_STRUCTURE)).unwrap_or(false)
    }

    pub fn nspins(&self) -> Option<usize> {
        self.tree.find(BAND_STRUCTURE)?;
        Some(if self.is_lsda() { 2 } else { 1 })
    }

    /// 费米能 (eV)；绝缘体没有 `fermi_energy` 时退回 `highestOccupiedLevel`
    pub fn fermi_energy(&self) -> Option<f64> {
        let hartree = self
            .float(&format!("{}/fermi_energy", BAND_STRUCTURE))
            .or_else(|| self.float(&format!("{}/highestOccupiedLevel", BAND_STRUCTURE)))?;
        Some(units::to_ev(hartree, EnergyUnit::Hartree))
    }

    /// 总能 (eV)
    pub fn total_energy(&self) -> Option<f64> {
        let hartree = self.float("output/total_energy/etot")?;
        Some(units::to_ev(hartree, EnergyUnit::Hartree))
    }

    /// 名义能带数：LSDA 取 `nbnd_up`，否则 `nbnd`
    pub fn number_of_bands(&self) -> Option<usize> {
        if self.is_lsda() {
            if let Some(n) = self.count(&format!("{}/nbnd_up", BAND_STRUCTURE)) {
                return Some(n);
            }
        }
        self.count(&format!("{}/nbnd", BAND_STRUCTURE))
    }

    /// 晶格参数 (bohr)
    pub fn alat(&self) -> Option<f64> {
        self.tree
            .find(ATOMIC_STRUCTURE)?
            .attr("alat")
            .and_then(crate::extract::parse_f64)
    }

    /// 正格矢 (bohr)
    pub fn direct_lattice_bohr(&self) -> Option<Mat33> {
        let cell = self.tree.find(&format!("{}/cell", ATOMIC_STRUCTURE))?;
        Some([
            cell.child("a1")?.vec3()?,
            cell.child("a2")?.vec3()?,
            cell.child("a3")?.vec3()?,
        ])
    }

    /// 倒格矢 (2π/alat)
    pub fn reciprocal_lattice(&self) -> Option<Mat33> {
        let rec = self.tree.find("output/basis_set/reciprocal_lattice")?;
        Some([
            rec.child("b1")?.vec3()?,
            rec.child("b2")?.vec3()?,
            rec.child("b3")?.vec3()?,
        ])
    }

    /// 原子位置（笛卡尔, bohr），编号从 0 开始
    pub fn basis_bohr(&self) -> Option<Basis> {
        let atoms = self
            .tree
            .find_all(&format!("{}/atomic_positions/atom", ATOMIC_STRUCTURE));
        if atoms.is_empty() {
            return None;
        }

        let sites = atoms
            .iter()
            .enumerate()
            .map(|(i, atom)| Some((i, atom.attr("name")?.trim().to_string(), atom.vec3()?)))
            .collect::<Option<Vec<_>>>()?;

        Some(Basis::from_sites(sites, CoordinateUnit::Cartesian))
    }

    /// 按自旋设置拆分一个 k 点的能量/占据数
    fn split_channels(&self, energies: Vec<f64>, occupations: Vec<f64>) -> Vec<SpinChannel> {
        if !self.is_lsda() {
            return vec![SpinChannel::new(energies, occupations, 0.5)];
        }

        let half = self
            .number_of_bands()
            .filter(|n| *n <= energies.len())
            .unwrap_or(energies.len() / 2);

        let (up_e, down_e) = energies.split_at(half);
        let (up_o, down_o) = occupations.split_at(half.min(occupations.len()));

        vec![
            SpinChannel::new(up_e.to_vec(), up_o.to_vec(), 0.5),
            SpinChannel::new(down_e.to_vec(), down_o.to_vec(), -0.5),
        ]
    }

    fn kpoint_from(&self, ks: &XmlNode) -> Option<RawKpoint> {
        let k = ks.child("k_point")?;
        let cartesian = k.vec3()?;
        let weight = k.attr("weight").and_then(crate::extract::parse_f64).unwrap_or(0.0);

        let energies = ks.child("eigenvalues")?.floats()?;
        let occupations = match ks.child("occupations").and_then(XmlNode::floats) {
            Some(o) => o,
            None => vec![0.0; energies.len()],
        };

        if energies.len() != occupations.len() {
            warn!(
                "ks_energies length mismatch: {} eigenvalues vs {} occupations",
                energies.len(),
                occupations.len()
            );
            return None;
        }

        let energies = units::all_to_ev(&energies, EnergyUnit::Hartree);
        Some(RawKpoint {
            cartesian,
            weight,
            channels: self.split_channels(energies, occupations),
        })
    }

    /// 原始 k 点列表（笛卡尔 2π/alat，能量 eV）
    pub fn raw_kpoints(&self) -> Option<Vec<RawKpoint>> {
        let blocks = self
            .tree
            .find_all(&format!("{}/ks_energies", BAND_STRUCTURE));
        if blocks.is_empty() {
            return None;
        }

        blocks.iter().map(|ks| self.kpoint_from(ks)).collect()
    }
}
