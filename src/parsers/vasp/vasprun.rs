//! # vasprun.xml 导航器
//!
//! `<i>`/`<v>`/`<r>` 元素以 `name` 属性区分，类型属性缺省为实数。
//! 能量均为 eV，长度为 Å；倒格矢不含 2π（Å⁻¹）。k 点列表本身就是晶体坐标，
//! 原子编号从 1 开始。
//!
//! 每个 `<calculation>` 带有自己的结构，因此离子轨迹不需要滞后对齐。

use crate::error::{ExtractError, Result};
use crate::models::{
    Basis, CoordinateUnit, Dos, EigenvalueRecord, ElectronicSteps, IonicStep, Labeled, Lattice,
    LatticeUnit, SpinChannel, SpinDos, Structure,
};
use crate::units::Mat33;
use crate::xml::{cast_tagged, XmlNode, XmlTree, XmlValue, VASP_LOGICAL};
use log::{debug, warn};

/// 支持的 VASP 主版本
pub const SUPPORTED_MAJORS: &[u64] = &[5, 6];

fn vec3_rows(node: &XmlNode) -> Option<Vec<[f64; 3]>> {
    node.children_named("v").map(XmlNode::vec3).collect()
}

fn mat33(node: &XmlNode) -> Option<Mat33> {
    match vec3_rows(node)?.as_slice() {
        [a, b, c] => Some([*a, *b, *c]),
        _ => None,
    }
}

/// `<i name=...>` 子元素经转换表解码；无类型属性时按实数处理
fn named_item(node: &XmlNode, name: &str) -> Option<XmlValue> {
    let item = node
        .children_named("i")
        .find(|i| i.attr("name") == Some(name))?;
    match item.attr("type") {
        Some(_) => cast_tagged(item, &VASP_LOGICAL),
        None => item.float().map(XmlValue::Real),
    }
}

fn spin_of(index: usize, nspins: usize) -> f64 {
    if nspins == 2 && index == 1 {
        -0.5
    } else {
        0.5
    }
}

#[derive(Debug, Clone)]
pub struct Vasprun {
    tree: XmlTree,
}

impl Vasprun {
    pub fn new(tree: XmlTree) -> Self {
        Vasprun { tree }
    }

    /// `generator/i[@name=version]`
    pub fn generator_version(&self) -> Option<String> {
        let generator = self.tree.find("generator")?;
        named_item(generator, "version")?.as_str().map(|s| s.trim().to_string())
    }

    /// 声明的主版本必须在支持范围内
    pub fn check_version(&self) -> Result<()> {
        let version = match self.generator_version() {
            Some(v) => v,
            None => {
                debug!("vasprun.xml declares no generator version");
                return Ok(());
            }
        };

        let major = version
            .split(|c: char| !c.is_ascii_digit())
            .find(|s| !s.is_empty())
            .and_then(|s| s.parse::<u64>().ok());

        match major {
            Some(m) if SUPPORTED_MAJORS.contains(&m) => Ok(()),
            _ => Err(ExtractError::UnsupportedVersion {
                application: "vasp".to_string(),
                version,
            }),
        }
    }

    /// ISPIN，位于 `parameters` 的嵌套分隔块中
    pub fn nspins(&self) -> Option<usize> {
        let parameters = self.tree.find("parameters")?;
        let ispin = parameters
            .descendants_named("i")
            .into_iter()
            .find(|i| i.attr("name") == Some("ISPIN"))?;
        ispin.text().parse().ok()
    }

    fn calculations(&self) -> Vec<&XmlNode> {
        self.tree.find_all("calculation")
    }

    fn last_dos(&self) -> Option<&XmlNode> {
        self.calculations().into_iter().rev().find_map(|c| c.child("dos"))
    }

    pub fn fermi_energy(&self) -> Option<f64> {
        named_item(self.last_dos()?, "efermi")?.as_f64()
    }

    /// 最后一个离子步的自由能 (eV)
    pub fn total_energy(&self) -> Option<f64> {
        let calc = self.calculations().into_iter().last()?;
        named_item(calc.child("energy")?, "e_fr_energy")?.as_f64()
    }

    /// 元素列表，按原子顺序
    pub fn elements(&self) -> Option<Vec<String>> {
        let set = self.tree.find("atominfo/array[@name=atoms]/set")?;
        Some(
            set.children_named("rc")
                .filter_map(|rc| rc.child("c").map(|c| c.text().to_string()))
                .collect(),
        )
    }

    fn structure_from(&self, node: &XmlNode) -> Option<Structure> {
        let lattice = Lattice {
            vectors: mat33(node.find("crystal/varray[@name=basis]")?)?,
            alat: 1.0,
            units: LatticeUnit::Angstrom,
        };
        let positions = vec3_rows(node.find("varray[@name=positions]")?)?;
        let elements = self.elements()?;
        if elements.len() != positions.len() {
            warn!(
                "vasprun.xml: {} elements but {} positions",
                elements.len(),
                positions.len()
            );
            return None;
        }

        Some(Structure {
            lattice: Some(lattice),
            basis: Basis::from_lists(elements, positions, CoordinateUnit::Crystal, 1),
        })
    }

    /// `structure[@name=finalpos]`
    pub fn final_structure(&self) -> Option<Structure> {
        self.structure_from(self.tree.find("structure[@name=finalpos]")?)
    }

    pub fn final_basis(&self) -> Option<Basis> {
        self.final_structure().map(|s| s.basis)
    }

    pub fn final_lattice_vectors(&self) -> Option<Lattice> {
        self.final_structure()?.lattice
    }

    pub fn reciprocal_lattice_vectors(&self) -> Option<Lattice> {
        let node = self.tree.find("structure[@name=finalpos]/crystal/varray[@name=rec_basis]")?;
        Some(Lattice {
            vectors: mat33(node)?,
            alat: 1.0,
            units: LatticeUnit::InverseAngstrom,
        })
    }

    fn last_varray(&self, name: &str) -> Option<Vec<[f64; 3]>> {
        let path = format!("varray[@name={}]", name);
        self.calculations()
            .into_iter()
            .rev()
            .find_map(|c| c.find(&path))
            .and_then(vec3_rows)
    }

    /// 最后一步的应力 (kB)
    pub fn stress_tensor(&self) -> Option<Mat33> {
        match self.last_varray("stress")?.as_slice() {
            [a, b, c] => Some([*a, *b, *c]),
            _ => None,
        }
    }

    /// 最后一步的受力 (eV/Å)，编号从 1 开始
    pub fn atomic_forces(&self) -> Option<Vec<Labeled<[f64; 3]>>> {
        let forces = self.last_varray("forces")?;
        Some(
            forces
                .into_iter()
                .enumerate()
                .map(|(i, value)| Labeled { id: i + 1, value })
                .collect(),
        )
    }

    /// 最后一次计算的本征值与占据数
    pub fn eigenvalues_at_kpoints(&self) -> Option<Vec<EigenvalueRecord>> {
        let kpoints = vec3_rows(self.tree.find("kpoints/varray[@name=kpointlist]")?)?;
        let weights: Vec<f64> = self
            .tree
            .find("kpoints/varray[@name=weights]")?
            .children_named("v")
            .filter_map(XmlNode::float)
            .collect();

        let eigen = self
            .calculations()
            .into_iter()
            .rev()
            .find_map(|c| c.find("eigenvalues/array/set"))?;
        let spin_sets: Vec<&XmlNode> = eigen.children_named("set").collect();
        let nspins = spin_sets.len();

        let mut records: Vec<EigenvalueRecord> = kpoints
            .iter()
            .enumerate()
            .map(|(i, k)| EigenvalueRecord {
                kpoint: *k,
                weight: weights.get(i).copied().unwrap_or(0.0),
                eigenvalues: Vec::with_capacity(nspins),
            })
            .collect();

        for (s, spin_set) in spin_sets.iter().enumerate() {
            for (record, kset) in records.iter_mut().zip(spin_set.children_named("set")) {
                let (energies, occupations): (Vec<f64>, Vec<f64>) = kset
                    .children_named("r")
                    .filter_map(XmlNode::floats)
                    .filter(|r| r.len() >= 2)
                    .map(|r| (r[0], r[1]))
                    .unzip();
                record
                    .eigenvalues
                    .push(SpinChannel::new(energies, occupations, spin_of(s, nspins)));
            }
        }

        Some(records)
    }

    /// 总态密度与按元素 + 轨道累加的投影态密度
    pub fn dos(&self) -> Option<Dos> {
        let dos_node = self.last_dos()?;
        let spin_sets: Vec<&XmlNode> = dos_node
            .find("total/array/set")?
            .children_named("set")
            .collect();
        let nspins = spin_sets.len();

        let mut energy = Vec::new();
        let mut total = Vec::with_capacity(nspins);
        for (s, set) in spin_sets.iter().enumerate() {
            let rows: Vec<Vec<f64>> = set.children_named("r").filter_map(XmlNode::floats).collect();
            if s == 0 {
                energy = rows.iter().filter_map(|r| r.first().copied()).collect();
            }
            total.push(SpinDos {
                spin: spin_of(s, nspins),
                values: rows.iter().filter_map(|r| r.get(1).copied()).collect(),
            });
        }

        let mut dos = Dos {
            energy,
            total,
            partial: vec![],
        };

        if let (Some(array), Some(elements)) = (dos_node.find("partial/array"), self.elements()) {
            // 第一列是能量，其余为轨道
            let orbitals: Vec<String> = array
                .children_named("field")
                .skip(1)
                .map(|f| f.text().to_string())
                .collect();
            if let Some(ions) = array.child("set") {
                for (ion, ion_set) in ions.children_named("set").enumerate() {
                    let element = match elements.get(ion) {
                        Some(e) => e.as_str(),
                        None => continue,
                    };
                    for (s, spin_set) in ion_set.children_named("set").enumerate() {
                        let rows: Vec<Vec<f64>> =
                            spin_set.children_named("r").filter_map(XmlNode::floats).collect();
                        for (o, orbital) in orbitals.iter().enumerate() {
                            let values = rows.iter().filter_map(|r| r.get(o + 1).copied()).collect();
                            dos.add_partial(element, orbital, spin_of(s, nspins), values);
                        }
                    }
                }
            }
        }

        Some(dos)
    }

    /// 每个 `<calculation>` 内逐次 SCF 的自由能 (eV)
    pub fn convergence_electronic(&self) -> Vec<Vec<f64>> {
        self.calculations()
            .into_iter()
            .map(|c| {
                c.children_named("scstep")
                    .filter_map(|s| named_item(s.child("energy")?, "e_fr_energy")?.as_f64())
                    .collect()
            })
            .collect()
    }

    /// 离子轨迹，每步的结构取自该步自身
    pub fn convergence_ionic(&self) -> Option<Vec<IonicStep>> {
        let electronic = self.convergence_electronic();
        let mut steps = Vec::new();

        for (calc, data) in self.calculations().into_iter().zip(electronic) {
            let energy = match calc
                .child("energy")
                .and_then(|e| named_item(e, "e_fr_energy"))
                .and_then(|v| v.as_f64())
            {
                Some(e) => e,
                None => continue,
            };
            let structure = match calc.child("structure").and_then(|s| self.structure_from(s)) {
                Some(s) => s,
                None => continue,
            };
            steps.push(IonicStep {
                energy,
                structure,
                electronic: ElectronicSteps { units: "eV", data },
            });
        }

        if steps.is_empty() {
            None
        } else {
            Some(steps)
        }
    }
}
