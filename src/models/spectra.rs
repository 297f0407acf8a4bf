//! # 谱学与表格类数据模型
//!
//! 态密度、声子态密度与色散、Hubbard 参数、平均势、反应路径。
//!
//! ## 依赖关系
//! - 被 `parsers/` 使用

use serde::Serialize;

/// 单自旋通道的总态密度
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpinDos {
    pub spin: f64,
    pub values: Vec<f64>,
}

/// 按元素 + 轨道累加的投影态密度
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialDos {
    pub element: String,
    pub orbital: String,
    pub spin: f64,
    pub values: Vec<f64>,
}

/// 电子态密度（能量 eV）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dos {
    pub energy: Vec<f64>,
    pub total: Vec<SpinDos>,
    pub partial: Vec<PartialDos>,
}

impl Dos {
    /// 按 (元素, 轨道, 自旋) 累加投影态密度，长度与能量网格不一致的项被丢弃
    pub fn add_partial(&mut self, element: &str, orbital: &str, spin: f64, values: Vec<f64>) {
        if values.len() != self.energy.len() {
            log::warn!(
                "Skipping partial DOS {}-{}: {} points vs {} on energy grid",
                element,
                orbital,
                values.len(),
                self.energy.len()
            );
            return;
        }

        if let Some(existing) = self
            .partial
            .iter_mut()
            .find(|p| p.element == element && p.orbital == orbital && p.spin == spin)
        {
            for (acc, v) in existing.values.iter_mut().zip(values) {
                *acc += v;
            }
        } else {
            self.partial.push(PartialDos {
                element: element.to_string(),
                orbital: orbital.to_string(),
                spin,
                values,
            });
        }
    }
}

/// 声子态密度（频率 cm⁻¹）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhononDos {
    pub frequency: Vec<f64>,
    pub total: Vec<f64>,
}

/// q 点坐标的表示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QpointUnit {
    Crystal,
    /// 笛卡尔坐标，以 2π/alat 为单位
    #[serde(rename = "2pi/alat")]
    CartesianTwoPiOverAlat,
}

/// 声子色散：每个 q 点一组频率（cm⁻¹）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhononDispersion {
    pub qpoints: Vec<[f64; 3]>,
    pub qpoint_units: QpointUnit,
    pub frequencies: Vec<Vec<f64>>,
}

/// 单个位点的 Hubbard U
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubbardU {
    pub id: usize,
    pub atom: String,
    /// 早期版本的 hp.x 不输出流形，此时为空
    pub orbital: Option<String>,
    /// eV
    pub value: f64,
}

/// 一对位点间的 Hubbard V
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubbardV {
    pub id: usize,
    pub atom: String,
    pub neighbor_id: usize,
    pub neighbor_atom: String,
    /// Å
    pub distance: f64,
    /// eV
    pub value: f64,
}

/// 沿 z 的平面平均与宏观平均势（eV）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotentialProfile {
    pub z: Vec<f64>,
    pub planar: Vec<f64>,
    pub macroscopic: Vec<f64>,
}

/// NEB 反应路径能量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionPath {
    pub coordinates: Vec<f64>,
    /// eV
    pub energies: Vec<f64>,
}
