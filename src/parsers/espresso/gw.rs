//! # SternheimerGW 准粒子本征值
//!
//! GW 计算的标准输出中每个 k 点打印一块：笛卡尔/晶体 k 点坐标，
//! 随后是 LDA 本征值与 GW 准粒子能量 (eV)。

use crate::error::Result;
use crate::extract::{block_regex, split_blocks, TextSource};
use crate::models::{EigenvalueRecord, SpinChannel};
use log::debug;

/// GW 输出头部的识别标记
pub const GW_MARKER: &str = "SternheimerGW";

const KPOINT_BLOCK: &str = r"(?m)^\s*GWKpoint cart";

/// 每个 k 点的准粒子能量；占据数以零填充，权重均分
pub fn eigenvalues_at_kpoints(src: &TextSource) -> Result<Option<Vec<EigenvalueRecord>>> {
    let re = block_regex("gw_kpoint", KPOINT_BLOCK)?;

    let mut points = Vec::new();
    for block in split_blocks(src.text(), &re) {
        let kpoint = match src.extract_in(block, "gw_kpoint_crystal")?.as_vec3_rows().first() {
            Some(k) => *k,
            None => continue,
        };
        let energies: Vec<f64> = match src.extract_in(block, "gw_qp_energies")?.as_string() {
            Some(list) => list.split_whitespace().filter_map(crate::extract::parse_f64).collect(),
            None => continue,
        };
        if energies.is_empty() {
            continue;
        }
        points.push((kpoint, energies));
    }

    if points.is_empty() {
        debug!("No GW quasiparticle blocks found");
        return Ok(None);
    }

    let weight = 1.0 / points.len() as f64;
    Ok(Some(
        points
            .into_iter()
            .map(|(kpoint, energies)| {
                let occupations = vec![0.0; energies.len()];
                EigenvalueRecord {
                    kpoint,
                    weight,
                    eigenvalues: vec![SpinChannel::new(energies, occupations, 0.5)],
                }
            })
            .collect(),
    ))
}
