//! # extract 命令实现
//!
//! 打开单个计算目录的解析器，按请求顺序提取物理量，以 JSON 数组输出到标准输出。
//! 本次计算中不存在的物理量直接省略；数据前后矛盾的物理量记录警告后同样省略。
//!
//! ## 依赖关系
//! - 使用 `cli/extract.rs` 定义的参数
//! - 使用 `parsers/`, `models/property.rs`

use crate::cli::extract::ExtractArgs;
use crate::error::{ExtractError, Result};
use crate::models::{Property, PropertyKind};
use crate::parsers::{Application, ParserConfig};
use log::{debug, info, warn};

/// 执行 extract 命令
pub fn execute(args: ExtractArgs) -> Result<()> {
    let kinds: Vec<PropertyKind> = if args.properties.is_empty() {
        PropertyKind::all().to_vec()
    } else {
        args.properties.clone()
    };

    let properties = extract_properties(args.app, &args.parser_config(), &kinds)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&properties)?
    } else {
        serde_json::to_string(&properties)?
    };
    println!("{}", json);

    Ok(())
}

/// 提取所请求的物理量，保持请求顺序
pub fn extract_properties(
    app: Application,
    config: &ParserConfig,
    kinds: &[PropertyKind],
) -> Result<Vec<Property>> {
    if !config.work_dir.is_dir() {
        return Err(ExtractError::DirectoryNotFound {
            path: config.work_dir.display().to_string(),
        });
    }

    let parser = app.open(config)?;
    info!("Opened {} calculation in {}", app, config.work_dir.display());

    let mut properties = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        match kind.extract(parser.as_ref()) {
            Ok(Some(p)) => properties.push(p),
            Ok(None) => debug!("{} not available", kind),
            Err(e) if e.is_inconsistent_data() => warn!("Skipping {}: {}", kind, e),
            Err(e) => return Err(e),
        }
    }

    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropertyData;
    use crate::parsers::espresso::stdout::tests::relax_output;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_absent_properties_are_omitted() {
        let dir = TempDir::new("extract").unwrap();
        fs::write(
            dir.path().join("h2.out"),
            " Northwest Computational Chemistry Package (NWChem) 7.0\n\n         Total DFT energy =       -1.000000000000\n",
        )
        .unwrap();

        let properties = extract_properties(
            Application::Nwchem,
            &ParserConfig::new(dir.path()),
            &[PropertyKind::Dos, PropertyKind::TotalEnergy, PropertyKind::FinalBasis],
        )
        .unwrap();

        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].name, PropertyKind::TotalEnergy);

        let json = serde_json::to_value(&properties).unwrap();
        assert_eq!(json[0]["name"], "total_energy");
        assert_eq!(json[0]["units"], "eV");
    }

    #[test]
    fn test_misaligned_trajectory_keeps_other_properties() {
        let dir = TempDir::new("extract").unwrap();
        let broken = relax_output().replace("ATOMIC_POSITIONS", "ATOMIC_SPECIES");
        fs::write(dir.path().join("relax.out"), broken).unwrap();

        let properties = extract_properties(
            Application::Espresso,
            &ParserConfig::new(dir.path()),
            &[
                PropertyKind::TotalEnergy,
                PropertyKind::ConvergenceIonic,
                PropertyKind::FinalBasis,
            ],
        )
        .unwrap();

        let names: Vec<PropertyKind> = properties.iter().map(|p| p.name).collect();
        assert_eq!(names, vec![PropertyKind::TotalEnergy, PropertyKind::FinalBasis]);

        // 最终结构退回到日志头部的初始结构
        match &properties[1].data {
            PropertyData::Basis(basis) => assert_eq!(basis.len(), 2),
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[test]
    fn test_missing_work_dir() {
        let result = extract_properties(
            Application::Vasp,
            &ParserConfig::new("/nonexistent/simextract/calc"),
            &[PropertyKind::TotalEnergy],
        );
        assert!(matches!(result, Err(ExtractError::DirectoryNotFound { .. })));
    }
}
