//! # collect 命令实现
//!
//! 批量汇总计算目录的能量信息。
//!
//! ## 功能
//! - 按标准输出文件名识别计算目录
//! - 并行打开解析器并提取摘要（每个目录一个独立解析器）
//! - 按每原子能量排序，生成终端表格和 CSV 输出
//!
//! ## 依赖关系
//! - 使用 `cli/collect.rs` 定义的参数
//! - 使用 `batch/`, `parsers/`, `models/calculation.rs`
//! - 使用 `utils/output.rs`

use crate::batch::{BatchRunner, FileCollector, ProcessResult, DEFAULT_SEARCH_DEPTH};
use crate::cli::collect::CollectArgs;
use crate::error::{ExtractError, Result};
use crate::models::CalculationSummary;
use crate::parsers::{Application, CalculationParser, ParserConfig};
use crate::utils::output;

use log::warn;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 摘要表格行
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Calculation")]
    name: String,
    #[tabled(rename = "Atoms")]
    atoms: String,
    #[tabled(rename = "E (eV)")]
    energy: String,
    #[tabled(rename = "E/atom (eV)")]
    energy_per_atom: String,
    #[tabled(rename = "ΔE/atom (eV)")]
    delta: String,
}

/// 执行 collect 命令
pub fn execute(args: CollectArgs) -> Result<()> {
    output::print_header("Collecting Calculation Summaries");

    if !args.root.exists() {
        return Err(ExtractError::DirectoryNotFound {
            path: args.root.display().to_string(),
        });
    }

    let dirs = calculation_dirs(&args.root, args.app, args.stdout_name.as_deref());
    if dirs.is_empty() {
        output::print_warning(&format!(
            "No {} calculations found under '{}'",
            args.app,
            args.root.display()
        ));
        return Ok(());
    }

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Scanning {} directories with {} jobs...",
        dirs.len(),
        runner.jobs()
    ));

    let result = runner.run(dirs, |dir| {
        summarize_dir(
            &args.root,
            dir,
            args.app,
            args.stdout_name.as_deref(),
            args.version.as_deref(),
        )
    })?;

    for (path, err) in &result.failures {
        output::print_warning(&format!("Failed to process {}: {}", path, err));
    }
    if result.skipped > 0 {
        output::print_skip(&format!(
            "{} directories without a total energy",
            result.skipped
        ));
    }

    let (collected, total) = (result.success(), result.total());
    let mut summaries = result.outputs;
    if summaries.is_empty() {
        output::print_warning("No calculations with a total energy to collect.");
        return Ok(());
    }
    rank_summaries(&mut summaries);

    output::print_header(&format!(
        "Top {} Calculations by Energy per Atom",
        args.top_n.min(summaries.len())
    ));
    println!("{}", Table::new(summary_rows(&summaries, args.top_n)));

    save_summary_csv(&summaries, &args.output)?;
    output::print_done(&format!(
        "Collected {} of {} calculations into '{}'",
        collected,
        total,
        args.output.display()
    ));

    Ok(())
}

/// 含有标准输出文件的目录
fn calculation_dirs(root: &Path, app: Application, stdout_name: Option<&str>) -> Vec<PathBuf> {
    FileCollector::new(root)
        .with_pattern(stdout_name.unwrap_or(app.stdout_patterns()))
        .max_depth(DEFAULT_SEARCH_DEPTH)
        .parent_dirs()
}

fn summarize_dir(
    root: &Path,
    dir: &Path,
    app: Application,
    stdout_name: Option<&str>,
    version: Option<&str>,
) -> ProcessResult<CalculationSummary> {
    let name = dir
        .strip_prefix(root)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(dir)
        .display()
        .to_string();

    let mut config = ParserConfig::new(dir);
    if let Some(stdout) = stdout_name {
        config = config.with_stdout(stdout);
    }
    if let Some(v) = version {
        config = config.with_version(v);
    }

    let summary = app
        .open(&config)
        .and_then(|parser| summarize(&name, parser.as_ref()));

    match summary {
        Ok(s) if s.total_energy_ev.is_none() => ProcessResult::Skipped(name),
        Ok(s) => ProcessResult::Success(s),
        Err(e) => ProcessResult::Failed(dir.display().to_string(), e.to_string()),
    }
}

/// 从解析器填充摘要；离子轨迹错位只影响步数一栏
pub fn summarize(name: &str, parser: &dyn CalculationParser) -> Result<CalculationSummary> {
    let mut summary = CalculationSummary::new(name, parser.application());
    summary.total_energy_ev = parser.total_energy()?;
    summary.fermi_energy_ev = parser.fermi_energy()?;
    summary.num_atoms = parser.number_of_atoms()?;
    summary.ionic_steps = match parser.convergence_ionic() {
        Ok(steps) => steps.map(|s| s.len()),
        Err(e) => {
            warn!("{}: {}", name, e);
            None
        }
    };
    Ok(summary)
}

/// 按每原子能量升序；缺少每原子能量的排在最后
pub fn rank_summaries(summaries: &mut [CalculationSummary]) {
    summaries.sort_by(|a, b| {
        let ea = a.energy_per_atom().unwrap_or(f64::INFINITY);
        let eb = b.energy_per_atom().unwrap_or(f64::INFINITY);
        ea.total_cmp(&eb).then_with(|| a.name.cmp(&b.name))
    });
}

fn summary_rows(summaries: &[CalculationSummary], top_n: usize) -> Vec<SummaryRow> {
    let min = summaries.iter().filter_map(|s| s.energy_per_atom()).next();
    let fmt = |v: Option<f64>| v.map(|x| format!("{:.6}", x)).unwrap_or_else(|| "-".to_string());

    summaries
        .iter()
        .take(top_n)
        .enumerate()
        .map(|(i, s)| {
            let per_atom = s.energy_per_atom();
            SummaryRow {
                rank: i + 1,
                name: s.name.clone(),
                atoms: s.num_atoms.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
                energy: fmt(s.total_energy_ev),
                energy_per_atom: fmt(per_atom),
                delta: fmt(per_atom.zip(min).map(|(e, m)| e - m)),
            }
        })
        .collect()
}

/// 保存摘要到 CSV
pub fn save_summary_csv(summaries: &[CalculationSummary], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record([
        "rank",
        "calculation",
        "application",
        "num_atoms",
        "total_energy_eV",
        "energy_per_atom_eV",
        "fermi_energy_eV",
        "ionic_steps",
    ])?;

    let opt = |v: Option<f64>| v.map(|x| format!("{:.10}", x)).unwrap_or_default();
    for (i, s) in summaries.iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            s.name.clone(),
            s.application.to_string(),
            s.num_atoms.map(|n| n.to_string()).unwrap_or_default(),
            opt(s.total_energy_ev),
            opt(s.energy_per_atom()),
            opt(s.fermi_energy_ev),
            s.ionic_steps.map(|n| n.to_string()).unwrap_or_default(),
        ])?;
    }

    wtr.flush().map_err(|e| ExtractError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    fn nwchem_output(energy: f64, atoms: usize) -> String {
        let mut text = String::from(
            " Northwest Computational Chemistry Package (NWChem) 7.0\n\n Output coordinates in angstroms (scale by  1.889725989 to convert to a.u.)\n\n  No.       Tag          Charge          X              Y              Z\n ---- ---------------- ---------- -------------- -------------- --------------\n",
        );
        for i in 0..atoms {
            text.push_str(&format!(
                "    {} H                    1.0000     0.00000000     0.00000000     {:.8}\n",
                i + 1,
                0.74 * i as f64
            ));
        }
        text.push_str(&format!("\n         Total DFT energy = {:20.12}\n", energy));
        text
    }

    fn summary(name: &str, energy: Option<f64>, atoms: Option<usize>) -> CalculationSummary {
        let mut s = CalculationSummary::new(name, Application::Vasp);
        s.total_energy_ev = energy;
        s.num_atoms = atoms;
        s
    }

    #[test]
    fn test_rank_by_energy_per_atom() {
        let mut summaries = vec![
            summary("a", Some(-10.0), Some(2)),
            summary("b", Some(-12.0), None),
            summary("c", Some(-18.0), Some(3)),
        ];
        rank_summaries(&mut summaries);

        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);

        let rows = summary_rows(&summaries, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].delta, "0.000000");
        assert_eq!(rows[1].delta, "1.000000");
    }

    #[test]
    fn test_collect_directories_in_parallel() {
        let root = TempDir::new("collect").unwrap();
        for (name, energy, atoms) in [("h2", -1.0, 2), ("h3", -1.2, 3)] {
            let dir = root.path().join(name);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("run.out"), nwchem_output(energy, atoms)).unwrap();
        }
        let empty = root.path().join("empty");
        fs::create_dir(&empty).unwrap();
        fs::write(empty.join("run.out"), "nothing here\n").unwrap();

        let dirs = calculation_dirs(root.path(), Application::Nwchem, None);
        assert_eq!(dirs.len(), 3);

        let result = BatchRunner::new(2)
            .run(dirs, |d| summarize_dir(root.path(), d, Application::Nwchem, None, None))
            .unwrap();
        assert_eq!(result.success(), 2);
        assert_eq!(result.skipped, 1);

        let mut summaries = result.outputs;
        rank_summaries(&mut summaries);
        assert_eq!(summaries[0].name, "h2");
        assert_eq!(summaries[0].num_atoms, Some(2));

        let csv_path = root.path().join("summary.csv");
        save_summary_csv(&summaries, &csv_path).unwrap();
        let written = fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("rank,calculation,application"));
        assert!(lines[1].starts_with("1,h2,nwchem,2,"));
    }
}
