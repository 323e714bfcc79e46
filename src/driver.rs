//! Runs every command over every fixture and accumulates the result tables.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{BenchError, Result};
use crate::fixtures::fixture_name;
use crate::harness::{measure_command, BenchConfig};
use crate::report::MeasurementReport;
use crate::schema::{report_file, BenchReport, Measurement, RunMeta};
use crate::table::{Metric, ResultTable};
use crate::workdir::WorkingDirectory;

/// The time, throughput and memory tables of one run, sharing a header.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultTables {
    time: ResultTable,
    throughput: ResultTable,
    memory: ResultTable,
}

impl ResultTables {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            time: ResultTable::new(labels.clone()),
            throughput: ResultTable::new(labels.clone()),
            memory: ResultTable::new(labels),
        }
    }

    pub fn get(&self, metric: Metric) -> &ResultTable {
        match metric {
            Metric::Time => &self.time,
            Metric::Throughput => &self.throughput,
            Metric::Memory => &self.memory,
        }
    }

    fn iter_mut(&mut self) -> [(Metric, &mut ResultTable); 3] {
        [
            (Metric::Time, &mut self.time),
            (Metric::Throughput, &mut self.throughput),
            (Metric::Memory, &mut self.memory),
        ]
    }

    /// Append one row to each table from the reports of every command at
    /// size `n`, in command order.
    pub fn push_size(&mut self, n: u64, reports: &[MeasurementReport]) {
        for (metric, table) in self.iter_mut() {
            let cells = reports.iter().map(|r| metric.cell(n, r)).collect();
            table.push_row(n, cells);
        }
    }

    /// Rewrite every table file in `dir`.
    pub fn write_all(&self, dir: &Path) -> Result<()> {
        for metric in Metric::ALL {
            self.get(metric).write(metric, &dir.join(metric.table_file()))?;
        }
        Ok(())
    }
}

/// Everything one benchmark run produced.
#[derive(Debug, Clone)]
pub struct BenchRun {
    pub tables: ResultTables,
    pub report: BenchReport,
}

/// Measure every configured command at every size, one at a time.
///
/// Commands run inside the build directory with the fixture name as their
/// last argument. Tables are rewritten after each size so an interrupted run
/// keeps every completed row.
pub fn run_benchmarks(cfg: &BenchConfig) -> Result<BenchRun> {
    fs::create_dir_all(&cfg.build_dir).map_err(|e| BenchError::io(&cfg.build_dir, e))?;
    let time_bin = resolve_before_chdir(&cfg.time_bin)?;
    let commands = cfg
        .commands
        .iter()
        .map(|c| {
            let program = resolve_before_chdir(Path::new(c.program()))?;
            Ok(c.with_program(program.to_string_lossy()))
        })
        .collect::<Result<Vec<_>>>()?;
    let out_dir = Path::new(".");

    let _cwd = WorkingDirectory::enter(&cfg.build_dir)?;

    let mut tables = ResultTables::new(cfg.labels());
    let mut report = BenchReport {
        run: RunMeta::from_config(cfg),
        measurements: Vec::new(),
    };
    tables.write_all(out_dir)?;

    for n in cfg.range.iter() {
        let input = PathBuf::from(fixture_name(n));
        if !input.exists() {
            warn!("fixture {} does not exist", input.display());
        }
        let stdout_path = PathBuf::from(format!("{}.out", fixture_name(n)));

        let mut reports = Vec::with_capacity(commands.len());
        for command in &commands {
            let measured = measure_command(&time_bin, command, &input, &stdout_path)?;
            report
                .measurements
                .push(Measurement::new(n, command.label(), &measured));
            reports.push(measured.report);
        }

        tables.push_size(n, &reports);
        tables.write_all(out_dir)?;
        report.write(Path::new(&report_file()))?;
    }

    for metric in Metric::ALL {
        info!("wrote {}", cfg.build_dir.join(metric.table_file()).display());
    }
    Ok(BenchRun { tables, report })
}

/// A relative path with a directory part would point somewhere else once we
/// are inside the build directory; bare program names are left for `PATH`.
fn resolve_before_chdir(program: &Path) -> Result<PathBuf> {
    if program.is_absolute() || program.components().count() < 2 {
        return Ok(program.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| BenchError::io(".", e))?;
    Ok(cwd.join(program))
}
