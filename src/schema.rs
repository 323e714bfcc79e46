//! JSON run report written next to the result tables.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};
use crate::harness::{BenchConfig, Measured};
use crate::table::{Metric, FILE_PREFIX};

pub const SCHEMA_VERSION: u32 = 1;

pub fn report_file() -> String {
    format!("{FILE_PREFIX}-report.json")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RangeMeta {
    pub min: u64,
    pub max: u64,
    pub step: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandMeta {
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
    pub time_bin: String,
    pub range: RangeMeta,
    pub commands: Vec<CommandMeta>,
}

impl RunMeta {
    pub fn from_config(cfg: &BenchConfig) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            bench_version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp_utc: now_utc(),
            git_sha: git_sha_short(),
            time_bin: cfg.time_bin.display().to_string(),
            range: RangeMeta {
                min: cfg.range.min(),
                max: cfg.range.max(),
                step: cfg.range.step(),
            },
            commands: cfg
                .commands
                .iter()
                .map(|c| CommandMeta {
                    label: c.label().to_string(),
                    program: c.program().to_string(),
                    args: c.args().to_vec(),
                })
                .collect(),
        }
    }
}

/// One command run at one size. Absent fields were not reported or, for
/// throughput, are undefined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub n: u64,
    pub command: String,
    pub elapsed_secs: Option<f64>,
    pub peak_memory_bytes: Option<u64>,
    pub throughput: Option<f64>,
    pub exit_code: Option<i32>,
}

impl Measurement {
    pub fn new(n: u64, command: &str, measured: &Measured) -> Self {
        Self {
            n,
            command: command.to_string(),
            elapsed_secs: measured.report.elapsed_secs,
            peak_memory_bytes: measured.report.peak_memory_bytes,
            throughput: Metric::Throughput.cell(n, &measured.report).value(),
            exit_code: measured.exit_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub run: RunMeta,
    pub measurements: Vec<Measurement>,
}

impl BenchReport {
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BenchError::io(path, std::io::Error::other(e)))?;
        fs::write(path, json).map_err(|e| BenchError::io(path, e))
    }
}

fn now_utc() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}
