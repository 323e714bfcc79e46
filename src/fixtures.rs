//! Fixture generation with the SP2B data generator.
//!
//! Fixtures are named by statement count (`gen<N>.ttl`) and treated as a
//! cache: an existing file is never regenerated or deleted.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{BenchError, Result};
use crate::harness::SizeRange;
use crate::workdir::WorkingDirectory;

/// Generator executable, relative to the generator directory.
pub const GENERATOR: &str = "./sp2b_gen";

/// File name of the fixture with `n` statements.
pub fn fixture_name(n: u64) -> String {
    format!("gen{n}.ttl")
}

/// What [`generate_fixtures`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub generated: Vec<u64>,
    pub cached: Vec<u64>,
}

/// Make sure `<build_dir>/gen<N>.ttl` exists for every size in `range`,
/// running `./sp2b_gen -t <N> <path>` from inside `generator_dir` for each one
/// that is missing.
pub fn generate_fixtures(
    generator_dir: &Path,
    build_dir: &Path,
    range: &SizeRange,
) -> Result<GenerateSummary> {
    fs::create_dir_all(build_dir).map_err(|e| BenchError::io(build_dir, e))?;
    // The generator runs elsewhere, so it needs an absolute output path.
    let build_dir = build_dir
        .canonicalize()
        .map_err(|e| BenchError::io(build_dir, e))?;

    let mut summary = GenerateSummary::default();
    let _cwd = WorkingDirectory::enter(generator_dir)?;

    for n in range.iter() {
        let out_path = build_dir.join(fixture_name(n));
        if out_path.exists() {
            debug!("{} exists, skipping", out_path.display());
            summary.cached.push(n);
            continue;
        }
        run_generator(n, &out_path)?;
        summary.generated.push(n);
    }

    info!(
        "generated {} fixtures ({} cached)",
        summary.generated.len(),
        summary.cached.len()
    );
    Ok(summary)
}

fn run_generator(n: u64, out_path: &Path) -> Result<()> {
    info!("{GENERATOR} -t {n} {}", out_path.display());
    let status = Command::new(GENERATOR)
        .arg("-t")
        .arg(n.to_string())
        .arg(out_path)
        .status()
        .map_err(|source| BenchError::Spawn {
            program: GENERATOR.to_string(),
            source,
        })?;
    if !status.success() {
        warn!("{GENERATOR} exited with {status} for n={n}");
    }
    Ok(())
}
