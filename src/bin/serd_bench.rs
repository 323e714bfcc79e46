use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serd_bench::driver;
use serd_bench::fixtures;
use serd_bench::harness::{baseline_commands, BenchConfig, CommandSpec, SizeRange};
use serd_bench::plot::{self, YBounds};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "serd-bench")]
#[command(about = "Benchmark RDF reading and writing commands")]
#[command(after_help = "example:
  serd-bench --max 100000 \\
      --run 'rapper -i turtle -o turtle' \\
      --run 'riot --output=ttl' \\
      --run 'rdfpipe -i turtle -o turtle' /path/to/sp2b/src/")]
struct Args {
    /// Path to the SP2B data generator (directory containing `sp2b_gen`).
    #[arg(value_name = "SP2B_DIR")]
    sp2b_dir: PathBuf,

    /// Maximum triple count.
    #[arg(long, default_value_t = 1_000_000)]
    max: u64,

    /// Additional command to run (input file is appended). Can be repeated.
    #[arg(long, value_name = "CMD", action = clap::ArgAction::Append)]
    run: Vec<String>,

    /// Do not generate data.
    #[arg(long, default_value_t = false)]
    no_generate: bool,

    /// Do not run benchmarks.
    #[arg(long, default_value_t = false)]
    no_execute: bool,

    /// Do not plot benchmarks.
    #[arg(long, default_value_t = false)]
    no_plot: bool,

    /// Directory for fixtures, result tables and charts.
    #[arg(long, value_name = "DIR", default_value = "build")]
    build_dir: PathBuf,

    /// serdi executable used for the two baseline columns.
    #[arg(long, value_name = "PATH", default_value = "serdi")]
    serdi: String,

    /// GNU time executable (must support `-v`).
    #[arg(long, value_name = "PATH", default_value = "/usr/bin/time")]
    time_bin: PathBuf,

    /// Fixed upper bound of the time chart's y axis.
    #[arg(long, value_name = "SECS")]
    y_max_time: Option<f64>,

    /// Fixed upper bound of the throughput chart's y axis.
    #[arg(long, value_name = "STMTS_PER_SEC")]
    y_max_throughput: Option<f64>,

    /// Fixed upper bound of the memory chart's y axis.
    #[arg(long, value_name = "BYTES")]
    y_max_memory: Option<f64>,

    /// Log debug output, including incomplete time reports.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let range = SizeRange::from_max(args.max)
        .with_context(|| format!("--max {} must be at least 10", args.max))?;

    let mut commands = baseline_commands(&args.serdi)?;
    for line in &args.run {
        commands.push(CommandSpec::parse(line).with_context(|| format!("--run '{line}'"))?);
    }

    let cfg = BenchConfig {
        build_dir: args.build_dir.clone(),
        time_bin: args.time_bin.clone(),
        ..BenchConfig::new(range, commands)
    };

    if !args.no_generate {
        fixtures::generate_fixtures(&args.sp2b_dir, &cfg.build_dir, &cfg.range)
            .context("generating fixtures")?;
    }

    if !args.no_execute {
        let run = driver::run_benchmarks(&cfg).context("running benchmarks")?;
        info!(
            "measured {} runs of {} commands",
            run.report.measurements.len(),
            cfg.commands.len()
        );
    }

    if !args.no_plot {
        let bounds = YBounds {
            time: args.y_max_time,
            throughput: args.y_max_throughput,
            memory: args.y_max_memory,
        };
        plot::plot_results(&cfg.build_dir, &bounds).context("plotting results")?;
    }

    Ok(())
}
