use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{BenchError, Result};
use crate::report::MeasurementReport;

/// Statement counts to benchmark: `min, min + step, ...` up to and including
/// `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeRange {
    min: u64,
    max: u64,
    step: u64,
}

impl SizeRange {
    pub fn new(min: u64, max: u64, step: u64) -> Result<Self> {
        if min == 0 || step == 0 || min > max {
            return Err(BenchError::InvalidRange { min, max, step });
        }
        Ok(Self { min, max, step })
    }

    /// Ten evenly spaced sizes ending at `max`.
    pub fn from_max(max: u64) -> Result<Self> {
        let min = max / 10;
        Self::new(min, max, min)
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> {
        let (max, step) = (self.max, self.step);
        std::iter::successors(Some(self.min), move |&n| n.checked_add(step))
            .take_while(move |&n| n <= max)
    }
}

/// An external command under test. The fixture path is appended as the last
/// argument when it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    label: String,
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Split a command line on whitespace; the label is the basename of the
    /// program.
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next().ok_or(BenchError::EmptyCommand)?;
        let label = Path::new(&program)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(&program)
            .to_string();
        Ok(Self {
            label,
            program,
            args: words.collect(),
        })
    }

    pub fn with_label(label: impl Into<String>, line: &str) -> Result<Self> {
        let mut spec = Self::parse(line)?;
        spec.label = label.into();
        Ok(spec)
    }

    /// The same command run through a different program path.
    pub fn with_program(&self, program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..self.clone()
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Full argument vector for one run over `input`.
    pub fn argv(&self, input: &Path) -> Vec<OsString> {
        std::iter::once(OsString::from(&self.program))
            .chain(self.args.iter().map(OsString::from))
            .chain(std::iter::once(input.as_os_str().to_owned()))
            .collect()
    }

    /// Human-readable command line for logs.
    pub fn display(&self, input: &Path) -> String {
        let mut s = self.program.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s.push(' ');
        s.push_str(&input.display().to_string());
        s
    }
}

/// The two serdi configurations every run compares against: streaming and
/// model-based round trips of Turtle.
pub fn baseline_commands(serdi: &str) -> Result<Vec<CommandSpec>> {
    Ok(vec![
        CommandSpec::with_label("serdi_stream", &format!("{serdi} -b -i turtle -o turtle"))?,
        CommandSpec::with_label("serdi_model", &format!("{serdi} -m -b -i turtle -o turtle"))?,
    ])
}

#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub range: SizeRange,
    pub commands: Vec<CommandSpec>,
    /// Holds fixtures, result tables, command output and charts.
    pub build_dir: PathBuf,
    /// Resource-measuring wrapper, invoked as `<time_bin> -v <command...>`.
    pub time_bin: PathBuf,
}

impl BenchConfig {
    pub fn new(range: SizeRange, commands: Vec<CommandSpec>) -> Self {
        Self {
            range,
            commands,
            build_dir: PathBuf::from("build"),
            time_bin: PathBuf::from("/usr/bin/time"),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.label().to_string()).collect()
    }
}

/// Outcome of one measured run.
#[derive(Clone, Debug, Default)]
pub struct Measured {
    pub report: MeasurementReport,
    /// Exit status of the wrapper, `None` if it could not be launched or was
    /// killed by a signal.
    pub exit_code: Option<i32>,
}

/// Run `command` over `input` under the time wrapper, with the command's
/// stdout sent to `stdout_path`, and parse the wrapper's report from stderr.
///
/// Only a failure to create `stdout_path` is an error. A wrapper that cannot
/// be launched or exits non-zero yields whatever could be parsed.
pub fn measure_command(
    time_bin: &Path,
    command: &CommandSpec,
    input: &Path,
    stdout_path: &Path,
) -> Result<Measured> {
    let out = File::create(stdout_path).map_err(|e| BenchError::io(stdout_path, e))?;

    info!("{} -v {}", time_bin.display(), command.display(input));
    let output = Command::new(time_bin)
        .arg("-v")
        .args(command.argv(input))
        .stdin(Stdio::null())
        .stdout(out)
        .stderr(Stdio::piped())
        .output();

    let output = match output {
        Ok(o) => o,
        Err(e) => {
            warn!("failed to launch {}: {e}", time_bin.display());
            return Ok(Measured::default());
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    let report = MeasurementReport::parse(&stderr);
    if !output.status.success() {
        warn!("`{}` exited with {}", command.label(), output.status);
    }
    if !report.is_complete() {
        debug!("incomplete report for `{}`:\n{stderr}", command.label());
    }

    Ok(Measured {
        report,
        exit_code: output.status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_from_max() {
        let r = SizeRange::from_max(100).unwrap();
        assert_eq!((r.min(), r.max(), r.step()), (10, 100, 10));
        let sizes: Vec<u64> = r.iter().collect();
        assert_eq!(sizes, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn test_range_stops_at_max() {
        let r = SizeRange::new(3, 10, 3).unwrap();
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![3, 6, 9]);
    }

    #[test]
    fn test_range_single_size() {
        let r = SizeRange::new(7, 7, 1).unwrap();
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(SizeRange::new(0, 10, 1).is_err());
        assert!(SizeRange::new(1, 10, 0).is_err());
        assert!(SizeRange::new(11, 10, 1).is_err());
        assert!(SizeRange::from_max(9).is_err());
    }

    #[test]
    fn test_range_near_u64_max_terminates() {
        let r = SizeRange::new(u64::MAX - 1, u64::MAX, 2).unwrap();
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![u64::MAX - 1]);
    }

    #[test]
    fn test_command_parse_labels_by_basename() {
        let c = CommandSpec::parse("/usr/local/bin/rapper -i turtle -o turtle").unwrap();
        assert_eq!(c.label(), "rapper");
        assert_eq!(c.program(), "/usr/local/bin/rapper");
        assert_eq!(c.args(), ["-i", "turtle", "-o", "turtle"]);
    }

    #[test]
    fn test_command_argv_appends_input() {
        let c = CommandSpec::parse("riot  --output=ttl").unwrap();
        let argv = c.argv(Path::new("gen10.ttl"));
        assert_eq!(argv, vec!["riot", "--output=ttl", "gen10.ttl"]);
        assert_eq!(c.display(Path::new("gen10.ttl")), "riot --output=ttl gen10.ttl");
    }

    #[test]
    fn test_with_program_keeps_label_and_args() {
        let c = CommandSpec::parse("./tools/rapper -i turtle").unwrap();
        let moved = c.with_program("/abs/tools/rapper");
        assert_eq!(moved.label(), "rapper");
        assert_eq!(moved.program(), "/abs/tools/rapper");
        assert_eq!(moved.args(), c.args());
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(matches!(
            CommandSpec::parse("   "),
            Err(BenchError::EmptyCommand)
        ));
    }

    #[test]
    fn test_baselines() {
        let b = baseline_commands("serdi").unwrap();
        assert_eq!(b[0].label(), "serdi_stream");
        assert_eq!(b[1].label(), "serdi_model");
        assert_eq!(b[1].args()[0], "-m");
    }

    #[cfg(unix)]
    #[test]
    fn test_unlaunchable_wrapper_gives_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandSpec::parse("true").unwrap();
        let m = measure_command(
            &dir.path().join("no-such-time"),
            &cmd,
            Path::new("in.ttl"),
            &dir.path().join("out"),
        )
        .unwrap();
        assert_eq!(m.report, MeasurementReport::default());
        assert_eq!(m.exit_code, None);
    }
}
