//! Parser for the diagnostic report of GNU `time -v`.
//!
//! Only two lines matter:
//!
//! ```text
//!     User time (seconds): 2.50
//!     Maximum resident set size (kbytes): 1024
//! ```

/// Marker of the line carrying elapsed user time in seconds.
pub const USER_TIME_MARKER: &str = "User time";

/// Marker of the line carrying peak resident memory in kilobytes.
pub const MAX_RSS_MARKER: &str = "Maximum resident set";

/// Result of one measured command execution. Either field is `None` when the
/// wrapper did not report it or the value could not be parsed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeasurementReport {
    pub elapsed_secs: Option<f64>,
    pub peak_memory_bytes: Option<u64>,
}

impl MeasurementReport {
    /// Scan a full report. When a marker appears more than once the last
    /// occurrence wins.
    pub fn parse(report: &str) -> Self {
        let mut out = MeasurementReport::default();
        for line in report.lines() {
            let line = line.trim_start();
            if line.starts_with(USER_TIME_MARKER) {
                out.elapsed_secs = field_value(line).and_then(|v| v.parse::<f64>().ok());
            } else if line.starts_with(MAX_RSS_MARKER) {
                out.peak_memory_bytes = field_value(line).and_then(parse_kbytes);
            }
        }
        out
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_secs.is_some() && self.peak_memory_bytes.is_some()
    }
}

fn field_value(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, v)| v.trim())
}

fn parse_kbytes(s: &str) -> Option<u64> {
    if let Ok(kb) = s.parse::<u64>() {
        return kb.checked_mul(1024);
    }
    // Some wrappers print a fractional value.
    let kb = s.parse::<f64>().ok()?;
    if kb.is_finite() && kb >= 0.0 {
        Some((kb * 1024.0).round() as u64)
    } else {
        None
    }
}
