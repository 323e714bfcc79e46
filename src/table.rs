//! Tab-separated result tables, one per metric.
//!
//! ```text
//! n       serdi_stream    serdi_model     rapper
//! 100000  0.2100000       0.3400000       1.0500000
//! ```
//!
//! Missing measurements are empty fields; an undefined value (throughput of a
//! run that took zero time) is written as `nan`.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::error::{BenchError, Result};
use crate::report::MeasurementReport;

/// Prefix shared by every result and chart file name.
pub const FILE_PREFIX: &str = "serdi";

/// Label of the independent variable.
pub const X_LABEL: &str = "Statements";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Time,
    Throughput,
    Memory,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Time, Metric::Throughput, Metric::Memory];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Time => "time",
            Metric::Throughput => "throughput",
            Metric::Memory => "memory",
        }
    }

    pub fn table_file(&self) -> String {
        format!("{FILE_PREFIX}-{}.txt", self.name())
    }

    pub fn chart_file(&self) -> String {
        format!("{FILE_PREFIX}-{}.svg", self.name())
    }

    pub fn y_label(&self) -> &'static str {
        match self {
            Metric::Time => "Time (s)",
            Metric::Throughput => "Statements / s",
            Metric::Memory => "Bytes",
        }
    }

    /// Cell for this metric from one run over a fixture of `n` statements.
    pub fn cell(&self, n: u64, report: &MeasurementReport) -> Cell {
        match self {
            Metric::Time => report.elapsed_secs.map_or(Cell::Missing, Cell::Value),
            Metric::Throughput => match report.elapsed_secs {
                None => Cell::Missing,
                Some(t) if t == 0.0 => Cell::Undefined,
                Some(t) => Cell::Value(n as f64 / t),
            },
            Metric::Memory => report
                .peak_memory_bytes
                .map_or(Cell::Missing, |b| Cell::Value(b as f64)),
        }
    }

    fn format_value(&self, v: f64) -> String {
        match self {
            Metric::Time => format!("{v:.7}"),
            Metric::Throughput | Metric::Memory => format!("{}", v.trunc() as u64),
        }
    }
}

/// One measurement slot in a table row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cell {
    /// The wrapper did not report the field.
    Missing,
    /// Reported, but the metric has no value (zero elapsed time).
    Undefined,
    Value(f64),
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Value(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    fn format(&self, metric: Metric) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Undefined => "nan".to_string(),
            Cell::Value(v) if v.is_nan() => "nan".to_string(),
            Cell::Value(v) => metric.format_value(*v),
        }
    }

    fn parse(field: &str) -> Option<Self> {
        let field = field.trim();
        if field.is_empty() {
            return Some(Cell::Missing);
        }
        match field.parse::<f64>() {
            Ok(v) if v.is_nan() => Some(Cell::Undefined),
            Ok(v) => Some(Cell::Value(v)),
            Err(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub size: u64,
    pub cells: Vec<Cell>,
}

/// Append-only table with a fixed set of columns.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultTable {
    labels: Vec<String>,
    rows: Vec<Row>,
}

impl ResultTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            rows: Vec::new(),
        }
    }

    /// Series labels, not including the leading `n` column.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// # Panics
    ///
    /// If `cells` does not have one entry per column.
    pub fn push_row(&mut self, size: u64, cells: Vec<Cell>) {
        assert_eq!(
            cells.len(),
            self.labels.len(),
            "row for n={size} does not match the table header"
        );
        self.rows.push(Row { size, cells });
    }

    /// Values of column `col` as `(size, value)`; `None` where the cell has no
    /// finite value.
    pub fn series(&self, col: usize) -> Vec<(u64, Option<f64>)> {
        self.rows
            .iter()
            .map(|r| (r.size, r.cells.get(col).and_then(Cell::value)))
            .collect()
    }

    fn write_records<W: io::Write>(
        &self,
        metric: Metric,
        wtr: &mut csv::Writer<W>,
    ) -> csv::Result<()> {
        wtr.write_record(std::iter::once("n").chain(self.labels.iter().map(String::as_str)))?;
        for row in &self.rows {
            wtr.write_record(
                std::iter::once(row.size.to_string())
                    .chain(row.cells.iter().map(|c| c.format(metric))),
            )?;
        }
        Ok(())
    }

    pub fn to_tsv(&self, metric: Metric) -> csv::Result<String> {
        let mut wtr = tsv_writer(Vec::new());
        self.write_records(metric, &mut wtr)?;
        let bytes = wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Rewrite `path` with the whole table.
    pub fn write(&self, metric: Metric, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| BenchError::io(path, e))?;
        let mut wtr = tsv_writer(file);
        self.write_records(metric, &mut wtr).map_err(|source| BenchError::Table {
            path: path.to_path_buf(),
            source,
        })?;
        wtr.flush().map_err(|e| BenchError::io(path, e))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        Self::parse(&text, path)
    }

    /// Parse TSV text; `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let malformed = |line: u64, reason: String| BenchError::MalformedTable {
            path: path.to_path_buf(),
            line: line as usize,
            reason,
        };
        let bad_record =
            |e: csv::Error| malformed(e.position().map_or(1, |p| p.line()), e.to_string());

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(false)
            .from_reader(text.as_bytes());

        let header = rdr.headers().map_err(bad_record)?;
        if header.is_empty() {
            return Err(malformed(1, "missing header row".to_string()));
        }
        let mut table = ResultTable::new(header.iter().skip(1).map(str::to_string).collect());

        for record in rdr.records() {
            let record = record.map_err(bad_record)?;
            let line = record.position().map_or(0, |p| p.line());
            let size = record
                .get(0)
                .and_then(|f| f.trim().parse::<u64>().ok())
                .ok_or_else(|| malformed(line, "first field is not a size".to_string()))?;
            let cells = record
                .iter()
                .skip(1)
                .map(|f| {
                    Cell::parse(f).ok_or_else(|| malformed(line, format!("bad value `{f}`")))
                })
                .collect::<Result<Vec<_>>>()?;
            table.push_row(size, cells);
        }
        Ok(table)
    }
}

/// Plain TSV: no quoting, `\n` line ends.
fn tsv_writer<W: io::Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report(elapsed: Option<f64>, kb: Option<u64>) -> MeasurementReport {
        MeasurementReport {
            elapsed_secs: elapsed,
            peak_memory_bytes: kb.map(|k| k * 1024),
        }
    }

    #[test]
    fn test_file_names() {
        assert_eq!(Metric::Time.table_file(), "serdi-time.txt");
        assert_eq!(Metric::Throughput.chart_file(), "serdi-throughput.svg");
        assert_eq!(Metric::Memory.y_label(), "Bytes");
    }

    #[test]
    fn test_zero_elapsed_throughput_is_undefined() {
        let r = report(Some(0.0), Some(1));
        assert_eq!(Metric::Throughput.cell(100, &r), Cell::Undefined);
        assert_eq!(Metric::Throughput.cell(100, &r).value(), None);
        assert_eq!(Metric::Time.cell(100, &r), Cell::Value(0.0));
    }

    #[test]
    fn test_throughput_is_size_over_time() {
        let r = report(Some(2.5), None);
        assert_eq!(Metric::Throughput.cell(100, &r), Cell::Value(40.0));
        assert_eq!(Metric::Memory.cell(100, &r), Cell::Missing);
    }

    #[test]
    fn test_missing_time_gives_missing_throughput() {
        let r = report(None, Some(4));
        assert_eq!(Metric::Throughput.cell(100, &r), Cell::Missing);
        assert_eq!(Metric::Memory.cell(100, &r), Cell::Value(4096.0));
    }

    #[test]
    fn test_tsv_formatting() {
        let mut t = ResultTable::new(vec!["a".into(), "b".into()]);
        t.push_row(10, vec![Cell::Value(0.25), Cell::Missing]);
        t.push_row(20, vec![Cell::Undefined, Cell::Value(3.0)]);
        assert_eq!(
            t.to_tsv(Metric::Time).unwrap(),
            "n\ta\tb\n10\t0.2500000\t\n20\tnan\t3.0000000\n"
        );
        assert_eq!(
            t.to_tsv(Metric::Throughput).unwrap(),
            "n\ta\tb\n10\t0\t\n20\tnan\t3\n"
        );
    }

    #[test]
    fn test_throughput_truncates() {
        let mut t = ResultTable::new(vec!["a".into()]);
        t.push_row(100, vec![Metric::Throughput.cell(100, &report(Some(3.0), None))]);
        assert_eq!(t.to_tsv(Metric::Throughput).unwrap(), "n\ta\n100\t33\n");
    }

    #[test]
    #[should_panic(expected = "does not match the table header")]
    fn test_row_width_is_checked() {
        let mut t = ResultTable::new(vec!["a".into()]);
        t.push_row(1, vec![Cell::Missing, Cell::Missing]);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(Metric::Memory.table_file());
        let mut t = ResultTable::new(vec!["serdi_stream".into(), "serdi_model".into()]);
        t.push_row(10, vec![Cell::Value(1024.0), Cell::Missing]);
        t.write(Metric::Memory, &path).unwrap();

        let back = ResultTable::read(&path).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.series(0), vec![(10, Some(1024.0))]);
        assert_eq!(back.series(1), vec![(10, None)]);
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let err = ResultTable::parse("n\tA\tB\n10\t1\n", Path::new("t.txt")).unwrap_err();
        match err {
            BenchError::MalformedTable { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(ResultTable::parse("n\tA\n10\tfast\n", Path::new("t.txt")).is_err());
        assert!(ResultTable::parse("n\tA\nten\t1\n", Path::new("t.txt")).is_err());
        assert!(ResultTable::parse("", Path::new("t.txt")).is_err());
    }

    #[test]
    fn test_parse_reports_line_of_bad_value() {
        let err = ResultTable::parse("n\tA\n10\t1\n20\tfast\n", Path::new("t.txt")).unwrap_err();
        match err {
            BenchError::MalformedTable { line, reason, .. } => {
                assert_eq!(line, 3);
                assert!(reason.contains("fast"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_quotes_in_labels_are_not_special() {
        let mut t = ResultTable::new(vec!["say\"hi\"".into()]);
        t.push_row(5, vec![Cell::Undefined]);
        let text = t.to_tsv(Metric::Throughput).unwrap();
        assert_eq!(text, "n\tsay\"hi\"\n5\tnan\n");
        assert_eq!(ResultTable::parse(&text, Path::new("t.txt")).unwrap(), t);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent").join("t.txt");
        let err = ResultTable::new(vec!["a".into()])
            .write(Metric::Time, &path)
            .unwrap_err();
        assert!(matches!(err, BenchError::Io { .. }));
    }
}
