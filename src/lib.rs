//! Benchmark driver for RDF serialisation tools.
//!
//! Three stages, coupled only through files in a build directory:
//! [`fixtures`] generates SP2B inputs, [`driver`] measures each command under
//! `time -v` and writes one table per [`table::Metric`], and [`plot`] renders
//! each table as an SVG chart.

pub mod driver;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod plot;
pub mod report;
pub mod schema;
pub mod table;
pub mod workdir;

pub use error::{BenchError, Result};
