//! SVG line charts of result tables.
//!
//! One chart per table: the size column is the x axis and every other column
//! is a series. Series are told apart by colour, marker shape and dash
//! pattern, all derived from the column index so the same table always plots
//! the same way.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::info;

use crate::error::{BenchError, Result};
use crate::table::{Metric, ResultTable, X_LABEL};

/// Width and height in pixels; the aspect ratio is √2.
pub const CHART_SIZE: (u32, u32) = (800, 566);

/// Tick labels switch to scientific notation at this magnitude.
pub const SCI_THRESHOLD: f64 = 1e4;

const LINE_WIDTH: u32 = 1;
const MARKER_RADIUS: f64 = 4.0;
/// Pixels per unit of a dash pattern.
const DASH_SCALE: f64 = 4.0;
/// Remainders shorter than this (in pixels) are rounding noise.
const EPS: f64 = 1e-9;

const DASH: f64 = 2.0;
const SPACE: f64 = 0.75;
const DOT: f64 = 0.75;

const PALETTE: [(u8, u8, u8); 10] = [
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
    (227, 119, 194),
    (127, 127, 127),
    (188, 189, 34),
    (23, 190, 207),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    Circle,
    Square,
    TriangleDown,
    Diamond,
    Star,
    Pentagon,
    Plus,
    Hexagon,
    Cross,
}

impl Marker {
    pub const CYCLE: [Marker; 9] = [
        Marker::Circle,
        Marker::Square,
        Marker::TriangleDown,
        Marker::Diamond,
        Marker::Star,
        Marker::Pentagon,
        Marker::Plus,
        Marker::Hexagon,
        Marker::Cross,
    ];

    /// Outline of the marker around the origin, in pixels (y grows downwards).
    pub fn vertices(&self, r: f64) -> Vec<(i32, i32)> {
        let pts = match self {
            Marker::Circle => ring(16, r, 0.0),
            Marker::Square => {
                let s = r * 0.8;
                vec![(-s, -s), (s, -s), (s, s), (-s, s)]
            }
            Marker::TriangleDown => ring(3, r, 90.0),
            Marker::Diamond => vec![(0.0, -r), (0.7 * r, 0.0), (0.0, r), (-0.7 * r, 0.0)],
            Marker::Star => ring(10, r, -90.0)
                .into_iter()
                .enumerate()
                .map(|(i, (x, y))| if i % 2 == 1 { (x * 0.4, y * 0.4) } else { (x, y) })
                .collect(),
            Marker::Pentagon => ring(5, r, -90.0),
            Marker::Plus => plus(r),
            Marker::Hexagon => ring(6, r, -90.0),
            Marker::Cross => rotate(plus(r), 45.0),
        };
        pts.into_iter()
            .map(|(x, y)| (x.round() as i32, y.round() as i32))
            .collect()
    }
}

fn ring(k: usize, r: f64, start_deg: f64) -> Vec<(f64, f64)> {
    (0..k)
        .map(|i| {
            let a = (start_deg + 360.0 * i as f64 / k as f64).to_radians();
            (r * a.cos(), r * a.sin())
        })
        .collect()
}

fn plus(r: f64) -> Vec<(f64, f64)> {
    let w = r / 3.0;
    vec![
        (-w, -r),
        (w, -r),
        (w, -w),
        (r, -w),
        (r, w),
        (w, w),
        (w, r),
        (-w, r),
        (-w, w),
        (-r, w),
        (-r, -w),
        (-w, -w),
    ]
}

fn rotate(pts: Vec<(f64, f64)>, deg: f64) -> Vec<(f64, f64)> {
    let (s, c) = deg.to_radians().sin_cos();
    pts.into_iter()
        .map(|(x, y)| (x * c - y * s, x * s + y * c))
        .collect()
}

/// Dash pattern of series `index` as alternating on/off lengths; empty means
/// solid. Solid, dashed, dotted, then dash-dot with one more dot per series.
pub fn dash_pattern(index: usize) -> Vec<f64> {
    match index {
        0 => Vec::new(),
        1 => vec![DASH, SPACE],
        2 => vec![DOT, SPACE],
        n => {
            let mut p = vec![DASH, SPACE];
            for _ in 0..n - 2 {
                p.extend([DOT, SPACE]);
            }
            p
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeriesStyle {
    pub color: (u8, u8, u8),
    pub marker: Marker,
    pub dashes: Vec<f64>,
}

impl SeriesStyle {
    pub fn rgb(&self) -> RGBColor {
        let (r, g, b) = self.color;
        RGBColor(r, g, b)
    }
}

pub fn series_style(index: usize) -> SeriesStyle {
    SeriesStyle {
        color: PALETTE[index % PALETTE.len()],
        marker: Marker::CYCLE[index % Marker::CYCLE.len()],
        dashes: dash_pattern(index),
    }
}

/// Endless sequence of series styles, starting from the first.
#[derive(Clone, Debug, Default)]
pub struct StyleSequence {
    next: usize,
}

impl Iterator for StyleSequence {
    type Item = SeriesStyle;

    fn next(&mut self) -> Option<SeriesStyle> {
        let style = series_style(self.next);
        self.next += 1;
        Some(style)
    }
}

pub fn styles() -> StyleSequence {
    StyleSequence::default()
}

/// Axis tick label: plain below [`SCI_THRESHOLD`], `<mantissa>e<exp>` above.
pub fn format_tick(v: f64) -> String {
    if v == 0.0 || !v.is_finite() {
        return if v.is_finite() { "0".to_string() } else { v.to_string() };
    }
    if v.abs() < SCI_THRESHOLD {
        return trim_zeros(format!("{v:.3}"));
    }
    let mut exp = v.abs().log10().floor() as i32;
    let mut mantissa = v / 10f64.powi(exp);
    if mantissa.abs() >= 9.995 {
        mantissa /= 10.0;
        exp += 1;
    }
    format!("{}e{exp}", trim_zeros(format!("{mantissa:.2}")))
}

fn trim_zeros(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn lerp(p: (f64, f64), q: (f64, f64), t: f64) -> (f64, f64) {
    if t <= 0.0 {
        p
    } else if t >= 1.0 {
        q
    } else {
        (p.0 + (q.0 - p.0) * t, p.1 + (q.1 - p.1) * t)
    }
}

fn dist(p: (f64, f64), q: (f64, f64)) -> f64 {
    (q.0 - p.0).hypot(q.1 - p.1)
}

/// Split a polyline into the visible pieces of a dash pattern. The pattern
/// starts "on" at the first point.
pub fn dash_segments(points: &[(f64, f64)], pattern: &[f64]) -> Vec<Vec<(f64, f64)>> {
    if points.len() < 2 {
        return Vec::new();
    }
    if pattern.is_empty() || pattern.iter().any(|&d| d <= 0.0) {
        return vec![points.to_vec()];
    }

    let mut out = Vec::new();
    let mut idx = 0;
    let mut left = pattern[0];
    let mut current = vec![points[0]];

    for w in points.windows(2) {
        let (mut p, q) = (w[0], w[1]);
        let mut seg = dist(p, q);
        while seg > EPS {
            let on = idx % 2 == 0;
            if left >= seg {
                left -= seg;
                if on {
                    current.push(q);
                }
                seg = 0.0;
            } else {
                let m = lerp(p, q, left / seg);
                if on {
                    current.push(m);
                    out.push(std::mem::take(&mut current));
                } else {
                    current = vec![m];
                }
                p = m;
                seg = dist(p, q);
                idx = (idx + 1) % pattern.len();
                left = pattern[idx];
            }
        }
    }
    if idx % 2 == 0 && current.len() >= 2 {
        out.push(current);
    }
    out
}

fn clip_segment(
    p: (f64, f64),
    q: (f64, f64),
    lo: f64,
    hi: f64,
) -> Option<((f64, f64), (f64, f64))> {
    let dy = q.1 - p.1;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    if dy == 0.0 {
        if p.1 < lo || p.1 > hi {
            return None;
        }
    } else {
        let ta = (lo - p.1) / dy;
        let tb = (hi - p.1) / dy;
        t0 = t0.max(ta.min(tb));
        t1 = t1.min(ta.max(tb));
        if t0 > t1 {
            return None;
        }
    }
    Some((lerp(p, q, t0), lerp(p, q, t1)))
}

/// Pieces of a polyline that lie within `lo <= y <= hi`.
pub fn clip_to_band(points: &[(f64, f64)], lo: f64, hi: f64) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    let flush = |current: &mut Vec<(f64, f64)>, out: &mut Vec<Vec<(f64, f64)>>| {
        if current.len() >= 2 {
            out.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    for w in points.windows(2) {
        match clip_segment(w[0], w[1], lo, hi) {
            None => flush(&mut current, &mut out),
            Some((a, b)) => {
                if current.last() != Some(&a) {
                    flush(&mut current, &mut out);
                    current.push(a);
                }
                current.push(b);
                if b != w[1] {
                    flush(&mut current, &mut out);
                }
            }
        }
    }
    flush(&mut current, &mut out);
    out
}

/// Consecutive runs of defined values; a missing value breaks the line.
fn defined_runs(series: &[(u64, Option<f64>)]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for &(x, y) in series {
        match y {
            Some(y) => current.push((x as f64, y)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

#[derive(Clone, Debug)]
pub struct PlotOptions {
    pub x_label: String,
    pub y_label: String,
    /// Fixed upper bound of the y axis; auto-scaled when `None`.
    pub y_max: Option<f64>,
}

impl PlotOptions {
    pub fn for_metric(metric: Metric, y_max: Option<f64>) -> Self {
        Self {
            x_label: X_LABEL.to_string(),
            y_label: metric.y_label().to_string(),
            y_max,
        }
    }
}

fn axis_ranges(
    table: &ResultTable,
    y_max: Option<f64>,
) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let xs = table.rows().iter().map(|r| r.size as f64);
    let x_lo = xs.clone().fold(f64::INFINITY, f64::min);
    let x_hi = xs.fold(f64::NEG_INFINITY, f64::max);
    let x = if !x_lo.is_finite() {
        0.0..1.0
    } else if x_lo == x_hi {
        (x_lo - 1.0).max(0.0)..x_hi + 1.0
    } else {
        x_lo..x_hi
    };

    let y_hi = match y_max {
        Some(m) if m > 0.0 => m,
        _ => {
            let top = (0..table.labels().len())
                .flat_map(|c| table.series(c))
                .filter_map(|(_, v)| v)
                .fold(0.0f64, f64::max);
            if top > 0.0 {
                top * 1.05
            } else {
                1.0
            }
        }
    };
    (x, 0.0..y_hi)
}

/// Render `table` to an SVG file at `out`. Returns the number of series.
pub fn plot_table(table: &ResultTable, out: &Path, opts: &PlotOptions) -> Result<usize> {
    draw_chart(table, out, opts).map_err(|e| BenchError::Plot {
        path: out.to_path_buf(),
        reason: e.to_string(),
    })?;
    info!("wrote {}", out.display());
    Ok(table.labels().len())
}

pub fn plot_file(table_path: &Path, out: &Path, opts: &PlotOptions) -> Result<usize> {
    let table = ResultTable::read(table_path)?;
    plot_table(&table, out, opts)
}

fn draw_chart(
    table: &ResultTable,
    out: &Path,
    opts: &PlotOptions,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (x_range, y_range) = axis_ranges(table, opts.y_max);
    let (y_lo, y_hi) = (y_range.start, y_range.end);

    let root = SVGBackend::new(out, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(14)
        .x_label_area_size(44)
        .y_label_area_size(72)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(opts.x_label.as_str())
        .y_desc(opts.y_label.as_str())
        .x_label_formatter(&|x| format_tick(*x))
        .y_label_formatter(&|y| format_tick(*y))
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(WHITE)
        .draw()?;

    for (col, (label, style)) in table.labels().iter().zip(styles()).enumerate() {
        let color = style.rgb();
        let marker = style.marker;
        let pattern: Vec<f64> = style.dashes.iter().map(|d| d * DASH_SCALE).collect();
        let series = table.series(col);

        // Dashes are laid out in pixel space so the pattern does not stretch
        // with the axis scale. Drawing areas clamp vertices to their bounds
        // instead of clipping, so pieces are cut to the y band first.
        for run in defined_runs(&series) {
            for piece in clip_to_band(&run, y_lo, y_hi) {
                let pixels: Vec<(f64, f64)> = piece
                    .iter()
                    .map(|p| {
                        let (x, y) = chart.backend_coord(p);
                        (x as f64, y as f64)
                    })
                    .collect();
                for dash in dash_segments(&pixels, &pattern) {
                    let path: Vec<(i32, i32)> = dash
                        .iter()
                        .map(|&(x, y)| (x.round() as i32, y.round() as i32))
                        .collect();
                    root.draw(&PathElement::new(path, color.stroke_width(LINE_WIDTH)))?;
                }
            }
        }

        let visible: Vec<(f64, f64)> = series
            .iter()
            .filter_map(|&(x, y)| y.map(|y| (x as f64, y)))
            .filter(|&(_, y)| y >= y_lo && y <= y_hi)
            .collect();
        chart
            .draw_series(visible.into_iter().map(|p| {
                EmptyElement::at(p) + Polygon::new(marker.vertices(MARKER_RADIUS), color.filled())
            }))?
            .label(label.as_str())
            .legend(move |(x, y)| {
                EmptyElement::at((x, y))
                    + PathElement::new(vec![(0, 0), (20, 0)], color.stroke_width(LINE_WIDTH))
                    + Polygon::new(
                        marker
                            .vertices(MARKER_RADIUS)
                            .into_iter()
                            .map(|(dx, dy)| (dx + 10, dy))
                            .collect::<Vec<_>>(),
                        color.filled(),
                    )
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .margin(10)
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK.mix(0.3))
        .label_font(("sans-serif", 13))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Optional fixed y-axis bounds, one per metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct YBounds {
    pub time: Option<f64>,
    pub throughput: Option<f64>,
    pub memory: Option<f64>,
}

impl YBounds {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Time => self.time,
            Metric::Throughput => self.throughput,
            Metric::Memory => self.memory,
        }
    }
}

/// Plot every result table in `build_dir` next to it.
pub fn plot_results(build_dir: &Path, bounds: &YBounds) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(Metric::ALL.len());
    for metric in Metric::ALL {
        let out = build_dir.join(metric.chart_file());
        plot_file(
            &build_dir.join(metric.table_file()),
            &out,
            &PlotOptions::for_metric(metric, bounds.get(metric)),
        )?;
        written.push(out);
    }
    Ok(written)
}
