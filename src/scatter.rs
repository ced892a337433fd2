//! Scatter figures built from a dataset snapshot.
//!
//! A [`ScatterFigure`] is plain data: titles, series and per-point marker
//! sizes.  The viewer draws it with `egui_plot`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::color::{self, Rgb8};
use crate::data::model::{Column, ColumnType, DatasetSnapshot};

/// Label used for rows whose hue cell is null.
pub const MISSING_FACTOR: &str = "Missing";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScatterError {
    #[error("Required column not found: {0:?}")]
    MissingColumn(String),

    #[error("size_col not found: {0:?}")]
    MissingSizeColumn(String),

    #[error("hue not found: {0:?}")]
    MissingHueColumn(String),

    #[error("Column {column:?} is {found}, expected a numeric column")]
    NotNumeric { column: String, found: ColumnType },
}

/// Which columns to plot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScatterRequest {
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub size_col: Option<String>,
    #[serde(default)]
    pub hue: Option<String>,
}

impl ScatterRequest {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            size_col: None,
            hue: None,
        }
    }

    pub fn with_size(mut self, column: impl Into<String>) -> Self {
        self.size_col = Some(column.into());
        self
    }

    pub fn with_hue(mut self, column: impl Into<String>) -> Self {
        self.hue = Some(column.into());
        self
    }
}

/// Rendering knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterStyle {
    pub width: f32,
    pub height: f32,
    pub alpha: f32,
    /// Marker size range the size column is mapped onto.
    pub size_range: (f64, f64),
    /// Percentiles of the size column that map to the range ends.
    pub size_percentiles: (f64, f64),
    pub default_size: f64,
    pub max_hue: usize,
    pub title: Option<String>,
}

impl Default for ScatterStyle {
    fn default() -> Self {
        Self {
            width: 700.0,
            height: 520.0,
            alpha: 0.25,
            size_range: (6.0, 26.0),
            size_percentiles: (5.0, 95.0),
            default_size: 8.0,
            max_hue: 12,
            title: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// One legend entry worth of points.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    /// Hue factor, `None` for the single series of an un-hued plot.
    pub name: Option<String>,
    pub color: Rgb8,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterFigure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: f32,
    pub height: f32,
    pub alpha: f32,
    pub series: Vec<ScatterSeries>,
}

impl ScatterFigure {
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

/// Validate the request against the snapshot and build the figure.
pub fn build_scatter(
    snapshot: &DatasetSnapshot,
    request: &ScatterRequest,
    style: &ScatterStyle,
) -> Result<ScatterFigure, ScatterError> {
    let x_col = numeric_column(snapshot, &request.x, ScatterError::MissingColumn)?;
    let y_col = numeric_column(snapshot, &request.y, ScatterError::MissingColumn)?;
    let size_col = request
        .size_col
        .as_deref()
        .map(|name| numeric_column(snapshot, name, ScatterError::MissingSizeColumn))
        .transpose()?;
    let hue_col = match request.hue.as_deref() {
        Some(name) => Some(
            snapshot
                .column(name)
                .ok_or_else(|| ScatterError::MissingHueColumn(name.to_string()))?,
        ),
        None => None,
    };

    // Rows with a null coordinate (or null size) are dropped.
    let mut rows: Vec<(usize, f64, f64, Option<f64>)> = Vec::with_capacity(snapshot.len());
    for row in 0..snapshot.len() {
        let (Some(x), Some(y)) = (x_col.values.f64_at(row), y_col.values.f64_at(row)) else {
            continue;
        };
        let size = match size_col {
            Some(col) => match col.values.f64_at(row) {
                Some(s) => Some(s),
                None => continue,
            },
            None => None,
        };
        rows.push((row, x, y, size));
    }

    let sizer = size_col.map(|_| {
        let values: Vec<f64> = rows.iter().filter_map(|r| r.3).collect();
        SizeMap::fit(&values, style)
    });
    let marker_size = |size: Option<f64>| match (&sizer, size) {
        (Some(map), Some(v)) => map.apply(v),
        _ => style.default_size,
    };

    let series = match hue_col {
        None => vec![ScatterSeries {
            name: None,
            color: color::DEFAULT_MARKER,
            points: rows
                .iter()
                .map(|&(_, x, y, s)| ScatterPoint {
                    x,
                    y,
                    size: marker_size(s),
                })
                .collect(),
        }],
        Some(col) => {
            let labels: Vec<String> = rows
                .iter()
                .map(|&(row, ..)| {
                    let cell = col.values.get(row);
                    if cell.is_null() {
                        MISSING_FACTOR.to_string()
                    } else {
                        cell.to_string()
                    }
                })
                .collect();
            let factors = top_factors(&labels, style.max_hue);
            let palette = color::categorical(factors.len());
            let slot: HashMap<&str, usize> = factors
                .iter()
                .enumerate()
                .map(|(i, f)| (f.as_str(), i))
                .collect();

            let mut series: Vec<ScatterSeries> = factors
                .iter()
                .zip(palette)
                .map(|(name, color)| ScatterSeries {
                    name: Some(name.clone()),
                    color,
                    points: Vec::new(),
                })
                .collect();
            for (&(_, x, y, s), label) in rows.iter().zip(&labels) {
                if let Some(&i) = slot.get(label.as_str()) {
                    series[i].points.push(ScatterPoint {
                        x,
                        y,
                        size: marker_size(s),
                    });
                }
            }
            series
        }
    };

    Ok(ScatterFigure {
        title: style.title.clone().unwrap_or_else(|| default_title(request)),
        x_label: request.x.clone(),
        y_label: request.y.clone(),
        width: style.width,
        height: style.height,
        alpha: style.alpha,
        series,
    })
}

fn numeric_column<'a>(
    snapshot: &'a DatasetSnapshot,
    name: &str,
    missing: fn(String) -> ScatterError,
) -> Result<&'a Column, ScatterError> {
    let col = snapshot
        .column(name)
        .ok_or_else(|| missing(name.to_string()))?;
    if !col.column_type().is_numeric() {
        return Err(ScatterError::NotNumeric {
            column: name.to_string(),
            found: col.column_type(),
        });
    }
    Ok(col)
}

fn default_title(request: &ScatterRequest) -> String {
    let mut title = format!("{} vs {}", request.y, request.x);
    if let Some(size) = &request.size_col {
        title.push_str(&format!(" · size={size}"));
    }
    if let Some(hue) = &request.hue {
        title.push_str(&format!(" · hue={hue}"));
    }
    title
}

/// Most frequent labels first (ties alphabetical), at most `max`.
fn top_factors(labels: &[String], max: usize) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    // BTreeMap order makes the sort stable on name for equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(max)
        .map(|(label, _)| label.to_string())
        .collect()
}

/// Linear map from a percentile window of the data onto a size range,
/// clamped at both ends.
#[derive(Debug, Clone, Copy)]
struct SizeMap {
    lo: f64,
    hi: f64,
    out: (f64, f64),
}

impl SizeMap {
    fn fit(values: &[f64], style: &ScatterStyle) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let lo = percentile(&sorted, style.size_percentiles.0);
        let mut hi = percentile(&sorted, style.size_percentiles.1);
        if lo == hi {
            hi = lo + 1e-9;
        }
        Self {
            lo,
            hi,
            out: style.size_range,
        }
    }

    fn apply(&self, v: f64) -> f64 {
        let t = ((v - self.lo) / (self.hi - self.lo)).clamp(0.0, 1.0);
        self.out.0 + t * (self.out.1 - self.out.0)
    }
}

/// Linear-interpolated percentile of sorted data; 0 for empty input.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let below = rank.floor() as usize;
            let above = rank.ceil() as usize;
            let frac = rank - below as f64;
            sorted[below] + (sorted[above] - sorted[below]) * frac
        }
    }
}
