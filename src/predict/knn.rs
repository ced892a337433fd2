use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::Regressor;
use crate::data::model::{CellValue, DatasetSnapshot};

/// Input columns, in the order the reference model was trained on.
pub const FEATURE_COLUMNS: [&str; 8] = [
    "Time",
    "Temperature",
    "ProcessTemperature",
    "AgentType",
    "AgentFlow",
    "SampleType",
    "CatalystType",
    "CatalystRatio",
];

/// Output columns; the order fixes the order of predicted values.
pub const TARGET_COLUMNS: [&str; 6] = [
    "CarbonMonoxide",
    "CarbonDioxide",
    "Methane",
    "Oxygen",
    "Hydrogen",
    "CalorificValue",
];

pub const DEFAULT_NEIGHBORS: usize = 5;

/// Named feature values for one prediction.
pub type FeatureRow = BTreeMap<String, CellValue>;

/// Which snapshot columns feed the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub features: Vec<String>,
    pub targets: Vec<String>,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            features: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            targets: TARGET_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Encoding {
    /// z-score: `(v - mean) / scale`
    Numeric { mean: f64, scale: f64 },
    /// one-hot: distance 0 on equal labels, 1 otherwise
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Feature {
    name: String,
    encoding: Encoding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum Encoded {
    Number(f64),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Sample {
    inputs: Vec<Encoded>,
    targets: Vec<f64>,
}

/// k-nearest-neighbour regressor: the prediction is the mean target of the
/// `k` closest training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnRegressor {
    k: usize,
    features: Vec<Feature>,
    targets: Vec<String>,
    samples: Vec<Sample>,
}

impl KnnRegressor {
    /// Fit on every snapshot row that has all feature and target cells.
    pub fn fit(snapshot: &DatasetSnapshot, spec: &FeatureSpec, k: usize) -> Result<Self> {
        if k == 0 {
            bail!("k must be at least 1");
        }

        let mut numeric = Vec::with_capacity(spec.features.len());
        for name in &spec.features {
            let col = snapshot
                .column(name)
                .with_context(|| format!("feature column {name:?} not in dataset"))?;
            numeric.push(col.column_type().is_numeric());
        }
        for name in &spec.targets {
            let col = snapshot
                .column(name)
                .with_context(|| format!("target column {name:?} not in dataset"))?;
            if !col.column_type().is_numeric() {
                bail!("target column {name:?} is {}, expected numeric", col.column_type());
            }
        }

        let mut raw: Vec<(Vec<CellValue>, Vec<f64>)> = Vec::new();
        'rows: for row in 0..snapshot.len() {
            let mut inputs = Vec::with_capacity(spec.features.len());
            for name in &spec.features {
                let cell = snapshot.value(row, name);
                if cell.is_null() {
                    continue 'rows;
                }
                inputs.push(cell);
            }
            let mut targets = Vec::with_capacity(spec.targets.len());
            for name in &spec.targets {
                match snapshot.value(row, name).as_f64() {
                    Some(v) => targets.push(v),
                    None => continue 'rows,
                }
            }
            raw.push((inputs, targets));
        }
        if raw.is_empty() {
            bail!("no complete rows to fit on");
        }

        let features: Vec<Feature> = spec
            .features
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let encoding = if numeric[i] {
                    let values: Vec<f64> = raw.iter().filter_map(|(inp, _)| inp[i].as_f64()).collect();
                    let (mean, scale) = mean_and_scale(&values);
                    Encoding::Numeric { mean, scale }
                } else {
                    Encoding::Categorical
                };
                Feature {
                    name: name.clone(),
                    encoding,
                }
            })
            .collect();

        let samples = raw
            .into_iter()
            .map(|(inputs, targets)| Sample {
                inputs: inputs
                    .iter()
                    .zip(&features)
                    .map(|(cell, f)| encode(&f.encoding, cell))
                    .collect(),
                targets,
            })
            .collect();

        Ok(Self {
            k,
            features,
            targets: spec.targets.clone(),
            samples,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn target_names(&self) -> &[String] {
        &self.targets
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading model file {}", path.display()))?;
        let model: Self = serde_json::from_str(&text).context("parsing model JSON")?;
        if model.k == 0 || model.samples.is_empty() {
            bail!("model file {} has no usable samples", path.display());
        }
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json).with_context(|| format!("writing model file {}", path.display()))
    }

    fn encode_row(&self, row: &FeatureRow) -> Result<Vec<Encoded>> {
        self.features
            .iter()
            .map(|f| {
                let cell = row
                    .get(&f.name)
                    .with_context(|| format!("missing feature {:?}", f.name))?;
                match (&f.encoding, cell) {
                    (Encoding::Numeric { .. }, c) if c.as_f64().is_none() => {
                        bail!("feature {:?} must be numeric, got {c}", f.name)
                    }
                    (Encoding::Categorical, CellValue::Null) => {
                        bail!("feature {:?} is null", f.name)
                    }
                    (encoding, c) => Ok(encode(encoding, c)),
                }
            })
            .collect()
    }
}

impl Regressor for KnnRegressor {
    fn predict(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        let query = self.encode_row(row)?;

        let mut ranked: Vec<(f64, usize)> = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| (distance(&query, &s.inputs), i))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let nearest = &ranked[..self.k.min(ranked.len())];
        let mut out = vec![0.0; self.targets.len()];
        for &(_, i) in nearest {
            for (acc, v) in out.iter_mut().zip(&self.samples[i].targets) {
                *acc += v;
            }
        }
        let n = nearest.len() as f64;
        out.iter_mut().for_each(|v| *v /= n);
        Ok(out)
    }
}

fn encode(encoding: &Encoding, cell: &CellValue) -> Encoded {
    match (encoding, cell.as_f64()) {
        (Encoding::Numeric { mean, scale }, Some(v)) => Encoded::Number((v - mean) / scale),
        _ => Encoded::Label(match cell {
            CellValue::String(s) => s.clone(),
            other => other.to_string(),
        }),
    }
}

fn distance(a: &[Encoded], b: &[Encoded]) -> f64 {
    a.iter()
        .zip(b)
        .map(|pair| match pair {
            (Encoded::Number(x), Encoded::Number(y)) => (x - y).powi(2),
            (Encoded::Label(x), Encoded::Label(y)) if x == y => 0.0,
            _ => 1.0,
        })
        .sum()
}

/// Population mean and standard deviation; a flat column scales by 1.
fn mean_and_scale(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    (mean, if std > f64::EPSILON { std } else { 1.0 })
}
