/// Prediction layer: request/response types, the regressor seam, and the
/// process-wide model.
pub mod knn;
pub mod schema;

use std::path::Path;

use anyhow::{bail, Context, Result};
use once_cell::sync::OnceCell;

use crate::data::cache::DatasetCache;
use crate::data::model::CellValue;
use knn::{FeatureRow, FeatureSpec, KnnRegressor};
use schema::{Prediction, PredictionRequest, PredictionResponse};

/// Anything that maps a feature row to the six gasification outputs.
pub trait Regressor: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> Result<Vec<f64>>;
}

/// Request fields under the dataset's column names.
pub fn feature_row(req: &PredictionRequest) -> FeatureRow {
    FeatureRow::from([
        ("Time".to_string(), CellValue::Integer(req.time)),
        ("Temperature".to_string(), CellValue::Integer(req.t_in)),
        ("ProcessTemperature".to_string(), CellValue::Integer(req.t_pr)),
        ("AgentType".to_string(), CellValue::String(req.agent_type.clone())),
        ("AgentFlow".to_string(), CellValue::Float(req.q_agent)),
        ("SampleType".to_string(), CellValue::String(req.sample_type.clone())),
        ("CatalystType".to_string(), CellValue::String(req.catalyst_type.clone())),
        ("CatalystRatio".to_string(), CellValue::Float(req.catalyst_rate)),
    ])
}

/// Run one request through the model and wrap the outputs.
pub fn predict(model: &dyn Regressor, request: &PredictionRequest) -> Result<PredictionResponse> {
    let values = model.predict(&feature_row(request))?;
    let [co, co2, ch4, o2, h2, calorific] = match values.as_slice() {
        [a, b, c, d, e, f, ..] => [*a, *b, *c, *d, *e, *f],
        other => bail!("model returned {} outputs, expected 6", other.len()),
    };

    Ok(PredictionResponse {
        status: "200".to_string(),
        message: "OK!".to_string(),
        data: Prediction {
            co_perc: co,
            co2_perc: co2,
            ch4_perc: ch4,
            o2_perc: o2,
            h2_perc: h2,
            calorific_value: calorific,
        },
    })
}

/// Load the model from `path`, or fit it on the cached dataset when no
/// model file is configured.
pub fn load_or_fit(path: Option<&Path>, cache: &DatasetCache, k: usize) -> Result<KnnRegressor> {
    match path {
        Some(path) => KnnRegressor::load(path),
        None => {
            let snapshot = cache.get().context("loading dataset to fit the model")?;
            let model = KnnRegressor::fit(&snapshot, &FeatureSpec::default(), k)?;
            log::info!("Fitted KNN model (k={k}) on {} rows", model.sample_count());
            Ok(model)
        }
    }
}

static MODEL: OnceCell<KnnRegressor> = OnceCell::new();

/// Process-wide model, initialised on first use.  A failed initialisation
/// is not cached; the next call tries again.
pub fn shared_model<F>(init: F) -> Result<&'static KnnRegressor>
where
    F: FnOnce() -> Result<KnnRegressor>,
{
    MODEL.get_or_try_init(init)
}
