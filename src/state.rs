use std::path::PathBuf;
use std::sync::Arc;

use crate::data::cache::DatasetCache;
use crate::data::model::DatasetSnapshot;
use crate::predict::schema::{PredictionRequest, PredictionResponse};
use crate::predict;
use crate::scatter::{build_scatter, ScatterError, ScatterFigure, ScatterRequest, ScatterStyle};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Scatter,
    Predict,
    Table,
}

/// Scatter selections plus the figure last built from them.
#[derive(Debug, Default)]
pub struct ScatterView {
    pub request: ScatterRequest,
    pub style: ScatterStyle,
    figure: Option<Result<ScatterFigure, ScatterError>>,
    built_from: Option<(Arc<DatasetSnapshot>, ScatterRequest)>,
}

impl ScatterView {
    /// Figure for the current selections, rebuilt only when the snapshot or
    /// the selections changed.  `None` until both axes are picked.
    pub fn figure(&mut self, snapshot: &Arc<DatasetSnapshot>) -> Option<&Result<ScatterFigure, ScatterError>> {
        if self.request.x.is_empty() || self.request.y.is_empty() {
            return None;
        }
        let fresh = matches!(
            &self.built_from,
            Some((snap, req)) if Arc::ptr_eq(snap, snapshot) && *req == self.request
        );
        if !fresh {
            self.figure = Some(build_scatter(snapshot, &self.request, &self.style));
            self.built_from = Some((Arc::clone(snapshot), self.request.clone()));
        }
        self.figure.as_ref()
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    cache: &'static DatasetCache,

    /// Snapshot served by the cache on the last refresh.
    pub snapshot: Option<Arc<DatasetSnapshot>>,

    pub tab: Tab,
    pub scatter: ScatterView,

    pub prediction_input: PredictionRequest,
    pub prediction: Option<PredictionResponse>,

    /// Optional pre-fitted model and the k used when fitting instead.
    pub model_path: Option<PathBuf>,
    pub neighbors: usize,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(cache: &'static DatasetCache, model_path: Option<PathBuf>, neighbors: usize) -> Self {
        Self {
            cache,
            snapshot: None,
            tab: Tab::default(),
            scatter: ScatterView::default(),
            prediction_input: PredictionRequest::default(),
            prediction: None,
            model_path,
            neighbors,
            status_message: None,
        }
    }

    pub fn cache(&self) -> &'static DatasetCache {
        self.cache
    }

    /// Ask the cache for the current snapshot.  Cheap when the file is
    /// unchanged; a failed load clears the snapshot and sets the status.
    pub fn refresh(&mut self) {
        match self.cache.get() {
            Ok(snapshot) => {
                let changed = self
                    .snapshot
                    .as_ref()
                    .map_or(true, |old| !Arc::ptr_eq(old, &snapshot));
                if changed {
                    log::info!(
                        "Dataset {} loaded: {} rows, columns {:?}",
                        self.cache.path().display(),
                        snapshot.len(),
                        snapshot.column_names()
                    );
                    self.status_message = None;
                }
                self.snapshot = Some(snapshot);
            }
            Err(e) => {
                let msg = format!("Error: {e}");
                if self.status_message.as_deref() != Some(msg.as_str()) {
                    log::error!("Failed to load dataset: {e}");
                }
                self.status_message = Some(msg);
                self.snapshot = None;
            }
        }
    }

    /// Switch the cache to another file and load it.
    pub fn open_dataset(&mut self, path: PathBuf) {
        log::info!("Switching dataset to {}", path.display());
        self.cache.retarget(path);
        self.snapshot = None;
        self.refresh();
    }

    /// Predict for the current form values with the process-wide model.
    pub fn run_prediction(&mut self) {
        let cache = self.cache;
        let model_path = self.model_path.clone();
        let k = self.neighbors;
        let result = predict::shared_model(|| predict::load_or_fit(model_path.as_deref(), cache, k))
            .and_then(|model| predict::predict(model, &self.prediction_input));

        match result {
            Ok(resp) => {
                self.prediction = Some(resp);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Prediction failed: {e:#}");
                self.prediction = None;
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
