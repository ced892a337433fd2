//! Settings - command-line flags with environment fallbacks

use std::path::PathBuf;

use clap::Parser;

use crate::data::cache::DatasetSource;
use crate::data::loader::{Engine, ParseOptions, SchemaOverrides, DEFAULT_INFER_ROWS, MEASUREMENT_COLUMNS};
use crate::predict::knn::DEFAULT_NEIGHBORS;

fn default_float_columns() -> Vec<String> {
    MEASUREMENT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// gasview - browse the gasification dataset and predict syngas composition.
#[derive(Parser, Debug, Clone)]
#[command(name = "gasview", author, version, about)]
pub struct Settings {
    /// Dataset file (.parquet, or `;`-delimited text).
    #[arg(
        long,
        env = "DATASET_PATH",
        default_value = "data/GasificationDataset.csv",
        value_name = "PATH"
    )]
    pub dataset: PathBuf,

    /// Parsing engine for delimited text (arrow/simple).
    #[arg(
        long,
        env = "DATASET_ENGINE",
        default_value = "arrow",
        value_name = "ENGINE",
        value_parser = parse_engine
    )]
    pub engine: Engine,

    /// Rows sampled for schema inference by the arrow engine.
    #[arg(long, env = "DATASET_INFER_ROWS", default_value_t = DEFAULT_INFER_ROWS)]
    pub infer_rows: usize,

    /// Columns forced to floating point when inference fails.
    #[arg(
        long = "float-column",
        env = "DATASET_FLOAT_COLUMNS",
        value_name = "COLUMN",
        value_delimiter = ',',
        default_values_t = default_float_columns()
    )]
    pub float_columns: Vec<String>,

    /// Pre-fitted KNN model (JSON); fitted from the dataset when absent.
    #[arg(long, env = "MODEL_PATH", value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Neighbours used when fitting the model from the dataset.
    #[arg(long, env = "MODEL_NEIGHBORS", default_value_t = DEFAULT_NEIGHBORS)]
    pub neighbors: usize,
}

fn parse_engine(s: &str) -> Result<Engine, String> {
    s.parse::<Engine>().map_err(|e| e.to_string())
}

impl Settings {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            infer_rows: self.infer_rows,
            overrides: SchemaOverrides::floats(self.float_columns.iter().cloned()),
            ..ParseOptions::default()
        }
    }

    pub fn dataset_source(&self) -> DatasetSource {
        DatasetSource::new(self.dataset.clone())
            .with_engine(self.engine)
            .with_options(self.parse_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ColumnType;

    #[test]
    fn test_defaults() {
        let settings = Settings::try_parse_from(["gasview"]).unwrap();
        assert_eq!(settings.engine, Engine::Arrow);
        assert_eq!(settings.infer_rows, DEFAULT_INFER_ROWS);
        assert_eq!(settings.parse_options(), ParseOptions::default());
        assert!(settings.model.is_none());
    }

    #[test]
    fn test_flags_override_defaults() {
        let settings = Settings::try_parse_from([
            "gasview",
            "--dataset",
            "runs.parquet",
            "--engine",
            "pandas",
            "--float-column",
            "Methane,Hydrogen",
        ])
        .unwrap();
        let source = settings.dataset_source();
        assert_eq!(source.path, PathBuf::from("runs.parquet"));
        assert_eq!(source.engine, Engine::Simple);
        let overrides = &source.options.overrides;
        assert_eq!(overrides.get("Methane"), Some(ColumnType::Float));
        assert_eq!(overrides.get("Hydrogen"), Some(ColumnType::Float));
        assert_eq!(overrides.get("CarbonMonoxide"), None);
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        assert!(Settings::try_parse_from(["gasview", "--engine", "duckdb"]).is_err());
    }
}
