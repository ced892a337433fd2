/// Data layer: snapshot types, file loading, and the dataset cache.
///
/// Architecture:
/// ```text
///  .parquet / ;-delimited text
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → DatasetSnapshot (engine + overrides)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  stat → compare signature → reload under lock
///   └──────────┘
///        │
///        ▼
///   Arc<DatasetSnapshot>  shared with scatter / prediction / UI
/// ```

pub mod cache;
pub mod loader;
pub mod model;
