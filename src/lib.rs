//! Gasification dataset viewer: a demand-refreshed dataset cache, scatter
//! figures over the cached snapshot, and a KNN regressor for syngas
//! composition.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod predict;
pub mod scatter;
pub mod state;
pub mod ui;
