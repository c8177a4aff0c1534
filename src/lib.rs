//! Embedding map of tournament models.
//!
//! Fetches per-round performance data for models submitted to a forecasting
//! tournament, pivots it into a model-by-round correlation matrix, computes a
//! deterministic 2D stochastic-neighbor embedding, and renders an annotated
//! scatter chart where models with similar round-by-round skill profiles
//! cluster together.

pub mod config;
pub mod embedding;
pub mod export;
pub mod fetch;
pub mod plotting;
pub mod table;
