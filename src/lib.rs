//! Transparency score engine.
//!
//! Re-exports the workspace crates so downstream services can depend on a single
//! package. See [`TransparencyScoreEngine`] for the entry point.

pub use transparency_core;
pub use transparency_db;
pub use transparency_engine;

pub use transparency_core::{ChangeReason, Score, ScoreLevel, ScoreRecord};
pub use transparency_engine::{EngineError, EngineResult, TransparencyScoreEngine};
