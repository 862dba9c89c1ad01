pub mod deadlines;
pub mod engine;
pub mod error;
pub mod recalculation;
pub mod views;

// Re-export commonly used types
pub use engine::TransparencyScoreEngine;
pub use error::{EngineError, EngineResult};
pub use views::{LeaderboardEntry, PageRequest, Paginated, ScoreChange, ScoreView};
