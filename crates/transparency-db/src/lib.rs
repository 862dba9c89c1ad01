pub mod catalog;
pub mod error;
pub mod models;
pub mod pool;
pub mod repository;
pub mod score_history;
pub mod scores;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use error::{DbError, DbResult};
pub use models::{
    Campaign, CampaignStatus, Evidence, EvidenceStatus, LeaderboardRow, Organization, Report,
    ReportStatus, ReportType,
};
pub use pool::{create_pool, run_migrations};
pub use repository::{Catalog, SaveOutcome, ScoreRepository, SqlStore};
