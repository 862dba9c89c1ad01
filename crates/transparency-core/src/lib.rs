pub mod activity;
pub mod calculator;
pub mod config;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod reason;
pub mod record;
pub mod score;

// Re-export commonly used types
pub use activity::{ActivitySnapshot, evidence_deadline, is_on_time};
pub use calculator::{ScoreLevel, calculate_change, calculate_new_score, score_level};
pub use config::EngineConfig;
pub use error::{CoreError, CoreResult, LedgerError};
pub use ledger::{EntityKind, HistoryEntry, NewHistoryEntry, RelatedEntity, replay};
pub use policy::{CAMPAIGN_ELIGIBILITY_FLOOR, GateResult, check_campaign_gate, is_low_score};
pub use reason::{ChangeReason, UnrecognizedCode};
pub use record::{ScoreEvent, ScoreRecord, ScoreTransition};
pub use score::Score;
