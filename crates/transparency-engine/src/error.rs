use thiserror::Error;
use transparency_core::{CoreError, LedgerError, Score};
use transparency_db::DbError;
use uuid::Uuid;

/// Score engine error types
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Organization not found: {0}")]
    OrganizationNotFound(Uuid),

    #[error("Evidence not found: {0}")]
    EvidenceNotFound(Uuid),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(Uuid),

    #[error("Report {report_id} not found for organization {organization_id}")]
    ReportNotFound { organization_id: Uuid, report_id: Uuid },

    #[error("No transparency score recorded for organization {0}")]
    ScoreNotFound(Uuid),

    #[error("Score of organization {organization_id} kept changing underneath {attempts} attempts")]
    ConcurrencyConflict { organization_id: Uuid, attempts: u32 },

    #[error("Recalculation of organization {organization_id} failed: {source}")]
    RecalculationFailed {
        organization_id: Uuid,
        #[source]
        source: DbError,
    },

    #[error("Ledger of organization {organization_id} is inconsistent: {source}")]
    LedgerInconsistent {
        organization_id: Uuid,
        #[source]
        source: LedgerError,
    },

    #[error("Ledger of organization {organization_id} ends at {ledger} but the record holds {record}")]
    LedgerDiverged {
        organization_id: Uuid,
        ledger: Score,
        record: Score,
    },

    #[error("Invalid engine configuration: {0}")]
    Config(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl EngineError {
    /// A referenced organization, evidence, campaign, report or score is missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::OrganizationNotFound(_)
                | EngineError::EvidenceNotFound(_)
                | EngineError::CampaignNotFound(_)
                | EngineError::ReportNotFound { .. }
                | EngineError::ScoreNotFound(_)
        )
    }

    /// Retrying the whole operation later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::ConcurrencyConflict { .. } | EngineError::RecalculationFailed { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
