use crate::error::DbResult;
use crate::models::{Campaign, Evidence, LeaderboardRow, Organization, Report};
use crate::{catalog, score_history, scores};
use async_trait::async_trait;
use sqlx::{Any, Pool};
use transparency_core::{ChangeReason, HistoryEntry, NewHistoryEntry, RelatedEntity, Score, ScoreRecord};
use uuid::Uuid;

/// Result of a compare-and-swap score write
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Record and ledger entry committed together
    Saved {
        record: ScoreRecord,
        entry: HistoryEntry,
    },
    /// Another writer bumped the version first; nothing was written
    Conflict,
}

/// Storage for score records and their append-only ledger
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    async fn find_by_organization_id(&self, organization_id: Uuid) -> DbResult<Option<ScoreRecord>>;

    /// Create a record with its `INITIALIZED` entry; `false` when one exists
    async fn insert_initial(&self, record: &ScoreRecord) -> DbResult<bool>;

    /// Write `record` only if the stored version is still `expected_version`,
    /// appending `entry` in the same transaction
    async fn save_with_history(
        &self,
        record: &ScoreRecord,
        expected_version: i64,
        entry: &NewHistoryEntry,
    ) -> DbResult<SaveOutcome>;

    async fn list_history(&self, organization_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<HistoryEntry>>;

    async fn count_history(&self, organization_id: Uuid) -> DbResult<i64>;

    /// Entire ledger, oldest first
    async fn full_history(&self, organization_id: Uuid) -> DbResult<Vec<HistoryEntry>>;

    async fn has_history_entry(
        &self,
        organization_id: Uuid,
        reason: &ChangeReason,
        related: RelatedEntity,
    ) -> DbResult<bool>;

    /// Entities that already received a change with `reason`, oldest first
    async fn related_ids_with_reason(&self, organization_id: Uuid, reason: &ChangeReason) -> DbResult<Vec<Uuid>>;

    async fn count_history_with_reason(&self, organization_id: Uuid, reason: &ChangeReason) -> DbResult<i64>;

    async fn leaderboard(&self, limit: i64, offset: i64) -> DbResult<Vec<LeaderboardRow>>;

    async fn count_scores(&self) -> DbResult<i64>;

    async fn low_scores(&self, threshold: Score, limit: i64, offset: i64) -> DbResult<Vec<ScoreRecord>>;

    async fn count_low_scores(&self, threshold: Score) -> DbResult<i64>;
}

/// Read access to the organizations, campaigns, evidences and reports the
/// engine reacts to
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn organization(&self, id: Uuid) -> DbResult<Option<Organization>>;

    async fn organization_exists(&self, id: Uuid) -> DbResult<bool>;

    async fn campaign(&self, id: Uuid) -> DbResult<Option<Campaign>>;

    async fn evidence(&self, id: Uuid) -> DbResult<Option<Evidence>>;

    async fn report(&self, id: Uuid) -> DbResult<Option<Report>>;

    async fn campaigns_for_organization(&self, organization_id: Uuid) -> DbResult<Vec<Campaign>>;

    async fn evidences_for_organization(&self, organization_id: Uuid) -> DbResult<Vec<Evidence>>;

    async fn upheld_report_ids(&self, organization_id: Uuid) -> DbResult<Vec<Uuid>>;

    async fn completed_campaigns(&self, limit: i64, offset: i64) -> DbResult<Vec<Campaign>>;

    async fn approved_spend(&self, campaign_id: Uuid) -> DbResult<i64>;
}

/// SQL-backed implementation of both [`ScoreRepository`] and [`Catalog`]
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: Pool<Any>,
}

impl SqlStore {
    pub fn new(pool: Pool<Any>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Any> {
        &self.pool
    }
}

#[async_trait]
impl ScoreRepository for SqlStore {
    async fn find_by_organization_id(&self, organization_id: Uuid) -> DbResult<Option<ScoreRecord>> {
        scores::get_score(&self.pool, organization_id).await
    }

    async fn insert_initial(&self, record: &ScoreRecord) -> DbResult<bool> {
        scores::insert_initial_score(&self.pool, record).await
    }

    async fn save_with_history(
        &self,
        record: &ScoreRecord,
        expected_version: i64,
        entry: &NewHistoryEntry,
    ) -> DbResult<SaveOutcome> {
        scores::save_score_with_history(&self.pool, record, expected_version, entry).await
    }

    async fn list_history(&self, organization_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<HistoryEntry>> {
        score_history::list_history_by_organization(&self.pool, organization_id, limit, offset).await
    }

    async fn count_history(&self, organization_id: Uuid) -> DbResult<i64> {
        score_history::count_history_by_organization(&self.pool, organization_id).await
    }

    async fn full_history(&self, organization_id: Uuid) -> DbResult<Vec<HistoryEntry>> {
        score_history::list_full_history(&self.pool, organization_id).await
    }

    async fn has_history_entry(
        &self,
        organization_id: Uuid,
        reason: &ChangeReason,
        related: RelatedEntity,
    ) -> DbResult<bool> {
        score_history::history_entry_exists(&self.pool, organization_id, reason, related).await
    }

    async fn related_ids_with_reason(&self, organization_id: Uuid, reason: &ChangeReason) -> DbResult<Vec<Uuid>> {
        score_history::list_related_ids_by_reason(&self.pool, organization_id, reason).await
    }

    async fn count_history_with_reason(&self, organization_id: Uuid, reason: &ChangeReason) -> DbResult<i64> {
        score_history::count_history_by_reason(&self.pool, organization_id, reason).await
    }

    async fn leaderboard(&self, limit: i64, offset: i64) -> DbResult<Vec<LeaderboardRow>> {
        scores::list_leaderboard(&self.pool, limit, offset).await
    }

    async fn count_scores(&self) -> DbResult<i64> {
        scores::count_scores(&self.pool).await
    }

    async fn low_scores(&self, threshold: Score, limit: i64, offset: i64) -> DbResult<Vec<ScoreRecord>> {
        scores::list_low_scores(&self.pool, threshold, limit, offset).await
    }

    async fn count_low_scores(&self, threshold: Score) -> DbResult<i64> {
        scores::count_low_scores(&self.pool, threshold).await
    }
}

#[async_trait]
impl Catalog for SqlStore {
    async fn organization(&self, id: Uuid) -> DbResult<Option<Organization>> {
        catalog::get_organization(&self.pool, id).await
    }

    async fn organization_exists(&self, id: Uuid) -> DbResult<bool> {
        catalog::organization_exists(&self.pool, id).await
    }

    async fn campaign(&self, id: Uuid) -> DbResult<Option<Campaign>> {
        catalog::get_campaign(&self.pool, id).await
    }

    async fn evidence(&self, id: Uuid) -> DbResult<Option<Evidence>> {
        catalog::get_evidence(&self.pool, id).await
    }

    async fn report(&self, id: Uuid) -> DbResult<Option<Report>> {
        catalog::get_report(&self.pool, id).await
    }

    async fn campaigns_for_organization(&self, organization_id: Uuid) -> DbResult<Vec<Campaign>> {
        catalog::list_campaigns_by_organization(&self.pool, organization_id).await
    }

    async fn evidences_for_organization(&self, organization_id: Uuid) -> DbResult<Vec<Evidence>> {
        catalog::list_evidences_by_organization(&self.pool, organization_id).await
    }

    async fn upheld_report_ids(&self, organization_id: Uuid) -> DbResult<Vec<Uuid>> {
        catalog::list_upheld_report_ids(&self.pool, organization_id).await
    }

    async fn completed_campaigns(&self, limit: i64, offset: i64) -> DbResult<Vec<Campaign>> {
        catalog::list_completed_campaigns(&self.pool, limit, offset).await
    }

    async fn approved_spend(&self, campaign_id: Uuid) -> DbResult<i64> {
        catalog::sum_approved_spend(&self.pool, campaign_id).await
    }
}
