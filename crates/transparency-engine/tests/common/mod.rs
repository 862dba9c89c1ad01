#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use transparency_core::{
    ChangeReason, EngineConfig, HistoryEntry, NewHistoryEntry, RelatedEntity, Score, ScoreRecord,
};
use transparency_db::catalog::{insert_campaign, insert_evidence, insert_organization, insert_report};
use transparency_db::{
    Campaign, CampaignStatus, Catalog, DbError, DbResult, Evidence, EvidenceStatus,
    LeaderboardRow, Organization, Report, ReportStatus, ReportType, SaveOutcome, ScoreRepository,
    SqlStore, create_pool, run_migrations,
};
use transparency_engine::TransparencyScoreEngine;
use uuid::Uuid;

pub async fn setup_store() -> SqlStore {
    let pool = create_pool("sqlite::memory:", 1)
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    SqlStore::new(pool)
}

pub async fn setup() -> (TransparencyScoreEngine, SqlStore) {
    setup_with(EngineConfig::default()).await
}

pub async fn setup_with(config: EngineConfig) -> (TransparencyScoreEngine, SqlStore) {
    let store = setup_store().await;
    let engine = TransparencyScoreEngine::with_store(store.clone(), config)
        .expect("Failed to build engine");
    (engine, store)
}

pub async fn organization(store: &SqlStore, legal_name: &str) -> Uuid {
    let organization = Organization {
        id: Uuid::new_v4(),
        legal_name: legal_name.to_string(),
        created_at: Utc::now(),
    };
    insert_organization(store.pool(), &organization)
        .await
        .expect("Failed to insert organization");
    organization.id
}

pub async fn campaign(
    store: &SqlStore,
    organization_id: Uuid,
    status: CampaignStatus,
    collected_amount: i64,
    completed_at: Option<DateTime<Utc>>,
) -> Campaign {
    let campaign = Campaign {
        id: Uuid::new_v4(),
        organization_id,
        title: "Earthquake relief".to_string(),
        status,
        collected_amount,
        evidence_deadline_days: None,
        completed_at,
        cancelled_at: None,
        created_at: Utc::now(),
    };
    insert_campaign(store.pool(), &campaign)
        .await
        .expect("Failed to insert campaign");
    campaign
}

pub async fn evidence(
    store: &SqlStore,
    campaign_id: Uuid,
    status: EvidenceStatus,
    amount_spent: i64,
    uploaded_at: Option<DateTime<Utc>>,
) -> Evidence {
    let evidence = Evidence {
        id: Uuid::new_v4(),
        campaign_id,
        status,
        amount_spent,
        uploaded_at,
        created_at: Utc::now(),
    };
    insert_evidence(store.pool(), &evidence)
        .await
        .expect("Failed to insert evidence");
    evidence
}

pub async fn report(store: &SqlStore, organization_id: Uuid, report_type: ReportType, status: ReportStatus) -> Report {
    let report = Report {
        id: Uuid::new_v4(),
        organization_id,
        report_type,
        status,
        resolved_at: Some(Utc::now()),
        created_at: Utc::now(),
    };
    insert_report(store.pool(), &report)
        .await
        .expect("Failed to insert report");
    report
}

/// Overwrite a stored score directly, bypassing the ledger
pub async fn force_score(store: &SqlStore, organization_id: Uuid, score: Score) {
    sqlx::query("UPDATE transparency_scores SET current_score = ? WHERE organization_id = ?")
        .bind(score.hundredths())
        .bind(organization_id.to_string())
        .execute(store.pool())
        .await
        .expect("Failed to force score");
}

/// Score repository that reports a version conflict for the first
/// `conflicts` writes, then behaves normally
pub struct ConflictingScores {
    inner: SqlStore,
    remaining: AtomicU32,
    pub save_calls: AtomicU32,
}

impl ConflictingScores {
    pub fn new(inner: SqlStore, conflicts: u32) -> Arc<Self> {
        Arc::new(Self {
            inner,
            remaining: AtomicU32::new(conflicts),
            save_calls: AtomicU32::new(0),
        })
    }

    pub fn save_calls(&self) -> u32 {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoreRepository for ConflictingScores {
    async fn find_by_organization_id(&self, organization_id: Uuid) -> DbResult<Option<ScoreRecord>> {
        self.inner.find_by_organization_id(organization_id).await
    }

    async fn insert_initial(&self, record: &ScoreRecord) -> DbResult<bool> {
        self.inner.insert_initial(record).await
    }

    async fn save_with_history(
        &self,
        record: &ScoreRecord,
        expected_version: i64,
        entry: &NewHistoryEntry,
    ) -> DbResult<SaveOutcome> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let conflicted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Ok(SaveOutcome::Conflict);
        }
        self.inner.save_with_history(record, expected_version, entry).await
    }

    async fn list_history(&self, organization_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<HistoryEntry>> {
        self.inner.list_history(organization_id, limit, offset).await
    }

    async fn count_history(&self, organization_id: Uuid) -> DbResult<i64> {
        self.inner.count_history(organization_id).await
    }

    async fn full_history(&self, organization_id: Uuid) -> DbResult<Vec<HistoryEntry>> {
        self.inner.full_history(organization_id).await
    }

    async fn has_history_entry(
        &self,
        organization_id: Uuid,
        reason: &ChangeReason,
        related: RelatedEntity,
    ) -> DbResult<bool> {
        self.inner.has_history_entry(organization_id, reason, related).await
    }

    async fn related_ids_with_reason(&self, organization_id: Uuid, reason: &ChangeReason) -> DbResult<Vec<Uuid>> {
        self.inner.related_ids_with_reason(organization_id, reason).await
    }

    async fn count_history_with_reason(&self, organization_id: Uuid, reason: &ChangeReason) -> DbResult<i64> {
        self.inner.count_history_with_reason(organization_id, reason).await
    }

    async fn leaderboard(&self, limit: i64, offset: i64) -> DbResult<Vec<LeaderboardRow>> {
        self.inner.leaderboard(limit, offset).await
    }

    async fn count_scores(&self) -> DbResult<i64> {
        self.inner.count_scores().await
    }

    async fn low_scores(&self, threshold: Score, limit: i64, offset: i64) -> DbResult<Vec<ScoreRecord>> {
        self.inner.low_scores(threshold, limit, offset).await
    }

    async fn count_low_scores(&self, threshold: Score) -> DbResult<i64> {
        self.inner.count_low_scores(threshold).await
    }
}

/// Catalog whose evidence listing is unavailable
pub struct BrokenEvidenceCatalog {
    pub inner: SqlStore,
}

#[async_trait]
impl Catalog for BrokenEvidenceCatalog {
    async fn organization(&self, id: Uuid) -> DbResult<Option<Organization>> {
        self.inner.organization(id).await
    }

    async fn organization_exists(&self, id: Uuid) -> DbResult<bool> {
        self.inner.organization_exists(id).await
    }

    async fn campaign(&self, id: Uuid) -> DbResult<Option<Campaign>> {
        self.inner.campaign(id).await
    }

    async fn evidence(&self, id: Uuid) -> DbResult<Option<Evidence>> {
        self.inner.evidence(id).await
    }

    async fn report(&self, id: Uuid) -> DbResult<Option<Report>> {
        self.inner.report(id).await
    }

    async fn campaigns_for_organization(&self, organization_id: Uuid) -> DbResult<Vec<Campaign>> {
        self.inner.campaigns_for_organization(organization_id).await
    }

    async fn evidences_for_organization(&self, _organization_id: Uuid) -> DbResult<Vec<Evidence>> {
        Err(DbError::SqlxError(sqlx::Error::PoolTimedOut))
    }

    async fn upheld_report_ids(&self, organization_id: Uuid) -> DbResult<Vec<Uuid>> {
        self.inner.upheld_report_ids(organization_id).await
    }

    async fn completed_campaigns(&self, limit: i64, offset: i64) -> DbResult<Vec<Campaign>> {
        self.inner.completed_campaigns(limit, offset).await
    }

    async fn approved_spend(&self, campaign_id: Uuid) -> DbResult<i64> {
        self.inner.approved_spend(campaign_id).await
    }
}
