use crate::deadlines::{deadline_missed, deadline_passed};
use crate::error::{EngineError, EngineResult};
use crate::recalculation::{RecordedActivity, derive_snapshot};
use crate::views::{LeaderboardEntry, PageRequest, Paginated, ScoreChange, ScoreView};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use transparency_core::{
    ActivitySnapshot, CAMPAIGN_ELIGIBILITY_FLOOR, ChangeReason, EngineConfig, HistoryEntry,
    RelatedEntity, Score, ScoreEvent, ScoreRecord, ScoreTransition, check_campaign_gate,
    is_on_time, replay,
};
use transparency_db::{
    Campaign, Catalog, DbResult, Evidence, SaveOutcome, ScoreRepository, SqlStore,
};
use uuid::Uuid;

/// Completed campaigns fetched per round trip while sweeping deadlines
const SWEEP_BATCH_SIZE: i64 = 50;

/// Maintains one bounded transparency score per organization.
///
/// Every mutation goes through the same path: resolve the organization, load
/// (or lazily create) its record, plan the transition, then write the record
/// and its ledger entry as one compare-and-swap on the record's version. A
/// conflicting writer causes a reload and a fresh plan, up to
/// [`EngineConfig::max_retries`] extra attempts.
pub struct TransparencyScoreEngine {
    scores: Arc<dyn ScoreRepository>,
    catalog: Arc<dyn Catalog>,
    config: EngineConfig,
    events: broadcast::Sender<ScoreChange>,
}

impl TransparencyScoreEngine {
    pub fn new(
        scores: Arc<dyn ScoreRepository>,
        catalog: Arc<dyn Catalog>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        Ok(Self {
            scores,
            catalog,
            config,
            events,
        })
    }

    /// Engine backed by a single SQL store for both scores and catalog reads
    pub fn with_store(store: SqlStore, config: EngineConfig) -> EngineResult<Self> {
        let store = Arc::new(store);
        Self::new(store.clone(), store, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receive every committed score change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ScoreChange> {
        self.events.subscribe()
    }

    /// Create the organization's record at the baseline if it has none.
    /// Calling it again returns the existing record untouched.
    pub async fn initialize_score(&self, organization_id: Uuid) -> EngineResult<ScoreRecord> {
        self.load_or_initialize(organization_id).await
    }

    pub async fn on_evidence_approved(&self, evidence_id: Uuid, on_time: bool) -> EngineResult<ScoreChange> {
        let (_, campaign) = self.resolve_evidence(evidence_id).await?;
        self.apply_event(
            campaign.organization_id,
            ScoreEvent::EvidenceApproved { evidence_id, on_time },
        )
        .await
    }

    /// Whether an evidence's upload met its campaign's deadline, for callers
    /// that do not track timeliness themselves
    pub async fn is_evidence_on_time(&self, evidence_id: Uuid) -> EngineResult<bool> {
        let (evidence, campaign) = self.resolve_evidence(evidence_id).await?;
        Ok(is_on_time(
            evidence.uploaded_at,
            campaign.completed_at,
            campaign.evidence_deadline_days,
            self.config.default_evidence_deadline_days,
        ))
    }

    pub async fn on_evidence_rejected(&self, evidence_id: Uuid) -> EngineResult<ScoreChange> {
        let (_, campaign) = self.resolve_evidence(evidence_id).await?;
        self.apply_event(campaign.organization_id, ScoreEvent::EvidenceRejected { evidence_id })
            .await
    }

    /// Penalize a missed evidence deadline. The campaign may have no evidence
    /// at all.
    pub async fn on_evidence_deadline_missed(&self, campaign_id: Uuid) -> EngineResult<ScoreChange> {
        let campaign = self.resolve_campaign(campaign_id).await?;
        self.apply_event(
            campaign.organization_id,
            ScoreEvent::EvidenceDeadlineMissed { campaign_id },
        )
        .await
    }

    pub async fn on_campaign_completed(&self, campaign_id: Uuid) -> EngineResult<ScoreChange> {
        let campaign = self.resolve_campaign(campaign_id).await?;
        self.apply_event(campaign.organization_id, ScoreEvent::CampaignCompleted { campaign_id })
            .await
    }

    pub async fn on_campaign_cancelled(&self, campaign_id: Uuid) -> EngineResult<ScoreChange> {
        let campaign = self.resolve_campaign(campaign_id).await?;
        self.apply_event(campaign.organization_id, ScoreEvent::CampaignCancelled { campaign_id })
            .await
    }

    /// Apply the report penalty. Deciding that the report confirms wrongdoing
    /// is the caller's job; the report only has to exist and belong to the
    /// organization.
    pub async fn on_report_upheld_for_organization(
        &self,
        organization_id: Uuid,
        report_id: Uuid,
    ) -> EngineResult<ScoreChange> {
        self.require_organization(organization_id).await?;
        let report = self.catalog.report(report_id).await?;
        if report.is_none_or(|r| r.organization_id != organization_id) {
            return Err(EngineError::ReportNotFound {
                organization_id,
                report_id,
            });
        }

        self.apply_event(organization_id, ScoreEvent::ReportUpheld { report_id })
            .await
    }

    pub async fn apply_consistency_bonus(&self, organization_id: Uuid) -> EngineResult<ScoreChange> {
        self.require_organization(organization_id).await?;
        self.apply_event(organization_id, ScoreEvent::ConsistencyBonus).await
    }

    /// Rebuild counters and the score from live campaign, evidence and report
    /// data plus the penalties and bonuses the ledger already carries, writing
    /// one `RECALCULATED` entry for the difference.
    ///
    /// Nothing is written when the underlying data cannot be read.
    pub async fn recalculate_score(&self, organization_id: Uuid) -> EngineResult<ScoreChange> {
        self.require_organization(organization_id).await?;

        let now = Utc::now();
        let snapshot = self
            .derive_activity(organization_id, now)
            .await
            .map_err(|source| {
                error!(
                    "Recalculation aborted for organization {}: {}",
                    organization_id, source
                );
                EngineError::RecalculationFailed {
                    organization_id,
                    source,
                }
            })?;
        debug!("Derived activity for {}: {:?}", organization_id, snapshot);

        self.commit(organization_id, |current| current.resync(&snapshot, now))
            .await
    }

    /// Penalize every completed campaign whose evidence deadline has passed as
    /// of `now` with approved spend below what it collected.
    ///
    /// A campaign is penalized at most once; rerunning the sweep skips
    /// campaigns that already carry a deadline-missed entry. Returns the
    /// campaigns penalized by this run.
    pub async fn sweep_missed_deadlines(&self, now: DateTime<Utc>) -> EngineResult<Vec<Uuid>> {
        let default_days = self.config.default_evidence_deadline_days;
        let mut penalized = Vec::new();
        let mut offset = 0;

        loop {
            let batch = self.catalog.completed_campaigns(SWEEP_BATCH_SIZE, offset).await?;
            let fetched = batch.len() as i64;

            for campaign in batch {
                if !deadline_passed(&campaign, now, default_days) {
                    continue;
                }
                let spent = self.catalog.approved_spend(campaign.id).await?;
                if !deadline_missed(&campaign, spent, now, default_days) {
                    continue;
                }

                let already = self
                    .scores
                    .has_history_entry(
                        campaign.organization_id,
                        &ChangeReason::EvidenceDeadlineMissed,
                        RelatedEntity::campaign(campaign.id),
                    )
                    .await?;
                if already {
                    continue;
                }

                let event = ScoreEvent::EvidenceDeadlineMissed {
                    campaign_id: campaign.id,
                };
                match self.apply_event(campaign.organization_id, event).await {
                    Ok(_) => penalized.push(campaign.id),
                    Err(e) if e.is_transient() => {
                        warn!("Skipping campaign {} in deadline sweep: {}", campaign.id, e);
                    }
                    Err(e) => return Err(e),
                }
            }

            if fetched < SWEEP_BATCH_SIZE {
                break;
            }
            offset += fetched;
        }

        info!(
            "Deadline sweep penalized {} campaign(s) as of {}",
            penalized.len(),
            now
        );
        Ok(penalized)
    }

    /// Whether the organization's score clears the campaign creation floor.
    /// An organization without a record yet is judged at the baseline.
    pub async fn can_create_campaign(&self, organization_id: Uuid) -> EngineResult<bool> {
        let score = match self.scores.find_by_organization_id(organization_id).await? {
            Some(record) => record.current_score,
            None => {
                self.require_organization(organization_id).await?;
                Score::BASELINE
            }
        };

        let gate = check_campaign_gate(score);
        debug!(
            "Campaign gate for {} at {}: {:?}",
            organization_id, score, gate
        );
        Ok(gate.is_allowed())
    }

    pub async fn get_organization_score(&self, organization_id: Uuid) -> EngineResult<ScoreView> {
        match self.scores.find_by_organization_id(organization_id).await? {
            Some(record) => Ok(record.into()),
            None => {
                self.require_organization(organization_id).await?;
                Err(EngineError::ScoreNotFound(organization_id))
            }
        }
    }

    /// Ledger entries, newest first
    pub async fn get_score_history(
        &self,
        organization_id: Uuid,
        page: PageRequest,
    ) -> EngineResult<Paginated<HistoryEntry>> {
        self.require_organization(organization_id).await?;

        let entries = self
            .scores
            .list_history(organization_id, page.limit(), page.offset())
            .await?;
        let total = self.scores.count_history(organization_id).await?;

        Ok(Paginated::new(entries, page, total))
    }

    /// Organizations ranked by score, then completed campaigns
    pub async fn get_leaderboard(&self, page: PageRequest) -> EngineResult<Paginated<LeaderboardEntry>> {
        let rows = self.scores.leaderboard(page.limit(), page.offset()).await?;
        let total = self.scores.count_scores().await?;

        let first_rank = page.offset() + 1;
        let entries = rows
            .into_iter()
            .zip(first_rank..)
            .map(|(row, rank)| LeaderboardEntry::ranked(rank, row))
            .collect();

        Ok(Paginated::new(entries, page, total))
    }

    /// Organizations below the campaign creation floor, lowest first
    pub async fn get_low_score_organizations(&self, page: PageRequest) -> EngineResult<Paginated<ScoreView>> {
        let threshold = CAMPAIGN_ELIGIBILITY_FLOOR;
        let records = self
            .scores
            .low_scores(threshold, page.limit(), page.offset())
            .await?;
        let total = self.scores.count_low_scores(threshold).await?;

        let views = records.into_iter().map(ScoreView::from).collect();
        Ok(Paginated::new(views, page, total))
    }

    /// Replay the organization's ledger and check it lands on the live score
    pub async fn verify_ledger(&self, organization_id: Uuid) -> EngineResult<Score> {
        let record = self
            .scores
            .find_by_organization_id(organization_id)
            .await?
            .ok_or(EngineError::ScoreNotFound(organization_id))?;
        let entries = self.scores.full_history(organization_id).await?;

        let replayed = replay(&entries).map_err(|source| EngineError::LedgerInconsistent {
            organization_id,
            source,
        })?;
        if replayed != record.current_score {
            return Err(EngineError::LedgerDiverged {
                organization_id,
                ledger: replayed,
                record: record.current_score,
            });
        }

        Ok(replayed)
    }

    async fn apply_event(&self, organization_id: Uuid, event: ScoreEvent) -> EngineResult<ScoreChange> {
        self.commit(organization_id, |current| current.apply(&event, Utc::now()))
            .await
    }

    /// Optimistic write loop shared by every mutation
    async fn commit<F>(&self, organization_id: Uuid, plan: F) -> EngineResult<ScoreChange>
    where
        F: Fn(&ScoreRecord) -> ScoreTransition + Send + Sync,
    {
        let attempts = self.config.max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let current = self.load_or_initialize(organization_id).await?;
            let ScoreTransition { record, entry } = plan(&current);

            match self
                .scores
                .save_with_history(&record, current.version, &entry)
                .await?
            {
                SaveOutcome::Saved { record, entry } => {
                    info!(
                        "Transparency score of {} changed {} -> {} ({}, version {})",
                        organization_id,
                        entry.previous_score,
                        entry.new_score,
                        entry.change_reason,
                        record.version
                    );
                    let change = ScoreChange::from(&entry);
                    if change.crossed_eligibility_floor() {
                        warn!(
                            "Organization {} fell below {}; campaign creation suspended",
                            organization_id, CAMPAIGN_ELIGIBILITY_FLOOR
                        );
                    }
                    // No subscribers is not an error
                    let _ = self.events.send(change.clone());
                    return Ok(change);
                }
                SaveOutcome::Conflict => {
                    warn!(
                        "Score of {} changed concurrently (attempt {}/{}), retrying",
                        organization_id, attempt, attempts
                    );
                }
            }
        }

        Err(EngineError::ConcurrencyConflict {
            organization_id,
            attempts,
        })
    }

    async fn load_or_initialize(&self, organization_id: Uuid) -> EngineResult<ScoreRecord> {
        if let Some(record) = self.scores.find_by_organization_id(organization_id).await? {
            return Ok(record);
        }

        self.require_organization(organization_id).await?;
        let record = ScoreRecord::new(organization_id, Utc::now());
        if self.scores.insert_initial(&record).await? {
            info!(
                "Initialized transparency score for {} at {}",
                organization_id, record.current_score
            );
            return Ok(record);
        }

        // Another caller initialized it first
        self.scores
            .find_by_organization_id(organization_id)
            .await?
            .ok_or(EngineError::ScoreNotFound(organization_id))
    }

    async fn require_organization(&self, organization_id: Uuid) -> EngineResult<()> {
        if self.catalog.organization_exists(organization_id).await? {
            Ok(())
        } else {
            Err(EngineError::OrganizationNotFound(organization_id))
        }
    }

    async fn resolve_campaign(&self, campaign_id: Uuid) -> EngineResult<Campaign> {
        self.catalog
            .campaign(campaign_id)
            .await?
            .ok_or(EngineError::CampaignNotFound(campaign_id))
    }

    async fn resolve_evidence(&self, evidence_id: Uuid) -> EngineResult<(Evidence, Campaign)> {
        let evidence = self
            .catalog
            .evidence(evidence_id)
            .await?
            .ok_or(EngineError::EvidenceNotFound(evidence_id))?;
        let campaign = self.resolve_campaign(evidence.campaign_id).await?;
        Ok((evidence, campaign))
    }

    async fn derive_activity(&self, organization_id: Uuid, now: DateTime<Utc>) -> DbResult<ActivitySnapshot> {
        let campaigns = self.catalog.campaigns_for_organization(organization_id).await?;
        let evidences = self.catalog.evidences_for_organization(organization_id).await?;
        let upheld = self.catalog.upheld_report_ids(organization_id).await?;
        let recorded = self.recorded_activity(organization_id).await?;

        Ok(derive_snapshot(
            &campaigns,
            &evidences,
            &upheld,
            &recorded,
            now,
            self.config.default_evidence_deadline_days,
        ))
    }

    async fn recorded_activity(&self, organization_id: Uuid) -> DbResult<RecordedActivity> {
        let missed = self
            .scores
            .related_ids_with_reason(organization_id, &ChangeReason::EvidenceDeadlineMissed)
            .await?;
        let upheld = self
            .scores
            .related_ids_with_reason(organization_id, &ChangeReason::ReportUpheld)
            .await?;
        let bonuses = self
            .scores
            .count_history_with_reason(organization_id, &ChangeReason::MonthlyConsistencyBonus)
            .await?;

        Ok(RecordedActivity {
            missed_deadline_campaigns: missed.into_iter().collect(),
            upheld_reports: upheld.into_iter().collect(),
            consistency_bonuses: bonuses,
        })
    }
}
