use crate::activity::ActivitySnapshot;
use crate::calculator::{ScoreLevel, calculate_change, calculate_new_score, score_level};
use crate::ledger::{NewHistoryEntry, RelatedEntity};
use crate::reason::ChangeReason;
use crate::score::Score;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain event that moves an organization's score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreEvent {
    EvidenceApproved { evidence_id: Uuid, on_time: bool },
    EvidenceRejected { evidence_id: Uuid },
    EvidenceDeadlineMissed { campaign_id: Uuid },
    CampaignCompleted { campaign_id: Uuid },
    CampaignCancelled { campaign_id: Uuid },
    ReportUpheld { report_id: Uuid },
    ConsistencyBonus,
}

impl ScoreEvent {
    pub fn reason(&self) -> ChangeReason {
        match self {
            ScoreEvent::EvidenceApproved { on_time: true, .. } => {
                ChangeReason::EvidenceApprovedOnTime
            }
            ScoreEvent::EvidenceApproved { on_time: false, .. } => {
                ChangeReason::EvidenceApprovedLate
            }
            ScoreEvent::EvidenceRejected { .. } => ChangeReason::EvidenceRejected,
            ScoreEvent::EvidenceDeadlineMissed { .. } => ChangeReason::EvidenceDeadlineMissed,
            ScoreEvent::CampaignCompleted { .. } => ChangeReason::CampaignCompleted,
            ScoreEvent::CampaignCancelled { .. } => ChangeReason::CampaignCancelled,
            ScoreEvent::ReportUpheld { .. } => ChangeReason::ReportUpheld,
            ScoreEvent::ConsistencyBonus => ChangeReason::MonthlyConsistencyBonus,
        }
    }

    pub fn related_entity(&self) -> Option<RelatedEntity> {
        match self {
            ScoreEvent::EvidenceApproved { evidence_id, .. }
            | ScoreEvent::EvidenceRejected { evidence_id } => {
                Some(RelatedEntity::evidence(*evidence_id))
            }
            ScoreEvent::EvidenceDeadlineMissed { campaign_id }
            | ScoreEvent::CampaignCompleted { campaign_id }
            | ScoreEvent::CampaignCancelled { campaign_id } => {
                Some(RelatedEntity::campaign(*campaign_id))
            }
            ScoreEvent::ReportUpheld { report_id } => Some(RelatedEntity::report(*report_id)),
            ScoreEvent::ConsistencyBonus => None,
        }
    }
}

/// Current transparency score of one organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub organization_id: Uuid,
    pub current_score: Score,
    pub evidence_score: Score,
    pub timeliness_score: Score,
    pub report_score: Score,
    pub total_campaigns: i64,
    pub completed_campaigns: i64,
    pub total_evidences: i64,
    pub approved_evidences: i64,
    pub rejected_evidences: i64,
    pub on_time_reports: i64,
    pub late_reports: i64,
    /// Optimistic concurrency token, bumped by every successful write
    pub version: i64,
    pub last_calculated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A planned write: the record as it should look afterwards plus the ledger
/// entry that explains it
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTransition {
    pub record: ScoreRecord,
    pub entry: NewHistoryEntry,
}

impl ScoreRecord {
    /// Fresh record at the 50.00 baseline with every counter at zero
    pub fn new(organization_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            organization_id,
            current_score: Score::BASELINE,
            evidence_score: Score::ZERO,
            timeliness_score: Score::ZERO,
            report_score: Score::ZERO,
            total_campaigns: 0,
            completed_campaigns: 0,
            total_evidences: 0,
            approved_evidences: 0,
            rejected_evidences: 0,
            on_time_reports: 0,
            late_reports: 0,
            version: 1,
            last_calculated_at: now,
            created_at: now,
        }
    }

    /// The `INITIALIZED` ledger entry that accompanies [`ScoreRecord::new`]
    pub fn genesis_entry(&self) -> NewHistoryEntry {
        NewHistoryEntry::new(
            self.organization_id,
            self.current_score,
            self.current_score,
            Score::ZERO,
            ChangeReason::Initialized,
            self.created_at,
        )
    }

    pub fn level(&self) -> ScoreLevel {
        score_level(self.current_score)
    }

    /// Plan the effect of a domain event. The returned record keeps the current
    /// version; the store bumps it when the write commits.
    pub fn apply(&self, event: &ScoreEvent, now: DateTime<Utc>) -> ScoreTransition {
        let reason = event.reason();
        let delta = calculate_change(&reason);
        let new_score = calculate_new_score(self.current_score, delta);

        let mut next = self.clone();
        next.current_score = new_score;
        next.last_calculated_at = now;

        match event {
            ScoreEvent::EvidenceApproved { on_time, .. } => {
                next.total_evidences += 1;
                next.approved_evidences += 1;
                if *on_time {
                    next.on_time_reports += 1;
                } else {
                    next.late_reports += 1;
                }
                next.evidence_score += delta;
                next.timeliness_score += delta;
            }
            ScoreEvent::EvidenceRejected { .. } => {
                next.total_evidences += 1;
                next.rejected_evidences += 1;
                next.evidence_score += delta;
            }
            ScoreEvent::EvidenceDeadlineMissed { .. } => {
                next.timeliness_score += delta;
            }
            ScoreEvent::CampaignCompleted { .. } => {
                next.total_campaigns += 1;
                next.completed_campaigns += 1;
            }
            ScoreEvent::CampaignCancelled { .. } => {
                next.total_campaigns += 1;
            }
            ScoreEvent::ReportUpheld { .. } => {
                next.report_score += delta;
            }
            ScoreEvent::ConsistencyBonus => {}
        }

        let entry = NewHistoryEntry::new(
            self.organization_id,
            self.current_score,
            new_score,
            delta,
            reason,
            now,
        )
        .with_related(event.related_entity());

        ScoreTransition { record: next, entry }
    }

    /// Plan a full recompute from re-derived activity. Counters and component
    /// scores are replaced, not accumulated.
    pub fn resync(&self, snapshot: &ActivitySnapshot, now: DateTime<Utc>) -> ScoreTransition {
        let new_score = snapshot.derived_score();

        let next = ScoreRecord {
            current_score: new_score,
            evidence_score: snapshot.evidence_score(),
            timeliness_score: snapshot.timeliness_score(),
            report_score: snapshot.report_score(),
            total_campaigns: snapshot.total_campaigns(),
            completed_campaigns: snapshot.completed_campaigns,
            total_evidences: snapshot.total_evidences(),
            approved_evidences: snapshot.approved_evidences(),
            rejected_evidences: snapshot.rejected_evidences,
            on_time_reports: snapshot.approved_on_time,
            late_reports: snapshot.approved_late,
            last_calculated_at: now,
            ..self.clone()
        };

        let notes = format!(
            "campaigns: {} completed, {} cancelled; evidence: {} on time, {} late, {} rejected; \
             missed deadlines: {}; upheld reports: {}; consistency bonuses: {}",
            snapshot.completed_campaigns,
            snapshot.cancelled_campaigns,
            snapshot.approved_on_time,
            snapshot.approved_late,
            snapshot.rejected_evidences,
            snapshot.missed_deadlines,
            snapshot.upheld_reports,
            snapshot.consistency_bonuses,
        );
        let entry = NewHistoryEntry::new(
            self.organization_id,
            self.current_score,
            new_score,
            new_score - self.current_score,
            ChangeReason::Recalculated,
            now,
        )
        .with_notes(notes);

        ScoreTransition { record: next, entry }
    }
}
