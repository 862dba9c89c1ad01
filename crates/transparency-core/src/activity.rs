use crate::calculator::{calculate_change, calculate_new_score};
use crate::reason::ChangeReason;
use crate::score::Score;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// When evidence for a completed campaign is due.
///
/// `None` when the window reaches past what a timestamp can represent; such a
/// deadline never passes.
pub fn evidence_deadline(
    completed_at: DateTime<Utc>,
    deadline_days: Option<i64>,
    default_days: i64,
) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(deadline_days.unwrap_or(default_days))
        .and_then(|window| completed_at.checked_add_signed(window))
}

/// Whether evidence uploaded at `uploaded_at` met its campaign's deadline.
///
/// Evidence for a campaign that has not completed yet, or evidence with no
/// upload timestamp, counts as on time.
pub fn is_on_time(
    uploaded_at: Option<DateTime<Utc>>,
    campaign_completed_at: Option<DateTime<Utc>>,
    deadline_days: Option<i64>,
    default_days: i64,
) -> bool {
    match (uploaded_at, campaign_completed_at) {
        (Some(uploaded), Some(completed)) => evidence_deadline(completed, deadline_days, default_days)
            .is_none_or(|deadline| uploaded <= deadline),
        _ => true,
    }
}

/// Organization activity re-derived from live campaign, evidence and report
/// data, used by recalculation instead of the incremental counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub completed_campaigns: i64,
    pub cancelled_campaigns: i64,
    pub approved_on_time: i64,
    pub approved_late: i64,
    pub rejected_evidences: i64,
    pub missed_deadlines: i64,
    pub upheld_reports: i64,
    pub consistency_bonuses: i64,
}

impl ActivitySnapshot {
    pub fn total_campaigns(&self) -> i64 {
        self.completed_campaigns + self.cancelled_campaigns
    }

    pub fn approved_evidences(&self) -> i64 {
        self.approved_on_time + self.approved_late
    }

    /// Reviewed evidences, matching what the event handlers count.
    pub fn total_evidences(&self) -> i64 {
        self.approved_evidences() + self.rejected_evidences
    }

    pub fn evidence_score(&self) -> Score {
        weighted(self.approved_on_time, ChangeReason::EvidenceApprovedOnTime)
            + weighted(self.approved_late, ChangeReason::EvidenceApprovedLate)
            + weighted(self.rejected_evidences, ChangeReason::EvidenceRejected)
    }

    pub fn timeliness_score(&self) -> Score {
        weighted(self.approved_on_time, ChangeReason::EvidenceApprovedOnTime)
            + weighted(self.approved_late, ChangeReason::EvidenceApprovedLate)
            + weighted(self.missed_deadlines, ChangeReason::EvidenceDeadlineMissed)
    }

    pub fn report_score(&self) -> Score {
        weighted(self.upheld_reports, ChangeReason::ReportUpheld)
    }

    /// Sum of every delta the activity would have earned.
    pub fn total_delta(&self) -> Score {
        [
            (self.approved_on_time, ChangeReason::EvidenceApprovedOnTime),
            (self.approved_late, ChangeReason::EvidenceApprovedLate),
            (self.rejected_evidences, ChangeReason::EvidenceRejected),
            (self.missed_deadlines, ChangeReason::EvidenceDeadlineMissed),
            (self.completed_campaigns, ChangeReason::CampaignCompleted),
            (self.cancelled_campaigns, ChangeReason::CampaignCancelled),
            (self.upheld_reports, ChangeReason::ReportUpheld),
            (self.consistency_bonuses, ChangeReason::MonthlyConsistencyBonus),
        ]
        .into_iter()
        .map(|(count, reason)| weighted(count, reason))
        .sum()
    }

    /// Baseline plus every earned delta, clamped once at the end.
    pub fn derived_score(&self) -> Score {
        calculate_new_score(Score::BASELINE, self.total_delta())
    }
}

fn weighted(count: i64, reason: ChangeReason) -> Score {
    Score::from_hundredths(calculate_change(&reason).hundredths().saturating_mul(count))
}
