use chrono::{DateTime, Utc};
use transparency_core::evidence_deadline;
use transparency_db::{Campaign, CampaignStatus};

/// Whether a completed campaign's evidence window has closed as of `now`.
///
/// Campaigns that are not completed, or carry no completion timestamp, never
/// reach a deadline.
pub fn deadline_passed(campaign: &Campaign, now: DateTime<Utc>, default_deadline_days: i64) -> bool {
    if campaign.status != CampaignStatus::Completed {
        return false;
    }
    let Some(completed_at) = campaign.completed_at else {
        return false;
    };

    evidence_deadline(
        completed_at,
        campaign.evidence_deadline_days,
        default_deadline_days,
    )
    .is_some_and(|deadline| now > deadline)
}

/// Deadline passed without enough approved spend to account for what the
/// campaign collected
pub fn deadline_missed(
    campaign: &Campaign,
    approved_spend: i64,
    now: DateTime<Utc>,
    default_deadline_days: i64,
) -> bool {
    deadline_passed(campaign, now, default_deadline_days) && approved_spend < campaign.collected_amount
}
