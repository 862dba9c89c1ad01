use crate::deadlines::deadline_missed;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use transparency_core::{ActivitySnapshot, is_on_time};
use transparency_db::{Campaign, CampaignStatus, Evidence, EvidenceStatus};
use uuid::Uuid;

/// Changes only the ledger knows about: penalties and bonuses applied by the
/// handlers that live catalog data cannot reproduce on its own
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedActivity {
    pub missed_deadline_campaigns: HashSet<Uuid>,
    pub upheld_reports: HashSet<Uuid>,
    pub consistency_bonuses: i64,
}

/// Rebuild an organization's activity from its live campaigns, evidences and
/// upheld reports, merged with what the ledger already recorded.
///
/// Evidence whose campaign is not among `campaigns` is ignored. Deadline misses
/// are judged as of `now`; a campaign already penalized stays missed. Reports
/// count once whether the catalog, the ledger or both mark them upheld.
pub fn derive_snapshot(
    campaigns: &[Campaign],
    evidences: &[Evidence],
    upheld_reports: &[Uuid],
    recorded: &RecordedActivity,
    now: DateTime<Utc>,
    default_deadline_days: i64,
) -> ActivitySnapshot {
    let by_id: HashMap<Uuid, &Campaign> = campaigns.iter().map(|c| (c.id, c)).collect();
    let mut approved_spend: HashMap<Uuid, i64> = HashMap::new();
    let upheld: HashSet<Uuid> = upheld_reports
        .iter()
        .chain(&recorded.upheld_reports)
        .copied()
        .collect();
    let mut snapshot = ActivitySnapshot {
        upheld_reports: upheld.len() as i64,
        consistency_bonuses: recorded.consistency_bonuses,
        ..ActivitySnapshot::default()
    };

    for campaign in campaigns {
        match campaign.status {
            CampaignStatus::Completed => snapshot.completed_campaigns += 1,
            CampaignStatus::Cancelled => snapshot.cancelled_campaigns += 1,
            _ => {}
        }
    }

    for evidence in evidences {
        let Some(campaign) = by_id.get(&evidence.campaign_id) else {
            continue;
        };
        match evidence.status {
            EvidenceStatus::Approved => {
                *approved_spend.entry(campaign.id).or_default() += evidence.amount_spent;
                let on_time = is_on_time(
                    evidence.uploaded_at,
                    campaign.completed_at,
                    campaign.evidence_deadline_days,
                    default_deadline_days,
                );
                if on_time {
                    snapshot.approved_on_time += 1;
                } else {
                    snapshot.approved_late += 1;
                }
            }
            EvidenceStatus::Rejected => snapshot.rejected_evidences += 1,
            EvidenceStatus::Pending => {}
        }
    }

    let mut missed: HashSet<Uuid> = campaigns
        .iter()
        .filter(|c| {
            let spent = approved_spend.get(&c.id).copied().unwrap_or(0);
            deadline_missed(c, spent, now, default_deadline_days)
        })
        .map(|c| c.id)
        .collect();
    missed.extend(&recorded.missed_deadline_campaigns);
    snapshot.missed_deadlines = missed.len() as i64;

    snapshot
}
