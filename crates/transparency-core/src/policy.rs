use crate::calculator::MEDIUM_THRESHOLD;
use crate::score::Score;
use serde::{Deserialize, Serialize};

/// Minimum score an organization needs to open a new campaign.
///
/// Tied to the `Medium` level threshold: an organization may create campaigns
/// exactly when its level is `Medium` or better.
pub const CAMPAIGN_ELIGIBILITY_FLOOR: Score = MEDIUM_THRESHOLD;

/// Result of a campaign creation gate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateResult {
    /// Campaign creation is allowed
    Allow,
    /// Campaign creation is denied
    Deny,
}

impl GateResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateResult::Allow)
    }
}

/// Check whether an organization may create a campaign
///
/// Returns `GateResult::Allow` if score >= 40.00, otherwise `GateResult::Deny`.
///
/// # Examples
///
/// ```
/// use transparency_core::policy::{check_campaign_gate, GateResult};
/// use transparency_core::Score;
///
/// assert_eq!(check_campaign_gate(Score::from_points(50)), GateResult::Allow);
/// assert_eq!(check_campaign_gate(Score::from_points(40)), GateResult::Allow);  // Equal is allowed
/// assert_eq!(check_campaign_gate(Score::from_hundredths(3999)), GateResult::Deny);
/// ```
pub fn check_campaign_gate(score: Score) -> GateResult {
    if score >= CAMPAIGN_ELIGIBILITY_FLOOR {
        GateResult::Allow
    } else {
        GateResult::Deny
    }
}

/// Whether an organization belongs on the low-score watch list
pub fn is_low_score(score: Score) -> bool {
    score < CAMPAIGN_ELIGIBILITY_FLOOR
}
