use crate::reason::ChangeReason;
use crate::score::Score;
use serde::{Deserialize, Serialize};

pub const VERY_HIGH_THRESHOLD: Score = Score::from_points(80);
pub const HIGH_THRESHOLD: Score = Score::from_points(60);
pub const MEDIUM_THRESHOLD: Score = Score::from_points(40);
pub const LOW_THRESHOLD: Score = Score::from_points(20);

/// Calculate the point delta for a change reason
///
/// This is a pure lookup in the fixed reason table. Ledger markers and
/// unrecognized reasons map to zero.
///
/// # Examples
///
/// ```
/// use transparency_core::{ChangeReason, Score, calculate_change};
///
/// assert_eq!(calculate_change(&ChangeReason::EvidenceApprovedOnTime), Score::from_points(5));
/// assert_eq!(calculate_change(&ChangeReason::EvidenceDeadlineMissed), Score::from_points(-10));
/// assert_eq!(calculate_change(&ChangeReason::from_code("SOMETHING_NEW")), Score::ZERO);
/// ```
pub fn calculate_change(reason: &ChangeReason) -> Score {
    let points = match reason {
        ChangeReason::EvidenceApprovedOnTime => 5,
        ChangeReason::EvidenceApprovedLate => 3,
        ChangeReason::EvidenceApprovedAfterDeadline => 2,
        ChangeReason::CampaignCompleted => 3,
        ChangeReason::MonthlyConsistencyBonus => 1,
        ChangeReason::EvidenceRejected => -5,
        ChangeReason::EvidenceDeadlineMissed => -10,
        ChangeReason::EvidenceLateUpload => -3,
        ChangeReason::CampaignCancelled => -2,
        ChangeReason::ReportUpheld => -15,
        ChangeReason::Initialized
        | ChangeReason::Recalculated
        | ChangeReason::Unrecognized(_) => 0,
    };
    Score::from_points(points)
}

/// Apply a delta to the current score, saturating at 0.00 and 100.00
///
/// # Examples
///
/// ```
/// use transparency_core::{Score, calculate_new_score};
///
/// let p = Score::from_points;
/// assert_eq!(calculate_new_score(p(50), p(5)), p(55));
/// assert_eq!(calculate_new_score(p(98), p(5)), p(100));  // Clamped to 100
/// assert_eq!(calculate_new_score(p(3), p(-5)), p(0));    // Clamped to 0
/// ```
pub fn calculate_new_score(current: Score, delta: Score) -> Score {
    (current + delta).clamp_bounds()
}

/// Human-readable bucket for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ScoreLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreLevel::VeryHigh => "Very High",
            ScoreLevel::High => "High",
            ScoreLevel::Medium => "Medium",
            ScoreLevel::Low => "Low",
            ScoreLevel::VeryLow => "Very Low",
        }
    }

    /// Label shown by the Turkish UI.
    pub fn label_tr(&self) -> &'static str {
        match self {
            ScoreLevel::VeryHigh => "Çok Yüksek",
            ScoreLevel::High => "Yüksek",
            ScoreLevel::Medium => "Orta",
            ScoreLevel::Low => "Düşük",
            ScoreLevel::VeryLow => "Çok Düşük",
        }
    }
}

/// Bucket a score into a [`ScoreLevel`]; every threshold is inclusive.
pub fn score_level(score: Score) -> ScoreLevel {
    if score >= VERY_HIGH_THRESHOLD {
        ScoreLevel::VeryHigh
    } else if score >= HIGH_THRESHOLD {
        ScoreLevel::High
    } else if score >= MEDIUM_THRESHOLD {
        ScoreLevel::Medium
    } else if score >= LOW_THRESHOLD {
        ScoreLevel::Low
    } else {
        ScoreLevel::VeryLow
    }
}
