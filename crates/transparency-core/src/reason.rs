use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an organization's score changed.
///
/// The table is closed: the engine only ever produces the named variants. Codes
/// read back from storage that this build does not know are kept verbatim as
/// [`ChangeReason::Unrecognized`] and score as a zero delta.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ChangeReason {
    EvidenceApprovedOnTime,
    EvidenceApprovedLate,
    EvidenceApprovedAfterDeadline,
    EvidenceRejected,
    EvidenceDeadlineMissed,
    EvidenceLateUpload,
    CampaignCompleted,
    CampaignCancelled,
    ReportUpheld,
    MonthlyConsistencyBonus,
    /// First ledger entry of every organization.
    Initialized,
    /// Administrative full recompute; the entry itself carries the delta.
    Recalculated,
    Unrecognized(UnrecognizedCode),
}

/// Stored code this build does not know. Only [`ChangeReason::from_code`]
/// builds one, so it never holds the code of a named variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnrecognizedCode(String);

impl UnrecognizedCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ChangeReason {
    pub const ALL_KNOWN: [ChangeReason; 12] = [
        ChangeReason::EvidenceApprovedOnTime,
        ChangeReason::EvidenceApprovedLate,
        ChangeReason::EvidenceApprovedAfterDeadline,
        ChangeReason::EvidenceRejected,
        ChangeReason::EvidenceDeadlineMissed,
        ChangeReason::EvidenceLateUpload,
        ChangeReason::CampaignCompleted,
        ChangeReason::CampaignCancelled,
        ChangeReason::ReportUpheld,
        ChangeReason::MonthlyConsistencyBonus,
        ChangeReason::Initialized,
        ChangeReason::Recalculated,
    ];

    pub fn code(&self) -> &str {
        match self {
            ChangeReason::EvidenceApprovedOnTime => "EVIDENCE_APPROVED_ON_TIME",
            ChangeReason::EvidenceApprovedLate => "EVIDENCE_APPROVED_LATE",
            ChangeReason::EvidenceApprovedAfterDeadline => "EVIDENCE_APPROVED_AFTER_DEADLINE",
            ChangeReason::EvidenceRejected => "EVIDENCE_REJECTED",
            ChangeReason::EvidenceDeadlineMissed => "EVIDENCE_DEADLINE_MISSED",
            ChangeReason::EvidenceLateUpload => "EVIDENCE_LATE_UPLOAD",
            ChangeReason::CampaignCompleted => "CAMPAIGN_COMPLETED",
            ChangeReason::CampaignCancelled => "CAMPAIGN_CANCELLED",
            ChangeReason::ReportUpheld => "REPORT_UPHELD",
            ChangeReason::MonthlyConsistencyBonus => "MONTHLY_CONSISTENCY_BONUS",
            ChangeReason::Initialized => "INITIALIZED",
            ChangeReason::Recalculated => "RECALCULATED",
            ChangeReason::Unrecognized(code) => code.as_str(),
        }
    }

    /// Parse a stored code. Never fails.
    pub fn from_code(code: &str) -> Self {
        Self::ALL_KNOWN
            .iter()
            .find(|reason| reason.code() == code)
            .cloned()
            .unwrap_or_else(|| ChangeReason::Unrecognized(UnrecognizedCode(code.to_string())))
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ChangeReason::Unrecognized(_))
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for ChangeReason {
    fn from(code: String) -> Self {
        ChangeReason::from_code(&code)
    }
}

impl From<ChangeReason> for String {
    fn from(reason: ChangeReason) -> Self {
        reason.code().to_string()
    }
}
