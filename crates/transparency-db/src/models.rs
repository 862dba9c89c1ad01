use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use transparency_core::{
    ChangeReason, EntityKind, HistoryEntry, RelatedEntity, Score, ScoreRecord,
};
use uuid::Uuid;

pub(crate) fn parse_timestamp(table: &'static str, value: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DbError::invalid_row(table, format!("bad timestamp {value:?}: {e}")))
}

pub(crate) fn parse_optional_timestamp(
    table: &'static str,
    value: Option<String>,
) -> DbResult<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(table, &v)).transpose()
}

pub(crate) fn parse_uuid(table: &'static str, value: &str) -> DbResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| DbError::invalid_row(table, format!("bad uuid {value:?}: {e}")))
}

/// Raw score record from database (string ids and timestamps, integer scores)
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ScoreRecordRaw {
    pub organization_id: String,
    pub current_score: i64,
    pub evidence_score: i64,
    pub timeliness_score: i64,
    pub report_score: i64,
    pub total_campaigns: i64,
    pub completed_campaigns: i64,
    pub total_evidences: i64,
    pub approved_evidences: i64,
    pub rejected_evidences: i64,
    pub on_time_reports: i64,
    pub late_reports: i64,
    pub version: i64,
    pub last_calculated_at: String,
    pub created_at: String,
}

impl TryFrom<ScoreRecordRaw> for ScoreRecord {
    type Error = DbError;

    fn try_from(raw: ScoreRecordRaw) -> DbResult<Self> {
        const TABLE: &str = "transparency_scores";
        Ok(Self {
            organization_id: parse_uuid(TABLE, &raw.organization_id)?,
            current_score: Score::from_hundredths(raw.current_score),
            evidence_score: Score::from_hundredths(raw.evidence_score),
            timeliness_score: Score::from_hundredths(raw.timeliness_score),
            report_score: Score::from_hundredths(raw.report_score),
            total_campaigns: raw.total_campaigns,
            completed_campaigns: raw.completed_campaigns,
            total_evidences: raw.total_evidences,
            approved_evidences: raw.approved_evidences,
            rejected_evidences: raw.rejected_evidences,
            on_time_reports: raw.on_time_reports,
            late_reports: raw.late_reports,
            version: raw.version,
            last_calculated_at: parse_timestamp(TABLE, &raw.last_calculated_at)?,
            created_at: parse_timestamp(TABLE, &raw.created_at)?,
        })
    }
}

/// Raw history entry from database
#[derive(Debug, Clone, FromRow)]
pub(crate) struct HistoryEntryRaw {
    pub id: i64,
    pub organization_id: String,
    pub previous_score: i64,
    pub new_score: i64,
    pub change_amount: i64,
    pub requested_change: i64,
    pub change_reason: String,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl TryFrom<HistoryEntryRaw> for HistoryEntry {
    type Error = DbError;

    fn try_from(raw: HistoryEntryRaw) -> DbResult<Self> {
        const TABLE: &str = "transparency_score_history";
        let related_entity = match (raw.related_entity_type, raw.related_entity_id) {
            (Some(kind), Some(id)) => Some(RelatedEntity {
                kind: EntityKind::from_str(&kind)?,
                id: parse_uuid(TABLE, &id)?,
            }),
            (None, None) => None,
            _ => {
                return Err(DbError::invalid_row(
                    TABLE,
                    format!("entry {} has a partial related entity", raw.id),
                ));
            }
        };

        Ok(Self {
            id: raw.id,
            organization_id: parse_uuid(TABLE, &raw.organization_id)?,
            previous_score: Score::from_hundredths(raw.previous_score),
            new_score: Score::from_hundredths(raw.new_score),
            change_amount: Score::from_hundredths(raw.change_amount),
            requested_change: Score::from_hundredths(raw.requested_change),
            change_reason: ChangeReason::from_code(&raw.change_reason),
            related_entity,
            notes: raw.notes,
            created_at: parse_timestamp(TABLE, &raw.created_at)?,
        })
    }
}

/// Leaderboard row: score joined with the organization name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub organization_id: Uuid,
    pub organization_name: String,
    pub current_score: Score,
    pub completed_campaigns: i64,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct LeaderboardRowRaw {
    pub organization_id: String,
    pub organization_name: String,
    pub current_score: i64,
    pub completed_campaigns: i64,
}

impl TryFrom<LeaderboardRowRaw> for LeaderboardRow {
    type Error = DbError;

    fn try_from(raw: LeaderboardRowRaw) -> DbResult<Self> {
        Ok(Self {
            organization_id: parse_uuid("transparency_scores", &raw.organization_id)?,
            organization_name: raw.organization_name,
            current_score: Score::from_hundredths(raw.current_score),
            completed_campaigns: raw.completed_campaigns,
        })
    }
}

macro_rules! string_enum {
    ($name:ident, $table:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub(crate) fn parse(value: &str) -> DbResult<Self> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(DbError::invalid_row(
                        $table,
                        format!("unknown {} {:?}", stringify!($name), other),
                    )),
                }
            }
        }
    };
}

string_enum!(CampaignStatus, "campaigns", {
    Draft => "DRAFT",
    PendingApproval => "PENDING_APPROVAL",
    Active => "ACTIVE",
    Paused => "PAUSED",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

string_enum!(EvidenceStatus, "evidences", {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

string_enum!(ReportType, "reports", {
    Fraud => "FRAUD",
    Inappropriate => "INAPPROPRIATE",
    Spam => "SPAM",
    Other => "OTHER",
});

string_enum!(ReportStatus, "reports", {
    Pending => "PENDING",
    Investigating => "INVESTIGATING",
    Resolved => "RESOLVED",
    Dismissed => "DISMISSED",
});

/// Organization whose reputation is tracked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub legal_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct OrganizationRaw {
    pub id: String,
    pub legal_name: String,
    pub created_at: String,
}

impl TryFrom<OrganizationRaw> for Organization {
    type Error = DbError;

    fn try_from(raw: OrganizationRaw) -> DbResult<Self> {
        Ok(Self {
            id: parse_uuid("organizations", &raw.id)?,
            legal_name: raw.legal_name,
            created_at: parse_timestamp("organizations", &raw.created_at)?,
        })
    }
}

/// Fundraising campaign; amounts are in minor currency units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub status: CampaignStatus,
    pub collected_amount: i64,
    pub evidence_deadline_days: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct CampaignRaw {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    pub status: String,
    pub collected_amount: i64,
    pub evidence_deadline_days: Option<i64>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
}

impl TryFrom<CampaignRaw> for Campaign {
    type Error = DbError;

    fn try_from(raw: CampaignRaw) -> DbResult<Self> {
        const TABLE: &str = "campaigns";
        Ok(Self {
            id: parse_uuid(TABLE, &raw.id)?,
            organization_id: parse_uuid(TABLE, &raw.organization_id)?,
            title: raw.title,
            status: CampaignStatus::parse(&raw.status)?,
            collected_amount: raw.collected_amount,
            evidence_deadline_days: raw.evidence_deadline_days,
            completed_at: parse_optional_timestamp(TABLE, raw.completed_at)?,
            cancelled_at: parse_optional_timestamp(TABLE, raw.cancelled_at)?,
            created_at: parse_timestamp(TABLE, &raw.created_at)?,
        })
    }
}

/// Proof-of-spend record submitted against a campaign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub status: EvidenceStatus,
    pub amount_spent: i64,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct EvidenceRaw {
    pub id: String,
    pub campaign_id: String,
    pub status: String,
    pub amount_spent: i64,
    pub uploaded_at: Option<String>,
    pub created_at: String,
}

impl TryFrom<EvidenceRaw> for Evidence {
    type Error = DbError;

    fn try_from(raw: EvidenceRaw) -> DbResult<Self> {
        const TABLE: &str = "evidences";
        Ok(Self {
            id: parse_uuid(TABLE, &raw.id)?,
            campaign_id: parse_uuid(TABLE, &raw.campaign_id)?,
            status: EvidenceStatus::parse(&raw.status)?,
            amount_spent: raw.amount_spent,
            uploaded_at: parse_optional_timestamp(TABLE, raw.uploaded_at)?,
            created_at: parse_timestamp(TABLE, &raw.created_at)?,
        })
    }
}

/// User complaint against an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// A resolved fraud report is one decided in the reporter's favour
    pub fn is_upheld(&self) -> bool {
        self.report_type == ReportType::Fraud && self.status == ReportStatus::Resolved
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ReportRaw {
    pub id: String,
    pub organization_id: String,
    pub report_type: String,
    pub status: String,
    pub resolved_at: Option<String>,
    pub created_at: String,
}

impl TryFrom<ReportRaw> for Report {
    type Error = DbError;

    fn try_from(raw: ReportRaw) -> DbResult<Self> {
        const TABLE: &str = "reports";
        Ok(Self {
            id: parse_uuid(TABLE, &raw.id)?,
            organization_id: parse_uuid(TABLE, &raw.organization_id)?,
            report_type: ReportType::parse(&raw.report_type)?,
            status: ReportStatus::parse(&raw.status)?,
            resolved_at: parse_optional_timestamp(TABLE, raw.resolved_at)?,
            created_at: parse_timestamp(TABLE, &raw.created_at)?,
        })
    }
}
