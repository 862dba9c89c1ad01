//! Read models returned by the engine's queries and handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use transparency_core::{
    CAMPAIGN_ELIGIBILITY_FLOOR, ChangeReason, HistoryEntry, RelatedEntity, Score, ScoreLevel,
    ScoreRecord, score_level,
};
use transparency_db::LeaderboardRow;
use uuid::Uuid;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// 1-based page selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Normalizes out-of-range input: page 0 becomes 1, `per_page` is kept
    /// within `1..=MAX_PER_PAGE`
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

/// One page of results plus totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        let per_page = i64::from(request.per_page.max(1));
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages: (total + per_page - 1) / per_page,
        }
    }
}

/// Score record as presented to callers, with its level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreView {
    pub organization_id: Uuid,
    pub current_score: Score,
    pub level: ScoreLevel,
    pub level_label: String,
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
    pub last_calculated_at: DateTime<Utc>,
}

impl From<ScoreRecord> for ScoreView {
    fn from(record: ScoreRecord) -> Self {
        let level = record.level();
        Self {
            organization_id: record.organization_id,
            current_score: record.current_score,
            level,
            level_label: level.label().to_string(),
            evidence_score: record.evidence_score,
            timeliness_score: record.timeliness_score,
            report_score: record.report_score,
            total_campaigns: record.total_campaigns,
            completed_campaigns: record.completed_campaigns,
            total_evidences: record.total_evidences,
            approved_evidences: record.approved_evidences,
            rejected_evidences: record.rejected_evidences,
            on_time_reports: record.on_time_reports,
            late_reports: record.late_reports,
            last_calculated_at: record.last_calculated_at,
        }
    }
}

/// Ranked leaderboard position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub current_score: Score,
    pub level: ScoreLevel,
    pub completed_campaigns: i64,
}

impl LeaderboardEntry {
    pub(crate) fn ranked(rank: i64, row: LeaderboardRow) -> Self {
        Self {
            rank,
            organization_id: row.organization_id,
            organization_name: row.organization_name,
            current_score: row.current_score,
            level: score_level(row.current_score),
            completed_campaigns: row.completed_campaigns,
        }
    }
}

/// A committed score change, returned by handlers and broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub history_id: i64,
    pub organization_id: Uuid,
    pub previous_score: Score,
    pub new_score: Score,
    pub change_amount: Score,
    pub reason: ChangeReason,
    pub related_entity: Option<RelatedEntity>,
    pub changed_at: DateTime<Utc>,
}

impl ScoreChange {
    /// Dropped from at or above the campaign creation floor to below it
    pub fn crossed_eligibility_floor(&self) -> bool {
        self.previous_score >= CAMPAIGN_ELIGIBILITY_FLOOR && self.new_score < CAMPAIGN_ELIGIBILITY_FLOOR
    }
}

impl From<&HistoryEntry> for ScoreChange {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            history_id: entry.id,
            organization_id: entry.organization_id,
            previous_score: entry.previous_score,
            new_score: entry.new_score,
            change_amount: entry.change_amount,
            reason: entry.change_reason.clone(),
            related_entity: entry.related_entity,
            changed_at: entry.created_at,
        }
    }
}
