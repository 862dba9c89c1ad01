use crate::calculator::calculate_new_score;
use crate::error::{CoreError, LedgerError};
use crate::reason::ChangeReason;
use crate::score::Score;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of entity that triggered a score change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Organization,
    Campaign,
    Evidence,
    Report,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Organization => "ORGANIZATION",
            EntityKind::Campaign => "CAMPAIGN",
            EntityKind::Evidence => "EVIDENCE",
            EntityKind::Report => "REPORT",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORGANIZATION" => Ok(EntityKind::Organization),
            "CAMPAIGN" => Ok(EntityKind::Campaign),
            "EVIDENCE" => Ok(EntityKind::Evidence),
            "REPORT" => Ok(EntityKind::Report),
            other => Err(CoreError::InvalidEntityKind(other.to_string())),
        }
    }
}

/// Reference to the evidence, campaign or report behind a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl RelatedEntity {
    pub fn evidence(id: Uuid) -> Self {
        Self { kind: EntityKind::Evidence, id }
    }

    pub fn campaign(id: Uuid) -> Self {
        Self { kind: EntityKind::Campaign, id }
    }

    pub fn report(id: Uuid) -> Self {
        Self { kind: EntityKind::Report, id }
    }
}

/// Ledger row about to be appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub organization_id: Uuid,
    pub previous_score: Score,
    pub new_score: Score,
    /// Applied change: always `new_score - previous_score`
    pub change_amount: Score,
    /// Delta asked for before clamping
    pub requested_change: Score,
    pub change_reason: ChangeReason,
    pub related_entity: Option<RelatedEntity>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewHistoryEntry {
    pub fn new(
        organization_id: Uuid,
        previous_score: Score,
        new_score: Score,
        requested_change: Score,
        change_reason: ChangeReason,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            organization_id,
            previous_score,
            new_score,
            change_amount: new_score - previous_score,
            requested_change,
            change_reason,
            related_entity: None,
            notes: None,
            created_at,
        }
    }

    pub fn with_related(mut self, related: Option<RelatedEntity>) -> Self {
        self.related_entity = related;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn was_clamped(&self) -> bool {
        self.change_amount != self.requested_change
    }
}

/// Persisted, immutable ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub organization_id: Uuid,
    pub previous_score: Score,
    pub new_score: Score,
    pub change_amount: Score,
    pub requested_change: Score,
    pub change_reason: ChangeReason,
    pub related_entity: Option<RelatedEntity>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Replay an organization's ledger, oldest entry first, and return the score it
/// ends on.
///
/// Fails on the first entry that breaks the chain.
pub fn replay(entries: &[HistoryEntry]) -> Result<Score, LedgerError> {
    let first = entries.first().ok_or(LedgerError::Empty)?;
    if first.change_reason != ChangeReason::Initialized || first.new_score != Score::BASELINE {
        return Err(LedgerError::BadGenesis {
            index: 0,
            reason: first.change_reason.to_string(),
            new_score: first.new_score,
        });
    }

    let mut expected = first.previous_score;
    for (index, entry) in entries.iter().enumerate() {
        if entry.organization_id != first.organization_id {
            return Err(LedgerError::MixedOrganizations { index });
        }
        if entry.previous_score != expected {
            return Err(LedgerError::BrokenChain {
                index,
                previous_score: entry.previous_score,
                expected,
            });
        }

        let clamped = calculate_new_score(entry.previous_score, entry.requested_change);
        if entry.new_score != clamped {
            return Err(LedgerError::BadClamp {
                index,
                previous_score: entry.previous_score,
                requested_change: entry.requested_change,
                new_score: entry.new_score,
                expected: clamped,
            });
        }
        if entry.previous_score + entry.change_amount != entry.new_score {
            return Err(LedgerError::BadChangeAmount {
                index,
                previous_score: entry.previous_score,
                new_score: entry.new_score,
                change_amount: entry.change_amount,
            });
        }

        expected = entry.new_score;
    }

    Ok(expected)
}
