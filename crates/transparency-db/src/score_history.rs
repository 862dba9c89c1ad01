use crate::error::DbResult;
use crate::models::{HistoryEntryRaw, parse_uuid};
use sqlx::{Any, Executor, Pool};
use transparency_core::{ChangeReason, HistoryEntry, NewHistoryEntry, RelatedEntity};
use uuid::Uuid;

const HISTORY_COLUMNS: &str = "id, organization_id, previous_score, new_score, change_amount, requested_change, change_reason, related_entity_type, related_entity_id, notes, created_at";

/// Append a ledger entry (immutable audit log)
///
/// Takes any executor so the insert can share a transaction with the score
/// update it explains.
pub async fn insert_history_entry<'e, E>(executor: E, entry: &NewHistoryEntry) -> DbResult<HistoryEntry>
where
    E: Executor<'e, Database = Any>,
{
    let (entity_type, entity_id) = match entry.related_entity {
        Some(related) => (Some(related.kind.as_str().to_string()), Some(related.id.to_string())),
        None => (None, None),
    };

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO transparency_score_history (organization_id, previous_score, new_score, change_amount, requested_change, change_reason, related_entity_type, related_entity_id, notes, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id"
    )
    .bind(entry.organization_id.to_string())
    .bind(entry.previous_score.hundredths())
    .bind(entry.new_score.hundredths())
    .bind(entry.change_amount.hundredths())
    .bind(entry.requested_change.hundredths())
    .bind(entry.change_reason.code().to_string())
    .bind(entity_type)
    .bind(entity_id)
    .bind(entry.notes.clone())
    .bind(entry.created_at.to_rfc3339())
    .fetch_one(executor)
    .await?;

    Ok(HistoryEntry {
        id,
        organization_id: entry.organization_id,
        previous_score: entry.previous_score,
        new_score: entry.new_score,
        change_amount: entry.change_amount,
        requested_change: entry.requested_change,
        change_reason: entry.change_reason.clone(),
        related_entity: entry.related_entity,
        notes: entry.notes.clone(),
        created_at: entry.created_at,
    })
}

/// List an organization's ledger, newest first, with pagination
pub async fn list_history_by_organization(
    pool: &Pool<Any>,
    organization_id: Uuid,
    limit: i64,
    offset: i64,
) -> DbResult<Vec<HistoryEntry>> {
    let sql = format!(
        "SELECT {HISTORY_COLUMNS}
         FROM transparency_score_history
         WHERE organization_id = ?
         ORDER BY id DESC
         LIMIT ? OFFSET ?"
    );

    sqlx::query_as::<_, HistoryEntryRaw>(&sql)
        .bind(organization_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(HistoryEntry::try_from)
        .collect()
}

/// Full ledger of an organization, oldest first, for replay
pub async fn list_full_history(pool: &Pool<Any>, organization_id: Uuid) -> DbResult<Vec<HistoryEntry>> {
    let sql = format!(
        "SELECT {HISTORY_COLUMNS}
         FROM transparency_score_history
         WHERE organization_id = ?
         ORDER BY id ASC"
    );

    sqlx::query_as::<_, HistoryEntryRaw>(&sql)
        .bind(organization_id.to_string())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(HistoryEntry::try_from)
        .collect()
}

/// Count ledger entries for an organization
pub async fn count_history_by_organization(pool: &Pool<Any>, organization_id: Uuid) -> DbResult<i64> {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM transparency_score_history WHERE organization_id = ?",
    )
    .bind(organization_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count.0)
}

/// Whether a change with this reason was already recorded against an entity
pub async fn history_entry_exists(
    pool: &Pool<Any>,
    organization_id: Uuid,
    reason: &ChangeReason,
    related: RelatedEntity,
) -> DbResult<bool> {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM transparency_score_history
         WHERE organization_id = ? AND change_reason = ? AND related_entity_type = ? AND related_entity_id = ?",
    )
    .bind(organization_id.to_string())
    .bind(reason.code().to_string())
    .bind(related.kind.as_str())
    .bind(related.id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count.0 > 0)
}

/// Ids of the entities recorded under `reason`, oldest first, without repeats
pub async fn list_related_ids_by_reason(
    pool: &Pool<Any>,
    organization_id: Uuid,
    reason: &ChangeReason,
) -> DbResult<Vec<Uuid>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT related_entity_id FROM transparency_score_history
         WHERE organization_id = ? AND change_reason = ? AND related_entity_id IS NOT NULL
         GROUP BY related_entity_id
         ORDER BY MIN(id) ASC",
    )
    .bind(organization_id.to_string())
    .bind(reason.code().to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id,)| parse_uuid("transparency_score_history", &id))
        .collect()
}

/// Count ledger entries recorded under `reason`
pub async fn count_history_by_reason(
    pool: &Pool<Any>,
    organization_id: Uuid,
    reason: &ChangeReason,
) -> DbResult<i64> {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM transparency_score_history WHERE organization_id = ? AND change_reason = ?",
    )
    .bind(organization_id.to_string())
    .bind(reason.code().to_string())
    .fetch_one(pool)
    .await?;

    Ok(count.0)
}
