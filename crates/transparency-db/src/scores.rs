use crate::error::DbResult;
use crate::models::{LeaderboardRow, LeaderboardRowRaw, ScoreRecordRaw};
use crate::repository::SaveOutcome;
use crate::score_history::insert_history_entry;
use sqlx::{Any, Pool};
use tracing::debug;
use transparency_core::{NewHistoryEntry, Score, ScoreRecord};
use uuid::Uuid;

const SCORE_COLUMNS: &str = "organization_id, current_score, evidence_score, timeliness_score, report_score, total_campaigns, completed_campaigns, total_evidences, approved_evidences, rejected_evidences, on_time_reports, late_reports, version, last_calculated_at, created_at";

/// Get the score record of an organization
pub async fn get_score(pool: &Pool<Any>, organization_id: Uuid) -> DbResult<Option<ScoreRecord>> {
    let sql = format!("SELECT {SCORE_COLUMNS} FROM transparency_scores WHERE organization_id = ?");

    sqlx::query_as::<_, ScoreRecordRaw>(&sql)
        .bind(organization_id.to_string())
        .fetch_optional(pool)
        .await?
        .map(ScoreRecord::try_from)
        .transpose()
}

/// Create the score record and its `INITIALIZED` ledger entry atomically
///
/// Returns `false` without writing anything when the organization already has
/// a record.
pub async fn insert_initial_score(pool: &Pool<Any>, record: &ScoreRecord) -> DbResult<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO transparency_scores (organization_id, current_score, evidence_score, timeliness_score, report_score, total_campaigns, completed_campaigns, total_evidences, approved_evidences, rejected_evidences, on_time_reports, late_reports, version, last_calculated_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(organization_id) DO NOTHING"
    )
    .bind(record.organization_id.to_string())
    .bind(record.current_score.hundredths())
    .bind(record.evidence_score.hundredths())
    .bind(record.timeliness_score.hundredths())
    .bind(record.report_score.hundredths())
    .bind(record.total_campaigns)
    .bind(record.completed_campaigns)
    .bind(record.total_evidences)
    .bind(record.approved_evidences)
    .bind(record.rejected_evidences)
    .bind(record.on_time_reports)
    .bind(record.late_reports)
    .bind(record.version)
    .bind(record.last_calculated_at.to_rfc3339())
    .bind(record.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    insert_history_entry(&mut *tx, &record.genesis_entry()).await?;
    tx.commit().await?;

    Ok(true)
}

/// Compare-and-swap write of a score record together with its ledger entry
///
/// The update only applies while the stored version still equals
/// `expected_version`; otherwise nothing is written and `Conflict` is returned.
pub async fn save_score_with_history(
    pool: &Pool<Any>,
    record: &ScoreRecord,
    expected_version: i64,
    entry: &NewHistoryEntry,
) -> DbResult<SaveOutcome> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE transparency_scores
         SET current_score = ?, evidence_score = ?, timeliness_score = ?, report_score = ?,
             total_campaigns = ?, completed_campaigns = ?, total_evidences = ?,
             approved_evidences = ?, rejected_evidences = ?, on_time_reports = ?,
             late_reports = ?, version = version + 1, last_calculated_at = ?
         WHERE organization_id = ? AND version = ?"
    )
    .bind(record.current_score.hundredths())
    .bind(record.evidence_score.hundredths())
    .bind(record.timeliness_score.hundredths())
    .bind(record.report_score.hundredths())
    .bind(record.total_campaigns)
    .bind(record.completed_campaigns)
    .bind(record.total_evidences)
    .bind(record.approved_evidences)
    .bind(record.rejected_evidences)
    .bind(record.on_time_reports)
    .bind(record.late_reports)
    .bind(record.last_calculated_at.to_rfc3339())
    .bind(record.organization_id.to_string())
    .bind(expected_version)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        debug!(
            organization_id = %record.organization_id,
            expected_version,
            "Score version moved, nothing written"
        );
        return Ok(SaveOutcome::Conflict);
    }

    let entry = insert_history_entry(&mut *tx, entry).await?;
    tx.commit().await?;

    let mut saved = record.clone();
    saved.version = expected_version + 1;
    Ok(SaveOutcome::Saved { record: saved, entry })
}

/// Ranked scores joined with organization names
///
/// Ties on score are broken by completed campaigns, then organization id, so
/// pages never overlap.
pub async fn list_leaderboard(pool: &Pool<Any>, limit: i64, offset: i64) -> DbResult<Vec<LeaderboardRow>> {
    sqlx::query_as::<_, LeaderboardRowRaw>(
        "SELECT s.organization_id, o.legal_name AS organization_name, s.current_score, s.completed_campaigns
         FROM transparency_scores s
         JOIN organizations o ON o.id = s.organization_id
         ORDER BY s.current_score DESC, s.completed_campaigns DESC, s.organization_id ASC
         LIMIT ? OFFSET ?"
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(LeaderboardRow::try_from)
    .collect()
}

/// Count organizations that have a score record
pub async fn count_scores(pool: &Pool<Any>) -> DbResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transparency_scores")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Score records strictly below `threshold`, lowest first
pub async fn list_low_scores(
    pool: &Pool<Any>,
    threshold: Score,
    limit: i64,
    offset: i64,
) -> DbResult<Vec<ScoreRecord>> {
    let sql = format!(
        "SELECT {SCORE_COLUMNS}
         FROM transparency_scores
         WHERE current_score < ?
         ORDER BY current_score ASC, organization_id ASC
         LIMIT ? OFFSET ?"
    );

    sqlx::query_as::<_, ScoreRecordRaw>(&sql)
        .bind(threshold.hundredths())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(ScoreRecord::try_from)
        .collect()
}

/// Count score records strictly below `threshold`
pub async fn count_low_scores(pool: &Pool<Any>, threshold: Score) -> DbResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transparency_scores WHERE current_score < ?")
        .bind(threshold.hundredths())
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}
