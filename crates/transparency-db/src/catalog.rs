//! Read side of the collaborator tables (organizations, campaigns, evidences
//! and reports). The engine never writes these; the insert helpers exist for
//! fixtures and the CLI's seeding needs.

use crate::error::DbResult;
use crate::models::{
    Campaign, CampaignRaw, CampaignStatus, Evidence, EvidenceRaw, EvidenceStatus, Organization,
    OrganizationRaw, Report, ReportRaw, ReportStatus, ReportType, parse_uuid,
};
use sqlx::{Any, Pool};
use uuid::Uuid;

const CAMPAIGN_COLUMNS: &str = "id, organization_id, title, status, collected_amount, evidence_deadline_days, completed_at, cancelled_at, created_at";
const EVIDENCE_COLUMNS: &str = "id, campaign_id, status, amount_spent, uploaded_at, created_at";
const REPORT_COLUMNS: &str = "id, organization_id, report_type, status, resolved_at, created_at";

pub async fn insert_organization(pool: &Pool<Any>, organization: &Organization) -> DbResult<()> {
    sqlx::query("INSERT INTO organizations (id, legal_name, created_at) VALUES (?, ?, ?)")
        .bind(organization.id.to_string())
        .bind(organization.legal_name.clone())
        .bind(organization.created_at.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn insert_campaign(pool: &Pool<Any>, campaign: &Campaign) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO campaigns (id, organization_id, title, status, collected_amount, evidence_deadline_days, completed_at, cancelled_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(campaign.id.to_string())
    .bind(campaign.organization_id.to_string())
    .bind(campaign.title.clone())
    .bind(campaign.status.as_str())
    .bind(campaign.collected_amount)
    .bind(campaign.evidence_deadline_days)
    .bind(campaign.completed_at.map(|ts| ts.to_rfc3339()))
    .bind(campaign.cancelled_at.map(|ts| ts.to_rfc3339()))
    .bind(campaign.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_evidence(pool: &Pool<Any>, evidence: &Evidence) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO evidences (id, campaign_id, status, amount_spent, uploaded_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(evidence.id.to_string())
    .bind(evidence.campaign_id.to_string())
    .bind(evidence.status.as_str())
    .bind(evidence.amount_spent)
    .bind(evidence.uploaded_at.map(|ts| ts.to_rfc3339()))
    .bind(evidence.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_report(pool: &Pool<Any>, report: &Report) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO reports (id, organization_id, report_type, status, resolved_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(report.id.to_string())
    .bind(report.organization_id.to_string())
    .bind(report.report_type.as_str())
    .bind(report.status.as_str())
    .bind(report.resolved_at.map(|ts| ts.to_rfc3339()))
    .bind(report.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_organization(pool: &Pool<Any>, id: Uuid) -> DbResult<Option<Organization>> {
    sqlx::query_as::<_, OrganizationRaw>(
        "SELECT id, legal_name, created_at FROM organizations WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?
    .map(Organization::try_from)
    .transpose()
}

pub async fn organization_exists(pool: &Pool<Any>, id: Uuid) -> DbResult<bool> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count.0 > 0)
}

pub async fn get_campaign(pool: &Pool<Any>, id: Uuid) -> DbResult<Option<Campaign>> {
    let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?");

    sqlx::query_as::<_, CampaignRaw>(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .map(Campaign::try_from)
        .transpose()
}

pub async fn get_evidence(pool: &Pool<Any>, id: Uuid) -> DbResult<Option<Evidence>> {
    let sql = format!("SELECT {EVIDENCE_COLUMNS} FROM evidences WHERE id = ?");

    sqlx::query_as::<_, EvidenceRaw>(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .map(Evidence::try_from)
        .transpose()
}

pub async fn get_report(pool: &Pool<Any>, id: Uuid) -> DbResult<Option<Report>> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?");

    sqlx::query_as::<_, ReportRaw>(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .map(Report::try_from)
        .transpose()
}

pub async fn list_campaigns_by_organization(pool: &Pool<Any>, organization_id: Uuid) -> DbResult<Vec<Campaign>> {
    let sql = format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE organization_id = ? ORDER BY created_at ASC, id ASC"
    );

    sqlx::query_as::<_, CampaignRaw>(&sql)
        .bind(organization_id.to_string())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Campaign::try_from)
        .collect()
}

/// Every evidence submitted against any of the organization's campaigns
pub async fn list_evidences_by_organization(pool: &Pool<Any>, organization_id: Uuid) -> DbResult<Vec<Evidence>> {
    sqlx::query_as::<_, EvidenceRaw>(
        "SELECT e.id, e.campaign_id, e.status, e.amount_spent, e.uploaded_at, e.created_at
         FROM evidences e
         JOIN campaigns c ON c.id = e.campaign_id
         WHERE c.organization_id = ?
         ORDER BY e.created_at ASC, e.id ASC"
    )
    .bind(organization_id.to_string())
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Evidence::try_from)
    .collect()
}

/// Ids of resolved fraud reports against the organization
pub async fn list_upheld_report_ids(pool: &Pool<Any>, organization_id: Uuid) -> DbResult<Vec<Uuid>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT id FROM reports
         WHERE organization_id = ? AND report_type = ? AND status = ?
         ORDER BY created_at ASC, id ASC",
    )
    .bind(organization_id.to_string())
    .bind(ReportType::Fraud.as_str())
    .bind(ReportStatus::Resolved.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|(id,)| parse_uuid("reports", &id)).collect()
}

/// Completed campaigns that carry a completion timestamp, oldest completion first
pub async fn list_completed_campaigns(pool: &Pool<Any>, limit: i64, offset: i64) -> DbResult<Vec<Campaign>> {
    let sql = format!(
        "SELECT {CAMPAIGN_COLUMNS}
         FROM campaigns
         WHERE status = ? AND completed_at IS NOT NULL
         ORDER BY completed_at ASC, id ASC
         LIMIT ? OFFSET ?"
    );

    sqlx::query_as::<_, CampaignRaw>(&sql)
        .bind(CampaignStatus::Completed.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Campaign::try_from)
        .collect()
}

/// Total spend proven by approved evidence for a campaign
pub async fn sum_approved_spend(pool: &Pool<Any>, campaign_id: Uuid) -> DbResult<i64> {
    let total: (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount_spent), 0) FROM evidences WHERE campaign_id = ? AND status = ?",
    )
    .bind(campaign_id.to_string())
    .bind(EvidenceStatus::Approved.as_str())
    .fetch_one(pool)
    .await?;

    Ok(total.0)
}
