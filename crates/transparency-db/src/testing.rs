use crate::catalog::{insert_campaign, insert_evidence, insert_organization};
use crate::models::{Campaign, CampaignStatus, Evidence, EvidenceStatus, Organization};
use crate::pool::{create_pool, run_migrations};
use chrono::{DateTime, Utc};
use sqlx::{Any, Pool};
use uuid::Uuid;

pub(crate) async fn setup_test_db() -> Pool<Any> {
    let pool = create_pool("sqlite::memory:", 1)
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

pub(crate) async fn seed_organization(pool: &Pool<Any>, legal_name: &str) -> Uuid {
    let organization = Organization {
        id: Uuid::new_v4(),
        legal_name: legal_name.to_string(),
        created_at: Utc::now(),
    };
    insert_organization(pool, &organization)
        .await
        .expect("Failed to insert organization");
    organization.id
}

pub(crate) async fn seed_campaign(
    pool: &Pool<Any>,
    organization_id: Uuid,
    status: CampaignStatus,
    collected_amount: i64,
    completed_at: Option<DateTime<Utc>>,
) -> Campaign {
    let campaign = Campaign {
        id: Uuid::new_v4(),
        organization_id,
        title: "Winter relief".to_string(),
        status,
        collected_amount,
        evidence_deadline_days: None,
        completed_at,
        cancelled_at: None,
        created_at: Utc::now(),
    };
    insert_campaign(pool, &campaign).await.expect("Failed to insert campaign");
    campaign
}

pub(crate) async fn seed_evidence(
    pool: &Pool<Any>,
    campaign_id: Uuid,
    status: EvidenceStatus,
    amount_spent: i64,
    uploaded_at: Option<DateTime<Utc>>,
) -> Evidence {
    let evidence = Evidence {
        id: Uuid::new_v4(),
        campaign_id,
        status,
        amount_spent,
        uploaded_at,
        created_at: Utc::now(),
    };
    insert_evidence(pool, &evidence).await.expect("Failed to insert evidence");
    evidence
}
