mod common;

use chrono::{Duration, Utc};
use common::{campaign, evidence, force_score, organization, report, setup};
use transparency_core::{ChangeReason, RelatedEntity, Score, ScoreLevel};
use transparency_db::{CampaignStatus, EvidenceStatus, ReportStatus, ReportType, ScoreRepository};
use transparency_engine::{EngineError, PageRequest};
use uuid::Uuid;

#[tokio::test]
async fn test_end_to_end_scenario() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let active = campaign(&store, org, CampaignStatus::Active, 0, None).await;
    let approved = evidence(&store, active.id, EvidenceStatus::Approved, 100, Some(Utc::now())).await;
    let rejected = evidence(&store, active.id, EvidenceStatus::Rejected, 100, Some(Utc::now())).await;

    let record = engine.initialize_score(org).await.expect("Failed to initialize");
    assert_eq!(record.current_score, Score::from_points(50));

    let change = engine
        .on_evidence_approved(approved.id, true)
        .await
        .expect("Failed to approve evidence");
    assert_eq!(change.new_score, Score::from_points(55));
    assert_eq!(change.related_entity, Some(RelatedEntity::evidence(approved.id)));

    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    assert_eq!(view.approved_evidences, 1);
    assert_eq!(view.on_time_reports, 1);

    let change = engine
        .on_evidence_rejected(rejected.id)
        .await
        .expect("Failed to reject evidence");
    assert_eq!(change.new_score, Score::from_points(50));

    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    assert_eq!(view.rejected_evidences, 1);

    let change = engine
        .on_campaign_completed(active.id)
        .await
        .expect("Failed to complete campaign");
    assert_eq!(change.new_score, Score::from_points(53));

    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    assert_eq!(view.completed_campaigns, 1);
    assert_eq!(view.total_campaigns, 1);
    assert_eq!(view.total_evidences, 2);
    assert_eq!(view.level, ScoreLevel::Medium);

    assert!(engine.can_create_campaign(org).await.expect("Failed to check gate"));
    assert_eq!(
        engine.verify_ledger(org).await.expect("Ledger should replay"),
        Score::from_points(53)
    );
}

#[tokio::test]
async fn test_initialize_score_is_idempotent() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;

    let first = engine.initialize_score(org).await.expect("Failed to initialize");
    let second = engine.initialize_score(org).await.expect("Failed to initialize");
    assert_eq!(first, second);
    assert_eq!(second.version, 1);

    let history = engine
        .get_score_history(org, PageRequest::default())
        .await
        .expect("Failed to list history");
    assert_eq!(history.total, 1);
    let genesis = &history.items[0];
    assert_eq!(genesis.change_reason, ChangeReason::Initialized);
    assert_eq!(genesis.previous_score, Score::from_points(50));
    assert_eq!(genesis.new_score, Score::from_points(50));
    assert_eq!(genesis.change_amount, Score::ZERO);
}

#[tokio::test]
async fn test_handlers_lazily_initialize() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let cancelled = campaign(&store, org, CampaignStatus::Cancelled, 0, None).await;

    let change = engine
        .on_campaign_cancelled(cancelled.id)
        .await
        .expect("Failed to cancel campaign");
    assert_eq!(change.previous_score, Score::from_points(50));
    assert_eq!(change.new_score, Score::from_points(48));

    let history = engine
        .get_score_history(org, PageRequest::default())
        .await
        .expect("Failed to list history");
    let reasons: Vec<_> = history.items.iter().map(|e| e.change_reason.clone()).collect();
    assert_eq!(
        reasons,
        vec![ChangeReason::CampaignCancelled, ChangeReason::Initialized]
    );
}

#[tokio::test]
async fn test_ledger_replays_after_many_events() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let active = campaign(&store, org, CampaignStatus::Active, 0, None).await;

    for i in 0..12 {
        let e = evidence(&store, active.id, EvidenceStatus::Approved, 10, None).await;
        engine
            .on_evidence_approved(e.id, i % 3 != 0)
            .await
            .expect("Failed to approve evidence");
    }
    let fraud = report(&store, org, ReportType::Fraud, ReportStatus::Resolved).await;
    engine
        .on_report_upheld_for_organization(org, fraud.id)
        .await
        .expect("Failed to apply report");

    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    // 50 + 8*5 + 4*3 saturates at 100, then -15
    assert_eq!(view.current_score, Score::from_points(85));
    assert_eq!(view.on_time_reports, 8);
    assert_eq!(view.late_reports, 4);

    let replayed = engine.verify_ledger(org).await.expect("Ledger should replay");
    assert_eq!(replayed, view.current_score);
}

#[tokio::test]
async fn test_saturation_is_recorded_post_clamp() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    engine.initialize_score(org).await.expect("Failed to initialize");
    force_score(&store, org, Score::from_points(3)).await;

    let active = campaign(&store, org, CampaignStatus::Active, 0, None).await;
    let e = evidence(&store, active.id, EvidenceStatus::Rejected, 0, None).await;
    let change = engine.on_evidence_rejected(e.id).await.expect("Failed to reject");
    assert_eq!(change.new_score, Score::ZERO);
    assert_eq!(change.change_amount, Score::from_points(-3));

    let history = engine
        .get_score_history(org, PageRequest::new(1, 1))
        .await
        .expect("Failed to list history");
    assert_eq!(history.items[0].requested_change, Score::from_points(-5));
    assert_eq!(history.items[0].change_amount, Score::from_points(-3));
}

#[tokio::test]
async fn test_missing_references_leave_no_trace() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    engine.initialize_score(org).await.expect("Failed to initialize");

    let missing = Uuid::new_v4();
    assert!(matches!(
        engine.on_evidence_approved(missing, true).await,
        Err(EngineError::EvidenceNotFound(id)) if id == missing
    ));
    assert!(matches!(
        engine.on_evidence_rejected(missing).await,
        Err(EngineError::EvidenceNotFound(_))
    ));
    assert!(matches!(
        engine.on_campaign_completed(missing).await,
        Err(EngineError::CampaignNotFound(_))
    ));
    assert!(matches!(
        engine.on_evidence_deadline_missed(missing).await,
        Err(EngineError::CampaignNotFound(_))
    ));
    assert!(matches!(
        engine.on_report_upheld_for_organization(org, missing).await,
        Err(EngineError::ReportNotFound { .. })
    ));
    assert!(matches!(
        engine.initialize_score(missing).await,
        Err(EngineError::OrganizationNotFound(_))
    ));
    assert!(matches!(
        engine.can_create_campaign(missing).await,
        Err(EngineError::OrganizationNotFound(_))
    ));

    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    assert_eq!(view.current_score, Score::BASELINE);
    assert_eq!(view.total_evidences, 0);
    assert_eq!(store.count_history(org).await.expect("Failed to count"), 1);
    assert_eq!(store.count_scores().await.expect("Failed to count"), 1);
}

#[tokio::test]
async fn test_report_must_belong_to_organization() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let other = organization(&store, "Başka Dernek").await;
    let foreign = report(&store, other, ReportType::Fraud, ReportStatus::Resolved).await;

    let result = engine.on_report_upheld_for_organization(org, foreign.id).await;
    assert!(matches!(result, Err(EngineError::ReportNotFound { .. })));
}

#[tokio::test]
async fn test_deadline_missed_without_evidence() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let done = campaign(&store, org, CampaignStatus::Completed, 5_000, Some(Utc::now())).await;

    let change = engine
        .on_evidence_deadline_missed(done.id)
        .await
        .expect("Failed to apply deadline penalty");
    assert_eq!(change.new_score, Score::from_points(40));
    assert_eq!(change.reason, ChangeReason::EvidenceDeadlineMissed);

    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    assert_eq!(view.timeliness_score, Score::from_points(-10));
    assert_eq!(view.total_evidences, 0);
}

#[tokio::test]
async fn test_consistency_bonus() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;

    let change = engine.apply_consistency_bonus(org).await.expect("Failed to apply bonus");
    assert_eq!(change.reason, ChangeReason::MonthlyConsistencyBonus);
    assert_eq!(change.new_score, Score::from_points(51));
    assert_eq!(change.related_entity, None);
}

#[tokio::test]
async fn test_can_create_campaign_boundary() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;

    // No record yet: judged at the baseline
    assert!(engine.can_create_campaign(org).await.expect("Failed to check gate"));

    engine.initialize_score(org).await.expect("Failed to initialize");
    force_score(&store, org, Score::from_points(40)).await;
    assert!(engine.can_create_campaign(org).await.expect("Failed to check gate"));

    force_score(&store, org, Score::from_hundredths(3999)).await;
    assert!(!engine.can_create_campaign(org).await.expect("Failed to check gate"));

    force_score(&store, org, Score::from_points(30)).await;
    assert!(!engine.can_create_campaign(org).await.expect("Failed to check gate"));
}

#[tokio::test]
async fn test_get_organization_score_without_record() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;

    assert!(matches!(
        engine.get_organization_score(org).await,
        Err(EngineError::ScoreNotFound(_))
    ));
    assert!(matches!(
        engine.get_organization_score(Uuid::new_v4()).await,
        Err(EngineError::OrganizationNotFound(_))
    ));
}

#[tokio::test]
async fn test_score_history_paging() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    for _ in 0..4 {
        engine.apply_consistency_bonus(org).await.expect("Failed to apply bonus");
    }

    let first = engine
        .get_score_history(org, PageRequest::new(1, 2))
        .await
        .expect("Failed to list history");
    assert_eq!(first.total, 5);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.items[0].new_score, Score::from_points(54));

    let last = engine
        .get_score_history(org, PageRequest::new(3, 2))
        .await
        .expect("Failed to list history");
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].change_reason, ChangeReason::Initialized);
}

#[tokio::test]
async fn test_leaderboard_ranks() {
    let (engine, store) = setup().await;
    let low = organization(&store, "Low").await;
    let high = organization(&store, "High").await;
    let tied = organization(&store, "Tied").await;

    for org in [low, high, tied] {
        engine.initialize_score(org).await.expect("Failed to initialize");
    }
    force_score(&store, low, Score::from_points(20)).await;
    force_score(&store, high, Score::from_points(50)).await;
    let done = campaign(&store, tied, CampaignStatus::Completed, 0, Some(Utc::now())).await;
    engine.on_campaign_completed(done.id).await.expect("Failed to complete");
    force_score(&store, tied, Score::from_points(50)).await;

    let board = engine
        .get_leaderboard(PageRequest::new(1, 2))
        .await
        .expect("Failed to get leaderboard");
    assert_eq!(board.total, 3);
    assert_eq!(board.items[0].organization_id, tied);
    assert_eq!(board.items[0].rank, 1);
    assert_eq!(board.items[1].organization_id, high);

    let rest = engine
        .get_leaderboard(PageRequest::new(2, 2))
        .await
        .expect("Failed to get leaderboard");
    assert_eq!(rest.items[0].organization_id, low);
    assert_eq!(rest.items[0].rank, 3);
    assert_eq!(rest.items[0].level, ScoreLevel::Low);
}

#[tokio::test]
async fn test_low_score_organizations() {
    let (engine, store) = setup().await;
    let a = organization(&store, "A").await;
    let b = organization(&store, "B").await;
    let c = organization(&store, "C").await;
    for org in [a, b, c] {
        engine.initialize_score(org).await.expect("Failed to initialize");
    }
    force_score(&store, a, Score::from_points(39)).await;
    force_score(&store, b, Score::from_points(40)).await;
    force_score(&store, c, Score::from_points(5)).await;

    let low = engine
        .get_low_score_organizations(PageRequest::default())
        .await
        .expect("Failed to list low scores");
    assert_eq!(low.total, 2);
    let ids: Vec<_> = low.items.iter().map(|v| v.organization_id).collect();
    assert_eq!(ids, vec![c, a]);
}

#[tokio::test]
async fn test_recalculate_score_from_live_data() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let now = Utc::now();
    let done = campaign(&store, org, CampaignStatus::Completed, 1_000, Some(now - Duration::days(2))).await;
    campaign(&store, org, CampaignStatus::Cancelled, 0, None).await;
    evidence(&store, done.id, EvidenceStatus::Approved, 1_000, Some(now)).await;
    evidence(&store, done.id, EvidenceStatus::Rejected, 0, Some(now)).await;
    report(&store, org, ReportType::Fraud, ReportStatus::Dismissed).await;

    engine.initialize_score(org).await.expect("Failed to initialize");
    force_score(&store, org, Score::from_points(90)).await;

    let change = engine.recalculate_score(org).await.expect("Failed to recalculate");
    // 50 + 5 - 5 + 3 - 2
    assert_eq!(change.new_score, Score::from_points(51));
    assert_eq!(change.previous_score, Score::from_points(90));
    assert_eq!(change.change_amount, Score::from_points(-39));
    assert_eq!(change.reason, ChangeReason::Recalculated);

    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    assert_eq!(view.completed_campaigns, 1);
    assert_eq!(view.total_campaigns, 2);
    assert_eq!(view.approved_evidences, 1);
    assert_eq!(view.rejected_evidences, 1);
    assert_eq!(view.on_time_reports, 1);
    assert_eq!(view.report_score, Score::ZERO);

    // Recalculating unchanged data records a zero delta
    let again = engine.recalculate_score(org).await.expect("Failed to recalculate");
    assert_eq!(again.change_amount, Score::ZERO);
}

#[tokio::test]
async fn test_sweep_missed_deadlines_is_idempotent() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let now = Utc::now();

    let overdue = campaign(&store, org, CampaignStatus::Completed, 1_000, Some(now - Duration::days(20))).await;
    let evidenced = campaign(&store, org, CampaignStatus::Completed, 1_000, Some(now - Duration::days(20))).await;
    evidence(&store, evidenced.id, EvidenceStatus::Approved, 1_000, Some(now)).await;
    campaign(&store, org, CampaignStatus::Completed, 1_000, Some(now - Duration::days(3))).await;
    campaign(&store, org, CampaignStatus::Active, 1_000, None).await;

    let penalized = engine.sweep_missed_deadlines(now).await.expect("Failed to sweep");
    assert_eq!(penalized, vec![overdue.id]);

    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    assert_eq!(view.current_score, Score::from_points(40));

    let rerun = engine.sweep_missed_deadlines(now).await.expect("Failed to sweep");
    assert!(rerun.is_empty());
    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    assert_eq!(view.current_score, Score::from_points(40));
}

#[tokio::test]
async fn test_is_evidence_on_time() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let completed_at = Utc::now() - Duration::days(30);
    let done = campaign(&store, org, CampaignStatus::Completed, 0, Some(completed_at)).await;

    let prompt = evidence(&store, done.id, EvidenceStatus::Pending, 0, Some(completed_at + Duration::days(15))).await;
    let late = evidence(&store, done.id, EvidenceStatus::Pending, 0, Some(completed_at + Duration::days(16))).await;

    assert!(engine.is_evidence_on_time(prompt.id).await.expect("Failed to check"));
    assert!(!engine.is_evidence_on_time(late.id).await.expect("Failed to check"));
}

#[tokio::test]
async fn test_changes_are_broadcast() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let mut events = engine.subscribe();

    let committed = engine.apply_consistency_bonus(org).await.expect("Failed to apply bonus");

    let received = events.recv().await.expect("Expected a score change");
    assert_eq!(received, committed);
    assert_eq!(received.organization_id, org);

    let json = serde_json::to_value(&received).expect("Failed to serialize");
    assert_eq!(json["new_score"], "51.00");
    assert_eq!(json["reason"], "MONTHLY_CONSISTENCY_BONUS");
}

#[tokio::test]
async fn test_recalculate_after_handlers_keeps_score() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let now = Utc::now();
    let done = campaign(&store, org, CampaignStatus::Completed, 1_000, Some(now - Duration::days(2))).await;
    let flagged = campaign(&store, org, CampaignStatus::Completed, 500, Some(now - Duration::days(2))).await;
    let approved = evidence(&store, done.id, EvidenceStatus::Approved, 1_000, Some(now)).await;
    let dismissed = report(&store, org, ReportType::Fraud, ReportStatus::Dismissed).await;

    engine.on_campaign_completed(done.id).await.expect("Failed to complete");
    engine.on_campaign_completed(flagged.id).await.expect("Failed to complete");
    engine
        .on_evidence_approved(approved.id, true)
        .await
        .expect("Failed to approve evidence");
    engine
        .on_evidence_deadline_missed(flagged.id)
        .await
        .expect("Failed to record missed deadline");
    engine
        .on_report_upheld_for_organization(org, dismissed.id)
        .await
        .expect("Failed to uphold report");
    let last = engine.apply_consistency_bonus(org).await.expect("Failed to apply bonus");
    // 50 + 3 + 3 + 5 - 10 - 15 + 1
    assert_eq!(last.new_score, Score::from_points(37));

    let change = engine.recalculate_score(org).await.expect("Failed to recalculate");
    assert_eq!(change.change_amount, Score::ZERO);
    assert_eq!(change.new_score, Score::from_points(37));

    let view = engine.get_organization_score(org).await.expect("Failed to get score");
    assert_eq!(view.report_score, Score::from_points(-15));
    assert_eq!(view.timeliness_score, Score::from_points(-5));
    engine.verify_ledger(org).await.expect("Ledger should replay");
}

#[tokio::test]
async fn test_unrepresentable_deadline_does_not_break_maintenance() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let now = Utc::now();
    let done = campaign(&store, org, CampaignStatus::Completed, 1_000, Some(now - Duration::days(400))).await;
    sqlx::query("UPDATE campaigns SET evidence_deadline_days = ? WHERE id = ?")
        .bind(i64::MAX / 2)
        .bind(done.id.to_string())
        .execute(store.pool())
        .await
        .expect("Failed to update campaign");
    let late = evidence(&store, done.id, EvidenceStatus::Approved, 10, Some(now)).await;

    let penalized = engine.sweep_missed_deadlines(now).await.expect("Failed to sweep");
    assert!(penalized.is_empty());
    assert!(engine.is_evidence_on_time(late.id).await.expect("Failed to judge timeliness"));

    let change = engine.recalculate_score(org).await.expect("Failed to recalculate");
    // 50 + 3 + 5
    assert_eq!(change.new_score, Score::from_points(58));
}

#[tokio::test]
async fn test_falling_below_floor_is_flagged() {
    let (engine, store) = setup().await;
    let org = organization(&store, "Umut Vakfı").await;
    let active = campaign(&store, org, CampaignStatus::Active, 0, None).await;
    let first = evidence(&store, active.id, EvidenceStatus::Rejected, 0, None).await;
    let second = evidence(&store, active.id, EvidenceStatus::Rejected, 0, None).await;
    engine.initialize_score(org).await.expect("Failed to initialize");
    force_score(&store, org, Score::from_points(44)).await;
    let mut events = engine.subscribe();

    let change = engine.on_evidence_rejected(first.id).await.expect("Failed to reject evidence");
    assert_eq!(change.new_score, Score::from_points(39));
    assert!(change.crossed_eligibility_floor());
    assert!(events.recv().await.expect("Expected a score change").crossed_eligibility_floor());
    assert!(!engine.can_create_campaign(org).await.expect("Failed to check gate"));

    let change = engine.on_evidence_rejected(second.id).await.expect("Failed to reject evidence");
    assert!(!change.crossed_eligibility_floor());
}
