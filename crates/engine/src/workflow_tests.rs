use super::*;
use oj_adapters::{FakeEmbedder, FakePersonalizer, FakePortalAdapter};
use oj_core::FakeClock;
use oj_storage::MemoryTracker;
use std::time::Duration;

fn build_engine(
    portal: Arc<FakePortalAdapter>,
    personalizer: Arc<FakePersonalizer>,
) -> (Arc<WorkflowEngine<FakeClock>>, Arc<MemoryTracker>) {
    let tracker = Arc::new(MemoryTracker::new());
    let ranker = Arc::new(Ranker::new(Arc::new(FakeEmbedder::new())));
    let event_bus = Arc::new(EventBus::new(256, Duration::from_millis(20)));
    let config = EngineConfig { per_run_post_terminal_grace_ms: 20, ..Default::default() };
    let engine = Arc::new(WorkflowEngine::new(
        portal,
        personalizer,
        ranker,
        tracker.clone(),
        event_bus,
        FakeClock::new(),
        config,
    ));
    (engine, tracker)
}

async fn wait_until_terminal<C: Clock + 'static>(engine: &Arc<WorkflowEngine<C>>, user: &UserId) -> RunSnapshot {
    for _ in 0..200 {
        let snapshot = engine.status(user).expect("run should exist");
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run did not reach a terminal state in time");
}

#[tokio::test]
async fn start_rejects_second_start_while_running() {
    let job = Job::builder().id("j1").build();
    let portal = Arc::new(FakePortalAdapter::new(vec![job.clone()]));
    let personalizer = Arc::new(FakePersonalizer::new());
    let (engine, _tracker) = build_engine(portal, personalizer);

    let user = UserId::new("u1");
    engine.start(user.clone(), Profile::default(), Policy::builder().build()).unwrap();
    let second = engine.start(user.clone(), Profile::default(), Policy::builder().build());
    assert_eq!(second, Err(EngineError::AlreadyRunning));

    wait_until_terminal(&engine, &user).await;
}

#[tokio::test]
async fn status_and_stop_report_not_found_for_unknown_user() {
    let portal = Arc::new(FakePortalAdapter::new(vec![]));
    let personalizer = Arc::new(FakePersonalizer::new());
    let (engine, _tracker) = build_engine(portal, personalizer);
    let user = UserId::new("ghost");
    assert_eq!(engine.status(&user), Err(EngineError::NotFound));
    assert_eq!(engine.stop(&user), Err(EngineError::NotFound));
}

#[tokio::test]
async fn happy_path_submits_a_matching_job() {
    let job = Job::builder()
        .id("j1")
        .title("Go Engineer")
        .company("GoodCo")
        .remote(true)
        .description("Go backend engineer")
        .requirements(vec!["Go".into()])
        .build();
    let portal = Arc::new(FakePortalAdapter::new(vec![job.clone()]));
    let personalizer = Arc::new(FakePersonalizer::new());
    personalizer.script_grounded("j1", "Go", "b1");
    let (engine, tracker) = build_engine(portal.clone(), personalizer);

    let user = UserId::new("u1");
    let profile = oj_core::test_support::profile_with_bullet("b1", "Built X in Go", &["Go"]);
    let policy = Policy::builder().min_match_threshold(0).build();
    engine.start(user.clone(), profile, policy).unwrap();

    let snapshot = wait_until_terminal(&engine, &user).await;
    assert_eq!(snapshot.status, RunStatus::Completed);
    assert_eq!(snapshot.submitted_count, 1);
    assert_eq!(snapshot.failed_count, 0);
    assert_eq!(snapshot.skipped_count, 0);

    let record = tracker.get(&user, &JobId::new("j1")).unwrap();
    assert_eq!(record.status, ApplicationStatus::Submitted);
    assert!(record.confirmation_id.is_some());
    assert_eq!(portal.submit_call_count(&JobId::new("j1")), 1);
}

#[tokio::test]
async fn blocked_company_job_is_never_submitted() {
    let job = Job::builder()
        .id("j1")
        .company("AcmeCorp")
        .description("Go backend engineer")
        .requirements(vec!["Go".into()])
        .build();
    let portal = Arc::new(FakePortalAdapter::new(vec![job.clone()]));
    let personalizer = Arc::new(FakePersonalizer::new());
    let (engine, tracker) = build_engine(portal.clone(), personalizer);

    let user = UserId::new("u1");
    let profile = oj_core::test_support::profile_with_bullet("b1", "Built X in Go", &["Go"]);
    let policy = Policy::builder()
        .min_match_threshold(0)
        .blocked_companies(["AcmeCorp".to_string()].into())
        .build();
    engine.start(user.clone(), profile, policy).unwrap();

    let snapshot = wait_until_terminal(&engine, &user).await;
    assert_eq!(snapshot.submitted_count, 0);
    assert_eq!(portal.submit_call_count(&JobId::new("j1")), 0);
    // The ranker excludes blocked companies outright, so the job never even
    // reaches the apply queue — no tracker record at all.
    assert!(tracker.get(&user, &JobId::new("j1")).is_none());
}

#[tokio::test]
async fn below_threshold_job_is_skipped_not_submitted() {
    let job = Job::builder()
        .id("j1")
        .description("totally unrelated posting about something else")
        .build();
    let portal = Arc::new(FakePortalAdapter::new(vec![job.clone()]));
    let personalizer = Arc::new(FakePersonalizer::new());
    let (engine, tracker) = build_engine(portal.clone(), personalizer);

    let user = UserId::new("u1");
    let profile = oj_core::test_support::profile_with_bullet("b1", "Built X in Go", &["Go"]);
    // Only a perfect semantic+coverage match could reach 100; this job
    // shares no vocabulary and no requirements with the profile.
    let policy = Policy::builder().min_match_threshold(100).build();
    engine.start(user.clone(), profile, policy).unwrap();

    let snapshot = wait_until_terminal(&engine, &user).await;
    assert_eq!(snapshot.submitted_count, 0);
    assert_eq!(snapshot.skipped_count, 1);
    assert_eq!(portal.submit_call_count(&JobId::new("j1")), 0);

    let record = tracker.get(&user, &JobId::new("j1")).unwrap();
    assert_eq!(record.status, ApplicationStatus::Skipped);
    assert_eq!(record.error.as_deref(), Some("below_threshold"));
}

#[tokio::test]
async fn ungrounded_claim_prevents_submission() {
    let job = Job::builder()
        .id("j1")
        .description("Go backend engineer")
        .requirements(vec!["Go".into()])
        .build();
    let portal = Arc::new(FakePortalAdapter::new(vec![job.clone()]));
    let personalizer = Arc::new(FakePersonalizer::new());
    personalizer.script_grounded("j1", "Python", "b_unknown");
    let (engine, tracker) = build_engine(portal.clone(), personalizer);

    let user = UserId::new("u1");
    let profile = oj_core::test_support::profile_with_bullet("b1", "Built X in Go", &["Go"]);
    let policy = Policy::builder().min_match_threshold(0).build();
    engine.start(user.clone(), profile, policy).unwrap();

    let snapshot = wait_until_terminal(&engine, &user).await;
    assert_eq!(snapshot.submitted_count, 0);
    assert_eq!(snapshot.skipped_count, 1);
    assert_eq!(portal.submit_call_count(&JobId::new("j1")), 0);

    let record = tracker.get(&user, &JobId::new("j1")).unwrap();
    assert_eq!(record.status, ApplicationStatus::Skipped);
    assert_eq!(record.error.as_deref(), Some("ungrounded_claim"));
}

#[tokio::test]
async fn stop_called_immediately_after_start_prevents_any_submission() {
    let jobs = vec![
        Job::builder().id("j1").description("Go backend engineer").requirements(vec!["Go".into()]).build(),
        Job::builder().id("j2").description("Go backend engineer").requirements(vec!["Go".into()]).build(),
    ];
    let portal = Arc::new(FakePortalAdapter::new(jobs.clone()));
    let personalizer = Arc::new(FakePersonalizer::new());
    let (engine, _tracker) = build_engine(portal.clone(), personalizer);

    let user = UserId::new("u1");
    let profile = oj_core::test_support::profile_with_bullet("b1", "Built X in Go", &["Go"]);
    let policy = Policy::builder().min_match_threshold(0).build();
    engine.start(user.clone(), profile, policy).unwrap();
    engine.stop(&user).unwrap();

    let snapshot = wait_until_terminal(&engine, &user).await;
    assert_eq!(snapshot.status, RunStatus::Stopped);
    assert_eq!(snapshot.submitted_count, 0);
    assert_eq!(portal.submit_call_count(&JobId::new("j1")), 0);
    assert_eq!(portal.submit_call_count(&JobId::new("j2")), 0);
}
