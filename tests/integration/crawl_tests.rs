//! End-to-end orchestration tests against a mock job service

use super::{drain, fast_polling, orchestrator_for, service_config, settle};
use crawl_orchestrator::config::PollErrorPolicy;
use crawl_orchestrator::orchestrator::Phase;
use crawl_orchestrator::{
    CrawlOrchestrator, ExternalSiteCrawlRequest, HttpCrawlService, JobKind, JobRequest,
    NotificationKind, Region, RegionCrawlRequest, SubmitOutcome,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tokyo_request() -> JobRequest {
    RegionCrawlRequest::new(Region::parse("東京都").unwrap(), 10)
        .unwrap()
        .into()
}

/// Mounts a status mock answering `running` once, then `finished` forever
async fn mount_status_sequence(server: &MockServer, finished: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_running": true,
            "last_result": null,
            "last_error": null
        })))
        .up_to_n_times(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(finished))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_region_crawl_reports_count_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl/run"))
        .and(body_json(json!({
            "prefectures": ["東京都"],
            "max_pages": 10,
            "force": false,
            "keyword": ""
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "status": "started",
            "message": "クロールを開始しました"
        })))
        .expect(1)
        .mount(&server)
        .await;

    mount_status_sequence(
        &server,
        json!({
            "is_running": false,
            "last_result": {"success": true, "count": 87},
            "last_error": null
        }),
    )
    .await;

    let orchestrator = orchestrator_for(&server.uri());
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);
    orchestrator.on_complete(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut notifications = orchestrator.subscribe_notifications();

    let outcome = orchestrator.submit(tokyo_request()).await;
    match outcome {
        SubmitOutcome::Started(ack) => {
            assert!(ack.is_started());
            assert_eq!(ack.http_status, Some(202));
        }
        other => panic!("Expected Started, got {:?}", other),
    }

    let state = settle(&orchestrator).await;
    assert!(!state.running);
    assert_eq!(state.phase(), Phase::Idle);

    let received = drain(&mut notifications);
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].message(), "クロールを開始しました");

    let completed: Vec<_> = received
        .iter()
        .filter(|n| n.kind.is_completion())
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].kind, NotificationKind::Succeeded { count: Some(87) });
    assert!(completed[0].message().contains("87"));
    assert_eq!(completed[0].job, Some(JobKind::Region));
    assert_eq!(completions.load(Ordering::SeqCst), 1);

    // Further polls would re-report; give a stray poller time to misbehave
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(drain(&mut notifications).is_empty());
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_trigger_connection_failure_resets_immediately() {
    // Reserve a port, then free it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let orchestrator = orchestrator_for(&format!("http://127.0.0.1:{}", port));
    let mut notifications = orchestrator.subscribe_notifications();

    match orchestrator.submit(tokyo_request()).await {
        SubmitOutcome::Failed(e) => assert!(e.is_transport(), "unexpected error: {}", e),
        other => panic!("Expected Failed, got {:?}", other),
    }

    assert!(!orchestrator.is_running());

    let received = drain(&mut notifications);
    assert_eq!(received.len(), 1);
    assert!(matches!(
        received[0].kind,
        NotificationKind::TriggerFailed { .. }
    ));
    assert!(received[0].kind.is_error());
}

#[tokio::test]
async fn test_unreadable_ack_never_polls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl/run"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_running": true})))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&server.uri());

    let outcome = orchestrator.submit(tokyo_request()).await;
    assert!(matches!(outcome, SubmitOutcome::Failed(ref e) if e.is_transport()));
    assert!(!orchestrator.is_running());

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.verify().await;
}

#[tokio::test]
async fn test_concurrent_submits_send_one_trigger() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl/run"))
        .respond_with(
            ResponseTemplate::new(202)
                .set_body_json(json!({"status": "started", "message": "ok"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_running": true})))
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&server.uri());
    let request = tokyo_request();

    let (a, b, c) = tokio::join!(
        orchestrator.submit(request.clone()),
        orchestrator.submit(request.clone()),
        orchestrator.submit(request.clone()),
    );

    let outcomes = [a, b, c];
    assert_eq!(outcomes.iter().filter(|o| o.is_started()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, SubmitOutcome::Busy))
            .count(),
        2
    );

    // Still running: a later submit is ignored as well
    assert!(orchestrator.is_running());
    assert!(matches!(
        orchestrator.submit(request).await,
        SubmitOutcome::Busy
    ));

    orchestrator.shutdown().await;
    server.verify().await;
}

#[tokio::test]
async fn test_busy_service_ack_tracks_running_job() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl/run"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "message": "クローラーは既に実行中です"
        })))
        .mount(&server)
        .await;

    mount_status_sequence(
        &server,
        json!({"is_running": false, "last_result": null, "last_error": "timeout"}),
    )
    .await;

    let orchestrator = orchestrator_for(&server.uri());
    let mut notifications = orchestrator.subscribe_notifications();

    match orchestrator.submit(tokyo_request()).await {
        SubmitOutcome::Started(ack) => {
            assert!(!ack.is_started());
            assert_eq!(ack.http_status, Some(400));
        }
        other => panic!("Expected Started, got {:?}", other),
    }

    settle(&orchestrator).await;

    let received = drain(&mut notifications);
    assert_eq!(received.len(), 2);
    assert!(received[0].message().contains("既に実行中"));
    assert_eq!(
        received[1].kind,
        NotificationKind::RemoteError {
            error: "timeout".to_string()
        }
    );
    assert!(received[1].message().contains("timeout"));
}

#[tokio::test]
async fn test_external_site_crawl_failure_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl/indeed"))
        .and(body_json(json!({
            "keyword": "engineer",
            "location": "大阪府",
            "max_pages": 3
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "status": "started",
            "message": "Indeedクロールを開始しました"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Error detail only inside last_result
    mount_status_sequence(
        &server,
        json!({
            "is_running": false,
            "last_result": {"success": false, "error": "captcha"},
            "last_error": null
        }),
    )
    .await;

    let orchestrator = orchestrator_for(&server.uri());
    let mut notifications = orchestrator.subscribe_notifications();

    let request =
        ExternalSiteCrawlRequest::new(" engineer ", Region::parse("大阪府").unwrap(), 3).unwrap();
    assert!(orchestrator.submit(request).await.is_started());

    settle(&orchestrator).await;

    let received = drain(&mut notifications);
    let completion = received
        .iter()
        .find(|n| n.kind.is_completion())
        .expect("missing completion notification");
    assert_eq!(completion.message(), "Crawl failed: captcha");
    assert_eq!(completion.job, Some(JobKind::ExternalSite));
}

#[tokio::test]
async fn test_poll_failures_end_in_status_unknown() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl/run"))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({"status": "started", "message": ""})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(3)
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&server.uri());
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);
    orchestrator.on_complete(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut notifications = orchestrator.subscribe_notifications();

    assert!(orchestrator.submit(tokyo_request()).await.is_started());

    let state = settle(&orchestrator).await;
    assert_eq!(state.phase(), Phase::StatusUnknown);
    assert!(!state.running);
    assert_eq!(completions.load(Ordering::SeqCst), 0);

    let received = drain(&mut notifications);
    assert_eq!(received[0].message(), "Crawl request acknowledged");
    let last = received.last().unwrap();
    assert!(matches!(last.kind, NotificationKind::StatusUnknown { .. }));
    assert!(!received.iter().any(|n| n.kind.is_completion()));

    server.verify().await;
}

#[tokio::test]
async fn test_halt_policy_stalls_with_job_marked_running() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl/run"))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({"status": "started", "message": "ok"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpCrawlService::new(&service_config(&server.uri())).unwrap();
    let orchestrator =
        CrawlOrchestrator::new(Arc::new(service), fast_polling(PollErrorPolicy::Halt));

    assert!(orchestrator.submit(tokyo_request()).await.is_started());

    let state = settle(&orchestrator).await;
    assert_eq!(state.phase(), Phase::Stalled);
    assert!(orchestrator.is_running());

    // Stuck until restarted
    assert!(matches!(
        orchestrator.submit(tokyo_request()).await,
        SubmitOutcome::Busy
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.verify().await;
}

#[tokio::test]
async fn test_refresh_adopts_job_started_elsewhere() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    mount_status_sequence(
        &server,
        json!({
            "is_running": false,
            "last_result": {"success": true, "count": 3},
            "last_error": null
        }),
    )
    .await;

    let orchestrator = orchestrator_for(&server.uri());
    let mut notifications = orchestrator.subscribe_notifications();

    let status = orchestrator.refresh_status().await.unwrap();
    assert!(status.is_running);
    assert!(orchestrator.is_running());

    settle(&orchestrator).await;

    let received = drain(&mut notifications);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].kind, NotificationKind::Succeeded { count: Some(3) });
    assert_eq!(received[0].job, None);

    server.verify().await;
}

#[tokio::test]
async fn test_shutdown_stops_polling() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl/run"))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({"status": "started", "message": "ok"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_running": true})))
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&server.uri());
    let mut notifications = orchestrator.subscribe_notifications();

    assert!(orchestrator.submit(tokyo_request()).await.is_started());
    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.shutdown().await;

    let polled = server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), polled);

    assert!(matches!(
        orchestrator.submit(tokyo_request()).await,
        SubmitOutcome::ShutDown
    ));

    // Only the acknowledgement was published
    assert_eq!(drain(&mut notifications).len(), 1);
}
