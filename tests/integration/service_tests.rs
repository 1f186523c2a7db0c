//! HTTP job service client tests

use super::service_config;
use crawl_orchestrator::{CrawlService, HttpCrawlService, JobRequest, Region, RegionCrawlRequest};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_status_decodes_service_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_running": false,
            "last_result": {"success": true, "prefecture": "北海道", "max_pages": 10, "force": false},
            "last_error": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpCrawlService::new(&service_config(&server.uri())).unwrap();
    let status = service.status().await.unwrap();

    assert!(!status.is_running);
    assert_eq!(status.success().and_then(|r| r.count), None);
    assert!(status.success().is_some());
    assert_eq!(status.error_text(), None);
}

#[tokio::test]
async fn test_status_without_running_flag_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"last_error": "boom"})))
        .mount(&server)
        .await;

    let service = HttpCrawlService::new(&service_config(&server.uri())).unwrap();
    let err = service.status().await.unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("/api/crawl/status"));
}

#[tokio::test]
async fn test_trigger_posts_json_with_user_agent() {
    let server = MockServer::start().await;
    let config = service_config(&server.uri());

    Mock::given(method("POST"))
        .and(path("/api/crawl/run"))
        .and(header("user-agent", config.user_agent.as_str()))
        .and(body_json(json!({
            "prefectures": ["沖縄県"],
            "max_pages": 2,
            "force": true,
            "keyword": "介護"
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "status": "started",
            "message": "started"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpCrawlService::new(&config).unwrap();
    let request: JobRequest = RegionCrawlRequest::new(Region::parse("沖縄県").unwrap(), 2)
        .unwrap()
        .with_force(true)
        .with_keyword("介護")
        .into();

    let ack = service.trigger(&request).await.unwrap();
    assert!(ack.is_started());
    assert_eq!(ack.message, "started");
    assert_eq!(ack.http_status, Some(202));
}

#[tokio::test]
async fn test_base_url_with_path_resolves_endpoints_from_root() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/crawl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_running": true})))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/dashboard/", server.uri());
    let service = HttpCrawlService::new(&service_config(&base)).unwrap();

    assert!(service.status().await.unwrap().is_running);
}
