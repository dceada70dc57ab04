//! Integration tests against a mock Torque API server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use torque::client::TorqueClient;
use torque::commands::sb::SandboxesCommand;
use torque::errors::ClientError;
use torque::output::Payload;
use torque::resources::blueprints::BlueprintsManager;
use torque::resources::sandboxes::{SandboxesManager, StartRequest};

async fn client_for(server: &MockServer) -> TorqueClient {
    TorqueClient::with_base_url(&format!("{}/api/", server.uri()), "test_space", "test_token")
        .unwrap()
}

fn argv(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

#[tokio::test]
async fn blueprint_list_parses_flat_and_wrapped_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/spaces/test_space/blueprints"))
        .and(header("Authorization", "Bearer test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "flat-bp",
                "url": "https://example.com/flat",
                "enabled": true,
                "description": "flat shape"
            },
            {
                "details": {
                    "blueprint_name": "wrapped-bp",
                    "url": "https://example.com/wrapped"
                }
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let manager = BlueprintsManager::new(client_for(&server).await);
    let blueprints = manager.list().await.unwrap();

    assert_eq!(blueprints.len(), 2);
    assert_eq!(blueprints[0].name, "flat-bp");
    assert_eq!(blueprints[0].description, "flat shape");
    assert_eq!(blueprints[1].name, "wrapped-bp");
    assert!(blueprints[1].enabled);
}

#[tokio::test]
async fn blueprint_get_reads_the_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/spaces/test_space/catalog/my-bp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "my-bp",
            "url": "https://example.com/my-bp",
            "enabled": false
        })))
        .expect(2)
        .mount(&server)
        .await;

    let manager = BlueprintsManager::new(client_for(&server).await);
    let blueprint = manager.get("my-bp").await.unwrap();

    assert_eq!(blueprint.name, "my-bp");
    assert!(!blueprint.enabled);

    let raw = manager.get_detailed("my-bp").await.unwrap();
    assert_eq!(raw["url"], "https://example.com/my-bp");
}

#[tokio::test]
async fn blueprint_validate_posts_source_and_collects_issues() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/spaces/test_space/validations/blueprints"))
        .and(body_partial_json(json!({
            "blueprint_name": "my-bp",
            "type": "sandbox",
            "source": {"branch": "dev", "commit": "abc123"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [
                {"name": "Blueprint syntax", "message": "bad yaml"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = BlueprintsManager::new(client_for(&server).await);
    let result = manager.validate("my-bp", Some("dev"), Some("abc123")).await.unwrap();

    assert!(!result.is_valid());
    assert_eq!(result.issues[0].name, "Blueprint syntax");
    assert_eq!(result.issues[0].message, "bad yaml");
}

#[tokio::test]
async fn validate_commit_without_branch_sends_no_request() {
    let server = MockServer::start().await;

    let manager = BlueprintsManager::new(client_for(&server).await);
    let err = manager.validate("my-bp", None, Some("abc123")).await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn sandbox_list_passes_filter_and_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/spaces/test_space/sandboxes"))
        .and(query_param("count", "25"))
        .and(query_param("filter", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "sb-1", "name": "one", "blueprint_name": "bp", "sandbox_status": "Active"},
            {"id": "sb-2", "name": "two", "blueprint_name": "bp", "sandbox_status": "Ended"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let manager = SandboxesManager::new(client_for(&server).await);
    let sandboxes = manager.list("all", 25).await.unwrap();

    assert_eq!(sandboxes.len(), 2);
    assert_eq!(sandboxes[1].status, "Ended");
}

#[tokio::test]
async fn sandbox_start_posts_request_and_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/spaces/test_space/sandboxes"))
        .and(body_partial_json(json!({
            "sandbox_name": "demo-dev-Aug30",
            "blueprint_name": "demo",
            "duration": "PT120M",
            "source": {"branch": "dev", "commit": ""}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "sb-new"})))
        .expect(1)
        .mount(&server)
        .await;

    let manager = SandboxesManager::new(client_for(&server).await);
    let request = StartRequest {
        name: "demo-dev-Aug30".to_string(),
        blueprint_name: "demo".to_string(),
        duration_minutes: Some(120),
        branch: Some("dev".to_string()),
        ..Default::default()
    };

    assert_eq!(manager.start(&request).await.unwrap(), "sb-new");
}

#[tokio::test]
async fn sandbox_end_issues_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/spaces/test_space/sandboxes/sb-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let manager = SandboxesManager::new(client_for(&server).await);
    manager.end("sb-1").await.unwrap();
}

#[tokio::test]
async fn error_status_surfaces_as_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/spaces/test_space/sandboxes/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let manager = SandboxesManager::new(client_for(&server).await);
    let err = manager.get("missing").await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status } if status.as_u16() == 404));
}

#[tokio::test]
async fn long_non_ascii_error_body_is_handled() {
    let server = MockServer::start().await;
    // Multi-byte character straddling the log-truncation point.
    let body = format!("{}é{}", "a".repeat(199), "x".repeat(50));
    Mock::given(method("GET"))
        .and(path("/api/spaces/test_space/sandboxes/sb-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string(body))
        .mount(&server)
        .await;

    let manager = SandboxesManager::new(client_for(&server).await);
    let err = manager.get("sb-1").await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status } if status.as_u16() == 500));
}

#[tokio::test]
async fn sandbox_status_command_reports_the_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/spaces/test_space/sandboxes/sb-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sb-1",
            "name": "demo",
            "blueprint_name": "demo-bp",
            "sandbox_status": "Active"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let command = SandboxesCommand::new(&argv("sb status sb-1"), client_for(&server).await).unwrap();
    let (success, payload) = command.execute().await.unwrap();

    assert!(success);
    assert!(matches!(payload, Payload::Text(ref text) if text == "Active"));
}

#[tokio::test]
async fn sandbox_list_command_hides_ended_sandboxes_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/spaces/test_space/sandboxes"))
        .and(query_param("filter", "my"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "sb-1", "name": "one", "blueprint_name": "bp", "sandbox_status": "Active"},
            {"id": "sb-2", "name": "two", "blueprint_name": "bp", "sandbox_status": "Ended"}
        ])))
        .mount(&server)
        .await;

    let command = SandboxesCommand::new(&argv("sb list"), client_for(&server).await).unwrap();
    let (success, payload) = command.execute().await.unwrap();
    assert!(success);
    let Payload::Many(items) = payload else {
        panic!("expected a list payload");
    };
    assert_eq!(items.len(), 1);

    let command =
        SandboxesCommand::new(&argv("sb list --show-ended"), client_for(&server).await).unwrap();
    let (_, payload) = command.execute().await.unwrap();
    let Payload::Many(items) = payload else {
        panic!("expected a list payload");
    };
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn failed_call_degrades_to_generic_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/spaces/test_space/blueprints"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let command = torque::commands::bp::BlueprintsCommand::new(
        &argv("bp list"),
        client_for(&server).await,
    )
    .unwrap();

    // Server errors are logged, not propagated; the command just fails.
    let (success, payload) = command.execute().await.unwrap();
    assert!(!success);
    assert!(matches!(payload, Payload::Empty));
}
