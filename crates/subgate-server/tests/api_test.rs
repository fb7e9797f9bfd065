//! Integration tests for the subgate HTTP layer.
//!
//! These tests drive the full router in-process:
//! - subscription access control (invalid/disabled tokens)
//! - both render formats end to end
//! - admin Basic auth and the customer CRUD flow

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use subgate_config::Config;
use subgate_server::AppState;
use subgate_store::{CustomerManager, CustomerRecord, NewCustomer, Node, NodeGroup, RecordStore};
use tower::ServiceExt;

fn test_app(dir: &tempfile::TempDir) -> (Router, Arc<CustomerManager>) {
    let store = RecordStore::open(dir.path().join("customers.yml")).unwrap();
    let manager = Arc::new(CustomerManager::new(store));
    let config = Arc::new(Config::default());
    let app = subgate_server::router(AppState::new(Arc::clone(&manager), config));
    (app, manager)
}

fn alice_nodes() -> NodeGroup {
    NodeGroup {
        // base64("aes-256-gcm:pw1")
        primary: Node::new("ss://YWVzLTI1Ni1nY206cHcx@1.2.3.4:8388"),
        backup: Node::new("socks5://5.6.7.8:1080"),
    }
}

fn create_alice(manager: &CustomerManager) -> CustomerRecord {
    manager.create(NewCustomer::new("Alice", alice_nodes())).unwrap()
}

fn basic_auth() -> String {
    format!("Basic {}", STANDARD.encode("admin:changeme"))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth());
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn health_and_root_respond() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(&dir);

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["service"], "subgate");
}

#[tokio::test]
async fn unknown_token_is_forbidden_for_both_formats() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(&dir);

    for format in ["v2rayn", "clash"] {
        let (status, _) = send(&app, get(&format!("/s/nope/{format}"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "format {format}");
    }
}

#[tokio::test]
async fn disabled_customer_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let (app, manager) = test_app(&dir);
    let record = create_alice(&manager);
    manager
        .update(
            &record.token,
            &subgate_store::CustomerPatch {
                enabled: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    let (status, _) = send(&app, get(&format!("/s/{}/v2rayn", record.token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn v2rayn_subscription_renders_base64_lines() {
    let dir = tempfile::tempdir().unwrap();
    let (app, manager) = test_app(&dir);
    let record = create_alice(&manager);

    let response = app
        .clone()
        .oneshot(get(&format!("/s/{}/v2rayn", record.token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let decoded = STANDARD.decode(&body[..]).unwrap();
    let text = String::from_utf8(decoded).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("#Alice-primary-accelerated"));
    assert!(lines[1].contains("#Alice-backup-direct"));
}

#[tokio::test]
async fn clash_subscription_renders_yaml_document() {
    let dir = tempfile::tempdir().unwrap();
    let (app, manager) = test_app(&dir);
    let record = create_alice(&manager);

    let (status, body) = send(&app, get(&format!("/s/{}/clash", record.token))).await;
    assert_eq!(status, StatusCode::OK);

    let doc: serde_yaml::Value = serde_yaml::from_slice(&body).unwrap();
    assert_eq!(doc["proxies"].as_sequence().unwrap().len(), 2);
    assert_eq!(doc["mode"], serde_yaml::Value::from("rule"));
}

#[tokio::test]
async fn clash_with_no_renderable_proxy_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (app, manager) = test_app(&dir);
    let record = manager
        .create(NewCustomer::new(
            "Opaque",
            NodeGroup {
                primary: Node::new("vless://uuid@host:443"),
                backup: Node::new("vless://uuid@other:443"),
            },
        ))
        .unwrap();

    let (status, _) = send(&app, get(&format!("/s/{}/clash", record.token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The aggregated format still renders raw links.
    let (status, _) = send(&app, get(&format!("/s/{}/v2rayn", record.token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_requires_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(&dir);

    let (status, _) = send(&app, get("/admin/customers")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/admin/customers")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("admin:wrong")),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_customer_crud_flow() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(&dir);

    // Create.
    let (status, body) = send(
        &app,
        admin_request(
            "POST",
            "/admin/customers",
            Some(serde_json::json!({
                "name": "Alice",
                "nodes": {
                    "primary": { "share": "ss://YWVzLTI1Ni1nY206cHcx@1.2.3.4:8388" },
                    "backup": { "share": "socks5://5.6.7.8:1080" },
                },
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let token = created["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 32);
    assert!(
        created["subscribe_urls"]["v2rayn"]
            .as_str()
            .unwrap()
            .ends_with(&format!("/s/{token}/v2rayn"))
    );

    // List includes the new customer.
    let (status, body) = send(&app, admin_request("GET", "/admin/customers", None)).await;
    assert_eq!(status, StatusCode::OK);
    let list: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Alice");
    assert_eq!(list[0]["has_override"], false);

    // Patch only the remark.
    let (status, body) = send(
        &app,
        admin_request(
            "PATCH",
            &format!("/admin/customers/{token}"),
            Some(serde_json::json!({ "remark": "vip" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated["remark"], "vip");
    assert_eq!(updated["name"], "Alice");

    // Set an override, then clear it.
    let (status, body) = send(
        &app,
        admin_request(
            "POST",
            &format!("/admin/customers/{token}/override"),
            Some(serde_json::json!({
                "primary": { "share": "ss://b3ZlcnJpZGU6cHc=@9.9.9.9:8388" },
                "note": "upstream outage",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let with_override: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(with_override["override"]["note"], "upstream outage");

    let (status, _) = send(
        &app,
        admin_request("DELETE", &format!("/admin/customers/{token}/override"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Empty override is rejected.
    let (status, _) = send(
        &app,
        admin_request(
            "POST",
            &format!("/admin/customers/{token}/override"),
            Some(serde_json::json!({ "note": "nothing set" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Rotate: the new token works, the old one stops.
    let (status, body) = send(
        &app,
        admin_request("POST", &format!("/admin/customers/{token}/rotate"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rotated: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let new_token = rotated["new_token"].as_str().unwrap().to_string();
    assert_ne!(new_token, token);

    let (status, _) = send(&app, get(&format!("/s/{token}/v2rayn"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, get(&format!("/s/{new_token}/v2rayn"))).await;
    assert_eq!(status, StatusCode::OK);

    // Delete, then a second delete is 404.
    let (status, _) = send(
        &app,
        admin_request("DELETE", &format!("/admin/customers/{new_token}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        admin_request("DELETE", &format!("/admin/customers/{new_token}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_get_missing_customer_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(&dir);

    let (status, _) = send(&app, admin_request("GET", "/admin/customers/missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
