use super::*;
use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ApiState {
    api_keys: Arc<Mutex<Vec<Option<String>>>>,
    batch_deletes: Arc<Mutex<Vec<BatchDeleteRequest>>>,
    deleted: Arc<Mutex<Vec<String>>>,
}

impl ApiState {
    async fn record_key(&self, headers: &HeaderMap) {
        let key = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.api_keys.lock().await.push(key);
    }
}

fn acme() -> serde_json::Value {
    json!({"company_code": "ACME", "company_name": "Acme Corp", "no_printing": false})
}

async fn list_companies(State(state): State<ApiState>, headers: HeaderMap) -> impl IntoResponse {
    state.record_key(&headers).await;
    Json(json!({"success": true, "data": [acme(), {"company_code": "GLOBEX", "company_name": "Globex"}]}))
}

async fn create_company(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<Record>,
) -> axum::response::Response {
    state.record_key(&headers).await;
    if payload.get("company_code") == Some(&json!("ACME")) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"success": false, "message": "duplicate code"})),
        )
            .into_response();
    }
    let mut created = payload;
    created.insert("created_by".into(), json!("api"));
    (StatusCode::CREATED, Json(json!({"success": true, "data": created}))).into_response()
}

async fn get_company(Path(id): Path<String>) -> axum::response::Response {
    match id.as_str() {
        "ACME" => Json(json!({"success": true, "data": acme()})).into_response(),
        "HTML" => (
            StatusCode::BAD_GATEWAY,
            Html("<html><head><title>502 Bad Gateway</title></head></html>"),
        )
            .into_response(),
        "BROKEN" => (StatusCode::OK, "not json at all").into_response(),
        "EMPTY" => StatusCode::OK.into_response(),
        "A/B" => Json(json!({"success": true, "data": {"company_code": "A/B"}})).into_response(),
        _ => (StatusCode::NOT_FOUND, "").into_response(),
    }
}

async fn update_company(Path(id): Path<String>, Json(payload): Json<Record>) -> impl IntoResponse {
    let mut updated = payload;
    updated.insert("company_code".into(), json!(id));
    updated.insert("updated_by".into(), json!("api"));
    Json(json!({"success": true, "message": "updated", "data": updated}))
}

async fn delete_company(State(state): State<ApiState>, Path(id): Path<String>) -> impl IntoResponse {
    state.deleted.lock().await.push(id.clone());
    Json(json!({"success": true, "message": format!("deleted {id}")}))
}

async fn delete_companies(
    State(state): State<ApiState>,
    Json(request): Json<BatchDeleteRequest>,
) -> impl IntoResponse {
    state.batch_deletes.lock().await.push(request);
    Json(json!({"success": true}))
}

async fn spawn_company_server() -> anyhow::Result<(String, ApiState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ApiState::default();
    let app = Router::new()
        .route(
            "/api/companies",
            get(list_companies)
                .post(create_company)
                .delete(delete_companies),
        )
        .route(
            "/api/companies/:id",
            get(get_company).put(update_company).delete(delete_company),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api"), state))
}

fn client_for(base_url: &str) -> CompanyApiClient {
    let config = ApiConfig::new(base_url)
        .expect("config")
        .with_api_key("secret-key")
        .with_timeout(Duration::from_secs(5));
    CompanyApiClient::new(config).expect("client")
}

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().expect("object record")
}

#[tokio::test]
async fn list_companies_sends_api_key_and_parses_envelope() {
    let (base_url, state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    let response = client.list_companies().await.expect("list");
    assert!(response.success);
    let companies = response.data.expect("companies");
    assert_eq!(companies.len(), 2);
    assert_eq!(companies[0]["company_code"], json!("ACME"));

    assert_eq!(
        state.api_keys.lock().await.as_slice(),
        &[Some("secret-key".to_string())]
    );
}

#[tokio::test]
async fn create_company_returns_created_record() {
    let (base_url, _state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    let response = client
        .create_company(&record(json!({"company_code": "NEWCO", "company_name": "NewCo"})))
        .await
        .expect("create");
    assert!(response.success);
    let created = response.data.expect("created");
    assert_eq!(created["company_code"], json!("NEWCO"));
    assert_eq!(created["created_by"], json!("api"));
}

#[tokio::test]
async fn rejected_json_error_body_surfaces_its_message() {
    let (base_url, _state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    let response = client
        .create_company(&record(acme()))
        .await
        .expect("transport ok");
    assert!(!response.success);
    assert_eq!(response.message.as_deref(), Some("duplicate code"));
    assert_eq!(response.data, None);
}

#[tokio::test]
async fn html_error_page_surfaces_its_title() {
    let (base_url, _state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    let response = client.get_company(&"HTML".into()).await.expect("transport ok");
    assert!(!response.success);
    assert_eq!(response.message.as_deref(), Some("502 Bad Gateway"));
}

#[tokio::test]
async fn bare_error_status_falls_back_to_status_message() {
    let (base_url, _state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    let response = client.get_company(&"MISSING".into()).await.expect("transport ok");
    assert!(!response.success);
    assert_eq!(response.message.as_deref(), Some("API error: 404"));
}

#[tokio::test]
async fn non_json_success_body_is_reported_as_failure() {
    let (base_url, _state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    let response = client.get_company(&"BROKEN".into()).await.expect("transport ok");
    assert!(!response.success);
    assert_eq!(
        response.message.as_deref(),
        Some("Invalid JSON response from API")
    );
}

#[tokio::test]
async fn empty_success_body_is_success_without_data() {
    let (base_url, _state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    let response = client.get_company(&"EMPTY".into()).await.expect("transport ok");
    assert!(response.success);
    assert_eq!(response.data, None);
}

#[tokio::test]
async fn ids_are_sent_as_single_path_segments() {
    let (base_url, _state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    let response = client.get_company(&"A/B".into()).await.expect("get");
    assert!(response.success);
    assert_eq!(response.data.expect("company")["company_code"], json!("A/B"));
}

#[tokio::test]
async fn update_company_puts_to_the_company_url() {
    let (base_url, _state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    let response = client
        .update_company(&"ACME".into(), &record(json!({"company_name": "Acme Renamed"})))
        .await
        .expect("update");
    assert!(response.success);
    assert_eq!(response.message.as_deref(), Some("updated"));
    let updated = response.data.expect("updated");
    assert_eq!(updated["company_code"], json!("ACME"));
    assert_eq!(updated["company_name"], json!("Acme Renamed"));
}

#[tokio::test]
async fn collaborator_remove_uses_single_delete_endpoint() {
    let (base_url, state) = spawn_company_server().await.expect("spawn server");
    let client = client_for(&base_url);

    assert!(!client.supports_remove_batch());
    let response = client.remove(&"ACME".into()).await.expect("delete");
    assert!(response.success);
    assert_eq!(response.message.as_deref(), Some("deleted ACME"));
    assert_eq!(state.deleted.lock().await.as_slice(), &["ACME".to_string()]);
}

#[tokio::test]
async fn collaborator_batch_remove_posts_all_ids() {
    let (base_url, state) = spawn_company_server().await.expect("spawn server");
    let config = ApiConfig::new(&base_url)
        .expect("config")
        .with_batch_delete(true);
    let client = CompanyApiClient::new(config).expect("client");

    assert!(client.supports_remove_batch());
    let ids = vec![RecordId::from("ACME"), RecordId::from(42)];
    let response = client.remove_batch(&ids).await.expect("batch delete");
    assert!(response.success);
    assert_eq!(
        state.batch_deletes.lock().await.as_slice(),
        &[BatchDeleteRequest { ids }]
    );
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = client_for(&format!("http://{addr}"));
    let err = client.list_companies().await.expect_err("must fail");
    assert!(err.to_string().contains("failed to fetch companies"), "{err}");
}

#[test]
fn error_message_prefers_json_message_then_title() {
    assert_eq!(error_message(400, r#"{"message":"bad field"}"#), "bad field");
    assert_eq!(error_message(400, r#"{"error":"x"}"#), "API error: 400");
    assert_eq!(
        error_message(500, "<title> Internal Error </title>"),
        "Internal Error"
    );
    assert_eq!(error_message(503, ""), "API error: 503");
}
