//! Admin write-side handlers.
//!
//! Every handler verifies HTTP Basic credentials before touching the
//! store. Store operations run on the blocking pool because they hold a
//! file lock.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use subgate_store::{
    CustomerManager, CustomerPatch, CustomerRecord, NewCustomer, Node, OverrideNodes, StoreError,
    SubscribeUrls,
};
use tracing::info;

use crate::auth::verify_basic;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreateCustomerResponse {
    token: String,
    name: String,
    subscribe_urls: SubscribeUrls,
}

#[derive(Debug, Serialize)]
pub struct CustomerListItem {
    token: String,
    name: String,
    enabled: bool,
    has_override: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remark: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    subscribe_urls: SubscribeUrls,
}

/// Full record plus derived URLs.
#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    record: CustomerRecord,
    subscribe_urls: SubscribeUrls,
}

#[derive(Debug, Serialize)]
pub struct RotateTokenResponse {
    old_token: String,
    new_token: String,
    subscribe_urls: SubscribeUrls,
}

#[derive(Debug, Deserialize)]
pub struct SetOverrideRequest {
    #[serde(default)]
    primary: Option<Node>,
    #[serde(default)]
    backup: Option<Node>,
    #[serde(default)]
    note: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewCustomer>,
) -> Result<(StatusCode, Json<CreateCustomerResponse>), ApiError> {
    verify_basic(&headers, &state.config.admin)?;

    let record = blocking(&state.manager, move |m| m.create(request)).await?;
    info!(customer = %record.name, "admin created customer");

    let subscribe_urls = SubscribeUrls::new(&state.config.server.base_url, &record.token);
    Ok((
        StatusCode::CREATED,
        Json(CreateCustomerResponse {
            token: record.token,
            name: record.name,
            subscribe_urls,
        }),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<CustomerListItem>>, ApiError> {
    verify_basic(&headers, &state.config.admin)?;

    let records = blocking(&state.manager, |m| m.list()).await?;
    let base_url = &state.config.server.base_url;
    let items = records
        .into_iter()
        .map(|r| CustomerListItem {
            has_override: r.has_override(),
            subscribe_urls: SubscribeUrls::new(base_url, &r.token),
            token: r.token,
            name: r.name,
            enabled: r.enabled,
            ip_source: r.ip_source,
            expires_at: r.expires_at,
            remark: r.remark,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
        .collect();
    Ok(Json(items))
}

pub async fn get(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CustomerDetail>, ApiError> {
    verify_basic(&headers, &state.config.admin)?;

    let record = blocking(&state.manager, move |m| m.get(&token))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(detail(&state, record)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<CustomerDetail>, ApiError> {
    verify_basic(&headers, &state.config.admin)?;

    let record = blocking(&state.manager, move |m| m.update(&token, &patch)).await?;
    info!(customer = %record.name, "admin updated customer");
    Ok(Json(detail(&state, record)))
}

pub async fn rotate(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RotateTokenResponse>, ApiError> {
    verify_basic(&headers, &state.config.admin)?;

    let rotated = blocking(&state.manager, move |m| m.rotate(&token)).await?;
    info!(customer = %rotated.record.name, "admin rotated token");

    let subscribe_urls = SubscribeUrls::new(&state.config.server.base_url, &rotated.new_token);
    Ok(Json(RotateTokenResponse {
        old_token: rotated.old_token,
        new_token: rotated.new_token,
        subscribe_urls,
    }))
}

pub async fn set_override(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    Json(request): Json<SetOverrideRequest>,
) -> Result<Json<CustomerDetail>, ApiError> {
    verify_basic(&headers, &state.config.admin)?;

    let override_nodes = OverrideNodes {
        primary: request.primary,
        backup: request.backup,
        note: request.note,
    };
    let record =
        blocking(&state.manager, move |m| m.set_override(&token, override_nodes)).await?;
    info!(customer = %record.name, "admin set override");
    Ok(Json(detail(&state, record)))
}

pub async fn clear_override(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CustomerDetail>, ApiError> {
    verify_basic(&headers, &state.config.admin)?;

    let record = blocking(&state.manager, move |m| m.clear_override(&token)).await?;
    info!(customer = %record.name, "admin cleared override");
    Ok(Json(detail(&state, record)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    verify_basic(&headers, &state.config.admin)?;

    let found = blocking(&state.manager, move |m| m.delete(&token)).await?;
    if !found {
        return Err(ApiError::NotFound);
    }
    info!("admin deleted customer");
    Ok(Json(serde_json::json!({
        "message": "customer deleted successfully"
    })))
}

fn detail(state: &AppState, record: CustomerRecord) -> CustomerDetail {
    let subscribe_urls = SubscribeUrls::new(&state.config.server.base_url, &record.token);
    CustomerDetail {
        record,
        subscribe_urls,
    }
}

/// Run a store operation on the blocking pool.
async fn blocking<T, F>(manager: &Arc<CustomerManager>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&CustomerManager) -> Result<T, StoreError> + Send + 'static,
{
    let manager = Arc::clone(manager);
    tokio::task::spawn_blocking(move || f(&manager))
        .await
        .map_err(|_| ApiError::Internal)?
        .map_err(ApiError::from)
}
