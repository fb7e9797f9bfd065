//! Subscription read-side handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use subgate_render::{render_clash, render_v2rayn};
use subgate_store::{CustomerManager, CustomerRecord, mask_token};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
enum Format {
    V2rayn,
    Clash,
}

impl Format {
    fn as_str(self) -> &'static str {
        match self {
            Format::V2rayn => "v2rayn",
            Format::Clash => "clash",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Format::V2rayn => "text/plain; charset=utf-8",
            Format::Clash => "text/yaml; charset=utf-8",
        }
    }
}

pub async fn v2rayn(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    serve(state, token, Format::V2rayn, headers, connect_info).await
}

pub async fn clash(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    serve(state, token, Format::Clash, headers, connect_info).await
}

async fn serve(
    state: AppState,
    token: String,
    format: Format,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let client_ip = client_ip(&headers, connect_info);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let result = render(&state.manager, &token, format).await;
    let (status, customer) = match &result {
        Ok((_, name)) => (StatusCode::OK, Some(name.as_str())),
        Err((e, name)) => (e.status_code(), name.as_deref()),
    };
    log_access(&token, customer, &client_ip, &user_agent, format, status);

    match result {
        Ok((body, _)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, format.content_type())],
            body,
        )
            .into_response(),
        Err((e, _)) => e.into_response(),
    }
}

/// Resolve the token and render; returns the customer name alongside both
/// outcomes so the access log can attribute the request.
async fn render(
    manager: &Arc<CustomerManager>,
    token: &str,
    format: Format,
) -> Result<(String, String), (ApiError, Option<String>)> {
    let record = lookup(manager, token).await.map_err(|e| (e, None))?;
    let Some(record) = record else {
        return Err((ApiError::Forbidden, None));
    };
    let name = record.name.clone();
    if !record.enabled {
        return Err((ApiError::Forbidden, Some(name)));
    }

    let body = match format {
        Format::V2rayn => render_v2rayn(&record),
        Format::Clash => render_clash(&record).map_err(|e| (ApiError::from(e), Some(name.clone())))?,
    };
    Ok((body, name))
}

/// Store lookups hold a file lock that may block, so they run on the
/// blocking pool.
async fn lookup(
    manager: &Arc<CustomerManager>,
    token: &str,
) -> Result<Option<CustomerRecord>, ApiError> {
    let manager = Arc::clone(manager);
    let token = token.to_string();
    tokio::task::spawn_blocking(move || manager.get(&token))
        .await
        .map_err(|_| ApiError::Internal)?
        .map_err(ApiError::from)
}

/// Client IP, preferring reverse-proxy headers over the peer address.
fn client_ip(headers: &HeaderMap, connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn log_access(
    token: &str,
    customer: Option<&str>,
    client_ip: &str,
    user_agent: &str,
    format: Format,
    status: StatusCode,
) {
    // Truncate pathological user agents; the log is line-oriented.
    let ua: String = user_agent.chars().take(100).collect();
    info!(
        token = %mask_token(token),
        customer = customer.unwrap_or("n/a"),
        ip = %client_ip,
        format = format.as_str(),
        status = status.as_u16(),
        user_agent = %ua,
        "subscription access"
    );
}
