// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// Public endpoints serve the dashboard, trigger refreshes and read the cached
// baskets, meters and history. Diagnostic endpoints (`/debug/*`,
// `/api/debug*`) expose raw broker traffic and require the `DebugAccess`
// extractor.
//
// Handlers never propagate errors as panics: broker failures come back as
// `(StatusCode, Json)` tuples.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::auth::DebugAccess;
use crate::app_state::{AppState, MeterReading};
use crate::broker::BrokerError;
use crate::catalog;
use crate::market_data::session::{self, format_ist, ist_now};
use crate::types::{Basket, Venue};

const DASHBOARD_HTML: &str = include_str!("../../static/index.html");

/// Cash token used by `/debug/fetch-test`.
const FETCH_TEST_TOKEN: &str = "1333";
/// Cash token used by `/api/debug`.
const RAW_QUOTE_TOKEN: &str = "1594";
/// Raw bodies longer than this are summarised or truncated.
const DEBUG_BODY_LIMIT: usize = 1000;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with tracing, CORS and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/", get(index))
        .route("/ping", get(ping))
        .route("/keepalive", get(keepalive))
        .route("/api/refresh-data", get(refresh_data))
        .route("/api/data/:kind", get(basket_data))
        .route("/api/meters", get(meters))
        .route("/api/chart-data", get(chart_data))
        // ── Diagnostics (admin token) ───────────────────────────────
        .route("/debug/simple", get(debug_simple))
        .route("/debug/auth", get(debug_auth))
        .route("/debug/fetch-test", get(debug_fetch_test))
        .route("/debug/dates", get(debug_dates))
        .route("/debug/historical-oi/:token", get(debug_historical_oi))
        .route("/api/debug", get(debug_quote))
        .route("/api/debug-pcr", get(debug_pcr))
        // ── Middleware & State ───────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn now_display() -> String {
    format_ist(&ist_now())
}

fn broker_failure(e: &BrokerError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}

// =============================================================================
// Dashboard & health
// =============================================================================

async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn ping() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": now_display(),
        "message": "Sentiment meter service is running",
    }))
}

async fn keepalive(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": now_display(),
        "app_name": "sentimeter",
        "has_auth_token": state.broker.has_session(),
        "has_market_data": state.has_data(),
        "last_update": state.last_update_display(),
        "uptime_secs": state.uptime_secs(),
    }))
}

// =============================================================================
// Refresh & cached data
// =============================================================================

async fn refresh_data(State(state): State<Arc<AppState>>) -> Response {
    info!("refresh requested");
    match state.refresh().await {
        Ok(summary) => {
            let mut counts = json!(summary.data_counts);
            counts["pcr_data"] = json!(summary.pcr_count);
            Json(json!({
                "status": "success",
                "message": "Data refreshed successfully",
                "timestamp": summary.timestamp,
                "data_counts": counts,
                "history_points": summary.history_points,
                "failures": summary.failures,
            }))
            .into_response()
        }
        Err(e) => {
            warn!(error = %e, "refresh aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": format!("Authentication failed: {e}"),
                })),
            )
                .into_response()
        }
    }
}

async fn basket_data(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Response {
    let Some(basket) = Basket::from_slug(&kind) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid data type" })),
        )
            .into_response();
    };

    let meter = match state.meter(basket) {
        Some(reading) => json!(reading),
        None => json!({}),
    };

    Json(json!({
        "data": state.records(basket),
        "meter": meter,
        "pcr_data": *state.pcr_data.read(),
        "last_update": state.last_update_display(),
    }))
    .into_response()
}

async fn meters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "nifty_meter": state.meter(Basket::NiftyFutures),
        "bank_meter": state.meter(Basket::BankFutures),
        "last_update": state.last_update_display(),
    }))
}

/// Read-only: history points are appended by the refresh cycle.
async fn chart_data(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let nifty = state
        .meter(Basket::NiftyFutures)
        .unwrap_or_else(|| MeterReading::from_score(0.0));
    let bank = state
        .meter(Basket::BankFutures)
        .unwrap_or_else(|| MeterReading::from_score(0.0));
    let (nifty_history, bank_history) = {
        let history = state.history.read();
        (history.nifty(), history.bank())
    };

    Json(json!({
        "status": "success",
        "nifty_futures_history": nifty_history,
        "bank_futures_history": bank_history,
        "current": {
            "nifty_meter": nifty.value,
            "bank_meter": bank.value,
            "nifty_impact": nifty.classification,
            "bank_impact": bank.classification,
            "timestamp": ist_now().format("%H:%M").to_string(),
        },
        "last_update": state.last_update_display(),
    }))
}

// =============================================================================
// Diagnostics (admin token)
// =============================================================================

async fn debug_simple(
    _access: DebugAccess,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let catalog_sizes: serde_json::Map<String, Value> = Basket::ALL
        .into_iter()
        .map(|b| (b.slug().to_string(), json!(b.catalog().len())))
        .collect();

    Json(json!({
        "status": "ok",
        "timestamp": now_display(),
        "catalog_sizes": catalog_sizes,
        "cached_counts": state.data_counts(),
        "credentials_present": state.broker.credentials_present(),
        "has_session": state.broker.has_session(),
        "historical_oi_enabled": state.config.historical_oi_enabled,
        "oi_fallback": state.config.oi_fallback,
        "recent_errors": *state.recent_errors.read(),
    }))
}

/// Forces a fresh login.
async fn debug_auth(
    _access: DebugAccess,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state.broker.clear_session();
    let result = state.broker.login().await;
    if let Err(e) = &result {
        state.push_error(format!("login: {e}"));
    }

    Json(json!({
        "status": "ok",
        "auth_successful": result.is_ok(),
        "error": result.err().map(|e| e.to_string()),
        "has_token": state.broker.has_session(),
        "token_length": state.broker.session_token_len(),
        "timestamp": now_display(),
    }))
}

async fn debug_fetch_test(
    _access: DebugAccess,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let entry: Vec<_> = catalog::NIFTY_50_STOCKS
        .iter()
        .filter(|(token, _)| *token == FETCH_TEST_TOKEN)
        .copied()
        .collect();
    let report = state.fetcher.fetch(&entry, Venue::Cash).await;

    Json(json!({
        "status": "ok",
        "tokens_sent": entry.len(),
        "items_returned": report.records.len(),
        "data": report.records,
        "failures": report.failures,
        "timestamp": now_display(),
    }))
}

async fn debug_dates(_access: DebugAccess) -> impl IntoResponse {
    let now = ist_now();
    let mut day = now.date_naive();
    let mut previous = Vec::new();
    for _ in 0..3 {
        day = session::previous_trading_day(day);
        previous.push(day.format("%A, %Y-%m-%d").to_string());
    }

    Json(json!({
        "today": now.format("%A, %Y-%m-%d %H:%M:%S").to_string(),
        "previous_trading_day": previous.first(),
        "previous_trading_days": previous,
    }))
}

async fn debug_historical_oi(
    _access: DebugAccess,
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Response {
    if let Err(e) = state.broker.ensure_session().await {
        return broker_failure(&e);
    }

    let day = session::previous_trading_day(ist_now().date_naive());
    let (from, to) = session::session_window(day);
    let (historical_oi, error) = match state.broker.historical_oi(&token, &from, &to).await {
        Ok(oi) => (oi, None),
        Err(e) => (None, Some(e.to_string())),
    };

    Json(json!({
        "token": token,
        "from": from,
        "to": to,
        "historical_oi": historical_oi,
        "error": error,
    }))
    .into_response()
}

/// Raw single-token quote call.
async fn debug_quote(
    _access: DebugAccess,
    State(state): State<Arc<AppState>>,
) -> Response {
    if let Err(e) = state.broker.ensure_session().await {
        return broker_failure(&e);
    }

    match state.broker.quote_raw(Venue::Cash, &[RAW_QUOTE_TOKEN]).await {
        Ok(raw) => Json(json!({
            "status_code": raw.status,
            "response": summarise_quote_body(raw.status, &raw.body),
            "auth_token_present": state.broker.has_session(),
        }))
        .into_response(),
        Err(e) => broker_failure(&e),
    }
}

async fn debug_pcr(_access: DebugAccess, State(state): State<Arc<AppState>>) -> Response {
    if let Err(e) = state.broker.ensure_session().await {
        return broker_failure(&e);
    }

    match state.broker.pcr_raw().await {
        Ok(raw) => Json(json!({
            "status_code": raw.status,
            "response_text": truncate_text(&raw.body, DEBUG_BODY_LIMIT),
            "headers_sent": "present but not shown",
        }))
        .into_response(),
        Err(e) => broker_failure(&e),
    }
}

// =============================================================================
// Body shaping
// =============================================================================

/// JSON bodies from a 200 response over the limit collapse to
/// status, message and fetched count. Anything else is returned as text.
fn summarise_quote_body(status: u16, body: &str) -> Value {
    if status != 200 {
        return Value::String(truncate_text(body, DEBUG_BODY_LIMIT));
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) if value.to_string().len() > DEBUG_BODY_LIMIT => {
            let data_count = value["data"]["fetched"].as_array().map_or(0, Vec::len);
            json!({
                "status": value.get("status"),
                "message": value.get("message"),
                "data_count": data_count,
                "note": "Response truncated for display",
            })
        }
        Ok(value) => value,
        Err(_) => Value::String(truncate_text(body, DEBUG_BODY_LIMIT)),
    }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("... (truncated)");
    out
}

// =============================================================================
// Tests
// =============================================================================
