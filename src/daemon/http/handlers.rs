//! HTTP API request handlers
//!
//! The edit surface mutates only user-editable item fields; observation
//! fields belong to the scheduler. URL changes re-run the outbound guard so
//! a stored item can never point at a private destination.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::store::{DiagnosticsLog, StateStore};
use crate::tracking::{FxTable, Scheduler, TriggerOutcome, UrlGuard};
use crate::types::{AlertRules, Item};

use super::types::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StateStore>,
    pub diagnostics: Arc<DiagnosticsLog>,
    pub scheduler: Arc<Scheduler>,
    pub guard: Arc<UrlGuard>,
    pub fx: Arc<FxTable>,
}

fn bad_request(error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: error.into() }))
}

fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse { error: "item not found".to_string() }),
    )
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        sweeping: state.scheduler.is_sweeping(),
        currently_sweeping_item: state.scheduler.currently_sweeping_item(),
        item_count: state.store.item_count(),
        fx_age_secs: state.fx.age().map(|age| age.as_secs()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn list_items(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.snapshot().items)
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    if request.name.trim().is_empty() {
        return Err(bad_request("name must not be empty"));
    }
    if let Some(target) = request.target_price {
        if !(target.is_finite() && target > 0.0) {
            return Err(bad_request("target_price must be a positive number"));
        }
    }
    state
        .guard
        .validate(&request.url)
        .await
        .map_err(|e| bad_request(e.kind()))?;

    let mut item = Item::new(request.url, request.name);
    item.selector = request.selector.filter(|s| !s.trim().is_empty());
    item.target_price = request.target_price;
    if let Some(list_id) = request.list_id.filter(|l| !l.trim().is_empty()) {
        item.list_id = list_id;
    }

    debug!("created item {} ({})", item.id, item.url);
    state.store.insert_item(item.clone());
    persist(&state)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    if let Some(url) = &request.url {
        state
            .guard
            .validate(url)
            .await
            .map_err(|e| bad_request(e.kind()))?;
    }
    if let Some(target) = request.target_price {
        if !(target.is_finite() && target > 0.0) {
            return Err(bad_request("target_price must be a positive number"));
        }
    }

    let updated = state.store.update_item(&id, |item| {
        if let Some(url) = &request.url {
            item.url = url.clone();
        }
        if let Some(name) = &request.name {
            if !name.trim().is_empty() {
                item.name = name.clone();
            }
        }
        if let Some(selector) = &request.selector {
            item.selector = (!selector.trim().is_empty()).then(|| selector.clone());
        }
        if let Some(target) = request.target_price {
            item.target_price = Some(target);
        }
        if let Some(list_id) = &request.list_id {
            if !list_id.trim().is_empty() {
                item.list_id = list_id.clone();
            }
        }
        item.clone()
    });

    match updated {
        Some(item) => {
            persist(&state)?;
            Ok(Json(item))
        }
        None => Err(not_found()),
    }
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    if !state.store.remove_item(&id) {
        return Err(not_found());
    }
    persist(&state)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn trigger_sweep(State(state): State<AppState>) -> impl IntoResponse {
    match state.scheduler.trigger() {
        TriggerOutcome::Started => Json(SweepResponse { status: "started" }),
        TriggerOutcome::Busy => Json(SweepResponse { status: "busy" }),
    }
}

pub async fn get_diagnostics(
    State(state): State<AppState>,
    Query(query): Query<DiagnosticsQuery>,
) -> impl IntoResponse {
    Json(state.diagnostics.recent(query.limit.min(2000)))
}

pub async fn get_alert_rules(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.settings().alert_rules)
}

pub async fn put_alert_rules(
    State(state): State<AppState>,
    Json(rules): Json<AlertRules>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    if !(rules.price_drop_24h_percent.is_finite() && rules.price_drop_24h_percent > 0.0) {
        return Err(bad_request("price_drop_24h_percent must be positive"));
    }
    state.store.update_settings(|s| s.alert_rules = rules.clone());
    persist(&state)?;
    Ok(Json(rules))
}

fn persist(state: &AppState) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    state.store.persist().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: format!("failed to persist state: {e:#}") }),
        )
    })
}
