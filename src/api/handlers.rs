//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::{Cache, CacheStore, DetailedReport, StatsSnapshot};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::models::requests::validate_key;
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, InvalidateAllResponse, InvalidateRequest,
    InvalidateResponse, SetRequest, SetResponse,
};

/// Application state shared across all handlers.
///
/// Holds a cloneable cache handle; locking happens inside `Cache`.
#[derive(Clone)]
pub struct AppState {
    pub cache: Cache<Value>,
}

impl AppState {
    /// Creates a new AppState around an existing cache handle.
    pub fn new(cache: Cache<Value>) -> Self {
        Self { cache }
    }

    /// Creates an AppState from configuration without a sweep task.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let store = CacheStore::new(config.clone())?;
        Ok(Self::new(Cache::new(store)))
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.options();
    if !state.cache.set_with(req.key.clone(), req.value, options).await {
        return Err(CacheError::Internal(format!(
            "Value for '{}' could not be cached",
            req.key
        )));
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    if !state.cache.delete(&key).await {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state
        .cache
        .invalidate(req.pattern.as_str(), &req.options)
        .await;
    Ok(Json(InvalidateResponse::new(removed)))
}

/// Handler for POST /invalidate-all
pub async fn invalidate_all_handler(State(state): State<AppState>) -> Json<InvalidateAllResponse> {
    let count = state.cache.invalidate_all().await;
    Json(InvalidateAllResponse { count })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.cache.statistics().await)
}

/// Handler for GET /report
pub async fn report_handler(State(state): State<AppState>) -> Json<DetailedReport> {
    Json(state.cache.detailed_report().await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
