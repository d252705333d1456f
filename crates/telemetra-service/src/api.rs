//! REST API endpoints for the telemetra-service.
//!
//! This module provides HTTP endpoints for managing stored readings and
//! running batch aggregation.
//!
//! # Concurrency and Lock Acquisition
//!
//! All async handlers that access shared state acquire locks in a
//! consistent order:
//!
//! - **`state.store`** (Mutex): Acquired for database operations. Held
//!   briefly during queries; avoid long-running operations while holding
//!   this lock.
//! - **`state.config`** (RwLock): Read lock only; the aggregation
//!   handlers read the export settings after computing a result.
//!
//! Aggregation itself is pure and needs no locks at all.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. Client
//! errors (not found, bad request) return 4xx; store failures return
//! HTTP 500. The legacy `/api/sensor-data/process` endpoint reports
//! errors under a `detail` key instead of `error`; everything else uses
//! `error`.
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use telemetra_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

use telemetra_aggregate::AggregateError;
use telemetra_store::ReadingQuery;
use telemetra_types::{AggregationResult, NewReading, RawReading, Reading, ReadingPatch};

use crate::export;
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Health and connectivity
        .route("/api/health", get(health))
        .route("/api/test-cors", get(test_cors))
        // Reading CRUD
        .route("/api/readings", get(list_readings).post(create_reading))
        .route(
            "/api/readings/{id}",
            get(get_reading)
                .put(replace_reading)
                .patch(patch_reading)
                .delete(delete_reading),
        )
        // Sensor data: dump and batch aggregation
        .route(
            "/api/sensor-data",
            get(get_sensor_data).post(aggregate_sensor_data),
        )
        .route("/api/sensor-data/process", post(process_sensor_data))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Simple message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// CORS reachability check.
///
/// Browser frontends hit this first to verify the CORS layer is in
/// place before issuing real requests.
async fn test_cors() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "CORS is working!",
    })
}

// ==========================================================================
// Reading CRUD
// ==========================================================================

/// Query parameters for listing readings.
#[derive(Debug, Deserialize, Default)]
pub struct ReadingsParams {
    pub device: Option<String>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ReadingsParams {
    /// Validate the query parameters.
    /// Returns an error if `since > until`.
    pub fn validate(&self) -> Result<(), AppError> {
        if let (Some(since), Some(until)) = (self.since, self.until)
            && since > until
        {
            return Err(AppError::BadRequest(format!(
                "Invalid time range: 'since' ({}) must be less than or equal to 'until' ({})",
                since, until
            )));
        }
        Ok(())
    }

    /// Build a store query from the parameters.
    fn to_query(&self) -> ReadingQuery {
        let mut query = ReadingQuery::new();

        if let Some(ref device) = self.device {
            query = query.device(device);
        }
        if let Some(since) = self.since
            && let Ok(dt) = OffsetDateTime::from_unix_timestamp(since)
        {
            query = query.since(dt);
        }
        if let Some(until) = self.until
            && let Ok(dt) = OffsetDateTime::from_unix_timestamp(until)
        {
            query = query.until(dt);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }

        query
    }
}

/// List readings, optionally filtered.
///
/// # Query Parameters
///
/// - `device`: Exact device name to filter by
/// - `since`: Unix timestamp to filter readings from (inclusive)
/// - `until`: Unix timestamp to filter readings until (inclusive)
/// - `limit`: Maximum number of readings to return
/// - `offset`: Number of readings to skip (for pagination)
///
/// # Errors
///
/// - Returns [`AppError::BadRequest`] if `since > until`
/// - Returns [`AppError::Store`] if the database query fails
async fn list_readings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadingsParams>,
) -> Result<Json<Vec<Reading>>, AppError> {
    params.validate()?;

    let store = state.store.lock().await;
    let readings = store.query_readings(&params.to_query())?;
    Ok(Json(readings))
}

/// Create a reading.
///
/// The server assigns `reading_time`; clients never supply it.
///
/// # Errors
///
/// Returns [`AppError::BadRequest`] on an empty device name or a
/// non-finite value.
async fn create_reading(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewReading>,
) -> Result<(StatusCode, Json<Reading>), AppError> {
    let store = state.store.lock().await;
    let reading = store.insert_reading(&new)?;
    Ok((StatusCode::CREATED, Json(reading)))
}

/// Get a single reading.
async fn get_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Reading>, AppError> {
    let store = state.store.lock().await;
    let reading = store.get_reading(id)?;
    Ok(Json(reading))
}

/// Fully replace a reading's device name and value.
///
/// `reading_time` is set once at creation and survives the replace.
async fn replace_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(new): Json<NewReading>,
) -> Result<Json<Reading>, AppError> {
    let store = state.store.lock().await;
    let reading = store.replace_reading(id, &new)?;
    Ok(Json(reading))
}

/// Partially update a reading. Absent fields are untouched.
async fn patch_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<ReadingPatch>,
) -> Result<Json<Reading>, AppError> {
    let store = state.store.lock().await;
    let reading = store.update_reading(id, &patch)?;
    Ok(Json(reading))
}

/// Delete a reading.
async fn delete_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let store = state.store.lock().await;
    store.delete_reading(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ==========================================================================
// Sensor data: dump and batch aggregation
// ==========================================================================

/// All stored readings, in the shape the legacy frontend expects.
#[derive(Debug, Serialize)]
pub struct SensorDataResponse {
    pub sensor_data: Vec<Reading>,
}

/// Dump all stored readings wrapped as `{"sensor_data": [...]}`.
async fn get_sensor_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SensorDataResponse>, AppError> {
    let store = state.store.lock().await;
    let sensor_data = store.list_readings()?;
    Ok(Json(SensorDataResponse { sensor_data }))
}

/// Aggregation response for `POST /api/sensor-data`.
#[derive(Debug, Serialize)]
pub struct AggregateResponse {
    pub result: AggregationResult,
}

/// Request body for `POST /api/sensor-data`.
///
/// Legacy clients send `sensor_data` either as a JSON list or as a
/// JSON-encoded string containing a list. Both forms are normalized
/// once, here at the boundary; everything past this point works on
/// `Vec<RawReading>`.
#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    #[serde(default)]
    pub sensor_data: Option<serde_json::Value>,
}

impl AggregateRequest {
    /// Normalize the payload into a batch of raw readings.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] when the field is absent or
    /// empty, is neither a string nor a list, or does not parse.
    fn into_batch(self) -> Result<Vec<RawReading>, AppError> {
        let value = match self.sensor_data {
            Some(serde_json::Value::String(s)) => {
                if s.is_empty() {
                    return Err(AppError::BadRequest("No sensor data provided".to_string()));
                }
                serde_json::from_str(&s).map_err(|e| {
                    AppError::BadRequest(format!("Malformed sensor data: {}", e))
                })?
            }
            Some(value @ serde_json::Value::Array(_)) => value,
            Some(_) | None => {
                return Err(AppError::BadRequest("No sensor data provided".to_string()));
            }
        };

        let batch: Vec<RawReading> = serde_json::from_value(value)
            .map_err(|e| AppError::BadRequest(format!("Malformed sensor data: {}", e)))?;

        if batch.is_empty() {
            return Err(AppError::BadRequest("No sensor data provided".to_string()));
        }

        Ok(batch)
    }
}

/// Aggregate a submitted batch of sensor readings.
///
/// Computes per-device mean and median over the batch. On success the
/// snapshot export side-channel is kicked off (if enabled) before the
/// response is returned; it can never fail or delay the response.
async fn aggregate_sensor_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AggregateRequest>,
) -> Result<Json<AggregateResponse>, AppError> {
    let batch = request.into_batch()?;
    let result = run_aggregation(&state, &batch).await?;
    Ok(Json(AggregateResponse { result }))
}

/// Aggregation response for the legacy `/api/sensor-data/process` endpoint.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub result: AggregationResult,
    pub message: &'static str,
}

/// Aggregate a bare JSON list body.
///
/// The legacy processing endpoint: the request body IS the batch, with
/// no wrapper object, and errors are reported under a `detail` key.
async fn process_sensor_data(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ProcessResponse>, DetailError> {
    if !body.is_array() {
        return Err(DetailError(AppError::BadRequest(
            "Expected a list of sensor data".to_string(),
        )));
    }

    let batch: Vec<RawReading> = serde_json::from_value(body).map_err(|e| {
        DetailError(AppError::BadRequest(format!("Malformed sensor data: {}", e)))
    })?;

    let result = run_aggregation(&state, &batch).await.map_err(DetailError)?;

    Ok(Json(ProcessResponse {
        result,
        message: "Data processed successfully!",
    }))
}

/// Run the aggregation engine over a normalized batch.
///
/// Logs skipped rows, kicks off the snapshot export side-channel on
/// success.
async fn run_aggregation(
    state: &Arc<AppState>,
    batch: &[RawReading],
) -> Result<AggregationResult, AppError> {
    let aggregation = telemetra_aggregate::aggregate(batch)?;

    if aggregation.rows_skipped > 0 {
        warn!(
            "Skipped {} of {} rows during aggregation",
            aggregation.rows_skipped,
            aggregation.rows_used + aggregation.rows_skipped
        );
    }

    let export_config = state.config.read().await.export.clone();
    export::spawn_export(export_config, aggregation.result.clone());

    Ok(aggregation.result)
}

// ==========================================================================
// Errors
// ==========================================================================

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Store(telemetra_store::Error),
}

impl From<telemetra_store::Error> for AppError {
    fn from(e: telemetra_store::Error) -> Self {
        match e {
            telemetra_store::Error::ReadingNotFound(id) => {
                AppError::NotFound(format!("Reading {} not found", id))
            }
            telemetra_store::Error::InvalidReading(e) => AppError::BadRequest(e.to_string()),
            other => AppError::Store(other),
        }
    }
}

impl From<AggregateError> for AppError {
    fn from(e: AggregateError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl AppError {
    fn parts(self) -> (StatusCode, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.parts();

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

/// [`AppError`] wrapper that reports under a `detail` key.
///
/// The legacy processing endpoint's clients parse `detail`, matching
/// the error shape they were originally built against.
#[derive(Debug)]
pub struct DetailError(pub AppError);

impl IntoResponse for DetailError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.0.parts();

        let body = serde_json::json!({
            "detail": message,
        });

        (status, Json(body)).into_response()
    }
}
