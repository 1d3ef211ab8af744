use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use lineage_common::api::lineage::{
    DeactivateParams, ErrorResponse, LineageQueryParams, LineageStatsResponse,
    UpsertLineageRequest,
};
use lineage_common::types::{Direction, EdgeDeclaration, LineageEdge, LineageEntry};
use lineage_common::{AssetId, LineageError};

use crate::lineage::LineageService;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Set to `true` on lineage answers cut short by the edge cap.
pub const TRUNCATED_HEADER: HeaderName = HeaderName::from_static("x-lineage-truncated");

/// Lineage routes plus `/health`. Metrics are mounted by the binary.
pub fn router(service: Arc<LineageService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/lineage", post(upsert_handler))
        .route("/lineage/stats", get(stats_handler))
        .route("/lineage/{source}/{target}", delete(deactivate_handler))
        .route("/assets/{asset_id}/lineage", get(lineage_handler))
        .with_state(service)
}

/// Map engine errors onto HTTP statuses.
pub fn error_response(e: LineageError) -> ApiError {
    let status = match &e {
        LineageError::Validation(_) | LineageError::Serialization(_) => StatusCode::BAD_REQUEST,
        LineageError::NotFound(_) => StatusCode::NOT_FOUND,
        LineageError::Conflict(_) => StatusCode::CONFLICT,
        other if other.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
        LineageError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %e, status = status.as_u16(), "Lineage request failed");
    } else {
        tracing::debug!(error = %e, status = status.as_u16(), "Lineage request rejected");
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn bad_request(detail: String) -> ApiError {
    error_response(LineageError::Validation(detail))
}

fn parse_asset_id(raw: &str) -> Result<AssetId, ApiError> {
    raw.parse::<AssetId>().map_err(error_response)
}

/// POST /lineage: create (201) or update (200) the edge of a pair.
async fn upsert_handler(
    State(service): State<Arc<LineageService>>,
    payload: Result<Json<UpsertLineageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LineageEdge>), ApiError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;
    let declaration = EdgeDeclaration::try_from(request).map_err(error_response)?;

    let outcome = service.upsert(declaration).await.map_err(error_response)?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.edge)))
}

/// DELETE /lineage/{source}/{target}?actor=: soft-delete an edge.
async fn deactivate_handler(
    State(service): State<Arc<LineageService>>,
    Path((source, target)): Path<(String, String)>,
    params: Result<Query<DeactivateParams>, QueryRejection>,
) -> Result<Json<LineageEdge>, ApiError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let source = parse_asset_id(&source)?;
    let target = parse_asset_id(&target)?;

    let edge = service
        .deactivate(source, target, &params.actor)
        .await
        .map_err(error_response)?;
    Ok(Json(edge))
}

/// GET /assets/{asset_id}/lineage?direction=&depth=
///
/// The body stays a bare array; truncation is reported in a header.
async fn lineage_handler(
    State(service): State<Arc<LineageService>>,
    Path(asset_id): Path<String>,
    params: Result<Query<LineageQueryParams>, QueryRejection>,
) -> Result<(HeaderMap, Json<Vec<LineageEntry>>), ApiError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let asset_id = parse_asset_id(&asset_id)?;
    let direction = params
        .direction
        .as_deref()
        .map(str::parse::<Direction>)
        .transpose()
        .map_err(error_response)?;

    let report = service
        .lineage(asset_id, direction, params.depth)
        .await
        .map_err(error_response)?;

    let mut headers = HeaderMap::new();
    if report.truncated {
        headers.insert(TRUNCATED_HEADER, HeaderValue::from_static("true"));
    }
    Ok((headers, Json(report.entries)))
}

/// GET /lineage/stats: active edges per relationship type.
async fn stats_handler(
    State(service): State<Arc<LineageService>>,
) -> Result<Json<LineageStatsResponse>, ApiError> {
    let stats = service.stats().await.map_err(error_response)?;

    let total: i64 = stats.iter().map(|(_, n)| n).sum();
    let counts: BTreeMap<String, i64> = stats
        .into_iter()
        .map(|(kind, n)| (kind.as_db_str().to_string(), n))
        .collect();
    Ok(Json(LineageStatsResponse { counts, total }))
}

/// Health check endpoint. Reports the edge store.
async fn health_handler(
    State(service): State<Arc<LineageService>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let store_ok = service.health_check().await.is_ok();

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = serde_json::json!({
        "status": if store_ok { "healthy" } else { "unhealthy" },
        "services": {
            "edge_store": if store_ok { "healthy" } else { "unhealthy" },
        }
    });

    (status, Json(body))
}
