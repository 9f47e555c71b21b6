use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::indexer::{IndexerStatus, SweepReport};
use crate::metrics::gather_metrics;
use crate::models::{Town, TownInput};
use crate::search::TownSearchPage;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse> {
    if !state.prometheus_enabled {
        return Err(AppError::NotFound("Metrics are disabled".to_string()));
    }
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,

    /// Kept as text: anything that is not a positive number means page 1
    pub page: Option<String>,
}

impl SearchParams {
    fn page(&self) -> Option<u64> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }
}

/// Search towns in the live generation
pub async fn search_towns(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<TownSearchPage>> {
    let page = state
        .search
        .search_towns(params.q.as_deref(), params.page())
        .await?;
    Ok(Json(page))
}

/// List an owner's towns
pub async fn list_towns(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Vec<Town>>> {
    Ok(Json(state.towns.find_towns(&owner).await?))
}

/// Create a town; its id is derived from the name
pub async fn create_town(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    Json(input): Json<TownInput>,
) -> Result<(StatusCode, Json<Town>)> {
    let town = state.towns.create_town(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(town)))
}

pub async fn get_town(
    State(state): State<AppState>,
    Path((owner, town_id)): Path<(String, String)>,
) -> Result<Json<Town>> {
    Ok(Json(state.towns.find_town(&owner, &town_id).await?))
}

pub async fn update_town(
    State(state): State<AppState>,
    Path((owner, town_id)): Path<(String, String)>,
    Json(input): Json<TownInput>,
) -> Result<Json<Town>> {
    Ok(Json(state.towns.update_town(&owner, &town_id, input).await?))
}

pub async fn delete_town(
    State(state): State<AppState>,
    Path((owner, town_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    state.towns.delete_town(&owner, &town_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub status: String,
    pub operation: String,
}

impl AcceptedResponse {
    fn new(operation: &str) -> (StatusCode, Json<Self>) {
        (
            StatusCode::ACCEPTED,
            Json(Self {
                status: "accepted".to_string(),
                operation: operation.to_string(),
            }),
        )
    }
}

/// Start a full reindex in the background
pub async fn trigger_full_reindex(
    State(state): State<AppState>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let indexer = state.indexer.clone();
    tokio::spawn(async move {
        match indexer.full_reindex().await {
            Ok(report) => info!(
                generation = %report.generation,
                documents = report.documents,
                "Requested full reindex finished"
            ),
            Err(e) => error!(error = %e, "Requested full reindex failed"),
        }
    });

    AcceptedResponse::new("full_reindex")
}

/// Start a delta reindex in the background
pub async fn trigger_delta_reindex(
    State(state): State<AppState>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let indexer = state.indexer.clone();
    tokio::spawn(async move {
        match indexer.delta_reindex().await {
            Ok(report) => info!(
                outcome = ?report.outcome,
                applied = report.applied,
                "Requested delta reindex finished"
            ),
            Err(e) => error!(error = %e, "Requested delta reindex failed"),
        }
    });

    AcceptedResponse::new("delta_reindex")
}

pub async fn sweep_orphans(State(state): State<AppState>) -> Result<Json<SweepReport>> {
    Ok(Json(state.indexer.sweep_orphans().await?))
}

pub async fn index_status(State(state): State<AppState>) -> Result<Json<IndexerStatus>> {
    Ok(Json(state.indexer.status().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_parsing_is_lenient() {
        let params = |page: Option<&str>| SearchParams {
            q: None,
            page: page.map(str::to_string),
        };

        assert_eq!(params(Some("3")).page(), Some(3));
        assert_eq!(params(Some(" 2 ")).page(), Some(2));
        assert_eq!(params(Some("two")).page(), None);
        assert_eq!(params(Some("-1")).page(), None);
        assert_eq!(params(None).page(), None);
    }
}
