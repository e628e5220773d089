//! Run control endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::plan::RunRequest;
use crate::table::{TableLayout, TableSnapshot};
use crate::AppState;

/// Response to a started run
#[derive(Debug, Serialize)]
pub struct RunStartedResponse {
    pub run_id: Uuid,
    pub configurations: usize,
}

/// POST /api/runs
///
/// Expands the request into its configuration space and dispatches every
/// configuration at once. Returns as soon as the requests are in flight;
/// progress is reported over `/api/events` and `/api/runs/current`.
pub async fn start_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> ApiResult<(StatusCode, Json<RunStartedResponse>)> {
    let plan = request.into_plan(&state.config)?;
    if plan.space.is_empty() {
        return Err(ApiError::BadRequest(
            "No configurations to dispatch: every axis needs at least one value".to_string(),
        ));
    }

    let handle = state.dispatcher.dispatch(plan.space, plan.params).await;
    let response = RunStartedResponse {
        run_id: handle.run_id(),
        configurations: handle.run().space().len(),
    };
    info!(run_id = %response.run_id, configurations = response.configurations, "Run accepted");

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// POST /api/layout - table layout for a request, nothing dispatched
pub async fn preview_layout(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> ApiResult<Json<TableLayout>> {
    let plan = request.into_plan(&state.config)?;
    Ok(Json(TableLayout::prepare(&plan.space, &plan.params)))
}

/// GET /api/runs/current
pub async fn current_run(State(state): State<AppState>) -> ApiResult<Json<TableSnapshot>> {
    let run = state
        .dispatcher
        .current_run()
        .await
        .ok_or_else(|| ApiError::NotFound("No run has been started".to_string()))?;
    Ok(Json(run.snapshot().await))
}
