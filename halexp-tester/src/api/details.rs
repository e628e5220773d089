//! Detail lookup endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::details::DetailSummary;
use crate::error::{ApiError, ApiResult};
use crate::normalize::DetailKey;
use crate::AppState;

/// Raw record of one result plus its summary
#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub key: String,
    pub run_id: Uuid,
    pub record: Value,
    pub summary: Option<DetailSummary>,
}

/// GET /api/details/:key
///
/// `key` is `<config index>#<rank>` (URL-encoded as `%23`), resolved against
/// the current run.
pub async fn get_detail(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<DetailResponse>> {
    let detail_key: DetailKey = key.parse()?;
    let store = state.dispatcher.details();

    let run_id = store
        .current_run()
        .await
        .ok_or_else(|| ApiError::NotFound("No run has been started".to_string()))?;
    let record = store
        .get(run_id, detail_key)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No details for {}", detail_key)))?;

    Ok(Json(DetailResponse {
        key: detail_key.to_string(),
        run_id,
        summary: DetailSummary::from_record(&record),
        record: Value::clone(&record),
    }))
}
