//! Navigation options endpoint.

use axum::{body::Bytes, extract::State, Json};
use drilldown_core::{OptionsResult, RawNavigationRequest};

use super::AppState;
use crate::error::ApiResult;

/// POST `*/next-options`
///
/// The body is read as raw bytes so that every parse failure maps to the
/// same 400 shape instead of axum's extractor rejections.
pub async fn next_options(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<OptionsResult>> {
    let raw = RawNavigationRequest::from_slice(&body)?;
    let result = state.resolver.resolve(&raw).await?;
    Ok(Json(result))
}
