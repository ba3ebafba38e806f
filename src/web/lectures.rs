//! `GET /api/lectures`

use axum::extract::{Query, State};
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Json, Response};

use crate::lectures::{LectureParams, LectureQuery, LectureResponse};
use crate::state::AppState;
use crate::web::error::ApiError;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_DURATION_MS: HeaderName = HeaderName::from_static("x-duration-ms");
pub const X_COUNT: HeaderName = HeaderName::from_static("x-count");
pub const X_FAILED_TARGETS: HeaderName = HeaderName::from_static("x-failed-targets");

/// Records as the JSON body; cache status, timing, and counts as headers.
pub(super) async fn get_lectures(
    State(state): State<AppState>,
    Query(params): Query<LectureParams>,
) -> Result<Response, ApiError> {
    let query = LectureQuery::from_params(&params, state.limits)?;
    let response = state.aggregator.handle(&query).await;
    Ok(into_http(response))
}

fn into_http(response: LectureResponse) -> Response {
    let duration_ms = u64::try_from(response.duration.as_millis()).unwrap_or(u64::MAX);

    let mut http = Json(response.records).into_response();
    let headers = http.headers_mut();
    headers.insert(
        X_CACHE,
        HeaderValue::from_static(response.cache_status.as_str()),
    );
    headers.insert(X_DURATION_MS, HeaderValue::from(duration_ms));
    headers.insert(X_COUNT, HeaderValue::from(response.count));
    headers.insert(X_FAILED_TARGETS, HeaderValue::from(response.failed_targets));
    http
}
