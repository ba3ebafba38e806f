//! Request correlation IDs.
//!
//! Every request runs inside a `request` span carrying an ID. A non-empty
//! `x-request-id` from the caller is reused; otherwise a ULID is minted. The
//! ID is echoed on the response, and the response is logged at a level that
//! tracks its status class.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::Instrument;

use crate::utils::fmt_duration;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// `axum::middleware::from_fn` handler.
pub async fn request_id(req: Request, next: Next) -> Response {
    let id = incoming_id(&req).unwrap_or_else(|| ulid::Ulid::new().to_string());
    let span = tracing::info_span!("request", req_id = %id);

    async move {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let start = Instant::now();

        let mut response = next.run(req).await;

        let status = response.status();
        let duration = fmt_duration(start.elapsed());
        match status_class(status) {
            StatusClass::Ok => {
                tracing::debug!(%method, path, status = status.as_u16(), duration, "Response")
            }
            StatusClass::Client => {
                tracing::info!(%method, path, status = status.as_u16(), duration, "Response")
            }
            StatusClass::Server => {
                tracing::warn!(%method, path, status = status.as_u16(), duration, "Response")
            }
        }

        if let Ok(value) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
        response
    }
    .instrument(span)
    .await
}

fn incoming_id(req: &Request) -> Option<String> {
    req.headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

enum StatusClass {
    Ok,
    Client,
    Server,
}

fn status_class(status: StatusCode) -> StatusClass {
    if status.is_server_error() {
        StatusClass::Server
    } else if status.is_client_error() {
        StatusClass::Client
    } else {
        StatusClass::Ok
    }
}
