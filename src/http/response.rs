//! Response handling and failure translation.
//!
//! # Responsibilities
//! - Relay upstream responses unmodified apart from hop-by-hop headers
//! - Map forwarding failures to 502 Bad Gateway
//! - Map unreadable or oversized request bodies to 400 / 413
//!
//! # Design Decisions
//! - Upstream bodies are streamed, never buffered
//! - 5xx from the upstream is relayed as-is; only transport failures become 502

use axum::{
    body::Body,
    http::{Response as HttpResponse, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;

use crate::http::request::strip_hop_by_hop;
use crate::resilience::retries::ForwardError;

/// Pass an upstream response through to the client.
pub fn relay(response: HttpResponse<Body>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, body)
}

/// Client-visible response for a failed forward.
pub fn gateway_failure(error: &ForwardError) -> Response {
    let message = match error {
        ForwardError::RetryExhausted { .. } => "Bad Gateway: upstream unreachable",
        ForwardError::AdmissionCanceled(_) | ForwardError::Canceled { .. } => {
            "Bad Gateway: request canceled"
        }
    };
    (StatusCode::BAD_GATEWAY, message).into_response()
}

/// Client-visible response for a request body that could not be buffered.
pub fn body_rejection(error: &axum::Error) -> Response {
    if is_length_limit(error) {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
    } else {
        (StatusCode::BAD_REQUEST, "Failed to read request body").into_response()
    }
}

fn is_length_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
