//! Per-request context
//!
//! The outermost middleware assigns each request an id (honouring an incoming
//! `X-Request-Id`) and makes it available to everything running inside the
//! request through a task-local. Error responses read it to fill the
//! envelope's `requestId` and to tag their log lines.

use crate::redact::redact_headers;
use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header carrying the request id in both directions
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

/// What is known about the request being served
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Request id, echoed in `X-Request-Id`
    pub request_id: String,
    /// HTTP method
    pub method: Method,
    /// Request path, without the query string
    pub path: String,
    /// Whether error responses include structured details
    pub detailed_errors: bool,
}

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// Context of the request the current task is serving, if any
pub fn current() -> Option<RequestContext> {
    REQUEST_CONTEXT.try_with(Clone::clone).ok()
}

fn incoming_request_id(req: &Request) -> Option<String> {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.chars().all(|c| c.is_ascii_graphic())
        })
        .map(String::from)
}

/// Middleware establishing the [`RequestContext`]
///
/// The state is the `api.detailed_errors` flag.
pub async fn request_context_middleware(
    State(detailed_errors): State<bool>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = incoming_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    let context = RequestContext {
        request_id: request_id.clone(),
        method: req.method().clone(),
        path: req.uri().path().to_string(),
        detailed_errors,
    };

    tracing::debug!(
        request_id = %request_id,
        method = %context.method,
        path = %context.path,
        headers = ?redact_headers(req.headers()),
        "request received"
    );

    let mut response = REQUEST_CONTEXT.scope(context, next.run(req)).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Run `future` as if it were serving a request with `context`
#[cfg(test)]
pub(crate) async fn scoped<F: std::future::Future>(context: RequestContext, future: F) -> F::Output {
    REQUEST_CONTEXT.scope(context, future).await
}
