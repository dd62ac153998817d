//! HTTP error response handling for the API
//!
//! Converts domain errors into the JSON error envelope with the status code
//! from [`ToHttpStatus`]. Every error response is logged once here.

use crate::api::context;
use crate::error::{ApiError, Error, ToHttpStatus};
use crate::redact::redact_text;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let context = context::current();
        let request_id = context
            .as_ref()
            .map(|c| c.request_id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let (method, path) = context
            .as_ref()
            .map(|c| (c.method.to_string(), c.path.clone()))
            .unwrap_or_default();

        let logged_message = redact_text(&self.to_string());
        if status_code.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                code = self.error_code(),
                error = %logged_message,
                "request failed"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                code = self.error_code(),
                error = %logged_message,
                "request rejected"
            );
        }

        let mut api_error = ApiError::from(&self).with_request_id(request_id);
        if context.is_some_and(|c| c.detailed_errors) {
            api_error = api_error.with_details(self.details());
        }

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Default to 500 if we're directly converting an ApiError
        // (usually errors go through Error::into_response which has the status code)
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
