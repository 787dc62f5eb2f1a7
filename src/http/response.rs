//! Invocation result → HTTP response.
//!
//! # Design Decisions
//! - Status is always 200; the invocation contract has no status field
//! - Headers are copied verbatim, so `Content-Type` sets the wire type
//!   when present and is otherwise left unset
//! - A header the wire cannot carry fails the whole response

use axum::{
    body::Body,
    http::{header::InvalidHeaderName, header::InvalidHeaderValue, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::framework::InvocationResult;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("handler returned an invalid header name `{name}`: {source}")]
    HeaderName {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },

    #[error("handler returned an invalid value for header `{name}`: {source}")]
    HeaderValue {
        name: String,
        #[source]
        source: InvalidHeaderValue,
    },
}

/// Convert a handler's result into a response. `None` is an empty result.
pub fn adapt_response(result: Option<InvocationResult>) -> Result<Response, ResponseError> {
    let InvocationResult { headers, body } = result.unwrap_or_default();

    let mut response = Response::new(Body::from(body.unwrap_or_default()));
    *response.status_mut() = StatusCode::OK;

    for (name, value) in headers.unwrap_or_default() {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
            ResponseError::HeaderName {
                name: name.clone(),
                source,
            }
        })?;
        let header_value = HeaderValue::from_str(&value)
            .map_err(|source| ResponseError::HeaderValue { name, source })?;
        response.headers_mut().insert(header_name, header_value);
    }

    Ok(response)
}

/// Plain-text error response for failures at the request boundary.
pub fn error_response(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}
