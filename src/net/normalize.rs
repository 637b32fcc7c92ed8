//! Response normalization.
//!
//! Collapses the four ways a call can end (success envelope, failure
//! envelope, HTTP error status, no response at all) into either the
//! envelope's `data` or an [`ApiError`] carrying a user-facing message.
//! Nothing in this module logs or notifies; see [`super::client`].

use serde_json::Value;

use super::types::{Envelope, ResponseCode};

pub const GENERIC_FAILURE_MESSAGE: &str = "operation failed";
pub const NETWORK_FAILURE_MESSAGE: &str = "network connection failed, please check your network settings";
pub const REQUEST_FAILURE_MESSAGE: &str = "request sending failed";
pub const SERVER_ERROR_MESSAGE: &str = "server error";

/// Envelope codes treated as success. Observed from the backend rather than
/// documented by it, so kept in one place. `Int` also matches an integral
/// JSON float (`200.0`), which compares equal to `200` in JSON.
const SUCCESS_CODES: &[SuccessCode] = &[SuccessCode::Int(200), SuccessCode::Text("200"), SuccessCode::Text("SUCCESS")];

enum SuccessCode {
    Int(i32),
    Text(&'static str),
}

// =============================================================================
// ERROR
// =============================================================================

/// Rejected outcome of a backend call. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Well-formed envelope whose code is not a success code.
    #[error("{message}")]
    Business { code: Option<String>, message: String },

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// No response reached the client (unreachable, refused, timed out).
    #[error("{message}")]
    Network { message: String },

    /// The request could not be built or sent.
    #[error("{message}")]
    Request { message: String },

    /// A success envelope whose `data` does not match the expected shape.
    #[error("{message}")]
    Decode { message: String },
}

impl ApiError {
    /// The human-readable message, identical to `to_string()`.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Business { message, .. }
            | Self::Http { message, .. }
            | Self::Network { message }
            | Self::Request { message }
            | Self::Decode { message } => message,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Business { .. } => "E_BUSINESS",
            Self::Http { .. } => "E_HTTP",
            Self::Network { .. } => "E_NETWORK",
            Self::Request { .. } => "E_REQUEST",
            Self::Decode { .. } => "E_DECODE",
        }
    }

    pub(crate) fn decode(detail: impl std::fmt::Display) -> Self {
        Self::Decode { message: format!("invalid response payload: {detail}") }
    }
}

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Whether an envelope code means success, independent of its JSON type.
#[must_use]
pub fn is_success_code(code: &ResponseCode) -> bool {
    SUCCESS_CODES.iter().any(|known| match (known, code) {
        (SuccessCode::Int(expected), ResponseCode::Int(actual)) => i64::from(*expected) == *actual,
        (SuccessCode::Int(expected), ResponseCode::Other(Value::Number(actual))) => {
            actual.as_f64() == Some(f64::from(*expected))
        }
        (SuccessCode::Text(expected), ResponseCode::Text(actual)) => expected == actual,
        _ => false,
    })
}

/// Unwrap a 2xx envelope into its `data`, or reject with its message.
///
/// # Errors
///
/// Returns [`ApiError::Business`] when the code is missing or not a success code.
pub fn normalize_envelope(envelope: Envelope) -> Result<Value, ApiError> {
    if envelope.code.as_ref().is_some_and(is_success_code) {
        return Ok(envelope.data);
    }
    let message = non_empty(envelope.message.as_deref()).unwrap_or(GENERIC_FAILURE_MESSAGE);
    Err(ApiError::Business { code: envelope.code.map(|code| code.to_string()), message: message.to_owned() })
}

/// Decode a raw 2xx body and normalize it. Bodies that are not a JSON
/// object are handled like an envelope without a code.
///
/// # Errors
///
/// Returns [`ApiError::Business`] for anything but a success envelope.
pub fn normalize_body(body: &[u8]) -> Result<Value, ApiError> {
    let envelope = serde_json::from_slice::<Value>(body)
        .map(envelope_from_value)
        .unwrap_or_default();
    normalize_envelope(envelope)
}

/// Read envelope fields one by one, so a mistyped field never hides the
/// `code` or `data`. A non-string `message` counts as absent.
#[must_use]
pub fn envelope_from_value(body: Value) -> Envelope {
    let Value::Object(mut fields) = body else {
        return Envelope::default();
    };
    let code = fields
        .remove("code")
        .filter(|code| !code.is_null())
        .and_then(|code| serde_json::from_value::<ResponseCode>(code).ok());
    let message = fields.get("message").and_then(Value::as_str).map(ToOwned::to_owned);
    let data = fields.remove("data").unwrap_or(Value::Null);
    let timestamp = fields.remove("timestamp");
    Envelope { code, message, data, timestamp }
}

/// Fixed user-facing message for an HTTP status without a body message.
#[must_use]
pub fn status_message(status: u16) -> String {
    match status {
        400 => "request parameter error".to_owned(),
        401 => "unauthorized, please log in again".to_owned(),
        403 => "access denied".to_owned(),
        404 => "requested resource not found".to_owned(),
        409 => "username or email already exists".to_owned(),
        500 => "internal server error".to_owned(),
        other => format!("connection error {other}"),
    }
}

/// Map a non-2xx response to an error, preferring the body's `message`.
#[must_use]
pub fn normalize_http_failure(status: u16, body: Option<&Value>) -> ApiError {
    let body_message = body.and_then(|value| value.get("message")).and_then(Value::as_str);
    let message = match non_empty(body_message) {
        Some(message) => message.to_owned(),
        None => status_message(status),
    };
    ApiError::Http { status, message }
}

/// The error for a call that never got a response.
#[must_use]
pub fn network_failure() -> ApiError {
    ApiError::Network { message: NETWORK_FAILURE_MESSAGE.to_owned() }
}

/// Classify a `reqwest` failure that left the caller without a usable
/// response: nothing arrived, or the body was cut off mid-read.
#[must_use]
pub fn transport_failure(error: &reqwest::Error) -> ApiError {
    if error.is_builder() {
        return ApiError::Request { message: REQUEST_FAILURE_MESSAGE.to_owned() };
    }
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() || error.is_decode() {
        return network_failure();
    }
    ApiError::Network { message: SERVER_ERROR_MESSAGE.to_owned() }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.filter(|message| !message.is_empty())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
