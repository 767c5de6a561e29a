use serde::{de::DeserializeOwned, Deserialize};

use crate::{wire::ErrorBody, ClientError, Failure, FailureKind, ResponseEnvelope};

/// Joins a request path onto the base address with exactly one `/`.
///
/// Absolute `http://` or `https://` paths are used as-is.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{path}")
    }
}

/// Builds the failure for a non-2xx response.
pub(crate) fn failure_from_response(status: u16, body: &str) -> Failure {
    let raw = if body.trim().is_empty() {
        None
    } else {
        Some(
            serde_json::from_str::<serde_json::Value>(body)
                .unwrap_or_else(|_| serde_json::Value::String(body.to_owned())),
        )
    };

    let parsed = raw
        .as_ref()
        .and_then(parse_error_body)
        .unwrap_or_default();

    let code = parsed
        .code()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP_{status}"));
    let message = parsed
        .message()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP error! status: {status}"));

    Failure::http(status, code, message, raw)
}

fn parse_error_body(value: &serde_json::Value) -> Option<ErrorBody> {
    match value {
        serde_json::Value::Object(_) => ErrorBody::deserialize(value).ok(),
        _ => None,
    }
}

/// Rewrites the technical message of a failure that is about to reach
/// the caller. Timeouts and network errors carry no status to describe
/// them, so their message says what happened instead.
pub(crate) fn terminal_failure(mut failure: Failure, timeout_ms: u64) -> Failure {
    match failure.kind {
        FailureKind::Timeout => {
            failure.message = format!(
                "Request timed out after {timeout_ms}ms. The server did not respond in time."
            );
        }
        FailureKind::Network => {
            failure.message = format!(
                "Network error: could not reach the server ({})",
                failure.message
            );
        }
        FailureKind::Http => {}
    }
    failure
}

/// Decodes a 2xx body into the response envelope.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    body: &str,
) -> Result<ResponseEnvelope<T>, ClientError> {
    serde_json::from_str::<ResponseEnvelope<T>>(body).map_err(|err| {
        ClientError::Decode(format!("invalid response envelope JSON: {err}; body: {body}"))
    })
}
