use std::fmt;

use crate::ErrorJudgment;

/// Where a failed attempt came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, DNS failure, reset while reading the body.
    Network,
    /// The attempt did not settle before its deadline.
    Timeout,
    /// The server answered with a non-2xx status.
    Http,
}

/// A single failed attempt.
///
/// Built in exactly one place per failure site, so classification and
/// display match on `kind` and `status` instead of probing for fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    /// HTTP status code, present only for [`FailureKind::Http`].
    pub status: Option<u16>,
    /// Server-supplied `error_code`, or `HTTP_<status>`.
    pub code: Option<String>,
    /// Raw response body. Non-JSON bodies are kept as a JSON string.
    pub body: Option<serde_json::Value>,
    /// Technical message. Not meant for end users.
    pub message: String,
}

impl Failure {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Network,
            status: None,
            code: None,
            body: None,
            message: message.into(),
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self {
            kind: FailureKind::Timeout,
            status: None,
            code: None,
            body: None,
            message: format!("timeout after {timeout_ms}ms"),
        }
    }

    pub fn http(
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
        body: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind: FailureKind::Http,
            status: Some(status),
            code: Some(code.into()),
            body,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request failed and was not (or no longer) retried.
    ///
    /// `Display` prints `user_message`, a complete sentence that can be
    /// shown directly in a UI.
    #[error("{user_message}")]
    Request {
        /// Last failed attempt, with its message rewritten for timeouts
        /// and network errors.
        failure: Failure,
        judgment: ErrorJudgment,
        /// Total attempts made, including the first one.
        attempts: usize,
        user_message: String,
    },
    /// A 2xx response whose body is not a valid envelope.
    #[error("decode error: {0}")]
    Decode(String),
    /// The request could not be built (bad URL, header or mime type).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// HTTP status of the final attempt, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { failure, .. } => failure.status,
            _ => None,
        }
    }

    /// Server-supplied error code or `HTTP_<status>`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Request { failure, .. } => failure.code.as_deref(),
            _ => None,
        }
    }

    /// Raw error body returned by the server.
    pub fn response(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Request { failure, .. } => failure.body.as_ref(),
            _ => None,
        }
    }

    pub fn judgment(&self) -> Option<ErrorJudgment> {
        match self {
            Self::Request { judgment, .. } => Some(*judgment),
            _ => None,
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            Self::Request { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// Technical message of the final attempt.
    pub fn technical_message(&self) -> String {
        match self {
            Self::Request { failure, .. } => failure.message.clone(),
            other => other.to_string(),
        }
    }
}
