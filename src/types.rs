use std::fmt;

use serde::{Deserialize, Serialize};

/// Uniform shape every successful exchange decodes into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Coarse category of a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorType {
    Network,
    Timeout,
    Server,
    Client,
    Unknown,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Server => "server",
            Self::Client => "client",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one failure. Computed fresh each time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorJudgment {
    pub kind: ErrorType,
    pub retryable: bool,
    pub status: Option<u16>,
}
