//! Failure classification, backoff and user-facing messages.
//!
//! Everything here is pure: no I/O, no shared state. The only source of
//! nondeterminism is the jitter drawn by [`retry_delay`].

use std::time::Duration;

use rand::Rng;

use crate::{ErrorJudgment, ErrorType, Failure, FailureKind};

/// Upper bound for any single backoff delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_millis(30_000);

/// Largest jitter, as a fraction of the exponential delay.
const JITTER_RATIO: f64 = 0.3;

const NETWORK_HINTS: [&str; 4] = ["networkerror", "failed to fetch", "network", "connection"];
const TIMEOUT_HINTS: [&str; 2] = ["timeout", "timed out"];

/// Decides whether a failure is worth another attempt.
///
/// 5xx is always retryable. 4xx is retryable only for 408 and 429.
/// Failures without a status are network or timeout failures when they
/// can be recognised as such, and `Unknown` otherwise. Unknown failures
/// are retried.
pub fn classify(failure: &Failure) -> ErrorJudgment {
    if let Some(status) = failure.status {
        return classify_status(status);
    }

    let kind = match failure.kind {
        FailureKind::Timeout => ErrorType::Timeout,
        FailureKind::Network => ErrorType::Network,
        FailureKind::Http => classify_text(&failure.message),
    };

    ErrorJudgment {
        kind,
        retryable: true,
        status: None,
    }
}

fn classify_status(status: u16) -> ErrorJudgment {
    let (kind, retryable) = match status {
        500..=u16::MAX => (ErrorType::Server, true),
        408 | 429 => (ErrorType::Client, true),
        400..=499 => (ErrorType::Client, false),
        _ => (ErrorType::Unknown, true),
    };
    ErrorJudgment {
        kind,
        retryable,
        status: Some(status),
    }
}

fn classify_text(message: &str) -> ErrorType {
    let lower = message.to_ascii_lowercase();
    if TIMEOUT_HINTS.iter().any(|hint| lower.contains(hint)) {
        ErrorType::Timeout
    } else if NETWORK_HINTS.iter().any(|hint| lower.contains(hint)) {
        ErrorType::Network
    } else {
        ErrorType::Unknown
    }
}

/// Exponential backoff with up to 30% random jitter, capped at 30 s.
///
/// `attempt` is the 0-based index of the attempt that just failed.
pub fn retry_delay(attempt: usize, base: Duration) -> Duration {
    let fraction = rand::thread_rng().gen_range(0.0..=1.0);
    retry_delay_with_jitter(attempt, base, fraction)
}

/// Deterministic core of [`retry_delay`].
///
/// `fraction` selects where in the jitter window the delay lands: `0.0`
/// is the bare exponential value, `1.0` is 1.3 times it. Values outside
/// `[0, 1]` are clamped.
pub fn retry_delay_with_jitter(attempt: usize, base: Duration, fraction: f64) -> Duration {
    let exp = attempt.min(31) as u32;
    let base_ms = base.as_millis().min(u128::from(u64::MAX)) as u64;
    let exponential = base_ms.saturating_mul(1u64 << exp);

    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let jitter = (exponential as f64 * JITTER_RATIO * fraction) as u64;

    Duration::from_millis(exponential.saturating_add(jitter)).min(MAX_RETRY_DELAY)
}

const MSG_NETWORK: &str =
    "Unable to connect to the server. Please check your internet connection and try again.";
const MSG_TIMEOUT: &str = "The request took too long to complete. Please try again.";
const MSG_UNAUTHORIZED: &str = "Your session has expired. Please log in again.";
const MSG_FORBIDDEN: &str = "You do not have permission to perform this action.";
const MSG_NOT_FOUND: &str = "The requested resource was not found.";
const MSG_TOO_LARGE: &str = "The file is too large. Please upload a smaller file.";
const MSG_UNSUPPORTED: &str = "This file type is not supported. Please upload a supported format.";
const MSG_UNPROCESSABLE: &str =
    "Some of the information provided is invalid. Please review and try again.";
const MSG_RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";
const MSG_SERVER: &str = "Something went wrong on our end. Please try again later.";
const MSG_BAD_GATEWAY: &str =
    "The server is temporarily unreachable. Please try again in a few minutes.";
const MSG_UNAVAILABLE: &str = "The service is temporarily unavailable. Please try again later.";
const MSG_GENERIC: &str = "An unexpected error occurred. Please try again.";

fn message_for_status(status: u16) -> Option<&'static str> {
    Some(match status {
        401 => MSG_UNAUTHORIZED,
        403 => MSG_FORBIDDEN,
        404 => MSG_NOT_FOUND,
        413 => MSG_TOO_LARGE,
        415 => MSG_UNSUPPORTED,
        422 => MSG_UNPROCESSABLE,
        429 => MSG_RATE_LIMITED,
        500 => MSG_SERVER,
        502 => MSG_BAD_GATEWAY,
        503 => MSG_UNAVAILABLE,
        _ => return None,
    })
}

/// Maps a failure to a fixed sentence suitable for direct display.
///
/// Unmapped failures fall back to the raw message with its first letter
/// capitalised.
pub fn human_message(failure: &Failure) -> String {
    match failure.kind {
        FailureKind::Network => return MSG_NETWORK.to_owned(),
        FailureKind::Timeout => return MSG_TIMEOUT.to_owned(),
        FailureKind::Http => {}
    }

    if let Some(message) = failure.status.and_then(message_for_status) {
        return message.to_owned();
    }

    humanize(&failure.message)
}

/// Same table as [`human_message`], keyed only on technical text.
pub fn humanize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("NetworkError") || trimmed.contains("Failed to fetch") {
        return MSG_NETWORK.to_owned();
    }
    if trimmed.to_ascii_lowercase().contains("timeout") {
        return MSG_TIMEOUT.to_owned();
    }
    for status in [401, 403, 404, 413, 415, 422, 429, 500, 502, 503] {
        if contains_status(trimmed, status) {
            if let Some(message) = message_for_status(status) {
                return message.to_owned();
            }
        }
    }

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => MSG_GENERIC.to_owned(),
    }
}

// Matches the code as a whole number, so "4035" does not count as 403.
fn contains_status(text: &str, status: u16) -> bool {
    text.split(|c: char| !c.is_ascii_digit())
        .any(|token| token.parse::<u16>().is_ok_and(|value| value == status) && token.len() == 3)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{
        classify, human_message, humanize, retry_delay, retry_delay_with_jitter, MAX_RETRY_DELAY,
    };
    use crate::{ErrorType, Failure, FailureKind};

    fn http(status: u16) -> Failure {
        Failure::http(status, format!("HTTP_{status}"), "boom", None)
    }

    #[test]
    fn server_errors_are_retryable() {
        for status in [500, 502, 503, 504, 599] {
            let judgment = classify(&http(status));
            assert_eq!(judgment.kind, ErrorType::Server);
            assert!(judgment.retryable);
            assert_eq!(judgment.status, Some(status));
        }
    }

    #[test]
    fn client_errors_retry_only_on_408_and_429() {
        for status in [408, 429] {
            let judgment = classify(&http(status));
            assert_eq!(judgment.kind, ErrorType::Client);
            assert!(judgment.retryable, "{status} must be retryable");
        }
        for status in [400, 401, 403, 404, 409, 413, 422] {
            let judgment = classify(&http(status));
            assert_eq!(judgment.kind, ErrorType::Client);
            assert!(!judgment.retryable, "{status} must not be retryable");
        }
    }

    #[test]
    fn structural_kinds_classify_without_status() {
        let timeout = classify(&Failure::timeout(100));
        assert_eq!(timeout.kind, ErrorType::Timeout);
        assert!(timeout.retryable);
        assert_eq!(timeout.status, None);

        let network = classify(&Failure::network("connection refused"));
        assert_eq!(network.kind, ErrorType::Network);
        assert!(network.retryable);
    }

    #[test]
    fn statusless_failures_fall_back_to_message_hints() {
        let mut failure = Failure::network("x");
        failure.kind = FailureKind::Http;

        failure.message = "TypeError: Failed to fetch".to_owned();
        assert_eq!(classify(&failure).kind, ErrorType::Network);

        failure.message = "operation timed out".to_owned();
        assert_eq!(classify(&failure).kind, ErrorType::Timeout);

        failure.message = "something odd".to_owned();
        let judgment = classify(&failure);
        assert_eq!(judgment.kind, ErrorType::Unknown);
        assert!(judgment.retryable);
    }

    #[test]
    fn classify_is_pure() {
        let failure = http(429);
        let before = failure.clone();
        assert_eq!(classify(&failure), classify(&failure));
        assert_eq!(failure, before);
    }

    #[test]
    fn delay_without_jitter_is_exponential() {
        let base = Duration::from_millis(1_000);
        assert_eq!(retry_delay_with_jitter(0, base, 0.0), Duration::from_millis(1_000));
        assert_eq!(retry_delay_with_jitter(1, base, 0.0), Duration::from_millis(2_000));
        assert_eq!(retry_delay_with_jitter(2, base, 0.0), Duration::from_millis(4_000));
    }

    #[test]
    fn full_jitter_adds_thirty_percent() {
        let base = Duration::from_millis(1_000);
        assert_eq!(retry_delay_with_jitter(1, base, 1.0), Duration::from_millis(2_600));
        assert_eq!(retry_delay_with_jitter(1, base, 7.0), Duration::from_millis(2_600));
        assert_eq!(retry_delay_with_jitter(1, base, -1.0), Duration::from_millis(2_000));
    }

    #[test]
    fn delay_is_capped() {
        let base = Duration::from_millis(1_000);
        assert_eq!(retry_delay_with_jitter(5, base, 0.0), MAX_RETRY_DELAY);
        assert_eq!(retry_delay_with_jitter(200, base, 1.0), MAX_RETRY_DELAY);
        assert_eq!(
            retry_delay_with_jitter(3, Duration::from_secs(u64::MAX), 1.0),
            MAX_RETRY_DELAY
        );
    }

    #[test]
    fn sampled_delay_stays_in_window() {
        for base_ms in [1u64, 10, 250, 1_000] {
            for attempt in 0..8 {
                let exponential = base_ms * (1 << attempt);
                let low = Duration::from_millis(exponential).min(MAX_RETRY_DELAY);
                let high = Duration::from_millis(exponential * 13 / 10).min(MAX_RETRY_DELAY);
                for _ in 0..50 {
                    let delay = retry_delay(attempt, Duration::from_millis(base_ms));
                    assert!(delay >= low, "{delay:?} < {low:?}");
                    assert!(delay <= high, "{delay:?} > {high:?}");
                }
            }
        }
    }

    #[test]
    fn status_table_is_fixed() {
        assert_eq!(
            human_message(&http(403)),
            "You do not have permission to perform this action."
        );
        assert_eq!(
            human_message(&http(401)),
            "Your session has expired. Please log in again."
        );
        assert_eq!(
            human_message(&http(429)),
            "Too many requests. Please wait a moment and try again."
        );
        assert_eq!(
            human_message(&http(503)),
            "The service is temporarily unavailable. Please try again later."
        );
    }

    #[test]
    fn kinds_map_to_fixed_sentences() {
        assert_eq!(
            human_message(&Failure::network("dns error")),
            "Unable to connect to the server. Please check your internet connection and try again."
        );
        assert_eq!(
            human_message(&Failure::timeout(60_000)),
            "The request took too long to complete. Please try again."
        );
    }

    #[test]
    fn unmapped_status_uses_capitalised_message() {
        let failure = Failure::http(409, "CONFLICT", "candidate already applied", None);
        assert_eq!(human_message(&failure), "Candidate already applied");
    }

    #[test]
    fn humanize_matches_technical_substrings() {
        assert_eq!(
            humanize("TypeError: Failed to fetch"),
            humanize("NetworkError when attempting to fetch resource")
        );
        assert_eq!(
            humanize("HTTP error! status: 404"),
            "The requested resource was not found."
        );
        assert_eq!(humanize("request id 4035 rejected"), "Request id 4035 rejected");
        assert_eq!(humanize("   "), "An unexpected error occurred. Please try again.");
    }
}
