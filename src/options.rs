use std::time::Duration;

/// Base address used when `RECRUIT_API_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configures the API address, timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Base address every request path is joined onto.
    pub base_url: String,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: 60_000,
            max_retries: 2,
            retry_backoff_ms: 1_000,
        }
    }
}

impl ClientOptions {
    /// Reads options from the environment.
    ///
    /// Reads:
    /// - `RECRUIT_API_URL` — base address (defaults to `http://localhost:8000`)
    /// - `RECRUIT_API_TIMEOUT_MS` — optional per-attempt timeout
    /// - `RECRUIT_API_MAX_RETRIES` — optional retry budget
    /// - `RECRUIT_API_RETRY_BACKOFF_MS` — optional base backoff
    ///
    /// Returns an error if a numeric variable is set but not a number.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(url) = lookup("RECRUIT_API_URL") {
            if !url.trim().is_empty() {
                options.base_url = url.trim().to_owned();
            }
        }
        if let Some(value) = parse_var(&lookup, "RECRUIT_API_TIMEOUT_MS")? {
            options.timeout_ms = value;
        }
        if let Some(value) = parse_var(&lookup, "RECRUIT_API_MAX_RETRIES")? {
            options.max_retries = value;
        }
        if let Some(value) = parse_var(&lookup, "RECRUIT_API_RETRY_BACKOFF_MS")? {
            options.retry_backoff_ms = value;
        }

        Ok(options)
    }

    /// Budget applied to ordinary verb calls.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{key} must be a non-negative integer, got '{raw}'")),
        _ => Ok(None),
    }
}

/// Timeout and retry budget for a single call.
///
/// Passed into each call instead of mutating the client, so an upload's
/// budget never leaks into other calls, even when they overlap.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestOptions {
    pub timeout_ms: u64,
    pub max_retries: usize,
}

impl RequestOptions {
    /// Budget for file uploads.
    ///
    /// Kept separate from [`ClientOptions::default`] even where the numbers
    /// match: uploads are expensive to repeat and are tuned on their own.
    pub const fn upload() -> Self {
        Self {
            timeout_ms: 60_000,
            max_retries: 2,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ClientOptions, RequestOptions, DEFAULT_BASE_URL};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.base_url, DEFAULT_BASE_URL);
        assert_eq!(options.timeout_ms, 60_000);
        assert_eq!(options.max_retries, 2);
        assert_eq!(options.retry_backoff_ms, 1_000);
        assert_eq!(
            RequestOptions::upload(),
            RequestOptions {
                timeout_ms: 60_000,
                max_retries: 2
            }
        );
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let options = ClientOptions::from_lookup(lookup(&[])).unwrap();
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn environment_overrides() {
        let options = ClientOptions::from_lookup(lookup(&[
            ("RECRUIT_API_URL", " https://api.example.com "),
            ("RECRUIT_API_TIMEOUT_MS", "5000"),
            ("RECRUIT_API_MAX_RETRIES", "4"),
            ("RECRUIT_API_RETRY_BACKOFF_MS", ""),
        ]))
        .unwrap();
        assert_eq!(options.base_url, "https://api.example.com");
        assert_eq!(options.timeout_ms, 5_000);
        assert_eq!(options.max_retries, 4);
        assert_eq!(options.retry_backoff_ms, 1_000);
    }

    #[test]
    fn malformed_number_is_rejected() {
        let err = ClientOptions::from_lookup(lookup(&[("RECRUIT_API_MAX_RETRIES", "two")]))
            .unwrap_err();
        assert!(err.contains("RECRUIT_API_MAX_RETRIES"));
    }
}
