use serde::Deserialize;

/// Optional fields a server may put in an error body.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Detail>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Detail {
    Text(String),
    Object {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    // Validation error lists and anything else the server sends.
    Other(serde_json::Value),
}

impl ErrorBody {
    /// Detail text, then detail object message, then top-level message.
    pub fn message(&self) -> Option<&str> {
        let detail = match &self.detail {
            Some(Detail::Text(text)) => Some(text.as_str()),
            Some(Detail::Object { message, error }) => message.as_deref().or(error.as_deref()),
            _ => None,
        };
        detail
            .or(self.message.as_deref())
            .filter(|text| !text.trim().is_empty())
    }

    /// `error_code`, then the `error` field of an object `detail`.
    pub fn code(&self) -> Option<&str> {
        let detail_error = match &self.detail {
            Some(Detail::Object { error, .. }) => error.as_deref(),
            _ => None,
        };
        self.error_code
            .as_deref()
            .or(detail_error)
            .filter(|code| !code.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ErrorBody;

    fn parse(value: serde_json::Value) -> ErrorBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn detail_string_wins_over_message() {
        let body = parse(json!({"detail": "Job not found", "message": "ignored"}));
        assert_eq!(body.message(), Some("Job not found"));
        assert_eq!(body.code(), None);
    }

    #[test]
    fn detail_object_supplies_message_and_code() {
        let body = parse(json!({
            "detail": {"error": "QUOTA_EXCEEDED", "message": "Monthly interview quota exceeded"}
        }));
        assert_eq!(body.message(), Some("Monthly interview quota exceeded"));
        assert_eq!(body.code(), Some("QUOTA_EXCEEDED"));
    }

    #[test]
    fn error_code_wins_over_detail_error() {
        let body = parse(json!({
            "detail": {"error": "FROM_DETAIL"},
            "error_code": "FROM_TOP"
        }));
        assert_eq!(body.code(), Some("FROM_TOP"));
        assert_eq!(body.message(), Some("FROM_DETAIL"));
    }

    #[test]
    fn validation_list_falls_back_to_message() {
        let body = parse(json!({
            "detail": [{"loc": ["body", "email"], "msg": "field required"}],
            "message": "Validation failed"
        }));
        assert_eq!(body.message(), Some("Validation failed"));
    }

    #[test]
    fn empty_body_has_nothing() {
        let body = parse(json!({}));
        assert_eq!(body.message(), None);
        assert_eq!(body.code(), None);
    }
}
