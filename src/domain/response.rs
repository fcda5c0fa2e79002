use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Why a fetch did not produce a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The URL could not be turned into a request; the transport was never called
    InvalidUrl,
    /// Connection or protocol failure reported by the transport
    Transport,
    /// The per-fetch timeout elapsed
    Timeout,
    /// The response started but its body could not be read
    Body,
    /// The batch was cancelled before the fetch finished
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidUrl => "invalid_url",
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::Body => "body",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Success,
    Failure(FetchFailure),
}

impl FetchOutcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        FetchOutcome::Failure(FetchFailure {
            kind,
            message: message.into(),
        })
    }
}

/// Result record handed to the pool callback, one per submitted URL.
///
/// When the fetch fails every field except `target_url`, `duration_ns` and
/// `outcome` stays empty, so a zero `response_code` with an empty `header`
/// also signals a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Response headers, one `Key: value\r\n` line per value
    pub header: String,
    #[serde(skip)]
    pub body: Vec<u8>,
    /// Time spent in the transport call, in nanoseconds
    pub duration_ns: u64,
    pub target_url: String,
    /// Set only when the request was redirected
    pub final_url: String,
    pub response_code: u16,
    /// RFC 3339 completion time, local offset
    pub date: String,
    /// First resolved address of the target host, empty if lookup failed
    pub ip: String,
    #[serde(flatten)]
    pub outcome: FetchOutcome,
}

impl FetchResponse {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            header: String::new(),
            body: Vec::new(),
            duration_ns: 0,
            target_url: target_url.into(),
            final_url: String::new(),
            response_code: 0,
            date: String::new(),
            ip: String::new(),
            outcome: FetchOutcome::Success,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Success)
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match &self.outcome {
            FetchOutcome::Success => None,
            FetchOutcome::Failure(failure) => Some(failure),
        }
    }

    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        self.outcome = FetchOutcome::failure(kind, message);
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ns as f64 / 1_000_000.0
    }

    /// The URL the response was actually served from.
    pub fn effective_url(&self) -> &str {
        if self.final_url.is_empty() {
            &self.target_url
        } else {
            &self.final_url
        }
    }

    pub fn stamp_date(&mut self) {
        self.date = Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response_is_empty_success() {
        let response = FetchResponse::new("http://example.com/");
        assert_eq!(response.target_url, "http://example.com/");
        assert!(response.header.is_empty());
        assert!(response.body.is_empty());
        assert_eq!(response.response_code, 0);
        assert_eq!(response.duration_ns, 0);
        assert!(response.is_success());
        assert!(response.failure().is_none());
    }

    #[test]
    fn test_fail_sets_outcome() {
        let mut response = FetchResponse::new("http://example.com/");
        response.fail(FailureKind::Timeout, "deadline elapsed");

        assert!(!response.is_success());
        let failure = response.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.message, "deadline elapsed");
    }

    #[test]
    fn test_effective_url_prefers_final() {
        let mut response = FetchResponse::new("http://a.example/");
        assert_eq!(response.effective_url(), "http://a.example/");

        response.final_url = "http://b.example/".into();
        assert_eq!(response.effective_url(), "http://b.example/");
    }

    #[test]
    fn test_stamp_date_is_rfc3339() {
        let mut response = FetchResponse::new("http://example.com/");
        response.stamp_date();
        assert!(chrono::DateTime::parse_from_rfc3339(&response.date).is_ok());
        // second precision, no fractional part
        assert!(!response.date.contains('.'));
    }

    #[test]
    fn test_json_shape() {
        let mut response = FetchResponse::new("http://example.com/");
        response.body = b"hello".to_vec();
        response.fail(FailureKind::Transport, "connection refused");

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["outcome"], "failure");
        assert_eq!(value["kind"], "transport");
        assert_eq!(value["message"], "connection refused");
        assert!(value.get("body").is_none());

        let ok = serde_json::to_value(FetchResponse::new("http://example.com/")).unwrap();
        assert_eq!(ok["outcome"], "success");
    }

    #[test]
    fn test_duration_ms() {
        let mut response = FetchResponse::new("http://example.com/");
        response.duration_ns = 1_500_000;
        assert!((response.duration_ms() - 1.5).abs() < f64::EPSILON);
    }
}
