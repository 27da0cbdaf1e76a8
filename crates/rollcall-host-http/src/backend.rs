//! reqwest-backed implementation of [`AttendanceBackend`]

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use rollcall_api::{CheckInSubmission, SubmissionReceipt};
use rollcall_host_api::{AttendanceBackend, BackendError, BackendResult};
use rollcall_util::SessionId;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for the attendance backend
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL, e.g. `https://api.example.edu/api`
    pub base_url: Url,
    /// Bearer token sent with every request
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl HttpBackendConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Parse a base URL; only absolute http(s) URLs with a host are accepted
    pub fn parse(base_url: &str) -> BackendResult<Self> {
        let url = Url::parse(base_url).map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        check_base_url(&url)?;
        Ok(Self::new(url))
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

fn check_base_url(url: &Url) -> BackendResult<()> {
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() || url.cannot_be_a_base() {
        return Err(BackendError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

/// Attendance backend speaking JSON over HTTP
pub struct HttpAttendanceBackend {
    client: Client,
    config: HttpBackendConfig,
}

impl HttpAttendanceBackend {
    pub fn new(config: HttpBackendConfig) -> BackendResult<Self> {
        check_base_url(&config.base_url)?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    pub fn submit_url(&self) -> BackendResult<Url> {
        self.endpoint(&["attendance"])
    }

    pub fn toggle_url(&self, session_id: &SessionId) -> BackendResult<Url> {
        self.endpoint(&["attendance", "sessions", session_id.as_str(), "toggle"])
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.config.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl AttendanceBackend for HttpAttendanceBackend {
    async fn submit_check_in(&self, submission: &CheckInSubmission) -> BackendResult<SubmissionReceipt> {
        let url = self.submit_url()?;
        debug!(url = %url, session_id = %submission.session_id, "Submitting check-in");

        let response = self
            .authorize(self.client.post(url).json(submission))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let response = ensure_success(response).await?;

        // The record is stored once the backend answers 2xx, whatever the body says
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Check-in accepted but the response body could not be read");
                String::new()
            }
        };

        Ok(parse_receipt(&body))
    }

    async fn set_attendance_open(&self, session_id: &SessionId, open: bool) -> BackendResult<()> {
        let url = self.toggle_url(session_id)?;
        debug!(url = %url, open, "Toggling attendance");

        let response = self
            .authorize(
                self.client
                    .patch(url)
                    .json(&serde_json::json!({ "isAttendanceOpen": open })),
            )
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        ensure_success(response).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into [`BackendError::Rejected`], keeping the
/// backend's `message` when the body carries one
async fn ensure_success(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body);
    warn!(status = %status, message = ?message, "Backend rejected request");

    Err(BackendError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Pull `message` out of a JSON error body
pub fn extract_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Read whatever receipt details a success body carries.
///
/// Empty, non-JSON and oddly shaped bodies yield an empty receipt.
pub fn parse_receipt(body: &str) -> SubmissionReceipt {
    let body = body.trim();
    if body.is_empty() {
        return SubmissionReceipt::default();
    }

    let value = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(other) => {
            warn!(body = %other, "Unexpected check-in response shape");
            return SubmissionReceipt::default();
        }
        Err(e) => {
            warn!(error = %e, "Check-in response is not JSON");
            return SubmissionReceipt::default();
        }
    };

    let record_id = ["_id", "recordId", "id"]
        .iter()
        .find_map(|key| value.get(*key).and_then(record_id_text));

    SubmissionReceipt {
        record_id,
        message: value.get("message").and_then(Value::as_str).map(str::to_string),
    }
}

/// Record ids arrive as plain strings, numbers or `{ "$oid": "..." }`
fn record_id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
