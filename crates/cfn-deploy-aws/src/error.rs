//! AWS error types mirroring the official AWS SDK error model.
//!
//! CloudFormation reports failures as Query-protocol XML error documents.
//! This module turns those (and transport failures) into a single error type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level error type for all AWS operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsError {
    /// The AWS error code (e.g., "ValidationError", "AccessDenied").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// The HTTP status code returned by the AWS API.
    pub status_code: u16,
    /// AWS request ID for tracing.
    pub request_id: Option<String>,
    /// The AWS service that returned the error.
    pub service: String,
    /// The specific API action that failed.
    pub action: Option<String>,
    /// Whether this error is retryable.
    pub retryable: bool,
}

impl fmt::Display for AwsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AWS {} error [{}]: {} (HTTP {})",
            self.service, self.code, self.message, self.status_code
        )?;
        if let Some(ref req_id) = self.request_id {
            write!(f, " [RequestId: {}]", req_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for AwsError {}

impl AwsError {
    /// Create a new AWS error.
    pub fn new(service: &str, code: &str, message: &str, status_code: u16) -> Self {
        let retryable = Self::is_retryable_code(code, status_code);
        Self {
            code: code.to_string(),
            message: message.to_string(),
            status_code,
            request_id: None,
            service: service.to_string(),
            action: None,
            retryable,
        }
    }

    /// Create from a generic string error with a service context.
    pub fn internal(service: &str, msg: &str) -> Self {
        Self {
            code: "InternalError".to_string(),
            message: msg.to_string(),
            status_code: 500,
            request_id: None,
            service: service.to_string(),
            action: None,
            retryable: false,
        }
    }

    /// Build a credential error.
    pub fn credential_error(message: &str) -> Self {
        Self {
            code: "CredentialError".to_string(),
            message: message.to_string(),
            status_code: 401,
            request_id: None,
            service: "sts".to_string(),
            action: None,
            retryable: false,
        }
    }

    /// Build a validation error.
    pub fn validation(service: &str, message: &str) -> Self {
        Self {
            code: "ValidationError".to_string(),
            message: message.to_string(),
            status_code: 400,
            request_id: None,
            service: service.to_string(),
            action: None,
            retryable: false,
        }
    }

    /// With request ID.
    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    /// With action.
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    /// True for the `ValidationError` code CloudFormation uses for bad
    /// input, including lookups of stacks that do not exist.
    pub fn is_validation_error(&self) -> bool {
        self.code == "ValidationError"
    }

    /// Determine if an error code/status is retryable per AWS SDK retry policy.
    fn is_retryable_code(code: &str, status_code: u16) -> bool {
        if status_code == 429 || status_code == 502 || status_code == 503 || status_code == 504 {
            return true;
        }
        matches!(
            code,
            "Throttling"
                | "ThrottlingException"
                | "RequestThrottled"
                | "RequestLimitExceeded"
                | "TooManyRequestsException"
                | "InternalError"
                | "InternalFailure"
                | "ServiceUnavailable"
                | "RequestTimeout"
                | "RequestTimeoutException"
        )
    }

    /// Parse an AWS XML error response.
    ///
    /// ```xml
    /// <ErrorResponse>
    ///   <Error>
    ///     <Type>Sender</Type>
    ///     <Code>ValidationError</Code>
    ///     <Message>Stack with id foo does not exist</Message>
    ///   </Error>
    ///   <RequestId>abc-123</RequestId>
    /// </ErrorResponse>
    /// ```
    ///
    /// A body that is not such a document (an HTML gateway page, say)
    /// yields `UnknownError` with the HTTP status as the message.
    pub fn parse_xml_error(service: &str, status_code: u16, body: &str) -> Self {
        let parsed: ErrorResponse = quick_xml::de::from_str(body).unwrap_or_default();
        let detail = parsed.error.unwrap_or_default();
        let code = detail.code.unwrap_or_else(|| "UnknownError".to_string());
        let message = detail
            .message
            .unwrap_or_else(|| format!("HTTP {} from {}", status_code, service));

        let mut err = Self::new(service, &code, &message, status_code);
        err.request_id = parsed.request_id;
        err
    }

    /// Parse an AWS JSON error response (`{"__type": …, "message": …}`).
    pub fn parse_json_error(service: &str, status_code: u16, body: &str) -> Self {
        if let Ok(val) = serde_json::from_str::<serde_json::Value>(body) {
            let code = val
                .get("__type")
                .or_else(|| val.get("code"))
                .or_else(|| val.get("Code"))
                .and_then(|v| v.as_str())
                .map(|s| s.rsplit('#').next().unwrap_or(s).to_string())
                .unwrap_or_else(|| "UnknownError".to_string());
            let message = val
                .get("message")
                .or_else(|| val.get("Message"))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error")
                .to_string();
            Self::new(service, &code, &message, status_code)
        } else {
            let snippet: String = body.chars().take(200).collect();
            Self::new(
                service,
                "ParseError",
                &format!("Failed to parse error response: {}", snippet),
                status_code,
            )
        }
    }
}

impl From<reqwest::Error> for AwsError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            code: "HttpError".to_string(),
            message: err.to_string(),
            status_code: err.status().map(|s| s.as_u16()).unwrap_or(0),
            request_id: None,
            service: "http".to_string(),
            action: None,
            retryable: err.is_timeout() || err.is_connect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    error: Option<ErrorDetail>,
    #[serde(alias = "RequestID")]
    request_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// Convenience result type for AWS operations.
pub type AwsResult<T> = Result<T, AwsError>;
