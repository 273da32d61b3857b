//! Deployment error types.

use cfn_deploy_aws::AwsError;

/// Result type alias for deployment operations.
pub type DeployResult<T> = std::result::Result<T, DeployError>;

/// Errors that end a deployment run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// CloudFormation (or the transport underneath it) rejected a call.
    #[error(transparent)]
    Aws(#[from] AwsError),

    /// The change set failed for a reason other than "nothing to change".
    #[error("Failed to create Change Set: {reason}")]
    ChangeSetFailed { reason: String },

    /// A waiter observed a terminal failure status.
    #[error("{resource} '{name}' entered {status}: {reason}")]
    WaitFailed {
        resource: &'static str,
        name: String,
        status: String,
        reason: String,
    },

    /// A waiter ran out of attempts before reaching a terminal status.
    #[error("timed out after {attempts} polls waiting for {resource} '{name}' (last status {status})")]
    WaitTimedOut {
        resource: &'static str,
        name: String,
        status: String,
        attempts: u32,
    },

    /// The link-shortening service failed.
    #[error("link shortener request failed: {0}")]
    Shortener(String),

    /// An input field could not be interpreted.
    #[error("invalid input '{field}': {message}")]
    InvalidInput { field: String, message: String },

    /// The template file could not be read.
    #[error("failed to read template '{path}': {source}")]
    Template {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DeployError {
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
