//! AWS configuration, credential resolution, and region handling.
//!
//! Mirrors the design of `aws-config` and `aws-credential-types` from the
//! official AWS SDK for Rust, reduced to what a CI runner provides: static
//! or temporary credentials in environment variables and a region name.

use crate::error::{AwsError, AwsResult};
use serde::{Deserialize, Serialize};

// ── Regions ─────────────────────────────────────────────────────────────

/// AWS region configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwsRegion {
    /// Region code (e.g., "us-east-1").
    pub name: String,
}

impl AwsRegion {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Return the service endpoint for a given service in this region.
    /// Follows the standard AWS endpoint pattern: `https://{service}.{region}.amazonaws.com`
    pub fn endpoint(&self, service: &str) -> String {
        if self.name.starts_with("cn-") {
            format!("https://{}.{}.amazonaws.com.cn", service, self.name)
        } else {
            format!("https://{}.{}.amazonaws.com", service, self.name)
        }
    }

    /// Return the partition for this region (aws, aws-cn, aws-us-gov).
    pub fn partition(&self) -> &str {
        if self.name.starts_with("cn-") {
            "aws-cn"
        } else if self.name.starts_with("us-gov-") {
            "aws-us-gov"
        } else {
            "aws"
        }
    }

    /// Host serving the management console for this region's partition.
    pub fn console_host(&self) -> &str {
        match self.partition() {
            "aws-cn" => "console.amazonaws.cn",
            "aws-us-gov" => "console.amazonaws-us-gov.com",
            _ => "console.aws.amazon.com",
        }
    }
}

impl Default for AwsRegion {
    fn default() -> Self {
        Self {
            name: "us-east-1".to_string(),
        }
    }
}

// ── Credentials ─────────────────────────────────────────────────────────

/// AWS credentials as defined by the AWS SDK credential-types crate.
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsCredentials {
    /// Access key ID (starts with AKIA for long-term, ASIA for temporary).
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Optional session token (present for temporary credentials via STS).
    pub session_token: Option<String>,
    /// Provider name for debugging.
    pub provider_name: Option<String>,
}

// Keys stay out of logs.
impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .field("provider_name", &self.provider_name)
            .finish()
    }
}

impl AwsCredentials {
    /// Create new long-term credentials.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
            provider_name: Some("static".to_string()),
        }
    }

    /// Resolve credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key = lookup("AWS_ACCESS_KEY_ID").filter(|v| !v.is_empty())?;
        let secret_key = lookup("AWS_SECRET_ACCESS_KEY").filter(|v| !v.is_empty())?;
        let session_token = lookup("AWS_SESSION_TOKEN").filter(|v| !v.is_empty());
        Some(Self {
            access_key_id: access_key,
            secret_access_key: secret_key,
            session_token,
            provider_name: Some("environment".to_string()),
        })
    }
}

// ── Retry Configuration ─────────────────────────────────────────────────

/// Retry configuration following the AWS SDK standard retry mode:
/// exponential backoff with full jitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (default: 3).
    pub max_attempts: u32,
    /// Initial backoff duration in milliseconds (default: 500).
    pub initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds (default: 20_000).
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 20_000,
        }
    }
}

// ── SDK Config ──────────────────────────────────────────────────────────

/// Complete SDK configuration, aggregating credentials, region, and
/// behavioral settings. Mirrors `aws_config::SdkConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    pub region: AwsRegion,
    pub credentials: AwsCredentials,
    pub retry_config: RetryConfig,
    /// Custom endpoint URL override (for LocalStack and friends).
    pub endpoint_url: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// User-Agent suffix appended to requests.
    pub app_name: Option<String>,
}

impl SdkConfig {
    /// Build from the process environment. `region` wins over
    /// `AWS_REGION` / `AWS_DEFAULT_REGION` when given.
    pub fn from_env(region: Option<&str>) -> AwsResult<Self> {
        Self::from_lookup(region, |key| std::env::var(key).ok())
    }

    /// Build through an arbitrary variable lookup.
    pub fn from_lookup<F>(region: Option<&str>, lookup: F) -> AwsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = region
            .map(str::to_string)
            .filter(|r| !r.is_empty())
            .or_else(|| lookup("AWS_REGION").filter(|r| !r.is_empty()))
            .or_else(|| lookup("AWS_DEFAULT_REGION").filter(|r| !r.is_empty()))
            .ok_or_else(|| {
                AwsError::validation("config", "Region is required (set AWS_REGION or pass --region)")
            })?;

        let credentials = AwsCredentials::from_lookup(&lookup).ok_or_else(|| {
            AwsError::credential_error(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set in the environment",
            )
        })?;

        if !credentials.access_key_id.starts_with("AKIA")
            && !credentials.access_key_id.starts_with("ASIA")
        {
            log::warn!(
                "Access key ID '{}' has unusual prefix; expected AKIA* or ASIA*",
                credentials.access_key_id.chars().take(4).collect::<String>()
            );
        }

        Ok(Self {
            region: AwsRegion::new(&region),
            credentials,
            retry_config: RetryConfig::default(),
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|u| !u.is_empty()),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            app_name: Some("cfn-deploy".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn region_endpoint_standard() {
        let r = AwsRegion::new("us-east-1");
        assert_eq!(r.endpoint("cloudformation"), "https://cloudformation.us-east-1.amazonaws.com");
        assert_eq!(r.console_host(), "console.aws.amazon.com");
    }

    #[test]
    fn region_endpoint_china() {
        let r = AwsRegion::new("cn-north-1");
        assert_eq!(r.endpoint("cloudformation"), "https://cloudformation.cn-north-1.amazonaws.com.cn");
        assert_eq!(r.partition(), "aws-cn");
        assert_eq!(r.console_host(), "console.amazonaws.cn");
    }

    #[test]
    fn region_govcloud() {
        let r = AwsRegion::new("us-gov-west-1");
        assert_eq!(r.partition(), "aws-us-gov");
    }

    #[test]
    fn credentials_from_lookup_temporary() {
        let c = AwsCredentials::from_lookup(env(&[
            ("AWS_ACCESS_KEY_ID", "ASIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_SESSION_TOKEN", "token"),
        ]))
        .unwrap();
        assert_eq!(c.session_token.as_deref(), Some("token"));
        assert_eq!(c.provider_name.as_deref(), Some("environment"));
    }

    #[test]
    fn credentials_missing_secret() {
        assert!(AwsCredentials::from_lookup(env(&[("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE")])).is_none());
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let c = AwsCredentials::new("AKIAEXAMPLE", "super-secret");
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("AKIAEXAMPLE"));
    }

    #[test]
    fn sdk_config_region_precedence() {
        let lookup = env(&[
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_REGION", "eu-west-1"),
            ("AWS_DEFAULT_REGION", "us-west-2"),
        ]);
        let cfg = SdkConfig::from_lookup(None, &lookup).unwrap();
        assert_eq!(cfg.region.name, "eu-west-1");
        let cfg = SdkConfig::from_lookup(Some("ap-south-1"), &lookup).unwrap();
        assert_eq!(cfg.region.name, "ap-south-1");
    }

    #[test]
    fn sdk_config_endpoint_override() {
        let cfg = SdkConfig::from_lookup(
            Some("us-east-1"),
            env(&[
                ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
                ("AWS_SECRET_ACCESS_KEY", "secret"),
                ("AWS_ENDPOINT_URL", "http://localhost:4566"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.endpoint_url.as_deref(), Some("http://localhost:4566"));
    }

    #[test]
    fn sdk_config_requires_region() {
        let err = SdkConfig::from_lookup(
            None,
            env(&[("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"), ("AWS_SECRET_ACCESS_KEY", "secret")]),
        )
        .unwrap_err();
        assert!(err.message.contains("Region"));
    }

    #[test]
    fn sdk_config_requires_credentials() {
        let err = SdkConfig::from_lookup(Some("us-east-1"), env(&[])).unwrap_err();
        assert_eq!(err.code, "CredentialError");
    }
}
