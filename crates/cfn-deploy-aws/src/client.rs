//! Base AWS HTTP client with SigV4 signing.
//!
//! Sends form-encoded AWS Query API requests and returns the raw XML
//! response, which service modules decode with [`from_xml`].

use crate::config::{AwsCredentials, AwsRegion, RetryConfig, SdkConfig};
use crate::error::{AwsError, AwsResult};
use crate::signing::{self, SigV4Signer};
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

/// Base AWS client that handles signing, retries, and HTTP communication.
#[derive(Debug, Clone)]
pub struct AwsClient {
    http: Client,
    credentials: AwsCredentials,
    region: AwsRegion,
    retry_config: RetryConfig,
    /// Custom endpoint URL override.
    endpoint_override: Option<String>,
    user_agent: String,
}

/// Response from an AWS API call.
#[derive(Debug, Clone)]
pub struct AwsResponse {
    pub status: u16,
    pub body: String,
    pub request_id: Option<String>,
}

impl AwsClient {
    /// Create a new AWS client from an SDK configuration.
    pub fn new(config: &SdkConfig) -> AwsResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(AwsError::from)?;

        let user_agent = match config.app_name {
            Some(ref app) => format!("{}/{} cfn-deploy-aws", app, env!("CARGO_PKG_VERSION")),
            None => format!("cfn-deploy-aws/{}", env!("CARGO_PKG_VERSION")),
        };

        Ok(Self {
            http,
            credentials: config.credentials.clone(),
            region: config.region.clone(),
            retry_config: config.retry_config.clone(),
            endpoint_override: config.endpoint_url.clone(),
            user_agent,
        })
    }

    /// Get the base endpoint for a service.
    pub fn endpoint(&self, service: &str) -> String {
        match self.endpoint_override {
            Some(ref url) => url.clone(),
            None => self.region.endpoint(service),
        }
    }

    pub fn region(&self) -> &AwsRegion {
        &self.region
    }

    /// Execute a signed AWS Query API request (form-encoded body, XML response).
    pub async fn query_request(
        &self,
        service: &str,
        params: &BTreeMap<String, String>,
    ) -> AwsResult<AwsResponse> {
        let endpoint = self.endpoint(service);
        let body = signing::form_encode(params);

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), extract_host(&endpoint));
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded; charset=utf-8".to_string(),
        );

        let result = self.execute_with_retry(service, &endpoint, &headers, &body).await;
        match params.get("Action") {
            Some(action) => result.map_err(|e| e.with_action(action)),
            None => result,
        }
    }

    async fn execute_with_retry(
        &self,
        service: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &str,
    ) -> AwsResult<AwsResponse> {
        let max_attempts = self.retry_config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match self.execute_signed(service, url, headers, body).await {
                Ok(response) if (200..300).contains(&response.status) => return Ok(response),
                Ok(response) => {
                    let error = if response.body.trim_start().starts_with('<') {
                        AwsError::parse_xml_error(service, response.status, &response.body)
                    } else {
                        AwsError::parse_json_error(service, response.status, &response.body)
                    };
                    match (error.request_id.is_none(), response.request_id) {
                        (true, Some(id)) => error.with_request_id(id),
                        _ => error,
                    }
                }
                Err(e) => e,
            };

            attempt += 1;
            if !error.retryable || attempt >= max_attempts {
                return Err(error);
            }

            let delay = self.calculate_backoff(attempt - 1);
            log::warn!(
                "AWS {} retryable error (attempt {}/{}): {} - retrying in {}ms",
                service,
                attempt,
                max_attempts,
                error.code,
                delay
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    async fn execute_signed(
        &self,
        service: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &str,
    ) -> AwsResult<AwsResponse> {
        let signer = SigV4Signer::new(&self.credentials, &self.region.name, service);
        let signed = signer.sign_request("POST", url, headers, body, Utc::now());

        let mut req = self.http.post(&signed.url);
        for (key, value) in &signed.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        req = req.header("user-agent", &self.user_agent);
        if !body.is_empty() {
            req = req.body(body.to_string());
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let request_id = resp
            .headers()
            .get("x-amzn-requestid")
            .or_else(|| resp.headers().get("x-amz-request-id"))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;

        log::debug!("AWS {} responded HTTP {} ({} bytes)", service, status, body.len());

        Ok(AwsResponse {
            status,
            body,
            request_id,
        })
    }

    /// Exponential backoff, capped, with full jitter.
    fn calculate_backoff(&self, attempt: u32) -> u64 {
        use rand::Rng;
        let base = self.retry_config.initial_backoff_ms;
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt));
        let capped = exponential.min(self.retry_config.max_backoff_ms);
        rand::thread_rng().gen_range(0..=capped)
    }
}

/// Extract the host (and non-default port) from a URL string.
fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            let host = u.host_str()?.to_string();
            Some(match u.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            })
        })
        .unwrap_or_else(|| "amazonaws.com".to_string())
}

/// Helper to build Query API parameters with common fields.
pub fn build_query_params(action: &str, version: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("Action".to_string(), action.to_string());
    params.insert("Version".to_string(), version.to_string());
    params
}

/// Add a `Prefix.member.N` list.
pub fn add_member_list(params: &mut BTreeMap<String, String>, prefix: &str, values: &[String]) {
    for (i, value) in values.iter().enumerate() {
        params.insert(format!("{}.member.{}", prefix, i + 1), value.clone());
    }
}

/// Decode a Query-protocol XML response document into `T`.
///
/// The root element's name is not checked; fields map to child elements and
/// unknown elements are skipped.
pub fn from_xml<T: DeserializeOwned>(service: &str, action: &str, body: &str) -> AwsResult<T> {
    quick_xml::de::from_str(body).map_err(|e| {
        AwsError::internal(service, &format!("malformed {} response: {}", action, e)).with_action(action)
    })
}
