//! Console deep links for change sets, optionally shortened.

use crate::error::{DeployError, DeployResult};
use cfn_deploy_aws::signing::uri_encode;
use cfn_deploy_aws::AwsRegion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_SHORTENER_URL: &str = "https://api-ssl.bitly.com/v4/shorten";
pub const DEFAULT_SHORTENER_DOMAIN: &str = "bit.ly";

/// Where to shorten links and with which credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ShortenerConfig {
    pub endpoint: String,
    pub domain: String,
    pub token: String,
}

impl ShortenerConfig {
    pub fn new(token: &str) -> Self {
        Self {
            endpoint: DEFAULT_SHORTENER_URL.to_string(),
            domain: DEFAULT_SHORTENER_DOMAIN.to_string(),
            token: token.to_string(),
        }
    }
}

impl fmt::Debug for ShortenerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortenerConfig")
            .field("endpoint", &self.endpoint)
            .field("domain", &self.domain)
            .field("token", &"***")
            .finish()
    }
}

#[derive(Serialize)]
struct ShortenRequest<'a> {
    long_url: &'a str,
    domain: &'a str,
}

#[derive(Deserialize)]
struct ShortenResponse {
    link: String,
}

/// Client for a bitly-style link shortening API.
#[derive(Debug, Clone)]
pub struct LinkShortener {
    http: reqwest::Client,
    config: ShortenerConfig,
}

impl LinkShortener {
    pub fn new(config: ShortenerConfig) -> DeployResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DeployError::Shortener(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub async fn shorten(&self, long_url: &str) -> DeployResult<String> {
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.token)
            .json(&ShortenRequest {
                long_url,
                domain: &self.config.domain,
            })
            .send()
            .await
            .map_err(|e| DeployError::Shortener(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeployError::Shortener(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ShortenResponse = response
            .json()
            .await
            .map_err(|e| DeployError::Shortener(format!("unexpected response: {}", e)))?;
        Ok(parsed.link)
    }
}

/// Builds console links for the configured region.
#[derive(Debug, Clone)]
pub struct LinkGenerator {
    region: AwsRegion,
    shortener: Option<LinkShortener>,
}

impl LinkGenerator {
    pub fn new(region: AwsRegion, shortener: Option<ShortenerConfig>) -> DeployResult<Self> {
        let shortener = shortener.map(LinkShortener::new).transpose()?;
        Ok(Self { region, shortener })
    }

    /// The change-set review page in the CloudFormation console.
    pub fn console_url(&self, stack_id: &str, change_set_id: &str) -> String {
        format!(
            "https://{}/cloudformation/home?region={}#/stacks/changesets/changes?stackId={}&changeSetId={}",
            self.region.console_host(),
            self.region.name,
            uri_encode(stack_id),
            uri_encode(change_set_id)
        )
    }

    /// Console link for a change set, shortened when a shortener is set up.
    /// A failing shortener fails the call; there is no fallback to the long URL.
    /// Leaving the shortener unconfigured is a configuration choice, not a
    /// fallback.
    pub async fn gen_cfn_url(&self, stack_id: &str, change_set_id: &str) -> DeployResult<String> {
        let long_url = self.console_url(stack_id, change_set_id);
        match self.shortener {
            Some(ref shortener) => shortener.shorten(&long_url).await,
            None => Ok(long_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STACK_ID: &str = "arn:aws:cloudformation:us-east-1:123456789012:stack/app/abc";
    const CS_ID: &str = "arn:aws:cloudformation:us-east-1:123456789012:changeSet/app-CS/def";

    fn config(endpoint: String) -> ShortenerConfig {
        ShortenerConfig {
            endpoint,
            domain: "bit.ly".into(),
            token: "tok123".into(),
        }
    }

    #[test]
    fn console_url_encodes_ids() {
        let links = LinkGenerator::new(AwsRegion::new("us-east-1"), None).unwrap();
        assert_eq!(
            links.console_url(STACK_ID, CS_ID),
            "https://console.aws.amazon.com/cloudformation/home?region=us-east-1#/stacks/changesets/changes?\
             stackId=arn%3Aaws%3Acloudformation%3Aus-east-1%3A123456789012%3Astack%2Fapp%2Fabc&\
             changeSetId=arn%3Aaws%3Acloudformation%3Aus-east-1%3A123456789012%3AchangeSet%2Fapp-CS%2Fdef"
        );
    }

    #[test]
    fn console_url_uses_partition_host() {
        let links = LinkGenerator::new(AwsRegion::new("cn-north-1"), None).unwrap();
        assert!(links
            .console_url("s", "c")
            .starts_with("https://console.amazonaws.cn/cloudformation/home?region=cn-north-1#"));
    }

    #[test]
    fn debug_redacts_token() {
        let dbg = format!("{:?}", ShortenerConfig::new("secret-token"));
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains(DEFAULT_SHORTENER_URL));
    }

    #[tokio::test]
    async fn no_shortener_returns_long_url() {
        let links = LinkGenerator::new(AwsRegion::new("eu-west-1"), None).unwrap();
        let url = links.gen_cfn_url(STACK_ID, CS_ID).await.unwrap();
        assert_eq!(url, links.console_url(STACK_ID, CS_ID));
    }

    #[tokio::test]
    async fn shortener_posts_long_url_with_bearer_token() {
        let server = MockServer::start().await;
        let links = LinkGenerator::new(
            AwsRegion::new("us-east-1"),
            Some(config(format!("{}/v4/shorten", server.uri()))),
        )
        .unwrap();

        Mock::given(method("POST"))
            .and(path("/v4/shorten"))
            .and(header("authorization", "Bearer tok123"))
            .and(body_json(json!({
                "long_url": links.console_url(STACK_ID, CS_ID),
                "domain": "bit.ly",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"link": "https://bit.ly/abc"})))
            .expect(1)
            .mount(&server)
            .await;

        let url = links.gen_cfn_url(STACK_ID, CS_ID).await.unwrap();
        assert_eq!(url, "https://bit.ly/abc");
    }

    #[tokio::test]
    async fn shortener_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/shorten"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
            .expect(1)
            .mount(&server)
            .await;
        let links = LinkGenerator::new(
            AwsRegion::new("us-east-1"),
            Some(config(format!("{}/v4/shorten", server.uri()))),
        )
        .unwrap();

        let err = links.gen_cfn_url(STACK_ID, CS_ID).await.unwrap_err();
        assert!(matches!(err, DeployError::Shortener(ref m) if m.contains("HTTP 500") && m.contains("boom")));
    }

    #[tokio::test]
    async fn shortener_rejects_unexpected_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc"})))
            .mount(&server)
            .await;
        let links = LinkGenerator::new(AwsRegion::new("us-east-1"), Some(config(server.uri()))).unwrap();

        let err = links.gen_cfn_url(STACK_ID, CS_ID).await.unwrap_err();
        assert!(matches!(err, DeployError::Shortener(ref m) if m.starts_with("unexpected response")));
    }
}
