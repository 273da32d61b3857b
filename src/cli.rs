//! CI inputs.
//!
//! Each input is a flag and falls back to the `INPUT_<NAME>` variable the
//! Actions runner exports for `with:` values. Everything arrives as a raw
//! string and goes through [`crate::inputs`].

use crate::deploy::{DeployFlags, DeployParams};
use crate::error::{DeployError, DeployResult};
use crate::inputs::{parse_arns, parse_bool, parse_number, parse_string, parse_tags};
use crate::links::{ShortenerConfig, DEFAULT_SHORTENER_DOMAIN, DEFAULT_SHORTENER_URL};
use cfn_deploy_aws::{Parameter, RollbackConfiguration, RollbackTrigger, Template};
use clap::Parser;

/// Deploy a CloudFormation stack: create it, or update it through a change set.
#[derive(Parser, Debug, Clone)]
#[command(name = "cfn-deploy", version, about, long_about = None)]
pub struct Inputs {
    /// Stack name
    #[arg(long, env = "INPUT_NAME")]
    pub name: String,

    /// Template file path (relative to the workspace) or https URL
    #[arg(long, env = "INPUT_TEMPLATE")]
    pub template: String,

    /// Comma-separated capabilities
    #[arg(long, env = "INPUT_CAPABILITIES", default_value = "CAPABILITY_IAM")]
    pub capabilities: String,

    /// `Key=Value,...` overrides, or `file://` path to a JSON parameter file
    #[arg(long, env = "INPUT_PARAMETER-OVERRIDES", default_value = "")]
    pub parameter_overrides: String,

    #[arg(long, env = "INPUT_NO-EXECUTE-CHANGESET", default_value = "0")]
    pub no_execute_changeset: String,

    #[arg(long, env = "INPUT_NO-DELETE-FAILED-CHANGESET", default_value = "0")]
    pub no_delete_failed_changeset: String,

    /// Treat an empty change set as success
    #[arg(long, env = "INPUT_NO-FAIL-ON-EMPTY-CHANGESET", default_value = "0")]
    pub no_fail_on_empty_changeset: String,

    #[arg(long, env = "INPUT_DISABLE-ROLLBACK", default_value = "0")]
    pub disable_rollback: String,

    #[arg(long, env = "INPUT_TIMEOUT-IN-MINUTES", default_value = "")]
    pub timeout_in_minutes: String,

    /// Comma-separated SNS topic ARNs
    #[arg(long, env = "INPUT_NOTIFICATION-ARNS", default_value = "")]
    pub notification_arns: String,

    /// Service role CloudFormation assumes
    #[arg(long, env = "INPUT_ROLE-ARN", default_value = "")]
    pub role_arn: String,

    /// JSON tags, list or map form
    #[arg(long, env = "INPUT_TAGS", default_value = "")]
    pub tags: String,

    #[arg(long, env = "INPUT_TERMINATION-PROTECTION", default_value = "0")]
    pub termination_protection: String,

    #[arg(long, env = "INPUT_ROLLBACK-MONITORING-MINUTES", default_value = "")]
    pub rollback_monitoring_minutes: String,

    /// Comma-separated CloudWatch alarm ARNs
    #[arg(long, env = "INPUT_ROLLBACK-TRIGGER-ARNS", default_value = "")]
    pub rollback_trigger_arns: String,

    /// Region; falls back to AWS_REGION / AWS_DEFAULT_REGION
    #[arg(long, env = "INPUT_REGION", default_value = "")]
    pub region: String,

    #[arg(long, env = "INPUT_LINK-SHORTENER-URL", default_value = "")]
    pub link_shortener_url: String,

    #[arg(long, env = "INPUT_LINK-SHORTENER-DOMAIN", default_value = "")]
    pub link_shortener_domain: String,

    /// Bearer token; links are shortened only when this is set
    #[arg(long, env = "INPUT_LINK-SHORTENER-TOKEN", default_value = "", hide_env_values = true)]
    pub link_shortener_token: String,
}

fn optional_u32(field: &str, raw: &str) -> DeployResult<Option<u32>> {
    match parse_number(raw) {
        None => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| DeployError::invalid_input(field, format!("expected a positive number, got {}", n))),
    }
}

impl Inputs {
    pub fn deploy_flags(&self) -> DeployResult<DeployFlags> {
        Ok(DeployFlags {
            no_execute_change_set: parse_bool("no-execute-changeset", &self.no_execute_changeset)?,
            no_delete_failed_change_set: parse_bool(
                "no-delete-failed-changeset",
                &self.no_delete_failed_changeset,
            )?,
            no_fail_on_empty_change_set: parse_bool(
                "no-fail-on-empty-changeset",
                &self.no_fail_on_empty_changeset,
            )?,
        })
    }

    pub fn region(&self) -> Option<&str> {
        Some(self.region.as_str()).filter(|r| !r.is_empty())
    }

    pub fn shortener_config(&self) -> Option<ShortenerConfig> {
        let token = parse_string(&self.link_shortener_token)?;
        Some(ShortenerConfig {
            endpoint: parse_string(&self.link_shortener_url)
                .unwrap_or_else(|| DEFAULT_SHORTENER_URL.to_string()),
            domain: parse_string(&self.link_shortener_domain)
                .unwrap_or_else(|| DEFAULT_SHORTENER_DOMAIN.to_string()),
            token,
        })
    }

    fn rollback_configuration(&self) -> DeployResult<Option<RollbackConfiguration>> {
        let config = RollbackConfiguration {
            monitoring_time_in_minutes: optional_u32(
                "rollback-monitoring-minutes",
                &self.rollback_monitoring_minutes,
            )?,
            rollback_triggers: parse_arns(&self.rollback_trigger_arns)
                .unwrap_or_default()
                .iter()
                .map(|arn| RollbackTrigger::alarm(arn))
                .collect(),
        };
        Ok(Some(config).filter(|c| !c.is_empty()))
    }

    /// Typed deployment request. Template and parameters are resolved by the
    /// caller since they may need the filesystem.
    pub fn deploy_params(&self, template: Template, parameters: Vec<Parameter>) -> DeployResult<DeployParams> {
        Ok(DeployParams {
            stack_name: self.name.trim().to_string(),
            template,
            parameters,
            capabilities: parse_arns(&self.capabilities).unwrap_or_default(),
            tags: parse_tags(&self.tags).unwrap_or_default(),
            role_arn: parse_string(&self.role_arn),
            notification_arns: parse_arns(&self.notification_arns).unwrap_or_default(),
            rollback_configuration: self.rollback_configuration()?,
            disable_rollback: parse_bool("disable-rollback", &self.disable_rollback)?,
            timeout_in_minutes: optional_u32("timeout-in-minutes", &self.timeout_in_minutes)?,
            termination_protection: parse_bool("termination-protection", &self.termination_protection)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfn_deploy_aws::StackTag;

    fn parse(extra: &[&str]) -> Inputs {
        let mut args = vec!["cfn-deploy", "--name", "app", "--template", "template.yaml"];
        args.extend_from_slice(extra);
        Inputs::try_parse_from(args).unwrap()
    }

    fn template() -> Template {
        Template::Body("{}".into())
    }

    #[test]
    fn defaults() {
        let inputs = parse(&[]);
        assert_eq!(inputs.deploy_flags().unwrap(), DeployFlags::default());
        assert!(inputs.shortener_config().is_none());
        assert!(inputs.region().is_none());

        let params = inputs.deploy_params(template(), Vec::new()).unwrap();
        assert_eq!(params.stack_name, "app");
        assert_eq!(params.capabilities, vec!["CAPABILITY_IAM".to_string()]);
        assert!(params.rollback_configuration.is_none());
        assert!(params.timeout_in_minutes.is_none());
        assert!(!params.disable_rollback);
    }

    #[test]
    fn flags_and_settings() {
        let inputs = parse(&[
            "--no-execute-changeset",
            "1",
            "--no-fail-on-empty-changeset",
            "true",
            "--capabilities",
            "CAPABILITY_IAM,CAPABILITY_NAMED_IAM",
            "--timeout-in-minutes",
            "45",
            "--role-arn",
            "arn:aws:iam::1:role/deploy",
            "--tags",
            r#"{"team":"core"}"#,
            "--termination-protection",
            "1",
        ]);
        let flags = inputs.deploy_flags().unwrap();
        assert!(flags.no_execute_change_set);
        assert!(flags.no_fail_on_empty_change_set);
        assert!(!flags.no_delete_failed_change_set);

        let params = inputs.deploy_params(template(), Vec::new()).unwrap();
        assert_eq!(params.capabilities.len(), 2);
        assert_eq!(params.timeout_in_minutes, Some(45));
        assert_eq!(params.role_arn.as_deref(), Some("arn:aws:iam::1:role/deploy"));
        assert_eq!(params.tags, vec![StackTag::new("team", "core")]);
        assert!(params.termination_protection);
    }

    #[test]
    fn rollback_configuration_from_inputs() {
        let triggers = "arn:aws:cloudwatch:us-east-1:1:alarm:a,arn:aws:cloudwatch:us-east-1:1:alarm:b";
        let inputs = parse(&[
            "--rollback-monitoring-minutes",
            "10",
            "--rollback-trigger-arns",
            triggers,
        ]);
        let rollback = inputs
            .deploy_params(template(), Vec::new())
            .unwrap()
            .rollback_configuration
            .unwrap();
        assert_eq!(rollback.monitoring_time_in_minutes, Some(10));
        assert_eq!(rollback.rollback_triggers.len(), 2);
        assert_eq!(rollback.rollback_triggers[0].trigger_type, "AWS::CloudWatch::Alarm");
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let inputs = parse(&["--timeout-in-minutes=-5"]);
        let err = inputs.deploy_params(template(), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("timeout-in-minutes"));
    }

    #[test]
    fn bad_boolean_is_rejected() {
        let inputs = parse(&["--disable-rollback", "maybe"]);
        assert!(inputs.deploy_params(template(), Vec::new()).is_err());
    }

    #[test]
    fn shortener_needs_a_token() {
        let inputs = parse(&["--link-shortener-url", "https://short.example/api"]);
        assert!(inputs.shortener_config().is_none());

        let inputs = parse(&["--link-shortener-token", "tok"]);
        let cfg = inputs.shortener_config().unwrap();
        assert_eq!(cfg.endpoint, DEFAULT_SHORTENER_URL);
        assert_eq!(cfg.domain, DEFAULT_SHORTENER_DOMAIN);
        assert_eq!(cfg.token, "tok");
    }
}
