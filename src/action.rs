//! One deployment run as the CI step sees it: resolve inputs, deploy,
//! publish outputs.

use crate::cli::Inputs;
use crate::deploy::{deploy_stack, DeployContext, DeployOutcome};
use crate::error::{DeployError, DeployResult};
use crate::inputs::{is_url, parse_parameter_file, parse_parameters};
use crate::links::LinkGenerator;
use crate::outputs::{get_stack_outputs, write_outputs};
use crate::provider::StackProvider;
use crate::waiter::WaitSettings;
use cfn_deploy_aws::{AwsClient, CloudFormationClient, Parameter, SdkConfig, Template};
use std::path::{Path, PathBuf};

const PARAMETER_FILE_PREFIX: &str = "file://";

/// `GITHUB_WORKSPACE`, else the current directory.
pub fn workspace_dir() -> DeployResult<PathBuf> {
    match std::env::var_os("GITHUB_WORKSPACE") {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Ok(std::env::current_dir()?),
    }
}

fn resolve(workspace: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// An https URL is handed to CloudFormation as is; anything else is a file
/// whose contents become the template body.
pub fn load_template(raw: &str, workspace: &Path) -> DeployResult<Template> {
    if is_url(raw) {
        log::debug!("using template URL {}", raw);
        return Ok(Template::Url(raw.to_string()));
    }
    let path = resolve(workspace, raw);
    log::debug!("reading template from {}", path.display());
    let body = std::fs::read_to_string(&path).map_err(|source| DeployError::Template {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Template::Body(body))
}

pub fn load_parameters(raw: &str, workspace: &Path) -> DeployResult<Vec<Parameter>> {
    match raw.trim().strip_prefix(PARAMETER_FILE_PREFIX) {
        Some(file) => {
            let path = resolve(workspace, file);
            log::debug!("reading parameter overrides from {}", path.display());
            parse_parameter_file(&std::fs::read_to_string(&path)?)
        }
        None => Ok(parse_parameters(raw)),
    }
}

/// Values published for later workflow steps, in publication order.
pub fn collect_outputs(
    outcome: &DeployOutcome,
    stack_outputs: impl IntoIterator<Item = (String, String)>,
) -> Vec<(String, String)> {
    let mut outputs = vec![("stack-id".to_string(), outcome.stack_id().to_string())];
    if let DeployOutcome::ChangeSetReady {
        change_set_id,
        console_url,
        ..
    } = outcome
    {
        outputs.push(("change-set-id".to_string(), change_set_id.clone()));
        outputs.push(("change-set-url".to_string(), console_url.clone()));
    }
    outputs.extend(stack_outputs);
    outputs
}

/// Deploy against `provider` and publish the outputs.
pub async fn execute<P>(
    inputs: &Inputs,
    provider: &P,
    links: &LinkGenerator,
    waits: WaitSettings,
    workspace: &Path,
    output_file: Option<&Path>,
) -> DeployResult<DeployOutcome>
where
    P: StackProvider + ?Sized,
{
    let template = load_template(inputs.template.trim(), workspace)?;
    let parameters = load_parameters(&inputs.parameter_overrides, workspace)?;
    let params = inputs.deploy_params(template, parameters)?;
    let flags = inputs.deploy_flags()?;

    let ctx = DeployContext {
        provider,
        links,
        waits,
    };
    let outcome = deploy_stack(&ctx, &params, flags).await?;
    log::info!("Deployed stack {}", outcome.stack_id());

    let stack_outputs = get_stack_outputs(provider, outcome.stack_id()).await?;
    write_outputs(&collect_outputs(&outcome, stack_outputs), output_file)?;
    Ok(outcome)
}

/// Full run against AWS with settings from the environment.
pub async fn run(inputs: &Inputs) -> DeployResult<DeployOutcome> {
    let workspace = workspace_dir()?;
    let config = SdkConfig::from_env(inputs.region())?;
    log::debug!("region {}", config.region.name);

    let links = LinkGenerator::new(config.region.clone(), inputs.shortener_config())?;
    let client = CloudFormationClient::new(AwsClient::new(&config)?);
    let output_file = std::env::var_os("GITHUB_OUTPUT")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    execute(
        inputs,
        &client,
        &links,
        WaitSettings::default(),
        &workspace,
        output_file.as_deref(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_template_is_a_url() {
        let t = load_template("https://bucket.s3.amazonaws.com/t.yaml", Path::new("/nowhere")).unwrap();
        assert_eq!(t, Template::Url("https://bucket.s3.amazonaws.com/t.yaml".into()));
    }

    #[test]
    fn template_file_is_read_relative_to_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stack.yaml"), "Resources: {}\n").unwrap();
        let t = load_template("stack.yaml", dir.path()).unwrap();
        assert_eq!(t, Template::Body("Resources: {}\n".into()));
    }

    #[test]
    fn missing_template_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_template("missing.yaml", dir.path()).unwrap_err();
        assert!(matches!(err, DeployError::Template { ref path, .. } if path.ends_with("missing.yaml")));
    }

    #[test]
    fn parameters_inline_or_from_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_parameters("Env=prod", dir.path()).unwrap(),
            vec![Parameter::new("Env", "prod")]
        );

        std::fs::write(
            dir.path().join("params.json"),
            r#"[{"ParameterKey":"Env","ParameterValue":"staging"}]"#,
        )
        .unwrap();
        assert_eq!(
            load_parameters("file://params.json", dir.path()).unwrap(),
            vec![Parameter::new("Env", "staging")]
        );
    }

    #[test]
    fn outputs_lead_with_stack_id() {
        let outcome = DeployOutcome::ChangeSetReady {
            stack_id: "sid".into(),
            change_set_id: "cid".into(),
            console_url: "https://link".into(),
        };
        let outputs = collect_outputs(&outcome, vec![("Bucket".to_string(), "b".to_string())]);
        let keys: Vec<&str> = outputs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["stack-id", "change-set-id", "change-set-url", "Bucket"]);

        let outputs = collect_outputs(&DeployOutcome::Updated { stack_id: "sid".into() }, Vec::new());
        assert_eq!(outputs, vec![("stack-id".to_string(), "sid".to_string())]);
    }
}
