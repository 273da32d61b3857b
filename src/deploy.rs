//! Create-or-update entry point.
//!
//! A stack that does not exist yet is created directly; an existing stack is
//! updated through a change set (see [`crate::change_set`]).

use crate::change_set::{self, change_set_name};
use crate::error::DeployResult;
use crate::links::LinkGenerator;
use crate::provider::StackProvider;
use crate::stack::get_stack;
use crate::waiter::{wait_for_stack, StackWait, WaitSettings};
use cfn_deploy_aws::{
    CreateChangeSetInput, CreateStackInput, Parameter, RollbackConfiguration, StackTag, Template,
};

/// Everything CloudFormation needs to know about the desired stack.
#[derive(Debug, Clone)]
pub struct DeployParams {
    pub stack_name: String,
    pub template: Template,
    pub parameters: Vec<Parameter>,
    pub capabilities: Vec<String>,
    pub tags: Vec<StackTag>,
    pub role_arn: Option<String>,
    pub notification_arns: Vec<String>,
    pub rollback_configuration: Option<RollbackConfiguration>,
    /// Create only.
    pub disable_rollback: bool,
    /// Create only.
    pub timeout_in_minutes: Option<u32>,
    /// Create only.
    pub termination_protection: bool,
}

impl DeployParams {
    pub fn new(stack_name: &str, template: Template) -> Self {
        Self {
            stack_name: stack_name.to_string(),
            template,
            parameters: Vec::new(),
            capabilities: Vec::new(),
            tags: Vec::new(),
            role_arn: None,
            notification_arns: Vec::new(),
            rollback_configuration: None,
            disable_rollback: false,
            timeout_in_minutes: None,
            termination_protection: false,
        }
    }

    fn rollback(&self) -> Option<RollbackConfiguration> {
        self.rollback_configuration.clone().filter(|r| !r.is_empty())
    }

    pub fn create_stack_input(&self) -> CreateStackInput {
        CreateStackInput {
            stack_name: self.stack_name.clone(),
            template: self.template.clone(),
            parameters: self.parameters.clone(),
            tags: self.tags.clone(),
            capabilities: self.capabilities.clone(),
            role_arn: self.role_arn.clone(),
            notification_arns: self.notification_arns.clone(),
            rollback_configuration: self.rollback(),
            disable_rollback: self.disable_rollback,
            timeout_in_minutes: self.timeout_in_minutes,
            enable_termination_protection: self.termination_protection,
        }
    }

    pub fn change_set_input(&self) -> CreateChangeSetInput {
        CreateChangeSetInput {
            stack_name: self.stack_name.clone(),
            change_set_name: change_set_name(&self.stack_name),
            template: self.template.clone(),
            parameters: self.parameters.clone(),
            tags: self.tags.clone(),
            capabilities: self.capabilities.clone(),
            role_arn: self.role_arn.clone(),
            notification_arns: self.notification_arns.clone(),
            rollback_configuration: self.rollback(),
            description: None,
        }
    }
}

/// Behaviour switches for the change-set path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployFlags {
    pub no_execute_change_set: bool,
    pub no_delete_failed_change_set: bool,
    pub no_fail_on_empty_change_set: bool,
}

/// Collaborators shared by one deployment run.
pub struct DeployContext<'a, P: StackProvider + ?Sized> {
    pub provider: &'a P,
    pub links: &'a LinkGenerator,
    pub waits: WaitSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// A new stack was created.
    Created { stack_id: String },
    /// The change set was executed and the update completed.
    Updated { stack_id: String },
    /// The change set was empty and that is allowed.
    Unchanged { stack_id: String },
    /// The change set is waiting for someone to execute it.
    ChangeSetReady {
        stack_id: String,
        change_set_id: String,
        console_url: String,
    },
}

impl DeployOutcome {
    pub fn stack_id(&self) -> &str {
        match self {
            DeployOutcome::Created { stack_id }
            | DeployOutcome::Updated { stack_id }
            | DeployOutcome::Unchanged { stack_id }
            | DeployOutcome::ChangeSetReady { stack_id, .. } => stack_id,
        }
    }
}

/// Create the stack if it is missing, otherwise update it via a change set.
pub async fn deploy_stack<P>(
    ctx: &DeployContext<'_, P>,
    params: &DeployParams,
    flags: DeployFlags,
) -> DeployResult<DeployOutcome>
where
    P: StackProvider + ?Sized,
{
    let Some(stack) = get_stack(ctx.provider, &params.stack_name).await? else {
        log::info!("Creating CloudFormation stack {}", params.stack_name);
        let stack_id = ctx.provider.create_stack(&params.create_stack_input()).await?;
        log::debug!("CreateStack accepted, stack id {}", stack_id);
        wait_for_stack(
            ctx.provider,
            &stack_id,
            StackWait::CreateComplete,
            ctx.waits.stack,
        )
        .await?;
        log::info!("Stack {} created", params.stack_name);
        return Ok(DeployOutcome::Created { stack_id });
    };

    log::info!("Updating CloudFormation stack {}", params.stack_name);
    change_set::update_stack(ctx, &stack, &params.change_set_input(), flags).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> DeployParams {
        let mut p = DeployParams::new("app", Template::Url("https://bucket/t.yaml".into()));
        p.capabilities = vec!["CAPABILITY_IAM".into()];
        p.timeout_in_minutes = Some(30);
        p.termination_protection = true;
        p
    }

    #[test]
    fn change_set_input_is_named_after_stack() {
        let input = params().change_set_input();
        assert_eq!(input.change_set_name, "app-CS");
        assert_eq!(input.stack_name, "app");
        assert_eq!(input.capabilities, vec!["CAPABILITY_IAM".to_string()]);
    }

    #[test]
    fn create_input_carries_create_only_settings() {
        let input = params().create_stack_input();
        assert_eq!(input.timeout_in_minutes, Some(30));
        assert!(input.enable_termination_protection);
        assert!(!input.disable_rollback);
    }

    #[test]
    fn empty_rollback_configuration_is_dropped() {
        let mut p = params();
        p.rollback_configuration = Some(RollbackConfiguration::default());
        assert!(p.create_stack_input().rollback_configuration.is_none());
        assert!(p.change_set_input().rollback_configuration.is_none());

        p.rollback_configuration = Some(RollbackConfiguration {
            monitoring_time_in_minutes: Some(5),
            rollback_triggers: Vec::new(),
        });
        assert!(p.change_set_input().rollback_configuration.is_some());
    }

    #[test]
    fn outcome_exposes_stack_id() {
        let outcome = DeployOutcome::ChangeSetReady {
            stack_id: "sid".into(),
            change_set_id: "cid".into(),
            console_url: "https://x".into(),
        };
        assert_eq!(outcome.stack_id(), "sid");
    }
}
