//! Change-set lifecycle for updates to an existing stack.
//!
//! ```text
//! create ──▶ wait ──┬──▶ no-execute ──▶ ChangeSetReady
//!                   │
//!                   ├──▶ execute ──▶ wait update ──▶ Updated
//!                   │
//!                   └──▶ (wait failed) cleanup ──┬──▶ Unchanged
//!                                                └──▶ error
//! ```

use crate::deploy::{DeployContext, DeployFlags, DeployOutcome};
use crate::error::{DeployError, DeployResult};
use crate::provider::StackProvider;
use crate::waiter::{wait_for_change_set, wait_for_stack, StackWait};
use cfn_deploy_aws::{ChangeSet, ChangeSetStatus, CreateChangeSetInput, Stack};

pub const CHANGE_SET_SUFFIX: &str = "-CS";

/// Status reasons CloudFormation gives for a change set with nothing in it.
pub const EMPTY_CHANGE_SET_MESSAGES: &[&str] = &[
    "No updates are to be performed",
    "The submitted information didn't contain changes",
];

pub fn change_set_name(stack_name: &str) -> String {
    format!("{}{}", stack_name, CHANGE_SET_SUFFIX)
}

pub fn is_empty_change_set_reason(reason: &str) -> bool {
    EMPTY_CHANGE_SET_MESSAGES.iter().any(|m| reason.contains(m))
}

fn log_changes(change_set: &ChangeSet) {
    if change_set.changes.is_empty() {
        log::info!("Change set {} has no resource changes", change_set.change_set_name);
        return;
    }
    for change in &change_set.changes {
        if let Some(ref rc) = change.resource_change {
            log::info!(
                "  {} {} ({}){}",
                rc.action,
                rc.logical_resource_id,
                rc.resource_type,
                match rc.replacement.as_deref() {
                    Some("True") => " [replacement]",
                    Some("Conditional") => " [conditional replacement]",
                    _ => "",
                }
            );
        }
    }
}

/// Called after the change-set wait failed. An empty change set may still be
/// a success; anything else is reported with CloudFormation's reason.
async fn cleanup_change_set<P>(
    provider: &P,
    stack: &Stack,
    request: &CreateChangeSetInput,
    flags: DeployFlags,
    wait_error: DeployError,
) -> DeployResult<DeployOutcome>
where
    P: StackProvider + ?Sized,
{
    let change_set = provider
        .describe_change_set(&request.change_set_name, &request.stack_name)
        .await?;

    if change_set.status != ChangeSetStatus::Failed {
        return Err(wait_error);
    }

    let reason = change_set.status_reason.unwrap_or_default();
    log::debug!("change set {} failed: {}", request.change_set_name, reason);

    if !flags.no_delete_failed_change_set {
        log::debug!("deleting failed change set {}", request.change_set_name);
        provider
            .delete_change_set(&request.change_set_name, &request.stack_name)
            .await?;
    }

    if flags.no_fail_on_empty_change_set && is_empty_change_set_reason(&reason) {
        log::info!("No changes to deploy for stack {}", request.stack_name);
        return Ok(DeployOutcome::Unchanged {
            stack_id: stack.stack_id.clone(),
        });
    }

    Err(DeployError::ChangeSetFailed { reason })
}

/// Update `stack` through the change set described by `request`.
pub async fn update_stack<P>(
    ctx: &DeployContext<'_, P>,
    stack: &Stack,
    request: &CreateChangeSetInput,
    flags: DeployFlags,
) -> DeployResult<DeployOutcome>
where
    P: StackProvider + ?Sized,
{
    log::info!("Creating change set {}", request.change_set_name);
    let created = ctx.provider.create_change_set(request).await?;

    let change_set = match wait_for_change_set(
        ctx.provider,
        &request.change_set_name,
        &request.stack_name,
        ctx.waits.change_set,
    )
    .await
    {
        Ok(cs) => cs,
        Err(err) => return cleanup_change_set(ctx.provider, stack, request, flags, err).await,
    };

    let change_set_id = if change_set.change_set_id.is_empty() {
        created.id
    } else {
        change_set.change_set_id.clone()
    };
    log_changes(&change_set);

    if flags.no_execute_change_set {
        let console_url = ctx.links.gen_cfn_url(&stack.stack_id, &change_set_id).await?;
        log::info!("Not executing the change set; review it at {}", console_url);
        return Ok(DeployOutcome::ChangeSetReady {
            stack_id: stack.stack_id.clone(),
            change_set_id,
            console_url,
        });
    }

    log::info!("Executing change set {}", request.change_set_name);
    ctx.provider
        .execute_change_set(&request.change_set_name, &request.stack_name)
        .await?;
    wait_for_stack(
        ctx.provider,
        &request.stack_name,
        StackWait::UpdateComplete,
        ctx.waits.stack,
    )
    .await?;
    log::info!("Stack {} updated", request.stack_name);

    Ok(DeployOutcome::Updated {
        stack_id: stack.stack_id.clone(),
    })
}
