//! Poll-until-terminal waiters for stacks and change sets.
//!
//! Each waiter polls at a fixed delay and classifies every observed status as
//! pending, success, or failure, the same acceptor model the SDK waiters use.
//! The attempt ceiling is the waiter's own; nothing else bounds a wait.

use crate::error::{DeployError, DeployResult};
use crate::provider::StackProvider;
use cfn_deploy_aws::{ChangeSet, ChangeSetStatus, Stack, StackStatus};
use std::time::Duration;

/// Delay between polls.
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(10);
/// Change sets give up after 30 minutes.
pub const CHANGE_SET_MAX_WAIT: Duration = Duration::from_secs(30 * 60);
/// Stack creates and updates give up after 12 hours.
pub const STACK_MAX_WAIT: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl WaitConfig {
    /// Poll every `delay` until `max_wait` has passed.
    pub fn new(delay: Duration, max_wait: Duration) -> Self {
        let delay_ms = delay.as_millis().max(1);
        let attempts = max_wait.as_millis().div_ceil(delay_ms);
        Self {
            delay,
            max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX).max(1),
        }
    }

    /// No delay between polls; for tests and local endpoints.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            delay: Duration::ZERO,
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Waiter settings for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub change_set: WaitConfig,
    pub stack: WaitConfig,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            change_set: WaitConfig::new(DEFAULT_POLL_DELAY, CHANGE_SET_MAX_WAIT),
            stack: WaitConfig::new(DEFAULT_POLL_DELAY, STACK_MAX_WAIT),
        }
    }
}

impl WaitSettings {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            change_set: WaitConfig::new(delay, CHANGE_SET_MAX_WAIT),
            stack: WaitConfig::new(delay, STACK_MAX_WAIT),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Poll {
    Pending,
    Success,
    Failure,
}

/// Which stack transition to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackWait {
    CreateComplete,
    UpdateComplete,
}

impl StackWait {
    fn classify(self, status: &StackStatus) -> Poll {
        use StackStatus::*;
        match self {
            StackWait::CreateComplete => match status {
                CreateComplete => Poll::Success,
                CreateFailed | RollbackInProgress | RollbackFailed | RollbackComplete
                | DeleteInProgress | DeleteFailed | DeleteComplete => Poll::Failure,
                _ => Poll::Pending,
            },
            StackWait::UpdateComplete => match status {
                UpdateComplete => Poll::Success,
                UpdateFailed | UpdateRollbackFailed | UpdateRollbackComplete
                | UpdateRollbackCompleteCleanupInProgress | DeleteInProgress | DeleteFailed
                | DeleteComplete => Poll::Failure,
                _ => Poll::Pending,
            },
        }
    }
}

fn classify_change_set(status: &ChangeSetStatus) -> Poll {
    match status {
        ChangeSetStatus::CreateComplete => Poll::Success,
        ChangeSetStatus::Failed
        | ChangeSetStatus::DeletePending
        | ChangeSetStatus::DeleteInProgress
        | ChangeSetStatus::DeleteComplete
        | ChangeSetStatus::DeleteFailed => Poll::Failure,
        _ => Poll::Pending,
    }
}

/// Poll DescribeStacks until `target` succeeds or fails.
pub async fn wait_for_stack<P>(
    provider: &P,
    stack_name: &str,
    target: StackWait,
    config: WaitConfig,
) -> DeployResult<Stack>
where
    P: StackProvider + ?Sized,
{
    let mut last_status = String::from("UNKNOWN");
    for attempt in 1..=config.max_attempts {
        let stacks = provider.describe_stacks(stack_name).await?;
        let Some(stack) = stacks.into_iter().next() else {
            return Err(DeployError::WaitFailed {
                resource: "stack",
                name: stack_name.to_string(),
                status: "NOT_FOUND".to_string(),
                reason: "stack disappeared while waiting".to_string(),
            });
        };

        match target.classify(&stack.stack_status) {
            Poll::Success => return Ok(stack),
            Poll::Failure => {
                return Err(DeployError::WaitFailed {
                    resource: "stack",
                    name: stack_name.to_string(),
                    status: stack.stack_status.to_string(),
                    reason: stack
                        .stack_status_reason
                        .unwrap_or_else(|| "no reason given".to_string()),
                })
            }
            Poll::Pending => {
                log::debug!(
                    "stack {} is {} (poll {}/{})",
                    stack_name,
                    stack.stack_status,
                    attempt,
                    config.max_attempts
                );
                last_status = stack.stack_status.to_string();
            }
        }
        if attempt < config.max_attempts {
            tokio::time::sleep(config.delay).await;
        }
    }

    Err(DeployError::WaitTimedOut {
        resource: "stack",
        name: stack_name.to_string(),
        status: last_status,
        attempts: config.max_attempts,
    })
}

/// Poll DescribeChangeSet until the change set is created or fails.
pub async fn wait_for_change_set<P>(
    provider: &P,
    change_set_name: &str,
    stack_name: &str,
    config: WaitConfig,
) -> DeployResult<ChangeSet>
where
    P: StackProvider + ?Sized,
{
    let mut last_status = String::from("UNKNOWN");
    for attempt in 1..=config.max_attempts {
        let change_set = provider.describe_change_set(change_set_name, stack_name).await?;
        match classify_change_set(&change_set.status) {
            Poll::Success => return Ok(change_set),
            Poll::Failure => {
                return Err(DeployError::WaitFailed {
                    resource: "change set",
                    name: change_set_name.to_string(),
                    status: change_set.status.to_string(),
                    reason: change_set
                        .status_reason
                        .unwrap_or_else(|| "no reason given".to_string()),
                })
            }
            Poll::Pending => {
                log::debug!(
                    "change set {} is {} (poll {}/{})",
                    change_set_name,
                    change_set.status,
                    attempt,
                    config.max_attempts
                );
                last_status = change_set.status.to_string();
            }
        }
        if attempt < config.max_attempts {
            tokio::time::sleep(config.delay).await;
        }
    }

    Err(DeployError::WaitTimedOut {
        resource: "change set",
        name: change_set_name.to_string(),
        status: last_status,
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_cover_max_wait() {
        let cfg = WaitConfig::new(Duration::from_secs(10), Duration::from_secs(30 * 60));
        assert_eq!(cfg.max_attempts, 180);
        let cfg = WaitConfig::new(Duration::from_secs(7), Duration::from_secs(20));
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(WaitConfig::new(Duration::ZERO, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn create_waiter_acceptors() {
        let w = StackWait::CreateComplete;
        assert_eq!(w.classify(&StackStatus::CreateComplete), Poll::Success);
        assert_eq!(w.classify(&StackStatus::CreateInProgress), Poll::Pending);
        assert_eq!(w.classify(&StackStatus::RollbackComplete), Poll::Failure);
        assert_eq!(w.classify(&StackStatus::CreateFailed), Poll::Failure);
    }

    #[test]
    fn update_waiter_acceptors() {
        let w = StackWait::UpdateComplete;
        assert_eq!(w.classify(&StackStatus::UpdateComplete), Poll::Success);
        assert_eq!(w.classify(&StackStatus::UpdateCompleteCleanupInProgress), Poll::Pending);
        assert_eq!(w.classify(&StackStatus::UpdateInProgress), Poll::Pending);
        assert_eq!(w.classify(&StackStatus::UpdateRollbackInProgress), Poll::Pending);
        assert_eq!(w.classify(&StackStatus::UpdateRollbackComplete), Poll::Failure);
        assert_eq!(w.classify(&StackStatus::UpdateFailed), Poll::Failure);
    }

    #[test]
    fn change_set_acceptors() {
        assert_eq!(classify_change_set(&ChangeSetStatus::CreateComplete), Poll::Success);
        assert_eq!(classify_change_set(&ChangeSetStatus::CreatePending), Poll::Pending);
        assert_eq!(classify_change_set(&ChangeSetStatus::CreateInProgress), Poll::Pending);
        assert_eq!(classify_change_set(&ChangeSetStatus::Failed), Poll::Failure);
    }
}
