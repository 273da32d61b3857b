//! Stack lookup.

use crate::error::DeployResult;
use crate::provider::StackProvider;
use cfn_deploy_aws::{AwsError, Stack};
use regex::RegexBuilder;

/// CloudFormation answers DescribeStacks for an unknown stack with a
/// `ValidationError` whose message is `Stack with id <name> does not exist`.
fn is_missing_stack_error(err: &AwsError, stack_name: &str) -> bool {
    if !err.is_validation_error() {
        return false;
    }
    let pattern = format!(r"Stack with id {} does not exist", regex::escape(stack_name));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(&err.message))
        .unwrap_or(false)
}

/// Look up a stack by name. `Ok(None)` when it does not exist yet; every
/// other failure propagates.
pub async fn get_stack<P>(provider: &P, stack_name: &str) -> DeployResult<Option<Stack>>
where
    P: StackProvider + ?Sized,
{
    match provider.describe_stacks(stack_name).await {
        Ok(stacks) => Ok(stacks.into_iter().next()),
        Err(err) if is_missing_stack_error(&err, stack_name) => {
            log::debug!("stack {} does not exist yet", stack_name);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation(msg: &str) -> AwsError {
        AwsError::new("cloudformation", "ValidationError", msg, 400)
    }

    #[test]
    fn missing_stack_matches_exact_name() {
        let err = validation("Stack with id app-prod does not exist");
        assert!(is_missing_stack_error(&err, "app-prod"));
        assert!(!is_missing_stack_error(&err, "app"));
    }

    #[test]
    fn missing_stack_is_case_insensitive() {
        let err = validation("stack with ID App-Prod does not exist");
        assert!(is_missing_stack_error(&err, "app-prod"));
    }

    #[test]
    fn name_is_not_a_pattern() {
        let err = validation("Stack with id appXprod does not exist");
        assert!(!is_missing_stack_error(&err, "app.prod"));
    }

    #[test]
    fn other_codes_are_not_missing() {
        let err = AwsError::new("cloudformation", "AccessDenied", "Stack with id app does not exist", 403);
        assert!(!is_missing_stack_error(&err, "app"));
        let err = validation("Template format error");
        assert!(!is_missing_stack_error(&err, "app"));
    }
}
