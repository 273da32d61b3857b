// ── Stack provider seam ───────────────────────────────────────────────────────
//
// The deployment flow only talks to CloudFormation through this trait, so the
// same code drives the real SigV4 client and scripted fakes in tests.

use async_trait::async_trait;
use cfn_deploy_aws::{
    AwsResult, ChangeSet, ChangeSetRef, CloudFormationClient, CreateChangeSetInput,
    CreateStackInput, Stack,
};

/// The CloudFormation operations a deployment needs.
#[async_trait]
pub trait StackProvider: Send + Sync {
    /// DescribeStacks for one stack name or id.
    async fn describe_stacks(&self, stack_name: &str) -> AwsResult<Vec<Stack>>;

    /// CreateStack; returns the new stack id.
    async fn create_stack(&self, input: &CreateStackInput) -> AwsResult<String>;

    async fn create_change_set(&self, input: &CreateChangeSetInput) -> AwsResult<ChangeSetRef>;

    async fn describe_change_set(&self, change_set_name: &str, stack_name: &str) -> AwsResult<ChangeSet>;

    async fn execute_change_set(&self, change_set_name: &str, stack_name: &str) -> AwsResult<()>;

    async fn delete_change_set(&self, change_set_name: &str, stack_name: &str) -> AwsResult<()>;
}

#[async_trait]
impl StackProvider for CloudFormationClient {
    async fn describe_stacks(&self, stack_name: &str) -> AwsResult<Vec<Stack>> {
        CloudFormationClient::describe_stacks(self, Some(stack_name)).await
    }

    async fn create_stack(&self, input: &CreateStackInput) -> AwsResult<String> {
        CloudFormationClient::create_stack(self, input).await
    }

    async fn create_change_set(&self, input: &CreateChangeSetInput) -> AwsResult<ChangeSetRef> {
        CloudFormationClient::create_change_set(self, input).await
    }

    async fn describe_change_set(&self, change_set_name: &str, stack_name: &str) -> AwsResult<ChangeSet> {
        CloudFormationClient::describe_change_set(self, change_set_name, stack_name).await
    }

    async fn execute_change_set(&self, change_set_name: &str, stack_name: &str) -> AwsResult<()> {
        CloudFormationClient::execute_change_set(self, change_set_name, stack_name).await
    }

    async fn delete_change_set(&self, change_set_name: &str, stack_name: &str) -> AwsResult<()> {
        CloudFormationClient::delete_change_set(self, change_set_name, stack_name).await
    }
}
