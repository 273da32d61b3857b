//! AWS CloudFormation client.
//!
//! Mirrors `aws-sdk-cloudformation` types and the stack / change-set
//! operations used for deployments. CloudFormation uses the AWS Query
//! protocol with XML responses (API version 2010-05-15).
//!
//! Reference: <https://docs.aws.amazon.com/AWSCloudFormation/latest/APIReference/>

use crate::client::{self, AwsClient};
use crate::config::AwsRegion;
use crate::error::AwsResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const API_VERSION: &str = "2010-05-15";
const SERVICE: &str = "cloudformation";

/// Alarm type CloudFormation accepts for rollback triggers.
pub const ROLLBACK_TRIGGER_ALARM: &str = "AWS::CloudWatch::Alarm";

// ── Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackStatus {
    CreateInProgress,
    CreateFailed,
    CreateComplete,
    RollbackInProgress,
    RollbackFailed,
    RollbackComplete,
    DeleteInProgress,
    DeleteFailed,
    DeleteComplete,
    UpdateInProgress,
    UpdateCompleteCleanupInProgress,
    UpdateComplete,
    UpdateFailed,
    UpdateRollbackInProgress,
    UpdateRollbackFailed,
    UpdateRollbackCompleteCleanupInProgress,
    UpdateRollbackComplete,
    ReviewInProgress,
    ImportInProgress,
    ImportComplete,
    ImportRollbackInProgress,
    ImportRollbackFailed,
    ImportRollbackComplete,
    Other(String),
}

impl StackStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateFailed => "CREATE_FAILED",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            Self::RollbackFailed => "ROLLBACK_FAILED",
            Self::RollbackComplete => "ROLLBACK_COMPLETE",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            Self::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
            Self::UpdateRollbackCompleteCleanupInProgress => "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS",
            Self::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
            Self::ReviewInProgress => "REVIEW_IN_PROGRESS",
            Self::ImportInProgress => "IMPORT_IN_PROGRESS",
            Self::ImportComplete => "IMPORT_COMPLETE",
            Self::ImportRollbackInProgress => "IMPORT_ROLLBACK_IN_PROGRESS",
            Self::ImportRollbackFailed => "IMPORT_ROLLBACK_FAILED",
            Self::ImportRollbackComplete => "IMPORT_ROLLBACK_COMPLETE",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for StackStatus {
    fn from(s: &str) -> Self {
        match s {
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_FAILED" => Self::CreateFailed,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "ROLLBACK_IN_PROGRESS" => Self::RollbackInProgress,
            "ROLLBACK_FAILED" => Self::RollbackFailed,
            "ROLLBACK_COMPLETE" => Self::RollbackComplete,
            "DELETE_IN_PROGRESS" => Self::DeleteInProgress,
            "DELETE_FAILED" => Self::DeleteFailed,
            "DELETE_COMPLETE" => Self::DeleteComplete,
            "UPDATE_IN_PROGRESS" => Self::UpdateInProgress,
            "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => Self::UpdateCompleteCleanupInProgress,
            "UPDATE_COMPLETE" => Self::UpdateComplete,
            "UPDATE_FAILED" => Self::UpdateFailed,
            "UPDATE_ROLLBACK_IN_PROGRESS" => Self::UpdateRollbackInProgress,
            "UPDATE_ROLLBACK_FAILED" => Self::UpdateRollbackFailed,
            "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS" => Self::UpdateRollbackCompleteCleanupInProgress,
            "UPDATE_ROLLBACK_COMPLETE" => Self::UpdateRollbackComplete,
            "REVIEW_IN_PROGRESS" => Self::ReviewInProgress,
            "IMPORT_IN_PROGRESS" => Self::ImportInProgress,
            "IMPORT_COMPLETE" => Self::ImportComplete,
            "IMPORT_ROLLBACK_IN_PROGRESS" => Self::ImportRollbackInProgress,
            "IMPORT_ROLLBACK_FAILED" => Self::ImportRollbackFailed,
            "IMPORT_ROLLBACK_COMPLETE" => Self::ImportRollbackComplete,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a change set's creation (not its execution).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeSetStatus {
    CreatePending,
    CreateInProgress,
    CreateComplete,
    DeletePending,
    DeleteInProgress,
    DeleteComplete,
    DeleteFailed,
    Failed,
    Other(String),
}

impl ChangeSetStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreatePending => "CREATE_PENDING",
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::DeletePending => "DELETE_PENDING",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::Failed => "FAILED",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ChangeSetStatus {
    fn from(s: &str) -> Self {
        match s {
            "CREATE_PENDING" => Self::CreatePending,
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "DELETE_PENDING" => Self::DeletePending,
            "DELETE_IN_PROGRESS" => Self::DeleteInProgress,
            "DELETE_COMPLETE" => Self::DeleteComplete,
            "DELETE_FAILED" => Self::DeleteFailed,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ChangeSetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    pub stack_id: String,
    pub stack_name: String,
    pub description: Option<String>,
    pub stack_status: StackStatus,
    pub stack_status_reason: Option<String>,
    pub outputs: Vec<Output>,
    pub parameters: Vec<Parameter>,
    pub tags: Vec<StackTag>,
    pub capabilities: Vec<String>,
    pub role_arn: Option<String>,
    pub notification_arns: Vec<String>,
}

/// A stack output. Either half may be missing in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub output_key: Option<String>,
    pub output_value: Option<String>,
    pub description: Option<String>,
    pub export_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub parameter_key: String,
    #[serde(default)]
    pub parameter_value: String,
}

impl Parameter {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            parameter_key: key.to_string(),
            parameter_value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackTag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl StackTag {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    pub change_set_id: String,
    pub change_set_name: String,
    pub stack_id: Option<String>,
    pub stack_name: Option<String>,
    pub status: ChangeSetStatus,
    pub status_reason: Option<String>,
    pub execution_status: Option<String>,
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Change {
    #[serde(rename = "Type", default)]
    pub change_type: String,
    pub resource_change: Option<ResourceChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceChange {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub logical_resource_id: String,
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_type: String,
    pub replacement: Option<String>,
}

/// Identifiers returned by CreateChangeSet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSetRef {
    pub id: String,
    pub stack_id: Option<String>,
}

/// Where the template comes from: inline body or an S3/HTTPS URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Template {
    Body(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackTrigger {
    pub arn: String,
    pub trigger_type: String,
}

impl RollbackTrigger {
    /// Trigger on a CloudWatch alarm.
    pub fn alarm(arn: &str) -> Self {
        Self {
            arn: arn.to_string(),
            trigger_type: ROLLBACK_TRIGGER_ALARM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackConfiguration {
    pub monitoring_time_in_minutes: Option<u32>,
    pub rollback_triggers: Vec<RollbackTrigger>,
}

impl RollbackConfiguration {
    pub fn is_empty(&self) -> bool {
        self.monitoring_time_in_minutes.is_none() && self.rollback_triggers.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStackInput {
    pub stack_name: String,
    pub template: Template,
    pub parameters: Vec<Parameter>,
    pub tags: Vec<StackTag>,
    pub capabilities: Vec<String>,
    pub role_arn: Option<String>,
    pub notification_arns: Vec<String>,
    pub rollback_configuration: Option<RollbackConfiguration>,
    pub disable_rollback: bool,
    pub timeout_in_minutes: Option<u32>,
    pub enable_termination_protection: bool,
}

impl CreateStackInput {
    /// Form parameters for the CreateStack action.
    pub fn to_query_params(&self) -> BTreeMap<String, String> {
        let mut params = client::build_query_params("CreateStack", API_VERSION);
        params.insert("StackName".to_string(), self.stack_name.clone());
        add_stack_settings(
            &mut params,
            &self.template,
            &self.parameters,
            &self.tags,
            &self.capabilities,
            self.role_arn.as_deref(),
            &self.notification_arns,
            self.rollback_configuration.as_ref(),
        );
        if self.disable_rollback {
            params.insert("DisableRollback".to_string(), "true".to_string());
        }
        if let Some(timeout) = self.timeout_in_minutes {
            params.insert("TimeoutInMinutes".to_string(), timeout.to_string());
        }
        if self.enable_termination_protection {
            params.insert("EnableTerminationProtection".to_string(), "true".to_string());
        }
        params
    }
}

/// Request body for CreateChangeSet against an existing stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChangeSetInput {
    pub stack_name: String,
    pub change_set_name: String,
    pub template: Template,
    pub parameters: Vec<Parameter>,
    pub tags: Vec<StackTag>,
    pub capabilities: Vec<String>,
    pub role_arn: Option<String>,
    pub notification_arns: Vec<String>,
    pub rollback_configuration: Option<RollbackConfiguration>,
    pub description: Option<String>,
}

impl CreateChangeSetInput {
    /// Form parameters for the CreateChangeSet action (type `UPDATE`).
    pub fn to_query_params(&self) -> BTreeMap<String, String> {
        let mut params = client::build_query_params("CreateChangeSet", API_VERSION);
        params.insert("StackName".to_string(), self.stack_name.clone());
        params.insert("ChangeSetName".to_string(), self.change_set_name.clone());
        params.insert("ChangeSetType".to_string(), "UPDATE".to_string());
        add_stack_settings(
            &mut params,
            &self.template,
            &self.parameters,
            &self.tags,
            &self.capabilities,
            self.role_arn.as_deref(),
            &self.notification_arns,
            self.rollback_configuration.as_ref(),
        );
        if let Some(ref desc) = self.description {
            params.insert("Description".to_string(), desc.clone());
        }
        params
    }
}

#[allow(clippy::too_many_arguments)]
fn add_stack_settings(
    params: &mut BTreeMap<String, String>,
    template: &Template,
    parameters: &[Parameter],
    tags: &[StackTag],
    capabilities: &[String],
    role_arn: Option<&str>,
    notification_arns: &[String],
    rollback: Option<&RollbackConfiguration>,
) {
    match template {
        Template::Body(body) => params.insert("TemplateBody".to_string(), body.clone()),
        Template::Url(url) => params.insert("TemplateURL".to_string(), url.clone()),
    };
    for (i, param) in parameters.iter().enumerate() {
        let prefix = format!("Parameters.member.{}", i + 1);
        params.insert(format!("{}.ParameterKey", prefix), param.parameter_key.clone());
        params.insert(format!("{}.ParameterValue", prefix), param.parameter_value.clone());
    }
    for (i, tag) in tags.iter().enumerate() {
        let prefix = format!("Tags.member.{}", i + 1);
        params.insert(format!("{}.Key", prefix), tag.key.clone());
        params.insert(format!("{}.Value", prefix), tag.value.clone());
    }
    client::add_member_list(params, "Capabilities", capabilities);
    if let Some(role) = role_arn {
        params.insert("RoleARN".to_string(), role.to_string());
    }
    client::add_member_list(params, "NotificationARNs", notification_arns);
    if let Some(rollback) = rollback.filter(|r| !r.is_empty()) {
        if let Some(minutes) = rollback.monitoring_time_in_minutes {
            params.insert(
                "RollbackConfiguration.MonitoringTimeInMinutes".to_string(),
                minutes.to_string(),
            );
        }
        for (i, trigger) in rollback.rollback_triggers.iter().enumerate() {
            let prefix = format!("RollbackConfiguration.RollbackTriggers.member.{}", i + 1);
            params.insert(format!("{}.Arn", prefix), trigger.arn.clone());
            params.insert(format!("{}.Type", prefix), trigger.trigger_type.clone());
        }
    }
}

// ── CloudFormation Client ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CloudFormationClient {
    client: AwsClient,
}

impl CloudFormationClient {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    pub fn region(&self) -> &AwsRegion {
        self.client.region()
    }

    // ── Stacks ──────────────────────────────────────────────────────

    pub async fn describe_stacks(&self, stack_name: Option<&str>) -> AwsResult<Vec<Stack>> {
        let mut params = client::build_query_params("DescribeStacks", API_VERSION);
        if let Some(name) = stack_name {
            params.insert("StackName".to_string(), name.to_string());
        }
        let response = self.client.query_request(SERVICE, &params).await?;
        parse_stacks(&response.body)
    }

    pub async fn create_stack(&self, input: &CreateStackInput) -> AwsResult<String> {
        let response = self
            .client
            .query_request(SERVICE, &input.to_query_params())
            .await?;
        let parsed: CreateStackResponse = client::from_xml(SERVICE, "CreateStack", &response.body)?;
        Ok(parsed.result.stack_id)
    }

    // ── Change Sets ─────────────────────────────────────────────────

    pub async fn create_change_set(&self, input: &CreateChangeSetInput) -> AwsResult<ChangeSetRef> {
        let response = self
            .client
            .query_request(SERVICE, &input.to_query_params())
            .await?;
        let parsed: CreateChangeSetResponse = client::from_xml(SERVICE, "CreateChangeSet", &response.body)?;
        Ok(ChangeSetRef {
            id: parsed.result.id,
            stack_id: parsed.result.stack_id,
        })
    }

    pub async fn describe_change_set(&self, change_set_name: &str, stack_name: &str) -> AwsResult<ChangeSet> {
        let mut params = client::build_query_params("DescribeChangeSet", API_VERSION);
        params.insert("ChangeSetName".to_string(), change_set_name.to_string());
        params.insert("StackName".to_string(), stack_name.to_string());
        let response = self.client.query_request(SERVICE, &params).await?;
        parse_change_set(&response.body)
    }

    pub async fn execute_change_set(&self, change_set_name: &str, stack_name: &str) -> AwsResult<()> {
        let mut params = client::build_query_params("ExecuteChangeSet", API_VERSION);
        params.insert("ChangeSetName".to_string(), change_set_name.to_string());
        params.insert("StackName".to_string(), stack_name.to_string());
        self.client.query_request(SERVICE, &params).await?;
        Ok(())
    }

    pub async fn delete_change_set(&self, change_set_name: &str, stack_name: &str) -> AwsResult<()> {
        let mut params = client::build_query_params("DeleteChangeSet", API_VERSION);
        params.insert("ChangeSetName".to_string(), change_set_name.to_string());
        params.insert("StackName".to_string(), stack_name.to_string());
        self.client.query_request(SERVICE, &params).await?;
        Ok(())
    }
}

// ── Response parsing ────────────────────────────────────────────────────

/// A Query-protocol list: `<Section><member>…</member>…</Section>`.
#[derive(Debug, Deserialize)]
struct Members<T> {
    #[serde(rename = "member", default = "Vec::new")]
    items: Vec<T>,
}

impl<T> Default for Members<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
struct DescribeStacksResponse {
    #[serde(rename = "DescribeStacksResult")]
    result: DescribeStacksResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksResult {
    #[serde(default)]
    stacks: Members<StackMember>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackMember {
    stack_id: String,
    stack_name: String,
    description: Option<String>,
    stack_status: Option<String>,
    stack_status_reason: Option<String>,
    #[serde(default)]
    outputs: Members<Output>,
    #[serde(default)]
    parameters: Members<Parameter>,
    #[serde(default)]
    tags: Members<StackTag>,
    #[serde(default)]
    capabilities: Members<String>,
    #[serde(rename = "RoleARN")]
    role_arn: Option<String>,
    #[serde(rename = "NotificationARNs", default)]
    notification_arns: Members<String>,
}

impl From<StackMember> for Stack {
    fn from(m: StackMember) -> Self {
        Self {
            stack_id: m.stack_id,
            stack_name: m.stack_name,
            description: m.description,
            stack_status: m
                .stack_status
                .map_or(StackStatus::Other("UNKNOWN".into()), |s| StackStatus::from(s.as_str())),
            stack_status_reason: m.stack_status_reason,
            outputs: m.outputs.items,
            parameters: m.parameters.items,
            tags: m.tags.items,
            capabilities: m.capabilities.items,
            role_arn: m.role_arn,
            notification_arns: m.notification_arns.items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateStackResponse {
    #[serde(rename = "CreateStackResult")]
    result: CreateStackResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateStackResult {
    #[serde(default)]
    stack_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateChangeSetResponse {
    #[serde(rename = "CreateChangeSetResult")]
    result: CreateChangeSetResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateChangeSetResult {
    #[serde(default)]
    id: String,
    stack_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeChangeSetResponse {
    #[serde(rename = "DescribeChangeSetResult")]
    result: DescribeChangeSetResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeChangeSetResult {
    #[serde(default)]
    change_set_id: String,
    #[serde(default)]
    change_set_name: String,
    stack_id: Option<String>,
    stack_name: Option<String>,
    status: Option<String>,
    status_reason: Option<String>,
    execution_status: Option<String>,
    #[serde(default)]
    changes: Members<Change>,
}

impl From<DescribeChangeSetResult> for ChangeSet {
    fn from(r: DescribeChangeSetResult) -> Self {
        Self {
            change_set_id: r.change_set_id,
            change_set_name: r.change_set_name,
            stack_id: r.stack_id,
            stack_name: r.stack_name,
            status: r
                .status
                .map_or(ChangeSetStatus::Other("UNKNOWN".into()), |s| ChangeSetStatus::from(s.as_str())),
            status_reason: r.status_reason,
            execution_status: r.execution_status,
            changes: r.changes.items,
        }
    }
}

pub(crate) fn parse_stacks(xml: &str) -> AwsResult<Vec<Stack>> {
    let parsed: DescribeStacksResponse = client::from_xml(SERVICE, "DescribeStacks", xml)?;
    Ok(parsed.result.stacks.items.into_iter().map(Stack::from).collect())
}

pub(crate) fn parse_change_set(xml: &str) -> AwsResult<ChangeSet> {
    let parsed: DescribeChangeSetResponse = client::from_xml(SERVICE, "DescribeChangeSet", xml)?;
    Ok(parsed.result.into())
}
