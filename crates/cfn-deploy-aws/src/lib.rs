//! # cfn-deploy-aws – CloudFormation client for cfn-deploy
//!
//! Provides a CloudFormation client with real SigV4 request signing,
//! covering the stack and change-set operations a CI deployment needs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  CloudFormationClient  (cloudformation.rs)       │
//! │  ├── stacks       DescribeStacks · CreateStack   │
//! │  └── change sets  Create · Describe · Execute ·  │
//! │                   Delete                         │
//! ├──────────────────────────────────────────────────┤
//! │  AwsClient  (client.rs)                          │
//! │  ├── query_request  (form body, XML response)    │
//! │  ├── from_xml       (quick-xml serde decode)     │
//! │  └── retry with exponential backoff + jitter     │
//! ├──────────────────────────────────────────────────┤
//! │  SigV4Signer  (signing.rs)                       │
//! │  └── hmac-sha256 / canonical request / signing   │
//! └──────────────────────────────────────────────────┘
//! ```

// ── Sub-modules ─────────────────────────────────────────────────────────

pub mod error;
pub mod config;
pub mod signing;
pub mod client;
pub mod cloudformation;

// ── Re-exports for ergonomic access ─────────────────────────────────────

pub use client::AwsClient;
pub use cloudformation::{
    Change, ChangeSet, ChangeSetRef, ChangeSetStatus, CloudFormationClient, CreateChangeSetInput,
    CreateStackInput, Output, Parameter, ResourceChange, RollbackConfiguration, RollbackTrigger,
    Stack, StackStatus, StackTag, Template,
};
pub use config::{AwsCredentials, AwsRegion, RetryConfig, SdkConfig};
pub use error::{AwsError, AwsResult};
