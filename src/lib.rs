//! # cfn-deploy
//!
//! Creates or updates a CloudFormation stack from CI. A missing stack is
//! created directly; an existing one is updated through a reviewed change
//! set, with optional "plan only" mode and tolerance for empty change sets.
//!
//! ```text
//! Inputs (cli.rs) ──▶ action::run ──▶ deploy_stack ──┬──▶ CreateStack + wait
//!                                                    └──▶ change_set::update_stack
//!                          │
//!                          └──▶ outputs (GITHUB_OUTPUT) · links (console URL)
//! ```
//!
//! All CloudFormation traffic goes through [`provider::StackProvider`],
//! implemented by [`cfn_deploy_aws::CloudFormationClient`].

pub mod action;
pub mod change_set;
pub mod cli;
pub mod deploy;
pub mod error;
pub mod inputs;
pub mod links;
pub mod outputs;
pub mod provider;
pub mod stack;
pub mod waiter;

pub use deploy::{deploy_stack, DeployContext, DeployFlags, DeployOutcome, DeployParams};
pub use error::{DeployError, DeployResult};
pub use links::{LinkGenerator, ShortenerConfig};
pub use provider::StackProvider;
pub use waiter::{WaitConfig, WaitSettings};
