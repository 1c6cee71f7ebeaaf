//! GCP bootstrap for Terraform-managed projects
//!
//! Creates (or reuses) the Terraform state bucket, the automation service
//! account and its project role bindings, then exports a fresh key for
//! that account. Authentication uses Application Default Credentials.

pub mod auth;
pub mod config;
pub mod error;
pub mod gcp;
pub mod key_file;
pub mod prompt;
pub mod provider;
pub mod provisioner;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::SetupConfig;
pub use error::ProvisionError;
pub use gcp::{GcpConnector, GcpEndpoints};
pub use provisioner::Provisioner;
pub use types::{ProjectId, ProvisionSummary};
