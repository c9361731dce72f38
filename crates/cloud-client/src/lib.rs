//! Cloud Resource Client
//!
//! A uniform facade over the provider APIs the Lambda deployer touches:
//! IAM roles and managed policies, Lambda functions, S3 bucket metadata and
//! EC2 network objects. Every provider-specific failure is normalized into
//! [`CloudError`] so reconcilers can reason about a single taxonomy.
//!
//! # Example
//!
//! ```no_run
//! use cloud_client::{CloudClient, CloudClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CloudClient::new(
//!     "http://localhost:4566".to_string(),
//!     "gateway-token".to_string(),
//!     "us-east-1".to_string(),
//! )?;
//!
//! // Look up an execution role by name
//! if let Some(role) = client.get_role("f1-role").await? {
//!     println!("role {} ({})", role.role_name, role.arn);
//! }
//!
//! // Check that a bucket exists and is readable
//! let bucket = client.head_bucket("data-bucket").await?;
//! println!("bucket {} in {:?}", bucket.name, bucket.region);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **IAM**: roles, trust policies, managed policies and attachments
//! - **Lambda**: container-image functions, configuration updates, invocation
//! - **S3**: bucket existence and access checks
//! - **EC2**: VPC, subnet and security group lookups
//! - **Mocking**: in-memory `MockCloudClient` behind the `test-util` feature
//!
//! The HTTP client never retries on its own; waiting for eventual consistency
//! is the caller's job, so timeouts stay observable.

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod cloud_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::CloudClient;
pub use common::{HttpClient, PaginatedResponse};
pub use error::CloudError;
pub use models::*;
pub use cloud_trait::CloudClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{FailureKind, MockCloudClient};
