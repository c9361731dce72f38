//! S3 operations for MockCloudClient

use super::{lock, BucketAccess, MockCloudClient};
use crate::error::CloudError;
use crate::models::*;

pub async fn head_bucket(client: &MockCloudClient, bucket: &str) -> Result<BucketInfo, CloudError> {
    client.record("head_bucket", bucket)?;

    match lock(&client.buckets).get(bucket) {
        Some(BucketAccess::Readable) => Ok(BucketInfo {
            name: bucket.to_string(),
            region: Some(client.helpers.region().to_string()),
        }),
        Some(BucketAccess::Forbidden) => Err(CloudError::PermissionDenied(format!(
            "403 Forbidden: HeadBucket on {}",
            bucket
        ))),
        None => Err(CloudError::NotFound(format!("404 Not Found: bucket {}", bucket))),
    }
}
