//! EC2 operations for MockCloudClient
//!
//! Handles VPCs, subnets and security groups

use super::{lock, MockCloudClient};
use crate::error::CloudError;
use crate::models::*;

pub async fn describe_vpc(client: &MockCloudClient, vpc_id: &str) -> Result<Option<Vpc>, CloudError> {
    client.record("describe_vpc", vpc_id)?;
    Ok(lock(&client.vpcs).get(vpc_id).cloned())
}

pub async fn describe_subnets(client: &MockCloudClient, subnet_ids: &[String]) -> Result<Vec<Subnet>, CloudError> {
    client.record("describe_subnets", &subnet_ids.join(","))?;
    let subnets = lock(&client.subnets);
    Ok(subnet_ids
        .iter()
        .filter_map(|id| subnets.get(id).cloned())
        .collect())
}

pub async fn describe_security_groups(client: &MockCloudClient, group_ids: &[String]) -> Result<Vec<SecurityGroup>, CloudError> {
    client.record("describe_security_groups", &group_ids.join(","))?;
    let groups = lock(&client.security_groups);
    Ok(group_ids
        .iter()
        .filter_map(|id| groups.get(id).cloned())
        .collect())
}

pub async fn list_vpcs(client: &MockCloudClient) -> Result<Vec<Vpc>, CloudError> {
    client.record("list_vpcs", "")?;
    let mut vpcs: Vec<Vpc> = lock(&client.vpcs)
        .values()
        .filter(|v| v.state == NetworkResourceState::Available)
        .cloned()
        .collect();
    vpcs.sort_by(|a, b| a.vpc_id.cmp(&b.vpc_id));
    Ok(vpcs)
}

pub async fn list_subnets(client: &MockCloudClient, vpc_id: &str) -> Result<Vec<Subnet>, CloudError> {
    client.record("list_subnets", vpc_id)?;
    let mut subnets: Vec<Subnet> = lock(&client.subnets)
        .values()
        .filter(|s| s.vpc_id == vpc_id && s.state == NetworkResourceState::Available)
        .cloned()
        .collect();
    subnets.sort_by(|a, b| a.subnet_id.cmp(&b.subnet_id));
    Ok(subnets)
}

pub async fn list_security_groups(client: &MockCloudClient, vpc_id: &str) -> Result<Vec<SecurityGroup>, CloudError> {
    client.record("list_security_groups", vpc_id)?;
    let mut groups: Vec<SecurityGroup> = lock(&client.security_groups)
        .values()
        .filter(|g| g.vpc_id == vpc_id)
        .cloned()
        .collect();
    groups.sort_by(|a, b| a.group_id.cmp(&b.group_id));
    Ok(groups)
}
