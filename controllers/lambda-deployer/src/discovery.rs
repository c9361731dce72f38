//! Read-only network discovery
//!
//! Lists what a deployment can be placed into: available VPCs, and for one
//! VPC its available subnets and security groups. Nothing here mutates the
//! account.

use crate::error::DeployError;
use cloud_client::{CloudClientTrait, SecurityGroup, Subnet, Vpc};
use tracing::{debug, info};

/// Result of a network listing
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkInventory {
    /// Every available VPC in the region
    Vpcs(Vec<Vpc>),
    /// Placement options inside one VPC
    Vpc {
        vpc: Vpc,
        subnets: Vec<Subnet>,
        security_groups: Vec<SecurityGroup>,
    },
}

/// List VPCs, or the subnets and security groups of `vpc_id` when given
pub async fn list_network(client: &dyn CloudClientTrait, vpc_id: Option<&str>) -> Result<NetworkInventory, DeployError> {
    let Some(vpc_id) = vpc_id else {
        let vpcs = client.list_vpcs().await?;
        info!("Found {} available VPCs in {}", vpcs.len(), client.region());
        return Ok(NetworkInventory::Vpcs(vpcs));
    };

    let vpc = client
        .describe_vpc(vpc_id)
        .await?
        .ok_or_else(|| DeployError::ResourceNotFound(format!("VPC {}", vpc_id)))?;
    let subnets = client.list_subnets(vpc_id).await?;
    let security_groups = client.list_security_groups(vpc_id).await?;
    debug!(
        "VPC {}: {} subnets, {} security groups",
        vpc_id,
        subnets.len(),
        security_groups.len()
    );

    Ok(NetworkInventory::Vpc {
        vpc,
        subnets,
        security_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::*;
    use cloud_client::{FailureKind, NetworkResourceState};

    #[tokio::test]
    async fn test_lists_available_vpcs() {
        let mock = create_test_account();
        mock.add_vpc("v0", NetworkResourceState::Pending);
        mock.set_name_tag("v1", "main");

        let inventory = list_network(&mock, None).await.unwrap();

        let NetworkInventory::Vpcs(vpcs) = inventory else {
            panic!("expected a VPC listing, got {:?}", inventory);
        };
        assert_eq!(vpcs.len(), 1);
        assert_eq!(vpcs[0].vpc_id, "v1");
        assert_eq!(vpcs[0].name.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_lists_placement_options_of_one_vpc() {
        let mock = create_test_account();
        mock.add_vpc("v2", NetworkResourceState::Available);
        mock.add_subnet("s9", "v2", NetworkResourceState::Available);
        mock.add_subnet("s3", "v1", NetworkResourceState::Pending);
        mock.add_security_group("sg9", "v2");

        let inventory = list_network(&mock, Some("v1")).await.unwrap();

        let NetworkInventory::Vpc {
            vpc,
            subnets,
            security_groups,
        } = inventory
        else {
            panic!("expected a single VPC, got {:?}", inventory);
        };
        assert_eq!(vpc.vpc_id, "v1");
        let subnet_ids: Vec<&str> = subnets.iter().map(|s| s.subnet_id.as_str()).collect();
        assert_eq!(subnet_ids, vec!["s1", "s2"]);
        assert_eq!(security_groups.len(), 1);
        assert_eq!(security_groups[0].group_id, "sg1");
        assert!(mock.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_vpc_is_not_found() {
        let mock = create_test_account();

        let err = list_network(&mock, Some("v404")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert_eq!(mock.call_count("list_subnets"), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() {
        let mock = create_test_account();
        mock.fail_operation("list_vpcs", FailureKind::PermissionDenied, 1);

        let err = list_network(&mock, None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }
}
