//! Network binder
//!
//! Handles: VPC, subnet and security group validation, function VPC placement

use super::{DeployContext, Reconciler};
use crate::error::DeployError;
use cloud_client::{FunctionConfiguration, NetworkResourceState, UpdateFunctionConfigurationRequest, VpcConfig};
use deploy_spec::{NetworkAttachment, NetworkSpec};
use std::collections::BTreeSet;
use tracing::{debug, info};

fn same_members(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

/// Whether `current` already places the function as `network` asks
fn matches_attachment(current: &VpcConfig, network: &NetworkSpec) -> bool {
    current.vpc_id.as_deref().is_none_or(|vpc| vpc == network.vpc_id)
        && same_members(&current.subnet_ids, &network.subnet_ids)
        && same_members(&current.security_group_ids, &network.security_group_ids)
}

impl Reconciler {
    /// Attaches `function` to the VPC in `network` after validating every piece of it.
    ///
    /// Nothing is changed unless the VPC, every subnet and every security
    /// group exist, are available, and belong to the same VPC.
    pub async fn bind_network(
        &self,
        function: &FunctionConfiguration,
        network: &NetworkSpec,
        ctx: &mut DeployContext,
    ) -> Result<NetworkAttachment, DeployError> {
        info!("Binding function {} to VPC {}", function.function_name, network.vpc_id);
        self.validate_network(network).await?;

        let attachment = NetworkAttachment {
            vpc_id: network.vpc_id.clone(),
            subnet_ids: network.subnet_ids.clone(),
            security_group_ids: network.security_group_ids.clone(),
        };

        if let Some(current) = function.attached_vpc() {
            if matches_attachment(current, network) {
                ctx.warn(format!(
                    "Function {} already attached to VPC {}, no changes made",
                    function.function_name, network.vpc_id
                ));
                return Ok(attachment);
            }
            debug!(
                "Function {} moves from subnets {:?} to {:?}",
                function.function_name, current.subnet_ids, network.subnet_ids
            );
        }

        let request = UpdateFunctionConfigurationRequest {
            vpc_config: Some(VpcConfig {
                subnet_ids: network.subnet_ids.clone(),
                security_group_ids: network.security_group_ids.clone(),
                vpc_id: None,
            }),
            ..Default::default()
        };
        self.client
            .update_function_configuration(&function.function_name, &request)
            .await?;
        ctx.record_mutation(
            "Updated VPC placement of",
            &format!("{} to {}", function.function_arn, network.vpc_id),
        );

        // Placement failures leave the function running without the new placement
        self.wait_for_function(&function.function_name).await?;
        Ok(attachment)
    }

    async fn validate_network(&self, network: &NetworkSpec) -> Result<(), DeployError> {
        let vpc = self
            .client
            .describe_vpc(&network.vpc_id)
            .await?
            .ok_or_else(|| DeployError::ResourceNotFound(format!("VPC {}", network.vpc_id)))?;
        if vpc.state != NetworkResourceState::Available {
            return Err(DeployError::conflict(
                vpc.vpc_id,
                format!("VPC is {:?}, not available", vpc.state),
            ));
        }

        let subnets = self.client.describe_subnets(&network.subnet_ids).await?;
        for subnet_id in &network.subnet_ids {
            let subnet = subnets
                .iter()
                .find(|s| &s.subnet_id == subnet_id)
                .ok_or_else(|| DeployError::ResourceNotFound(format!("subnet {}", subnet_id)))?;
            if subnet.state != NetworkResourceState::Available {
                return Err(DeployError::conflict(
                    subnet_id.clone(),
                    format!("subnet is {:?}, not available", subnet.state),
                ));
            }
            if subnet.vpc_id != network.vpc_id {
                return Err(DeployError::conflict(
                    subnet_id.clone(),
                    format!("subnet belongs to {}, not {}", subnet.vpc_id, network.vpc_id),
                ));
            }
        }

        let groups = self.client.describe_security_groups(&network.security_group_ids).await?;
        for group_id in &network.security_group_ids {
            let group = groups
                .iter()
                .find(|g| &g.group_id == group_id)
                .ok_or_else(|| DeployError::ResourceNotFound(format!("security group {}", group_id)))?;
            if group.vpc_id != network.vpc_id {
                return Err(DeployError::conflict(
                    group_id.clone(),
                    format!("security group belongs to {}, not {}", group.vpc_id, network.vpc_id),
                ));
            }
        }

        debug!(
            "VPC {} validated with {} subnet(s) and {} security group(s)",
            network.vpc_id,
            network.subnet_ids.len(),
            network.security_group_ids.len()
        );
        Ok(())
    }
}
