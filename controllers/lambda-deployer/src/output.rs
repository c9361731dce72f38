//! Rendering of deployment outcomes and network listings for the command surface

use crate::cli::OutputFormat;
use crate::discovery::NetworkInventory;
use crate::error::DeploymentOutcome;
use cloud_client::{SecurityGroup, Subnet, Vpc};
use serde_json::json;

/// Machine-readable report of an outcome
pub fn report(outcome: &DeploymentOutcome) -> serde_json::Value {
    match outcome {
        DeploymentOutcome::Done(result) => json!({
            "outcome": outcome.label(),
            "result": result,
        }),
        DeploymentOutcome::Failed(failure) => json!({
            "outcome": outcome.label(),
            "phase": failure.phase,
            "error_kind": failure.kind(),
            "error": failure.error.to_string(),
            "partially_converged": failure.partially_converged,
            "result": failure.result,
        }),
    }
}

/// Render an outcome in the requested format
pub fn render(outcome: &DeploymentOutcome, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&report(outcome)),
        OutputFormat::Text => Ok(render_text(outcome)),
    }
}

fn render_text(outcome: &DeploymentOutcome) -> String {
    let (result, mut lines) = match outcome {
        DeploymentOutcome::Done(result) => (result, vec![format!("Deployment of {} done", result.function_name)]),
        DeploymentOutcome::Failed(failure) => (
            failure.result.as_ref(),
            vec![
                format!(
                    "Deployment of {} {} in {} phase: {}",
                    failure.result.function_name,
                    outcome.label(),
                    failure.phase,
                    failure.error
                ),
                format!("  partially converged: {}", failure.partially_converged),
            ],
        ),
    };

    lines.push(format!("  stage:    {}", result.stage));
    lines.push(format!("  state:    {}", result.state));
    if let Some(arn) = &result.function_arn {
        lines.push(format!("  function: {}", arn));
    }
    match (&result.role_arn, &result.role_id) {
        (Some(arn), Some(id)) => lines.push(format!("  role:     {} ({})", arn, id)),
        _ => lines.push(format!("  role:     {}", result.role_name)),
    }
    if let Some(grant) = &result.access_grant {
        lines.push(format!("  bucket:   {} via {}", grant.bucket, grant.policy_arn));
    }
    if let Some(network) = &result.network {
        lines.push(format!(
            "  network:  {} subnets [{}] security groups [{}]",
            network.vpc_id,
            network.subnet_ids.join(", "),
            network.security_group_ids.join(", ")
        ));
    }
    for warning in &result.warnings {
        lines.push(format!("  warning:  {}", warning));
    }
    lines.join("\n")
}

fn vpc_json(vpc: &Vpc) -> serde_json::Value {
    json!({ "id": vpc.vpc_id, "cidr": vpc.cidr_block, "name": vpc.name })
}

fn subnet_json(subnet: &Subnet) -> serde_json::Value {
    json!({
        "id": subnet.subnet_id,
        "az": subnet.availability_zone,
        "cidr": subnet.cidr_block,
        "name": subnet.name,
    })
}

fn security_group_json(group: &SecurityGroup) -> serde_json::Value {
    json!({ "id": group.group_id, "name": group.group_name, "description": group.description })
}

/// Machine-readable report of a network listing
pub fn inventory_report(inventory: &NetworkInventory) -> serde_json::Value {
    match inventory {
        NetworkInventory::Vpcs(vpcs) => json!({
            "vpcs": vpcs.iter().map(vpc_json).collect::<Vec<_>>(),
        }),
        NetworkInventory::Vpc {
            vpc,
            subnets,
            security_groups,
        } => json!({
            "vpc": vpc_json(vpc),
            "subnets": subnets.iter().map(subnet_json).collect::<Vec<_>>(),
            "security_groups": security_groups.iter().map(security_group_json).collect::<Vec<_>>(),
        }),
    }
}

/// Render a network listing in the requested format
pub fn render_inventory(inventory: &NetworkInventory, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&inventory_report(inventory)),
        OutputFormat::Text => Ok(render_inventory_text(inventory)),
    }
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn render_inventory_text(inventory: &NetworkInventory) -> String {
    let mut lines = Vec::new();
    match inventory {
        NetworkInventory::Vpcs(vpcs) if vpcs.is_empty() => lines.push("No available VPCs".to_string()),
        NetworkInventory::Vpcs(vpcs) => {
            for vpc in vpcs {
                lines.push(format!("{}  {}  {}", vpc.vpc_id, or_dash(&vpc.cidr_block), or_dash(&vpc.name)));
            }
        }
        NetworkInventory::Vpc {
            vpc,
            subnets,
            security_groups,
        } => {
            lines.push(format!("VPC {}  {}  {}", vpc.vpc_id, or_dash(&vpc.cidr_block), or_dash(&vpc.name)));
            lines.push("  subnets:".to_string());
            for subnet in subnets {
                lines.push(format!(
                    "    {}  {}  {}  {}",
                    subnet.subnet_id,
                    or_dash(&subnet.availability_zone),
                    or_dash(&subnet.cidr_block),
                    or_dash(&subnet.name)
                ));
            }
            lines.push("  security groups:".to_string());
            for group in security_groups {
                lines.push(format!(
                    "    {}  {}  {}",
                    group.group_id,
                    group.group_name,
                    or_dash(&group.description)
                ));
            }
        }
    }
    lines.join("\n")
}
