//! Desired deployment state
//!
//! A `DeploymentSpec` names an ECR image, the function it should run as, the
//! bucket the function needs, and optional VPC placement. It is validated in
//! full before any provider call is made.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default function memory in MB
pub const DEFAULT_MEMORY_SIZE: u32 = 128;
/// Default function timeout in seconds
pub const DEFAULT_TIMEOUT: u32 = 30;

const MIN_MEMORY_SIZE: u32 = 128;
const MAX_MEMORY_SIZE: u32 = 10_240;
const MAX_TIMEOUT: u32 = 900;
const MAX_NAME_LEN: usize = 64;

/// Errors raised while validating a `DeploymentSpec`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// Required field is empty
    #[error("{0} is required")]
    Missing(&'static str),

    /// Field present but malformed or out of range
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// Some but not all of vpc_id / subnet_ids / security_group_ids were given
    #[error("network placement is all-or-nothing: missing {}", missing.join(", "))]
    PartialNetwork { missing: Vec<&'static str> },

    /// Spec file could not be parsed
    #[error("failed to parse spec: {0}")]
    Parse(String),
}

fn default_memory_size() -> u32 {
    DEFAULT_MEMORY_SIZE
}

fn default_timeout() -> u32 {
    DEFAULT_TIMEOUT
}

/// Desired deployment, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// ECR image reference, e.g. `123456789012.dkr.ecr.us-east-1.amazonaws.com/repo:tag`
    pub image_uri: String,
    pub function_name: String,
    /// Bucket the function is granted access to
    pub bucket: String,
    /// Execution role name; defaults to `{function_name}-role`
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub force_recreate_role: bool,
    #[serde(default = "default_memory_size")]
    pub memory_size: u32,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    /// Invoke the function after deployment to check bucket reachability
    #[serde(default)]
    pub probe_access: bool,
}

/// Validated VPC placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
}

impl DeploymentSpec {
    /// Spec with default role, memory, timeout and no network placement
    pub fn new(image_uri: impl Into<String>, function_name: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            image_uri: image_uri.into(),
            function_name: function_name.into(),
            bucket: bucket.into(),
            role_name: None,
            force_recreate_role: false,
            memory_size: DEFAULT_MEMORY_SIZE,
            timeout: DEFAULT_TIMEOUT,
            vpc_id: None,
            subnet_ids: Vec::new(),
            security_group_ids: Vec::new(),
            probe_access: false,
        }
    }

    pub fn with_role_name(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = Some(role_name.into());
        self
    }

    pub fn with_force_recreate_role(mut self, force: bool) -> Self {
        self.force_recreate_role = force;
        self
    }

    pub fn with_memory_size(mut self, memory_size: u32) -> Self {
        self.memory_size = memory_size;
        self
    }

    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_network<S: Into<String>>(
        mut self,
        vpc_id: Option<S>,
        subnet_ids: Vec<String>,
        security_group_ids: Vec<String>,
    ) -> Self {
        self.vpc_id = vpc_id.map(Into::into);
        self.subnet_ids = subnet_ids;
        self.security_group_ids = security_group_ids;
        self
    }

    pub fn with_probe_access(mut self, probe: bool) -> Self {
        self.probe_access = probe;
        self
    }

    /// Parse a YAML spec document
    pub fn from_yaml(document: &str) -> Result<Self, SpecError> {
        serde_yaml::from_str(document).map_err(|e| SpecError::Parse(e.to_string()))
    }

    /// Effective execution role name
    pub fn role_name(&self) -> String {
        match &self.role_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("{}-role", self.function_name),
        }
    }

    /// Validated network placement; `Ok(None)` when no network field is set
    ///
    /// Subnet and security-group lists are ordered sets: duplicates are
    /// dropped, first occurrence wins.
    pub fn network(&self) -> Result<Option<NetworkSpec>, SpecError> {
        let vpc_id = match &self.vpc_id {
            Some(id) if id.trim().is_empty() => {
                return Err(SpecError::InvalidField {
                    field: "vpc_id",
                    reason: "must not be blank".to_string(),
                });
            }
            Some(id) => Some(id.trim().to_string()),
            None => None,
        };
        let subnet_ids = ordered_set(&self.subnet_ids);
        let security_group_ids = ordered_set(&self.security_group_ids);

        let provided = [vpc_id.is_some(), !subnet_ids.is_empty(), !security_group_ids.is_empty()];
        if provided.iter().all(|p| !p) {
            return Ok(None);
        }

        let missing: Vec<&'static str> = ["vpc_id", "subnet_ids", "security_group_ids"]
            .into_iter()
            .zip(provided)
            .filter_map(|(name, present)| (!present).then_some(name))
            .collect();
        if !missing.is_empty() {
            return Err(SpecError::PartialNetwork { missing });
        }

        Ok(vpc_id.map(|vpc_id| NetworkSpec {
            vpc_id,
            subnet_ids,
            security_group_ids,
        }))
    }

    /// Check every field; the first violation is returned
    pub fn validate(&self) -> Result<(), SpecError> {
        validate_image_uri(&self.image_uri)?;
        validate_function_name(&self.function_name)?;
        validate_bucket_name(&self.bucket)?;
        validate_role_name(&self.role_name())?;

        if !(MIN_MEMORY_SIZE..=MAX_MEMORY_SIZE).contains(&self.memory_size) {
            return Err(SpecError::InvalidField {
                field: "memory_size",
                reason: format!(
                    "{} MB is outside {}..={} MB",
                    self.memory_size, MIN_MEMORY_SIZE, MAX_MEMORY_SIZE
                ),
            });
        }
        if self.timeout == 0 || self.timeout > MAX_TIMEOUT {
            return Err(SpecError::InvalidField {
                field: "timeout",
                reason: format!("{} s is outside 1..={} s", self.timeout, MAX_TIMEOUT),
            });
        }

        self.network()?;
        Ok(())
    }
}

fn ordered_set(values: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !seen.iter().any(|s: &String| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

fn validate_image_uri(image_uri: &str) -> Result<(), SpecError> {
    if image_uri.trim().is_empty() {
        return Err(SpecError::Missing("image_uri"));
    }
    let invalid = |reason: &str| SpecError::InvalidField {
        field: "image_uri",
        reason: reason.to_string(),
    };
    if image_uri.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    let Some((registry, repository)) = image_uri.split_once('/') else {
        return Err(invalid("expected <registry>/<repository>[:tag|@digest]"));
    };
    if !registry.contains(".dkr.ecr.") || !registry.ends_with(".amazonaws.com") {
        return Err(invalid("registry must be an ECR registry host"));
    }
    if repository.is_empty() {
        return Err(invalid("repository is empty"));
    }
    Ok(())
}

fn validate_function_name(name: &str) -> Result<(), SpecError> {
    if name.is_empty() {
        return Err(SpecError::Missing("function_name"));
    }
    if name.len() > MAX_NAME_LEN
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SpecError::InvalidField {
            field: "function_name",
            reason: format!("{:?} must be 1-64 characters of [A-Za-z0-9-_]", name),
        });
    }
    Ok(())
}

fn validate_role_name(name: &str) -> Result<(), SpecError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || "+=,.@-_".contains(c);
    if name.len() > MAX_NAME_LEN || !name.chars().all(allowed) {
        return Err(SpecError::InvalidField {
            field: "role_name",
            reason: format!("{:?} must be 1-64 characters of [A-Za-z0-9+=,.@_-]", name),
        });
    }
    Ok(())
}

fn validate_bucket_name(name: &str) -> Result<(), SpecError> {
    if name.is_empty() {
        return Err(SpecError::Missing("bucket"));
    }
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let valid_edges = name
        .chars()
        .next()
        .zip(name.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());
    if !(3..=63).contains(&name.len()) || !valid_chars || !valid_edges {
        return Err(SpecError::InvalidField {
            field: "bucket",
            reason: format!("{:?} is not a valid S3 bucket name", name),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: &str = "acct.dkr.ecr.region.amazonaws.com/repo:tag";

    fn base() -> DeploymentSpec {
        DeploymentSpec::new(IMAGE, "f1", "data-bucket")
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let spec = base();
        assert_eq!(spec.memory_size, 128);
        assert_eq!(spec.timeout, 30);
        assert_eq!(spec.role_name(), "f1-role");
        assert!(spec.validate().is_ok());
        assert_eq!(spec.network().unwrap(), None);
    }

    #[test]
    fn test_role_name_override() {
        let spec = base().with_role_name("custom-role");
        assert_eq!(spec.role_name(), "custom-role");
    }

    #[test]
    fn test_all_empty_network_is_valid() {
        let spec = base().with_network(None::<String>, vec![], vec![]);
        assert!(spec.validate().is_ok());
        assert!(spec.network().unwrap().is_none());
    }

    #[test]
    fn test_partial_network_combinations_are_invalid() {
        let cases: Vec<(Option<&str>, Vec<String>, Vec<String>, Vec<&str>)> = vec![
            (Some("v1"), ids(&["s1"]), vec![], vec!["security_group_ids"]),
            (Some("v1"), vec![], ids(&["sg1"]), vec!["subnet_ids"]),
            (Some("v1"), vec![], vec![], vec!["subnet_ids", "security_group_ids"]),
            (None, ids(&["s1"]), ids(&["sg1"]), vec!["vpc_id"]),
            (None, ids(&["s1"]), vec![], vec!["vpc_id", "security_group_ids"]),
            (None, vec![], ids(&["sg1"]), vec!["vpc_id", "subnet_ids"]),
        ];

        for (vpc, subnets, groups, expected_missing) in cases {
            let spec = base().with_network(vpc, subnets, groups);
            assert_eq!(
                spec.validate(),
                Err(SpecError::PartialNetwork {
                    missing: expected_missing.clone()
                }),
                "expected {:?} to be reported missing",
                expected_missing
            );
        }
    }

    #[test]
    fn test_network_ordered_set_dedupes() {
        let spec = base().with_network(
            Some("v1"),
            ids(&["s2", "s1", "s2"]),
            ids(&["sg1", "sg1"]),
        );
        let network = spec.network().unwrap().unwrap();
        assert_eq!(network.subnet_ids, ids(&["s2", "s1"]));
        assert_eq!(network.security_group_ids, ids(&["sg1"]));
    }

    #[test]
    fn test_blank_vpc_rejected() {
        let spec = base().with_network(Some("  "), ids(&["s1"]), ids(&["sg1"]));
        assert!(matches!(spec.validate(), Err(SpecError::InvalidField { field: "vpc_id", .. })));
    }

    #[test]
    fn test_field_validation() {
        assert_eq!(
            DeploymentSpec::new("", "f1", "data-bucket").validate(),
            Err(SpecError::Missing("image_uri"))
        );
        assert!(DeploymentSpec::new("docker.io/library/nginx", "f1", "data-bucket")
            .validate()
            .is_err());
        assert!(DeploymentSpec::new(IMAGE, "bad name", "data-bucket").validate().is_err());
        assert!(DeploymentSpec::new(IMAGE, "f1", "Data_Bucket").validate().is_err());
        assert!(base().with_memory_size(64).validate().is_err());
        assert!(base().with_timeout(0).validate().is_err());
        assert!(base().with_timeout(901).validate().is_err());
    }

    #[test]
    fn test_function_name_length_limit() {
        assert!(DeploymentSpec::new(IMAGE, "f".repeat(64), "data-bucket")
            .with_role_name("short-role")
            .validate()
            .is_ok());
        assert!(matches!(
            DeploymentSpec::new(IMAGE, "f".repeat(65), "data-bucket")
                .with_role_name("short-role")
                .validate(),
            Err(SpecError::InvalidField { field: "function_name", .. })
        ));
    }

    #[test]
    fn test_derived_role_name_length_limit() {
        // 60 + "-role" is over the role limit while the function name itself is fine
        let spec = DeploymentSpec::new(IMAGE, "f".repeat(60), "data-bucket");
        assert_eq!(spec.role_name().len(), 65);
        assert!(matches!(spec.validate(), Err(SpecError::InvalidField { field: "role_name", .. })));
        assert!(spec.with_role_name("f-role").validate().is_ok());
    }

    #[test]
    fn test_from_yaml_applies_defaults() {
        let spec = DeploymentSpec::from_yaml(
            r#"
image_uri: acct.dkr.ecr.region.amazonaws.com/repo:tag
function_name: f1
bucket: data-bucket
vpc_id: v1
subnet_ids: [s1, s2]
security_group_ids: [sg1]
"#,
        )
        .unwrap();
        assert_eq!(spec.memory_size, DEFAULT_MEMORY_SIZE);
        assert_eq!(spec.timeout, DEFAULT_TIMEOUT);
        assert!(!spec.force_recreate_role);
        assert_eq!(spec.network().unwrap().unwrap().vpc_id, "v1");
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        assert!(matches!(DeploymentSpec::from_yaml("function_name: [unterminated"), Err(SpecError::Parse(_))));
    }
}
