//! Command-line surface

use clap::{Args, Parser, Subcommand, ValueEnum};
use deploy_spec::DeploymentSpec;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(
    name = "lambda-deployer",
    about = "Deploy a container image as a Lambda function with IAM, S3 and VPC wiring",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Report format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Converge role, bucket access, function and network placement
    Deploy(DeployArgs),

    /// Inspect networks a function can be placed into
    #[command(subcommand)]
    Network(NetworkCommand),
}

#[derive(Debug, Subcommand)]
pub enum NetworkCommand {
    /// List available VPCs, or the subnets and security groups of one VPC
    List {
        #[arg(long)]
        vpc_id: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("--{0} is required (or set it in --spec-file)")]
    MissingArgument(&'static str),

    #[error("Failed to read spec file {path}: {source}")]
    SpecFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Spec(#[from] deploy_spec::SpecError),
}

#[derive(Debug, Default, Args)]
pub struct DeployArgs {
    /// YAML file with a deployment spec; flags override its values
    #[arg(long)]
    pub spec_file: Option<PathBuf>,

    /// ECR image URI (e.g. 123456789012.dkr.ecr.us-east-1.amazonaws.com/repo:tag)
    #[arg(long)]
    pub image_uri: Option<String>,

    #[arg(long)]
    pub function_name: Option<String>,

    /// Bucket the function gets read/write access to
    #[arg(long)]
    pub bucket: Option<String>,

    /// Execution role name (default: <function-name>-role)
    #[arg(long)]
    pub role_name: Option<String>,

    /// Delete and recreate the execution role if it exists
    #[arg(long)]
    pub force_recreate_role: bool,

    /// Memory in MB
    #[arg(long)]
    pub memory_size: Option<u32>,

    /// Timeout in seconds
    #[arg(long)]
    pub timeout: Option<u32>,

    #[arg(long)]
    pub vpc_id: Option<String>,

    /// Comma-separated subnet ids
    #[arg(long, value_delimiter = ',')]
    pub subnet_ids: Vec<String>,

    /// Comma-separated security group ids
    #[arg(long, value_delimiter = ',')]
    pub security_group_ids: Vec<String>,

    /// Invoke the function afterwards to check bucket access
    #[arg(long)]
    pub probe_access: bool,
}

impl DeployArgs {
    /// Build a `DeploymentSpec` from the optional file, then the flags
    pub fn into_spec(self) -> Result<DeploymentSpec, CliError> {
        let base = match &self.spec_file {
            Some(path) => {
                let document = std::fs::read_to_string(path).map_err(|source| CliError::SpecFile {
                    path: path.clone(),
                    source,
                })?;
                Some(DeploymentSpec::from_yaml(&document)?)
            }
            None => None,
        };
        self.merge(base)
    }

    fn merge(self, base: Option<DeploymentSpec>) -> Result<DeploymentSpec, CliError> {
        let mut spec = match base {
            Some(spec) => spec,
            None => DeploymentSpec::new(
                self.image_uri.clone().ok_or(CliError::MissingArgument("image-uri"))?,
                self.function_name.clone().ok_or(CliError::MissingArgument("function-name"))?,
                self.bucket.clone().ok_or(CliError::MissingArgument("bucket"))?,
            ),
        };

        if let Some(image_uri) = self.image_uri {
            spec.image_uri = image_uri;
        }
        if let Some(function_name) = self.function_name {
            spec.function_name = function_name;
        }
        if let Some(bucket) = self.bucket {
            spec.bucket = bucket;
        }
        if self.role_name.is_some() {
            spec.role_name = self.role_name;
        }
        spec.force_recreate_role |= self.force_recreate_role;
        if let Some(memory_size) = self.memory_size {
            spec.memory_size = memory_size;
        }
        if let Some(timeout) = self.timeout {
            spec.timeout = timeout;
        }
        if self.vpc_id.is_some() {
            spec.vpc_id = self.vpc_id;
        }
        if !self.subnet_ids.is_empty() {
            spec.subnet_ids = self.subnet_ids;
        }
        if !self.security_group_ids.is_empty() {
            spec.security_group_ids = self.security_group_ids;
        }
        spec.probe_access |= self.probe_access;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: &str = "acct.dkr.ecr.region.amazonaws.com/repo:tag";

    #[test]
    fn test_parse_deploy_flags() {
        let cli = Cli::try_parse_from([
            "lambda-deployer",
            "deploy",
            "--image-uri",
            IMAGE,
            "--function-name",
            "f1",
            "--bucket",
            "data-bucket",
            "--vpc-id",
            "v1",
            "--subnet-ids",
            "s1,s2",
            "--security-group-ids",
            "sg1",
            "--output",
            "json",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy, got {:?}", cli.command);
        };
        let spec = args.into_spec().unwrap();
        assert_eq!(spec.subnet_ids, vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(spec.security_group_ids, vec!["sg1".to_string()]);
        assert_eq!(spec.role_name(), "f1-role");
    }

    #[test]
    fn test_missing_required_flag() {
        let args = DeployArgs {
            image_uri: Some(IMAGE.to_string()),
            function_name: Some("f1".to_string()),
            ..Default::default()
        };
        assert!(matches!(args.into_spec(), Err(CliError::MissingArgument("bucket"))));
    }

    #[test]
    fn test_flags_override_file_values() {
        let base = DeploymentSpec::new(IMAGE, "f1", "data-bucket").with_memory_size(256);
        let args = DeployArgs {
            memory_size: Some(512),
            bucket: Some("other-bucket".to_string()),
            ..Default::default()
        };
        let spec = args.merge(Some(base)).unwrap();
        assert_eq!(spec.memory_size, 512);
        assert_eq!(spec.bucket, "other-bucket");
        assert_eq!(spec.function_name, "f1");
    }

    #[test]
    fn test_parse_network_list() {
        let cli = Cli::try_parse_from(["lambda-deployer", "network", "list", "--vpc-id", "v1"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Network(NetworkCommand::List { vpc_id: Some(ref id) }) if id == "v1"
        ));

        let cli = Cli::try_parse_from(["lambda-deployer", "-o", "json", "network", "list"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Network(NetworkCommand::List { vpc_id: None })));
    }
}
