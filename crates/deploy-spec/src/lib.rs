//! Lambda Deployer Types
//!
//! Input (`DeploymentSpec`) and output (`DeploymentResult`) types shared by the
//! reconciler library and the command-line surface.

pub mod result;
pub mod spec;

pub use result::*;
pub use spec::*;
