// ABOUTME: Validated domain types shared across rigger.
// ABOUTME: Names, identities, build references and execution identifiers.

mod access;
mod build;
mod execution_id;
mod project_name;
mod target_name;

pub use access::{Capability, DEFAULT_TRIGGER_CAPABILITY, Identity};
pub use build::{BuildRef, BuildStatus};
pub use execution_id::{ExecutionId, ExecutionIdError};
pub use project_name::{ProjectName, ProjectNameError};
pub use target_name::{TargetName, TargetNameError};
