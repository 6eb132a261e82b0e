//! Deployment settings.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const PROJECT_VAR: &str = "IAC_PROJECT";
pub const STACK_VAR: &str = "IAC_STACK";
pub const ORGANIZATION_VAR: &str = "IAC_ORGANIZATION";
pub const DRY_RUN_VAR: &str = "IAC_DRY_RUN";
pub const PARALLEL_VAR: &str = "IAC_PARALLEL";

/// Identity and mode of the deployment a program runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentSettings {
    pub project: String,
    pub stack: String,
    pub organization: Option<String>,
    /// True during a preview: the engine may answer with unknown values.
    pub dry_run: bool,
    /// Maximum number of engine requests in flight. Zero means unbounded.
    pub parallel: usize,
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            project: "project".to_string(),
            stack: "dev".to_string(),
            organization: None,
            dry_run: false,
            parallel: 0,
        }
    }
}

impl DeploymentSettings {
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
            ..Self::default()
        }
    }

    /// Reads settings from `IAC_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let dry_run = std::env::var(DRY_RUN_VAR)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.dry_run);
        let parallel = match std::env::var(PARALLEL_VAR) {
            Ok(v) => v.parse().unwrap_or_else(|_| {
                warn!(value = %v, "Ignoring invalid {PARALLEL_VAR}");
                defaults.parallel
            }),
            Err(_) => defaults.parallel,
        };
        Self {
            project: std::env::var(PROJECT_VAR).unwrap_or(defaults.project),
            stack: std::env::var(STACK_VAR).unwrap_or(defaults.stack),
            organization: std::env::var(ORGANIZATION_VAR).ok(),
            dry_run,
            parallel,
        }
    }

    /// Name of the root stack resource: `{project}-{stack}`.
    pub fn root_stack_name(&self) -> String {
        format!("{}-{}", self.project, self.stack)
    }
}
