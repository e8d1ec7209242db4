//! Configuration for tenant propagation and logging.

use crate::policy::TenantRequirement;

/// Settings for the propagation interceptors and layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationConfig {
    /// Policy applied to incoming calls after propagation.
    pub tenant_requirement: TenantRequirement,
}

/// Logging settings consumed by [`crate::telemetry::init_tracing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Command-line and environment flags, flattened into a host binary's parser.
#[derive(Debug, Clone, clap::Args)]
pub struct PropagationArgs {
    /// Reject incoming calls that carry no tenant.
    #[arg(
        long,
        env = "TENANT_REQUIREMENT",
        value_enum,
        default_value_t = TenantRequirement::Optional
    )]
    pub tenant_requirement: TenantRequirement,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "LOG_FILTER", default_value = "info")]
    pub log_filter: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl PropagationArgs {
    #[must_use]
    pub fn propagation_config(&self) -> PropagationConfig {
        PropagationConfig {
            tenant_requirement: self.tenant_requirement,
        }
    }

    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            filter: self.log_filter.clone(),
            json: self.log_json,
        }
    }
}
