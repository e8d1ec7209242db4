//! Tenant enforcement applied after propagation.
//!
//! Propagation itself treats "no tenant" as a valid state. Whether a service
//! accepts such calls is decided here, on top of the protocol.

use tenancy_core::{from_context, Context};
use tonic::Status;

/// Whether incoming calls must carry a tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TenantRequirement {
    /// Calls without a tenant proceed as the anonymous tenant.
    #[default]
    Optional,
    /// Calls without a tenant are rejected.
    Required,
}

impl TenantRequirement {
    /// Checks `ctx` against this requirement.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when a tenant is required and `ctx` has none.
    #[allow(clippy::result_large_err)]
    pub fn enforce(self, ctx: &Context) -> Result<(), Status> {
        match self {
            Self::Optional => Ok(()),
            Self::Required => from_context(ctx)
                .map(|_| ())
                .map_err(|_| Status::invalid_argument("tenant required")),
        }
    }
}
