//! Tenant propagation over RPC metadata.
//!
//! ## Wire format
//!
//! One entry under `X-Sourcegraph-Tenant-ID`, sent lowercase as gRPC and
//! HTTP/2 require. The value is either the tenant id in base 10 or the
//! sentinel `none`. An absent header reads the same as the sentinel.

use tenancy_core::{from_context, with_tenant, Context, Tenant};
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::Status;
use tracing::debug;

use super::Propagator;

/// Metadata key carrying the tenant id (`X-Sourcegraph-Tenant-ID`, normalized).
pub const TENANT_ID_HEADER: &str = "x-sourcegraph-tenant-id";

/// Header value sent when the caller has no tenant.
pub const NO_TENANT: &str = "none";

/// Propagates the tenant attached to a [`Context`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantPropagator;

impl Propagator for TenantPropagator {
    fn extract(&self, ctx: &Context) -> MetadataMap {
        let value = match from_context(ctx) {
            Ok(tenant) => MetadataValue::from(tenant.id()),
            Err(_) => MetadataValue::from_static(NO_TENANT),
        };

        let mut md = MetadataMap::new();
        md.insert(TENANT_ID_HEADER, value);
        md
    }

    #[allow(clippy::result_large_err)]
    fn inject(&self, ctx: &Context, metadata: &MetadataMap) -> Result<Context, Status> {
        let Some(value) = metadata.get(TENANT_ID_HEADER) else {
            debug!(source = "header_absent", "no tenant in metadata");
            return Ok(ctx.clone());
        };

        let raw = value.to_str().map_err(|_| {
            Status::invalid_argument(
                "bad tenant value in metadata: value is not visible ASCII",
            )
        })?;

        match raw {
            "" | NO_TENANT => {
                debug!(source = "sentinel", "no tenant in metadata");
                Ok(ctx.clone())
            }
            _ => {
                let tenant = Tenant::unmarshal(raw).map_err(|err| {
                    Status::invalid_argument(format!("bad tenant value in metadata: {err}"))
                })?;
                Ok(with_tenant(ctx, tenant))
            }
        }
    }
}
