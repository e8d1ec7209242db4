//! Tenancy Core — request-scoped context and tenant identifiers.

pub mod context;
pub mod error;
pub mod tenant;

pub use context::Context;
pub use error::{InvalidReason, TenantError};
pub use tenant::{from_context, with_tenant, Tenant};
