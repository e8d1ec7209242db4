//! Tenancy RPC — carries the caller's tenant across gRPC and HTTP hops.
//!
//! The caller's [`Context`](tenancy_core::Context) is encoded into one
//! metadata entry by [`TenantPropagator`] on the way out and decoded back into
//! a fresh context on the callee before the handler runs.

pub mod config;
pub mod interceptor;
pub mod middleware;
pub mod policy;
pub mod propagator;
pub mod telemetry;

pub use config::{LogConfig, PropagationArgs, PropagationConfig};
pub use interceptor::{
    context_of, request_with_context, ClientInterceptor, PropagatorSet, ServerInterceptor,
};
pub use middleware::{ExtractContextLayer, InjectContextLayer};
pub use policy::TenantRequirement;
pub use propagator::tenant::{NO_TENANT, TENANT_ID_HEADER};
pub use propagator::{Propagator, TenantPropagator};
pub use telemetry::init_tracing;
