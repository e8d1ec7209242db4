//! Context propagation across RPC boundaries.
//!
//! A [`Propagator`] maps one request-scoped value between a [`Context`] and
//! transport metadata. The caller side calls [`Propagator::extract`] before
//! every outgoing call; the callee side calls [`Propagator::inject`] before
//! dispatching every incoming call. Propagators are independent of each
//! other and are composed by the interceptor layer.

pub mod tenant;

use tenancy_core::Context;
use tonic::metadata::MetadataMap;
use tonic::Status;

pub use tenant::TenantPropagator;

/// Bidirectional mapping between a context value and RPC metadata.
///
/// Implementations must be symmetric: whatever `extract` writes, `inject`
/// on the peer must read back into an equivalent context.
pub trait Propagator: Send + Sync {
    /// Produces the outgoing metadata for `ctx`. Never fails.
    fn extract(&self, ctx: &Context) -> MetadataMap;

    /// Derives the callee context from incoming `metadata`.
    ///
    /// `ctx` is borrowed so the caller keeps the original on failure.
    ///
    /// # Errors
    ///
    /// Returns a [`Status`] when the metadata is present but malformed. The
    /// call should be rejected with it before any handler runs.
    #[allow(clippy::result_large_err)]
    fn inject(&self, ctx: &Context, metadata: &MetadataMap) -> Result<Context, Status>;
}
