//! gRPC interceptors that run every registered propagator on each call.
//!
//! The caller's [`Context`] travels in the request extensions. On the client
//! side [`ClientInterceptor`] reads it and writes metadata; on the server side
//! [`ServerInterceptor`] reads metadata and stores the derived context back
//! into the extensions for the handler (see [`context_of`]).

use std::fmt;
use std::sync::Arc;

use tenancy_core::{from_context, Context};
use tonic::metadata::MetadataMap;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::{debug, warn};

use crate::config::PropagationConfig;
use crate::policy::TenantRequirement;
use crate::propagator::{Propagator, TenantPropagator};

// ---------------------------------------------------------------------------
// PropagatorSet
// ---------------------------------------------------------------------------

/// Ordered, shareable collection of propagators.
///
/// Extraction merges every propagator's metadata; injection threads the
/// context through each propagator in order and stops at the first error.
#[derive(Clone)]
pub struct PropagatorSet {
    propagators: Arc<[Arc<dyn Propagator>]>,
}

impl PropagatorSet {
    #[must_use]
    pub fn new(propagators: Vec<Arc<dyn Propagator>>) -> Self {
        Self {
            propagators: propagators.into(),
        }
    }

    /// A set containing only [`TenantPropagator`].
    #[must_use]
    pub fn tenant() -> Self {
        let propagators: Vec<Arc<dyn Propagator>> = vec![Arc::new(TenantPropagator)];
        Self::new(propagators)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.propagators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.propagators.is_empty()
    }
}

impl Default for PropagatorSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for PropagatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropagatorSet")
            .field("len", &self.len())
            .finish()
    }
}

impl Propagator for PropagatorSet {
    fn extract(&self, ctx: &Context) -> MetadataMap {
        let mut merged = MetadataMap::new();
        for propagator in self.propagators.iter() {
            merge_metadata(&mut merged, propagator.extract(ctx));
        }
        merged
    }

    #[allow(clippy::result_large_err)]
    fn inject(&self, ctx: &Context, metadata: &MetadataMap) -> Result<Context, Status> {
        let mut current = ctx.clone();
        for propagator in self.propagators.iter() {
            current = propagator.inject(&current, metadata)?;
        }
        Ok(current)
    }
}

/// Copies `src` into `dst`. Keys present in `src` replace any values `dst`
/// already holds for them.
pub fn merge_metadata(dst: &mut MetadataMap, src: MetadataMap) {
    let mut headers = std::mem::take(dst).into_headers();
    headers.extend(src.into_headers());
    *dst = MetadataMap::from_headers(headers);
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Wraps `message` in a request carrying `ctx` for [`ClientInterceptor`].
#[must_use]
pub fn request_with_context<T>(message: T, ctx: &Context) -> Request<T> {
    let mut request = Request::new(message);
    request.extensions_mut().insert(ctx.clone());
    request
}

/// The context attached by [`ServerInterceptor`], or the background context
/// if the request never went through one.
#[must_use]
pub fn context_of<T>(request: &Request<T>) -> Context {
    request
        .extensions()
        .get::<Context>()
        .cloned()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// ClientInterceptor
// ---------------------------------------------------------------------------

/// Writes propagated metadata onto every outgoing call.
#[derive(Debug, Clone)]
pub struct ClientInterceptor {
    propagators: PropagatorSet,
}

impl ClientInterceptor {
    #[must_use]
    pub fn new(propagators: PropagatorSet) -> Self {
        Self { propagators }
    }
}

impl Default for ClientInterceptor {
    fn default() -> Self {
        Self::new(PropagatorSet::tenant())
    }
}

impl Interceptor for ClientInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let ctx = context_of(&request);
        let extracted = self.propagators.extract(&ctx);
        merge_metadata(request.metadata_mut(), extracted);
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// ServerInterceptor
// ---------------------------------------------------------------------------

/// Rebuilds the caller's context from incoming metadata before dispatch.
///
/// Calls with malformed metadata, or without a tenant when one is required,
/// are rejected here and never reach the handler.
#[derive(Debug, Clone)]
pub struct ServerInterceptor {
    propagators: PropagatorSet,
    requirement: TenantRequirement,
}

impl ServerInterceptor {
    #[must_use]
    pub fn new(propagators: PropagatorSet, config: &PropagationConfig) -> Self {
        Self {
            propagators,
            requirement: config.tenant_requirement,
        }
    }
}

impl Default for ServerInterceptor {
    fn default() -> Self {
        Self::new(PropagatorSet::tenant(), &PropagationConfig::default())
    }
}

impl Interceptor for ServerInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let ctx = inject_and_enforce(
            &self.propagators,
            self.requirement,
            &context_of(&request),
            request.metadata(),
        )?;
        request.extensions_mut().insert(ctx);
        Ok(request)
    }
}

/// Shared inbound path for the gRPC interceptor and the HTTP layer.
#[allow(clippy::result_large_err)]
pub(crate) fn inject_and_enforce(
    propagators: &PropagatorSet,
    requirement: TenantRequirement,
    ctx: &Context,
    metadata: &MetadataMap,
) -> Result<Context, Status> {
    let ctx = propagators
        .inject(ctx, metadata)
        .and_then(|ctx| requirement.enforce(&ctx).map(|()| ctx))
        .inspect_err(|status| {
            warn!(
                code = ?status.code(),
                reason = status.message(),
                "rejecting call: context propagation failed"
            );
        })?;

    match from_context(&ctx) {
        Ok(tenant) => debug!(tenant = tenant.id(), "call context propagated"),
        Err(_) => debug!("call context propagated without tenant"),
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use tenancy_core::{with_tenant, Tenant, TenantError};
    use tonic::metadata::{Ascii, MetadataValue};
    use tonic::Code;

    use super::*;
    use crate::propagator::tenant::TENANT_ID_HEADER;

    const REQUEST_ID_HEADER: &str = "x-request-id";

    #[derive(Debug, Clone, PartialEq)]
    struct RequestId(String);

    /// Second propagator used to check composition.
    struct RequestIdPropagator;

    impl Propagator for RequestIdPropagator {
        fn extract(&self, ctx: &Context) -> MetadataMap {
            let mut md = MetadataMap::new();
            if let Some(RequestId(id)) = ctx.value::<RequestId>() {
                if let Ok(value) = id.parse::<MetadataValue<Ascii>>() {
                    md.insert(REQUEST_ID_HEADER, value);
                }
            }
            md
        }

        fn inject(&self, ctx: &Context, metadata: &MetadataMap) -> Result<Context, Status> {
            match metadata.get(REQUEST_ID_HEADER) {
                Some(value) => {
                    let id = value
                        .to_str()
                        .map_err(|_| Status::invalid_argument("bad request id"))?;
                    Ok(ctx.with_value(RequestId(id.to_string())))
                }
                None => Ok(ctx.clone()),
            }
        }
    }

    fn tenant(id: u64) -> Tenant {
        Tenant::new(id).unwrap()
    }

    fn both() -> PropagatorSet {
        let propagators: Vec<Arc<dyn Propagator>> =
            vec![Arc::new(TenantPropagator), Arc::new(RequestIdPropagator)];
        PropagatorSet::new(propagators)
    }

    fn header(request: &Request<()>, key: &str) -> Option<String> {
        request
            .metadata()
            .get(key)
            .map(|v| v.to_str().unwrap().to_string())
    }

    /// Moves client-side metadata into a fresh server-side request.
    fn over_the_wire(request: Request<()>) -> Request<()> {
        let mut received = Request::new(());
        *received.metadata_mut() = request.metadata().clone();
        received
    }

    #[test]
    fn client_sends_tenant_from_request_context() {
        let ctx = with_tenant(&Context::background(), tenant(42));
        let out = ClientInterceptor::default()
            .call(request_with_context((), &ctx))
            .unwrap();
        assert_eq!(header(&out, TENANT_ID_HEADER).as_deref(), Some("42"));
    }

    #[test]
    fn client_sends_sentinel_without_context() {
        let out = ClientInterceptor::default().call(Request::new(())).unwrap();
        assert_eq!(header(&out, TENANT_ID_HEADER).as_deref(), Some("none"));
    }

    #[test]
    fn client_replaces_stale_tenant_header() {
        let ctx = with_tenant(&Context::background(), tenant(5));
        let mut request = request_with_context((), &ctx);
        request
            .metadata_mut()
            .insert(TENANT_ID_HEADER, MetadataValue::from_static("99"));
        request
            .metadata_mut()
            .insert("x-other", MetadataValue::from_static("kept"));

        let out = ClientInterceptor::default().call(request).unwrap();
        let values: Vec<_> = out.metadata().get_all(TENANT_ID_HEADER).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(header(&out, TENANT_ID_HEADER).as_deref(), Some("5"));
        assert_eq!(header(&out, "x-other").as_deref(), Some("kept"));
    }

    #[test]
    fn server_attaches_tenant_for_handler() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(TENANT_ID_HEADER, MetadataValue::from_static("42"));

        let out = ServerInterceptor::default().call(request).unwrap();
        assert_eq!(from_context(&context_of(&out)), Ok(tenant(42)));
    }

    #[test]
    fn server_accepts_missing_header() {
        let out = ServerInterceptor::default().call(Request::new(())).unwrap();
        assert_eq!(from_context(&context_of(&out)), Err(TenantError::NoTenant));
    }

    #[test]
    fn server_rejects_malformed_tenant() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(TENANT_ID_HEADER, MetadataValue::from_static("abc"));

        let status = ServerInterceptor::default().call(request).unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(status.message().contains("bad tenant value in metadata"));
    }

    #[test]
    fn server_enforces_required_tenant() {
        let config = PropagationConfig {
            tenant_requirement: TenantRequirement::Required,
        };
        let mut interceptor = ServerInterceptor::new(PropagatorSet::tenant(), &config);

        let mut sentinel = Request::new(());
        sentinel
            .metadata_mut()
            .insert(TENANT_ID_HEADER, MetadataValue::from_static("none"));
        let status = interceptor.call(sentinel).unwrap_err();
        assert_eq!(status.message(), "tenant required");

        let mut present = Request::new(());
        present
            .metadata_mut()
            .insert(TENANT_ID_HEADER, MetadataValue::from_static("8"));
        assert!(interceptor.call(present).is_ok());
    }

    #[test]
    fn composed_propagators_round_trip() {
        let caller = with_tenant(&Context::background(), tenant(42))
            .with_value(RequestId("req-1".to_string()));

        let sent = ClientInterceptor::new(both())
            .call(request_with_context((), &caller))
            .unwrap();
        assert_eq!(header(&sent, REQUEST_ID_HEADER).as_deref(), Some("req-1"));

        let received = ServerInterceptor::new(both(), &PropagationConfig::default())
            .call(over_the_wire(sent))
            .unwrap();
        let ctx = context_of(&received);
        assert_eq!(from_context(&ctx), Ok(tenant(42)));
        assert_eq!(ctx.value::<RequestId>(), Some(&RequestId("req-1".to_string())));
    }

    #[test]
    fn end_to_end_without_tenant() {
        let sent = ClientInterceptor::default()
            .call(request_with_context((), &Context::background()))
            .unwrap();
        assert_eq!(header(&sent, TENANT_ID_HEADER).as_deref(), Some("none"));

        let received = ServerInterceptor::default()
            .call(over_the_wire(sent))
            .unwrap();
        assert_eq!(
            from_context(&context_of(&received)),
            Err(TenantError::NoTenant)
        );
    }

    #[test]
    fn set_stops_at_first_error() {
        let mut md = MetadataMap::new();
        md.insert(TENANT_ID_HEADER, MetadataValue::from_static("0"));
        md.insert(REQUEST_ID_HEADER, MetadataValue::from_static("req-2"));

        let status = both().inject(&Context::background(), &md).unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[test]
    fn empty_set_is_a_no_op() {
        let set = PropagatorSet::default();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(PropagatorSet::tenant().len(), 1);
        assert_eq!(format!("{:?}", both()), "PropagatorSet { len: 2 }");
        assert!(set.extract(&Context::background()).is_empty());

        let ctx = Context::background();
        assert!(set.inject(&ctx, &MetadataMap::new()).unwrap().ptr_eq(&ctx));
    }

    #[test]
    fn merge_keeps_unrelated_keys() {
        let mut dst = MetadataMap::new();
        dst.insert("x-a", MetadataValue::from_static("1"));
        let mut src = MetadataMap::new();
        src.insert("x-b", MetadataValue::from_static("2"));

        merge_metadata(&mut dst, src);
        assert_eq!(dst.len(), 2);
    }
}
