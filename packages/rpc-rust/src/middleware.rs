//! Tower middleware carrying the same propagation over plain HTTP headers.
//!
//! - [`InjectContextLayer`]: server side. Rebuilds the caller's [`Context`]
//!   from request headers and stores it in the request extensions.
//! - [`ExtractContextLayer`]: client side. Writes headers for the
//!   [`Context`] found in the outgoing request's extensions.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use http::{Request, Response, StatusCode};
use tenancy_core::Context;
use tonic::metadata::MetadataMap;
use tower::{Layer, Service};

use crate::config::PropagationConfig;
use crate::interceptor::{inject_and_enforce, PropagatorSet};
use crate::policy::TenantRequirement;
use crate::propagator::Propagator;

// ---------------------------------------------------------------------------
// InjectContextLayer
// ---------------------------------------------------------------------------

/// Tower layer that derives the request context from incoming headers.
///
/// Requests whose headers fail propagation get `400 Bad Request` whose body
/// is the rejection message; the inner service is not called.
#[derive(Debug, Clone)]
pub struct InjectContextLayer {
    propagators: PropagatorSet,
    requirement: TenantRequirement,
}

impl InjectContextLayer {
    #[must_use]
    pub fn new(propagators: PropagatorSet, config: &PropagationConfig) -> Self {
        Self {
            propagators,
            requirement: config.tenant_requirement,
        }
    }
}

impl<S> Layer<S> for InjectContextLayer {
    type Service = InjectContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InjectContextService {
            inner,
            propagators: self.propagators.clone(),
            requirement: self.requirement,
        }
    }
}

// ---------------------------------------------------------------------------
// InjectContextService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`InjectContextLayer`].
#[derive(Debug, Clone)]
pub struct InjectContextService<S> {
    inner: S,
    propagators: PropagatorSet,
    requirement: TenantRequirement,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for InjectContextService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let base = req
            .extensions()
            .get::<Context>()
            .cloned()
            .unwrap_or_default();
        let metadata = MetadataMap::from_headers(req.headers().clone());

        match inject_and_enforce(&self.propagators, self.requirement, &base, &metadata) {
            Ok(ctx) => {
                req.extensions_mut().insert(ctx);
                Box::pin(self.inner.call(req))
            }
            Err(status) => Box::pin(async move {
                let mut response = Response::new(ResBody::from(status.message().to_string()));
                *response.status_mut() = StatusCode::BAD_REQUEST;
                Ok(response)
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ExtractContextLayer
// ---------------------------------------------------------------------------

/// Tower layer that writes propagation headers onto outgoing requests.
#[derive(Debug, Clone)]
pub struct ExtractContextLayer {
    propagators: PropagatorSet,
}

impl ExtractContextLayer {
    #[must_use]
    pub fn new(propagators: PropagatorSet) -> Self {
        Self { propagators }
    }
}

impl<S> Layer<S> for ExtractContextLayer {
    type Service = ExtractContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExtractContextService {
            inner,
            propagators: self.propagators.clone(),
        }
    }
}

/// Service wrapper produced by [`ExtractContextLayer`].
#[derive(Debug, Clone)]
pub struct ExtractContextService<S> {
    inner: S,
    propagators: PropagatorSet,
}

impl<S, B> Service<Request<B>> for ExtractContextService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let ctx = req
            .extensions()
            .get::<Context>()
            .cloned()
            .unwrap_or_default();
        let headers = self.propagators.extract(&ctx).into_headers();
        req.headers_mut().extend(headers);
        self.inner.call(req)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
