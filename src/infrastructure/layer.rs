//! Tower integration layer.
//!
//! Provides a `tower::Layer` that guards an HTTP service with an admission
//! policy: rejected requests get the 429 response, admitted requests reach the
//! inner service and its response gains the `X-RateLimit-*` headers.

use crate::application::{
    controller::{AdmissionController, DefaultStore},
    ports::{Clock, CounterStore},
};
use crate::domain::{counter::CounterEntry, policy::Policy};
use crate::infrastructure::identity::{ForwardedIpExtractor, IdentityExtractor};
use crate::infrastructure::response::{too_many_requests, RateLimitHeaders};

use futures_util::future::BoxFuture;
use http::{Request, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Error returned when building an `AdmissionLayer` fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// No policy was configured
    MissingPolicy,
    /// A clock was set together with an existing controller, which has its own
    ClockWithController,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::MissingPolicy => write!(f, "an admission policy is required"),
            BuildError::ClockWithController => {
                write!(f, "with_clock cannot be combined with with_controller")
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Builder for constructing an `AdmissionLayer`.
pub struct AdmissionLayerBuilder {
    policy: Option<Policy>,
    controller: Option<AdmissionController>,
    extractor: Option<Arc<dyn IdentityExtractor>>,
    clock: Option<Arc<dyn Clock>>,
}

impl AdmissionLayerBuilder {
    /// Set the policy this layer enforces. Required.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Share counters with an existing controller.
    ///
    /// Use this to guard several routes with one store, or to run a
    /// [`Sweeper`](crate::Sweeper) over the same counters.
    pub fn with_controller(mut self, controller: AdmissionController) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Set how identities are derived from requests.
    ///
    /// Default: [`ForwardedIpExtractor`].
    pub fn with_identity_extractor(mut self, extractor: Arc<dyn IdentityExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set a custom clock for a fresh controller (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the layer.
    ///
    /// # Errors
    /// Returns `BuildError` if no policy is set, or if both a clock and a
    /// controller are set.
    pub fn build(self) -> Result<AdmissionLayer, BuildError> {
        let policy = self.policy.ok_or(BuildError::MissingPolicy)?;

        let controller = match (self.controller, self.clock) {
            (Some(_), Some(_)) => return Err(BuildError::ClockWithController),
            (Some(controller), None) => controller,
            (None, Some(clock)) => AdmissionController::with_clock(clock),
            (None, None) => AdmissionController::new(),
        };

        let extractor = self
            .extractor
            .unwrap_or_else(|| Arc::new(ForwardedIpExtractor));

        Ok(AdmissionLayer {
            controller,
            policy: Arc::new(policy),
            extractor,
        })
    }
}

/// A `tower::Layer` that applies one admission policy to a service.
///
/// # Example
///
/// ```no_run
/// use admission_control::{AdmissionLayer, PolicyCatalog};
/// use axum::{routing::post, Router};
///
/// let catalog = PolicyCatalog::marketplace().unwrap();
/// let booking = AdmissionLayer::builder()
///     .with_policy(catalog.require("booking").unwrap().clone())
///     .build()
///     .unwrap();
///
/// let app: Router = Router::new()
///     .route("/bookings", post(|| async { "created" }))
///     .layer(booking);
/// ```
#[derive(Clone)]
pub struct AdmissionLayer<St = DefaultStore>
where
    St: CounterStore<String, CounterEntry> + Clone,
{
    controller: AdmissionController<St>,
    policy: Arc<Policy>,
    extractor: Arc<dyn IdentityExtractor>,
}

impl AdmissionLayer<DefaultStore> {
    /// Create a builder for configuring the layer.
    ///
    /// Defaults:
    /// - Controller: fresh in-memory store with the system clock
    /// - Identity: [`ForwardedIpExtractor`]
    pub fn builder() -> AdmissionLayerBuilder {
        AdmissionLayerBuilder {
            policy: None,
            controller: None,
            extractor: None,
            clock: None,
        }
    }
}

impl<St> AdmissionLayer<St>
where
    St: CounterStore<String, CounterEntry> + Clone,
{
    /// Guard services with `policy`, counting in `controller`.
    ///
    /// Works with any counter store; identities come from
    /// [`ForwardedIpExtractor`] unless replaced.
    pub fn with_controller(controller: AdmissionController<St>, policy: Policy) -> Self {
        Self {
            controller,
            policy: Arc::new(policy),
            extractor: Arc::new(ForwardedIpExtractor),
        }
    }

    /// Replace the identity extractor.
    pub fn identity_extractor(mut self, extractor: Arc<dyn IdentityExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Get the controller holding this layer's counters.
    pub fn controller(&self) -> &AdmissionController<St> {
        &self.controller
    }

    /// Get the enforced policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}

impl<Svc, St> Layer<Svc> for AdmissionLayer<St>
where
    St: CounterStore<String, CounterEntry> + Clone,
{
    type Service = AdmissionService<Svc, St>;

    fn layer(&self, inner: Svc) -> Self::Service {
        AdmissionService {
            inner,
            layer: self.clone(),
        }
    }
}

/// Service produced by [`AdmissionLayer`].
#[derive(Clone)]
pub struct AdmissionService<Svc, St = DefaultStore>
where
    St: CounterStore<String, CounterEntry> + Clone,
{
    inner: Svc,
    layer: AdmissionLayer<St>,
}

impl<Svc, St, ReqBody, ResBody> Service<Request<ReqBody>> for AdmissionService<Svc, St>
where
    Svc: Service<Request<ReqBody>, Response = Response<ResBody>>,
    Svc::Future: Send + 'static,
    St: CounterStore<String, CounterEntry> + Clone,
    ResBody: From<String> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = Svc::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let identity = self.layer.extractor.extract(request.headers());
        let decision = self
            .layer
            .controller
            .check_admission(&identity, &self.layer.policy);

        if decision.is_rejected() {
            let response = too_many_requests(&decision);
            return Box::pin(async move { Ok::<_, Svc::Error>(response) });
        }

        let future = self.inner.call(request);
        Box::pin(async move {
            let mut response = future.await?;
            RateLimitHeaders::from_decision(&decision).apply(response.headers_mut());
            Ok(response)
        })
    }
}
