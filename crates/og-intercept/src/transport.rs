// transport.rs — The seam between the host's HTTP client and the interceptor.
//
// The host never has its client patched behind its back. It hands the client
// to `Interceptor::wrap` (or `global::wrap`) and sends through the returned
// `Intercepted<T>`, which implements the same trait as `T`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SendError;
use crate::global;
use crate::guard::{Admission, Guard, Slot};

/// Read access to an outgoing request.
pub trait OutboundRequest {
    fn method(&self) -> &str;
    fn url(&self) -> &str;

    /// Headers exposed to policies as `header_<name>` fields.
    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Read access to a received response.
pub trait InboundResponse {
    fn status(&self) -> u16;
}

/// A blocking request sender.
pub trait Transport: Send + Sync {
    type Request: OutboundRequest;
    type Response: InboundResponse;
    type Error: std::error::Error + Send + Sync + 'static;

    fn send(&self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}

/// An async request sender.
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    type Request: OutboundRequest + Send + 'static;
    type Response: InboundResponse + Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn send_async(&self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}

#[derive(Debug, Clone)]
enum Route {
    /// Enforce whatever the owning interceptor has installed.
    Bound(Slot),
    /// Enforce whichever interceptor is installed process-wide.
    Global,
}

impl Route {
    fn guard(&self) -> Option<Arc<Guard>> {
        match self {
            Route::Bound(slot) => slot
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
            Route::Global => global::active_guard(),
        }
    }
}

/// A transport whose requests pass through policy enforcement.
///
/// Pass-through when no interceptor is installed.
#[derive(Debug, Clone)]
pub struct Intercepted<T> {
    inner: T,
    route: Route,
}

impl<T> Intercepted<T> {
    pub(crate) fn bound(inner: T, slot: Slot) -> Self {
        Self {
            inner,
            route: Route::Bound(slot),
        }
    }

    pub(crate) fn global(inner: T) -> Self {
        Self {
            inner,
            route: Route::Global,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Whether requests sent now would be evaluated.
    pub fn is_active(&self) -> bool {
        self.route.guard().is_some()
    }
}

impl<T: Transport> Transport for Intercepted<T> {
    type Request = T::Request;
    type Response = T::Response;
    type Error = SendError<T::Error>;

    fn send(&self, request: T::Request) -> Result<T::Response, Self::Error> {
        let admission = match self.route.guard() {
            Some(guard) => guard.admit(&request)?,
            None => Admission::Bypass,
        };

        match admission {
            Admission::Bypass => self.inner.send(request).map_err(SendError::Transport),
            Admission::Tracked(dispatch) => match self.inner.send(request) {
                Ok(response) => {
                    dispatch.succeeded(response.status());
                    Ok(response)
                }
                Err(e) => {
                    dispatch.failed(&e);
                    Err(SendError::Transport(e))
                }
            },
        }
    }
}

#[async_trait]
impl<T: AsyncTransport> AsyncTransport for Intercepted<T> {
    type Request = T::Request;
    type Response = T::Response;
    type Error = SendError<T::Error>;

    async fn send_async(&self, request: T::Request) -> Result<T::Response, Self::Error> {
        let admission = match self.route.guard() {
            Some(guard) => guard.admit(&request)?,
            None => Admission::Bypass,
        };

        match admission {
            Admission::Bypass => self
                .inner
                .send_async(request)
                .await
                .map_err(SendError::Transport),
            // If this future is dropped while awaiting, `dispatch` drops with
            // it and records the cancellation.
            Admission::Tracked(dispatch) => match self.inner.send_async(request).await {
                Ok(response) => {
                    dispatch.succeeded(response.status());
                    Ok(response)
                }
                Err(e) => {
                    dispatch.failed(&e);
                    Err(SendError::Transport(e))
                }
            },
        }
    }
}
