// Proxy hook for the backend host.
// Remembers the matched route per exchange, inspects the response body and restores it untouched.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hudsucker::hyper::body::{Body as HttpBody, Bytes};
use hudsucker::hyper::header::{CONTENT_ENCODING, CONTENT_LENGTH, HeaderMap};
use hudsucker::hyper::{Request, Response, StatusCode, Uri};
use hudsucker::{Body, HttpContext, HttpHandler, RequestOrResponse, decode_response};
use tracing::{debug, info, warn};

use crate::extract::Observation;
use crate::pipeline::{Batch, BatchQueue};

use super::routes::{Route, RouteTable};

/// The one host whose TLS traffic is decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptTarget {
    host: String,
    port: u16,
}

impl InterceptTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Whether a CONNECT authority or absolute request URI points at this target.
    pub fn matches(&self, uri: &Uri) -> bool {
        let Some(host) = uri.host() else {
            return false;
        };
        let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
            Some("http") => 80,
            _ => 443,
        });
        host.eq_ignore_ascii_case(&self.host) && port == self.port
    }
}

/// Per-exchange handler. Cloned by the proxy for each request it serves.
#[derive(Clone)]
pub struct InterceptHandler {
    target: Arc<InterceptTarget>,
    routes: Arc<RouteTable>,
    queue: BatchQueue,
    pending: Option<Route>,
}

impl InterceptHandler {
    pub fn new(target: InterceptTarget, routes: RouteTable, queue: BatchQueue) -> Self {
        Self {
            target: Arc::new(target),
            routes: Arc::new(routes),
            queue,
            pending: None,
        }
    }

    /// Record which route, if any, the upcoming response belongs to.
    fn begin(&mut self, uri: &Uri) {
        self.pending = if self.target.matches(uri) {
            self.routes.match_path(uri.path())
        } else {
            None
        };
        if let Some(route) = &self.pending {
            debug!(route = route.name, path = uri.path(), "hooked request");
        }
    }

    /// Inspect the response for the pending route and hand any stations to the queue.
    fn finish(&mut self, res: Response<Body>) -> impl Future<Output = Response<Body>> + Send + use<> {
        let route = self.pending.take();
        let queue = self.queue.clone();
        async move {
            let Some(route) = route else {
                return res;
            };
            let (res, observation) = inspect(route, res).await;
            if let Some(observation) = observation {
                dispatch(&queue, route, observation);
            }
            res
        }
    }
}

impl HttpHandler for InterceptHandler {
    fn should_intercept(
        &mut self,
        _ctx: &HttpContext,
        req: &Request<Body>,
    ) -> impl Future<Output = bool> + Send {
        let intercept = self.target.matches(req.uri());
        async move { intercept }
    }

    fn handle_request(
        &mut self,
        _ctx: &HttpContext,
        req: Request<Body>,
    ) -> impl Future<Output = RequestOrResponse> + Send {
        self.begin(req.uri());
        async move { req.into() }
    }

    fn handle_response(
        &mut self,
        _ctx: &HttpContext,
        res: Response<Body>,
    ) -> impl Future<Output = Response<Body>> + Send {
        self.finish(res)
    }
}

/// Buffer the body, run the route's extractor on it, and rebuild the response
/// from the original head and the same bytes.
///
/// If the upstream body cannot be read, the client gets an empty 502 instead of
/// the original head, whose length no longer matches.
pub async fn inspect<B>(route: Route, res: Response<B>) -> (Response<Body>, Option<Observation>)
where
    B: HttpBody<Data = Bytes>,
    B::Error: Display,
{
    let (parts, body) = res.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(route = route.name, error = %e, "failed to read response body");
            return (bad_gateway(), None);
        }
    };

    let observation = match decoded_copy(&parts.headers, bytes.clone()).await {
        Some(plain) => (route.extract)(&plain),
        None => None,
    };

    (Response::from_parts(parts, Body::from(Full::new(bytes))), observation)
}

fn bad_gateway() -> Response<Body> {
    let mut res = Response::new(Body::from(Full::new(Bytes::new())));
    *res.status_mut() = StatusCode::BAD_GATEWAY;
    res.headers_mut().insert(CONTENT_LENGTH, 0.into());
    res
}

/// Plain-text copy of a possibly content-encoded body.
async fn decoded_copy(headers: &HeaderMap, bytes: Bytes) -> Option<Bytes> {
    let Some(encoding) = headers.get(CONTENT_ENCODING).cloned() else {
        return Some(bytes);
    };

    let mut probe = Response::new(Body::from(Full::new(bytes)));
    probe.headers_mut().insert(CONTENT_ENCODING, encoding);
    let decoded = match decode_response(probe) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "unsupported content encoding");
            return None;
        }
    };

    match decoded.into_body().collect().await {
        Ok(collected) => Some(collected.to_bytes()),
        Err(e) => {
            warn!(error = %e, "failed to decode response body");
            None
        }
    }
}

fn dispatch(queue: &BatchQueue, route: Route, observation: Observation) {
    if observation.is_empty() {
        debug!(route = route.name, "observation without stations");
        return;
    }
    info!(
        route = route.name,
        stores = observation.stores.len(),
        locality = observation.locality.as_deref().unwrap_or("-"),
        "stations observed"
    );
    queue.submit(Batch::from(observation));
}
