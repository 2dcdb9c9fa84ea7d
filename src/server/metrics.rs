// src/server/metrics.rs
use crate::metrics::MetricsRegistry;
use hyper::{Body, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;

/// Serves the Prometheus text exposition on a single path.
#[derive(Clone)]
pub struct MetricsHandler {
    registry: Arc<MetricsRegistry>,
    path: Arc<str>,
}

impl MetricsHandler {
    pub fn new(registry: Arc<MetricsRegistry>, path: impl Into<String>) -> Self {
        let path: String = path.into();
        Self {
            registry,
            path: Arc::from(path),
        }
    }

    fn respond(&self, req: &Request<Body>) -> Response<Body> {
        if req.uri().path() != &*self.path {
            return status(StatusCode::NOT_FOUND, "Not Found");
        }

        match self.registry.gather() {
            Ok(metrics) => {
                let mut response = Response::new(Body::from(metrics));
                response.headers_mut().insert(
                    hyper::header::CONTENT_TYPE,
                    hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode metrics");
                status(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics")
            }
        }
    }
}

fn status(code: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = code;
    response
}

impl Service<Request<Body>> for MetricsHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        futures::future::ready(Ok(self.respond(&req)))
    }
}
