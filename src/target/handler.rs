// src/target/handler.rs
use super::{ReceivedCommand, TargetState};
use hyper::{header, Body, Request, Response};
use std::convert::Infallible;
use tower::Service;

#[derive(Clone)]
pub struct TargetHandler {
    state: TargetState,
}

impl TargetHandler {
    pub fn new(state: TargetState) -> Self {
        Self { state }
    }
}

impl Service<Request<Body>> for TargetHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = self.state.clone();
        let command = ReceivedCommand::from_query(req.uri().query());

        Box::pin(async move {
            tracing::debug!(path = %req.uri().path(), ?command, "target request");
            let page = state.process(command).await;

            let mut response = Response::new(Body::from(page));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("text/html; charset=utf-8"),
            );
            Ok(response)
        })
    }
}
