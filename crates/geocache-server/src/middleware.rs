use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::metrics;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Route label for requests no route matched.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Echo the caller's `x-request-id`, or mint a v4 uuid. The value is also
/// stored as a request extension for the trace span.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);
    let id = match req.headers().get(&header) {
        Some(value) => value.clone(),
        None => HeaderValue::from_str(&Uuid::new_v4().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("unknown")),
    };
    req.extensions_mut().insert(id.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(header, id);
    res
}

/// Count and time each request under its route template.
pub async fn http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
        .to_owned();
    let started = Instant::now();

    let res = next.run(req).await;
    metrics::record_http_request(method.as_str(), &route, res.status().as_u16(), started.elapsed());
    res
}
