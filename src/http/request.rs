//! Request preparation for forwarding.
//!
//! # Responsibilities
//! - Rewrite scheme/authority to the loopback target, keep path and query
//! - Strip hop-by-hop headers, append `X-Forwarded-For`
//! - Hold the buffered body so every retry replays identical bytes

use std::net::{IpAddr, SocketAddr};

use axum::body::{Body, Bytes};
use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    request::Parts,
    uri::Scheme,
    Method, Request, Uri,
};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that only describe the client↔proxy hop.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// A fully buffered request addressed to the upstream.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl ForwardRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    /// Build the upstream request from an inbound one.
    pub fn from_parts(
        parts: &Parts,
        target: SocketAddr,
        client: Option<IpAddr>,
        body: Bytes,
    ) -> Result<Self, axum::http::Error> {
        let uri = rewrite_uri(&parts.uri, target)?;

        let mut headers = parts.headers.clone();
        strip_hop_by_hop(&mut headers);
        if let Some(ip) = client {
            append_forwarded_for(&mut headers, ip);
        }

        Ok(Self::new(parts.method.clone(), uri, headers, body))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Materialize a fresh request for one attempt.
    pub fn to_request(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.headers_mut() = self.headers.clone();
        request
    }
}

/// Point `uri` at `http://<target>` keeping path and query.
pub fn rewrite_uri(uri: &Uri, target: SocketAddr) -> Result<Uri, axum::http::Error> {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(target.to_string())
        .path_and_query(path_and_query)
        .build()
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip.to_string(),
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
