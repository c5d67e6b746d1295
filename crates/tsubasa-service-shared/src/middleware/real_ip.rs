//! Client address resolution behind reverse proxies.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

const TRUE_CLIENT_IP: &str = "true-client-ip";
const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolved address of the client that issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub IpAddr);

impl std::fmt::Display for ClientAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolve the client IP from proxy headers.
///
/// Checks `True-Client-IP`, then `X-Real-IP`, then the first entry of
/// `X-Forwarded-For`. Values that do not parse as an IP address are ignored.
pub fn client_ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    parse_header(headers, TRUE_CLIENT_IP)
        .or_else(|| parse_header(headers, X_REAL_IP))
        .or_else(|| {
            headers
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse().ok())
        })
}

fn parse_header(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Store a [`ClientAddr`] extension for downstream layers.
///
/// Falls back to the socket peer when no proxy header is usable.
pub async fn resolve_client_addr(mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if let Some(ip) = client_ip_from_headers(req.headers()).or(peer) {
        req.extensions_mut().insert(ClientAddr(ip));
    }

    next.run(req).await
}
