//! Client address, honoring `X-Real-Ip` / `X-Forwarded-For` when the listener trusts them.

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

pub const REAL_IP_HEADER: &str = "X-Real-Ip";
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// Remote address of the request, if known. Unix socket connections have none unless
/// a proxy header is trusted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ip) = parts.extensions.get::<ClientIp>() {
            return Ok(ip.clone());
        }
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(ClientIp(peer))
    }
}

/// Address a proxy reported: `X-Real-Ip`, else the last `X-Forwarded-For` hop.
pub fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    if let Some(real) = header(REAL_IP_HEADER) {
        return Some(real.to_string());
    }
    header(FORWARDED_FOR_HEADER)
        .and_then(|list| list.rsplit(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Middleware for network listeners: record the forwarded client address, falling back
/// to the peer address.
pub async fn forwarded_for(mut req: Request, next: Next) -> Response {
    let ip = forwarded_ip(req.headers()).or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    });
    req.extensions_mut().insert(ClientIp(ip));
    next.run(req).await
}
