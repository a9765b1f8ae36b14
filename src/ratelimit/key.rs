//! Client identification for rate-limit bucketing.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::{extract::ConnectInfo, http::Request};

/// Header carrying the original client address behind a proxy.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Identifier used to bucket rate-limit counters per caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    /// Client identified by IP address.
    Ip(IpAddr),
    /// No identifiable origin; all such requests share one bucket.
    Anonymous,
}

impl ClientKey {
    /// Identify the caller of `request`.
    ///
    /// Uses the first `X-Forwarded-For` entry when `trust_forwarded_for` is
    /// set and the header parses, otherwise the peer address recorded by
    /// `into_make_service_with_connect_info`. Falls back to the shared
    /// anonymous bucket.
    pub fn from_request<B>(request: &Request<B>, trust_forwarded_for: bool) -> Self {
        if trust_forwarded_for {
            let forwarded = request
                .headers()
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            if let Some(ip) = forwarded {
                return ClientKey::Ip(ip);
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| ClientKey::Ip(addr.ip()))
            .unwrap_or(ClientKey::Anonymous)
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKey::Ip(ip) => write!(f, "{}", ip),
            ClientKey::Anonymous => write!(f, "anonymous"),
        }
    }
}
