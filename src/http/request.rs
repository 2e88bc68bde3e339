//! Request inspection helpers shared by the pipeline stages.
//!
//! # Responsibilities
//! - Resolve the client address, trusting forwarding headers only from the
//!   configured proxy origin
//! - Carry the authenticated identity set by route collaborators
//! - Name the request ID header
//!
//! # Design Decisions
//! - Without a trusted peer, `X-Forwarded-For` is ignored entirely
//! - The forwarded chain is walked right to left, skipping trusted hops

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use axum::{extract::ConnectInfo, http::Request};
use url::{Host, Url};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Identity placeholder used when no collaborator authenticated the caller.
pub const GUEST_IDENTITY: &str = "Not Authenticated Guest";

/// Identity established by an authentication collaborator.
///
/// Inserted into request extensions by anything running ahead of the rate
/// limiter, or into response extensions by a handler so the logger can
/// report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

/// Resolves the client network address of a request.
#[derive(Debug, Clone, Default)]
pub struct ClientAddrResolver {
    trusted_proxies: Vec<IpAddr>,
}

impl ClientAddrResolver {
    pub fn new(trusted_proxies: Vec<IpAddr>) -> Self {
        Self { trusted_proxies }
    }

    /// Trust the host of the service's external base URL.
    ///
    /// Only IP literals and `localhost` can be trusted; other host names are
    /// logged and ignored.
    pub fn from_origin(origin: &str) -> Self {
        let trusted = match Url::parse(origin).ok().and_then(|u| u.host().map(|h| h.to_owned())) {
            Some(Host::Ipv4(ip)) => vec![IpAddr::V4(ip)],
            Some(Host::Ipv6(ip)) => vec![IpAddr::V6(ip)],
            Some(Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
                vec![IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)]
            }
            Some(Host::Domain(domain)) => {
                tracing::warn!(
                    origin = %origin,
                    host = %domain,
                    "Trusted proxy origin is not an IP address; forwarding headers will be ignored"
                );
                Vec::new()
            }
            None => Vec::new(),
        };
        Self::new(trusted)
    }

    pub fn trusted_proxies(&self) -> &[IpAddr] {
        &self.trusted_proxies
    }

    fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.trusted_proxies.contains(ip)
    }

    /// Client IP as a string; `"unknown"` when the peer address is unavailable.
    pub fn resolve<B>(&self, req: &Request<B>) -> String {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let Some(peer) = peer else {
            return "unknown".to_string();
        };

        if !self.is_trusted(&peer) {
            return peer.to_string();
        }

        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|chain| {
                chain
                    .rsplit(',')
                    .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
                    .find(|ip| !self.is_trusted(ip))
            });
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        req.headers()
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
            .unwrap_or(peer)
            .to_string()
    }
}
