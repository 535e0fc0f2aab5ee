//! Rate limiting for the login form using governor and `tower_governor`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor for the client IP.
///
/// Keys on the TCP peer address. With `trust_proxy` set, the first
/// `X-Forwarded-For` hop (then `X-Real-IP`) is used instead; only enable it
/// when a reverse proxy in front of the server overwrites those headers.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor {
    trust_proxy: bool,
}

impl ClientIpKeyExtractor {
    #[must_use]
    pub const fn new(trust_proxy: bool) -> Self {
        Self { trust_proxy }
    }

    fn from_proxy_headers<T>(req: &Request<T>) -> Option<IpAddr> {
        let headers = req.headers();

        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok());

        forwarded.or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let proxied = if self.trust_proxy {
            Self::from_proxy_headers(req)
        } else {
            None
        };

        proxied
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for the login form: ~10 requests per minute per IP.
///
/// Replenishes 1 request every 6 seconds with a burst of 5.
///
/// # Panics
///
/// This function will not panic. `per_second(6)` and `burst_size(5)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn login_rate_limiter(trust_proxy: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trust_proxy))
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/login")
    }

    fn with_peer(mut req: Request<()>, peer: &str) -> Request<()> {
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn test_forwarded_headers_ignored_by_default() {
        let req = request()
            .header("x-forwarded-for", "203.0.113.9")
            .header("x-real-ip", "198.51.100.2")
            .body(())
            .unwrap();
        let req = with_peer(req, "192.0.2.7:51234");

        let ip = ClientIpKeyExtractor::new(false).extract(&req).unwrap();
        assert_eq!(ip, "192.0.2.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_rotating_forwarded_for_keeps_the_same_key() {
        let extractor = ClientIpKeyExtractor::new(false);
        let keys: Vec<IpAddr> = ["203.0.113.1", "203.0.113.2", "203.0.113.3"]
            .into_iter()
            .map(|spoofed| {
                let req = request()
                    .header("x-forwarded-for", spoofed)
                    .body(())
                    .unwrap();
                extractor.extract(&with_peer(req, "192.0.2.7:4000")).unwrap()
            })
            .collect();

        assert!(keys.iter().all(|k| *k == keys[0]));
    }

    #[test]
    fn test_trusted_proxy_uses_first_forwarded_hop() {
        let req = request()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header("x-real-ip", "198.51.100.2")
            .body(())
            .unwrap();
        let req = with_peer(req, "10.0.0.1:443");

        let ip = ClientIpKeyExtractor::new(true).extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_trusted_proxy_without_headers_uses_peer() {
        let req = with_peer(request().body(()).unwrap(), "192.0.2.7:51234");

        let ip = ClientIpKeyExtractor::new(true).extract(&req).unwrap();
        assert_eq!(ip, "192.0.2.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_no_source_is_an_error() {
        let req = request().body(()).unwrap();
        assert!(ClientIpKeyExtractor::new(false).extract(&req).is_err());
    }
}
