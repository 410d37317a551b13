//! Rate limiting middleware using a token bucket per client IP.
//!
//! Policy hooks only: the limits here are coarse service-protection
//! defaults, not a product feature.

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor,
};

/// Rate limiter for the public surface (creation, redirects, alias
/// checks).
///
/// 5 requests per second sustained, bursts of 200. Requests over the
/// limit receive `429 Too Many Requests`. Keys are peer IP addresses.
pub fn layer() -> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>
{
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(200)
            .finish()
            .unwrap(),
    );

    GovernorLayer::new(governor_conf)
}

/// Stricter limiter for mutation-heavy endpoints (bulk delete, webhook
/// tests).
///
/// 1 request per second sustained, bursts of 20.
pub fn strict_layer()
-> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(1)
            .burst_size(20)
            .finish()
            .unwrap(),
    );

    GovernorLayer::new(governor_conf)
}
