//! Per-IP rate limiting of login attempts, using tower-governor.

use anyhow::{anyhow, Result};
use axum::{
    extract::{ConnectInfo, Request},
    Router,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorError, GovernorLayer,
};

/// Login attempts per minute per IP
pub const LOGIN_PER_MINUTE: u32 = 10;

/// Extracts the client IP from ConnectInfo.
///
/// Requests without ConnectInfo (in-process router calls) share the loopback
/// bucket.
#[derive(Clone)]
pub struct IpKeyExtractor;

impl KeyExtractor for IpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)))
    }
}

/// Guards every route of `router` with a per-IP limit: a burst of
/// `per_minute` attempts, refilled at `per_minute` per minute.
pub fn with_login_rate_limit<S>(router: Router<S>, per_minute: u32) -> Result<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let per_minute = per_minute.max(1);
    let config = GovernorConfigBuilder::default()
        .key_extractor(IpKeyExtractor)
        .per_millisecond(60_000 / per_minute as u64)
        .burst_size(per_minute)
        .finish()
        .ok_or_else(|| anyhow!("Invalid login rate limit configuration"))?;
    Ok(router.route_layer(GovernorLayer::new(Arc::new(config))))
}
