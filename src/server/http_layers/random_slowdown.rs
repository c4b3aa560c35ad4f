//! Random slowdown middleware, for exercising the display's polling under lag.
#![cfg(feature = "slowdown")]

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use rand_distr::{Distribution, Normal};

/// Delays the request by a gaussian amount of time, mean 1s, std-dev 2s, clamped at 0.
pub async fn slowdown_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    if let Ok(normal) = Normal::new(1000.0, 2000.0) {
        let v = 0.0f64.max(normal.sample(&mut rand::rng()));
        tokio::time::sleep(std::time::Duration::from_millis(v as u64)).await;
    }
    next.run(request).await
}
