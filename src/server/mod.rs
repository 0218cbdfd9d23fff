// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! HTTP surface of the gateway.

mod car;
pub mod error;

pub use self::car::{CarCreated, X_NAME};
pub use self::error::{ApiError, ApiResult, ErrorResponse};

use crate::auth::Authenticator;
use crate::gateway::CarProxy;
use crate::health;
use crate::ingest::CarIngest;
use crate::metrics;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use http::header::AUTHORIZATION;
use std::sync::Arc;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use url::Url;

pub struct AppState {
    pub proxy: CarProxy,
    pub ingest: CarIngest,
    pub auth: Authenticator,
    /// Probed by `/healthz`
    pub gateway_url: Url,
    pub cluster_url: Url,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    metrics::init();
    Router::new()
        .route("/car", post(car::post_car).put(car::put_car))
        .route("/car/{cid}", get(car::get_car).head(car::head_car))
        .route("/metrics", get(metrics::collect_prometheus_metrics))
        .route("/healthz", get(health::healthz))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION]))
        .with_state(state)
}
