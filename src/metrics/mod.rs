// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use axum::{http::StatusCode, response::IntoResponse};
use parking_lot::{RwLock, RwLockWriteGuard};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
};
use std::sync::LazyLock;
use tracing::warn;

static DEFAULT_REGISTRY: LazyLock<RwLock<prometheus_client::registry::Registry>> =
    LazyLock::new(Default::default);

pub fn default_registry<'a>() -> RwLockWriteGuard<'a, prometheus_client::registry::Registry> {
    DEFAULT_REGISTRY.write()
}

pub static CAR_CACHE_HIT: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "car_cache_hit",
        "CAR requests answered from the response cache",
        metric.clone(),
    );
    metric
});
pub static CAR_CACHE_MISS: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "car_cache_miss",
        "CAR requests forwarded to the upstream gateway",
        metric.clone(),
    );
    metric
});
pub static CAR_UPSTREAM_ERROR: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "car_upstream_error",
        "Upstream CAR exports that failed or returned a non-success status",
        metric.clone(),
    );
    metric
});
pub static CAR_INGEST_TOTAL: LazyLock<Family<OutcomeLabel, Counter>> = LazyLock::new(|| {
    let metric = Family::default();
    default_registry().register(
        "car_ingest",
        "CAR uploads by outcome",
        metric.clone(),
    );
    metric
});
pub static DAG_SIZE_FAILURE: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "dag_size_failure",
        "Background DAG size computations that failed",
        metric.clone(),
    );
    metric
});

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabel {
    outcome: &'static str,
}

impl OutcomeLabel {
    pub const fn new(outcome: &'static str) -> Self {
        Self { outcome }
    }
}

pub mod values {
    use super::OutcomeLabel;

    pub const SUCCESS: OutcomeLabel = OutcomeLabel::new("success");
    pub const FAILURE: OutcomeLabel = OutcomeLabel::new("failure");
}

/// Registers every metric so that it is exported before its first update.
pub fn init() {
    LazyLock::force(&CAR_CACHE_HIT);
    LazyLock::force(&CAR_CACHE_MISS);
    LazyLock::force(&CAR_UPSTREAM_ERROR);
    LazyLock::force(&CAR_INGEST_TOTAL);
    LazyLock::force(&DAG_SIZE_FAILURE);
}

pub async fn collect_prometheus_metrics() -> impl IntoResponse {
    let mut metrics = String::new();
    if let Err(e) =
        prometheus_client::encoding::text::encode_registry(&mut metrics, &DEFAULT_REGISTRY.read())
    {
        warn!("failed to encode the default metrics registry: {e}");
    };
    if let Err(e) = prometheus_client::encoding::text::encode_eof(&mut metrics) {
        warn!("failed to encode metrics eof {e}");
    };
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn exports_registered_counters() {
        init();
        CAR_INGEST_TOTAL.get_or_create(&values::SUCCESS).inc();
        let response = collect_prometheus_metrics().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        for name in [
            "car_cache_hit_total",
            "car_cache_miss_total",
            "car_upstream_error_total",
            "dag_size_failure_total",
        ] {
            assert!(text.contains(name), "{name} missing from {text}");
        }
        assert!(text.contains("car_ingest_total{outcome=\"success\"}"));
        assert!(text.ends_with("# EOF\n"));
    }
}
