// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Cache-aware proxy for CAR exports of an IPFS HTTP API.

pub mod cache;
mod tee;

pub use self::cache::{CachedResponse, MemoryResponseCache, ResponseCache};
pub use self::tee::CacheTee;

use crate::metrics;
use crate::tasks::TaskQueue;
use crate::utils::io::count_bytes;
use axum::body::Body;
use axum::response::Response;
use cid::Cid;
use http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue,
    InvalidHeaderValue, STRICT_TRANSPORT_SECURITY,
};
use http::HeaderMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const CAR_CONTENT_TYPE: &str = "application/car";
const CACHE_FOREVER: &str = "public, max-age=31536000";
const HSTS: &str = "max-age=31536000; includeSubDomains; preload";
/// Larger responses are streamed through without being cached.
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 32 << 20;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The upstream could not be reached, or its body failed mid-stream.
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(#[from] reqwest::Error),
    #[error("failed to read response body: {0}")]
    Body(#[from] axum::Error),
    #[error(transparent)]
    Header(#[from] InvalidHeaderValue),
}

pub struct CarProxy {
    client: reqwest::Client,
    export_url: Url,
    cache: Arc<dyn ResponseCache>,
    max_entry_bytes: usize,
    tasks: TaskQueue,
}

impl CarProxy {
    /// `gateway` is the base URL of an IPFS HTTP API, e.g. `http://127.0.0.1:5001`.
    pub fn new(
        client: reqwest::Client,
        gateway: &Url,
        cache: Arc<dyn ResponseCache>,
        tasks: TaskQueue,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            export_url: export_endpoint(gateway)?,
            cache,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            tasks,
        })
    }

    pub fn max_entry_bytes(mut self, max_entry_bytes: usize) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    /// Serves the CAR export of `cid`, from the cache when `cache_key` has
    /// been seen before.
    ///
    /// Successful upstream responses are cached once they have been fully
    /// streamed to the caller, unless they are larger than the entry limit.
    /// Non-success upstream responses are returned as they are and never
    /// cached.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get(&self, cache_key: &str, cid: &Cid) -> Result<Response, ProxyError> {
        if let Some(cached) = self.cache.get(cache_key).await {
            metrics::CAR_CACHE_HIT.inc();
            debug!("cache hit");
            return Ok(from_cached(cached));
        }
        metrics::CAR_CACHE_MISS.inc();

        let mut url = self.export_url.clone();
        url.query_pairs_mut()
            .append_pair("arg", &cid.to_string())
            .append_pair("carversion", "1");
        let upstream = self.client.post(url).send().await.inspect_err(|_| {
            metrics::CAR_UPSTREAM_ERROR.inc();
        })?;

        let status = upstream.status();
        if !status.is_success() {
            metrics::CAR_UPSTREAM_ERROR.inc();
            debug!(%status, "passing upstream failure through");
            let headers = upstream.headers().clone();
            let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            return Ok(response);
        }

        let headers = car_headers(cid)?;
        let cache = self.cache.clone();
        let tasks = self.tasks.clone();
        let key = cache_key.to_owned();
        let cached_headers = headers.clone();
        let body = CacheTee::new(upstream.bytes_stream(), self.max_entry_bytes, move |body| {
            tasks.submit("cache-car-response", async move {
                cache
                    .put(
                        key,
                        CachedResponse {
                            status,
                            headers: cached_headers,
                            body,
                        },
                    )
                    .await;
                anyhow::Ok(())
            });
        });

        let mut response = Response::new(Body::from_stream(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// Same as [`CarProxy::get`], but only reports the body length.
    ///
    /// The body is still fetched and drained, so a successful `HEAD` also
    /// fills the cache.
    pub async fn head(&self, cache_key: &str, cid: &Cid) -> Result<Response, ProxyError> {
        let (mut parts, body) = self.get(cache_key, cid).await?.into_parts();
        let length = count_bytes(body.into_data_stream()).await?;
        parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        Ok(Response::from_parts(parts, Body::empty()))
    }
}

fn export_endpoint(gateway: &Url) -> anyhow::Result<Url> {
    let mut url = gateway.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("{gateway} cannot be a base URL"))?
        .pop_if_empty()
        .extend(["api", "v0", "dag", "export"]);
    Ok(url)
}

fn car_headers(cid: &Cid) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CAR_CONTENT_TYPE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_FOREVER));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::try_from(format!("attachment; filename=\"{cid}.car\""))?,
    );
    headers.insert(STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS));
    Ok(headers)
}

fn from_cached(cached: CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body));
    *response.status_mut() = cached.status;
    *response.headers_mut() = cached.headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipld::IPLD_RAW;
    use crate::utils::db::car_stream::CarBlock;
    use axum::Router;
    use axum::body::to_bytes;
    use axum::extract::{Query, State};
    use axum::routing::post;
    use http::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Stands in for the IPFS HTTP API. Every export is `car:<cid>`, except
    /// for CIDs listed in `missing`.
    async fn fake_upstream(missing: Vec<String>) -> (Url, Arc<AtomicUsize>) {
        async fn export(
            State((calls, missing)): State<(Arc<AtomicUsize>, Arc<Vec<String>>)>,
            Query(query): Query<HashMap<String, String>>,
        ) -> Response {
            calls.fetch_add(1, Ordering::SeqCst);
            let arg = query.get("arg").cloned().unwrap_or_default();
            assert_eq!(query.get("carversion").map(String::as_str), Some("1"));
            let mut response = if missing.contains(&arg) {
                let mut response = Response::new(Body::from("merkledag: not found"));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            } else {
                Response::new(Body::from(format!("car:{arg}")))
            };
            response
                .headers_mut()
                .insert("x-upstream", HeaderValue::from_static("kubo"));
            response
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/api/v0/dag/export", post(export))
            .with_state((calls.clone(), Arc::new(missing)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        (Url::parse(&format!("http://{address}")).unwrap(), calls)
    }

    fn proxy(gateway: &Url) -> (CarProxy, TaskQueue) {
        let tasks = TaskQueue::new();
        let cache = Arc::new(MemoryResponseCache::new(16, Duration::from_secs(60)));
        let proxy = CarProxy::new(reqwest::Client::new(), gateway, cache, tasks.clone()).unwrap();
        (proxy, tasks)
    }

    fn some_cid() -> Cid {
        CarBlock::new_sha256(IPLD_RAW, b"exported".to_vec()).cid
    }

    async fn body_of(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let (gateway, calls) = fake_upstream(vec![]).await;
        let (proxy, tasks) = proxy(&gateway);
        let cid = some_cid();
        let key = format!("http://gateway.test/car/{cid}");

        let first = proxy.get(&key, &cid).await.unwrap();
        let first_headers = first.headers().clone();
        let first_body = body_of(first).await;
        tasks.idle().await;

        let second = proxy.get(&key, &cid).await.unwrap();
        assert_eq!(second.headers(), &first_headers);
        assert_eq!(body_of(second).await, first_body);
        assert_eq!(first_body, format!("car:{cid}").as_bytes());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_headers_are_normalized() {
        let (gateway, _) = fake_upstream(vec![]).await;
        let (proxy, _) = proxy(&gateway);
        let cid = some_cid();
        let response = proxy.get("key", &cid).await.unwrap();
        let headers = response.headers();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], "application/car");
        assert_eq!(headers[CACHE_CONTROL], "public, max-age=31536000");
        assert_eq!(
            headers[CONTENT_DISPOSITION],
            format!("attachment; filename=\"{cid}.car\"").as_str()
        );
        assert_eq!(
            headers[STRICT_TRANSPORT_SECURITY],
            "max-age=31536000; includeSubDomains; preload"
        );
        assert!(!headers.contains_key("x-upstream"));
    }

    #[tokio::test]
    async fn upstream_failure_passes_through_uncached() {
        let cid = some_cid();
        let (gateway, calls) = fake_upstream(vec![cid.to_string()]).await;
        let (proxy, tasks) = proxy(&gateway);

        for _ in 0..2 {
            let response = proxy.get("key", &cid).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(response.headers()["x-upstream"], "kubo");
            assert!(!response.headers().contains_key(CACHE_CONTROL));
            assert_eq!(body_of(response).await, b"merkledag: not found");
            tasks.idle().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn head_reports_length_without_body() {
        let (gateway, calls) = fake_upstream(vec![]).await;
        let (proxy, tasks) = proxy(&gateway);
        let cid = some_cid();

        let response = proxy.head("key", &cid).await.unwrap();
        let expected = format!("car:{cid}").len();
        assert_eq!(
            response.headers()[CONTENT_LENGTH],
            expected.to_string().as_str()
        );
        assert_eq!(response.headers()[CONTENT_TYPE], "application/car");
        assert!(body_of(response).await.is_empty());

        tasks.idle().await;
        let response = proxy.get("key", &cid).await.unwrap();
        assert_eq!(body_of(response).await.len(), expected);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn oversized_response_streams_but_is_not_cached() {
        let (gateway, calls) = fake_upstream(vec![]).await;
        let (proxy, tasks) = proxy(&gateway);
        let cid = some_cid();
        let expected = format!("car:{cid}");
        let proxy = proxy.max_entry_bytes(expected.len() - 1);

        for _ in 0..2 {
            let response = proxy.get("key", &cid).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_of(response).await, expected.as_bytes());
            tasks.idle().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_fetch_error() {
        // Bind then drop, so that nothing listens on the port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let gateway = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        drop(listener);
        let (proxy, _) = proxy(&gateway);
        assert!(matches!(
            proxy.get("key", &some_cid()).await,
            Err(ProxyError::UpstreamFetch(_))
        ));
    }

    #[test]
    fn export_endpoint_keeps_base_path() {
        let url = export_endpoint(&Url::parse("http://ipfs.test:5001").unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://ipfs.test:5001/api/v0/dag/export");
        let url = export_endpoint(&Url::parse("http://ipfs.test/proxy/").unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://ipfs.test/proxy/api/v0/dag/export");
    }
}
