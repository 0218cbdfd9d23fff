// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Wires the configured components together and runs the HTTP service.

use crate::auth::Authenticator;
use crate::cli_shared::cli::{Config, StoreBackend, StoreConfig};
use crate::cluster::ClusterClient;
use crate::db::{MemoryDB, UploadStore};
use crate::gateway::{CarProxy, MemoryResponseCache};
use crate::ingest::CarIngest;
use crate::ipld::CodecRegistry;
use crate::server::{AppState, router};
use crate::tasks::TaskQueue;
use crate::utils::net::global_http_client;
use anyhow::Context as _;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub async fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn UploadStore>> {
    match &config.backend {
        StoreBackend::Memory => {
            warn!("uploads are kept in memory and will be lost on restart");
            Ok(Arc::new(MemoryDB::default()))
        }
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite(path) => {
            let db = crate::db::SqliteDB::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            info!("using upload database at {}", path.display());
            Ok(Arc::new(db))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite(_) => anyhow::bail!("built without the `sqlite` feature"),
    }
}

/// Serves until `shutdown` resolves, then lets pending background tasks
/// finish.
pub async fn start(
    config: Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        !config.auth.secret.is_empty(),
        "an API key secret must be configured in the [auth] section"
    );
    let store = open_store(&config.store).await?;
    let tasks = TaskQueue::new();
    let client = global_http_client();

    let state = AppState {
        proxy: CarProxy::new(
            client.clone(),
            &config.gateway.url,
            Arc::new(MemoryResponseCache::new(
                config.cache.capacity,
                config.cache.ttl,
            )),
            tasks.clone(),
        )?
        .max_entry_bytes(config.cache.max_entry_bytes),
        ingest: CarIngest::new(
            Arc::new(ClusterClient::new(
                client,
                config.cluster.url.clone(),
                config.cluster.auth.clone(),
            )),
            store.clone(),
            Arc::new(CodecRegistry::default()),
            tasks.clone(),
            config.ingest,
        ),
        auth: Authenticator::new(
            config.auth.secret.as_bytes(),
            config.auth.issuer.clone(),
            store,
        ),
        gateway_url: config.gateway.url.clone(),
        cluster_url: config.cluster.url.clone(),
    };

    let listener = TcpListener::bind(config.server.listen_address)
        .await
        .with_context(|| format!("binding {}", config.server.listen_address))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        router(Arc::new(state), config.server.max_upload_bytes),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!(
        in_flight = tasks.in_flight(),
        "draining background tasks before exiting"
    );
    tasks.shutdown().await;
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => {
            warn!("cannot listen for shutdown signals: {e}");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refuses_to_start_without_secret() {
        let err = start(Config::default(), std::future::ready(()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("[auth]"), "{err}");
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let mut config = Config::default();
        config.auth.secret = "salt".into();
        config.server.listen_address = "127.0.0.1:0".parse().unwrap();
        start(config, std::future::ready(())).await.unwrap();
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn opens_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Sqlite(dir.path().join("uploads.db")),
        };
        let store = open_store(&config).await.unwrap();
        store.create_user("did:key:alice", "alice").await.unwrap();
        assert!(dir.path().join("uploads.db").exists());
    }
}
