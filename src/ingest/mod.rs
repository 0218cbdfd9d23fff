// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Accepts uploaded CARs: pins them on the cluster, records the upload and
//! accounts for the size of the DAG in the background.

use crate::auth::Authenticated;
use crate::cluster::{AddOptions, ClusterError, PinningCluster};
use crate::db::{ImportCar, PinRecord, StoreError, UploadStore};
use crate::ipld::{CodecRegistry, DEFAULT_MAX_DEPTH, Traversal, dag_size_of_car};
use crate::metrics::{self, values};
use crate::tasks::TaskQueue;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use cid::Cid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Above this size, CARs are added to the receiving cluster peer only.
pub const DEFAULT_LOCAL_ADD_THRESHOLD: u64 = 2_621_440;
/// Partial CARs are chunked at about 10MiB, so anything smaller is probably a
/// complete DAG whose size can be computed.
pub const DEFAULT_DAG_SIZE_CALC_LIMIT: u64 = 9_437_184;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub local_add_threshold: u64,
    pub dag_size_calc_limit: u64,
    pub traversal: Traversal,
    /// Links followed from the root before the size is given up on.
    pub max_depth: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            local_add_threshold: DEFAULT_LOCAL_ADD_THRESHOLD,
            dag_size_calc_limit: DEFAULT_DAG_SIZE_CALC_LIMIT,
            traversal: Traversal::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to add CAR to the cluster: {0}")]
    ClusterAdd(#[source] ClusterError),
    #[error("failed to get pin status: {0}")]
    ClusterStatus(#[source] ClusterError),
    #[error("{0} is not pinning on any node")]
    NoPinningPeers(Cid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct CarIngest {
    cluster: Arc<dyn PinningCluster>,
    store: Arc<dyn UploadStore>,
    codecs: Arc<CodecRegistry>,
    tasks: TaskQueue,
    config: IngestConfig,
}

impl CarIngest {
    pub fn new(
        cluster: Arc<dyn PinningCluster>,
        store: Arc<dyn UploadStore>,
        codecs: Arc<CodecRegistry>,
        tasks: TaskQueue,
        config: IngestConfig,
    ) -> Self {
        Self {
            cluster,
            store,
            codecs,
            tasks,
            config,
        }
    }

    /// Returns the root CID as soon as the upload is recorded. The DAG size,
    /// when it is computed, is recorded later.
    #[tracing::instrument(level = "debug", skip_all, fields(user = caller.user.id, len = car.len()))]
    pub async fn import(
        &self,
        caller: &Authenticated,
        name: Option<String>,
        car: Bytes,
    ) -> Result<Cid, IngestError> {
        let result = self.import_inner(caller, name, car).await;
        let outcome = match &result {
            Ok(_) => values::SUCCESS,
            Err(_) => values::FAILURE,
        };
        metrics::CAR_INGEST_TOTAL.get_or_create(&outcome).inc();
        result
    }

    async fn import_inner(
        &self,
        caller: &Authenticated,
        name: Option<String>,
        car: Bytes,
    ) -> Result<Cid, IngestError> {
        let name = name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(default_upload_name);
        let len = car.len() as u64;

        let options = AddOptions {
            metadata: BTreeMap::from([("size".to_string(), len.to_string())]),
            local: len > self.config.local_add_threshold,
        };
        let cid = self
            .cluster
            .add(car.clone(), options)
            .await
            .map_err(IngestError::ClusterAdd)?;

        let status = self
            .cluster
            .status(&cid)
            .await
            .map_err(IngestError::ClusterStatus)?;
        let pins = status
            .peer_map
            .into_iter()
            .map(|(peer_id, info)| PinRecord {
                peer_id,
                peer_name: info.peer_name,
                status: info.status,
            })
            .collect::<Vec<_>>();
        if pins.is_empty() {
            return Err(IngestError::NoPinningPeers(cid));
        }

        let upload = self
            .store
            .import_car(ImportCar {
                user: caller.user.id,
                auth_token: caller.auth_token.as_ref().map(|token| token.id),
                cid,
                name,
                pins,
            })
            .await?;
        info!(%cid, upload = upload.id, "CAR imported");

        if upload.content.dag_size.is_none() && len < self.config.dag_size_calc_limit {
            self.schedule_dag_size(upload.content.id, car);
        } else {
            debug!(%cid, "skipping DAG size computation");
        }
        Ok(cid)
    }

    fn schedule_dag_size(&self, content: crate::db::Id, car: Bytes) {
        let store = self.store.clone();
        let codecs = self.codecs.clone();
        let IngestConfig {
            traversal,
            max_depth,
            ..
        } = self.config;
        self.tasks.submit("dag-size", async move {
            let computed = tokio::task::spawn_blocking(move || {
                dag_size_of_car(car, &codecs, traversal, max_depth)
            })
            .await?;
            match computed {
                Ok(dag_size) => {
                    store.update_dag_size(content, dag_size).await?;
                    debug!(content, dag_size, "recorded DAG size");
                }
                Err(e) => {
                    metrics::DAG_SIZE_FAILURE.inc();
                    warn!(content, "could not determine DAG size: {e}");
                }
            }
            anyhow::Ok(())
        });
    }
}

/// `Upload at 2021-07-01T12:00:00.000Z`
pub fn default_upload_name() -> String {
    format!(
        "Upload at {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
