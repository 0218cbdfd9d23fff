// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
use std::sync::Arc;

use ahash::HashMap;
use axum::extract::{self, Query};
use url::Url;

use super::AppError;
use crate::server::AppState;

/// Query parameter for verbose responses
const VERBOSE_PARAM: &str = "verbose";

/// Maximum duration to wait for a connection to an upstream. Health probes
/// need to be snappy.
const MAX_REQ_DURATION_SECS: u64 = 2;

/// The service is healthy when the gateway it exports CARs from and the
/// cluster it pins to both accept connections.
pub(crate) async fn healthz(
    extract::State(state): extract::State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, AppError> {
    let mut acc = MessageAccumulator::new_with_enabled(params.contains_key(VERBOSE_PARAM));

    let mut healthy = true;
    healthy &= check_reachable("gateway", &state.gateway_url, &mut acc).await;
    healthy &= check_reachable("cluster", &state.cluster_url, &mut acc).await;

    if healthy {
        Ok(acc.result_ok())
    } else {
        Err(AppError(anyhow::anyhow!(acc.result_err())))
    }
}

async fn check_reachable(name: &str, url: &Url, acc: &mut MessageAccumulator) -> bool {
    let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
        acc.push_err(format!("{name} has no address"));
        return false;
    };
    if tokio::time::timeout(
        std::time::Duration::from_secs(MAX_REQ_DURATION_SECS),
        tokio::net::TcpStream::connect((host, port)),
    )
    .await
    .is_ok_and(|connected| connected.is_ok())
    {
        acc.push_ok(format!("{name} reachable"));
        true
    } else {
        acc.push_err(format!("{name} unreachable"));
        false
    }
}

/// Sample message accumulator for healthcheck responses. It is intended to accumulate messages for
/// verbose responses.
struct MessageAccumulator {
    messages: Vec<String>,
    enabled: bool,
}

impl MessageAccumulator {
    fn new_with_enabled(enabled: bool) -> Self {
        Self {
            messages: Vec::new(),
            enabled,
        }
    }

    fn push_ok<S: AsRef<str>>(&mut self, message: S) {
        if self.enabled {
            self.messages.push(format!("[+] {}", message.as_ref()));
        }
    }

    fn push_err<S: AsRef<str>>(&mut self, message: S) {
        if self.enabled {
            self.messages.push(format!("[!] {}", message.as_ref()));
        }
    }

    fn result_ok(&self) -> String {
        if self.enabled {
            self.messages.join("\n")
        } else {
            "OK".to_string()
        }
    }

    fn result_err(&self) -> String {
        if self.enabled {
            self.messages.join("\n")
        } else {
            "ERROR".to_string()
        }
    }
}
