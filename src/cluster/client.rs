// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    AddOptions, ClusterError, PeerPinInfo, PinStatus, PinStatusReport, PinningCluster,
};
use crate::gateway::CAR_CONTENT_TYPE;
use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Credentials for the cluster REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAuth {
    /// `user:password`
    Basic(String),
    Bearer(String),
}

impl ClusterAuth {
    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Basic(credentials) => match credentials.split_once(':') {
                Some((user, password)) => request.basic_auth(user, Some(password)),
                None => request.basic_auth(credentials, None::<&str>),
            },
            Self::Bearer(token) => request.bearer_auth(token),
        }
    }
}

pub struct ClusterClient {
    client: reqwest::Client,
    endpoint: Url,
    auth: Option<ClusterAuth>,
}

impl ClusterClient {
    pub fn new(client: reqwest::Client, endpoint: Url, auth: Option<ClusterAuth>) -> Self {
        Self {
            client,
            endpoint,
            auth,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClusterError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClusterError::InvalidResponse(format!("{} cannot be a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(auth) => auth.apply(request),
            None => request,
        }
    }
}

#[async_trait]
impl PinningCluster for ClusterClient {
    #[tracing::instrument(level = "debug", skip(self, car), fields(len = car.len()))]
    async fn add(&self, car: Bytes, options: AddOptions) -> Result<Cid, ClusterError> {
        let mut url = self.url(&["add"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("format", "car")
                .append_pair("local", if options.local { "true" } else { "false" })
                .append_pair("stream-channels", "false");
            for (key, value) in &options.metadata {
                query.append_pair(&format!("meta-{key}"), value);
            }
        }
        let part = Part::stream(car)
            .file_name("upload.car")
            .mime_str(CAR_CONTENT_TYPE)?;
        let added: OneOrMany<AddedOutput> = self
            .authorized(self.client.post(url))
            .multipart(Form::new().part("file", part))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let root = match added {
            OneOrMany::One(added) => added,
            OneOrMany::Many(mut added) => added
                .pop()
                .ok_or_else(|| ClusterError::InvalidResponse("empty add response".into()))?,
        };
        Ok(root.cid.parse()?)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn status(&self, cid: &Cid) -> Result<PinStatusReport, ClusterError> {
        let url = self.url(&["pins", &cid.to_string()])?;
        let info: GlobalPinInfo = self
            .authorized(self.client.get(url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(PinStatusReport {
            cid: *cid,
            peer_map: info
                .peer_map
                .into_iter()
                .map(|(peer_id, info)| {
                    (
                        peer_id,
                        PeerPinInfo {
                            peer_name: info.peer_name,
                            status: PinStatus::from_tracker(&info.status),
                        },
                    )
                })
                .collect(),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Cluster versions disagree on whether a CID is a string or a `{"/": ..}`
/// link object.
#[derive(Deserialize)]
#[serde(untagged)]
enum CidRepr {
    Plain(String),
    Link {
        #[serde(rename = "/")]
        link: String,
    },
}

impl CidRepr {
    fn parse(&self) -> Result<Cid, cid::Error> {
        match self {
            Self::Plain(s) | Self::Link { link: s } => s.parse(),
        }
    }
}

#[derive(Deserialize)]
struct AddedOutput {
    cid: CidRepr,
}

#[derive(Deserialize)]
struct GlobalPinInfo {
    #[serde(default)]
    peer_map: BTreeMap<String, PeerInfo>,
}

#[derive(Deserialize)]
struct PeerInfo {
    #[serde(rename = "peername", alias = "peer_name", default)]
    peer_name: String,
    status: String,
}
