// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::AppState;
use super::error::{ApiError, ApiResult};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::Response;
use bytes::Bytes;
use cid::Cid;
use http::{HeaderMap, Uri, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Optional name of an upload.
pub const X_NAME: &str = "x-name";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarCreated {
    pub cid: String,
}

fn parse_cid(cid: &str) -> ApiResult<Cid> {
    cid.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid CID {cid}: {e}")))
}

#[tracing::instrument(level = "debug", skip(state))]
pub(super) async fn get_car(
    State(state): State<Arc<AppState>>,
    Path(cid): Path<String>,
    uri: Uri,
) -> ApiResult<Response> {
    let cid = parse_cid(&cid)?;
    Ok(state.proxy.get(&uri.to_string(), &cid).await?)
}

#[tracing::instrument(level = "debug", skip(state))]
pub(super) async fn head_car(
    State(state): State<Arc<AppState>>,
    Path(cid): Path<String>,
    uri: Uri,
) -> ApiResult<Response> {
    let cid = parse_cid(&cid)?;
    Ok(state.proxy.head(&uri.to_string(), &cid).await?)
}

#[tracing::instrument(level = "debug", skip_all, fields(len = body.len()))]
pub(super) async fn post_car(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<CarCreated>> {
    let authorization = headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| crate::auth::AuthError::MalformedHeader)?;
    let caller = state.auth.authenticate(authorization).await?;
    let name = headers
        .get(X_NAME)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let cid = state.ingest.import(&caller, name, body).await?;
    Ok(Json(CarCreated {
        cid: cid.to_string(),
    }))
}

pub(super) async fn put_car() -> ApiError {
    ApiError::NotImplemented("PUT /car no can has")
}
