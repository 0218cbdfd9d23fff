// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::auth::AuthError;
use crate::gateway::ProxyError;
use crate::ingest::IngestError;
use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// For programmatic handling
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("{0}")]
    NotImplemented(&'static str),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(AuthError::Store(_)) => "internal_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotImplemented(_) => "not_implemented",
            Self::Proxy(ProxyError::UpstreamFetch(_)) => "upstream_error",
            Self::Proxy(_) => "internal_error",
            Self::Ingest(IngestError::ClusterAdd(_) | IngestError::ClusterStatus(_)) => {
                "cluster_error"
            }
            Self::Ingest(IngestError::NoPinningPeers(_)) => "not_pinned",
            Self::Ingest(IngestError::Store(_)) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            // the store failing is not the caller's fault
            Self::Unauthorized(AuthError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Proxy(ProxyError::UpstreamFetch(_)) => StatusCode::BAD_GATEWAY,
            Self::Proxy(_) | Self::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match status.is_server_error() {
            true => error!("{self}"),
            false => warn!("{self}"),
        }
        if let Self::NotImplemented(message) = self {
            return (status, message).into_response();
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
