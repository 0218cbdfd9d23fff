// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod endpoints;

pub(crate) use endpoints::healthz;

use axum::response::{IntoResponse, Response};
use http::StatusCode;

/// A failed probe. The body carries the probe messages.
pub(crate) struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string()).into_response()
    }
}
