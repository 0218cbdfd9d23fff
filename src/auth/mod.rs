// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! API key authentication.
//!
//! API keys are HS256 JWTs whose subject is the issuer of a user. A key is
//! only accepted while the user still has it on record.

use crate::db::{AuthToken, StoreError, UploadStore, User};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    NoAuthHeader,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("user not found")]
    UserNotFound,
    #[error("token not found")]
    TokenNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer of the user the key belongs to.
    pub sub: String,
    pub iss: String,
    /// Milliseconds since the Unix epoch.
    pub iat: i64,
    pub name: String,
}

/// The caller of an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub user: User,
    pub auth_token: Option<AuthToken>,
}

pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    store: Arc<dyn UploadStore>,
}

impl Authenticator {
    pub fn new(secret: &[u8], issuer: impl Into<String>, store: Arc<dyn UploadStore>) -> Self {
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "iss"]);
        validation.set_issuer(&[&issuer]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer,
            store,
        }
    }

    /// Signs a new API key for `user` and records it.
    pub async fn create_key(&self, user: &User, name: &str) -> Result<AuthToken, AuthError> {
        let claims = Claims {
            sub: user.issuer.clone(),
            iss: self.issuer.clone(),
            iat: chrono::Utc::now().timestamp_millis(),
            name: name.into(),
        };
        let secret = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(self.store.create_auth_token(user.id, name, &secret).await?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(decode::<Claims>(token, &self.decoding, &self.validation)?.claims)
    }

    /// Resolves the value of an `Authorization` header to a user and key.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Authenticated, AuthError> {
        let token = parse_authorization_header(header.ok_or(AuthError::NoAuthHeader)?)?;
        let claims = self.verify(token)?;
        let user = self
            .store
            .find_user_by_issuer(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let auth_token = self
            .store
            .find_auth_token(user.id, token)
            .await?
            .ok_or(AuthError::TokenNotFound)?;
        Ok(Authenticated {
            user,
            auth_token: Some(auth_token),
        })
    }
}

/// Extracts the token of a `Bearer <token>` header value.
pub fn parse_authorization_header(value: &str) -> Result<&str, AuthError> {
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::MalformedHeader),
    }
}
