// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::auth::Authenticator;
use crate::cli_shared::cli::{Config, StoreBackend};
use crate::daemon::open_store;
use clap::Subcommand;
use std::io::Write;
use tracing::{info, warn};

#[derive(Debug, Subcommand)]
pub enum AuthCommands {
    /// Create an API key, creating its user first if needed. Prints the key.
    NewKey {
        /// Issuer identifying the user, e.g. a DID
        #[arg(long)]
        issuer: String,
        /// Name given to a new user. Defaults to the issuer
        #[arg(long)]
        user_name: Option<String>,
        /// Name of the key
        #[arg(long, default_value = "default")]
        name: String,
    },
}

impl AuthCommands {
    pub async fn run(self, config: &Config, out: &mut impl Write) -> anyhow::Result<()> {
        match self {
            Self::NewKey {
                issuer,
                user_name,
                name,
            } => {
                anyhow::ensure!(
                    !config.auth.secret.is_empty(),
                    "an API key secret must be configured in the [auth] section"
                );
                if config.store.backend == StoreBackend::Memory {
                    warn!("the key is stored in memory and will not be usable by `serve`");
                }
                let store = open_store(&config.store).await?;
                let user = match store.find_user_by_issuer(&issuer).await? {
                    Some(user) => user,
                    None => {
                        let user = store
                            .create_user(&issuer, user_name.as_deref().unwrap_or(&issuer))
                            .await?;
                        info!(user = user.id, "created user {issuer}");
                        user
                    }
                };
                let auth = Authenticator::new(
                    config.auth.secret.as_bytes(),
                    config.auth.issuer.clone(),
                    store,
                );
                let key = auth.create_key(&user, &name).await?;
                writeln!(out, "{}", key.secret)?;
                Ok(())
            }
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_keys_authenticate_against_the_same_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.auth.secret = "salt".into();
        config.store.backend = StoreBackend::Sqlite(dir.path().join("uploads.db"));

        let mut keys = vec![];
        for name in ["laptop", "ci"] {
            let mut out = vec![];
            AuthCommands::NewKey {
                issuer: "did:key:alice".into(),
                user_name: None,
                name: name.into(),
            }
            .run(&config, &mut out)
            .await
            .unwrap();
            keys.push(String::from_utf8(out).unwrap().trim().to_string());
        }

        let store = open_store(&config.store).await.unwrap();
        let auth = Authenticator::new(b"salt", config.auth.issuer.clone(), store);
        for key in keys {
            let caller = auth
                .authenticate(Some(&format!("Bearer {key}")))
                .await
                .unwrap();
            assert_eq!(caller.user.issuer, "did:key:alice");
        }
    }
}
