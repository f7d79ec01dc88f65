//! # rf-auth-simple
//!
//! Static token implementation of `IdentityProvider`.
//! Tokens are configured up front and only their SHA-256 digests are kept,
//! so the plaintext never sits in memory after start-up.

use async_trait::async_trait;
use rf_core::error::Result;
use rf_core::models::Principal;
use rf_core::traits::IdentityProvider;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Default)]
pub struct StaticTokenProvider {
    /// hex(sha256(token)) -> principal
    principals: HashMap<String, Principal>,
}

fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a provider from `(principal, token)` grants. A token listed
    /// twice keeps the last principal.
    pub fn from_grants<I, S>(grants: I) -> Self
    where
        I: IntoIterator<Item = (Principal, S)>,
        S: AsRef<str>,
    {
        let provider = grants
            .into_iter()
            .fold(Self::new(), |p, (principal, token)| p.with_token(principal, token.as_ref()));
        info!(tokens = provider.principals.len(), "static token identities loaded");
        provider
    }

    pub fn with_token(mut self, principal: Principal, token: &str) -> Self {
        self.principals.insert(digest(token), principal);
        self
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn authenticate(&self, token: &str) -> Result<Option<Principal>> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        let principal = self.principals.get(&digest(token)).cloned();
        if principal.is_none() {
            debug!("unknown token presented");
        }
        Ok(principal)
    }
}
