//! Session state handed over by the identity provider

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::types::{Identity, SessionClaims};
use crate::error::{Error, Result};

/// Capabilities the provider granted to the caller (the provider's `has` check)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities(HashSet<String>);

impl Capabilities {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    /// Whether the caller holds the capability
    pub fn has(&self, key: &str) -> bool {
        self.0.contains(key)
    }
}

/// Session data for one request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// The caller, if one is signed in
    pub user_id: Option<Identity>,

    /// The bearer token forwarded to the record store
    pub token: Option<String>,

    /// `None` when the provider offers no capability check at all
    pub capabilities: Option<Capabilities>,

    /// Session token claims
    pub claims: Option<SessionClaims>,

    /// The expiry timestamp
    pub expires_at: Option<i64>,
}

impl Session {
    /// A session with no signed-in caller
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session for a signed-in caller
    pub fn for_identity(identity: Identity) -> Self {
        Self {
            user_id: Some(identity),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn with_claims(mut self, claims: SessionClaims) -> Self {
        self.claims = Some(claims);
        self
    }

    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// The caller's identity, if any
    pub fn identity(&self) -> Option<&Identity> {
        self.user_id.as_ref()
    }

    /// The caller's identity, or `Unauthorized`
    pub fn require_identity(&self) -> Result<Identity> {
        self.user_id.clone().ok_or(Error::Unauthorized)
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => now_secs() >= expires_at,
            None => false,
        }
    }
}

pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}
