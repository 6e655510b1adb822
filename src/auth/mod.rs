//! Identity context: who the caller is, as reported by the external provider
//!
//! The provider is consulted once at the request boundary. Everything below
//! this module receives an explicit [`Identity`] instead of looking it up.

mod session;
mod types;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};

pub use session::*;
pub use types::*;

/// Interface of the external identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The session of the current request
    async fn session(&self) -> Result<Session>;

    /// The provider's user record for the signed-in caller, if any
    async fn current_user(&self) -> Result<Option<CurrentUser>>;

    /// The caller's identity, if one is signed in
    async fn current_identity(&self) -> Result<Option<Identity>> {
        Ok(self.session().await?.user_id)
    }
}

/// Resolve the caller or fail with `Unauthorized`
pub async fn require_identity(provider: &dyn IdentityProvider) -> Result<Identity> {
    provider
        .current_identity()
        .await?
        .ok_or(Error::Unauthorized)
}

/// Provider that answers with fixed values
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    session: Session,
    user: Option<CurrentUser>,
    fault: Option<String>,
}

impl StaticProvider {
    pub fn new(session: Session, user: Option<CurrentUser>) -> Self {
        Self {
            session,
            user,
            fault: None,
        }
    }

    /// A provider with nobody signed in
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A provider whose every call fails with the given message
    pub fn failing(message: &str) -> Self {
        Self {
            fault: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<()> {
        match &self.fault {
            Some(message) => Err(Error::provider(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticProvider {
    async fn session(&self) -> Result<Session> {
        self.check()?;
        Ok(self.session.clone())
    }

    async fn current_user(&self) -> Result<Option<CurrentUser>> {
        self.check()?;
        Ok(self.user.clone())
    }
}

/// Provider backed by the caller's bearer session token.
///
/// `sub` names the caller, `cap`/`capabilities` carry the capability set and
/// `public_metadata` stands in for the user record. Without a secret the
/// signature is not checked, which only suits tokens already verified upstream.
#[derive(Clone, Default)]
pub struct JwtProvider {
    token: Option<String>,
    secret: Option<Vec<u8>>,
}

impl JwtProvider {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token.map(str::to_string),
            secret: None,
        }
    }

    /// Build from an `Authorization` header value
    pub fn from_authorization_header(value: Option<&str>) -> Self {
        let token = value
            .map(str::trim)
            .and_then(|v| v.strip_prefix("Bearer ").or(Some(v)))
            .map(str::trim)
            .filter(|v| !v.is_empty());
        Self::new(token)
    }

    /// Verify tokens with an HS256 secret
    pub fn with_secret(mut self, secret: &[u8]) -> Self {
        self.secret = Some(secret.to_vec());
        self
    }

    fn decode_claims(&self, token: &str) -> Result<Option<Map<String, Value>>> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let key = match &self.secret {
            Some(secret) => DecodingKey::from_secret(secret),
            None => {
                validation.insecure_disable_signature_validation();
                DecodingKey::from_secret(&[])
            }
        };

        match decode::<Map<String, Value>>(token, &key, &validation) {
            Ok(data) => Ok(Some(data.claims)),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                debug!("session token expired; treating caller as anonymous");
                Ok(None)
            }
            Err(e) => Err(Error::Jwt(e)),
        }
    }

    fn claims(&self) -> Result<Option<Map<String, Value>>> {
        match &self.token {
            Some(token) => self.decode_claims(token),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtProvider {
    async fn session(&self) -> Result<Session> {
        let claims = match self.claims()? {
            Some(claims) => claims,
            None => return Ok(Session::anonymous()),
        };

        let mut session = Session::anonymous();
        session.user_id = claims.get("sub").and_then(Value::as_str).map(Identity::new);
        session.token = self.token.clone();
        session.expires_at = claims.get("exp").and_then(Value::as_i64);
        session.capabilities = ["cap", "capabilities"]
            .iter()
            .find_map(|key| claims.get(*key).and_then(Value::as_array))
            .map(|keys| Capabilities::new(keys.iter().filter_map(Value::as_str)));
        session.claims = Some(SessionClaims::new(claims));
        Ok(session)
    }

    async fn current_user(&self) -> Result<Option<CurrentUser>> {
        let claims = match self.claims()? {
            Some(claims) => SessionClaims::new(claims),
            None => return Ok(None),
        };
        let id = match claims.get("sub").and_then(Value::as_str) {
            Some(sub) => Identity::new(sub),
            None => return Ok(None),
        };
        Ok(Some(CurrentUser {
            id,
            public_metadata: claims.public_metadata(),
        }))
    }
}
