//! Subscription plan resolution
//!
//! The plan is recomputed for every request from session data. Sources are
//! tried in a fixed order and the first one that gives a definite answer wins:
//!
//! 1. the provider's capability check (`pro`, then `free`)
//! 2. a `plan` claim on the session token, directly or in its public metadata
//! 3. the provider's user record: no user means [`Plan::Unresolved`], a user
//!    without a metadata plan means [`Plan::Free`]

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::auth::{IdentityProvider, Session};
use crate::config::ClientOptions;
use crate::error::Result;

/// Subscription tier of the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plan {
    Free,
    Pro,
    /// A plan name the provider reported that this crate does not know.
    /// Passed through as-is; it never grants access.
    Other(String),
    /// No authenticated caller could be established
    Unresolved,
}

impl Plan {
    /// Map a plan name reported by the provider
    pub fn from_name(name: &str) -> Self {
        match name {
            "free" => Plan::Free,
            "pro" => Plan::Pro,
            other => Plan::Other(other.to_string()),
        }
    }

    pub fn is_pro(&self) -> bool {
        matches!(self, Plan::Pro)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Pro => write!(f, "pro"),
            Plan::Other(name) => write!(f, "{}", name),
            Plan::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// One source of plan information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStrategy {
    /// The provider's capability check
    Capabilities,
    /// A `plan` claim on the session token
    Claims,
    /// The provider's long-lived user record
    CurrentUser,
}

impl PlanStrategy {
    /// Try this source. `Ok(None)` hands over to the next strategy.
    pub async fn try_resolve(
        &self,
        session: &Session,
        provider: &dyn IdentityProvider,
        options: &ClientOptions,
    ) -> Result<Option<Plan>> {
        match self {
            PlanStrategy::Capabilities => Ok(session.capabilities.as_ref().and_then(|caps| {
                if caps.has(&options.pro_capability) {
                    Some(Plan::Pro)
                } else if caps.has(&options.free_capability) {
                    Some(Plan::Free)
                } else {
                    None
                }
            })),
            PlanStrategy::Claims => Ok(session
                .claims
                .as_ref()
                .and_then(|claims| claims.plan())
                .map(|name| Plan::from_name(&name))),
            PlanStrategy::CurrentUser => match provider.current_user().await? {
                None => Ok(Some(Plan::Unresolved)),
                Some(user) => Ok(Some(
                    user.plan()
                        .map(|name| Plan::from_name(&name))
                        .unwrap_or(Plan::Free),
                )),
            },
        }
    }
}

/// Derives the caller's plan from an ordered list of strategies
#[derive(Debug, Clone)]
pub struct PlanResolver {
    strategies: Vec<PlanStrategy>,
    options: ClientOptions,
}

impl Default for PlanResolver {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl PlanResolver {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            strategies: vec![
                PlanStrategy::Capabilities,
                PlanStrategy::Claims,
                PlanStrategy::CurrentUser,
            ],
            options,
        }
    }

    /// Replace the strategy order
    pub fn with_strategies(mut self, strategies: Vec<PlanStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Resolve the plan for a session. Provider faults are returned, not hidden.
    pub async fn resolve(
        &self,
        session: &Session,
        provider: &dyn IdentityProvider,
    ) -> Result<Plan> {
        for strategy in &self.strategies {
            if let Some(plan) = strategy.try_resolve(session, provider, &self.options).await? {
                debug!(?strategy, %plan, "plan resolved");
                return Ok(plan);
            }
        }
        Ok(Plan::Unresolved)
    }

    /// Fetch the session from the provider and resolve it
    pub async fn resolve_current(&self, provider: &dyn IdentityProvider) -> Result<Plan> {
        let session = provider.session().await?;
        self.resolve(&session, provider).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Capabilities, CurrentUser, Identity, SessionClaims, StaticProvider};
    use crate::error::Error;
    use serde_json::json;

    fn user(id: &str) -> CurrentUser {
        CurrentUser::new(Identity::new(id))
    }

    #[tokio::test]
    async fn capability_check_wins_over_claims() {
        let session = Session::for_identity("u1".into())
            .with_capabilities(Capabilities::new(["pro_plan"]))
            .with_claims(SessionClaims::from(json!({ "plan": "free" })));
        let provider = StaticProvider::new(session, Some(user("u1")));

        let plan = PlanResolver::default().resolve_current(&provider).await.unwrap();
        assert_eq!(plan, Plan::Pro);
    }

    #[tokio::test]
    async fn free_capability() {
        let session = Session::for_identity("u1".into())
            .with_capabilities(Capabilities::new(["free_user"]));
        let provider = StaticProvider::new(session, None);
        let plan = PlanResolver::default().resolve_current(&provider).await.unwrap();
        assert_eq!(plan, Plan::Free);
    }

    #[tokio::test]
    async fn unmatched_capabilities_fall_through_to_claims() {
        let session = Session::for_identity("u1".into())
            .with_capabilities(Capabilities::default())
            .with_claims(SessionClaims::from(json!({ "publicMetadata": { "plan": "pro" } })));
        let provider = StaticProvider::new(session, None);
        let plan = PlanResolver::default().resolve_current(&provider).await.unwrap();
        assert_eq!(plan, Plan::Pro);
    }

    #[tokio::test]
    async fn unknown_claim_plan_passes_through() {
        let session = Session::for_identity("u1".into())
            .with_claims(SessionClaims::from(json!({ "plan": "team" })));
        let provider = StaticProvider::new(session, Some(user("u1")));
        let plan = PlanResolver::default().resolve_current(&provider).await.unwrap();
        assert_eq!(plan, Plan::Other("team".to_string()));
    }

    #[tokio::test]
    async fn zero_claim_plan_falls_through_to_user() {
        let session = Session::for_identity("u1".into())
            .with_claims(SessionClaims::from(json!({ "plan": 0 })));
        let provider = StaticProvider::new(
            session,
            Some(user("u1").with_metadata("plan", json!("pro"))),
        );
        let plan = PlanResolver::default().resolve_current(&provider).await.unwrap();
        assert_eq!(plan, Plan::Pro);
    }

    #[tokio::test]
    async fn user_without_plan_defaults_to_free() {
        let provider = StaticProvider::new(Session::for_identity("u1".into()), Some(user("u1")));
        let plan = PlanResolver::default().resolve_current(&provider).await.unwrap();
        assert_eq!(plan, Plan::Free);
    }

    #[tokio::test]
    async fn user_metadata_plan() {
        let provider = StaticProvider::new(
            Session::for_identity("u1".into()),
            Some(user("u1").with_metadata("plan", json!("pro"))),
        );
        let plan = PlanResolver::default().resolve_current(&provider).await.unwrap();
        assert_eq!(plan, Plan::Pro);
    }

    #[tokio::test]
    async fn no_caller_is_unresolved() {
        let plan = PlanResolver::default()
            .resolve_current(&StaticProvider::anonymous())
            .await
            .unwrap();
        assert_eq!(plan, Plan::Unresolved);
    }

    #[tokio::test]
    async fn provider_fault_propagates() {
        let result = PlanResolver::default()
            .resolve_current(&StaticProvider::failing("provider down"))
            .await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    #[test]
    fn custom_capability_keys() {
        let resolver = PlanResolver::new(ClientOptions::default().with_capabilities("gold", "basic"))
            .with_strategies(vec![PlanStrategy::Capabilities]);
        let session = Session::for_identity("u1".into())
            .with_capabilities(Capabilities::new(["gold"]));
        let provider = StaticProvider::anonymous();
        let plan = tokio_test::block_on(resolver.resolve(&session, &provider)).unwrap();
        assert_eq!(plan, Plan::Pro);
    }
}
