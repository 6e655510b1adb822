//! Subscription gate in front of the dashboard feature

use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{IdentityProvider, Session};
use crate::plan::{Plan, PlanResolver};

/// Outcome of a gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The caller is on the pro plan
    Granted(Plan),
    /// The caller must upgrade; no persistence call may follow
    UpgradeRequired(Plan),
}

impl GateDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, GateDecision::Granted(_))
    }
}

/// Blocks the CRUD actions behind a pro-plan check
#[derive(Clone)]
pub struct AccessGate {
    provider: Arc<dyn IdentityProvider>,
    resolver: PlanResolver,
    session: Option<Session>,
}

impl AccessGate {
    pub fn new(provider: Arc<dyn IdentityProvider>, resolver: PlanResolver) -> Self {
        Self {
            provider,
            resolver,
            session: None,
        }
    }

    /// Decide on a session already fetched at the request boundary instead
    /// of asking the provider again
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Resolve the plan and decide. A provider fault denies access.
    pub async fn check(&self) -> GateDecision {
        let provider = self.provider.as_ref();
        let resolved = match &self.session {
            Some(session) => self.resolver.resolve(session, provider).await,
            None => self.resolver.resolve_current(provider).await,
        };
        match resolved {
            Ok(plan) if plan.is_pro() => GateDecision::Granted(plan),
            Ok(plan) => {
                debug!(%plan, "dashboard access denied");
                GateDecision::UpgradeRequired(plan)
            }
            Err(e) => {
                warn!(error = %e, "plan lookup failed; denying access");
                GateDecision::UpgradeRequired(Plan::Unresolved)
            }
        }
    }

    /// `true` only for the pro plan
    pub async fn authorize(&self) -> bool {
        self.check().await.is_granted()
    }
}
