//! Linkdash
//!
//! Core of a plan-gated profile and analysis dashboard backed by Supabase.
//! A caller's identity comes from an external [`IdentityProvider`], their
//! subscription plan decides whether the dashboard opens at all, and every
//! record read or written is scoped to the caller.

pub mod actions;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod models;
pub mod plan;
pub mod revalidate;
pub mod store;
pub mod validation;

use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use crate::actions::{AnalysisActions, ProfileActions};
use crate::auth::{Identity, IdentityProvider, Session};
use crate::config::{ClientOptions, LinkdashConfig};
use crate::dashboard::Dashboard;
use crate::error::{Error, Result};
use crate::gate::AccessGate;
use crate::plan::PlanResolver;
use crate::revalidate::Route;
use crate::store::{PostgrestStore, RecordStore, ScopedGateway};

/// The main entry point
pub struct Linkdash {
    config: Arc<LinkdashConfig>,
    http_client: Client,
}

impl Linkdash {
    /// Create a client for a Supabase project
    ///
    /// # Example
    ///
    /// ```
    /// use linkdash::Linkdash;
    ///
    /// let linkdash = Linkdash::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// assert_eq!(linkdash.config().options.db_schema, "public");
    /// ```
    pub fn new(supabase_url: &str, anon_key: &str) -> Result<Self> {
        Ok(Self::from_config(LinkdashConfig::new(supabase_url, anon_key)?))
    }

    /// Create a client with custom options
    pub fn new_with_options(supabase_url: &str, anon_key: &str, options: ClientOptions) -> Result<Self> {
        Ok(Self::from_config(
            LinkdashConfig::new(supabase_url, anon_key)?.with_options(options),
        ))
    }

    /// Create a client from `SUPABASE_URL` and `SUPABASE_ANON_KEY`
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_config(LinkdashConfig::from_env()?))
    }

    pub fn from_config(config: LinkdashConfig) -> Self {
        Self {
            config: Arc::new(config),
            http_client: Client::new(),
        }
    }

    pub fn config(&self) -> &LinkdashConfig {
        &self.config
    }

    /// A PostgREST store carrying the caller's session token
    pub fn store(&self, token: Option<&str>) -> PostgrestStore {
        PostgrestStore::new(self.config.clone(), self.http_client.clone()).with_auth(token)
    }

    /// Consult the provider once and build everything one request needs.
    ///
    /// The session token is forwarded to the store so the database's own
    /// row-level security sees the same caller. An expired session counts as
    /// signed out.
    pub async fn request(&self, provider: Arc<dyn IdentityProvider>) -> Result<RequestContext> {
        let mut session = provider.session().await?;
        if session.is_expired() {
            debug!("session expired; treating caller as anonymous");
            session = Session::anonymous();
        }
        let store = self.store(session.token.as_deref());
        debug!(signed_in = session.identity().is_some(), "request context built");
        Ok(RequestContext::new(
            Arc::new(store),
            provider,
            &self.config.options,
            session,
        ))
    }
}

/// Per-request composition of gate, actions and dashboard
#[derive(Clone)]
pub struct RequestContext {
    identity: Option<Identity>,
    pub gate: AccessGate,
    pub profiles: ProfileActions,
    pub analyses: AnalysisActions,
    pub dashboard: Dashboard,
}

impl RequestContext {
    /// Compose a context over any record store.
    ///
    /// `session` is the one fetched at the request boundary; the gate and the
    /// actions both work from it.
    pub fn new(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn IdentityProvider>,
        options: &ClientOptions,
        session: Session,
    ) -> Self {
        let identity = session.user_id.clone();
        let gateway = ScopedGateway::new(store);
        let route = Route::new(&options.dashboard_route);
        let gate =
            AccessGate::new(provider, PlanResolver::new(options.clone())).with_session(session);
        let profiles = ProfileActions::new(gateway.clone(), route.clone());
        let analyses = AnalysisActions::new(gateway, route);
        let dashboard = Dashboard::new(gate.clone(), profiles.clone(), analyses.clone());
        Self {
            identity,
            gate,
            profiles,
            analyses,
            dashboard,
        }
    }

    /// The signed-in caller, or `Unauthorized`
    pub fn identity(&self) -> Result<&Identity> {
        self.identity.as_ref().ok_or(Error::Unauthorized)
    }
}

/// Re-export of commonly used types
pub mod prelude {
    pub use crate::actions::{AnalysisActions, ProfileActions};
    pub use crate::auth::{
        Capabilities, CurrentUser, Identity, IdentityProvider, JwtProvider, Session,
        SessionClaims, StaticProvider,
    };
    pub use crate::config::{ClientOptions, LinkdashConfig};
    pub use crate::dashboard::{Dashboard, DashboardView};
    pub use crate::error::{Error, Result, StoreFault};
    pub use crate::gate::{AccessGate, GateDecision};
    pub use crate::models::{
        Analysis, AnalysisForm, AnalysisStatus, Profile, ProfileForm,
    };
    pub use crate::plan::{Plan, PlanResolver, PlanStrategy};
    pub use crate::revalidate::{Mutation, Revalidation, Route, RouteCache};
    pub use crate::store::{MemoryStore, PostgrestStore, RecordStore, ScopedGateway};
    pub use crate::{Linkdash, RequestContext};
}
