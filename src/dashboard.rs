//! Dashboard loader
//!
//! Composes the access gate with the read actions. The gate always runs
//! first; a denied caller never causes a store call.

use tracing::{debug, error};

use crate::actions::{AnalysisActions, ProfileActions};
use crate::auth::Identity;
use crate::error::{Error, Result};
use crate::gate::{AccessGate, GateDecision};
use crate::models::{Analysis, Profile};
use crate::plan::Plan;

/// What the dashboard should render
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    /// The caller is not on the pro plan
    UpgradeRequired(Plan),
    /// Access granted, but the caller has no profile yet
    SetupProfile,
    Ready {
        profile: Profile,
        analyses: Vec<Analysis>,
    },
    /// The store failed, typically because the tables do not exist yet
    DatabaseSetupRequired { message: String },
}

#[derive(Clone)]
pub struct Dashboard {
    gate: AccessGate,
    profiles: ProfileActions,
    analyses: AnalysisActions,
}

impl Dashboard {
    pub fn new(gate: AccessGate, profiles: ProfileActions, analyses: AnalysisActions) -> Self {
        Self {
            gate,
            profiles,
            analyses,
        }
    }

    /// Load the dashboard for the caller.
    ///
    /// Store faults become [`DashboardView::DatabaseSetupRequired`]. Only an
    /// `Unauthorized` caller surfaces as an error.
    pub async fn load(&self, identity: &Identity) -> Result<DashboardView> {
        if let GateDecision::UpgradeRequired(plan) = self.gate.check().await {
            return Ok(DashboardView::UpgradeRequired(plan));
        }

        match self.load_records(identity).await {
            Ok(view) => Ok(view),
            Err(Error::Unauthorized) => Err(Error::Unauthorized),
            Err(e) => {
                error!(identity = %identity, error = %e, "dashboard data unavailable");
                Ok(DashboardView::DatabaseSetupRequired {
                    message: e.to_string(),
                })
            }
        }
    }

    async fn load_records(&self, identity: &Identity) -> Result<DashboardView> {
        let profile = match self.profiles.get(identity).await? {
            Some(profile) => profile,
            None => {
                debug!(identity = %identity, "no profile yet");
                return Ok(DashboardView::SetupProfile);
            }
        };
        let analyses = self.analyses.list(identity).await?;
        Ok(DashboardView::Ready { profile, analyses })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Capabilities, Session, StaticProvider};
    use crate::error::StoreFault;
    use crate::models::{AnalysisForm, ProfileForm};
    use crate::plan::PlanResolver;
    use crate::revalidate::Route;
    use crate::store::{MemoryStore, ScopedGateway};
    use std::sync::Arc;

    fn dashboard(capability: &str) -> (Arc<MemoryStore>, Dashboard) {
        let store = Arc::new(MemoryStore::new());
        let gateway = ScopedGateway::new(store.clone());
        let route = Route::new("/dashboard");
        let session = Session::for_identity("u1".into())
            .with_capabilities(Capabilities::new([capability]));
        let gate = AccessGate::new(
            Arc::new(StaticProvider::new(session, None)),
            PlanResolver::default(),
        );
        let dashboard = Dashboard::new(
            gate,
            ProfileActions::new(gateway.clone(), route.clone()),
            AnalysisActions::new(gateway, route),
        );
        (store, dashboard)
    }

    #[tokio::test]
    async fn free_plan_sees_upgrade_prompt_without_store_calls() {
        let (store, dashboard) = dashboard("free_user");
        let view = dashboard.load(&Identity::new("u1")).await.unwrap();
        assert_eq!(view, DashboardView::UpgradeRequired(Plan::Free));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn missing_profile_skips_analyses() {
        let (store, dashboard) = dashboard("pro_plan");
        let view = dashboard.load(&Identity::new("u1")).await.unwrap();
        assert_eq!(view, DashboardView::SetupProfile);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn ready_with_profile_and_analyses() {
        let (_, dashboard) = dashboard("pro_plan");
        let me = Identity::new("u1");
        dashboard
            .profiles
            .create(&me, &ProfileForm::new("Ada"))
            .await
            .unwrap();
        dashboard
            .analyses
            .create(&me, &AnalysisForm::new("Q1 Review"))
            .await
            .unwrap();

        match dashboard.load(&me).await.unwrap() {
            DashboardView::Ready { profile, analyses } => {
                assert_eq!(profile.name, "Ada");
                assert_eq!(analyses.len(), 1);
                assert_eq!(analyses[0].title, "Q1 Review");
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn store_fault_asks_for_database_setup() {
        let (store, dashboard) = dashboard("pro_plan");
        store.set_fault(Some(StoreFault::new(
            "42P01",
            "relation \"public.profiles\" does not exist",
        )));

        let view = dashboard.load(&Identity::new("u1")).await.unwrap();
        assert_eq!(
            view,
            DashboardView::DatabaseSetupRequired {
                message: "relation \"public.profiles\" does not exist".to_string()
            }
        );
    }
}
