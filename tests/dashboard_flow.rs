use linkdash::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn context(store: Arc<MemoryStore>, session: Session, user: Option<CurrentUser>) -> RequestContext {
    RequestContext::new(
        store,
        Arc::new(StaticProvider::new(session.clone(), user)),
        &ClientOptions::default(),
        session,
    )
}

fn pro_session(id: &str) -> Session {
    Session::for_identity(Identity::new(id)).with_capabilities(Capabilities::new(["pro_plan"]))
}

#[tokio::test]
async fn test_pro_user_builds_a_dashboard() {
    let store = Arc::new(MemoryStore::new());
    let ctx = context(store.clone(), pro_session("u1"), None);
    let cache = RouteCache::new();
    let dashboard_route = Route::new("/dashboard");

    assert!(ctx.gate.authorize().await);
    let me = ctx.identity().unwrap().clone();
    assert_eq!(ctx.dashboard.load(&me).await.unwrap(), DashboardView::SetupProfile);
    cache.insert(dashboard_route.clone(), "setup".to_string());

    ctx.profiles
        .create(&me, &ProfileForm::new("Ada").with_email("ada@example.com"))
        .await
        .unwrap()
        .apply(&cache);
    assert!(cache.get(&dashboard_route).is_none());

    let mut data = serde_json::Map::new();
    data.insert("links".to_string(), json!(["https://example.com"]));
    let analysis = ctx
        .analyses
        .create(&me, &AnalysisForm::new("Q1 Review").with_data(data))
        .await
        .unwrap()
        .into_inner();

    match ctx.dashboard.load(&me).await.unwrap() {
        DashboardView::Ready { profile, analyses } => {
            assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
            assert_eq!(analyses, vec![analysis]);
        }
        other => panic!("unexpected view: {:?}", other),
    }
}

#[tokio::test]
async fn test_free_user_is_stopped_at_the_gate() {
    let store = Arc::new(MemoryStore::new());
    let user = CurrentUser::new(Identity::new("u2"));
    let ctx = context(store.clone(), Session::for_identity(Identity::new("u2")), Some(user));

    assert_eq!(ctx.gate.check().await, GateDecision::UpgradeRequired(Plan::Free));
    let me = ctx.identity().unwrap().clone();
    assert_eq!(
        ctx.dashboard.load(&me).await.unwrap(),
        DashboardView::UpgradeRequired(Plan::Free)
    );
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_signed_out_caller_is_unauthorized() {
    let store = Arc::new(MemoryStore::new());
    let ctx = context(store.clone(), Session::anonymous(), None);

    assert!(!ctx.gate.authorize().await);
    assert!(matches!(ctx.identity(), Err(Error::Unauthorized)));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_two_users_share_a_store_without_seeing_each_other() {
    let store = Arc::new(MemoryStore::new());
    let a = context(store.clone(), pro_session("user_a"), None);
    let b = context(store.clone(), pro_session("user_b"), None);
    let user_a = a.identity().unwrap().clone();
    let user_b = b.identity().unwrap().clone();

    a.profiles.create(&user_a, &ProfileForm::new("A")).await.unwrap();
    let record = a
        .analyses
        .create(&user_a, &AnalysisForm::new("private"))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(b.dashboard.load(&user_b).await.unwrap(), DashboardView::SetupProfile);
    assert!(b.analyses.get(&user_b, record.id).await.unwrap().is_none());
    b.analyses.delete(&user_b, record.id).await.unwrap();
    assert!(a.analyses.get(&user_a, record.id).await.unwrap().is_some());
}
