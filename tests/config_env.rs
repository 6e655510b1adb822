use dotenv::dotenv;
use linkdash::prelude::*;
use std::sync::Arc;

/// Runs against a live project only when `SUPABASE_URL` and
/// `SUPABASE_ANON_KEY` are available (from the environment or a `.env` file).
#[tokio::test]
async fn test_from_env_against_live_project() {
    dotenv().ok();

    let linkdash = match Linkdash::from_env() {
        Ok(linkdash) => linkdash,
        Err(Error::Config(message)) => {
            println!("Skipping live test: {}", message);
            return;
        }
        Err(e) => panic!("invalid configuration: {}", e),
    };

    // Without a session token the gate must refuse, and nothing is read.
    let ctx = linkdash
        .request(Arc::new(StaticProvider::anonymous()))
        .await
        .unwrap();
    assert!(!ctx.gate.authorize().await);
    assert!(matches!(ctx.identity(), Err(Error::Unauthorized)));
}
