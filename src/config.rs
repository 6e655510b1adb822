//! Configuration options for the dashboard core

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Connection settings for the Supabase project backing the record store
#[derive(Debug, Clone)]
pub struct LinkdashConfig {
    /// The base URL for the Supabase project
    pub url: Url,

    /// The anonymous API key for the Supabase project
    pub anon_key: String,

    /// Client options
    pub options: ClientOptions,
}

impl LinkdashConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(url_str: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url_str)?;
        if anon_key.is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            options: ClientOptions::default(),
        })
    }

    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY` from the environment.
    pub fn from_env() -> Result<Self> {
        let url_str = std::env::var("SUPABASE_URL")
            .map_err(|_| Error::config("SUPABASE_URL environment variable not found"))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;
        Self::new(&url_str, &anon_key)
    }

    /// Replace the client options
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// URL of a table behind the PostgREST endpoint
    pub fn table_url(&self, table: &str) -> Result<Url> {
        let base = self.url.as_str().trim_end_matches('/');
        let rest = self.options.rest_path.trim_matches('/');
        Ok(Url::parse(&format!("{}/{}/{}", base, rest, table))?)
    }
}

/// Configuration options for the dashboard core
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The database schema
    pub db_schema: String,

    /// Path of the PostgREST endpoint below the project URL
    pub rest_path: String,

    /// Capability key the identity provider grants to pro subscribers
    pub pro_capability: String,

    /// Capability key the identity provider grants to free subscribers
    pub free_capability: String,

    /// Route whose rendered state every mutation invalidates
    pub dashboard_route: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            rest_path: "rest/v1".to_string(),
            pro_capability: "pro_plan".to_string(),
            free_capability: "free_user".to_string(),
            dashboard_route: "/dashboard".to_string(),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the PostgREST path
    pub fn with_rest_path(mut self, value: &str) -> Self {
        self.rest_path = value.to_string();
        self
    }

    /// Set the capability keys checked for the pro and free plans
    pub fn with_capabilities(mut self, pro: &str, free: &str) -> Self {
        self.pro_capability = pro.to_string();
        self.free_capability = free.to_string();
        self
    }

    /// Set the dashboard route
    pub fn with_dashboard_route(mut self, value: &str) -> Self {
        self.dashboard_route = value.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_new_valid() {
        let config = LinkdashConfig::new("http://localhost:54321", "anon").unwrap();
        assert_eq!(config.url.as_str(), "http://localhost:54321/");
        assert_eq!(config.anon_key, "anon");
        assert_eq!(config.options.db_schema, "public");
    }

    #[test]
    fn config_new_invalid_url() {
        match LinkdashConfig::new("not a valid url", "anon") {
            Err(Error::Url(_)) => {}
            other => panic!("Expected Url error, got {:?}", other),
        }
    }

    #[test]
    fn config_new_empty_key() {
        match LinkdashConfig::new("http://localhost:54321", "") {
            Err(Error::Config(msg)) => assert!(msg.contains("anon_key cannot be empty")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn table_url_joins_rest_path() {
        let config = LinkdashConfig::new("https://demo.supabase.co/", "anon").unwrap();
        assert_eq!(
            config.table_url("profiles").unwrap().as_str(),
            "https://demo.supabase.co/rest/v1/profiles"
        );
    }

    #[test]
    fn options_builder() {
        let options = ClientOptions::default()
            .with_capabilities("gold", "basic")
            .with_dashboard_route("/app")
            .with_request_timeout(None);
        assert_eq!(options.pro_capability, "gold");
        assert_eq!(options.free_capability, "basic");
        assert_eq!(options.dashboard_route, "/app");
        assert!(options.request_timeout.is_none());
    }
}
