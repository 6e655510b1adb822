//! Record store backed by the Supabase PostgREST endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::{Collection, Order, RecordStore, Scope, ID_COLUMN, OWNER_COLUMN};
use crate::config::LinkdashConfig;
use crate::error::{Error, Result, StoreFault};
use crate::fetch::{Fetch, FetchBuilder};

/// `Accept` value that makes PostgREST answer with a single object
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Record store talking to PostgREST over HTTP.
///
/// A store is meant to live for one request: it carries the caller's session
/// token, which the database uses for its own row-level security.
#[derive(Clone)]
pub struct PostgrestStore {
    config: Arc<LinkdashConfig>,
    http_client: Client,
    token: Option<String>,
}

impl PostgrestStore {
    pub fn new(config: Arc<LinkdashConfig>, http_client: Client) -> Self {
        Self {
            config,
            http_client,
            token: None,
        }
    }

    /// Forward the caller's session token
    pub fn with_auth(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self
    }

    fn url(&self, collection: Collection) -> Result<Url> {
        self.config.table_url(collection.table())
    }

    /// Common headers and filters of every request
    fn prepare<'a>(&self, fetch: FetchBuilder<'a>, scope: Option<&Scope>) -> FetchBuilder<'a> {
        let schema = &self.config.options.db_schema;
        let mut fetch = fetch
            .header("apikey", &self.config.anon_key)
            .header("X-Client-Info", "linkdash/0.2.0")
            .header("Accept-Profile", schema)
            .header("Content-Profile", schema)
            .timeout(self.config.options.request_timeout);

        if let Some(token) = &self.token {
            fetch = fetch.bearer_auth(token);
        }

        if let Some(scope) = scope {
            fetch = fetch.query_pair(OWNER_COLUMN, &format!("eq.{}", scope.owner));
            if let Some(id) = scope.id {
                fetch = fetch.query_pair(ID_COLUMN, &format!("eq.{}", id));
            }
        }
        fetch
    }

    async fn single(&self, fetch: FetchBuilder<'_>) -> Result<Value> {
        match fetch.header("Accept", SINGLE_OBJECT).execute().await? {
            Some(value @ Value::Object(_)) => Ok(value),
            // Some PostgREST setups ignore the object Accept header.
            Some(Value::Array(mut rows)) if rows.len() == 1 => Ok(rows.remove(0)),
            _ => Err(Error::Store(StoreFault::no_rows())),
        }
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn select(
        &self,
        collection: Collection,
        scope: &Scope,
        order: Option<Order>,
    ) -> Result<Vec<Value>> {
        debug!(%collection, "GET");
        let url = self.url(collection)?;
        let mut fetch = self
            .prepare(Fetch::get(&self.http_client, &url), Some(scope))
            .query_pair("select", "*");
        if let Some(order) = order {
            fetch = fetch.query_pair("order", &order.as_param());
        }

        match fetch.execute().await? {
            Some(Value::Array(rows)) => Ok(rows),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(Error::Store(StoreFault::raw(format!(
                "expected an array of rows, got {}",
                other
            )))),
        }
    }

    async fn select_single(&self, collection: Collection, scope: &Scope) -> Result<Value> {
        debug!(%collection, "GET single");
        let url = self.url(collection)?;
        let fetch = self
            .prepare(Fetch::get(&self.http_client, &url), Some(scope))
            .query_pair("select", "*");
        self.single(fetch).await
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<Value> {
        debug!(%collection, "POST");
        let url = self.url(collection)?;
        let fetch = self
            .prepare(Fetch::post(&self.http_client, &url), None)
            .header("Prefer", "return=representation")
            .query_pair("select", "*")
            .json(&row)?;
        self.single(fetch).await
    }

    async fn update(&self, collection: Collection, scope: &Scope, patch: Value) -> Result<Value> {
        debug!(%collection, "PATCH");
        let url = self.url(collection)?;
        let fetch = self
            .prepare(Fetch::patch(&self.http_client, &url), Some(scope))
            .header("Prefer", "return=representation")
            .query_pair("select", "*")
            .json(&patch)?;
        self.single(fetch).await
    }

    async fn delete(&self, collection: Collection, scope: &Scope) -> Result<()> {
        debug!(%collection, "DELETE");
        let url = self.url(collection)?;
        self.prepare(Fetch::delete(&self.http_client, &url), Some(scope))
            .header("Prefer", "return=minimal")
            .execute()
            .await?;
        Ok(())
    }
}
