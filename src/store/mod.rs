//! Record store: scoped persistence for profiles and analyses
//!
//! [`RecordStore`] is the raw backend seam (PostgREST over HTTP, or the
//! in-process [`MemoryStore`]). [`ScopedGateway`] sits on top and is the only
//! way the actions reach a store: it derives every filter from the caller's
//! [`Identity`](crate::auth::Identity) and drops rows owned by anyone else.

mod gateway;
mod memory;
mod postgrest;
pub mod schema;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::Result;

pub use gateway::*;
pub use memory::*;
pub use postgrest::*;

/// Column stamped with the owning identity
pub const OWNER_COLUMN: &str = "user_id";

/// Row identifier column
pub const ID_COLUMN: &str = "id";

/// Creation timestamp column
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Last-update timestamp column
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// The record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// One row per identity
    Profiles,
    /// Many rows per identity
    Analyses,
}

impl Collection {
    /// Table name in the store
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::Analyses => "analyses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Row filter of a scoped operation: always the owner, optionally one id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub owner: Identity,
    pub id: Option<Uuid>,
}

impl Scope {
    pub fn owner(owner: &Identity) -> Self {
        Self {
            owner: owner.clone(),
            id: None,
        }
    }

    pub fn record(owner: &Identity, id: Uuid) -> Self {
        Self {
            owner: owner.clone(),
            id: Some(id),
        }
    }

    /// Whether a raw row falls inside this scope
    pub fn matches(&self, row: &Value) -> bool {
        let owner_matches = row.get(OWNER_COLUMN).and_then(Value::as_str) == Some(self.owner.as_str());
        let id_matches = match self.id {
            Some(id) => row
                .get(ID_COLUMN)
                .and_then(Value::as_str)
                .and_then(|s| Uuid::parse_str(s).ok())
                == Some(id),
            None => true,
        };
        owner_matches && id_matches
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Result ordering for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub direction: SortOrder,
}

impl Order {
    /// Newest first
    pub fn newest_first() -> Self {
        Self {
            column: CREATED_AT_COLUMN,
            direction: SortOrder::Descending,
        }
    }

    /// PostgREST `order` parameter value
    pub fn as_param(&self) -> String {
        let direction = match self.direction {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        format!("{}.{}", self.column, direction)
    }
}

/// A typed row of one collection
pub trait Record: DeserializeOwned + Send {
    const COLLECTION: Collection;

    /// The identity stamped on the row
    fn owner(&self) -> &Identity;
}

/// Backend that executes scoped operations on raw JSON rows
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All rows in scope
    async fn select(
        &self,
        collection: Collection,
        scope: &Scope,
        order: Option<Order>,
    ) -> Result<Vec<Value>>;

    /// Exactly one row in scope. Zero rows is a `PGRST116` store fault.
    async fn select_single(&self, collection: Collection, scope: &Scope) -> Result<Value>;

    /// Insert one row and return it as stored
    async fn insert(&self, collection: Collection, row: Value) -> Result<Value>;

    /// Patch the single row in scope and return it. Zero rows is a `PGRST116` store fault.
    async fn update(&self, collection: Collection, scope: &Scope, patch: Value) -> Result<Value>;

    /// Delete every row in scope. Matching nothing is not an error.
    async fn delete(&self, collection: Collection, scope: &Scope) -> Result<()>;
}
