//! Typed, identity-scoped access to a record store

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Collection, Order, Record, RecordStore, Scope, ID_COLUMN, OWNER_COLUMN};
use crate::auth::Identity;
use crate::error::{Error, Result, StoreFault};

/// Enforces owner scoping on top of a [`RecordStore`].
///
/// Filters are always built from the caller's identity, inserts are stamped
/// with it, and every row that comes back is checked again. This holds even
/// when the backend applies its own row-level security.
#[derive(Clone)]
pub struct ScopedGateway {
    store: Arc<dyn RecordStore>,
}

impl ScopedGateway {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// All of the caller's records, newest first
    pub async fn list<R: Record>(&self, identity: &Identity) -> Result<Vec<R>> {
        debug!(collection = %R::COLLECTION, "select");
        let rows = self
            .store
            .select(R::COLLECTION, &Scope::owner(identity), Some(Order::newest_first()))
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record: R = serde_json::from_value(row)?;
            if record.owner() == identity {
                records.push(record);
            } else {
                warn!(collection = %R::COLLECTION, "dropping row owned by another identity");
            }
        }
        Ok(records)
    }

    /// The caller's record, or `None` when no row matches
    pub async fn get<R: Record>(&self, identity: &Identity, id: Option<Uuid>) -> Result<Option<R>> {
        debug!(collection = %R::COLLECTION, ?id, "select single");
        let scope = Scope {
            owner: identity.clone(),
            id,
        };
        let row = match self.store.select_single(R::COLLECTION, &scope).await {
            Ok(row) => row,
            Err(Error::Store(fault)) if fault.is_no_rows() => return Ok(None),
            Err(e) => return Err(e),
        };

        let record: R = serde_json::from_value(row)?;
        if record.owner() != identity {
            warn!(collection = %R::COLLECTION, "single row owned by another identity");
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Insert a row stamped with the caller's identity
    pub async fn insert<R: Record, P: Serialize>(&self, identity: &Identity, payload: &P) -> Result<R> {
        debug!(collection = %R::COLLECTION, "insert");
        let mut row = to_object(payload)?;
        row.remove(ID_COLUMN);
        row.insert(OWNER_COLUMN.to_string(), Value::String(identity.to_string()));

        let stored = self.store.insert(R::COLLECTION, Value::Object(row)).await?;
        owned_by(serde_json::from_value(stored)?, identity, R::COLLECTION)
    }

    /// Patch the caller's row. The owner column is never part of the patch.
    pub async fn update<R: Record, P: Serialize>(
        &self,
        identity: &Identity,
        id: Option<Uuid>,
        payload: &P,
    ) -> Result<R> {
        debug!(collection = %R::COLLECTION, ?id, "update");
        let mut patch = to_object(payload)?;
        patch.remove(OWNER_COLUMN);
        patch.remove(ID_COLUMN);

        let scope = Scope {
            owner: identity.clone(),
            id,
        };
        let stored = self
            .store
            .update(R::COLLECTION, &scope, Value::Object(patch))
            .await?;
        owned_by(serde_json::from_value(stored)?, identity, R::COLLECTION)
    }

    /// Delete the caller's rows in scope
    pub async fn delete(&self, collection: Collection, identity: &Identity, id: Option<Uuid>) -> Result<()> {
        debug!(%collection, ?id, "delete");
        let scope = Scope {
            owner: identity.clone(),
            id,
        };
        self.store.delete(collection, &scope).await
    }
}

fn to_object<P: Serialize>(payload: &P) -> Result<serde_json::Map<String, Value>> {
    match serde_json::to_value(payload)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Store(StoreFault::raw(format!(
            "expected a JSON object payload, got {}",
            other
        )))),
    }
}

fn owned_by<R: Record>(record: R, identity: &Identity, collection: Collection) -> Result<R> {
    if record.owner() == identity {
        Ok(record)
    } else {
        warn!(%collection, "store returned a row owned by another identity");
        Err(Error::Store(StoreFault::raw(format!(
            "{} row returned for a different owner",
            collection
        ))))
    }
}
