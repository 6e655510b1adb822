//! In-process record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::schema::{timestamp_now, TableSchema};
use super::{Collection, Order, RecordStore, Scope, SortOrder, OWNER_COLUMN, UPDATED_AT_COLUMN};
use crate::error::{Error, Result, StoreFault, UNIQUE_VIOLATION_CODE};

/// Record store kept in memory.
///
/// Applies the same table definitions as the hosted database: column
/// defaults, not-null and length checks, and the unique owner constraint on
/// profiles. Every call is counted, which lets tests assert that an operation
/// never reached the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Collection, Vec<Value>>>,
    calls: AtomicUsize,
    fault: RwLock<Option<StoreFault>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following call fail with `fault`, or clear it with `None`
    pub fn set_fault(&self, fault: Option<StoreFault>) {
        if let Ok(mut guard) = self.fault.write() {
            *guard = fault;
        }
    }

    /// Number of rows stored in a collection, across all owners
    pub fn len(&self, collection: Collection) -> usize {
        self.tables
            .read()
            .map(|t| t.get(&collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn begin(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fault.read() {
            Ok(guard) => match guard.as_ref() {
                Some(fault) => Err(Error::Store(fault.clone())),
                None => Ok(()),
            },
            Err(_) => Err(poisoned()),
        }
    }
}

fn poisoned() -> Error {
    Error::Store(StoreFault::raw("memory store lock poisoned"))
}

fn unknown_column(table: &str, column: &str) -> StoreFault {
    StoreFault::new(
        "PGRST204",
        format!(
            "Could not find the '{}' column of '{}' in the schema cache",
            column, table
        ),
    )
    .with_status(400)
}

fn check_columns(schema: &TableSchema, row: &Map<String, Value>) -> Result<()> {
    for (name, value) in row {
        let column = schema
            .column(name)
            .ok_or_else(|| unknown_column(schema.table(), name))?;

        if column.not_null && value.is_null() {
            return Err(Error::Store(
                StoreFault::new(
                    "23502",
                    format!(
                        "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                        name,
                        schema.table()
                    ),
                )
                .with_status(400),
            ));
        }

        if let (Some(max_len), Some(text)) = (column.max_len, value.as_str()) {
            if text.chars().count() > max_len {
                return Err(Error::Store(
                    StoreFault::new(
                        "23514",
                        format!(
                            "new row for relation \"{}\" violates check constraint \"{}_{}_check\"",
                            schema.table(),
                            schema.table(),
                            name
                        ),
                    )
                    .with_status(400),
                ));
            }
        }
    }
    Ok(())
}

fn created_at(row: &Value) -> Option<DateTime<Utc>> {
    row.get(super::CREATED_AT_COLUMN)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(
        &self,
        collection: Collection,
        scope: &Scope,
        order: Option<Order>,
    ) -> Result<Vec<Value>> {
        self.begin()?;
        let tables = self.tables.read().map_err(|_| poisoned())?;

        // Newest insert first, so equal timestamps still list newest first.
        let mut rows: Vec<Value> = tables
            .get(&collection)
            .map(|rows| rows.iter().rev().filter(|r| scope.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let ordering = if order.column == super::CREATED_AT_COLUMN {
                    created_at(a).cmp(&created_at(b))
                } else {
                    a.get(order.column)
                        .map(Value::to_string)
                        .cmp(&b.get(order.column).map(Value::to_string))
                };
                match order.direction {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        Ok(rows)
    }

    async fn select_single(&self, collection: Collection, scope: &Scope) -> Result<Value> {
        let mut rows = self.select(collection, scope, None).await?;
        if rows.len() == 1 {
            Ok(rows.remove(0))
        } else {
            Err(Error::Store(StoreFault::no_rows()))
        }
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<Value> {
        self.begin()?;
        let schema = TableSchema::for_collection(collection);
        let mut row = match row {
            Value::Object(map) => map,
            _ => return Err(Error::Store(StoreFault::raw("insert expects a JSON object"))),
        };

        let now = timestamp_now();
        for column in schema.columns {
            if !row.contains_key(column.name) {
                row.insert(column.name.to_string(), column.default.value(&now));
            }
        }
        check_columns(&schema, &row)?;

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let rows = tables.entry(collection).or_default();

        if schema.unique_owner {
            let owner = row.get(OWNER_COLUMN);
            if rows.iter().any(|r| r.get(OWNER_COLUMN) == owner) {
                return Err(Error::Store(
                    StoreFault::new(
                        UNIQUE_VIOLATION_CODE,
                        format!(
                            "duplicate key value violates unique constraint \"{}\"",
                            schema.unique_owner_constraint()
                        ),
                    )
                    .with_status(409),
                ));
            }
        }

        let row = Value::Object(row);
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, collection: Collection, scope: &Scope, patch: Value) -> Result<Value> {
        self.begin()?;
        let schema = TableSchema::for_collection(collection);
        let patch = match patch {
            Value::Object(map) => map,
            _ => return Err(Error::Store(StoreFault::raw("update expects a JSON object"))),
        };
        check_columns(&schema, &patch)?;

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let rows = tables.entry(collection).or_default();

        let mut matching = rows.iter_mut().filter(|r| scope.matches(r));
        let row = match (matching.next(), matching.next()) {
            (Some(row), None) => row,
            _ => return Err(Error::Store(StoreFault::no_rows())),
        };

        if let Value::Object(fields) = row {
            for (key, value) in patch {
                fields.insert(key, value);
            }
            fields.insert(UPDATED_AT_COLUMN.to_string(), timestamp_now());
        }
        Ok(row.clone())
    }

    async fn delete(&self, collection: Collection, scope: &Scope) -> Result<()> {
        self.begin()?;
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if let Some(rows) = tables.get_mut(&collection) {
            rows.retain(|r| !scope.matches(r));
        }
        Ok(())
    }
}
