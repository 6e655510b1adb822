//! Table definitions the record store must provide
//!
//! Both tables are owned by `user_id`. `profiles` additionally declares
//! `UNIQUE (user_id)`: the actions do not deduplicate concurrent creates, so
//! this constraint is what keeps a second profile out. [`MemoryStore`] applies
//! the same definitions, and [`TableSchema::migration_sql`] produces the DDL
//! and row-level-security policies for PostgreSQL.
//!
//! [`MemoryStore`]: super::MemoryStore

use chrono::Utc;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use super::{Collection, OWNER_COLUMN};

/// Default a column takes when an insert omits it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    None,
    GeneratedUuid,
    Now,
    Text(&'static str),
    EmptyObject,
}

impl ColumnDefault {
    fn to_sql(self) -> Option<String> {
        match self {
            ColumnDefault::None => None,
            ColumnDefault::GeneratedUuid => Some("gen_random_uuid()".to_string()),
            ColumnDefault::Now => Some("now()".to_string()),
            ColumnDefault::Text(text) => Some(format!("'{}'", text.replace('\'', "''"))),
            ColumnDefault::EmptyObject => Some("'{}'::jsonb".to_string()),
        }
    }

    /// The value an insert receives for an omitted column.
    ///
    /// `now` is the insert's timestamp; every `Now` column of a row shares it.
    pub fn value(self, now: &Value) -> Value {
        match self {
            ColumnDefault::None => Value::Null,
            ColumnDefault::GeneratedUuid => Value::String(Uuid::new_v4().to_string()),
            ColumnDefault::Now => now.clone(),
            ColumnDefault::Text(text) => Value::String(text.to_string()),
            ColumnDefault::EmptyObject => Value::Object(Map::new()),
        }
    }
}

/// The current time as the store renders timestamps
pub fn timestamp_now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub not_null: bool,
    pub default: ColumnDefault,
    /// Maximum length for text columns
    pub max_len: Option<usize>,
}

const fn column(
    name: &'static str,
    sql_type: &'static str,
    not_null: bool,
    default: ColumnDefault,
    max_len: Option<usize>,
) -> Column {
    Column {
        name,
        sql_type,
        not_null,
        default,
        max_len,
    }
}

const PROFILE_COLUMNS: &[Column] = &[
    column("id", "uuid", true, ColumnDefault::GeneratedUuid, None),
    column("user_id", "text", true, ColumnDefault::None, None),
    column("name", "text", true, ColumnDefault::None, Some(100)),
    column("email", "text", false, ColumnDefault::None, Some(100)),
    column("created_at", "timestamptz", true, ColumnDefault::Now, None),
    column("updated_at", "timestamptz", true, ColumnDefault::Now, None),
];

const ANALYSIS_COLUMNS: &[Column] = &[
    column("id", "uuid", true, ColumnDefault::GeneratedUuid, None),
    column("user_id", "text", true, ColumnDefault::None, None),
    column("title", "text", true, ColumnDefault::None, Some(100)),
    column("description", "text", false, ColumnDefault::None, Some(500)),
    column("status", "text", true, ColumnDefault::Text("draft"), None),
    column("data", "jsonb", true, ColumnDefault::EmptyObject, None),
    column("created_at", "timestamptz", true, ColumnDefault::Now, None),
    column("updated_at", "timestamptz", true, ColumnDefault::Now, None),
];

/// Definition of one record table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub collection: Collection,
    pub columns: &'static [Column],
    /// `UNIQUE (user_id)`: at most one row per identity
    pub unique_owner: bool,
}

impl TableSchema {
    pub fn for_collection(collection: Collection) -> Self {
        match collection {
            Collection::Profiles => Self {
                collection,
                columns: PROFILE_COLUMNS,
                unique_owner: true,
            },
            Collection::Analyses => Self {
                collection,
                columns: ANALYSIS_COLUMNS,
                unique_owner: false,
            },
        }
    }

    pub fn table(&self) -> &'static str {
        self.collection.table()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Name PostgreSQL gives the unique owner constraint
    pub fn unique_owner_constraint(&self) -> String {
        format!("{}_{}_key", self.table(), OWNER_COLUMN)
    }

    /// `CREATE TABLE` statement
    pub fn create_table_sql(&self, schema: &str) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut line = format!("  {} {}", c.name, c.sql_type);
                if c.name == "id" {
                    line.push_str(" PRIMARY KEY");
                }
                if c.not_null && c.name != "id" {
                    line.push_str(" NOT NULL");
                }
                if let Some(default) = c.default.to_sql() {
                    line.push_str(&format!(" DEFAULT {}", default));
                }
                if let Some(max_len) = c.max_len {
                    line.push_str(&format!(" CHECK (char_length({}) <= {})", c.name, max_len));
                }
                line
            })
            .collect();

        if self.unique_owner {
            lines.push(format!(
                "  CONSTRAINT {} UNIQUE ({})",
                self.unique_owner_constraint(),
                OWNER_COLUMN
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\".\"{}\" (\n{}\n);",
            schema,
            self.table(),
            lines.join(",\n")
        )
    }

    /// One owner-only policy per command
    pub fn policies(&self) -> Vec<RlsPolicy> {
        let owner_check = format!("(auth.jwt()->>'sub') = {}", OWNER_COLUMN);
        [
            RlsCommand::Select,
            RlsCommand::Insert,
            RlsCommand::Update,
            RlsCommand::Delete,
        ]
        .into_iter()
        .map(|command| {
            let (using, check) = match command {
                RlsCommand::Insert => (None, Some(owner_check.clone())),
                RlsCommand::Update => (Some(owner_check.clone()), Some(owner_check.clone())),
                _ => (Some(owner_check.clone()), None),
            };
            RlsPolicy {
                name: format!("{} own rows {}", self.table(), command.to_string().to_lowercase()),
                table: self.table().to_string(),
                command,
                using,
                check,
                schema: None,
            }
        })
        .collect()
    }

    /// Full migration: table, RLS switch and policies. Policies are dropped
    /// before being created so the script can be rerun.
    pub fn migration_sql(&self, schema: &str) -> String {
        let mut statements = vec![
            self.create_table_sql(schema),
            enable_rls_sql(self.table(), Some(schema)),
        ];
        for mut policy in self.policies() {
            policy.schema = Some(schema.to_string());
            statements.push(policy.drop_policy_sql());
            statements.push(policy.create_policy_sql());
        }
        statements.join("\n")
    }
}

/// Migration for both tables
pub fn migration_sql(schema: &str) -> String {
    [Collection::Profiles, Collection::Analyses]
        .iter()
        .map(|c| TableSchema::for_collection(*c).migration_sql(schema))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Represents the SQL command type for an RLS policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlsCommand {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for RlsCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RlsCommand::Select => write!(f, "SELECT"),
            RlsCommand::Insert => write!(f, "INSERT"),
            RlsCommand::Update => write!(f, "UPDATE"),
            RlsCommand::Delete => write!(f, "DELETE"),
        }
    }
}

/// Role every owner policy applies to
pub const POLICY_ROLE: &str = "authenticated";

/// A row-level-security policy on one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RlsPolicy {
    pub name: String,
    pub table: String,
    pub command: RlsCommand,
    /// `USING` expression: which existing rows are visible or modifiable
    pub using: Option<String>,
    /// `WITH CHECK` expression: which new rows are accepted
    pub check: Option<String>,
    /// Defaults to "public" if None
    pub schema: Option<String>,
}

impl RlsPolicy {
    /// Generates the `CREATE POLICY` SQL statement.
    pub fn create_policy_sql(&self) -> String {
        let schema = self.schema.as_deref().unwrap_or("public");
        let using = self
            .using
            .as_ref()
            .map_or(String::new(), |u| format!(" USING ({})", u));
        let check = self
            .check
            .as_ref()
            .map_or(String::new(), |c| format!(" WITH CHECK ({})", c));
        format!(
            "CREATE POLICY \"{}\" ON \"{}\".\"{}\" FOR {} TO {}{}{};",
            self.name, schema, self.table, self.command, POLICY_ROLE, using, check
        )
    }

    /// Generates the `DROP POLICY` SQL statement.
    pub fn drop_policy_sql(&self) -> String {
        let schema = self.schema.as_deref().unwrap_or("public");
        format!(
            "DROP POLICY IF EXISTS \"{}\" ON \"{}\".\"{}\";",
            self.name, schema, self.table
        )
    }
}

/// Generates the SQL statement to enable RLS on a table.
pub fn enable_rls_sql(table: &str, schema: Option<&str>) -> String {
    format!(
        "ALTER TABLE \"{}\".\"{}\" ENABLE ROW LEVEL SECURITY;",
        schema.unwrap_or("public"),
        table
    )
}
