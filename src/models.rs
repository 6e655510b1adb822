//! Records and form inputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::Error;
use crate::store::{Collection, Record};

/// One profile per identity. Corresponds to the `profiles` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Identity,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Profile {
    const COLLECTION: Collection = Collection::Profiles;

    fn owner(&self) -> &Identity {
        &self.user_id
    }
}

/// Profile form input
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileForm {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl ProfileForm {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

/// Validated profile columns written on create and update
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfileRow {
    pub name: String,
    pub email: Option<String>,
}

/// Progress of an analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Draft => "draft",
            AnalysisStatus::InProgress => "in-progress",
            AnalysisStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AnalysisStatus::Draft),
            "in-progress" => Ok(AnalysisStatus::InProgress),
            "completed" => Ok(AnalysisStatus::Completed),
            other => Err(Error::validation(
                "status",
                format!("Unknown status: {}", other),
            )),
        }
    }
}

/// Many per identity. Corresponds to the `analyses` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub id: Uuid,
    pub user_id: Identity,
    pub title: String,
    pub description: Option<String>,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Analysis {
    const COLLECTION: Collection = Collection::Analyses;

    fn owner(&self) -> &Identity {
        &self.user_id
    }
}

/// Analysis form input
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisForm {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<AnalysisStatus>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

impl AnalysisForm {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_status(mut self, status: AnalysisStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }
}

/// Validated analysis columns written on create and update
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalysisRow {
    pub title: String,
    pub description: Option<String>,
    pub status: AnalysisStatus,
    pub data: Map<String, Value>,
}
