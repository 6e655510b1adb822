//! Types exposed by the identity provider

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque caller identifier issued by the identity provider.
///
/// Never persisted on its own; it is only stamped onto rows as `user_id` and
/// used as the scoping key of every store operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Claims carried by a short-lived session token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionClaims(Map<String, Value>);

impl SessionClaims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Look up a raw claim
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Plan named directly on the claims, or inside their public metadata.
    ///
    /// Empty, `null`, `false` and `0` values do not count as a plan.
    pub fn plan(&self) -> Option<String> {
        truthy_plan(self.0.get("plan")).or_else(|| {
            ["publicMetadata", "public_metadata"]
                .iter()
                .find_map(|key| truthy_plan(self.0.get(*key).and_then(|m| m.get("plan"))))
        })
    }

    /// Public metadata object, under either spelling
    pub fn public_metadata(&self) -> Map<String, Value> {
        ["publicMetadata", "public_metadata"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_object).cloned())
            .unwrap_or_default()
    }
}

impl From<Value> for SessionClaims {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

fn truthy_plan(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// The long-lived user record held by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Identity,

    #[serde(default)]
    pub public_metadata: Map<String, Value>,
}

impl CurrentUser {
    pub fn new(id: Identity) -> Self {
        Self {
            id,
            public_metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.public_metadata.insert(key.to_string(), value);
        self
    }

    /// Plan stored on the user's public metadata. Only an absent or `null`
    /// entry counts as missing.
    pub fn plan(&self) -> Option<String> {
        match self.public_metadata.get("plan")? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn claims_plan_prefers_direct_field() {
        let claims = SessionClaims::from(json!({
            "plan": "pro",
            "publicMetadata": { "plan": "free" }
        }));
        assert_eq!(claims.plan().as_deref(), Some("pro"));
    }

    #[test]
    fn claims_plan_falls_back_to_metadata() {
        let claims = SessionClaims::from(json!({ "public_metadata": { "plan": "enterprise" } }));
        assert_eq!(claims.plan().as_deref(), Some("enterprise"));

        let empty = SessionClaims::from(json!({ "plan": "", "sub": "u1" }));
        assert_eq!(empty.plan(), None);
    }

    #[test]
    fn falsy_claim_plans_are_absent() {
        for plan in [json!(0), json!(0.0), json!(false), json!(null)] {
            let claims = SessionClaims::from(json!({ "plan": plan }));
            assert_eq!(claims.plan(), None, "plan claim {}", plan);
        }
        let numbered = SessionClaims::from(json!({ "plan": 2 }));
        assert_eq!(numbered.plan().as_deref(), Some("2"));
    }

    #[test]
    fn current_user_plan() {
        let user = CurrentUser::new("u1".into());
        assert_eq!(user.plan(), None);
        let user = user.with_metadata("plan", json!("pro"));
        assert_eq!(user.plan().as_deref(), Some("pro"));
    }
}
