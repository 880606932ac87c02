//! # Host Collaborators
//!
//! tabula does not own any content. Entities, users, terms and attachments live
//! in the host application, which also executes queries and persists settings.
//! This module defines the seams through which the engine talks to the host.
//!
//! ## Traits
//!
//! - [`DataSource`]: read access to entities and related records, plus query
//!   execution against a [`QueryDescriptor`]. Required.
//! - [`FieldProvider`]: the field catalogue (what stored fields a scope has and
//!   what type each one is). Optional; when absent, every call site falls back
//!   to raw metadata and the generic field type.
//! - [`SettingsStore`]: a key/value blob store for persisted configurations.
//! - [`TokenVerifier`]: anti-forgery token checks for the admin API.
//!
//! ## Implementations
//!
//! - [`MemoryHost`]: an in-process host with a query executor, loadable from a
//!   JSON fixture. Used by tests and by the CLI.
//! - [`MemSettings`] / [`FsSettings`]: in-memory and file-backed settings stores.
//!
//! Like the rest of the engine, collaborators are single-threaded and take
//! `&self`; implementations use interior mutability where they need it.

mod memory;
mod settings_store;

pub use memory::{HostFixture, MemoryHost};
pub use settings_store::{FsSettings, MemSettings, SettingsStore};

use crate::model::Scope;
use crate::query::{QueryDescriptor, Target};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type EntityId = u64;

/// Metadata key holding the membership plans an entity is restricted to.
pub const PLAN_META_KEY: &str = "_membership_plans";

/// Serialized datetime format used for native timestamps in predicates and fixtures.
pub const STORAGE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub scope: Scope,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub author: Option<u64>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, with = "storage_datetime")]
    pub date: Option<NaiveDateTime>,
    #[serde(default, with = "storage_datetime")]
    pub modified: Option<NaiveDateTime>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub menu_order: i64,
    #[serde(default)]
    pub parent: Option<EntityId>,
    #[serde(default)]
    pub featured_image: Option<u64>,
    #[serde(default)]
    pub permalink: String,
    /// Term ids per taxonomy.
    #[serde(default)]
    pub terms: BTreeMap<String, Vec<u64>>,
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
}

fn default_status() -> String {
    "publish".to_string()
}

impl Entity {
    pub fn new(id: EntityId, scope: impl Into<Scope>, title: impl Into<String>) -> Self {
        Self {
            id,
            scope: scope.into(),
            title: title.into(),
            slug: String::new(),
            author: None,
            status: default_status(),
            date: None,
            modified: None,
            excerpt: String::new(),
            content: String::new(),
            comment_count: 0,
            menu_order: 0,
            parent: None,
            featured_image: None,
            permalink: String::new(),
            terms: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }
}

mod storage_datetime {
    use super::STORAGE_DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => s.serialize_str(&dt.format(STORAGE_DATETIME_FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            Some(s) if !s.trim().is_empty() => {
                NaiveDateTime::parse_from_str(s.trim(), STORAGE_DATETIME_FORMAT)
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}

impl User {
    /// Display name, falling back to the username.
    pub fn name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub taxonomy: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub size_bytes: u64,
    /// Resized renditions keyed by size name ("small", "medium", "large").
    #[serde(default)]
    pub sizes: BTreeMap<String, String>,
}

impl Attachment {
    /// URL of the named rendition, or the original.
    pub fn sized_url(&self, size: &str) -> &str {
        self.sizes.get(size).map(String::as_str).unwrap_or(&self.url)
    }
}

/// A content type the engine can be configured for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeInfo {
    pub scope: Scope,
    pub label: String,
    #[serde(default)]
    pub taxonomies: Vec<String>,
}

/// Where a stored field definition comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    /// Defined by the host's field catalogue for the content type.
    #[default]
    Type,
    /// Contributed by an add-on.
    AddOn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// A stored field as described by the host's field catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Metadata key the value lives under, when it differs from `key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub origin: FieldOrigin,
}

impl FieldDefinition {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            type_name: type_name.into(),
            storage_key: None,
            choices: Vec::new(),
            origin: FieldOrigin::Type,
        }
    }

    pub fn with_choices(mut self, choices: &[(&str, &str)]) -> Self {
        self.choices = choices
            .iter()
            .map(|(value, label)| Choice {
                value: value.to_string(),
                label: label.to_string(),
            })
            .collect();
        self
    }

    pub fn add_on(mut self) -> Self {
        self.origin = FieldOrigin::AddOn;
        self
    }

    pub fn storage_key(&self) -> &str {
        self.storage_key.as_deref().unwrap_or(&self.key)
    }

    pub fn choice_label(&self, value: &str) -> Option<&str> {
        self.choices
            .iter()
            .find(|c| c.value == value)
            .map(|c| c.label.as_str())
    }
}

/// Read access to host content plus query execution.
pub trait DataSource {
    /// Content types eligible for column configuration.
    fn scopes(&self) -> Vec<ScopeInfo>;

    fn entity(&self, id: EntityId) -> Option<Entity>;

    fn user(&self, id: u64) -> Option<User>;

    fn term(&self, id: u64) -> Option<Term>;

    fn attachment(&self, id: u64) -> Option<Attachment>;

    /// Number of entities whose parent is `id`.
    fn child_count(&self, id: EntityId) -> u64;

    /// Metadata keys in use within a scope, for the metadata-only field fallback.
    fn meta_keys(&self, scope: &Scope) -> Vec<String>;

    /// Executes a query, returning matching ids in order.
    fn query(&self, query: &QueryDescriptor) -> Vec<EntityId>;

    /// Distinct raw values of a target within a scope, for filter controls.
    fn distinct_values(&self, scope: &Scope, target: &Target) -> Vec<String>;

    fn scope_info(&self, scope: &Scope) -> Option<ScopeInfo> {
        self.scopes().into_iter().find(|s| &s.scope == scope)
    }
}

/// The host's field catalogue.
pub trait FieldProvider {
    fn fields(&self, scope: &Scope) -> Vec<FieldDefinition>;

    fn field(&self, scope: &Scope, key: &str) -> Option<FieldDefinition> {
        self.fields(scope).into_iter().find(|f| f.key == key)
    }
}

/// Anti-forgery token verification.
pub trait TokenVerifier {
    fn verify(&self, action: &str, token: &str) -> bool;
}

/// Accepts exactly one fixed token for every action.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenVerifier for StaticToken {
    fn verify(&self, _action: &str, token: &str) -> bool {
        !self.0.is_empty() && self.0 == token
    }
}

/// The collaborators a request runs against.
#[derive(Clone, Copy)]
pub struct HostContext<'a> {
    pub data: &'a dyn DataSource,
    pub fields: Option<&'a dyn FieldProvider>,
}

impl<'a> HostContext<'a> {
    pub fn new(data: &'a dyn DataSource) -> Self {
        Self { data, fields: None }
    }

    pub fn with_fields(mut self, fields: &'a dyn FieldProvider) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Parses a JSON-encoded structure stored as a string; other values pass through.
pub fn decode_structured(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                serde_json::from_str(trimmed).unwrap_or_else(|_| value.clone())
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}

/// Flattens a metadata value into the scalar strings a predicate compares against.
///
/// Arrays contribute each scalar element; objects and nulls contribute nothing.
pub fn scalar_strings(value: &Value) -> Vec<String> {
    match decode_structured(value) {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        other => scalar_string(&other).into_iter().collect(),
    }
}

pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_structured_parses_json_strings() {
        assert_eq!(decode_structured(&json!("[1,2]")), json!([1, 2]));
        assert_eq!(decode_structured(&json!("plain")), json!("plain"));
        assert_eq!(decode_structured(&json!("{broken")), json!("{broken"));
    }

    #[test]
    fn scalar_strings_flattens_arrays() {
        assert_eq!(scalar_strings(&json!(["gold", 2, true])), vec!["gold", "2", "1"]);
        assert_eq!(scalar_strings(&json!({"a": 1})), Vec::<String>::new());
        assert_eq!(scalar_strings(&json!("[\"silver\"]")), vec!["silver"]);
    }

    #[test]
    fn entity_deserializes_with_defaults() {
        let entity: Entity = serde_json::from_value(json!({
            "id": 4,
            "scope": "listing",
            "date": "2024-03-01 10:00:00"
        }))
        .unwrap();
        assert_eq!(entity.status, "publish");
        assert_eq!(
            entity.date.map(|d| d.format("%Y-%m-%d").to_string()),
            Some("2024-03-01".to_string())
        );
    }

    #[test]
    fn user_name_falls_back_to_username() {
        let user = User {
            id: 1,
            username: "jo".into(),
            display_name: " ".into(),
            email: String::new(),
        };
        assert_eq!(user.name(), "jo");
    }

    #[test]
    fn static_token_rejects_empty_secret() {
        assert!(!StaticToken(String::new()).verify("save", ""));
        assert!(StaticToken("abc".into()).verify("save", "abc"));
    }
}
