use crate::fields::FieldRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// The content type (or secondary collection, e.g. users) a configuration applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Scope {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthMode {
    #[default]
    Auto,
    Px,
    Percent,
}

impl WidthMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(WidthMode::Auto),
            "px" => Some(WidthMode::Px),
            "percent" | "%" => Some(WidthMode::Percent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Width {
    pub mode: WidthMode,
    pub value: u32,
}

impl Width {
    pub fn px(value: u32) -> Self {
        Self {
            mode: WidthMode::Px,
            value,
        }
    }

    pub fn percent(value: u32) -> Self {
        Self {
            mode: WidthMode::Percent,
            value,
        }
    }

    /// Inline style for the column header. Auto widths and zero values yield "".
    pub fn css(&self) -> String {
        match (self.mode, self.value) {
            (WidthMode::Auto, _) | (_, 0) => String::new(),
            (WidthMode::Px, v) => format!("width:{}px", v),
            (WidthMode::Percent, v) => format!("width:{}%", v),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Type-specific display settings for a column.
///
/// Shape depends on the column's resolved field type; see [`crate::settings`]
/// for the per-type allow-lists enforced on write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplaySettings(BTreeMap<String, Value>);

impl DisplaySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub id: String,
    pub field_key: String,
    pub label: String,
    #[serde(default)]
    pub width: Width,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default, skip_serializing_if = "DisplaySettings::is_empty")]
    pub display_settings: DisplaySettings,
}

impl ColumnDefinition {
    pub fn new(field_key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: new_column_id(),
            field_key: field_key.into(),
            label: label.into(),
            width: Width::default(),
            sortable: false,
            filterable: false,
            display_settings: DisplaySettings::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn with_width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    pub fn with_settings(mut self, settings: DisplaySettings) -> Self {
        self.display_settings = settings;
        self
    }

    pub fn field_ref(&self) -> Option<FieldRef> {
        FieldRef::parse(&self.field_key)
    }
}

/// Generates an opaque, stable column id.
pub fn new_column_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("col_{}", &id[..12])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSort {
    pub column: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<DefaultSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_column: Option<String>,
}

/// Ordered columns plus list-level settings for one scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfiguration {
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub settings: ListSettings,
}

impl ColumnConfiguration {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self {
            columns,
            settings: ListSettings::default(),
        }
    }

    pub fn column(&self, id: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The configured primary column if it exists, otherwise the first column.
    pub fn primary_column_id(&self) -> Option<&str> {
        self.settings
            .primary_column
            .as_deref()
            .filter(|id| self.column(id).is_some())
            .or_else(|| self.columns.first().map(|c| c.id.as_str()))
    }
}
