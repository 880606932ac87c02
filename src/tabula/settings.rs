//! # Display Setting Schemas
//!
//! Each field type (and each host attribute) accepts a fixed set of display
//! settings. The schema for a target lists every allowed key, what values it
//! takes, and the default used when a value is missing or invalid.
//!
//! Schemas are used twice:
//! - On write, [`sanitize`] rebuilds a settings map from untrusted JSON,
//!   keeping only allowed keys and replacing invalid values with defaults.
//! - On read, [`SettingsView`] resolves a setting against the same schema, so
//!   a formatter always sees a legal value even when handed raw settings.
//!
//! The `display` key, where present, selects the display variant. Its first
//! choice is the default and should be the most common rendering.

use crate::fields::{Computed, FieldKind, NativeAttr};
use crate::model::DisplaySettings;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// One of a closed set of names. The first is the default.
    Choice(&'static [&'static str]),
    Integer { min: u64, max: u64, default: u64 },
    Flag { default: bool },
    Text { max_len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingSpec {
    pub key: &'static str,
    pub kind: SettingKind,
}

impl SettingSpec {
    const fn choice(key: &'static str, choices: &'static [&'static str]) -> Self {
        Self {
            key,
            kind: SettingKind::Choice(choices),
        }
    }

    const fn integer(key: &'static str, min: u64, max: u64, default: u64) -> Self {
        Self {
            key,
            kind: SettingKind::Integer { min, max, default },
        }
    }

    const fn flag(key: &'static str, default: bool) -> Self {
        Self {
            key,
            kind: SettingKind::Flag { default },
        }
    }

    const fn text(key: &'static str, max_len: usize) -> Self {
        Self {
            key,
            kind: SettingKind::Text { max_len },
        }
    }

    /// The default value as JSON.
    pub fn default_value(&self) -> Value {
        match self.kind {
            SettingKind::Choice(choices) => Value::from(choices.first().copied().unwrap_or("")),
            SettingKind::Integer { default, .. } => Value::from(default),
            SettingKind::Flag { default } => Value::from(default),
            SettingKind::Text { .. } => Value::from(""),
        }
    }

    /// Validates one raw value; `None` means "invalid, use the default".
    fn validate(&self, raw: &Value) -> Option<Value> {
        match self.kind {
            SettingKind::Choice(choices) => {
                let s = raw.as_str()?.trim();
                choices.contains(&s).then(|| Value::from(s))
            }
            SettingKind::Integer { min, max, .. } => {
                let n = coerce_integer(raw)?;
                Some(Value::from(n.clamp(min, max)))
            }
            SettingKind::Flag { .. } => coerce_flag(raw).map(Value::from),
            SettingKind::Text { max_len } => {
                let s = match raw {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| !c.is_control())
                    .take(max_len)
                    .collect();
                Some(Value::from(cleaned))
            }
        }
    }
}

/// Coerces a JSON value into a non-negative integer.
///
/// Accepts integers, floats (truncated) and numeric strings. Negative numbers
/// become zero.
pub fn coerce_integer(raw: &Value) -> Option<u64> {
    match raw {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u)
            } else if let Some(i) = n.as_i64() {
                Some(i.max(0) as u64)
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| f.max(0.0) as u64)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(u) = s.parse::<u64>() {
                Some(u)
            } else if let Ok(i) = s.parse::<i64>() {
                Some(i.max(0) as u64)
            } else {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.max(0.0) as u64)
            }
        }
        _ => None,
    }
}

/// Coerces a JSON value into a boolean. Accepts booleans, 0/1 and common strings.
pub fn coerce_flag(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// What a schema is looked up for.
#[derive(Debug, Clone, Copy)]
pub enum SchemaTarget<'a> {
    Kind(FieldKind),
    Native(&'a NativeAttr),
    Computed(Computed),
}

const TRUNCATE: SettingSpec = SettingSpec::integer("truncate", 0, 2000, 60);
const WORDS: SettingSpec = SettingSpec::integer("words", 1, 500, 20);
const MAX_ITEMS_3: SettingSpec = SettingSpec::integer("max_items", 1, 50, 3);
const MAX_ITEMS_5: SettingSpec = SettingSpec::integer("max_items", 1, 50, 5);
const DATE_GRANULARITY: &[&str] = &["exact", "datetime", "relative"];

const TEXT: &[SettingSpec] = &[TRUNCATE];
const LONG_TEXT: &[SettingSpec] = &[
    SettingSpec::choice("display", &["excerpt", "full", "word_count"]),
    WORDS,
];
const NUMBER: &[SettingSpec] = &[
    SettingSpec::choice("display", &["plain", "formatted", "currency"]),
    SettingSpec::integer("decimals", 0, 6, 0),
    SettingSpec::text("prefix", 16),
    SettingSpec::text("suffix", 16),
];
const EMAIL: &[SettingSpec] = &[SettingSpec::choice("display", &["link", "text"])];
const URL: &[SettingSpec] = &[SettingSpec::choice("display", &["link", "domain", "text"])];
const PHONE: &[SettingSpec] = &[SettingSpec::choice("display", &["link", "text"])];
const PASSWORD: &[SettingSpec] = &[SettingSpec::choice("display", &["masked", "length"])];
const OEMBED: &[SettingSpec] = &[SettingSpec::choice("display", &["link", "provider"])];
const LINK: &[SettingSpec] = &[
    SettingSpec::choice("display", &["title", "url", "both"]),
    SettingSpec::flag("new_tab", false),
];
const COLOR: &[SettingSpec] = &[SettingSpec::choice("display", &["swatch", "hex", "both"])];
const TRUE_FALSE: &[SettingSpec] = &[SettingSpec::choice("display", &["icon", "yes_no", "on_off"])];
const CHOICE: &[SettingSpec] = &[SettingSpec::choice("display", &["label", "value", "badge"])];
const MULTI_CHOICE: &[SettingSpec] = &[
    SettingSpec::choice("display", &["label", "value", "badge"]),
    MAX_ITEMS_5,
];
const IMAGE: &[SettingSpec] = &[
    SettingSpec::choice("display", &["thumbnail", "filename", "url"]),
    SettingSpec::choice("size", &["small", "medium", "large"]),
];
const FILE: &[SettingSpec] = &[SettingSpec::choice("display", &["filename", "link", "size"])];
const GALLERY: &[SettingSpec] = &[
    SettingSpec::choice("display", &["count", "thumbnails"]),
    SettingSpec::integer("max_items", 1, 50, 4),
];
const DATE: &[SettingSpec] = &[SettingSpec::choice("date_format", DATE_GRANULARITY)];
const DATE_TIME: &[SettingSpec] = &[SettingSpec::choice(
    "date_format",
    &["datetime", "exact", "relative"],
)];
const TIME: &[SettingSpec] = &[SettingSpec::choice("display", &["24h", "12h"])];
const LOCATION: &[SettingSpec] =
    &[SettingSpec::choice("display", &["address", "coordinates", "both"])];
const RECURRING: &[SettingSpec] = &[SettingSpec::choice("display", &["next", "summary"])];
const PRICING: &[SettingSpec] =
    &[SettingSpec::choice("display", &["single", "range", "discounted"])];
const RELATION: &[SettingSpec] = &[
    SettingSpec::choice("display", &["titles", "links", "count"]),
    MAX_ITEMS_3,
];
const TAXONOMY: &[SettingSpec] = &[
    SettingSpec::choice("display", &["names", "links", "count"]),
    MAX_ITEMS_5,
];
const USER: &[SettingSpec] =
    &[SettingSpec::choice("display", &["display_name", "username", "email"])];
const LAYOUT: &[SettingSpec] = &[SettingSpec::choice("display", &["count", "summary"])];
const NONE: &[SettingSpec] = &[];

const NATIVE_TITLE: &[SettingSpec] = &[SettingSpec::integer("truncate", 0, 2000, 80)];
const NATIVE_EXCERPT: &[SettingSpec] = &[WORDS];
const NATIVE_STATUS: &[SettingSpec] = &[SettingSpec::choice("display", &["label", "badge"])];
const NATIVE_IMAGE: &[SettingSpec] = &[SettingSpec::choice("size", &["small", "medium", "large"])];
const NATIVE_PERMALINK: &[SettingSpec] = &[SettingSpec::choice("display", &["link", "text"])];

/// The allow-list for a target.
pub fn schema(target: SchemaTarget<'_>) -> &'static [SettingSpec] {
    match target {
        SchemaTarget::Kind(kind) => match kind {
            FieldKind::Text => TEXT,
            FieldKind::Textarea | FieldKind::Wysiwyg => LONG_TEXT,
            FieldKind::Number | FieldKind::Range => NUMBER,
            FieldKind::Email => EMAIL,
            FieldKind::Url => URL,
            FieldKind::Phone => PHONE,
            FieldKind::Password => PASSWORD,
            FieldKind::Oembed => OEMBED,
            FieldKind::Link => LINK,
            FieldKind::ColorPicker => COLOR,
            FieldKind::TrueFalse => TRUE_FALSE,
            FieldKind::Select | FieldKind::Radio | FieldKind::ButtonGroup => CHOICE,
            FieldKind::Checkbox => MULTI_CHOICE,
            FieldKind::Image => IMAGE,
            FieldKind::File => FILE,
            FieldKind::Gallery => GALLERY,
            FieldKind::DatePicker => DATE,
            FieldKind::DateTimePicker => DATE_TIME,
            FieldKind::TimePicker => TIME,
            FieldKind::Location => LOCATION,
            FieldKind::RecurringDates => RECURRING,
            FieldKind::PricingTiers => PRICING,
            FieldKind::PostObject | FieldKind::PageLink | FieldKind::Relationship => RELATION,
            FieldKind::Taxonomy => TAXONOMY,
            FieldKind::User => USER,
            FieldKind::Group | FieldKind::Repeater | FieldKind::FlexibleContent => LAYOUT,
            FieldKind::Generic => NONE,
        },
        SchemaTarget::Native(attr) => match attr {
            NativeAttr::Title => NATIVE_TITLE,
            NativeAttr::Excerpt => NATIVE_EXCERPT,
            NativeAttr::Author => USER,
            NativeAttr::Status => NATIVE_STATUS,
            NativeAttr::Date | NativeAttr::Modified => DATE,
            NativeAttr::Terms(_) => TAXONOMY,
            NativeAttr::FeaturedImage => NATIVE_IMAGE,
            NativeAttr::Permalink => NATIVE_PERMALINK,
            NativeAttr::Parent => RELATION,
            NativeAttr::Id
            | NativeAttr::Slug
            | NativeAttr::CommentCount
            | NativeAttr::MenuOrder
            | NativeAttr::Plan => NONE,
        },
        SchemaTarget::Computed(_) => NONE,
    }
}

/// Rebuilds display settings from untrusted JSON against a schema.
///
/// Keys outside the schema are dropped. Present keys with invalid values get
/// the schema default. Absent keys stay absent. Non-object input yields an
/// empty map.
pub fn sanitize(schema: &[SettingSpec], raw: &Value) -> DisplaySettings {
    let mut out = DisplaySettings::new();
    let Some(obj) = raw.as_object() else {
        return out;
    };

    for spec in schema {
        if let Some(value) = obj.get(spec.key) {
            let clean = spec.validate(value).unwrap_or_else(|| spec.default_value());
            out.insert(spec.key, clean);
        }
    }
    out
}

/// Schema-checked read access to a column's display settings.
#[derive(Debug, Clone, Copy)]
pub struct SettingsView<'a> {
    schema: &'static [SettingSpec],
    raw: &'a DisplaySettings,
}

impl<'a> SettingsView<'a> {
    pub fn new(schema: &'static [SettingSpec], raw: &'a DisplaySettings) -> Self {
        Self { schema, raw }
    }

    fn spec(&self, key: &str) -> Option<&'static SettingSpec> {
        self.schema.iter().find(|s| s.key == key)
    }

    /// The selected choice for `key`, or its default. Keys outside the schema yield "".
    pub fn choice(&self, key: &str) -> &'static str {
        let Some(spec) = self.spec(key) else {
            return "";
        };
        let SettingKind::Choice(choices) = spec.kind else {
            return "";
        };
        let selected = self.raw.get(key).and_then(|v| v.as_str()).map(str::trim);
        choices
            .iter()
            .copied()
            .find(|c| Some(*c) == selected)
            .or_else(|| choices.first().copied())
            .unwrap_or("")
    }

    /// Shorthand for the `display` variant.
    pub fn variant(&self) -> &'static str {
        self.choice("display")
    }

    pub fn integer(&self, key: &str) -> u64 {
        match self.spec(key).map(|s| s.kind) {
            Some(SettingKind::Integer { min, max, default }) => self
                .raw
                .get(key)
                .and_then(coerce_integer)
                .map(|n| n.clamp(min, max))
                .unwrap_or(default),
            _ => 0,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        match self.spec(key).map(|s| s.kind) {
            Some(SettingKind::Flag { default }) => {
                self.raw.get(key).and_then(coerce_flag).unwrap_or(default)
            }
            _ => false,
        }
    }

    pub fn text(&self, key: &str) -> String {
        match self.spec(key) {
            Some(spec) if matches!(spec.kind, SettingKind::Text { .. }) => self
                .raw
                .get(key)
                .and_then(|v| spec.validate(v))
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}
