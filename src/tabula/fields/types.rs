//! Logical field type catalogue.

use super::{title_case, Capabilities};
use serde::Serialize;

/// Icon used for types the catalogue does not know.
pub const GENERIC_ICON: &str = "icon-generic";

/// The formatter family a field type renders with.
///
/// Each kind maps to exactly one formatter in `render::formatters`; the match
/// there is exhaustive, so adding a kind without a formatter does not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Wysiwyg,
    Number,
    Range,
    Email,
    Url,
    Phone,
    Password,
    Oembed,
    ColorPicker,
    TrueFalse,
    Select,
    Checkbox,
    Radio,
    ButtonGroup,
    Link,
    Image,
    File,
    Gallery,
    DatePicker,
    DateTimePicker,
    TimePicker,
    Location,
    RecurringDates,
    PricingTiers,
    PostObject,
    PageLink,
    Relationship,
    Taxonomy,
    User,
    Group,
    Repeater,
    FlexibleContent,
    Generic,
}

/// Static catalogue entry.
#[derive(Debug, Clone, Copy)]
pub struct FieldTypeSpec {
    /// Type name as reported by the field catalogue (e.g. "text", "google_map")
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub icon: &'static str,
    pub capabilities: Capabilities,
}

impl FieldTypeSpec {
    const fn new(
        name: &'static str,
        label: &'static str,
        kind: FieldKind,
        icon: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind,
            icon,
            capabilities: Capabilities::NONE,
        }
    }

    const fn sortable(mut self) -> Self {
        self.capabilities.sortable = true;
        self
    }

    const fn filterable(mut self) -> Self {
        self.capabilities.filterable = true;
        self
    }

    /// Sortable, comparing values as numbers.
    const fn numeric(mut self) -> Self {
        self.capabilities.sortable = true;
        self.capabilities.numeric_sort = true;
        self
    }
}

/// Registry of all known field types.
///
/// Adding a field type means adding an entry here and a formatter for its kind.
pub const FIELD_TYPES: &[FieldTypeSpec] = &[
    // Scalar text
    FieldTypeSpec::new("text", "Text", FieldKind::Text, "icon-text").sortable().filterable(),
    FieldTypeSpec::new("textarea", "Text Area", FieldKind::Textarea, "icon-textarea").sortable(),
    FieldTypeSpec::new("wysiwyg", "Rich Text", FieldKind::Wysiwyg, "icon-editor"),
    FieldTypeSpec::new("password", "Password", FieldKind::Password, "icon-lock"),
    // Numeric
    FieldTypeSpec::new("number", "Number", FieldKind::Number, "icon-number").numeric().filterable(),
    FieldTypeSpec::new("range", "Range", FieldKind::Range, "icon-range").numeric().filterable(),
    // Contact identifiers
    FieldTypeSpec::new("email", "Email", FieldKind::Email, "icon-email").sortable().filterable(),
    FieldTypeSpec::new("url", "URL", FieldKind::Url, "icon-link").sortable(),
    FieldTypeSpec::new("phone", "Phone", FieldKind::Phone, "icon-phone").sortable().filterable(),
    FieldTypeSpec::new("oembed", "Embed", FieldKind::Oembed, "icon-video"),
    FieldTypeSpec::new("link", "Link", FieldKind::Link, "icon-link"),
    // Choice
    FieldTypeSpec::new("color_picker", "Color", FieldKind::ColorPicker, "icon-color").sortable(),
    FieldTypeSpec::new("true_false", "True / False", FieldKind::TrueFalse, "icon-toggle")
        .numeric()
        .filterable(),
    FieldTypeSpec::new("select", "Select", FieldKind::Select, "icon-list").sortable().filterable(),
    FieldTypeSpec::new("checkbox", "Checkbox", FieldKind::Checkbox, "icon-checkbox").filterable(),
    FieldTypeSpec::new("radio", "Radio", FieldKind::Radio, "icon-radio").sortable().filterable(),
    FieldTypeSpec::new("button_group", "Button Group", FieldKind::ButtonGroup, "icon-buttons")
        .sortable()
        .filterable(),
    // Media
    FieldTypeSpec::new("image", "Image", FieldKind::Image, "icon-image"),
    FieldTypeSpec::new("file", "File", FieldKind::File, "icon-file"),
    FieldTypeSpec::new("gallery", "Gallery", FieldKind::Gallery, "icon-gallery"),
    // Dates (stored as sortable strings: Ymd, Y-m-d H:i:s, H:i:s)
    FieldTypeSpec::new("date_picker", "Date", FieldKind::DatePicker, "icon-calendar")
        .sortable()
        .filterable(),
    FieldTypeSpec::new("date_time_picker", "Date Time", FieldKind::DateTimePicker, "icon-calendar")
        .sortable(),
    FieldTypeSpec::new("time_picker", "Time", FieldKind::TimePicker, "icon-clock").sortable(),
    // Structured
    FieldTypeSpec::new("google_map", "Location", FieldKind::Location, "icon-location"),
    FieldTypeSpec::new(
        "recurring_dates",
        "Recurring Schedule",
        FieldKind::RecurringDates,
        "icon-repeat",
    ),
    FieldTypeSpec::new("pricing_tiers", "Pricing Tiers", FieldKind::PricingTiers, "icon-money")
        .numeric(),
    // Relational
    FieldTypeSpec::new("post_object", "Post Object", FieldKind::PostObject, "icon-post")
        .filterable(),
    FieldTypeSpec::new("page_link", "Page Link", FieldKind::PageLink, "icon-page"),
    FieldTypeSpec::new(
        "relationship",
        "Relationship",
        FieldKind::Relationship,
        "icon-relationship",
    ),
    FieldTypeSpec::new("taxonomy", "Taxonomy", FieldKind::Taxonomy, "icon-tag").filterable(),
    FieldTypeSpec::new("user", "User", FieldKind::User, "icon-user").filterable(),
    // Layout
    FieldTypeSpec::new("group", "Group", FieldKind::Group, "icon-group"),
    FieldTypeSpec::new("repeater", "Repeater", FieldKind::Repeater, "icon-repeater"),
    FieldTypeSpec::new(
        "flexible_content",
        "Flexible Content",
        FieldKind::FlexibleContent,
        "icon-layout",
    ),
];

/// A resolved field type record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalFieldType {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    pub icon: &'static str,
    pub capabilities: Capabilities,
}

impl LogicalFieldType {
    pub fn is_generic(&self) -> bool {
        self.kind == FieldKind::Generic
    }
}

impl From<&FieldTypeSpec> for LogicalFieldType {
    fn from(spec: &FieldTypeSpec) -> Self {
        Self {
            id: spec.name.to_string(),
            label: spec.label.to_string(),
            kind: spec.kind,
            icon: spec.icon,
            capabilities: spec.capabilities,
        }
    }
}

/// Look up a field type by name.
///
/// Unknown names yield a generic record: no capabilities, the generic icon, and
/// a title-cased label derived from the name.
pub fn resolve(type_name: &str) -> LogicalFieldType {
    match FIELD_TYPES.iter().find(|spec| spec.name == type_name) {
        Some(spec) => spec.into(),
        None => LogicalFieldType {
            id: type_name.to_string(),
            label: title_case(type_name),
            kind: FieldKind::Generic,
            icon: GENERIC_ICON,
            capabilities: Capabilities::NONE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_names_are_unique() {
        let mut seen = HashSet::new();
        for spec in FIELD_TYPES {
            assert!(seen.insert(spec.name), "duplicate type {}", spec.name);
        }
    }

    #[test]
    fn registry_never_uses_generic_kind() {
        assert!(FIELD_TYPES.iter().all(|s| s.kind != FieldKind::Generic));
    }

    #[test]
    fn numeric_implies_sortable() {
        for spec in FIELD_TYPES {
            if spec.capabilities.numeric_sort {
                assert!(spec.capabilities.sortable, "{} numeric but not sortable", spec.name);
            }
        }
    }

    #[test]
    fn resolve_known_type() {
        let ty = resolve("pricing_tiers");
        assert_eq!(ty.kind, FieldKind::PricingTiers);
        assert!(ty.capabilities.sortable);
        assert!(ty.capabilities.numeric_sort);
        assert!(!ty.capabilities.filterable);
    }

    #[test]
    fn resolve_unknown_type_is_permissive_default() {
        let ty = resolve("star_rating");
        assert!(ty.is_generic());
        assert_eq!(ty.id, "star_rating");
        assert_eq!(ty.label, "Star Rating");
        assert_eq!(ty.icon, GENERIC_ICON);
        assert_eq!(ty.capabilities, Capabilities::NONE);
    }

    #[test]
    fn text_sorts_lexically() {
        let ty = resolve("text");
        assert!(ty.capabilities.sortable);
        assert!(!ty.capabilities.numeric_sort);
    }
}
