//! Value rendering: one list cell from a field key, an entity, and display settings.
//!
//! The [`Renderer`] resolves the field key through the [`FieldCatalog`], reads
//! the raw value, and hands it to the formatter registered for the field's
//! type. Formatters produce a [`Fragment`], which is then emitted either as
//! escaped markup for the list view or as a plain scalar for export.
//!
//! Dispatch rules:
//!
//! - Native attributes and computed fields have dedicated renderers.
//! - Stored values that are missing, null, `""`, or `[]` render as empty
//!   (the configured placeholder in markup, `""` in plain output).
//! - Strings holding JSON structures are decoded before formatting.
//! - A formatter that cannot read the value's shape falls back to the generic
//!   formatter, as do unknown field types.
//!
//! Rendering never fails: every failure path ends in the placeholder or the
//! generic rendering.

pub mod datetime;
pub mod fallback;
pub mod fragment;
mod media;
mod native;
mod relational;
mod scalar;
mod structured;
pub mod text;

pub use fragment::Fragment;
pub use native::{status_label, WORDS_PER_MINUTE};

use crate::catalog::{FieldCatalog, ResolvedField};
use crate::fields::{FieldKind, FieldRef};
use crate::host::{decode_structured, Entity, EntityId, HostContext};
use crate::model::{DisplaySettings, Scope};
use crate::settings::SettingsView;
use chrono::{Local, NaiveDateTime};
use serde_json::Value;
use tracing::trace;

/// Which form a rendered value takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Escaped HTML for the list view.
    Markup,
    /// Markup-free scalar for export.
    Plain,
}

/// Formatting preferences shared by every cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Shown in markup for empty values.
    pub placeholder: String,
    pub date_format: String,
    pub datetime_format: String,
    pub time_format: String,
    pub currency_symbol: String,
    /// Reference point for relative dates and next occurrences.
    pub now: NaiveDateTime,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            placeholder: "—".to_string(),
            date_format: datetime::DEFAULT_DATE_FORMAT.to_string(),
            datetime_format: datetime::DEFAULT_DATETIME_FORMAT.to_string(),
            time_format: datetime::DEFAULT_TIME_FORMAT.to_string(),
            currency_symbol: "$".to_string(),
            now: Local::now().naive_local(),
        }
    }
}

/// Everything a formatter can see while rendering one cell.
pub struct RenderContext<'r> {
    pub host: HostContext<'r>,
    pub entity: &'r Entity,
    pub field: &'r ResolvedField,
    pub settings: SettingsView<'r>,
    pub options: &'r RenderOptions,
}

/// A type formatter. `None` means the value's shape was not understood.
type Formatter = fn(&RenderContext<'_>, &Value) -> Option<Fragment>;

fn generic(_ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    Some(fallback::render(value))
}

fn formatter_for(kind: FieldKind) -> Formatter {
    match kind {
        FieldKind::Text => scalar::text,
        FieldKind::Textarea | FieldKind::Wysiwyg => scalar::long_text,
        FieldKind::Number | FieldKind::Range => scalar::number,
        FieldKind::Email => scalar::email,
        FieldKind::Url => scalar::url,
        FieldKind::Phone => scalar::phone,
        FieldKind::Password => scalar::password,
        FieldKind::Oembed => scalar::oembed,
        FieldKind::ColorPicker => scalar::color,
        FieldKind::TrueFalse => scalar::true_false,
        FieldKind::Select | FieldKind::Radio | FieldKind::ButtonGroup | FieldKind::Checkbox => {
            scalar::choice
        }
        FieldKind::Link => scalar::link,
        FieldKind::Image => media::image,
        FieldKind::File => media::file,
        FieldKind::Gallery => media::gallery,
        FieldKind::DatePicker => datetime::date_picker,
        FieldKind::DateTimePicker => datetime::date_time_picker,
        FieldKind::TimePicker => datetime::time_picker,
        FieldKind::Location => structured::location,
        FieldKind::RecurringDates => structured::recurring,
        FieldKind::PricingTiers => structured::pricing,
        FieldKind::PostObject | FieldKind::Relationship => relational::post_object,
        FieldKind::PageLink => relational::page_link,
        FieldKind::Taxonomy => relational::taxonomy,
        FieldKind::User => relational::users,
        FieldKind::Group => structured::group,
        FieldKind::Repeater => structured::repeater,
        FieldKind::FlexibleContent => structured::flexible,
        FieldKind::Generic => generic,
    }
}

/// Null, blank strings, and empty collections count as no value.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

pub struct Renderer<'a> {
    host: HostContext<'a>,
    catalog: FieldCatalog<'a>,
    options: RenderOptions,
}

impl<'a> Renderer<'a> {
    pub fn new(host: HostContext<'a>, scope: Scope, options: RenderOptions) -> Self {
        Self {
            host,
            catalog: FieldCatalog::new(host, scope),
            options,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn catalog(&self) -> &FieldCatalog<'a> {
        &self.catalog
    }

    /// Renders one cell as escaped markup.
    pub fn render(
        &self,
        field_key: &str,
        entity_id: EntityId,
        settings: &DisplaySettings,
    ) -> String {
        self.render_as(field_key, entity_id, settings, OutputMode::Markup)
    }

    /// Renders one cell as a plain scalar.
    pub fn render_plain(
        &self,
        field_key: &str,
        entity_id: EntityId,
        settings: &DisplaySettings,
    ) -> String {
        self.render_as(field_key, entity_id, settings, OutputMode::Plain)
    }

    pub fn render_as(
        &self,
        field_key: &str,
        entity_id: EntityId,
        settings: &DisplaySettings,
        mode: OutputMode,
    ) -> String {
        let fragment = match (self.catalog.resolve(field_key), self.host.data.entity(entity_id)) {
            (Some(field), Some(entity)) => self.fragment(&field, &entity, settings),
            _ => Fragment::Empty,
        };
        self.output(&fragment, mode)
    }

    /// Builds the fragment for an already-resolved field and loaded entity.
    pub fn fragment(
        &self,
        field: &ResolvedField,
        entity: &Entity,
        settings: &DisplaySettings,
    ) -> Fragment {
        let ctx = RenderContext {
            host: self.host,
            entity,
            field,
            settings: SettingsView::new(field.schema(), settings),
            options: &self.options,
        };

        match &field.field {
            FieldRef::Native(attr) => native::render(&ctx, attr),
            FieldRef::Computed(computed) => native::computed(&ctx, *computed),
            FieldRef::Stored(_) => {
                let Some(raw) = field.storage_key().and_then(|key| entity.meta(key)) else {
                    return Fragment::Empty;
                };
                let value = decode_structured(raw);
                if is_blank(&value) {
                    return Fragment::Empty;
                }
                let kind = field.kind().unwrap_or(FieldKind::Generic);
                match formatter_for(kind)(&ctx, &value) {
                    Some(fragment) => fragment,
                    None => {
                        trace!(
                            target: "tabula::render",
                            field = %field.key(),
                            entity = entity.id,
                            ?kind,
                            "value shape not understood, using generic rendering"
                        );
                        fallback::render(&value)
                    }
                }
            }
        }
    }

    pub fn output(&self, fragment: &Fragment, mode: OutputMode) -> String {
        match mode {
            OutputMode::Markup => fragment.to_markup(&self.options.placeholder),
            OutputMode::Plain => fragment.to_plain(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::datetime::parse_datetime;
    use super::*;
    use crate::fixtures::{host_with_field, listing_host};
    use crate::host::MemoryHost;
    use serde_json::json;

    fn options() -> RenderOptions {
        RenderOptions {
            now: parse_datetime("2024-06-01 12:00:00").unwrap(),
            ..RenderOptions::default()
        }
    }

    fn renderer(host: &MemoryHost) -> Renderer<'_> {
        Renderer::new(host.context(), "listing".into(), options())
    }

    fn settings(raw: serde_json::Value) -> DisplaySettings {
        serde_json::from_value(raw).unwrap()
    }

    fn none() -> DisplaySettings {
        DisplaySettings::new()
    }

    #[test]
    fn native_title_and_author() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(r.render("@title", 101, &none()), "Harbour View Loft");
        assert_eq!(r.render("@author", 101, &none()), "Mara Quinn");
        assert_eq!(r.render("@author", 101, &settings(json!({"display": "username"}))), "mara");
    }

    #[test]
    fn title_truncates_at_budget() {
        let host = listing_host();
        let r = renderer(&host);
        let out = r.render("@title", 101, &settings(json!({"truncate": 7})));
        assert!(out.contains("Harbour…"));
        assert!(out.contains("title=\"Harbour View Loft\""));
        assert_eq!(
            r.render_plain("@title", 101, &settings(json!({"truncate": 7}))),
            "Harbour View Loft"
        );
    }

    #[test]
    fn pricing_variants_keep_numeric_exports() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(r.render("price", 101, &none()), "$180");
        assert_eq!(r.render_plain("price", 101, &none()), "180");

        let range = settings(json!({"display": "range"}));
        assert_eq!(r.render("price", 101, &range), "$180 – $240");
        assert_eq!(r.render_plain("price", 101, &range), "180-240");

        let discounted = settings(json!({"display": "discounted"}));
        assert_eq!(r.render("price", 101, &discounted), "<del>$180</del> $150");
        assert_eq!(r.render_plain("price", 101, &discounted), "150");

        assert_eq!(r.render("price", 102, &none()), "$95");
        assert_eq!(r.render_plain("price", 104, &none()), "320");
    }

    #[test]
    fn missing_values_render_placeholder_and_export_empty() {
        let host = listing_host();
        let r = renderer(&host);
        assert!(r.render("price", 103, &none()).contains("tabula-empty"));
        assert!(r.render("price", 103, &none()).contains('—'));
        assert_eq!(r.render_plain("price", 103, &none()), "");
        assert!(r.render("@title", 4242, &none()).contains("tabula-empty"));
        assert!(r.render("", 101, &none()).contains("tabula-empty"));
    }

    #[test]
    fn checkbox_uses_choice_labels_and_bounds() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(
            r.render_plain("amenities", 101, &none()),
            "Wi-Fi, Pool, Parking, Pets Allowed"
        );
        let bounded = r.render("amenities", 101, &settings(json!({"max_items": 2})));
        assert!(bounded.starts_with("Wi-Fi, Pool"));
        assert!(bounded.contains("+2 more"));
    }

    #[test]
    fn relationship_skips_missing_targets() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(
            r.render_plain("nearby", 101, &none()),
            "Garden Cottage, City Studio, Mountain Cabin"
        );
        assert!(!r.render("nearby", 101, &none()).contains("more"));
        assert_eq!(
            r.render("nearby", 101, &settings(json!({"display": "count"}))),
            "<span class=\"tabula-badge tabula-badge-count\">3 items</span>"
        );
    }

    #[test]
    fn unknown_type_uses_generic_rendering() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(r.render("legacy_code", 101, &none()), "LX-9");
        assert!(r.render("legacy_code", 103, &none()).contains("3 items"));
        assert_eq!(r.render_plain("legacy_code", 103, &none()), "a, b, c");
    }

    #[test]
    fn unreadable_number_falls_back() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(r.render("rating", 101, &none()), "4.5");
        assert_eq!(r.render("rating", 103, &none()), "n/a");
        assert_eq!(r.render("bedrooms", 104, &settings(json!({"suffix": "+"}))), "10+");
        assert_eq!(r.render_plain("bedrooms", 104, &settings(json!({"suffix": "+"}))), "10");
    }

    #[test]
    fn structured_fields() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(r.render("location", 101, &none()), "1 Quay Street, Portsmouth");
        assert_eq!(r.render_plain("open_dates", 101, &none()), "2024-06-01");
        assert_eq!(
            r.render("open_dates", 101, &settings(json!({"display": "summary"}))),
            "Every week on Sat, Sun from Mar 2, 2024 until Dec 29, 2024"
        );
        assert_eq!(r.render("host_user", 101, &none()), "Teo Park");
        assert!(r.render("gallery", 101, &none()).contains("2 images"));
        assert_eq!(r.render("brochure", 101, &none()), "floorplan.pdf");
        assert_eq!(r.render("brochure", 101, &settings(json!({"display": "size"}))), "1.0 MB");
        assert_eq!(r.render("available_from", 101, &none()), "2024-03-15");
    }

    #[test]
    fn rich_text_is_stripped_and_escaped() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(
            r.render("description", 101, &none()),
            "A bright loft &amp; studio above the harbour."
        );
        assert_eq!(
            r.render_plain("description", 101, &none()),
            "A bright loft & studio above the harbour."
        );
    }

    #[test]
    fn email_links() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(
            r.render("contact_email", 101, &none()),
            "<a href=\"mailto:stay@harbour.example\">stay@harbour.example</a>"
        );
    }

    #[test]
    fn host_attributes_and_computed_fields() {
        let host = listing_host();
        let r = renderer(&host);
        assert_eq!(r.render_plain("@plan", 101, &none()), "Gold");
        assert_eq!(r.render_plain("@plan", 104, &none()), "Silver");
        assert_eq!(r.render_plain("@tax:region", 101, &none()), "Coast");
        assert_eq!(r.render("#reading_time", 101, &none()), "1 min");
        assert_eq!(r.render_plain("#child_count", 101, &none()), "1");
        assert!(r.render("#reading_time", 104, &none()).contains("tabula-empty"));
        assert_eq!(r.render("@status", 103, &none()), "Draft");
    }

    #[test]
    fn relative_dates_keep_exact_tooltip() {
        let host = listing_host();
        let r = renderer(&host);
        let relative = settings(json!({"date_format": "relative"}));
        assert!(r.render("@date", 101, &relative).contains("title=\"2024-03-01 09:00\""));
        assert_eq!(r.render_plain("@date", 101, &relative), "2024-03-01 09:00");
        assert_eq!(r.render("@date", 101, &none()), "2024-03-01");
    }

    #[test]
    fn operator_preferences_flow_into_cells() {
        let host = listing_host();
        let r = Renderer::new(
            host.context(),
            "listing".into(),
            RenderOptions {
                placeholder: "n/a".into(),
                date_format: "%d/%m/%Y".into(),
                currency_symbol: "€".into(),
                ..options()
            },
        );
        assert_eq!(r.render("@date", 101, &none()), "01/03/2024");
        assert_eq!(r.render("available_from", 101, &none()), "15/03/2024");
        assert_eq!(r.render("price", 101, &none()), "€180");
        assert_eq!(r.render_plain("price", 101, &none()), "180");
        assert!(r.render("price", 103, &none()).contains("n/a"));
        assert_eq!(r.render_plain("price", 103, &none()), "");
    }

    #[test]
    fn invalid_date_patterns_render_with_defaults() {
        let host = listing_host();
        let r = Renderer::new(
            host.context(),
            "listing".into(),
            RenderOptions {
                date_format: "%Q".into(),
                datetime_format: "%".into(),
                ..options()
            },
        );
        assert_eq!(r.render("@date", 101, &none()), "2024-03-01");
        assert_eq!(r.render("available_from", 101, &none()), "2024-03-15");
        let relative = settings(json!({"date_format": "relative"}));
        assert_eq!(r.render_plain("@date", 101, &relative), "2024-03-01 09:00");
    }

    #[test]
    fn price_follows_the_first_tier() {
        let host =
            host_with_field("pricing_tiers", json!([{"label": "On request"}, {"amount": 240}]));
        let r = renderer(&host);
        assert!(r.render("subject", 900, &none()).contains("tabula-empty"));
        assert_eq!(r.render_plain("subject", 900, &none()), "");

        let host = host_with_field("pricing_tiers", json!([{"amount": 120}, {"amount": 240}]));
        assert_eq!(renderer(&host).render("subject", 900, &none()), "$120");
    }

    #[test]
    fn hostile_values_are_escaped() {
        let host = host_with_field("text", json!("<script>alert(1)</script>"));
        let r = renderer(&host);
        let out = r.render("subject", 900, &none());
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));

        let host = host_with_field("url", json!("javascript:alert(1)"));
        let out = renderer(&host).render("subject", 900, &none());
        assert!(!out.contains("href"));
    }

    #[test]
    fn boolean_and_color_variants() {
        let host = host_with_field("true_false", json!("1"));
        let yes_no = settings(json!({"display": "yes_no"}));
        assert_eq!(renderer(&host).render("subject", 900, &yes_no), "Yes");

        let host = host_with_field("true_false", json!("perhaps"));
        assert_eq!(renderer(&host).render("subject", 900, &none()), "perhaps");

        let host = host_with_field("color_picker", json!("#FF8800"));
        let r = renderer(&host);
        assert!(r.render("subject", 900, &none()).contains("background-color:#ff8800"));
        assert_eq!(r.render_plain("subject", 900, &none()), "#ff8800");
    }

    #[test]
    fn empty_collections_are_empty() {
        let host = host_with_field("checkbox", json!([]));
        assert_eq!(renderer(&host).render_plain("subject", 900, &none()), "");
        let host = host_with_field("gallery", json!("[]"));
        assert!(renderer(&host).render("subject", 900, &none()).contains("tabula-empty"));
    }
}
