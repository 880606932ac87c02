//! Sample hosts for tests.
//!
//! The "listing" host holds four listings (one draft, one without a price) and
//! an event whose parent is the first listing. The same data backs the
//! integration tests through `tests/fixtures/listing.json`.

use crate::columns::ConfigStore;
use crate::host::{Entity, HostFixture, MemSettings, MemoryHost};
use serde_json::json;

const LISTING_JSON: &str = include_str!("../../tests/fixtures/listing.json");

/// The sample listing host.
pub fn listing_host() -> MemoryHost {
    let data: HostFixture =
        serde_json::from_str(LISTING_JSON).expect("listing fixture is valid JSON");
    MemoryHost::from_fixture(data)
}

/// A single-entity host in scope "listing" with the given stored field.
pub fn host_with_field(type_name: &str, value: serde_json::Value) -> MemoryHost {
    let mut host = listing_host();
    let mut entity = Entity::new(900, "listing", "Fixture Entity");
    entity.meta.insert("subject".to_string(), value);
    host.add_entity(entity);
    host.add_field(
        "listing",
        crate::host::FieldDefinition::new("subject", "Subject", type_name),
    );
    host
}

/// The three-column configuration used by the export scenario:
/// title (sortable), price (nested numeric, sortable), status (filterable).
pub fn scenario_columns() -> serde_json::Value {
    json!({
        "columns": [
            {"id": "title", "field_key": "@title", "label": "Title", "sortable": true},
            {"id": "price", "field_key": "price", "label": "Price", "sortable": true,
             "display_settings": {"display": "single"}},
            {"id": "status", "field_key": "@status", "label": "Status", "filterable": true}
        ],
        "settings": {"default_sort": {"column": "title", "order": "asc"}, "primary_column": "title"}
    })
}

pub struct ConfigFixture {
    pub host: MemoryHost,
    pub settings: MemSettings,
}

impl Default for ConfigFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFixture {
    pub fn new() -> Self {
        Self {
            host: listing_host(),
            settings: MemSettings::new(),
        }
    }

    pub fn store(&self) -> ConfigStore<'_> {
        ConfigStore::new(&self.settings, self.host.context())
    }

    /// Saves the export scenario's configuration for "listing".
    pub fn with_scenario(self) -> Self {
        self.store()
            .save(&"listing".into(), &scenario_columns())
            .expect("scenario configuration saves");
        self
    }
}
