//! Resolution of column field keys against the host's field catalogue.
//!
//! [`FieldCatalog`] is the one place that decides what a field key means for a
//! scope. Every downstream component (sanitizer, renderer, query modifier, list
//! controller) goes through it, so they all agree on a field's type.
//!
//! When the host has no field catalogue, stored keys resolve without a
//! definition: values are read straight from metadata, the field renders
//! through the generic formatter, and it has no capabilities.

use crate::fields::{
    capabilities_for, resolve, Capabilities, Computed, FieldKind, FieldRef, LogicalFieldType,
    NativeAttr, GENERIC_ICON,
};
use crate::host::{FieldDefinition, FieldOrigin, HostContext};
use crate::model::Scope;
use crate::settings::{schema, SchemaTarget, SettingSpec};
use serde::Serialize;

/// A field key resolved for one scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub field: FieldRef,
    /// Catalogue entry for stored fields, when the catalogue knows the key.
    pub definition: Option<FieldDefinition>,
    /// Resolved type for stored fields with a definition.
    pub ty: Option<LogicalFieldType>,
}

impl ResolvedField {
    pub fn native(attr: NativeAttr) -> Self {
        Self {
            field: FieldRef::Native(attr),
            definition: None,
            ty: None,
        }
    }

    pub fn computed(computed: Computed) -> Self {
        Self {
            field: FieldRef::Computed(computed),
            definition: None,
            ty: None,
        }
    }

    pub fn stored(definition: FieldDefinition) -> Self {
        let ty = resolve(&definition.type_name);
        Self {
            field: FieldRef::Stored(definition.key.clone()),
            definition: Some(definition),
            ty: Some(ty),
        }
    }

    /// A stored key the catalogue does not know about.
    pub fn unknown(key: impl Into<String>) -> Self {
        Self {
            field: FieldRef::Stored(key.into()),
            definition: None,
            ty: None,
        }
    }

    pub fn key(&self) -> String {
        self.field.key()
    }

    /// Metadata key for stored fields.
    pub fn storage_key(&self) -> Option<&str> {
        match (&self.field, &self.definition) {
            (FieldRef::Stored(_), Some(def)) => Some(def.storage_key()),
            (FieldRef::Stored(key), None) => Some(key.as_str()),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<FieldKind> {
        self.ty.as_ref().map(|t| t.kind)
    }

    pub fn capabilities(&self) -> Capabilities {
        capabilities_for(&self.field, self.ty.as_ref())
    }

    /// The display-setting allow-list for this field.
    pub fn schema(&self) -> &'static [SettingSpec] {
        match &self.field {
            FieldRef::Native(attr) => schema(SchemaTarget::Native(attr)),
            FieldRef::Computed(c) => schema(SchemaTarget::Computed(*c)),
            FieldRef::Stored(_) => {
                schema(SchemaTarget::Kind(self.kind().unwrap_or(FieldKind::Generic)))
            }
        }
    }

    pub fn default_label(&self) -> String {
        match &self.field {
            FieldRef::Native(attr) => attr.label(),
            FieldRef::Computed(c) => c.label().to_string(),
            FieldRef::Stored(key) => self
                .definition
                .as_ref()
                .map(|d| d.label.clone())
                .unwrap_or_else(|| crate::fields::title_case(key)),
        }
    }

    pub fn summary(&self) -> FieldSummary {
        let (type_name, icon) = match (&self.field, &self.ty) {
            (FieldRef::Native(_), _) => ("native".to_string(), "icon-native"),
            (FieldRef::Computed(_), _) => ("computed".to_string(), "icon-computed"),
            (FieldRef::Stored(_), Some(ty)) => (ty.id.clone(), ty.icon),
            (FieldRef::Stored(_), None) => ("generic".to_string(), GENERIC_ICON),
        };
        FieldSummary {
            key: self.key(),
            label: self.default_label(),
            type_name,
            icon,
            capabilities: self.capabilities(),
        }
    }
}

/// One selectable field, as listed by the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSummary {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub icon: &'static str,
    pub capabilities: Capabilities,
}

/// Fields available for a scope, grouped by where they come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailableFields {
    pub type_fields: Vec<FieldSummary>,
    pub host_attributes: Vec<FieldSummary>,
    pub add_on_fields: Vec<FieldSummary>,
}

impl AvailableFields {
    pub fn len(&self) -> usize {
        self.type_fields.len() + self.host_attributes.len() + self.add_on_fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct FieldCatalog<'a> {
    host: HostContext<'a>,
    scope: Scope,
}

impl<'a> FieldCatalog<'a> {
    pub fn new(host: HostContext<'a>, scope: Scope) -> Self {
        Self { host, scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Resolves a raw field key. Returns `None` for blank keys.
    pub fn resolve(&self, field_key: &str) -> Option<ResolvedField> {
        FieldRef::parse(field_key).map(|field| self.resolve_ref(field))
    }

    pub fn resolve_ref(&self, field: FieldRef) -> ResolvedField {
        match field {
            FieldRef::Native(attr) => ResolvedField::native(attr),
            FieldRef::Computed(c) => ResolvedField::computed(c),
            FieldRef::Stored(key) => match self
                .host
                .fields
                .and_then(|p| p.field(&self.scope, &key))
            {
                Some(def) => ResolvedField::stored(def),
                None => ResolvedField::unknown(key),
            },
        }
    }

    /// Every field a column may reference, grouped.
    pub fn available(&self) -> AvailableFields {
        let mut out = AvailableFields::default();

        match self.host.fields {
            Some(provider) => {
                for def in provider.fields(&self.scope) {
                    let origin = def.origin;
                    let summary = ResolvedField::stored(def).summary();
                    match origin {
                        FieldOrigin::Type => out.type_fields.push(summary),
                        FieldOrigin::AddOn => out.add_on_fields.push(summary),
                    }
                }
            }
            None => {
                // Underscore-prefixed keys are host-private.
                for key in self.host.data.meta_keys(&self.scope) {
                    if !key.starts_with('_') {
                        out.type_fields.push(ResolvedField::unknown(key).summary());
                    }
                }
            }
        }

        let taxonomies = self
            .host
            .data
            .scope_info(&self.scope)
            .map(|info| info.taxonomies)
            .unwrap_or_default();
        let natives = NativeAttr::FIXED
            .iter()
            .cloned()
            .chain(taxonomies.into_iter().map(NativeAttr::Terms));
        out.host_attributes.extend(natives.map(|a| ResolvedField::native(a).summary()));
        out.host_attributes.extend(
            Computed::ALL
                .iter()
                .map(|c| ResolvedField::computed(*c).summary()),
        );

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::listing_host;

    #[test]
    fn resolves_stored_fields_through_catalogue() {
        let host = listing_host();
        let catalog = FieldCatalog::new(host.context(), Scope::from("listing"));

        let price = catalog.resolve("price").unwrap();
        assert_eq!(price.kind(), Some(FieldKind::PricingTiers));
        assert!(price.capabilities().numeric_sort);
        assert_eq!(price.storage_key(), Some("price"));
    }

    #[test]
    fn unknown_type_has_no_capabilities() {
        let host = listing_host();
        let catalog = FieldCatalog::new(host.context(), Scope::from("listing"));

        let field = catalog.resolve("legacy_code").unwrap();
        assert_eq!(field.kind(), Some(FieldKind::Generic));
        assert_eq!(field.capabilities(), Capabilities::NONE);
    }

    #[test]
    fn missing_catalogue_falls_back_to_metadata() {
        let host = listing_host();
        let catalog = FieldCatalog::new(HostContext::new(&host), Scope::from("listing"));

        let price = catalog.resolve("price").unwrap();
        assert!(price.definition.is_none());
        assert_eq!(price.capabilities(), Capabilities::NONE);
        assert!(price.schema().is_empty());

        let available = catalog.available();
        assert!(available.type_fields.iter().any(|f| f.key == "price"));
        assert!(available.type_fields.iter().all(|f| !f.key.starts_with('_')));
        assert!(available.add_on_fields.is_empty());
    }

    #[test]
    fn available_groups_fields() {
        let host = listing_host();
        let catalog = FieldCatalog::new(host.context(), Scope::from("listing"));
        let available = catalog.available();

        assert!(available.type_fields.iter().any(|f| f.key == "price"));
        assert!(available.add_on_fields.iter().any(|f| f.key == "rating"));
        assert!(available.host_attributes.iter().any(|f| f.key == "@tax:region"));
        assert!(available.host_attributes.iter().any(|f| f.key == "#word_count"));
    }

    #[test]
    fn blank_key_does_not_resolve() {
        let host = listing_host();
        let catalog = FieldCatalog::new(host.context(), Scope::from("listing"));
        assert!(catalog.resolve("   ").is_none());
    }
}
