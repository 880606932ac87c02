//! # Field Type Registry
//!
//! The registry is the single source of truth for what a logical field *is*:
//! which formatter renders it, whether the data store can sort or filter on it,
//! and whether sorting compares numbers or strings.
//!
//! Every column addresses its data through a [`FieldRef`]:
//!
//! | Key form | Variant | Example |
//! |----------|---------|---------|
//! | `@name` | [`FieldRef::Native`] | `@title`, `@status`, `@tax:genre` |
//! | `#name` | [`FieldRef::Computed`] | `#word_count` |
//! | anything else | [`FieldRef::Stored`] | `price`, `venue_location` |
//!
//! Stored fields carry a type name supplied by the host's field catalogue; that
//! name is resolved through [`resolve`], which never fails. Unknown type names
//! degrade to a permissive generic record so new field types render as plain
//! text instead of breaking the list.

mod key;
mod types;

pub use key::{Computed, FieldRef, NativeAttr, COMPUTED_SIGIL, NATIVE_SIGIL};
pub use types::{resolve, FieldKind, FieldTypeSpec, LogicalFieldType, FIELD_TYPES, GENERIC_ICON};

use serde::Serialize;

/// What the data store can do with a field.
///
/// Capabilities are derived from the field's type, never from stored column
/// flags. Column flags only decide whether the UI exposes a capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub sortable: bool,
    pub filterable: bool,
    pub numeric_sort: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        sortable: false,
        filterable: false,
        numeric_sort: false,
    };
}

/// Capabilities of a field reference, given the resolved type for stored fields.
///
/// Stored fields without a resolved type (the field catalogue is unavailable)
/// get the generic record's capabilities, which is to say none.
pub fn capabilities_for(field: &FieldRef, ty: Option<&LogicalFieldType>) -> Capabilities {
    match field {
        FieldRef::Native(attr) => attr.capabilities(),
        FieldRef::Computed(_) => Capabilities::NONE,
        FieldRef::Stored(_) => ty.map(|t| t.capabilities).unwrap_or(Capabilities::NONE),
    }
}

/// Turns `snake_case`, `kebab-case` or spaced names into `Title Case`.
pub fn title_case(name: &str) -> String {
    let words: Vec<String> = name
        .split(['_', '-', ' ', ':'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        "Field".to_string()
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_handles_separators() {
        assert_eq!(title_case("star_rating"), "Star Rating");
        assert_eq!(title_case("event-date"), "Event Date");
        assert_eq!(title_case("price"), "Price");
        assert_eq!(title_case(""), "Field");
        assert_eq!(title_case("__"), "Field");
    }

    #[test]
    fn computed_fields_have_no_store_capabilities() {
        let field = FieldRef::Computed(Computed::WordCount);
        assert_eq!(capabilities_for(&field, None), Capabilities::NONE);
    }

    #[test]
    fn stored_field_capabilities_come_from_type() {
        let field = FieldRef::Stored("price".into());
        let ty = resolve("number");
        let caps = capabilities_for(&field, Some(&ty));
        assert!(caps.sortable);
        assert!(caps.numeric_sort);

        assert_eq!(capabilities_for(&field, None), Capabilities::NONE);
    }

    #[test]
    fn native_capabilities_ignore_type() {
        let field = FieldRef::Native(NativeAttr::Status);
        let caps = capabilities_for(&field, Some(&resolve("whatever")));
        assert!(caps.filterable);
        assert!(caps.sortable);
    }
}
