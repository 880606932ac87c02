//! The write-path trust boundary for column configurations.
//!
//! Input is untrusted JSON. The output is always a structurally valid
//! [`ColumnConfiguration`]; nothing here fails. Sanitizing sanitized output is
//! a no-op.

use crate::catalog::FieldCatalog;
use crate::model::{
    new_column_id, ColumnConfiguration, ColumnDefinition, DefaultSort, ListSettings, SortOrder,
    Width, WidthMode,
};
use crate::settings::{self, coerce_flag, coerce_integer};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const MAX_LABEL_CHARS: usize = 200;
pub const MAX_ID_CHARS: usize = 64;
pub const MAX_PX_WIDTH: u64 = 2000;
pub const MAX_PERCENT_WIDTH: u64 = 100;

/// Rebuilds a configuration from raw input, resolving field types via `catalog`.
pub fn sanitize(raw: &Value, catalog: &FieldCatalog<'_>) -> ColumnConfiguration {
    let Some(obj) = raw.as_object() else {
        return ColumnConfiguration::default();
    };

    let mut seen: HashSet<String> = HashSet::new();
    // Maps ids as submitted to ids as kept, so settings can follow regenerated ids.
    let mut submitted_ids: Vec<(String, String)> = Vec::new();
    let mut columns = Vec::new();

    let items = obj.get("columns").and_then(Value::as_array);
    for item in items.into_iter().flatten() {
        let Some(col) = item.as_object() else {
            continue;
        };
        let Some(field_key) = col
            .get("field_key")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
        else {
            continue;
        };
        let Some(resolved) = catalog.resolve(field_key) else {
            continue;
        };

        let raw_id = col.get("id").and_then(Value::as_str).map(str::trim);
        let id = match raw_id {
            Some(id) if is_valid_id(id) && !seen.contains(id) => id.to_string(),
            _ => loop {
                let id = new_column_id();
                if !seen.contains(&id) {
                    break id;
                }
            },
        };
        seen.insert(id.clone());
        if let Some(raw_id) = raw_id {
            submitted_ids.push((raw_id.to_string(), id.clone()));
        }

        let label = col
            .get("label")
            .and_then(Value::as_str)
            .map(clean_label)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| resolved.default_label());

        columns.push(ColumnDefinition {
            id,
            field_key: field_key.to_string(),
            label,
            width: sanitize_width(col.get("width")),
            sortable: flag(col, "sortable"),
            filterable: flag(col, "filterable"),
            display_settings: settings::sanitize(
                resolved.schema(),
                col.get("display_settings").unwrap_or(&Value::Null),
            ),
        });
    }

    let settings = obj
        .get("settings")
        .and_then(Value::as_object)
        .map(|s| sanitize_list_settings(s, &columns, &submitted_ids))
        .unwrap_or_default();

    ColumnConfiguration { columns, settings }
}

fn flag(col: &Map<String, Value>, key: &str) -> bool {
    col.get(key).and_then(coerce_flag).unwrap_or(false)
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.chars().count() <= MAX_ID_CHARS
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn clean_label(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    cleaned.trim().chars().take(MAX_LABEL_CHARS).collect::<String>().trim().to_string()
}

fn sanitize_width(raw: Option<&Value>) -> Width {
    let Some(obj) = raw.and_then(Value::as_object) else {
        return Width::default();
    };
    let mode = obj
        .get("mode")
        .and_then(Value::as_str)
        .and_then(|m| WidthMode::from_name(m.trim()))
        .unwrap_or_default();
    let max = match mode {
        WidthMode::Auto => return Width::default(),
        WidthMode::Px => MAX_PX_WIDTH,
        WidthMode::Percent => MAX_PERCENT_WIDTH,
    };
    let value = obj.get("value").and_then(coerce_integer).unwrap_or(0).min(max);
    Width {
        mode,
        value: value as u32,
    }
}

/// Resolves a column reference (submitted id, kept id, or field key) to a kept id.
fn resolve_column(
    reference: &str,
    columns: &[ColumnDefinition],
    submitted_ids: &[(String, String)],
) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if let Some(col) = columns.iter().find(|c| c.id == reference) {
        return Some(col.id.clone());
    }
    if let Some((_, kept)) = submitted_ids.iter().find(|(raw, _)| raw == reference) {
        return Some(kept.clone());
    }
    columns
        .iter()
        .find(|c| c.field_key == reference)
        .map(|c| c.id.clone())
}

fn sanitize_list_settings(
    raw: &Map<String, Value>,
    columns: &[ColumnDefinition],
    submitted_ids: &[(String, String)],
) -> ListSettings {
    let default_sort = raw
        .get("default_sort")
        .and_then(Value::as_object)
        .and_then(|sort| {
            let column = sort
                .get("column")
                .and_then(Value::as_str)
                .and_then(|c| resolve_column(c, columns, submitted_ids))?;
            let order = sort
                .get("order")
                .and_then(Value::as_str)
                .and_then(SortOrder::from_name)
                .unwrap_or_default();
            Some(DefaultSort { column, order })
        });

    let primary_column = raw
        .get("primary_column")
        .and_then(Value::as_str)
        .and_then(|c| resolve_column(c, columns, submitted_ids));

    ListSettings {
        default_sort,
        primary_column,
    }
}
