//! # Query Modifier
//!
//! Translates sort and filter requests against logical fields into mutations
//! of a [`QueryDescriptor`]. Nothing here executes a query; the host does that
//! through [`crate::host::DataSource::query`].
//!
//! ## Sorting
//!
//! | Field | Ordering |
//! |-------|----------|
//! | `@title` | [`Ordering::Title`] (lexical) |
//! | other sortable `@` attributes | [`Ordering::Native`] |
//! | stored, nested pricing | [`Ordering::Raw`] plus a [`RawClause`] join |
//! | stored, other sortable types | [`Ordering::Meta`], numeric per `numeric_sort` |
//! | computed, or not sortable by type | unchanged |
//!
//! ## Filtering
//!
//! Quick filters ([`ActiveFilter`]) each add one predicate and always combine
//! with AND. The filter bar ([`FilterBar`]) supports the full operator set and
//! an all/any combinator. A request uses one or the other, never both.

mod descriptor;

pub use descriptor::{
    parse_number, CompareOp, Ordering, PathSegment, Predicate, QueryDescriptor, RawClause,
    Relation, Target, ENTITY_TABLE, META_TABLE,
};

use crate::catalog::ResolvedField;
use crate::fields::{FieldKind, FieldRef, NativeAttr};
use crate::host::PLAN_META_KEY;
use crate::model::SortOrder;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Applies a sort on `field`. Returns false when the field cannot be sorted.
pub fn apply_sort(query: &mut QueryDescriptor, field: &ResolvedField, order: SortOrder) -> bool {
    let caps = field.capabilities();
    if !caps.sortable {
        debug!(
            target: "tabula::query",
            field = %field.key(),
            "sort ignored: field is not sortable"
        );
        return false;
    }

    let ordering = match &field.field {
        FieldRef::Native(NativeAttr::Title) => Ordering::Title(order),
        FieldRef::Native(attr) => Ordering::Native {
            attr: attr.clone(),
            order,
        },
        FieldRef::Computed(_) => return false,
        FieldRef::Stored(_) => {
            let Some(key) = field.storage_key() else {
                return false;
            };
            if field.kind() == Some(FieldKind::PricingTiers) {
                query.raw = Some(RawClause::base_amount(key));
                Ordering::Raw(order)
            } else {
                Ordering::Meta {
                    key: key.to_string(),
                    numeric: caps.numeric_sort,
                    order,
                }
            }
        }
    };

    debug!(target: "tabula::query", field = %field.key(), ?ordering, "sort applied");
    query.order = Some(ordering);
    true
}

/// Normalizes a status filter value: display labels map to stored statuses.
pub fn status_key(value: &str) -> String {
    let value = value.trim().to_lowercase();
    match value.as_str() {
        "published" => "publish".to_string(),
        "scheduled" => "future".to_string(),
        "pending review" => "pending".to_string(),
        "trashed" => "trash".to_string(),
        _ => value,
    }
}

/// A quick filter selected from a column's filter control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveFilter {
    Status(String),
    Author(u64),
    Taxonomy { taxonomy: String, term_id: u64 },
    Plan(String),
    /// Metadata equality on a stored field.
    Field { storage_key: String, value: String },
}

impl ActiveFilter {
    /// Builds the quick filter for a column value. Returns `None` for blank
    /// values, unparsable ids, and fields that are not filterable by type.
    pub fn for_field(field: &ResolvedField, value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() || !field.capabilities().filterable {
            return None;
        }
        match &field.field {
            FieldRef::Native(NativeAttr::Status) => Some(ActiveFilter::Status(status_key(value))),
            FieldRef::Native(NativeAttr::Author) => value.parse().ok().map(ActiveFilter::Author),
            FieldRef::Native(NativeAttr::Terms(taxonomy)) => {
                value.parse().ok().map(|term_id| ActiveFilter::Taxonomy {
                    taxonomy: taxonomy.clone(),
                    term_id,
                })
            }
            FieldRef::Native(NativeAttr::Plan) => Some(ActiveFilter::Plan(value.to_string())),
            FieldRef::Native(_) | FieldRef::Computed(_) => None,
            FieldRef::Stored(_) => field.storage_key().map(|key| ActiveFilter::Field {
                storage_key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    fn predicate(&self) -> Predicate {
        match self {
            ActiveFilter::Status(status) => Predicate::Status(status.clone()),
            ActiveFilter::Author(id) => Predicate::Author(*id),
            ActiveFilter::Taxonomy { taxonomy, term_id } => Predicate::Term {
                taxonomy: taxonomy.clone(),
                term_id: *term_id,
            },
            ActiveFilter::Plan(plan) => Predicate::Compare {
                target: Target::Meta(PLAN_META_KEY.to_string()),
                op: CompareOp::Equals,
                value: plan.clone(),
                numeric: false,
            },
            ActiveFilter::Field { storage_key, value } => Predicate::Compare {
                target: Target::Meta(storage_key.clone()),
                op: CompareOp::Equals,
                value: value.clone(),
                numeric: false,
            },
        }
    }
}

/// Adds quick filters to the query. They always combine with AND.
pub fn apply_filter(query: &mut QueryDescriptor, filters: &[ActiveFilter]) {
    if filters.is_empty() {
        return;
    }
    query.relation = Relation::And;
    for filter in filters {
        debug!(target: "tabula::query", ?filter, "filter applied");
        query.predicates.push(filter.predicate());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// One condition of the filter bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Field key (`@status`, `price`) or column id.
    pub field: String,
    #[serde(alias = "operator")]
    pub op: CompareOp,
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub value: String,
}

/// The richer filter variant: operator rules combined by a match mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterBar {
    #[serde(default, rename = "match")]
    pub mode: MatchMode,
    #[serde(default)]
    pub rules: Vec<FilterRule>,
}

impl FilterBar {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn string_or_scalar<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if b { "1" } else { "0" }).to_string(),
        other => other.to_string(),
    })
}

/// Adds the filter bar's rules to the query, combined per its match mode.
///
/// `resolve` maps a rule's field reference to a resolved field. Rules that do
/// not resolve, target computed fields, or lack a required value are skipped.
pub fn apply_filter_bar<F>(query: &mut QueryDescriptor, bar: &FilterBar, resolve: F) -> usize
where
    F: Fn(&str) -> Option<ResolvedField>,
{
    let mut applied = 0;
    for rule in &bar.rules {
        if rule.op.needs_value() && rule.value.trim().is_empty() {
            continue;
        }
        let Some(field) = resolve(&rule.field) else {
            continue;
        };
        let target = match &field.field {
            FieldRef::Native(NativeAttr::Plan) => Target::Meta(PLAN_META_KEY.to_string()),
            FieldRef::Native(attr) => Target::Attribute(attr.clone()),
            FieldRef::Stored(_) => match field.storage_key() {
                Some(key) => Target::Meta(key.to_string()),
                None => continue,
            },
            FieldRef::Computed(_) => continue,
        };
        let numeric = field.capabilities().numeric_sort;
        let value = match &target {
            Target::Attribute(NativeAttr::Status) => status_key(&rule.value),
            _ => rule.value.trim().to_string(),
        };
        query.predicates.push(Predicate::Compare {
            target,
            op: rule.op,
            value,
            numeric,
        });
        applied += 1;
    }

    query.relation = match bar.mode {
        MatchMode::All => Relation::And,
        MatchMode::Any => Relation::Or,
    };
    debug!(target: "tabula::query", applied, mode = ?bar.mode, "filter bar applied");
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Computed, FIELD_TYPES};
    use crate::host::FieldDefinition;
    use crate::model::Scope;
    use serde_json::json;

    fn query() -> QueryDescriptor {
        QueryDescriptor::new(Scope::from("listing"))
    }

    #[test]
    fn title_sorts_lexically_by_title() {
        let mut q = query();
        assert!(apply_sort(&mut q, &ResolvedField::native(NativeAttr::Title), SortOrder::Asc));
        assert_eq!(q.order, Some(Ordering::Title(SortOrder::Asc)));
    }

    #[test]
    fn native_attributes_sort_natively() {
        let mut q = query();
        apply_sort(&mut q, &ResolvedField::native(NativeAttr::Date), SortOrder::Desc);
        assert_eq!(
            q.order,
            Some(Ordering::Native {
                attr: NativeAttr::Date,
                order: SortOrder::Desc
            })
        );
        assert!(q.raw.is_none());
    }

    #[test]
    fn unsortable_fields_leave_query_untouched() {
        let mut q = query();
        assert!(!apply_sort(&mut q, &ResolvedField::native(NativeAttr::Excerpt), SortOrder::Asc));
        assert!(!apply_sort(&mut q, &ResolvedField::computed(Computed::WordCount), SortOrder::Asc));
        let unknown = ResolvedField::stored(FieldDefinition::new("code", "Code", "mystery"));
        assert!(!apply_sort(&mut q, &unknown, SortOrder::Asc));
        assert_eq!(q, query());
    }

    #[test]
    fn pricing_sorts_through_raw_join() {
        let mut q = query();
        let price = ResolvedField::stored(FieldDefinition::new("price", "Price", "pricing_tiers"));
        apply_sort(&mut q, &price, SortOrder::Desc);
        assert_eq!(q.order, Some(Ordering::Raw(SortOrder::Desc)));
        assert_eq!(q.raw, Some(RawClause::base_amount("price")));
    }

    #[test]
    fn numeric_flag_selects_comparison_for_every_sortable_type() {
        for spec in FIELD_TYPES.iter().filter(|s| s.capabilities.sortable) {
            if spec.kind == FieldKind::PricingTiers {
                continue;
            }
            let mut q = query();
            let field = ResolvedField::stored(FieldDefinition::new("f", "F", spec.name));
            apply_sort(&mut q, &field, SortOrder::Asc);
            match q.order {
                Some(Ordering::Meta { numeric, .. }) => {
                    assert_eq!(numeric, spec.capabilities.numeric_sort, "type {}", spec.name)
                }
                other => panic!("type {} produced {:?}", spec.name, other),
            }
        }
    }

    #[test]
    fn storage_key_is_used_for_meta_ordering() {
        let mut def = FieldDefinition::new("guests", "Guests", "number");
        def.storage_key = Some("_guest_count".into());
        let mut q = query();
        apply_sort(&mut q, &ResolvedField::stored(def), SortOrder::Asc);
        assert_eq!(
            q.order,
            Some(Ordering::Meta {
                key: "_guest_count".into(),
                numeric: true,
                order: SortOrder::Asc
            })
        );
    }

    #[test]
    fn quick_filters_map_to_predicates() {
        let status = ActiveFilter::for_field(&ResolvedField::native(NativeAttr::Status), "draft");
        let author = ActiveFilter::for_field(&ResolvedField::native(NativeAttr::Author), "7");
        let terms = ActiveFilter::for_field(
            &ResolvedField::native(NativeAttr::Terms("region".into())),
            "12",
        );
        let plan = ActiveFilter::for_field(&ResolvedField::native(NativeAttr::Plan), "gold");

        let mut q = query();
        let filters: Vec<_> = [status, author, terms, plan].into_iter().flatten().collect();
        apply_filter(&mut q, &filters);

        assert_eq!(q.relation, Relation::And);
        assert_eq!(
            q.predicates,
            vec![
                Predicate::Status("draft".into()),
                Predicate::Author(7),
                Predicate::Term {
                    taxonomy: "region".into(),
                    term_id: 12
                },
                Predicate::Compare {
                    target: Target::Meta(PLAN_META_KEY.into()),
                    op: CompareOp::Equals,
                    value: "gold".into(),
                    numeric: false
                },
            ]
        );
    }

    #[test]
    fn quick_filter_rejects_blank_and_unfilterable() {
        assert!(ActiveFilter::for_field(&ResolvedField::native(NativeAttr::Status), " ").is_none());
        let author = ResolvedField::native(NativeAttr::Author);
        assert!(ActiveFilter::for_field(&author, "bob").is_none());
        assert!(ActiveFilter::for_field(&ResolvedField::native(NativeAttr::Title), "x").is_none());
        let unknown = ResolvedField::stored(FieldDefinition::new("code", "Code", "mystery"));
        assert!(ActiveFilter::for_field(&unknown, "x").is_none());
    }

    #[test]
    fn stored_quick_filter_is_meta_equality() {
        let field = ResolvedField::stored(FieldDefinition::new("kind", "Kind", "select"));
        let filter = ActiveFilter::for_field(&field, "villa").unwrap();
        assert_eq!(
            filter,
            ActiveFilter::Field {
                storage_key: "kind".into(),
                value: "villa".into()
            }
        );
    }

    #[test]
    fn status_filter_accepts_display_labels() {
        let filter =
            ActiveFilter::for_field(&ResolvedField::native(NativeAttr::Status), "Published");
        assert_eq!(filter, Some(ActiveFilter::Status("publish".into())));
        assert_eq!(status_key(" Scheduled "), "future");
        assert_eq!(status_key("draft"), "draft");
    }

    #[test]
    fn filter_bar_parses_and_combines() {
        let bar: FilterBar = serde_json::from_value(json!({
            "match": "any",
            "rules": [
                {"field": "@title", "op": "contains", "value": "view"},
                {"field": "guests", "op": ">=", "value": 4},
                {"field": "price", "op": "is_empty"},
                {"field": "@title", "op": "equals", "value": ""},
                {"field": "#word_count", "op": "gt", "value": "10"}
            ]
        }))
        .unwrap();

        let resolve = |key: &str| match key {
            "guests" => {
                let def = FieldDefinition::new("guests", "Guests", "number");
                Some(ResolvedField::stored(def))
            }
            "price" => Some(ResolvedField::unknown("price")),
            other => FieldRef::parse(other).map(|f| match f {
                FieldRef::Native(a) => ResolvedField::native(a),
                FieldRef::Computed(c) => ResolvedField::computed(c),
                FieldRef::Stored(k) => ResolvedField::unknown(k),
            }),
        };

        let mut q = query();
        let applied = apply_filter_bar(&mut q, &bar, resolve);
        assert_eq!(applied, 3);
        assert_eq!(q.relation, Relation::Or);
        assert_eq!(
            q.predicates[1],
            Predicate::Compare {
                target: Target::Meta("guests".into()),
                op: CompareOp::GreaterOrEqual,
                value: "4".into(),
                numeric: true
            }
        );
    }
}
