//! # List-View Controller
//!
//! Orchestrates one list request for one scope:
//!
//! 1. Resolve the scope's [`ColumnConfiguration`]. An empty configuration
//!    means the host default columns.
//! 2. Build headers from the configured columns.
//! 3. Register the sortable subset: columns flagged sortable whose field type
//!    can actually be sorted.
//! 4. Translate the request's sort and filters into a [`QueryDescriptor`]
//!    through the query modifier. A request without a usable sort gets the
//!    configuration's default sort.
//! 5. Render every row×column cell through the [`Renderer`].
//! 6. Build filter controls for filterable columns from the host's live
//!    values.
//!
//! The controller holds no state between requests; running the same request
//! twice yields the same view.

mod view;

pub use view::{ActiveSort, ColumnHeader, FilterControl, FilterOption, ListRow, ListView};

use crate::catalog::ResolvedField;
use crate::columns::{host_default, ConfigStore};
use crate::error::Result;
use crate::fields::{title_case, FieldRef, NativeAttr};
use crate::host::{Entity, EntityId, HostContext, PLAN_META_KEY};
use crate::model::{ColumnConfiguration, ColumnDefinition, Scope, SortOrder};
use crate::query::{
    apply_filter, apply_filter_bar, apply_sort, ActiveFilter, FilterBar, QueryDescriptor, Target,
};
use crate::render::{status_label, Fragment, OutputMode, RenderOptions, Renderer};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Sort and filter parameters of one list request.
///
/// Columns are referenced by id; field keys are accepted as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub orderby: Option<String>,
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: Option<SortOrder>,
    /// Quick filters: column → selected value.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    /// Takes precedence over `filters` when present and non-empty.
    #[serde(default)]
    pub filter_bar: Option<FilterBar>,
}

fn lenient_order<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<SortOrder>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(SortOrder::from_name))
}

impl ListRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sorted_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.orderby = Some(column.into());
        self.order = Some(order);
        self
    }

    pub fn filtered(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(column.into(), value.into());
        self
    }

    pub fn with_filter_bar(mut self, bar: FilterBar) -> Self {
        self.filter_bar = Some(bar);
        self
    }
}

/// A configured column with its field resolved for the scope.
struct BoundColumn {
    def: ColumnDefinition,
    field: Option<ResolvedField>,
}

impl BoundColumn {
    /// Sortable only when both the stored flag and the field type allow it.
    fn is_sortable(&self) -> bool {
        self.def.sortable && self.field.as_ref().is_some_and(|f| f.capabilities().sortable)
    }

    fn is_filterable(&self) -> bool {
        self.def.filterable && self.field.as_ref().is_some_and(|f| f.capabilities().filterable)
    }
}

pub struct ListController<'a> {
    host: HostContext<'a>,
    scope: Scope,
    config: ColumnConfiguration,
    columns: Vec<BoundColumn>,
    renderer: Renderer<'a>,
}

impl<'a> ListController<'a> {
    pub fn new(
        host: HostContext<'a>,
        scope: Scope,
        config: ColumnConfiguration,
        options: RenderOptions,
    ) -> Self {
        let config = if config.is_empty() {
            host_default(&scope)
        } else {
            config
        };
        let renderer = Renderer::new(host, scope.clone(), options);
        let columns = config
            .columns
            .iter()
            .map(|def| BoundColumn {
                field: renderer.catalog().resolve(&def.field_key),
                def: def.clone(),
            })
            .collect();
        Self {
            host,
            scope,
            config,
            columns,
            renderer,
        }
    }

    /// A controller for the scope's stored configuration.
    pub fn load(
        store: &ConfigStore<'_>,
        host: HostContext<'a>,
        scope: Scope,
        options: RenderOptions,
    ) -> Result<Self> {
        let config = store.load(&scope)?;
        Ok(Self::new(host, scope, config, options))
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn configuration(&self) -> &ColumnConfiguration {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer<'a> {
        &self.renderer
    }

    /// A column by id, falling back to the first column with that field key.
    fn find_column(&self, key: &str) -> Option<&BoundColumn> {
        let key = key.trim();
        self.columns
            .iter()
            .find(|c| c.def.id == key)
            .or_else(|| self.columns.iter().find(|c| c.def.field_key == key))
    }

    pub fn headers(&self) -> Vec<ColumnHeader> {
        let primary = self.config.primary_column_id();
        self.columns
            .iter()
            .map(|c| ColumnHeader {
                id: c.def.id.clone(),
                label: c.def.label.clone(),
                field_key: c.def.field_key.clone(),
                width: c.def.width.css(),
                primary: primary == Some(c.def.id.as_str()),
                sortable: c.is_sortable(),
                filterable: c.is_filterable(),
            })
            .collect()
    }

    /// Sortable columns: column id → field key.
    pub fn sortable_columns(&self) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .filter(|c| c.is_sortable())
            .map(|c| (c.def.id.clone(), c.def.field_key.clone()))
            .collect()
    }

    /// The sort a request ends up with: the requested sortable column, or the
    /// configured default.
    fn resolve_sort(&self, request: &ListRequest) -> Option<(&BoundColumn, SortOrder)> {
        if let Some(key) = request.orderby.as_deref().filter(|k| !k.trim().is_empty()) {
            match self.find_column(key).filter(|c| c.is_sortable()) {
                Some(column) => return Some((column, request.order.unwrap_or_default())),
                None => debug!(
                    target: "tabula::list",
                    scope = %self.scope,
                    orderby = key,
                    "requested sort not available"
                ),
            }
        }
        let default = self.config.settings.default_sort.as_ref()?;
        let column = self.columns.iter().find(|c| c.def.id == default.column)?;
        Some((column, default.order))
    }

    /// Field a filter-bar rule refers to: a configured column (by id or field
    /// key) or any host attribute. Fields the store cannot query are skipped.
    fn filter_bar_field(&self, key: &str) -> Option<ResolvedField> {
        let field = match self.find_column(key) {
            Some(column) => column.field.clone()?,
            None => match FieldRef::parse(key)? {
                FieldRef::Native(attr) => ResolvedField::native(attr),
                _ => return None,
            },
        };
        let caps = field.capabilities();
        (caps.filterable || caps.sortable).then_some(field)
    }

    /// Translates a request into a query descriptor. Never executes it.
    pub fn prepare_query(&self, request: &ListRequest) -> QueryDescriptor {
        let mut query = QueryDescriptor::new(self.scope.clone());

        if let Some((column, order)) = self.resolve_sort(request) {
            if let Some(field) = &column.field {
                apply_sort(&mut query, field, order);
            }
        }

        match request.filter_bar.as_ref().filter(|bar| !bar.is_empty()) {
            Some(bar) => {
                if !request.filters.is_empty() {
                    debug!(
                        target: "tabula::list",
                        scope = %self.scope,
                        "filter bar present, quick filters ignored"
                    );
                }
                apply_filter_bar(&mut query, bar, |key| self.filter_bar_field(key));
            }
            None => {
                let filters: Vec<ActiveFilter> = request
                    .filters
                    .iter()
                    .filter_map(|(key, value)| {
                        let column = self.find_column(key).filter(|c| c.is_filterable())?;
                        ActiveFilter::for_field(column.field.as_ref()?, value)
                    })
                    .collect();
                apply_filter(&mut query, &filters);
            }
        }

        query
    }

    fn cell(&self, column: &BoundColumn, entity: &Entity, mode: OutputMode) -> String {
        let fragment = match &column.field {
            Some(field) => self.renderer.fragment(field, entity, &column.def.display_settings),
            None => Fragment::Empty,
        };
        self.renderer.output(&fragment, mode)
    }

    /// Renders one cell by column id. Unknown columns and entities render the placeholder.
    pub fn render_cell(&self, column_id: &str, entity_id: EntityId) -> String {
        match (self.find_column(column_id), self.host.data.entity(entity_id)) {
            (Some(column), Some(entity)) => self.cell(column, &entity, OutputMode::Markup),
            _ => self.renderer.output(&Fragment::Empty, OutputMode::Markup),
        }
    }

    fn filter_target(field: &ResolvedField) -> Option<Target> {
        match &field.field {
            FieldRef::Native(NativeAttr::Plan) => Some(Target::Meta(PLAN_META_KEY.to_string())),
            FieldRef::Native(attr)
                if matches!(attr, NativeAttr::Status | NativeAttr::Author | NativeAttr::Terms(_)) =>
            {
                Some(Target::Attribute(attr.clone()))
            }
            FieldRef::Native(_) | FieldRef::Computed(_) => None,
            FieldRef::Stored(_) => field.storage_key().map(|k| Target::Meta(k.to_string())),
        }
    }

    fn option_label(&self, field: &ResolvedField, value: &str) -> String {
        let id = || value.parse::<u64>().ok();
        let label = match &field.field {
            FieldRef::Native(NativeAttr::Status) => Some(status_label(value)),
            FieldRef::Native(NativeAttr::Author) => id()
                .and_then(|id| self.host.data.user(id))
                .map(|u| u.name().to_string()),
            FieldRef::Native(NativeAttr::Terms(_)) => id()
                .and_then(|id| self.host.data.term(id))
                .map(|t| t.name),
            FieldRef::Native(NativeAttr::Plan) => Some(title_case(value)),
            FieldRef::Stored(_) => field
                .definition
                .as_ref()
                .and_then(|d| d.choice_label(value))
                .map(String::from),
            _ => None,
        };
        label.unwrap_or_else(|| value.to_string())
    }

    /// Filter dropdowns for filterable columns. Columns without any live value are omitted.
    pub fn filter_controls(&self, request: &ListRequest) -> Vec<FilterControl> {
        self.columns
            .iter()
            .filter(|c| c.is_filterable())
            .filter_map(|c| {
                let field = c.field.as_ref()?;
                let target = Self::filter_target(field)?;
                let options: Vec<FilterOption> = self
                    .host
                    .data
                    .distinct_values(&self.scope, &target)
                    .into_iter()
                    .map(|value| FilterOption {
                        label: self.option_label(field, &value),
                        value,
                    })
                    .collect();
                if options.is_empty() {
                    return None;
                }
                let selected = request
                    .filters
                    .get(&c.def.id)
                    .or_else(|| request.filters.get(&c.def.field_key))
                    .cloned();
                Some(FilterControl {
                    column: c.def.id.clone(),
                    label: c.def.label.clone(),
                    options,
                    selected,
                })
            })
            .collect()
    }

    /// Runs a request, rendering cells as markup.
    pub fn run(&self, request: &ListRequest) -> ListView {
        self.run_as(request, OutputMode::Markup)
    }

    pub fn run_as(&self, request: &ListRequest, mode: OutputMode) -> ListView {
        let query = self.prepare_query(request);
        let rows: Vec<ListRow> = self
            .host
            .data
            .query(&query)
            .into_iter()
            .filter_map(|id| self.host.data.entity(id))
            .map(|entity| ListRow {
                id: entity.id,
                cells: self.columns.iter().map(|c| self.cell(c, &entity, mode)).collect(),
            })
            .collect();
        debug!(target: "tabula::list", scope = %self.scope, rows = rows.len(), "list rendered");

        ListView {
            scope: self.scope.clone(),
            headers: self.headers(),
            rows,
            filters: self.filter_controls(request),
            sort: self.resolve_sort(request).map(|(column, order)| ActiveSort {
                column: column.def.id.clone(),
                order,
            }),
            mode,
        }
    }
}
