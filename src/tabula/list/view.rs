//! The assembled list: headers, rendered rows, and filter controls.

use crate::host::EntityId;
use crate::model::{Scope, SortOrder};
use crate::render::fragment::{css_token, escape_attr, escape_text};
use crate::render::OutputMode;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub id: String,
    pub label: String,
    pub field_key: String,
    /// Inline width style; empty for automatic widths.
    pub width: String,
    pub primary: bool,
    pub sortable: bool,
    pub filterable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRow {
    pub id: EntityId,
    /// One rendered cell per header, in header order.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

/// A dropdown for one filterable column, populated from live values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterControl {
    pub column: String,
    pub label: String,
    pub options: Vec<FilterOption>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSort {
    pub column: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListView {
    pub scope: Scope,
    pub headers: Vec<ColumnHeader>,
    pub rows: Vec<ListRow>,
    pub filters: Vec<FilterControl>,
    pub sort: Option<ActiveSort>,
    #[serde(skip)]
    pub mode: OutputMode,
}

impl ListView {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row ids in display order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    /// Cells of the column with the given id, top to bottom.
    pub fn column(&self, id: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h.id == id)?;
        Some(
            self.rows
                .iter()
                .filter_map(|r| r.cells.get(index).map(String::as_str))
                .collect(),
        )
    }

    fn header_html(&self, header: &ColumnHeader) -> String {
        let active = self.sort.as_ref().filter(|s| s.column == header.id);
        let mut classes = vec![format!("column-{}", css_token(&header.id))];
        if header.primary {
            classes.push("column-primary".to_string());
        }
        if header.sortable {
            classes.push("sortable".to_string());
        }
        if let Some(sort) = active {
            classes.push(format!("sorted {}", sort.order.as_str()));
        }
        let style = if header.width.is_empty() {
            String::new()
        } else {
            format!(" style=\"{}\"", escape_attr(&header.width))
        };
        let label = escape_text(&header.label);
        let content = if header.sortable {
            let next = match active {
                Some(sort) if sort.order == SortOrder::Asc => SortOrder::Desc,
                _ => SortOrder::Asc,
            };
            format!(
                "<a href=\"?orderby={}&amp;order={}\">{}</a>",
                escape_attr(&header.id),
                next.as_str(),
                label
            )
        } else {
            label.into_owned()
        };
        format!(
            "<th scope=\"col\" class=\"{}\"{}>{}</th>",
            classes.join(" "),
            style,
            content
        )
    }

    fn filters_html(&self) -> String {
        let mut out = String::from("<form class=\"tabula-filters\" method=\"get\">");
        for control in &self.filters {
            out.push_str(&format!(
                "<label>{}<select name=\"filter[{}]\"><option value=\"\">All</option>",
                escape_text(&control.label),
                escape_attr(&control.column)
            ));
            for option in &control.options {
                let selected = if control.selected.as_deref() == Some(option.value.as_str()) {
                    " selected"
                } else {
                    ""
                };
                out.push_str(&format!(
                    "<option value=\"{}\"{}>{}</option>",
                    escape_attr(&option.value),
                    selected,
                    escape_text(&option.label)
                ));
            }
            out.push_str("</select></label>");
        }
        out.push_str("<button type=\"submit\">Filter</button></form>");
        out
    }

    /// The list as an HTML table, preceded by its filter form when any
    /// column is filterable.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if !self.filters.is_empty() {
            out.push_str(&self.filters_html());
        }
        out.push_str(&format!(
            "<table class=\"tabula-list tabula-{}\"><thead><tr>",
            css_token(self.scope.as_str())
        ));
        for header in &self.headers {
            out.push_str(&self.header_html(header));
        }
        out.push_str("</tr></thead><tbody>");

        if self.rows.is_empty() {
            out.push_str(&format!(
                "<tr class=\"no-items\"><td colspan=\"{}\">No items found.</td></tr>",
                self.headers.len().max(1)
            ));
        }
        for row in &self.rows {
            out.push_str(&format!("<tr data-id=\"{}\">", row.id));
            for (header, cell) in self.headers.iter().zip(&row.cells) {
                let cell = match self.mode {
                    OutputMode::Markup => cell.clone(),
                    OutputMode::Plain => escape_text(cell).into_owned(),
                };
                out.push_str(&format!(
                    "<td class=\"column-{}\" data-colname=\"{}\">{}</td>",
                    css_token(&header.id),
                    escape_attr(&header.label),
                    cell
                ));
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table>");
        out
    }
}
