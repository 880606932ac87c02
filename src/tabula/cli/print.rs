use colored::Colorize;
use serde_json::Value;
use tabula::api::LoadedConfiguration;
use tabula::config::TabulaConfig;
use tabula::host::ScopeInfo;
use tabula::list::ListView;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const MAX_CELL_WIDTH: usize = 40;
const COLUMN_GAP: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MessageLevel {
    Info,
    Success,
    Warning,
}

pub(super) fn print_message(level: MessageLevel, content: &str) {
    match level {
        MessageLevel::Info => println!("{}", content.dimmed()),
        MessageLevel::Success => println!("{}", content.green()),
        MessageLevel::Warning => println!("{}", content.yellow()),
    }
}

pub(super) fn print_scopes(scopes: &[ScopeInfo]) {
    if scopes.is_empty() {
        print_message(MessageLevel::Info, "No content types found.");
        return;
    }
    let rows: Vec<Vec<String>> = scopes
        .iter()
        .map(|s| vec![s.scope.to_string(), s.label.clone(), s.taxonomies.join(", ")])
        .collect();
    print_table(&["Scope", "Label", "Taxonomies"], &rows);
}

/// Prints the grouped field listing returned by the admin API.
pub(super) fn print_fields(fields: &Value) {
    let groups = [
        ("type_fields", "Fields"),
        ("host_attributes", "Attributes"),
        ("add_on_fields", "Add-on fields"),
    ];
    for (key, title) in groups {
        let Some(items) = fields.get(key).and_then(Value::as_array) else {
            continue;
        };
        if items.is_empty() {
            continue;
        }
        println!("{}", title.bold());
        let rows: Vec<Vec<String>> = items
            .iter()
            .map(|f| {
                let flag = |name: &str| f["capabilities"][name].as_bool().unwrap_or(false);
                let mut caps = Vec::new();
                if flag("sortable") {
                    caps.push(if flag("numeric_sort") { "sort(numeric)" } else { "sort" });
                }
                if flag("filterable") {
                    caps.push("filter");
                }
                vec![
                    f["key"].as_str().unwrap_or_default().to_string(),
                    f["label"].as_str().unwrap_or_default().to_string(),
                    f["type"].as_str().unwrap_or_default().to_string(),
                    caps.join(" "),
                ]
            })
            .collect();
        print_table(&["Key", "Label", "Type", "Capabilities"], &rows);
        println!();
    }
}

pub(super) fn print_columns(loaded: &LoadedConfiguration) {
    let config = &loaded.configuration;
    let primary = config.primary_column_id();
    let rows: Vec<Vec<String>> = config
        .columns
        .iter()
        .map(|c| {
            let mut flags = Vec::new();
            if Some(c.id.as_str()) == primary {
                flags.push("primary");
            }
            if c.sortable {
                flags.push("sortable");
            }
            if c.filterable {
                flags.push("filterable");
            }
            vec![
                c.id.clone(),
                c.field_key.clone(),
                c.label.clone(),
                c.width.css(),
                flags.join(" "),
            ]
        })
        .collect();
    print_table(&["Id", "Field", "Label", "Width", "Flags"], &rows);

    if let Some(sort) = &config.settings.default_sort {
        print_message(
            MessageLevel::Info,
            &format!("Default sort: {} {}", sort.column, sort.order.as_str()),
        );
    }
    if !loaded.customized {
        print_message(MessageLevel::Info, "Showing the host default columns.");
    }
}

pub(super) fn print_list(view: &ListView) {
    if view.is_empty() {
        print_message(MessageLevel::Info, "No items found.");
        return;
    }
    let headers: Vec<String> = view
        .headers
        .iter()
        .map(|h| match &view.sort {
            Some(sort) if sort.column == h.id => format!("{} ({})", h.label, sort.order.as_str()),
            _ => h.label.clone(),
        })
        .collect();
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = view.rows.iter().map(|r| r.cells.clone()).collect();
    print_table(&header_refs, &rows);
}

pub(super) fn print_config(config: &TabulaConfig) {
    for key in TabulaConfig::KEYS {
        let value = config.get(key).unwrap_or_default();
        println!("{} = {:?}", key, value);
    }
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let lines = render_table(headers, rows);
    let mut lines = lines.into_iter();
    if let Some(header) = lines.next() {
        println!("{}", header.bold());
    }
    for line in lines {
        println!("{}", line);
    }
}

/// Aligns cells into columns sized by display width. The first line is the header.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width().min(MAX_CELL_WIDTH)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(single_line(cell).width().min(MAX_CELL_WIDTH));
        }
    }

    let format_row = |cells: Vec<String>| -> String {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let cell = truncate_to_width(cells.get(i).map(String::as_str).unwrap_or(""), width);
                let padding = width.saturating_sub(cell.width());
                format!("{}{}", cell, " ".repeat(padding))
            })
            .collect();
        padded.join(COLUMN_GAP).trim_end().to_string()
    };

    let mut out = vec![format_row(headers.iter().map(|h| h.to_string()).collect())];
    out.extend(
        rows.iter()
            .map(|row| format_row(row.iter().map(|c| single_line(c)).collect())),
    );
    out
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_by_display_width() {
        let rows = vec![
            vec!["Café".to_string(), "1".to_string()],
            vec!["Harbour View Loft".to_string(), "180".to_string()],
        ];
        let lines = render_table(&["Title", "Price"], &rows);
        assert_eq!(lines[0], "Title              Price");
        assert_eq!(lines[1], "Café               1");
        assert_eq!(lines[2], "Harbour View Loft  180");
    }

    #[test]
    fn long_cells_are_truncated() {
        let long = "x".repeat(60);
        let lines = render_table(&["A"], &[vec![long]]);
        assert_eq!(lines[1].width(), MAX_CELL_WIDTH);
        assert!(lines[1].ends_with('…'));
    }

    #[test]
    fn multiline_cells_collapse() {
        let lines = render_table(&["A"], &[vec!["one\ntwo".to_string()]]);
        assert_eq!(lines[1], "one two");
    }
}
