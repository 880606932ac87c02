//! # Export Pipeline
//!
//! Produces a header row plus data rows for a chosen, ordered set of columns
//! over the same filtered record set the list view shows. Cells go through the
//! renderer's plain output: stripped text, formatted dates, joined labels and
//! numeric amounts, never markup.
//!
//! Writing the file is left to the caller; [`ExportTable::to_delimited`]
//! serializes the table with the `csv` crate.

use crate::columns::ConfigStore;
use crate::error::{Result, TabulaError};
use crate::host::{HostContext, SettingsStore};
use crate::list::{ListController, ListRequest};
use crate::model::{ColumnDefinition, Scope};
use crate::render::RenderOptions;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::io;
use tracing::{debug, info};

/// An exported table and the filename it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub filename: String,
}

impl ExportTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the table as delimited text: the header row, then one record per row.
    pub fn write_delimited<W: io::Write>(&self, out: W, delimiter: u8) -> Result<()> {
        let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(out);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_delimited(&self, delimiter: u8) -> Result<String> {
        let mut buf = Vec::new();
        self.write_delimited(&mut buf, delimiter)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// `{scope}-export-{YYYY-MM-DD}.csv`, with the scope reduced to filename-safe characters.
pub fn suggested_filename(scope: &Scope, date: chrono::NaiveDate) -> String {
    let name: String = scope
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect();
    format!("{}-export-{}.csv", name, date.format("%Y-%m-%d"))
}

pub struct ExportPipeline<'a> {
    host: HostContext<'a>,
    store: &'a dyn SettingsStore,
    options: RenderOptions,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(
        host: HostContext<'a>,
        store: &'a dyn SettingsStore,
        options: RenderOptions,
    ) -> Self {
        Self { host, store, options }
    }

    /// Exports `column_ids` (in that order) for the records matching `params`.
    ///
    /// Ids that match no configured column are skipped; an empty selection
    /// exports every configured column.
    pub fn export(
        &self,
        scope: &Scope,
        column_ids: &[String],
        params: &ListRequest,
    ) -> Result<ExportTable> {
        if self.host.data.scope_info(scope).is_none() {
            return Err(TabulaError::UnknownScope(scope.to_string()));
        }

        let config = ConfigStore::new(self.store, self.host).load(scope)?;
        let controller =
            ListController::new(self.host, scope.clone(), config, self.options.clone());
        let configured = controller.configuration();

        let columns: Vec<&ColumnDefinition> = if column_ids.is_empty() {
            configured.columns.iter().collect()
        } else {
            column_ids
                .iter()
                .filter_map(|id| {
                    let found = configured
                        .column(id)
                        .or_else(|| configured.columns.iter().find(|c| &c.field_key == id));
                    if found.is_none() {
                        debug!(
                            target: "tabula::export",
                            %scope,
                            column = %id,
                            "unknown export column skipped"
                        );
                    }
                    found
                })
                .collect()
        };

        let renderer = controller.renderer();
        let fields: Vec<_> = columns
            .iter()
            .map(|c| renderer.catalog().resolve(&c.field_key))
            .collect();

        let query = controller.prepare_query(params);
        let rows: Vec<Vec<String>> = self
            .host
            .data
            .query(&query)
            .into_iter()
            .filter_map(|id| self.host.data.entity(id))
            .map(|entity| {
                columns
                    .iter()
                    .zip(&fields)
                    .map(|(column, field)| match field {
                        Some(field) => renderer
                            .fragment(field, &entity, &column.display_settings)
                            .to_plain(),
                        None => String::new(),
                    })
                    .collect()
            })
            .collect();

        let table = ExportTable {
            headers: columns.iter().map(|c| c.label.clone()).collect(),
            rows,
            filename: suggested_filename(scope, self.options.now.date()),
        };
        info!(
            target: "tabula::export",
            %scope,
            columns = table.headers.len(),
            rows = table.len(),
            "export built"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ConfigFixture;
    use crate::model::SortOrder;
    use crate::render::datetime::parse_datetime;

    fn options() -> RenderOptions {
        RenderOptions {
            now: parse_datetime("2024-06-01 12:00:00").unwrap(),
            ..RenderOptions::default()
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scenario_export_orders_columns_and_filters_rows() {
        let fixture = ConfigFixture::new().with_scenario();
        let pipeline = ExportPipeline::new(fixture.host.context(), &fixture.settings, options());
        let table = pipeline
            .export(
                &"listing".into(),
                &ids(&["price", "title"]),
                &ListRequest::new().filtered("status", "published"),
            )
            .unwrap();

        assert_eq!(table.headers, vec!["Price", "Title"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["320".to_string(), "City Studio".to_string()],
                vec!["95".to_string(), "Garden Cottage".to_string()],
                vec!["180".to_string(), "Harbour View Loft".to_string()],
            ]
        );
        assert_eq!(table.filename, "listing-export-2024-06-01.csv");
    }

    #[test]
    fn export_row_count_matches_list() {
        let fixture = ConfigFixture::new().with_scenario();
        let request = ListRequest::new().sorted_by("price", SortOrder::Desc);
        let table = ExportPipeline::new(fixture.host.context(), &fixture.settings, options())
            .export(&"listing".into(), &[], &request)
            .unwrap();
        let store = fixture.store();
        let host = fixture.host.context();
        let controller = ListController::load(&store, host, "listing".into(), options()).unwrap();
        assert_eq!(table.len(), controller.run(&request).len());
        assert_eq!(table.headers, vec!["Title", "Price", "Status"]);
        assert_eq!(table.rows[3], vec!["Mountain Cabin", "", "Draft"]);
    }

    #[test]
    fn unknown_columns_are_skipped() {
        let fixture = ConfigFixture::new().with_scenario();
        let table = ExportPipeline::new(fixture.host.context(), &fixture.settings, options())
            .export(&"listing".into(), &ids(&["nope", "status"]), &ListRequest::new())
            .unwrap();
        assert_eq!(table.headers, vec!["Status"]);
        assert!(table.rows.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn unknown_scope_is_an_error() {
        let fixture = ConfigFixture::new();
        let err = ExportPipeline::new(fixture.host.context(), &fixture.settings, options())
            .export(&"nowhere".into(), &[], &ListRequest::new())
            .unwrap_err();
        assert!(matches!(err, TabulaError::UnknownScope(s) if s == "nowhere"));
    }

    #[test]
    fn delimited_output_quotes_when_needed() {
        let table = ExportTable {
            headers: ids(&["Title", "Price"]),
            rows: vec![ids(&["Loft, with view", "180"]), ids(&["Say \"hi\"", ""])],
            filename: "x.csv".into(),
        };
        assert_eq!(
            table.to_delimited(b',').unwrap(),
            "Title,Price\n\"Loft, with view\",180\n\"Say \"\"hi\"\"\",\n"
        );
        assert_eq!(table.to_delimited(b';').unwrap().lines().next(), Some("Title;Price"));
    }

    #[test]
    fn filenames_are_sanitized() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            suggested_filename(&"my scope/x".into(), date),
            "my-scope-x-export-2024-01-02.csv"
        );
    }
}
