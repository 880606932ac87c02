use crate::model::{
    ColumnConfiguration, ColumnDefinition, DefaultSort, DisplaySettings, ListSettings, Scope,
    SortOrder,
};

/// The configuration a scope uses until one is saved.
///
/// Title, author and date, newest first. Ids are fixed so default sort and
/// primary column references stay valid.
pub fn host_default(_scope: &Scope) -> ColumnConfiguration {
    ColumnConfiguration {
        columns: vec![
            ColumnDefinition::new("@title", "Title")
                .with_id("title")
                .sortable(),
            ColumnDefinition::new("@author", "Author")
                .with_id("author")
                .filterable(),
            ColumnDefinition::new("@date", "Date")
                .with_id("date")
                .sortable()
                .with_settings(DisplaySettings::new().with("date_format", "relative")),
        ],
        settings: ListSettings {
            default_sort: Some(DefaultSort {
                column: "date".to_string(),
                order: SortOrder::Desc,
            }),
            primary_column: Some("title".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_three_columns() {
        let config = host_default(&Scope::from("listing"));
        let keys: Vec<_> = config.columns.iter().map(|c| c.field_key.as_str()).collect();
        assert_eq!(keys, vec!["@title", "@author", "@date"]);
        assert_eq!(config.primary_column_id(), Some("title"));
    }
}
