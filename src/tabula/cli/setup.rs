use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(version, about = "Configure, list and export content-type columns", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding saved column configurations and config.json
    /// (defaults to $TABULA_HOME, then the platform data directory)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Host content file (defaults to $TABULA_HOST, then <data-dir>/host.json)
    #[arg(long, global = true)]
    pub host: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Sort and filter parameters shared by `list` and `export`.
#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Column id (or field key) to sort by
    #[arg(long)]
    pub orderby: Option<String>,

    /// Sort direction: asc or desc
    #[arg(long)]
    pub order: Option<String>,

    /// Quick filter, as column=value (repeatable)
    #[arg(long = "filter", value_name = "COLUMN=VALUE")]
    pub filters: Vec<String>,

    /// Filter bar as JSON: {"match": "all", "rules": [...]}
    #[arg(long, value_name = "JSON")]
    pub filter_bar: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List content types that can be configured
    Scopes,

    /// List the fields available as columns for a content type
    Fields { scope: String },

    /// Show the column configuration of a content type
    #[command(alias = "cols")]
    Columns { scope: String },

    /// Save a column configuration (JSON) for a content type
    Save {
        scope: String,

        /// Configuration file (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Restore the host default columns for a content type
    Reset { scope: String },

    /// Render the list view of a content type
    #[command(alias = "ls")]
    List {
        scope: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Print the HTML table instead of plain text
        #[arg(long)]
        html: bool,
    },

    /// Export list rows as delimited text
    Export {
        scope: String,

        /// Column ids in output order, comma separated (all columns when omitted)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        #[command(flatten)]
        query: QueryArgs,

        /// Output file ("-" for stdout; defaults to the suggested filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., placeholder, date-format)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_export_columns_and_filters() {
        let cli = Cli::try_parse_from([
            "tabula",
            "export",
            "listing",
            "--columns",
            "price,title",
            "--filter",
            "status=published",
            "-o",
            "-",
        ])
        .unwrap();
        match cli.command {
            Commands::Export {
                scope,
                columns,
                query,
                output,
            } => {
                assert_eq!(scope, "listing");
                assert_eq!(columns, vec!["price", "title"]);
                assert_eq!(query.filters, vec!["status=published"]);
                assert_eq!(output, Some(PathBuf::from("-")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_options_follow_subcommands() {
        let args = ["tabula", "list", "listing", "--data-dir", "/tmp/x", "-v"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(cli.verbose);
    }

    #[test]
    fn scope_is_required() {
        assert!(Cli::try_parse_from(["tabula", "columns"]).is_err());
    }
}
