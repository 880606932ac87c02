//! # CLI Layer
//!
//! One possible client of the tabula library: an operator console over a host
//! content file. It is the only place that knows about terminal I/O, reads
//! environment variables, or installs a tracing subscriber.
//!
//! The CLI acts as an authenticated administrator. Each run mints a fresh
//! anti-forgery token and sends every admin call through [`AdminApi`], so the
//! same checks apply as for any other client.
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `init_context()`: Resolves the data directory, host file and config
//! - `handle_*()`: Per-command handlers that call the API and print output

use super::print::{
    print_columns, print_config, print_fields, print_list, print_message, print_scopes,
    MessageLevel,
};
use super::setup::{Cli, Commands, QueryArgs};
use clap::Parser;
use directories::ProjectDirs;
use serde_json::Value;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use tabula::api::{AdminApi, AdminSession, Credentials, ExportRequest, LoadedConfiguration};
use tabula::columns::ConfigStore;
use tabula::config::TabulaConfig;
use tabula::error::{Result, TabulaError};
use tabula::export::ExportTable;
use tabula::host::{FsSettings, MemoryHost, ScopeInfo, StaticToken};
use tabula::list::{ListController, ListRequest};
use tabula::model::{ColumnConfiguration, Scope, SortOrder};
use tabula::query::FilterBar;
use tabula::render::OutputMode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const HOME_ENV: &str = "TABULA_HOME";
const HOST_ENV: &str = "TABULA_HOST";
const HOST_FILENAME: &str = "host.json";
const SETTINGS_DIRNAME: &str = "settings";

struct AppContext {
    host: MemoryHost,
    settings: FsSettings,
    config: TabulaConfig,
    data_dir: PathBuf,
    session: AdminSession,
    tokens: StaticToken,
}

impl AppContext {
    fn api(&self) -> AdminApi<'_> {
        AdminApi::new(
            self.host.context(),
            &self.settings,
            &self.tokens,
            self.config.render_options(),
        )
    }

    fn creds(&self) -> Credentials<'_> {
        Credentials::new(&self.session, &self.tokens.0)
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let data_dir = resolve_data_dir(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Config { key, value } => handle_config(&data_dir, key, value),
        command => {
            let ctx = init_context(data_dir, cli.host)?;
            dispatch(&ctx, command)
        }
    }
}

fn dispatch(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Scopes => handle_scopes(ctx),
        Commands::Fields { scope } => handle_fields(ctx, scope.into()),
        Commands::Columns { scope } => handle_columns(ctx, scope.into()),
        Commands::Save { scope, file } => handle_save(ctx, scope.into(), file.as_deref()),
        Commands::Reset { scope } => handle_reset(ctx, scope.into()),
        Commands::List { scope, query, html } => handle_list(ctx, scope.into(), &query, html),
        Commands::Export {
            scope,
            columns,
            query,
            output,
        } => handle_export(ctx, scope.into(), columns, &query, output.as_deref()),
        Commands::Config { key, value } => handle_config(&ctx.data_dir, key, value),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("tabula=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn resolve_data_dir(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "tabula", "tabula")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| TabulaError::Api("Could not determine data directory".into()))
}

fn init_context(data_dir: PathBuf, host: Option<PathBuf>) -> Result<AppContext> {
    let host_path = host
        .or_else(|| std::env::var_os(HOST_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| data_dir.join(HOST_FILENAME));

    if !host_path.exists() {
        return Err(TabulaError::Api(format!(
            "Host file not found: {} (use --host or ${})",
            host_path.display(),
            HOST_ENV
        )));
    }
    let host = MemoryHost::load(&host_path)?;
    let config = TabulaConfig::load(&data_dir)?;
    debug!(
        target: "tabula::cli",
        data_dir = %data_dir.display(),
        host = %host_path.display(),
        "context ready"
    );

    Ok(AppContext {
        host,
        settings: FsSettings::new(data_dir.join(SETTINGS_DIRNAME)),
        config,
        data_dir,
        session: AdminSession::administrator(),
        tokens: StaticToken(Uuid::new_v4().to_string()),
    })
}

fn handle_scopes(ctx: &AppContext) -> Result<()> {
    let scopes: Vec<ScopeInfo> = ctx.api().scopes(ctx.creds()).data_as()?;
    print_scopes(&scopes);
    Ok(())
}

fn handle_fields(ctx: &AppContext, scope: Scope) -> Result<()> {
    let fields: Value = ctx.api().fields(ctx.creds(), &scope).data_as()?;
    print_fields(&fields);
    Ok(())
}

fn handle_columns(ctx: &AppContext, scope: Scope) -> Result<()> {
    let loaded: LoadedConfiguration = ctx.api().load(ctx.creds(), &scope).data_as()?;
    print_columns(&loaded);
    Ok(())
}

fn handle_save(ctx: &AppContext, scope: Scope, file: Option<&Path>) -> Result<()> {
    let content = match file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            if io::stdin().is_terminal() {
                return Err(TabulaError::Api(
                    "No configuration given: pass a file or pipe JSON on stdin".into(),
                ));
            }
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let raw: Value = serde_json::from_str(&content)?;

    let saved: ColumnConfiguration = ctx.api().save(ctx.creds(), &scope, &raw).data_as()?;
    print_message(
        MessageLevel::Success,
        &format!("Saved {} column(s) for {}.", saved.columns.len(), scope),
    );
    Ok(())
}

fn handle_reset(ctx: &AppContext, scope: Scope) -> Result<()> {
    let _: ColumnConfiguration = ctx.api().restore(ctx.creds(), &scope).data_as()?;
    print_message(
        MessageLevel::Success,
        &format!("Restored default columns for {}.", scope),
    );
    Ok(())
}

fn handle_list(ctx: &AppContext, scope: Scope, query: &QueryArgs, html: bool) -> Result<()> {
    let request = list_request(query)?;
    let host = ctx.host.context();
    if host.data.scope_info(&scope).is_none() {
        return Err(TabulaError::UnknownScope(scope.to_string()));
    }

    let store = ConfigStore::new(&ctx.settings, host);
    let controller = ListController::load(&store, host, scope, ctx.config.render_options())?;
    if html {
        println!("{}", controller.run_as(&request, OutputMode::Markup).to_html());
    } else {
        print_list(&controller.run_as(&request, OutputMode::Plain));
    }
    Ok(())
}

fn handle_export(
    ctx: &AppContext,
    scope: Scope,
    columns: Vec<String>,
    query: &QueryArgs,
    output: Option<&Path>,
) -> Result<()> {
    let request = ExportRequest {
        columns,
        params: list_request(query)?,
    };
    let table: ExportTable = ctx.api().export(ctx.creds(), &scope, &request).data_as()?;
    let delimiter = ctx.config.delimiter_byte();

    match output {
        Some(path) if path == Path::new("-") => {
            table.write_delimited(io::stdout().lock(), delimiter)
        }
        _ => {
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(&table.filename));
            table.write_delimited(fs::File::create(&path)?, delimiter)?;
            print_message(
                MessageLevel::Success,
                &format!("Exported {} row(s) to {}", table.len(), path.display()),
            );
            Ok(())
        }
    }
}

fn handle_config(data_dir: &Path, key: Option<String>, value: Option<String>) -> Result<()> {
    let mut config = TabulaConfig::load(data_dir)?;
    match (key, value) {
        (None, _) => print_config(&config),
        (Some(key), None) => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => return Err(TabulaError::Api(format!("Unknown config key: {}", key))),
        },
        (Some(key), Some(value)) => {
            config.set(&key, &value)?;
            config.save(data_dir)?;
            print_message(MessageLevel::Success, &format!("{} = {:?}", key, value));
        }
    }
    Ok(())
}

/// Builds a list request from command-line sort and filter options.
fn list_request(args: &QueryArgs) -> Result<ListRequest> {
    let mut request = ListRequest::new();
    request.orderby = args.orderby.clone();
    if let Some(order) = &args.order {
        request.order = Some(
            SortOrder::from_name(order)
                .ok_or_else(|| TabulaError::Api(format!("Invalid sort order: {}", order)))?,
        );
    }
    for filter in &args.filters {
        let (column, value) = filter
            .split_once('=')
            .filter(|(column, _)| !column.trim().is_empty())
            .ok_or_else(|| {
                TabulaError::Api(format!(
                    "Invalid filter '{}': expected COLUMN=VALUE",
                    filter
                ))
            })?;
        request = request.filtered(column.trim(), value.trim());
    }
    if let Some(raw) = &args.filter_bar {
        let bar: FilterBar = serde_json::from_str(raw)?;
        request = request.with_filter_bar(bar);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_request_from_args() {
        let args = QueryArgs {
            orderby: Some("price".into()),
            order: Some("DESC".into()),
            filters: vec!["status=published".into(), "region = 10".into()],
            filter_bar: None,
        };
        let request = list_request(&args).unwrap();
        assert_eq!(request.orderby.as_deref(), Some("price"));
        assert_eq!(request.order, Some(SortOrder::Desc));
        assert_eq!(request.filters.get("status").map(String::as_str), Some("published"));
        assert_eq!(request.filters.get("region").map(String::as_str), Some("10"));
    }

    #[test]
    fn list_request_rejects_bad_input() {
        let bad_filter = QueryArgs {
            filters: vec!["status".into()],
            ..QueryArgs::default()
        };
        assert!(list_request(&bad_filter).is_err());

        let bad_order = QueryArgs {
            order: Some("sideways".into()),
            ..QueryArgs::default()
        };
        assert!(list_request(&bad_order).is_err());
    }

    #[test]
    fn list_request_parses_filter_bar() {
        let args = QueryArgs {
            filter_bar: Some(r#"{"match": "any", "rules": []}"#.into()),
            ..QueryArgs::default()
        };
        assert!(list_request(&args).unwrap().filter_bar.is_some());
    }

    #[test]
    fn data_dir_flag_wins() {
        let dir = resolve_data_dir(Some(Path::new("/tmp/tabula-data"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/tabula-data"));
    }
}
