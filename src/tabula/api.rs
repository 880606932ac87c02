//! # Admin API
//!
//! The administrative surface of the engine: a thin facade over the column
//! configuration store, the field catalogue and the export pipeline. It serves
//! every UI the same way (the bundled CLI, or an HTTP handler in a host).
//!
//! ## Request checks
//!
//! Every call is checked in order before any work happens:
//!
//! 1. the [`AdminSession`] must be authenticated,
//! 2. it must hold [`MANAGE_CAPABILITY`],
//! 3. the anti-forgery token must verify for the call's action name.
//!
//! A failed check, or any error from the layers below, becomes a structured
//! failure ([`AdminResponse::failure`]) carrying [`TabulaError::code`]. No
//! mutation happens on a failed call.
//!
//! ## Responses
//!
//! Successful calls return their payload serialized into `data`. Nothing here
//! writes to stdout or formats text; presentation belongs to the caller.

use crate::catalog::{AvailableFields, FieldCatalog};
use crate::columns::ConfigStore;
use crate::error::{Result, TabulaError};
use crate::export::{ExportPipeline, ExportTable};
use crate::host::{HostContext, ScopeInfo, SettingsStore, TokenVerifier};
use crate::list::ListRequest;
use crate::model::{ColumnConfiguration, Scope};
use crate::render::RenderOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Capability an administrative session needs for every call.
pub const MANAGE_CAPABILITY: &str = "manage_options";

/// Action names the anti-forgery token is checked against.
pub mod actions {
    pub const SCOPES: &str = "tabula_scopes";
    pub const FIELDS: &str = "tabula_fields";
    pub const LOAD: &str = "tabula_load";
    pub const SAVE: &str = "tabula_save";
    pub const RESTORE: &str = "tabula_restore";
    pub const EXPORT: &str = "tabula_export";
}

/// The caller's session as established by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    pub authenticated: bool,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl AdminSession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated session holding the given capabilities.
    pub fn with_capabilities(capabilities: &[&str]) -> Self {
        Self {
            authenticated: true,
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// An authenticated session allowed to manage columns.
    pub fn administrator() -> Self {
        Self::with_capabilities(&[MANAGE_CAPABILITY])
    }

    pub fn can(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Session plus the anti-forgery token sent with a request.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'r> {
    pub session: &'r AdminSession,
    pub token: &'r str,
}

impl<'r> Credentials<'r> {
    pub fn new(session: &'r AdminSession, token: &'r str) -> Self {
        Self { session, token }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFailure {
    pub code: String,
    pub message: String,
}

/// Uniform response envelope for every admin call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiFailure>,
}

impl AdminResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(err: &TabulaError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiFailure {
                code: err.code().to_string(),
                message: err.to_string(),
            }),
        }
    }

    /// The failure code, if this is a failure.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    /// Deserializes the payload of a successful response.
    pub fn data_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        match (&self.error, &self.data) {
            (Some(failure), _) => Err(TabulaError::Api(failure.message.clone())),
            (None, Some(data)) => Ok(serde_json::from_value(data.clone())?),
            (None, None) => Ok(serde_json::from_value(Value::Null)?),
        }
    }
}

/// Payload of [`AdminApi::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedConfiguration {
    pub configuration: ColumnConfiguration,
    /// False when the scope is showing the host default.
    pub customized: bool,
}

/// Body of an export call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub params: ListRequest,
}

pub struct AdminApi<'a> {
    host: HostContext<'a>,
    store: &'a dyn SettingsStore,
    tokens: &'a dyn TokenVerifier,
    options: RenderOptions,
}

impl<'a> AdminApi<'a> {
    pub fn new(
        host: HostContext<'a>,
        store: &'a dyn SettingsStore,
        tokens: &'a dyn TokenVerifier,
        options: RenderOptions,
    ) -> Self {
        Self {
            host,
            store,
            tokens,
            options,
        }
    }

    /// Content types eligible for column configuration.
    pub fn scopes(&self, creds: Credentials<'_>) -> AdminResponse {
        self.respond(actions::SCOPES, creds, || Ok(self.host.data.scopes()))
    }

    /// Fields a column in `scope` may reference, grouped by origin.
    pub fn fields(&self, creds: Credentials<'_>, scope: &Scope) -> AdminResponse {
        self.respond(actions::FIELDS, creds, || -> Result<AvailableFields> {
            self.require_scope(scope)?;
            Ok(FieldCatalog::new(self.host, scope.clone()).available())
        })
    }

    pub fn load(&self, creds: Credentials<'_>, scope: &Scope) -> AdminResponse {
        self.respond(actions::LOAD, creds, || {
            self.require_scope(scope)?;
            let store = self.config_store();
            let saved = store.load_saved(scope)?;
            let customized = saved.is_some();
            Ok(LoadedConfiguration {
                configuration: match saved {
                    Some(config) => config,
                    None => store.load(scope)?,
                },
                customized,
            })
        })
    }

    /// Sanitizes and persists `raw`, returning what was stored.
    pub fn save(&self, creds: Credentials<'_>, scope: &Scope, raw: &Value) -> AdminResponse {
        self.respond(actions::SAVE, creds, || {
            self.require_scope(scope)?;
            self.config_store().save(scope, raw)
        })
    }

    /// Drops the saved configuration; the scope shows the host default again.
    pub fn restore(&self, creds: Credentials<'_>, scope: &Scope) -> AdminResponse {
        self.respond(actions::RESTORE, creds, || {
            self.require_scope(scope)?;
            self.config_store().restore_defaults(scope)?;
            Ok(self.config_store().load(scope)?)
        })
    }

    pub fn export(
        &self,
        creds: Credentials<'_>,
        scope: &Scope,
        request: &ExportRequest,
    ) -> AdminResponse {
        self.respond(actions::EXPORT, creds, || -> Result<ExportTable> {
            ExportPipeline::new(self.host, self.store, self.options.clone()).export(
                scope,
                &request.columns,
                &request.params,
            )
        })
    }

    fn config_store(&self) -> ConfigStore<'a> {
        ConfigStore::new(self.store, self.host)
    }

    fn require_scope(&self, scope: &Scope) -> Result<ScopeInfo> {
        self.host
            .data
            .scope_info(scope)
            .ok_or_else(|| TabulaError::UnknownScope(scope.to_string()))
    }

    fn authorize(&self, action: &str, creds: Credentials<'_>) -> Result<()> {
        if !creds.session.authenticated {
            return Err(TabulaError::Unauthorized);
        }
        if !creds.session.can(MANAGE_CAPABILITY) {
            return Err(TabulaError::Forbidden(format!(
                "{} requires the {} capability",
                action, MANAGE_CAPABILITY
            )));
        }
        if !self.tokens.verify(action, creds.token) {
            return Err(TabulaError::InvalidToken);
        }
        Ok(())
    }

    fn respond<T, F>(&self, action: &str, creds: Credentials<'_>, call: F) -> AdminResponse
    where
        T: Serialize,
        F: FnOnce() -> Result<T>,
    {
        let outcome = self
            .authorize(action, creds)
            .and_then(|_| call())
            .and_then(|data| Ok(serde_json::to_value(data)?));

        match outcome {
            Ok(data) => {
                debug!(target: "tabula::api", action, "request succeeded");
                AdminResponse::ok(data)
            }
            Err(err) => {
                match err {
                    TabulaError::Unauthorized
                    | TabulaError::Forbidden(_)
                    | TabulaError::InvalidToken => {
                        warn!(target: "tabula::api", action, code = err.code(), "request rejected")
                    }
                    _ => info!(
                        target: "tabula::api",
                        action,
                        code = err.code(),
                        error = %err,
                        "request failed"
                    ),
                }
                AdminResponse::failure(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{scenario_columns, ConfigFixture};
    use crate::host::StaticToken;
    use crate::render::datetime::parse_datetime;
    use serde_json::json;

    const TOKEN: &str = "s3cret";

    fn options() -> RenderOptions {
        RenderOptions {
            now: parse_datetime("2024-06-01 12:00:00").unwrap(),
            ..RenderOptions::default()
        }
    }

    fn listing() -> Scope {
        Scope::from("listing")
    }

    struct Harness {
        fixture: ConfigFixture,
        tokens: StaticToken,
        admin: AdminSession,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                fixture: ConfigFixture::new(),
                tokens: StaticToken(TOKEN.to_string()),
                admin: AdminSession::administrator(),
            }
        }

        fn api(&self) -> AdminApi<'_> {
            AdminApi::new(
                self.fixture.host.context(),
                &self.fixture.settings,
                &self.tokens,
                options(),
            )
        }

        fn creds(&self) -> Credentials<'_> {
            Credentials::new(&self.admin, TOKEN)
        }
    }

    #[test]
    fn scopes_lists_host_content_types() {
        let h = Harness::new();
        let scopes: Vec<ScopeInfo> = h.api().scopes(h.creds()).data_as().unwrap();
        let names: Vec<&str> = scopes.iter().map(|s| s.scope.as_str()).collect();
        assert_eq!(names, vec!["listing", "event"]);
    }

    #[test]
    fn fields_are_grouped_by_origin() {
        let h = Harness::new();
        let response = h.api().fields(h.creds(), &listing());
        assert!(response.success);
        let data = response.data.unwrap();
        let add_ons: Vec<&str> = data["add_on_fields"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["key"].as_str())
            .collect();
        assert_eq!(add_ons, vec!["rating"]);
        assert!(data["host_attributes"].as_array().unwrap().iter().any(|f| f["key"] == "@title"));
        assert!(data["type_fields"].as_array().unwrap().iter().any(|f| f["key"] == "price"));
    }

    #[test]
    fn save_then_load_returns_sanitized_configuration() {
        let h = Harness::new();
        let api = h.api();

        let saved = api.save(h.creds(), &listing(), &scenario_columns());
        assert!(saved.success);

        let loaded: LoadedConfiguration = api.load(h.creds(), &listing()).data_as().unwrap();
        assert!(loaded.customized);
        let ids: Vec<&str> = loaded.configuration.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["title", "price", "status"]);
        assert_eq!(saved.data_as::<ColumnConfiguration>().unwrap(), loaded.configuration);
    }

    #[test]
    fn load_unconfigured_scope_reports_default() {
        let h = Harness::new();
        let loaded: LoadedConfiguration = h.api().load(h.creds(), &listing()).data_as().unwrap();
        assert!(!loaded.customized);
        assert_eq!(loaded.configuration.columns.len(), 3);
    }

    #[test]
    fn restore_drops_saved_configuration() {
        let h = Harness::new();
        let api = h.api();
        api.save(h.creds(), &listing(), &scenario_columns());
        assert!(api.restore(h.creds(), &listing()).success);
        assert!(h.fixture.settings.is_empty());

        // restoring again is a no-op
        assert!(api.restore(h.creds(), &listing()).success);
    }

    #[test]
    fn export_returns_table_and_filename() {
        let h = Harness::new();
        let api = h.api();
        api.save(h.creds(), &listing(), &scenario_columns());

        let request: ExportRequest = serde_json::from_value(json!({
            "columns": ["price", "title"],
            "filters": {"status": "published"}
        }))
        .unwrap();
        let table: ExportTable = api.export(h.creds(), &listing(), &request).data_as().unwrap();
        assert_eq!(table.headers, vec!["Price", "Title"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.filename, "listing-export-2024-06-01.csv");
    }

    #[test]
    fn anonymous_session_is_rejected_without_mutation() {
        let h = Harness::new();
        let anon = AdminSession::anonymous();
        let response = h
            .api()
            .save(Credentials::new(&anon, TOKEN), &listing(), &scenario_columns());
        assert!(!response.success);
        assert_eq!(response.error_code(), Some("unauthorized"));
        assert!(h.fixture.settings.is_empty());
    }

    #[test]
    fn missing_capability_is_forbidden() {
        let h = Harness::new();
        let editor = AdminSession::with_capabilities(&["edit_posts"]);
        let response = h.api().scopes(Credentials::new(&editor, TOKEN));
        assert_eq!(response.error_code(), Some("forbidden"));
    }

    #[test]
    fn bad_token_is_rejected_without_mutation() {
        let h = Harness::new();
        let api = h.api();
        api.save(h.creds(), &listing(), &scenario_columns());

        let response = api.restore(Credentials::new(&h.admin, "wrong"), &listing());
        assert_eq!(response.error_code(), Some("invalid_token"));
        assert_eq!(h.fixture.settings.len(), 1);
    }

    #[test]
    fn unknown_scope_is_a_structured_failure() {
        let h = Harness::new();
        let response = h.api().load(h.creds(), &"nowhere".into());
        assert!(!response.success);
        assert_eq!(response.error_code(), Some("unknown_scope"));
        assert!(response.data.is_none());
    }

    #[test]
    fn store_failures_surface_as_failures() {
        let h = Harness::new();
        h.fixture.settings.set_simulate_write_error(true);
        let response = h.api().save(h.creds(), &listing(), &scenario_columns());
        assert_eq!(response.error_code(), Some("store"));
    }

    #[test]
    fn failure_serializes_without_data() {
        let response = AdminResponse::failure(&TabulaError::InvalidToken);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": false,
                "error": {"code": "invalid_token", "message": "Invalid or expired security token"}
            })
        );
    }
}
