//! # Column Configuration Store
//!
//! One [`ColumnConfiguration`] per scope, persisted as a JSON blob in the host's
//! [`SettingsStore`] under `tabula_columns_{scope}`.
//!
//! - [`ConfigStore::load`] returns the persisted configuration, or the host
//!   default when none was saved (or the blob no longer parses).
//! - [`ConfigStore::save`] sanitizes untrusted input, persists it, and returns
//!   what was stored. This is the only write path, and the only place input is
//!   validated; readers trust what they load.
//! - [`ConfigStore::restore_defaults`] deletes the blob.
//!
//! For every input `x`, `load(save(x)) == sanitize(x)`.

mod defaults;
mod sanitize;

pub use defaults::host_default;
pub use sanitize::{MAX_LABEL_CHARS, MAX_PERCENT_WIDTH, MAX_PX_WIDTH};

use crate::catalog::FieldCatalog;
use crate::error::Result;
use crate::host::{HostContext, SettingsStore};
use crate::model::{ColumnConfiguration, Scope};
use serde_json::Value;
use tracing::{info, warn};

pub const KEY_PREFIX: &str = "tabula_columns_";

pub struct ConfigStore<'a> {
    store: &'a dyn SettingsStore,
    host: HostContext<'a>,
}

impl<'a> ConfigStore<'a> {
    pub fn new(store: &'a dyn SettingsStore, host: HostContext<'a>) -> Self {
        Self { store, host }
    }

    /// Settings key for a scope. ASCII letters, digits and `-` pass through; every
    /// other byte (including `_`) is written as `_xx` hex, so distinct scopes never
    /// share a key.
    pub fn key(scope: &Scope) -> String {
        let mut key = String::from(KEY_PREFIX);
        for byte in scope.as_str().bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                key.push(char::from(byte));
            } else {
                key.push_str(&format!("_{:02x}", byte));
            }
        }
        key
    }

    pub fn load(&self, scope: &Scope) -> Result<ColumnConfiguration> {
        Ok(self.load_saved(scope)?.unwrap_or_else(|| host_default(scope)))
    }

    /// The persisted configuration, if one was saved and still parses.
    pub fn load_saved(&self, scope: &Scope) -> Result<Option<ColumnConfiguration>> {
        let Some(blob) = self.store.get(&Self::key(scope))? else {
            return Ok(None);
        };
        match serde_json::from_str(&blob) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                warn!(
                    target: "tabula::config",
                    %scope,
                    error = %err,
                    "stored configuration unreadable, using host default"
                );
                Ok(None)
            }
        }
    }

    pub fn is_customized(&self, scope: &Scope) -> Result<bool> {
        Ok(self.load_saved(scope)?.is_some())
    }

    /// Sanitizes without persisting.
    pub fn sanitize(&self, scope: &Scope, raw: &Value) -> ColumnConfiguration {
        let catalog = FieldCatalog::new(self.host, scope.clone());
        sanitize::sanitize(raw, &catalog)
    }

    pub fn save(&self, scope: &Scope, raw: &Value) -> Result<ColumnConfiguration> {
        let config = self.sanitize(scope, raw);
        let blob = serde_json::to_string(&config)?;
        self.store.set(&Self::key(scope), &blob)?;
        info!(
            target: "tabula::config",
            %scope,
            columns = config.columns.len(),
            "configuration saved"
        );
        Ok(config)
    }

    /// Deletes the persisted configuration. A no-op for unconfigured scopes.
    pub fn restore_defaults(&self, scope: &Scope) -> Result<()> {
        self.store.delete(&Self::key(scope))?;
        info!(target: "tabula::config", %scope, "configuration restored to defaults");
        Ok(())
    }
}
