use crate::error::{Result, TabulaError};
use crate::render::datetime::{
    valid_pattern, DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT, DEFAULT_TIME_FORMAT,
};
use crate::render::RenderOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

const CONFIG_FILENAME: &str = "config.json";

/// Operator preferences, stored in `<data dir>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabulaConfig {
    /// Shown in list cells that have no value.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// strftime patterns for dates, date-times and times.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Field delimiter for exported files.
    #[serde(default = "default_export_delimiter")]
    pub export_delimiter: char,
}

fn default_placeholder() -> String {
    "—".to_string()
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_datetime_format() -> String {
    DEFAULT_DATETIME_FORMAT.to_string()
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_export_delimiter() -> char {
    ','
}

impl Default for TabulaConfig {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
            date_format: default_date_format(),
            datetime_format: default_datetime_format(),
            time_format: default_time_format(),
            currency_symbol: default_currency_symbol(),
            export_delimiter: default_export_delimiter(),
        }
    }
}

impl TabulaConfig {
    pub const KEYS: &'static [&'static str] = &[
        "placeholder",
        "date-format",
        "datetime-format",
        "time-format",
        "currency-symbol",
        "export-delimiter",
    ];

    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.reset_invalid_patterns();
        Ok(config)
    }

    /// Replaces hand-edited date patterns chrono cannot format with the defaults.
    fn reset_invalid_patterns(&mut self) {
        let patterns = [
            ("date-format", &mut self.date_format, DEFAULT_DATE_FORMAT),
            ("datetime-format", &mut self.datetime_format, DEFAULT_DATETIME_FORMAT),
            ("time-format", &mut self.time_format, DEFAULT_TIME_FORMAT),
        ];
        for (key, pattern, default) in patterns {
            if pattern.trim().is_empty() || !valid_pattern(pattern) {
                warn!(
                    target: "tabula::config",
                    key,
                    pattern = %pattern,
                    "invalid date pattern, using default"
                );
                *pattern = default.to_string();
            }
        }
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    /// Value of a config key. Keys use dashes or underscores interchangeably.
    pub fn get(&self, key: &str) -> Option<String> {
        match key.replace('_', "-").as_str() {
            "placeholder" => Some(self.placeholder.clone()),
            "date-format" => Some(self.date_format.clone()),
            "datetime-format" => Some(self.datetime_format.clone()),
            "time-format" => Some(self.time_format.clone()),
            "currency-symbol" => Some(self.currency_symbol.clone()),
            "export-delimiter" => Some(self.export_delimiter.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.replace('_', "-").as_str() {
            "placeholder" => self.placeholder = value.to_string(),
            "date-format" => self.date_format = date_pattern(key, value)?,
            "datetime-format" => self.datetime_format = date_pattern(key, value)?,
            "time-format" => self.time_format = date_pattern(key, value)?,
            "currency-symbol" => self.currency_symbol = value.to_string(),
            "export-delimiter" => self.export_delimiter = delimiter(value)?,
            _ => return Err(TabulaError::Api(format!("Unknown config key: {}", key))),
        }
        Ok(())
    }

    /// The export delimiter as the single byte the csv writer expects.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.export_delimiter).unwrap_or(b',')
    }

    /// Render options carrying these preferences; `now` is the current local time.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            placeholder: self.placeholder.clone(),
            date_format: self.date_format.clone(),
            datetime_format: self.datetime_format.clone(),
            time_format: self.time_format.clone(),
            currency_symbol: self.currency_symbol.clone(),
            ..RenderOptions::default()
        }
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TabulaError::Api(format!("{} cannot be empty", key)));
    }
    Ok(value.to_string())
}

fn date_pattern(key: &str, value: &str) -> Result<String> {
    let value = non_empty(key, value)?;
    if !valid_pattern(&value) {
        return Err(TabulaError::Api(format!(
            "{} is not a valid strftime pattern: {:?}",
            key, value
        )));
    }
    Ok(value)
}

fn delimiter(value: &str) -> Result<char> {
    let value = if value == "\\t" || value.eq_ignore_ascii_case("tab") {
        "\t"
    } else {
        value
    };
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => Ok(c),
        _ => Err(TabulaError::Api(format!(
            "export-delimiter must be a single ASCII character, got {:?}",
            value
        ))),
    }
}
