use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "farmconnect.toml";
const ENV_PREFIX: &str = "FARMCONNECT__";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub currency_symbol: String,
    pub quantity_unit: String,
    pub enforce_transitions: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: storage::IN_MEMORY_URL.into(),
            currency_symbol: "₹".into(),
            quantity_unit: "kg".into(),
            enforce_transitions: true,
            log_filter: "warn".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    database_url: Option<String>,
    currency_symbol: Option<String>,
    quantity_unit: Option<String>,
    enforce_transitions: Option<bool>,
    log_filter: Option<String>,
}

/// Defaults, then the TOML file, then `FARMCONNECT__*` environment variables.
///
/// An explicitly named file must exist; the default file is optional.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let raw = match explicit_path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    if let Some(raw) = raw {
        apply_file(&mut settings, &raw)?;
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw).context("invalid config file")?;
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.currency_symbol {
        settings.currency_symbol = v;
    }
    if let Some(v) = file_cfg.quantity_unit {
        settings.quantity_unit = v;
    }
    if let Some(v) = file_cfg.enforce_transitions {
        settings.enforce_transitions = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

    if let Some(v) = var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("CURRENCY_SYMBOL") {
        settings.currency_symbol = v;
    }
    if let Some(v) = var("QUANTITY_UNIT") {
        settings.quantity_unit = v;
    }
    if let Some(v) = var("ENFORCE_TRANSITIONS") {
        if let Ok(parsed) = v.trim().parse::<bool>() {
            settings.enforce_transitions = parsed;
        }
    }
    if let Some(v) = var("LOG_FILTER") {
        settings.log_filter = v;
    }
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with(storage::IN_MEMORY_URL)
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
