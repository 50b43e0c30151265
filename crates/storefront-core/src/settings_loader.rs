//! Settings loading from TOML files and environment variables.
//!
//! ## Loading Order
//!
//! 1. Start with [`Settings::default`].
//! 2. Merge a TOML document over the defaults.
//! 3. Apply `STOREFRONT_*` environment overrides (highest priority).
//!
//! | Env Var | Setting |
//! |---|---|
//! | `STOREFRONT_DEBUG` | `debug` |
//! | `STOREFRONT_LOG_LEVEL` | `log_level` |
//! | `STOREFRONT_BIND_ADDRESS` | `bind_address` |
//! | `STOREFRONT_SEED_DEMO_DATA` | `seed_demo_data` |
//! | `STOREFRONT_SITE_NAME` | `admin.site_name` |
//! | `STOREFRONT_ADMIN_URL_PREFIX` | `admin.url_prefix` |
//!
//! ```rust,no_run
//! use storefront_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("storefront.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::settings::Settings;

/// Loads settings from a TOML string, keeping defaults for anything not set.
pub fn from_toml_str(toml_str: &str) -> StoreResult<Settings> {
    // Deserializing through JSON lets partial tables merge over the defaults.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| StoreError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        StoreError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, toml_to_json(toml_value));
    serde_json::from_value(merged).map_err(|e| {
        StoreError::ConfigurationError(format!("Failed to deserialize settings from TOML: {e}"))
    })
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> StoreResult<Settings> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        StoreError::ConfigurationError(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file, then applies environment overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> StoreResult<Settings> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Builds settings from defaults plus environment overrides.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `STOREFRONT_*` environment variables to `settings`.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

/// Applies overrides using `lookup` as the variable source.
///
/// Unparseable boolean values count as `false`.
pub fn apply_overrides_from<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("STOREFRONT_DEBUG") {
        settings.debug = parse_bool(&val);
    }
    if let Some(val) = lookup("STOREFRONT_LOG_LEVEL") {
        settings.log_level = val;
    }
    if let Some(val) = lookup("STOREFRONT_BIND_ADDRESS") {
        settings.bind_address = val;
    }
    if let Some(val) = lookup("STOREFRONT_SEED_DEMO_DATA") {
        settings.seed_demo_data = parse_bool(&val);
    }
    if let Some(val) = lookup("STOREFRONT_SITE_NAME") {
        settings.admin.site_name = val;
    }
    if let Some(val) = lookup("STOREFRONT_ADMIN_URL_PREFIX") {
        settings.admin.url_prefix = val;
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values; `override_val` wins.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            log_level = "warn"
        "#;
        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.bind_address, "127.0.0.1:8000");
    }

    #[test]
    fn test_from_toml_str_nested_table_merges() {
        let toml = r#"
            [admin]
            url_prefix = "/backoffice"
        "#;
        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.admin.url_prefix, "/backoffice");
        assert_eq!(settings.admin.site_name, "Storefront administration");
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let err = from_toml_str("debug = = true").unwrap_err();
        assert!(matches!(err, StoreError::ConfigurationError(_)));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        let err = from_toml_str("debug = \"maybe\"").unwrap_err();
        assert!(err.to_string().contains("deserialize"));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_address = \"0.0.0.0:9000\"\nseed_demo_data = false").unwrap();
        let settings = from_toml_file(file.path()).unwrap();
        assert_eq!(settings.bind_address, "0.0.0.0:9000");
        assert!(!settings.seed_demo_data);
    }

    #[test]
    fn test_from_toml_file_missing() {
        let err = from_toml_file("/nonexistent/storefront.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read TOML file"));
    }

    #[test]
    fn test_apply_overrides_from() {
        let vars: HashMap<&str, &str> = [
            ("STOREFRONT_DEBUG", "0"),
            ("STOREFRONT_LOG_LEVEL", "debug"),
            ("STOREFRONT_ADMIN_URL_PREFIX", "/ops"),
            ("STOREFRONT_SEED_DEMO_DATA", "yes"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings {
            seed_demo_data: false,
            ..Settings::default()
        };
        apply_overrides_from(&mut settings, |key| vars.get(key).map(ToString::to_string));

        assert!(!settings.debug);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.admin.url_prefix, "/ops");
        assert!(settings.seed_demo_data);
        assert_eq!(settings.bind_address, "127.0.0.1:8000");
    }

    #[test]
    fn test_merge_json_override_scalar() {
        let merged = merge_json(
            serde_json::json!({"a": 1, "b": {"c": 2, "d": 3}}),
            serde_json::json!({"b": {"c": 5}}),
        );
        assert_eq!(merged, serde_json::json!({"a": 1, "b": {"c": 5, "d": 3}}));
    }
}
