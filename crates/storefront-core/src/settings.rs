//! Runtime settings for the storefront admin.
//!
//! [`Settings`] holds everything the binary needs to boot: logging, the bind
//! address, and the admin site options. Every field has a default so a
//! settings file only needs to name what it changes.

use serde::{Deserialize, Serialize};

/// Options for the admin site itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    /// Name reported by the admin index.
    pub site_name: String,
    /// URL prefix the admin API is mounted under.
    pub url_prefix: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            site_name: "Storefront administration".to_string(),
            url_prefix: "/admin".to_string(),
        }
    }
}

/// Top-level settings.
///
/// # Examples
///
/// ```
/// use storefront_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.admin.url_prefix, "/admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Debug mode switches the log format to human-readable output.
    pub debug: bool,
    /// Log filter directive (e.g. `"info"`, `"storefront_admin=debug"`).
    pub log_level: String,
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// Whether `serve` loads the demo catalogue on startup.
    pub seed_demo_data: bool,
    /// Admin site options.
    pub admin: AdminSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            bind_address: "127.0.0.1:8000".to_string(),
            seed_demo_data: true,
            admin: AdminSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.bind_address, "127.0.0.1:8000");
        assert!(settings.seed_demo_data);
        assert_eq!(settings.admin.site_name, "Storefront administration");
    }

    #[test]
    fn test_settings_partial_deserialize_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"debug": false, "admin": {"url_prefix": "/api/admin"}}"#)
                .unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.admin.url_prefix, "/api/admin");
        assert_eq!(settings.admin.site_name, "Storefront administration");
        assert_eq!(settings.log_level, "info");
    }
}
