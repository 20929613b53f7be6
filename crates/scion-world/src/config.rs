//! Configuration for the lineage region module.
//!
//! The module reads one optional JSON section, keyed `"scion"`:
//!
//! ```json
//! { "scion": { "enabled": true, "prim_descendants": true } }
//! ```
//!
//! The feature is active only when the section is present and both flags are
//! `true`. Unknown top-level keys are ignored so the section can live inside
//! a larger host configuration document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

// ---------------------------------------------------------------------------
// LineageSection
// ---------------------------------------------------------------------------

/// The `"scion"` section. Missing flags default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageSection {
    /// Master switch for every scion feature.
    pub enabled: bool,
    /// Switch for copy-lineage tracking and its script functions.
    pub prim_descendants: bool,
}

// ---------------------------------------------------------------------------
// LineageConfig
// ---------------------------------------------------------------------------

/// Host configuration as seen by the lineage module.
///
/// `Default` has no section, which leaves the module disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageConfig {
    #[serde(default, rename = "scion", skip_serializing_if = "Option::is_none")]
    pub section: Option<LineageSection>,
}

impl LineageConfig {
    /// A configuration with both flags switched on.
    pub fn enabled() -> Self {
        Self {
            section: Some(LineageSection {
                enabled: true,
                prim_descendants: true,
            }),
        }
    }

    /// Parse a JSON configuration document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the text is not valid JSON or the `"scion"`
    /// section has the wrong shape.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] as for [`from_json_str`](Self::from_json_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Whether copy-lineage tracking should run.
    pub fn is_enabled(&self) -> bool {
        self.section
            .is_some_and(|section| section.enabled && section.prim_descendants)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disabled() {
        let config = LineageConfig::default();
        assert!(config.section.is_none());
        assert!(!config.is_enabled());
    }

    #[test]
    fn both_flags_enable() {
        let config = LineageConfig::from_json_str(
            r#"{ "scion": { "enabled": true, "prim_descendants": true } }"#,
        )
        .unwrap();
        assert!(config.is_enabled());
        assert_eq!(config, LineageConfig::enabled());
    }

    #[test]
    fn either_flag_off_disables() {
        for text in [
            r#"{ "scion": { "enabled": true } }"#,
            r#"{ "scion": { "prim_descendants": true } }"#,
            r#"{ "scion": { "enabled": false, "prim_descendants": true } }"#,
            r#"{ "scion": {} }"#,
        ] {
            let config = LineageConfig::from_json_str(text).unwrap();
            assert!(config.section.is_some(), "{text}");
            assert!(!config.is_enabled(), "{text}");
        }
    }

    #[test]
    fn missing_section_disables_and_other_keys_are_ignored() {
        let config = LineageConfig::from_json_str(r#"{ "physics": { "gravity": -9.8 } }"#).unwrap();
        assert!(config.section.is_none());
        assert!(!config.is_enabled());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = LineageConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");

        let err = LineageConfig::from_json_str(r#"{ "scion": { "enabled": "yes" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = LineageConfig::from_file("/nonexistent/scion.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "got {err:?}");
    }

    #[test]
    fn serializes_under_scion_key() {
        let json = serde_json::to_value(LineageConfig::enabled()).unwrap();
        assert_eq!(json["scion"]["enabled"], true);
        assert_eq!(json["scion"]["prim_descendants"], true);

        let json = serde_json::to_value(LineageConfig::default()).unwrap();
        assert!(json.get("scion").is_none());
    }
}
