//! Format-agnostic settings file loading

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Loads settings files, picking the format from the file extension.
#[derive(Debug, Default)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load settings from a file.
    ///
    /// Format is detected from file extension:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let parse_error = |format: &str, message: String| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.into(),
            message,
        };

        // Check the format first so an unsupported file is reported as such even if unreadable
        if !matches!(extension.as_str(), "toml" | "json" | "yaml" | "yml") {
            return Err(Error::UnsupportedFormat { extension });
        }

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        match extension.as_str() {
            "toml" => toml::from_str(&content).map_err(|e| parse_error("TOML", e.to_string())),
            "json" => {
                serde_json::from_str(&content).map_err(|e| parse_error("JSON", e.to_string()))
            }
            _ => serde_yaml::from_str(&content).map_err(|e| parse_error("YAML", e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        interval_seconds: u64,
    }

    #[test]
    fn loads_each_supported_format() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            ("s.toml", "interval_seconds = 5\n"),
            ("s.json", r#"{"interval_seconds": 5}"#),
            ("s.yml", "interval_seconds: 5\n"),
        ];

        for (name, body) in cases {
            let path = dir.path().join(name);
            fs::write(&path, body).unwrap();
            let loaded: Sample = ConfigStore::new().load(&path).unwrap();
            assert_eq!(loaded, Sample { interval_seconds: 5 }, "format {name}");
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = ConfigStore::new()
            .load::<Sample>(Path::new("settings.ini"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { extension } if extension == "ini"));
    }

    #[test]
    fn malformed_toml_names_the_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "interval_seconds = ").unwrap();

        let err = ConfigStore::new().load::<Sample>(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { ref format, .. } if format == "TOML"));
    }
}
