use crate::error::{CliError, Result};
use dockscreen::engine::config::DeliveryConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConverterConfig {
    pub program: Option<String>,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub partial_charge: Option<String>,
    pub add_polar_hydrogens: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileDockingConfig {
    pub program: Option<String>,
    pub completion_marker: Option<String>,
    pub output_suffix: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileLedgerConfig {
    /// `host[:port][/db]`
    pub address: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub save_interval_secs: Option<u64>,
    pub save_min_changes: Option<u32>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum FileDeliveryConfig {
    None,
    Directory {
        path: PathBuf,
    },
    #[serde(rename_all = "kebab-case")]
    Dropbox {
        access_token: String,
        #[serde(default)]
        folder: String,
    },
}

impl From<FileDeliveryConfig> for DeliveryConfig {
    fn from(file: FileDeliveryConfig) -> Self {
        match file {
            FileDeliveryConfig::None => DeliveryConfig::Disabled,
            FileDeliveryConfig::Directory { path } => DeliveryConfig::Directory { path },
            FileDeliveryConfig::Dropbox {
                access_token,
                folder,
            } => DeliveryConfig::Dropbox {
                access_token,
                folder,
            },
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub affinity_cutoff: Option<f64>,
    pub output_dir: Option<PathBuf>,
    pub record_marker: Option<String>,
    pub parallelism: Option<usize>,
    pub converter: Option<FileConverterConfig>,
    pub docking: Option<FileDockingConfig>,
    pub ledger: Option<FileLedgerConfig>,
    pub delivery: Option<FileDeliveryConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_settings_file_is_parsed() {
        let config: FileConfig = toml::from_str(
            r#"
            affinity-cutoff = 8.0
            output-dir = "results"
            parallelism = 12

            [converter]
            program = "obabel"
            partial-charge = "mmff94"
            add-polar-hydrogens = false

            [docking]
            program = "/opt/vina/bin/vina"

            [ledger]
            address = "db.internal:6380/3"
            save-interval-secs = 300

            [delivery]
            type = "dropbox"
            access-token = "token"
            folder = "screen-7"
            "#,
        )
        .unwrap();

        assert_eq!(config.affinity_cutoff, Some(8.0));
        assert_eq!(config.parallelism, Some(12));
        let converter = config.converter.unwrap();
        assert_eq!(converter.program.as_deref(), Some("obabel"));
        assert_eq!(converter.add_polar_hydrogens, Some(false));
        assert_eq!(
            config.ledger.unwrap().address.as_deref(),
            Some("db.internal:6380/3")
        );
        assert_eq!(
            DeliveryConfig::from(config.delivery.unwrap()),
            DeliveryConfig::Dropbox {
                access_token: "token".to_string(),
                folder: "screen-7".to_string(),
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: std::result::Result<FileConfig, _> = toml::from_str("cutof = 7.0");
        assert!(result.is_err());

        let result: std::result::Result<FileConfig, _> =
            toml::from_str("[ledger]\nhost = \"localhost\"");
        assert!(result.is_err());
    }

    #[test]
    fn unreadable_file_is_a_parsing_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        let result = FileConfig::from_file(&missing);

        assert!(matches!(result, Err(CliError::FileParsing { ref path, .. }) if *path == missing));
    }
}
