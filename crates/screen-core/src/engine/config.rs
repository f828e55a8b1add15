use crate::core::io::archive::TRIPOS_MOLECULE_MARKER;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_AFFINITY_CUTOFF: f64 = 7.5;
pub const DEFAULT_OUTPUT_DIR: &str = "docking_results";
pub const BINDERS_DIR_NAME: &str = "binders";
pub const VINA_COMPLETION_MARKER: &str = "Refining results ... done";

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Settings for the external ligand conversion tool (Open Babel's `babel` by default).
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterConfig {
    pub program: String,
    pub input_format: String,
    pub output_format: String,
    pub partial_charge: String,
    pub add_polar_hydrogens: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "babel".to_string(),
            input_format: "mol2".to_string(),
            output_format: "pdbqt".to_string(),
            partial_charge: "gasteiger".to_string(),
            add_polar_hydrogens: true,
        }
    }
}

/// Settings for the external docking engine (AutoDock Vina by default).
#[derive(Debug, Clone, PartialEq)]
pub struct DockingEngineConfig {
    pub program: String,
    /// Text the engine prints once pose refinement has completed.
    pub completion_marker: String,
    /// Suffix the engine appends to the ligand stem when naming its output file.
    pub output_suffix: String,
}

impl Default for DockingEngineConfig {
    fn default() -> Self {
        Self {
            program: "vina".to_string(),
            completion_marker: VINA_COMPLETION_MARKER.to_string(),
            output_suffix: "_out".to_string(),
        }
    }
}

/// Address and persistence settings of the key-value store behind the checkpoint ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
    pub connect_timeout: Duration,
    /// Snapshot interval written into the generated store configuration.
    pub save_interval: Duration,
    /// Minimum number of changed keys that triggers a snapshot.
    pub save_min_changes: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 7,
            password: None,
            connect_timeout: Duration::from_secs(2),
            save_interval: Duration::from_secs(900),
            save_min_changes: 1,
        }
    }
}

impl LedgerConfig {
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }

    /// Address without credentials, safe for logs and messages.
    pub fn display_address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Where promoted binders are delivered in addition to the local `binders/` directory.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DeliveryConfig {
    #[default]
    Disabled,
    Directory {
        path: PathBuf,
    },
    Dropbox {
        access_token: String,
        folder: String,
    },
}

/// One archive screened against one docking configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningJob {
    pub archive: PathBuf,
    /// Docking engine configuration file (receptor, search box, exhaustiveness).
    pub docking_config: PathBuf,
    pub affinity_cutoff: f64,
    pub output_dir: PathBuf,
    pub record_marker: String,
}

impl ScreeningJob {
    pub fn binders_dir(&self) -> PathBuf {
        self.output_dir.join(BINDERS_DIR_NAME)
    }
}

/// One archive converted into dock-ready files, with no docking or triage.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    pub archive: PathBuf,
    pub output_dir: PathBuf,
    pub record_marker: String,
}

impl ConversionJob {
    /// Job writing into [`conversion_dir_for`] the archive, splitting on the MOL2 marker.
    pub fn beside_archive(archive: PathBuf) -> Self {
        Self {
            output_dir: conversion_dir_for(&archive),
            archive,
            record_marker: TRIPOS_MOLECULE_MARKER.to_string(),
        }
    }
}

/// Directory next to `archive` named after it: `ligands.mol2.gz` converts into `ligands/`.
///
/// An archive name without a `.gz` or `.mol2` suffix gets `_converted` appended so the
/// directory never collides with the archive itself.
pub fn conversion_dir_for(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let without_gz = name.strip_suffix(".gz").unwrap_or(&name);
    let stem = without_gz.strip_suffix(".mol2").unwrap_or(without_gz);
    let dir_name = if stem.is_empty() || stem == name {
        format!("{}_converted", stem)
    } else {
        stem.to_string()
    };
    archive.with_file_name(dir_name)
}

#[derive(Default)]
pub struct ScreeningJobBuilder {
    archive: Option<PathBuf>,
    docking_config: Option<PathBuf>,
    affinity_cutoff: Option<f64>,
    output_dir: Option<PathBuf>,
    record_marker: Option<String>,
}

impl ScreeningJobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archive(mut self, path: PathBuf) -> Self {
        self.archive = Some(path);
        self
    }
    pub fn docking_config(mut self, path: PathBuf) -> Self {
        self.docking_config = Some(path);
        self
    }
    pub fn affinity_cutoff(mut self, cutoff: f64) -> Self {
        self.affinity_cutoff = Some(cutoff);
        self
    }
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = Some(path);
        self
    }
    pub fn record_marker(mut self, marker: impl Into<String>) -> Self {
        self.record_marker = Some(marker.into());
        self
    }

    pub fn build(self) -> Result<ScreeningJob, ConfigError> {
        let affinity_cutoff = self
            .affinity_cutoff
            .ok_or(ConfigError::MissingParameter("affinity_cutoff"))?;
        if !affinity_cutoff.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "affinity_cutoff",
                reason: format!("{} is not a finite number", affinity_cutoff),
            });
        }

        let record_marker = self
            .record_marker
            .unwrap_or_else(|| TRIPOS_MOLECULE_MARKER.to_string());
        if record_marker.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "record_marker",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(ScreeningJob {
            archive: self
                .archive
                .ok_or(ConfigError::MissingParameter("archive"))?,
            docking_config: self
                .docking_config
                .ok_or(ConfigError::MissingParameter("docking_config"))?,
            affinity_cutoff,
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            record_marker,
        })
    }
}
