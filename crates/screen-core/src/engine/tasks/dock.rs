use super::DIAGNOSTIC_EXCERPT_CHARS;
use super::convert::ConvertedPaths;
use crate::core::process::{ProcessRunner, excerpt};
use crate::engine::config::DockingEngineConfig;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Separator line that precedes the ranked rows of the engine's results table.
pub const RESULTS_SEPARATOR: &str = "-+-";

#[derive(Debug, Error)]
pub enum DockError {
    #[error("Failed to start docking engine '{program}' for '{ligand}': {source}", ligand = .ligand.display())]
    Spawn {
        program: String,
        ligand: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Docking engine exited abnormally without output for '{ligand}' (exit code {code:?})", ligand = .ligand.display())]
    Abnormal {
        ligand: PathBuf,
        code: Option<i32>,
    },

    #[error("Docking of '{ligand}' never reported completion: {excerpt}", ligand = .ligand.display())]
    Indeterminate { ligand: PathBuf, excerpt: String },

    #[error("Unreadable score in docking results row '{row}'")]
    MalformedResults { row: String },
}

/// Outcome of one successful docking run.
#[derive(Debug, Clone, PartialEq)]
pub struct DockReport {
    /// Best-pose affinity, positive for favourable binding.
    pub affinity: f64,
    pub ligand: PathBuf,
    /// Pose file the engine writes next to the ligand.
    pub output: PathBuf,
}

impl DockReport {
    pub fn artifacts(&self) -> [&Path; 2] {
        [&self.ligand, &self.output]
    }
}

pub struct DockingEngine {
    runner: Arc<dyn ProcessRunner>,
    config: DockingEngineConfig,
}

impl DockingEngine {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: DockingEngineConfig) -> Self {
        Self { runner, config }
    }

    /// Path of the pose file the engine writes for `ligand`.
    pub fn output_path(&self, ligand: &Path) -> PathBuf {
        let stem = ligand
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = match ligand.extension() {
            Some(ext) => format!(
                "{}{}.{}",
                stem,
                self.config.output_suffix,
                ext.to_string_lossy()
            ),
            None => format!("{}{}", stem, self.config.output_suffix),
        };
        ligand.with_file_name(file_name)
    }

    /// Docks one converted ligand against the receptor described by `config_file`.
    ///
    /// The exit status only matters when the engine printed nothing at all; otherwise
    /// the completion marker decides whether the run finished.
    pub fn dock(
        &self,
        config_file: &Path,
        converted: &ConvertedPaths,
    ) -> Result<DockReport, DockError> {
        let ligand = converted.ligand.clone();
        let args: Vec<OsString> = vec![
            "--config".into(),
            config_file.into(),
            "--ligand".into(),
            ligand.as_path().into(),
        ];

        debug!(ligand = ?ligand, "Docking with {}.", self.config.program);
        let result = self
            .runner
            .invoke(&self.config.program, &args)
            .map_err(|source| DockError::Spawn {
                program: self.config.program.clone(),
                ligand: ligand.clone(),
                source,
            })?;

        let text = result.combined();
        if !result.success() && text.trim().is_empty() {
            return Err(DockError::Abnormal {
                ligand,
                code: result.exit_code,
            });
        }
        if !text.contains(&self.config.completion_marker) {
            return Err(DockError::Indeterminate {
                ligand,
                excerpt: excerpt(&text, DIAGNOSTIC_EXCERPT_CHARS),
            });
        }

        let affinity = parse_affinity(&text)?;
        trace!(ligand = ?ligand, affinity, "Parsed best-pose affinity.");
        Ok(DockReport {
            affinity,
            output: self.output_path(&ligand),
            ligand,
        })
    }
}

/// Reads the best-pose affinity from the engine's console output.
///
/// The score is the second field of the row right after the last `-+-` separator,
/// negated so that stronger binders are larger. Output without a separator, or with
/// nothing after the last one, scores `0`.
pub fn parse_affinity(output: &str) -> Result<f64, DockError> {
    let lines: Vec<&str> = output.lines().collect();
    let Some(separator) = lines
        .iter()
        .rposition(|line| line.contains(RESULTS_SEPARATOR))
    else {
        return Ok(0.0);
    };
    let Some(row) = lines
        .get(separator + 1)
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
    else {
        return Ok(0.0);
    };

    let malformed = || DockError::MalformedResults {
        row: row.to_string(),
    };
    let score: f64 = row
        .split_whitespace()
        .nth(1)
        .ok_or_else(malformed)?
        .parse()
        .map_err(|_| malformed())?;
    if !score.is_finite() {
        return Err(malformed());
    }
    Ok(0.0 - score)
}
