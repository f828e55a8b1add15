use dockscreen::engine::config::{
    ConfigError, ConversionJob, ConverterConfig, DeliveryConfig, DockingEngineConfig,
    LedgerConfig, ScreeningJob, ScreeningJobBuilder,
};
use std::path::{Path, PathBuf};

/// Fully resolved settings of a `run` invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub docking_config: PathBuf,
    pub archives: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub affinity_cutoff: f64,
    pub record_marker: Option<String>,
    pub parallelism: usize,
    pub converter: ConverterConfig,
    pub docking: DockingEngineConfig,
    pub ledger: LedgerConfig,
    pub delivery: DeliveryConfig,
}

impl AppConfig {
    pub fn job_for(&self, archive: &Path) -> Result<ScreeningJob, ConfigError> {
        let builder = ScreeningJobBuilder::new()
            .archive(archive.to_path_buf())
            .docking_config(self.docking_config.clone())
            .affinity_cutoff(self.affinity_cutoff)
            .output_dir(self.output_dir.clone());
        match &self.record_marker {
            Some(marker) => builder.record_marker(marker.clone()).build(),
            None => builder.build(),
        }
    }
}

/// Fully resolved settings of a `convert` invocation.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub archives: Vec<PathBuf>,
    pub output_parent: Option<PathBuf>,
    pub record_marker: Option<String>,
    pub parallelism: usize,
    pub converter: ConverterConfig,
}

impl ConvertConfig {
    pub fn job_for(&self, archive: &Path) -> ConversionJob {
        let mut job = ConversionJob::beside_archive(archive.to_path_buf());
        if let (Some(parent), Some(name)) = (&self.output_parent, job.output_dir.file_name()) {
            job.output_dir = parent.join(name);
        }
        if let Some(marker) = &self.record_marker {
            job.record_marker = marker.clone();
        }
        job
    }
}

/// Resolved settings of a `ledger` invocation.
#[derive(Debug, Clone)]
pub struct LedgerTarget {
    pub ledger: LedgerConfig,
    pub output_dir: PathBuf,
}
