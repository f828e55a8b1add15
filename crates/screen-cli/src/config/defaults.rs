use dockscreen::engine::config::{DEFAULT_AFFINITY_CUTOFF, DEFAULT_OUTPUT_DIR};
use std::path::PathBuf;
use std::thread;

pub struct DefaultsConfig {
    pub affinity_cutoff: f64,
    pub output_dir: PathBuf,
    pub parallelism: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            affinity_cutoff: DEFAULT_AFFINITY_CUTOFF,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            parallelism: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}
