use super::{Delivery, DeliveryError};
use crate::engine::config::BINDERS_DIR_NAME;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copies promoted files into `<root>/binders/`, typically a folder kept in sync by a
/// desktop client.
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    root: PathBuf,
}

impl DirectoryDelivery {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl Delivery for DirectoryDelivery {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn deliver(&self, files: &[&Path]) -> Result<(), DeliveryError> {
        let target_dir = self.root.join(BINDERS_DIR_NAME);
        fs::create_dir_all(&target_dir).map_err(|source| DeliveryError::Io {
            path: target_dir.clone(),
            source,
        })?;

        for file in files {
            let Some(name) = file.file_name() else {
                return Err(DeliveryError::Io {
                    path: file.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "path has no file name",
                    ),
                });
            };
            let target = target_dir.join(name);
            fs::copy(file, &target).map_err(|source| DeliveryError::Io {
                path: file.to_path_buf(),
                source,
            })?;
            debug!("Delivered {:?} to {:?}.", file, target);
        }
        Ok(())
    }
}
