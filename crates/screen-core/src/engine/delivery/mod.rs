//! # Delivery
//!
//! Optional hand-off of promoted binders to somewhere the operator watches: a locally
//! mounted sync folder or a Dropbox app folder. The capability is chosen once from
//! [`DeliveryConfig`] at startup; when disabled the pipeline still calls a
//! [`NoDelivery`] implementation, so the orchestrator never branches on it.
//!
//! Delivery runs after the ledger entry is written and after promotion. A failed
//! delivery is reported but never undoes either.

pub mod directory;
pub mod dropbox;

use crate::engine::config::DeliveryConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to read or copy '{path}': {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload of '{path}' failed: {reason}", path = .path.display())]
    Transport { path: PathBuf, reason: String },

    #[error("Upload of '{path}' was rejected with status {status}: {body}", path = .path.display())]
    Rejected {
        path: PathBuf,
        status: u16,
        body: String,
    },

    #[error("Delivery provider could not be set up: {0}")]
    Setup(String),
}

pub trait Delivery: Send + Sync {
    fn name(&self) -> &'static str;

    /// Delivers every file; stops at the first failure.
    fn deliver(&self, files: &[&Path]) -> Result<(), DeliveryError>;
}

/// Delivery for runs without a provider configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelivery;

impl Delivery for NoDelivery {
    fn name(&self) -> &'static str {
        "none"
    }

    fn deliver(&self, _files: &[&Path]) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Resolves the configured provider.
pub fn from_config(config: &DeliveryConfig) -> Result<Box<dyn Delivery>, DeliveryError> {
    match config {
        DeliveryConfig::Disabled => Ok(Box::new(NoDelivery)),
        DeliveryConfig::Directory { path } => {
            Ok(Box::new(directory::DirectoryDelivery::new(path.clone())))
        }
        DeliveryConfig::Dropbox {
            access_token,
            folder,
        } => Ok(Box::new(dropbox::DropboxDelivery::new(
            access_token.clone(),
            folder.clone(),
        )?)),
    }
}
