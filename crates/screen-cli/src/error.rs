use dockscreen::engine::delivery::DeliveryError;
use dockscreen::engine::error::EngineError;
use dockscreen::engine::ledger::LedgerError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Screening(#[from] EngineError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(
        "{source}\nStart the ledger store with `redis-server {config}` and run the command again.",
        config = .server_config.display()
    )]
    LedgerSetupRequired {
        source: LedgerError,
        server_config: PathBuf,
    },

    #[error("Delivery setup failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("{failed} of {total} archive(s) could not be read")]
    ArchivesFailed { failed: usize, total: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = .path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
