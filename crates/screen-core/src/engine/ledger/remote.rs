use super::{LedgerError, LedgerStore};
use crate::engine::config::LedgerConfig;
use ::redis::{Client, Commands, RedisError};
use r2d2::{Pool, PooledConnection};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the generated store configuration, placed in the output directory.
pub const SERVER_CONFIG_FILE_NAME: &str = "redis.conf";
/// Snapshot file the store persists the ledger to.
pub const SNAPSHOT_FILE_NAME: &str = "records.rdb";

/// Ledger store backed by a Redis-compatible server, shared by workers through a
/// connection pool.
pub struct RedisStore {
    pool: Pool<Client>,
    address: String,
}

impl RedisStore {
    /// Connects to the server and verifies it answers before returning.
    ///
    /// `max_connections` should match the worker count so no worker waits on another's
    /// ledger round-trip.
    pub fn connect(config: &LedgerConfig, max_connections: u32) -> Result<Self, LedgerError> {
        let address = config.display_address();
        let unavailable = |reason: String| LedgerError::Unavailable {
            address: address.clone(),
            reason,
        };

        let client = Client::open(config.url().as_str()).map_err(|e| unavailable(e.to_string()))?;
        let pool = Pool::builder()
            .max_size(max_connections.max(1))
            .min_idle(Some(1))
            .connection_timeout(config.connect_timeout)
            .build(client)
            .map_err(|e| unavailable(e.to_string()))?;

        let store = Self {
            pool,
            address: address.clone(),
        };
        store.ping()?;
        info!("Connected to ledger store at {}.", address);
        Ok(store)
    }

    fn connection(&self) -> Result<PooledConnection<Client>, LedgerError> {
        self.pool.get().map_err(|e| LedgerError::Unavailable {
            address: self.address.clone(),
            reason: e.to_string(),
        })
    }

    fn classify(&self, key: &str, error: RedisError) -> LedgerError {
        if error.is_io_error()
            || error.is_connection_refusal()
            || error.is_connection_dropped()
            || error.is_timeout()
        {
            LedgerError::Unavailable {
                address: self.address.clone(),
                reason: error.to_string(),
            }
        } else {
            LedgerError::Command {
                key: key.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl LedgerStore for RedisStore {
    fn exists(&self, key: &str) -> Result<bool, LedgerError> {
        let mut conn = self.connection()?;
        Commands::exists::<_, bool>(&mut *conn, key).map_err(|e| self.classify(key, e))
    }

    fn get(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let mut conn = self.connection()?;
        Commands::get::<_, Option<String>>(&mut *conn, key).map_err(|e| self.classify(key, e))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        let mut conn = self.connection()?;
        Commands::set::<_, _, ()>(&mut *conn, key, value).map_err(|e| self.classify(key, e))
    }

    fn ping(&self) -> Result<(), LedgerError> {
        let mut conn = self.connection()?;
        ::redis::cmd("PING")
            .query::<String>(&mut *conn)
            .map(|reply| debug!("Ledger store answered PING with {}.", reply))
            .map_err(|e| self.classify("PING", e))
    }

    fn describe(&self) -> String {
        format!("redis://{}", self.address)
    }
}

/// Writes a server configuration that persists the ledger into `output_dir`.
///
/// The store snapshots to `records.rdb` every `save_interval` when at least
/// `save_min_changes` keys changed. Returns the path of the written file.
pub fn write_server_config(output_dir: &Path, config: &LedgerConfig) -> io::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let data_dir = fs::canonicalize(output_dir)?;
    let path = output_dir.join(SERVER_CONFIG_FILE_NAME);
    let content = format!(
        "dbfilename {}\ndir {}\nsave {} {}\nport {}\n",
        SNAPSHOT_FILE_NAME,
        data_dir.display(),
        config.save_interval.as_secs().max(1),
        config.save_min_changes.max(1),
        config.port,
    );
    fs::write(&path, content)?;
    Ok(path)
}
