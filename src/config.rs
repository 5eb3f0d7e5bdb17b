//! Resolved runtime settings for the `study` binary.

use crate::clock::{OffsetClock, SystemClock};
use crate::database::{self, Database};
use std::path::PathBuf;

pub const DEFAULT_DATABASE: &str = "study.sqlite3";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    /// Number of `-v` flags given.
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            verbosity: 0,
        }
    }
}

impl Config {
    pub fn new(database_path: PathBuf, verbosity: u8) -> Self {
        Self {
            database_path,
            verbosity,
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    pub fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.log_filter());
        env_logger::Builder::from_env(env).init();
    }

    pub fn open_database(&self) -> database::Result<Database> {
        Database::open(&self.database_path)
    }

    /// Wall clock moved forward by the simulated days stored in `db`.
    pub fn clock(&self, db: &Database) -> database::Result<OffsetClock<SystemClock>> {
        Ok(OffsetClock::new(SystemClock, db.day_offset()?))
    }
}
