use cashubux_ledger::LedgerConfig;
use std::path::{Path, PathBuf};

use crate::error::{AdminError, AdminResult};

/// Where the ledger lives and how it is tuned.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub db_path: PathBuf,
    pub ledger: LedgerConfig,
}

impl AdminConfig {
    pub fn load(db_path: PathBuf, config_path: Option<&Path>) -> AdminResult<Self> {
        let ledger = match config_path {
            Some(path) => LedgerConfig::from_yaml_file(path).map_err(|e| {
                AdminError::InvalidConfig(format!("{}: {}", path.display(), e))
            })?,
            None => LedgerConfig::default(),
        };
        if ledger.conversion_rate <= 0 {
            return Err(AdminError::InvalidConfig(
                "conversion_rate must be positive".to_string(),
            ));
        }

        Ok(Self { db_path, ledger })
    }

    /// Fails unless the database file already exists; only `migrate` creates it.
    pub fn existing_db_path(&self) -> AdminResult<&Path> {
        if self.db_path.exists() {
            Ok(&self.db_path)
        } else {
            Err(AdminError::MissingDatabase(
                self.db_path.display().to_string(),
            ))
        }
    }
}
