pub mod models;
pub mod services;
pub mod commands;
pub mod db;
pub mod utils;

use anyhow::Result;
use db::database::Database;
use std::path::PathBuf;

pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        log::info!("打开数据目录: {}", data_dir.display());
        Ok(Self {
            db: Database::new(data_dir)?,
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
        })
    }
}
