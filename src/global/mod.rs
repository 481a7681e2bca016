//! Filesystem locations.
//!
//! Two files matter: the TOML config under the platform config dir and the
//! SQLite store under the platform data dir, with a `~/.local/share`
//! fallback for hosts where the data dir cannot be resolved.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "airtime";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "airtime.db";

pub fn config_file() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Unable to determine config directory")?;
    Ok(dir.join(APP_DIR).join(CONFIG_FILE))
}

pub fn db_file() -> Result<PathBuf> {
    Ok(data_dir()?.join(DB_FILE))
}

fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = dirs::data_dir() {
        return Ok(dir.join(APP_DIR));
    }
    if let Some(home) = dirs::home_dir() {
        return Ok(home.join(".local").join("share").join(APP_DIR));
    }
    Err(anyhow!("Unable to determine data directory"))
}
