// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Config file persistence.

use std::path::Path;

use penscript_core::config::AppConfig;
use penscript_core::error::Result;
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";

/// Load `config.json` from `data_dir`, or the defaults when it is missing or
/// unreadable.
pub fn load_config(data_dir: &Path) -> AppConfig {
    let path = data_dir.join(CONFIG_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(_) => return AppConfig::default(),
    };
    match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable config");
            AppConfig::default()
        }
    }
}

/// Write `config` to `data_dir` as pretty-printed JSON.
pub fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

/// Load the config, writing the defaults out on first run.
pub fn load_or_init(data_dir: &Path) -> AppConfig {
    if data_dir.join(CONFIG_FILE).exists() {
        return load_config(data_dir);
    }
    let config = AppConfig::default();
    match persist_config(data_dir, &config) {
        Ok(()) => info!(dir = %data_dir.display(), "default config written"),
        Err(err) => warn!(error = %err, "could not write default config"),
    }
    config
}
