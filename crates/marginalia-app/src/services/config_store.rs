// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings persistence — `config.json` in the data directory.
//
// A missing, unreadable or invalid file never stops the app; the defaults
// are used instead and the problem is logged.

use std::path::{Path, PathBuf};

use marginalia_core::AppConfig;
use marginalia_core::error::Result;
use tracing::{debug, info, warn};

pub const CONFIG_FILE: &str = "config.json";

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Load persisted settings, falling back to defaults.
pub fn load_config(data_dir: &Path) -> AppConfig {
    let path = config_path(data_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) => {
            debug!(path = %path.display(), %err, "No settings file; using defaults");
            return AppConfig::default();
        }
    };

    let config: AppConfig = match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), %err, "Settings file is not valid JSON; using defaults");
            return AppConfig::default();
        }
    };

    if let Err(err) = config.extraction.validate() {
        warn!(path = %path.display(), %err, "Settings rejected; using defaults");
        return AppConfig::default();
    }

    info!(path = %path.display(), "Settings loaded");
    config
}

/// Write settings as pretty JSON.
pub fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    config.extraction.validate()?;
    let path = config_path(data_dir);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    debug!(path = %path.display(), "Settings saved");
    Ok(())
}
