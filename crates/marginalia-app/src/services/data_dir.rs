// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::PathBuf;

use tracing::warn;

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = base_dir().join("marginalia");
    ensure(&dir);
    dir
}

/// Return a subdirectory inside the data dir (e.g. "extractions").
pub fn data_subdir(name: &str) -> PathBuf {
    let dir = data_dir().join(name);
    ensure(&dir);
    dir
}

fn ensure(dir: &std::path::Path) {
    if let Err(err) = std::fs::create_dir_all(dir) {
        warn!(path = %dir.display(), %err, "Could not create data directory");
    }
}

fn base_dir() -> PathBuf {
    // XDG data dir, then ~/.local/share
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
