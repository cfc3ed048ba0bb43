// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Return the data directory, creating it if needed.
///
/// A configured directory wins; otherwise `filmwerk` under the XDG data
/// home.
pub fn data_dir(configured: Option<&Path>) -> PathBuf {
    let dir = match configured {
        Some(dir) => dir.to_path_buf(),
        None => dirs_fallback().join("filmwerk"),
    };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        warn!(path = %dir.display(), error = %e, "cannot create data directory");
    }
    dir
}

fn dirs_fallback() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_directory_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let wanted = tmp.path().join("nested").join("data");
        assert_eq!(data_dir(Some(&wanted)), wanted);
        assert!(wanted.is_dir());
    }
}
