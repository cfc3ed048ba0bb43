// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FilmwerkError, Result};
use crate::types::{PaperKind, PaperSize, PaperSource};

/// Persistent server settings.
///
/// Every field has a default so a partial (or absent) config file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port the print provider listens on.
    pub port: u16,
    /// Application entity title of this printer.
    pub ae_title: String,
    /// Root directory for print jobs, previews and (optionally) routes.
    /// `None` means the platform data directory.
    pub data_dir: Option<PathBuf>,
    /// Subdirectory of `data_dir` holding persisted print jobs.
    pub jobs_dir_name: String,
    /// Subdirectory of `data_dir` holding preview exports.
    pub previews_dir_name: String,
    /// Export one JPEG per image box before submitting a job.
    pub export_previews: bool,
    /// How long an N-ACTION waits for the spooler to accept a job.
    pub queued_timeout_ms: u64,
    /// File name searched for in the route locations.
    pub routes_file_name: String,
    /// Deployment root, searched first for the routes file.
    pub deployment_root: Option<PathBuf>,
    /// Printer identity reported through N-GET.
    pub manufacturer: String,
    pub model_name: String,
    pub device_serial_number: String,
    pub software_versions: String,
    /// Output devices served by the raster spooler.
    pub devices: Vec<DeviceConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 104,
            ae_title: "FILMWERK".into(),
            data_dir: None,
            jobs_dir_name: "PrintJobs".into(),
            previews_dir_name: "prints".into(),
            export_previews: true,
            queued_timeout_ms: 3000,
            routes_file_name: "routes.json".into(),
            deployment_root: None,
            manufacturer: "Filmwerk".into(),
            model_name: "Filmwerk Film Printer".into(),
            device_serial_number: String::new(),
            software_versions: env!("CARGO_PKG_VERSION").into(),
            devices: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            FilmwerkError::Config(format!("{}: {e}", path.display()))
        })?;
        info!(path = %path.display(), devices = config.devices.len(), "configuration loaded");
        Ok(config)
    }

    /// Queued-wait bound as a `Duration`.
    pub fn queued_timeout(&self) -> Duration {
        Duration::from_millis(self.queued_timeout_ms)
    }
}

/// One output device driven by the raster spooler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device name as used in route entries.
    pub name: String,
    /// Paper catalog; empty means the built-in catalog.
    pub paper_sizes: Vec<PaperSize>,
    /// Paper sources (trays).
    pub paper_sources: Vec<PaperSource>,
    /// Non-printable hard margins in hundredths of an inch.
    pub hard_margin_x: f32,
    pub hard_margin_y: f32,
    /// Where rendered pages are written.  `None` means `<data>/output/<name>`.
    pub output_dir: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            paper_sizes: Vec::new(),
            paper_sources: vec![
                PaperSource::new("Automatically Select"),
                PaperSource::new("Tray 1"),
                PaperSource::new("Tray 2"),
                PaperSource::new("Manual Feed"),
            ],
            hard_margin_x: 0.0,
            hard_margin_y: 0.0,
            output_dir: None,
        }
    }
}

impl DeviceConfig {
    /// Paper catalog for this device, falling back to the built-in one.
    pub fn catalog(&self) -> Vec<PaperSize> {
        if self.paper_sizes.is_empty() {
            default_paper_catalog()
        } else {
            self.paper_sizes.clone()
        }
    }
}

/// Paper sizes a typical office or film printer driver exposes.
pub fn default_paper_catalog() -> Vec<PaperSize> {
    vec![
        PaperSize::new("Letter", PaperKind::Letter, 850, 1100),
        PaperSize::new("Legal", PaperKind::Legal, 850, 1400),
        PaperSize::new("A4", PaperKind::A4, 827, 1169),
        PaperSize::new("A3", PaperKind::A3, 1169, 1654),
        PaperSize::new("8 x 10 in", PaperKind::Custom, 800, 1000),
        PaperSize::new("11 x 14 in", PaperKind::Custom, 1100, 1400),
        PaperSize::new("14 x 17 in", PaperKind::Custom, 1400, 1700),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let config = ServerConfig::load("/definitely/not/here/filmwerk.json").unwrap();
        assert_eq!(config.port, 104);
        assert_eq!(config.queued_timeout(), Duration::from_secs(3));
        assert!(config.export_previews);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "port": 11112, "devices": [{ "name": "Film Laser" }] }"#)
                .unwrap();
        assert_eq!(config.port, 11112);
        assert_eq!(config.ae_title, "FILMWERK");
        assert_eq!(config.devices[0].paper_sources.len(), 4);
        assert_eq!(config.devices[0].catalog(), default_paper_catalog());
    }
}
