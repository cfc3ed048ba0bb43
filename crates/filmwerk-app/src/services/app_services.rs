// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer for the operator CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use filmwerk_core::config::ServerConfig;
use filmwerk_core::error::{FilmwerkError, Result};
use filmwerk_core::types::{PaperSize, PrintJobStatus};
use filmwerk_print::routes::{RouteItem, RouteLocations, RouteResolver, RoutingConfig};
use filmwerk_print::spooler::{RasterSpooler, Spooler};
use filmwerk_print::storage::JobStorage;
use filmwerk_print::{JobOptions, JobRequest, JobStatusEvent, PrintJobEngine};
use filmwerk_render::paper::{PageRequest, configure_page};
use filmwerk_render::LayoutFilmRenderer;

use super::data_dir;

/// Originator recorded on jobs started from the command line.
const CLI_ORIGINATOR: &str = "FILMWERK-CLI";

pub struct AppServices {
    config: ServerConfig,
    data_dir: PathBuf,
    resolver: Arc<RouteResolver>,
    spooler: Arc<RasterSpooler>,
}

impl AppServices {
    /// Load configuration (defaults when `config_path` is `None` or
    /// missing) and locate the routes file.
    pub fn init(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        let dir = data_dir::data_dir(config.data_dir.as_deref());

        let locations = RouteLocations {
            deployment_root: config.deployment_root.clone(),
            app_base: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from(".")),
            data_dir: Some(dir.clone()),
        };
        let resolver = Arc::new(RouteResolver::locate(&locations, &config.routes_file_name));
        let spooler = Arc::new(RasterSpooler::new(config.devices.clone(), dir.join("output")));

        info!(data_dir = %dir.display(), devices = config.devices.len(), "services initialised");
        Ok(Self {
            config,
            data_dir: dir,
            resolver,
            spooler,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn routes_path(&self) -> &Path {
        self.resolver.path()
    }

    pub fn routes(&self) -> Arc<RoutingConfig> {
        self.resolver.load()
    }

    pub fn resolve(&self, caller: &str, called: &str) -> Option<RouteItem> {
        self.resolver.resolve(caller, called)
    }

    /// The named device, or the first configured one.
    pub fn printer_name(&self, explicit: Option<&str>) -> Result<String> {
        match explicit {
            Some(name) => Ok(name.to_string()),
            None => self
                .config
                .devices
                .first()
                .map(|d| d.name.clone())
                .ok_or_else(|| FilmwerkError::Config("no output devices configured".into())),
        }
    }

    /// Paper a device would use for a film of `film_size_id`.
    pub fn paper_for(&self, printer: &str, film_size_id: &str) -> Result<PaperSize> {
        let device = self.spooler.capabilities(printer)?;
        let mut settings = device.default_page_settings();
        configure_page(
            &mut settings,
            &device,
            &PageRequest {
                film_size_id: Some(film_size_id),
                ..Default::default()
            },
        );
        Ok(settings.paper_size)
    }

    /// Print a persisted job folder again and wait for the outcome.
    ///
    /// `on_event` sees every status change in order.
    pub async fn reprint(
        &self,
        job_dir: &Path,
        printer: Option<&str>,
        fit_to_page: bool,
        mut on_event: impl FnMut(&JobStatusEvent),
    ) -> Result<PrintJobStatus> {
        let job_uid = job_dir
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| FilmwerkError::Storage(format!("not a job folder: {}", job_dir.display())))?;
        let root = job_dir.parent().unwrap_or_else(|| Path::new("."));

        let engine = PrintJobEngine::new(
            JobStorage::new(root),
            Arc::clone(&self.spooler) as Arc<dyn Spooler>,
            Arc::new(LayoutFilmRenderer::default()),
        );
        let request = JobRequest {
            printer_name: self.printer_name(printer)?,
            originator: CLI_ORIGINATOR.to_string(),
            options: JobOptions {
                fit_to_page,
                ..Default::default()
            },
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let job = engine.resume(job_uid, request, tx)?;
        while let Some(event) = rx.recv().await {
            on_event(&event);
            if event.status.is_terminal() {
                return Ok(event.status);
            }
        }
        Ok(job.status())
    }
}
