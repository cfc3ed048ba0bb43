// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print job engine.
//
// `submit` persists the films of a job synchronously, then hands the job to
// a blocking worker that drives the spooler.  Status changes are pushed, in
// order, to the channel supplied at submission:
//
//   Pending ──► Printing ──► Done
//      │            └──────► Failure
//      └──────────────────► Failure   (persistence failed, nothing printed)
//
// Callers that only need to know the spooler accepted the job wait on the
// "queued" signal with a bound.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use filmwerk_core::dataset::{Dataset, Tag, tags};
use filmwerk_core::error::{FilmwerkError, Result};
use filmwerk_core::film::{FilmBox, FilmSession};
use filmwerk_core::protocol::{self, generate_uid};
use filmwerk_core::types::{DuplexMode, PrintJobStatus};
use filmwerk_render::FilmRenderer;

use crate::pages::FilmPageProducer;
use crate::printer::select_attributes;
use crate::routes::RouteItem;
use crate::spooler::{SpoolRequest, Spooler};
use crate::storage::JobStorage;

// ---------------------------------------------------------------------------
// Job options and events
// ---------------------------------------------------------------------------

/// Per-job output overrides, taken from the matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    pub duplex: Option<DuplexMode>,
    pub forced_paper_size: Option<String>,
    pub forced_paper_source: Option<String>,
    pub fit_to_page: bool,
    pub send_event_reports: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            duplex: None,
            forced_paper_size: None,
            forced_paper_source: None,
            fit_to_page: true,
            send_event_reports: false,
        }
    }
}

impl From<&RouteItem> for JobOptions {
    fn from(route: &RouteItem) -> Self {
        Self {
            duplex: route.duplex_mode(),
            forced_paper_size: route.force_paper_size.clone(),
            forced_paper_source: route.force_tray.clone(),
            fit_to_page: route.fit_to_page(),
            send_event_reports: route.send_event_reports(),
        }
    }
}

/// What to print and where.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Output device, resolved at submission and fixed for the job.
    pub printer_name: String,
    /// Calling AE title.
    pub originator: String,
    pub options: JobOptions,
}

/// One status change of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusEvent {
    pub job_uid: String,
    pub status: PrintJobStatus,
    pub info: String,
    pub film_session_label: String,
    pub printer_name: String,
}

// ---------------------------------------------------------------------------
// PrintJob
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct JobState {
    status: PrintJobStatus,
    info: String,
    error: Option<String>,
    folders: Vec<String>,
}

/// A print job, shared between the engine's worker and the front-end.
#[derive(Debug)]
pub struct PrintJob {
    uid: String,
    printer_name: String,
    originator: String,
    film_session_label: String,
    created_at: DateTime<Local>,
    options: JobOptions,
    state: Mutex<JobState>,
    queued: watch::Sender<bool>,
    events: mpsc::UnboundedSender<JobStatusEvent>,
}

impl PrintJob {
    pub(crate) fn new(
        uid: String,
        request: JobRequest,
        film_session_label: String,
        events: mpsc::UnboundedSender<JobStatusEvent>,
    ) -> Self {
        Self {
            uid,
            printer_name: request.printer_name,
            originator: request.originator,
            film_session_label,
            created_at: Local::now(),
            options: request.options,
            state: Mutex::new(JobState {
                status: PrintJobStatus::Pending,
                info: String::new(),
                error: None,
                folders: Vec::new(),
            }),
            queued: watch::channel(false).0,
            events,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn printer_name(&self) -> &str {
        &self.printer_name
    }

    pub fn film_session_label(&self) -> &str {
        &self.film_session_label
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    pub fn status(&self) -> PrintJobStatus {
        self.lock().status
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Persisted film folders, in print order.
    pub fn folders(&self) -> Vec<String> {
        self.lock().folders.clone()
    }

    pub fn is_queued(&self) -> bool {
        *self.queued.borrow()
    }

    /// Wait until the spooler has accepted the job.
    ///
    /// `false` when `timeout` elapses first; that is not an error.
    pub async fn wait_until_queued(&self, timeout: Duration) -> bool {
        let mut queued = self.queued.subscribe();
        matches!(
            tokio::time::timeout(timeout, queued.wait_for(|q| *q)).await,
            Ok(Ok(_))
        )
    }

    /// Print Job SOP instance attributes.
    pub fn attributes(&self) -> Dataset {
        let (status, info) = {
            let state = self.lock();
            (state.status, state.info.clone())
        };
        Dataset::new()
            .with(tags::SOP_CLASS_UID, protocol::PRINT_JOB)
            .with(tags::SOP_INSTANCE_UID, self.uid.as_str())
            .with(tags::EXECUTION_STATUS, status.as_attribute())
            .with(tags::EXECUTION_STATUS_INFO, info)
            .with(tags::PRINT_PRIORITY, "MED")
            .with(tags::CREATION_DATE, self.created_at.format("%Y%m%d").to_string())
            .with(tags::CREATION_TIME, self.created_at.format("%H%M%S").to_string())
            .with(tags::PRINTER_NAME, self.printer_name.as_str())
            .with(tags::ORIGINATOR, self.originator.as_str())
    }

    /// Exactly the requested attributes, empty text where unknown.
    pub fn get_attributes(&self, requested: &[Tag]) -> Dataset {
        select_attributes(&self.attributes(), requested)
    }

    pub(crate) fn mark_queued(&self) {
        if !self.queued.send_replace(true) {
            debug!(job = %self.uid, "print job queued");
        }
    }

    /// Report progress without changing status.
    pub(crate) fn progress(&self, info: &str) {
        let status = self.status();
        self.set_status(status, info);
    }

    pub(crate) fn set_folders(&self, folders: Vec<String>) {
        self.lock().folders = folders;
    }

    fn fail(&self, err: &FilmwerkError, info: &str) {
        self.lock().error = Some(err.to_string());
        self.set_status(PrintJobStatus::Failure, info);
    }

    fn set_status(&self, status: PrintJobStatus, info: &str) {
        {
            let mut state = self.lock();
            if state.status != status && !state.status.can_transition_to(status) {
                warn!(job = %self.uid, from = %state.status, to = %status, "ignoring invalid job transition");
                return;
            }
            state.status = status;
            state.info = info.to_string();
        }

        let short_uid = self.uid.rsplit('.').next().unwrap_or(&self.uid);
        if status == PrintJobStatus::Failure {
            error!(job = short_uid, status = %status, "{info}");
        } else {
            info!(job = short_uid, status = %status, "{info}");
        }

        let event = JobStatusEvent {
            job_uid: self.uid.clone(),
            status,
            info: info.to_string(),
            film_session_label: self.film_session_label.clone(),
            printer_name: self.printer_name.clone(),
        };
        if self.events.send(event).is_err() {
            debug!(job = %self.uid, "status subscriber gone");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Persists and executes print jobs.
pub struct PrintJobEngine {
    storage: JobStorage,
    spooler: Arc<dyn Spooler>,
    renderer: Arc<dyn FilmRenderer>,
}

impl PrintJobEngine {
    pub fn new(storage: JobStorage, spooler: Arc<dyn Spooler>, renderer: Arc<dyn FilmRenderer>) -> Self {
        Self {
            storage,
            spooler,
            renderer,
        }
    }

    pub fn storage(&self) -> &JobStorage {
        &self.storage
    }

    pub fn spooler(&self) -> &Arc<dyn Spooler> {
        &self.spooler
    }

    /// Persist `film_boxes` and start printing them.
    ///
    /// The returned job is already in Failure when persistence failed; its
    /// storage has then been removed and nothing runs.  Must be called from
    /// within a Tokio runtime.
    pub fn submit(
        &self,
        request: JobRequest,
        session: &FilmSession,
        film_boxes: &[FilmBox],
        events: mpsc::UnboundedSender<JobStatusEvent>,
    ) -> Arc<PrintJob> {
        let job = Arc::new(PrintJob::new(generate_uid(), request, session.label(), events));
        job.set_status(PrintJobStatus::Pending, "Preparing films for printing");

        match self.storage.persist(&job.uid, session, film_boxes, 0) {
            Ok(folders) => {
                job.set_folders(folders);
                self.start(Arc::clone(&job));
            }
            Err(e) => {
                warn!(job = %job.uid, error = %e, "failed to persist print job");
                job.fail(&e, "Print failed");
                self.storage.delete_job(&job.uid);
            }
        }
        job
    }

    /// Print an already persisted job folder again.
    pub fn resume(
        &self,
        job_uid: &str,
        request: JobRequest,
        events: mpsc::UnboundedSender<JobStatusEvent>,
    ) -> Result<Arc<PrintJob>> {
        let folders = self.storage.folders(job_uid)?;
        let first = folders
            .first()
            .ok_or_else(|| FilmwerkError::Storage(format!("job {job_uid} has no films")))?;
        let (session, _) = self.storage.load(job_uid, first)?;

        let job = Arc::new(PrintJob::new(job_uid.to_string(), request, session.label(), events));
        job.set_status(PrintJobStatus::Pending, "Preparing films for printing");
        job.set_folders(folders);
        self.start(Arc::clone(&job));
        Ok(job)
    }

    fn start(&self, job: Arc<PrintJob>) {
        let storage = self.storage.clone();
        let spooler = Arc::clone(&self.spooler);
        let renderer = Arc::clone(&self.renderer);

        tokio::spawn(async move {
            let worker = Arc::clone(&job);
            let joined =
                tokio::task::spawn_blocking(move || execute(&worker, storage, spooler, renderer)).await;
            if let Err(e) = joined {
                job.fail(
                    &FilmwerkError::Spooler(format!("print worker died: {e}")),
                    "Printing failed",
                );
            }
        });
    }
}

fn execute(
    job: &Arc<PrintJob>,
    storage: JobStorage,
    spooler: Arc<dyn Spooler>,
    renderer: Arc<dyn FilmRenderer>,
) {
    job.set_status(PrintJobStatus::Printing, "Printing Started");

    let request = SpoolRequest {
        printer_name: job.printer_name.clone(),
        duplex: job.options.duplex,
        document_name: format!("PrintJob {}", job.uid),
    };
    let outcome = spooler.capabilities(&job.printer_name).and_then(|device| {
        let mut pages = FilmPageProducer::new(Arc::clone(job), storage, renderer, device);
        spooler.print(&request, &mut pages)
    });

    match outcome {
        Ok(()) => job.set_status(PrintJobStatus::Done, "Printing Done"),
        Err(e) => job.fail(&e, "Printing failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmwerk_core::config::DeviceConfig;
    use filmwerk_render::LayoutFilmRenderer;

    use crate::spooler::RasterSpooler;

    fn engine(root: &std::path::Path) -> PrintJobEngine {
        let spooler = RasterSpooler::new(
            vec![DeviceConfig {
                name: "Film Laser".into(),
                ..Default::default()
            }],
            root.join("output"),
        );
        PrintJobEngine::new(
            JobStorage::new(root.join("PrintJobs")),
            Arc::new(spooler),
            Arc::new(LayoutFilmRenderer::default()),
        )
    }

    fn session(films: usize) -> FilmSession {
        let mut session = FilmSession::new(
            None,
            Dataset::new().with(tags::FILM_SESSION_LABEL, "CHEST PA"),
            false,
        );
        for _ in 0..films {
            session
                .create_film_box(
                    None,
                    Dataset::new()
                        .with(tags::IMAGE_DISPLAY_FORMAT, "STANDARD\\1,1")
                        .with(tags::FILM_SIZE_ID, "8INX10IN"),
                )
                .unwrap();
        }
        session
    }

    fn request(printer: &str) -> JobRequest {
        JobRequest {
            printer_name: printer.into(),
            originator: "CT01".into(),
            options: JobOptions::default(),
        }
    }

    async fn drain_until_terminal(rx: &mut mpsc::UnboundedReceiver<JobStatusEvent>) -> Vec<JobStatusEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
            let terminal = event.status.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn successful_job_runs_pending_printing_done() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let session = session(2);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let job = engine.submit(request("Film Laser"), &session, session.film_boxes(), tx);
        assert!(job.wait_until_queued(Duration::from_secs(10)).await);

        let events = drain_until_terminal(&mut rx).await;
        let trace: Vec<(PrintJobStatus, &str)> =
            events.iter().map(|e| (e.status, e.info.as_str())).collect();
        assert_eq!(
            trace,
            vec![
                (PrintJobStatus::Pending, "Preparing films for printing"),
                (PrintJobStatus::Printing, "Printing Started"),
                (PrintJobStatus::Printing, "Printing film 1 of 2"),
                (PrintJobStatus::Printing, "Printing film 2 of 2"),
                (PrintJobStatus::Done, "Printing Done"),
            ]
        );
        assert!(events.iter().all(|e| e.film_session_label == "CHEST PA"));
        assert!(events.iter().all(|e| e.printer_name == "Film Laser"));

        assert_eq!(job.status(), PrintJobStatus::Done);
        assert_eq!(job.folders(), vec!["F000001", "F000002"]);
        let pages = std::fs::read_dir(tmp.path().join("output/Film_Laser")).unwrap().count();
        assert_eq!(pages, 2);
    }

    #[test]
    fn persistence_failure_never_starts() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let session = session(0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let job = engine.submit(request("Film Laser"), &session, session.film_boxes(), tx);

        assert_eq!(job.status(), PrintJobStatus::Failure);
        assert!(job.error().is_some());
        assert!(!engine.storage().job_dir(job.uid()).exists());
        assert_eq!(rx.try_recv().unwrap().status, PrintJobStatus::Pending);
        let failure = rx.try_recv().unwrap();
        assert_eq!((failure.status, failure.info.as_str()), (PrintJobStatus::Failure, "Print failed"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn execution_failure_is_terminal_and_never_queued() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let session = session(1);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let job = engine.submit(request("Unplugged"), &session, session.film_boxes(), tx);
        let statuses: Vec<PrintJobStatus> =
            drain_until_terminal(&mut rx).await.iter().map(|e| e.status).collect();

        assert_eq!(
            statuses,
            vec![PrintJobStatus::Pending, PrintJobStatus::Printing, PrintJobStatus::Failure]
        );
        assert!(!job.wait_until_queued(Duration::from_millis(50)).await);
        assert!(job.error().unwrap().contains("Unplugged"));
    }

    #[tokio::test]
    async fn resume_reprints_persisted_job() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let session = session(1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let job = engine.submit(request("Film Laser"), &session, session.film_boxes(), tx.clone());
        drain_until_terminal(&mut rx).await;

        let again = engine.resume(job.uid(), request("Film Laser"), tx).unwrap();
        let last = drain_until_terminal(&mut rx).await.pop().unwrap();
        assert_eq!(last.status, PrintJobStatus::Done);
        assert_eq!(again.film_session_label(), "CHEST PA");
        assert!(engine.resume("missing", request("Film Laser"), mpsc::unbounded_channel().0).is_err());
    }

    #[test]
    fn job_attributes() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let job = PrintJob::new("1.2.3".into(), request("Film Laser"), "LABEL".into(), tx);

        let ds = job.attributes();
        assert_eq!(ds.get_text(tags::EXECUTION_STATUS), Some("PENDING"));
        assert_eq!(ds.get_text(tags::PRINT_PRIORITY), Some("MED"));
        assert_eq!(ds.get_text(tags::ORIGINATOR), Some("CT01"));

        let some = job.get_attributes(&[tags::PRINTER_NAME, tags::MEDIUM_TYPE]);
        assert_eq!(some.get_text(tags::PRINTER_NAME), Some("Film Laser"));
        assert_eq!(some.get_text(tags::MEDIUM_TYPE), Some(""));
    }

    #[test]
    fn route_options() {
        let route = RouteItem {
            duplex: Some("short".into()),
            force_tray: Some("Tray 2".into()),
            send_event_reports: Some(true),
            ..Default::default()
        };
        let options = JobOptions::from(&route);
        assert_eq!(options.duplex, Some(DuplexMode::ShortEdge));
        assert_eq!(options.forced_paper_source.as_deref(), Some("Tray 2"));
        assert!(options.fit_to_page);
        assert!(options.send_event_reports);
    }
}
