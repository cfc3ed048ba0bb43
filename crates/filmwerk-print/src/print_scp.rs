// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DICOM Basic Print Management service class provider.
//
// `PrintServer` listens on a TCP port and hands each accepted socket to the
// configured `AssociationTransport`.  Every association gets its own
// `PrintService`, which owns the film session registry for that connection
// and answers requests one at a time.
//
// # Supported operations
//
//   - C-ECHO     Verification
//   - N-CREATE   Film Session, Film Box
//   - N-SET      Film Session, Film Box, Grayscale / Color Image Box
//   - N-DELETE   Film Session, Film Box
//   - N-GET      Printer, Printer Configuration Retrieval, Print Job
//   - N-ACTION   Film Session, Film Box (print)
//
// Print job status changes are forwarded as N-EVENT-REPORT when the route
// that produced the job asks for them.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::time::Duration;

use chrono::Local;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use filmwerk_core::config::ServerConfig;
use filmwerk_core::dataset::{Dataset, Tag, tags};
use filmwerk_core::error::{FilmwerkError, Result};
use filmwerk_core::film::FilmBox;
use filmwerk_core::protocol::{self, DimseStatus};
use filmwerk_core::types::{PrintJobStatus, ServerStatus};
use filmwerk_render::preview::{export_previews, preview_dir};
use filmwerk_render::{FilmRenderer, LayoutFilmRenderer};

use crate::dimse::{
    AssociationAccept, AssociationRequest, AssociationTransport, ContextResult, DimseCommand,
    DimseRequest, DimseResponse, EventReport, OutboundMessage, PeerConnection, PeerEvent,
};
use crate::job::{JobOptions, JobRequest, JobStatusEvent, PrintJobEngine};
use crate::printer::{Printer, select_attributes};
use crate::routes::RouteResolver;
use crate::session::{FilmSessionRegistry, RegistryError};
use crate::spooler::Spooler;
use crate::storage::JobStorage;

/// Abstract syntaxes this provider accepts.
const SUPPORTED_ABSTRACT_SYNTAXES: [&str; 9] = [
    protocol::VERIFICATION,
    protocol::BASIC_GRAYSCALE_PRINT_MANAGEMENT_META,
    protocol::BASIC_COLOR_PRINT_MANAGEMENT_META,
    protocol::PRINTER,
    protocol::BASIC_FILM_SESSION,
    protocol::BASIC_FILM_BOX,
    protocol::BASIC_GRAYSCALE_IMAGE_BOX,
    protocol::BASIC_COLOR_IMAGE_BOX,
    protocol::PRINT_JOB,
];

/// Calling AE title used for routing when the peer sent none.
const UNKNOWN_CALLER: &str = "<unknown>";

// ---------------------------------------------------------------------------
// Shared service context
// ---------------------------------------------------------------------------

/// State shared by every association of one server.
pub struct ServiceContext {
    pub printer: Arc<Printer>,
    pub resolver: Arc<RouteResolver>,
    pub engine: PrintJobEngine,
    /// Root of preview exports; `None` disables them.
    pub previews_root: Option<PathBuf>,
    pub queued_timeout: Duration,
}

impl ServiceContext {
    pub fn new(
        config: &ServerConfig,
        data_dir: &Path,
        ae_title: &str,
        spooler: Arc<dyn Spooler>,
        resolver: Arc<RouteResolver>,
        renderer: Arc<dyn FilmRenderer>,
    ) -> Self {
        let storage = JobStorage::new(data_dir.join(&config.jobs_dir_name));
        Self {
            printer: Arc::new(Printer::new(ae_title, config)),
            resolver,
            engine: PrintJobEngine::new(storage, spooler, renderer),
            previews_root: config
                .export_previews
                .then(|| data_dir.join(&config.previews_dir_name)),
            queued_timeout: config.queued_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-association service
// ---------------------------------------------------------------------------

/// Response to a request, and whether the association must then be aborted.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub response: DimseResponse,
    pub abort: bool,
}

impl Reply {
    fn send(response: DimseResponse) -> Self {
        Self {
            response,
            abort: false,
        }
    }

    fn abort(response: DimseResponse) -> Self {
        Self {
            response,
            abort: true,
        }
    }
}

/// Print management for one association.
pub struct PrintService {
    context: Arc<ServiceContext>,
    calling_ae: String,
    called_ae: String,
    print_job_negotiated: bool,
    registry: Mutex<FilmSessionRegistry>,
    events: mpsc::UnboundedSender<JobStatusEvent>,
    next_message_id: AtomicU16,
}

impl PrintService {
    /// `events` receives the status changes of every job submitted here.
    pub fn new(context: Arc<ServiceContext>, events: mpsc::UnboundedSender<JobStatusEvent>) -> Self {
        Self {
            context,
            calling_ae: String::new(),
            called_ae: String::new(),
            print_job_negotiated: false,
            registry: Mutex::new(FilmSessionRegistry::new()),
            events,
            next_message_id: AtomicU16::new(1),
        }
    }

    pub fn calling_ae(&self) -> &str {
        &self.calling_ae
    }

    pub fn called_ae(&self) -> &str {
        &self.called_ae
    }

    /// Whether the peer proposed the Print Job SOP class.
    pub fn print_job_negotiated(&self) -> bool {
        self.print_job_negotiated
    }

    /// Accept the supported presentation contexts, reject the rest.
    pub fn on_association_request(&mut self, request: &AssociationRequest) -> AssociationAccept {
        self.calling_ae = request.calling_ae.trim().to_string();
        self.called_ae = request.called_ae.trim().to_string();
        info!(calling = %self.calling_ae, called = %self.called_ae, "association requested");

        let contexts = request
            .presentation_contexts
            .iter()
            .map(|pc| {
                let syntax = pc.abstract_syntax.as_str();
                if !SUPPORTED_ABSTRACT_SYNTAXES.contains(&syntax) {
                    warn!(context = pc.id, abstract_syntax = syntax, "requested abstract syntax not supported");
                    return (pc.id, ContextResult::AbstractSyntaxNotSupported);
                }
                if syntax == protocol::PRINT_JOB {
                    self.print_job_negotiated = true;
                }

                let chosen = pc
                    .transfer_syntaxes
                    .iter()
                    .find(|ts| protocol::ACCEPTED_TRANSFER_SYNTAXES.contains(&ts.as_str()));
                match chosen {
                    Some(ts) => (pc.id, ContextResult::Accepted { transfer_syntax: ts.clone() }),
                    None => {
                        warn!(context = pc.id, abstract_syntax = syntax, "no acceptable transfer syntax");
                        (pc.id, ContextResult::TransferSyntaxesNotSupported)
                    }
                }
            })
            .collect();

        AssociationAccept { contexts }
    }

    /// Handle one request under the association lock.
    pub async fn on_request(&self, request: &DimseRequest) -> Reply {
        let mut registry = self.registry.lock().await;
        debug!(
            message_id = request.message_id,
            command = request.command.name(),
            sop_class = request.command.sop_class_uid().unwrap_or("-"),
            "request received"
        );

        match &request.command {
            DimseCommand::CEcho => Reply::send(DimseResponse::new(request, DimseStatus::Success)),
            DimseCommand::NCreate {
                sop_class_uid,
                sop_instance_uid,
                dataset,
            } => self.create(&mut registry, request, sop_class_uid, sop_instance_uid.as_deref(), dataset),
            DimseCommand::NSet {
                sop_class_uid,
                sop_instance_uid,
                dataset,
            } => Reply::send(set(&mut registry, request, sop_class_uid, sop_instance_uid, dataset)),
            DimseCommand::NDelete {
                sop_class_uid,
                sop_instance_uid,
            } => Reply::send(delete(&mut registry, request, sop_class_uid, sop_instance_uid)),
            DimseCommand::NGet {
                sop_class_uid,
                sop_instance_uid,
                attributes,
            } => Reply::send(self.get(&registry, request, sop_class_uid, sop_instance_uid, attributes)),
            DimseCommand::NAction {
                sop_class_uid,
                sop_instance_uid,
                action_type_id,
            } => Reply::send(
                self.action(&mut registry, request, sop_class_uid, sop_instance_uid, *action_type_id)
                    .await,
            ),
        }
    }

    /// N-EVENT-REPORT for a job status change, when its route wants one.
    pub async fn event_report(&self, event: JobStatusEvent) -> Option<EventReport> {
        let registry = self.registry.lock().await;
        let job = registry.job(&event.job_uid)?;
        if !job.options().send_event_reports {
            return None;
        }

        Some(EventReport {
            message_id: self.next_message_id.fetch_add(1, Ordering::Relaxed),
            sop_class_uid: protocol::PRINT_JOB.to_string(),
            sop_instance_uid: event.job_uid,
            event_type_id: event.status.event_type_id(),
            dataset: Dataset::new()
                .with(tags::EXECUTION_STATUS_INFO, event.info)
                .with(tags::FILM_SESSION_LABEL, event.film_session_label)
                .with(tags::PRINTER_NAME, event.printer_name),
        })
    }

    /// Forget the film session and job references of this association.
    pub async fn clean(&self) {
        self.registry.lock().await.clear();
    }

    // -- N-CREATE -----------------------------------------------------------

    fn create(
        &self,
        registry: &mut FilmSessionRegistry,
        request: &DimseRequest,
        sop_class_uid: &str,
        sop_instance_uid: Option<&str>,
        dataset: &Dataset,
    ) -> Reply {
        let created = match sop_class_uid {
            protocol::BASIC_FILM_SESSION => {
                let color =
                    request.abstract_syntax.as_deref() == Some(protocol::BASIC_COLOR_PRINT_MANAGEMENT_META);
                registry
                    .create_session(sop_instance_uid, dataset.clone(), color)
                    .map(|session| (session.sop_instance_uid.clone(), session.attributes().clone()))
            }
            protocol::BASIC_FILM_BOX => registry
                .create_film_box(sop_instance_uid, dataset.clone())
                .map(|film_box| (film_box.sop_instance_uid.clone(), film_box.attributes().clone())),
            _ => return Reply::send(DimseResponse::new(request, DimseStatus::NoSuchSopClass)),
        };

        match created {
            Ok((uid, attributes)) => Reply::send(
                DimseResponse::new(request, DimseStatus::Success)
                    .with_instance(uid)
                    .with_dataset(attributes),
            ),
            Err(e) => {
                error!(sop_class = sop_class_uid, error = %e, "N-CREATE rejected, aborting association");
                Reply::abort(DimseResponse::new(request, e.status()))
            }
        }
    }

    // -- N-GET --------------------------------------------------------------

    fn get(
        &self,
        registry: &FilmSessionRegistry,
        request: &DimseRequest,
        sop_class_uid: &str,
        sop_instance_uid: &str,
        attributes: &[Tag],
    ) -> DimseResponse {
        let dataset = match sop_class_uid {
            protocol::PRINTER => {
                if sop_instance_uid != protocol::PRINTER_INSTANCE {
                    return DimseResponse::new(request, DimseStatus::NoSuchObjectInstance);
                }
                let printer = &self.context.printer;
                if attributes.is_empty() {
                    printer.default_attributes()
                } else {
                    printer.get_attributes(attributes)
                }
            }
            protocol::PRINTER_CONFIGURATION_RETRIEVAL => {
                if sop_instance_uid != protocol::PRINTER_CONFIGURATION_RETRIEVAL_INSTANCE {
                    return DimseResponse::new(request, DimseStatus::NoSuchObjectInstance);
                }
                let configuration =
                    Dataset::new().with(tags::PRINTER_CONFIGURATION_SEQUENCE, vec![Dataset::new()]);
                if attributes.is_empty() {
                    configuration
                } else {
                    select_attributes(&configuration, attributes)
                }
            }
            protocol::PRINT_JOB => match registry.job(sop_instance_uid) {
                Some(_) if attributes.is_empty() => Dataset::new(),
                Some(job) => job.get_attributes(attributes),
                None => return DimseResponse::new(request, DimseStatus::NoSuchObjectInstance),
            },
            _ => return DimseResponse::new(request, DimseStatus::NoSuchSopClass),
        };

        DimseResponse::new(request, DimseStatus::Success)
            .with_instance(sop_instance_uid)
            .with_dataset(dataset)
    }

    // -- N-ACTION -----------------------------------------------------------

    async fn action(
        &self,
        registry: &mut FilmSessionRegistry,
        request: &DimseRequest,
        sop_class_uid: &str,
        sop_instance_uid: &str,
        action_type_id: u16,
    ) -> DimseResponse {
        let printer = &self.context.printer;
        let caller = if self.calling_ae.is_empty() {
            UNKNOWN_CALLER
        } else {
            self.calling_ae.as_str()
        };
        let called = if self.called_ae.is_empty() {
            printer.ae_title()
        } else {
            self.called_ae.as_str()
        };

        let Some(route) = self.context.resolver.resolve(caller, called) else {
            error!(
                caller,
                called,
                routes = %self.context.resolver.path().display(),
                "no route for caller/called pair"
            );
            return DimseResponse::new(request, DimseStatus::ProcessingFailure);
        };
        printer.set_name(&route.printer_name);
        if !self.context.engine.spooler().is_installed(&route.printer_name) {
            error!(caller, called, printer = %route.printer_name, "routed printer is not installed");
            return DimseResponse::new(request, DimseStatus::ProcessingFailure);
        }

        let Some(session) = registry.session() else {
            warn!("N-ACTION without a film session");
            return DimseResponse::new(request, DimseStatus::InvalidObjectInstance);
        };

        let film_boxes: Vec<FilmBox> = match (sop_class_uid, action_type_id) {
            (protocol::BASIC_FILM_SESSION, protocol::ACTION_TYPE_PRINT) => session.film_boxes().to_vec(),
            (protocol::BASIC_FILM_BOX, protocol::ACTION_TYPE_PRINT) => {
                match session.find_film_box(sop_instance_uid) {
                    Some(film_box) => vec![film_box.clone()],
                    None => return DimseResponse::new(request, DimseStatus::NoSuchObjectInstance),
                }
            }
            (protocol::BASIC_FILM_SESSION | protocol::BASIC_FILM_BOX, _) => {
                return DimseResponse::new(request, DimseStatus::NoSuchActionType);
            }
            _ => return DimseResponse::new(request, DimseStatus::NoSuchSopClass),
        };
        let session = session.clone();

        if let Some(root) = &self.context.previews_root {
            self.save_previews(root, caller, called, &film_boxes).await;
        }

        let job_request = JobRequest {
            printer_name: route.printer_name.clone(),
            originator: caller.to_string(),
            options: JobOptions::from(&route),
        };
        let job = self
            .context
            .engine
            .submit(job_request, &session, &film_boxes, self.events.clone());
        registry.add_job(Arc::clone(&job));

        if job.status() == PrintJobStatus::Failure {
            return DimseResponse::new(request, DimseStatus::ProcessingFailure);
        }
        if !job.wait_until_queued(self.context.queued_timeout).await {
            warn!(job = %job.uid(), "print job not queued in time, replying anyway");
        }

        info!(
            job = %job.uid(),
            films = film_boxes.len(),
            printer = %route.printer_name,
            caller,
            "print job accepted"
        );
        let reference = Dataset::new()
            .with(tags::REFERENCED_SOP_CLASS_UID, protocol::PRINT_JOB)
            .with(tags::REFERENCED_SOP_INSTANCE_UID, job.uid());
        DimseResponse::new(request, DimseStatus::Success)
            .with_instance(job.uid())
            .with_dataset(Dataset::new().with(tags::REFERENCED_PRINT_JOB_SEQUENCE, vec![reference]))
    }

    async fn save_previews(&self, root: &Path, caller: &str, called: &str, film_boxes: &[FilmBox]) {
        let dir = preview_dir(root, caller, called, Local::now());
        let film_boxes = film_boxes.to_vec();
        match tokio::task::spawn_blocking(move || export_previews(&dir, &film_boxes)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "preview export failed"),
            Err(e) => warn!(error = %e, "preview export task failed"),
        }
    }
}

// -- N-SET ------------------------------------------------------------------

fn set(
    registry: &mut FilmSessionRegistry,
    request: &DimseRequest,
    sop_class_uid: &str,
    sop_instance_uid: &str,
    dataset: &Dataset,
) -> DimseResponse {
    let updated: std::result::Result<Option<Dataset>, RegistryError> = match sop_class_uid {
        protocol::BASIC_FILM_SESSION => registry.set_session(sop_instance_uid, dataset).map(|_| None),
        protocol::BASIC_FILM_BOX => registry
            .set_film_box(sop_instance_uid, dataset)
            .map(|film_box| Some(film_box.attributes().clone())),
        uid if protocol::is_image_box_class(uid) => {
            registry.set_image_box(sop_instance_uid, dataset).map(|_| None)
        }
        _ => return DimseResponse::new(request, DimseStatus::NoSuchSopClass),
    };

    match updated {
        Ok(attributes) => {
            let response = DimseResponse::new(request, DimseStatus::Success).with_instance(sop_instance_uid);
            match attributes {
                Some(attributes) => response.with_dataset(attributes),
                None => response,
            }
        }
        Err(e) => {
            warn!(sop_class = sop_class_uid, instance = sop_instance_uid, error = %e, "N-SET failed");
            DimseResponse::new(request, e.status())
        }
    }
}

// -- N-DELETE ---------------------------------------------------------------

fn delete(
    registry: &mut FilmSessionRegistry,
    request: &DimseRequest,
    sop_class_uid: &str,
    sop_instance_uid: &str,
) -> DimseResponse {
    let deleted = match sop_class_uid {
        protocol::BASIC_FILM_SESSION => registry.delete_session(sop_instance_uid),
        protocol::BASIC_FILM_BOX => registry.delete_film_box(sop_instance_uid),
        _ => return DimseResponse::new(request, DimseStatus::NoSuchSopClass),
    };

    match deleted {
        Ok(()) => DimseResponse::new(request, DimseStatus::Success).with_instance(sop_instance_uid),
        Err(e) => {
            warn!(sop_class = sop_class_uid, instance = sop_instance_uid, error = %e, "N-DELETE failed");
            DimseResponse::new(request, e.status())
        }
    }
}

// ---------------------------------------------------------------------------
// Connection loop
// ---------------------------------------------------------------------------

/// Drive one association until release, abort or close.
///
/// Requests are answered in arrival order; job status events are forwarded
/// between requests.  The registry is always cleared on the way out.
pub async fn serve_association<C: PeerConnection>(
    mut connection: C,
    context: Arc<ServiceContext>,
    peer: SocketAddr,
) -> Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut service = PrintService::new(context, events_tx);

    let outcome = async {
        loop {
            tokio::select! {
                incoming = connection.receive() => {
                    match incoming? {
                        None => {
                            debug!(peer = %peer, "connection closed");
                            break;
                        }
                        Some(PeerEvent::AssociationRequest(request)) => {
                            let accept = service.on_association_request(&request);
                            connection.send(OutboundMessage::AssociationAccept(accept)).await?;
                        }
                        Some(PeerEvent::Request(request)) => {
                            let reply = service.on_request(&request).await;
                            connection.send(OutboundMessage::Response(reply.response)).await?;
                            if reply.abort {
                                connection.send(OutboundMessage::Abort).await?;
                                break;
                            }
                        }
                        Some(PeerEvent::ReleaseRequest) => {
                            service.clean().await;
                            connection.send(OutboundMessage::ReleaseResponse).await?;
                            info!(peer = %peer, calling = %service.calling_ae(), "association released");
                            break;
                        }
                        Some(PeerEvent::Abort { source, reason }) => {
                            error!(peer = %peer, source, reason, "association aborted by peer");
                            break;
                        }
                    }
                }

                Some(event) = events_rx.recv() => {
                    if let Some(report) = service.event_report(event).await {
                        connection.send(OutboundMessage::EventReport(report)).await?;
                    }
                }
            }
        }
        Ok::<(), FilmwerkError>(())
    }
    .await;

    service.clean().await;
    outcome
}

// ---------------------------------------------------------------------------
// PrintServer
// ---------------------------------------------------------------------------

/// TCP listener for print associations.
pub struct PrintServer<T: AssociationTransport> {
    config: ServerConfig,
    data_dir: PathBuf,
    transport: Arc<T>,
    spooler: Arc<dyn Spooler>,
    resolver: Arc<RouteResolver>,
    renderer: Arc<dyn FilmRenderer>,
    status: ServerStatus,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
    local_addr: Option<SocketAddr>,
    printer: Option<Arc<Printer>>,
}

impl<T: AssociationTransport> PrintServer<T> {
    /// Create a server in `Stopped` state.
    pub fn new(
        config: ServerConfig,
        data_dir: impl Into<PathBuf>,
        transport: T,
        spooler: Arc<dyn Spooler>,
        resolver: Arc<RouteResolver>,
    ) -> Self {
        Self {
            config,
            data_dir: data_dir.into(),
            transport: Arc::new(transport),
            spooler,
            resolver,
            renderer: Arc::new(LayoutFilmRenderer::default()),
            status: ServerStatus::Stopped,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
            local_addr: None,
            printer: None,
        }
    }

    /// Replace the film renderer used by jobs of this server.
    pub fn with_renderer(mut self, renderer: Arc<dyn FilmRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// The Printer instance of the running server.
    pub fn printer(&self) -> Option<&Arc<Printer>> {
        self.printer.as_ref()
    }

    /// Bind `0.0.0.0:{port}` and start accepting associations for
    /// `ae_title`.  Port 0 picks a free port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(&mut self, port: u16, ae_title: &str) -> Result<()> {
        if self.status == ServerStatus::Running {
            debug!(port, "print server already running");
            return Ok(());
        }
        self.status = ServerStatus::Starting;

        let bind_addr: SocketAddr = ([0, 0, 0, 0], port).into();
        let listener = match TcpListener::bind(bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.status = ServerStatus::Error;
                return Err(FilmwerkError::Transport(format!("bind {bind_addr}: {e}")));
            }
        };
        let local_addr = listener.local_addr()?;

        let context = Arc::new(ServiceContext::new(
            &self.config,
            &self.data_dir,
            ae_title,
            Arc::clone(&self.spooler),
            Arc::clone(&self.resolver),
            Arc::clone(&self.renderer),
        ));
        self.printer = Some(Arc::clone(&context.printer));

        info!(addr = %local_addr, ae_title, routes = %self.resolver.path().display(), "print server listening");

        let shutdown = Arc::clone(&self.shutdown_signal);
        let connections = Arc::clone(&self.active_connections);
        let transport = Arc::clone(&self.transport);
        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, transport, context, connections).await;
        });

        self.task_handle = Some(handle);
        self.local_addr = Some(local_addr);
        self.status = ServerStatus::Running;
        Ok(())
    }

    /// Stop accepting associations.  Open associations run to completion.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }
        info!(addr = ?self.local_addr, "stopping print server");

        self.shutdown_signal.notify_one();
        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| FilmwerkError::Transport(format!("task join: {e}")))?;
        }

        self.local_addr = None;
        self.printer = None;
        self.status = ServerStatus::Stopped;
        info!("print server stopped");
        Ok(())
    }

    async fn accept_loop(
        listener: TcpListener,
        shutdown: Arc<Notify>,
        transport: Arc<T>,
        context: Arc<ServiceContext>,
        connections: Arc<AtomicU32>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            info!(peer = %peer, "incoming association");
                            let transport = Arc::clone(&transport);
                            let context = Arc::clone(&context);
                            let connections = Arc::clone(&connections);
                            tokio::spawn(async move {
                                connections.fetch_add(1, Ordering::Relaxed);
                                let served = match transport.accept(stream, peer).await {
                                    Ok(connection) => serve_association(connection, context, peer).await,
                                    Err(e) => Err(e),
                                };
                                if let Err(e) = served {
                                    warn!(peer = %peer, error = %e, "association handler error");
                                }
                                connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }
}
