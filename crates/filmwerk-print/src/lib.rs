// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filmwerk Print: DICOM print service, caller routing and print job
// execution.  This crate connects the entities of `filmwerk-core` to a
// spooler through the page logic of `filmwerk-render`.

pub mod dimse;
pub mod job;
pub mod pages;
pub mod print_scp;
pub mod printer;
pub mod routes;
pub mod session;
pub mod spooler;
pub mod storage;

pub use job::{JobOptions, JobRequest, JobStatusEvent, PrintJob, PrintJobEngine};
pub use print_scp::{PrintServer, PrintService, ServiceContext};
pub use printer::Printer;
pub use routes::{RouteItem, RouteLocations, RouteResolver, RoutingConfig};
pub use session::{FilmSessionRegistry, RegistryError};
pub use spooler::{PageSource, RasterSpooler, SpoolRequest, Spooler};
pub use storage::JobStorage;
