// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filmwerk: Core types, datasets, print management entities and error
// definitions shared across all crates.

pub mod config;
pub mod dataset;
pub mod error;
pub mod film;
pub mod protocol;
pub mod types;

pub use config::{DeviceConfig, ServerConfig};
pub use dataset::{Dataset, Tag, Value, tags};
pub use error::{FilmwerkError, Result};
pub use film::{DisplayFormat, FilmBox, FilmLayout, FilmSession, ImageBox};
pub use protocol::DimseStatus;
pub use types::*;
