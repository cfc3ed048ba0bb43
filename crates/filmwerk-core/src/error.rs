// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Filmwerk.

use thiserror::Error;

/// Top-level error type for all Filmwerk operations.
///
/// DIMSE-level outcomes (no such object, processing failure, ...) are not
/// errors; they travel back to the peer as a `DimseStatus`.  This type covers
/// the things that actually went wrong underneath a request.
#[derive(Debug, Error)]
pub enum FilmwerkError {
    // -- Network --
    #[error("transport error: {0}")]
    Transport(String),

    #[error("association error: {0}")]
    Association(String),

    // -- Print management --
    #[error("routing failed: {0}")]
    Routing(String),

    #[error("job storage error: {0}")]
    Storage(String),

    #[error("spooler error: {0}")]
    Spooler(String),

    #[error("film box initialization failed: {0}")]
    FilmBox(String),

    // -- Rendering --
    #[error("render failed: {0}")]
    Render(String),

    #[error("image processing failed: {0}")]
    Image(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FilmwerkError>;
