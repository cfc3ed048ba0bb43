// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// filmwerk-render: The page side of film printing.
//
// Provides Film Size ID parsing with paper-size and paper-source matching,
// fit-to-page geometry, a raster page canvas, DICOM pixel data decoding with
// polarity inversion, the film layout renderer, and preview export.

pub mod canvas;
pub mod film;
pub mod geometry;
pub mod image;
pub mod paper;
pub mod preview;

// Re-export the primary items so callers can use `filmwerk_render::PageSettings` etc.
pub use canvas::{PageCanvas, RasterCanvas};
pub use film::{FilmRenderer, LayoutFilmRenderer};
pub use geometry::{Rect, destination_rect, fit_film_rect};
pub use image::{ImageProcessor, invert_polarity};
pub use paper::{DeviceCapabilities, PageRequest, PageSettings, configure_page};
