// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: pixel data decoding, scaling, polarity inversion and
// preview encoding.

pub mod processor;

pub use processor::{ImageProcessor, invert_polarity};
