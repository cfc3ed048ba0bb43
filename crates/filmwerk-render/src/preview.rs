// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preview export: one JPEG per image box, written before a job is
// submitted so operators can see what a caller sent.  Nothing here is
// allowed to fail a print.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use filmwerk_core::error::{FilmwerkError, Result};
use filmwerk_core::film::FilmBox;
use tracing::{info, instrument, warn};

use crate::image::ImageProcessor;

const PREVIEW_JPEG_QUALITY: u8 = 90;

/// `<root>/<yyyyMMdd_HHmmss>_<caller>_<called>`.
pub fn preview_dir(root: &Path, caller: &str, called: &str, now: DateTime<Local>) -> PathBuf {
    root.join(format!(
        "{}_{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        path_safe(caller),
        path_safe(called)
    ))
}

/// Write `filmNN_imgNN.jpeg` for every image box carrying pixels.
///
/// Returns the number of files written.  Per-image failures are logged and
/// skipped; only failing to create `dir` is an error.
#[instrument(skip(film_boxes), fields(dir = %dir.display(), films = film_boxes.len()))]
pub fn export_previews(dir: &Path, film_boxes: &[FilmBox]) -> Result<usize> {
    std::fs::create_dir_all(dir)?;

    let mut saved = 0;
    for (film_index, film_box) in film_boxes.iter().enumerate() {
        let film_no = film_index + 1;
        if film_box.image_boxes().is_empty() {
            warn!(film = film_no, "no image boxes found to preview");
            continue;
        }

        for (image_index, image_box) in film_box.image_boxes().iter().enumerate() {
            let image_no = image_index + 1;
            let Some(pixels) = image_box.pixel_dataset() else {
                warn!(film = film_no, image = image_no, "no pixel data to preview");
                continue;
            };

            let path = dir.join(format!("film{film_no:02}_img{image_no:02}.jpeg"));
            let written = ImageProcessor::from_pixel_dataset(pixels)
                .and_then(|p| p.to_jpeg_bytes(PREVIEW_JPEG_QUALITY))
                .and_then(|jpeg| std::fs::write(&path, jpeg).map_err(FilmwerkError::from));
            match written {
                Ok(()) => saved += 1,
                Err(e) => warn!(film = film_no, image = image_no, error = %e, "preview failed"),
            }
        }
    }

    info!(saved, "preview export complete");
    Ok(saved)
}

fn path_safe(ae_title: &str) -> String {
    ae_title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
