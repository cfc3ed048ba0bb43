// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Film rendering: paints a film box (all of its image boxes laid out per
// Image Display Format) into an RGBA bitmap.

use filmwerk_core::error::{FilmwerkError, Result};
use filmwerk_core::film::{DisplayFormat, FilmBox};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use tracing::{debug, instrument};

use crate::geometry::Rect;
use crate::image::ImageProcessor;

/// Renders a film box into a bitmap of the requested size.
pub trait FilmRenderer: Send + Sync {
    fn render(&self, film_box: &FilmBox, width: u32, height: u32) -> Result<RgbaImage>;
}

/// Grid renderer driven by the film box layout.
///
/// The border density fills the whole film; each cell is painted with the
/// empty image density unless its image box carries pixels, which are scaled
/// into the cell and centred.
#[derive(Debug, Clone)]
pub struct LayoutFilmRenderer {
    /// Gap left around each cell, in pixels.
    pub cell_gap: u32,
}

impl Default for LayoutFilmRenderer {
    fn default() -> Self {
        Self { cell_gap: 2 }
    }
}

impl FilmRenderer for LayoutFilmRenderer {
    #[instrument(skip_all, fields(film_box = %film_box.sop_instance_uid, width, height))]
    fn render(&self, film_box: &FilmBox, width: u32, height: u32) -> Result<RgbaImage> {
        let layout = film_box.layout();
        let border = density_to_gray(&layout.border_density);
        let empty = density_to_gray(&layout.empty_image_density);
        let mut film = RgbaImage::from_pixel(width, height, border);

        let cells = layout_cells(&layout.display_format, width as i32, height as i32);
        for image_box in film_box.image_boxes() {
            let index = (image_box.position as usize).checked_sub(1);
            let Some(cell) = index.and_then(|i| cells.get(i)) else {
                continue;
            };
            let cell = cell.inset(self.cell_gap as i32);
            if cell.is_empty() {
                continue;
            }

            match image_box.pixel_dataset() {
                Some(pixels) => {
                    let scaled = ImageProcessor::from_pixel_dataset(pixels)
                        .map_err(|e| {
                            FilmwerkError::Render(format!("image box {}: {e}", image_box.position))
                        })?
                        .fit_within(cell.width as u32, cell.height as u32)
                        .into_rgba();
                    let x = cell.x + (cell.width - scaled.width() as i32) / 2;
                    let y = cell.y + (cell.height - scaled.height() as i32) / 2;
                    image::imageops::overlay(&mut film, &scaled, i64::from(x), i64::from(y));
                }
                None => draw_filled_rect_mut(
                    &mut film,
                    imageproc::rect::Rect::at(cell.x, cell.y).of_size(cell.width as u32, cell.height as u32),
                    empty,
                ),
            }
        }

        debug!(cells = cells.len(), "film rendered");
        Ok(film)
    }
}

/// Cell rectangles in Image Box Position order.
///
/// `STANDARD\C,R` is filled row by row; `ROW\…` lists the cells of each row
/// top to bottom; `COL\…` lists the cells of each column left to right.
pub fn layout_cells(format: &DisplayFormat, width: i32, height: i32) -> Vec<Rect> {
    let split = |total: i32, parts: u32, index: u32| -> (i32, i32) {
        let parts = parts.max(1) as i64;
        let start = (total as i64 * index as i64 / parts) as i32;
        let end = (total as i64 * (index as i64 + 1) / parts) as i32;
        (start, end - start)
    };

    let mut cells = Vec::with_capacity(format.cell_count());
    match format {
        DisplayFormat::Standard { columns, rows } => {
            for row in 0..*rows {
                let (y, h) = split(height, *rows, row);
                for column in 0..*columns {
                    let (x, w) = split(width, *columns, column);
                    cells.push(Rect::new(x, y, w, h));
                }
            }
        }
        DisplayFormat::Row(counts) => {
            let rows = counts.len() as u32;
            for (row, count) in counts.iter().enumerate() {
                let (y, h) = split(height, rows, row as u32);
                for column in 0..*count {
                    let (x, w) = split(width, *count, column);
                    cells.push(Rect::new(x, y, w, h));
                }
            }
        }
        DisplayFormat::Col(counts) => {
            let columns = counts.len() as u32;
            for (column, count) in counts.iter().enumerate() {
                let (x, w) = split(width, columns, column as u32);
                for row in 0..*count {
                    let (y, h) = split(height, *count, row);
                    cells.push(Rect::new(x, y, w, h));
                }
            }
        }
    }
    cells
}

/// Map a density keyword or optical density (hundredths of OD) to a gray.
pub fn density_to_gray(density: &str) -> Rgba<u8> {
    let density = density.trim();
    let level = if density.eq_ignore_ascii_case("WHITE") {
        255
    } else if density.eq_ignore_ascii_case("BLACK") {
        0
    } else {
        match density.parse::<u32>() {
            Ok(od) => 255 - (od.min(300) * 255 / 300) as u8,
            Err(_) => 0,
        }
    };
    Rgba([level, level, level, 255])
}
