// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drawing surface handed to a page source by the spooler.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::geometry::Rect;

/// A page being printed, in device units.
pub trait PageCanvas {
    /// Move the origin of every subsequent draw.
    fn translate(&mut self, dx: i32, dy: i32);

    /// Draw `image` scaled to fill `dest`.
    fn draw_image(&mut self, image: &RgbaImage, dest: Rect);
}

/// In-memory page at one pixel per device unit, white paper.
pub struct RasterCanvas {
    image: RgbaImage,
    origin_x: i32,
    origin_y: i32,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
            origin_x: 0,
            origin_y: 0,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl PageCanvas for RasterCanvas {
    fn translate(&mut self, dx: i32, dy: i32) {
        self.origin_x += dx;
        self.origin_y += dy;
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        if dest.is_empty() || image.width() == 0 || image.height() == 0 {
            return;
        }
        let (w, h) = (dest.width as u32, dest.height as u32);
        let x = i64::from(dest.x + self.origin_x);
        let y = i64::from(dest.y + self.origin_y);

        if image.dimensions() == (w, h) {
            imageops::overlay(&mut self.image, image, x, y);
        } else {
            let scaled = imageops::resize(image, w, h, FilterType::Triangle);
            imageops::overlay(&mut self.image, &scaled, x, y);
        }
    }
}
