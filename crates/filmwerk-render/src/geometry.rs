// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry in device units (1/100 inch).

use serde::{Deserialize, Serialize};

/// Approximate film aspect ratio (width / height) for landscape films.
pub const LANDSCAPE_FILM_RATIO: f64 = 4.0 / 3.0;
/// Approximate film aspect ratio (width / height) for portrait films.
pub const PORTRAIT_FILM_RATIO: f64 = 3.0 / 4.0;

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin covering `width` x `height`.
    pub fn sized(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Shrink on every side by `amount`, never below zero size.
    pub fn inset(&self, amount: i32) -> Self {
        Self {
            x: self.x + amount,
            y: self.y + amount,
            width: (self.width - 2 * amount).max(0),
            height: (self.height - 2 * amount).max(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Largest rectangle with the film's aspect ratio, centred in the page.
///
/// Pages wider than the film ratio are height-filled and centred
/// horizontally; everything else is width-filled and centred vertically.
pub fn fit_film_rect(page_width: i32, page_height: i32, landscape: bool) -> Rect {
    let film_ratio = if landscape {
        LANDSCAPE_FILM_RATIO
    } else {
        PORTRAIT_FILM_RATIO
    };
    let page_w = f64::from(page_width);
    let page_h = f64::from(page_height);
    if page_h <= 0.0 {
        return Rect::sized(page_width, page_height);
    }

    if page_w / page_h > film_ratio {
        let w = (page_h * film_ratio).round() as i32;
        let x = ((page_w - f64::from(w)) / 2.0).round() as i32;
        Rect::new(x, 0, w, page_height)
    } else {
        let h = (page_w / film_ratio).round() as i32;
        let y = ((page_h - f64::from(h)) / 2.0).round() as i32;
        Rect::new(0, y, page_width, h)
    }
}

/// Destination of the film content on a page.
pub fn destination_rect(page_width: i32, page_height: i32, landscape: bool, fit_to_page: bool) -> Rect {
    if fit_to_page {
        fit_film_rect(page_width, page_height, landscape)
    } else {
        Rect::sized(page_width, page_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_pages() {
        // 11 x 8.5 in: ratio 1.294 < 4:3, so width-filled.
        let letter = fit_film_rect(1100, 850, true);
        assert_eq!(letter.width, 1100);
        assert_eq!(letter.height, 825);
        assert_eq!(letter.y, 13);

        // 17 x 11 in: ratio 1.545 > 4:3, so height-filled and centred.
        let tabloid = fit_film_rect(1700, 1100, true);
        assert_eq!(tabloid, Rect::new(117, 0, 1467, 1100));
    }

    #[test]
    fn portrait_page_keeps_three_by_four() {
        let a4 = fit_film_rect(827, 1169, false);
        assert_eq!(a4.width, 827);
        assert_eq!(a4.height, 1103);
        assert_eq!(a4.y, 33);
    }

    #[test]
    fn no_fit_fills_page() {
        assert_eq!(destination_rect(850, 1100, false, false), Rect::sized(850, 1100));
    }

    #[test]
    fn degenerate_page() {
        assert_eq!(fit_film_rect(100, 0, true), Rect::sized(100, 0));
        assert!(Rect::sized(10, 10).inset(6).is_empty());
    }
}
