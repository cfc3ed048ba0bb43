// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paper size and paper source selection.
//
// Film Size ID tokens (`14INX17IN`, `24CMX30CM`) are converted to hundredths
// of an inch and matched against the device catalog.  Route overrides can
// name a paper directly (`A4`, `Letter`, `11 x 14`) or fall back to a token.

use filmwerk_core::types::{PaperKind, PaperSize, PaperSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Largest Manhattan distance (1/100 in) at which a catalog paper still
/// counts as the film size.
pub const FILM_SIZE_TOLERANCE: i32 = 6;

/// Longest film side (1/100 in) a Film Size ID may name.  Larger tokens do
/// not parse, so the device default paper stands.
pub const MAX_FILM_SIDE: i32 = 10_000;

// ---------------------------------------------------------------------------
// Device capabilities and page settings
// ---------------------------------------------------------------------------

/// What an output device reports about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub paper_sizes: Vec<PaperSize>,
    pub paper_sources: Vec<PaperSource>,
    pub default_paper: PaperSize,
    /// Non-printable area at the left/top edge, 1/100 in.
    pub hard_margin_x: f32,
    pub hard_margin_y: f32,
}

impl DeviceCapabilities {
    /// Fresh page settings carrying the device defaults.
    pub fn default_page_settings(&self) -> PageSettings {
        PageSettings {
            paper_size: self.default_paper.clone(),
            paper_source: self.paper_sources.first().cloned(),
            landscape: false,
            margins: Margins::default(),
            hard_margin_x: self.hard_margin_x,
            hard_margin_y: self.hard_margin_y,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// Settings for one page, negotiated between the spooler and the page source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    pub paper_size: PaperSize,
    pub paper_source: Option<PaperSource>,
    pub landscape: bool,
    pub margins: Margins,
    pub hard_margin_x: f32,
    pub hard_margin_y: f32,
}

impl PageSettings {
    /// Page bounds `(width, height)` in 1/100 in, rotated for landscape.
    pub fn page_bounds(&self) -> (i32, i32) {
        let (w, h) = (self.paper_size.width, self.paper_size.height);
        if self.landscape { (h, w) } else { (w, h) }
    }
}

/// Per-page inputs to [`configure_page`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest<'a> {
    /// Film Size ID of the film box being printed.
    pub film_size_id: Option<&'a str>,
    pub landscape: bool,
    /// Route override for the paper size.
    pub forced_paper_size: Option<&'a str>,
    /// Route override for the paper source (tray).
    pub forced_paper_source: Option<&'a str>,
}

/// Apply paper, tray, orientation and margin choices for one film.
///
/// A forced paper size wins over the film box's own Film Size ID; when
/// neither resolves, the device default stands.
pub fn configure_page(settings: &mut PageSettings, device: &DeviceCapabilities, request: &PageRequest<'_>) {
    settings.margins = Margins::default();
    settings.landscape = request.landscape;

    if let Some(forced) = non_blank(request.forced_paper_size) {
        if let Some(paper) = pick_paper_size(&device.paper_sizes, forced) {
            settings.paper_size = paper;
        } else if let Some((w, h)) = parse_film_size_id(forced) {
            settings.paper_size = PaperSize::custom(format!("FORCED_{forced}"), w, h);
        } else {
            warn!(forced_paper_size = forced, "forced paper size could not be resolved");
        }
    } else if let Some(film_size_id) = non_blank(request.film_size_id) {
        if let Some(paper) = match_film_size(&device.paper_sizes, film_size_id) {
            settings.paper_size = paper;
        }
    }

    if let Some(forced) = non_blank(request.forced_paper_source) {
        match pick_paper_source(&device.paper_sources, forced) {
            Some(source) => settings.paper_source = Some(source),
            None => warn!(forced_tray = forced, "no paper source matches forced tray"),
        }
    }

    debug!(
        paper = %settings.paper_size.name,
        source = settings.paper_source.as_ref().map(|s| s.name.as_str()).unwrap_or("-"),
        landscape = settings.landscape,
        "page configured"
    );
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Parse `<W>INX<H>IN` or `<W>CMX<H>CM` into hundredths of an inch.
///
/// Each side must come out between 1 and [`MAX_FILM_SIDE`].
pub fn parse_film_size_id(token: &str) -> Option<(i32, i32)> {
    let s: String = token
        .trim()
        .to_ascii_uppercase()
        .chars()
        .filter(|c| *c != ' ')
        .collect();

    let (separator, suffix, per_inch) = if s.contains("INX") {
        ("INX", "IN", 1.0)
    } else if s.contains("CMX") {
        ("CMX", "CM", 2.54)
    } else {
        return None;
    };

    let parts: Vec<&str> = s.split(separator).filter(|p| !p.is_empty()).collect();
    let [width, height] = parts.as_slice() else {
        return None;
    };
    let height = height.strip_suffix(suffix)?;

    let to_hundredths = |v: &str| -> Option<i32> {
        let v: f64 = v.parse().ok()?;
        let hundredths = (v / per_inch * 100.0).round();
        (hundredths.is_finite() && (1.0..=f64::from(MAX_FILM_SIDE)).contains(&hundredths))
            .then_some(hundredths as i32)
    };
    Some((to_hundredths(*width)?, to_hundredths(height)?))
}

/// Find a catalog paper by name (exact or substring, case-insensitive) or
/// by kind alias (`A4`, `LETTER`/`LTR`, `LEGAL`, `A3`).
pub fn pick_paper_size(catalog: &[PaperSize], wanted: &str) -> Option<PaperSize> {
    let wanted = wanted.trim().to_uppercase();
    let alias = match wanted.as_str() {
        "A4" => Some(PaperKind::A4),
        "LETTER" | "LTR" => Some(PaperKind::Letter),
        "LEGAL" => Some(PaperKind::Legal),
        "A3" => Some(PaperKind::A3),
        _ => None,
    };

    catalog
        .iter()
        .find(|paper| {
            let name = paper.name.trim().to_uppercase();
            name.contains(&wanted) || alias == Some(paper.kind)
        })
        .cloned()
}

/// Paper for a Film Size ID: the nearest catalog entry (either orientation)
/// within [`FILM_SIZE_TOLERANCE`], else a custom `DICOM_<id>` size.
///
/// `None` when the token does not parse.
pub fn match_film_size(catalog: &[PaperSize], film_size_id: &str) -> Option<PaperSize> {
    let (w, h) = parse_film_size_id(film_size_id)?;

    let best = catalog
        .iter()
        .map(|paper| {
            let (pw, ph) = (i64::from(paper.width), i64::from(paper.height));
            let (w, h) = (i64::from(w), i64::from(h));
            let straight = (pw - w).abs() + (ph - h).abs();
            let swapped = (pw - h).abs() + (ph - w).abs();
            (paper, straight.min(swapped))
        })
        .min_by_key(|(_, delta)| *delta);

    match best {
        Some((paper, delta)) if delta <= i64::from(FILM_SIZE_TOLERANCE) => Some(paper.clone()),
        _ => Some(PaperSize::custom(format!("DICOM_{film_size_id}"), w, h)),
    }
}

/// Find a paper source by name (exact or substring, case-insensitive).
pub fn pick_paper_source(sources: &[PaperSource], wanted: &str) -> Option<PaperSource> {
    let wanted = wanted.trim().to_lowercase();
    sources
        .iter()
        .find(|source| source.name.trim().to_lowercase().contains(&wanted))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmwerk_core::config::default_paper_catalog;

    fn device() -> DeviceCapabilities {
        DeviceCapabilities {
            paper_sizes: default_paper_catalog(),
            paper_sources: vec![PaperSource::new("Automatically Select"), PaperSource::new("Tray 2")],
            default_paper: PaperSize::new("Letter", PaperKind::Letter, 850, 1100),
            hard_margin_x: 12.0,
            hard_margin_y: 16.0,
        }
    }

    #[test]
    fn parses_inch_and_centimetre_tokens() {
        assert_eq!(parse_film_size_id("10INX12IN"), Some((1000, 1200)));
        assert_eq!(parse_film_size_id("24CMX30CM"), Some((945, 1181)));
        assert_eq!(parse_film_size_id(" 8 inx 10 in "), Some((800, 1000)));
        assert_eq!(parse_film_size_id("A4"), None);
        assert_eq!(parse_film_size_id("14INX17"), None);
        assert_eq!(parse_film_size_id("XINX17IN"), None);
    }

    #[test]
    fn oversized_or_degenerate_film_sizes_do_not_parse() {
        assert_eq!(parse_film_size_id("100INX100IN"), Some((10_000, 10_000)));
        assert_eq!(parse_film_size_id("500INX500IN"), None);
        assert_eq!(parse_film_size_id("1e9INX1e9IN"), None);
        assert_eq!(parse_film_size_id("14INX1e300IN"), None);
        assert_eq!(parse_film_size_id("0.001INX17IN"), None);
        assert_eq!(parse_film_size_id("-14INX17IN"), None);
        assert!(match_film_size(&default_paper_catalog(), "1e9INX1e9IN").is_none());
    }

    #[test]
    fn film_size_matching_handles_extreme_catalog_entries() {
        let mut catalog = default_paper_catalog();
        catalog.insert(0, PaperSize::custom("Broken", i32::MIN, i32::MAX));
        assert_eq!(match_film_size(&catalog, "14INX17IN").unwrap().name, "14 x 17 in");
    }

    #[test]
    fn oversized_film_size_keeps_device_default() {
        let device = device();
        let mut settings = device.default_page_settings();
        configure_page(
            &mut settings,
            &device,
            &PageRequest {
                film_size_id: Some("500INX500IN"),
                ..Default::default()
            },
        );
        assert_eq!(settings.paper_size, device.default_paper);
    }

    #[test]
    fn film_size_matches_catalog_in_either_orientation() {
        let catalog = default_paper_catalog();
        assert_eq!(match_film_size(&catalog, "14INX17IN").unwrap().name, "14 x 17 in");
        assert_eq!(match_film_size(&catalog, "17INX14IN").unwrap().name, "14 x 17 in");
        // 8.27 x 11.69 in is within tolerance of A4.
        assert_eq!(match_film_size(&catalog, "21CMX29.7CM").unwrap().name, "A4");

        let custom = match_film_size(&catalog, "10INX12IN").unwrap();
        assert_eq!(custom.name, "DICOM_10INX12IN");
        assert_eq!((custom.kind, custom.width, custom.height), (PaperKind::Custom, 1000, 1200));

        assert!(match_film_size(&catalog, "A4").is_none());
    }

    #[test]
    fn paper_names_and_aliases() {
        let mut catalog = default_paper_catalog();
        assert_eq!(pick_paper_size(&catalog, "legal").unwrap().name, "Legal");
        assert_eq!(pick_paper_size(&catalog, "11 x 14").unwrap().name, "11 x 14 in");

        catalog[0].name = "US Letter (8.5 x 11)".into();
        assert_eq!(pick_paper_size(&catalog, "LTR").unwrap().kind, PaperKind::Letter);
        assert!(pick_paper_size(&catalog, "B5").is_none());
    }

    #[test]
    fn paper_source_substring_match() {
        let sources = device().paper_sources;
        assert_eq!(pick_paper_source(&sources, "TRAY 2").unwrap().name, "Tray 2");
        assert_eq!(pick_paper_source(&sources, "auto").unwrap().name, "Automatically Select");
        assert!(pick_paper_source(&sources, "Bandeja 3").is_none());
    }

    #[test]
    fn forced_paper_wins_over_film_size() {
        let device = device();
        let mut settings = device.default_page_settings();
        settings.margins.left = 25;

        configure_page(
            &mut settings,
            &device,
            &PageRequest {
                film_size_id: Some("14INX17IN"),
                landscape: true,
                forced_paper_size: Some("A3"),
                forced_paper_source: Some("tray 2"),
            },
        );

        assert_eq!(settings.paper_size.name, "A3");
        assert_eq!(settings.paper_source.as_ref().unwrap().name, "Tray 2");
        assert_eq!(settings.margins, Margins::default());
        assert_eq!(settings.page_bounds(), (1654, 1169));
    }

    #[test]
    fn unresolvable_overrides_keep_defaults() {
        let device = device();
        let mut settings = device.default_page_settings();

        configure_page(
            &mut settings,
            &device,
            &PageRequest {
                film_size_id: Some("14INX17IN"),
                forced_paper_size: Some("Poster"),
                forced_paper_source: Some("Bandeja 9"),
                ..Default::default()
            },
        );
        assert_eq!(settings.paper_size.name, "Letter");
        assert_eq!(settings.paper_source.as_ref().unwrap().name, "Automatically Select");

        configure_page(
            &mut settings,
            &device,
            &PageRequest {
                forced_paper_size: Some("10INX12IN"),
                ..Default::default()
            },
        );
        assert_eq!(settings.paper_size.name, "FORCED_10INX12IN");
    }

    #[test]
    fn film_size_used_without_override() {
        let device = device();
        let mut settings = device.default_page_settings();
        configure_page(
            &mut settings,
            &device,
            &PageRequest {
                film_size_id: Some("8INX10IN"),
                ..Default::default()
            },
        );
        assert_eq!(settings.paper_size.name, "8 x 10 in");

        let mut untouched = device.default_page_settings();
        configure_page(&mut untouched, &device, &PageRequest::default());
        assert_eq!(untouched.paper_size, device.default_paper);
    }
}
