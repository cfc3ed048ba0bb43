// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spooler interface and the raster spooler.
//
// A spooler owns the output devices.  Printing is pull-based: the spooler
// asks the page source for page settings, hands it a canvas per page, and
// keeps going while the source reports more pages.

use std::path::PathBuf;

use tracing::{debug, info, instrument};

use filmwerk_core::config::DeviceConfig;
use filmwerk_core::error::{FilmwerkError, Result};
use filmwerk_core::types::DuplexMode;
use filmwerk_render::paper::{DeviceCapabilities, PageSettings};
use filmwerk_render::{PageCanvas, RasterCanvas};

/// Output target and document settings for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolRequest {
    pub printer_name: String,
    /// `None` keeps the device default.
    pub duplex: Option<DuplexMode>,
    pub document_name: String,
}

/// Produces the pages of one document, driven by a [`Spooler`].
pub trait PageSource: Send {
    /// The spooler accepted the document; pages follow.
    fn begin_print(&mut self);

    /// Adjust the settings of the next page.
    fn query_page_settings(&mut self, settings: &mut PageSettings) -> Result<()>;

    /// Paint the current page; `true` when more pages follow.
    fn print_page(&mut self, settings: &PageSettings, canvas: &mut dyn PageCanvas) -> Result<bool>;
}

/// A print spooler with named output devices.
pub trait Spooler: Send + Sync {
    fn installed_printers(&self) -> Vec<String>;

    fn capabilities(&self, printer: &str) -> Result<DeviceCapabilities>;

    /// Print a document synchronously; returns once every page is out.
    fn print(&self, request: &SpoolRequest, source: &mut dyn PageSource) -> Result<()>;

    /// Whether `name` is an installed printer, ignoring case.
    fn is_installed(&self, name: &str) -> bool {
        self.installed_printers()
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// RasterSpooler
// ---------------------------------------------------------------------------

/// Largest page the raster spooler will allocate, in pixels (about 40 in x
/// 100 in at 100 dpi).
pub const MAX_PAGE_PIXELS: u64 = 40_000_000;

/// Spooler that rasterises each page at 100 dpi (one pixel per device unit)
/// and writes it as a PNG.
pub struct RasterSpooler {
    devices: Vec<DeviceConfig>,
    output_root: PathBuf,
}

impl RasterSpooler {
    /// `output_root` holds `<device name>/` folders for devices without an
    /// explicit output directory.
    pub fn new(devices: Vec<DeviceConfig>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            devices,
            output_root: output_root.into(),
        }
    }

    fn device(&self, name: &str) -> Result<&DeviceConfig> {
        self.devices
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| FilmwerkError::Spooler(format!("printer '{name}' is not installed")))
    }

    fn output_dir(&self, device: &DeviceConfig) -> PathBuf {
        device
            .output_dir
            .clone()
            .unwrap_or_else(|| self.output_root.join(file_safe(&device.name)))
    }
}

impl Spooler for RasterSpooler {
    fn installed_printers(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.name.clone()).collect()
    }

    fn capabilities(&self, printer: &str) -> Result<DeviceCapabilities> {
        let device = self.device(printer)?;
        let paper_sizes = device.catalog();
        let default_paper = paper_sizes
            .first()
            .cloned()
            .ok_or_else(|| FilmwerkError::Spooler(format!("printer '{printer}' has no paper sizes")))?;
        Ok(DeviceCapabilities {
            paper_sizes,
            paper_sources: device.paper_sources.clone(),
            default_paper,
            hard_margin_x: device.hard_margin_x,
            hard_margin_y: device.hard_margin_y,
        })
    }

    #[instrument(skip(self, source), fields(printer = %request.printer_name, document = %request.document_name))]
    fn print(&self, request: &SpoolRequest, source: &mut dyn PageSource) -> Result<()> {
        let device = self.device(&request.printer_name)?;
        let capabilities = self.capabilities(&request.printer_name)?;
        let out_dir = self.output_dir(device);
        std::fs::create_dir_all(&out_dir)?;

        source.begin_print();
        let mut page = 0;
        loop {
            page += 1;
            let mut settings = capabilities.default_page_settings();
            source.query_page_settings(&mut settings)?;

            let (width, height) = settings.page_bounds();
            let (width, height) = (width.max(1) as u32, height.max(1) as u32);
            if u64::from(width) * u64::from(height) > MAX_PAGE_PIXELS {
                return Err(FilmwerkError::Spooler(format!(
                    "page {width}x{height} ({}) is too large to rasterise",
                    settings.paper_size.name
                )));
            }
            let mut canvas = RasterCanvas::new(width, height);
            let more = source.print_page(&settings, &mut canvas)?;

            let path = out_dir.join(format!("{}_p{page:03}.png", file_safe(&request.document_name)));
            canvas
                .into_image()
                .save(&path)
                .map_err(|e| FilmwerkError::Spooler(format!("write {}: {e}", path.display())))?;
            debug!(
                page,
                paper = %settings.paper_size.name,
                source = settings.paper_source.as_ref().map(|s| s.name.as_str()).unwrap_or("-"),
                duplex = ?request.duplex,
                path = %path.display(),
                "page written"
            );

            if !more {
                break;
            }
        }

        info!(pages = page, dir = %out_dir.display(), "document printed");
        Ok(())
    }
}

fn file_safe(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmwerk_core::types::PaperSize;
    use filmwerk_render::Rect;
    use image::{Rgba, RgbaImage};

    struct TwoPages {
        began: bool,
        printed: usize,
    }

    impl PageSource for TwoPages {
        fn begin_print(&mut self) {
            self.began = true;
        }

        fn query_page_settings(&mut self, settings: &mut PageSettings) -> Result<()> {
            settings.landscape = self.printed == 1;
            Ok(())
        }

        fn print_page(&mut self, _settings: &PageSettings, canvas: &mut dyn PageCanvas) -> Result<bool> {
            canvas.draw_image(&RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])), Rect::new(0, 0, 10, 10));
            self.printed += 1;
            Ok(self.printed < 2)
        }
    }

    fn device(name: &str) -> DeviceConfig {
        DeviceConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn prints_every_page_to_png() {
        let tmp = tempfile::tempdir().unwrap();
        let spooler = RasterSpooler::new(vec![device("Film Laser")], tmp.path());
        assert!(spooler.is_installed("film laser"));
        assert!(!spooler.is_installed("Office"));

        let mut source = TwoPages { began: false, printed: 0 };
        let request = SpoolRequest {
            printer_name: "FILM LASER".into(),
            duplex: None,
            document_name: "PrintJob 1.2.3".into(),
        };
        spooler.print(&request, &mut source).unwrap();

        assert!(source.began);
        let first = image::open(tmp.path().join("Film_Laser/PrintJob_1.2.3_p001.png")).unwrap();
        let second = image::open(tmp.path().join("Film_Laser/PrintJob_1.2.3_p002.png")).unwrap();
        // Letter is the first catalog entry.
        assert_eq!((first.width(), first.height()), (850, 1100));
        assert_eq!((second.width(), second.height()), (1100, 850));
    }

    struct HugePage {
        painted: bool,
    }

    impl PageSource for HugePage {
        fn begin_print(&mut self) {}

        fn query_page_settings(&mut self, settings: &mut PageSettings) -> Result<()> {
            settings.paper_size = PaperSize::custom("FORCED_100INX100IN", 10_000, 10_000);
            Ok(())
        }

        fn print_page(&mut self, _settings: &PageSettings, _canvas: &mut dyn PageCanvas) -> Result<bool> {
            self.painted = true;
            Ok(false)
        }
    }

    #[test]
    fn oversized_page_is_refused_before_allocation() {
        let tmp = tempfile::tempdir().unwrap();
        let spooler = RasterSpooler::new(vec![device("Film Laser")], tmp.path());
        let mut source = HugePage { painted: false };
        let request = SpoolRequest {
            printer_name: "Film Laser".into(),
            duplex: None,
            document_name: "big".into(),
        };
        let err = spooler.print(&request, &mut source).unwrap_err();
        assert!(matches!(err, FilmwerkError::Spooler(ref msg) if msg.contains("10000x10000")));
        assert!(!source.painted);
    }

    #[test]
    fn unknown_printer_fails_before_begin() {
        let tmp = tempfile::tempdir().unwrap();
        let spooler = RasterSpooler::new(vec![], tmp.path());
        let mut source = TwoPages { began: false, printed: 0 };
        let request = SpoolRequest {
            printer_name: "Nowhere".into(),
            duplex: Some(DuplexMode::LongEdge),
            document_name: "x".into(),
        };
        assert!(matches!(spooler.print(&request, &mut source), Err(FilmwerkError::Spooler(_))));
        assert!(!source.began);
    }
}
