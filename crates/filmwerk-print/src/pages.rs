// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page production: one printed page per persisted film.

use std::sync::Arc;

use tracing::debug;

use filmwerk_core::error::{FilmwerkError, Result};
use filmwerk_core::film::FilmBox;
use filmwerk_core::types::Polarity;
use filmwerk_render::paper::{DeviceCapabilities, PageRequest, PageSettings, configure_page};
use filmwerk_render::{FilmRenderer, PageCanvas, destination_rect, invert_polarity};

use crate::job::PrintJob;
use crate::storage::JobStorage;

/// Feeds the films of a job to a spooler, reloading each from storage.
pub struct FilmPageProducer {
    job: Arc<PrintJob>,
    storage: JobStorage,
    renderer: Arc<dyn FilmRenderer>,
    device: DeviceCapabilities,
    folders: Vec<String>,
    /// Index of the film being printed.
    current: usize,
    film_box: Option<FilmBox>,
}

impl FilmPageProducer {
    pub fn new(
        job: Arc<PrintJob>,
        storage: JobStorage,
        renderer: Arc<dyn FilmRenderer>,
        device: DeviceCapabilities,
    ) -> Self {
        let folders = job.folders();
        Self {
            job,
            storage,
            renderer,
            device,
            folders,
            current: 0,
            film_box: None,
        }
    }
}

impl crate::spooler::PageSource for FilmPageProducer {
    fn begin_print(&mut self) {
        self.job.mark_queued();
    }

    fn query_page_settings(&mut self, settings: &mut PageSettings) -> Result<()> {
        let folder = self
            .folders
            .get(self.current)
            .ok_or_else(|| FilmwerkError::Spooler("no film left to print".into()))?;
        self.job.progress(&format!(
            "Printing film {} of {}",
            self.current + 1,
            self.folders.len()
        ));

        let (_, film_box) = self.storage.load(self.job.uid(), folder)?;
        let options = self.job.options();
        let layout = film_box.layout();
        configure_page(
            settings,
            &self.device,
            &PageRequest {
                film_size_id: layout.film_size_id.as_deref(),
                landscape: layout.orientation.is_landscape(),
                forced_paper_size: options.forced_paper_size.as_deref(),
                forced_paper_source: options.forced_paper_source.as_deref(),
            },
        );
        self.film_box = Some(film_box);
        Ok(())
    }

    fn print_page(&mut self, settings: &PageSettings, canvas: &mut dyn PageCanvas) -> Result<bool> {
        let film_box = self
            .film_box
            .take()
            .ok_or_else(|| FilmwerkError::Spooler("page printed before its settings".into()))?;

        canvas.translate(
            -settings.hard_margin_x.round() as i32,
            -settings.hard_margin_y.round() as i32,
        );
        let (width, height) = settings.page_bounds();
        let dest = destination_rect(width, height, settings.landscape, self.job.options().fit_to_page);
        if !dest.is_empty() {
            let mut film = self
                .renderer
                .render(&film_box, dest.width as u32, dest.height as u32)?;
            if film_box.layout().polarity == Polarity::Reverse {
                invert_polarity(&mut film);
            }
            canvas.draw_image(&film, dest);
        }
        debug!(
            film = self.current + 1,
            paper = %settings.paper_size.name,
            landscape = settings.landscape,
            ?dest,
            "film drawn"
        );

        self.current += 1;
        Ok(self.current < self.folders.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmwerk_core::config::default_paper_catalog;
    use filmwerk_core::dataset::{Dataset, tags};
    use filmwerk_core::film::FilmSession;
    use filmwerk_core::types::PaperSource;
    use filmwerk_render::{LayoutFilmRenderer, RasterCanvas};
    use image::Rgba;
    use tokio::sync::mpsc;

    use crate::job::{JobOptions, JobRequest};
    use crate::spooler::PageSource;

    fn device() -> DeviceCapabilities {
        let paper_sizes = default_paper_catalog();
        DeviceCapabilities {
            default_paper: paper_sizes[0].clone(),
            paper_sizes,
            paper_sources: vec![PaperSource::new("Tray 1"), PaperSource::new("Tray 2")],
            hard_margin_x: 0.0,
            hard_margin_y: 0.0,
        }
    }

    fn producer(
        root: &std::path::Path,
        films: &[Dataset],
        options: JobOptions,
    ) -> (FilmPageProducer, mpsc::UnboundedReceiver<crate::job::JobStatusEvent>) {
        let storage = JobStorage::new(root);
        let mut session = FilmSession::new(None, Dataset::new(), false);
        for attrs in films {
            session.create_film_box(None, attrs.clone()).unwrap();
        }
        let folders = storage.persist("1.2.3", &session, session.film_boxes(), 0).unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let request = JobRequest {
            printer_name: "Film Laser".into(),
            originator: "CT01".into(),
            options,
        };
        let job = Arc::new(PrintJob::new("1.2.3".into(), request, String::new(), tx));
        job.set_folders(folders);
        let producer = FilmPageProducer::new(job, storage, Arc::new(LayoutFilmRenderer::default()), device());
        (producer, rx)
    }

    fn one_by_one() -> Dataset {
        Dataset::new().with(tags::IMAGE_DISPLAY_FORMAT, "STANDARD\\1,1")
    }

    #[test]
    fn film_size_and_orientation_drive_page_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let film = one_by_one()
            .with(tags::FILM_SIZE_ID, "8INX10IN")
            .with(tags::FILM_ORIENTATION, "LANDSCAPE");
        let options = JobOptions {
            forced_paper_source: Some("tray 2".into()),
            ..Default::default()
        };
        let (mut pages, mut rx) = producer(tmp.path(), &[film], options);

        pages.begin_print();
        assert!(pages.job.is_queued());

        let mut settings = device().default_page_settings();
        pages.query_page_settings(&mut settings).unwrap();
        assert_eq!(settings.paper_size.name, "8 x 10 in");
        assert!(settings.landscape);
        assert_eq!(settings.paper_source.unwrap().name, "Tray 2");
        assert_eq!(rx.try_recv().unwrap().info, "Printing film 1 of 1");
    }

    #[test]
    fn reverse_polarity_inverts_only_the_film() {
        let tmp = tempfile::tempdir().unwrap();
        let films = [one_by_one(), one_by_one().with(tags::POLARITY, "REVERSE")];
        let (mut pages, _rx) = producer(tmp.path(), &films, JobOptions::default());

        let mut first = RasterCanvas::new(850, 1100);
        let mut settings = device().default_page_settings();
        pages.query_page_settings(&mut settings).unwrap();
        assert!(pages.print_page(&settings, &mut first).unwrap());

        let mut second = RasterCanvas::new(850, 1100);
        let mut settings = device().default_page_settings();
        pages.query_page_settings(&mut settings).unwrap();
        assert!(!pages.print_page(&settings, &mut second).unwrap());

        // Letter portrait fits an 825 wide film centred at x = 13.
        assert_eq!(*first.image().get_pixel(425, 550), Rgba([0, 0, 0, 255]));
        assert_eq!(*second.image().get_pixel(425, 550), Rgba([255, 255, 255, 255]));
        assert_eq!(*first.image().get_pixel(5, 550), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn printing_without_settings_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut pages, _rx) = producer(tmp.path(), &[one_by_one()], JobOptions::default());
        let settings = device().default_page_settings();
        let mut canvas = RasterCanvas::new(10, 10);
        assert!(pages.print_page(&settings, &mut canvas).is_err());
    }
}
