// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Basic print management entities: film session → film boxes → image boxes.
//
// A film box keeps the raw attributes the peer sent (so N-GET/N-SET echo
// exactly what was stored) next to a typed `FilmLayout` that is recomputed
// on every initialization.  Rendering only ever reads the typed view.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Dataset, tags};
use crate::error::{FilmwerkError, Result};
use crate::protocol::{self, generate_uid};
use crate::types::{Orientation, Polarity};

// ---------------------------------------------------------------------------
// Image display format
// ---------------------------------------------------------------------------

/// Most image boxes a single film may be divided into.
pub const MAX_DISPLAY_CELLS: usize = 1024;

/// Parsed Image Display Format (2010,0010).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayFormat {
    /// `STANDARD\C,R`: a C × R grid.
    Standard { columns: u32, rows: u32 },
    /// `ROW\n1,n2,...`: one entry per row, each the number of images in it.
    Row(Vec<u32>),
    /// `COL\n1,n2,...`: one entry per column, each the number of images in it.
    Col(Vec<u32>),
}

impl DisplayFormat {
    /// Parse a display format; layouts beyond [`MAX_DISPLAY_CELLS`] are
    /// rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let (kind, counts) = value.trim().split_once('\\')?;
        let counts: Vec<u32> = counts
            .split(',')
            .map(|n| n.trim().parse::<u32>().ok().filter(|n| *n > 0))
            .collect::<Option<_>>()?;

        let format = match kind.trim().to_ascii_uppercase().as_str() {
            "STANDARD" if counts.len() == 2 => Self::Standard {
                columns: counts[0],
                rows: counts[1],
            },
            "ROW" if !counts.is_empty() => Self::Row(counts),
            "COL" if !counts.is_empty() => Self::Col(counts),
            _ => return None,
        };
        format
            .checked_cell_count()
            .filter(|n| *n <= MAX_DISPLAY_CELLS)
            .map(|_| format)
    }

    fn checked_cell_count(&self) -> Option<usize> {
        match self {
            Self::Standard { columns, rows } => (*columns as usize).checked_mul(*rows as usize),
            Self::Row(counts) | Self::Col(counts) => counts
                .iter()
                .try_fold(0usize, |sum, n| sum.checked_add(*n as usize)),
        }
    }

    /// Number of image boxes the format lays out.
    pub fn cell_count(&self) -> usize {
        self.checked_cell_count().unwrap_or(usize::MAX)
    }
}

// ---------------------------------------------------------------------------
// Film box
// ---------------------------------------------------------------------------

/// Typed view of the film box attributes the rendering pipeline uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmLayout {
    pub display_format: DisplayFormat,
    pub orientation: Orientation,
    /// Film Size ID, e.g. `14INX17IN`.  `None` leaves the device paper alone.
    pub film_size_id: Option<String>,
    pub polarity: Polarity,
    pub magnification_type: String,
    pub border_density: String,
    pub empty_image_density: String,
}

impl FilmLayout {
    fn from_attributes(attributes: &Dataset) -> Result<Self> {
        let format = attributes
            .get_text(tags::IMAGE_DISPLAY_FORMAT)
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| {
                FilmwerkError::FilmBox("no Image Display Format in film box dataset".into())
            })?;
        let display_format = DisplayFormat::parse(format).ok_or_else(|| {
            FilmwerkError::FilmBox(format!("unsupported Image Display Format '{format}'"))
        })?;

        Ok(Self {
            display_format,
            orientation: Orientation::from_attribute(
                attributes.get_text(tags::FILM_ORIENTATION).unwrap_or_default(),
            ),
            film_size_id: attributes
                .get_text(tags::FILM_SIZE_ID)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            polarity: Polarity::from_attribute(
                attributes.get_text(tags::POLARITY).unwrap_or_default(),
            ),
            magnification_type: attributes.get_text_or(tags::MAGNIFICATION_TYPE, "REPLICATE"),
            border_density: attributes.get_text_or(tags::BORDER_DENSITY, "BLACK"),
            empty_image_density: attributes.get_text_or(tags::EMPTY_IMAGE_DENSITY, "BLACK"),
        })
    }
}

/// A single sheet of film within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilmBox {
    pub sop_instance_uid: String,
    pub film_session_uid: String,
    /// SOP class of the image boxes this film box owns.
    pub image_box_class: String,
    attributes: Dataset,
    layout: FilmLayout,
    image_boxes: Vec<ImageBox>,
}

impl FilmBox {
    /// Create and initialize a film box.
    ///
    /// Fails when the attributes do not describe a printable layout.
    pub fn create(
        session: &FilmSession,
        sop_instance_uid: Option<&str>,
        attributes: Dataset,
    ) -> Result<Self> {
        let sop_instance_uid = uid_or_generate(sop_instance_uid);
        let layout = FilmLayout::from_attributes(&with_defaults(attributes.clone()))?;
        let mut film_box = Self {
            sop_instance_uid,
            film_session_uid: session.sop_instance_uid.clone(),
            image_box_class: session.image_box_class().to_string(),
            attributes,
            layout,
            image_boxes: Vec::new(),
        };
        film_box.initialize()?;
        Ok(film_box)
    }

    /// Recompute defaults, the typed layout, the image boxes and the
    /// reference sequences from the current attribute set.
    ///
    /// Image boxes whose position still exists are kept with their content.
    pub fn initialize(&mut self) -> Result<()> {
        let attributes = with_defaults(std::mem::take(&mut self.attributes));
        let layout = match FilmLayout::from_attributes(&attributes) {
            Ok(layout) => layout,
            Err(e) => {
                self.attributes = attributes;
                return Err(e);
            }
        };
        self.attributes = attributes;

        let cells = layout.display_format.cell_count();
        self.image_boxes.truncate(cells);
        for position in self.image_boxes.len() + 1..=cells {
            self.image_boxes
                .push(ImageBox::new(&self.image_box_class, position as u32));
        }

        let image_refs: Vec<Dataset> = self
            .image_boxes
            .iter()
            .map(|ib| reference(&ib.sop_class_uid, &ib.sop_instance_uid))
            .collect();
        self.attributes
            .put(tags::REFERENCED_IMAGE_BOX_SEQUENCE, image_refs)
            .put(
                tags::REFERENCED_FILM_SESSION_SEQUENCE,
                vec![reference(protocol::BASIC_FILM_SESSION, &self.film_session_uid)],
            );

        debug!(
            film_box = %self.sop_instance_uid,
            format = ?layout.display_format,
            image_boxes = cells,
            "film box initialized"
        );
        self.layout = layout;
        Ok(())
    }

    /// Apply N-SET attributes and re-initialize.  On failure the film box is
    /// left exactly as it was.
    pub fn update(&mut self, incoming: &Dataset) -> Result<()> {
        let mut updated = self.clone();
        updated.attributes.merge_from(incoming);
        updated.initialize()?;
        *self = updated;
        Ok(())
    }

    pub fn attributes(&self) -> &Dataset {
        &self.attributes
    }

    pub fn layout(&self) -> &FilmLayout {
        &self.layout
    }

    pub fn image_boxes(&self) -> &[ImageBox] {
        &self.image_boxes
    }

    pub fn find_image_box_mut(&mut self, sop_instance_uid: &str) -> Option<&mut ImageBox> {
        self.image_boxes
            .iter_mut()
            .find(|ib| ib.sop_instance_uid == sop_instance_uid)
    }
}

fn with_defaults(mut attributes: Dataset) -> Dataset {
    for (tag, default) in [
        (tags::FILM_ORIENTATION, "PORTRAIT"),
        (tags::MAGNIFICATION_TYPE, "REPLICATE"),
        (tags::BORDER_DENSITY, "BLACK"),
        (tags::EMPTY_IMAGE_DENSITY, "BLACK"),
        (tags::TRIM, "NO"),
    ] {
        if attributes.get_text_or(tag, "").is_empty() {
            attributes.put(tag, default);
        }
    }
    attributes
}

fn reference(sop_class_uid: &str, sop_instance_uid: &str) -> Dataset {
    Dataset::new()
        .with(tags::REFERENCED_SOP_CLASS_UID, sop_class_uid)
        .with(tags::REFERENCED_SOP_INSTANCE_UID, sop_instance_uid)
}

fn uid_or_generate(uid: Option<&str>) -> String {
    match uid.map(str::trim) {
        Some(uid) if !uid.is_empty() => uid.to_string(),
        _ => generate_uid(),
    }
}

// ---------------------------------------------------------------------------
// Image box
// ---------------------------------------------------------------------------

/// A single image placement within a film box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBox {
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    /// 1-based Image Box Position.
    pub position: u32,
    attributes: Dataset,
}

impl ImageBox {
    fn new(sop_class_uid: &str, position: u32) -> Self {
        Self {
            sop_class_uid: sop_class_uid.to_string(),
            sop_instance_uid: generate_uid(),
            position,
            attributes: Dataset::new().with(tags::IMAGE_BOX_POSITION, i64::from(position)),
        }
    }

    pub fn attributes(&self) -> &Dataset {
        &self.attributes
    }

    /// Merge N-SET attributes (typically the image sequence).
    pub fn update(&mut self, incoming: &Dataset) {
        self.attributes.merge_from(incoming);
    }

    /// The (possibly nested) dataset that carries this box's pixels.
    pub fn pixel_dataset(&self) -> Option<&Dataset> {
        self.attributes.find_pixel_dataset()
    }
}

// ---------------------------------------------------------------------------
// Film session
// ---------------------------------------------------------------------------

/// A caller-established printing conversation.
///
/// Serializing a session produces a snapshot of its own attributes only; the
/// film boxes are persisted separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilmSession {
    pub sop_instance_uid: String,
    /// Created on a Basic Color Print Management Meta context.
    pub color: bool,
    attributes: Dataset,
    #[serde(skip)]
    film_boxes: Vec<FilmBox>,
}

impl FilmSession {
    pub fn new(sop_instance_uid: Option<&str>, attributes: Dataset, color: bool) -> Self {
        Self {
            sop_instance_uid: uid_or_generate(sop_instance_uid),
            color,
            attributes,
            film_boxes: Vec::new(),
        }
    }

    pub fn attributes(&self) -> &Dataset {
        &self.attributes
    }

    pub fn update(&mut self, incoming: &Dataset) {
        self.attributes.merge_from(incoming);
    }

    /// Film Session Label, empty when the peer did not set one.
    pub fn label(&self) -> String {
        self.attributes.get_text_or(tags::FILM_SESSION_LABEL, "")
    }

    pub fn image_box_class(&self) -> &'static str {
        if self.color {
            protocol::BASIC_COLOR_IMAGE_BOX
        } else {
            protocol::BASIC_GRAYSCALE_IMAGE_BOX
        }
    }

    pub fn film_boxes(&self) -> &[FilmBox] {
        &self.film_boxes
    }

    /// Create, initialize and attach a film box.
    pub fn create_film_box(
        &mut self,
        sop_instance_uid: Option<&str>,
        attributes: Dataset,
    ) -> Result<&FilmBox> {
        let film_box = FilmBox::create(self, sop_instance_uid, attributes)?;
        self.film_boxes.push(film_box);
        Ok(&self.film_boxes[self.film_boxes.len() - 1])
    }

    pub fn find_film_box(&self, sop_instance_uid: &str) -> Option<&FilmBox> {
        self.film_boxes
            .iter()
            .find(|fb| fb.sop_instance_uid == sop_instance_uid)
    }

    pub fn find_film_box_mut(&mut self, sop_instance_uid: &str) -> Option<&mut FilmBox> {
        self.film_boxes
            .iter_mut()
            .find(|fb| fb.sop_instance_uid == sop_instance_uid)
    }

    /// Remove a film box; `false` when it does not exist.
    pub fn delete_film_box(&mut self, sop_instance_uid: &str) -> bool {
        let before = self.film_boxes.len();
        self.film_boxes
            .retain(|fb| fb.sop_instance_uid != sop_instance_uid);
        self.film_boxes.len() != before
    }

    /// Look an image box up across all film boxes.
    pub fn find_image_box_mut(&mut self, sop_instance_uid: &str) -> Option<&mut ImageBox> {
        self.film_boxes
            .iter_mut()
            .find_map(|fb| fb.find_image_box_mut(sop_instance_uid))
    }
}
