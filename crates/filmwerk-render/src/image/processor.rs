// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decodes uncompressed DICOM pixel data into an in-memory
// image, scales it into film cells and encodes previews.  Operates on
// `image` crate buffers.

use filmwerk_core::dataset::{Dataset, tags};
use filmwerk_core::error::FilmwerkError;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use tracing::{debug, instrument};

/// Image pipeline over a single decoded image.
///
/// Operations consume `self` and return a new `ImageProcessor`, so calls
/// chain:
///
/// ```ignore
/// let jpeg = ImageProcessor::from_pixel_dataset(&image_box)?
///     .fit_within(400, 300)
///     .to_jpeg_bytes(90)?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode the Image Pixel module of `dataset`.
    ///
    /// Supports native (uncompressed) 8- and 16-bit MONOCHROME1/MONOCHROME2
    /// and 8-bit interleaved RGB.  16-bit data is scaled to its min/max range.
    #[instrument(skip_all)]
    pub fn from_pixel_dataset(dataset: &Dataset) -> Result<Self, FilmwerkError> {
        let rows = dimension(dataset, tags::ROWS, "Rows")?;
        let columns = dimension(dataset, tags::COLUMNS, "Columns")?;
        let bits = dataset.get_int(tags::BITS_ALLOCATED).unwrap_or(8);
        let samples = dataset.get_int(tags::SAMPLES_PER_PIXEL).unwrap_or(1);
        let photometric = dataset.get_text_or(tags::PHOTOMETRIC_INTERPRETATION, "MONOCHROME2");
        let photometric = photometric.trim().to_ascii_uppercase();
        let pixels = dataset
            .get_bytes(tags::PIXEL_DATA)
            .ok_or_else(|| FilmwerkError::Image("no Pixel Data".into()))?;

        let samples_len = |bytes_per_pixel: usize| {
            (rows as usize)
                .checked_mul(columns as usize)
                .and_then(|n| n.checked_mul(bytes_per_pixel))
                .ok_or_else(|| FilmwerkError::Image(format!("image size {columns}x{rows} overflows")))
        };
        let image = match (samples, bits, photometric.as_str()) {
            (1, 8, "MONOCHROME1" | "MONOCHROME2") => {
                let mut gray = take(pixels, samples_len(1)?)?.to_vec();
                if photometric == "MONOCHROME1" {
                    gray.iter_mut().for_each(|v| *v = 255 - *v);
                }
                DynamicImage::ImageLuma8(to_buffer(GrayImage::from_raw(columns, rows, gray))?)
            }
            (1, 16, "MONOCHROME1" | "MONOCHROME2") => {
                let mut gray = scale_16_bit(take(pixels, samples_len(2)?)?);
                if photometric == "MONOCHROME1" {
                    gray.iter_mut().for_each(|v| *v = 255 - *v);
                }
                DynamicImage::ImageLuma8(to_buffer(GrayImage::from_raw(columns, rows, gray))?)
            }
            (3, 8, "RGB") => {
                let rgb = take(pixels, samples_len(3)?)?.to_vec();
                DynamicImage::ImageRgb8(to_buffer(RgbImage::from_raw(columns, rows, rgb))?)
            }
            _ => {
                return Err(FilmwerkError::Image(format!(
                    "unsupported pixel format: {samples} sample(s), {bits} bits, {photometric}"
                )));
            }
        };

        debug!(rows, columns, bits, photometric = %photometric, "pixel data decoded");
        Ok(Self { image })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image.into_rgba8()
    }

    // -- Transformations --------------------------------------------------------

    /// Scale to fit within `max_width` x `max_height`, preserving aspect
    /// ratio.  Images are scaled up as well as down.
    pub fn fit_within(self, max_width: u32, max_height: u32) -> Self {
        if max_width == 0 || max_height == 0 {
            return self;
        }
        let resized = self
            .image
            .resize(max_width, max_height, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as JPEG with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, FilmwerkError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| FilmwerkError::Image(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }
}

/// `R,G,B → 255-R,255-G,255-B`; alpha untouched.
pub fn invert_polarity(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [255 - r, 255 - g, 255 - b, a];
    }
}

fn dimension(dataset: &Dataset, tag: filmwerk_core::Tag, name: &str) -> Result<u32, FilmwerkError> {
    dataset
        .get_int(tag)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| FilmwerkError::Image(format!("missing or invalid {name}")))
}

fn take(pixels: &[u8], len: usize) -> Result<&[u8], FilmwerkError> {
    pixels.get(..len).ok_or_else(|| {
        FilmwerkError::Image(format!(
            "pixel data too short: {} bytes, expected {len}",
            pixels.len()
        ))
    })
}

fn to_buffer<T>(buffer: Option<T>) -> Result<T, FilmwerkError> {
    buffer.ok_or_else(|| FilmwerkError::Image("pixel buffer size mismatch".into()))
}

/// Little-endian 16-bit samples stretched to 8 bits over their own range.
fn scale_16_bit(bytes: &[u8]) -> Vec<u8> {
    let samples: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let min = samples.iter().copied().min().unwrap_or(0);
    let max = samples.iter().copied().max().unwrap_or(0);
    let range = f32::from(max.saturating_sub(min)).max(1.0);
    samples
        .iter()
        .map(|v| (f32::from(v - min) * 255.0 / range).round() as u8)
        .collect()
}
