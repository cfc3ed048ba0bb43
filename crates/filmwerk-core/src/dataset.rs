// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attribute dataset: the tag → value container carried by every DIMSE
// request and response, and by the film session / film box entities.
//
// Only the value shapes print management actually touches are modelled:
// text (all string VRs), integers (US/UL/IS), raw bytes (pixel data) and
// sequences of nested datasets.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

/// A DICOM attribute tag `(group, element)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u16, pub u16);

impl Tag {
    pub fn group(&self) -> u16 {
        self.0
    }

    pub fn element(&self) -> u16 {
        self.1
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

impl FromStr for Tag {
    type Err = String;

    /// Parses `GGGGEEEE`, optionally written as `(GGGG,EEEE)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .chars()
            .filter(|c| !matches!(c, '(' | ')' | ',' | ' '))
            .collect();
        if hex.len() != 8 {
            return Err(format!("invalid tag '{s}'"));
        }
        let group = u16::from_str_radix(&hex[..4], 16).map_err(|e| format!("{s}: {e}"))?;
        let element = u16::from_str_radix(&hex[4..], 16).map_err(|e| format!("{s}: {e}"))?;
        Ok(Tag(group, element))
    }
}

// Tags are map keys in the JSON snapshots, so they travel as strings.
impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:04X}{:04X}", self.0, self.1))
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Tags read or written by the print provider.
pub mod tags {
    use super::Tag;

    // Command / identification
    pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
    pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
    pub const REFERENCED_SOP_CLASS_UID: Tag = Tag(0x0008, 0x1150);
    pub const REFERENCED_SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x1155);

    // Equipment
    pub const MANUFACTURER: Tag = Tag(0x0008, 0x0070);
    pub const MANUFACTURER_MODEL_NAME: Tag = Tag(0x0008, 0x1090);
    pub const DEVICE_SERIAL_NUMBER: Tag = Tag(0x0018, 0x1000);
    pub const SOFTWARE_VERSIONS: Tag = Tag(0x0018, 0x1020);
    pub const DATE_OF_LAST_CALIBRATION: Tag = Tag(0x0018, 0x1200);
    pub const TIME_OF_LAST_CALIBRATION: Tag = Tag(0x0018, 0x1201);

    // Image pixel module
    pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
    pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
    pub const ROWS: Tag = Tag(0x0028, 0x0010);
    pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
    pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
    pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

    // Basic film session
    pub const NUMBER_OF_COPIES: Tag = Tag(0x2000, 0x0010);
    pub const PRINT_PRIORITY: Tag = Tag(0x2000, 0x0020);
    pub const MEDIUM_TYPE: Tag = Tag(0x2000, 0x0030);
    pub const FILM_DESTINATION: Tag = Tag(0x2000, 0x0040);
    pub const FILM_SESSION_LABEL: Tag = Tag(0x2000, 0x0050);
    pub const PRINTER_CONFIGURATION_SEQUENCE: Tag = Tag(0x2000, 0x001E);
    pub const REFERENCED_FILM_BOX_SEQUENCE: Tag = Tag(0x2000, 0x0500);

    // Basic film box
    pub const IMAGE_DISPLAY_FORMAT: Tag = Tag(0x2010, 0x0010);
    pub const FILM_ORIENTATION: Tag = Tag(0x2010, 0x0040);
    pub const FILM_SIZE_ID: Tag = Tag(0x2010, 0x0050);
    pub const MAGNIFICATION_TYPE: Tag = Tag(0x2010, 0x0060);
    pub const BORDER_DENSITY: Tag = Tag(0x2010, 0x0100);
    pub const EMPTY_IMAGE_DENSITY: Tag = Tag(0x2010, 0x0110);
    pub const TRIM: Tag = Tag(0x2010, 0x0140);
    pub const REFERENCED_FILM_SESSION_SEQUENCE: Tag = Tag(0x2010, 0x0500);
    pub const REFERENCED_IMAGE_BOX_SEQUENCE: Tag = Tag(0x2010, 0x0510);

    // Basic image box
    pub const IMAGE_BOX_POSITION: Tag = Tag(0x2020, 0x0010);
    pub const POLARITY: Tag = Tag(0x2020, 0x0020);
    pub const BASIC_GRAYSCALE_IMAGE_SEQUENCE: Tag = Tag(0x2020, 0x0110);
    pub const BASIC_COLOR_IMAGE_SEQUENCE: Tag = Tag(0x2020, 0x0111);

    // Print job
    pub const EXECUTION_STATUS: Tag = Tag(0x2100, 0x0020);
    pub const EXECUTION_STATUS_INFO: Tag = Tag(0x2100, 0x0030);
    pub const CREATION_DATE: Tag = Tag(0x2100, 0x0040);
    pub const CREATION_TIME: Tag = Tag(0x2100, 0x0050);
    pub const ORIGINATOR: Tag = Tag(0x2100, 0x0070);
    pub const REFERENCED_PRINT_JOB_SEQUENCE: Tag = Tag(0x2100, 0x0500);

    // Printer
    pub const PRINTER_STATUS: Tag = Tag(0x2110, 0x0010);
    pub const PRINTER_STATUS_INFO: Tag = Tag(0x2110, 0x0020);
    pub const PRINTER_NAME: Tag = Tag(0x2110, 0x0030);
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// The value stored under a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Int(i64),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    Sequence(Vec<Dataset>),
}

impl Value {
    /// Render as text; binary and sequence values have no text form.
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bytes(_) | Value::Sequence(_) => String::new(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Dataset>> for Value {
    fn from(value: Vec<Dataset>) -> Self {
        Value::Sequence(value)
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// An ordered tag → value map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    elements: BTreeMap<Tag, Value>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    pub fn get(&self, tag: Tag) -> Option<&Value> {
        self.elements.get(&tag)
    }

    /// Insert or replace a value.
    pub fn put(&mut self, tag: Tag, value: impl Into<Value>) -> &mut Self {
        self.elements.insert(tag, value.into());
        self
    }

    /// Builder-style `put`.
    pub fn with(mut self, tag: Tag, value: impl Into<Value>) -> Self {
        self.put(tag, value);
        self
    }

    pub fn remove(&mut self, tag: Tag) -> Option<Value> {
        self.elements.remove(&tag)
    }

    /// Text value of a tag, if it holds text.
    pub fn get_text(&self, tag: Tag) -> Option<&str> {
        match self.elements.get(&tag) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Text value (integers rendered), or `default` when absent or empty.
    pub fn get_text_or(&self, tag: Tag, default: &str) -> String {
        match self.elements.get(&tag).map(Value::to_text) {
            Some(text) if !text.trim().is_empty() => text,
            _ => default.to_string(),
        }
    }

    /// Integer value, accepting integer strings (IS) as well.
    pub fn get_int(&self, tag: Tag) -> Option<i64> {
        match self.elements.get(&tag)? {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_bytes(&self, tag: Tag) -> Option<&[u8]> {
        match self.elements.get(&tag) {
            Some(Value::Bytes(b)) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Items of a sequence attribute.
    pub fn sequence(&self, tag: Tag) -> Option<&[Dataset]> {
        match self.elements.get(&tag) {
            Some(Value::Sequence(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Copy every element of `other` into `self`, replacing existing values.
    pub fn merge_from(&mut self, other: &Dataset) {
        for (tag, value) in &other.elements {
            self.elements.insert(*tag, value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &Value)> {
        self.elements.iter()
    }

    /// Depth-first search for the first dataset (this one or any nested
    /// sequence item) that carries Pixel Data.
    pub fn find_pixel_dataset(&self) -> Option<&Dataset> {
        if self.contains(tags::PIXEL_DATA) {
            return Some(self);
        }
        self.elements.values().find_map(|value| match value {
            Value::Sequence(items) => items.iter().find_map(Dataset::find_pixel_dataset),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_display_and_parse() {
        assert_eq!(tags::FILM_SIZE_ID.to_string(), "(2010,0050)");
        assert_eq!("20100050".parse::<Tag>().unwrap(), tags::FILM_SIZE_ID);
        assert_eq!("(7FE0,0010)".parse::<Tag>().unwrap(), tags::PIXEL_DATA);
        assert!("2010".parse::<Tag>().is_err());
    }

    #[test]
    fn merge_overwrites_and_keeps_existing() {
        let mut film_box = Dataset::new()
            .with(tags::FILM_ORIENTATION, "PORTRAIT")
            .with(tags::IMAGE_DISPLAY_FORMAT, "STANDARD\\1,1");
        let incoming = Dataset::new()
            .with(tags::FILM_ORIENTATION, "LANDSCAPE")
            .with(tags::FILM_SIZE_ID, "14INX17IN");

        film_box.merge_from(&incoming);

        assert_eq!(film_box.get_text(tags::FILM_ORIENTATION), Some("LANDSCAPE"));
        assert_eq!(film_box.get_text(tags::FILM_SIZE_ID), Some("14INX17IN"));
        assert_eq!(film_box.get_text(tags::IMAGE_DISPLAY_FORMAT), Some("STANDARD\\1,1"));
    }

    #[test]
    fn text_defaults_and_integers() {
        let ds = Dataset::new()
            .with(tags::ROWS, 512u16)
            .with(tags::NUMBER_OF_COPIES, "2")
            .with(tags::PRINTER_STATUS_INFO, "  ");

        assert_eq!(ds.get_int(tags::ROWS), Some(512));
        assert_eq!(ds.get_int(tags::NUMBER_OF_COPIES), Some(2));
        assert_eq!(ds.get_text_or(tags::ROWS, ""), "512");
        assert_eq!(ds.get_text_or(tags::PRINTER_STATUS_INFO, "NORMAL"), "NORMAL");
        assert_eq!(ds.get_text_or(tags::PRINTER_NAME, ""), "");
    }

    #[test]
    fn finds_pixel_data_in_nested_sequence() {
        let image = Dataset::new()
            .with(tags::ROWS, 2u16)
            .with(tags::PIXEL_DATA, vec![0u8, 255, 0, 255]);
        let image_box = Dataset::new()
            .with(tags::IMAGE_BOX_POSITION, 1u16)
            .with(tags::BASIC_GRAYSCALE_IMAGE_SEQUENCE, vec![image.clone()]);

        assert_eq!(image_box.find_pixel_dataset(), Some(&image));
        assert!(Dataset::new().find_pixel_dataset().is_none());
    }

    #[test]
    fn json_snapshot_keeps_bytes_and_sequences() {
        let ds = Dataset::new()
            .with(tags::FILM_SESSION_LABEL, "CHEST")
            .with(
                tags::BASIC_GRAYSCALE_IMAGE_SEQUENCE,
                vec![Dataset::new().with(tags::PIXEL_DATA, vec![1u8, 2, 3])],
            );

        let json = serde_json::to_string(&ds).unwrap();
        assert!(json.contains("\"20000050\""));
        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ds);
    }
}
