// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The Printer SOP instance exposed by this provider.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Local};
use tracing::info;

use filmwerk_core::config::ServerConfig;
use filmwerk_core::dataset::{Dataset, Tag, tags};

/// Process-wide printer descriptor.
///
/// The printer name follows the most recent routing decision; every other
/// attribute is fixed at construction.
#[derive(Debug)]
pub struct Printer {
    ae_title: String,
    name: RwLock<String>,
    status: String,
    status_info: String,
    manufacturer: String,
    model_name: String,
    device_serial_number: String,
    software_versions: String,
    calibrated_at: DateTime<Local>,
}

impl Printer {
    pub fn new(ae_title: impl Into<String>, config: &ServerConfig) -> Self {
        Self {
            ae_title: ae_title.into(),
            name: RwLock::new(String::new()),
            status: "NORMAL".into(),
            status_info: "NORMAL".into(),
            manufacturer: config.manufacturer.clone(),
            model_name: config.model_name.clone(),
            device_serial_number: config.device_serial_number.clone(),
            software_versions: config.software_versions.clone(),
            calibrated_at: Local::now(),
        }
    }

    pub fn ae_title(&self) -> &str {
        &self.ae_title
    }

    /// Name of the currently routed output device.
    pub fn name(&self) -> String {
        self.name.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Point the printer at another output device (last writer wins).
    pub fn set_name(&self, name: &str) {
        let mut current = self.name.write().unwrap_or_else(PoisonError::into_inner);
        if *current != name {
            info!(ae_title = %self.ae_title, printer = name, "printer routed");
            *current = name.to_string();
        }
    }

    /// Every attribute the printer carries.
    pub fn attributes(&self) -> Dataset {
        Dataset::new()
            .with(tags::PRINTER_STATUS, self.status.as_str())
            .with(tags::PRINTER_STATUS_INFO, self.status_info.as_str())
            .with(tags::PRINTER_NAME, self.name())
            .with(tags::MANUFACTURER, self.manufacturer.as_str())
            .with(tags::MANUFACTURER_MODEL_NAME, self.model_name.as_str())
            .with(tags::DEVICE_SERIAL_NUMBER, self.device_serial_number.as_str())
            .with(tags::SOFTWARE_VERSIONS, self.software_versions.as_str())
            .with(
                tags::DATE_OF_LAST_CALIBRATION,
                self.calibrated_at.format("%Y%m%d").to_string(),
            )
            .with(
                tags::TIME_OF_LAST_CALIBRATION,
                self.calibrated_at.format("%H%M%S").to_string(),
            )
    }

    /// N-GET response when no attributes were requested.
    pub fn default_attributes(&self) -> Dataset {
        let mut attributes = self.attributes();
        attributes.put(tags::PRINTER_STATUS_INFO, "");
        attributes
    }

    /// Exactly the requested attributes, empty text where unknown.
    pub fn get_attributes(&self, requested: &[Tag]) -> Dataset {
        select_attributes(&self.attributes(), requested)
    }
}

/// Copy `requested` tags out of `source`, empty text for absent ones.
pub(crate) fn select_attributes(source: &Dataset, requested: &[Tag]) -> Dataset {
    let mut selected = Dataset::new();
    for tag in requested {
        match source.get(*tag) {
            Some(value) => selected.put(*tag, value.clone()),
            None => selected.put(*tag, ""),
        };
    }
    selected
}
