// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DICOM print management protocol constants: SOP classes, well-known
// instances, transfer syntaxes and DIMSE status codes (PS3.4 Annex H,
// PS3.7 Annex C).

use uuid::Uuid;

// ---------------------------------------------------------------------------
// SOP classes and well-known instances
// ---------------------------------------------------------------------------

pub const VERIFICATION: &str = "1.2.840.10008.1.1";
pub const BASIC_FILM_SESSION: &str = "1.2.840.10008.5.1.1.1";
pub const BASIC_FILM_BOX: &str = "1.2.840.10008.5.1.1.2";
pub const BASIC_GRAYSCALE_IMAGE_BOX: &str = "1.2.840.10008.5.1.1.4";
pub const BASIC_COLOR_IMAGE_BOX: &str = "1.2.840.10008.5.1.1.4.1";
pub const BASIC_GRAYSCALE_PRINT_MANAGEMENT_META: &str = "1.2.840.10008.5.1.1.9";
pub const PRINT_JOB: &str = "1.2.840.10008.5.1.1.14";
pub const PRINTER: &str = "1.2.840.10008.5.1.1.16";
pub const PRINTER_INSTANCE: &str = "1.2.840.10008.5.1.1.17";
pub const BASIC_COLOR_PRINT_MANAGEMENT_META: &str = "1.2.840.10008.5.1.1.18";
pub const PRINTER_CONFIGURATION_RETRIEVAL: &str = "1.2.840.10008.5.1.1.16.376";
pub const PRINTER_CONFIGURATION_RETRIEVAL_INSTANCE: &str = "1.2.840.10008.5.1.1.17.376";

// ---------------------------------------------------------------------------
// Transfer syntaxes
// ---------------------------------------------------------------------------

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

/// Transfer syntaxes accepted on every supported presentation context, in
/// order of preference.
pub const ACCEPTED_TRANSFER_SYNTAXES: [&str; 3] = [
    EXPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_BIG_ENDIAN,
    IMPLICIT_VR_LITTLE_ENDIAN,
];

/// N-ACTION Action Type ID for "print".
pub const ACTION_TYPE_PRINT: u16 = 0x0001;

/// Generate a globally unique UID under the UUID-derived `2.25` root.
pub fn generate_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

/// Whether a UID names one of the two image box SOP classes.
pub fn is_image_box_class(uid: &str) -> bool {
    uid == BASIC_GRAYSCALE_IMAGE_BOX || uid == BASIC_COLOR_IMAGE_BOX
}

// ---------------------------------------------------------------------------
// DIMSE status
// ---------------------------------------------------------------------------

/// Status returned in every DIMSE response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimseStatus {
    Success,
    ProcessingFailure,
    NoSuchObjectInstance,
    InvalidObjectInstance,
    NoSuchSopClass,
    NoSuchActionType,
}

impl DimseStatus {
    /// Wire value of the Status (0000,0900) command element.
    pub fn code(&self) -> u16 {
        match self {
            Self::Success => 0x0000,
            Self::ProcessingFailure => 0x0110,
            Self::NoSuchObjectInstance => 0x0112,
            Self::InvalidObjectInstance => 0x0117,
            Self::NoSuchSopClass => 0x0118,
            Self::NoSuchActionType => 0x0123,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for DimseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} [0x{:04X}]", self.code())
    }
}
