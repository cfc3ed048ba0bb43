// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Filmwerk print provider.

use serde::{Deserialize, Serialize};

/// Well-known paper kinds a driver reports alongside the paper name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperKind {
    A4,
    A3,
    Letter,
    Legal,
    Custom,
}

/// A paper size in hundredths of an inch, as reported by a printer driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSize {
    pub name: String,
    pub kind: PaperKind,
    pub width: i32,
    pub height: i32,
}

impl PaperSize {
    pub fn new(name: impl Into<String>, kind: PaperKind, width: i32, height: i32) -> Self {
        Self {
            name: name.into(),
            kind,
            width,
            height,
        }
    }

    /// A size that is not in the device catalog.
    pub fn custom(name: impl Into<String>, width: i32, height: i32) -> Self {
        Self::new(name, PaperKind::Custom, width, height)
    }
}

/// A paper source (tray) as reported by a printer driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSource {
    pub name: String,
}

impl PaperSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Duplex printing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplexMode {
    Simplex,
    LongEdge,
    ShortEdge,
}

impl DuplexMode {
    /// Map a route's duplex token.  Unknown or empty tokens mean "leave the
    /// device default alone".
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "longedge" | "twosidedlongedge" | "long" => Some(Self::LongEdge),
            "shortedge" | "twosidedshortedge" | "short" => Some(Self::ShortEdge),
            "simplex" | "onesided" => Some(Self::Simplex),
            _ => None,
        }
    }
}

/// Film orientation (2010,0040).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn from_attribute(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("LANDSCAPE") {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }

    pub fn as_attribute(&self) -> &'static str {
        match self {
            Self::Portrait => "PORTRAIT",
            Self::Landscape => "LANDSCAPE",
        }
    }

    pub fn is_landscape(&self) -> bool {
        matches!(self, Self::Landscape)
    }
}

/// Polarity (2020,0020): whether pixel intensities print as-is or inverted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    #[default]
    Normal,
    Reverse,
}

impl Polarity {
    pub fn from_attribute(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("REVERSE") {
            Self::Reverse
        } else {
            Self::Normal
        }
    }
}

/// Lifecycle states of a print job.
///
/// The discriminants are the N-EVENT-REPORT event type IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum PrintJobStatus {
    /// Created, films being persisted.
    Pending = 1,
    /// Handed to the spooler.
    Printing = 2,
    /// All pages produced.
    Done = 3,
    /// Persistence or execution failed; see the job error.
    Failure = 4,
}

impl PrintJobStatus {
    pub fn event_type_id(&self) -> u16 {
        *self as u16
    }

    /// Execution Status (2100,0020) keyword.
    pub fn as_attribute(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Printing => "PRINTING",
            Self::Done => "DONE",
            Self::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failure)
    }

    /// Pending → Printing → (Done | Failure), or Pending → Failure.
    pub fn can_transition_to(&self, next: PrintJobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Printing)
                | (Self::Pending, Self::Failure)
                | (Self::Printing, Self::Done)
                | (Self::Printing, Self::Failure)
        )
    }
}

impl std::fmt::Display for PrintJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "Pending",
            Self::Printing => "Printing",
            Self::Done => "Done",
            Self::Failure => "Failure",
        };
        f.write_str(name)
    }
}

/// Status of the print provider's listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplex_tokens() {
        assert_eq!(DuplexMode::from_token("LongEdge"), Some(DuplexMode::LongEdge));
        assert_eq!(DuplexMode::from_token(" twoSidedShortEdge "), Some(DuplexMode::ShortEdge));
        assert_eq!(DuplexMode::from_token("onesided"), Some(DuplexMode::Simplex));
        assert_eq!(DuplexMode::from_token("both"), None);
        assert_eq!(DuplexMode::from_token(""), None);
    }

    #[test]
    fn job_status_transitions() {
        use PrintJobStatus::*;
        assert!(Pending.can_transition_to(Printing));
        assert!(Pending.can_transition_to(Failure));
        assert!(Printing.can_transition_to(Done));
        assert!(Printing.can_transition_to(Failure));
        assert!(!Pending.can_transition_to(Done));
        assert!(!Done.can_transition_to(Printing));
        assert!(!Failure.can_transition_to(Done));
        assert_eq!(Failure.event_type_id(), 4);
    }

    #[test]
    fn orientation_and_polarity_attributes() {
        assert!(Orientation::from_attribute("landscape").is_landscape());
        assert_eq!(Orientation::from_attribute(""), Orientation::Portrait);
        assert_eq!(Polarity::from_attribute("REVERSE"), Polarity::Reverse);
        assert_eq!(Polarity::from_attribute("NORMAL"), Polarity::Normal);
    }
}
