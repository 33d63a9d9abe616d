use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a barcode symbology ("EAN13", "QR", ...).
///
/// The core never interprets the identifier; it only compares it against the
/// families the active output reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeFamily(Cow<'static, str>);

impl CodeFamily {
    pub const PDF417: CodeFamily = CodeFamily::from_static("PDF417");
    pub const QR: CodeFamily = CodeFamily::from_static("QR");
    pub const AZTEC: CodeFamily = CodeFamily::from_static("Aztec");
    pub const EAN13: CodeFamily = CodeFamily::from_static("EAN13");
    pub const EAN8: CodeFamily = CodeFamily::from_static("EAN8");
    pub const UPCE: CodeFamily = CodeFamily::from_static("UPCE");
    pub const CODE39: CodeFamily = CodeFamily::from_static("Code39");
    pub const CODE39_MOD43: CodeFamily = CodeFamily::from_static("Code39Mod43");
    pub const CODE93: CodeFamily = CodeFamily::from_static("Code93");
    pub const CODE128: CodeFamily = CodeFamily::from_static("Code128");
    pub const ITF14: CodeFamily = CodeFamily::from_static("ITF14");
    pub const INTERLEAVED_2_OF_5: CodeFamily = CodeFamily::from_static("Interleaved2of5");
    pub const DATA_MATRIX: CodeFamily = CodeFamily::from_static("DataMatrix");

    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fixed set of families the reader asks for by default.
    pub fn supported() -> BTreeSet<CodeFamily> {
        [
            Self::PDF417,
            Self::QR,
            Self::AZTEC,
            Self::EAN13,
            Self::EAN8,
            Self::UPCE,
            Self::CODE39,
            Self::CODE39_MOD43,
            Self::CODE93,
            Self::CODE128,
            Self::ITF14,
            Self::INTERLEAVED_2_OF_5,
            Self::DATA_MATRIX,
        ]
        .into_iter()
        .collect()
    }
}

impl fmt::Display for CodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for CodeFamily {
    fn from(id: &'static str) -> Self {
        Self::from_static(id)
    }
}

/// A decoded code as reported to the consumer. Immutable, delivered once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectedCode {
    pub family: CodeFamily,
    pub payload: String,
}

impl DetectedCode {
    pub fn new(family: impl Into<CodeFamily>, payload: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            payload: payload.into(),
        }
    }
}

/// A raw object emitted by the platform's metadata output.
///
/// Only `MachineReadableCode` objects are of interest; faces and other kinds
/// are filtered out by the detection sink.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataObject {
    MachineReadableCode { family: CodeFamily, payload: String },
    Face { face_id: i64 },
    Other { kind: String },
}

impl MetadataObject {
    pub fn code(family: impl Into<CodeFamily>, payload: impl Into<String>) -> Self {
        Self::MachineReadableCode {
            family: family.into(),
            payload: payload.into(),
        }
    }
}
