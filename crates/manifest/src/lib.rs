//! Android Manifest Inspection
//!
//! Reads application metadata (package identity, entry-point activity,
//! platform versions) from AndroidManifest.xml, with an optional
//! `default.properties` override for the target platform version.

pub mod inspector;
pub mod properties;

pub use inspector::{ManifestInfo, ManifestInspector};
pub use properties::target_from_properties;

/// Manifest parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("manifest is missing {0}")]
    MissingElement(&'static str),
    #[error("invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
}
