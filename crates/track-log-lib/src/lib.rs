//! Track Log Library - Schema-driven GPX 1.0 / 1.1 codec
//!
//! This library reads and writes GPX track logs in both wire versions from a single
//! object model. Instead of one hand-written serializer per version, every record type
//! declares an ordered schema table per version and a small interpreter walks those
//! tables to decode XML into records or to encode records back into XML.
//!
//! # Architecture
//!
//! - **[`convert`]**: String <-> value converters (numbers, integers, timestamps)
//! - **[`field`]**: Field descriptors binding record properties to wire syntax
//! - **[`schema`]**: Schema tables, the directive mini-language and the [`Record`] trait
//! - **[`codec`]**: The `decode` / `encode` interpreter
//! - **[`extensions`]**: Opaque foreign-namespace fragments and prefix resolution
//! - **[`model`]**: The GPX records ([`Gpx`], [`Waypoint`], [`Route`], [`Track`], ...)
//! - **[`geometry`]**: Distances, lengths and simplification over the decoded records
//!
//! # Example
//!
//! ```
//! use track_log_lib::{EncodeOptions, Gpx, WireVersion};
//!
//! let xml = r#"<gpx version="1.1" creator="demo" xmlns="http://www.topografix.com/GPX/1/1">
//!     <wpt lat="12.3" lon="45.6"><ele>75.1</ele></wpt>
//! </gpx>"#;
//!
//! let gpx = Gpx::parse(xml).unwrap();
//! assert_eq!(gpx.waypoints.len(), 1);
//!
//! let v10 = gpx.to_xml(WireVersion::V1_0, &EncodeOptions::default()).unwrap();
//! assert!(v10.contains(r#"version="1.0""#));
//! ```

#[macro_use]
mod macros;

pub mod codec;
pub mod convert;
pub mod extensions;
pub mod field;
pub mod geometry;
pub mod model;
pub mod schema;
mod writer;

// Public API exports
pub use codec::{EncodeOptions, WireVersion, decode, encode};
pub use convert::{ConvertError, Timestamp, WireValue};
pub use extensions::{ExtensionElement, NamespaceMap, QualifiedName};
pub use model::{Bounds, Gpx, Route, Track, TrackSegment, Waypoint, read, validate_schemas};
pub use schema::{Record, Schema, SchemaError};

/// Error types for the codec
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] roxmltree::Error),

    #[error("{field} is mandatory in {location}")]
    MissingField {
        field: &'static str,
        location: String,
    },

    #[error("invalid value {value:?} for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: InvalidReason,
    },

    #[error("schema configuration error: {0}")]
    Schema(#[from] SchemaError),

    #[error("<{tag}> of {field} is missing the `{missing}` attribute")]
    CompoundField {
        field: &'static str,
        tag: &'static str,
        missing: &'static str,
    },

    #[error("unsupported GPX version: {0:?}")]
    UnsupportedVersion(String),

    #[error("expected a <gpx> root element, found <{0}>")]
    NotGpx(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a decoded value was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidReason {
    #[error("{0}")]
    Conversion(#[from] ConvertError),

    #[error("possible values: {0:?}")]
    NotAllowed(&'static [&'static str]),
}

pub type Result<T> = std::result::Result<T, CodecError>;
