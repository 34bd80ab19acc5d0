use std::io::Read;

use roxmltree::{Document, ParsingOptions};

use crate::codec::{self, EncodeOptions, WireVersion, XSI_NAMESPACE};
use crate::convert::Timestamp;
use crate::extensions::{ExtensionElement, NamespaceMap};
use crate::model::{Bounds, Route, Track, Waypoint};
use crate::schema::{FieldSpec, Record, Schema, SchemaError, SchemaTables};
use crate::{CodecError, Result};

/// A GPX document
///
/// Metadata is flattened onto the document the way GPX 1.0 lays it out; the 1.1 tables
/// regroup it under `<metadata>`, `<author>`, `<copyright>` and `<link>`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gpx {
    /// Version the document was read as; output version is chosen per encode
    pub version: Option<WireVersion>,
    /// Required by GPX: encoding a document without one writes [`EncodeOptions::creator`],
    /// so it reads back as `Some`
    pub creator: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub author_link: Option<String>,
    pub author_link_text: Option<String>,
    pub author_link_type: Option<String>,
    pub copyright_author: Option<String>,
    pub copyright_year: Option<u32>,
    pub copyright_license: Option<String>,
    pub link: Option<String>,
    pub link_text: Option<String>,
    pub link_type: Option<String>,
    pub time: Option<Timestamp>,
    pub keywords: Option<String>,
    pub bounds: Option<Bounds>,
    pub metadata_extensions: Vec<ExtensionElement>,
    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<Route>,
    pub tracks: Vec<Track>,
    pub extensions: Vec<ExtensionElement>,
    /// Prefixes declared in the source document, reused for extensions on output
    pub namespaces: NamespaceMap,
    /// `xsi:schemaLocation` as namespace / location pairs
    pub schema_locations: Vec<String>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Gpx {
    /// Parse a document, inferring its version
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_version(text, None)
    }

    /// Parse a document, forcing `version` when given
    pub fn parse_with_version(text: &str, version: Option<WireVersion>) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("gpx::parse");

        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = Document::parse_with_options(text, options)?;
        let root = doc.root_element();
        if root.tag_name().name() != "gpx" {
            return Err(CodecError::NotGpx(root.tag_name().name().to_string()));
        }

        let version = match version {
            Some(version) => version,
            None => codec::detect_version(root)?,
        };
        let mut gpx: Gpx = codec::decode(root, version)?;
        gpx.version = Some(version);
        gpx.namespaces = NamespaceMap::collect(&doc);
        gpx.schema_locations = root
            .attribute((XSI_NAMESPACE, "schemaLocation"))
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        tracing::debug!(
            "Decoded GPX {version}: {} waypoints, {} routes, {} tracks",
            gpx.waypoints.len(),
            gpx.routes.len(),
            gpx.tracks.len()
        );
        Ok(gpx)
    }

    /// Serialize as a complete document in `version`
    pub fn to_xml(&self, version: WireVersion, options: &EncodeOptions) -> Result<String> {
        #[cfg(feature = "profiling")]
        profiling::scope!("gpx::to_xml");

        let schema_location = self.schema_location(version);
        let mut root = vec![("version", version.as_str())];
        if self.creator.as_deref().is_none_or(str::is_empty) {
            root.push(("creator", options.creator()));
        }
        root.push(("xsi:schemaLocation", schema_location.as_str()));

        codec::encode_document(self, "gpx", version, &self.namespaces, &root, options)
    }

    /// Schema location for `version`, keeping pairs for non-GPX namespaces
    fn schema_location(&self, version: WireVersion) -> String {
        let mut parts = vec![version.namespace(), version.schema_url()];
        for pair in self.schema_locations.chunks(2) {
            if let [namespace, location] = pair {
                if WireVersion::from_namespace(namespace).is_none() {
                    parts.push(namespace);
                    parts.push(location);
                }
            }
        }
        parts.join(" ")
    }

    /// Number of waypoints, route points and track points
    pub fn point_count(&self) -> usize {
        self.waypoints.len()
            + self.routes.iter().map(|r| r.points.len()).sum::<usize>()
            + self.tracks.iter().map(Track::point_count).sum::<usize>()
    }

    /// Total length of all tracks in meters
    pub fn length_2d(&self) -> f64 {
        self.tracks.iter().map(Track::length_2d).sum()
    }

    pub fn length_3d(&self) -> f64 {
        self.tracks.iter().map(Track::length_3d).sum()
    }

    /// Bounds of every point in the document, `None` when there are no points
    pub fn compute_bounds(&self) -> Option<Bounds> {
        let points = self
            .waypoints
            .iter()
            .chain(self.routes.iter().flat_map(|r| r.points.iter()))
            .chain(self.tracks.iter().flat_map(Track::points));
        crate::geometry::bounds(points)
    }
}

/// Read a whole document from `reader`
pub fn read<R: Read>(mut reader: R) -> Result<Gpx> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Gpx::parse(&text)
}

fn gpx_v1_0() -> std::result::Result<Schema<Gpx>, SchemaError> {
    Schema::builder()
        .attribute(slot!(Gpx, creator), "creator")
        .element(slot!(Gpx, name), "name")
        .field(FieldSpec::new(slot!(Gpx, description)).tag("desc").free_text())
        .element(slot!(Gpx, author_name), "author")
        .element(slot!(Gpx, author_email), "email")
        .element(slot!(Gpx, link), "url")
        .element(slot!(Gpx, link_text), "urlname")
        .element(slot!(Gpx, time), "time")
        .element(slot!(Gpx, keywords), "keywords")
        .nested(slot!(Gpx, bounds), "bounds")
        .repeated(slot!(Gpx, waypoints), "wpt")
        .repeated(slot!(Gpx, routes), "rte")
        .repeated(slot!(Gpx, tracks), "trk")
        .build()
}

fn gpx_v1_1() -> std::result::Result<Schema<Gpx>, SchemaError> {
    Schema::builder()
        .attribute(slot!(Gpx, creator), "creator")
        .directive("metadata:")
        .element(slot!(Gpx, name), "name")
        .field(FieldSpec::new(slot!(Gpx, description)).tag("desc").free_text())
        .directive("author:author_name:author_email:author_link:author_link_text:author_link_type")
        .element(slot!(Gpx, author_name), "name")
        .email(slot!(Gpx, author_email), "email")
        .directive("link:author_link:author_link_text:author_link_type")
        .attribute(slot!(Gpx, author_link), "href")
        .element(slot!(Gpx, author_link_text), "text")
        .element(slot!(Gpx, author_link_type), "type")
        .directive("/link")
        .directive("/author")
        .directive("copyright:copyright_author:copyright_year:copyright_license")
        .attribute(slot!(Gpx, copyright_author), "author")
        .element(slot!(Gpx, copyright_year), "year")
        .element(slot!(Gpx, copyright_license), "license")
        .directive("/copyright")
        .directive("link:link:link_text:link_type")
        .attribute(slot!(Gpx, link), "href")
        .element(slot!(Gpx, link_text), "text")
        .element(slot!(Gpx, link_type), "type")
        .directive("/link")
        .element(slot!(Gpx, time), "time")
        .element(slot!(Gpx, keywords), "keywords")
        .nested(slot!(Gpx, bounds), "bounds")
        .extensions(slot!(Gpx, metadata_extensions), "extensions")
        .directive("/metadata")
        .repeated(slot!(Gpx, waypoints), "wpt")
        .repeated(slot!(Gpx, routes), "rte")
        .repeated(slot!(Gpx, tracks), "trk")
        .extensions(slot!(Gpx, extensions), "extensions")
        .build()
}

impl Record for Gpx {
    fn schema(version: WireVersion) -> Result<&'static Schema<Self>> {
        static TABLES: SchemaTables<Gpx> = SchemaTables::new(gpx_v1_0, gpx_v1_1);
        TABLES.get(version)
    }
}
