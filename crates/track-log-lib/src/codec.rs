//! The decode / encode interpreter
//!
//! Both directions walk a record's schema table in order. Decoding keeps a stack of
//! scope nodes (the element each wrapper directive resolved to, or nothing when the
//! wrapper is absent) and lets every field read itself from the top of that stack.
//! Encoding writes start tags lazily so attribute fields land in the element they belong
//! to, and skips conditional wrappers whose dependent fields are all empty.

use std::str::FromStr;

use roxmltree::Node;

use crate::extensions::NamespaceMap;
use crate::schema::{Entry, Record, Schema};
use crate::writer::XmlWriter;
use crate::{CodecError, Result};

pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Creator written when neither the document nor the options name one
pub const DEFAULT_CREATOR: &str = concat!("track-log ", env!("CARGO_PKG_VERSION"));

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// GPX wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WireVersion {
    V1_0,
    V1_1,
}

impl WireVersion {
    pub const ALL: [WireVersion; 2] = [WireVersion::V1_0, WireVersion::V1_1];

    pub const fn as_str(self) -> &'static str {
        match self {
            WireVersion::V1_0 => "1.0",
            WireVersion::V1_1 => "1.1",
        }
    }

    /// Default namespace of documents in this version
    pub const fn namespace(self) -> &'static str {
        match self {
            WireVersion::V1_0 => "http://www.topografix.com/GPX/1/0",
            WireVersion::V1_1 => "http://www.topografix.com/GPX/1/1",
        }
    }

    pub const fn schema_url(self) -> &'static str {
        match self {
            WireVersion::V1_0 => "http://www.topografix.com/GPX/1/0/gpx.xsd",
            WireVersion::V1_1 => "http://www.topografix.com/GPX/1/1/gpx.xsd",
        }
    }

    /// Only 1.1 has `<extensions>` elements
    pub const fn supports_extensions(self) -> bool {
        matches!(self, WireVersion::V1_1)
    }

    pub fn from_namespace(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.namespace() == uri)
    }
}

impl FromStr for WireVersion {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1.0" => Ok(WireVersion::V1_0),
            "1.1" => Ok(WireVersion::V1_1),
            other => Err(CodecError::UnsupportedVersion(other.to_string())),
        }
    }
}

impl std::fmt::Display for WireVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output settings for encoding
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncodeOptions {
    /// Indent nested elements by two spaces per level
    pub pretty: bool,

    /// Creator attribute for documents that do not carry one
    pub creator: Option<String>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            creator: None,
        }
    }
}

impl EncodeOptions {
    /// Single-line output
    pub fn compact() -> Self {
        Self {
            pretty: false,
            ..Default::default()
        }
    }

    pub fn creator(&self) -> &str {
        self.creator.as_deref().unwrap_or(DEFAULT_CREATOR)
    }
}

/// State shared by all fields while decoding one document
pub struct DecodeContext<'a> {
    pub version: WireVersion,
    /// Namespace that child elements must be in to match a tag
    pub namespace: Option<&'a str>,
}

/// State shared by all fields while encoding one document
pub struct EncodeContext<'a> {
    pub version: WireVersion,
    pub namespaces: &'a NamespaceMap,
}

/// Infer the wire version of a document from its root element
///
/// The `version` attribute wins; without one the root namespace is used.
pub fn detect_version(root: Node<'_, '_>) -> Result<WireVersion> {
    if let Some(version) = root.attribute("version") {
        return version.parse();
    }
    let namespace = root.tag_name().namespace().unwrap_or_default();
    match WireVersion::from_namespace(namespace) {
        Some(version) => {
            tracing::warn!("Document has no version attribute, assuming {version} from its namespace");
            Ok(version)
        }
        None => Err(CodecError::UnsupportedVersion(namespace.to_string())),
    }
}

/// Decode `node` as a record of type `R`
pub fn decode<R: Record>(node: Node<'_, '_>, version: WireVersion) -> Result<R> {
    #[cfg(feature = "profiling")]
    profiling::scope!("codec::decode");

    let ctx = DecodeContext {
        version,
        namespace: node.tag_name().namespace(),
    };
    decode_record(node, &ctx)
}

pub(crate) fn decode_record<R: Record>(node: Node<'_, '_>, ctx: &DecodeContext<'_>) -> Result<R> {
    let schema = R::schema(ctx.version)?;
    let mut record = R::default();
    let mut scopes: Vec<Option<Node<'_, '_>>> = vec![Some(node)];

    for entry in &schema.entries {
        let current = scopes.last().copied().flatten();
        match entry {
            // Wrappers are looked up whether or not a conditional's dependents could be set
            Entry::Open { tag } | Entry::Conditional { tag, .. } => {
                scopes.push(current.and_then(|scope| find_child(scope, tag, ctx)));
            }
            Entry::Close { .. } => {
                scopes.pop();
            }
            Entry::Field(field) => {
                // Attributes of a missing wrapper are looked for on the record element
                let scope = match current {
                    None if field.is_attribute() => Some(node),
                    other => other,
                };
                field.decode(&mut record, scope, ctx)?;
            }
        }
    }
    Ok(record)
}

/// First element child named `tag` in the record's namespace
pub(crate) fn find_child<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    ctx: &DecodeContext<'_>,
) -> Option<Node<'a, 'input>> {
    node.children().find(|child| is_tag(*child, tag, ctx))
}

/// All element children named `tag` in the record's namespace, in document order
pub(crate) fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    ctx: &DecodeContext<'_>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| is_tag(*child, tag, ctx))
}

fn is_tag(node: Node<'_, '_>, tag: &str, ctx: &DecodeContext<'_>) -> bool {
    let name = node.tag_name();
    node.is_element() && name.name() == tag && name.namespace() == ctx.namespace
}

/// Encode `record` as a standalone `<tag>` element
pub fn encode<R: Record>(
    record: &R,
    tag: &str,
    version: WireVersion,
    namespaces: &NamespaceMap,
    options: &EncodeOptions,
) -> Result<String> {
    #[cfg(feature = "profiling")]
    profiling::scope!("codec::encode");

    let ctx = EncodeContext {
        version,
        namespaces,
    };
    let mut out = XmlWriter::new(options.pretty);
    encode_record(record, tag, &ctx, &mut out)?;
    Ok(out.finish())
}

/// Encode `record` as the root element of a complete document
///
/// The root carries the version's default namespace, every prefix bound in
/// `namespaces` (sorted, `xsi` always included) and `root_attributes`, ahead of the
/// record's own attribute fields.
pub fn encode_document<R: Record>(
    record: &R,
    tag: &str,
    version: WireVersion,
    namespaces: &NamespaceMap,
    root_attributes: &[(&str, &str)],
    options: &EncodeOptions,
) -> Result<String> {
    #[cfg(feature = "profiling")]
    profiling::scope!("codec::encode_document");

    let mut namespaces = namespaces.clone();
    namespaces.default = Some(version.namespace().to_string());
    if namespaces.uri("xsi").is_none() {
        namespaces.insert("xsi", XSI_NAMESPACE);
    }

    let ctx = EncodeContext {
        version,
        namespaces: &namespaces,
    };
    let schema = R::schema(version)?;

    let mut out = XmlWriter::new(options.pretty);
    out.raw(XML_DECLARATION);
    out.start(tag);
    out.attribute("xmlns", version.namespace());
    for (prefix, uri) in namespaces.iter() {
        out.attribute(&format!("xmlns:{prefix}"), uri);
    }
    for (name, value) in root_attributes {
        out.attribute(name, value);
    }
    encode_entries(record, schema, &ctx, &mut out)?;
    out.end(tag);

    tracing::debug!("Encoded <{tag}> document as GPX {version}");
    Ok(out.finish())
}

pub(crate) fn encode_record<R: Record>(
    record: &R,
    tag: &str,
    ctx: &EncodeContext<'_>,
    out: &mut XmlWriter,
) -> Result<()> {
    let schema = R::schema(ctx.version)?;
    out.start(tag);
    encode_entries(record, schema, ctx, out)?;
    out.end(tag);
    Ok(())
}

fn encode_entries<R: Record>(
    record: &R,
    schema: &Schema<R>,
    ctx: &EncodeContext<'_>,
    out: &mut XmlWriter,
) -> Result<()> {
    let entries = &schema.entries;
    let mut index = 0;
    while index < entries.len() {
        match &entries[index] {
            Entry::Open { tag } => out.start(tag),
            Entry::Conditional {
                tag,
                depends_on,
                close,
            } => {
                let wanted = depends_on.iter().any(|&dependency| {
                    matches!(&entries[dependency], Entry::Field(field) if field.is_present(record))
                });
                if !wanted {
                    index = close + 1;
                    continue;
                }
                out.start(tag);
            }
            Entry::Close { tag } => out.end(tag),
            Entry::Field(field) => field.encode(record, ctx, out)?,
        }
        index += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bounds, Waypoint};
    use crate::schema::{Schema, SchemaError, SchemaTables};

    fn parse_root(xml: &str) -> roxmltree::Document<'_> {
        roxmltree::Document::parse(xml).unwrap()
    }

    #[test]
    fn test_version_strings() {
        assert_eq!("1.0".parse::<WireVersion>().unwrap(), WireVersion::V1_0);
        assert_eq!(" 1.1 ".parse::<WireVersion>().unwrap(), WireVersion::V1_1);
        assert!(matches!(
            "2.0".parse::<WireVersion>(),
            Err(CodecError::UnsupportedVersion(v)) if v == "2.0"
        ));
        assert_eq!(WireVersion::V1_1.to_string(), "1.1");
    }

    #[test]
    fn test_detect_version() {
        let doc = parse_root(r#"<gpx version="1.0" xmlns="http://www.topografix.com/GPX/1/1"/>"#);
        assert_eq!(detect_version(doc.root_element()).unwrap(), WireVersion::V1_0);

        let doc = parse_root(r#"<gpx xmlns="http://www.topografix.com/GPX/1/1"/>"#);
        assert_eq!(detect_version(doc.root_element()).unwrap(), WireVersion::V1_1);

        let doc = parse_root("<gpx/>");
        assert!(matches!(
            detect_version(doc.root_element()),
            Err(CodecError::UnsupportedVersion(_))
        ));
    }

    #[derive(Debug, Default, PartialEq)]
    struct Station {
        code: Option<String>,
        label: Option<String>,
        elevation: Option<f64>,
    }

    fn station_table() -> std::result::Result<Schema<Station>, SchemaError> {
        Schema::builder()
            .directive("info:")
            .attribute(slot!(Station, code), "code")
            .element(slot!(Station, label), "label")
            .directive("/info")
            .element(slot!(Station, elevation), "ele")
            .build()
    }

    impl Record for Station {
        fn schema(version: WireVersion) -> Result<&'static Schema<Self>> {
            static TABLES: SchemaTables<Station> = SchemaTables::new(station_table, station_table);
            TABLES.get(version)
        }
    }

    #[test]
    fn test_attribute_under_missing_wrapper_reads_record_node() {
        let doc = parse_root(r#"<station code="A1"><ele>12.5</ele></station>"#);
        let station: Station = decode(doc.root_element(), WireVersion::V1_1).unwrap();
        assert_eq!(
            station,
            Station {
                code: Some("A1".to_string()),
                label: None,
                elevation: Some(12.5),
            }
        );
    }

    #[test]
    fn test_attribute_under_present_wrapper_reads_wrapper() {
        let doc = parse_root(
            r#"<station code="outer"><info code="inner"><label>L</label></info><ele>3</ele></station>"#,
        );
        let station: Station = decode(doc.root_element(), WireVersion::V1_1).unwrap();
        assert_eq!(station.code.as_deref(), Some("inner"));
        assert_eq!(station.label.as_deref(), Some("L"));
        assert_eq!(station.elevation, Some(3.0));
    }

    #[test]
    fn test_decode_standalone_record() {
        let doc = parse_root(r#"<bounds minlat="1.5" maxlat="2" minlon="-3" maxlon="4"/>"#);
        let bounds: Bounds = decode(doc.root_element(), WireVersion::V1_1).unwrap();
        assert_eq!(bounds.min_latitude, Some(1.5));
        assert_eq!(bounds.max_longitude, Some(4.0));
    }

    #[test]
    fn test_children_must_share_record_namespace() {
        let doc = parse_root(
            r#"<wpt xmlns="http://www.topografix.com/GPX/1/1" xmlns:o="urn:other" lat="1" lon="2">
                 <o:ele>5</o:ele>
                 <name>A</name>
               </wpt>"#,
        );
        let point: Waypoint = decode(doc.root_element(), WireVersion::V1_1).unwrap();
        assert_eq!(point.elevation, None);
        assert_eq!(point.name.as_deref(), Some("A"));
    }

    #[test]
    fn test_encode_standalone_record() {
        let point = Waypoint {
            latitude: 12.3,
            longitude: 45.6,
            elevation: Some(75.1),
            ..Default::default()
        };
        let xml = encode(
            &point,
            "wpt",
            WireVersion::V1_1,
            &NamespaceMap::new(),
            &EncodeOptions::compact(),
        )
        .unwrap();
        assert_eq!(xml, r#"<wpt lat="12.3" lon="45.6"><ele>75.1</ele></wpt>"#);
    }

    #[test]
    fn test_encode_document_root() {
        let mut namespaces = NamespaceMap::new();
        namespaces.insert("gpxtpx", "urn:tpx");
        let xml = encode_document(
            &Bounds::default(),
            "bounds",
            WireVersion::V1_1,
            &namespaces,
            &[("version", "1.1")],
            &EncodeOptions::compact(),
        )
        .unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<bounds xmlns="http://www.topografix.com/GPX/1/1" xmlns:gpxtpx="urn:tpx" "#,
                r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" version="1.1"/>"#
            )
        );
    }

    #[test]
    fn test_default_options() {
        let options = EncodeOptions::default();
        assert!(options.pretty);
        assert!(options.creator().starts_with("track-log"));
        assert!(!EncodeOptions::compact().pretty);
    }
}
