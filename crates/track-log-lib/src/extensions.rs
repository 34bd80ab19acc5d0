//! Extension pass-through
//!
//! Vendor data inside `<extensions>` (heart rate, temperature, display colors...) is not
//! interpreted. Each child element is captured as an [`ExtensionElement`] tree that keeps
//! its namespace URIs, attributes, text, tail and children, and is written back verbatim
//! with prefixes taken from the document's [`NamespaceMap`].

use std::collections::BTreeMap;

use roxmltree::Node;

use crate::writer::XmlWriter;

/// An element or attribute name qualified by its namespace URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualifiedName {
    /// Namespace URI, `None` for unqualified names
    pub namespace: Option<String>,
    /// Local part of the name
    pub local: String,
}

impl QualifiedName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.to_string(),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    /// Clark notation: `{uri}local`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(uri) => write!(f, "{{{uri}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// One opaque extension fragment
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtensionElement {
    pub name: QualifiedName,
    /// Attributes in document order
    pub attributes: Vec<(QualifiedName, String)>,
    /// Character data before the first child
    pub text: Option<String>,
    /// Character data between this element's end tag and the next sibling
    pub tail: Option<String>,
    pub children: Vec<ExtensionElement>,
}

impl ExtensionElement {
    /// Create an element with no content
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            name: QualifiedName::new(namespace, local),
            ..Default::default()
        }
    }

    /// Copy an element subtree out of a parsed document
    ///
    /// Text and tails are kept exactly, whitespace included. Comments and processing
    /// instructions are skipped, and the text around them is joined.
    pub fn from_node(node: Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        Self {
            name: QualifiedName::new(tag.namespace(), tag.name()),
            attributes: node
                .attributes()
                .map(|attr| {
                    (
                        QualifiedName::new(attr.namespace(), attr.name()),
                        attr.value().to_string(),
                    )
                })
                .collect(),
            text: text_run(node.children()),
            tail: text_run(node.next_siblings().skip(1)),
            children: node
                .children()
                .filter(|child| child.is_element())
                .map(ExtensionElement::from_node)
                .collect(),
        }
    }

    /// Find the first direct child with the given local name
    pub fn child(&self, local: &str) -> Option<&ExtensionElement> {
        self.children.iter().find(|child| child.name.local == local)
    }

    /// Value of an attribute by local name
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.local == local)
            .map(|(_, value)| value.as_str())
    }

    /// Write this fragment with prefixes resolved through `namespaces`
    pub(crate) fn write(&self, namespaces: &NamespaceMap, out: &mut XmlWriter) {
        let tag = namespaces.resolve(&self.name);
        out.raw("<");
        out.raw(&tag);
        for (name, value) in &self.attributes {
            out.raw(" ");
            out.raw(&namespaces.resolve_attribute(name));
            out.raw("=\"");
            out.escaped(value);
            out.raw("\"");
        }
        if self.text.is_none() && self.children.is_empty() {
            out.raw("/>");
        } else {
            out.raw(">");
            if let Some(text) = &self.text {
                out.escaped(text);
            }
            for child in &self.children {
                child.write(namespaces, out);
            }
            out.raw("</");
            out.raw(&tag);
            out.raw(">");
        }
        if let Some(tail) = &self.tail {
            out.escaped(tail);
        }
    }
}

/// Character data of the leading text nodes of `nodes`, up to the first element
fn text_run<'a, 'input: 'a>(nodes: impl Iterator<Item = Node<'a, 'input>>) -> Option<String> {
    let mut run: Option<String> = None;
    for node in nodes.take_while(|n| !n.is_element()) {
        if let Some(text) = node.text().filter(|_| node.is_text()) {
            run.get_or_insert_with(String::new).push_str(text);
        }
    }
    run
}

/// All character data directly inside `node`, ignoring comments and processing instructions
pub(crate) fn element_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

/// Namespace URI <-> prefix bindings declared on a document
///
/// Prefixes iterate in sorted order, which is also the order they are declared in on the
/// root element when encoding.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamespaceMap {
    /// Namespace of unprefixed names
    pub default: Option<String>,
    prefixes: BTreeMap<String, String>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `uri`, replacing any previous binding of that prefix
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), uri.into());
    }

    /// URI bound to a prefix
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// First prefix (in sorted order) bound to a URI
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, bound)| bound.as_str() == uri)
            .map(|(prefix, _)| prefix.as_str())
    }

    /// Iterate over `(prefix, uri)` pairs in prefix order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Collect every namespace declared anywhere in a document
    ///
    /// Vendors often declare their namespace on the extension element itself rather than
    /// on the root, so all elements are scanned. The first binding seen for a prefix wins.
    /// A nested default namespace (`<color xmlns="urn:colors">`) has no prefix to reuse,
    /// so it gets a generated one (`ns1`, `ns2`...) unless some prefix already maps to it.
    pub fn collect(doc: &roxmltree::Document<'_>) -> Self {
        let root = doc.root_element();
        let mut map = Self {
            default: root.tag_name().namespace().map(str::to_string),
            prefixes: BTreeMap::new(),
        };
        let mut unprefixed = Vec::new();
        for node in doc.descendants().filter(|n| n.is_element()) {
            for ns in node.namespaces() {
                match ns.name() {
                    Some("xml") => {}
                    Some(prefix) => {
                        map.prefixes
                            .entry(prefix.to_string())
                            .or_insert_with(|| ns.uri().to_string());
                    }
                    None => {
                        if !ns.uri().is_empty() && !unprefixed.contains(&ns.uri()) {
                            unprefixed.push(ns.uri());
                        }
                    }
                }
            }
        }
        for uri in unprefixed {
            if map.default.as_deref() != Some(uri) && map.prefix_for(uri).is_none() {
                let prefix = map.unused_prefix();
                map.prefixes.insert(prefix, uri.to_string());
            }
        }
        map
    }

    fn unused_prefix(&self) -> String {
        (1..)
            .map(|n| format!("ns{n}"))
            .find(|prefix| !self.prefixes.contains_key(prefix))
            .unwrap_or_default()
    }

    /// `prefix:local` for an element name
    ///
    /// Names in the default namespace stay unprefixed. Unknown URIs fall back to the raw URI
    /// as prefix, which keeps the information but is not well-formed XML.
    pub fn resolve(&self, name: &QualifiedName) -> String {
        match &name.namespace {
            None => name.local.clone(),
            Some(uri) if self.default.as_deref() == Some(uri.as_str()) => name.local.clone(),
            Some(uri) => self.prefixed(uri, &name.local),
        }
    }

    /// `prefix:local` for an attribute name
    ///
    /// Unprefixed attributes never belong to the default namespace, so only explicit
    /// bindings are consulted.
    pub fn resolve_attribute(&self, name: &QualifiedName) -> String {
        match &name.namespace {
            None => name.local.clone(),
            Some(uri) => self.prefixed(uri, &name.local),
        }
    }

    fn prefixed(&self, uri: &str, local: &str) -> String {
        if uri == XML_NAMESPACE {
            return format!("xml:{local}");
        }
        match self.prefix_for(uri) {
            Some(prefix) => format!("{prefix}:{local}"),
            None => {
                tracing::warn!("No prefix declared for namespace {uri}, writing it verbatim");
                format!("{uri}:{local}")
            }
        }
    }
}

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
