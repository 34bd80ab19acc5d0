//! Schema tables
//!
//! A schema is an ordered list of field descriptors interleaved with structural
//! directives, one table per record type and wire version. Directives are written as short
//! strings and parsed once when the table is built:
//!
//! | Directive         | Meaning                                                          |
//! |-------------------|------------------------------------------------------------------|
//! | `"tag"`           | open a wrapper element                                           |
//! | `"/tag"`          | close the innermost wrapper, which must be `tag`                 |
//! | `"tag:a:b"`       | open a wrapper that is only written when field `a` or `b` is set |
//! | `"tag:"`          | conditional wrapper depending on every field inside it           |
//!
//! Tables are validated when built, so a malformed table surfaces as a [`SchemaError`] the
//! first time its record type is used rather than as broken output.

use once_cell::sync::Lazy;

use crate::codec::WireVersion;
use crate::extensions::ExtensionElement;
use crate::field::{Field, FieldKind, ScalarBinding, ScalarSlot, Slot};
use crate::Result;

/// A type with a schema table for each wire version
pub trait Record: Default + Sized + 'static {
    fn schema(version: WireVersion) -> Result<&'static Schema<Self>>;
}

/// Errors in a schema table definition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("field {field} is bound to both attribute {attribute:?} and tag {tag:?}")]
    AmbiguousBinding {
        field: &'static str,
        attribute: &'static str,
        tag: &'static str,
    },

    #[error("field {field} restricts values but is bound to attribute {attribute:?}")]
    EnumeratedAttribute {
        field: &'static str,
        attribute: &'static str,
    },

    #[error("directive {directive:?} depends on unknown field {dependency:?}")]
    UnknownDependency {
        directive: &'static str,
        dependency: &'static str,
    },

    #[error("close directive \"/{tag}\" has no matching open")]
    UnbalancedClose { tag: &'static str },

    #[error("close directive \"/{found}\" does not match open {expected:?}")]
    MismatchedClose {
        expected: &'static str,
        found: &'static str,
    },

    #[error("directive {tag:?} is never closed")]
    UnclosedDirective { tag: &'static str },

    #[error("empty directive {0:?}")]
    EmptyDirective(&'static str),

    #[error("attribute field {field} follows child content of its element")]
    AttributeAfterContent { field: &'static str },
}

/// One parsed table entry
pub(crate) enum Entry<R> {
    Open {
        tag: &'static str,
    },
    Conditional {
        tag: &'static str,
        /// Indices of the field entries that make the wrapper worth writing
        depends_on: Vec<usize>,
        /// Index of the matching close entry
        close: usize,
    },
    Close {
        tag: &'static str,
    },
    Field(Field<R>),
}

impl<R> std::fmt::Debug for Entry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Open { tag } => write!(f, "open {tag}"),
            Entry::Conditional {
                tag, depends_on, ..
            } => write!(f, "open {tag} if any of {depends_on:?}"),
            Entry::Close { tag } => write!(f, "close {tag}"),
            Entry::Field(field) => field.fmt(f),
        }
    }
}

/// A validated schema table
pub struct Schema<R> {
    pub(crate) entries: Vec<Entry<R>>,
}

impl<R> std::fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}

impl<R: Record> Schema<R> {
    pub fn builder() -> SchemaBuilder<R> {
        SchemaBuilder { items: Vec::new() }
    }

    /// Names of all fields in table order
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Field(field) => Some(field.name()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scalar field configuration before validation
pub struct FieldSpec<R> {
    name: &'static str,
    value: Box<dyn ScalarBinding<R>>,
    attribute: Option<&'static str>,
    tag: Option<&'static str>,
    mandatory: bool,
    allowed: Option<&'static [&'static str]>,
    free_text: bool,
}

impl<R: 'static> FieldSpec<R> {
    /// A field stored in a child element named after the property
    pub fn new<T: ScalarSlot + 'static>(slot: Slot<R, T>) -> Self {
        Self {
            name: slot.name(),
            value: Box::new(slot),
            attribute: None,
            tag: None,
            mandatory: false,
            allowed: None,
            free_text: false,
        }
    }

    pub fn attribute(mut self, name: &'static str) -> Self {
        self.attribute = Some(name);
        self
    }

    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Decoding fails when the value is missing
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Restrict the value to a fixed set
    pub fn possible(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Text that may contain markup and is written as CDATA when it does
    pub fn free_text(mut self) -> Self {
        self.free_text = true;
        self
    }

    fn into_field(self) -> std::result::Result<Field<R>, SchemaError> {
        let name = self.name;
        let kind = match (self.attribute, self.tag, self.allowed) {
            (Some(attribute), Some(tag), _) => {
                return Err(SchemaError::AmbiguousBinding {
                    field: name,
                    attribute,
                    tag,
                });
            }
            (Some(attribute), None, Some(_)) => {
                return Err(SchemaError::EnumeratedAttribute {
                    field: name,
                    attribute,
                });
            }
            (Some(attribute), None, None) => FieldKind::Attribute {
                attribute,
                value: self.value,
                mandatory: self.mandatory,
            },
            (None, tag, Some(allowed)) => FieldKind::Enumerated {
                tag: tag.unwrap_or(name),
                value: self.value,
                allowed,
                mandatory: self.mandatory,
            },
            (None, tag, None) => FieldKind::Element {
                tag: tag.unwrap_or(name),
                value: self.value,
                mandatory: self.mandatory,
                free_text: self.free_text,
            },
        };
        Ok(Field { name, kind })
    }
}

enum Item<R> {
    Directive(&'static str),
    Spec(FieldSpec<R>),
    Field(Field<R>),
}

/// Builds a [`Schema`] from directives and fields in wire order
pub struct SchemaBuilder<R> {
    items: Vec<Item<R>>,
}

impl<R: Record> SchemaBuilder<R> {
    pub fn field(mut self, spec: FieldSpec<R>) -> Self {
        self.items.push(Item::Spec(spec));
        self
    }

    pub fn directive(mut self, directive: &'static str) -> Self {
        self.items.push(Item::Directive(directive));
        self
    }

    /// Optional value in a child element
    pub fn element<T: ScalarSlot + 'static>(self, slot: Slot<R, T>, tag: &'static str) -> Self {
        self.field(FieldSpec::new(slot).tag(tag))
    }

    /// Optional value in an attribute of the current element
    pub fn attribute<T: ScalarSlot + 'static>(self, slot: Slot<R, T>, name: &'static str) -> Self {
        self.field(FieldSpec::new(slot).attribute(name))
    }

    /// Optional sub-record
    pub fn nested<S: Record>(self, slot: Slot<R, Option<S>>, tag: &'static str) -> Self {
        self.nested_record(slot, tag, false)
    }

    /// Sub-record whose element must be present when decoding
    pub fn nested_mandatory<S: Record>(self, slot: Slot<R, Option<S>>, tag: &'static str) -> Self {
        self.nested_record(slot, tag, true)
    }

    fn nested_record<S: Record>(
        mut self,
        slot: Slot<R, Option<S>>,
        tag: &'static str,
        mandatory: bool,
    ) -> Self {
        let name = slot.name();
        self.items.push(Item::Field(Field {
            name,
            kind: FieldKind::Nested {
                tag,
                record: Box::new(slot),
                mandatory,
            },
        }));
        self
    }

    /// Sub-records from all child elements named `tag`, in document order
    pub fn repeated<S: Record>(mut self, slot: Slot<R, Vec<S>>, tag: &'static str) -> Self {
        let name = slot.name();
        self.items.push(Item::Field(Field {
            name,
            kind: FieldKind::Repeated {
                tag,
                records: Box::new(slot),
            },
        }));
        self
    }

    pub fn email(mut self, slot: Slot<R, Option<String>>, tag: &'static str) -> Self {
        let name = slot.name();
        self.items.push(Item::Field(Field {
            name,
            kind: FieldKind::Email { tag, value: slot },
        }));
        self
    }

    pub fn extensions(mut self, slot: Slot<R, Vec<ExtensionElement>>, tag: &'static str) -> Self {
        let name = slot.name();
        self.items.push(Item::Field(Field {
            name,
            kind: FieldKind::Extensions {
                tag,
                fragments: slot,
            },
        }));
        self
    }

    /// Parse directives, resolve dependencies and check nesting
    pub fn build(self) -> std::result::Result<Schema<R>, SchemaError> {
        let mut entries = Vec::with_capacity(self.items.len());
        // Dependency names per conditional, resolved once all fields are known
        let mut pending: Vec<(usize, Vec<&'static str>)> = Vec::new();

        for item in self.items {
            let entry = match item {
                Item::Spec(spec) => Entry::Field(spec.into_field()?),
                Item::Field(field) => Entry::Field(field),
                Item::Directive(directive) => {
                    let (entry, dependencies) = parse_directive(directive)?;
                    if let Some(dependencies) = dependencies {
                        pending.push((entries.len(), dependencies));
                    }
                    entry
                }
            };
            entries.push(entry);
        }

        link_scopes(&mut entries)?;

        for (index, names) in pending {
            let (tag, close) = match &entries[index] {
                Entry::Conditional { tag, close, .. } => (*tag, *close),
                _ => continue,
            };
            let resolved = if names.is_empty() {
                (index + 1..close)
                    .filter(|&i| matches!(entries[i], Entry::Field(_)))
                    .collect()
            } else {
                names
                    .iter()
                    .map(|&name| {
                        field_index(&entries, name).ok_or(SchemaError::UnknownDependency {
                            directive: tag,
                            dependency: name,
                        })
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };
            if let Entry::Conditional { depends_on, .. } = &mut entries[index] {
                *depends_on = resolved;
            }
        }

        Ok(Schema { entries })
    }
}

/// Parse one directive string, returning the dependency names of conditionals
fn parse_directive<R>(
    directive: &'static str,
) -> std::result::Result<(Entry<R>, Option<Vec<&'static str>>), SchemaError> {
    if let Some(tag) = directive.strip_prefix('/') {
        if tag.is_empty() {
            return Err(SchemaError::EmptyDirective(directive));
        }
        return Ok((Entry::Close { tag }, None));
    }

    let mut parts = directive.split(':');
    let tag = parts.next().unwrap_or_default();
    if tag.is_empty() {
        return Err(SchemaError::EmptyDirective(directive));
    }
    if !directive.contains(':') {
        return Ok((Entry::Open { tag }, None));
    }
    let dependencies = parts.filter(|name| !name.is_empty()).collect();
    Ok((
        Entry::Conditional {
            tag,
            depends_on: Vec::new(),
            close: 0,
        },
        Some(dependencies),
    ))
}

/// Match open and close directives, record closing positions and check attribute placement
fn link_scopes<R: Record>(entries: &mut [Entry<R>]) -> std::result::Result<(), SchemaError> {
    struct Scope {
        open: Option<usize>,
        tag: &'static str,
        has_content: bool,
    }

    let mut scopes = vec![Scope {
        open: None,
        tag: "",
        has_content: false,
    }];

    for index in 0..entries.len() {
        match &entries[index] {
            Entry::Open { tag } | Entry::Conditional { tag, .. } => {
                let tag = *tag;
                if let Some(scope) = scopes.last_mut() {
                    scope.has_content = true;
                }
                scopes.push(Scope {
                    open: Some(index),
                    tag,
                    has_content: false,
                });
            }
            Entry::Close { tag } => {
                let tag = *tag;
                let scope = match scopes.pop() {
                    Some(scope) if scope.open.is_some() => scope,
                    _ => return Err(SchemaError::UnbalancedClose { tag }),
                };
                if scope.tag != tag {
                    return Err(SchemaError::MismatchedClose {
                        expected: scope.tag,
                        found: tag,
                    });
                }
                if let Some(Entry::Conditional { close, .. }) =
                    scope.open.and_then(|open| entries.get_mut(open))
                {
                    *close = index;
                }
            }
            Entry::Field(field) => {
                let Some(scope) = scopes.last_mut() else {
                    continue;
                };
                if field.is_attribute() {
                    if scope.has_content {
                        return Err(SchemaError::AttributeAfterContent { field: field.name() });
                    }
                } else {
                    scope.has_content = true;
                }
            }
        }
    }

    match scopes.pop() {
        Some(scope) if scope.open.is_some() => Err(SchemaError::UnclosedDirective { tag: scope.tag }),
        _ => Ok(()),
    }
}

fn field_index<R: Record>(entries: &[Entry<R>], name: &str) -> Option<usize> {
    entries
        .iter()
        .position(|entry| matches!(entry, Entry::Field(field) if field.name() == name))
}

type TableBuilder<R> = fn() -> std::result::Result<Schema<R>, SchemaError>;

/// Lazily built tables of a record type, one per wire version
///
/// Meant to live in a `static`; each table is built and validated on first use.
pub struct SchemaTables<R: 'static> {
    v1_0: Lazy<std::result::Result<Schema<R>, SchemaError>, TableBuilder<R>>,
    v1_1: Lazy<std::result::Result<Schema<R>, SchemaError>, TableBuilder<R>>,
}

impl<R: Record> SchemaTables<R> {
    pub const fn new(v1_0: TableBuilder<R>, v1_1: TableBuilder<R>) -> Self {
        Self {
            v1_0: Lazy::new(v1_0),
            v1_1: Lazy::new(v1_1),
        }
    }

    pub fn get(&'static self, version: WireVersion) -> Result<&'static Schema<R>> {
        let table = match version {
            WireVersion::V1_0 => &self.v1_0,
            WireVersion::V1_1 => &self.v1_1,
        };
        Lazy::force(table).as_ref().map_err(|err| err.clone().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, EncodeOptions};
    use crate::CodecError;
    use crate::extensions::NamespaceMap;
    use crate::model::Bounds;

    #[derive(Debug, Default, PartialEq)]
    struct Place {
        id: Option<u32>,
        name: Option<String>,
        note: Option<String>,
        kind: Option<String>,
    }

    fn place_table() -> std::result::Result<Schema<Place>, SchemaError> {
        Schema::builder()
            .attribute(slot!(Place, id), "id")
            .directive("info:name:note")
            .element(slot!(Place, name), "name")
            .field(FieldSpec::new(slot!(Place, note)).free_text())
            .directive("/info")
            .field(FieldSpec::new(slot!(Place, kind)).tag("type").possible(&["a", "b"]))
            .build()
    }

    impl Record for Place {
        fn schema(version: WireVersion) -> Result<&'static Schema<Self>> {
            static TABLES: SchemaTables<Place> = SchemaTables::new(place_table, place_table);
            TABLES.get(version)
        }
    }

    #[derive(Debug, Default)]
    struct Area {
        bounds: Option<Bounds>,
    }

    fn area_table() -> std::result::Result<Schema<Area>, SchemaError> {
        Schema::builder()
            .nested_mandatory(slot!(Area, bounds), "bounds")
            .build()
    }

    impl Record for Area {
        fn schema(version: WireVersion) -> Result<&'static Schema<Self>> {
            static TABLES: SchemaTables<Area> = SchemaTables::new(area_table, area_table);
            TABLES.get(version)
        }
    }

    fn encode(place: &Place) -> String {
        let options = EncodeOptions {
            pretty: false,
            ..Default::default()
        };
        codec::encode(place, "place", WireVersion::V1_1, &NamespaceMap::new(), &options).unwrap()
    }

    #[test]
    fn test_table_layout() {
        let schema = Place::schema(WireVersion::V1_0).unwrap();
        assert_eq!(schema.len(), 6);
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            ["id", "name", "note", "kind"]
        );
        match &schema.entries[1] {
            Entry::Conditional {
                tag,
                depends_on,
                close,
            } => {
                assert_eq!(*tag, "info");
                assert_eq!(depends_on, &[2, 3]);
                assert_eq!(*close, 4);
            }
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn test_mandatory_nested_record() {
        let doc = roxmltree::Document::parse(r#"<area><bounds minlat="1"/></area>"#).unwrap();
        let area: Area = codec::decode(doc.root_element(), WireVersion::V1_1).unwrap();
        assert_eq!(area.bounds.unwrap().min_latitude, Some(1.0));

        let doc = roxmltree::Document::parse("<area/>").unwrap();
        let err = codec::decode::<Area>(doc.root_element(), WireVersion::V1_1).unwrap_err();
        assert!(matches!(err, CodecError::MissingField { field: "bounds", .. }));
    }

    #[test]
    fn test_tag_defaults_to_property_name() {
        let schema = Place::schema(WireVersion::V1_1).unwrap();
        assert_eq!(format!("{:?}", schema.entries[3]), "element note -> note");
    }

    #[test]
    fn test_conditional_wrapper_suppressed_when_empty() {
        let place = Place {
            id: Some(7),
            ..Default::default()
        };
        assert_eq!(encode(&place), r#"<place id="7"/>"#);

        let place = Place {
            note: Some("x".to_string()),
            ..Default::default()
        };
        assert_eq!(encode(&place), "<place><info><note>x</note></info></place>");
    }

    #[test]
    fn test_implicit_dependencies() {
        let schema = Schema::<Place>::builder()
            .directive("info:")
            .element(slot!(Place, name), "name")
            .element(slot!(Place, note), "note")
            .directive("/info")
            .element(slot!(Place, kind), "type")
            .build()
            .unwrap();
        match &schema.entries[0] {
            Entry::Conditional { depends_on, .. } => assert_eq!(depends_on, &[1, 2]),
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn test_ambiguous_binding() {
        let err = Schema::<Place>::builder()
            .field(FieldSpec::new(slot!(Place, name)).attribute("name").tag("name"))
            .build()
            .err();
        assert_eq!(
            err,
            Some(SchemaError::AmbiguousBinding {
                field: "name",
                attribute: "name",
                tag: "name"
            })
        );
    }

    #[test]
    fn test_enumerated_attribute_rejected() {
        let err = Schema::<Place>::builder()
            .field(FieldSpec::new(slot!(Place, kind)).attribute("kind").possible(&["a"]))
            .build()
            .err();
        assert!(matches!(err, Some(SchemaError::EnumeratedAttribute { field: "kind", .. })));
    }

    #[test]
    fn test_unknown_dependency() {
        let err = Schema::<Place>::builder()
            .directive("info:name:missing")
            .element(slot!(Place, name), "name")
            .directive("/info")
            .build()
            .err();
        assert_eq!(
            err,
            Some(SchemaError::UnknownDependency {
                directive: "info",
                dependency: "missing"
            })
        );
    }

    #[test]
    fn test_unbalanced_directives() {
        let unclosed = Schema::<Place>::builder().directive("info").build().err();
        assert_eq!(unclosed, Some(SchemaError::UnclosedDirective { tag: "info" }));

        let stray = Schema::<Place>::builder().directive("/info").build().err();
        assert_eq!(stray, Some(SchemaError::UnbalancedClose { tag: "info" }));

        let crossed = Schema::<Place>::builder()
            .directive("a")
            .directive("b")
            .directive("/a")
            .directive("/b")
            .build()
            .err();
        assert_eq!(
            crossed,
            Some(SchemaError::MismatchedClose {
                expected: "b",
                found: "a"
            })
        );
    }

    #[test]
    fn test_empty_directive() {
        let err = Schema::<Place>::builder().directive(":name").build().err();
        assert_eq!(err, Some(SchemaError::EmptyDirective(":name")));
    }

    #[test]
    fn test_attribute_after_content() {
        let err = Schema::<Place>::builder()
            .element(slot!(Place, name), "name")
            .attribute(slot!(Place, id), "id")
            .build()
            .err();
        assert_eq!(err, Some(SchemaError::AttributeAfterContent { field: "id" }));

        // Attributes at the start of a wrapper belong to the wrapper element
        let ok = Schema::<Place>::builder()
            .element(slot!(Place, name), "name")
            .directive("info")
            .attribute(slot!(Place, id), "id")
            .directive("/info")
            .build();
        assert!(ok.is_ok());
    }
}
