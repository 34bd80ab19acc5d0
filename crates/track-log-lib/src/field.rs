//! Field descriptors
//!
//! A [`Field`] describes how one property of a record maps to one piece of wire syntax.
//! Properties are reached through [`Slot`]s, pairs of plain accessor functions created
//! with the `slot!` macro, so the interpreter never looks anything up by name.

use roxmltree::Node;

use crate::codec::{self, DecodeContext, EncodeContext};
use crate::convert::{ConvertError, WireValue};
use crate::extensions::{self, ExtensionElement};
use crate::schema::Record;
use crate::writer::XmlWriter;
use crate::{CodecError, InvalidReason, Result};

/// Domain written for email addresses that have no `@`
pub const UNKNOWN_EMAIL_DOMAIN: &str = "unknown";

/// Typed access to one field of a record
pub struct Slot<R, T> {
    name: &'static str,
    get: fn(&R) -> &T,
    get_mut: fn(&mut R) -> &mut T,
}

impl<R, T> Slot<R, T> {
    pub fn new(name: &'static str, get: fn(&R) -> &T, get_mut: fn(&mut R) -> &mut T) -> Self {
        Self { name, get, get_mut }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Storage that holds a single converted value
pub trait ScalarSlot {
    /// Wire text, `None` when there is nothing to write
    fn wire(&self) -> Option<String>;

    /// Store converted text; `Ok(false)` if the text held no value
    fn assign(&mut self, text: &str) -> std::result::Result<bool, ConvertError>;

    fn is_present(&self) -> bool;
}

impl<T: WireValue> ScalarSlot for Option<T> {
    fn wire(&self) -> Option<String> {
        self.as_ref()
            .filter(|value| value.is_present())
            .map(WireValue::to_wire)
    }

    fn assign(&mut self, text: &str) -> std::result::Result<bool, ConvertError> {
        *self = T::from_wire(text)?;
        Ok(self.is_some())
    }

    fn is_present(&self) -> bool {
        self.as_ref().is_some_and(WireValue::is_present)
    }
}

/// Required coordinates are plain numbers
impl ScalarSlot for f64 {
    fn wire(&self) -> Option<String> {
        Some(self.to_wire())
    }

    fn assign(&mut self, text: &str) -> std::result::Result<bool, ConvertError> {
        match f64::from_wire(text)? {
            Some(value) => {
                *self = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn is_present(&self) -> bool {
        true
    }
}

/// Type-erased scalar property
pub(crate) trait ScalarBinding<R>: Send + Sync {
    fn read(&self, record: &R) -> Option<String>;
    fn write(&self, record: &mut R, text: &str) -> std::result::Result<bool, ConvertError>;
    fn is_present(&self, record: &R) -> bool;
}

impl<R, T: ScalarSlot> ScalarBinding<R> for Slot<R, T> {
    fn read(&self, record: &R) -> Option<String> {
        (self.get)(record).wire()
    }

    fn write(&self, record: &mut R, text: &str) -> std::result::Result<bool, ConvertError> {
        (self.get_mut)(record).assign(text)
    }

    fn is_present(&self, record: &R) -> bool {
        (self.get)(record).is_present()
    }
}

/// Type-erased property holding one or many sub-records
pub(crate) trait RecordBinding<R>: Send + Sync {
    /// Decode `node` and store the result (replacing or appending)
    fn decode_into(&self, record: &mut R, node: Node<'_, '_>, ctx: &DecodeContext<'_>) -> Result<()>;

    fn encode_from(
        &self,
        record: &R,
        tag: &str,
        ctx: &EncodeContext<'_>,
        out: &mut XmlWriter,
    ) -> Result<()>;

    fn is_present(&self, record: &R) -> bool;
}

impl<R, S: Record> RecordBinding<R> for Slot<R, Option<S>> {
    fn decode_into(&self, record: &mut R, node: Node<'_, '_>, ctx: &DecodeContext<'_>) -> Result<()> {
        *(self.get_mut)(record) = Some(codec::decode_record(node, ctx)?);
        Ok(())
    }

    fn encode_from(
        &self,
        record: &R,
        tag: &str,
        ctx: &EncodeContext<'_>,
        out: &mut XmlWriter,
    ) -> Result<()> {
        match (self.get)(record) {
            Some(child) => codec::encode_record(child, tag, ctx, out),
            None => Ok(()),
        }
    }

    fn is_present(&self, record: &R) -> bool {
        (self.get)(record).is_some()
    }
}

impl<R, S: Record> RecordBinding<R> for Slot<R, Vec<S>> {
    fn decode_into(&self, record: &mut R, node: Node<'_, '_>, ctx: &DecodeContext<'_>) -> Result<()> {
        (self.get_mut)(record).push(codec::decode_record(node, ctx)?);
        Ok(())
    }

    fn encode_from(
        &self,
        record: &R,
        tag: &str,
        ctx: &EncodeContext<'_>,
        out: &mut XmlWriter,
    ) -> Result<()> {
        for child in (self.get)(record) {
            codec::encode_record(child, tag, ctx, out)?;
        }
        Ok(())
    }

    fn is_present(&self, record: &R) -> bool {
        !(self.get)(record).is_empty()
    }
}

/// One field descriptor of a schema table
pub struct Field<R> {
    pub(crate) name: &'static str,
    pub(crate) kind: FieldKind<R>,
}

pub(crate) enum FieldKind<R> {
    /// XML attribute on the current element
    Attribute {
        attribute: &'static str,
        value: Box<dyn ScalarBinding<R>>,
        mandatory: bool,
    },
    /// Text of a simple child element
    Element {
        tag: &'static str,
        value: Box<dyn ScalarBinding<R>>,
        mandatory: bool,
        free_text: bool,
    },
    /// Element whose text must be one of a fixed set
    Enumerated {
        tag: &'static str,
        value: Box<dyn ScalarBinding<R>>,
        allowed: &'static [&'static str],
        mandatory: bool,
    },
    /// One sub-record
    Nested {
        tag: &'static str,
        record: Box<dyn RecordBinding<R>>,
        mandatory: bool,
    },
    /// Sub-records from every sibling with the tag
    Repeated {
        tag: &'static str,
        records: Box<dyn RecordBinding<R>>,
    },
    /// `local@domain` stored as `<tag id="local" domain="domain"/>`
    Email {
        tag: &'static str,
        value: Slot<R, Option<String>>,
    },
    /// Opaque children of an `<extensions>` element
    Extensions {
        tag: &'static str,
        fragments: Slot<R, Vec<ExtensionElement>>,
    },
}

impl<R> std::fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, target) = match &self.kind {
            FieldKind::Attribute { attribute, .. } => ("attribute", *attribute),
            FieldKind::Element { tag, .. } => ("element", *tag),
            FieldKind::Enumerated { tag, .. } => ("enumerated", *tag),
            FieldKind::Nested { tag, .. } => ("nested", *tag),
            FieldKind::Repeated { tag, .. } => ("repeated", *tag),
            FieldKind::Email { tag, .. } => ("email", *tag),
            FieldKind::Extensions { tag, .. } => ("extensions", *tag),
        };
        write!(f, "{kind} {} -> {target}", self.name)
    }
}

impl<R: Record> Field<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn is_attribute(&self) -> bool {
        matches!(self.kind, FieldKind::Attribute { .. })
    }

    /// Whether the record holds a value for this field
    pub(crate) fn is_present(&self, record: &R) -> bool {
        match &self.kind {
            FieldKind::Attribute { value, .. }
            | FieldKind::Element { value, .. }
            | FieldKind::Enumerated { value, .. } => value.is_present(record),
            FieldKind::Nested { record: binding, .. } => binding.is_present(record),
            FieldKind::Repeated { records, .. } => records.is_present(record),
            FieldKind::Email { value, .. } => (value.get)(record).as_ref().is_some_and(|v| !v.is_empty()),
            FieldKind::Extensions { fragments, .. } => !(fragments.get)(record).is_empty(),
        }
    }

    /// Decode this field from `scope` into `record`
    ///
    /// `scope` is `None` when an enclosing wrapper element is missing, in which case the
    /// field is absent.
    pub(crate) fn decode(
        &self,
        record: &mut R,
        scope: Option<Node<'_, '_>>,
        ctx: &DecodeContext<'_>,
    ) -> Result<()> {
        let child = |tag: &str| scope.and_then(|node| codec::find_child(node, tag, ctx));

        match &self.kind {
            FieldKind::Attribute {
                attribute,
                value,
                mandatory,
            } => {
                let text = scope.and_then(|node| node.attribute(*attribute));
                self.store(record, &**value, text, *mandatory, || format!("@{attribute}"))
            }
            FieldKind::Element {
                tag,
                value,
                mandatory,
                ..
            } => {
                let text = child(tag).map(extensions::element_text);
                self.store(record, &**value, text.as_deref(), *mandatory, || format!("<{tag}>"))
            }
            FieldKind::Enumerated {
                tag,
                value,
                allowed,
                mandatory,
            } => {
                let text = child(tag).map(extensions::element_text);
                let text = text.as_deref().map(str::trim);
                if let Some(text) = text.filter(|t| !t.is_empty()) {
                    if !allowed.contains(&text) {
                        return Err(CodecError::InvalidValue {
                            field: self.name,
                            value: text.to_string(),
                            reason: InvalidReason::NotAllowed(*allowed),
                        });
                    }
                }
                self.store(record, &**value, text, *mandatory, || format!("<{tag}>"))
            }
            FieldKind::Nested {
                tag,
                record: binding,
                mandatory,
            } => match child(tag) {
                Some(node) => binding.decode_into(record, node, ctx),
                None if *mandatory => Err(self.missing(format!("<{tag}>"))),
                None => Ok(()),
            },
            FieldKind::Repeated { tag, records } => {
                if let Some(node) = scope {
                    for item in codec::find_children(node, tag, ctx) {
                        records.decode_into(record, item, ctx)?;
                    }
                }
                Ok(())
            }
            FieldKind::Email { tag, value } => {
                let Some(node) = child(tag) else {
                    return Ok(());
                };
                let part = |missing: &'static str| {
                    node.attribute(missing).ok_or(CodecError::CompoundField {
                        field: self.name,
                        tag: *tag,
                        missing,
                    })
                };
                let (id, domain) = (part("id")?, part("domain")?);
                *(value.get_mut)(record) = Some(format!("{id}@{domain}"));
                Ok(())
            }
            FieldKind::Extensions { tag, fragments } => {
                if let Some(node) = child(tag) {
                    *(fragments.get_mut)(record) = node
                        .children()
                        .filter(|c| c.is_element())
                        .map(ExtensionElement::from_node)
                        .collect();
                }
                Ok(())
            }
        }
    }

    /// Write this field of `record`; absent values produce no output
    pub(crate) fn encode(&self, record: &R, ctx: &EncodeContext<'_>, out: &mut XmlWriter) -> Result<()> {
        match &self.kind {
            FieldKind::Attribute {
                attribute, value, ..
            } => {
                if let Some(text) = value.read(record) {
                    out.attribute(attribute, &text);
                }
            }
            FieldKind::Element {
                tag,
                value,
                free_text,
                ..
            } => {
                if let Some(text) = value.read(record) {
                    out.text_element(tag, &text, *free_text);
                }
            }
            FieldKind::Enumerated { tag, value, .. } => {
                if let Some(text) = value.read(record) {
                    out.text_element(tag, &text, false);
                }
            }
            FieldKind::Nested {
                tag,
                record: binding,
                ..
            } => binding.encode_from(record, tag, ctx, out)?,
            FieldKind::Repeated { tag, records } => records.encode_from(record, tag, ctx, out)?,
            FieldKind::Email { tag, value } => {
                if let Some(email) = (value.get)(record).as_deref().filter(|e| !e.is_empty()) {
                    let (id, domain) = split_email(email);
                    out.start(tag);
                    out.attribute("id", id);
                    out.attribute("domain", domain);
                    out.end(tag);
                }
            }
            FieldKind::Extensions { tag, fragments } => {
                let fragments = (fragments.get)(record);
                if !fragments.is_empty() && ctx.version.supports_extensions() {
                    out.start_inline(tag);
                    for fragment in fragments {
                        fragment.write(ctx.namespaces, out);
                    }
                    out.end_inline(tag);
                }
            }
        }
        Ok(())
    }

    fn store(
        &self,
        record: &mut R,
        value: &dyn ScalarBinding<R>,
        text: Option<&str>,
        mandatory: bool,
        location: impl FnOnce() -> String,
    ) -> Result<()> {
        let stored = match text {
            Some(text) => value.write(record, text).map_err(|e| CodecError::InvalidValue {
                field: self.name,
                value: text.to_string(),
                reason: e.into(),
            })?,
            None => false,
        };
        if !stored && mandatory {
            return Err(self.missing(location()));
        }
        Ok(())
    }

    fn missing(&self, location: String) -> CodecError {
        CodecError::MissingField {
            field: self.name,
            location,
        }
    }
}

/// Split on the first `@`; addresses without one get [`UNKNOWN_EMAIL_DOMAIN`]
pub fn split_email(email: &str) -> (&str, &str) {
    email
        .split_once('@')
        .unwrap_or((email, UNKNOWN_EMAIL_DOMAIN))
}
