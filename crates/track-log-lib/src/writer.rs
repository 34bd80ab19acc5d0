//! Minimal XML text writer used by the encoder
//!
//! The start tag of the most recently opened element stays open until the first piece of
//! content arrives, so attributes can still be appended to it. Elements that never receive
//! content are closed as `<tag/>`.

use quick_xml::escape::escape;

pub(crate) struct XmlWriter {
    buf: String,
    pretty: bool,
    depth: usize,
    /// A start tag has been written without its closing `>`
    tag_open: bool,
}

impl XmlWriter {
    pub(crate) fn new(pretty: bool) -> Self {
        Self {
            buf: String::new(),
            pretty,
            depth: 0,
            tag_open: false,
        }
    }

    /// Open an element; its start tag stays open for attributes
    pub(crate) fn start(&mut self, tag: &str) {
        self.seal();
        self.indent();
        self.buf.push('<');
        self.buf.push_str(tag);
        self.tag_open = true;
        self.depth += 1;
    }

    /// Add an attribute to the open start tag
    pub(crate) fn attribute(&mut self, name: &str, value: &str) {
        debug_assert!(self.tag_open, "attribute {name} written after content");
        self.buf.push(' ');
        self.buf.push_str(name);
        self.buf.push_str("=\"");
        self.buf.push_str(&escape(value));
        self.buf.push('"');
    }

    pub(crate) fn end(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        if self.tag_open {
            self.buf.push_str("/>");
            self.tag_open = false;
        } else {
            self.indent();
            self.buf.push_str("</");
            self.buf.push_str(tag);
            self.buf.push('>');
        }
    }

    /// Write `<tag>text</tag>` as a child of the current element
    ///
    /// Free text containing markup characters goes into a CDATA section instead of being
    /// entity-escaped.
    pub(crate) fn text_element(&mut self, tag: &str, text: &str, free_text: bool) {
        self.seal();
        self.indent();
        self.buf.push('<');
        self.buf.push_str(tag);
        self.buf.push('>');
        if free_text && text.contains(['<', '>', '&']) {
            self.cdata(text);
        } else {
            self.buf.push_str(&escape(text));
        }
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push('>');
    }

    /// Open a child element whose content will be written verbatim with [`Self::raw`]
    pub(crate) fn start_inline(&mut self, tag: &str) {
        self.start(tag);
        self.seal();
    }

    /// Close an element opened with [`Self::start_inline`] without indentation
    pub(crate) fn end_inline(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push('>');
    }

    pub(crate) fn raw(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub(crate) fn escaped(&mut self, text: &str) {
        self.buf.push_str(&escape(text));
    }

    pub(crate) fn finish(self) -> String {
        self.buf
    }

    fn cdata(&mut self, text: &str) {
        // `]]>` cannot appear inside a section, split it across two
        self.buf.push_str("<![CDATA[");
        self.buf.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
        self.buf.push_str("]]>");
    }

    fn seal(&mut self) {
        if self.tag_open {
            self.buf.push('>');
            self.tag_open = false;
        }
    }

    fn indent(&mut self) {
        if self.pretty && !self.buf.is_empty() {
            self.buf.push('\n');
            for _ in 0..self.depth {
                self.buf.push_str("  ");
            }
        }
    }
}
