//! XML text output.
//!
//! [`XmlWriter`] renders the structural event vocabulary into well-formed
//! XML text. Because it is an ordinary [`XmlSink`], it consumes replayed
//! and passed-through events alike; [`serialize`] and
//! [`serialize_consuming`] wire it to a [`TreeWalker`] for the common case
//! of rendering a subtree to a string.

use std::fmt::{self, Write};

use super::walker::TreeWalker;
use crate::error::{ModelError, StreamError};
use crate::stream::{StreamEvent, XmlSink};
use crate::tree::{Model, NodeId};

/// Renders a subtree to an XML string, building unrealized content into the
/// tree as needed. The tree is left intact.
///
/// # Errors
///
/// Deferred parsing failures while building, or
/// [`ModelError::NodeConsumed`] if the subtree was already consumed.
///
/// # Examples
///
/// ```
/// use oxiom::parser::PullParser;
/// use oxiom::serial::serialize;
/// use oxiom::tree::Model;
///
/// let mut model = Model::new();
/// let doc = model
///     .attach_source(Box::new(PullParser::new("<a><b>x</b><c/></a>")))
///     .unwrap();
/// assert_eq!(serialize(&mut model, doc).unwrap(), "<a><b>x</b><c/></a>");
/// ```
pub fn serialize(model: &mut Model, root: NodeId) -> Result<String, ModelError> {
    render(model, TreeWalker::preserving(root))
}

/// Renders a subtree to an XML string without materializing content that is
/// still in the underlying stream: unrealized subtrees are forwarded in
/// pass-through mode and left consumed.
///
/// # Errors
///
/// Same failure modes as [`serialize`].
pub fn serialize_consuming(model: &mut Model, root: NodeId) -> Result<String, ModelError> {
    render(model, TreeWalker::consuming(root))
}

fn render(model: &mut Model, mut walker: TreeWalker) -> Result<String, ModelError> {
    let mut out = String::new();
    let mut writer = XmlWriter::new(&mut out);
    walker.run(model, &mut writer)?;
    Ok(out)
}

/// An [`XmlSink`] producing XML text on any [`fmt::Write`] target.
///
/// The writer keeps a start tag open until the first event that proves the
/// element has content, so childless elements come out in the
/// empty-element form (`<a/>`).
#[derive(Debug)]
pub struct XmlWriter<W: Write> {
    out: W,
    /// Qualified names of the currently open elements; end events carry no
    /// name of their own.
    open_elements: Vec<String>,
    /// A start tag has been begun but not yet closed with `>` or `/>`.
    tag_open: bool,
}

impl<W: Write> XmlWriter<W> {
    /// Creates a writer rendering to `out`.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            open_elements: Vec::new(),
            tag_open: false,
        }
    }

    /// Consumes the writer, returning the underlying output target.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn close_open_tag(&mut self) -> fmt::Result {
        if self.tag_open {
            self.out.write_char('>')?;
            self.tag_open = false;
        }
        Ok(())
    }

    fn write_event(&mut self, event: StreamEvent) -> fmt::Result {
        match event {
            StreamEvent::StartDocument {
                version,
                encoding,
                standalone,
                ..
            } => {
                // Only inputs that carried a declaration get one back.
                if version.is_some() || encoding.is_some() || standalone.is_some() {
                    self.out.write_str("<?xml version=\"")?;
                    self.out.write_str(version.as_deref().unwrap_or("1.0"))?;
                    self.out.write_char('"')?;
                    if let Some(encoding) = &encoding {
                        write!(self.out, " encoding=\"{encoding}\"")?;
                    }
                    if let Some(standalone) = standalone {
                        write!(
                            self.out,
                            " standalone=\"{}\"",
                            if standalone { "yes" } else { "no" }
                        )?;
                    }
                    self.out.write_str("?>")?;
                }
            }
            StreamEvent::DocumentTypeDeclaration {
                root_name,
                public_id,
                system_id,
                internal_subset,
            } => {
                self.close_open_tag()?;
                write!(self.out, "<!DOCTYPE {root_name}")?;
                match (&public_id, &system_id) {
                    (Some(public_id), Some(system_id)) => {
                        write!(self.out, " PUBLIC \"{public_id}\" \"{system_id}\"")?;
                    }
                    (None, Some(system_id)) => {
                        write!(self.out, " SYSTEM \"{system_id}\"")?;
                    }
                    _ => {}
                }
                if let Some(subset) = &internal_subset {
                    write!(self.out, " [{subset}]")?;
                }
                self.out.write_char('>')?;
            }
            StreamEvent::StartElement {
                local_name, prefix, ..
            } => {
                self.close_open_tag()?;
                let qname = qualified(prefix.as_deref(), &local_name);
                write!(self.out, "<{qname}")?;
                self.open_elements.push(qname);
                self.tag_open = true;
            }
            StreamEvent::Attribute {
                local_name,
                prefix,
                value,
                ..
            } => {
                write!(self.out, " {}=\"", qualified(prefix.as_deref(), &local_name))?;
                write_escaped_attr(&mut self.out, &value)?;
                self.out.write_char('"')?;
            }
            StreamEvent::NamespaceDeclaration {
                prefix,
                namespace_uri,
            } => {
                match prefix {
                    Some(prefix) => write!(self.out, " xmlns:{prefix}=\"")?,
                    None => self.out.write_str(" xmlns=\"")?,
                }
                write_escaped_attr(&mut self.out, &namespace_uri)?;
                self.out.write_char('"')?;
            }
            StreamEvent::AttributesCompleted => {}
            StreamEvent::CharacterData { data, .. } => {
                self.close_open_tag()?;
                write_escaped_text(&mut self.out, &data)?;
            }
            StreamEvent::CDataSection { data } => {
                self.close_open_tag()?;
                write!(self.out, "<![CDATA[{data}]]>")?;
            }
            StreamEvent::Comment { data } => {
                self.close_open_tag()?;
                write!(self.out, "<!--{data}-->")?;
            }
            StreamEvent::ProcessingInstruction { target, data } => {
                self.close_open_tag()?;
                match data {
                    Some(data) => write!(self.out, "<?{target} {data}?>")?,
                    None => write!(self.out, "<?{target}?>")?,
                }
            }
            StreamEvent::EntityReference { name, .. } => {
                self.close_open_tag()?;
                write!(self.out, "&{name};")?;
            }
            StreamEvent::EndElement => {
                let name = self.open_elements.pop().unwrap_or_default();
                if self.tag_open {
                    self.out.write_str("/>")?;
                    self.tag_open = false;
                } else {
                    write!(self.out, "</{name}>")?;
                }
            }
            StreamEvent::EndDocument => {}
        }
        Ok(())
    }
}

impl<W: Write> XmlSink for XmlWriter<W> {
    fn event(&mut self, event: StreamEvent) -> Result<(), StreamError> {
        self.write_event(event)
            .map_err(|err| StreamError::Other(format!("formatter failure: {err}")))
    }
}

fn qualified(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local_name}"),
        None => local_name.to_string(),
    }
}

/// Escapes character data. `\r` is encoded as a character reference so it
/// survives attribute-value and end-of-line normalization on re-parse.
fn write_escaped_text<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    for ch in text.chars() {
        match ch {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '\r' => out.write_str("&#13;")?,
            _ => out.write_char(ch)?,
        }
    }
    Ok(())
}

/// Escapes an attribute value for a double-quoted literal.
fn write_escaped_attr<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    for ch in text.chars() {
        match ch {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '"' => out.write_str("&quot;")?,
            '\t' => out.write_str("&#9;")?,
            '\n' => out.write_str("&#10;")?,
            '\r' => out.write_str("&#13;")?,
            _ => out.write_char(ch)?,
        }
    }
    Ok(())
}
