//! The structural event vocabulary shared by parsing and serialization.
//!
//! A [`StreamEvent`] describes one structural step through an XML document.
//! The same vocabulary is used in both directions: an [`XmlSource`] produces
//! events that the builder materializes into tree nodes, and the
//! serialization dispatcher replays events into an [`XmlSink`]. Because the
//! two sides speak the same language, pass-through serialization can forward
//! raw source events straight into a sink without ever materializing nodes.
//!
//! Attributes and namespace declarations are delivered as separate events
//! between [`StreamEvent::StartElement`] and
//! [`StreamEvent::AttributesCompleted`]; while those events arrive, the
//! element under construction is in the `AttributesPending` build state.

use std::any::Any;

use crate::error::{ParseError, StreamError};

/// One structural event in an XML stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The start of a document. Always the first event of a well-formed
    /// stream; the declaration fields are `None` when the input carried no
    /// XML declaration.
    StartDocument {
        /// XML version from the declaration (e.g. `"1.0"`).
        version: Option<String>,
        /// Encoding named in the declaration (e.g. `"UTF-8"`).
        encoding: Option<String>,
        /// Standalone flag from the declaration.
        standalone: Option<bool>,
        /// The encoding the raw input was actually decoded from, if known.
        input_encoding: Option<String>,
    },

    /// A document type declaration, e.g. `<!DOCTYPE greeting SYSTEM "hello.dtd">`.
    DocumentTypeDeclaration {
        /// The declared root element name.
        root_name: String,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
        /// The SYSTEM identifier, if any.
        system_id: Option<String>,
        /// The internal subset text between `[` and `]`, if any.
        internal_subset: Option<String>,
    },

    /// An element start tag. Attribute and namespace-declaration events
    /// follow, terminated by [`StreamEvent::AttributesCompleted`].
    StartElement {
        /// The namespace URI the element resolved to, if any.
        namespace_uri: Option<String>,
        /// The local part of the element name.
        local_name: String,
        /// The namespace prefix, if any.
        prefix: Option<String>,
    },

    /// An attribute of the most recently started element.
    Attribute {
        /// The namespace URI the attribute resolved to, if any.
        namespace_uri: Option<String>,
        /// The local part of the attribute name.
        local_name: String,
        /// The namespace prefix, if any.
        prefix: Option<String>,
        /// The attribute value, fully decoded.
        value: String,
    },

    /// A namespace declaration (`xmlns="..."` or `xmlns:p="..."`) on the
    /// most recently started element.
    NamespaceDeclaration {
        /// The declared prefix, or `None` for the default namespace.
        prefix: Option<String>,
        /// The declared namespace URI.
        namespace_uri: String,
    },

    /// All attributes and namespace declarations of the current element
    /// have been delivered.
    AttributesCompleted,

    /// Character data.
    CharacterData {
        /// The decoded text.
        data: String,
        /// Whether this is ignorable whitespace in element content.
        ignorable: bool,
    },

    /// A CDATA section. The content travels in the event.
    CDataSection {
        /// The raw content between `<![CDATA[` and `]]>`.
        data: String,
    },

    /// A comment. The content travels in the event.
    Comment {
        /// The text between `<!--` and `-->`.
        data: String,
    },

    /// A processing instruction.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A reference to an entity that the source did not expand.
    EntityReference {
        /// The entity name, without `&` and `;`.
        name: String,
        /// The replacement text, if the source knows it.
        replacement_text: Option<String>,
    },

    /// An element end tag. Also emitted for self-closing tags.
    EndElement,

    /// The end of the document. Always the last event of a stream.
    EndDocument,
}

/// A pull-style producer of structural events.
///
/// This is the contract the object model expects from the underlying
/// streaming parser. The model only ever advances a source through
/// [`next_event`](XmlSource::next_event) and never retries after a failure:
/// a source that has reported an error is considered spent.
pub trait XmlSource {
    /// Advances the stream by one event.
    ///
    /// Returns `Ok(Some(event))` for the next structural event, or
    /// `Ok(None)` once the stream is exhausted (after
    /// [`StreamEvent::EndDocument`] has been delivered).
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the input is malformed.
    fn next_event(&mut self) -> Result<Option<StreamEvent>, ParseError>;

    /// Passes through an implementation-specific reader property.
    ///
    /// The model treats the value opaquely; the property namespace is
    /// defined by the source implementation. The default implementation
    /// knows no properties.
    fn reader_property(&self, _name: &str) -> Option<&dyn Any> {
        None
    }
}

/// A consumer of structural events.
///
/// Sinks receive events both from cached-tree replay and from pass-through
/// segments, in document order. A sink failure aborts the walk and is
/// propagated to the caller as [`crate::error::ModelError::Stream`].
pub trait XmlSink {
    /// Consumes one structural event.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] if the sink cannot accept the event.
    fn event(&mut self, event: StreamEvent) -> Result<(), StreamError>;
}

/// A sink that drops every event. Used when draining discarded content.
#[derive(Debug, Default)]
pub struct NullSink;

impl XmlSink for NullSink {
    fn event(&mut self, _event: StreamEvent) -> Result<(), StreamError> {
        Ok(())
    }
}

/// A sink that records every event it receives. Primarily useful in tests
/// and for replaying a serialization into another consumer.
#[derive(Debug, Default)]
pub struct EventCollector {
    /// The recorded events, in arrival order.
    pub events: Vec<StreamEvent>,
}

impl EventCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl XmlSink for EventCollector {
    fn event(&mut self, event: StreamEvent) -> Result<(), StreamError> {
        self.events.push(event);
        Ok(())
    }
}

/// A source that replays a pre-recorded sequence of events.
///
/// This is the simplest possible [`XmlSource`]; tests use it to feed the
/// builder exact event sequences without going through the parser.
#[derive(Debug)]
pub struct EventReplay {
    events: std::vec::IntoIter<StreamEvent>,
}

impl EventReplay {
    /// Creates a source that yields the given events in order.
    #[must_use]
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events: events.into_iter(),
        }
    }
}

impl XmlSource for EventReplay {
    fn next_event(&mut self) -> Result<Option<StreamEvent>, ParseError> {
        Ok(self.events.next())
    }
}
