//! Node kind definitions and the nesting legality table.
//!
//! [`NodeKind`] is a closed enum carrying the payload for every node kind in
//! the model; there is no open-ended subclassing — kind-specific behavior is
//! expressed as exhaustive matches over this enum. [`NodeType`] is the
//! payload-free discriminant used by filters, error messages, and the
//! nesting table.

use super::NodeId;

/// The payload-free discriminant of a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// A document node, the root of an ownership tree.
    Document,
    /// An element node (namespace-aware or unaware, see [`NodeName`]).
    Element,
    /// An attribute node (namespace-aware or unaware, see [`NodeName`]).
    Attribute,
    /// A namespace declaration attached to an element.
    NamespaceDeclaration,
    /// Character data.
    Text,
    /// A CDATA section.
    CData,
    /// A comment.
    Comment,
    /// A processing instruction.
    ProcessingInstruction,
    /// An unexpanded entity reference.
    EntityReference,
    /// A document type declaration.
    DocumentType,
    /// A document fragment, a parentless container for moving subtrees.
    DocumentFragment,
}

impl NodeType {
    /// Returns `true` if nodes of this kind can contain children.
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Self::Document | Self::Element | Self::DocumentFragment
        )
    }

    /// Returns `true` if the nesting table allows a `child` node inside a
    /// node of this kind.
    ///
    /// This is the static legality check; dynamic invariants (cycles, the
    /// single-document-element rule) are enforced separately at insertion
    /// time.
    #[must_use]
    pub fn is_child_allowed(self, child: NodeType) -> bool {
        match self {
            Self::Document => matches!(
                child,
                NodeType::Element
                    | NodeType::Comment
                    | NodeType::ProcessingInstruction
                    | NodeType::DocumentType
                    | NodeType::Text
            ),
            Self::Element | Self::DocumentFragment => matches!(
                child,
                NodeType::Element
                    | NodeType::Text
                    | NodeType::CData
                    | NodeType::Comment
                    | NodeType::ProcessingInstruction
                    | NodeType::EntityReference
            ),
            _ => false,
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Document => "document",
            Self::Element => "element",
            Self::Attribute => "attribute",
            Self::NamespaceDeclaration => "namespace declaration",
            Self::Text => "text",
            Self::CData => "CDATA section",
            Self::Comment => "comment",
            Self::ProcessingInstruction => "processing instruction",
            Self::EntityReference => "entity reference",
            Self::DocumentType => "document type declaration",
            Self::DocumentFragment => "document fragment",
        };
        f.write_str(name)
    }
}

/// The name of an element or attribute.
///
/// The namespace-aware and namespace-unaware node variants differ only in
/// their name representation, so both share one enum: a `Qualified` name
/// resolves against namespace scopes, an `Unqualified` name is matched as a
/// plain string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeName {
    /// A namespace-qualified name.
    Qualified {
        /// The namespace URI the name resolved to, if any.
        namespace_uri: Option<String>,
        /// The local part of the name.
        local_name: String,
        /// The namespace prefix, if any.
        prefix: Option<String>,
    },
    /// A plain, namespace-unaware name.
    Unqualified(String),
}

impl NodeName {
    /// Creates a qualified name.
    #[must_use]
    pub fn qualified(
        namespace_uri: Option<&str>,
        local_name: &str,
        prefix: Option<&str>,
    ) -> Self {
        Self::Qualified {
            namespace_uri: namespace_uri.map(str::to_string),
            local_name: local_name.to_string(),
            prefix: prefix.map(str::to_string),
        }
    }

    /// Returns the local part of the name (the whole name if unqualified).
    #[must_use]
    pub fn local_name(&self) -> &str {
        match self {
            Self::Qualified { local_name, .. } => local_name,
            Self::Unqualified(name) => name,
        }
    }

    /// Returns the namespace prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::Qualified { prefix, .. } => prefix.as_deref(),
            Self::Unqualified(_) => None,
        }
    }

    /// Returns the namespace URI, if any.
    #[must_use]
    pub fn namespace_uri(&self) -> Option<&str> {
        match self {
            Self::Qualified { namespace_uri, .. } => namespace_uri.as_deref(),
            Self::Unqualified(_) => None,
        }
    }

    /// Returns the name as written in markup (`prefix:local` or `local`).
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix}:{}", self.local_name()),
            None => self.local_name().to_string(),
        }
    }
}

/// The kind of a node and its associated payload.
///
/// Navigation links, build state, and content are stored in `NodeData`, not
/// here.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A document node. Holds the XML declaration metadata.
    Document {
        /// XML version from the declaration (e.g. `"1.0"`).
        version: Option<String>,
        /// Encoding named in the declaration.
        encoding: Option<String>,
        /// Standalone flag from the declaration.
        standalone: Option<bool>,
        /// The encoding the raw input was actually decoded from, if known.
        input_encoding: Option<String>,
    },

    /// An element node.
    Element {
        /// The element name.
        name: NodeName,
    },

    /// An attribute node. Attributes are not children: they hang off an
    /// owner element through its attribute chain.
    Attribute {
        /// The attribute name.
        name: NodeName,
        /// The attribute value, fully decoded.
        value: String,
        /// Whether the attribute was present in the input (as opposed to
        /// defaulted from a DTD).
        specified: bool,
    },

    /// A namespace declaration, stored on the owner element's attribute
    /// chain alongside regular attributes.
    NamespaceDeclaration {
        /// The declared prefix, or `None` for the default namespace.
        prefix: Option<String>,
        /// The declared namespace URI.
        namespace_uri: String,
    },

    /// Character data.
    Text {
        /// The decoded text.
        content: String,
        /// Whether this is ignorable whitespace in element content.
        ignorable: bool,
    },

    /// A CDATA section.
    CData {
        /// The raw content.
        content: String,
    },

    /// A comment.
    Comment {
        /// The comment text.
        content: String,
    },

    /// A processing instruction.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// An unexpanded entity reference.
    EntityReference {
        /// The entity name.
        name: String,
        /// The replacement text, if known.
        replacement_text: Option<String>,
    },

    /// A document type declaration.
    DocumentType {
        /// The declared root element name.
        root_name: String,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
        /// The SYSTEM identifier, if any.
        system_id: Option<String>,
        /// The internal subset, if any.
        internal_subset: Option<String>,
    },

    /// A document fragment.
    DocumentFragment,
}

impl NodeKind {
    /// Returns the payload-free discriminant of this kind.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Document { .. } => NodeType::Document,
            Self::Element { .. } => NodeType::Element,
            Self::Attribute { .. } => NodeType::Attribute,
            Self::NamespaceDeclaration { .. } => NodeType::NamespaceDeclaration,
            Self::Text { .. } => NodeType::Text,
            Self::CData { .. } => NodeType::CData,
            Self::Comment { .. } => NodeType::Comment,
            Self::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
            Self::EntityReference { .. } => NodeType::EntityReference,
            Self::DocumentType { .. } => NodeType::DocumentType,
            Self::DocumentFragment => NodeType::DocumentFragment,
        }
    }

    /// Creates an empty document kind with no declaration metadata.
    #[must_use]
    pub fn document() -> Self {
        Self::Document {
            version: None,
            encoding: None,
            standalone: None,
            input_encoding: None,
        }
    }

    /// Creates a namespace-qualified element kind.
    #[must_use]
    pub fn element(namespace_uri: Option<&str>, local_name: &str, prefix: Option<&str>) -> Self {
        Self::Element {
            name: NodeName::qualified(namespace_uri, local_name, prefix),
        }
    }

    /// Creates a namespace-unaware element kind.
    #[must_use]
    pub fn unqualified_element(name: &str) -> Self {
        Self::Element {
            name: NodeName::Unqualified(name.to_string()),
        }
    }

    /// Creates a text kind.
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self::Text {
            content: content.to_string(),
            ignorable: false,
        }
    }
}

/// The content slot of a container node.
///
/// Exactly one of the three shapes holds at any time: no content yet, a
/// doubly linked child list, or (in the `Compact` build state) a raw text
/// payload standing in for a single text child that was never allocated.
#[derive(Debug, Clone, Default)]
pub enum Content {
    /// No children.
    #[default]
    None,
    /// A doubly linked list of children.
    Children {
        /// The first child.
        first: NodeId,
        /// The last child, for O(1) append.
        last: NodeId,
    },
    /// An opaque character-data payload; the container's only logical
    /// content is text. Only valid while the build state is
    /// [`BuildState::Compact`].
    Compact(String),
}

/// The build state of a container node.
///
/// State transitions are driven by the builder and by discard requests:
///
/// - `Incomplete -> Complete` when the input context is cleared.
/// - `Incomplete -> Discarding -> Discarded` when content is discarded
///   while still being produced.
/// - `Compact <-> Complete` when a text-only payload is materialized into
///   a real child list (or installed by `set_character_data`).
///
/// `Complete` and `Discarded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// All content is in memory; there is no pending input context.
    Complete,
    /// The element's start tag has been seen but its attribute events are
    /// still arriving.
    AttributesPending,
    /// Some children may still have to be pulled from the builder.
    Incomplete,
    /// A discard was requested; remaining input events for this subtree are
    /// being drained without node construction.
    Discarding,
    /// The content is gone; any further build or traversal fails with a
    /// consumed-node error.
    Discarded,
    /// The container's only content is a raw text payload stored in
    /// [`Content::Compact`].
    Compact,
}
