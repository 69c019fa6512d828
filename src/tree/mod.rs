//! Arena-based XML object model with deferred building.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the [`Model`],
//! and are referenced by [`NodeId`] — a newtype over `NonZeroU32`. Every
//! relationship in the tree (parent, siblings, owner document, the builder's
//! target container) is an arena id rather than a pointer, so retargeting
//! during tree-merge operations can never leave a stale reference.
//!
//! A container node may be only partially built: its [`BuildState`] tracks
//! whether children still have to be pulled from the underlying event
//! stream, and its input context binds it to the builder producing that
//! content. Navigation comes in two flavors throughout: `*_if_available`
//! methods look only at what is already in memory, while the plain methods
//! drive the builder as far as needed to answer.

mod attributes;
mod clone;
mod iter;
mod mutation;
mod node;

pub use attributes::AttributeMatcher;
pub use clone::{ClonePolicy, DeepClone, ShallowClone};
pub use iter::{Axis, ElementMatcher, NodeCursor, NodeFilter};
pub use mutation::{DetachPolicy, MigrationPolicy, Semantics};
pub use node::{BuildState, Content, NodeKind, NodeName, NodeType};

use std::num::NonZeroU32;

use crate::builder::{BuilderData, ContextData};
use crate::error::ModelError;
use crate::stream::NullSink;

/// A typed index into the model's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, so `Option<NodeId>` is the same
/// size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// A handle to an input context: the live binding between a not-yet-built
/// container and the builder still producing its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextId(pub(crate) u32);

impl ContextId {
    pub(crate) fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// A handle to a builder registered with the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderId(pub(crate) u32);

impl BuilderId {
    pub(crate) fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// What a node hangs off: nothing, a parent node, or — for a detached node
/// that still belongs to a document — the owner document alone.
///
/// A node never has both a parent and a direct owner-document link; when it
/// has a parent, its owner document is found by walking up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeOwner {
    /// Fully orphaned.
    #[default]
    None,
    /// Linked under a parent node.
    Parent(NodeId),
    /// Detached, but owned by a document.
    Document(NodeId),
}

/// Storage for a single node in the arena.
///
/// Leaf kinds simply never use the container fields (`state` stays
/// `Complete`, `content` stays `None`).
#[derive(Debug, Clone)]
pub struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) owner: NodeOwner,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) state: BuildState,
    pub(crate) content: Content,
    pub(crate) context: Option<ContextId>,
    /// Head of the attribute chain (elements only).
    pub(crate) first_attribute: Option<NodeId>,
    /// Forward link in the owner element's attribute chain (attribute and
    /// namespace-declaration nodes only).
    pub(crate) next_attribute: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            owner: NodeOwner::None,
            prev_sibling: None,
            next_sibling: None,
            state: BuildState::Complete,
            content: Content::None,
            context: None,
            first_attribute: None,
            next_attribute: None,
        }
    }
}

/// The object model arena.
///
/// A `Model` owns every node, input context, and builder of one tree model
/// instance. It may hold several document or fragment trees at once, plus
/// detached nodes; "wrong document" conflicts are moves between documents
/// inside one `Model`, while transfers between two `Model`s are only
/// possible as clones (see [`Model::import`]).
///
/// Nodes are created either programmatically through
/// [`create_node`](Model::create_node) (immediately `Complete`) or by a
/// builder attached with [`attach_source`](Model::attach_source)
/// (`Incomplete` until the matching end event is consumed).
///
/// # Examples
///
/// ```
/// use oxiom::parser::PullParser;
/// use oxiom::tree::Model;
///
/// let mut model = Model::new();
/// let doc = model
///     .attach_source(Box::new(PullParser::new("<a><b>x</b><c/></a>")))
///     .unwrap();
/// let root = model.document_element(doc).unwrap().unwrap();
/// assert_eq!(model.local_name(root), Some("a"));
/// ```
pub struct Model {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    pub(crate) contexts: Vec<ContextData>,
    pub(crate) builders: Vec<BuilderData>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32).
        nodes.push(NodeData::new(NodeKind::DocumentFragment));
        Self {
            nodes,
            contexts: Vec::new(),
            builders: Vec::new(),
        }
    }

    /// Allocates a new node in the arena and returns its id.
    ///
    /// Programmatically created nodes start in the `Complete` state with no
    /// parent and no owner document.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Returns a reference to the raw node storage.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a node in this model.
    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns the kind (and payload) of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.node_mut(id).kind
    }

    /// Returns the payload-free kind discriminant of a node.
    #[must_use]
    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.node(id).kind.node_type()
    }

    /// Returns the build state of a container node.
    #[must_use]
    pub fn state(&self, id: NodeId) -> BuildState {
        self.node(id).state
    }

    /// Returns the total number of nodes in the arena (excluding the
    /// placeholder slot).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    // --- Names and content accessors ---

    /// Returns the local name of an element or attribute node.
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name } | NodeKind::Attribute { name, .. } => {
                Some(name.local_name())
            }
            NodeKind::ProcessingInstruction { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Returns the namespace URI of an element or attribute node, if any.
    #[must_use]
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name } | NodeKind::Attribute { name, .. } => name.namespace_uri(),
            NodeKind::NamespaceDeclaration { namespace_uri, .. } => Some(namespace_uri),
            _ => None,
        }
    }

    /// Returns the namespace prefix of an element or attribute node, if any.
    #[must_use]
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name } | NodeKind::Attribute { name, .. } => name.prefix(),
            _ => None,
        }
    }

    /// Returns the directly held text of a leaf node (text, CDATA, comment)
    /// or the value of an attribute.
    #[must_use]
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content, .. }
            | NodeKind::CData { content }
            | NodeKind::Comment { content } => Some(content),
            NodeKind::Attribute { value, .. } => Some(value),
            NodeKind::NamespaceDeclaration { namespace_uri, .. } => Some(namespace_uri),
            NodeKind::ProcessingInstruction { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    // --- Ownership and navigation ---

    /// Returns the parent of a node, if it has one.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        match self.node(id).owner {
            NodeOwner::Parent(parent) => Some(parent),
            _ => None,
        }
    }

    /// Returns the nearest ancestor element of a node, if its parent is an
    /// element.
    #[must_use]
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id)
            .filter(|&p| self.node_type(p) == NodeType::Element)
    }

    /// Returns the document that transitively owns this node, if any.
    ///
    /// Walks up the parent chain; a detached node reports the owner
    /// document recorded at detach time (per the detach policy in effect).
    #[must_use]
    pub fn owner_document(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if self.node_type(current) == NodeType::Document {
                return Some(current);
            }
            match self.node(current).owner {
                NodeOwner::Parent(parent) => current = parent,
                NodeOwner::Document(doc) => return Some(doc),
                NodeOwner::None => return None,
            }
        }
    }

    /// Returns the next sibling that is already in memory, without driving
    /// the builder.
    #[must_use]
    pub fn next_sibling_if_available(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns the next sibling of a node, building the parent as far as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NodeConsumed`] if the parent's content was
    /// discarded, or [`ModelError::DeferredParsing`] if the underlying
    /// stream fails while building.
    pub fn next_sibling(&mut self, id: NodeId) -> Result<Option<NodeId>, ModelError> {
        if let Some(sibling) = self.node(id).next_sibling {
            return Ok(Some(sibling));
        }
        let Some(parent) = self.parent(id) else {
            return Ok(None);
        };
        match self.state(parent) {
            BuildState::Discarding | BuildState::Discarded => Err(ModelError::NodeConsumed),
            BuildState::Incomplete | BuildState::AttributesPending => {
                while self.building(parent) && self.node(id).next_sibling.is_none() {
                    self.build_next(parent)?;
                }
                Ok(self.node(id).next_sibling)
            }
            _ => Ok(None),
        }
    }

    /// Returns the first child that is already in memory, without driving
    /// the builder.
    ///
    /// A container in the `Compact` state materializes its payload into a
    /// real text child here; this is the only transition out of `Compact`.
    pub fn first_child_if_available(&mut self, id: NodeId) -> Option<NodeId> {
        self.expand_compact(id);
        match self.node(id).content {
            Content::Children { first, .. } => Some(first),
            _ => None,
        }
    }

    /// Returns the first child of a container, building as far as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NodeConsumed`] if the container's content was
    /// discarded, or [`ModelError::DeferredParsing`] if the underlying
    /// stream fails while building.
    pub fn first_child(&mut self, id: NodeId) -> Result<Option<NodeId>, ModelError> {
        if let Some(first) = self.first_child_if_available(id) {
            return Ok(Some(first));
        }
        match self.state(id) {
            BuildState::Discarding | BuildState::Discarded => Err(ModelError::NodeConsumed),
            BuildState::Incomplete | BuildState::AttributesPending => {
                let mut first = None;
                while first.is_none() && self.building(id) {
                    self.build_next(id)?;
                    first = self.first_child_if_available(id);
                }
                Ok(first)
            }
            _ => Ok(None),
        }
    }

    /// Returns the last child currently in memory, without driving the
    /// builder.
    pub fn last_known_child(&mut self, id: NodeId) -> Option<NodeId> {
        self.expand_compact(id);
        match self.node(id).content {
            Content::Children { last, .. } => Some(last),
            _ => None,
        }
    }

    /// Returns the last child of a container, building it to completion
    /// first.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`build`](Model::build).
    pub fn last_child(&mut self, id: NodeId) -> Result<Option<NodeId>, ModelError> {
        self.build(id)?;
        Ok(self.last_known_child(id))
    }

    /// Returns the document element (the single element child) of a
    /// document node, building as far as needed.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`first_child`](Model::first_child).
    pub fn document_element(&mut self, doc: NodeId) -> Result<Option<NodeId>, ModelError> {
        let mut child = self.first_child(doc)?;
        while let Some(id) = child {
            if self.node_type(id) == NodeType::Element {
                return Ok(Some(id));
            }
            child = self.next_sibling(id)?;
        }
        Ok(None)
    }

    // --- Build state machine ---

    /// True while the container still has an active input context to pull
    /// from.
    pub(crate) fn building(&self, id: NodeId) -> bool {
        self.node(id).context.is_some()
            && matches!(
                self.state(id),
                BuildState::Incomplete | BuildState::AttributesPending
            )
    }

    /// Returns the input context binding this container to its builder, if
    /// content is still pending.
    #[must_use]
    pub fn input_context(&self, id: NodeId) -> Option<ContextId> {
        self.node(id).context
    }

    pub(crate) fn set_state(&mut self, id: NodeId, state: BuildState) {
        self.node_mut(id).state = state;
    }

    /// Binds or clears a container's input context, applying the state
    /// transitions tied to it: clearing the context completes an
    /// `Incomplete` container and finalizes a `Discarding` one as
    /// `Discarded`; attaching a context forces `Incomplete`.
    pub(crate) fn set_input_context(&mut self, id: NodeId, context: Option<ContextId>) {
        self.node_mut(id).context = context;
        if context.is_none() {
            match self.state(id) {
                BuildState::Incomplete | BuildState::AttributesPending => {
                    self.set_state(id, BuildState::Complete);
                }
                BuildState::Discarding => self.set_state(id, BuildState::Discarded),
                _ => {}
            }
        } else {
            self.set_state(id, BuildState::Incomplete);
        }
    }

    /// Pulls exactly one event from the builder bound to this container.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NoBuilder`] if the container has no input
    /// context, [`ModelError::BuilderComplete`] if the builder reports
    /// completion while the container is still pending (the model and the
    /// stream are out of step), or the builder's failure.
    pub fn build_next(&mut self, id: NodeId) -> Result<(), ModelError> {
        let Some(context) = self.node(id).context else {
            return Err(ModelError::NoBuilder);
        };
        let builder = self.contexts[context.as_index()].builder;
        if self.builders[builder.as_index()].done {
            return Err(ModelError::BuilderComplete);
        }
        self.builder_next(builder, &mut NullSink)?;
        Ok(())
    }

    /// Builds this container to completion, blocking until every child has
    /// been pulled from the underlying stream.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NodeConsumed`] if called on a discarding or
    /// discarded container, or [`ModelError::DeferredParsing`] if the
    /// stream fails; a stream failure permanently taints further building
    /// of this subtree.
    pub fn build(&mut self, id: NodeId) -> Result<(), ModelError> {
        match self.state(id) {
            BuildState::Discarding | BuildState::Discarded => Err(ModelError::NodeConsumed),
            BuildState::Incomplete | BuildState::AttributesPending => {
                if let Some(context) = self.node(id).context {
                    let builder = self.contexts[context.as_index()].builder;
                    while self.node(id).context.is_some() {
                        self.builder_next(builder, &mut NullSink)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Builds every container in the subtree rooted at `id` to completion.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`build`](Model::build).
    pub fn build_deep(&mut self, id: NodeId) -> Result<(), ModelError> {
        self.build(id)?;
        let mut child = self.first_child_if_available(id);
        while let Some(c) = child {
            if self.node_type(c).is_container() {
                self.build_deep(c)?;
            }
            child = self.next_sibling_if_available(c);
        }
        Ok(())
    }

    /// Requests that this container's remaining content be dropped.
    ///
    /// Children already in memory are discarded recursively. If content is
    /// still being produced, the container transitions to `Discarding`;
    /// with `consume_input` the builder is driven until all outstanding
    /// events for the subtree have been drained and the container reaches
    /// `Discarded`. A subtree whose stream is mid-failure is treated as
    /// eligible for forced drain: the failure finalizes the discard instead
    /// of propagating.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; the `Result` is kept for parity
    /// with the other build-driving operations.
    pub fn discard(&mut self, id: NodeId, consume_input: bool) -> Result<(), ModelError> {
        let mut child = self.first_child_if_available(id);
        while let Some(c) = child {
            if self.node_type(c).is_container() {
                self.discard(c, consume_input)?;
            }
            child = self.next_sibling_if_available(c);
        }
        if let Some(context) = self.node(id).context {
            let builder = self.contexts[context.as_index()].builder;
            self.context_discard(context);
            if consume_input {
                while self.state(id) != BuildState::Discarded {
                    if self.builder_next(builder, &mut NullSink).is_err() {
                        // Forced drain: a failing stream still counts as
                        // fully consumed.
                        self.set_input_context(id, None);
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    // --- Content management ---

    /// Materializes a `Compact` payload into a single text child and
    /// switches the container to `Complete`.
    pub(crate) fn expand_compact(&mut self, id: NodeId) {
        if self.state(id) != BuildState::Compact {
            return;
        }
        let payload = match std::mem::take(&mut self.node_mut(id).content) {
            Content::Compact(payload) => payload,
            other => {
                // State said Compact but content disagreed; restore and bail.
                self.node_mut(id).content = other;
                return;
            }
        };
        let text = self.create_node(NodeKind::Text {
            content: payload,
            ignorable: false,
        });
        self.node_mut(text).owner = NodeOwner::Parent(id);
        self.node_mut(id).content = Content::Children {
            first: text,
            last: text,
        };
        self.set_state(id, BuildState::Complete);
    }

    /// Returns the logical text content of a container: the compact payload
    /// if there is one, otherwise the concatenation of all descendant text
    /// and CDATA nodes, building as far as needed.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`first_child`](Model::first_child).
    pub fn text_content(&mut self, id: NodeId) -> Result<String, ModelError> {
        if self.state(id) == BuildState::Compact {
            if let Content::Compact(payload) = &self.node(id).content {
                return Ok(payload.clone());
            }
        }
        let mut out = String::new();
        self.collect_text(id, &mut out)?;
        Ok(out)
    }

    fn collect_text(&mut self, id: NodeId, out: &mut String) -> Result<(), ModelError> {
        if self.state(id) == BuildState::Compact {
            if let Content::Compact(payload) = &self.node(id).content {
                out.push_str(payload);
                return Ok(());
            }
        }
        let mut child = self.first_child(id)?;
        while let Some(c) = child {
            match &self.node(c).kind {
                NodeKind::Text { content, .. } | NodeKind::CData { content } => {
                    out.push_str(content);
                }
                NodeKind::Element { .. } => self.collect_text(c, out)?,
                _ => {}
            }
            child = self.next_sibling(c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_node(model: &mut Model, content: &str) -> NodeId {
        model.create_node(NodeKind::text(content))
    }

    #[test]
    fn test_new_model_is_empty() {
        let model = Model::new();
        assert_eq!(model.node_count(), 0);
    }

    #[test]
    fn test_create_node_starts_complete_and_orphaned() {
        let mut model = Model::new();
        let elem = model.create_node(NodeKind::element(None, "div", None));
        assert_eq!(model.state(elem), BuildState::Complete);
        assert_eq!(model.parent(elem), None);
        assert_eq!(model.owner_document(elem), None);
        assert!(model.input_context(elem).is_none());
    }

    #[test]
    fn test_first_child_of_programmatic_empty_element() {
        let mut model = Model::new();
        let elem = model.create_node(NodeKind::element(None, "div", None));
        assert_eq!(model.first_child(elem).unwrap(), None);
        assert_eq!(model.last_child(elem).unwrap(), None);
    }

    #[test]
    fn test_owner_document_walks_parent_chain() {
        let mut model = Model::new();
        let doc = model.create_node(NodeKind::document());
        let root = model.create_node(NodeKind::element(None, "root", None));
        let child = model.create_node(NodeKind::element(None, "child", None));
        model.append_child(doc, root, &Semantics::default()).unwrap();
        model
            .append_child(root, child, &Semantics::default())
            .unwrap();
        assert_eq!(model.owner_document(child), Some(doc));
        assert_eq!(model.owner_document(doc), Some(doc));
    }

    #[test]
    fn test_local_name_and_namespace() {
        let mut model = Model::new();
        let elem = model.create_node(NodeKind::element(
            Some("http://www.w3.org/2000/svg"),
            "rect",
            Some("svg"),
        ));
        assert_eq!(model.local_name(elem), Some("rect"));
        assert_eq!(model.prefix(elem), Some("svg"));
        assert_eq!(
            model.namespace_uri(elem),
            Some("http://www.w3.org/2000/svg")
        );
        let text = text_node(&mut model, "x");
        assert_eq!(model.local_name(text), None);
        assert_eq!(model.node_value(text), Some("x"));
    }

    #[test]
    fn test_build_is_noop_on_complete_container() {
        let mut model = Model::new();
        let elem = model.create_node(NodeKind::element(None, "a", None));
        assert!(model.build(elem).is_ok());
        assert_eq!(model.state(elem), BuildState::Complete);
    }

    #[test]
    fn test_build_next_without_builder_fails() {
        let mut model = Model::new();
        let elem = model.create_node(NodeKind::element(None, "a", None));
        assert!(matches!(
            model.build_next(elem),
            Err(ModelError::NoBuilder)
        ));
    }

    #[test]
    fn test_discard_programmatic_subtree() {
        let mut model = Model::new();
        let elem = model.create_node(NodeKind::element(None, "a", None));
        let inner = model.create_node(NodeKind::element(None, "b", None));
        model
            .append_child(elem, inner, &Semantics::default())
            .unwrap();
        // No input context anywhere, so discard only recurses.
        assert!(model.discard(elem, true).is_ok());
        assert_eq!(model.state(elem), BuildState::Complete);
    }

    #[test]
    fn test_compact_expansion_creates_single_text_child() {
        let mut model = Model::new();
        let elem = model.create_node(NodeKind::element(None, "a", None));
        model
            .set_character_data(elem, "hello", &Semantics::default())
            .unwrap();
        assert_eq!(model.state(elem), BuildState::Compact);

        let child = model.first_child_if_available(elem).unwrap();
        assert_eq!(model.state(elem), BuildState::Complete);
        assert_eq!(model.node_value(child), Some("hello"));
        assert_eq!(model.next_sibling_if_available(child), None);
        assert_eq!(model.parent(child), Some(elem));
    }

    #[test]
    fn test_text_content_reads_compact_without_expanding() {
        let mut model = Model::new();
        let elem = model.create_node(NodeKind::element(None, "a", None));
        model
            .set_character_data(elem, "payload", &Semantics::default())
            .unwrap();
        assert_eq!(model.text_content(elem).unwrap(), "payload");
        assert_eq!(model.state(elem), BuildState::Compact);
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let mut model = Model::new();
        let p = model.create_node(NodeKind::element(None, "p", None));
        let hello = text_node(&mut model, "hello ");
        let b = model.create_node(NodeKind::element(None, "b", None));
        let world = text_node(&mut model, "world");
        let sem = Semantics::default();
        model.append_child(p, hello, &sem).unwrap();
        model.append_child(p, b, &sem).unwrap();
        model.append_child(b, world, &sem).unwrap();
        assert_eq!(model.text_content(p).unwrap(), "hello world");
    }
}
