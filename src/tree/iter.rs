//! Mutation-aware, lazily building cursors over the tree.
//!
//! A [`NodeCursor`] is a detached cursor rather than a borrowing iterator:
//! each step takes `&mut Model`, so traversal can trigger deferred building
//! and the just-returned node can be removed through the cursor without
//! aliasing problems. The cursor validates its position against the tree on
//! every advance — a node detached behind the cursor's back is reported as
//! a concurrent modification instead of silently skipping content.

use super::mutation::Semantics;
use super::node::NodeType;
use super::{Model, NodeId};
use crate::error::ModelError;

/// The traversal scope of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// The direct children of the start node, in document order.
    Children,
    /// All descendants of the start node, depth-first.
    Descendants,
    /// The start node itself, then all descendants, depth-first.
    DescendantsOrSelf,
}

/// A kind filter for generic node iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFilter {
    /// Every node matches.
    Any,
    /// Only nodes of the given kind match.
    Type(NodeType),
}

impl NodeFilter {
    fn matches(self, model: &Model, node: NodeId) -> bool {
        match self {
            Self::Any => true,
            Self::Type(t) => model.node_type(node) == t,
        }
    }
}

/// A name-based filter for element iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementMatcher {
    /// Every element matches.
    Any,
    /// Elements with the given local name, in any namespace.
    ByLocalName(String),
    /// Elements with the given local name in the given namespace.
    ByQName {
        /// The namespace URI to match (`None` = no namespace).
        namespace_uri: Option<String>,
        /// The local name to match.
        local_name: String,
    },
}

impl ElementMatcher {
    fn matches(&self, model: &Model, node: NodeId) -> bool {
        if model.node_type(node) != NodeType::Element {
            return false;
        }
        match self {
            Self::Any => true,
            Self::ByLocalName(name) => model.local_name(node) == Some(name.as_str()),
            Self::ByQName {
                namespace_uri,
                local_name,
            } => {
                model.local_name(node) == Some(local_name.as_str())
                    && model.namespace_uri(node) == namespace_uri.as_deref()
            }
        }
    }
}

#[derive(Debug, Clone)]
enum CursorFilter {
    Nodes(NodeFilter),
    Elements(ElementMatcher),
}

impl CursorFilter {
    fn matches(&self, model: &Model, node: NodeId) -> bool {
        match self {
            Self::Nodes(filter) => filter.matches(model, node),
            Self::Elements(matcher) => matcher.matches(model, node),
        }
    }
}

/// A filtered, removable cursor over an axis.
///
/// The protocol: [`has_next`](NodeCursor::has_next) is idempotent and
/// memoizes the next matching node until [`next`](NodeCursor::next)
/// consumes it; `next` on an exhausted cursor fails with `NoSuchElement`;
/// [`remove`](NodeCursor::remove) detaches the most recently returned node
/// and fails with `IllegalIteratorState` before any `next` or after an
/// intervening `remove`.
///
/// # Examples
///
/// ```
/// use oxiom::tree::{Axis, Model, NodeFilter, NodeKind, NodeType, Semantics};
///
/// let mut model = Model::new();
/// let root = model.create_node(NodeKind::element(None, "root", None));
/// let child = model.create_node(NodeKind::element(None, "child", None));
/// let sem = Semantics::default();
/// model.append_child(root, child, &sem).unwrap();
///
/// let mut cursor = model.nodes(root, Axis::Children, NodeFilter::Type(NodeType::Element));
/// assert!(cursor.has_next(&mut model).unwrap());
/// assert_eq!(cursor.next(&mut model).unwrap(), child);
/// assert!(!cursor.has_next(&mut model).unwrap());
/// ```
#[derive(Debug)]
pub struct NodeCursor {
    start: NodeId,
    axis: Axis,
    filter: CursorFilter,
    current: Option<NodeId>,
    /// Parent of `current` at the time it was returned; used to detect
    /// concurrent removal.
    current_parent: Option<NodeId>,
    next: Option<NodeId>,
    /// The in-flight scan position while computing `next`.
    probe: Option<NodeId>,
    memoized: bool,
    depth: u32,
}

impl Model {
    /// Creates a cursor over `axis` starting at `start`, yielding nodes
    /// accepted by `filter`.
    #[must_use]
    pub fn nodes(&self, start: NodeId, axis: Axis, filter: NodeFilter) -> NodeCursor {
        NodeCursor::new(start, axis, CursorFilter::Nodes(filter))
    }

    /// Creates a cursor over `axis` starting at `start`, yielding elements
    /// accepted by `matcher`.
    #[must_use]
    pub fn elements(&self, start: NodeId, axis: Axis, matcher: ElementMatcher) -> NodeCursor {
        NodeCursor::new(start, axis, CursorFilter::Elements(matcher))
    }
}

impl NodeCursor {
    fn new(start: NodeId, axis: Axis, filter: CursorFilter) -> Self {
        Self {
            start,
            axis,
            filter,
            current: None,
            current_parent: None,
            next: None,
            probe: None,
            memoized: false,
            depth: 0,
        }
    }

    /// Advances to the next node on `axis`, ignoring the filter.
    fn step(&mut self, model: &mut Model, axis: Axis) -> Result<Option<NodeId>, ModelError> {
        let node = self.probe;
        match axis {
            Axis::Children => match node {
                None => model.first_child(self.start),
                Some(id) => model.next_sibling(id),
            },
            Axis::Descendants | Axis::DescendantsOrSelf => match node {
                None => {
                    if axis == Axis::Descendants {
                        self.depth += 1;
                        model.first_child(self.start)
                    } else {
                        Ok(Some(self.start))
                    }
                }
                Some(mut id) => {
                    let mut visit_children = true;
                    loop {
                        if visit_children && model.node_type(id).is_container() {
                            if let Some(first) = model.first_child(id)? {
                                self.depth += 1;
                                return Ok(Some(first));
                            }
                        }
                        if self.depth == 0 {
                            return Ok(None);
                        }
                        if let Some(sibling) = model.next_sibling(id)? {
                            return Ok(Some(sibling));
                        }
                        self.depth -= 1;
                        match model.parent(id) {
                            Some(parent) => id = parent,
                            None => return Ok(None),
                        }
                        visit_children = false;
                    }
                }
            },
        }
    }

    fn compute_next(&mut self, model: &mut Model, axis: Axis) -> Result<(), ModelError> {
        if let Some(current) = self.current {
            if model.parent(current) != self.current_parent {
                return Err(ModelError::ConcurrentModification);
            }
        }
        self.probe = self.current;
        loop {
            match self.step(model, axis)? {
                None => {
                    self.next = None;
                    break;
                }
                Some(candidate) => {
                    self.probe = Some(candidate);
                    if self.filter.matches(model, candidate) {
                        self.next = Some(candidate);
                        break;
                    }
                }
            }
        }
        self.memoized = true;
        Ok(())
    }

    /// Returns whether another matching node remains. Idempotent: the
    /// answer is memoized until [`next`](NodeCursor::next) consumes it.
    ///
    /// # Errors
    ///
    /// [`ModelError::ConcurrentModification`] if the current node was
    /// detached externally, plus deferred parsing failures from building.
    pub fn has_next(&mut self, model: &mut Model) -> Result<bool, ModelError> {
        if !self.memoized {
            self.compute_next(model, self.axis)?;
        }
        Ok(self.next.is_some())
    }

    /// Returns the next matching node.
    ///
    /// # Errors
    ///
    /// [`ModelError::NoSuchElement`] if the cursor is exhausted, plus the
    /// failure modes of [`has_next`](NodeCursor::has_next).
    pub fn next(&mut self, model: &mut Model) -> Result<NodeId, ModelError> {
        if self.has_next(model)? {
            let node = self.next.take().ok_or(ModelError::NoSuchElement)?;
            self.current = Some(node);
            self.current_parent = model.parent(node);
            self.memoized = false;
            Ok(node)
        } else {
            Err(ModelError::NoSuchElement)
        }
    }

    /// Detaches the most recently returned node. The cursor advances past
    /// the removed node first, so iteration continues seamlessly.
    ///
    /// # Errors
    ///
    /// [`ModelError::IllegalIteratorState`] if called before any `next` or
    /// twice without an intervening `next`.
    pub fn remove(&mut self, model: &mut Model, semantics: &Semantics) -> Result<(), ModelError> {
        let Some(current) = self.current else {
            return Err(ModelError::IllegalIteratorState);
        };
        // Move on before detaching. The step is always taken through the
        // sibling/parent chain, even on a descendants axis.
        self.compute_next(model, Axis::Children)?;
        model.detach(current, semantics);
        self.current = None;
        Ok(())
    }

    /// Replaces the most recently returned node with `new_node`, keeping
    /// the cursor position.
    ///
    /// # Errors
    ///
    /// [`ModelError::IllegalIteratorState`] if there is no current node,
    /// plus the failure modes of [`Model::replace_with`].
    pub fn replace(
        &mut self,
        model: &mut Model,
        new_node: NodeId,
        semantics: &Semantics,
    ) -> Result<(), ModelError> {
        let Some(current) = self.current else {
            return Err(ModelError::IllegalIteratorState);
        };
        self.compute_next(model, Axis::Children)?;
        model.replace_with(current, new_node, semantics)?;
        self.current = None;
        Ok(())
    }
}
