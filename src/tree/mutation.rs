//! Tree mutation: append, insert, detach, replace, move, and the policies
//! governing nodes that already live somewhere else.
//!
//! Every mutating operation validates against the nesting table and the
//! cycle check *before* touching any link, so a failed operation never
//! leaves the tree partially mutated.

use super::node::{BuildState, Content, NodeType};
use super::{Model, NodeId, NodeOwner};
use crate::error::ModelError;

/// What happens to a detached node's owner-document link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetachPolicy {
    /// The detached node keeps belonging to the document that owned it.
    #[default]
    SameDocument,
    /// The detached node becomes fully orphaned.
    Orphan,
}

/// What to do with a node that is inserted somewhere it does not already
/// belong: a node that has a parent, or one owned by a different document.
///
/// This is the strict-versus-permissive dial for cross-tree insertion;
/// adapter layers pick the variant matching their API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationPolicy {
    /// Fail loudly: `NodeInUse` if the node has a parent, `WrongDocument`
    /// if it belongs to another document.
    Reject,
    /// Detach and relink, adopting the node into the target document.
    #[default]
    Move,
    /// Leave the original in place and insert a deep copy instead.
    Clone,
}

/// The bundle of pluggable policies a mutation operates under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Semantics {
    /// Owner-document handling for detached nodes.
    pub detach_policy: DetachPolicy,
    /// Handling of nodes inserted from another location.
    pub migration_policy: MigrationPolicy,
}

impl Semantics {
    /// Permissive semantics: auto-move foreign nodes, detached nodes keep
    /// their owner document.
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Strict semantics: fail on in-use or cross-document nodes.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            detach_policy: DetachPolicy::SameDocument,
            migration_policy: MigrationPolicy::Reject,
        }
    }
}

impl Model {
    fn owner_after_detach(&self, parent: NodeId, semantics: &Semantics) -> NodeOwner {
        match semantics.detach_policy {
            DetachPolicy::SameDocument => match self.owner_document(parent) {
                Some(doc) => NodeOwner::Document(doc),
                None => NodeOwner::None,
            },
            DetachPolicy::Orphan => NodeOwner::None,
        }
    }

    /// Validates that `child` may become a child of `parent`, without
    /// mutating anything.
    ///
    /// # Errors
    ///
    /// - [`ModelError::CyclicRelationship`] if `child` is `parent` or one
    ///   of its ancestors.
    /// - [`ModelError::ChildNotAllowed`] if the nesting table forbids the
    ///   combination, or if `parent` is a document that already has a
    ///   document element (other than `replaced`).
    pub fn check_new_child(
        &self,
        parent: NodeId,
        child: NodeId,
        replaced: Option<NodeId>,
    ) -> Result<(), ModelError> {
        let mut current = parent;
        loop {
            if current == child {
                return Err(ModelError::CyclicRelationship);
            }
            match self.parent(current) {
                Some(ancestor) => current = ancestor,
                None => break,
            }
        }
        let parent_type = self.node_type(parent);
        let child_type = self.node_type(child);
        if !parent_type.is_child_allowed(child_type) {
            return Err(ModelError::ChildNotAllowed {
                parent: parent_type,
                child: child_type,
            });
        }
        // A document holds at most one element among its children.
        if parent_type == NodeType::Document && child_type == NodeType::Element {
            let mut existing = match self.node(parent).content {
                Content::Children { first, .. } => Some(first),
                _ => None,
            };
            while let Some(id) = existing {
                if id != child
                    && Some(id) != replaced
                    && self.node_type(id) == NodeType::Element
                {
                    return Err(ModelError::ChildNotAllowed {
                        parent: parent_type,
                        child: child_type,
                    });
                }
                existing = self.next_sibling_if_available(id);
            }
        }
        Ok(())
    }

    /// Applies the migration policy to a node about to be inserted under
    /// `dest_parent`. Returns the node to insert — the original, or a deep
    /// copy under the `Clone` policy.
    fn migrate(
        &mut self,
        child: NodeId,
        dest_parent: NodeId,
        semantics: &Semantics,
    ) -> Result<NodeId, ModelError> {
        if self.parent(child) == Some(dest_parent) {
            // Repositioning within the same parent is never a migration.
            return Ok(child);
        }
        let has_parent = self.parent(child).is_some();
        let foreign_document = match (self.owner_document(child), self.owner_document(dest_parent))
        {
            (Some(a), Some(b)) => a != b,
            _ => false,
        };
        match semantics.migration_policy {
            MigrationPolicy::Reject if has_parent => Err(ModelError::NodeInUse),
            MigrationPolicy::Reject if foreign_document => Err(ModelError::WrongDocument),
            MigrationPolicy::Clone if has_parent || foreign_document => {
                self.clone_node(&super::DeepClone, child, None)
            }
            _ => Ok(child),
        }
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// The parent is built to completion first, so the new child lands
    /// after every streamed child. Appending a node that is already the
    /// last child of `parent` is a no-op. Returns the node actually
    /// appended (a copy, under the `Clone` migration policy).
    ///
    /// # Errors
    ///
    /// Nesting/cycle violations, migration rejections, and deferred
    /// parsing failures from building the parent.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        semantics: &Semantics,
    ) -> Result<NodeId, ModelError> {
        self.check_new_child(parent, child, None)?;
        self.build(parent)?;
        let child = self.migrate(child, parent, semantics)?;
        self.append_child_without_build(parent, child);
        Ok(child)
    }

    /// The low-level append primitive: links `child` as the last child of
    /// `parent` without driving the builder. This is the path the builder
    /// itself uses to push freshly parsed nodes, and it preserves document
    /// order by always linking at the tail.
    pub(crate) fn append_child_without_build(&mut self, parent: NodeId, child: NodeId) {
        self.expand_compact(parent);
        if self.parent(child) == Some(parent) {
            if let Content::Children { last, .. } = self.node(parent).content {
                if last == child {
                    // Already the last child; nothing to do.
                    return;
                }
            }
        }
        self.unlink(child, Some(parent));
        match self.node(parent).content {
            Content::Children { first, last } => {
                self.node_mut(last).next_sibling = Some(child);
                self.node_mut(child).prev_sibling = Some(last);
                self.node_mut(parent).content = Content::Children { first, last: child };
            }
            _ => {
                self.node_mut(parent).content = Content::Children {
                    first: child,
                    last: child,
                };
            }
        }
    }

    /// Removes `child` from its sibling list. With `new_parent` the node is
    /// immediately re-homed; otherwise its owner becomes `new_owner`.
    fn unlink_with_owner(&mut self, child: NodeId, new_parent: Option<NodeId>, new_owner: NodeOwner) {
        if let Some(parent) = self.parent(child) {
            let prev = self.node(child).prev_sibling;
            let next = self.node(child).next_sibling;
            match prev {
                Some(p) => self.node_mut(p).next_sibling = next,
                None => match next {
                    Some(n) => {
                        if let Content::Children { last, .. } = self.node(parent).content {
                            self.node_mut(parent).content = Content::Children { first: n, last };
                        }
                    }
                    None => self.node_mut(parent).content = Content::None,
                },
            }
            match next {
                Some(n) => self.node_mut(n).prev_sibling = prev,
                None => {
                    if let Some(p) = prev {
                        if let Content::Children { first, .. } = self.node(parent).content {
                            self.node_mut(parent).content = Content::Children { first, last: p };
                        }
                    }
                }
            }
            self.node_mut(child).prev_sibling = None;
            self.node_mut(child).next_sibling = None;
            if new_parent.is_none() {
                self.node_mut(child).owner = new_owner;
            }
        }
        if let Some(parent) = new_parent {
            self.node_mut(child).owner = NodeOwner::Parent(parent);
        }
    }

    fn unlink(&mut self, child: NodeId, new_parent: Option<NodeId>) {
        self.unlink_with_owner(child, new_parent, NodeOwner::None);
    }

    /// Detaches a node from its parent, applying the detach policy to its
    /// owner-document link. Detaching an orphan is a no-op.
    pub fn detach(&mut self, child: NodeId, semantics: &Semantics) {
        let new_owner = match self.parent(child) {
            Some(parent) => self.owner_after_detach(parent, semantics),
            None => return,
        };
        self.unlink_with_owner(child, None, new_owner);
    }

    /// Inserts `sibling` immediately after `anchor`.
    ///
    /// # Errors
    ///
    /// [`ModelError::NoParent`] if `anchor` is an orphan,
    /// [`ModelError::SelfRelationship`] if `anchor` and `sibling` are the
    /// same node, plus the usual nesting/cycle/migration failures.
    pub fn insert_sibling_after(
        &mut self,
        anchor: NodeId,
        sibling: NodeId,
        semantics: &Semantics,
    ) -> Result<NodeId, ModelError> {
        let Some(parent) = self.parent(anchor) else {
            return Err(ModelError::NoParent);
        };
        if anchor == sibling {
            return Err(ModelError::SelfRelationship);
        }
        self.check_new_child(parent, sibling, None)?;
        let sibling = self.migrate(sibling, parent, semantics)?;
        // Building is needed to know whether the anchor is the last child.
        let next = self.next_sibling(anchor)?;
        self.unlink(sibling, Some(parent));
        self.node_mut(sibling).prev_sibling = Some(anchor);
        self.node_mut(sibling).next_sibling = next;
        self.node_mut(anchor).next_sibling = Some(sibling);
        match next {
            Some(n) => self.node_mut(n).prev_sibling = Some(sibling),
            None => {
                if let Content::Children { first, .. } = self.node(parent).content {
                    self.node_mut(parent).content = Content::Children {
                        first,
                        last: sibling,
                    };
                }
            }
        }
        Ok(sibling)
    }

    /// Inserts `sibling` immediately before `anchor`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`insert_sibling_after`](Model::insert_sibling_after).
    pub fn insert_sibling_before(
        &mut self,
        anchor: NodeId,
        sibling: NodeId,
        semantics: &Semantics,
    ) -> Result<NodeId, ModelError> {
        let Some(parent) = self.parent(anchor) else {
            return Err(ModelError::NoParent);
        };
        if anchor == sibling {
            return Err(ModelError::SelfRelationship);
        }
        self.check_new_child(parent, sibling, None)?;
        let sibling = self.migrate(sibling, parent, semantics)?;
        self.unlink(sibling, Some(parent));
        let prev = self.node(anchor).prev_sibling;
        self.node_mut(sibling).next_sibling = Some(anchor);
        self.node_mut(sibling).prev_sibling = prev;
        self.node_mut(anchor).prev_sibling = Some(sibling);
        match prev {
            Some(p) => self.node_mut(p).next_sibling = Some(sibling),
            None => {
                if let Content::Children { last, .. } = self.node(parent).content {
                    self.node_mut(parent).content = Content::Children {
                        first: sibling,
                        last,
                    };
                }
            }
        }
        Ok(sibling)
    }

    /// Replaces `old` with `new` in the exact list position of `old`,
    /// detaching `old` per the detach policy. Replacing a node with itself
    /// is a no-op; replacing an orphan does nothing.
    ///
    /// # Errors
    ///
    /// Nesting/cycle violations and migration rejections.
    pub fn replace_with(
        &mut self,
        old: NodeId,
        new: NodeId,
        semantics: &Semantics,
    ) -> Result<(), ModelError> {
        if old == new {
            return Ok(());
        }
        let Some(parent) = self.parent(old) else {
            return Ok(());
        };
        self.check_new_child(parent, new, Some(old))?;
        let new = self.migrate(new, parent, semantics)?;
        self.unlink(new, Some(parent));
        let prev = self.node(old).prev_sibling;
        let next = self.node(old).next_sibling;
        match prev {
            Some(p) => {
                self.node_mut(p).next_sibling = Some(new);
                self.node_mut(new).prev_sibling = Some(p);
            }
            None => {
                if let Content::Children { last, .. } = self.node(parent).content {
                    self.node_mut(parent).content = Content::Children { first: new, last };
                }
            }
        }
        match next {
            Some(n) => {
                self.node_mut(n).prev_sibling = Some(new);
                self.node_mut(new).next_sibling = Some(n);
            }
            None => {
                if let Content::Children { first, .. } = self.node(parent).content {
                    self.node_mut(parent).content = Content::Children { first, last: new };
                }
            }
        }
        self.node_mut(old).prev_sibling = None;
        self.node_mut(old).next_sibling = None;
        let new_owner = self.owner_after_detach(parent, semantics);
        self.node_mut(old).owner = new_owner;
        Ok(())
    }

    /// Detaches the entire child list of `parent` in one step and resets it
    /// to an empty, complete container.
    ///
    /// If the container was still incomplete, the pending input context is
    /// put into discard mode first: remaining stream events for this
    /// container are dropped as the builder encounters them. The last known
    /// child is built to completion before that, so already-surfaced nodes
    /// stay intact.
    ///
    /// # Errors
    ///
    /// Deferred parsing failures from completing the last known child.
    pub fn remove_children(
        &mut self,
        parent: NodeId,
        semantics: &Semantics,
    ) -> Result<(), ModelError> {
        if self.state(parent) == BuildState::Compact {
            self.set_state(parent, BuildState::Complete);
            self.node_mut(parent).content = Content::None;
            return Ok(());
        }
        let first = match self.node(parent).content {
            Content::Children { first, .. } => Some(first),
            _ => None,
        };
        let mut update_state = false;
        if matches!(
            self.state(parent),
            BuildState::Incomplete | BuildState::AttributesPending
        ) {
            if let Some(last) = self.last_known_child(parent) {
                if self.node_type(last).is_container() {
                    self.build(last)?;
                }
            }
            if let Some(context) = self.node(parent).context {
                self.context_discard(context);
            }
            update_state = true;
        }
        let new_owner = self.owner_after_detach(parent, semantics);
        let mut child = first;
        while let Some(id) = child {
            let next = self.next_sibling_if_available(id);
            self.node_mut(id).prev_sibling = None;
            self.node_mut(id).next_sibling = None;
            self.node_mut(id).owner = new_owner;
            child = next;
        }
        self.node_mut(parent).content = Content::None;
        if update_state {
            self.set_state(parent, BuildState::Complete);
        }
        Ok(())
    }

    /// Transplants the entire content of `source` — child list or compact
    /// payload, plus any still-active input context — onto `dest` in one
    /// atomic step, re-parenting every moved child and retargeting the
    /// input context so content still being parsed lands in `dest`.
    /// `source` is left `Discarded`.
    ///
    /// # Errors
    ///
    /// Failure modes of [`remove_children`](Model::remove_children) applied
    /// to `dest`.
    pub fn move_children_from(
        &mut self,
        dest: NodeId,
        source: NodeId,
        semantics: &Semantics,
    ) -> Result<(), ModelError> {
        self.remove_children(dest, semantics)?;
        let context = self.node(source).context;
        let content = std::mem::take(&mut self.node_mut(source).content);
        let state = self.state(source);
        self.node_mut(dest).context = context;
        self.node_mut(dest).content = content;
        self.set_state(dest, state);
        if state != BuildState::Compact {
            let mut child = match self.node(dest).content {
                Content::Children { first, .. } => Some(first),
                _ => None,
            };
            while let Some(id) = child {
                self.node_mut(id).owner = NodeOwner::Parent(dest);
                child = self.next_sibling_if_available(id);
            }
            if let Some(context) = context {
                self.contexts[context.as_index()].target = Some(dest);
            }
        }
        self.node_mut(source).context = None;
        self.set_state(source, BuildState::Discarded);
        Ok(())
    }

    /// Appends the entire child list of a document fragment to `dest`,
    /// re-parenting every child and leaving the fragment empty. The
    /// fragment is built to completion first.
    ///
    /// # Errors
    ///
    /// Deferred parsing failures from building either container.
    pub fn append_children(&mut self, dest: NodeId, fragment: NodeId) -> Result<(), ModelError> {
        self.build(fragment)?;
        let Content::Children {
            first: frag_first,
            last: frag_last,
        } = self.node(fragment).content
        else {
            return Ok(());
        };
        self.build(dest)?;
        let mut child = Some(frag_first);
        while let Some(id) = child {
            self.node_mut(id).owner = NodeOwner::Parent(dest);
            child = self.next_sibling_if_available(id);
        }
        self.expand_compact(dest);
        match self.node(dest).content {
            Content::Children { first, last } => {
                self.node_mut(frag_first).prev_sibling = Some(last);
                self.node_mut(last).next_sibling = Some(frag_first);
                self.node_mut(dest).content = Content::Children {
                    first,
                    last: frag_last,
                };
            }
            _ => {
                self.node_mut(dest).content = Content::Children {
                    first: frag_first,
                    last: frag_last,
                };
            }
        }
        self.node_mut(fragment).content = Content::None;
        Ok(())
    }

    /// Clears the container's children and installs `data` as its sole
    /// logical content. Non-empty data is stored as a compact payload — no
    /// child node is allocated until something demands a real child list.
    ///
    /// # Errors
    ///
    /// Failure modes of [`remove_children`](Model::remove_children).
    pub fn set_character_data(
        &mut self,
        parent: NodeId,
        data: &str,
        semantics: &Semantics,
    ) -> Result<(), ModelError> {
        self.remove_children(parent, semantics)?;
        if !data.is_empty() {
            self.set_state(parent, BuildState::Compact);
            self.node_mut(parent).content = Content::Compact(data.to_string());
        }
        Ok(())
    }
}
