//! Policy-driven cloning.
//!
//! One traversal implements shallow copy, deep copy, and namespace-repairing
//! copy; the [`ClonePolicy`] decides what gets copied and hooks into the
//! clone after its intrinsic fields are set but before children are
//! attached. A compact source clones its payload directly, without ever
//! materializing a child list.

use super::mutation::Semantics;
use super::node::{BuildState, Content, NodeKind, NodeType};
use super::{AttributeMatcher, Model, NodeId};
use crate::error::ModelError;

/// Drives what a clone operation copies.
///
/// Adapter layers supply their own policies to express API-specific clone
/// semantics; the model ships [`DeepClone`], [`ShallowClone`], and
/// [`NamespaceRepairingClone`].
pub trait ClonePolicy {
    /// Whether namespace declarations should be added to the clone so that
    /// every prefix used by the clone (and its attributes) resolves to the
    /// same URI as on the original.
    fn repair_namespaces(&self) -> bool {
        false
    }

    /// Whether attributes are copied onto cloned elements.
    fn copy_attributes(&self) -> bool {
        true
    }

    /// Whether children of a container of the given kind are copied.
    /// Returning `false` produces a shallow clone of that container.
    fn copy_children(&self, kind: NodeType) -> bool {
        let _ = kind;
        true
    }

    /// Invoked after the clone's intrinsic fields are copied and it has
    /// been attached to its target parent, but before any children are.
    fn post_process(&self, model: &mut Model, original: NodeId, clone: NodeId) {
        let _ = (model, original, clone);
    }
}

/// Copies the full subtree, attributes included.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepClone;

impl ClonePolicy for DeepClone {}

/// Copies a single node (with attributes) and none of its children.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShallowClone;

impl ClonePolicy for ShallowClone {
    fn copy_children(&self, _kind: NodeType) -> bool {
        false
    }
}

/// A deep clone that re-declares namespace bindings that would otherwise be
/// lost when the clone lands outside the original's scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceRepairingClone;

impl ClonePolicy for NamespaceRepairingClone {
    fn repair_namespaces(&self) -> bool {
        true
    }
}

impl Model {
    /// Clones `node` under `policy`, optionally appending the clone to
    /// `target_parent`.
    ///
    /// The source's build state is respected: children are pulled from the
    /// builder as the copy proceeds, and a compact source clones its text
    /// payload without materializing a child node.
    ///
    /// # Errors
    ///
    /// Deferred parsing failures while building the source, and the usual
    /// insertion failures when attaching to `target_parent`.
    pub fn clone_node(
        &mut self,
        policy: &dyn ClonePolicy,
        node: NodeId,
        target_parent: Option<NodeId>,
    ) -> Result<NodeId, ModelError> {
        let clone = self.create_node(self.node(node).kind.clone());

        if self.node_type(node) == NodeType::Element && policy.copy_attributes() {
            let mut attr = self.first_attribute(node);
            while let Some(id) = attr {
                let attr_clone = self.create_node(self.node(id).kind.clone());
                self.append_attribute_internal(clone, attr_clone);
                attr = self.next_attribute(id);
            }
        }

        if let Some(parent) = target_parent {
            self.append_child(parent, clone, &Semantics::default())?;
        }

        if policy.repair_namespaces() && self.node_type(node) == NodeType::Element {
            self.repair_namespaces(node, clone)?;
        }

        policy.post_process(self, node, clone);

        if self.node_type(node).is_container() && policy.copy_children(self.node_type(node)) {
            if self.state(node) == BuildState::Compact {
                if let Content::Compact(payload) = &self.node(node).content {
                    let payload = payload.clone();
                    self.set_character_data(clone, &payload, &Semantics::default())?;
                }
            } else {
                let mut child = self.first_child(node)?;
                while let Some(id) = child {
                    self.clone_node(policy, id, Some(clone))?;
                    child = self.next_sibling(id)?;
                }
            }
        }

        Ok(clone)
    }

    /// Re-declares on `clone` every prefix binding the original relies on
    /// that is missing or bound differently in the clone's scope.
    fn repair_namespaces(&mut self, original: NodeId, clone: NodeId) -> Result<(), ModelError> {
        let mut bindings: Vec<(String, String)> = Vec::new();
        let mut push_binding = |prefix: Option<&str>, uri: Option<&str>| {
            let prefix = prefix.unwrap_or("").to_string();
            let uri = uri.unwrap_or("").to_string();
            if !(prefix.is_empty() && uri.is_empty())
                && !bindings.iter().any(|(p, _)| *p == prefix)
            {
                bindings.push((prefix, uri));
            }
        };
        push_binding(self.prefix(original), self.namespace_uri(original));
        let mut attr = self.first_attribute(original);
        while let Some(id) = attr {
            if self.node_type(id) == NodeType::Attribute && self.prefix(id).is_some() {
                push_binding(self.prefix(id), self.namespace_uri(id));
            }
            attr = self.next_attribute(id);
        }
        for (prefix, uri) in bindings {
            if self.lookup_namespace_uri(clone, &prefix).as_deref() != Some(uri.as_str()) {
                self.set_attribute(
                    clone,
                    AttributeMatcher::NamespaceDeclaration,
                    None,
                    &prefix,
                    None,
                    &uri,
                )?;
            }
        }
        Ok(())
    }

    /// Deep-copies a subtree from another model into this one, returning
    /// the root of the copy. Only content already materialized in `source`
    /// is carried over; build the source subtree first if completeness
    /// matters. This is the only way a node crosses between two models.
    pub fn import(&mut self, source: &Model, node: NodeId) -> NodeId {
        let clone = self.create_node(source.node(node).kind.clone());

        let mut attr = source.first_attribute(node);
        while let Some(id) = attr {
            let attr_clone = self.create_node(source.node(id).kind.clone());
            self.append_attribute_internal(clone, attr_clone);
            attr = source.next_attribute(id);
        }

        match &source.node(node).content {
            Content::Compact(payload) => {
                let payload = payload.clone();
                self.set_state(clone, BuildState::Compact);
                self.node_mut(clone).content = Content::Compact(payload);
            }
            Content::Children { first, .. } => {
                let mut child = Some(*first);
                while let Some(id) = child {
                    let child_clone = self.import(source, id);
                    self.append_child_without_build(clone, child_clone);
                    child = source.next_sibling_if_available(id);
                }
            }
            Content::None => {}
        }

        clone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Axis, NodeFilter};

    fn build_three_level_tree(model: &mut Model) -> NodeId {
        // <top a="1" b="2"><mid><leaf>text</leaf></mid></top>
        let top = model.create_node(NodeKind::element(None, "top", None));
        model
            .set_attribute(top, AttributeMatcher::ByName, None, "a", None, "1")
            .unwrap();
        model
            .set_attribute(top, AttributeMatcher::ByName, None, "b", None, "2")
            .unwrap();
        let mid = model.create_node(NodeKind::element(None, "mid", None));
        let leaf = model.create_node(NodeKind::element(None, "leaf", None));
        let text = model.create_node(NodeKind::text("text"));
        let sem = Semantics::default();
        model.append_child(top, mid, &sem).unwrap();
        model.append_child(mid, leaf, &sem).unwrap();
        model.append_child(leaf, text, &sem).unwrap();
        top
    }

    #[test]
    fn test_shallow_clone_copies_attributes_but_no_children() {
        let mut model = Model::new();
        let top = build_three_level_tree(&mut model);

        let clone = model.clone_node(&ShallowClone, top, None).unwrap();
        assert_ne!(clone, top);
        assert_eq!(model.first_child_if_available(clone), None);
        assert_eq!(model.attributes(clone).len(), 2);
        assert_eq!(
            model
                .attribute_value(clone, AttributeMatcher::ByName, None, "a")
                .unwrap()
                .as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_deep_clone_is_structurally_identical_with_new_identities() {
        let mut model = Model::new();
        let top = build_three_level_tree(&mut model);

        let clone = model.clone_node(&DeepClone, top, None).unwrap();

        let orig_mid = model.first_child(top).unwrap().unwrap();
        let clone_mid = model.first_child(clone).unwrap().unwrap();
        assert_ne!(clone_mid, orig_mid);
        assert_eq!(model.local_name(clone_mid), Some("mid"));

        let clone_leaf = model.first_child(clone_mid).unwrap().unwrap();
        assert_eq!(model.local_name(clone_leaf), Some("leaf"));
        assert_eq!(model.text_content(clone_leaf).unwrap(), "text");

        // Original is untouched.
        assert_eq!(model.text_content(top).unwrap(), "text");
    }

    #[test]
    fn test_clone_into_target_parent() {
        let mut model = Model::new();
        let top = build_three_level_tree(&mut model);
        let dest = model.create_node(NodeKind::element(None, "dest", None));

        let clone = model.clone_node(&DeepClone, top, Some(dest)).unwrap();
        assert_eq!(model.parent(clone), Some(dest));
        assert_eq!(model.first_child_if_available(dest), Some(clone));
    }

    #[test]
    fn test_clone_compact_container_stays_compact() {
        let mut model = Model::new();
        let elem = model.create_node(NodeKind::element(None, "e", None));
        model
            .set_character_data(elem, "payload", &Semantics::default())
            .unwrap();

        let clone = model.clone_node(&DeepClone, elem, None).unwrap();
        assert_eq!(model.state(clone), BuildState::Compact);
        assert_eq!(model.text_content(clone).unwrap(), "payload");
        // Source payload not shared: mutating the clone leaves it alone.
        model
            .set_character_data(clone, "other", &Semantics::default())
            .unwrap();
        assert_eq!(model.text_content(elem).unwrap(), "payload");
    }

    #[test]
    fn test_namespace_repairing_clone_redeclares_bindings() {
        let mut model = Model::new();
        let outer = model.create_node(NodeKind::element(None, "outer", None));
        model
            .set_attribute(
                outer,
                AttributeMatcher::NamespaceDeclaration,
                None,
                "p",
                None,
                "http://ns.example",
            )
            .unwrap();
        let inner = model.create_node(NodeKind::element(
            Some("http://ns.example"),
            "inner",
            Some("p"),
        ));
        model
            .append_child(outer, inner, &Semantics::default())
            .unwrap();

        // Cloning to a detached position loses the outer declaration, so
        // the repairing policy re-declares it on the clone itself.
        let clone = model
            .clone_node(&NamespaceRepairingClone, inner, None)
            .unwrap();
        assert_eq!(
            model.lookup_namespace_uri(clone, "p").as_deref(),
            Some("http://ns.example")
        );

        // A plain deep clone does not.
        let bare = model.clone_node(&DeepClone, inner, None).unwrap();
        assert_eq!(model.lookup_namespace_uri(bare, "p"), None);
    }

    #[test]
    fn test_post_process_hook_runs_before_children() {
        struct Marking;
        impl ClonePolicy for Marking {
            fn post_process(&self, model: &mut Model, _original: NodeId, clone: NodeId) {
                model
                    .set_attribute(clone, AttributeMatcher::ByName, None, "marked", None, "yes")
                    .unwrap();
            }
        }

        let mut model = Model::new();
        let top = build_three_level_tree(&mut model);
        let clone = model.clone_node(&Marking, top, None).unwrap();
        assert_eq!(
            model
                .attribute_value(clone, AttributeMatcher::ByName, None, "marked")
                .unwrap()
                .as_deref(),
            Some("yes")
        );
        // Children were still copied after the hook.
        assert!(model.first_child_if_available(clone).is_some());
    }

    #[test]
    fn test_import_copies_across_models() {
        let mut source = Model::new();
        let top = build_three_level_tree(&mut source);

        let mut dest = Model::new();
        let copy = dest.import(&source, top);
        assert_eq!(dest.local_name(copy), Some("top"));
        assert_eq!(dest.attributes(copy).len(), 2);
        assert_eq!(dest.text_content(copy).unwrap(), "text");

        // Identities are local to each arena; the copy is fully owned by
        // the destination model.
        let nodes = dest.nodes(copy, Axis::DescendantsOrSelf, NodeFilter::Any);
        let mut cursor = nodes;
        let mut count = 0;
        while cursor.has_next(&mut dest).unwrap() {
            cursor.next(&mut dest).unwrap();
            count += 1;
        }
        assert_eq!(count, 4); // top, mid, leaf, text
    }
}
