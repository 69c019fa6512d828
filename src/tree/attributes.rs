//! The attribute chain and the matcher-driven lookup/upsert machinery.
//!
//! Attributes are not part of the sibling chain: they hang off their owner
//! element through `first_attribute` and link forward through
//! `next_attribute`. One find-or-create-or-update algorithm serves plain
//! attributes, namespace-aware attributes, and namespace declarations; the
//! [`AttributeMatcher`] picks which of the three vocabularies an operation
//! speaks.

use super::mutation::Semantics;
use super::node::{BuildState, NodeKind, NodeName};
use super::{Model, NodeId, NodeOwner};
use crate::error::ModelError;

/// Selects, creates, or updates an attribute based on a match rule.
///
/// The meaning of the `namespace_uri` and `name` parameters of the lookup
/// operations depends on the matcher:
///
/// - [`ByName`](AttributeMatcher::ByName): `name` is the qualified name as
///   written in markup; `namespace_uri` is ignored.
/// - [`ByQName`](AttributeMatcher::ByQName): `name` is the local name,
///   `namespace_uri` the resolved namespace.
/// - [`NamespaceDeclaration`](AttributeMatcher::NamespaceDeclaration):
///   `name` is the declared prefix (empty string for the default
///   namespace); the "value" is the declared namespace URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeMatcher {
    /// Namespace-unaware matching by qualified name.
    ByName,
    /// Namespace-aware matching by (namespace URI, local name).
    ByQName,
    /// Matching of namespace declarations by declared prefix.
    NamespaceDeclaration,
}

impl AttributeMatcher {
    /// Checks whether `attr` matches under this rule.
    #[must_use]
    pub fn matches(
        self,
        model: &Model,
        attr: NodeId,
        namespace_uri: Option<&str>,
        name: &str,
    ) -> bool {
        match (self, &model.node(attr).kind) {
            (Self::ByName, NodeKind::Attribute { name: attr_name, .. }) => {
                attr_name.qualified_name() == name
            }
            (Self::ByQName, NodeKind::Attribute { name: attr_name, .. }) => {
                attr_name.local_name() == name && attr_name.namespace_uri() == namespace_uri
            }
            (Self::NamespaceDeclaration, NodeKind::NamespaceDeclaration { prefix, .. }) => {
                prefix.as_deref().unwrap_or("") == name
            }
            _ => false,
        }
    }

    fn create(
        self,
        model: &mut Model,
        namespace_uri: Option<&str>,
        name: &str,
        prefix: Option<&str>,
        value: &str,
    ) -> NodeId {
        let kind = match self {
            Self::ByName => NodeKind::Attribute {
                name: NodeName::Unqualified(name.to_string()),
                value: value.to_string(),
                specified: true,
            },
            Self::ByQName => NodeKind::Attribute {
                name: NodeName::qualified(namespace_uri, name, prefix),
                value: value.to_string(),
                specified: true,
            },
            Self::NamespaceDeclaration => NodeKind::NamespaceDeclaration {
                prefix: (!name.is_empty()).then(|| name.to_string()),
                namespace_uri: value.to_string(),
            },
        };
        model.create_node(kind)
    }

    fn update(self, model: &mut Model, attr: NodeId, prefix: Option<&str>, value: &str) {
        match (self, model.kind_mut(attr)) {
            (Self::ByName, NodeKind::Attribute { value: v, .. }) => {
                *v = value.to_string();
            }
            (
                Self::ByQName,
                NodeKind::Attribute {
                    name: NodeName::Qualified { prefix: p, .. },
                    value: v,
                    ..
                },
            ) => {
                *p = prefix.map(str::to_string);
                *v = value.to_string();
            }
            (Self::ByQName, NodeKind::Attribute { value: v, .. }) => {
                *v = value.to_string();
            }
            (
                Self::NamespaceDeclaration,
                NodeKind::NamespaceDeclaration { namespace_uri, .. },
            ) => {
                *namespace_uri = value.to_string();
            }
            _ => {}
        }
    }
}

impl Model {
    /// Returns the first attribute on an element's chain, if any.
    #[must_use]
    pub fn first_attribute(&self, element: NodeId) -> Option<NodeId> {
        self.node(element).first_attribute
    }

    /// Returns the next attribute in the owner element's chain.
    #[must_use]
    pub fn next_attribute(&self, attr: NodeId) -> Option<NodeId> {
        self.node(attr).next_attribute
    }

    /// Returns the last attribute on an element's chain, if any.
    #[must_use]
    pub fn last_attribute(&self, element: NodeId) -> Option<NodeId> {
        let mut last = None;
        let mut attr = self.first_attribute(element);
        while let Some(id) = attr {
            last = Some(id);
            attr = self.next_attribute(id);
        }
        last
    }

    /// Returns the element owning this attribute, if it is attached to one.
    #[must_use]
    pub fn owner_element(&self, attr: NodeId) -> Option<NodeId> {
        match self.node(attr).owner {
            NodeOwner::Parent(owner) => Some(owner),
            _ => None,
        }
    }

    /// Drives the builder until the element's attribute events have all
    /// arrived (it has left the `AttributesPending` state).
    fn ensure_attributes(&mut self, element: NodeId) -> Result<(), ModelError> {
        while self.state(element) == BuildState::AttributesPending
            && self.node(element).context.is_some()
        {
            self.build_next(element)?;
        }
        Ok(())
    }

    fn prev_attribute(&self, attr: NodeId) -> Option<NodeId> {
        let owner = self.owner_element(attr)?;
        let mut prev = None;
        let mut current = self.first_attribute(owner);
        while let Some(id) = current {
            if id == attr {
                return prev;
            }
            prev = Some(id);
            current = self.next_attribute(id);
        }
        None
    }

    /// Detaches an attribute from its owner element's chain. Returns `true`
    /// if the attribute was attached to an element.
    pub fn remove_attribute_node(&mut self, attr: NodeId, semantics: &Semantics) -> bool {
        self.detach_attribute(attr, semantics, None)
    }

    /// Removes `attr` from its owner chain; with `new_owner` the attribute
    /// is immediately re-homed to another element.
    fn detach_attribute(
        &mut self,
        attr: NodeId,
        semantics: &Semantics,
        new_owner: Option<NodeId>,
    ) -> bool {
        let had_owner = if let Some(owner) = self.owner_element(attr) {
            let prev = self.prev_attribute(attr);
            let next = self.next_attribute(attr);
            match prev {
                Some(p) => self.node_mut(p).next_attribute = next,
                None => self.node_mut(owner).first_attribute = next,
            }
            self.node_mut(attr).next_attribute = None;
            self.node_mut(attr).owner = match semantics.detach_policy {
                super::DetachPolicy::SameDocument => match self.owner_document(owner) {
                    Some(doc) => NodeOwner::Document(doc),
                    None => NodeOwner::None,
                },
                super::DetachPolicy::Orphan => NodeOwner::None,
            };
            true
        } else {
            false
        };
        if let Some(element) = new_owner {
            self.node_mut(attr).owner = NodeOwner::Parent(element);
        }
        had_owner
    }

    /// Appends an attribute node at the end of an element's chain,
    /// detaching it from any previous owner first.
    ///
    /// # Errors
    ///
    /// Deferred parsing failures while completing the element's pending
    /// attribute events.
    pub fn append_attribute(&mut self, element: NodeId, attr: NodeId) -> Result<(), ModelError> {
        self.ensure_attributes(element)?;
        self.append_attribute_internal(element, attr);
        Ok(())
    }

    /// The raw chain append used by the builder, which must not re-enter
    /// the build loop.
    pub(crate) fn append_attribute_internal(&mut self, element: NodeId, attr: NodeId) {
        self.detach_attribute(attr, &Semantics::default(), Some(element));
        match self.last_attribute(element) {
            Some(last) => self.node_mut(last).next_attribute = Some(attr),
            None => self.node_mut(element).first_attribute = Some(attr),
        }
    }

    /// Finds the first attribute matching under `matcher`.
    ///
    /// # Errors
    ///
    /// Deferred parsing failures while completing pending attribute events.
    pub fn get_attribute(
        &mut self,
        element: NodeId,
        matcher: AttributeMatcher,
        namespace_uri: Option<&str>,
        name: &str,
    ) -> Result<Option<NodeId>, ModelError> {
        self.ensure_attributes(element)?;
        let mut attr = self.first_attribute(element);
        while let Some(id) = attr {
            if matcher.matches(self, id, namespace_uri, name) {
                return Ok(Some(id));
            }
            attr = self.next_attribute(id);
        }
        Ok(None)
    }

    /// Returns the value of the first matching attribute.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get_attribute`](Model::get_attribute).
    pub fn attribute_value(
        &mut self,
        element: NodeId,
        matcher: AttributeMatcher,
        namespace_uri: Option<&str>,
        name: &str,
    ) -> Result<Option<String>, ModelError> {
        Ok(self
            .get_attribute(element, matcher, namespace_uri, name)?
            .and_then(|id| self.node_value(id).map(str::to_string)))
    }

    /// Finds-or-creates-or-updates an attribute: if an attribute matches
    /// under `matcher` it is updated in place, otherwise a new one is
    /// created and appended. Returns the surviving attribute node.
    ///
    /// # Errors
    ///
    /// Deferred parsing failures while completing pending attribute events.
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        matcher: AttributeMatcher,
        namespace_uri: Option<&str>,
        name: &str,
        prefix: Option<&str>,
        value: &str,
    ) -> Result<NodeId, ModelError> {
        self.ensure_attributes(element)?;
        let mut attr = self.first_attribute(element);
        while let Some(id) = attr {
            if matcher.matches(self, id, namespace_uri, name) {
                matcher.update(self, id, prefix, value);
                return Ok(id);
            }
            attr = self.next_attribute(id);
        }
        let created = matcher.create(self, namespace_uri, name, prefix, value);
        self.append_attribute_internal(element, created);
        Ok(created)
    }

    /// Removes the first attribute matching under `matcher`. Returns `true`
    /// if one was found and removed.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get_attribute`](Model::get_attribute).
    pub fn remove_attribute(
        &mut self,
        element: NodeId,
        matcher: AttributeMatcher,
        namespace_uri: Option<&str>,
        name: &str,
        semantics: &Semantics,
    ) -> Result<bool, ModelError> {
        match self.get_attribute(element, matcher, namespace_uri, name)? {
            Some(attr) => {
                self.remove_attribute_node(attr, semantics);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns all attribute nodes of an element, in chain order.
    #[must_use]
    pub fn attributes(&self, element: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut attr = self.first_attribute(element);
        while let Some(id) = attr {
            out.push(id);
            attr = self.next_attribute(id);
        }
        out
    }

    // --- Namespace scope resolution ---

    /// Resolves a prefix against the namespace declarations in scope at
    /// this element, walking up through ancestor elements.
    ///
    /// The empty prefix resolves the default namespace; when no default
    /// declaration is in scope it resolves to the empty URI.
    #[must_use]
    pub fn lookup_namespace_uri(&self, element: NodeId, prefix: &str) -> Option<String> {
        let mut attr = self.first_attribute(element);
        while let Some(id) = attr {
            if let NodeKind::NamespaceDeclaration {
                prefix: declared,
                namespace_uri,
            } = &self.node(id).kind
            {
                if declared.as_deref().unwrap_or("") == prefix {
                    return Some(namespace_uri.clone());
                }
            }
            attr = self.next_attribute(id);
        }
        match self.parent_element(element) {
            Some(parent) => self.lookup_namespace_uri(parent, prefix),
            None if prefix.is_empty() => Some(String::new()),
            None => None,
        }
    }

    /// Finds a prefix bound to `namespace_uri` in scope at this element.
    ///
    /// A prefix declared on an ancestor is only returned if no declaration
    /// on this element masks it with a different URI.
    #[must_use]
    pub fn lookup_prefix(&self, element: NodeId, namespace_uri: &str) -> Option<String> {
        let mut attr = self.first_attribute(element);
        while let Some(id) = attr {
            if let NodeKind::NamespaceDeclaration {
                prefix,
                namespace_uri: declared_uri,
            } = &self.node(id).kind
            {
                if declared_uri == namespace_uri {
                    return Some(prefix.clone().unwrap_or_default());
                }
            }
            attr = self.next_attribute(id);
        }
        let parent = self.parent_element(element)?;
        let prefix = self.lookup_prefix(parent, namespace_uri)?;
        // The inherited prefix may be masked by a declaration on this
        // element binding it to a different URI.
        let mut attr = self.first_attribute(element);
        while let Some(id) = attr {
            if let NodeKind::NamespaceDeclaration {
                prefix: declared, ..
            } = &self.node(id).kind
            {
                if declared.clone().unwrap_or_default() == prefix {
                    return None;
                }
            }
            attr = self.next_attribute(id);
        }
        Some(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(model: &mut Model, name: &str) -> NodeId {
        model.create_node(NodeKind::element(None, name, None))
    }

    #[test]
    fn test_set_attribute_creates_then_updates() {
        let mut model = Model::new();
        let elem = element(&mut model, "e");

        let first = model
            .set_attribute(elem, AttributeMatcher::ByName, None, "n1", None, "v1")
            .unwrap();
        assert_eq!(model.attributes(elem).len(), 1);
        assert_eq!(model.node_value(first), Some("v1"));

        // Same name, different value: upsert, not duplicate.
        let second = model
            .set_attribute(elem, AttributeMatcher::ByName, None, "n1", None, "v2")
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(model.attributes(elem).len(), 1);
        assert_eq!(model.node_value(first), Some("v2"));
    }

    #[test]
    fn test_set_attribute_qname_distinguishes_namespaces() {
        let mut model = Model::new();
        let elem = element(&mut model, "e");
        let ns_a = Some("http://a.example");
        let ns_b = Some("http://b.example");

        model
            .set_attribute(elem, AttributeMatcher::ByQName, ns_a, "id", Some("a"), "1")
            .unwrap();
        model
            .set_attribute(elem, AttributeMatcher::ByQName, ns_b, "id", Some("b"), "2")
            .unwrap();
        assert_eq!(model.attributes(elem).len(), 2);

        let found = model
            .get_attribute(elem, AttributeMatcher::ByQName, ns_a, "id")
            .unwrap()
            .unwrap();
        assert_eq!(model.node_value(found), Some("1"));
    }

    #[test]
    fn test_namespace_declaration_matcher_upserts_by_prefix() {
        let mut model = Model::new();
        let elem = element(&mut model, "e");

        model
            .set_attribute(
                elem,
                AttributeMatcher::NamespaceDeclaration,
                None,
                "p",
                None,
                "http://one.example",
            )
            .unwrap();
        model
            .set_attribute(
                elem,
                AttributeMatcher::NamespaceDeclaration,
                None,
                "p",
                None,
                "http://two.example",
            )
            .unwrap();
        assert_eq!(model.attributes(elem).len(), 1);
        assert_eq!(
            model.lookup_namespace_uri(elem, "p").as_deref(),
            Some("http://two.example")
        );
    }

    #[test]
    fn test_attribute_chain_order_and_last() {
        let mut model = Model::new();
        let elem = element(&mut model, "e");
        let a = model
            .set_attribute(elem, AttributeMatcher::ByName, None, "a", None, "1")
            .unwrap();
        let b = model
            .set_attribute(elem, AttributeMatcher::ByName, None, "b", None, "2")
            .unwrap();
        let c = model
            .set_attribute(elem, AttributeMatcher::ByName, None, "c", None, "3")
            .unwrap();
        assert_eq!(model.attributes(elem), vec![a, b, c]);
        assert_eq!(model.first_attribute(elem), Some(a));
        assert_eq!(model.last_attribute(elem), Some(c));
        assert_eq!(model.owner_element(b), Some(elem));
    }

    #[test]
    fn test_remove_attribute_from_middle_of_chain() {
        let mut model = Model::new();
        let elem = element(&mut model, "e");
        let sem = Semantics::default();
        let a = model
            .set_attribute(elem, AttributeMatcher::ByName, None, "a", None, "1")
            .unwrap();
        let b = model
            .set_attribute(elem, AttributeMatcher::ByName, None, "b", None, "2")
            .unwrap();
        let c = model
            .set_attribute(elem, AttributeMatcher::ByName, None, "c", None, "3")
            .unwrap();

        assert!(model
            .remove_attribute(elem, AttributeMatcher::ByName, None, "b", &sem)
            .unwrap());
        assert_eq!(model.attributes(elem), vec![a, c]);
        assert_eq!(model.owner_element(b), None);
        assert_eq!(model.next_attribute(b), None);

        assert!(!model
            .remove_attribute(elem, AttributeMatcher::ByName, None, "missing", &sem)
            .unwrap());
    }

    #[test]
    fn test_append_attribute_moves_between_elements() {
        let mut model = Model::new();
        let e1 = element(&mut model, "e1");
        let e2 = element(&mut model, "e2");
        let attr = model
            .set_attribute(e1, AttributeMatcher::ByName, None, "x", None, "v")
            .unwrap();

        model.append_attribute(e2, attr).unwrap();
        assert!(model.attributes(e1).is_empty());
        assert_eq!(model.attributes(e2), vec![attr]);
        assert_eq!(model.owner_element(attr), Some(e2));
    }

    #[test]
    fn test_lookup_namespace_uri_walks_ancestors() {
        let mut model = Model::new();
        let outer = element(&mut model, "outer");
        let inner = element(&mut model, "inner");
        model
            .append_child(outer, inner, &Semantics::default())
            .unwrap();
        model
            .set_attribute(
                outer,
                AttributeMatcher::NamespaceDeclaration,
                None,
                "p",
                None,
                "http://outer.example",
            )
            .unwrap();

        assert_eq!(
            model.lookup_namespace_uri(inner, "p").as_deref(),
            Some("http://outer.example")
        );
        assert_eq!(model.lookup_namespace_uri(inner, "q"), None);
        // Unbound default namespace resolves to the empty URI.
        assert_eq!(model.lookup_namespace_uri(inner, "").as_deref(), Some(""));
    }

    #[test]
    fn test_lookup_prefix_respects_masking() {
        let mut model = Model::new();
        let outer = element(&mut model, "outer");
        let inner = element(&mut model, "inner");
        model
            .append_child(outer, inner, &Semantics::default())
            .unwrap();
        model
            .set_attribute(
                outer,
                AttributeMatcher::NamespaceDeclaration,
                None,
                "p",
                None,
                "http://one.example",
            )
            .unwrap();
        assert_eq!(
            model.lookup_prefix(inner, "http://one.example").as_deref(),
            Some("p")
        );

        // Rebinding p on the inner element masks the inherited binding.
        model
            .set_attribute(
                inner,
                AttributeMatcher::NamespaceDeclaration,
                None,
                "p",
                None,
                "http://other.example",
            )
            .unwrap();
        assert_eq!(model.lookup_prefix(inner, "http://one.example"), None);
    }
}
