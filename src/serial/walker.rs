//! The serialization dispatcher.
//!
//! A [`TreeWalker`] turns a subtree back into the structural event
//! vocabulary, one event per step. Nodes already in memory are replayed as
//! events without touching the underlying stream; when a consuming walk
//! reaches a container whose remaining content has not been built, it
//! switches that container into pass-through mode and forwards raw builder
//! events straight to the sink.
//!
//! Pass-through consumes its input: a subtree serialized that way is left
//! consumed, and walking it again fails with a consumed-node error. A
//! preserving walk builds instead of passing through and can be repeated.

use std::collections::VecDeque;

use crate::error::ModelError;
use crate::stream::{StreamEvent, XmlSink};
use crate::tree::{
    BuildState, BuilderId, Content, Model, NodeId, NodeKind, NodeType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkerState {
    NotStarted,
    /// About to deliver the start of this node.
    Entering(NodeId),
    /// Children handled; about to deliver the end of this container.
    Leaving(NodeId),
    /// Forwarding raw builder events for this container until its end
    /// event has been consumed.
    PassThrough {
        container: NodeId,
        builder: BuilderId,
    },
    Disposed,
    Finished,
}

/// A one-pass event generator over a subtree.
///
/// Each [`proceed`](TreeWalker::proceed) call delivers exactly one event to
/// the sink. A *preserving* walker builds unrealized content into the tree
/// as it goes and leaves the tree intact; a *consuming* walker forwards
/// unrealized content to the sink in pass-through mode, leaving those
/// subtrees consumed.
///
/// # Examples
///
/// ```
/// use oxiom::parser::PullParser;
/// use oxiom::serial::TreeWalker;
/// use oxiom::stream::EventCollector;
/// use oxiom::tree::Model;
///
/// let mut model = Model::new();
/// let doc = model
///     .attach_source(Box::new(PullParser::new("<a><b/></a>")))
///     .unwrap();
/// let mut sink = EventCollector::new();
/// let mut walker = TreeWalker::preserving(doc);
/// while walker.proceed(&mut model, &mut sink).unwrap() {}
/// assert_eq!(sink.events.len(), 8);
/// ```
#[derive(Debug)]
pub struct TreeWalker {
    root: NodeId,
    preserve: bool,
    state: WalkerState,
    queue: VecDeque<StreamEvent>,
}

impl TreeWalker {
    /// Creates a walker that replays and, where needed, builds — the tree
    /// is left fully intact and can be walked again.
    #[must_use]
    pub fn preserving(root: NodeId) -> Self {
        Self::new(root, true)
    }

    /// Creates a walker that forwards not-yet-built content in pass-through
    /// mode. Subtrees serialized that way are consumed and cannot be walked
    /// or built afterwards.
    #[must_use]
    pub fn consuming(root: NodeId) -> Self {
        Self::new(root, false)
    }

    fn new(root: NodeId, preserve: bool) -> Self {
        Self {
            root,
            preserve,
            state: WalkerState::NotStarted,
            queue: VecDeque::new(),
        }
    }

    /// Returns `true` once the walk has delivered its final event.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == WalkerState::Finished && self.queue.is_empty()
    }

    /// Delivers the next event to `sink`. Returns `Ok(false)` once the walk
    /// is complete.
    ///
    /// # Errors
    ///
    /// [`ModelError::NodeConsumed`] when the walk reaches a discarded
    /// subtree or the walker was disposed, [`ModelError::DeferredParsing`]
    /// if the underlying stream fails, and [`ModelError::Stream`] if the
    /// sink rejects an event.
    pub fn proceed(
        &mut self,
        model: &mut Model,
        sink: &mut dyn XmlSink,
    ) -> Result<bool, ModelError> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                sink.event(event).map_err(ModelError::Stream)?;
                return Ok(true);
            }
            match self.state {
                WalkerState::Finished => return Ok(false),
                WalkerState::Disposed => return Err(ModelError::NodeConsumed),
                WalkerState::NotStarted => {
                    self.state = WalkerState::Entering(self.root);
                }
                WalkerState::Entering(node) => self.enter(model, node)?,
                WalkerState::Leaving(node) => self.leave(model, node)?,
                WalkerState::PassThrough { container, builder } => {
                    model.builder_next(builder, sink)?;
                    if model.state(container) == BuildState::Discarded {
                        self.state = self.after(model, container)?;
                    }
                    return Ok(true);
                }
            }
        }
    }

    /// Drives the walk to completion.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`proceed`](TreeWalker::proceed).
    pub fn run(&mut self, model: &mut Model, sink: &mut dyn XmlSink) -> Result<(), ModelError> {
        while self.proceed(model, sink)? {}
        Ok(())
    }

    /// Abandons the walk. For a consuming walker, the input contexts of the
    /// partially serialized ancestors are put into discard mode so the tree
    /// is left in a consistent, consumed state rather than half-walked.
    /// Disposing a preserving walker just ends it; the tree is untouched.
    pub fn dispose(&mut self, model: &mut Model) {
        if !self.preserve {
            let mut node = match self.state {
                WalkerState::Entering(n) | WalkerState::Leaving(n) => Some(n),
                WalkerState::PassThrough { container, .. } => Some(container),
                _ => None,
            };
            while let Some(n) = node {
                if let Some(context) = model.input_context(n) {
                    model.context_discard(context);
                }
                if n == self.root {
                    break;
                }
                node = model.parent(n);
            }
        }
        self.queue.clear();
        self.state = WalkerState::Disposed;
    }

    /// Queues the start-of-node events and positions the walk on the node's
    /// content.
    fn enter(&mut self, model: &mut Model, node: NodeId) -> Result<(), ModelError> {
        if matches!(
            model.state(node),
            BuildState::Discarding | BuildState::Discarded
        ) {
            return Err(ModelError::NodeConsumed);
        }
        match model.node_type(node) {
            NodeType::Document => {
                if let NodeKind::Document {
                    version,
                    encoding,
                    standalone,
                    input_encoding,
                } = model.kind(node)
                {
                    self.queue.push_back(StreamEvent::StartDocument {
                        version: version.clone(),
                        encoding: encoding.clone(),
                        standalone: *standalone,
                        input_encoding: input_encoding.clone(),
                    });
                }
                self.descend(model, node)?;
            }
            NodeType::Element => {
                // The start tag is only complete once every attribute event
                // has arrived.
                while model.state(node) == BuildState::AttributesPending
                    && model.input_context(node).is_some()
                {
                    model.build_next(node)?;
                }
                if let NodeKind::Element { name } = model.kind(node) {
                    self.queue.push_back(StreamEvent::StartElement {
                        namespace_uri: name.namespace_uri().map(str::to_string),
                        local_name: name.local_name().to_string(),
                        prefix: name.prefix().map(str::to_string),
                    });
                }
                let mut attr = model.first_attribute(node);
                while let Some(id) = attr {
                    self.queue.push_back(attribute_event(model, id));
                    attr = model.next_attribute(id);
                }
                self.queue.push_back(StreamEvent::AttributesCompleted);
                self.descend(model, node)?;
            }
            NodeType::DocumentFragment => self.descend(model, node)?,
            _ => {
                self.queue.push_back(leaf_event(model, node));
                self.state = self.after(model, node)?;
            }
        }
        Ok(())
    }

    /// Positions the walk on a container's first piece of content: the
    /// compact payload, the first child, the builder stream, or straight to
    /// the end event.
    fn descend(&mut self, model: &mut Model, node: NodeId) -> Result<(), ModelError> {
        if model.state(node) == BuildState::Compact {
            if let Content::Compact(payload) = &model.node(node).content {
                self.queue.push_back(StreamEvent::CharacterData {
                    data: payload.clone(),
                    ignorable: false,
                });
            }
            self.state = WalkerState::Leaving(node);
            return Ok(());
        }
        let first = if self.preserve {
            model.first_child(node)?
        } else {
            model.first_child_if_available(node)
        };
        self.state = match first {
            Some(child) => WalkerState::Entering(child),
            None if !self.preserve && model.building(node) => {
                self.begin_pass_through(model, node)?
            }
            None => WalkerState::Leaving(node),
        };
        Ok(())
    }

    /// Queues a container's end event and moves past it.
    fn leave(&mut self, model: &mut Model, node: NodeId) -> Result<(), ModelError> {
        match model.node_type(node) {
            NodeType::Document => self.queue.push_back(StreamEvent::EndDocument),
            NodeType::Element => self.queue.push_back(StreamEvent::EndElement),
            // A fragment has no delimiting events of its own.
            _ => {}
        }
        self.state = self.after(model, node)?;
        Ok(())
    }

    /// Computes the position after `node` has been fully handled.
    fn after(&mut self, model: &mut Model, node: NodeId) -> Result<WalkerState, ModelError> {
        if node == self.root {
            return Ok(WalkerState::Finished);
        }
        let Some(parent) = model.parent(node) else {
            return Ok(WalkerState::Finished);
        };
        let next = if self.preserve {
            model.next_sibling(node)?
        } else {
            model.next_sibling_if_available(node)
        };
        match next {
            Some(sibling) => Ok(WalkerState::Entering(sibling)),
            None if !self.preserve && model.building(parent) => {
                self.begin_pass_through(model, parent)
            }
            None => Ok(WalkerState::Leaving(parent)),
        }
    }

    /// Switches a container into pass-through mode. Its remaining events —
    /// up to and including its own end event — will be forwarded to the
    /// sink by [`proceed`](TreeWalker::proceed).
    fn begin_pass_through(
        &mut self,
        model: &mut Model,
        container: NodeId,
    ) -> Result<WalkerState, ModelError> {
        let context = model.input_context(container).ok_or(ModelError::NoBuilder)?;
        let builder = model.contexts[context.as_index()].builder;
        model.disable_caching(container)?;
        Ok(WalkerState::PassThrough { container, builder })
    }
}

fn attribute_event(model: &Model, attr: NodeId) -> StreamEvent {
    match model.kind(attr) {
        NodeKind::Attribute { name, value, .. } => StreamEvent::Attribute {
            namespace_uri: name.namespace_uri().map(str::to_string),
            local_name: name.local_name().to_string(),
            prefix: name.prefix().map(str::to_string),
            value: value.clone(),
        },
        NodeKind::NamespaceDeclaration {
            prefix,
            namespace_uri,
        } => StreamEvent::NamespaceDeclaration {
            prefix: prefix.clone(),
            namespace_uri: namespace_uri.clone(),
        },
        _ => StreamEvent::AttributesCompleted,
    }
}

fn leaf_event(model: &Model, node: NodeId) -> StreamEvent {
    match model.kind(node) {
        NodeKind::Text { content, ignorable } => StreamEvent::CharacterData {
            data: content.clone(),
            ignorable: *ignorable,
        },
        NodeKind::CData { content } => StreamEvent::CDataSection {
            data: content.clone(),
        },
        NodeKind::Comment { content } => StreamEvent::Comment {
            data: content.clone(),
        },
        NodeKind::ProcessingInstruction { target, data } => {
            StreamEvent::ProcessingInstruction {
                target: target.clone(),
                data: data.clone(),
            }
        }
        NodeKind::EntityReference {
            name,
            replacement_text,
        } => StreamEvent::EntityReference {
            name: name.clone(),
            replacement_text: replacement_text.clone(),
        },
        NodeKind::DocumentType {
            root_name,
            public_id,
            system_id,
            internal_subset,
        } => StreamEvent::DocumentTypeDeclaration {
            root_name: root_name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
            internal_subset: internal_subset.clone(),
        },
        // Attribute and namespace-declaration nodes used as walk roots.
        _ => attribute_event(model, node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PullParser;
    use crate::stream::EventCollector;
    use crate::tree::{NodeKind, Semantics};

    fn attach(model: &mut Model, text: &'static str) -> NodeId {
        model
            .attach_source(Box::new(PullParser::new(text)))
            .unwrap()
    }

    fn walk(model: &mut Model, mut walker: TreeWalker) -> Vec<StreamEvent> {
        let mut sink = EventCollector::new();
        walker.run(model, &mut sink).unwrap();
        sink.events
    }

    fn element_names(events: &[StreamEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::StartElement { local_name, .. } => Some(local_name.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_preserving_walk_replays_full_document() {
        let mut model = Model::new();
        let doc = attach(&mut model, "<a><b>x</b><c/></a>");
        let events = walk(&mut model, TreeWalker::preserving(doc));

        assert!(matches!(events[0], StreamEvent::StartDocument { .. }));
        assert_eq!(element_names(&events), vec!["a", "b", "c"]);
        assert_eq!(events.last(), Some(&StreamEvent::EndDocument));
        // The tree was built, not consumed; a second walk sees the same.
        let again = walk(&mut model, TreeWalker::preserving(doc));
        assert_eq!(events, again);
    }

    #[test]
    fn test_one_event_per_proceed() {
        let mut model = Model::new();
        let doc = attach(&mut model, "<a><b/></a>");
        let mut walker = TreeWalker::preserving(doc);
        let mut sink = EventCollector::new();
        let mut steps = 0;
        while walker.proceed(&mut model, &mut sink).unwrap() {
            steps += 1;
            assert_eq!(sink.events.len(), steps);
        }
        assert!(walker.is_finished());
    }

    #[test]
    fn test_consuming_walk_forwards_unbuilt_content() {
        let mut model = Model::new();
        let doc = attach(&mut model, "<a><b>x</b><c/></a>");
        let before = model.node_count();

        let events = walk(&mut model, TreeWalker::consuming(doc));
        assert_eq!(element_names(&events), vec!["a", "b", "c"]);
        assert_eq!(events.last(), Some(&StreamEvent::EndDocument));
        // Pass-through never materialized nodes for the body.
        assert_eq!(model.node_count(), before);
        assert_eq!(model.state(doc), BuildState::Discarded);
    }

    #[test]
    fn test_consuming_walk_mixes_cached_and_streamed_siblings() {
        let mut model = Model::new();
        let doc = attach(&mut model, "<root><cached/><streamed>x</streamed></root>");
        let root = model.first_child(doc).unwrap().unwrap();
        // Materialize only the first child; the second stays in the stream.
        let cached = model.first_child(root).unwrap().unwrap();
        assert_eq!(model.local_name(cached), Some("cached"));

        let events = walk(&mut model, TreeWalker::consuming(doc));
        assert_eq!(element_names(&events), vec!["root", "cached", "streamed"]);
        let text: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::CharacterData { data, .. } => Some(data.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, vec!["x"]);
    }

    #[test]
    fn test_consumed_subtree_cannot_be_walked_again() {
        let mut model = Model::new();
        let doc = attach(&mut model, "<a><b/></a>");
        walk(&mut model, TreeWalker::consuming(doc));

        let mut walker = TreeWalker::consuming(doc);
        let mut sink = EventCollector::new();
        assert!(matches!(
            walker.proceed(&mut model, &mut sink),
            Err(ModelError::NodeConsumed)
        ));
    }

    #[test]
    fn test_walk_programmatic_subtree() {
        let mut model = Model::new();
        let root = model.create_node(NodeKind::element(None, "root", None));
        let child = model.create_node(NodeKind::element(None, "child", None));
        let sem = Semantics::default();
        model.append_child(root, child, &sem).unwrap();
        model.set_character_data(child, "hi", &sem).unwrap();

        let events = walk(&mut model, TreeWalker::preserving(root));
        assert_eq!(
            events,
            vec![
                StreamEvent::StartElement {
                    namespace_uri: None,
                    local_name: "root".to_string(),
                    prefix: None,
                },
                StreamEvent::AttributesCompleted,
                StreamEvent::StartElement {
                    namespace_uri: None,
                    local_name: "child".to_string(),
                    prefix: None,
                },
                StreamEvent::AttributesCompleted,
                StreamEvent::CharacterData {
                    data: "hi".to_string(),
                    ignorable: false,
                },
                StreamEvent::EndElement,
                StreamEvent::EndElement,
            ]
        );
        // Replaying a compact container does not expand it.
        assert_eq!(model.state(child), BuildState::Compact);
    }

    #[test]
    fn test_walk_fragment_emits_children_only() {
        let mut model = Model::new();
        let frag = model.create_node(NodeKind::DocumentFragment);
        let a = model.create_node(NodeKind::element(None, "a", None));
        let b = model.create_node(NodeKind::element(None, "b", None));
        let sem = Semantics::default();
        model.append_child(frag, a, &sem).unwrap();
        model.append_child(frag, b, &sem).unwrap();

        let events = walk(&mut model, TreeWalker::preserving(frag));
        assert_eq!(events.len(), 6);
        assert_eq!(element_names(&events), vec!["a", "b"]);
    }

    #[test]
    fn test_attribute_and_namespace_events_replayed() {
        let mut model = Model::new();
        let doc = attach(
            &mut model,
            r#"<r xmlns:p="http://p.example" p:id="7" plain="x"/>"#,
        );
        let events = walk(&mut model, TreeWalker::preserving(doc));
        assert!(events.contains(&StreamEvent::NamespaceDeclaration {
            prefix: Some("p".to_string()),
            namespace_uri: "http://p.example".to_string(),
        }));
        assert!(events.contains(&StreamEvent::Attribute {
            namespace_uri: Some("http://p.example".to_string()),
            local_name: "id".to_string(),
            prefix: Some("p".to_string()),
            value: "7".to_string(),
        }));
        assert!(events.contains(&StreamEvent::Attribute {
            namespace_uri: None,
            local_name: "plain".to_string(),
            prefix: None,
            value: "x".to_string(),
        }));
    }

    #[test]
    fn test_dispose_consuming_walk_marks_ancestors_consumed() {
        let mut model = Model::new();
        let doc = attach(&mut model, "<a><b>x</b><c/></a>");
        let mut walker = TreeWalker::consuming(doc);
        let mut sink = EventCollector::new();
        // Deliver a couple of events, then abandon mid-walk.
        walker.proceed(&mut model, &mut sink).unwrap();
        walker.proceed(&mut model, &mut sink).unwrap();
        walker.dispose(&mut model);

        assert!(matches!(
            walker.proceed(&mut model, &mut sink),
            Err(ModelError::NodeConsumed)
        ));
        assert!(matches!(model.build(doc), Err(ModelError::NodeConsumed)));
    }

    #[test]
    fn test_dispose_preserving_walk_leaves_tree_intact() {
        let mut model = Model::new();
        let doc = attach(&mut model, "<a><b/></a>");
        let mut walker = TreeWalker::preserving(doc);
        let mut sink = EventCollector::new();
        walker.proceed(&mut model, &mut sink).unwrap();
        walker.dispose(&mut model);

        model.build_deep(doc).unwrap();
        assert_eq!(model.state(doc), BuildState::Complete);
    }

    #[test]
    fn test_walking_discarded_container_fails() {
        let mut model = Model::new();
        let doc = attach(&mut model, "<a><b/></a>");
        let root = model.first_child(doc).unwrap().unwrap();
        model.discard(root, true).unwrap();

        let mut walker = TreeWalker::preserving(root);
        let mut sink = EventCollector::new();
        assert!(matches!(
            walker.proceed(&mut model, &mut sink),
            Err(ModelError::NodeConsumed)
        ));
    }
}
