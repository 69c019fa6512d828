//! The builder adapter: materializes structural events into tree nodes.
//!
//! A builder binds an [`XmlSource`] to the arena. For every container still
//! being produced there is a context record holding the *target* — the
//! container that receives newly parsed children. The target is a plain
//! node id and can be reassigned (tree-merge operations retarget it), so
//! content parsed later lands in a different container than the one that
//! originally requested building.
//!
//! Each context is in one of three modes: *building* (events become nodes),
//! *pass-through* (events are forwarded verbatim to an external sink, never
//! materialized), or *discarding* (events are dropped). Pass-through and
//! discard track their own element depth so nested content never creates
//! nested contexts.
//!
//! The first parse failure taints the builder permanently: every later
//! attempt to advance re-reports the same failure instead of touching the
//! spent source again.

use crate::error::{ModelError, ParseError};
use crate::stream::{StreamEvent, XmlSink, XmlSource};
use crate::tree::{
    BuildState, BuilderId, ContextId, Model, NodeId, NodeKind, NodeName,
};

/// How a context treats incoming events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContextMode {
    /// Construct nodes and append them to the target.
    Building,
    /// Forward events to the sink passed into the advancing call.
    PassThrough,
    /// Drop events.
    Discarding,
}

/// Per-container parse context.
#[derive(Debug)]
pub(crate) struct ContextData {
    pub(crate) builder: BuilderId,
    pub(crate) parent: Option<ContextId>,
    /// The container receiving newly parsed children. Reassignable.
    pub(crate) target: Option<NodeId>,
    /// The first character data seen in a fresh container, held back so a
    /// text-only container can collapse straight into the compact state.
    pub(crate) pending_text: Option<String>,
    pub(crate) mode: ContextMode,
    /// Element nesting depth while in pass-through or discard mode.
    pub(crate) skip_depth: u32,
    /// Child context slot, reused across siblings.
    pub(crate) nested: Option<ContextId>,
}

/// One registered builder: the event source plus its context stack.
pub(crate) struct BuilderData {
    pub(crate) source: Box<dyn XmlSource>,
    pub(crate) current_context: Option<ContextId>,
    pub(crate) document: Option<NodeId>,
    pub(crate) done: bool,
    pub(crate) failure: Option<ParseError>,
}

impl Model {
    /// Registers a streaming source with the model and advances it just far
    /// enough to materialize the document node, which is returned.
    ///
    /// Everything below the document is built lazily: content is pulled
    /// from the source only as navigation, mutation, or serialization
    /// demands it.
    ///
    /// # Errors
    ///
    /// [`ModelError::DeferredParsing`] if the source fails before the
    /// document node exists.
    ///
    /// # Examples
    ///
    /// ```
    /// use oxiom::parser::PullParser;
    /// use oxiom::tree::{BuildState, Model};
    ///
    /// let mut model = Model::new();
    /// let doc = model
    ///     .attach_source(Box::new(PullParser::new("<root/>")))
    ///     .unwrap();
    /// assert_eq!(model.state(doc), BuildState::Incomplete);
    /// ```
    pub fn attach_source(
        &mut self,
        source: Box<dyn XmlSource>,
    ) -> Result<NodeId, ModelError> {
        let builder = BuilderId(u32::try_from(self.builders.len()).unwrap_or(u32::MAX));
        let root_context = ContextId(u32::try_from(self.contexts.len()).unwrap_or(u32::MAX));
        self.contexts.push(ContextData {
            builder,
            parent: None,
            target: None,
            pending_text: None,
            mode: ContextMode::Building,
            skip_depth: 0,
            nested: None,
        });
        self.builders.push(BuilderData {
            source,
            current_context: Some(root_context),
            document: None,
            done: false,
            failure: None,
        });
        loop {
            if let Some(document) = self.builders[builder.as_index()].document {
                return Ok(document);
            }
            if self.builders[builder.as_index()].done {
                return Err(ModelError::DeferredParsing(ParseError::new(
                    "event stream ended before a document was started",
                    Default::default(),
                )));
            }
            self.builder_next(builder, &mut crate::stream::NullSink)?;
        }
    }

    /// Returns whether the builder behind this container has consumed its
    /// entire stream.
    #[must_use]
    pub fn builder_completed(&self, container: NodeId) -> bool {
        match self.input_context(container) {
            Some(context) => {
                let builder = self.contexts[context.as_index()].builder;
                self.builders[builder.as_index()].done
            }
            None => true,
        }
    }

    /// Switches a partially built container into pass-through mode: its
    /// remaining events are no longer materialized into nodes but forwarded
    /// to whatever sink the advancing call supplies. The container counts
    /// as consumed from this point on.
    ///
    /// # Errors
    ///
    /// [`ModelError::NoBuilder`] if the container has no pending input
    /// context.
    pub fn disable_caching(&mut self, container: NodeId) -> Result<(), ModelError> {
        let Some(context) = self.input_context(container) else {
            return Err(ModelError::NoBuilder);
        };
        self.contexts[context.as_index()].mode = ContextMode::PassThrough;
        self.set_state(container, BuildState::Discarding);
        Ok(())
    }

    /// Switches a pass-through container back into caching mode, so that
    /// remaining events are materialized into nodes again. Content that was
    /// already passed through is gone; only what arrives from here on is
    /// cached.
    ///
    /// # Errors
    ///
    /// [`ModelError::NoBuilder`] if the container has no pending input
    /// context.
    pub fn reenable_caching(&mut self, container: NodeId) -> Result<(), ModelError> {
        let Some(context) = self.input_context(container) else {
            return Err(ModelError::NoBuilder);
        };
        self.contexts[context.as_index()].mode = ContextMode::Building;
        self.set_state(container, BuildState::Incomplete);
        Ok(())
    }

    /// Puts a context into discard mode and marks its target as
    /// discarding. Remaining events for the subtree are dropped as the
    /// builder encounters them.
    pub(crate) fn context_discard(&mut self, context: ContextId) {
        if let Some(target) = self.contexts[context.as_index()].target {
            self.set_state(target, BuildState::Discarding);
        }
        self.contexts[context.as_index()].mode = ContextMode::Discarding;
    }

    /// Advances the builder by exactly one event, dispatching it to the
    /// active context. Events from pass-through contexts go to `sink`.
    ///
    /// # Errors
    ///
    /// The builder's recorded failure if it is tainted,
    /// [`ModelError::BuilderComplete`] if the stream was already fully
    /// consumed, or a fresh [`ModelError::DeferredParsing`] if the source
    /// fails on this advance (which taints the builder).
    pub(crate) fn builder_next(
        &mut self,
        builder: BuilderId,
        sink: &mut dyn XmlSink,
    ) -> Result<(), ModelError> {
        let data = &mut self.builders[builder.as_index()];
        if let Some(failure) = &data.failure {
            return Err(ModelError::DeferredParsing(failure.clone()));
        }
        if data.done {
            return Err(ModelError::BuilderComplete);
        }
        let event = match data.source.next_event() {
            Ok(Some(event)) => event,
            Ok(None) => {
                let failure = ParseError::new(
                    "event stream ended inside unterminated content",
                    Default::default(),
                );
                data.failure = Some(failure.clone());
                return Err(ModelError::DeferredParsing(failure));
            }
            Err(failure) => {
                data.failure = Some(failure.clone());
                return Err(ModelError::DeferredParsing(failure));
            }
        };
        self.handle_event(builder, event, sink)
    }

    fn handle_event(
        &mut self,
        builder: BuilderId,
        event: StreamEvent,
        sink: &mut dyn XmlSink,
    ) -> Result<(), ModelError> {
        let Some(context) = self.builders[builder.as_index()].current_context else {
            // A spurious event after completion; the stream is out of step.
            return Err(ModelError::BuilderComplete);
        };
        match self.contexts[context.as_index()].mode {
            ContextMode::Building => self.handle_building(builder, context, event),
            ContextMode::PassThrough => self.handle_skipping(builder, context, event, Some(sink)),
            ContextMode::Discarding => self.handle_skipping(builder, context, event, None),
        }
    }

    fn handle_building(
        &mut self,
        builder: BuilderId,
        context: ContextId,
        event: StreamEvent,
    ) -> Result<(), ModelError> {
        if self.contexts[context.as_index()].target.is_none()
            && !matches!(event, StreamEvent::StartDocument { .. })
        {
            // A fragment stream with no document event; synthesize one so
            // the content has a root to land in.
            self.start_document(builder, context, None, None, None, None);
        }
        match event {
            StreamEvent::StartDocument {
                version,
                encoding,
                standalone,
                input_encoding,
            } => {
                self.start_document(
                    builder,
                    context,
                    version,
                    encoding,
                    standalone,
                    input_encoding,
                );
            }
            StreamEvent::DocumentTypeDeclaration {
                root_name,
                public_id,
                system_id,
                internal_subset,
            } => {
                let node = self.create_node(NodeKind::DocumentType {
                    root_name,
                    public_id,
                    system_id,
                    internal_subset,
                });
                self.context_add_child(context, node);
            }
            StreamEvent::StartElement {
                namespace_uri,
                local_name,
                prefix,
            } => {
                let element = self.create_node(NodeKind::Element {
                    name: NodeName::Qualified {
                        namespace_uri,
                        local_name,
                        prefix,
                    },
                });
                self.context_add_child(context, element);
                let child_context = self.push_context(builder, context, element);
                self.set_input_context(element, Some(child_context));
                self.set_state(element, BuildState::AttributesPending);
                self.builders[builder.as_index()].current_context = Some(child_context);
            }
            StreamEvent::Attribute {
                namespace_uri,
                local_name,
                prefix,
                value,
            } => {
                let target = self.context_target(context);
                let attr = self.create_node(NodeKind::Attribute {
                    name: NodeName::Qualified {
                        namespace_uri,
                        local_name,
                        prefix,
                    },
                    value,
                    specified: true,
                });
                self.append_attribute_internal(target, attr);
            }
            StreamEvent::NamespaceDeclaration {
                prefix,
                namespace_uri,
            } => {
                let target = self.context_target(context);
                let decl = self.create_node(NodeKind::NamespaceDeclaration {
                    prefix,
                    namespace_uri,
                });
                self.append_attribute_internal(target, decl);
            }
            StreamEvent::AttributesCompleted => {
                let target = self.context_target(context);
                self.set_state(target, BuildState::Incomplete);
            }
            StreamEvent::CharacterData { data, ignorable } => {
                let target = self.context_target(context);
                let fresh = !ignorable
                    && self.contexts[context.as_index()].pending_text.is_none()
                    && self.first_child_if_available(target).is_none();
                if fresh {
                    self.contexts[context.as_index()].pending_text = Some(data);
                } else {
                    let node = self.create_node(NodeKind::Text {
                        content: data,
                        ignorable,
                    });
                    self.context_add_child(context, node);
                }
            }
            StreamEvent::CDataSection { data } => {
                let node = self.create_node(NodeKind::CData { content: data });
                self.context_add_child(context, node);
            }
            StreamEvent::Comment { data } => {
                let node = self.create_node(NodeKind::Comment { content: data });
                self.context_add_child(context, node);
            }
            StreamEvent::ProcessingInstruction { target, data } => {
                let node = self.create_node(NodeKind::ProcessingInstruction { target, data });
                self.context_add_child(context, node);
            }
            StreamEvent::EntityReference {
                name,
                replacement_text,
            } => {
                let node = self.create_node(NodeKind::EntityReference {
                    name,
                    replacement_text,
                });
                self.context_add_child(context, node);
            }
            StreamEvent::EndElement => {
                self.end_context(builder, context)?;
            }
            StreamEvent::EndDocument => {
                self.end_context(builder, context)?;
                self.builders[builder.as_index()].current_context = None;
                self.builders[builder.as_index()].done = true;
            }
        }
        Ok(())
    }

    /// Pass-through and discard share one shape: forward (or drop) events,
    /// tracking element depth, until the end event of the context's own
    /// container arrives.
    fn handle_skipping(
        &mut self,
        builder: BuilderId,
        context: ContextId,
        event: StreamEvent,
        sink: Option<&mut dyn XmlSink>,
    ) -> Result<(), ModelError> {
        let closes_container = match &event {
            StreamEvent::StartElement { .. } => {
                self.contexts[context.as_index()].skip_depth += 1;
                false
            }
            StreamEvent::EndElement => {
                if self.contexts[context.as_index()].skip_depth == 0 {
                    true
                } else {
                    self.contexts[context.as_index()].skip_depth -= 1;
                    false
                }
            }
            StreamEvent::EndDocument => true,
            _ => false,
        };
        let ended = matches!(event, StreamEvent::EndDocument);
        if let Some(sink) = sink {
            sink.event(event).map_err(ModelError::Stream)?;
        }
        if closes_container {
            if let Some(target) = self.contexts[context.as_index()].target {
                // Discarding -> Discarded (or no-op for an already reset
                // container).
                self.set_input_context(target, None);
            }
            let parent = self.contexts[context.as_index()].parent;
            self.contexts[context.as_index()].target = None;
            self.contexts[context.as_index()].mode = ContextMode::Building;
            self.contexts[context.as_index()].skip_depth = 0;
            self.builders[builder.as_index()].current_context = parent;
            if ended {
                self.builders[builder.as_index()].current_context = None;
                self.builders[builder.as_index()].done = true;
            }
        }
        Ok(())
    }

    fn start_document(
        &mut self,
        builder: BuilderId,
        context: ContextId,
        version: Option<String>,
        encoding: Option<String>,
        standalone: Option<bool>,
        input_encoding: Option<String>,
    ) {
        let document = self.create_node(NodeKind::Document {
            version,
            encoding,
            standalone,
            input_encoding,
        });
        self.contexts[context.as_index()].target = Some(document);
        self.set_input_context(document, Some(context));
        self.builders[builder.as_index()].document = Some(document);
    }

    fn context_target(&self, context: ContextId) -> NodeId {
        self.contexts[context.as_index()]
            .target
            .expect("active context has no target")
    }

    /// Appends a freshly parsed node to the context's target, flushing any
    /// pending character data into a real text node first.
    fn context_add_child(&mut self, context: ContextId, node: NodeId) {
        let target = self.context_target(context);
        if let Some(text) = self.contexts[context.as_index()].pending_text.take() {
            let flushed = self.create_node(NodeKind::Text {
                content: text,
                ignorable: false,
            });
            self.append_child_without_build(target, flushed);
        }
        self.append_child_without_build(target, node);
    }

    /// Allocates (or reuses) the nested context slot for a newly started
    /// container.
    fn push_context(
        &mut self,
        builder: BuilderId,
        parent: ContextId,
        target: NodeId,
    ) -> ContextId {
        if let Some(nested) = self.contexts[parent.as_index()].nested {
            let slot = &mut self.contexts[nested.as_index()];
            slot.target = Some(target);
            slot.pending_text = None;
            slot.mode = ContextMode::Building;
            slot.skip_depth = 0;
            return nested;
        }
        let id = ContextId(u32::try_from(self.contexts.len()).unwrap_or(u32::MAX));
        self.contexts.push(ContextData {
            builder,
            parent: Some(parent),
            target: Some(target),
            pending_text: None,
            mode: ContextMode::Building,
            skip_depth: 0,
            nested: None,
        });
        self.contexts[parent.as_index()].nested = Some(id);
        id
    }

    /// Finishes a building context: completes its target, collapsing
    /// held-back text into the compact state, and pops to the parent
    /// context.
    fn end_context(&mut self, builder: BuilderId, context: ContextId) -> Result<(), ModelError> {
        if let Some(target) = self.contexts[context.as_index()].target {
            self.set_input_context(target, None);
            if let Some(text) = self.contexts[context.as_index()].pending_text.take() {
                self.set_character_data(target, &text, &crate::tree::Semantics::default())?;
            }
        }
        self.contexts[context.as_index()].target = None;
        let parent = self.contexts[context.as_index()].parent;
        self.builders[builder.as_index()].current_context = parent;
        Ok(())
    }
}
