//! End-to-end tests for on-demand tree construction from the pull parser:
//! partial materialization, build-state transitions, discard, and failure
//! tainting.

use oxiom::parser::PullParser;
use oxiom::tree::{BuildState, Model, NodeId, NodeType};
use oxiom::ModelError;

fn attach(model: &mut Model, text: &'static str) -> NodeId {
    model
        .attach_source(Box::new(PullParser::new(text)))
        .unwrap()
}

fn realized_children(model: &mut Model, parent: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut child = model.first_child_if_available(parent);
    while let Some(id) = child {
        out.push(id);
        child = model.next_sibling_if_available(id);
    }
    out
}

#[test]
fn test_first_child_realizes_exactly_one_child() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<a><b>x</b><c/></a>");
    let a = model.first_child(doc).unwrap().unwrap();
    assert_eq!(model.local_name(a), Some("a"));

    let b = model.first_child(a).unwrap().unwrap();
    assert_eq!(model.local_name(b), Some("b"));
    assert_eq!(model.state(a), BuildState::Incomplete);
    // <c> is still in the stream.
    assert_eq!(realized_children(&mut model, a), vec![b]);

    model.build(a).unwrap();
    assert_eq!(model.state(a), BuildState::Complete);
    let children = realized_children(&mut model, a);
    assert_eq!(children.len(), 2);
    assert_eq!(model.local_name(children[0]), Some("b"));
    assert_eq!(model.local_name(children[1]), Some("c"));
}

#[test]
fn test_children_appear_in_stream_order() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><one/><two/><three/><four/></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    model.build(r).unwrap();
    let names: Vec<_> = realized_children(&mut model, r)
        .into_iter()
        .map(|id| model.local_name(id).unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["one", "two", "three", "four"]);
}

#[test]
fn test_build_is_idempotent_and_never_duplicates() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><a/><b/></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    model.build(r).unwrap();
    let first_pass = realized_children(&mut model, r);

    // Building an already complete container changes nothing.
    model.build(r).unwrap();
    model.build(r).unwrap();
    assert_eq!(realized_children(&mut model, r), first_pass);
    assert_eq!(first_pass.len(), 2);
}

#[test]
fn test_states_are_monotonic_once_terminal() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><a/><b/></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    assert!(matches!(
        model.state(r),
        BuildState::Incomplete | BuildState::AttributesPending
    ));
    model.build_deep(doc).unwrap();
    assert_eq!(model.state(doc), BuildState::Complete);
    assert_eq!(model.state(r), BuildState::Complete);

    // Navigation over a complete tree never flips it back.
    let a = model.first_child(r).unwrap().unwrap();
    model.next_sibling(a).unwrap();
    model.build(r).unwrap();
    assert_eq!(model.state(r), BuildState::Complete);
}

#[test]
fn test_navigation_past_last_child_completes_container() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><only/></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    let only = model.first_child(r).unwrap().unwrap();
    // Asking for the sibling after the final child must consume the end
    // event and complete the parent, not hang on an exhausted stream.
    assert_eq!(model.next_sibling(only).unwrap(), None);
    assert_eq!(model.state(r), BuildState::Complete);
}

#[test]
fn test_discard_drains_and_blocks_further_access() {
    let mut model = Model::new();
    let doc = attach(
        &mut model,
        "<r><skip><deep><deeper>text</deeper></deep></skip><keep/></r>",
    );
    let r = model.first_child(doc).unwrap().unwrap();
    let skip = model.first_child(r).unwrap().unwrap();

    model.discard(skip, true).unwrap();
    assert_eq!(model.state(skip), BuildState::Discarded);
    assert!(realized_children(&mut model, skip).is_empty());
    assert!(matches!(
        model.first_child(skip),
        Err(ModelError::NodeConsumed)
    ));
    assert!(matches!(model.build(skip), Err(ModelError::NodeConsumed)));

    // The sibling after the discarded subtree is intact.
    let keep = model.next_sibling(skip).unwrap().unwrap();
    assert_eq!(model.local_name(keep), Some("keep"));
}

#[test]
fn test_malformed_input_fails_on_build_not_on_attach() {
    let mut model = Model::new();
    // The mismatched end tag is deep in the stream; attaching and touching
    // the healthy part works fine.
    let doc = attach(&mut model, "<r><ok/><broken></oops></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    let ok = model.first_child(r).unwrap().unwrap();
    assert_eq!(model.local_name(ok), Some("ok"));

    let err = model.build(r).unwrap_err();
    assert!(matches!(err, ModelError::DeferredParsing(_)));
    let cause = err.parse_error().unwrap();
    assert!(cause.message.contains("mismatched end tag"));
}

#[test]
fn test_build_failure_taints_subtree_permanently() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><a>");
    let r = model.first_child(doc).unwrap().unwrap();

    let first = model.build(r).unwrap_err();
    let second = model.build(r).unwrap_err();
    let third = model.first_child(r).map(|_| ()).unwrap_err();
    for err in [&second, &third] {
        assert_eq!(
            first.parse_error().unwrap().message,
            err.parse_error().unwrap().message
        );
    }
}

#[test]
fn test_document_declaration_metadata_is_recorded() {
    let mut model = Model::new();
    let doc = attach(
        &mut model,
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><r/>",
    );
    let oxiom::NodeKind::Document {
        version,
        encoding,
        standalone,
        ..
    } = model.kind(doc)
    else {
        panic!("expected a document node");
    };
    assert_eq!(version.as_deref(), Some("1.0"));
    assert_eq!(encoding.as_deref(), Some("UTF-8"));
    assert_eq!(*standalone, Some(true));
}

#[test]
fn test_prolog_nodes_are_materialized_in_order() {
    let mut model = Model::new();
    let doc = attach(
        &mut model,
        "<!-- head --><!DOCTYPE r SYSTEM \"r.dtd\"><?pi data?><r/>",
    );
    model.build(doc).unwrap();
    let kinds: Vec<_> = realized_children(&mut model, doc)
        .into_iter()
        .map(|id| model.node_type(id))
        .collect();
    assert_eq!(
        kinds,
        vec![
            NodeType::Comment,
            NodeType::DocumentType,
            NodeType::ProcessingInstruction,
            NodeType::Element,
        ]
    );
}

#[test]
fn test_text_only_elements_stay_compact_until_poked() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><msg>hello</msg></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    let msg = model.first_child(r).unwrap().unwrap();
    model.build(msg).unwrap();
    assert_eq!(model.state(msg), BuildState::Compact);
    assert_eq!(model.text_content(msg).unwrap(), "hello");
    assert_eq!(model.state(msg), BuildState::Compact);

    // Demanding a real child materializes exactly one text node.
    let text = model.first_child(msg).unwrap().unwrap();
    assert_eq!(model.state(msg), BuildState::Complete);
    assert_eq!(model.node_value(text), Some("hello"));
    assert_eq!(model.next_sibling(text).unwrap(), None);
}
