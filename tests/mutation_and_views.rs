//! Mutation, attribute upserts, cursors, and cloning exercised against
//! lazily built trees rather than fully programmatic ones.

use oxiom::parser::PullParser;
use oxiom::tree::{
    AttributeMatcher, Axis, BuildState, DeepClone, ElementMatcher, Model, NodeCursor, NodeFilter,
    NodeId, NodeKind, NodeType, Semantics, ShallowClone,
};
use oxiom::ModelError;

fn attach(model: &mut Model, text: &'static str) -> NodeId {
    model
        .attach_source(Box::new(PullParser::new(text)))
        .unwrap()
}

fn collect(model: &mut Model, mut cursor: NodeCursor) -> Vec<NodeId> {
    let mut out = Vec::new();
    while cursor.has_next(model).unwrap() {
        out.push(cursor.next(model).unwrap());
    }
    out
}

#[test]
fn test_set_attribute_upserts_on_parsed_element() {
    let mut model = Model::new();
    let doc = attach(&mut model, r#"<r existing="old"/>"#);
    let r = model.document_element(doc).unwrap().unwrap();

    model
        .set_attribute(r, AttributeMatcher::ByName, None, "n1", None, "v1")
        .unwrap();
    assert_eq!(model.attributes(r).len(), 2);

    // Same name again: the existing node is updated, not duplicated.
    model
        .set_attribute(r, AttributeMatcher::ByName, None, "n1", None, "v2")
        .unwrap();
    assert_eq!(model.attributes(r).len(), 2);
    assert_eq!(
        model
            .attribute_value(r, AttributeMatcher::ByName, None, "n1")
            .unwrap()
            .as_deref(),
        Some("v2")
    );
    assert_eq!(
        model
            .attribute_value(r, AttributeMatcher::ByName, None, "existing")
            .unwrap()
            .as_deref(),
        Some("old")
    );
}

#[test]
fn test_append_into_partially_built_container_builds_first() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><a/><b/></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    let a = model.first_child(r).unwrap().unwrap();
    assert_eq!(model.state(r), BuildState::Incomplete);

    // The append lands after <b/>, which is still in the stream.
    let extra = model.create_node(NodeKind::element(None, "extra", None));
    model
        .append_child(r, extra, &Semantics::default())
        .unwrap();
    assert_eq!(model.state(r), BuildState::Complete);

    let b = model.next_sibling(a).unwrap().unwrap();
    assert_eq!(model.local_name(b), Some("b"));
    assert_eq!(model.next_sibling(b).unwrap(), Some(extra));
    assert_eq!(model.last_child(r).unwrap(), Some(extra));
}

#[test]
fn test_append_is_idempotent_for_current_last_child() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><a/><b/></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    let b = model.last_child(r).unwrap().unwrap();

    model.append_child(r, b, &Semantics::default()).unwrap();
    assert_eq!(model.last_child(r).unwrap(), Some(b));
    let cursor = model.nodes(r, Axis::Children, NodeFilter::Any);
    assert_eq!(collect(&mut model, cursor).len(), 2);
}

#[test]
fn test_cycle_rejection_leaves_tree_unmodified() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><inner><leaf/></inner></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    let inner = model.first_child(r).unwrap().unwrap();
    let leaf = model.first_child(inner).unwrap().unwrap();

    let err = model.append_child(leaf, r, &Semantics::default()).unwrap_err();
    assert!(matches!(err, ModelError::CyclicRelationship));
    assert_eq!(model.parent(r), Some(doc));
    assert_eq!(model.parent(leaf), Some(inner));
}

#[test]
fn test_move_children_between_documents_with_live_stream() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<envelope><a/><b/><c/></envelope>");
    let envelope = model.first_child(doc).unwrap().unwrap();
    let a = model.first_child(envelope).unwrap().unwrap();

    // Transplant into a programmatic replacement container while <b/> and
    // <c/> are still unparsed; they must land in the replacement.
    let replacement = model.create_node(NodeKind::element(None, "replacement", None));
    model
        .move_children_from(replacement, envelope, &Semantics::default())
        .unwrap();
    assert_eq!(model.state(envelope), BuildState::Discarded);

    model.build(replacement).unwrap();
    let cursor = model.nodes(replacement, Axis::Children, NodeFilter::Any);
    let names: Vec<_> = collect(&mut model, cursor)
        .into_iter()
        .map(|id| model.local_name(id).unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(model.parent(a), Some(replacement));
}

#[test]
fn test_cursor_builds_lazily_while_iterating() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><a/>text<b/><c/></r>");
    let r = model.first_child(doc).unwrap().unwrap();

    let mut cursor = model.elements(r, Axis::Children, ElementMatcher::Any);
    let mut names = Vec::new();
    while cursor.has_next(&mut model).unwrap() {
        let id = cursor.next(&mut model).unwrap();
        names.push(model.local_name(id).unwrap().to_string());
    }
    assert_eq!(names, vec!["a", "b", "c"]);
    // Iteration drove the container to completion.
    assert_eq!(model.state(r), BuildState::Complete);
}

#[test]
fn test_cursor_remove_mid_iteration_over_parsed_tree() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><keep1/><drop/><keep2/></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    let sem = Semantics::default();

    let mut cursor = model.elements(
        r,
        Axis::Children,
        ElementMatcher::ByLocalName("drop".to_string()),
    );
    let drop = cursor.next(&mut model).unwrap();
    cursor.remove(&mut model, &sem).unwrap();
    assert_eq!(model.parent(drop), None);

    let cursor = model.nodes(r, Axis::Children, NodeFilter::Any);
    let names: Vec<_> = collect(&mut model, cursor)
        .into_iter()
        .map(|id| model.local_name(id).unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["keep1", "keep2"]);
}

#[test]
fn test_descendant_cursor_finds_nested_matches() {
    let mut model = Model::new();
    let doc = attach(
        &mut model,
        "<catalog><group><item id=\"1\"/></group><item id=\"2\"/></catalog>",
    );
    let catalog = model.first_child(doc).unwrap().unwrap();

    let cursor = model.elements(
        catalog,
        Axis::Descendants,
        ElementMatcher::ByLocalName("item".to_string()),
    );
    let items = collect(&mut model, cursor);
    let ids: Vec<_> = items
        .into_iter()
        .map(|id| {
            model
                .attribute_value(id, AttributeMatcher::ByName, None, "id")
                .unwrap()
                .unwrap()
        })
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[test]
fn test_shallow_clone_of_parsed_subtree() {
    let mut model = Model::new();
    let doc = attach(
        &mut model,
        r#"<top a="1" b="2"><mid><leaf>text</leaf></mid></top>"#,
    );
    let top = model.document_element(doc).unwrap().unwrap();

    let clone = model.clone_node(&ShallowClone, top, None).unwrap();
    assert_eq!(model.first_child(clone).unwrap(), None);
    assert_eq!(model.attributes(clone).len(), 2);
    assert_eq!(
        model
            .attribute_value(clone, AttributeMatcher::ByName, None, "b")
            .unwrap()
            .as_deref(),
        Some("2")
    );
}

#[test]
fn test_deep_clone_of_parsed_subtree_has_distinct_identities() {
    let mut model = Model::new();
    let doc = attach(
        &mut model,
        r#"<top a="1"><mid><leaf>text</leaf></mid></top>"#,
    );
    let top = model.document_element(doc).unwrap().unwrap();

    let clone = model.clone_node(&DeepClone, top, None).unwrap();
    let orig_mid = model.first_child(top).unwrap().unwrap();
    let clone_mid = model.first_child(clone).unwrap().unwrap();
    assert_ne!(orig_mid, clone_mid);
    assert_eq!(model.local_name(clone_mid), Some("mid"));
    assert_eq!(model.text_content(clone).unwrap(), "text");
    assert_eq!(model.text_content(top).unwrap(), "text");
}

#[test]
fn test_character_data_round_trip_through_compact() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><slot><old/></slot></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    let slot = model.first_child(r).unwrap().unwrap();
    let sem = Semantics::default();

    model.set_character_data(slot, "payload", &sem).unwrap();
    assert_eq!(model.state(slot), BuildState::Compact);
    assert_eq!(model.text_content(slot).unwrap(), "payload");

    // Materialize and collapse again; nothing is lost or duplicated.
    let text = model.first_child(slot).unwrap().unwrap();
    assert_eq!(model.node_value(text), Some("payload"));
    model.set_character_data(slot, "payload", &sem).unwrap();
    assert_eq!(model.text_content(slot).unwrap(), "payload");
}

#[test]
fn test_strict_semantics_reject_parsed_node_reuse() {
    let mut model = Model::new();
    let doc = attach(&mut model, "<r><child/></r>");
    let r = model.first_child(doc).unwrap().unwrap();
    let child = model.first_child(r).unwrap().unwrap();

    let other = model.create_node(NodeKind::element(None, "other", None));
    let err = model
        .append_child(other, child, &Semantics::strict())
        .unwrap_err();
    assert!(matches!(err, ModelError::NodeInUse));
    assert_eq!(model.parent(child), Some(r));
}

#[test]
fn test_import_from_parsed_model() {
    let mut source = Model::new();
    let doc = attach(&mut source, r#"<item id="7"><name>widget</name></item>"#);
    let item = source.document_element(doc).unwrap().unwrap();
    source.build_deep(item).unwrap();

    let mut dest = Model::new();
    let copy = dest.import(&source, item);
    assert_eq!(dest.local_name(copy), Some("item"));
    assert_eq!(
        dest.attribute_value(copy, AttributeMatcher::ByName, None, "id")
            .unwrap()
            .as_deref(),
        Some("7")
    );
    assert_eq!(dest.text_content(copy).unwrap(), "widget");
    assert_eq!(dest.node_type(copy), NodeType::Element);
}
