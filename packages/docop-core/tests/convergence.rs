use docop_core::{
    ArrayOperation, DocumentAdapter, MapDocument, ObjectOperation, Path, TextOperation,
    TransformOptions,
};
use serde_json::json;

/// Apply `first` then `second` to a fresh copy of `doc`.
fn apply_both(doc: &MapDocument, first: &ObjectOperation, second: &ObjectOperation) -> MapDocument {
    let mut out = doc.clone();
    first.apply(&mut out).unwrap();
    second.apply(&mut out).unwrap();
    out
}

/// Assert the convergence law and return the converged document:
/// `apply(b', apply(a, S)) == apply(a', apply(b, S))`.
fn converge(doc: &MapDocument, a: &ObjectOperation, b: &ObjectOperation) -> MapDocument {
    let (a2, b2) = ObjectOperation::transform(a, b, TransformOptions::default()).unwrap();
    let ab = apply_both(doc, a, &b2);
    let ba = apply_both(doc, b, &a2);
    assert_eq!(ab, ba);
    ab
}

fn doc_with_content(content: &str) -> MapDocument {
    let mut doc = MapDocument::new();
    ObjectOperation::create(["p1"], json!({"id": "p1", "content": content}))
        .unwrap()
        .apply(&mut doc)
        .unwrap();
    doc
}

#[test]
fn concurrent_text_inserts_converge() {
    let doc = doc_with_content("Lorem ipsum");
    let a = ObjectOperation::update(["p1", "content"], TextOperation::insert(6, "bla ")).unwrap();
    let b =
        ObjectOperation::update(["p1", "content"], TextOperation::insert(11, " blupp")).unwrap();
    let merged = converge(&doc, &a, &b);
    assert_eq!(
        merged.get(&Path::from(["p1", "content"])).unwrap(),
        json!("Lorem bla ipsum blupp")
    );
}

#[test]
fn concurrent_array_edits_converge() {
    let mut doc = MapDocument::new();
    ObjectOperation::create(["p1"], json!({"id": "p1", "items": [1, 2, 4]}))
        .unwrap()
        .apply(&mut doc)
        .unwrap();
    let a = ObjectOperation::update(["p1", "items"], ArrayOperation::insert(2, json!(3))).unwrap();
    let b = ObjectOperation::update(["p1", "items"], ArrayOperation::delete(0, json!(1))).unwrap();
    let merged = converge(&doc, &a, &b);
    assert_eq!(
        merged.get(&Path::from(["p1", "items"])).unwrap(),
        json!([2, 3, 4])
    );
}

#[test]
fn node_delete_against_nested_update_converges() {
    let doc = doc_with_content("Lorem ipsum");
    let a = ObjectOperation::delete(["p1"], json!({"id": "p1", "content": "Lorem ipsum"})).unwrap();
    let b = ObjectOperation::update(["p1", "content"], TextOperation::insert(0, "x")).unwrap();
    let merged = converge(&doc, &a, &b);
    // the update side wins: the node is recreated with the edit applied
    assert_eq!(
        merged.get(&Path::from(["p1"])).unwrap(),
        json!({"id": "p1", "content": "xLorem ipsum"})
    );

    // flipped argument order: the delete side wins
    let merged = converge(&doc, &b, &a);
    assert!(merged.get(&Path::from(["p1"])).is_err());
}

#[test]
fn node_delete_against_nested_create_converges() {
    let doc = doc_with_content("Lorem ipsum");
    let a = ObjectOperation::delete(["p1"], json!({"id": "p1", "content": "Lorem ipsum"})).unwrap();
    let b = ObjectOperation::create(["p1", "tags"], json!(["x"])).unwrap();
    let merged = converge(&doc, &a, &b);
    // the create side wins: the node is recreated with the new property
    assert_eq!(
        merged.get(&Path::from(["p1"])).unwrap(),
        json!({"id": "p1", "content": "Lorem ipsum", "tags": ["x"]})
    );

    // flipped argument order: the delete side wins
    let merged = converge(&doc, &b, &a);
    assert!(merged.get(&Path::from(["p1"])).is_err());
}

#[test]
fn node_delete_against_nested_delete_converges() {
    let doc = doc_with_content("Lorem ipsum");
    let a = ObjectOperation::delete(["p1"], json!({"id": "p1", "content": "Lorem ipsum"})).unwrap();
    let b = ObjectOperation::delete(["p1", "content"], json!("Lorem ipsum")).unwrap();
    let merged = converge(&doc, &a, &b);
    assert_eq!(merged.get(&Path::from(["p1"])).unwrap(), json!({"id": "p1"}));
}

#[test]
fn concurrent_sets_converge_on_the_right_value() {
    let doc = doc_with_content("Lorem ipsum");
    let a = ObjectOperation::set(["p1", "content"], json!("Lorem ipsum"), json!("one")).unwrap();
    let b = ObjectOperation::set(["p1", "content"], json!("Lorem ipsum"), json!("two")).unwrap();
    let merged = converge(&doc, &a, &b);
    assert_eq!(
        merged.get(&Path::from(["p1", "content"])).unwrap(),
        json!("two")
    );
}

#[test]
fn operations_on_distinct_nodes_commute() {
    let mut doc = doc_with_content("Lorem ipsum");
    ObjectOperation::create(["p2"], json!({"id": "p2", "content": "abc"}))
        .unwrap()
        .apply(&mut doc)
        .unwrap();
    let a = ObjectOperation::update(["p1", "content"], TextOperation::insert(0, "x")).unwrap();
    let b = ObjectOperation::update(["p2", "content"], TextOperation::delete(0, "ab")).unwrap();
    let merged = converge(&doc, &a, &b);
    assert_eq!(
        merged.get(&Path::from(["p1", "content"])).unwrap(),
        json!("xLorem ipsum")
    );
    assert_eq!(merged.get(&Path::from(["p2", "content"])).unwrap(), json!("c"));
}

#[test]
fn overlapping_text_deletes_converge() {
    let doc = doc_with_content("abcdefgh");
    let a = ObjectOperation::update(["p1", "content"], TextOperation::delete(0, "abcd")).unwrap();
    let b = ObjectOperation::update(["p1", "content"], TextOperation::delete(2, "cdef")).unwrap();
    let merged = converge(&doc, &a, &b);
    assert_eq!(merged.get(&Path::from(["p1", "content"])).unwrap(), json!("gh"));
}
