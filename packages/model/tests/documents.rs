use outliner_model::{
    count_nodes, transform_for_persistence, transform_for_runtime, SerializedDocument,
    SerializedNode,
};
use serde_json::json;

#[test]
fn persisted_json_survives_runtime_round_trip() {
    let persisted = json!({
        "root": {
            "type": "root",
            "version": 1,
            "children": [{
                "type": "list",
                "version": 1,
                "listType": "bullet",
                "children": [{
                    "type": "listitem",
                    "version": 1,
                    "noteId": "a",
                    "folded": true,
                    "children": [
                        { "type": "text", "version": 1, "text": "see " },
                        { "type": "note-link", "version": 1, "noteId": "b" },
                        { "type": "note-link", "version": 1, "noteId": "z", "docId": "elsewhere" }
                    ]
                }]
            }]
        }
    });

    let document = SerializedDocument::from_value(&persisted).unwrap();
    let runtime = transform_for_runtime(&document, "doc-1");
    let runtime_json = runtime.to_value();
    assert_eq!(
        runtime_json["root"]["children"][0]["children"][0]["children"][1]["docId"],
        json!("doc-1")
    );

    let back = transform_for_persistence(&runtime, "doc-1");
    assert_eq!(back.to_value(), persisted);
}

#[test]
fn deep_chain_transforms_and_drops() {
    const DEPTH: usize = 12_000;
    let mut list = SerializedNode::list(vec![SerializedNode::note_link("leaf", None)]);
    for _ in 0..DEPTH {
        list = SerializedNode::list(vec![SerializedNode::new("listitem").with_children(vec![list])]);
    }
    let document = SerializedDocument::new(SerializedNode::root(vec![list]));

    let runtime = transform_for_runtime(&document, "doc-1");
    let persisted = transform_for_persistence(&runtime, "doc-1");
    assert_eq!(count_nodes(&persisted.root), count_nodes(&document.root));
    assert_eq!(count_nodes(&document.root), 2 * DEPTH + 3);
}

/// `depth` notes, each nested under the previous one
fn nested_notes(depth: usize) -> SerializedDocument {
    let mut items = vec![SerializedNode::note(Some(&format!("n{depth}")), "leaf")];
    for level in (0..depth).rev() {
        items = vec![
            SerializedNode::note(Some(&format!("n{level}")), "branch"),
            SerializedNode::wrapper(items),
        ];
    }
    SerializedDocument::from_items(items)
}

#[test]
fn deep_outline_json_text_round_trip() {
    const DEPTH: usize = 12_000;
    let document = nested_notes(DEPTH);

    let json = document.to_json_string().unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&json).is_err());

    let back = SerializedDocument::from_json_str(&json).unwrap();
    assert_eq!(count_nodes(&back.root), count_nodes(&document.root));
    assert_eq!(back.root.note_ids().len(), DEPTH + 1);
    assert!(back.root.note_ids().contains(&format!("n{DEPTH}")));

    let pretty = back.to_json_string_pretty().unwrap();
    let again = SerializedDocument::from_json_str(&pretty).unwrap();
    assert_eq!(count_nodes(&again.root), count_nodes(&document.root));
}

#[test]
fn value_conversion_handles_deep_outlines() {
    let document = nested_notes(100);
    let value = document.to_value();
    let back = SerializedDocument::from_value(&value).unwrap();
    assert_eq!(count_nodes(&back.root), count_nodes(&document.root));
    assert_eq!(back, document);
}
