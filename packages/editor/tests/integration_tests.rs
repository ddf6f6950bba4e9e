//! Integration tests for editor crate

use outliner_editor::{
    Command, Document, DocumentOptions, EditSession, EditorError, Key, KeyChord, Mutation,
    SessionConfig,
};
use outliner_model::{NoteIdGenerator, SerializedDocument, SerializedNode as N};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn persisted() -> Value {
    json!({
        "root": {
            "type": "root",
            "version": 1,
            "children": [{
                "type": "list",
                "version": 1,
                "listType": "bullet",
                "children": [
                    {
                        "type": "listitem",
                        "version": 1,
                        "noteId": "plan",
                        "children": [{ "type": "text", "version": 1, "text": "Plan" }]
                    },
                    {
                        "type": "listitem",
                        "version": 1,
                        "children": [{
                            "type": "list",
                            "version": 1,
                            "listType": "bullet",
                            "children": [{
                                "type": "listitem",
                                "version": 1,
                                "noteId": "step",
                                "children": [
                                    { "type": "text", "version": 1, "text": "see " },
                                    { "type": "note-link", "version": 1, "noteId": "plan" },
                                    { "type": "note-link", "version": 1, "noteId": "x", "docId": "other" }
                                ]
                            }]
                        }]
                    }
                ]
            }]
        }
    })
}

fn load(value: &Value) -> Document {
    Document::load_with(value, "doc-1", DocumentOptions::default(), NoteIdGenerator::seeded(1))
        .unwrap()
}

#[test]
fn test_document_lifecycle() {
    let mut doc = load(&persisted());
    assert_eq!(doc.version(), 0);
    assert!(doc.load_repairs().is_empty());

    let inserted = doc
        .update(|txn| {
            let result = txn.apply(Mutation::InsertFirstChild {
                parent: "step".into(),
                text: "detail".into(),
            })?;
            txn.apply(Mutation::SetChecked {
                note_id: "step".into(),
                checked: Some(false),
            })?;
            Ok(result.note_id)
        })
        .unwrap()
        .unwrap();
    assert_eq!(doc.version(), 1);
    assert!(doc.validate().is_empty());

    let saved = doc.to_persisted();
    let reloaded = load(&saved);
    assert!(reloaded.load_repairs().is_empty());
    let outline = reloaded.outline();
    let step = outline.find_by_note_id("step").unwrap();
    let children: Vec<&str> = outline
        .logical_children(step)
        .into_iter()
        .filter_map(|child| outline.note_id(child))
        .collect();
    assert_eq!(children, vec![inserted.as_str()]);
    let step = &saved["root"]["children"][0]["children"][1]["children"][0]["children"][0];
    assert_eq!(step["checked"], json!(false));
}

#[test]
fn test_links_keep_persisted_form() {
    let doc = load(&persisted());

    let runtime = doc.to_serialized().to_value();
    let inline = &runtime["root"]["children"][0]["children"][1]["children"][0]["children"][0]["children"];
    assert_eq!(inline[1]["docId"], json!("doc-1"));
    assert_eq!(inline[2]["docId"], json!("other"));

    assert_eq!(doc.to_persisted(), persisted());
}

#[test]
fn test_load_repairs_then_edits() {
    let document = SerializedDocument::from_items(vec![
        N::wrapper(vec![N::note(Some("orphan"), "hoisted")]),
        N::note(None, "no id"),
        N::note(Some("orphan"), "duplicate"),
    ]);
    let mut doc = load(&document.to_value());
    assert_eq!(doc.load_repairs().len(), 3);
    assert!(doc.validate().is_empty());
    assert_eq!(doc.outline().note_ids().len(), 3);

    doc.apply(Mutation::IndentNote {
        note_id: "orphan".into(),
    })
    .unwrap_err();
    assert_eq!(doc.version(), 0);
}

#[test]
fn test_mutation_serialization() {
    let mutation = Mutation::SetChecked {
        note_id: "plan".into(),
        checked: None,
    };
    let value = serde_json::to_value(&mutation).unwrap();
    assert_eq!(value, json!({ "type": "setChecked", "noteId": "plan", "checked": null }));

    let parsed: Mutation =
        serde_json::from_value(json!({ "type": "insertNoteAfter", "after": "plan", "text": "x" }))
            .unwrap();
    assert_eq!(parsed.target(), Some("plan"));
}

#[test]
fn test_mutation_sequence_keeps_outline_valid() {
    let mut doc = Document::new("doc-1", DocumentOptions { validate_on_commit: true });
    let mut ids = Vec::new();
    for i in 0..6 {
        let result = doc
            .apply(Mutation::AppendTopLevel {
                text: format!("note {i}"),
            })
            .unwrap();
        ids.push(result.note_id.unwrap());
    }

    for id in &ids[1..4] {
        doc.apply(Mutation::IndentNote { note_id: id.clone() }).unwrap();
        assert!(doc.validate().is_empty());
    }
    doc.apply(Mutation::OutdentNote { note_id: ids[2].clone() }).unwrap();
    assert!(doc.validate().is_empty());

    let removed = doc
        .apply(Mutation::RemoveNote { note_id: ids[0].clone() })
        .unwrap()
        .removed;
    assert_eq!(removed, vec![ids[0].clone(), ids[1].clone()]);
    assert!(doc.validate().is_empty());

    let order: Vec<&str> = doc
        .outline()
        .content_items()
        .filter_map(|item| doc.outline().note_id(item))
        .collect();
    let expected: Vec<&str> = ids[2..].iter().map(String::as_str).collect();
    assert_eq!(order, expected);
}

#[test]
fn test_edit_session_workflow() {
    let doc = load(&persisted());
    let mut session = EditSession::new("client-1", doc, &SessionConfig::default()).unwrap();

    session.set_caret("step", 0).unwrap();
    session.handle_key(KeyChord::shift(Key::Tab)).unwrap();
    let outline = session.outline();
    assert_eq!(outline.top_level_items().len(), 2);
    assert!(session.document().validate().is_empty());

    session.set_caret("plan", 0).unwrap();
    session.handle_key(KeyChord::plain(Key::ArrowDown)).unwrap();
    session.handle_key(KeyChord::shift(Key::ArrowDown)).unwrap();
    session.handle_key(KeyChord::shift(Key::ArrowDown)).unwrap();
    assert_eq!(
        session.selection().head_note_ids(session.outline()),
        vec!["step"]
    );

    session.execute(Command::ExtendSelectionUp).unwrap();
    assert_eq!(
        session.selection().head_note_ids(session.outline()),
        vec!["plan", "step"]
    );
    assert!(matches!(
        session.zoom_to("missing"),
        Err(EditorError::NoteNotFound(_))
    ));
}
