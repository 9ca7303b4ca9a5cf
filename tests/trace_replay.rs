// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! Replays an editing trace through the document and checks the result
//! against the final text a real editor session produced, then pushes the
//! whole history through the serialization round trip.

use serde::Deserialize;

use tandem::crdt::doc::Document;

/// One step of an editing trace: delete `delete` characters at `index`,
/// then type `insert` there.
#[derive(Debug, Clone, Deserialize)]
struct TraceEdit {
    index: u32,
    delete: u32,
    insert: String,
}

const TRACE: &str = r#"[
    {"index": 0,  "delete": 0, "insert": "hello world"},
    {"index": 0,  "delete": 0, "insert": "say: "},
    {"index": 5,  "delete": 5, "insert": "howdy"},
    {"index": 10, "delete": 6, "insert": "!"},
    {"index": 4,  "delete": 1, "insert": " 🦀"}
]"#;

const FINAL_TEXT: &str = "say: 🦀howdy!";

fn replay(trace: &[TraceEdit]) -> Document {
    let actor = "aaaaaaaaaaaaaaaa";
    let mut doc = Document::new();
    for edit in trace {
        for _ in 0..edit.delete {
            doc.remove(actor, edit.index).unwrap();
        }
        for (i, c) in edit.insert.char_indices() {
            doc.insert(actor, edit.index + i as u32, c).unwrap();
        }
    }
    return doc;
}

#[test]
fn trace_replays_to_the_recorded_text() {
    let trace: Vec<TraceEdit> = serde_json::from_str(TRACE).unwrap();
    let doc = replay(&trace);
    assert_eq!(doc.to_string(), FINAL_TEXT);
}

#[test]
fn replayed_trace_round_trips() {
    let trace: Vec<TraceEdit> = serde_json::from_str(TRACE).unwrap();
    let doc = replay(&trace);

    let mut bytes = Vec::new();
    doc.write_to(&mut bytes).unwrap();

    let mut loaded = Document::load(&bytes).unwrap();
    assert_eq!(loaded.to_string(), FINAL_TEXT);

    loaded.prepare_to_edit().unwrap();
    assert_eq!(loaded.to_string(), FINAL_TEXT);

    let mut again = Vec::new();
    loaded.write_to(&mut again).unwrap();
    assert_eq!(again, bytes);
}
