// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! Quick single-run benchmark for development iteration.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use tandem::crdt::doc::Document;

const EDITS: u32 = 50_000;

fn synthetic_session(seed: u64) -> Document {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut doc = Document::new();
    for _ in 0..EDITS {
        let len = doc.len();
        if len > 0 && rng.gen_bool(0.3) {
            let pos = rng.gen_range(0..len);
            doc.remove("bench", pos).unwrap();
        } else {
            let pos = if len == 0 { 0 } else { rng.gen_range(0..=len) };
            let c = (b'a' + rng.gen_range(0..26)) as char;
            doc.insert("bench", pos, c).unwrap();
        }
    }
    return doc;
}

fn main() {
    let start = Instant::now();
    let doc = synthetic_session(42);
    let edit_time = start.elapsed();
    println!(
        "edits:     {} ops in {:>8.2?} ({:.0} ops/sec), {} bytes of text",
        EDITS,
        edit_time,
        EDITS as f64 / edit_time.as_secs_f64(),
        doc.len(),
    );

    let start = Instant::now();
    let text = doc.to_string();
    println!("render:    {} bytes in {:>8.2?}", text.len(), start.elapsed());

    let mut bytes = Vec::new();
    let start = Instant::now();
    doc.write_to(&mut bytes).unwrap();
    let save_time = start.elapsed();
    println!(
        "serialize: {} bytes in {:>8.2?} ({:.1} bytes/edit)",
        bytes.len(),
        save_time,
        bytes.len() as f64 / EDITS as f64,
    );

    let start = Instant::now();
    let mut loaded = Document::load(&bytes).unwrap();
    let load_time = start.elapsed();
    let start = Instant::now();
    loaded.prepare_to_edit().unwrap();
    let prepare_time = start.elapsed();
    println!("load:      {:>8.2?}, prepare: {:>8.2?}", load_time, prepare_time);

    assert_eq!(loaded.to_string(), text);
}
