use criterion::{black_box, criterion_group, criterion_main, Criterion};
use outliner_model::{NoteIdGenerator, SerializedDocument, SerializedNode as N};
use outliner_schema::{validate, Normalizer};

/// 500 top-level notes, each with three children
fn wide_document() -> SerializedDocument {
    let mut items = Vec::new();
    for i in 0..500 {
        items.push(N::note(Some(&format!("n{i}")), "parent"));
        items.push(N::wrapper(
            (0..3)
                .map(|j| N::note(Some(&format!("n{i}-{j}")), "child"))
                .collect(),
        ));
    }
    SerializedDocument::from_items(items)
}

/// A single chain of nested notes
fn deep_document(depth: usize) -> SerializedDocument {
    let mut node = N::note(Some("leaf"), "leaf");
    for level in (0..depth).rev() {
        node = N::wrapper(vec![N::note(Some(&format!("d{level}")), ""), node]);
    }
    SerializedDocument::from_items(vec![N::note(Some("top"), "top"), node])
}

/// Wide document where every other note repeats an id
fn damaged_document() -> SerializedDocument {
    let items = (0..1000)
        .map(|i| N::note(Some(&format!("n{}", i / 2)), "text"))
        .collect();
    SerializedDocument::from_items(items)
}

fn validate_wide(c: &mut Criterion) {
    let document = wide_document();
    c.bench_function("validate_wide", |b| b.iter(|| validate(black_box(&document))));
}

fn validate_deep(c: &mut Criterion) {
    let document = deep_document(2_000);
    c.bench_function("validate_deep", |b| b.iter(|| validate(black_box(&document))));
}

fn normalize_damaged(c: &mut Criterion) {
    let document = damaged_document();
    c.bench_function("normalize_damaged", |b| {
        b.iter(|| {
            let mut generator = NoteIdGenerator::seeded(7);
            Normalizer::new(&mut generator).run(black_box(&document))
        })
    });
}

criterion_group!(benches, validate_wide, validate_deep, normalize_damaged);
criterion_main!(benches);
