//! Estimator benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pagemark_core::document::ContentNode;
use pagemark_core::types::{PathStep, Position, SpineDocument, SpineEntry};
use pagemark_core::estimate;

/// A body of `sections` divs, each holding `paragraphs` paragraphs of mixed inline text
fn chapter(sections: usize, paragraphs: usize) -> ContentNode {
    let mut body = ContentNode::new("body");
    for s in 0..sections {
        let mut div = ContentNode::new("div").with_id(format!("s{}", s));
        for _ in 0..paragraphs {
            let p = ContentNode::new("p")
                .with_text("Lorem ipsum dolor sit amet, ")
                .with_child(ContentNode::new("em").with_text("consectetur").with_tail(" adipiscing elit."));
            div = div.with_child(p);
        }
        body = body.with_child(div);
    }
    body
}

fn estimate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate");

    for chapters in [1usize, 10, 50] {
        let trees: Vec<ContentNode> = (0..chapters).map(|_| chapter(20, 20)).collect();
        let spine = SpineDocument::new(
            trees
                .iter()
                .enumerate()
                .map(|(i, t)| SpineEntry::new(format!("c{}.xhtml", i), t.text_len() as u64))
                .collect(),
        );
        // deep inside the last chapter
        let position = Position::new(
            chapters - 1,
            vec![
                PathStep::new(2),
                PathStep::new(4),
                PathStep::new(32),
                PathStep::new(30),
                PathStep::new(2),
                PathStep::new(1),
            ],
        )
        .with_offset(5);

        group.bench_with_input(BenchmarkId::from_parameter(chapters), &chapters, |b, _| {
            b.iter(|| estimate(&spine, trees.as_slice(), std::hint::black_box(&position)))
        });
    }

    group.finish();
}

criterion_group!(benches, estimate_benchmark);
criterion_main!(benches);
