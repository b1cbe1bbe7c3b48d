//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use homscan::enrich::homology_sweep;
use homscan::filter::{apply_chain, standard_filters};
use homscan::record::Match;

fn synthetic_matches(n: u32) -> Vec<Match> {
    let organisms = ["ANaesl", "AVisc", "AIsrael", "Treponema"];
    (0..n)
        .map(|i| Match {
            id: i / 3,
            name: organisms[(i % 4) as usize].to_string(),
            pattern: "CTCCTCGGCGGG".repeat(1 + (i % 3) as usize),
            forwards: i % 2 == 0,
            full_match: "-".to_string(),
            seqs: i % 5,
            num_here: i % 7,
            strict_num_here: i % 5,
            pos: 100 + (i % 29000),
            src_pos: i,
            in_human: i % 11 == 0,
            in_wh1: i % 13 == 0,
            forwards_h: i % 6,
            backwards_h: (i / 2) % 4,
            score: 0.0,
            e_value: 0.25,
            he_value: 1.0,
        })
        .collect()
}

fn benchmark_filter_chain(c: &mut Criterion) {
    let records = synthetic_matches(10_000);
    let filters = standard_filters();

    c.bench_function("filter_10k_matches", |b| {
        b.iter(|| {
            let kept = apply_chain(black_box(records.clone()), &filters);
            black_box(kept.kept.len());
        });
    });
}

fn benchmark_homology_sweep(c: &mut Criterion) {
    let records = synthetic_matches(10_000);

    c.bench_function("sweep_10k_matches", |b| {
        b.iter(|| {
            let rows = homology_sweep(black_box(&records), &[], Some("ANaesl")).unwrap();
            black_box(rows);
        });
    });
}

criterion_group!(benches, benchmark_filter_chain, benchmark_homology_sweep);
criterion_main!(benches);
