//! Criterion benchmarks for the cleaner hot paths.
//!
//! Benchmarks:
//! 1. Weight string normalization
//! 2. Full product cleaner over a synthetic CSV-shaped record set
//! 3. Full user cleaner, including date and phone normalization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use retailhub_core::clean::{clean_products, clean_users, parse_weight_kg};
use retailhub_core::{RawRecord, RecordSet};

// ── Helpers ──────────────────────────────────────────────────────────

const WEIGHTS: [&str; 6] = ["1.6kg", "3 x 400g", "500ml", "16oz", "77g .", "9GO9NZ5JTL"];

fn synthetic_uuid(i: usize) -> String {
    format!("00000000-0000-4000-8000-{i:012x}")
}

fn make_products(n: usize) -> RecordSet {
    (0..n)
        .map(|i| {
            let idx = i.to_string();
            let code = format!("P{i}-000000x");
            let uuid = synthetic_uuid(i);
            let price = format!("£{}.99", i % 200);
            RawRecord::from_pairs([
                ("", Some(idx.as_str())),
                ("product_name", Some("Synthetic product")),
                ("product_price", Some(price.as_str())),
                ("weight", Some(WEIGHTS[i % WEIGHTS.len()])),
                ("category", Some("homeware")),
                ("EAN", Some("7425710935115")),
                ("date_added", Some("2005-12-02")),
                ("uuid", Some(uuid.as_str())),
                ("removed", Some(if i % 3 == 0 { "Removed" } else { "Still_available" })),
                ("product_code", Some(code.as_str())),
            ])
        })
        .collect()
}

fn make_users(n: usize) -> RecordSet {
    const DOBS: [&str; 4] = ["1968-10-16", "January 1951 27", "1990/03/04", "not-a-date"];
    (0..n)
        .map(|i| {
            let uuid = synthetic_uuid(i);
            RawRecord::from_pairs([
                ("first_name", Some("Sigfried")),
                ("last_name", Some("Noack")),
                ("date_of_birth", Some(DOBS[i % DOBS.len()])),
                ("company", Some("Heydrich Junitz KG")),
                ("email_address", Some("rudi79@winkler.de")),
                ("address", Some("Zimmerstr. 1/0\n59015 Gießen")),
                ("country", Some("Germany")),
                ("country_code", Some(if i % 5 == 0 { "GGB" } else { "DE" })),
                ("phone_number", Some("+49(0) 047905356")),
                ("join_date", Some("2018-10-10")),
                ("user_uuid", Some(uuid.as_str())),
            ])
        })
        .collect()
}

// ── 1. Weights ───────────────────────────────────────────────────────

fn bench_weights(c: &mut Criterion) {
    c.bench_function("parse_weight_kg/mixed", |b| {
        b.iter(|| {
            for w in WEIGHTS {
                black_box(parse_weight_kg(black_box(w)));
            }
        })
    });
}

// ── 2-3. Cleaners ────────────────────────────────────────────────────

fn bench_cleaners(c: &mut Criterion) {
    let mut group = c.benchmark_group("cleaners");
    for n in [1_000usize, 10_000] {
        let products = make_products(n);
        group.bench_with_input(BenchmarkId::new("products", n), &products, |b, raw| {
            b.iter(|| clean_products(black_box(raw)))
        });
        let users = make_users(n);
        group.bench_with_input(BenchmarkId::new("users", n), &users, |b, raw| {
            b.iter(|| clean_users(black_box(raw)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_weights, bench_cleaners);
criterion_main!(benches);
