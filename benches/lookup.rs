use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kelime_rs::{Lang, Resolver, Store};

fn seeded_store() -> Store {
    let store = Store::open_in_memory().expect("in-memory store");
    for i in 0..2_000 {
        let id = store
            .insert_word(&format!("kelime{i}"), &format!("word{i}"))
            .expect("seed word");
        store
            .insert_example(id, Lang::Tr, &format!("Bu {i}. kelime."))
            .expect("seed example");
    }
    store.insert_word("ev", "house").expect("seed word");
    store
}

fn bench_exact_lookups(c: &mut Criterion) {
    let resolver = Resolver::new(seeded_store());
    const QUERIES: &[&str] = &["ev", "HOUSE", "kelime1500", "word42"];
    for &query in QUERIES {
        c.bench_with_input(BenchmarkId::new("exact_lookup", query), &query, |b, &query| {
            b.iter(|| black_box(resolver.resolve(query).expect("lookup")));
        });
    }
}

fn bench_suggestions(c: &mut Criterion) {
    let resolver = Resolver::new(seeded_store());
    const QUERIES: &[&str] = &["keli", "ord19", "zzz"];
    for &query in QUERIES {
        c.bench_with_input(BenchmarkId::new("suggestions", query), &query, |b, &query| {
            b.iter(|| black_box(resolver.resolve(query).expect("lookup")));
        });
    }
}

criterion_group!(benches, bench_exact_lookups, bench_suggestions);
criterion_main!(benches);
