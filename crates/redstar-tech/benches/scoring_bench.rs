use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use redstar_tech::{Category, PlayerStore, ScoringEngine, TechCatalog, WeightSet, WeightTable};

fn setup() -> (ScoringEngine, PlayerStore) {
    let catalog = Arc::new(TechCatalog::standard());

    // Every tech weighted 1..=12 so any level up to 12 scores
    let points: Vec<i64> = (1..=12).collect();
    let mut weights = WeightSet::new();
    for name in ["base", "201206", "210918"] {
        let mut table = WeightTable::new(name);
        for key in catalog.keys() {
            table = table.with(key, &points);
        }
        weights.insert(table.with("relics", &points));
    }

    let mut players = PlayerStore::new(Arc::clone(&catalog));
    for pilot in 0..50u32 {
        let id = pilot.to_string();
        for (offset, key) in catalog.keys().enumerate() {
            let level = (pilot + u32::try_from(offset).unwrap_or(0)) % 7;
            players.tech_set(&id, key, level);
        }
        players.tech_set(&id, "miner", 5);
        players.tech_set(&id, "battleship", 6);
    }
    assert_eq!(catalog.range_of(Category::Support).len(), 22);

    (ScoringEngine::new(catalog, weights), players)
}

fn bench_flat(c: &mut Criterion) {
    let (engine, players) = setup();

    c.bench_function("score_flat_50", |b| {
        b.iter(|| {
            for (_, player) in players.iter() {
                black_box(engine.score(black_box(player), "base", false));
            }
        });
    });
}

fn bench_capped(c: &mut Criterion) {
    let (engine, players) = setup();

    c.bench_function("score_capped_50", |b| {
        b.iter(|| {
            for (_, player) in players.iter() {
                black_box(engine.score(black_box(player), "210918", false));
            }
        });
    });
}

fn bench_capped_detail(c: &mut Criterion) {
    let (engine, players) = setup();

    c.bench_function("score_capped_detail_50", |b| {
        b.iter(|| {
            for (_, player) in players.iter() {
                black_box(engine.score(black_box(player), "201206", true));
            }
        });
    });
}

criterion_group!(benches, bench_flat, bench_capped, bench_capped_detail);
criterion_main!(benches);
