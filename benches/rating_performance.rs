//! Performance benchmarks for rating calculations and vote storage

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image_arena::{EloCalculator, InMemoryRatingStore, RatingStore, SqliteRatingStore};

fn seed_store(store: &dyn RatingStore, count: usize) {
    store.initialize().unwrap();
    for index in 0..count {
        store
            .seed(&format!("image_{:05}.jpg", index), &format!("Image {}", index))
            .unwrap();
    }
}

fn bench_rating_calculations(c: &mut Criterion) {
    let calculator = EloCalculator::default();

    c.bench_function("elo_expected_score", |b| {
        b.iter(|| calculator.expected_score(black_box(1400.0), black_box(1200.0)))
    });

    c.bench_function("elo_rate", |b| {
        b.iter(|| calculator.rate(black_box(1350.0), black_box(1275.0)))
    });
}

fn bench_vote_recording(c: &mut Criterion) {
    let calculator = EloCalculator::default();
    let mut group = c.benchmark_group("record_vote");

    let memory = InMemoryRatingStore::new();
    seed_store(&memory, 100);
    group.bench_function("in_memory", |b| {
        let mut round = 0i64;
        b.iter(|| {
            round += 1;
            let winner = round % 100 + 1;
            let loser = (round + 37) % 100 + 1;
            memory
                .record_vote(black_box(winner), black_box(loser), &calculator)
                .unwrap()
        })
    });

    let sqlite = SqliteRatingStore::open_in_memory().unwrap();
    seed_store(&sqlite, 100);
    group.bench_function("sqlite_in_memory", |b| {
        let mut round = 0i64;
        b.iter(|| {
            round += 1;
            let winner = round % 100 + 1;
            let loser = (round + 37) % 100 + 1;
            sqlite
                .record_vote(black_box(winner), black_box(loser), &calculator)
                .unwrap()
        })
    });

    group.finish();
}

fn bench_leaderboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_by_rating_desc");

    for size in [100usize, 1_000, 10_000] {
        let memory = InMemoryRatingStore::new();
        seed_store(&memory, size);
        group.bench_with_input(BenchmarkId::new("in_memory", size), &size, |b, _| {
            b.iter(|| memory.list_by_rating_desc().unwrap())
        });

        let sqlite = SqliteRatingStore::open_in_memory().unwrap();
        seed_store(&sqlite, size);
        group.bench_with_input(BenchmarkId::new("sqlite_in_memory", size), &size, |b, _| {
            b.iter(|| sqlite.list_by_rating_desc().unwrap())
        });
    }

    group.finish();
}

fn bench_matchup_sampling(c: &mut Criterion) {
    let memory = InMemoryRatingStore::new();
    seed_store(&memory, 1_000);
    let sqlite = SqliteRatingStore::open_in_memory().unwrap();
    seed_store(&sqlite, 1_000);

    c.bench_function("sample_pair_in_memory", |b| {
        b.iter(|| memory.sample_pair().unwrap())
    });
    c.bench_function("sample_pair_sqlite_in_memory", |b| {
        b.iter(|| sqlite.sample_pair().unwrap())
    });
}

criterion_group!(
    benches,
    bench_rating_calculations,
    bench_vote_recording,
    bench_leaderboard,
    bench_matchup_sampling
);
criterion_main!(benches);
