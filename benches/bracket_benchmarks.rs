use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ko_bracket::bracket::{BracketManager, Match, group_matches, rounds_for};
use ko_bracket::db::MemoryStore;
use ko_bracket::{Block, BlockResult, BlockState};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Helper to build a flat round of leaves, `per_match` siblings per parent
fn leaf_round(matches: i64, per_match: i64) -> Vec<Block> {
    (0..matches * per_match)
        .map(|i| Block {
            id: i + 1,
            next: Some(1_000_000 + i / per_match),
            depth: 4,
            participant: Some(i + 1),
            participant_name: None,
            score: i % per_match,
            state: BlockState::OnGoing,
            result: BlockResult::NotDecided,
        })
        .collect()
}

/// Benchmark the round count derivation
fn bench_rounds_for(c: &mut Criterion) {
    c.bench_function("rounds_for 2^20", |b| {
        b.iter(|| rounds_for(black_box(1 << 20), black_box(2)))
    });
}

/// Benchmark grouping and winner selection for one round
fn bench_match_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_resolution");
    for matches in [8i64, 64, 512] {
        let round = leaf_round(matches, 2);
        group.bench_with_input(BenchmarkId::from_parameter(matches), &round, |b, round| {
            b.iter(|| {
                let grouped: Vec<Match> = group_matches(black_box(round.clone()));
                grouped.iter().filter(|m| m.winner().is_ok()).count()
            })
        });
    }
    group.finish();
}

/// Benchmark bracket construction on the in-memory store
fn bench_create_bracket(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("create_bracket");
    for (total, per_match) in [(16u32, 2u32), (64, 2), (81, 3), (256, 4)] {
        group.bench_with_input(
            BenchmarkId::new(format!("{per_match}_per_match"), total),
            &(total, per_match),
            |b, &(total, per_match)| {
                b.iter(|| {
                    rt.block_on(async {
                        let manager = BracketManager::with_store(Arc::new(MemoryStore::new()));
                        manager.create_bracket(total, per_match).await.unwrap()
                    })
                })
            },
        );
    }
    group.finish();
}

/// Benchmark a full 64-entrant bracket played to the champion
fn bench_full_cycle(c: &mut Criterion) {
    let rt = runtime();
    let participants: Vec<i64> = (1..=64).collect();

    c.bench_function("full_cycle 64", |b| {
        b.iter(|| {
            rt.block_on(async {
                let manager = BracketManager::with_store(Arc::new(MemoryStore::new()));
                let bracket = manager.create_bracket(64, 2).await.unwrap();
                let mut rng = StdRng::seed_from_u64(11);
                manager
                    .seed_bracket_with_rng(bracket.id, &participants, &mut rng)
                    .await
                    .unwrap();

                for _ in 0..6 {
                    let view = manager.get_bracket_view(bracket.id).await.unwrap();
                    for block in view.blocks_at_depth(view.bracket.current_depth) {
                        let participant = block.participant.unwrap();
                        manager
                            .record_block_score(block.id, participant)
                            .await
                            .unwrap();
                    }
                    manager.advance_round(bracket.id).await.unwrap();
                }

                manager.champion(bracket.id).await.unwrap()
            })
        })
    });
}

criterion_group!(topology, bench_rounds_for, bench_create_bracket);

criterion_group!(rounds, bench_match_resolution, bench_full_cycle);

criterion_main!(topology, rounds);
