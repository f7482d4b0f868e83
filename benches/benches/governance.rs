use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use qvfund_governance::{integer_sqrt, VotingEngine};
use qvfund_types::{Address, LedgerConfig, CURRENCY_UNIT};

const PRICE: u128 = CURRENCY_UNIT / 10;

fn owner() -> Address {
    Address::from_bytes([0xaa; 20])
}

fn voter(i: u32) -> Address {
    let mut bytes = [0u8; 20];
    bytes[..4].copy_from_slice(&i.to_be_bytes());
    Address::from_bytes(bytes)
}

/// 100 voters with 1000 credits each, 20 funding proposals, round open.
fn populated_engine() -> VotingEngine {
    let engine = VotingEngine::new(LedgerConfig::new(PRICE, 1_000_000, owner())).unwrap();
    for i in 0..100 {
        engine.register(voter(i), PRICE * 1_000).unwrap();
    }
    for i in 0..20u32 {
        engine
            .create_proposal(voter(i), format!("Proposal {}", i), "", PRICE * (i as u128 + 1), Address::ZERO)
            .unwrap();
    }
    engine.open_voting(owner(), CURRENCY_UNIT * 10).unwrap();
    engine
}

fn bench_quadratic(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadratic");
    group.bench_function("integer_sqrt", |b| b.iter(|| black_box(integer_sqrt(black_box(u64::MAX as u128)))));
    group.finish();
}

fn bench_stake(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    let engine = populated_engine();
    let alice = voter(0);

    group.bench_function("stake_unstake", |b| {
        b.iter(|| {
            engine.stake(alice, 1, 5).ok();
            black_box(engine.unstake(alice, 1, 5).ok())
        })
    });
    group.finish();
}

fn bench_close_voting(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    group.bench_function("close_voting_100x20", |b| {
        b.iter_batched(
            || {
                let engine = populated_engine();
                for i in 0..100u32 {
                    engine.stake(voter(i), u64::from(i % 20) + 1, u128::from(i % 7) + 1).ok();
                }
                engine
            },
            |engine| black_box(engine.close_voting(owner()).ok()),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_quadratic, bench_stake, bench_close_voting);
criterion_main!(benches);
