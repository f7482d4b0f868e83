use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use qvfund_ledger::{CreditLedger, ParticipantRegistry};
use qvfund_types::{Address, CURRENCY_UNIT};

fn bench_address(c: &mut Criterion) {
    let mut group = c.benchmark_group("address");
    let addr = Address::from_bytes([7u8; 20]);
    let encoded = addr.to_string();
    group.bench_function("to_string", |b| b.iter(|| black_box(addr.to_string())));
    group.bench_function("parse", |b| b.iter(|| black_box(encoded.parse::<Address>())));
    group.finish();
}

fn bench_credit_ledger(c: &mut Criterion) {
    let mut group = c.benchmark_group("credit_ledger");
    let holder = Address::from_bytes([1u8; 20]);

    group.bench_function("mint_lock_unlock_burn", |b| {
        b.iter_batched(
            || CreditLedger::new(1_000_000),
            |mut ledger| {
                ledger.mint(holder, 100).ok();
                ledger.transfer_to_custody(holder, 40).ok();
                ledger.transfer_from_custody(holder, 40).ok();
                ledger.burn(holder, 100).ok();
                black_box(ledger.total_supply())
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("participants");
    let price = CURRENCY_UNIT / 10;

    group.bench_function("register_1000", |b| {
        b.iter_batched(
            || ParticipantRegistry::new(price, u128::from(u32::MAX)),
            |mut registry| {
                for i in 0..1000u32 {
                    let mut bytes = [0u8; 20];
                    bytes[..4].copy_from_slice(&i.to_be_bytes());
                    registry.register(Address::from_bytes(bytes), CURRENCY_UNIT).ok();
                }
                black_box(registry.count())
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_address, bench_credit_ledger, bench_registration);
criterion_main!(benches);
