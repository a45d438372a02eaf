//! Automaton and validator benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pdaval_core::{DistrictTable, NicAutomaton, PdaEngine, PostalAutomaton, Validator};

const NIC_INPUTS: &[(&str, &str)] = &[
    ("old_format", "951234567V"),
    ("new_format", "199512345678"),
    ("missing_suffix", "123456789"),
    ("invalid_char", "95123A567V"),
    ("too_long", "1234567890123"),
];

const POSTAL_INPUTS: &[(&str, &str)] = &[
    ("first_district", "00100"),
    ("last_district", "71500"),
    ("range_miss", "99999"),
    ("too_short", "123"),
    ("non_digit", "1A100"),
];

fn bench_nic_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("nic_engine");
    let engine = PdaEngine::new();

    for (name, input) in NIC_INPUTS {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| black_box(engine.run(&NicAutomaton, black_box(input))));
        });
    }

    group.finish();
}

fn bench_postal_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("postal_engine");
    let engine = PdaEngine::new();
    let table = DistrictTable::builtin();
    let automaton = PostalAutomaton::new(&table);

    for (name, input) in POSTAL_INPUTS {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| black_box(engine.run(&automaton, black_box(input))));
        });
    }

    group.finish();
}

fn bench_validator(c: &mut Criterion) {
    let mut group = c.benchmark_group("validator");
    let validator = Validator::default();

    group.bench_function("validate_nic", |b| {
        b.iter(|| black_box(validator.validate_nic(black_box(" 951234567v "))));
    });

    group.bench_function("validate_postal_code", |b| {
        b.iter(|| black_box(validator.validate_postal_code(black_box("10100"))));
    });

    group.bench_function("validate_nic_json", |b| {
        b.iter(|| {
            let result = validator.validate_nic(black_box("199512345678"));
            black_box(serde_json::to_vec(&result).unwrap())
        });
    });

    group.finish();
}

fn bench_district_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("district_lookup");
    let table = DistrictTable::builtin();

    for code in [100u32, 20500, 71500, 99999] {
        group.bench_with_input(BenchmarkId::from_parameter(code), &code, |b, code| {
            b.iter(|| black_box(table.lookup(black_box(*code)).map(|m| m.index)));
        });
    }

    group.bench_function("list_districts_json", |b| {
        b.iter(|| black_box(serde_json::to_vec(table.as_ref()).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_nic_engine,
    bench_postal_engine,
    bench_validator,
    bench_district_lookup,
);

criterion_main!(benches);
