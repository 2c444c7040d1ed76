use criterion::{black_box, criterion_group, criterion_main, Criterion};
use embed_resolver_core::{derive_default, envelope, Salt};

fn bench_kdf(c: &mut Criterion) {
    let salt = Salt::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]);
    c.bench_function("derive_default", |b| {
        b.iter(|| derive_default(black_box(b"playhq@2023@"), black_box(salt.as_bytes())))
    });
}

fn bench_envelope(c: &mut Criterion) {
    let payload = b"1234|5678|1700000000000";
    let sealed = envelope::wrap(payload, "playhq@2023@").unwrap();

    c.bench_function("wrap", |b| {
        b.iter(|| envelope::wrap(black_box(payload), "playhq@2023@").unwrap())
    });
    c.bench_function("unwrap", |b| {
        b.iter(|| envelope::unwrap(black_box(&sealed), "playhq@2023@").unwrap())
    });
}

criterion_group!(benches, bench_kdf, bench_envelope);
criterion_main!(benches);
