use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use waiedu::config::loader::{default_config_content, interpolate_env_vars, parse_config};

fn bench_interpolation(c: &mut Criterion) {
    let content = default_config_content();

    c.bench_function("interpolate_default_config", |b| {
        b.iter(|| interpolate_env_vars(black_box(content)))
    });

    c.bench_function("interpolate_no_placeholders", |b| {
        b.iter(|| interpolate_env_vars(black_box("[server]\nport = 5000\n")))
    });
}

fn bench_parse(c: &mut Criterion) {
    let content = default_config_content();

    c.bench_function("parse_default_config", |b| {
        b.iter(|| parse_config(black_box(content)))
    });
}

fn bench_validate(c: &mut Criterion) {
    let mut config = parse_config(default_config_content()).unwrap();
    config.auth.jwt_secret = "bench-secret".to_string();

    c.bench_function("config_validate", |b| b.iter(|| black_box(&config).validate()));
}

criterion_group!(benches, bench_interpolation, bench_parse, bench_validate);
criterion_main!(benches);
