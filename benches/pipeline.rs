use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use mail2matrix::config::MessageConfig;
use mail2matrix::pipeline::Pipeline;

fn read_fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

fn bench_extract(c: &mut Criterion) {
    let alternative = read_fixture("alternative-datamotion.eml");
    let mixed = read_fixture("mixed-html.eml");

    c.bench_function("extract_alternative", |b| {
        b.iter(|| mail2matrix::parser::mime::extract(&alternative).unwrap())
    });
    c.bench_function("extract_mixed_html", |b| {
        b.iter(|| mail2matrix::parser::mime::extract(&mixed).unwrap())
    });
}

fn bench_process(c: &mut Criterion) {
    let raw = read_fixture("mixed-html.eml");
    let config = MessageConfig {
        preface: "New mail".into(),
        skip: vec!["(?i)newsletter".into(), r"^\[cron\]".into()],
        ..Default::default()
    };
    let pipeline = Pipeline::new(&config).unwrap();

    c.bench_function("process_mixed_html", |b| {
        b.iter(|| pipeline.process(&raw).unwrap())
    });
}

fn bench_sanitize(c: &mut Criterion) {
    let html = "<html><body><h1>Report</h1>\n\n\n<p>Line &amp; more</p>".repeat(200);
    c.bench_function("sanitize_html", |b| {
        b.iter(|| mail2matrix::parser::html::sanitize(&html))
    });
}

criterion_group!(benches, bench_extract, bench_process, bench_sanitize);
criterion_main!(benches);
