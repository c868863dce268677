//! Routing performance benchmarks
//!
//! Measures the non-I/O parts of the keyword strategy: keyword
//! classification, regex city extraction, and configuration parsing.
//!
//! ## Expected Performance Characteristics
//!
//! - Keyword classification: sub-microsecond (substring scan over ~25 keywords)
//! - City extraction: a few microseconds (up to 16 regexes over the lowercased message)
//! - Config parsing: tens of microseconds including pattern compilation (startup only)
//!
//! Run with: `cargo bench`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::str::FromStr;
use weatherbot::{
    config::Config,
    router::{CityExtractor, KeywordClassifier, keyword::decide},
};

const MESSAGES: &[(&str, &str)] = &[
    ("chat", "Tell me a joke about programmers"),
    ("weather_first_pattern", "What's the weather in London?"),
    ("weather_late_pattern", "Should I bring an umbrella to Buenos Aires"),
    ("weather_no_city", "is it going to rain"),
    (
        "long_chat",
        "Explain how ownership and borrowing work in Rust, and why they prevent data races \
         at compile time, with a few examples of common borrow checker errors.",
    ),
];

fn bench_keyword_classification(c: &mut Criterion) {
    let classifier = KeywordClassifier::with_defaults();
    let mut group = c.benchmark_group("keyword_classification");

    for (name, message) in MESSAGES {
        group.bench_with_input(BenchmarkId::from_parameter(name), message, |b, m| {
            b.iter(|| classifier.is_weather_related(black_box(m)));
        });
    }

    group.finish();
}

fn bench_city_extraction(c: &mut Criterion) {
    let extractor = CityExtractor::with_defaults().expect("default patterns compile");
    let mut group = c.benchmark_group("city_extraction");

    for (name, message) in MESSAGES {
        group.bench_with_input(BenchmarkId::from_parameter(name), message, |b, m| {
            b.iter(|| extractor.extract(black_box(m)));
        });
    }

    group.finish();
}

/// Full keyword decision: classification then extraction
fn bench_keyword_decision(c: &mut Criterion) {
    let classifier = KeywordClassifier::with_defaults();
    let extractor = CityExtractor::with_defaults().expect("default patterns compile");

    c.bench_function("keyword_decision", |b| {
        b.iter(|| {
            for (_, message) in MESSAGES {
                black_box(decide(&classifier, &extractor, black_box(message)));
            }
        });
    });
}

/// Parsing plus validation, which compiles every city pattern
fn bench_config_parsing(c: &mut Criterion) {
    let toml_str = r#"
[server]
port = 8000

[routing]
strategy = "keyword"
agent_max_steps = 3
"#;

    c.bench_function("config_parsing", |b| {
        b.iter(|| Config::from_str(black_box(toml_str)).expect("config should parse"));
    });
}

criterion_group!(
    benches,
    bench_keyword_classification,
    bench_city_extraction,
    bench_keyword_decision,
    bench_config_parsing,
);
criterion_main!(benches);
