//! Benchmarks for cfnport core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use cfnport::core::catalog::ConventionCatalog;
use cfnport::core::codegen::{generate_code, ImportOptions};
use cfnport::core::decoder::decode;
use cfnport::core::normalizer::normalize_template;
use cfnport::core::resolver::{analyze_references, build_resource_order, resource_order};
use cfnport::core::types::{Diagnostics, ReferenceGraph};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeSet;

/// A template with `n` queues, each subscribed to the previous one's topic.
fn chained_template(n: usize) -> String {
    let mut doc = String::from(
        "AWSTemplateFormatVersion: \"2010-09-09\"\nParameters:\n  Env:\n    Type: String\nResources:\n",
    );
    for i in 0..n {
        doc.push_str(&format!(
            "  Topic{i:04}:\n    Type: AWS::SNS::Topic\n    Properties:\n      TopicName: !Sub \"${{Env}}-topic-{i}\"\n      Tags:\n        - Key: index\n          Value: \"{i}\"\n"
        ));
        doc.push_str(&format!(
            "  Queue{i:04}:\n    Type: AWS::SQS::Queue\n    Properties:\n      QueueName: !GetAtt Topic{i:04}.TopicName\n"
        ));
        if i > 0 {
            doc.push_str(&format!(
                "      RedrivePolicy:\n        deadLetterTargetArn: !GetAtt Queue{:04}.Arn\n",
                i - 1
            ));
        }
    }
    doc
}

fn bench_blake3_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("blake3_template");
    for n in [10, 100] {
        let doc = chained_template(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &doc, |b, doc| {
            b.iter(|| {
                let hash = blake3::hash(black_box(doc.as_bytes()));
                black_box(hash);
            });
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_normalize");
    for n in [10, 100] {
        let doc = chained_template(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &doc, |b, doc| {
            b.iter(|| {
                let root = decode(black_box(doc.as_bytes())).unwrap();
                let template = normalize_template(&root, &mut Diagnostics::new());
                black_box(template);
            });
        });
    }
    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_references");
    for n in [10, 100] {
        let root = decode(chained_template(n).as_bytes()).unwrap();
        let template = normalize_template(&root, &mut Diagnostics::new());
        group.bench_with_input(BenchmarkId::from_parameter(n), &template, |b, template| {
            b.iter(|| black_box(analyze_references(black_box(template))));
        });
    }
    group.finish();
}

fn bench_topo_sort(c: &mut Criterion) {
    // Linear chain of N resources, declared in reverse
    let mut group = c.benchmark_group("topo_sort");
    for n in [10, 50, 100, 500] {
        let ids: Vec<String> = (0..n).rev().map(|i| format!("node-{i:04}")).collect();
        let mut graph = ReferenceGraph::default();
        for i in 1..n {
            let deps: BTreeSet<String> = [format!("node-{:04}", i - 1)].into();
            graph.resources.insert(format!("node-{i:04}"), deps);
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(build_resource_order(black_box(&ids), &graph)));
        });
    }
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let catalog = ConventionCatalog::default();
    let options = ImportOptions::with_package("bench");
    let mut group = c.benchmark_group("generate_code");
    for n in [10, 100] {
        let root = decode(chained_template(n).as_bytes()).unwrap();
        let template = normalize_template(&root, &mut Diagnostics::new());
        let graph = analyze_references(&template);
        let order = resource_order(&template, &graph);
        group.bench_with_input(BenchmarkId::from_parameter(n), &template, |b, template| {
            b.iter(|| {
                let generated = generate_code(template, &graph, &order, &catalog, &options);
                black_box(generated);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_blake3_template,
    bench_decode,
    bench_analyze,
    bench_topo_sort,
    bench_generate
);
criterion_main!(benches);
