use criterion::{Criterion, black_box, criterion_group, criterion_main};
use octofhir_datapath::mapper::MappingEngine;
use octofhir_datapath::model::Value;
use octofhir_datapath::parser::{ExpressionParser, parse_expression};
use serde_json::json;

fn benchmark_parse(c: &mut Criterion) {
    let expressions = [
        "{{ user.name }}",
        "{{ users.*.email | trim | lower }}",
        "{{ order.total ?? 0 | round:2 }}",
        "{{ items.*.tags.* | unique | join:', ' }}",
    ];

    let mut group = c.benchmark_group("parse_expression");
    for (i, expression) in expressions.iter().enumerate() {
        group.bench_function(format!("uncached_{i}"), |b| {
            b.iter(|| black_box(parse_expression(black_box(expression))))
        });

        let parser = ExpressionParser::with_capacity(100);
        group.bench_function(format!("cached_{i}"), |b| {
            b.iter(|| black_box(parser.parse(black_box(expression))))
        });
    }
    group.finish();
}

fn benchmark_mapping(c: &mut Criterion) {
    let users: Vec<serde_json::Value> = (0..500)
        .map(|i| json!({"name": format!(" user {i} "), "total": i * 7 % 300, "team": i % 5}))
        .collect();
    let source = Value::from(json!({ "users": users }));
    let engine = MappingEngine::new();

    let flat = engine
        .compile(&Value::from(json!({"names.*": "{{ users.*.name | upper }}"})))
        .unwrap();
    let query = engine
        .compile(&Value::from(json!({"top": {
            "WHERE": {"{{ users.*.total }}": [">", 100]},
            "ORDER BY": {"{{ users.*.total }}": "DESC"},
            "LIMIT": 20,
            "*": {"name": "{{ users.*.name }}", "total": "{{ users.*.total }}"}
        }})))
        .unwrap();
    let grouped = engine
        .compile(&Value::from(json!({"teams": {
            "GROUP BY": "{{ users.*.team }}",
            "*": {"team": "{{ users.*.team }}", "revenue": "{{ users.*.total | sum }}"}
        }})))
        .unwrap();

    c.bench_function("map_wildcard_leaf", |b| {
        b.iter(|| black_box(engine.map(&source, &Value::map(), &flat)))
    });
    c.bench_function("map_where_order_limit", |b| {
        b.iter(|| black_box(engine.map(&source, &Value::map(), &query)))
    });
    c.bench_function("map_group_by", |b| {
        b.iter(|| black_box(engine.map(&source, &Value::map(), &grouped)))
    });
}

criterion_group!(benches, benchmark_parse, benchmark_mapping);
criterion_main!(benches);
