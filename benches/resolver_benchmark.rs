use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use octofhir_datapath::evaluator::WildcardResolver;
use octofhir_datapath::model::Value;
use octofhir_datapath::mutator::Mutator;
use octofhir_datapath::parser::parse_path;
use serde_json::json;

fn orders(count: usize) -> Value {
    let orders: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            json!({
                "id": i,
                "customer": {"name": format!("customer-{i}")},
                "items": (0..5).map(|j| json!({"sku": format!("sku-{i}-{j}"), "qty": j})).collect::<Vec<_>>()
            })
        })
        .collect();
    Value::from(json!({ "orders": orders }))
}

fn benchmark_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for size in [10, 100, 1000] {
        let data = orders(size);
        let single = parse_path("orders.5.customer.name").unwrap();
        let one = parse_path("orders.*.customer.name").unwrap();
        let two = parse_path("orders.*.items.*.sku").unwrap();

        group.bench_with_input(BenchmarkId::new("single", size), &data, |b, data| {
            b.iter(|| black_box(WildcardResolver::resolve_single(black_box(&single), data)))
        });
        group.bench_with_input(BenchmarkId::new("one_wildcard", size), &data, |b, data| {
            b.iter(|| black_box(WildcardResolver::resolve_refs(black_box(&one), data)))
        });
        group.bench_with_input(BenchmarkId::new("two_wildcards", size), &data, |b, data| {
            b.iter(|| black_box(WildcardResolver::resolve_refs(black_box(&two), data)))
        });
    }
    group.finish();
}

fn benchmark_mutate(c: &mut Criterion) {
    let mutator = Mutator::new();
    let data = orders(100);

    c.bench_function("set_nested", |b| {
        b.iter(|| black_box(mutator.set(&data, black_box("orders.50.customer.email"), Value::from("x"))))
    });
    c.bench_function("unset_double_wildcard", |b| {
        b.iter(|| black_box(mutator.unset(&data, black_box("orders.*.items.*.qty"))))
    });
}

criterion_group!(benches, benchmark_resolve, benchmark_mutate);
criterion_main!(benches);
