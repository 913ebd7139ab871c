//! Integration tests for path parsing, reads and writes
//!
//! These tests drive the public API through [`DataEngine`] the way an
//! application would, with JSON fixtures converted into [`Value`]s.

use octofhir_datapath::accessor::Lookup;
use octofhir_datapath::config::EngineConfig;
use octofhir_datapath::model::Value;
use octofhir_datapath::parser::parse_path;
use octofhir_datapath::{DataEngine, Error};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn value(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[rstest]
#[case("user.name")]
#[case("users.*.email")]
#[case("orders.*.items.*.sku")]
#[case("matrix.0.1")]
fn test_path_display_round_trip(#[case] raw: &str) {
    let path = parse_path(raw).unwrap();
    assert_eq!(path.to_string(), raw);
    assert_eq!(parse_path(&path.to_string()).unwrap(), path);
}

#[rstest]
#[case("a..b")]
#[case(".a")]
#[case("a.")]
fn test_malformed_paths_are_rejected(#[case] raw: &str) {
    init();
    let engine = DataEngine::new();
    let error = engine.get(&Value::map(), raw).unwrap_err();
    assert!(matches!(error, Error::PathSyntax(_)), "{raw}: {error}");
}

#[test]
fn test_read_write_cycle() {
    init();
    let engine = DataEngine::new();
    let data = value(json!({"users": [
        {"name": "Ada", "email": "ada@example.com"},
        {"name": "Bob"}
    ]}));

    let updated = engine
        .set(&data, "users.1.email", Value::from("bob@example.com"))
        .unwrap();
    assert_eq!(
        engine.get(&updated, "users.1.email").unwrap(),
        Lookup::Single(Some(Value::from("bob@example.com")))
    );
    // The input is never modified
    assert_eq!(engine.get(&data, "users.1.email").unwrap(), Lookup::Single(None));

    let emails = engine.get(&updated, "users.*.email").unwrap().into_matches().unwrap();
    assert_eq!(emails.len(), 2);
    assert_eq!(
        emails.values(),
        vec![Value::from("ada@example.com"), Value::from("bob@example.com")]
    );
}

#[test]
fn test_merge_is_deep() {
    init();
    let mutator = DataEngine::new().mutator();
    let config = value(json!({"db": {"host": "localhost", "pool": {"min": 1, "max": 4}}}));

    let merged = mutator
        .merge(&config, "db", value(json!({"pool": {"max": 16}, "user": "app"})))
        .unwrap();
    assert_eq!(
        merged,
        value(json!({"db": {
            "host": "localhost",
            "pool": {"min": 1, "max": 16},
            "user": "app"
        }}))
    );
}

#[test]
fn test_unset_across_two_wildcards() {
    init();
    let mutator = DataEngine::new().mutator();
    let data = value(json!({"orders": [
        {"id": 1, "items": [{"sku": "a", "temp_id": 9}, {"sku": "b", "temp_id": 8}]},
        {"id": 2, "items": [{"sku": "c", "temp_id": 7}]}
    ]}));

    let cleaned = mutator.unset(&data, "orders.*.items.*.temp_id").unwrap();
    let leftovers = DataEngine::new()
        .get(&cleaned, "orders.*.items.*.temp_id")
        .unwrap()
        .into_matches()
        .unwrap();
    assert!(leftovers.is_empty());
    assert_eq!(
        DataEngine::new()
            .get(&cleaned, "orders.*.items.*.sku")
            .unwrap()
            .into_matches()
            .unwrap()
            .values(),
        vec![Value::from("a"), Value::from("b"), Value::from("c")]
    );
}

#[test]
fn test_repeated_paths_hit_the_cache() {
    init();
    let engine = DataEngine::with_config(EngineConfig::testing());
    let data = value(json!({"a": {"b": [1, 2, 3]}}));

    for _ in 0..10 {
        engine.get(&data, "a.b.*").unwrap();
    }

    let stats = engine.cache_stats().paths;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 9);
    assert_eq!(stats.hit_ratio(), 90.0);
}

#[test]
fn test_mapping_reuses_parsed_expressions() {
    init();
    let engine = DataEngine::with_config(EngineConfig::testing());
    let template = value(json!({"name": "{{ user.name }}"}));

    for name in ["a", "b", "c"] {
        let source = value(json!({"user": {"name": name}}));
        assert_eq!(
            engine.map(&source, &template).unwrap(),
            value(json!({"name": name}))
        );
    }

    let stats = engine.cache_stats().expressions;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
}
