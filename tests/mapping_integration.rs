//! End-to-end mapping tests
//!
//! Each test compiles a template, maps a realistic source document and
//! checks the complete output shape.

use octofhir_datapath::config::MapperConfig;
use octofhir_datapath::mapper::{
    HookAction, HookError, HookResult, MappingContext, MappingEngine, MappingHooks, PairContext,
    WriteContext,
};
use octofhir_datapath::model::Value;
use octofhir_datapath::pipeline::Pipeline;
use octofhir_datapath::registry::FilterRegistry;
use octofhir_datapath::{DataEngine, Error};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn value(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn shop() -> Value {
    value(json!({
        "users": [
            {"name": "ada", "total": 100, "country": "uk", "tags": ["admin", " ops "]},
            {"name": "bob", "total": 200, "country": "us", "tags": []},
            {"name": "cy", "total": 150, "country": "uk", "tags": ["ops"]},
            {"name": "di", "total": 50, "country": "fr", "tags": ["sales"]}
        ]
    }))
}

#[test]
fn test_where_order_limit() {
    init();
    let template = value(json!({"top": {
        "WHERE": {"{{ users.*.total }}": [">", 100]},
        "ORDER BY": {"{{ users.*.total }}": "DESC"},
        "LIMIT": 5,
        "*": {"total": "{{ users.*.total }}"}
    }}));

    let result = DataEngine::new().map(&shop(), &template).unwrap();
    assert_eq!(result, value(json!({"top": [{"total": 200}, {"total": 150}]})));
}

#[test]
fn test_offset_and_multiple_predicates() {
    init();
    let template = value(json!({"names": {
        "WHERE": [
            ["{{ users.*.country }}", "in", ["uk", "fr"]],
            ["{{ users.*.total }}", ">=", 50]
        ],
        "order_by": "{{ users.*.name }}",
        "offset": 1,
        "limit": 2,
        "*": "{{ users.*.name | upper }}"
    }}));

    let result = DataEngine::new().map(&shop(), &template).unwrap();
    assert_eq!(result, value(json!({"names": ["CY", "DI"]})));
}

#[test]
fn test_group_by_country() {
    init();
    let template = value(json!({"countries": {
        "GROUP BY": "{{ users.*.country }}",
        "ORDER BY": "{{ users.*.country }}",
        "*": {
            "country": "{{ users.*.country | upper }}",
            "people": "{{ users.*.name | join:', ' }}",
            "revenue": "{{ users.*.total | sum }}"
        }
    }}));

    let result = DataEngine::new().map(&shop(), &template).unwrap();
    assert_eq!(
        result,
        value(json!({"countries": [
            {"country": "FR", "people": "di", "revenue": 50},
            {"country": "UK", "people": "ada, cy", "revenue": 250},
            {"country": "US", "people": "bob", "revenue": 200}
        ]}))
    );
}

#[test]
fn test_wildcard_shapes() {
    init();
    let engine = MappingEngine::new();
    let template = value(json!({
        "people.*.name": "{{ users.*.name }}",
        "all_tags.*": "{{ users.*.tags.* }}",
        "count": "{{ users.* | count }}"
    }));

    let result = engine.map_template(&shop(), &template).unwrap();
    assert_eq!(
        result,
        value(json!({
            "people": [{"name": "ada"}, {"name": "bob"}, {"name": "cy"}, {"name": "di"}],
            "all_tags": ["admin", "ops", "ops", "sales"],
            "count": 4
        }))
    );
}

#[test]
fn test_reverse_mapping_restores_source_shape() {
    init();
    let engine = MappingEngine::new();
    let mapping = engine
        .compile(&value(json!({
            "customer": {"display": "{{ user.name }}", "mail": "{{ user.contact.email }}"},
            "labels.*": "{{ user.tags.* }}"
        })))
        .unwrap();

    let source = value(json!({"user": {
        "name": "Ada",
        "contact": {"email": "ada@example.com"},
        "tags": ["a", "b"]
    }}));
    let mapped = engine.map(&source, &Value::map(), &mapping).unwrap();

    assert_eq!(
        mapped,
        value(json!({
            "customer": {"display": "Ada", "mail": "ada@example.com"},
            "labels": ["a", "b"]
        }))
    );

    let edited = DataEngine::new()
        .set(&mapped, "customer.mail", Value::from("ada@example.org"))
        .unwrap();

    let restored = engine.reverse_map(&edited, &source, &mapping).unwrap();
    assert_eq!(
        restored,
        value(json!({"user": {
            "name": "Ada",
            "contact": {"email": "ada@example.org"},
            "tags": ["a", "b"]
        }}))
    );
}

#[test]
fn test_pipeline_and_config() {
    init();
    let registry = FilterRegistry::standard();
    let pipeline = Pipeline::new()
        .pipe_filter_at("people.*.name", &registry, "ucfirst", &[])
        .unwrap();
    let engine = MappingEngine::new()
        .with_pipeline(pipeline)
        .with_config(MapperConfig {
            reindex_wildcard: true,
            ..MapperConfig::default()
        });

    let template = value(json!({"people": {
        "WHERE": {"{{ users.*.country }}": "uk"},
        "*": {"name": "{{ users.*.name }}", "nick": "{{ users.*.nick }}"}
    }}));
    assert_eq!(
        engine.map_template(&shop(), &template).unwrap(),
        value(json!({"people": [{"name": "Ada"}, {"name": "Cy"}]}))
    );
}

#[derive(Default)]
struct Audit {
    pairs: Mutex<Vec<String>>,
    writes: Mutex<Vec<String>>,
}

impl MappingHooks for Audit {
    fn before_all(&self, ctx: &MappingContext<'_>) -> HookResult<HookAction> {
        // Map a redacted copy of the source
        let redacted = DataEngine::new()
            .mutator()
            .unset(ctx.source, "users.*.total")
            .map_err(|error| HookError::new(error.to_string()))?;
        Ok(HookAction::Replace(redacted))
    }

    fn after_pair(&self, ctx: &PairContext<'_>, _value: &Value) -> HookResult<()> {
        self.pairs.lock().push(format!("{} -> {}", ctx.source_path, ctx.target_path));
        Ok(())
    }

    fn before_write(&self, ctx: &WriteContext<'_>, _value: &Value) -> HookResult<HookAction> {
        self.writes.lock().push(ctx.target.to_string());
        Ok(HookAction::Continue)
    }
}

#[test]
fn test_hooks_observe_and_replace() {
    init();
    let audit = Arc::new(Audit::default());

    struct Shared(Arc<Audit>);
    impl MappingHooks for Shared {
        fn before_all(&self, ctx: &MappingContext<'_>) -> HookResult<HookAction> {
            self.0.before_all(ctx)
        }
        fn after_pair(&self, ctx: &PairContext<'_>, value: &Value) -> HookResult<()> {
            self.0.after_pair(ctx, value)
        }
        fn before_write(&self, ctx: &WriteContext<'_>, value: &Value) -> HookResult<HookAction> {
            self.0.before_write(ctx, value)
        }
    }

    let engine = MappingEngine::new().with_hooks(Shared(Arc::clone(&audit)));
    let template = value(json!({
        "first": "{{ users.0.name }}",
        "totals.*": "{{ users.*.total }}"
    }));
    let result = engine.map_template(&shop(), &template).unwrap();

    assert_eq!(result, value(json!({"first": "ada"})));
    assert_eq!(
        *audit.pairs.lock(),
        vec![
            "{{ users.0.name }} -> first".to_string(),
            "{{ users.*.total }} -> totals.*".to_string()
        ]
    );
    assert_eq!(*audit.writes.lock(), vec!["first".to_string()]);
}

#[test]
fn test_invalid_templates_fail_to_compile() {
    init();
    let engine = DataEngine::new();
    for template in [
        json!({"rows": {"WHERE": {"{{ a.* }}": 1}, "LIMIT": "ten"}}),
        json!({"rows.*": {"nested": "{{ a }}"}}),
        json!({"rows": {"*": "{{ a.* }}", "stray": 1}}),
    ] {
        let error = engine.compile(&value(template.clone())).unwrap_err();
        assert!(matches!(error, Error::InvalidTemplate { .. }), "{template}: {error}");
    }
    assert!(engine.compile(&value(json!({"a": "{{ a | }}"}))).unwrap_err().is_syntax_error());
}
