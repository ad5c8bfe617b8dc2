#![allow(unused_crate_dependencies)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use cynic_parser::executable::FieldSelection;
use query_complexity::{
    analyze_document, ComplexityAnalysis, ComplexityConfig, ComplexityError, CostMismatch, DocumentError, QueryId,
    SdlSchema, Variables,
};
use tracing_subscriber::{layer::Context, prelude::*, Layer};

const SCHEMA: &str = r#"
    type Query {
        a: Int
        b: Int @cost(weight: 2)
        node: Node
        search(first: Int): [SearchResult!]! @listSize(slicingArguments: ["first"])
        users: [User!]!
    }

    interface Node {
        id: ID!
        f: Int
        g: Int
        thing: Thing
        other: Thing
    }

    type X implements Node {
        id: ID!
        f: Int @cost(weight: 5)
        g: Int
        thing: Thing @cost(weight: 10)
        other: Thing
    }

    type Y implements Node {
        id: ID!
        f: Int
        g: Int @cost(weight: 3)
        thing: Thing
        other: Thing
    }

    type Thing {
        a: Int
    }

    union SearchResult = X | Y

    type User {
        name: String
    }
"#;

fn schema() -> SdlSchema {
    SdlSchema::parse(SCHEMA).unwrap()
}

fn future() -> ComplexityConfig {
    ComplexityConfig::default().with_calculation_mode("future")
}

fn complexity(config: &ComplexityConfig, query: &str) -> usize {
    analyze_document(&schema(), config, &[query], &Variables::new())
        .unwrap()
        .complexity
}

/// Every field cost reported while analyzing `query`.
fn field_complexities(config: &ComplexityConfig, query: &str) -> Vec<String> {
    let schema = schema();
    let document = cynic_parser::parse_executable_document(query).unwrap();
    let mut fields = Vec::new();

    let mut analysis = ComplexityAnalysis::<_, FieldSelection<'_>>::new(&schema, config).on_field_complexity(|field| {
        fields.push(format!("{}: {}", field.scope.response_key(), field.complexity));
    });
    analysis
        .visit_operation(QueryId::from(0), &document, None, &Variables::new())
        .unwrap();
    analysis.finish().unwrap();

    fields
}

#[test]
fn leaf_fields_are_summed() {
    assert_eq!(complexity(&future(), "{ a b }"), 3);
}

#[test]
fn fields_repeated_through_fragments_are_charged_once() {
    const QUERY: &str = r#"
        { a ...F ... on Query { a } }

        fragment F on Query { a }
    "#;

    assert_eq!(complexity(&future(), QUERY), 1);
}

#[test]
fn interface_fields_cost_their_most_expensive_implementation() {
    let fields = field_complexities(&future(), "{ node { f } }");

    insta::assert_debug_snapshot!(fields, @r###"
    [
        "f: 5",
        "f: 5",
        "node: 6",
    ]
    "###);
}

#[test]
fn type_conditions_only_apply_to_their_own_type() {
    const QUERY: &str = "{ node { ... on X { f } ... on Y { g } } }";

    // max(f, g), not f + g
    assert_eq!(complexity(&future(), QUERY), 1 + 5);
}

#[test]
fn aliases_are_charged_separately() {
    assert_eq!(complexity(&future(), "{ x: a y: a }"), 2);
}

#[test]
fn empty_queries_cost_nothing() {
    let schema = schema();
    let report = ComplexityAnalysis::<_, FieldSelection<'_>>::new(&schema, &future())
        .finish()
        .unwrap();

    assert_eq!(report.complexity, 0);
    assert!(report.queries.is_empty());
    assert_eq!(complexity(&future(), "{ a @skip(if: true) }"), 0);
}

#[test]
fn skipped_fields_are_absent_from_the_scope_tree() {
    let schema = schema();
    let config = future();
    let document = cynic_parser::parse_executable_document("{ a b @skip(if: true) }").unwrap();

    let mut analysis = ComplexityAnalysis::new(&schema, &config);
    analysis
        .visit_operation(QueryId::from(0), &document, None, &Variables::new())
        .unwrap();

    let query = schema.definition_id("Query").unwrap();
    let tree = analysis.builder().tree(QueryId::from(0)).unwrap();
    assert!(tree.root().child(query, "a").is_some());
    assert!(tree.root().child(query, "b").is_none());
    assert_eq!(tree.scope_count(), 2);

    assert_eq!(analysis.finish().unwrap().complexity, 1);
}

#[test]
fn skip_conditions_read_variables() {
    let variables: Variables = serde_json::from_value(serde_json::json!({ "skipB": true, "withA": false })).unwrap();

    let report = analyze_document(
        &schema(),
        &future(),
        &["query($skipB: Boolean!, $withA: Boolean!) { a @include(if: $withA) b @skip(if: $skipB) users { name } }"],
        &variables,
    )
    .unwrap();

    assert_eq!(report.complexity, 2);
}

#[test]
fn skip_conditions_fall_back_to_variable_defaults() {
    let query = "query($show: Boolean = true, $skipB: Boolean = false) { a @include(if: $show) b @skip(if: $skipB) }";

    assert_eq!(complexity(&future(), query), 1 + 2);
}

const DIVERGING: &str = "{ node { ... on X { t: thing { a } } ... on Node { t: other { a } } } }";

#[test]
fn future_and_legacy_diverge() {
    let legacy = ComplexityConfig::default().with_calculation_mode("legacy");

    assert_eq!(complexity(&future(), DIVERGING), 12);
    assert_eq!(complexity(&legacy, DIVERGING), 3);

    let schema = schema();
    let config = ComplexityConfig::default().with_calculation_mode("compare");
    let document = cynic_parser::parse_executable_document(DIVERGING).unwrap();
    let mut mismatches = Vec::new();

    let mut analysis = ComplexityAnalysis::new(&schema, &config).on_mismatch(|mismatch| {
        mismatches.push(mismatch);
        Ok(mismatch.future)
    });
    analysis
        .visit_operation(QueryId::from(0), &document, None, &Variables::new())
        .unwrap();
    let report = analysis.finish().unwrap();

    assert_eq!(report.complexity, 12);
    assert_eq!(mismatches, [CostMismatch { future: 12, legacy: 3 }]);
}

#[test]
fn legacy_keeps_the_last_composite_selection() {
    let legacy = ComplexityConfig::default().with_calculation_mode("legacy");
    let fields = field_complexities(&legacy, DIVERGING);

    insta::assert_debug_snapshot!(fields, @r###"
    [
        "a: 1",
        "a: 1",
        "t: 2",
        "a: 1",
        "t: 2",
        "node: 3",
    ]
    "###);
}

#[test]
fn list_sizes_multiply_child_costs() {
    let config: ComplexityConfig = toml::from_str(indoc::indoc! {r#"
        calculation_mode = "future"

        [control]
        mode = "measure"
        list_size = 10
    "#})
    .unwrap();

    let report = analyze_document(
        &schema(),
        &config,
        &["{ search(first: 5) { ... on X { f } } }", "{ users { name } }"],
        &Variables::new(),
    )
    .unwrap();

    assert_eq!(report.query(QueryId::from(0)), Some(1 + 5 * 5));
    assert_eq!(report.query(QueryId::from(1)), Some(1 + 10));
    assert_eq!(report.complexity, 26 + 11);
}

#[test]
fn list_size_defaults_to_ten_when_not_configured() {
    let config: ComplexityConfig = toml::from_str(indoc::indoc! {r#"
        calculation_mode = "future"

        [control]
        mode = "measure"
    "#})
    .unwrap();

    assert_eq!(complexity(&config, "{ users { name } }"), 1 + 10);
}

#[test]
fn lists_count_one_item_without_complexity_control() {
    assert_eq!(complexity(&future(), "{ users { name } }"), 1 + 1);
}

#[test]
fn enforced_limit_rejects_the_operation() {
    let config: ComplexityConfig = toml::from_str(indoc::indoc! {r#"
        calculation_mode = "future"

        [control]
        mode = "enforce"
        limit = 3
        list_size = 10
    "#})
    .unwrap();

    let error = analyze_document(&schema(), &config, &["{ a b node { id } }"], &Variables::new()).unwrap_err();

    assert_eq!(
        error,
        DocumentError::Complexity(ComplexityError::QueryTooComplex { complexity: 5, limit: 3 })
    );
    insta::assert_snapshot!(error, @"Query has complexity of 5, which exceeds max complexity of 3");
}

#[test]
fn introspection_fields_can_be_free() {
    let config: ComplexityConfig = toml::from_str(indoc::indoc! {r#"
        calculation_mode = "future"
        count_introspection_fields = false
    "#})
    .unwrap();

    assert_eq!(complexity(&future(), "{ a __typename }"), 2);
    assert_eq!(complexity(&config, "{ a __typename }"), 1);
}

#[test]
fn unknown_calculation_mode_is_fatal() {
    let config = ComplexityConfig::default().with_calculation_mode("fastest");

    let error = analyze_document(&schema(), &config, &["{ a }"], &Variables::new()).unwrap_err();

    assert!(matches!(
        error,
        DocumentError::Complexity(ComplexityError::UnknownCalculationMode(_))
    ));
}

struct WarningCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn count_warnings(f: impl FnOnce()) -> usize {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarningCounter(warnings.clone()));

    tracing::subscriber::with_default(subscriber, f);

    warnings.load(Ordering::SeqCst)
}

#[test]
fn unset_mode_warns_once_and_runs_legacy() {
    let warnings = count_warnings(|| {
        let report = analyze_document(
            &schema(),
            &ComplexityConfig::default(),
            &[DIVERGING, "{ a }"],
            &Variables::new(),
        )
        .unwrap();

        assert_eq!(report.complexity, 3 + 1);
        assert_eq!(report.mode, None);
    });

    assert_eq!(warnings, 1);
}

#[test]
fn compare_mode_keeps_legacy_by_default() {
    let config = ComplexityConfig::default().with_calculation_mode("compare");

    let warnings = count_warnings(|| {
        assert_eq!(complexity(&config, DIVERGING), 3);
    });

    assert_eq!(warnings, 1);
}
