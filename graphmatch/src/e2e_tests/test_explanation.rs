//! Test the plan explanation.

use crate::e2e_tests::helpers::{run, store, uri};
use crate::query::GraphMatch;
use crate::types::{Edge, Variable};

fn query() -> GraphMatch {
    let x = Variable::new("x");
    let y = Variable::new("y");
    let e = Variable::new("e");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("a"), uri("type"), uri("Person")));
    query.add_edge(Edge::new(x.clone(), uri("knows"), y.clone()));
    query.add_edge(Edge::new(x.clone(), uri("type"), uri("Person")));
    query.add_edge(Edge::new(y, uri("type"), uri("Person")));
    query.add_optional_edge(Edge::new(x, uri("email"), e));
    query
}

/// The explanation lists ground checks, then groups in execution order.
#[test]
fn test_explanation_format() {
    let query = query();
    assert_eq!(
        query.explanation(),
        "Query:\n \
         Check: <http://example.org/a> <http://example.org/type> <http://example.org/Person>\n \
         {?x <http://example.org/type> <http://example.org/Person> & ?y <http://example.org/type> <http://example.org/Person>}\n \
         ?x <http://example.org/knows> ?y\n \
         ?x <http://example.org/email> ?e (Optional)\n"
    );
}

/// Explaining compiles exactly once and works before and after a run.
#[test]
fn test_explanation_compiles_once() {
    let query = query();
    let before = query.explanation();
    assert_eq!(query.compilations(), 1);

    let source = store(&[("a", "type", "Person")]);
    let _ = run(&query, &source);
    let after = query.explanation();

    assert_eq!(before, after);
    assert_eq!(query.compilations(), 1);
}

/// Explaining after a run does not compile again.
#[test]
fn test_explanation_after_run() {
    let query = query();
    let _ = run(&query, &store(&[]));
    assert_eq!(query.compilations(), 1);
    assert!(query.explanation().starts_with("Query:\n"));
    assert_eq!(query.compilations(), 1);
}

/// An invalid pattern is described rather than failing.
#[test]
fn test_explanation_of_invalid_pattern() {
    let mut query = GraphMatch::new();
    query.add_optional_edge(Edge::new(Variable::new("x"), uri("p"), uri("o")));
    let text = query.explanation();
    assert!(text.contains("at least one non-optional statement"));
}
