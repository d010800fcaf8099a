//! Test that result rows serialize.

use crate::e2e_tests::helpers::{run, uri};
use crate::query::GraphMatch;
use crate::store::MemoryStore;
use crate::types::{Edge, Literal, Statement, Variable};

#[test]
fn test_rows_serialize_to_json() {
    let source: MemoryStore = [Statement::new(uri("a"), uri("name"), Literal::with_language("Ann", "en"))]
        .into_iter()
        .collect();
    let x = Variable::new("x");
    let name = Variable::new("name");
    let missing = Variable::new("missing");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x, uri("name"), name));
    query.add_optional_edge(Edge::new(uri("a"), uri("nick"), missing));

    let sink = run(&query, &source);
    let json = serde_json::to_value(&sink.rows).expect("serialize");
    let row = &json[0];

    assert_eq!(row[0]["variable"]["name"], "x");
    assert_eq!(row[0]["target"]["Entity"]["Uri"], "http://example.org/a");
    assert_eq!(row[1]["target"]["Literal"]["value"], "Ann");
    assert_eq!(row[1]["target"]["Literal"]["language"], "en");
    assert!(row[2]["target"].is_null());
}
