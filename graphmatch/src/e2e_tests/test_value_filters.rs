//! Test literal value filters on variables.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::e2e_tests::helpers::{res, row_set, run, uri};
use crate::query::GraphMatch;
use crate::store::{CompareOp, MemoryStore, NumericCompareFilter, StringContainsFilter};
use crate::types::{Edge, Literal, Statement, Variable};

fn ages() -> MemoryStore {
    [
        Statement::new(uri("alice"), uri("age"), Literal::new("30")),
        Statement::new(uri("bob"), uri("age"), Literal::new("17")),
        Statement::new(uri("carol"), uri("age"), Literal::new("45")),
        Statement::new(uri("dave"), uri("age"), uri("unknown")),
        Statement::new(uri("alice"), uri("mail"), Literal::new("alice@example.org")),
        Statement::new(uri("carol"), uri("mail"), Literal::new("carol@example.com")),
    ]
    .into_iter()
    .collect()
}

/// Only literals passing the filter bind the variable.
#[test]
fn test_numeric_filter() {
    let x = Variable::new("x");
    let age = Variable::new("age");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("age"), age.clone()));
    query.add_value_filter(
        age,
        Arc::new(NumericCompareFilter::new(18.0, CompareOp::GreaterThanOrEqual)),
    );

    let sink = run(&query, &ages());
    let expected: BTreeSet<_> = [vec![Some(res("alice"))], vec![Some(res("carol"))]]
        .into_iter()
        .collect();
    assert_eq!(row_set(&sink, &[&x]), expected);
}

/// Filters apply on every join strategy, including a shared value set.
#[test]
fn test_filter_on_single_unbound() {
    let age = Variable::new("age");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(uri("carol"), uri("age"), age.clone()));
    query.add_value_filter(age, Arc::new(NumericCompareFilter::new(50.0, CompareOp::GreaterThan)));

    assert!(run(&query, &ages()).rows.is_empty());
}

/// Several filters on one variable must all pass.
#[test]
fn test_filters_combine() {
    let x = Variable::new("x");
    let mail = Variable::new("mail");
    let age = Variable::new("age");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("age"), age.clone()));
    query.add_edge(Edge::new(x.clone(), uri("mail"), mail.clone()));
    query.add_value_filter(mail.clone(), Arc::new(StringContainsFilter::new("@example")));
    query.add_value_filter(mail, Arc::new(StringContainsFilter::new(".org")));
    query.add_value_filter(age, Arc::new(NumericCompareFilter::new(18.0, CompareOp::GreaterThan)));

    let sink = run(&query, &ages());
    assert_eq!(row_set(&sink, &[&x]), [vec![Some(res("alice"))]].into_iter().collect());
}
