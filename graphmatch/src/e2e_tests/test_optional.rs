//! Test optional statements (left join semantics).

use std::collections::BTreeSet;

use crate::e2e_tests::helpers::{lit, res, row_set, rows, run, uri};
use crate::query::GraphMatch;
use crate::store::MemoryStore;
use crate::types::{Edge, Literal, Statement, Variable};

fn people() -> MemoryStore {
    [
        Statement::new(uri("alice"), uri("type"), uri("Person")),
        Statement::new(uri("bob"), uri("type"), uri("Person")),
        Statement::new(uri("carol"), uri("type"), uri("Person")),
        Statement::new(uri("alice"), uri("email"), Literal::new("alice@example.org")),
        Statement::new(uri("carol"), uri("email"), Literal::new("carol@example.org")),
        Statement::new(uri("carol"), uri("email"), Literal::new("c@example.org")),
        Statement::new(uri("rex"), uri("type"), uri("Dog")),
    ]
    .into_iter()
    .collect()
}

fn person_email_query(x: &Variable, e: &Variable) -> GraphMatch {
    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("type"), uri("Person")));
    query.add_optional_edge(Edge::new(x.clone(), uri("email"), e.clone()));
    query
}

/// A single person without an email yields one row with `e` unbound.
#[test]
fn test_optional_missing_for_single_subject() {
    let source: MemoryStore = [Statement::new(uri("bob"), uri("type"), uri("Person"))]
        .into_iter()
        .collect();
    let x = Variable::new("x");
    let e = Variable::new("e");

    let sink = run(&person_email_query(&x, &e), &source);
    assert_eq!(rows(&sink, &[&x, &e]), vec![vec![Some(res("bob")), None]]);
}

/// Several people, some with emails, one with two.
///
/// Expected: one row per (person, email), and exactly one row with `e`
/// unbound for the person without an email.
#[test]
fn test_optional_with_several_subjects() {
    let x = Variable::new("x");
    let e = Variable::new("e");

    let sink = run(&person_email_query(&x, &e), &people());
    assert_eq!(sink.rows.len(), 4);

    let expected: BTreeSet<_> = [
        vec![Some(res("alice")), Some(lit("alice@example.org"))],
        vec![Some(res("bob")), None],
        vec![Some(res("carol")), Some(lit("carol@example.org"))],
        vec![Some(res("carol")), Some(lit("c@example.org"))],
    ]
    .into_iter()
    .collect();
    assert_eq!(row_set(&sink, &[&x, &e]), expected);
}

/// An optional statement that matches nothing at all keeps every row.
#[test]
fn test_optional_never_matching() {
    let x = Variable::new("x");
    let phone = Variable::new("phone");

    let mut query = GraphMatch::new();
    query.add_edge(Edge::new(x.clone(), uri("type"), uri("Person")));
    query.add_optional_edge(Edge::new(x.clone(), uri("phone"), phone.clone()));

    let sink = run(&query, &people());
    assert_eq!(sink.rows.len(), 3);
    assert!(sink.column(&phone).iter().all(Option::is_none));
}

/// Optional statements run after every required one, whatever the insertion order.
#[test]
fn test_optional_added_first() {
    let x = Variable::new("x");
    let e = Variable::new("e");

    let mut query = GraphMatch::new();
    query.add_optional_edge(Edge::new(x.clone(), uri("email"), e.clone()));
    query.add_edge(Edge::new(x.clone(), uri("type"), uri("Person")));

    let sink = run(&query, &people());
    assert_eq!(sink.rows.len(), 4);
    // Optional variables come after required ones in the columns.
    assert_eq!(sink.columns, vec![x, e]);
}

/// required `?x type Person`, then `?x email ?e`, then `?e ?p ?v`, both optional.
fn mailbox_chain_query(x: &Variable, mbox: &Variable, prop: &Variable, value: &Variable) -> GraphMatch {
    let mut query = person_email_query(x, mbox);
    query.add_optional_edge(Edge::new(mbox.clone(), prop.clone(), value.clone()));
    query
}

/// The second link depends on a variable only the failed first link binds:
/// the row survives with the whole chain unbound instead of scanning the source.
#[test]
fn test_optional_chain_first_link_fails() {
    let source: MemoryStore = [Statement::new(uri("alice"), uri("type"), uri("Person"))]
        .into_iter()
        .collect();
    let [x, mbox, prop, value] = ["x", "mbox", "prop", "value"].map(Variable::new);

    let sink = run(&mailbox_chain_query(&x, &mbox, &prop, &value), &source);
    assert_eq!(
        rows(&sink, &[&x, &mbox, &prop, &value]),
        vec![vec![Some(res("alice")), None, None, None]]
    );
}

#[test]
fn test_optional_chain_both_links_match() {
    let source: MemoryStore = [
        Statement::new(uri("alice"), uri("type"), uri("Person")),
        Statement::new(uri("alice"), uri("email"), uri("mbox-a")),
        Statement::new(uri("mbox-a"), uri("host"), uri("server1")),
    ]
    .into_iter()
    .collect();
    let [x, mbox, prop, value] = ["x", "mbox", "prop", "value"].map(Variable::new);

    let sink = run(&mailbox_chain_query(&x, &mbox, &prop, &value), &source);
    assert_eq!(
        rows(&sink, &[&x, &mbox, &prop, &value]),
        vec![vec![
            Some(res("alice")),
            Some(res("mbox-a")),
            Some(res("host")),
            Some(res("server1")),
        ]]
    );
}

/// Each person stops at the first link that fails for them.
#[test]
fn test_optional_chain_mixed() {
    let source: MemoryStore = [
        Statement::new(uri("alice"), uri("type"), uri("Person")),
        Statement::new(uri("bob"), uri("type"), uri("Person")),
        Statement::new(uri("carol"), uri("type"), uri("Person")),
        Statement::new(uri("alice"), uri("email"), uri("mbox-a")),
        Statement::new(uri("carol"), uri("email"), uri("mbox-c")),
        Statement::new(uri("mbox-a"), uri("host"), uri("server1")),
    ]
    .into_iter()
    .collect();
    let [x, mbox, prop, value] = ["x", "mbox", "prop", "value"].map(Variable::new);

    let sink = run(&mailbox_chain_query(&x, &mbox, &prop, &value), &source);
    let expected: BTreeSet<_> = [
        vec![
            Some(res("alice")),
            Some(res("mbox-a")),
            Some(res("host")),
            Some(res("server1")),
        ],
        vec![Some(res("bob")), None, None, None],
        vec![Some(res("carol")), Some(res("mbox-c")), None, None],
    ]
    .into_iter()
    .collect();
    assert_eq!(sink.rows.len(), 3);
    assert_eq!(row_set(&sink, &[&x, &mbox, &prop, &value]), expected);
}
