//! Compare the engine against a brute-force evaluator on random inputs.
//!
//! Each seed builds a small random store, a random pattern of required
//! edges and up to two optional edges. The brute-force evaluator tries every
//! statement for every required edge in nested loops, then left-joins the
//! optional edges in order: an optional edge extends a row with each match,
//! keeps the row when nothing matches, and leaves the row alone when one of
//! its earlier-bound variables is unbound. Both must produce the same set of
//! rows.

use std::collections::{BTreeSet, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::e2e_tests::helpers::uri;
use crate::query::{BufferSink, GraphMatch, QueryError};
use crate::store::MemoryStore;
use crate::types::{Edge, Literal, Resource, Statement, Variable};

const SEEDS: u64 = 300;
const ENTITIES: [&str; 4] = ["e0", "e1", "e2", "e3"];
const PREDICATES: [&str; 2] = ["p0", "p1"];
const LITERALS: [&str; 2] = ["l0", "l1"];

type Row = Vec<Option<Resource>>;

fn random_entity(rng: &mut StdRng) -> Resource {
    uri(ENTITIES[rng.random_range(0..ENTITIES.len())]).into()
}

fn random_predicate(rng: &mut StdRng) -> Resource {
    uri(PREDICATES[rng.random_range(0..PREDICATES.len())]).into()
}

fn random_literal(rng: &mut StdRng) -> Resource {
    Literal::new(LITERALS[rng.random_range(0..LITERALS.len())]).into()
}

fn random_store(rng: &mut StdRng) -> Vec<Statement> {
    let count = rng.random_range(4..16);
    (0..count)
        .filter_map(|_| {
            let subject = random_entity(rng).as_entity()?.clone();
            let predicate = random_predicate(rng).as_entity()?.clone();
            let object = if rng.random_bool(0.2) {
                random_literal(rng)
            } else {
                random_entity(rng)
            };
            Some(Statement::new(subject, predicate, object))
        })
        .collect()
}

fn random_variable(rng: &mut StdRng, variables: &[Variable]) -> Resource {
    variables[rng.random_range(0..variables.len())].clone().into()
}

fn random_pattern(rng: &mut StdRng, variables: &[Variable]) -> Vec<Edge> {
    let count = rng.random_range(1..=3);
    (0..count)
        .map(|_| {
            let subject = if rng.random_bool(0.6) {
                random_variable(rng, variables)
            } else {
                random_entity(rng)
            };
            let predicate = if rng.random_bool(0.25) {
                random_variable(rng, variables)
            } else {
                random_predicate(rng)
            };
            let object = if rng.random_bool(0.6) {
                random_variable(rng, variables)
            } else if rng.random_bool(0.8) {
                random_entity(rng)
            } else {
                random_literal(rng)
            };
            Edge::new(subject, predicate, object)
        })
        .collect()
}

/// An optional edge and the variable it introduces, if any.
struct OptionalEdge {
    edge: Edge,
    introduces: Option<Variable>,
}

/// Optional edges anchored on a required variable. The second one either
/// hangs off the first one's new variable or off another required variable.
fn random_optional_edges(
    rng: &mut StdRng,
    required: &[Variable],
    fresh: &[Variable; 2],
) -> Vec<OptionalEdge> {
    if required.is_empty() {
        return Vec::new();
    }
    let count = rng.random_range(0..=2);
    let mut optional: Vec<OptionalEdge> = Vec::with_capacity(count);
    for new_variable in fresh.iter().take(count) {
        let anchor: Resource = match optional.first() {
            Some(first) if rng.random_bool(0.5) => first.introduces.clone().map_or_else(
                || required[0].clone().into(),
                Resource::from,
            ),
            _ => random_variable(rng, required),
        };
        let (other, introduces) = if rng.random_bool(0.75) {
            (new_variable.clone().into(), Some(new_variable.clone()))
        } else {
            (random_entity(rng), None)
        };
        let predicate = random_predicate(rng);
        let edge = if rng.random_bool(0.5) {
            Edge::new(anchor, predicate, other)
        } else {
            Edge::new(other, predicate, anchor)
        };
        optional.push(OptionalEdge { edge, introduces });
    }
    optional
}

type Binding = HashMap<Variable, Resource>;

/// Bind `pattern` to `value`, or check it against the current binding.
fn unify(pattern: &Resource, value: Resource, binding: &mut Binding) -> bool {
    match pattern {
        Resource::Variable(variable) => match binding.get(variable) {
            Some(bound) => *bound == value,
            None => {
                binding.insert(variable.clone(), value);
                true
            }
        },
        Resource::Entity(_) | Resource::Literal(_) => *pattern == value,
    }
}

/// Every extension of `binding` that matches `edge` against one statement.
fn extensions(edge: &Edge, statements: &[Statement], binding: &Binding) -> Vec<Binding> {
    statements
        .iter()
        .filter_map(|statement| {
            let mut extended = binding.clone();
            (unify(&edge.subject, statement.subject.clone().into(), &mut extended)
                && unify(&edge.predicate, statement.predicate.clone().into(), &mut extended)
                && unify(&edge.object, statement.object.clone(), &mut extended))
            .then_some(extended)
        })
        .collect()
}

fn brute_force(edges: &[Edge], statements: &[Statement], binding: &Binding, out: &mut Vec<Binding>) {
    let Some((edge, rest)) = edges.split_first() else {
        out.push(binding.clone());
        return;
    };
    for extended in extensions(edge, statements, binding) {
        brute_force(rest, statements, &extended, out);
    }
}

fn left_join(solutions: Vec<Binding>, optional: &OptionalEdge, statements: &[Statement]) -> Vec<Binding> {
    let prior: Vec<&Variable> = optional
        .edge
        .positions()
        .into_iter()
        .filter_map(Resource::as_variable)
        .filter(|&variable| Some(variable) != optional.introduces.as_ref())
        .collect();

    let mut joined = Vec::new();
    for solution in solutions {
        if !prior.iter().all(|&variable| solution.contains_key(variable)) {
            joined.push(solution);
            continue;
        }
        let matches = extensions(&optional.edge, statements, &solution);
        if matches.is_empty() {
            joined.push(solution);
        } else {
            joined.extend(matches);
        }
    }
    joined
}

fn engine_rows(sink: &BufferSink) -> BTreeSet<Row> {
    sink.rows
        .iter()
        .map(|row| row.iter().map(|binding| binding.target.clone()).collect())
        .collect()
}

#[test]
fn test_engine_matches_brute_force() {
    let mut checked = 0;
    let mut with_optional = 0;

    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let variables = [Variable::new("a"), Variable::new("b"), Variable::new("c")];
        let fresh = [Variable::new("o1"), Variable::new("o2")];
        let statements = random_store(&mut rng);
        let edges = random_pattern(&mut rng, &variables);

        let required: Vec<Variable> = variables
            .iter()
            .filter(|&variable| {
                edges
                    .iter()
                    .any(|edge| edge.positions().into_iter().any(|r| r.as_variable() == Some(variable)))
            })
            .cloned()
            .collect();
        let optional = random_optional_edges(&mut rng, &required, &fresh);

        let source: MemoryStore = statements.iter().cloned().collect();
        let mut query = GraphMatch::new();
        for edge in &edges {
            query.add_edge(edge.clone());
        }
        for edge in &optional {
            query.add_optional_edge(edge.edge.clone());
        }

        let mut sink = BufferSink::new();
        match query.run(&source, &mut sink) {
            Ok(()) => {}
            Err(QueryError::Execution(_) | QueryError::Format(_)) => continue,
            Err(err) => panic!("seed {seed}: unexpected error {err}"),
        }

        let mut solutions = Vec::new();
        brute_force(&edges, &statements, &HashMap::new(), &mut solutions);
        for edge in &optional {
            solutions = left_join(solutions, edge, &statements);
        }
        let expected: BTreeSet<Row> = solutions
            .iter()
            .map(|binding| sink.columns.iter().map(|v| binding.get(v).cloned()).collect())
            .collect();

        let pattern: Vec<String> = edges.iter().map(ToString::to_string).collect();
        let optional_pattern: Vec<String> = optional.iter().map(|o| o.edge.to_string()).collect();
        assert_eq!(
            engine_rows(&sink),
            expected,
            "seed {seed}: pattern {pattern:?} optional {optional_pattern:?}\n{}",
            query.explanation()
        );
        checked += 1;
        if !optional.is_empty() {
            with_optional += 1;
        }
    }

    assert!(checked > SEEDS / 2, "only {checked} seeds produced a runnable pattern");
    assert!(with_optional > SEEDS / 4, "only {with_optional} seeds exercised optional edges");
}
