//! Statements, statement templates and pattern edges.

use std::fmt;

use serde::Serialize;

use super::resource::{Entity, Resource};

/// An immutable quad: subject, predicate, object, and a graph tag.
///
/// # Invariants
///
/// - Subject and predicate are always entities.
/// - `meta` is `Entity::DefaultGraph` for statements in no particular graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Statement {
    /// The resource the statement is about.
    pub subject: Entity,
    /// The relation.
    pub predicate: Entity,
    /// The value or target resource.
    pub object: Resource,
    /// Provenance / graph tag.
    pub meta: Entity,
}

impl Statement {
    /// Create a statement in the default graph.
    #[must_use]
    pub fn new(subject: Entity, predicate: Entity, object: impl Into<Resource>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
            meta: Entity::DefaultGraph,
        }
    }

    /// Create a statement tagged with a graph.
    #[must_use]
    pub fn with_meta(
        subject: Entity,
        predicate: Entity,
        object: impl Into<Resource>,
        meta: Entity,
    ) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
            meta,
        }
    }

    /// Copy of this statement with the graph tag reset to the default graph.
    #[must_use]
    pub fn without_meta(&self) -> Self {
        Self::new(
            self.subject.clone(),
            self.predicate.clone(),
            self.object.clone(),
        )
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if self.meta != Entity::DefaultGraph {
            write!(f, " {}", self.meta)?;
        }
        Ok(())
    }
}

/// A statement where any position may be a wildcard (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementTemplate {
    /// Subject, or any.
    pub subject: Option<Entity>,
    /// Predicate, or any.
    pub predicate: Option<Entity>,
    /// Object, or any.
    pub object: Option<Resource>,
    /// Graph tag, or any.
    pub meta: Option<Entity>,
}

impl StatementTemplate {
    /// A template matching every statement.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Check if a statement matches this template.
    #[must_use]
    pub fn matches(&self, statement: &Statement) -> bool {
        self.subject.as_ref().is_none_or(|s| *s == statement.subject)
            && self
                .predicate
                .as_ref()
                .is_none_or(|p| *p == statement.predicate)
            && self.object.as_ref().is_none_or(|o| *o == statement.object)
            && self.meta.as_ref().is_none_or(|m| *m == statement.meta)
    }
}

impl From<&Statement> for StatementTemplate {
    fn from(statement: &Statement) -> Self {
        Self {
            subject: Some(statement.subject.clone()),
            predicate: Some(statement.predicate.clone()),
            object: Some(statement.object.clone()),
            meta: Some(statement.meta.clone()),
        }
    }
}

impl fmt::Display for StatementTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn slot(f: &mut fmt::Formatter<'_>, value: Option<&dyn fmt::Display>) -> fmt::Result {
            match value {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "*"),
            }
        }
        slot(f, self.subject.as_ref().map(|s| s as &dyn fmt::Display))?;
        write!(f, " ")?;
        slot(f, self.predicate.as_ref().map(|p| p as &dyn fmt::Display))?;
        write!(f, " ")?;
        slot(f, self.object.as_ref().map(|o| o as &dyn fmt::Display))
    }
}

/// One triple of a query pattern. Any position may hold a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Subject: an entity or a variable.
    pub subject: Resource,
    /// Predicate: an entity or a variable.
    pub predicate: Resource,
    /// Object: any resource.
    pub object: Resource,
}

impl Edge {
    /// Create a pattern edge.
    #[must_use]
    pub fn new(
        subject: impl Into<Resource>,
        predicate: impl Into<Resource>,
        object: impl Into<Resource>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Positions in subject, predicate, object order.
    #[must_use]
    pub const fn positions(&self) -> [&Resource; 3] {
        [&self.subject, &self.predicate, &self.object]
    }
}

impl From<&Statement> for Edge {
    fn from(statement: &Statement) -> Self {
        Self::new(
            statement.subject.clone(),
            statement.predicate.clone(),
            statement.object.clone(),
        )
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Literal, Variable};

    #[test]
    fn test_template_wildcards() {
        let s = Statement::new(
            Entity::uri("http://a"),
            Entity::uri("http://p"),
            Literal::new("v"),
        );
        assert!(StatementTemplate::all().matches(&s));

        let template = StatementTemplate {
            subject: Some(Entity::uri("http://a")),
            ..StatementTemplate::default()
        };
        assert!(template.matches(&s));

        let template = StatementTemplate {
            object: Some(Literal::new("w").into()),
            ..StatementTemplate::default()
        };
        assert!(!template.matches(&s));
    }

    #[test]
    fn test_template_meta() {
        let graph = Entity::uri("http://g");
        let s = Statement::with_meta(
            Entity::uri("http://a"),
            Entity::uri("http://p"),
            Entity::uri("http://b"),
            graph.clone(),
        );
        let mut template = StatementTemplate::from(&s.without_meta());
        assert!(!template.matches(&s));
        template.meta = Some(graph);
        assert!(template.matches(&s));
    }

    #[test]
    fn test_display() {
        let s = Statement::new(
            Entity::uri("http://a"),
            Entity::uri("http://p"),
            Literal::new("v"),
        );
        assert_eq!(s.to_string(), "<http://a> <http://p> \"v\"");

        let edge = Edge::new(Variable::new("x"), Entity::uri("http://p"), Literal::new("v"));
        assert_eq!(edge.to_string(), "?x <http://p> \"v\"");
    }
}
