//! Resource types: the nodes and values that make up statements.
//!
//! - `Entity` - an identity-bearing resource (URI, blank node, or the default graph)
//! - `Literal` - a value-bearing resource (string value, language, datatype)
//! - `Variable` - a placeholder that only appears inside query patterns
//! - `Resource` - the closed union of the three

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::Serialize;

static NEXT_BLANK_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(1);

/// An identity-bearing resource.
///
/// Two entities are equal when they name the same thing: the same URI, the
/// same blank node, or both the default-graph sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Entity {
    /// A named resource.
    Uri(Arc<str>),
    /// An anonymous node. The id is unique within the process.
    Blank(u64),
    /// The graph tag carried by statements that belong to no particular graph.
    DefaultGraph,
}

impl Entity {
    /// Create a named entity.
    #[must_use]
    pub fn uri(uri: &str) -> Self {
        Self::Uri(Arc::from(uri))
    }

    /// Create a fresh anonymous node, distinct from every other one.
    #[must_use]
    pub fn blank() -> Self {
        Self::Blank(NEXT_BLANK_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Get the URI if this is a named entity.
    #[must_use]
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Self::Uri(uri) => Some(uri),
            Self::Blank(_) | Self::DefaultGraph => None,
        }
    }

    /// Check if this is an anonymous node.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        matches!(self, Self::Blank(_))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(uri) => write!(f, "<{uri}>"),
            Self::Blank(id) => write!(f, "_:b{id}"),
            Self::DefaultGraph => write!(f, "<>"),
        }
    }
}

/// A value-bearing resource.
///
/// Equality is by value: the lexical value, language tag and datatype must
/// all agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Literal {
    value: Arc<str>,
    language: Option<Arc<str>>,
    datatype: Option<Arc<str>>,
}

impl Literal {
    /// Create a plain literal.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self {
            value: Arc::from(value),
            language: None,
            datatype: None,
        }
    }

    /// Create a literal with a language tag.
    #[must_use]
    pub fn with_language(value: &str, language: &str) -> Self {
        Self {
            value: Arc::from(value),
            language: Some(Arc::from(language)),
            datatype: None,
        }
    }

    /// Create a typed literal.
    #[must_use]
    pub fn typed(value: &str, datatype: &str) -> Self {
        Self {
            value: Arc::from(value),
            language: None,
            datatype: Some(Arc::from(datatype)),
        }
    }

    /// Get the lexical value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the language tag, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Get the datatype URI, if any.
    #[must_use]
    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape(&self.value))?;
        if let Some(language) = &self.language {
            write!(f, "@{language}")?;
        }
        if let Some(datatype) = &self.datatype {
            write!(f, "^^<{datatype}>")?;
        }
        Ok(())
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A query placeholder.
///
/// Every call to `Variable::new` declares a distinct variable, even when two
/// calls use the same name. The name is only used for display and as the
/// result column label.
#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    #[serde(skip)]
    id: u64,
    name: Arc<str>,
}

impl Variable {
    /// Declare a new variable.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: NEXT_VARIABLE_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: Arc::from(name),
        }
    }

    /// Get the variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

/// Any resource that can appear in a statement or a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Resource {
    /// An identity-bearing resource.
    Entity(Entity),
    /// A value-bearing resource.
    Literal(Literal),
    /// A query placeholder. Never stored as data.
    Variable(Variable),
}

impl Resource {
    /// Get the entity if this is one.
    #[must_use]
    pub const fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::Literal(_) | Self::Variable(_) => None,
        }
    }

    /// Get the literal if this is one.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            Self::Entity(_) | Self::Variable(_) => None,
        }
    }

    /// Get the variable if this is one.
    #[must_use]
    pub const fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(variable) => Some(variable),
            Self::Entity(_) | Self::Literal(_) => None,
        }
    }

    /// Check if this is a variable.
    #[must_use]
    pub const fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(entity) => entity.fmt(f),
            Self::Literal(literal) => literal.fmt(f),
            Self::Variable(variable) => variable.fmt(f),
        }
    }
}

impl From<Entity> for Resource {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

impl From<Literal> for Resource {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<Variable> for Resource {
    fn from(variable: Variable) -> Self {
        Self::Variable(variable)
    }
}

impl From<&Entity> for Resource {
    fn from(entity: &Entity) -> Self {
        Self::Entity(entity.clone())
    }
}

impl From<&Literal> for Resource {
    fn from(literal: &Literal) -> Self {
        Self::Literal(literal.clone())
    }
}

impl From<&Variable> for Resource {
    fn from(variable: &Variable) -> Self {
        Self::Variable(variable.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_equality_by_uri() {
        assert_eq!(Entity::uri("http://a"), Entity::uri("http://a"));
        assert_ne!(Entity::uri("http://a"), Entity::uri("http://b"));
    }

    #[test]
    fn test_blank_nodes_are_distinct() {
        let a = Entity::blank();
        let b = Entity::blank();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert!(a.is_blank());
    }

    #[test]
    fn test_literal_equality_by_value() {
        assert_eq!(Literal::new("x"), Literal::new("x"));
        assert_ne!(Literal::new("x"), Literal::with_language("x", "en"));
        assert_ne!(
            Literal::typed("1", "http://www.w3.org/2001/XMLSchema#integer"),
            Literal::new("1")
        );
    }

    #[test]
    fn test_variables_with_same_name_are_distinct() {
        let a = Variable::new("x");
        let b = Variable::new("x");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.name(), "x");
    }

    #[test]
    fn test_display() {
        assert_eq!(Entity::uri("http://a").to_string(), "<http://a>");
        assert_eq!(
            Literal::with_language("say \"hi\"", "en").to_string(),
            "\"say \\\"hi\\\"\"@en"
        );
        assert_eq!(Variable::new("who").to_string(), "?who");
    }

    #[test]
    fn test_resource_accessors() {
        let entity = Resource::from(Entity::uri("http://a"));
        assert!(entity.as_entity().is_some());
        assert!(entity.as_literal().is_none());

        let variable = Resource::from(Variable::new("x"));
        assert!(variable.is_variable());
        assert!(variable.as_entity().is_none());
    }
}
