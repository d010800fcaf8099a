//! Resource model: entities, literals, variables, and statements.

mod resource;
mod statement;

pub use resource::{Entity, Literal, Resource, Variable};
pub use statement::{Edge, Statement, StatementTemplate};
