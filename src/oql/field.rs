//! Field triples: the name/value/constraints unit used by INSERT values,
//! UPDATE assignments, and column definitions.

use serde::Serialize;

use super::expr::Expression;

/// Column-level constraint markers.
///
/// `Default` carries the default value so the renderer can emit it; the other
/// markers are bare flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Constraint {
    Unique,
    NotNull,
    PrimaryKey,
    Default(Expression),
    /// The field renames a column; `name` holds the old name, `value` the new.
    Rename,
}

/// A named value: an INSERT column, an UPDATE assignment, or a column
/// definition (where `value` holds the OQL type instead of data).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// The identifier, always a `Field` expression.
    pub name: Expression,
    /// A data literal, a compound expression, or a type literal for DDL.
    pub value: Option<Expression>,
    pub constraints: Vec<Constraint>,
}

impl Field {
    pub fn new(name: Expression, value: Option<Expression>) -> Self {
        Self {
            name,
            value,
            constraints: Vec::new(),
        }
    }

    /// Shorthand for a plain `name = literal` field.
    pub fn assignment(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(super::expr::field(name), Some(super::expr::literal(value)))
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// The column name as text, when the name is a plain identifier.
    pub fn name_text(&self) -> &str {
        self.name.leaf_value().unwrap_or("")
    }

    pub fn has_constraint(&self, constraint: &Constraint) -> bool {
        self.constraints.contains(constraint)
    }

    pub fn is_rename(&self) -> bool {
        self.constraints.iter().any(|c| matches!(c, Constraint::Rename))
    }
}
