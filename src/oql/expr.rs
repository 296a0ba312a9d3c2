//! Expression AST - the core of the OQL tree.
//!
//! Every value position in a query (a projected column, a WHERE operand, an
//! UPDATE assignment, a window call) is an [`Expression`]. The variant
//! discriminator is the sole source of truth for interpretation: renderers
//! and transformers branch exclusively on it, and the compiler enforces
//! exhaustive handling.

use serde::Serialize;

use super::condition::Condition;
use super::query::Query;

/// The string stored by a `Literal` node to represent SQL NULL.
pub const NULL_SENTINEL: &str = "NULL";

// =============================================================================
// Expression AST
// =============================================================================

/// An OQL expression node.
///
/// Subtrees are owned: every node is the unique owner of its children, so the
/// tree is acyclic by construction. Identifier and literal values are stored
/// verbatim as parsed - quoting is the renderer's concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    /// Identifier reference: `users.id`, `age`, `*`.
    Field { value: String },

    /// String-encoded scalar. NULL is the literal string `"NULL"`,
    /// booleans are `"true"` / `"false"`.
    Literal { value: String },

    /// `left op right` with both children always present.
    Binary {
        left: Box<Expression>,
        operator: String,
        right: Box<Expression>,
    },

    /// Function call: `name(arg1, ...)`. Zero arguments is valid.
    Function { name: String, args: Vec<Expression> },

    /// `CASE WHEN ... THEN ... [ELSE ...] END` with at least one arm.
    CaseWhen {
        arms: Vec<CaseArm>,
        else_expr: Option<Box<Expression>>,
    },

    /// Window function: `name(args) OVER (PARTITION BY ... ORDER BY ...)`.
    ///
    /// `offset` carries the LAG/LEAD distance, `buckets` the NTILE count;
    /// both are zero when not applicable.
    Window {
        name: String,
        args: Vec<Expression>,
        partition_by: Vec<Expression>,
        order_by: Vec<WindowOrder>,
        offset: i64,
        buckets: i64,
    },

    /// Scalar subquery: `(SELECT ...)`.
    Subquery(Box<Query>),
}

/// One `WHEN condition THEN expr` arm of a CASE expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseArm {
    pub when: Condition,
    pub then: Expression,
}

/// ORDER BY entry inside a window specification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowOrder {
    pub expr: Expression,
    pub desc: bool,
}

impl WindowOrder {
    pub fn asc(expr: Expression) -> Self {
        Self { expr, desc: false }
    }

    pub fn desc(expr: Expression) -> Self {
        Self { expr, desc: true }
    }
}

impl Expression {
    /// The identifier or literal text of a leaf node, if this is a leaf.
    pub fn leaf_value(&self) -> Option<&str> {
        match self {
            Expression::Field { value } | Expression::Literal { value } => Some(value),
            _ => None,
        }
    }

    /// True for `Literal("NULL")`.
    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expression::Literal { value } if value == NULL_SENTINEL)
    }

    /// True when rendering this node must inline it rather than bind a
    /// parameter (compound expressions have no single scalar value).
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            Expression::Binary { .. }
                | Expression::Function { .. }
                | Expression::CaseWhen { .. }
                | Expression::Window { .. }
                | Expression::Subquery(_)
        )
    }
}

// =============================================================================
// Constructors
// =============================================================================
//
// Builders enforce the structural invariants at construction time, so a
// well-typed tree is a well-formed tree.

/// Create an identifier node.
pub fn field(value: impl Into<String>) -> Expression {
    Expression::Field {
        value: value.into(),
    }
}

/// Create the `*` identifier.
pub fn star() -> Expression {
    field("*")
}

/// Create a literal node holding the string-encoded scalar.
pub fn literal(value: impl Into<String>) -> Expression {
    Expression::Literal {
        value: value.into(),
    }
}

/// Create the NULL literal.
pub fn null_literal() -> Expression {
    literal(NULL_SENTINEL)
}

/// Create a binary node. Both children are required.
pub fn binary(left: Expression, operator: impl Into<String>, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        operator: operator.into(),
        right: Box::new(right),
    }
}

/// Create a function call node.
pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Expression {
    Expression::Function {
        name: name.into(),
        args,
    }
}

/// Create a CASE expression.
///
/// # Panics
///
/// Panics if `arms` is empty - a CASE with no WHEN arm is not representable.
pub fn case_when(arms: Vec<CaseArm>, else_expr: Option<Expression>) -> Expression {
    assert!(!arms.is_empty(), "CASE expression requires at least one WHEN arm");
    Expression::CaseWhen {
        arms,
        else_expr: else_expr.map(Box::new),
    }
}

/// Create a window function node.
pub fn window(
    name: impl Into<String>,
    args: Vec<Expression>,
    partition_by: Vec<Expression>,
    order_by: Vec<WindowOrder>,
) -> Expression {
    Expression::Window {
        name: name.into(),
        args,
        partition_by,
        order_by,
        offset: 0,
        buckets: 0,
    }
}

/// Create a scalar subquery node.
pub fn subquery(query: Query) -> Expression {
    Expression::Subquery(Box::new(query))
}

// =============================================================================
// Tests
// =============================================================================
