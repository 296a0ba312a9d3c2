//! The OQL intermediate representation.
//!
//! One typed, owned tree sits between every source dialect and every target
//! dialect: reverse translators build it, renderers consume it, and nothing
//! else passes between them.

pub mod condition;
pub mod expr;
pub mod field;
pub mod query;

pub use condition::{normalize_logic, Condition, Logic, Operator};
pub use expr::{
    binary, case_when, field, function, literal, null_literal, star, subquery, window, CaseArm,
    Expression, WindowOrder, NULL_SENTINEL,
};
pub use field::{Constraint, Field};
pub use query::{
    AggregateSpec, AlterAction, AlterKind, Cte, IndexDef, Join, JoinType, Operation, OrderBy,
    PermissionSpec, Query, SelectColumn, SetOp, SetOperation, TransactionSpec, UpsertClause,
    WindowFunction,
};
