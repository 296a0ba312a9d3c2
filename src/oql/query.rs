//! The universal query container and its operation-specific clause types.
//!
//! A [`Query`] is produced by a reverse translator, is immutable from the
//! caller's perspective afterward, and is consumed by a renderer. Only the
//! slots relevant to the operation are populated; the rest stay at their
//! defaults.

use serde::Serialize;

use super::condition::Condition;
use super::expr::Expression;
use super::field::Field;

// =============================================================================
// Operations
// =============================================================================

/// Every OQL operation, as a closed sum.
///
/// `as_str()` values are the canonical operation strings; downstream
/// consumers depend on them and they must never be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    // DQL / DML
    Get,
    Create,
    Update,
    Delete,
    Upsert,
    Replace,
    BulkInsert,
    // Aggregates
    Count,
    Sum,
    Avg,
    Min,
    Max,
    // DDL
    CreateTable,
    AlterTable,
    DropTable,
    TruncateTable,
    RenameTable,
    CreateView,
    DropView,
    CreateIndex,
    DropIndex,
    CreateSequence,
    DropSequence,
    CreateSchema,
    DropSchema,
    CreateType,
    DropType,
    CreateDomain,
    DropDomain,
    CreateFunction,
    DropFunction,
    CreateTrigger,
    DropTrigger,
    CreatePolicy,
    DropPolicy,
    CreateRule,
    DropRule,
    CreateExtension,
    DropExtension,
    Comment,
    CreateDatabase,
    DropDatabase,
    Use,
    // TCL
    Begin,
    Commit,
    Rollback,
    Savepoint,
    ReleaseSavepoint,
    RollbackTo,
    SetTransaction,
    // DCL
    Grant,
    Revoke,
    CreateUser,
    AlterUser,
    DropUser,
    CreateRole,
    DropRole,
}

impl Operation {
    /// The canonical operation string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "GET",
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Upsert => "UPSERT",
            Operation::Replace => "REPLACE",
            Operation::BulkInsert => "BULK INSERT",
            Operation::Count => "COUNT",
            Operation::Sum => "SUM",
            Operation::Avg => "AVG",
            Operation::Min => "MIN",
            Operation::Max => "MAX",
            Operation::CreateTable => "CREATE TABLE",
            Operation::AlterTable => "ALTER TABLE",
            Operation::DropTable => "DROP TABLE",
            Operation::TruncateTable => "TRUNCATE TABLE",
            Operation::RenameTable => "RENAME TABLE",
            Operation::CreateView => "CREATE VIEW",
            Operation::DropView => "DROP VIEW",
            Operation::CreateIndex => "CREATE INDEX",
            Operation::DropIndex => "DROP INDEX",
            Operation::CreateSequence => "CREATE SEQUENCE",
            Operation::DropSequence => "DROP SEQUENCE",
            Operation::CreateSchema => "CREATE SCHEMA",
            Operation::DropSchema => "DROP SCHEMA",
            Operation::CreateType => "CREATE TYPE",
            Operation::DropType => "DROP TYPE",
            Operation::CreateDomain => "CREATE DOMAIN",
            Operation::DropDomain => "DROP DOMAIN",
            Operation::CreateFunction => "CREATE FUNCTION",
            Operation::DropFunction => "DROP FUNCTION",
            Operation::CreateTrigger => "CREATE TRIGGER",
            Operation::DropTrigger => "DROP TRIGGER",
            Operation::CreatePolicy => "CREATE POLICY",
            Operation::DropPolicy => "DROP POLICY",
            Operation::CreateRule => "CREATE RULE",
            Operation::DropRule => "DROP RULE",
            Operation::CreateExtension => "CREATE EXTENSION",
            Operation::DropExtension => "DROP EXTENSION",
            Operation::Comment => "COMMENT",
            Operation::CreateDatabase => "CREATE DATABASE",
            Operation::DropDatabase => "DROP DATABASE",
            Operation::Use => "USE",
            Operation::Begin => "BEGIN",
            Operation::Commit => "COMMIT",
            Operation::Rollback => "ROLLBACK",
            Operation::Savepoint => "SAVEPOINT",
            Operation::ReleaseSavepoint => "RELEASE SAVEPOINT",
            Operation::RollbackTo => "ROLLBACK TO",
            Operation::SetTransaction => "SET TRANSACTION",
            Operation::Grant => "GRANT",
            Operation::Revoke => "REVOKE",
            Operation::CreateUser => "CREATE USER",
            Operation::AlterUser => "ALTER USER",
            Operation::DropUser => "DROP USER",
            Operation::CreateRole => "CREATE ROLE",
            Operation::DropRole => "DROP ROLE",
        }
    }

    /// True for the five aggregate operations.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Operation::Count | Operation::Sum | Operation::Avg | Operation::Min | Operation::Max
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Clause types
// =============================================================================

/// A projected expression with an optional alias.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectColumn {
    pub expr: Expression,
    pub alias: Option<String>,
}

impl SelectColumn {
    pub fn new(expr: Expression) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: Expression, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
            JoinType::Cross => "CROSS",
        }
    }
}

/// A JOIN clause: `<type> JOIN <table> ON <left> = <right>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
    pub join_type: JoinType,
    pub table: String,
    pub left: Expression,
    pub right: Expression,
}

/// An ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBy {
    pub expr: Expression,
    pub desc: bool,
}

impl OrderBy {
    pub fn asc(expr: Expression) -> Self {
        Self { expr, desc: false }
    }

    pub fn desc(expr: Expression) -> Self {
        Self { expr, desc: true }
    }
}

/// A WITH clause: the named sub-query plus the main query that uses it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cte {
    pub name: String,
    pub query: Box<Query>,
    pub main_query: Box<Query>,
    pub recursive: bool,
}

/// Set operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl SetOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION ALL",
            SetOp::Intersect => "INTERSECT",
            SetOp::Except => "EXCEPT",
        }
    }
}

/// `(<left>) <op> (<right>)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetOperation {
    pub op: SetOp,
    pub left: Box<Query>,
    pub right: Box<Query>,
}

/// ON CONFLICT targets and assignments for UPSERT.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UpsertClause {
    pub conflict_fields: Vec<String>,
    pub update_fields: Vec<Field>,
}

/// A named window function in the projection list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowFunction {
    /// Always an `Expression::Window`.
    pub expr: Expression,
    pub alias: String,
}

/// The aggregate target of COUNT/SUM/AVG/MIN/MAX queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSpec {
    /// The aggregated column, `*` for COUNT(*).
    pub field: String,
    pub alias: Option<String>,
    pub distinct: bool,
}

impl AggregateSpec {
    pub fn over(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            alias: None,
            distinct: false,
        }
    }
}

/// ALTER TABLE sub-operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlterKind {
    AddColumn,
    DropColumn,
    ModifyColumn,
}

impl AlterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlterKind::AddColumn => "ADD_COLUMN",
            AlterKind::DropColumn => "DROP_COLUMN",
            AlterKind::ModifyColumn => "MODIFY_COLUMN",
        }
    }
}

/// One ALTER TABLE action and its column payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlterAction {
    pub kind: AlterKind,
    pub field: Field,
}

/// CREATE/DROP INDEX payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Transaction attributes for TCL operations.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TransactionSpec {
    pub savepoint: Option<String>,
    pub isolation_level: Option<String>,
    pub read_only: Option<bool>,
}

/// Grant/revoke/user attributes for DCL operations.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PermissionSpec {
    pub privileges: Vec<String>,
    /// The table/entity the privileges apply to.
    pub on_entity: Option<String>,
    /// The user or role receiving (or losing) the privileges.
    pub grantee: Option<String>,
    pub password: Option<String>,
    pub roles: Vec<String>,
}

// =============================================================================
// Query
// =============================================================================

/// The universal container every reverse translator produces and every
/// renderer consumes. Entities within (expressions, conditions, fields) are
/// owned by the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub operation: Operation,
    /// Semantic singular PascalCase name of the table/collection/key-space.
    pub entity: String,

    // Projection
    pub columns: Vec<String>,
    pub select_columns: Vec<SelectColumn>,
    pub distinct: bool,

    // Predicates
    pub conditions: Vec<Condition>,
    pub having: Vec<Condition>,

    // Data
    pub fields: Vec<Field>,
    pub bulk_rows: Vec<Vec<Field>>,

    // DQL shape
    pub joins: Vec<Join>,
    pub group_by: Vec<Expression>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub aggregate: Option<AggregateSpec>,
    pub window_functions: Vec<WindowFunction>,
    pub cte: Option<Cte>,
    pub subquery: Option<Box<Query>>,
    pub set_operation: Option<SetOperation>,

    // DML extras
    pub upsert: Option<UpsertClause>,

    // DDL
    pub view_query: Option<Box<Query>>,
    pub alter: Option<AlterAction>,
    pub index: Option<IndexDef>,
    pub sequence: Option<String>,
    pub schema: Option<String>,
    pub type_name: Option<String>,
    pub domain: Option<String>,
    pub function: Option<String>,
    pub trigger: Option<String>,
    pub policy: Option<String>,
    pub rule: Option<String>,
    pub extension: Option<String>,
    pub database: Option<String>,
    pub comment: Option<String>,

    // TCL / DCL
    pub transaction: Option<TransactionSpec>,
    pub permission: Option<PermissionSpec>,
}

impl Query {
    /// A query with the given operation and entity; all slots empty.
    pub fn new(operation: Operation, entity: impl Into<String>) -> Self {
        Self {
            operation,
            entity: entity.into(),
            columns: Vec::new(),
            select_columns: Vec::new(),
            distinct: false,
            conditions: Vec::new(),
            having: Vec::new(),
            fields: Vec::new(),
            bulk_rows: Vec::new(),
            joins: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            aggregate: None,
            window_functions: Vec::new(),
            cte: None,
            subquery: None,
            set_operation: None,
            upsert: None,
            view_query: None,
            alter: None,
            index: None,
            sequence: None,
            schema: None,
            type_name: None,
            domain: None,
            function: None,
            trigger: None,
            policy: None,
            rule: None,
            extension: None,
            database: None,
            comment: None,
            transaction: None,
            permission: None,
        }
    }

    /// A statement-level query with no entity (TCL mostly).
    pub fn bare(operation: Operation) -> Self {
        Self::new(operation, "")
    }
}
