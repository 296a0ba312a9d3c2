//! Canonical mapping tables - the single source of truth for how OQL names
//! relate to each dialect's keywords, operators, and types.
//!
//! The tables are built once behind `Lazy` statics and frozen; every reverse
//! counterpart is derived eagerly at the same time (lowercased keys for
//! operations and types, exact keys for operators) so reverse translators can
//! look up `dialect token -> OQL` without re-deriving anything.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::oql::{Operation, Operator};

// =============================================================================
// Dialects
// =============================================================================

/// The four supported surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    PostgreSql,
    MySql,
    MongoDb,
    Redis,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::PostgreSql,
        Dialect::MySql,
        Dialect::MongoDb,
        Dialect::Redis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::PostgreSql => "PostgreSQL",
            Dialect::MySql => "MySQL",
            Dialect::MongoDb => "MongoDB",
            Dialect::Redis => "Redis",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an entity name is pluralized when used as a table for a given
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NamingRule {
    Plural,
    Singular,
    None,
}

// =============================================================================
// Per-dialect map bundle
// =============================================================================

/// The five maps for one dialect, with their reverse counterparts.
#[derive(Debug)]
pub struct DialectMaps {
    pub operations: HashMap<Operation, &'static str>,
    /// Lowercased dialect keyword -> operation.
    pub operations_reverse: HashMap<String, Operation>,
    pub operators: HashMap<Operator, &'static str>,
    /// Exact dialect operator token -> operator.
    pub operators_reverse: HashMap<&'static str, Operator>,
    pub types: HashMap<&'static str, &'static str>,
    /// Lowercased dialect type -> OQL type.
    pub types_reverse: HashMap<String, &'static str>,
    pub naming: HashMap<Operation, NamingRule>,
}

impl DialectMaps {
    fn build(
        operations: &[(Operation, &'static str)],
        extra_operation_aliases: &[(&'static str, Operation)],
        operators: &[(Operator, &'static str)],
        extra_operator_aliases: &[(&'static str, Operator)],
        types: &[(&'static str, &'static str)],
        extra_type_aliases: &[(&'static str, &'static str)],
    ) -> Self {
        let mut operations_reverse = HashMap::new();
        for (op, kw) in operations {
            operations_reverse.entry(kw.to_lowercase()).or_insert(*op);
        }
        for (kw, op) in extra_operation_aliases {
            operations_reverse.insert(kw.to_lowercase(), *op);
        }

        let mut operators_reverse = HashMap::new();
        for (op, tok) in operators {
            operators_reverse.entry(*tok).or_insert(*op);
        }
        for (tok, op) in extra_operator_aliases {
            operators_reverse.insert(*tok, *op);
        }

        let mut types_reverse = HashMap::new();
        for (oql, native) in types {
            types_reverse.entry(native.to_lowercase()).or_insert(*oql);
        }
        for (native, oql) in extra_type_aliases {
            types_reverse.insert(native.to_lowercase(), *oql);
        }

        Self {
            operations: operations.iter().copied().collect(),
            operations_reverse,
            operators: operators.iter().copied().collect(),
            operators_reverse,
            types: types.iter().copied().collect(),
            types_reverse,
            naming: naming_rules(),
        }
    }
}

// =============================================================================
// Table naming rules
// =============================================================================

/// Operations whose entity is a table name get the plural rule; operations
/// on users, roles, schemas, databases, and statement-level TCL carry their
/// name verbatim.
fn naming_rules() -> HashMap<Operation, NamingRule> {
    use Operation::*;

    let mut map = HashMap::new();
    let plural = [
        Get, Create, Update, Delete, Upsert, Replace, BulkInsert, Count, Sum, Avg, Min, Max,
        CreateTable, AlterTable, DropTable, TruncateTable, RenameTable, CreateView, DropView,
        CreateIndex, DropIndex, Comment, Grant, Revoke,
    ];
    let none = [
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
        CreateDatabase,
        DropDatabase,
        Use,
        Begin,
        Commit,
        Rollback,
        Savepoint,
        ReleaseSavepoint,
        RollbackTo,
        SetTransaction,
        CreateUser,
        AlterUser,
        DropUser,
        CreateRole,
        DropRole,
    ];
    for op in plural {
        map.insert(op, NamingRule::Plural);
    }
    for op in none {
        map.insert(op, NamingRule::None);
    }
    map
}

// =============================================================================
// SQL dialect tables
// =============================================================================

fn sql_operations(replace_keyword: &'static str) -> Vec<(Operation, &'static str)> {
    use Operation::*;
    vec![
        (Get, "select"),
        (Create, "insert"),
        (Update, "update"),
        (Delete, "delete"),
        (Upsert, "insert"),
        (Replace, replace_keyword),
        (BulkInsert, "insert"),
        (Count, "select"),
        (Sum, "select"),
        (Avg, "select"),
        (Min, "select"),
        (Max, "select"),
        (CreateTable, "create table"),
        (AlterTable, "alter table"),
        (DropTable, "drop table"),
        (TruncateTable, "truncate table"),
        (RenameTable, "alter table"),
        (CreateView, "create view"),
        (DropView, "drop view"),
        (CreateIndex, "create index"),
        (DropIndex, "drop index"),
        (CreateSequence, "create sequence"),
        (DropSequence, "drop sequence"),
        (CreateSchema, "create schema"),
        (DropSchema, "drop schema"),
        (CreateType, "create type"),
        (DropType, "drop type"),
        (CreateDomain, "create domain"),
        (DropDomain, "drop domain"),
        (CreateFunction, "create function"),
        (DropFunction, "drop function"),
        (CreateTrigger, "create trigger"),
        (DropTrigger, "drop trigger"),
        (CreatePolicy, "create policy"),
        (DropPolicy, "drop policy"),
        (CreateRule, "create rule"),
        (DropRule, "drop rule"),
        (CreateExtension, "create extension"),
        (DropExtension, "drop extension"),
        (Comment, "comment"),
        (CreateDatabase, "create database"),
        (DropDatabase, "drop database"),
        (Use, "use"),
        (Begin, "begin"),
        (Commit, "commit"),
        (Rollback, "rollback"),
        (Savepoint, "savepoint"),
        (ReleaseSavepoint, "release savepoint"),
        (RollbackTo, "rollback to"),
        (SetTransaction, "set transaction"),
        (Grant, "grant"),
        (Revoke, "revoke"),
        (CreateUser, "create user"),
        (AlterUser, "alter user"),
        (DropUser, "drop user"),
        (CreateRole, "create role"),
        (DropRole, "drop role"),
    ]
}

const POSTGRES_OPERATORS: &[(Operator, &str)] = &[
    (Operator::Eq, "="),
    (Operator::Ne, "!="),
    (Operator::Gt, ">"),
    (Operator::Lt, "<"),
    (Operator::Gte, ">="),
    (Operator::Lte, "<="),
    (Operator::In, "IN"),
    (Operator::NotIn, "NOT IN"),
    (Operator::Like, "LIKE"),
    (Operator::NotLike, "NOT LIKE"),
    (Operator::ILike, "ILIKE"),
    (Operator::NotILike, "NOT ILIKE"),
    (Operator::Between, "BETWEEN"),
    (Operator::NotBetween, "NOT BETWEEN"),
    (Operator::IsNull, "IS NULL"),
    (Operator::IsNotNull, "IS NOT NULL"),
];

// MySQL collations make LIKE case-insensitive already, so ILIKE degrades to
// LIKE there.
const MYSQL_OPERATORS: &[(Operator, &str)] = &[
    (Operator::Eq, "="),
    (Operator::Ne, "!="),
    (Operator::Gt, ">"),
    (Operator::Lt, "<"),
    (Operator::Gte, ">="),
    (Operator::Lte, "<="),
    (Operator::In, "IN"),
    (Operator::NotIn, "NOT IN"),
    (Operator::Like, "LIKE"),
    (Operator::NotLike, "NOT LIKE"),
    (Operator::ILike, "LIKE"),
    (Operator::NotILike, "NOT LIKE"),
    (Operator::Between, "BETWEEN"),
    (Operator::NotBetween, "NOT BETWEEN"),
    (Operator::IsNull, "IS NULL"),
    (Operator::IsNotNull, "IS NOT NULL"),
];

/// PostgreSQL's internal spellings of the pattern-match operators.
const POSTGRES_OPERATOR_ALIASES: &[(&str, Operator)] = &[
    ("<>", Operator::Ne),
    ("~~", Operator::Like),
    ("!~~", Operator::NotLike),
    ("~~*", Operator::ILike),
    ("!~~*", Operator::NotILike),
];

const MYSQL_OPERATOR_ALIASES: &[(&str, Operator)] = &[("<>", Operator::Ne)];

const POSTGRES_TYPES: &[(&str, &str)] = &[
    ("AUTO", "SERIAL"),
    ("STRING", "VARCHAR"),
    ("TEXT", "TEXT"),
    ("INT", "INTEGER"),
    ("BIGINT", "BIGINT"),
    ("FLOAT", "DOUBLE PRECISION"),
    ("DECIMAL", "NUMERIC"),
    ("BOOLEAN", "BOOLEAN"),
    ("DATE", "DATE"),
    ("TIMESTAMP", "TIMESTAMP"),
    ("JSON", "JSONB"),
    ("UUID", "UUID"),
    ("BLOB", "BYTEA"),
];

const POSTGRES_TYPE_ALIASES: &[(&str, &str)] = &[
    ("bigserial", "AUTO"),
    ("character varying", "STRING"),
    ("int", "INT"),
    ("int4", "INT"),
    ("smallint", "INT"),
    ("int8", "BIGINT"),
    ("real", "FLOAT"),
    ("float8", "FLOAT"),
    ("double", "FLOAT"),
    ("decimal", "DECIMAL"),
    ("bool", "BOOLEAN"),
    ("timestamptz", "TIMESTAMP"),
    ("timestamp with time zone", "TIMESTAMP"),
    ("timestamp without time zone", "TIMESTAMP"),
    ("json", "JSON"),
];

const MYSQL_TYPES: &[(&str, &str)] = &[
    ("AUTO", "INT AUTO_INCREMENT"),
    ("STRING", "VARCHAR"),
    ("TEXT", "TEXT"),
    ("INT", "INT"),
    ("BIGINT", "BIGINT"),
    ("FLOAT", "DOUBLE"),
    ("DECIMAL", "DECIMAL"),
    ("BOOLEAN", "TINYINT(1)"),
    ("DATE", "DATE"),
    ("TIMESTAMP", "DATETIME"),
    ("JSON", "JSON"),
    ("UUID", "CHAR(36)"),
    ("BLOB", "BLOB"),
];

const MYSQL_TYPE_ALIASES: &[(&str, &str)] = &[
    ("integer", "INT"),
    ("smallint", "INT"),
    ("mediumint", "INT"),
    ("tinyint", "BOOLEAN"),
    ("float", "FLOAT"),
    ("numeric", "DECIMAL"),
    ("timestamp", "TIMESTAMP"),
    ("varbinary", "BLOB"),
    ("longtext", "TEXT"),
    ("mediumtext", "TEXT"),
];

// =============================================================================
// MongoDB tables
// =============================================================================

fn mongo_operations() -> Vec<(Operation, &'static str)> {
    use Operation::*;
    vec![
        (Get, "find"),
        (Create, "insertOne"),
        (Update, "updateMany"),
        (Delete, "deleteMany"),
        (Upsert, "updateOne"),
        (Replace, "replaceOne"),
        (BulkInsert, "insertMany"),
        (Count, "count"),
        (Sum, "aggregate"),
        (Avg, "aggregate"),
        (Min, "aggregate"),
        (Max, "aggregate"),
        (CreateTable, "create"),
        (AlterTable, "collMod"),
        (DropTable, "drop"),
        (TruncateTable, "deleteMany"),
        (RenameTable, "renameCollection"),
        (CreateView, "createView"),
        (DropView, "dropView"),
        (CreateIndex, "createIndexes"),
        (DropIndex, "dropIndexes"),
        (Use, "use"),
        (DropDatabase, "dropDatabase"),
        (Begin, "startTransaction"),
        (Commit, "commitTransaction"),
        (Rollback, "abortTransaction"),
        (CreateUser, "createUser"),
        (AlterUser, "updateUser"),
        (DropUser, "dropUser"),
        (CreateRole, "createRole"),
        (DropRole, "dropRole"),
        (Grant, "grantRolesToUser"),
        (Revoke, "revokeRolesFromUser"),
    ]
}

const MONGO_OPERATION_ALIASES: &[(&str, Operation)] = &[
    ("findone", Operation::Get),
    ("distinct", Operation::Get),
    ("aggregate", Operation::Get),
    ("insert", Operation::Create),
    ("insertmany", Operation::BulkInsert),
    ("updateone", Operation::Update),
    ("updatemany", Operation::Update),
    ("replaceone", Operation::Replace),
    ("deleteone", Operation::Delete),
    ("deletemany", Operation::Delete),
    ("count", Operation::Count),
    ("countdocuments", Operation::Count),
    ("collmod", Operation::AlterTable),
    ("renamecollection", Operation::RenameTable),
    ("createindexes", Operation::CreateIndex),
    ("dropindexes", Operation::DropIndex),
    ("createview", Operation::CreateView),
    ("dropview", Operation::DropView),
    ("dropdatabase", Operation::DropDatabase),
    ("starttransaction", Operation::Begin),
    ("committransaction", Operation::Commit),
    ("aborttransaction", Operation::Rollback),
    ("createuser", Operation::CreateUser),
    ("updateuser", Operation::AlterUser),
    ("dropuser", Operation::DropUser),
    ("createrole", Operation::CreateRole),
    ("droprole", Operation::DropRole),
    ("grantrolestouser", Operation::Grant),
    ("revokerolesfromuser", Operation::Revoke),
    ("grantprivilegestorole", Operation::Grant),
    ("revokeprivilegesfromrole", Operation::Revoke),
];

const MONGO_OPERATORS: &[(Operator, &str)] = &[
    (Operator::Eq, "$eq"),
    (Operator::Ne, "$ne"),
    (Operator::Gt, "$gt"),
    (Operator::Lt, "$lt"),
    (Operator::Gte, "$gte"),
    (Operator::Lte, "$lte"),
    (Operator::In, "$in"),
    (Operator::NotIn, "$nin"),
    (Operator::Like, "$regex"),
    (Operator::IsNull, "$exists"),
];

const MONGO_TYPES: &[(&str, &str)] = &[
    ("AUTO", "objectId"),
    ("STRING", "string"),
    ("TEXT", "string"),
    ("INT", "int"),
    ("BIGINT", "long"),
    ("FLOAT", "double"),
    ("DECIMAL", "decimal"),
    ("BOOLEAN", "bool"),
    ("DATE", "date"),
    ("TIMESTAMP", "timestamp"),
    ("JSON", "object"),
    ("UUID", "uuid"),
    ("BLOB", "binData"),
];

// =============================================================================
// Redis tables
// =============================================================================

fn redis_operations() -> Vec<(Operation, &'static str)> {
    use Operation::*;
    vec![
        (Get, "HGETALL"),
        (Create, "HMSET"),
        (Update, "HSET"),
        (Delete, "DEL"),
        (BulkInsert, "MSET"),
        (Count, "EXISTS"),
        (DropTable, "DEL"),
        (Begin, "MULTI"),
        (Commit, "EXEC"),
        (Rollback, "DISCARD"),
        (CreateUser, "ACL SETUSER"),
        (AlterUser, "ACL SETUSER"),
        (DropUser, "ACL DELUSER"),
        (Grant, "ACL SETUSER"),
        (Revoke, "ACL SETUSER"),
    ]
}

const REDIS_OPERATION_ALIASES: &[(&str, Operation)] = &[
    ("get", Operation::Get),
    ("hget", Operation::Get),
    ("hkeys", Operation::Get),
    ("hvals", Operation::Get),
    ("ttl", Operation::Get),
    ("zscore", Operation::Get),
    ("smembers", Operation::Get),
    ("lrange", Operation::Get),
    ("zrange", Operation::Get),
    ("keys", Operation::Get),
    ("set", Operation::Create),
    ("mset", Operation::BulkInsert),
    ("lpush", Operation::Update),
    ("sadd", Operation::Update),
    ("zadd", Operation::Update),
    ("srem", Operation::Update),
    ("zrem", Operation::Update),
    ("hdel", Operation::Update),
    ("lpop", Operation::Update),
    ("expire", Operation::Update),
    ("exists", Operation::Count),
    ("llen", Operation::Count),
    ("scard", Operation::Count),
    ("count", Operation::Count),
    ("sum", Operation::Sum),
    ("avg", Operation::Avg),
    ("min", Operation::Min),
    ("max", Operation::Max),
];

const REDIS_OPERATORS: &[(Operator, &str)] = &[
    (Operator::Eq, "="),
    (Operator::Ne, "!="),
    (Operator::Gt, ">"),
    (Operator::Lt, "<"),
    (Operator::Gte, ">="),
    (Operator::Lte, "<="),
    (Operator::Like, "LIKE"),
];

const REDIS_TYPES: &[(&str, &str)] = &[
    ("AUTO", "string"),
    ("STRING", "string"),
    ("TEXT", "string"),
    ("INT", "string"),
    ("BIGINT", "string"),
    ("FLOAT", "string"),
    ("DECIMAL", "string"),
    ("BOOLEAN", "string"),
    ("DATE", "string"),
    ("TIMESTAMP", "string"),
    ("JSON", "hash"),
    ("UUID", "string"),
    ("BLOB", "string"),
];

// =============================================================================
// The frozen bundle
// =============================================================================

static MAPS: Lazy<HashMap<Dialect, DialectMaps>> = Lazy::new(|| {
    let mut maps = HashMap::new();
    maps.insert(
        Dialect::PostgreSql,
        DialectMaps::build(
            &sql_operations("insert"),
            &[],
            POSTGRES_OPERATORS,
            POSTGRES_OPERATOR_ALIASES,
            POSTGRES_TYPES,
            POSTGRES_TYPE_ALIASES,
        ),
    );
    maps.insert(
        Dialect::MySql,
        DialectMaps::build(
            &sql_operations("replace"),
            &[],
            MYSQL_OPERATORS,
            MYSQL_OPERATOR_ALIASES,
            MYSQL_TYPES,
            MYSQL_TYPE_ALIASES,
        ),
    );
    maps.insert(
        Dialect::MongoDb,
        DialectMaps::build(
            &mongo_operations(),
            MONGO_OPERATION_ALIASES,
            MONGO_OPERATORS,
            &[],
            MONGO_TYPES,
            &[],
        ),
    );
    maps.insert(
        Dialect::Redis,
        DialectMaps::build(
            &redis_operations(),
            REDIS_OPERATION_ALIASES,
            REDIS_OPERATORS,
            &[],
            REDIS_TYPES,
            &[],
        ),
    );
    maps
});

/// The frozen map bundle for a dialect.
pub fn maps(dialect: Dialect) -> &'static DialectMaps {
    &MAPS[&dialect]
}

/// The dialect keyword for an operation, when one exists.
pub fn operation_keyword(dialect: Dialect, op: Operation) -> Option<&'static str> {
    maps(dialect).operations.get(&op).copied()
}

/// Reverse operation lookup; the keyword is lowercased before the lookup.
pub fn operation_for_keyword(dialect: Dialect, keyword: &str) -> Option<Operation> {
    maps(dialect)
        .operations_reverse
        .get(&keyword.to_lowercase())
        .copied()
}

/// The dialect token for a canonical operator.
pub fn operator_token(dialect: Dialect, op: Operator) -> Option<&'static str> {
    maps(dialect).operators.get(&op).copied()
}

/// Reverse operator lookup; exact-match keys.
pub fn operator_for_token(dialect: Dialect, token: &str) -> Option<Operator> {
    maps(dialect).operators_reverse.get(token).copied()
}

/// The dialect rendering of an OQL type name (without any `(n)` suffix).
pub fn dialect_type(dialect: Dialect, oql_type: &str) -> Option<&'static str> {
    maps(dialect).types.get(oql_type).copied()
}

/// The OQL type for a dialect type name; lowercased before the lookup.
pub fn oql_type(dialect: Dialect, native: &str) -> Option<&'static str> {
    maps(dialect).types_reverse.get(&native.to_lowercase()).copied()
}

/// The table naming rule for an operation. Operations missing from the map
/// carry their entity verbatim.
pub fn naming_rule(dialect: Dialect, op: Operation) -> NamingRule {
    maps(dialect)
        .naming
        .get(&op)
        .copied()
        .unwrap_or(NamingRule::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_round_trip() {
        assert_eq!(
            operation_keyword(Dialect::PostgreSql, Operation::Get),
            Some("select")
        );
        assert_eq!(
            operation_for_keyword(Dialect::PostgreSql, "SELECT"),
            Some(Operation::Get)
        );
        assert_eq!(
            operation_for_keyword(Dialect::MongoDb, "insertMany"),
            Some(Operation::BulkInsert)
        );
        assert_eq!(
            operation_for_keyword(Dialect::Redis, "hgetall"),
            Some(Operation::Get)
        );
    }

    #[test]
    fn test_operator_tokens() {
        assert_eq!(operator_token(Dialect::MongoDb, Operator::Eq), Some("$eq"));
        assert_eq!(
            operator_token(Dialect::PostgreSql, Operator::NotILike),
            Some("NOT ILIKE")
        );
        // MySQL degrades ILIKE to LIKE
        assert_eq!(operator_token(Dialect::MySql, Operator::ILike), Some("LIKE"));
    }

    #[test]
    fn test_operator_reverse_aliases() {
        assert_eq!(
            operator_for_token(Dialect::PostgreSql, "~~"),
            Some(Operator::Like)
        );
        assert_eq!(
            operator_for_token(Dialect::PostgreSql, "!~~*"),
            Some(Operator::NotILike)
        );
        assert_eq!(
            operator_for_token(Dialect::MongoDb, "$nin"),
            Some(Operator::NotIn)
        );
    }

    #[test]
    fn test_type_round_trip() {
        assert_eq!(dialect_type(Dialect::PostgreSql, "AUTO"), Some("SERIAL"));
        assert_eq!(oql_type(Dialect::PostgreSql, "serial"), Some("AUTO"));
        assert_eq!(oql_type(Dialect::PostgreSql, "CHARACTER VARYING"), Some("STRING"));
        assert_eq!(dialect_type(Dialect::MySql, "BOOLEAN"), Some("TINYINT(1)"));
    }

    #[test]
    fn test_naming_rules() {
        assert_eq!(
            naming_rule(Dialect::PostgreSql, Operation::Get),
            NamingRule::Plural
        );
        assert_eq!(
            naming_rule(Dialect::PostgreSql, Operation::CreateUser),
            NamingRule::None
        );
        assert_eq!(
            naming_rule(Dialect::Redis, Operation::DropTable),
            NamingRule::Plural
        );
    }
}
