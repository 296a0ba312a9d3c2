//! PostgreSQL reverse translation.
//!
//! Parses with the PostgreSQL grammar and hands the statement to the shared
//! lifter. A handful of utility statements the grammar does not cover
//! (user management, `DROP DOMAIN`/`RULE`) are lifted from their token shape
//! directly before the parser runs.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::error::{TranslateError, TranslateResult};
use crate::maps::Dialect;
use crate::oql::{Operation, PermissionSpec, Query};

use super::sql::SqlLifter;

static CREATE_USER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(CREATE|ALTER)\s+USER\s+(\w+)(?:\s+WITH\s+PASSWORD\s+'([^']*)')?\s*;?\s*$")
        .unwrap()
});
static DROP_USER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*DROP\s+USER\s+(?:IF\s+EXISTS\s+)?(\w+)\s*;?\s*$").unwrap());
static DROP_UTILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*DROP\s+(DOMAIN|RULE|EXTENSION)\s+(?:IF\s+EXISTS\s+)?(\w+)(?:\s+ON\s+(\w+))?\s*;?\s*$")
        .unwrap()
});
static CREATE_UTILITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*CREATE\s+(DOMAIN|RULE)\s+(\w+)").unwrap());

/// Lift PostgreSQL SQL into OQL.
pub fn to_query(source: &str) -> TranslateResult<Query> {
    if let Some(query) = lift_utility(source) {
        return Ok(query);
    }

    let statements = Parser::parse_sql(&PostgreSqlDialect {}, source)
        .map_err(|e| TranslateError::ParseError(e.to_string()))?;
    let statement = statements
        .first()
        .ok_or_else(|| TranslateError::EmptyQuery)?;
    SqlLifter::new(Dialect::PostgreSql).lift_statement(statement)
}

/// Utility statements outside the parser grammar, lifted from token shape.
pub(super) fn lift_utility(source: &str) -> Option<Query> {
    if let Some(caps) = CREATE_USER.captures(source) {
        let operation = if caps[1].eq_ignore_ascii_case("create") {
            Operation::CreateUser
        } else {
            Operation::AlterUser
        };
        let mut q = Query::new(operation, "User");
        q.permission = Some(PermissionSpec {
            grantee: Some(caps[2].to_string()),
            password: caps.get(3).map(|m| m.as_str().to_string()),
            ..Default::default()
        });
        return Some(q);
    }

    if let Some(caps) = DROP_USER.captures(source) {
        let mut q = Query::new(Operation::DropUser, "User");
        q.permission = Some(PermissionSpec {
            grantee: Some(caps[1].to_string()),
            ..Default::default()
        });
        return Some(q);
    }

    if let Some(caps) = DROP_UTILITY.captures(source) {
        let name = caps[2].to_string();
        let entity = caps
            .get(3)
            .map(|m| crate::naming::table_to_entity(m.as_str()))
            .unwrap_or_default();
        let mut q;
        match caps[1].to_uppercase().as_str() {
            "DOMAIN" => {
                q = Query::bare(Operation::DropDomain);
                q.domain = Some(name);
            }
            "RULE" => {
                q = Query::new(Operation::DropRule, entity);
                q.rule = Some(name);
            }
            _ => {
                q = Query::bare(Operation::DropExtension);
                q.extension = Some(name);
            }
        }
        return Some(q);
    }

    if let Some(caps) = CREATE_UTILITY.captures(source) {
        let name = caps[2].to_string();
        let mut q;
        if caps[1].eq_ignore_ascii_case("domain") {
            q = Query::bare(Operation::CreateDomain);
            q.domain = Some(name);
        } else {
            q = Query::bare(Operation::CreateRule);
            q.rule = Some(name);
        }
        return Some(q);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oql::{Logic, Operator};

    #[test]
    fn test_select_with_conditions_and_order() {
        let q = to_query(
            "SELECT id FROM users WHERE age >= 18 AND status IN ('a','b') ORDER BY id DESC LIMIT 10",
        )
        .unwrap();
        assert_eq!(q.operation, Operation::Get);
        assert_eq!(q.entity, "User");
        assert_eq!(q.columns, vec!["id"]);
        assert_eq!(q.conditions.len(), 2);
        assert_eq!(q.conditions[0].operator, Operator::Gte);
        assert_eq!(q.conditions[1].operator, Operator::In);
        assert_eq!(q.conditions[1].logic, Logic::And);
        assert_eq!(q.conditions[1].values.len(), 2);
        assert_eq!(q.order_by.len(), 1);
        assert!(q.order_by[0].desc);
        assert_eq!(q.limit, Some(10));
    }

    #[test]
    fn test_insert_single_row_is_create() {
        let q = to_query("INSERT INTO users (id, name) VALUES (1, 'Ada')").unwrap();
        assert_eq!(q.operation, Operation::Create);
        assert_eq!(q.fields.len(), 2);
        assert_eq!(q.fields[1].name_text(), "name");
    }

    #[test]
    fn test_insert_multi_row_is_bulk() {
        let q = to_query("INSERT INTO users (id) VALUES (1), (2), (3)").unwrap();
        assert_eq!(q.operation, Operation::BulkInsert);
        assert_eq!(q.bulk_rows.len(), 3);
    }

    #[test]
    fn test_on_conflict_is_upsert() {
        let q = to_query(
            "INSERT INTO users (id, name) VALUES (1, 'a') ON CONFLICT (id) DO UPDATE SET name = 'a'",
        )
        .unwrap();
        assert_eq!(q.operation, Operation::Upsert);
        let upsert = q.upsert.unwrap();
        assert_eq!(upsert.conflict_fields, vec!["id"]);
        assert_eq!(upsert.update_fields.len(), 1);
    }

    #[test]
    fn test_not_wraps_inner_operator() {
        let q = to_query("SELECT * FROM users WHERE NOT age > 30").unwrap();
        assert_eq!(q.conditions.len(), 1);
        assert_eq!(q.conditions[0].operator, Operator::Lte);
    }

    #[test]
    fn test_nested_boolean_becomes_group() {
        let q = to_query("SELECT * FROM users WHERE active = true AND (age < 18 OR age > 65)")
            .unwrap();
        assert_eq!(q.conditions.len(), 2);
        assert!(q.conditions[1].is_group());
        assert_eq!(q.conditions[1].nested.len(), 2);
        assert_eq!(q.conditions[1].nested[1].logic, Logic::Or);
    }

    #[test]
    fn test_null_test() {
        let q = to_query("SELECT * FROM users WHERE deleted_at IS NULL").unwrap();
        assert_eq!(q.conditions[0].operator, Operator::IsNull);
        let q = to_query("SELECT * FROM users WHERE deleted_at IS NOT NULL").unwrap();
        assert_eq!(q.conditions[0].operator, Operator::IsNotNull);
    }

    #[test]
    fn test_count_star_is_count_operation() {
        let q = to_query("SELECT COUNT(*) FROM users WHERE age > 18").unwrap();
        assert_eq!(q.operation, Operation::Count);
        assert_eq!(q.aggregate.unwrap().field, "*");
    }

    #[test]
    fn test_group_by_and_having() {
        let q = to_query(
            "SELECT dept, COUNT(*) FROM employees GROUP BY dept HAVING COUNT(*) > 5",
        );
        let q = q.unwrap();
        assert_eq!(q.operation, Operation::Count);
        assert_eq!(q.group_by.len(), 1);
        assert_eq!(q.having.len(), 1);
    }

    #[test]
    fn test_join() {
        let q = to_query(
            "SELECT users.name FROM users INNER JOIN orders ON users.id = orders.user_id",
        )
        .unwrap();
        assert_eq!(q.joins.len(), 1);
        assert_eq!(q.joins[0].table, "orders");
        assert_eq!(q.joins[0].join_type, crate::oql::JoinType::Inner);
    }

    #[test]
    fn test_union_all() {
        let q = to_query("SELECT id FROM users UNION ALL SELECT id FROM admins").unwrap();
        let set_op = q.set_operation.unwrap();
        assert_eq!(set_op.op, crate::oql::SetOp::UnionAll);
        assert_eq!(set_op.right.entity, "Admin");
    }

    #[test]
    fn test_cte() {
        let q = to_query(
            "WITH big_orders AS (SELECT * FROM orders WHERE total > 100) SELECT * FROM big_orders",
        )
        .unwrap();
        let cte = q.cte.unwrap();
        assert_eq!(cte.name, "big_orders");
        assert!(!cte.recursive);
        assert_eq!(cte.query.entity, "Order");
    }

    #[test]
    fn test_create_table_types() {
        let q = to_query(
            "CREATE TABLE users (id SERIAL PRIMARY KEY, name VARCHAR(100) NOT NULL, active BOOLEAN DEFAULT true)",
        )
        .unwrap();
        assert_eq!(q.operation, Operation::CreateTable);
        assert_eq!(q.fields.len(), 3);
        assert_eq!(q.fields[0].value.as_ref().unwrap().leaf_value(), Some("AUTO"));
        assert_eq!(
            q.fields[1].value.as_ref().unwrap().leaf_value(),
            Some("STRING(100)")
        );
    }

    #[test]
    fn test_transaction_statements() {
        assert_eq!(to_query("BEGIN").unwrap().operation, Operation::Begin);
        assert_eq!(to_query("COMMIT").unwrap().operation, Operation::Commit);
        assert_eq!(to_query("ROLLBACK").unwrap().operation, Operation::Rollback);
        let q = to_query("SAVEPOINT sp1").unwrap();
        assert_eq!(q.operation, Operation::Savepoint);
        assert_eq!(q.transaction.unwrap().savepoint.as_deref(), Some("sp1"));
        let q = to_query("ROLLBACK TO SAVEPOINT sp1").unwrap();
        assert_eq!(q.operation, Operation::RollbackTo);
    }

    #[test]
    fn test_grant() {
        let q = to_query("GRANT SELECT, INSERT ON users TO alice").unwrap();
        assert_eq!(q.operation, Operation::Grant);
        let perm = q.permission.unwrap();
        assert_eq!(perm.privileges, vec!["SELECT", "INSERT"]);
        assert_eq!(perm.grantee.as_deref(), Some("alice"));
    }

    #[test]
    fn test_create_user_fallback() {
        let q = to_query("CREATE USER alice WITH PASSWORD 's3cret'").unwrap();
        assert_eq!(q.operation, Operation::CreateUser);
        let perm = q.permission.unwrap();
        assert_eq!(perm.grantee.as_deref(), Some("alice"));
        assert_eq!(perm.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_drop_user_fallback() {
        let q = to_query("DROP USER IF EXISTS alice").unwrap();
        assert_eq!(q.operation, Operation::DropUser);
    }

    #[test]
    fn test_drop_objects() {
        assert_eq!(to_query("DROP TABLE users").unwrap().operation, Operation::DropTable);
        assert_eq!(to_query("DROP VIEW active_users").unwrap().operation, Operation::DropView);
        assert_eq!(
            to_query("DROP SEQUENCE user_id_seq").unwrap().operation,
            Operation::DropSequence
        );
        assert_eq!(
            to_query("DROP DOMAIN email_address").unwrap().operation,
            Operation::DropDomain
        );
        assert_eq!(
            to_query("DROP EXTENSION pgcrypto").unwrap().operation,
            Operation::DropExtension
        );
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(
            to_query("SELEKT broken"),
            Err(TranslateError::ParseError(_))
        ));
    }
}
