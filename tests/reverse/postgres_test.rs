//! Integration tests for the PostgreSQL reverse translator.
//!
//! These drive the public API end to end: source SQL in, OQL out, and check
//! the populated slots match the operation family.

use queryport::oql::{Expression, Logic, Operation, Operator};
use queryport::{to_query, Dialect, TranslateError};

fn lift(sql: &str) -> queryport::oql::Query {
    to_query(sql, Dialect::PostgreSql).unwrap()
}

#[test]
fn test_select_scenario() {
    let q = lift("SELECT id FROM users WHERE age >= 18 AND status IN ('a','b') ORDER BY id DESC LIMIT 10");
    assert_eq!(q.operation, Operation::Get);
    assert_eq!(q.entity, "User");
    assert_eq!(q.columns, vec!["id"]);
    assert_eq!(q.conditions.len(), 2);
    assert_eq!(q.conditions[0].operator, Operator::Gte);
    assert_eq!(q.conditions[1].operator, Operator::In);
    assert_eq!(q.conditions[1].logic, Logic::And);
    assert_eq!(q.order_by.len(), 1);
    assert!(q.order_by[0].desc);
    assert_eq!(q.limit, Some(10));
    // GET never populates bulk data
    assert!(q.bulk_rows.is_empty());
}

#[test]
fn test_like_family() {
    let q = lift("SELECT * FROM users WHERE name LIKE 'A%'");
    assert_eq!(q.conditions[0].operator, Operator::Like);
    let q = lift("SELECT * FROM users WHERE name NOT LIKE 'A%'");
    assert_eq!(q.conditions[0].operator, Operator::NotLike);
    let q = lift("SELECT * FROM users WHERE name ILIKE 'a%'");
    assert_eq!(q.conditions[0].operator, Operator::ILike);
    let q = lift("SELECT * FROM users WHERE name NOT ILIKE 'a%'");
    assert_eq!(q.conditions[0].operator, Operator::NotILike);
}

#[test]
fn test_between() {
    let q = lift("SELECT * FROM users WHERE age BETWEEN 18 AND 65");
    assert_eq!(q.conditions[0].operator, Operator::Between);
    assert!(q.conditions[0].value.is_some());
    assert!(q.conditions[0].value2.is_some());
    let q = lift("SELECT * FROM users WHERE age NOT BETWEEN 18 AND 65");
    assert_eq!(q.conditions[0].operator, Operator::NotBetween);
}

#[test]
fn test_in_with_not_equal_spelling() {
    let q = lift("SELECT * FROM users WHERE status <> 'banned'");
    assert_eq!(q.conditions[0].operator, Operator::Ne);
}

#[test]
fn test_subquery_in_where() {
    let q = lift("SELECT * FROM orders WHERE user_id IN (SELECT id FROM users WHERE active = true)");
    assert_eq!(q.conditions[0].operator, Operator::In);
    match q.conditions[0].value.as_ref().unwrap() {
        Expression::Subquery(sub) => assert_eq!(sub.entity, "User"),
        other => panic!("expected a subquery, got {:?}", other),
    }
}

#[test]
fn test_case_in_projection() {
    let q = lift(
        "SELECT CASE WHEN age >= 18 THEN 'adult' ELSE 'minor' END AS bracket FROM users",
    );
    assert_eq!(q.select_columns.len(), 1);
    assert_eq!(q.select_columns[0].alias.as_deref(), Some("bracket"));
    match &q.select_columns[0].expr {
        Expression::CaseWhen { arms, else_expr } => {
            assert_eq!(arms.len(), 1);
            assert!(else_expr.is_some());
        }
        other => panic!("expected CASE, got {:?}", other),
    }
}

#[test]
fn test_window_function() {
    let q = lift("SELECT RANK() OVER (PARTITION BY dept ORDER BY salary DESC) AS r FROM employees");
    assert_eq!(q.window_functions.len(), 1);
    match &q.window_functions[0].expr {
        Expression::Window {
            name,
            partition_by,
            order_by,
            ..
        } => {
            assert_eq!(name, "RANK");
            assert_eq!(partition_by.len(), 1);
            assert_eq!(order_by.len(), 1);
            assert!(order_by[0].desc);
        }
        other => panic!("expected a window, got {:?}", other),
    }
}

#[test]
fn test_recursive_cte() {
    let q = lift(
        "WITH RECURSIVE tree AS (SELECT * FROM categories) SELECT * FROM tree",
    );
    let cte = q.cte.unwrap();
    assert!(cte.recursive);
    assert_eq!(cte.name, "tree");
}

#[test]
fn test_set_operations() {
    for (sql, expected) in [
        ("SELECT id FROM users UNION SELECT id FROM admins", queryport::oql::SetOp::Union),
        ("SELECT id FROM users UNION ALL SELECT id FROM admins", queryport::oql::SetOp::UnionAll),
        ("SELECT id FROM users INTERSECT SELECT id FROM admins", queryport::oql::SetOp::Intersect),
        ("SELECT id FROM users EXCEPT SELECT id FROM admins", queryport::oql::SetOp::Except),
    ] {
        let q = lift(sql);
        assert_eq!(q.set_operation.unwrap().op, expected, "for {}", sql);
    }
}

#[test]
fn test_update_and_delete() {
    let q = lift("UPDATE users SET name = 'Ada' WHERE id = 1");
    assert_eq!(q.operation, Operation::Update);
    assert_eq!(q.fields.len(), 1);
    assert_eq!(q.conditions.len(), 1);

    let q = lift("DELETE FROM users WHERE id = 1");
    assert_eq!(q.operation, Operation::Delete);
    assert_eq!(q.conditions.len(), 1);
}

#[test]
fn test_create_table_fields_hold_types() {
    let q = lift("CREATE TABLE orders (id SERIAL PRIMARY KEY, total NUMERIC(10,2), placed_at TIMESTAMP NOT NULL)");
    assert_eq!(q.operation, Operation::CreateTable);
    assert_eq!(q.entity, "Order");
    assert_eq!(q.fields[0].value.as_ref().unwrap().leaf_value(), Some("AUTO"));
    assert_eq!(
        q.fields[1].value.as_ref().unwrap().leaf_value(),
        Some("DECIMAL(10,2)")
    );
    assert_eq!(
        q.fields[2].value.as_ref().unwrap().leaf_value(),
        Some("TIMESTAMP")
    );
}

#[test]
fn test_alter_table_add_and_drop() {
    let q = lift("ALTER TABLE users ADD COLUMN age INTEGER");
    assert_eq!(q.alter.as_ref().unwrap().kind, queryport::oql::AlterKind::AddColumn);
    let q = lift("ALTER TABLE users DROP COLUMN age");
    assert_eq!(q.alter.as_ref().unwrap().kind, queryport::oql::AlterKind::DropColumn);
}

#[test]
fn test_create_view_and_index() {
    let q = lift("CREATE VIEW active_users AS SELECT * FROM users WHERE active = true");
    assert_eq!(q.operation, Operation::CreateView);
    assert_eq!(q.view_query.as_ref().unwrap().conditions.len(), 1);

    let q = lift("CREATE UNIQUE INDEX idx_email ON users (email)");
    assert_eq!(q.operation, Operation::CreateIndex);
    let index = q.index.unwrap();
    assert!(index.unique);
    assert_eq!(index.columns, vec!["email"]);
}

#[test]
fn test_transactions_and_isolation() {
    let q = lift("BEGIN");
    assert_eq!(q.operation, Operation::Begin);

    let q = lift("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ ONLY");
    assert_eq!(q.operation, Operation::SetTransaction);
    let tx = q.transaction.unwrap();
    assert_eq!(tx.isolation_level.as_deref(), Some("SERIALIZABLE"));
    assert_eq!(tx.read_only, Some(true));
}

#[test]
fn test_create_role_with_login_is_create_user() {
    let q = lift("CREATE ROLE app_user LOGIN PASSWORD 'pw'");
    assert_eq!(q.operation, Operation::CreateUser);
    let perm = q.permission.unwrap();
    assert_eq!(perm.grantee.as_deref(), Some("app_user"));
    assert_eq!(perm.password.as_deref(), Some("pw"));

    let q = lift("CREATE ROLE reporting");
    assert_eq!(q.operation, Operation::CreateRole);
}

#[test]
fn test_revoke() {
    let q = lift("REVOKE SELECT ON users FROM alice");
    assert_eq!(q.operation, Operation::Revoke);
    assert_eq!(q.permission.unwrap().privileges, vec!["SELECT"]);
}

#[test]
fn test_blank_and_broken_input() {
    assert_eq!(
        to_query("", Dialect::PostgreSql),
        Err(TranslateError::EmptyQuery)
    );
    assert!(matches!(
        to_query("SELECT FROM FROM", Dialect::PostgreSql),
        Err(TranslateError::ParseError(_))
    ));
}
