//! Integration tests for the MySQL reverse translator.

use queryport::oql::{Expression, Operation, Operator};
use queryport::{to_query, Dialect};

fn lift(sql: &str) -> queryport::oql::Query {
    to_query(sql, Dialect::MySql).unwrap()
}

#[test]
fn test_upsert_scenario() {
    let q = lift(
        "INSERT INTO users (id, name) VALUES (1, 'a') ON DUPLICATE KEY UPDATE name = VALUES(name)",
    );
    assert_eq!(q.operation, Operation::Upsert);
    let upsert = q.upsert.unwrap();
    assert_eq!(upsert.update_fields.len(), 1);
    assert_eq!(upsert.update_fields[0].name_text(), "name");
}

#[test]
fn test_replace_into() {
    let q = lift("REPLACE INTO users (id, name) VALUES (1, 'a')");
    assert_eq!(q.operation, Operation::Replace);
}

#[test]
fn test_bulk_insert() {
    let q = lift("INSERT INTO users (id) VALUES (1), (2)");
    assert_eq!(q.operation, Operation::BulkInsert);
    assert_eq!(q.bulk_rows.len(), 2);
}

#[test]
fn test_backtick_identifiers() {
    let q = lift("SELECT `name` FROM `users` WHERE `age` > 21");
    assert_eq!(q.entity, "User");
    assert_eq!(q.columns, vec!["name"]);
    assert_eq!(q.conditions[0].operator, Operator::Gt);
}

#[test]
fn test_aggregates_limited_to_five() {
    let q = lift("SELECT AVG(age) FROM users");
    assert_eq!(q.operation, Operation::Avg);
    assert_eq!(q.aggregate.unwrap().field, "age");

    // Anything else stays a plain function column.
    let q = lift("SELECT UPPER(name) FROM users");
    assert_eq!(q.operation, Operation::Get);
    assert!(matches!(
        q.select_columns[0].expr,
        Expression::Function { .. }
    ));
}

#[test]
fn test_count_distinct() {
    let q = lift("SELECT COUNT(DISTINCT dept) FROM employees");
    assert_eq!(q.operation, Operation::Count);
    let agg = q.aggregate.unwrap();
    assert!(agg.distinct);
    assert_eq!(agg.field, "dept");
}

#[test]
fn test_set_transaction_isolation() {
    let q = lift("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ");
    assert_eq!(q.operation, Operation::SetTransaction);
    assert_eq!(
        q.transaction.unwrap().isolation_level.as_deref(),
        Some("REPEATABLE READ")
    );
}

#[test]
fn test_window_functions_populate_slot() {
    let q = lift("SELECT id, NTILE(4) OVER (ORDER BY score) AS quartile FROM results");
    assert_eq!(q.columns, vec!["id"]);
    assert_eq!(q.window_functions.len(), 1);
    match &q.window_functions[0].expr {
        Expression::Window { name, buckets, .. } => {
            assert_eq!(name, "NTILE");
            assert_eq!(*buckets, 4);
        }
        other => panic!("expected a window, got {:?}", other),
    }
}

#[test]
fn test_lag_offset_extraction() {
    let q = lift("SELECT LAG(price, 2) OVER (ORDER BY day) AS prev FROM quotes");
    match &q.window_functions[0].expr {
        Expression::Window { name, offset, args, .. } => {
            assert_eq!(name, "LAG");
            assert_eq!(*offset, 2);
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected a window, got {:?}", other),
    }
}

#[test]
fn test_truncate_table() {
    let q = lift("TRUNCATE TABLE logs");
    assert_eq!(q.operation, Operation::TruncateTable);
    assert_eq!(q.entity, "Log");
}

#[test]
fn test_mysql_types_reverse() {
    let q = lift("CREATE TABLE items (id INT AUTO_INCREMENT PRIMARY KEY, price DECIMAL(8,2), flag TINYINT(1))");
    assert_eq!(q.operation, Operation::CreateTable);
    assert_eq!(
        q.fields[1].value.as_ref().unwrap().leaf_value(),
        Some("DECIMAL(8,2)")
    );
}
