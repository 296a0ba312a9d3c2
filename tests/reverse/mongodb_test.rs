//! Integration tests for the MongoDB reverse translator, including the
//! determinism guarantee and full reverse-then-render scenarios.

use queryport::oql::{Operation, Operator};
use queryport::{to_query, translate, Dialect};

fn lift(json: &str) -> queryport::oql::Query {
    to_query(json, Dialect::MongoDb).unwrap()
}

fn render(json: &str) -> (String, Vec<String>) {
    translate(&lift(json), Dialect::PostgreSql).unwrap()
}

#[test]
fn test_between_scenario() {
    let q = lift(r#"{"find":"users","filter":{"age":{"$gte":18,"$lte":65}}}"#);
    assert_eq!(q.conditions[0].operator, Operator::Between);

    let (sql, params) = render(r#"{"find":"users","filter":{"age":{"$gte":18,"$lte":65}}}"#);
    assert!(sql.contains("age BETWEEN $1 AND $2"), "sql: {}", sql);
    assert_eq!(params, vec!["18", "65"]);
}

#[test]
fn test_aggregate_pipeline_scenario() {
    let q = lift(
        r#"{"aggregate":"users","pipeline":[{"$match":{"active":true}},{"$group":{"_id":"$dept","total":{"$sum":1}}},{"$match":{"total":{"$gt":5}}}]}"#,
    );
    assert_eq!(q.operation, Operation::Count);
    assert_eq!(q.group_by.len(), 1);
    assert_eq!(q.having.len(), 1);
    assert_eq!(q.conditions.len(), 1);

    let (sql, params) = translate(&q, Dialect::PostgreSql).unwrap();
    assert!(sql.contains("GROUP BY dept"), "sql: {}", sql);
    assert!(sql.contains("HAVING total > $2"), "sql: {}", sql);
    assert_eq!(params, vec!["true", "5"]);
}

#[test]
fn test_key_order_determinism_through_render() {
    let a = render(r#"{"find":"users","filter":{"b":2,"a":1},"limit":3}"#);
    let b = render(r#"{"limit":3,"filter":{"a":1,"b":2},"find":"users"}"#);
    assert_eq!(a, b);
}

#[test]
fn test_update_renders_assignments() {
    let (sql, params) = render(
        r#"{"updateMany":"users","filter":{"id":1},"update":{"$set":{"name":"Ada"},"$inc":{"age":1}}}"#,
    );
    assert_eq!(sql, "UPDATE users SET age = age + 1, name = $1 WHERE id = $2");
    assert_eq!(params, vec!["Ada", "1"]);
}

#[test]
fn test_upsert_renders_on_conflict() {
    let (sql, _) = render(
        r#"{"updateOne":"users","filter":{"id":1},"update":{"$set":{"name":"Ada"}},"upsert":true}"#,
    );
    assert!(sql.contains("ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"), "sql: {}", sql);
}

#[test]
fn test_insert_many_renders_bulk() {
    let (sql, params) = render(
        r#"{"insertMany":"users","documents":[{"id":1,"name":"a"},{"id":2,"name":"b"}]}"#,
    );
    assert_eq!(sql, "INSERT INTO users (id, name) VALUES ($1, $2), ($3, $4)");
    assert_eq!(params, vec!["1", "a", "2", "b"]);
}

#[test]
fn test_distinct() {
    let q = lift(r#"{"distinct":"users","key":"dept"}"#);
    assert!(q.distinct);
    assert_eq!(q.columns, vec!["dept"]);
    let (sql, _) = translate(&q, Dialect::PostgreSql).unwrap();
    assert_eq!(sql, "SELECT DISTINCT dept FROM users");
}

#[test]
fn test_truncate_renders() {
    let (sql, params) = render(r#"{"deleteMany":"sessions","filter":{}}"#);
    assert_eq!(sql, "TRUNCATE TABLE sessions");
    assert!(params.is_empty());
}

#[test]
fn test_union_with_renders_set_operation() {
    let (sql, params) = render(
        r#"{"aggregate":"users","pipeline":[{"$match":{"active":true}},{"$unionWith":"admins"}]}"#,
    );
    assert_eq!(
        sql,
        "(SELECT * FROM users WHERE active = $1) UNION (SELECT * FROM admins)"
    );
    assert_eq!(params, vec!["true"]);
}

#[test]
fn test_create_user_renders() {
    let (sql, _) = render(r#"{"createUser":"alice","pwd":"pw","roles":[]}"#);
    assert_eq!(sql, "CREATE USER alice WITH PASSWORD 'pw'");
}

#[test]
fn test_grant_roles_renders() {
    let (sql, _) = render(r#"{"grantRolesToUser":"alice","roles":["reporting"]}"#);
    assert_eq!(sql, "GRANT reporting TO alice");
}
