//! Integration tests for the Redis reverse translator, including full
//! reverse-then-render scenarios.

use queryport::oql::{Operation, Operator};
use queryport::{to_query, translate, Dialect};

fn lift(cmd: &str) -> queryport::oql::Query {
    to_query(cmd, Dialect::Redis).unwrap()
}

fn render(cmd: &str) -> (String, Vec<String>) {
    translate(&lift(cmd), Dialect::PostgreSql).unwrap()
}

#[test]
fn test_hmset_scenario() {
    let q = lift(r#"HMSET tenant:t1:users:42 name "Ada" age 30"#);
    assert_eq!(q.operation, Operation::Create);
    assert_eq!(q.entity, "User");

    let (sql, params) = render(r#"HMSET tenant:t1:users:42 name "Ada" age 30"#);
    assert_eq!(sql, "INSERT INTO users (id, name, age) VALUES ($1, $2, $3)");
    assert_eq!(params, vec!["42", "Ada", "30"]);
}

#[test]
fn test_del_pattern_scenario() {
    let q = lift("DEL tenant:t1:users:*");
    assert_eq!(q.operation, Operation::DropTable);
    assert_eq!(q.entity, "User");

    let (sql, params) = render("DEL tenant:t1:users:*");
    assert_eq!(sql, "DROP TABLE IF EXISTS users");
    assert!(params.is_empty());
}

#[test]
fn test_hgetall_renders_select_by_id() {
    let (sql, params) = render("HGETALL tenant:t1:users:42");
    assert_eq!(sql, "SELECT * FROM users WHERE id = $1");
    assert_eq!(params, vec!["42"]);
}

#[test]
fn test_field_value_key_shape() {
    let (sql, params) = render("HGETALL tenant:t1:users:status:active");
    assert_eq!(sql, "SELECT * FROM users WHERE status = $1");
    assert_eq!(params, vec!["active"]);
}

#[test]
fn test_exists_renders_count() {
    let (sql, params) = render("EXISTS tenant:t1:users:42");
    assert_eq!(sql, "SELECT COUNT(*) FROM users WHERE id = $1");
    assert_eq!(params, vec!["42"]);
}

#[test]
fn test_aggregate_with_limit_wraps_subquery() {
    let (sql, params) = render("SUM tenant:t1:orders total LIMIT 10");
    assert_eq!(
        sql,
        "SELECT SUM(total) FROM (SELECT * FROM orders LIMIT 10) AS subquery"
    );
    assert!(params.is_empty());
}

#[test]
fn test_expire_renders_ttl_update() {
    let (sql, params) = render("EXPIRE tenant:t1:sessions:abc 3600");
    assert_eq!(sql, "UPDATE sessions SET ttl = $1 WHERE id = $2");
    assert_eq!(params, vec!["3600", "abc"]);
}

#[test]
fn test_hdel_renders_null_assignment() {
    let (sql, params) = render("HDEL tenant:t1:users:42 nickname");
    assert_eq!(sql, "UPDATE users SET nickname = $1 WHERE id = $2");
    assert_eq!(params, vec!["NULL", "42"]);
}

#[test]
fn test_lpush_renders_array_append() {
    let (sql, params) = render("LPUSH tenant:t1:users:42 admin");
    assert_eq!(
        sql,
        "UPDATE users SET value = ARRAY_APPEND(value, admin) WHERE id = $1"
    );
    assert_eq!(params, vec!["42"]);
}

#[test]
fn test_multi_exec() {
    assert_eq!(render("MULTI").0, "BEGIN");
    assert_eq!(render("EXEC").0, "COMMIT");
    assert_eq!(render("DISCARD").0, "ROLLBACK");
}

#[test]
fn test_keys_renders_like() {
    let (sql, params) = render("KEYS tenant:t1:users:4*");
    assert_eq!(sql, "SELECT * FROM users WHERE id LIKE $1");
    assert_eq!(params, vec!["4%"]);
}

#[test]
fn test_acl_setuser_grant_renders() {
    let (sql, _) = render("ACL SETUSER alice ~tenant:t1:users:* +get +hset");
    assert_eq!(sql, "GRANT READ, WRITE ON users TO alice");
}

#[test]
fn test_acl_create_user_renders() {
    let (sql, _) = render("ACL SETUSER alice resetkeys >pw +@all");
    assert_eq!(sql, "CREATE USER alice WITH PASSWORD 'pw'");
}

#[test]
fn test_acl_deluser_renders() {
    let (sql, _) = render("ACL DELUSER alice");
    assert_eq!(sql, "DROP USER IF EXISTS alice");
}

#[test]
fn test_acl_revoke() {
    let q = lift("ACL SETUSER alice -del");
    assert_eq!(q.operation, Operation::Revoke);
}

#[test]
fn test_unknown_command() {
    assert!(matches!(
        to_query("SUBSCRIBE channel", Dialect::Redis),
        Err(queryport::TranslateError::NotSupported(_))
    ));
}

#[test]
fn test_ttl_read() {
    let q = lift("TTL tenant:t1:sessions:abc");
    assert_eq!(q.operation, Operation::Get);
    assert_eq!(q.columns, vec!["ttl"]);
    assert_eq!(q.conditions[0].operator, Operator::Eq);
}
