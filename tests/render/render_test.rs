//! Renderer integration tests: hand-built queries in, SQL and parameter
//! vectors out. The parameter invariant (placeholders numbered 1..N, vector
//! length N) is checked across every shape.

use queryport::oql::{
    binary, field, literal, AggregateSpec, CaseArm, Condition, Expression, Field, Join, JoinType,
    Logic, Operation, Operator, OrderBy, Query, SelectColumn, UpsertClause,
};
use queryport::{translate, Dialect};

fn assert_param_invariant(sql: &str, params: &[String]) {
    // Collect the distinct $k placeholders in textual order.
    let mut numbers = Vec::new();
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 {
                numbers.push(sql[i + 1..j].parse::<usize>().unwrap());
            }
            i = j;
        } else {
            i += 1;
        }
    }
    assert_eq!(numbers.len(), params.len(), "placeholder count vs params: {}", sql);
    for (idx, n) in numbers.iter().enumerate() {
        assert_eq!(*n, idx + 1, "placeholders must be gapless left-to-right: {}", sql);
    }
}

fn render(q: &Query) -> (String, Vec<String>) {
    let (sql, params) = translate(q, Dialect::PostgreSql).unwrap();
    assert_param_invariant(&sql, &params);
    (sql, params)
}

#[test]
fn test_select_everything() {
    let mut q = Query::new(Operation::Get, "User");
    q.columns = vec!["id".into(), "name".into()];
    q.distinct = true;
    q.conditions = vec![
        Condition::new(field("age"), Operator::Gte, Some(literal("18"))),
        Condition::in_list(field("status"), Operator::In, vec![literal("a"), literal("b")])
            .with_logic(Logic::And),
        Condition::new(field("deleted_at"), Operator::IsNull, None).with_logic(Logic::And),
    ];
    q.order_by = vec![OrderBy::desc(field("id"))];
    q.limit = Some(10);
    q.offset = Some(20);

    let (sql, params) = render(&q);
    assert_eq!(
        sql,
        "SELECT DISTINCT id, name FROM users WHERE age >= $1 AND status IN ($2, $3) AND deleted_at IS NULL ORDER BY id DESC LIMIT 10 OFFSET 20"
    );
    assert_eq!(params, vec!["18", "a", "b"]);
}

#[test]
fn test_join_rendering() {
    let mut q = Query::new(Operation::Get, "User");
    q.columns = vec!["users.name".into(), "orders.total".into()];
    q.joins = vec![Join {
        join_type: JoinType::Left,
        table: "orders".into(),
        left: field("users.id"),
        right: field("orders.user_id"),
    }];
    let (sql, _) = render(&q);
    assert_eq!(
        sql,
        "SELECT users.name, orders.total FROM users LEFT JOIN orders ON users.id = orders.user_id"
    );
}

#[test]
fn test_update_with_case_when() {
    let mut q = Query::new(Operation::Update, "User");
    q.fields = vec![Field::new(
        field("tier"),
        Some(queryport::oql::case_when(
            vec![
                CaseArm {
                    when: Condition::new(field("points"), Operator::Gte, Some(literal("100"))),
                    then: literal("gold"),
                },
                CaseArm {
                    when: Condition::new(field("points"), Operator::Gte, Some(literal("50"))),
                    then: literal("silver"),
                },
            ],
            Some(literal("bronze")),
        )),
    )];
    q.conditions = vec![Condition::new(field("id"), Operator::Eq, Some(literal("1")))];

    let (sql, params) = render(&q);
    assert_eq!(
        sql,
        "UPDATE users SET tier = CASE WHEN points >= $1 THEN $2 WHEN points >= $3 THEN $4 ELSE $5 END WHERE id = $6"
    );
    assert_eq!(params, vec!["100", "gold", "50", "silver", "bronze", "1"]);
}

#[test]
fn test_case_with_compound_branch_is_inlined() {
    let mut q = Query::new(Operation::Update, "Account");
    q.fields = vec![Field::new(
        field("balance"),
        Some(queryport::oql::case_when(
            vec![CaseArm {
                when: Condition::new(field("overdraft"), Operator::Eq, Some(literal("true"))),
                then: binary(field("balance"), "-", literal("10")),
            }],
            None,
        )),
    )];
    let (sql, params) = render(&q);
    assert_eq!(
        sql,
        "UPDATE accounts SET balance = CASE WHEN overdraft = $1 THEN balance - 10 END"
    );
    assert_eq!(params, vec!["true"]);
}

#[test]
fn test_upsert_scenario() {
    let mut q = Query::new(Operation::Upsert, "User");
    q.fields = vec![
        Field::assignment("id", "1"),
        Field::assignment("name", "a"),
    ];
    q.upsert = Some(UpsertClause {
        conflict_fields: vec!["id".into()],
        update_fields: vec![Field::assignment("name", "a")],
    });
    let (sql, params) = render(&q);
    assert_eq!(
        sql,
        "INSERT INTO users (id, name) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"
    );
    assert_eq!(params, vec!["1", "a"]);
}

#[test]
fn test_aggregate_pagination_wrap_scenario() {
    let mut q = Query::new(Operation::Count, "User");
    q.aggregate = Some(AggregateSpec::over("*"));
    q.conditions = vec![Condition::new(field("age"), Operator::Gt, Some(literal("18")))];
    q.limit = Some(5);
    let (sql, params) = render(&q);
    assert_eq!(
        sql,
        "SELECT COUNT(*) FROM (SELECT * FROM users WHERE age > $1 LIMIT 5) AS subquery"
    );
    assert_eq!(params, vec!["18"]);
}

#[test]
fn test_select_column_expressions() {
    let mut q = Query::new(Operation::Get, "Order");
    q.select_columns = vec![
        SelectColumn::aliased(binary(field("price"), "*", field("quantity")), "total"),
        SelectColumn::new(field("id")),
    ];
    let (sql, _) = render(&q);
    assert_eq!(sql, "SELECT price * quantity AS total, id FROM orders");
}

#[test]
fn test_window_in_projection() {
    let mut q = Query::new(Operation::Get, "Employee");
    q.columns = vec!["name".into()];
    q.window_functions = vec![queryport::oql::WindowFunction {
        expr: Expression::Window {
            name: "ROW NUMBER".into(),
            args: vec![],
            partition_by: vec![field("dept")],
            order_by: vec![queryport::oql::WindowOrder::desc(field("salary"))],
            offset: 0,
            buckets: 0,
        },
        alias: "rn".into(),
    }];
    let (sql, _) = render(&q);
    assert_eq!(
        sql,
        "SELECT name, ROW_NUMBER() OVER (PARTITION BY dept ORDER BY salary DESC) AS rn FROM employees"
    );
}

#[test]
fn test_replace_with_conditions_updates() {
    let mut q = Query::new(Operation::Replace, "User");
    q.fields = vec![Field::assignment("name", "Ada")];
    q.conditions = vec![Condition::new(field("id"), Operator::Eq, Some(literal("1")))];
    let (sql, _) = render(&q);
    assert!(sql.starts_with("UPDATE users SET"), "sql: {}", sql);

    let mut q = Query::new(Operation::Replace, "User");
    q.fields = vec![Field::assignment("name", "Ada")];
    let (sql, _) = render(&q);
    assert!(sql.starts_with("INSERT INTO users"), "sql: {}", sql);
}

#[test]
fn test_delete() {
    let mut q = Query::new(Operation::Delete, "Session");
    q.conditions = vec![Condition::new(
        field("expired"),
        Operator::Eq,
        Some(literal("true")),
    )];
    let (sql, params) = render(&q);
    assert_eq!(sql, "DELETE FROM sessions WHERE expired = $1");
    assert_eq!(params, vec!["true"]);
}

#[test]
fn test_irregular_entity_pluralization() {
    let q = Query::new(Operation::Get, "Person");
    let (sql, _) = render(&q);
    assert_eq!(sql, "SELECT * FROM people");
}
