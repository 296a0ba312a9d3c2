//! DDL / TCL / DCL rendering through the public API.

use queryport::oql::{
    field, literal, AlterAction, AlterKind, Constraint, Field, IndexDef, Operation,
    PermissionSpec, Query, TransactionSpec,
};
use queryport::{translate, Dialect};

fn render(q: &Query) -> String {
    translate(q, Dialect::PostgreSql).unwrap().0
}

#[test]
fn test_create_table() {
    let mut q = Query::new(Operation::CreateTable, "User");
    q.fields = vec![
        Field::new(field("id"), Some(literal("AUTO"))),
        Field::new(field("email"), Some(literal("STRING(255)")))
            .with_constraint(Constraint::NotNull)
            .with_constraint(Constraint::Unique),
        Field::new(field("active"), Some(literal("BOOLEAN")))
            .with_constraint(Constraint::Default(literal("true"))),
    ];
    assert_eq!(
        render(&q),
        "CREATE TABLE users (id SERIAL PRIMARY KEY, email VARCHAR(255) NOT NULL UNIQUE, active BOOLEAN DEFAULT TRUE)"
    );
}

#[test]
fn test_alter_table() {
    let mut q = Query::new(Operation::AlterTable, "User");
    q.alter = Some(AlterAction {
        kind: AlterKind::AddColumn,
        field: Field::new(field("age"), Some(literal("INT"))),
    });
    assert_eq!(render(&q), "ALTER TABLE users ADD COLUMN age INTEGER");

    q.alter = Some(AlterAction {
        kind: AlterKind::DropColumn,
        field: Field::new(field("age"), None),
    });
    assert_eq!(render(&q), "ALTER TABLE users DROP COLUMN age");

    q.alter = Some(AlterAction {
        kind: AlterKind::ModifyColumn,
        field: Field::new(field("age"), Some(literal("BIGINT"))),
    });
    assert_eq!(render(&q), "ALTER TABLE users ALTER COLUMN age TYPE BIGINT");
}

#[test]
fn test_drop_and_truncate() {
    assert_eq!(
        render(&Query::new(Operation::DropTable, "User")),
        "DROP TABLE IF EXISTS users"
    );
    assert_eq!(
        render(&Query::new(Operation::TruncateTable, "Session")),
        "TRUNCATE TABLE sessions"
    );
    assert_eq!(
        render(&Query::new(Operation::DropView, "ActiveUser")),
        "DROP VIEW IF EXISTS active_users"
    );
}

#[test]
fn test_create_view_inlines_literals() {
    let mut inner = Query::new(Operation::Get, "User");
    inner.columns = vec!["id".into(), "name".into()];
    inner.conditions = vec![queryport::oql::Condition::new(
        field("status"),
        queryport::oql::Operator::Eq,
        Some(literal("active")),
    )];
    let mut q = Query::new(Operation::CreateView, "ActiveUser");
    q.view_query = Some(Box::new(inner));
    assert_eq!(
        render(&q),
        "CREATE VIEW active_users AS SELECT id, name FROM users WHERE status = 'active'"
    );
}

#[test]
fn test_view_literal_escaping() {
    let mut inner = Query::new(Operation::Get, "User");
    inner.conditions = vec![queryport::oql::Condition::new(
        field("name"),
        queryport::oql::Operator::Eq,
        Some(literal("O'Brien")),
    )];
    let mut q = Query::new(Operation::CreateView, "Namesake");
    q.view_query = Some(Box::new(inner));
    assert!(render(&q).contains("name = 'O''Brien'"));
}

#[test]
fn test_index_lifecycle() {
    let mut q = Query::new(Operation::CreateIndex, "User");
    q.index = Some(IndexDef {
        name: "idx_users_email".into(),
        columns: vec!["email".into()],
        unique: false,
    });
    assert_eq!(render(&q), "CREATE INDEX idx_users_email ON users (email)");

    let mut q = Query::bare(Operation::DropIndex);
    q.index = Some(IndexDef {
        name: "idx_users_email".into(),
        ..Default::default()
    });
    assert_eq!(render(&q), "DROP INDEX IF EXISTS idx_users_email");
}

#[test]
fn test_sequence_schema_database() {
    let mut q = Query::bare(Operation::CreateSequence);
    q.sequence = Some("user_id_seq".into());
    assert_eq!(render(&q), "CREATE SEQUENCE user_id_seq");

    let mut q = Query::bare(Operation::DropSchema);
    q.schema = Some("reporting".into());
    assert_eq!(render(&q), "DROP SCHEMA IF EXISTS reporting");

    let mut q = Query::bare(Operation::CreateDatabase);
    q.database = Some("analytics".into());
    assert_eq!(render(&q), "CREATE DATABASE analytics");
}

#[test]
fn test_tcl() {
    assert_eq!(render(&Query::bare(Operation::Begin)), "BEGIN");
    assert_eq!(render(&Query::bare(Operation::Commit)), "COMMIT");
    assert_eq!(render(&Query::bare(Operation::Rollback)), "ROLLBACK");

    let mut q = Query::bare(Operation::Savepoint);
    q.transaction = Some(TransactionSpec {
        savepoint: Some("sp1".into()),
        ..Default::default()
    });
    assert_eq!(render(&q), "SAVEPOINT sp1");

    let mut q = Query::bare(Operation::RollbackTo);
    q.transaction = Some(TransactionSpec {
        savepoint: Some("sp1".into()),
        ..Default::default()
    });
    assert_eq!(render(&q), "ROLLBACK TO SAVEPOINT sp1");

    let mut q = Query::bare(Operation::SetTransaction);
    q.transaction = Some(TransactionSpec {
        savepoint: None,
        isolation_level: Some("serializable".into()),
        read_only: Some(false),
    });
    assert_eq!(
        render(&q),
        "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ WRITE"
    );
}

#[test]
fn test_dcl() {
    let mut q = Query::new(Operation::Grant, "User");
    q.permission = Some(PermissionSpec {
        privileges: vec!["SELECT".into()],
        on_entity: Some("Order".into()),
        grantee: Some("bob".into()),
        password: None,
        roles: vec![],
    });
    assert_eq!(render(&q), "GRANT SELECT ON orders TO bob");

    let mut q = Query::new(Operation::Revoke, "User");
    q.permission = Some(PermissionSpec {
        privileges: vec!["ALL".into()],
        on_entity: Some("Order".into()),
        grantee: Some("bob".into()),
        password: None,
        roles: vec![],
    });
    assert_eq!(render(&q), "REVOKE ALL ON orders FROM bob");

    let mut q = Query::new(Operation::CreateRole, "User");
    q.permission = Some(PermissionSpec {
        grantee: Some("reporting".into()),
        ..Default::default()
    });
    assert_eq!(render(&q), "CREATE ROLE reporting");

    let mut q = Query::new(Operation::DropRole, "User");
    q.permission = Some(PermissionSpec {
        grantee: Some("reporting".into()),
        ..Default::default()
    });
    assert_eq!(render(&q), "DROP ROLE IF EXISTS reporting");
}

#[test]
fn test_comment() {
    let mut q = Query::new(Operation::Comment, "User");
    q.comment = Some("application users".into());
    assert_eq!(
        render(&q),
        "COMMENT ON TABLE users IS 'application users'"
    );
}

#[test]
fn test_rename_table() {
    let mut q = Query::new(Operation::RenameTable, "User");
    q.comment = Some("customers".into());
    assert_eq!(render(&q), "ALTER TABLE users RENAME TO customers");
}

#[test]
fn test_bodiless_ddl_renders_empty() {
    for op in [
        Operation::CreateFunction,
        Operation::CreateTrigger,
        Operation::CreatePolicy,
        Operation::CreateRule,
        Operation::CreateType,
        Operation::CreateDomain,
        Operation::Use,
    ] {
        let (sql, params) = translate(&Query::bare(op), Dialect::PostgreSql).unwrap();
        assert_eq!(sql, "", "{:?} should render empty", op);
        assert!(params.is_empty());
    }
}
