//! DDL, TCL, and DCL rendering.
//!
//! DDL statements carry their values inline (PostgreSQL does not accept
//! placeholders in utility statements), so nothing here touches the outer
//! parameter sink except ALTER TABLE's column defaults.

use crate::error::TranslateResult;
use crate::maps::{dialect_type, Dialect};
use crate::oql::{AlterKind, Constraint, Field, Query};

use super::expr::{sql_literal, ParamSink};
use super::{render_statement, table_name};

// =============================================================================
// Column definitions
// =============================================================================

/// Split an OQL type literal like `STRING(100)` into base and suffix.
fn split_type(value: &str) -> (&str, &str) {
    match value.find('(') {
        Some(idx) => (&value[..idx], &value[idx..]),
        None => (value, ""),
    }
}

/// Render one column definition for CREATE TABLE / ALTER TABLE ADD COLUMN.
fn render_column_def(field: &Field) -> String {
    let name = field.name_text();
    let type_literal = field
        .value
        .as_ref()
        .and_then(|v| v.leaf_value())
        .unwrap_or("STRING");
    let (base, suffix) = split_type(type_literal);

    // AUTO is the whole column story on PostgreSQL: a serial primary key.
    if base == "AUTO" {
        return format!("{} SERIAL PRIMARY KEY", name);
    }

    let native = dialect_type(Dialect::PostgreSql, base).unwrap_or(base);
    let mut out = format!("{} {}{}", name, native, suffix);

    // Constraint suffixes in a fixed order.
    if field.has_constraint(&Constraint::PrimaryKey) {
        out.push_str(" PRIMARY KEY");
    }
    if field.has_constraint(&Constraint::NotNull) {
        out.push_str(" NOT NULL");
    }
    if field.has_constraint(&Constraint::Unique) {
        out.push_str(" UNIQUE");
    }
    for c in &field.constraints {
        if let Constraint::Default(expr) = c {
            let rendered = match expr.leaf_value() {
                Some(text) => sql_literal(text),
                None => String::from("NULL"),
            };
            out.push_str(&format!(" DEFAULT {}", rendered));
        }
    }
    out
}

// =============================================================================
// Tables
// =============================================================================

pub(super) fn render_create_table(query: &Query) -> TranslateResult<String> {
    let columns: Vec<String> = query.fields.iter().map(render_column_def).collect();
    Ok(format!(
        "CREATE TABLE {} ({})",
        table_name(query),
        columns.join(", ")
    ))
}

pub(super) fn render_alter_table(query: &Query, _sink: &mut ParamSink) -> TranslateResult<String> {
    let table = table_name(query);
    let Some(alter) = &query.alter else {
        return Ok(format!("ALTER TABLE {}", table));
    };

    let action = match alter.kind {
        AlterKind::AddColumn => format!("ADD COLUMN {}", render_column_def(&alter.field)),
        AlterKind::DropColumn => format!("DROP COLUMN {}", alter.field.name_text()),
        AlterKind::ModifyColumn => {
            if alter.field.is_rename() {
                let new_name = alter
                    .field
                    .value
                    .as_ref()
                    .and_then(|v| v.leaf_value())
                    .unwrap_or_default();
                format!(
                    "RENAME COLUMN {} TO {}",
                    alter.field.name_text(),
                    new_name
                )
            } else {
                let type_literal = alter
                    .field
                    .value
                    .as_ref()
                    .and_then(|v| v.leaf_value())
                    .unwrap_or("STRING");
                let (base, suffix) = split_type(type_literal);
                let native = dialect_type(Dialect::PostgreSql, base).unwrap_or(base);
                format!(
                    "ALTER COLUMN {} TYPE {}{}",
                    alter.field.name_text(),
                    native,
                    suffix
                )
            }
        }
    };
    Ok(format!("ALTER TABLE {} {}", table, action))
}

pub(super) fn render_rename_table(query: &Query) -> TranslateResult<String> {
    // The new name rides in the comment slot as lifted from renameCollection.
    let new_name = query.comment.clone().unwrap_or_default();
    Ok(format!(
        "ALTER TABLE {} RENAME TO {}",
        table_name(query),
        new_name
    ))
}

// =============================================================================
// Views and indices
// =============================================================================

pub(super) fn render_create_view(query: &Query) -> TranslateResult<String> {
    let Some(view_query) = &query.view_query else {
        return Ok(String::new());
    };
    // A view definition is a stored string: parameters are inlined as SQL
    // literals instead of placeholders.
    let mut inline = ParamSink::inline();
    let body = render_statement(view_query, &mut inline)?;
    Ok(format!(
        "CREATE VIEW {} AS {}",
        table_name(query),
        body
    ))
}

pub(super) fn render_drop(query: &Query, object: &str) -> TranslateResult<String> {
    Ok(format!("DROP {} IF EXISTS {}", object, table_name(query)))
}

pub(super) fn render_create_index(query: &Query) -> TranslateResult<String> {
    let Some(index) = &query.index else {
        return Ok(String::new());
    };
    let unique = if index.unique { "UNIQUE " } else { "" };
    Ok(format!(
        "CREATE {}INDEX {} ON {} ({})",
        unique,
        index.name,
        table_name(query),
        index.columns.join(", ")
    ))
}

pub(super) fn render_drop_index(query: &Query) -> TranslateResult<String> {
    let name = query
        .index
        .as_ref()
        .map(|i| i.name.clone())
        .unwrap_or_else(|| query.entity.clone());
    Ok(format!("DROP INDEX IF EXISTS {}", name))
}

// =============================================================================
// Named objects (sequences, schemas, types, domains, extensions, databases)
// =============================================================================

fn object_name(query: &Query, slot: &Option<String>) -> String {
    slot.clone().unwrap_or_else(|| query.entity.clone())
}

pub(super) fn render_named(
    query: &Query,
    keyword: &str,
    slot: &Option<String>,
) -> TranslateResult<String> {
    Ok(format!("{} {}", keyword, object_name(query, slot)))
}

pub(super) fn render_drop_named(
    query: &Query,
    object: &str,
    slot: &Option<String>,
) -> TranslateResult<String> {
    Ok(format!(
        "DROP {} IF EXISTS {}",
        object,
        object_name(query, slot)
    ))
}

pub(super) fn render_drop_trigger(query: &Query) -> TranslateResult<String> {
    let name = object_name(query, &query.trigger);
    Ok(format!(
        "DROP TRIGGER IF EXISTS {} ON {}",
        name,
        table_name(query)
    ))
}

pub(super) fn render_drop_policy(query: &Query) -> TranslateResult<String> {
    let name = object_name(query, &query.policy);
    Ok(format!(
        "DROP POLICY IF EXISTS {} ON {}",
        name,
        table_name(query)
    ))
}

pub(super) fn render_drop_rule(query: &Query) -> TranslateResult<String> {
    let name = object_name(query, &query.rule);
    Ok(format!(
        "DROP RULE IF EXISTS {} ON {}",
        name,
        table_name(query)
    ))
}

pub(super) fn render_create_extension(query: &Query) -> TranslateResult<String> {
    Ok(format!(
        "CREATE EXTENSION IF NOT EXISTS {}",
        object_name(query, &query.extension)
    ))
}

pub(super) fn render_comment(query: &Query) -> TranslateResult<String> {
    let text = query.comment.clone().unwrap_or_default();
    Ok(format!(
        "COMMENT ON TABLE {} IS {}",
        table_name(query),
        sql_literal(&text)
    ))
}

// =============================================================================
// TCL
// =============================================================================

pub(super) fn render_savepoint(query: &Query, keyword: &str) -> TranslateResult<String> {
    let name = query
        .transaction
        .as_ref()
        .and_then(|t| t.savepoint.clone())
        .unwrap_or_default();
    Ok(format!("{} {}", keyword, name))
}

pub(super) fn render_set_transaction(query: &Query) -> TranslateResult<String> {
    let mut sql = String::from("SET TRANSACTION");
    if let Some(tx) = &query.transaction {
        if let Some(level) = &tx.isolation_level {
            sql.push_str(&format!(" ISOLATION LEVEL {}", level.to_uppercase()));
        }
        match tx.read_only {
            Some(true) => sql.push_str(" READ ONLY"),
            Some(false) => sql.push_str(" READ WRITE"),
            None => {}
        }
    }
    Ok(sql)
}

// =============================================================================
// DCL
// =============================================================================

pub(super) fn render_grant(query: &Query) -> TranslateResult<String> {
    let Some(perm) = &query.permission else {
        return Ok(String::new());
    };
    let grantee = perm.grantee.clone().unwrap_or_default();

    // Role membership grants have no object clause.
    if perm.privileges.is_empty() && !perm.roles.is_empty() {
        return Ok(format!("GRANT {} TO {}", perm.roles.join(", "), grantee));
    }

    let table = perm
        .on_entity
        .as_ref()
        .map(|e| crate::naming::entity_to_table(e))
        .unwrap_or_else(|| table_name(query));
    Ok(format!(
        "GRANT {} ON {} TO {}",
        perm.privileges.join(", "),
        table,
        grantee
    ))
}

pub(super) fn render_revoke(query: &Query) -> TranslateResult<String> {
    let Some(perm) = &query.permission else {
        return Ok(String::new());
    };
    let grantee = perm.grantee.clone().unwrap_or_default();

    if perm.privileges.is_empty() && !perm.roles.is_empty() {
        return Ok(format!("REVOKE {} FROM {}", perm.roles.join(", "), grantee));
    }

    let table = perm
        .on_entity
        .as_ref()
        .map(|e| crate::naming::entity_to_table(e))
        .unwrap_or_else(|| table_name(query));
    Ok(format!(
        "REVOKE {} ON {} FROM {}",
        perm.privileges.join(", "),
        table,
        grantee
    ))
}

fn principal_name(query: &Query) -> String {
    query
        .permission
        .as_ref()
        .and_then(|p| p.grantee.clone())
        .unwrap_or_else(|| query.entity.clone())
}

pub(super) fn render_create_user(query: &Query) -> TranslateResult<String> {
    let name = principal_name(query);
    let password = query.permission.as_ref().and_then(|p| p.password.clone());
    match password {
        // Role DDL cannot be parameterized, so the password inlines as a
        // quoted literal.
        Some(pwd) => Ok(format!(
            "CREATE USER {} WITH PASSWORD {}",
            name,
            sql_literal(&pwd)
        )),
        None => Ok(format!("CREATE USER {}", name)),
    }
}

pub(super) fn render_alter_user(query: &Query) -> TranslateResult<String> {
    let name = principal_name(query);
    let password = query.permission.as_ref().and_then(|p| p.password.clone());
    match password {
        Some(pwd) => Ok(format!(
            "ALTER USER {} WITH PASSWORD {}",
            name,
            sql_literal(&pwd)
        )),
        None => Ok(format!("ALTER USER {}", name)),
    }
}

pub(super) fn render_create_role(query: &Query) -> TranslateResult<String> {
    Ok(format!("CREATE ROLE {}", principal_name(query)))
}

pub(super) fn render_drop_principal(query: &Query, kind: &str) -> TranslateResult<String> {
    Ok(format!("DROP {} IF EXISTS {}", kind, principal_name(query)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oql::{field, literal, Operation, PermissionSpec, Query, TransactionSpec};

    #[test]
    fn test_create_table_auto_column() {
        let mut q = Query::new(Operation::CreateTable, "User");
        q.fields = vec![
            Field::new(field("id"), Some(literal("AUTO"))),
            Field::new(field("name"), Some(literal("STRING(100)")))
                .with_constraint(Constraint::NotNull),
            Field::new(field("email"), Some(literal("STRING")))
                .with_constraint(Constraint::Unique),
        ];
        let sql = render_create_table(&q).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE users (id SERIAL PRIMARY KEY, name VARCHAR(100) NOT NULL, email VARCHAR UNIQUE)"
        );
    }

    #[test]
    fn test_column_default_renders_inline() {
        let f = Field::new(field("active"), Some(literal("BOOLEAN")))
            .with_constraint(Constraint::Default(literal("true")));
        assert_eq!(render_column_def(&f), "active BOOLEAN DEFAULT TRUE");
    }

    #[test]
    fn test_alter_table_add_column() {
        let mut q = Query::new(Operation::AlterTable, "User");
        q.alter = Some(crate::oql::AlterAction {
            kind: AlterKind::AddColumn,
            field: Field::new(field("age"), Some(literal("INT"))),
        });
        let sql = render_alter_table(&q, &mut ParamSink::new()).unwrap();
        assert_eq!(sql, "ALTER TABLE users ADD COLUMN age INTEGER");
    }

    #[test]
    fn test_alter_table_rename_column() {
        let mut q = Query::new(Operation::AlterTable, "User");
        q.alter = Some(crate::oql::AlterAction {
            kind: AlterKind::ModifyColumn,
            field: Field::new(field("fullname"), Some(field("full_name")))
                .with_constraint(Constraint::Rename),
        });
        let sql = render_alter_table(&q, &mut ParamSink::new()).unwrap();
        assert_eq!(sql, "ALTER TABLE users RENAME COLUMN fullname TO full_name");
    }

    #[test]
    fn test_create_view_inlines_parameters() {
        let mut inner = Query::new(Operation::Get, "User");
        inner.conditions = vec![crate::oql::Condition::new(
            field("active"),
            crate::oql::Operator::Eq,
            Some(literal("true")),
        )];
        let mut q = Query::new(Operation::CreateView, "ActiveUser");
        q.view_query = Some(Box::new(inner));
        let sql = render_create_view(&q).unwrap();
        assert_eq!(
            sql,
            "CREATE VIEW active_users AS SELECT * FROM users WHERE active = TRUE"
        );
    }

    #[test]
    fn test_set_transaction() {
        let mut q = Query::bare(Operation::SetTransaction);
        q.transaction = Some(TransactionSpec {
            savepoint: None,
            isolation_level: Some("repeatable read".into()),
            read_only: Some(true),
        });
        let sql = render_set_transaction(&q).unwrap();
        assert_eq!(
            sql,
            "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY"
        );
    }

    #[test]
    fn test_grant_on_table() {
        let mut q = Query::new(Operation::Grant, "User");
        q.permission = Some(PermissionSpec {
            privileges: vec!["SELECT".into(), "INSERT".into()],
            on_entity: Some("User".into()),
            grantee: Some("alice".into()),
            password: None,
            roles: vec![],
        });
        let sql = render_grant(&q).unwrap();
        assert_eq!(sql, "GRANT SELECT, INSERT ON users TO alice");
    }

    #[test]
    fn test_create_user_with_password() {
        let mut q = Query::new(Operation::CreateUser, "User");
        q.permission = Some(PermissionSpec {
            privileges: vec![],
            on_entity: None,
            grantee: Some("alice".into()),
            password: Some("s3cret".into()),
            roles: vec![],
        });
        let sql = render_create_user(&q).unwrap();
        assert_eq!(sql, "CREATE USER alice WITH PASSWORD 's3cret'");
    }

    #[test]
    fn test_create_index() {
        let mut q = Query::new(Operation::CreateIndex, "User");
        q.index = Some(crate::oql::IndexDef {
            name: "idx_users_email".into(),
            columns: vec!["email".into()],
            unique: true,
        });
        let sql = render_create_index(&q).unwrap();
        assert_eq!(sql, "CREATE UNIQUE INDEX idx_users_email ON users (email)");
    }
}
