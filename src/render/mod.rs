//! Forward rendering: OQL to dialect SQL plus a positional parameter vector.
//!
//! `translate()` is a pure function. It dispatches on the query's operation,
//! threads one parameter sink through the whole statement so placeholders are
//! numbered `$1..$N` in textual left-to-right order, and never fails on a
//! structurally valid query - operations with nothing to emit produce an
//! empty string.

mod ddl;
mod dml;
mod expr;

pub(crate) use expr::ParamSink;

use crate::error::{TranslateError, TranslateResult};
use crate::maps::{naming_rule, Dialect, NamingRule};
use crate::naming::entity_to_table;
use crate::oql::{Operation, Query};
use inflector::Inflector;

/// Render a query for the target dialect.
///
/// Returns the SQL text and the parameter vector; the vector length always
/// equals the number of placeholders in the text.
pub fn translate(query: &Query, target: Dialect) -> TranslateResult<(String, Vec<String>)> {
    if target != Dialect::PostgreSql {
        return Err(TranslateError::NotSupported(format!(
            "rendering for {} is not implemented yet",
            target
        )));
    }

    let mut sink = ParamSink::new();
    let sql = render_statement(query, &mut sink)?;
    Ok((sql, sink.into_params()))
}

/// Render one statement into an existing sink (set operations and subqueries
/// re-enter here so parameter numbering stays continuous).
pub(crate) fn render_statement(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    use Operation::*;

    match query.operation {
        Get => dml::render_select(query, sink),
        Create => dml::render_insert(query, sink),
        BulkInsert => dml::render_bulk_insert(query, sink),
        Update => dml::render_update(query, sink),
        Delete => dml::render_delete(query, sink),
        Upsert => dml::render_upsert(query, sink),
        Replace => dml::render_replace(query, sink),
        Count | Sum | Avg | Min | Max => dml::render_aggregate(query, sink),

        CreateTable => ddl::render_create_table(query),
        AlterTable => ddl::render_alter_table(query, sink),
        DropTable => Ok(format!("DROP TABLE IF EXISTS {}", table_name(query))),
        TruncateTable => Ok(format!("TRUNCATE TABLE {}", table_name(query))),
        RenameTable => ddl::render_rename_table(query),
        CreateView => ddl::render_create_view(query),
        DropView => ddl::render_drop(query, "VIEW"),
        CreateIndex => ddl::render_create_index(query),
        DropIndex => ddl::render_drop_index(query),
        CreateSequence => ddl::render_named(query, "CREATE SEQUENCE", &query.sequence),
        DropSequence => ddl::render_drop_named(query, "SEQUENCE", &query.sequence),
        CreateSchema => ddl::render_named(query, "CREATE SCHEMA", &query.schema),
        DropSchema => ddl::render_drop_named(query, "SCHEMA", &query.schema),
        DropType => ddl::render_drop_named(query, "TYPE", &query.type_name),
        DropDomain => ddl::render_drop_named(query, "DOMAIN", &query.domain),
        DropFunction => ddl::render_drop_named(query, "FUNCTION", &query.function),
        DropTrigger => ddl::render_drop_trigger(query),
        DropPolicy => ddl::render_drop_policy(query),
        DropRule => ddl::render_drop_rule(query),
        CreateExtension => ddl::render_create_extension(query),
        DropExtension => ddl::render_drop_named(query, "EXTENSION", &query.extension),
        Comment => ddl::render_comment(query),
        CreateDatabase => ddl::render_named(query, "CREATE DATABASE", &query.database),
        DropDatabase => ddl::render_drop_named(query, "DATABASE", &query.database),

        Begin => Ok("BEGIN".into()),
        Commit => Ok("COMMIT".into()),
        Rollback => Ok("ROLLBACK".into()),
        Savepoint => ddl::render_savepoint(query, "SAVEPOINT"),
        ReleaseSavepoint => ddl::render_savepoint(query, "RELEASE SAVEPOINT"),
        RollbackTo => ddl::render_savepoint(query, "ROLLBACK TO SAVEPOINT"),
        SetTransaction => ddl::render_set_transaction(query),

        Grant => ddl::render_grant(query),
        Revoke => ddl::render_revoke(query),
        CreateUser => ddl::render_create_user(query),
        AlterUser => ddl::render_alter_user(query),
        DropUser => ddl::render_drop_principal(query, "USER"),
        CreateRole => ddl::render_create_role(query),
        DropRole => ddl::render_drop_principal(query, "ROLE"),

        // CREATE TYPE/DOMAIN/FUNCTION/TRIGGER/POLICY/RULE carry only the
        // object name through the IR; there is no body to reconstruct, so
        // they render to nothing rather than to broken SQL.
        CreateType | CreateDomain | CreateFunction | CreateTrigger | CreatePolicy | CreateRule
        | Use => Ok(String::new()),
    }
}

/// The wire table name for a query, following the operation's naming rule.
pub(crate) fn table_name(query: &Query) -> String {
    match naming_rule(Dialect::PostgreSql, query.operation) {
        NamingRule::Plural => entity_to_table(&query.entity),
        NamingRule::Singular => query.entity.to_snake_case(),
        NamingRule::None => query.entity.clone(),
    }
}
