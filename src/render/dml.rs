//! DML rendering: SELECT, INSERT, UPDATE, DELETE, UPSERT, and the aggregate
//! operations.

use crate::error::TranslateResult;
use crate::oql::{Field, Operation, Query, SetOp};

use super::expr::{render_condition_list, render_expression, render_value, ParamSink};
use super::{render_statement, table_name};

// =============================================================================
// SELECT
// =============================================================================

pub(super) fn render_select(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    if let Some(set_op) = &query.set_operation {
        let left = render_statement(&set_op.left, sink)?;
        let right = render_statement(&set_op.right, sink)?;
        let op = match set_op.op {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION ALL",
            SetOp::Intersect => "INTERSECT",
            SetOp::Except => "EXCEPT",
        };
        return Ok(format!("({}) {} ({})", left, op, right));
    }

    if let Some(cte) = &query.cte {
        let with_query = render_statement(&cte.query, sink)?;
        let main = render_statement(&cte.main_query, sink)?;
        let recursive = if cte.recursive { "RECURSIVE " } else { "" };
        return Ok(format!(
            "WITH {}{} AS ({}) {}",
            recursive, cte.name, with_query, main
        ));
    }

    let mut sql = String::from("SELECT ");
    if query.distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&render_projection(query, sink)?);
    sql.push_str(&format!(" FROM {}", table_name(query)));
    render_joins(query, &mut sql, sink)?;
    render_where(query, &mut sql, sink)?;
    render_group_having(query, &mut sql, sink)?;
    render_order_limit(query, &mut sql, sink)?;
    Ok(sql)
}

fn render_projection(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    let mut cols: Vec<String> = Vec::new();

    if !query.select_columns.is_empty() {
        for sc in &query.select_columns {
            let rendered = render_expression(&sc.expr, sink)?;
            match &sc.alias {
                Some(alias) => cols.push(format!("{} AS {}", rendered, alias)),
                None => cols.push(rendered),
            }
        }
    } else if !query.columns.is_empty() {
        cols.extend(query.columns.iter().cloned());
    }

    for wf in &query.window_functions {
        let rendered = render_expression(&wf.expr, sink)?;
        if wf.alias.is_empty() {
            cols.push(rendered);
        } else {
            cols.push(format!("{} AS {}", rendered, wf.alias));
        }
    }

    if cols.is_empty() {
        return Ok("*".into());
    }
    Ok(cols.join(", "))
}

fn render_joins(query: &Query, sql: &mut String, sink: &mut ParamSink) -> TranslateResult<()> {
    for join in &query.joins {
        sql.push_str(&format!(" {} JOIN {}", join.join_type.as_str(), join.table));
        if join.join_type != crate::oql::JoinType::Cross {
            let left = render_expression(&join.left, sink)?;
            let right = render_expression(&join.right, sink)?;
            sql.push_str(&format!(" ON {} = {}", left, right));
        }
    }
    Ok(())
}

fn render_where(query: &Query, sql: &mut String, sink: &mut ParamSink) -> TranslateResult<()> {
    if !query.conditions.is_empty() {
        let conds = render_condition_list(&query.conditions, sink)?;
        sql.push_str(&format!(" WHERE {}", conds));
    }
    Ok(())
}

fn render_group_having(
    query: &Query,
    sql: &mut String,
    sink: &mut ParamSink,
) -> TranslateResult<()> {
    if !query.group_by.is_empty() {
        let groups: Vec<String> = query
            .group_by
            .iter()
            .map(|g| render_expression(g, sink))
            .collect::<TranslateResult<_>>()?;
        sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
    }
    if !query.having.is_empty() {
        let having = render_condition_list(&query.having, sink)?;
        sql.push_str(&format!(" HAVING {}", having));
    }
    Ok(())
}

fn render_order_limit(
    query: &Query,
    sql: &mut String,
    sink: &mut ParamSink,
) -> TranslateResult<()> {
    if !query.order_by.is_empty() {
        let orders: Vec<String> = query
            .order_by
            .iter()
            .map(|o| {
                render_expression(&o.expr, sink)
                    .map(|e| if o.desc { format!("{} DESC", e) } else { format!("{} ASC", e) })
            })
            .collect::<TranslateResult<_>>()?;
        sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = query.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }
    Ok(())
}

// =============================================================================
// INSERT family
// =============================================================================

fn render_insert_row(fields: &[Field], sink: &mut ParamSink) -> TranslateResult<String> {
    let values: Vec<String> = fields
        .iter()
        .map(|f| match &f.value {
            Some(v) => render_value(v, sink),
            None => Ok(sink.bind(crate::oql::NULL_SENTINEL)),
        })
        .collect::<TranslateResult<_>>()?;
    Ok(format!("({})", values.join(", ")))
}

fn insert_columns(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.name_text().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(super) fn render_insert(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    let row = render_insert_row(&query.fields, sink)?;
    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        table_name(query),
        insert_columns(&query.fields),
        row
    ))
}

pub(super) fn render_bulk_insert(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    let first = query.bulk_rows.first();
    let columns = match first {
        Some(row) => insert_columns(row),
        None => insert_columns(&query.fields),
    };
    let mut rows: Vec<String> = Vec::new();
    for row in &query.bulk_rows {
        rows.push(render_insert_row(row, sink)?);
    }
    if rows.is_empty() {
        rows.push(render_insert_row(&query.fields, sink)?);
    }
    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        table_name(query),
        columns,
        rows.join(", ")
    ))
}

pub(super) fn render_upsert(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    let mut sql = render_insert(query, sink)?;
    if let Some(upsert) = &query.upsert {
        // MySQL's ON DUPLICATE KEY names no target; the first inserted
        // column (the key by convention) stands in.
        let conflict = if upsert.conflict_fields.is_empty() {
            query
                .fields
                .first()
                .map(|f| f.name_text().to_string())
                .unwrap_or_default()
        } else {
            upsert.conflict_fields.join(", ")
        };
        let updates: Vec<String> = upsert
            .update_fields
            .iter()
            .map(|f| {
                let name = f.name_text();
                format!("{} = EXCLUDED.{}", name, name)
            })
            .collect();
        if updates.is_empty() {
            sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", conflict));
        } else {
            sql.push_str(&format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                conflict,
                updates.join(", ")
            ));
        }
    }
    Ok(sql)
}

/// REPLACE carries either a filter (the replace-by-filter shape) or bare
/// data (the REPLACE INTO shape); it renders as UPDATE or INSERT accordingly.
pub(super) fn render_replace(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    if query.conditions.is_empty() {
        render_insert(query, sink)
    } else {
        render_update(query, sink)
    }
}

// =============================================================================
// UPDATE / DELETE
// =============================================================================

pub(super) fn render_update(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    let mut assignments: Vec<String> = Vec::new();
    for f in &query.fields {
        let name = f.name_text();
        if f.is_rename() {
            // Renames do not survive as UPDATE assignments; they are DDL.
            continue;
        }
        let value = match &f.value {
            Some(v) => render_value(v, sink)?,
            None => sink.bind(crate::oql::NULL_SENTINEL),
        };
        assignments.push(format!("{} = {}", name, value));
    }

    let mut sql = format!(
        "UPDATE {} SET {}",
        table_name(query),
        assignments.join(", ")
    );
    render_where(query, &mut sql, sink)?;
    Ok(sql)
}

pub(super) fn render_delete(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    let mut sql = format!("DELETE FROM {}", table_name(query));
    render_where(query, &mut sql, sink)?;
    Ok(sql)
}

// =============================================================================
// Aggregates
// =============================================================================

pub(super) fn render_aggregate(query: &Query, sink: &mut ParamSink) -> TranslateResult<String> {
    let func = match query.operation {
        Operation::Count => "COUNT",
        Operation::Sum => "SUM",
        Operation::Avg => "AVG",
        Operation::Min => "MIN",
        Operation::Max => "MAX",
        _ => unreachable!("render_aggregate called for {:?}", query.operation),
    };
    let spec = query.aggregate.clone().unwrap_or_else(|| {
        crate::oql::AggregateSpec::over(if query.operation == Operation::Count {
            "*"
        } else {
            ""
        })
    });
    let distinct = if spec.distinct { "DISTINCT " } else { "" };
    let mut agg = format!("{}({}{})", func, distinct, spec.field);
    if let Some(alias) = &spec.alias {
        agg = format!("{} AS {}", agg, alias);
    }

    // A LIMIT/OFFSET without GROUP BY must apply to the rows, not the single
    // aggregate row, so the pagination moves into a subquery.
    let paginated = query.group_by.is_empty() && (query.limit.is_some() || query.offset.is_some());
    if paginated {
        let mut inner = format!("SELECT * FROM {}", table_name(query));
        render_where(query, &mut inner, sink)?;
        render_order_limit(query, &mut inner, sink)?;
        return Ok(format!("SELECT {} FROM ({}) AS subquery", agg, inner));
    }

    let mut cols: Vec<String> = Vec::new();
    for g in &query.group_by {
        cols.push(render_expression(g, sink)?);
    }
    cols.push(agg);

    let mut sql = format!("SELECT {} FROM {}", cols.join(", "), table_name(query));
    render_joins(query, &mut sql, sink)?;
    render_where(query, &mut sql, sink)?;
    render_group_having(query, &mut sql, sink)?;
    render_order_limit(query, &mut sql, sink)?;
    Ok(sql)
}
