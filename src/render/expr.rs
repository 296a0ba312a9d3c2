//! Expression and condition rendering with parameter binding.
//!
//! One [`ParamSink`] is threaded through a whole statement. Scalar literals
//! in value position bind a `$n` placeholder; literals nested inside compound
//! expressions are inlined verbatim. A sink switched to inline mode (view
//! definitions) formats every bound value as a SQL literal instead - a view
//! is a stored string and cannot hold placeholders.

use crate::error::TranslateResult;
use crate::maps::{operator_token, Dialect};
use crate::oql::{CaseArm, Condition, Expression, Logic, Operator, WindowOrder, NULL_SENTINEL};

// =============================================================================
// Parameter sink
// =============================================================================

/// Collects parameters and hands out positional placeholders.
#[derive(Debug, Default)]
pub(crate) struct ParamSink {
    params: Vec<String>,
    inline: bool,
}

impl ParamSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that inlines every value as a SQL literal (view rendering).
    pub fn inline() -> Self {
        Self {
            params: Vec::new(),
            inline: true,
        }
    }

    /// Bind a string-encoded scalar, returning the text to splice into SQL.
    pub fn bind(&mut self, value: &str) -> String {
        if self.inline {
            sql_literal(value)
        } else {
            self.params.push(value.to_string());
            format!("${}", self.params.len())
        }
    }

    pub fn into_params(self) -> Vec<String> {
        self.params
    }
}

/// Format a string-encoded scalar as an inline SQL literal: numerics
/// unquoted, booleans uppercased, NULL bare, everything else single-quoted
/// with `'` doubled.
pub(crate) fn sql_literal(value: &str) -> String {
    if value == NULL_SENTINEL {
        return "NULL".into();
    }
    if value == "true" || value == "false" {
        return value.to_uppercase();
    }
    if value.parse::<i64>().is_ok() || value.parse::<f64>().is_ok() {
        return value.into();
    }
    format!("'{}'", value.replace('\'', "''"))
}

// =============================================================================
// Expression rendering
// =============================================================================

/// Render an expression for splicing into SQL.
///
/// Identifiers and literals are emitted verbatim (the parameterization of
/// value positions is the caller's job, via [`render_value`]). A `Binary`
/// child of a `Binary` parent is parenthesized to preserve precedence.
pub(crate) fn render_expression(expr: &Expression, sink: &mut ParamSink) -> TranslateResult<String> {
    match expr {
        Expression::Field { value } => Ok(value.clone()),
        Expression::Literal { value } => Ok(value.clone()),
        Expression::Binary {
            left,
            operator,
            right,
        } => {
            let l = render_operand(left, sink)?;
            let r = render_operand(right, sink)?;
            Ok(format!("{} {} {}", l, operator, r))
        }
        Expression::Function { name, args } => {
            let rendered: Vec<String> = args
                .iter()
                .map(|a| render_expression(a, sink))
                .collect::<TranslateResult<_>>()?;
            Ok(format!("{}({})", name, rendered.join(", ")))
        }
        Expression::CaseWhen { arms, else_expr } => {
            render_case(arms, else_expr.as_deref(), sink)
        }
        Expression::Window {
            name,
            args,
            partition_by,
            order_by,
            offset,
            buckets,
        } => render_window(name, args, partition_by, order_by, *offset, *buckets, sink),
        Expression::Subquery(query) => {
            let sql = super::render_statement(query, sink)?;
            Ok(format!("({})", sql))
        }
    }
}

fn render_operand(expr: &Expression, sink: &mut ParamSink) -> TranslateResult<String> {
    let rendered = render_expression(expr, sink)?;
    if matches!(expr, Expression::Binary { .. }) {
        Ok(format!("({})", rendered))
    } else {
        Ok(rendered)
    }
}

/// Render an expression in value position: scalar literals bind a parameter,
/// compound expressions and identifiers are inlined.
pub(crate) fn render_value(expr: &Expression, sink: &mut ParamSink) -> TranslateResult<String> {
    match expr {
        Expression::Literal { value } => Ok(sink.bind(value)),
        _ => render_expression(expr, sink),
    }
}

// =============================================================================
// CASE and window forms
// =============================================================================

fn render_case(
    arms: &[CaseArm],
    else_expr: Option<&Expression>,
    sink: &mut ParamSink,
) -> TranslateResult<String> {
    let mut out = String::from("CASE");
    for arm in arms {
        let cond = render_single_condition(&arm.when, sink)?;
        let then = render_value(&arm.then, sink)?;
        out.push_str(&format!(" WHEN {} THEN {}", cond, then));
    }
    if let Some(else_expr) = else_expr {
        let rendered = render_value(else_expr, sink)?;
        out.push_str(&format!(" ELSE {}", rendered));
    }
    out.push_str(" END");
    Ok(out)
}

fn render_window(
    name: &str,
    args: &[Expression],
    partition_by: &[Expression],
    order_by: &[WindowOrder],
    offset: i64,
    buckets: i64,
    sink: &mut ParamSink,
) -> TranslateResult<String> {
    // Canonical window names carry spaces (e.g. "ROW NUMBER"); SQL wants
    // underscores.
    let fn_name = name.replace(' ', "_");
    let upper = fn_name.to_uppercase();

    let call_args = if upper == "LAG" || upper == "LEAD" {
        let field = args
            .first()
            .map(|a| render_expression(a, sink))
            .transpose()?
            .unwrap_or_default();
        if offset > 1 {
            format!("{}, {}", field, offset)
        } else {
            field
        }
    } else if upper == "NTILE" {
        buckets.to_string()
    } else {
        let rendered: Vec<String> = args
            .iter()
            .map(|a| render_expression(a, sink))
            .collect::<TranslateResult<_>>()?;
        rendered.join(", ")
    };

    let mut over = String::new();
    if !partition_by.is_empty() {
        let parts: Vec<String> = partition_by
            .iter()
            .map(|p| render_expression(p, sink))
            .collect::<TranslateResult<_>>()?;
        over.push_str(&format!("PARTITION BY {}", parts.join(", ")));
    }
    if !order_by.is_empty() {
        if !over.is_empty() {
            over.push(' ');
        }
        let orders: Vec<String> = order_by
            .iter()
            .map(|o| {
                render_expression(&o.expr, sink)
                    .map(|e| if o.desc { format!("{} DESC", e) } else { e })
            })
            .collect::<TranslateResult<_>>()?;
        over.push_str(&format!("ORDER BY {}", orders.join(", ")));
    }

    Ok(format!("{}({}) OVER ({})", fn_name, call_args, over))
}

// =============================================================================
// Condition rendering
// =============================================================================

/// Render a condition list joined by its logic links, for WHERE or HAVING.
pub(crate) fn render_condition_list(
    conditions: &[Condition],
    sink: &mut ParamSink,
) -> TranslateResult<String> {
    let mut out = String::new();
    for (i, cond) in conditions.iter().enumerate() {
        if i > 0 {
            let link = match cond.logic {
                Logic::None | Logic::And => "AND",
                Logic::Or => "OR",
            };
            out.push_str(&format!(" {} ", link));
        }
        if cond.is_group() {
            let inner = render_condition_list(&cond.nested, sink)?;
            out.push_str(&format!("({})", inner));
        } else {
            out.push_str(&render_single_condition(cond, sink)?);
        }
    }
    Ok(out)
}

fn render_single_condition(cond: &Condition, sink: &mut ParamSink) -> TranslateResult<String> {
    if cond.is_group() {
        let inner = render_condition_list(&cond.nested, sink)?;
        return Ok(format!("({})", inner));
    }

    let field = render_expression(&cond.field, sink)?;
    let token = operator_token(Dialect::PostgreSql, cond.operator)
        .unwrap_or_else(|| cond.operator.as_str());

    if cond.operator.is_null_test() {
        return Ok(format!("{} {}", field, token));
    }

    if cond.operator.is_list() {
        // IN over a subquery carries its operand in `value`.
        if cond.values.is_empty() {
            if let Some(value) = &cond.value {
                let rendered = render_expression(value, sink)?;
                return Ok(format!("{} {} {}", field, token, rendered));
            }
            // Empty IN lists degrade to constant predicates: nothing is in
            // the empty set, everything is not.
            return Ok(match cond.operator {
                Operator::In => "1 = 0".into(),
                _ => "1 = 1".into(),
            });
        }
        let items: Vec<String> = cond
            .values
            .iter()
            .map(|v| render_value(v, sink))
            .collect::<TranslateResult<_>>()?;
        return Ok(format!("{} {} ({})", field, token, items.join(", ")));
    }

    if cond.operator.is_range() {
        let low = cond
            .value
            .as_ref()
            .map(|v| render_value(v, sink))
            .transpose()?
            .unwrap_or_default();
        let high = cond
            .value2
            .as_ref()
            .map(|v| render_value(v, sink))
            .transpose()?
            .unwrap_or_default();
        return Ok(format!("{} {} {} AND {}", field, token, low, high));
    }

    let value = cond
        .value
        .as_ref()
        .map(|v| render_value(v, sink))
        .transpose()?
        .unwrap_or_default();
    Ok(format!("{} {} {}", field, token, value))
}
