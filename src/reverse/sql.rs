//! Shared statement lifter for the SQL dialects.
//!
//! PostgreSQL and MySQL arrive through the same `sqlparser` AST; the lifter
//! dispatches on the top statement variant and carries the source dialect
//! only where the two surfaces genuinely diverge (operator spellings,
//! `ON DUPLICATE KEY UPDATE`, isolation-level session variables).

use sqlparser::ast;

use crate::error::{TranslateError, TranslateResult};
use crate::maps::{oql_type, Dialect};
use crate::naming::table_to_entity;
use crate::oql::{
    self, binary, field, literal, normalize_logic, star, AggregateSpec, AlterAction, AlterKind,
    CaseArm, Condition, Constraint, Cte, Expression, Field, IndexDef, Join, JoinType, Logic,
    Operation, Operator, OrderBy, PermissionSpec, Query, SelectColumn, SetOp, SetOperation,
    TransactionSpec, UpsertClause, WindowFunction, WindowOrder,
};

const AGGREGATE_NAMES: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

pub(crate) struct SqlLifter {
    pub dialect: Dialect,
}

// =============================================================================
// Name helpers
// =============================================================================

/// The unqualified trailing segment of a (possibly schema-qualified) name.
fn base_name(name: &ast::ObjectName) -> String {
    name.to_string()
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .trim_matches('"')
        .trim_matches('`')
        .to_string()
}

fn ident_text(ident: &ast::Ident) -> String {
    ident.value.clone()
}

fn compound_text(parts: &[ast::Ident]) -> String {
    parts
        .iter()
        .map(ident_text)
        .collect::<Vec<_>>()
        .join(".")
}

impl SqlLifter {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    // =========================================================================
    // Statement dispatch
    // =========================================================================

    pub fn lift_statement(&self, stmt: &ast::Statement) -> TranslateResult<Query> {
        match stmt {
            ast::Statement::Query(query) => self.lift_query(query),
            ast::Statement::Insert(insert) => self.lift_insert(insert),
            ast::Statement::Update {
                table,
                assignments,
                selection,
                ..
            } => self.lift_update(table, assignments, selection.as_ref()),
            ast::Statement::Delete(delete) => self.lift_delete(delete),

            ast::Statement::CreateTable(create) => self.lift_create_table(create),
            ast::Statement::AlterTable {
                name, operations, ..
            } => self.lift_alter_table(name, operations),
            ast::Statement::Truncate { table_names, .. } => {
                let target = table_names
                    .first()
                    .ok_or_else(|| TranslateError::ParseError("TRUNCATE without a table".into()))?;
                Ok(Query::new(
                    Operation::TruncateTable,
                    table_to_entity(&base_name(&target.name)),
                ))
            }
            ast::Statement::Drop {
                object_type, names, ..
            } => self.lift_drop(object_type, names),
            ast::Statement::CreateView { name, query, .. } => {
                let mut q = Query::new(Operation::CreateView, table_to_entity(&base_name(name)));
                q.view_query = Some(Box::new(self.lift_query(query)?));
                Ok(q)
            }
            ast::Statement::CreateIndex(create) => self.lift_create_index(create),
            ast::Statement::CreateSequence { name, .. } => {
                let mut q = Query::bare(Operation::CreateSequence);
                q.sequence = Some(base_name(name));
                Ok(q)
            }
            ast::Statement::CreateSchema { schema_name, .. } => {
                let mut q = Query::bare(Operation::CreateSchema);
                q.schema = Some(schema_name.to_string());
                Ok(q)
            }
            ast::Statement::CreateDatabase { db_name, .. } => {
                let mut q = Query::bare(Operation::CreateDatabase);
                q.database = Some(base_name(db_name));
                Ok(q)
            }
            ast::Statement::CreateType { name, .. } => {
                let mut q = Query::bare(Operation::CreateType);
                q.type_name = Some(base_name(name));
                Ok(q)
            }
            ast::Statement::CreateExtension { name, .. } => {
                let mut q = Query::bare(Operation::CreateExtension);
                q.extension = Some(ident_text(name));
                Ok(q)
            }
            ast::Statement::CreateFunction(create) => {
                let mut q = Query::bare(Operation::CreateFunction);
                q.function = Some(base_name(&create.name));
                Ok(q)
            }
            ast::Statement::CreateTrigger {
                name, table_name, ..
            } => {
                let mut q =
                    Query::new(Operation::CreateTrigger, table_to_entity(&base_name(table_name)));
                q.trigger = Some(base_name(name));
                Ok(q)
            }
            ast::Statement::CreatePolicy {
                name, table_name, ..
            } => {
                let mut q =
                    Query::new(Operation::CreatePolicy, table_to_entity(&base_name(table_name)));
                q.policy = Some(ident_text(name));
                Ok(q)
            }
            ast::Statement::DropFunction { func_desc, .. } => {
                let mut q = Query::bare(Operation::DropFunction);
                q.function = func_desc.first().map(|f| base_name(&f.name));
                Ok(q)
            }
            ast::Statement::DropTrigger {
                trigger_name,
                table_name,
                ..
            } => {
                let entity = table_to_entity(&base_name(&table_name));
                let mut q = Query::new(Operation::DropTrigger, entity);
                q.trigger = Some(base_name(trigger_name));
                Ok(q)
            }
            ast::Statement::DropPolicy {
                name, table_name, ..
            } => {
                let mut q =
                    Query::new(Operation::DropPolicy, table_to_entity(&base_name(table_name)));
                q.policy = Some(ident_text(name));
                Ok(q)
            }
            ast::Statement::Comment {
                object_name,
                comment,
                ..
            } => {
                let mut q =
                    Query::new(Operation::Comment, table_to_entity(&base_name(object_name)));
                q.comment = comment.clone();
                Ok(q)
            }

            ast::Statement::StartTransaction { modes, .. } => {
                let mut q = Query::bare(Operation::Begin);
                q.transaction = Some(transaction_spec(modes));
                Ok(q)
            }
            ast::Statement::Commit { .. } => Ok(Query::bare(Operation::Commit)),
            ast::Statement::Rollback { savepoint, .. } => match savepoint {
                Some(name) => {
                    let mut q = Query::bare(Operation::RollbackTo);
                    q.transaction = Some(TransactionSpec {
                        savepoint: Some(ident_text(name)),
                        ..Default::default()
                    });
                    Ok(q)
                }
                None => Ok(Query::bare(Operation::Rollback)),
            },
            ast::Statement::Savepoint { name } => {
                let mut q = Query::bare(Operation::Savepoint);
                q.transaction = Some(TransactionSpec {
                    savepoint: Some(ident_text(name)),
                    ..Default::default()
                });
                Ok(q)
            }
            ast::Statement::ReleaseSavepoint { name } => {
                let mut q = Query::bare(Operation::ReleaseSavepoint);
                q.transaction = Some(TransactionSpec {
                    savepoint: Some(ident_text(name)),
                    ..Default::default()
                });
                Ok(q)
            }
            ast::Statement::SetTransaction { modes, .. } => {
                let mut q = Query::bare(Operation::SetTransaction);
                q.transaction = Some(transaction_spec(modes));
                Ok(q)
            }
            ast::Statement::SetVariable {
                variables, value, ..
            } => self.lift_set_variable(variables, value),

            ast::Statement::Grant {
                privileges,
                objects,
                grantees,
                ..
            } => self.lift_grant(Operation::Grant, privileges, objects, grantees),
            ast::Statement::Revoke {
                privileges,
                objects,
                grantees,
                ..
            } => self.lift_grant(Operation::Revoke, privileges, objects, grantees),
            ast::Statement::CreateRole {
                names,
                login,
                password,
                ..
            } => self.lift_create_role(names, *login, password),

            other => Err(TranslateError::NotSupported(format!(
                "statement has no OQL mapping: {}",
                statement_label(other)
            ))),
        }
    }

    // =========================================================================
    // SELECT and set operations
    // =========================================================================

    pub fn lift_query(&self, query: &ast::Query) -> TranslateResult<Query> {
        if let Some(with) = &query.with {
            let cte_table = with
                .cte_tables
                .first()
                .ok_or_else(|| TranslateError::ParseError("WITH without a CTE".into()))?;
            let lifted_cte = self.lift_query(&cte_table.query)?;

            let mut inner = query.clone();
            inner.with = None;
            let main = self.lift_query(&inner)?;

            let mut q = Query::new(Operation::Get, main.entity.clone());
            q.cte = Some(Cte {
                name: ident_text(&cte_table.alias.name),
                query: Box::new(lifted_cte),
                main_query: Box::new(main),
                recursive: with.recursive,
            });
            return Ok(q);
        }

        let mut lifted = self.lift_set_expr(&query.body)?;

        if let Some(order_by) = &query.order_by {
            for entry in &order_by.exprs {
                let expr = self.lift_expr(&entry.expr)?;
                lifted.order_by.push(OrderBy {
                    expr,
                    desc: entry.asc == Some(false),
                });
            }
        }
        if let Some(limit) = &query.limit {
            lifted.limit = Some(self.lift_unsigned(limit).map_err(|e| e.in_clause("LIMIT"))?);
        }
        if let Some(offset) = &query.offset {
            lifted.offset =
                Some(self.lift_unsigned(&offset.value).map_err(|e| e.in_clause("OFFSET"))?);
        }
        Ok(lifted)
    }

    fn lift_set_expr(&self, body: &ast::SetExpr) -> TranslateResult<Query> {
        match body {
            ast::SetExpr::Select(select) => self.lift_select(select),
            ast::SetExpr::Query(query) => self.lift_query(query),
            ast::SetExpr::SetOperation {
                op,
                set_quantifier,
                left,
                right,
            } => {
                let set_op = match (op, set_quantifier) {
                    (ast::SetOperator::Union, ast::SetQuantifier::All) => SetOp::UnionAll,
                    (ast::SetOperator::Union, _) => SetOp::Union,
                    (ast::SetOperator::Intersect, _) => SetOp::Intersect,
                    (ast::SetOperator::Except, _) => SetOp::Except,
                    #[allow(unreachable_patterns)]
                    (other, _) => {
                        return Err(TranslateError::NotSupported(format!(
                            "set operation has no OQL mapping: {}",
                            other
                        )))
                    }
                };
                let left = self.lift_set_expr(left)?;
                let right = self.lift_set_expr(right)?;
                let mut q = Query::new(Operation::Get, left.entity.clone());
                q.set_operation = Some(SetOperation {
                    op: set_op,
                    left: Box::new(left),
                    right: Box::new(right),
                });
                Ok(q)
            }
            other => Err(TranslateError::NotSupported(format!(
                "query body has no OQL mapping: {}",
                other
            ))),
        }
    }

    fn lift_select(&self, select: &ast::Select) -> TranslateResult<Query> {
        let mut q = Query::new(Operation::Get, String::new());

        // FROM and JOINs
        if let Some(twj) = select.from.first() {
            q.entity = table_to_entity(&relation_name(&twj.relation)?);
            for join in &twj.joins {
                q.joins.push(self.lift_join(join).map_err(|e| e.in_clause("JOIN"))?);
            }
        }

        // Projection
        for item in &select.projection {
            self.lift_select_item(item, &mut q)
                .map_err(|e| e.in_clause("SELECT"))?;
        }

        if select.distinct.is_some() {
            q.distinct = true;
        }

        if let Some(selection) = &select.selection {
            q.conditions = self
                .lift_conditions(selection)
                .map_err(|e| e.in_clause("WHERE"))?;
            normalize_logic(&mut q.conditions);
        }

        if let ast::GroupByExpr::Expressions(exprs, _) = &select.group_by {
            for expr in exprs {
                q.group_by.push(self.lift_expr(expr).map_err(|e| e.in_clause("GROUP BY"))?);
            }
        }

        if let Some(having) = &select.having {
            q.having = self
                .lift_conditions(having)
                .map_err(|e| e.in_clause("HAVING"))?;
            normalize_logic(&mut q.having);
        }

        Ok(q)
    }

    fn lift_join(&self, join: &ast::Join) -> TranslateResult<Join> {
        let table = relation_name(&join.relation)?;
        let (join_type, constraint) = match &join.join_operator {
            ast::JoinOperator::Inner(c) => (JoinType::Inner, Some(c)),
            ast::JoinOperator::LeftOuter(c) => (JoinType::Left, Some(c)),
            ast::JoinOperator::RightOuter(c) => (JoinType::Right, Some(c)),
            ast::JoinOperator::FullOuter(c) => (JoinType::Full, Some(c)),
            ast::JoinOperator::CrossJoin => (JoinType::Cross, None),
            other => {
                return Err(TranslateError::NotSupported(format!(
                    "join type has no OQL mapping: {:?}",
                    other
                )))
            }
        };

        let (left, right) = match constraint {
            None => (field(""), field("")),
            Some(ast::JoinConstraint::On(ast::Expr::BinaryOp { left, op, right }))
                if *op == ast::BinaryOperator::Eq =>
            {
                (self.lift_expr(left)?, self.lift_expr(right)?)
            }
            Some(other) => {
                return Err(TranslateError::NotSupported(format!(
                    "join constraint has no OQL mapping: {:?}",
                    other
                )))
            }
        };

        Ok(Join {
            join_type,
            table,
            left,
            right,
        })
    }

    fn lift_select_item(&self, item: &ast::SelectItem, q: &mut Query) -> TranslateResult<()> {
        match item {
            ast::SelectItem::Wildcard(_) => Ok(()),
            ast::SelectItem::QualifiedWildcard(name, _) => {
                q.columns.push(format!("{}.*", base_name(name)));
                Ok(())
            }
            ast::SelectItem::UnnamedExpr(expr) => self.lift_projection_expr(expr, None, q),
            ast::SelectItem::ExprWithAlias { expr, alias } => {
                self.lift_projection_expr(expr, Some(ident_text(alias)), q)
            }
        }
    }

    fn lift_projection_expr(
        &self,
        expr: &ast::Expr,
        alias: Option<String>,
        q: &mut Query,
    ) -> TranslateResult<()> {
        match expr {
            ast::Expr::Identifier(ident) => {
                q.columns.push(ident_text(ident));
                Ok(())
            }
            ast::Expr::CompoundIdentifier(parts) => {
                q.columns.push(compound_text(parts));
                Ok(())
            }
            ast::Expr::Function(func) if func.over.is_some() => {
                let window = self.lift_window(func)?;
                q.window_functions.push(WindowFunction {
                    expr: window,
                    alias: alias.unwrap_or_default(),
                });
                Ok(())
            }
            ast::Expr::Function(func) if is_aggregate(func) && q.aggregate.is_none() => {
                let (operation, spec) = self.lift_aggregate(func, alias)?;
                q.operation = operation;
                q.aggregate = Some(spec);
                Ok(())
            }
            other => {
                let lifted = self.lift_expr(other)?;
                q.select_columns.push(SelectColumn {
                    expr: lifted,
                    alias,
                });
                Ok(())
            }
        }
    }

    fn lift_aggregate(
        &self,
        func: &ast::Function,
        alias: Option<String>,
    ) -> TranslateResult<(Operation, AggregateSpec)> {
        let name = base_name(&func.name).to_uppercase();
        let operation = match name.as_str() {
            "COUNT" => Operation::Count,
            "SUM" => Operation::Sum,
            "AVG" => Operation::Avg,
            "MIN" => Operation::Min,
            "MAX" => Operation::Max,
            other => {
                return Err(TranslateError::NotSupported(format!(
                    "aggregate has no OQL mapping: {}",
                    other
                )))
            }
        };

        let mut spec = AggregateSpec {
            field: "*".into(),
            alias,
            distinct: false,
        };
        if let ast::FunctionArguments::List(list) = &func.args {
            spec.distinct = matches!(
                list.duplicate_treatment,
                Some(ast::DuplicateTreatment::Distinct)
            );
            if let Some(ast::FunctionArg::Unnamed(arg)) = list.args.first() {
                spec.field = match arg {
                    ast::FunctionArgExpr::Wildcard => "*".into(),
                    ast::FunctionArgExpr::QualifiedWildcard(name) => {
                        format!("{}.*", base_name(name))
                    }
                    ast::FunctionArgExpr::Expr(expr) => match self.lift_expr(expr)? {
                        Expression::Field { value } => value,
                        other => {
                            return Err(TranslateError::NotSupported(format!(
                                "aggregate argument has no OQL mapping: {:?}",
                                other
                            )))
                        }
                    },
                };
            }
        }
        Ok((operation, spec))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn lift_expr(&self, expr: &ast::Expr) -> TranslateResult<Expression> {
        match expr {
            ast::Expr::Identifier(ident) => Ok(field(ident_text(ident))),
            ast::Expr::CompoundIdentifier(parts) => Ok(field(compound_text(parts))),
            ast::Expr::Wildcard(_) => Ok(star()),
            ast::Expr::Value(value) => Ok(literal(scalar_text(value))),
            ast::Expr::Nested(inner) => self.lift_expr(inner),
            ast::Expr::UnaryOp {
                op: ast::UnaryOperator::Minus,
                expr,
            } => match self.lift_expr(expr)? {
                Expression::Literal { value } => Ok(literal(format!("-{}", value))),
                other => Ok(binary(literal("0"), "-", other)),
            },
            ast::Expr::BinaryOp { left, op, right } => {
                let operator = arithmetic_token(op).ok_or_else(|| {
                    TranslateError::NotSupported(format!(
                        "operator has no OQL expression mapping: {}",
                        op
                    ))
                })?;
                Ok(binary(
                    self.lift_expr(left)?,
                    operator,
                    self.lift_expr(right)?,
                ))
            }
            ast::Expr::Function(func) if func.over.is_some() => self.lift_window(func),
            ast::Expr::Function(func) => {
                let args = self.lift_function_args(func)?;
                Ok(oql::function(base_name(&func.name).to_uppercase(), args))
            }
            ast::Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => self.lift_case(operand.as_deref(), conditions, results, else_result.as_deref()),
            ast::Expr::Subquery(query) => Ok(Expression::Subquery(Box::new(
                self.lift_query(query)?,
            ))),
            // Cosmetic or unrecognized scalar shapes degrade to a literal of
            // their source text rather than failing the whole statement.
            other => Ok(literal(other.to_string())),
        }
    }

    fn lift_function_args(&self, func: &ast::Function) -> TranslateResult<Vec<Expression>> {
        let mut out = Vec::new();
        if let ast::FunctionArguments::List(list) = &func.args {
            for arg in &list.args {
                if let ast::FunctionArg::Unnamed(unnamed) = arg {
                    match unnamed {
                        ast::FunctionArgExpr::Expr(e) => out.push(self.lift_expr(e)?),
                        ast::FunctionArgExpr::Wildcard => out.push(star()),
                        ast::FunctionArgExpr::QualifiedWildcard(name) => {
                            out.push(field(format!("{}.*", base_name(name))))
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn lift_window(&self, func: &ast::Function) -> TranslateResult<Expression> {
        let name = base_name(&func.name).to_uppercase();
        let mut args = self.lift_function_args(func)?;

        let mut offset = 0i64;
        let mut buckets = 0i64;
        if (name == "LAG" || name == "LEAD") && args.len() >= 2 {
            if let Some(text) = args[1].leaf_value() {
                offset = text.parse().unwrap_or(0);
            }
            args.truncate(1);
        } else if name == "NTILE" {
            if let Some(text) = args.first().and_then(|a| a.leaf_value()) {
                buckets = text.parse().unwrap_or(0);
            }
            args.clear();
        }

        let mut partition_by = Vec::new();
        let mut order_by = Vec::new();
        if let Some(ast::WindowType::WindowSpec(spec)) = &func.over {
            for expr in &spec.partition_by {
                partition_by.push(self.lift_expr(expr)?);
            }
            for entry in &spec.order_by {
                order_by.push(WindowOrder {
                    expr: self.lift_expr(&entry.expr)?,
                    desc: entry.asc == Some(false),
                });
            }
        }

        Ok(Expression::Window {
            name,
            args,
            partition_by,
            order_by,
            offset,
            buckets,
        })
    }

    fn lift_case(
        &self,
        operand: Option<&ast::Expr>,
        conditions: &[ast::Expr],
        results: &[ast::Expr],
        else_result: Option<&ast::Expr>,
    ) -> TranslateResult<Expression> {
        let mut arms = Vec::new();
        for (cond_expr, result) in conditions.iter().zip(results.iter()) {
            let when = match operand {
                // CASE x WHEN v THEN ... compares the operand to each value.
                Some(op_expr) => Condition::new(
                    self.lift_expr(op_expr)?,
                    Operator::Eq,
                    Some(self.lift_expr(cond_expr)?),
                ),
                None => self.lift_single_condition(cond_expr)?,
            };
            arms.push(CaseArm {
                when,
                then: self.lift_expr(result)?,
            });
        }
        if arms.is_empty() {
            return Err(TranslateError::ParseError("CASE without WHEN arms".into()));
        }
        let else_expr = else_result.map(|e| self.lift_expr(e)).transpose()?;
        Ok(oql::case_when(arms, else_expr))
    }

    // =========================================================================
    // Conditions
    // =========================================================================

    fn lift_single_condition(&self, expr: &ast::Expr) -> TranslateResult<Condition> {
        let mut conds = self.lift_conditions(expr)?;
        normalize_logic(&mut conds);
        if conds.len() == 1 {
            Ok(conds.remove(0))
        } else {
            Ok(Condition::group(conds))
        }
    }

    pub fn lift_conditions(&self, expr: &ast::Expr) -> TranslateResult<Vec<Condition>> {
        match expr {
            ast::Expr::BinaryOp { left, op, right }
                if *op == ast::BinaryOperator::And || *op == ast::BinaryOperator::Or =>
            {
                let mut conds = self.lift_conditions(left)?;
                let mut rhs = self.lift_conditions(right)?;
                if let Some(first) = rhs.first_mut() {
                    first.logic = if *op == ast::BinaryOperator::And {
                        Logic::And
                    } else {
                        Logic::Or
                    };
                }
                conds.append(&mut rhs);
                Ok(conds)
            }
            ast::Expr::Nested(inner) => {
                if contains_bool_op(inner) {
                    let mut nested = self.lift_conditions(inner)?;
                    normalize_logic(&mut nested);
                    Ok(vec![Condition::group(nested)])
                } else {
                    self.lift_conditions(inner)
                }
            }
            ast::Expr::UnaryOp {
                op: ast::UnaryOperator::Not,
                expr,
            } => {
                // Only the first operator of the negated subtree is flipped;
                // De Morgan propagation is deliberately not performed.
                let mut conds = self.lift_conditions(expr)?;
                negate_first(&mut conds);
                Ok(conds)
            }
            ast::Expr::BinaryOp { left, op, right } => {
                let operator = comparison_operator(op).ok_or_else(|| {
                    TranslateError::NotSupported(format!(
                        "condition operator has no OQL mapping: {}",
                        op
                    ))
                })?;
                Ok(vec![Condition::new(
                    self.lift_expr(left)?,
                    operator,
                    Some(self.lift_expr(right)?),
                )])
            }
            ast::Expr::Like {
                negated,
                expr,
                pattern,
                ..
            } => {
                let op = if *negated {
                    Operator::NotLike
                } else {
                    Operator::Like
                };
                Ok(vec![Condition::new(
                    self.lift_expr(expr)?,
                    op,
                    Some(self.lift_expr(pattern)?),
                )])
            }
            ast::Expr::ILike {
                negated,
                expr,
                pattern,
                ..
            } => {
                let op = if *negated {
                    Operator::NotILike
                } else {
                    Operator::ILike
                };
                Ok(vec![Condition::new(
                    self.lift_expr(expr)?,
                    op,
                    Some(self.lift_expr(pattern)?),
                )])
            }
            ast::Expr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let op = if *negated {
                    Operator::NotBetween
                } else {
                    Operator::Between
                };
                Ok(vec![Condition::between(
                    self.lift_expr(expr)?,
                    op,
                    self.lift_expr(low)?,
                    self.lift_expr(high)?,
                )])
            }
            ast::Expr::InList {
                expr,
                list,
                negated,
            } => {
                let op = if *negated {
                    Operator::NotIn
                } else {
                    Operator::In
                };
                let values = list
                    .iter()
                    .map(|v| self.lift_expr(v))
                    .collect::<TranslateResult<Vec<_>>>()?;
                Ok(vec![Condition::in_list(self.lift_expr(expr)?, op, values)])
            }
            ast::Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                let op = if *negated {
                    Operator::NotIn
                } else {
                    Operator::In
                };
                let sub = Expression::Subquery(Box::new(self.lift_query(subquery)?));
                Ok(vec![Condition::new(self.lift_expr(expr)?, op, Some(sub))])
            }
            ast::Expr::IsNull(inner) => Ok(vec![Condition::new(
                self.lift_expr(inner)?,
                Operator::IsNull,
                None,
            )]),
            ast::Expr::IsNotNull(inner) => Ok(vec![Condition::new(
                self.lift_expr(inner)?,
                Operator::IsNotNull,
                None,
            )]),
            other => Err(TranslateError::NotSupported(format!(
                "condition shape has no OQL mapping: {}",
                other
            ))),
        }
    }

    // =========================================================================
    // INSERT / UPDATE / DELETE
    // =========================================================================

    fn lift_insert(&self, insert: &ast::Insert) -> TranslateResult<Query> {
        let entity = table_to_entity(&base_name(&insert.table_name));
        let columns: Vec<String> = insert.columns.iter().map(ident_text).collect();

        let rows = match insert.source.as_deref() {
            Some(source) => match source.body.as_ref() {
                ast::SetExpr::Values(values) => &values.rows,
                other => {
                    return Err(TranslateError::NotSupported(format!(
                        "INSERT source has no OQL mapping: {}",
                        other
                    )))
                }
            },
            None => {
                return Err(TranslateError::ParseError(
                    "INSERT without VALUES".into(),
                ))
            }
        };
        if rows.is_empty() {
            return Err(TranslateError::ParseError("INSERT without VALUES".into()));
        }

        let mut lifted_rows: Vec<Vec<Field>> = Vec::new();
        for row in rows {
            let mut fields = Vec::new();
            for (i, value) in row.iter().enumerate() {
                let name = columns.get(i).cloned().unwrap_or_else(|| format!("${}", i));
                fields.push(Field::new(field(name), Some(self.lift_expr(value)?)));
            }
            lifted_rows.push(fields);
        }

        if insert.replace_into {
            let mut q = Query::new(Operation::Replace, entity);
            q.fields = lifted_rows.remove(0);
            return Ok(q);
        }

        let upsert = match &insert.on {
            Some(ast::OnInsert::OnConflict(conflict)) => Some(self.lift_on_conflict(conflict)?),
            Some(ast::OnInsert::DuplicateKeyUpdate(assignments)) => {
                Some(self.lift_duplicate_key(assignments)?)
            }
            _ => None,
        };

        if let Some(upsert) = upsert {
            let mut q = Query::new(Operation::Upsert, entity);
            q.fields = lifted_rows.remove(0);
            q.upsert = Some(upsert);
            return Ok(q);
        }

        if lifted_rows.len() > 1 {
            let mut q = Query::new(Operation::BulkInsert, entity);
            q.bulk_rows = lifted_rows;
            Ok(q)
        } else {
            let mut q = Query::new(Operation::Create, entity);
            q.fields = lifted_rows.remove(0);
            Ok(q)
        }
    }

    fn lift_on_conflict(&self, conflict: &ast::OnConflict) -> TranslateResult<UpsertClause> {
        let mut clause = UpsertClause::default();
        if let Some(ast::ConflictTarget::Columns(columns)) = &conflict.conflict_target {
            clause.conflict_fields = columns.iter().map(ident_text).collect();
        }
        if let ast::OnConflictAction::DoUpdate(update) = &conflict.action {
            for assignment in &update.assignments {
                clause.update_fields.push(self.lift_assignment(assignment)?);
            }
        }
        Ok(clause)
    }

    /// MySQL `ON DUPLICATE KEY UPDATE col = VALUES(col)`: the `VALUES(col)`
    /// reference collapses to the bare column name.
    fn lift_duplicate_key(&self, assignments: &[ast::Assignment]) -> TranslateResult<UpsertClause> {
        let mut clause = UpsertClause::default();
        for assignment in assignments {
            let name = assignment_name(&assignment.target);
            let value = match &assignment.value {
                ast::Expr::Function(func)
                    if base_name(&func.name).eq_ignore_ascii_case("values") =>
                {
                    let args = self.lift_function_args(func)?;
                    args.into_iter().next().unwrap_or_else(|| field(name.clone()))
                }
                other => self.lift_expr(other)?,
            };
            clause
                .update_fields
                .push(Field::new(field(name), Some(value)));
        }
        Ok(clause)
    }

    fn lift_assignment(&self, assignment: &ast::Assignment) -> TranslateResult<Field> {
        let name = assignment_name(&assignment.target);
        let value = self.lift_expr(&assignment.value)?;
        Ok(Field::new(field(name), Some(value)))
    }

    fn lift_update(
        &self,
        table: &ast::TableWithJoins,
        assignments: &[ast::Assignment],
        selection: Option<&ast::Expr>,
    ) -> TranslateResult<Query> {
        let mut q = Query::new(
            Operation::Update,
            table_to_entity(&relation_name(&table.relation)?),
        );
        for assignment in assignments {
            q.fields.push(self.lift_assignment(assignment).map_err(|e| e.in_clause("SET"))?);
        }
        if let Some(selection) = selection {
            q.conditions = self
                .lift_conditions(selection)
                .map_err(|e| e.in_clause("WHERE"))?;
            normalize_logic(&mut q.conditions);
        }
        Ok(q)
    }

    fn lift_delete(&self, delete: &ast::Delete) -> TranslateResult<Query> {
        let tables = match &delete.from {
            ast::FromTable::WithFromKeyword(tables) => tables,
            ast::FromTable::WithoutKeyword(tables) => tables,
        };
        let first = tables
            .first()
            .ok_or_else(|| TranslateError::ParseError("DELETE without a table".into()))?;
        let mut q = Query::new(
            Operation::Delete,
            table_to_entity(&relation_name(&first.relation)?),
        );
        if let Some(selection) = &delete.selection {
            q.conditions = self
                .lift_conditions(selection)
                .map_err(|e| e.in_clause("WHERE"))?;
            normalize_logic(&mut q.conditions);
        }
        Ok(q)
    }

    // =========================================================================
    // DDL
    // =========================================================================

    fn lift_create_table(&self, create: &ast::CreateTable) -> TranslateResult<Query> {
        let mut q = Query::new(
            Operation::CreateTable,
            table_to_entity(&base_name(&create.name)),
        );
        for column in &create.columns {
            q.fields.push(self.lift_column_def(column)?);
        }
        Ok(q)
    }

    fn lift_column_def(&self, column: &ast::ColumnDef) -> TranslateResult<Field> {
        let type_literal = self.oql_type_literal(&column.data_type);
        let mut f = Field::new(field(ident_text(&column.name)), Some(literal(type_literal)));
        for option in &column.options {
            match &option.option {
                ast::ColumnOption::NotNull => {
                    f.constraints.push(Constraint::NotNull);
                }
                ast::ColumnOption::Unique { is_primary, .. } => {
                    f.constraints.push(if *is_primary {
                        Constraint::PrimaryKey
                    } else {
                        Constraint::Unique
                    });
                }
                ast::ColumnOption::Default(expr) => {
                    f.constraints
                        .push(Constraint::Default(self.lift_expr(expr)?));
                }
                _ => {}
            }
        }
        Ok(f)
    }

    /// Canonical OQL type text for a parsed data type: the reverse TypeMap
    /// resolves the base name and any `(n)` suffix is carried over.
    fn oql_type_literal(&self, data_type: &ast::DataType) -> String {
        let rendered = data_type.to_string();
        let (base, suffix) = match rendered.find('(') {
            Some(idx) => (&rendered[..idx], &rendered[idx..]),
            None => (rendered.as_str(), ""),
        };
        let base = base.trim();
        match oql_type(self.dialect, base) {
            Some(oql) if oql == "AUTO" => oql.to_string(),
            Some(oql) => format!("{}{}", oql, suffix),
            None => rendered,
        }
    }

    fn lift_alter_table(
        &self,
        name: &ast::ObjectName,
        operations: &[ast::AlterTableOperation],
    ) -> TranslateResult<Query> {
        let mut q = Query::new(Operation::AlterTable, table_to_entity(&base_name(name)));
        let operation = operations
            .first()
            .ok_or_else(|| TranslateError::ParseError("ALTER TABLE without an action".into()))?;

        q.alter = Some(match operation {
            ast::AlterTableOperation::AddColumn { column_def, .. } => AlterAction {
                kind: AlterKind::AddColumn,
                field: self.lift_column_def(column_def)?,
            },
            ast::AlterTableOperation::DropColumn { column_name, .. } => AlterAction {
                kind: AlterKind::DropColumn,
                field: Field::new(field(ident_text(column_name)), None),
            },
            ast::AlterTableOperation::AlterColumn { column_name, op } => {
                let f = match op {
                    ast::AlterColumnOperation::SetDataType { data_type, .. } => Field::new(
                        field(ident_text(column_name)),
                        Some(literal(self.oql_type_literal(data_type))),
                    ),
                    ast::AlterColumnOperation::SetNotNull => {
                        Field::new(field(ident_text(column_name)), None)
                            .with_constraint(Constraint::NotNull)
                    }
                    other => {
                        return Err(TranslateError::NotSupported(format!(
                            "ALTER COLUMN action has no OQL mapping: {:?}",
                            other
                        )))
                    }
                };
                AlterAction {
                    kind: AlterKind::ModifyColumn,
                    field: f,
                }
            }
            ast::AlterTableOperation::RenameColumn {
                old_column_name,
                new_column_name,
            } => AlterAction {
                kind: AlterKind::ModifyColumn,
                field: Field::new(
                    field(ident_text(old_column_name)),
                    Some(field(ident_text(new_column_name))),
                )
                .with_constraint(Constraint::Rename),
            },
            ast::AlterTableOperation::ModifyColumn {
                col_name,
                data_type,
                ..
            } => AlterAction {
                kind: AlterKind::ModifyColumn,
                field: Field::new(
                    field(ident_text(col_name)),
                    Some(literal(self.oql_type_literal(data_type))),
                ),
            },
            other => {
                return Err(TranslateError::NotSupported(format!(
                    "ALTER TABLE action has no OQL mapping: {:?}",
                    other
                )))
            }
        });
        Ok(q)
    }

    fn lift_drop(
        &self,
        object_type: &ast::ObjectType,
        names: &[ast::ObjectName],
    ) -> TranslateResult<Query> {
        let name = names
            .first()
            .map(base_name)
            .ok_or_else(|| TranslateError::ParseError("DROP without an object".into()))?;

        match object_type {
            ast::ObjectType::Table => {
                Ok(Query::new(Operation::DropTable, table_to_entity(&name)))
            }
            ast::ObjectType::View => Ok(Query::new(Operation::DropView, table_to_entity(&name))),
            ast::ObjectType::Index => {
                let mut q = Query::bare(Operation::DropIndex);
                q.index = Some(IndexDef {
                    name,
                    ..Default::default()
                });
                Ok(q)
            }
            ast::ObjectType::Schema => {
                let mut q = Query::bare(Operation::DropSchema);
                q.schema = Some(name);
                Ok(q)
            }
            ast::ObjectType::Database => {
                let mut q = Query::bare(Operation::DropDatabase);
                q.database = Some(name);
                Ok(q)
            }
            ast::ObjectType::Sequence => {
                let mut q = Query::bare(Operation::DropSequence);
                q.sequence = Some(name);
                Ok(q)
            }
            ast::ObjectType::Role => {
                let mut q = Query::bare(Operation::DropRole);
                q.permission = Some(PermissionSpec {
                    grantee: Some(name),
                    ..Default::default()
                });
                Ok(q)
            }
            ast::ObjectType::Type => {
                let mut q = Query::bare(Operation::DropType);
                q.type_name = Some(name);
                Ok(q)
            }
            other => Err(TranslateError::NotSupported(format!(
                "DROP object has no OQL mapping: {:?}",
                other
            ))),
        }
    }

    fn lift_create_index(&self, create: &ast::CreateIndex) -> TranslateResult<Query> {
        let mut q = Query::new(
            Operation::CreateIndex,
            table_to_entity(&base_name(&create.table_name)),
        );
        let columns = create
            .columns
            .iter()
            .map(|c| match self.lift_expr(&c.expr) {
                Ok(Expression::Field { value }) => Ok(value),
                Ok(other) => Err(TranslateError::NotSupported(format!(
                    "index expression has no OQL mapping: {:?}",
                    other
                ))),
                Err(e) => Err(e),
            })
            .collect::<TranslateResult<Vec<_>>>()?;
        q.index = Some(IndexDef {
            name: create.name.as_ref().map(base_name).unwrap_or_default(),
            columns,
            unique: create.unique,
        });
        Ok(q)
    }

    // =========================================================================
    // TCL / DCL
    // =========================================================================

    fn lift_set_variable(
        &self,
        variables: &ast::OneOrManyWithParens<ast::ObjectName>,
        value: &[ast::Expr],
    ) -> TranslateResult<Query> {
        let name = match variables {
            ast::OneOrManyWithParens::One(name) => name.to_string(),
            ast::OneOrManyWithParens::Many(names) => names
                .first()
                .map(|n| n.to_string())
                .unwrap_or_default(),
        };
        if !name.to_lowercase().contains("transaction_isolation") {
            return Err(TranslateError::NotSupported(format!(
                "SET variable has no OQL mapping: {}",
                name
            )));
        }
        let level = value
            .first()
            .map(|v| self.lift_expr(v))
            .transpose()?
            .and_then(|e| e.leaf_value().map(|s| s.replace('-', " ")))
            .ok_or_else(|| TranslateError::ParseError("SET without a value".into()))?;
        let mut q = Query::bare(Operation::SetTransaction);
        q.transaction = Some(TransactionSpec {
            isolation_level: Some(level),
            ..Default::default()
        });
        Ok(q)
    }

    fn lift_grant(
        &self,
        operation: Operation,
        privileges: &ast::Privileges,
        objects: &ast::GrantObjects,
        grantees: &[impl ToString],
    ) -> TranslateResult<Query> {
        let privilege_names = match privileges {
            ast::Privileges::All { .. } => vec!["ALL".to_string()],
            ast::Privileges::Actions(actions) => actions
                .iter()
                .map(|a| a.to_string().to_uppercase())
                .collect(),
        };
        let table = match objects {
            ast::GrantObjects::Tables(tables) => tables.first().map(base_name),
            ast::GrantObjects::Schemas(schemas) => schemas.first().map(base_name),
            ast::GrantObjects::Sequences(seqs) => seqs.first().map(base_name),
            other => {
                return Err(TranslateError::NotSupported(format!(
                    "grant object has no OQL mapping: {:?}",
                    other
                )))
            }
        };

        let entity = table.as_deref().map(table_to_entity).unwrap_or_default();
        let mut q = Query::new(operation, entity.clone());
        q.permission = Some(PermissionSpec {
            privileges: privilege_names,
            on_entity: if entity.is_empty() {
                None
            } else {
                Some(entity)
            },
            grantee: grantees.first().map(|g| g.to_string()),
            password: None,
            roles: Vec::new(),
        });
        Ok(q)
    }

    /// PostgreSQL draws the role/user line at LOGIN: a role that can log in
    /// is a user.
    fn lift_create_role(
        &self,
        names: &[ast::ObjectName],
        login: Option<bool>,
        password: &Option<ast::Password>,
    ) -> TranslateResult<Query> {
        let name = names
            .first()
            .map(base_name)
            .ok_or_else(|| TranslateError::ParseError("CREATE ROLE without a name".into()))?;

        let password_text = match password {
            Some(ast::Password::Password(expr)) => match self.lift_expr(expr)? {
                Expression::Literal { value } => Some(value),
                _ => None,
            },
            _ => None,
        };

        let operation = if login == Some(true) || password_text.is_some() {
            Operation::CreateUser
        } else {
            Operation::CreateRole
        };
        let mut q = Query::new(operation, "User");
        q.permission = Some(PermissionSpec {
            grantee: Some(name),
            password: password_text,
            ..Default::default()
        });
        Ok(q)
    }

    fn lift_unsigned(&self, expr: &ast::Expr) -> TranslateResult<u64> {
        match self.lift_expr(expr)? {
            Expression::Literal { value } => value.parse::<u64>().map_err(|_| {
                TranslateError::ParseError(format!("expected an unsigned integer, got {}", value))
            }),
            other => Err(TranslateError::ParseError(format!(
                "expected a numeric literal, got {:?}",
                other
            ))),
        }
    }
}

// =============================================================================
// Free helpers
// =============================================================================

fn relation_name(relation: &ast::TableFactor) -> TranslateResult<String> {
    match relation {
        ast::TableFactor::Table { name, .. } => Ok(base_name(name)),
        other => Err(TranslateError::NotSupported(format!(
            "table factor has no OQL mapping: {}",
            other
        ))),
    }
}

fn assignment_name(target: &ast::AssignmentTarget) -> String {
    match target {
        ast::AssignmentTarget::ColumnName(name) => base_name(name),
        ast::AssignmentTarget::Tuple(names) => names
            .first()
            .map(base_name)
            .unwrap_or_default(),
    }
}

fn scalar_text(value: &ast::Value) -> String {
    match value {
        ast::Value::Number(text, _) => text.clone(),
        ast::Value::SingleQuotedString(text)
        | ast::Value::DoubleQuotedString(text)
        | ast::Value::EscapedStringLiteral(text) => text.clone(),
        ast::Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
        ast::Value::Null => oql::NULL_SENTINEL.to_string(),
        other => other.to_string(),
    }
}

fn is_aggregate(func: &ast::Function) -> bool {
    let name = base_name(&func.name).to_uppercase();
    AGGREGATE_NAMES.contains(&name.as_str())
}

fn arithmetic_token(op: &ast::BinaryOperator) -> Option<&'static str> {
    match op {
        ast::BinaryOperator::Plus => Some("+"),
        ast::BinaryOperator::Minus => Some("-"),
        ast::BinaryOperator::Multiply => Some("*"),
        ast::BinaryOperator::Divide => Some("/"),
        ast::BinaryOperator::Modulo => Some("%"),
        ast::BinaryOperator::StringConcat => Some("||"),
        _ => None,
    }
}

fn comparison_operator(op: &ast::BinaryOperator) -> Option<Operator> {
    match op {
        ast::BinaryOperator::Eq => Some(Operator::Eq),
        ast::BinaryOperator::NotEq => Some(Operator::Ne),
        ast::BinaryOperator::Gt => Some(Operator::Gt),
        ast::BinaryOperator::Lt => Some(Operator::Lt),
        ast::BinaryOperator::GtEq => Some(Operator::Gte),
        ast::BinaryOperator::LtEq => Some(Operator::Lte),
        ast::BinaryOperator::PGLikeMatch => Some(Operator::Like),
        ast::BinaryOperator::PGNotLikeMatch => Some(Operator::NotLike),
        ast::BinaryOperator::PGILikeMatch => Some(Operator::ILike),
        ast::BinaryOperator::PGNotILikeMatch => Some(Operator::NotILike),
        _ => None,
    }
}

fn contains_bool_op(expr: &ast::Expr) -> bool {
    matches!(
        expr,
        ast::Expr::BinaryOp { op, .. }
            if *op == ast::BinaryOperator::And || *op == ast::BinaryOperator::Or
    )
}

/// Flip the first operator of a freshly-negated condition list.
fn negate_first(conditions: &mut [Condition]) {
    if let Some(first) = conditions.first_mut() {
        if first.is_group() {
            negate_first(&mut first.nested);
        } else {
            first.operator = first.operator.negate();
        }
    }
}

fn transaction_spec(modes: &[ast::TransactionMode]) -> TransactionSpec {
    let mut spec = TransactionSpec::default();
    for mode in modes {
        match mode {
            ast::TransactionMode::IsolationLevel(level) => {
                spec.isolation_level = Some(level.to_string());
            }
            ast::TransactionMode::AccessMode(ast::TransactionAccessMode::ReadOnly) => {
                spec.read_only = Some(true);
            }
            ast::TransactionMode::AccessMode(ast::TransactionAccessMode::ReadWrite) => {
                spec.read_only = Some(false);
            }
        }
    }
    spec
}

fn statement_label(stmt: &ast::Statement) -> String {
    let text = stmt.to_string();
    text.split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}
