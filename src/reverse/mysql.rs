//! MySQL reverse translation.
//!
//! Symmetric to the PostgreSQL translator through the shared lifter. The
//! MySQL-only shapes - `REPLACE INTO`, `ON DUPLICATE KEY UPDATE`, isolation
//! levels set through the `transaction_isolation` session variable - are all
//! handled inside the lifter; this module owns parsing and the user-statement
//! fallback.

use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use crate::error::{TranslateError, TranslateResult};
use crate::maps::Dialect;
use crate::oql::Query;

use super::sql::SqlLifter;

/// Lift MySQL SQL into OQL.
pub fn to_query(source: &str) -> TranslateResult<Query> {
    if let Some(query) = super::postgres::lift_utility(source) {
        return Ok(query);
    }

    let statements = Parser::parse_sql(&MySqlDialect {}, source)
        .map_err(|e| TranslateError::ParseError(e.to_string()))?;
    let statement = statements
        .first()
        .ok_or_else(|| TranslateError::EmptyQuery)?;
    SqlLifter::new(Dialect::MySql).lift_statement(statement)
}
