//! Reverse translation: lifting each source dialect into OQL.
//!
//! Every translator is a pure function from source text to [`Query`]. The
//! SQL dialects share one statement lifter over the `sqlparser` AST; MongoDB
//! walks a `serde_json` tree; Redis tokenizes its command line by hand.

pub mod mongodb;
pub mod mysql;
pub mod postgres;
pub mod redis;

mod sql;

use crate::error::{TranslateError, TranslateResult};
use crate::maps::Dialect;
use crate::oql::Query;

/// Lift source text written in the given dialect into OQL.
pub fn to_query(source: &str, dialect: Dialect) -> TranslateResult<Query> {
    if source.trim().is_empty() {
        return Err(TranslateError::EmptyQuery);
    }
    match dialect {
        Dialect::PostgreSql => postgres::to_query(source),
        Dialect::MySql => mysql::to_query(source),
        Dialect::MongoDb => mongodb::to_query(source),
        Dialect::Redis => redis::to_query(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_empty_query() {
        for dialect in Dialect::ALL {
            assert_eq!(to_query("   ", dialect), Err(TranslateError::EmptyQuery));
            assert_eq!(to_query("", dialect), Err(TranslateError::EmptyQuery));
        }
    }
}
