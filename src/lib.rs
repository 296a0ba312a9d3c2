//! # Queryport
//!
//! A multi-dialect database query translator.
//!
//! ## Architecture
//!
//! Every translation pivots through one typed intermediate representation
//! (OQL); no direct source-to-source path exists:
//!
//! ```text
//! ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────┐
//! │ PostgreSQL │ │   MySQL    │ │  MongoDB   │ │   Redis    │
//! │    SQL     │ │    SQL     │ │  command   │ │  command   │
//! └────────────┘ └────────────┘ └────────────┘ └────────────┘
//!        │              │              │              │
//!        ▼ [reverse]    ▼              ▼              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  OQL (typed query tree)                  │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼ [render]
//! ┌─────────────────────────────────────────────────────────┐
//! │            target SQL + parameter vector                 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The core is pure and synchronous: reverse translators are functions from
//! source text to [`oql::Query`], renderers from query to `(sql, params)`.
//! The mapping tables in [`maps`] are built once and frozen.
//!
//! ## Usage
//!
//! ```
//! use queryport::{to_query, translate, Dialect};
//!
//! let query = to_query("SELECT id FROM users WHERE age >= 18", Dialect::PostgreSql)?;
//! let (sql, params) = translate(&query, Dialect::PostgreSql)?;
//! assert_eq!(sql, "SELECT id FROM users WHERE age >= $1");
//! assert_eq!(params, vec!["18".to_string()]);
//! # Ok::<(), queryport::TranslateError>(())
//! ```

pub mod error;
pub mod maps;
pub mod naming;
pub mod oql;
pub mod render;
pub mod reverse;

pub use error::{TranslateError, TranslateResult};
pub use maps::Dialect;
pub use render::translate;
pub use reverse::to_query;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::error::{TranslateError, TranslateResult};
    pub use crate::maps::{Dialect, NamingRule};
    pub use crate::oql::{
        Condition, Expression, Field, Logic, Operation, Operator, Query,
    };
    pub use crate::render::translate;
    pub use crate::reverse::to_query;
}
