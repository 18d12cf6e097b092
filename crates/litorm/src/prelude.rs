//! Convenient imports for typical `litorm` usage.
//!
//! ```ignore
//! use litorm::prelude::*;
//! ```

pub use crate::{
    Clause, ClauseGroup, ColumnDef, CompositeClause, FieldValue, FromRow, Gateway, Model,
    ModelHandle, Order, OrmError, OrmResult, Registry, Row, SqlType, SqliteGateway,
    StatementBuilder, TableDef, Value, ValueMap,
};
