//! # litorm
//!
//! A small model-registry-first ORM for SQLite.
//!
//! ## Features
//!
//! - **Explicit metadata**: models are registered once at startup with a [`TableDef`]
//! - **Composable conditions**: [`Clause`], [`ClauseGroup`] and [`CompositeClause`] nest to
//!   any depth with correct parenthesization
//! - **Parameter-safe**: every value is bound as a `?` placeholder, in order
//! - **Two input shapes**: statements built from a live [`Model`] instance or from a [`ValueMap`]
//! - **Safe defaults**: DELETE requires WHERE, UPDATE requires SET values
//! - **Async execution**: a [`Gateway`] runs [`BuiltStatement`]s; [`SqliteGateway`] serializes
//!   them on one connection
//!
//! ## Example
//!
//! ```ignore
//! use litorm::prelude::*;
//!
//! let mut registry = Registry::new();
//! let todos = registry.register::<Todo>(
//!     TableDef::new("todos")
//!         .column(ColumnDef::new("id", SqlType::Integer).primary_key().auto_increment())
//!         .column(ColumnDef::new("label", SqlType::Text).not_null())
//!         .column(ColumnDef::new("status", SqlType::Text)),
//! )?;
//!
//! let db = SqliteGateway::open_in_memory()?;
//! todos.create().execute(&db).await?;
//!
//! todos.insert().set([("label", "milk"), ("status", "open")]).execute(&db).await?;
//!
//! todos
//!     .update()
//!     .set([("status", "done")])
//!     .filter(Clause::eq("label", "milk"))
//!     .execute(&db)
//!     .await?;
//!
//! let open: Vec<Todo> = todos
//!     .select()
//!     .filter(ClauseGroup::or().add(Clause::eq("status", "open")).add(Clause::is_null("status")))
//!     .order_by_desc("id")
//!     .fetch_all(&db)
//!     .await?;
//! ```

pub mod builder;
pub mod clause;
pub mod error;
pub mod gateway;
pub mod ident;
pub mod model;
pub mod part;
pub mod prelude;
pub mod registry;
pub mod row;
pub mod value;

pub use builder::{
    BuiltStatement, CreateBuilder, DeleteBuilder, InsertBuilder, Order, ROW_ID, SelectBuilder,
    StatementBuilder, StatementKind, UpdateBuilder, UpdateTarget, ValueSource,
};
pub use clause::{Clause, ClauseGroup, CompositeClause, Condition, IntoConditions, Logic, Operator};
pub use error::{OrmError, OrmResult};
pub use gateway::{ExecResult, FromRowStream, Gateway, GatewayConfig, RowStream, SqliteGateway};
pub use model::{FieldValue, Model};
pub use part::QueryPart;
pub use registry::{ColumnDef, ForeignKey, ModelHandle, Registry, SqlType, TableDef};
pub use row::{FromRow, FromValue, Row};
pub use value::{Value, ValueMap};
