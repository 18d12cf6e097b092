//! Statement builders.
//!
//! Each builder resolves its table layout (from the [`Registry`] or a
//! [`ModelHandle`]), renders its clauses into [`QueryPart`]s and returns a
//! [`BuiltStatement`]: the final SQL with `?` placeholders plus the ordered
//! parameter list. `build()` is synchronous, takes `&self` and can be called
//! repeatedly with identical results.
//!
//! Builders are consumed by their chaining methods:
//!
//! ```ignore
//! let stmt = registry
//!     .update::<Todo>()
//!     .set([("status", "done")])
//!     .filter([("id", 5)])
//!     .build()?;
//! assert_eq!(stmt.sql(), "UPDATE todos SET status = (?) WHERE id = (?)");
//! ```

mod create;
mod delete;
mod insert;
mod select;
mod traits;
mod update;

#[cfg(test)]
mod tests;

pub use create::CreateBuilder;
pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use select::{Order, SelectBuilder};
pub use traits::StatementBuilder;
pub use update::{UpdateBuilder, UpdateTarget};

use std::any::TypeId;
use std::sync::Arc;

use crate::clause::{Clause, ClauseGroup};
use crate::error::{OrmError, OrmResult};
use crate::model::{FieldValue, Model};
use crate::part::QueryPart;
use crate::registry::{ColumnDef, ModelHandle, Registry, TableDef};
use crate::value::{Value, ValueMap};

/// Name of the storage-assigned row identifier column.
pub const ROW_ID: &str = "rowid";

/// Statement kind of a [`BuiltStatement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Create,
    Insert,
    Select,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Create => "CREATE",
            StatementKind::Insert => "INSERT",
            StatementKind::Select => "SELECT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }

    /// Whether the statement produces rows.
    pub fn returns_rows(&self) -> bool {
        matches!(self, StatementKind::Select)
    }
}

/// Final SQL and parameters, ready for a [`Gateway`](crate::gateway::Gateway).
///
/// Only builders construct these, so every value reaching the gateway has
/// passed through parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStatement {
    table: String,
    kind: StatementKind,
    sql: String,
    params: Vec<Value>,
}

impl BuiltStatement {
    pub(crate) fn new(table: &str, kind: StatementKind, part: QueryPart) -> Self {
        let (sql, params) = part.into_parts();
        tracing::trace!(
            target: "litorm.sql",
            kind = kind.as_str(),
            table,
            params = params.len(),
            sql = %sql,
            "built statement"
        );
        Self {
            table: table.to_string(),
            kind,
            sql,
            params,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_sql(self) -> String {
        self.sql
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

/// Where an INSERT or UPDATE takes its column values from.
pub enum ValueSource<'a> {
    /// Every column is read from a live instance.
    Instance(&'a dyn Model),
    /// Explicit column values accumulated with `set`.
    ValueMap(ValueMap),
}

impl Clone for ValueSource<'_> {
    fn clone(&self) -> Self {
        match self {
            ValueSource::Instance(m) => ValueSource::Instance(*m),
            ValueSource::ValueMap(v) => ValueSource::ValueMap(v.clone()),
        }
    }
}

impl std::fmt::Debug for ValueSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Instance(m) => f.debug_tuple("Instance").field(&m.model_name()).finish(),
            ValueSource::ValueMap(v) => f.debug_tuple("ValueMap").field(v).finish(),
        }
    }
}

/// Where a builder gets its table layout from.
#[derive(Debug, Clone)]
pub(crate) enum TableSource<'a> {
    Borrowed(&'a TableDef),
    Shared {
        table: Arc<TableDef>,
        type_id: TypeId,
        model_name: &'static str,
    },
    Lookup {
        registry: &'a Registry,
        type_id: TypeId,
        model_name: &'static str,
    },
}

impl<'a> TableSource<'a> {
    pub(crate) fn for_type<M: Model>(registry: &'a Registry) -> Self {
        TableSource::Lookup {
            registry,
            type_id: TypeId::of::<M>(),
            model_name: std::any::type_name::<M>(),
        }
    }

    pub(crate) fn for_instance(registry: &'a Registry, model: &dyn Model) -> Self {
        TableSource::Lookup {
            registry,
            type_id: model.model_type(),
            model_name: model.model_name(),
        }
    }

    pub(crate) fn for_handle(handle: &ModelHandle) -> Self {
        TableSource::Shared {
            table: handle.table_arc(),
            type_id: handle.model_type(),
            model_name: handle.model_name(),
        }
    }

    pub(crate) fn resolve(&self) -> OrmResult<&TableDef> {
        match self {
            TableSource::Borrowed(table) => Ok(table),
            TableSource::Shared { table, .. } => Ok(table),
            TableSource::Lookup {
                registry,
                type_id,
                model_name,
            } => registry.lookup(*type_id, model_name),
        }
    }

    /// Resolve, checking that an attached instance belongs to this table.
    pub(crate) fn resolve_for(&self, model: Option<&dyn Model>) -> OrmResult<&TableDef> {
        if let (Some(model), TableSource::Shared { type_id, model_name, .. }) = (model, self) {
            if model.model_type() != *type_id {
                return Err(OrmError::configuration(format!(
                    "instance of {} used with the handle of {model_name}",
                    model.model_name()
                )));
            }
        }
        self.resolve()
    }
}

/// Append a condition to a lazily allocated filter group.
pub(crate) fn push_filter(
    filter: &mut Option<ClauseGroup>,
    item: impl crate::clause::IntoConditions,
) {
    filter.get_or_insert_with(ClauseGroup::and).push(item);
}

/// Bindable value of one column on a live instance.
///
/// A related model is flattened through the column's declared foreign key.
pub(crate) fn column_value(
    table: &TableDef,
    column: &ColumnDef,
    model: &dyn Model,
) -> OrmResult<Value> {
    match model.field(&column.field) {
        FieldValue::Value(v) => Ok(v),
        FieldValue::Missing => Ok(Value::Null),
        FieldValue::Related(related) => {
            let Some(fk) = &column.references else {
                return Err(OrmError::query(format!(
                    "field '{}' of {} holds a related model but column '{}.{}' declares no foreign key",
                    column.field,
                    model.model_name(),
                    table.name,
                    column.name
                )));
            };
            match related.field(&fk.field) {
                FieldValue::Value(v) => Ok(v),
                FieldValue::Missing => Ok(Value::Null),
                FieldValue::Related(_) => Err(OrmError::query(format!(
                    "foreign key field '{}' of {} is itself a relation",
                    fk.field,
                    related.model_name()
                ))),
            }
        }
    }
}

/// Identity clauses for a live instance.
///
/// A known row identifier is used on its own. Otherwise one equality per
/// primary-key column in column order; if any key value is unset the
/// instance has no identity and an empty group is returned.
pub(crate) fn identity_group(table: &TableDef, model: &dyn Model) -> OrmResult<ClauseGroup> {
    if let Some(id) = model.row_id() {
        return Ok(ClauseGroup::and().add(Clause::eq(ROW_ID, id)));
    }

    let mut group = ClauseGroup::and();
    for column in table.primary_keys() {
        let value = column_value(table, column, model)?;
        if value.is_null() {
            return Ok(ClauseGroup::and());
        }
        group.push(Clause::eq(column.name.as_str(), value));
    }
    Ok(group)
}

/// Reject filter keys that are not columns of the table.
pub(crate) fn check_filter_keys(table: &TableDef, filter: Option<&ClauseGroup>) -> OrmResult<()> {
    let Some(filter) = filter else {
        return Ok(());
    };
    for key in filter.keys() {
        if key != ROW_ID && !table.has_column(key) {
            return Err(OrmError::query(format!(
                "unknown column '{key}' in filter on table '{}'",
                table.name
            )));
        }
    }
    Ok(())
}

/// Render ` WHERE ...` for the combined identity and user filter, or an empty
/// part when neither contributes anything.
pub(crate) fn where_part(identity: ClauseGroup, filter: Option<&ClauseGroup>) -> QueryPart {
    let group = match filter {
        Some(filter) => identity.merge(filter.clone()),
        None => identity,
    };
    let rendered = group.render();
    if rendered.is_empty() {
        return rendered;
    }
    let mut part = QueryPart::new(" WHERE ");
    part.append(rendered);
    part
}

impl Registry {
    /// `CREATE TABLE` builder for model type `M`.
    pub fn create<M: Model>(&self) -> CreateBuilder<'_> {
        CreateBuilder::for_model::<M>(self)
    }

    /// `SELECT` builder for model type `M`.
    pub fn select<M: Model>(&self) -> SelectBuilder<'_> {
        SelectBuilder::for_model::<M>(self)
    }

    /// `SELECT` builder identifying one live instance.
    pub fn select_instance<'a>(&'a self, model: &'a dyn Model) -> SelectBuilder<'a> {
        SelectBuilder::for_instance(self, model)
    }

    /// `INSERT` builder fed from a value map.
    pub fn insert<M: Model>(&self) -> InsertBuilder<'_> {
        InsertBuilder::for_model::<M>(self)
    }

    /// `INSERT` builder fed from a live instance.
    pub fn insert_instance<'a>(&'a self, model: &'a dyn Model) -> InsertBuilder<'a> {
        InsertBuilder::for_instance(self, model)
    }

    /// `UPDATE` builder fed from a value map.
    pub fn update<M: Model>(&self) -> UpdateBuilder<'_> {
        UpdateBuilder::for_model::<M>(self)
    }

    /// `UPDATE` builder fed from a live instance.
    pub fn update_instance<'a>(&'a self, model: &'a dyn Model) -> UpdateBuilder<'a> {
        UpdateBuilder::for_instance(self, model)
    }

    /// `DELETE` builder for model type `M`.
    pub fn delete<M: Model>(&self) -> DeleteBuilder<'_> {
        DeleteBuilder::for_model::<M>(self)
    }

    /// `DELETE` builder identifying one live instance.
    pub fn delete_instance<'a>(&'a self, model: &'a dyn Model) -> DeleteBuilder<'a> {
        DeleteBuilder::for_instance(self, model)
    }
}

impl ModelHandle {
    pub fn create(&self) -> CreateBuilder<'static> {
        CreateBuilder::from_handle(self)
    }

    pub fn select(&self) -> SelectBuilder<'static> {
        SelectBuilder::from_handle(self)
    }

    pub fn select_instance<'a>(&self, model: &'a dyn Model) -> SelectBuilder<'a> {
        SelectBuilder::from_handle(self).instance(model)
    }

    pub fn insert(&self) -> InsertBuilder<'static> {
        InsertBuilder::from_handle(self)
    }

    pub fn insert_instance<'a>(&self, model: &'a dyn Model) -> InsertBuilder<'a> {
        InsertBuilder::from_handle_instance(self, model)
    }

    pub fn update(&self) -> UpdateBuilder<'static> {
        UpdateBuilder::from_handle(self)
    }

    pub fn update_instance<'a>(&self, model: &'a dyn Model) -> UpdateBuilder<'a> {
        UpdateBuilder::from_handle_instance(self, model)
    }

    pub fn delete(&self) -> DeleteBuilder<'static> {
        DeleteBuilder::from_handle(self)
    }

    pub fn delete_instance<'a>(&self, model: &'a dyn Model) -> DeleteBuilder<'a> {
        DeleteBuilder::from_handle(self).instance(model)
    }
}
