//! INSERT builder.

use crate::builder::traits::StatementBuilder;
use crate::builder::{BuiltStatement, StatementKind, TableSource, ValueSource, column_value};
use crate::error::{OrmError, OrmResult};
use crate::model::{FieldValue, Model};
use crate::part::QueryPart;
use crate::registry::{ModelHandle, Registry, TableDef};
use crate::value::{Value, ValueMap};

/// INSERT builder.
///
/// From an instance every column is written except fields the model reports
/// as missing and auto-increment keys that are still unset, so the database
/// assigns them. From a value map exactly the given columns are written.
#[derive(Debug, Clone)]
#[must_use]
pub struct InsertBuilder<'a> {
    table: TableSource<'a>,
    source: ValueSource<'a>,
    build_error: Option<String>,
}

impl<'a> InsertBuilder<'a> {
    fn with_source(table: TableSource<'a>, source: ValueSource<'a>) -> Self {
        Self {
            table,
            source,
            build_error: None,
        }
    }

    pub fn for_model<M: Model>(registry: &'a Registry) -> Self {
        Self::with_source(
            TableSource::for_type::<M>(registry),
            ValueSource::ValueMap(ValueMap::new()),
        )
    }

    pub fn for_instance(registry: &'a Registry, model: &'a dyn Model) -> Self {
        Self::with_source(
            TableSource::for_instance(registry, model),
            ValueSource::Instance(model),
        )
    }

    pub fn from_handle(handle: &ModelHandle) -> Self {
        Self::with_source(
            TableSource::for_handle(handle),
            ValueSource::ValueMap(ValueMap::new()),
        )
    }

    pub fn from_handle_instance(handle: &ModelHandle, model: &'a dyn Model) -> Self {
        Self::with_source(TableSource::for_handle(handle), ValueSource::Instance(model))
    }

    /// Merge column values, key by key. Not allowed on an instance insert.
    pub fn set(mut self, values: impl Into<ValueMap>) -> Self {
        match &mut self.source {
            ValueSource::ValueMap(map) => map.merge(values.into()),
            ValueSource::Instance(model) => {
                if self.build_error.is_none() {
                    self.build_error = Some(format!(
                        "set() cannot be combined with an instance insert of {}",
                        model.model_name()
                    ));
                }
            }
        }
        self
    }

    fn row(&self, table: &TableDef) -> OrmResult<Vec<(String, Value)>> {
        let mut row = Vec::new();
        match &self.source {
            ValueSource::Instance(model) => {
                for column in &table.columns {
                    if matches!(model.field(&column.field), FieldValue::Missing) {
                        continue;
                    }
                    let value = column_value(table, column, *model)?;
                    if column.auto_increment && value.is_null() {
                        continue;
                    }
                    row.push((column.name.clone(), value));
                }
            }
            ValueSource::ValueMap(map) => {
                for (key, value) in map.iter() {
                    if !table.has_column(key) {
                        return Err(OrmError::query(format!(
                            "unknown column '{key}' in insert into table '{}'",
                            table.name
                        )));
                    }
                    row.push((key.to_string(), value.clone()));
                }
            }
        }
        Ok(row)
    }
}

impl StatementBuilder for InsertBuilder<'_> {
    fn build(&self) -> OrmResult<BuiltStatement> {
        if let Some(err) = &self.build_error {
            return Err(OrmError::query(err.clone()));
        }

        let instance = match &self.source {
            ValueSource::Instance(model) => Some(*model),
            ValueSource::ValueMap(_) => None,
        };
        let table = self.table.resolve_for(instance)?;
        let row = self.row(table)?;
        if row.is_empty() {
            return Err(OrmError::query(format!(
                "no values to insert into '{}'",
                table.name
            )));
        }

        let columns: Vec<&str> = row.iter().map(|(c, _)| c.as_str()).collect();
        let mut part = QueryPart::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            table.name,
            columns.join(", ")
        ));
        for (i, (_, value)) in row.into_iter().enumerate() {
            if i > 0 {
                part.push(", ");
            }
            part.push_bind(value);
        }
        part.push(")");

        Ok(BuiltStatement::new(&table.name, StatementKind::Insert, part))
    }
}
