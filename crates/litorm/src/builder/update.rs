//! UPDATE builder.

use crate::builder::traits::StatementBuilder;
use crate::builder::{
    BuiltStatement, StatementKind, TableSource, ValueSource, check_filter_keys, column_value,
    identity_group, push_filter, where_part,
};
use crate::clause::{ClauseGroup, IntoConditions};
use crate::error::{OrmError, OrmResult};
use crate::model::Model;
use crate::part::QueryPart;
use crate::registry::{ModelHandle, Registry, TableDef};
use crate::value::ValueMap;

/// Where an UPDATE takes its values from. Decided at construction.
pub type UpdateTarget<'a> = ValueSource<'a>;

/// UPDATE builder.
///
/// With an instance target the SET list covers every column (or the
/// [`only`](UpdateBuilder::only) subset) and the WHERE clause identifies the
/// instance. With a value map target the SET list is the map and the WHERE
/// clause is whatever [`filter`](UpdateBuilder::filter) supplied.
#[derive(Debug, Clone)]
#[must_use]
pub struct UpdateBuilder<'a> {
    table: TableSource<'a>,
    target: UpdateTarget<'a>,
    filter: Option<ClauseGroup>,
    only: Option<Vec<String>>,
    build_error: Option<String>,
}

impl<'a> UpdateBuilder<'a> {
    fn with_source(table: TableSource<'a>, target: UpdateTarget<'a>) -> Self {
        Self {
            table,
            target,
            filter: None,
            only: None,
            build_error: None,
        }
    }

    pub fn for_model<M: Model>(registry: &'a Registry) -> Self {
        Self::with_source(
            TableSource::for_type::<M>(registry),
            UpdateTarget::ValueMap(ValueMap::new()),
        )
    }

    pub fn for_instance(registry: &'a Registry, model: &'a dyn Model) -> Self {
        Self::with_source(
            TableSource::for_instance(registry, model),
            UpdateTarget::Instance(model),
        )
    }

    pub fn from_handle(handle: &ModelHandle) -> Self {
        Self::with_source(
            TableSource::for_handle(handle),
            UpdateTarget::ValueMap(ValueMap::new()),
        )
    }

    pub fn from_handle_instance(handle: &ModelHandle, model: &'a dyn Model) -> Self {
        Self::with_source(TableSource::for_handle(handle), UpdateTarget::Instance(model))
    }

    pub fn target(&self) -> &UpdateTarget<'a> {
        &self.target
    }

    /// Add WHERE conditions (ANDed with earlier ones and with the instance
    /// identity).
    pub fn filter(mut self, item: impl IntoConditions) -> Self {
        push_filter(&mut self.filter, item);
        self
    }

    /// Merge column values into the SET list, key by key.
    ///
    /// Not allowed on an instance update: `build()` reports a query error.
    pub fn set(mut self, values: impl Into<ValueMap>) -> Self {
        match &mut self.target {
            UpdateTarget::ValueMap(map) => map.merge(values.into()),
            UpdateTarget::Instance(model) => {
                if self.build_error.is_none() {
                    self.build_error = Some(format!(
                        "set() cannot be combined with an instance update of {}",
                        model.model_name()
                    ));
                }
            }
        }
        self
    }

    /// Restrict an instance update to the given fields (field or column
    /// names). A name matching no column is a query error at build time.
    pub fn only(mut self, fields: &[&str]) -> Self {
        self.only = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    fn set_part(&self, table: &TableDef) -> OrmResult<QueryPart> {
        let mut assignments = Vec::new();
        match &self.target {
            UpdateTarget::Instance(model) => {
                if let Some(only) = &self.only {
                    if let Some(unknown) = only.iter().find(|f| {
                        !table.columns.iter().any(|c| c.field == **f || c.name == **f)
                    }) {
                        return Err(OrmError::query(format!(
                            "unknown field '{unknown}' in only() for table '{}'",
                            table.name
                        )));
                    }
                }
                for column in &table.columns {
                    if let Some(only) = &self.only {
                        if !only.iter().any(|f| *f == column.field || *f == column.name) {
                            continue;
                        }
                    }
                    let value = column_value(table, column, *model)?;
                    // An unset auto-increment key cannot be written as NULL.
                    if column.auto_increment && value.is_null() {
                        continue;
                    }
                    let mut part = QueryPart::new(format!("{} = ", column.name));
                    part.push_bind(value);
                    assignments.push(part);
                }
            }
            UpdateTarget::ValueMap(map) => {
                for (key, value) in map.iter() {
                    if !table.has_column(key) {
                        return Err(OrmError::query(format!(
                            "unknown column '{key}' in update of table '{}'",
                            table.name
                        )));
                    }
                    let mut part = QueryPart::new(format!("{key} = "));
                    part.push_bind(value.clone());
                    assignments.push(part);
                }
            }
        }

        if assignments.is_empty() {
            return Err(OrmError::query("no values to update"));
        }
        Ok(QueryPart::join(assignments, ", "))
    }
}

impl StatementBuilder for UpdateBuilder<'_> {
    fn build(&self) -> OrmResult<BuiltStatement> {
        if let Some(err) = &self.build_error {
            return Err(OrmError::query(err.clone()));
        }

        let instance = match &self.target {
            UpdateTarget::Instance(model) => Some(*model),
            UpdateTarget::ValueMap(_) => None,
        };
        let table = self.table.resolve_for(instance)?;
        check_filter_keys(table, self.filter.as_ref())?;

        let identity = match instance {
            Some(model) => identity_group(table, model)?,
            None => ClauseGroup::and(),
        };
        if let Some(model) = instance {
            let has_filter = self.filter.as_ref().is_some_and(|f| !f.is_empty());
            if identity.is_empty() && !has_filter {
                return Err(OrmError::query(format!(
                    "{} has no row identifier or primary key value to update by",
                    model.model_name()
                )));
            }
        }

        let mut part = QueryPart::new(format!("UPDATE {} SET ", table.name));
        part.append(self.set_part(table)?);
        part.append(where_part(identity, self.filter.as_ref()));

        Ok(BuiltStatement::new(&table.name, StatementKind::Update, part))
    }
}
