//! DELETE builder.

use crate::builder::traits::StatementBuilder;
use crate::builder::{
    BuiltStatement, StatementKind, TableSource, check_filter_keys, identity_group, push_filter,
    where_part,
};
use crate::clause::{ClauseGroup, IntoConditions};
use crate::error::{OrmError, OrmResult};
use crate::model::Model;
use crate::part::QueryPart;
use crate::registry::{ModelHandle, Registry};

/// DELETE builder.
#[derive(Clone)]
#[must_use]
pub struct DeleteBuilder<'a> {
    table: TableSource<'a>,
    instance: Option<&'a dyn Model>,
    filter: Option<ClauseGroup>,
    /// Whether to allow DELETE without WHERE
    allow_delete_all: bool,
}

impl<'a> DeleteBuilder<'a> {
    fn with_source(table: TableSource<'a>) -> Self {
        Self {
            table,
            instance: None,
            filter: None,
            allow_delete_all: false,
        }
    }

    pub fn for_model<M: Model>(registry: &'a Registry) -> Self {
        Self::with_source(TableSource::for_type::<M>(registry))
    }

    pub fn for_instance(registry: &'a Registry, model: &'a dyn Model) -> Self {
        Self::with_source(TableSource::for_instance(registry, model)).instance(model)
    }

    pub fn from_handle(handle: &ModelHandle) -> Self {
        Self::with_source(TableSource::for_handle(handle))
    }

    /// Delete the row identified by `model`.
    pub fn instance(mut self, model: &'a dyn Model) -> Self {
        self.instance = Some(model);
        self
    }

    /// Add WHERE conditions (ANDed with earlier ones).
    pub fn filter(mut self, item: impl IntoConditions) -> Self {
        push_filter(&mut self.filter, item);
        self
    }

    /// Allow DELETE without WHERE conditions.
    ///
    /// By default `build()` refuses to emit an unconditional DELETE.
    pub fn allow_delete_all(mut self, allow: bool) -> Self {
        self.allow_delete_all = allow;
        self
    }
}

impl StatementBuilder for DeleteBuilder<'_> {
    fn build(&self) -> OrmResult<BuiltStatement> {
        let table = self.table.resolve_for(self.instance)?;
        check_filter_keys(table, self.filter.as_ref())?;

        let identity = match self.instance {
            Some(model) => {
                let identity = identity_group(table, model)?;
                if identity.is_empty() {
                    return Err(OrmError::query(format!(
                        "{} has no row identifier or primary key value to delete by",
                        model.model_name()
                    )));
                }
                identity
            }
            None => ClauseGroup::and(),
        };

        let where_sql = where_part(identity, self.filter.as_ref());
        if where_sql.is_empty() && !self.allow_delete_all {
            return Err(OrmError::query(format!(
                "refusing to delete all rows from '{}' without allow_delete_all(true)",
                table.name
            )));
        }

        let mut part = QueryPart::new(format!("DELETE FROM {}", table.name));
        part.append(where_sql);
        Ok(BuiltStatement::new(&table.name, StatementKind::Delete, part))
    }
}

impl std::fmt::Debug for DeleteBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteBuilder")
            .field("table", &self.table)
            .field("instance", &self.instance.map(|m| m.model_name()))
            .field("filter", &self.filter)
            .field("allow_delete_all", &self.allow_delete_all)
            .finish()
    }
}
