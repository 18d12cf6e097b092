//! SELECT builder.

use crate::builder::traits::StatementBuilder;
use crate::builder::{
    BuiltStatement, ROW_ID, StatementKind, TableSource, check_filter_keys, identity_group,
    push_filter, where_part,
};
use crate::clause::{ClauseGroup, IntoConditions};
use crate::error::{OrmError, OrmResult};
use crate::model::Model;
use crate::part::QueryPart;
use crate::registry::{ModelHandle, Registry, TableDef};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// SELECT builder.
#[derive(Clone)]
#[must_use]
pub struct SelectBuilder<'a> {
    table: TableSource<'a>,
    instance: Option<&'a dyn Model>,
    filter: Option<ClauseGroup>,
    columns: Option<Vec<String>>,
    with_row_id: bool,
    order: Vec<(String, Order)>,
    limit: Option<i64>,
    offset: Option<i64>,
    count: bool,
}

impl<'a> SelectBuilder<'a> {
    fn with_source(table: TableSource<'a>) -> Self {
        Self {
            table,
            instance: None,
            filter: None,
            columns: None,
            with_row_id: false,
            order: Vec::new(),
            limit: None,
            offset: None,
            count: false,
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

    /// Restrict the result to the row identified by `model`.
    pub fn instance(mut self, model: &'a dyn Model) -> Self {
        self.instance = Some(model);
        self
    }

    /// Add WHERE conditions (ANDed with earlier ones).
    pub fn filter(mut self, item: impl IntoConditions) -> Self {
        push_filter(&mut self.filter, item);
        self
    }

    /// Project an explicit column subset instead of every declared column.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = Some(cols.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Prepend the row identifier to the projection.
    pub fn with_row_id(mut self) -> Self {
        self.with_row_id = true;
        self
    }

    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, Order::Desc)
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Pagination helper.
    ///
    /// `page` is 1-based (clamped to >= 1).
    /// `per_page` is clamped to >= 1.
    pub fn paginate(mut self, page: i64, per_page: i64) -> Self {
        let p = page.max(1);
        let size = per_page.max(1);
        self.limit = Some(size);
        self.offset = Some((p - 1) * size);
        self
    }

    /// Build `SELECT COUNT(*)` instead of a row projection. Ordering and
    /// pagination are ignored.
    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    fn check_column(table: &TableDef, column: &str) -> OrmResult<()> {
        if column == ROW_ID || table.has_column(column) {
            Ok(())
        } else {
            Err(OrmError::query(format!(
                "unknown column '{column}' on table '{}'",
                table.name
            )))
        }
    }

    fn projection(&self, table: &TableDef) -> OrmResult<String> {
        if self.count {
            return Ok("COUNT(*)".to_string());
        }

        // Aliased so the result column keeps its name on tables whose INTEGER
        // PRIMARY KEY shadows `rowid`.
        let row_id = format!("{ROW_ID} AS {ROW_ID}");
        let mut cols: Vec<&str> = Vec::new();
        if self.with_row_id {
            cols.push(&row_id);
        }
        match &self.columns {
            Some(explicit) => {
                for col in explicit {
                    Self::check_column(table, col)?;
                    if col == ROW_ID && !table.has_column(ROW_ID) {
                        cols.push(&row_id);
                    } else {
                        cols.push(col);
                    }
                }
            }
            None => cols.extend(table.columns.iter().map(|c| c.name.as_str())),
        }
        if cols.is_empty() {
            return Err(OrmError::query("empty projection"));
        }
        Ok(cols.join(", "))
    }
}

impl StatementBuilder for SelectBuilder<'_> {
    fn build(&self) -> OrmResult<BuiltStatement> {
        let table = self.table.resolve_for(self.instance)?;
        check_filter_keys(table, self.filter.as_ref())?;

        let identity = match self.instance {
            Some(model) => {
                let identity = identity_group(table, model)?;
                if identity.is_empty() {
                    return Err(OrmError::query(format!(
                        "{} has no row identifier or primary key value to select by",
                        model.model_name()
                    )));
                }
                identity
            }
            None => ClauseGroup::and(),
        };

        let mut part = QueryPart::new(format!(
            "SELECT {} FROM {}",
            self.projection(table)?,
            table.name
        ));
        part.append(where_part(identity, self.filter.as_ref()));

        if !self.count {
            if !self.order.is_empty() {
                let mut terms = Vec::with_capacity(self.order.len());
                for (col, order) in &self.order {
                    Self::check_column(table, col)?;
                    terms.push(format!("{col} {}", order.as_sql()));
                }
                part.push(" ORDER BY ").push(&terms.join(", "));
            }
            match (self.limit, self.offset) {
                (Some(limit), Some(offset)) => {
                    part.push(&format!(" LIMIT {limit} OFFSET {offset}"));
                }
                (Some(limit), None) => {
                    part.push(&format!(" LIMIT {limit}"));
                }
                // OFFSET requires a LIMIT clause; -1 means no limit.
                (None, Some(offset)) => {
                    part.push(&format!(" LIMIT -1 OFFSET {offset}"));
                }
                (None, None) => {}
            }
        }

        Ok(BuiltStatement::new(&table.name, StatementKind::Select, part))
    }
}

impl std::fmt::Debug for SelectBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectBuilder")
            .field("table", &self.table)
            .field("instance", &self.instance.map(|m| m.model_name()))
            .field("filter", &self.filter)
            .field("columns", &self.columns)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("count", &self.count)
            .finish()
    }
}
