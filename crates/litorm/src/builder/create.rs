//! CREATE TABLE builder.

use crate::builder::traits::StatementBuilder;
use crate::builder::{BuiltStatement, StatementKind, TableSource};
use crate::error::OrmResult;
use crate::model::Model;
use crate::part::QueryPart;
use crate::registry::{ColumnDef, ModelHandle, Registry, SqlType, TableDef};

/// Builds `CREATE TABLE IF NOT EXISTS` for one table.
#[derive(Debug, Clone)]
#[must_use]
pub struct CreateBuilder<'a> {
    table: TableSource<'a>,
}

impl<'a> CreateBuilder<'a> {
    pub fn new(table: &'a TableDef) -> Self {
        Self {
            table: TableSource::Borrowed(table),
        }
    }

    pub fn for_model<M: Model>(registry: &'a Registry) -> Self {
        Self {
            table: TableSource::for_type::<M>(registry),
        }
    }

    pub fn from_handle(handle: &ModelHandle) -> Self {
        Self {
            table: TableSource::for_handle(handle),
        }
    }
}

fn column_sql(col: &ColumnDef) -> String {
    // AUTOINCREMENT is only accepted on an INTEGER PRIMARY KEY.
    let sql_type = if col.auto_increment {
        SqlType::Integer
    } else {
        col.sql_type
    };

    let mut sql = format!("{} {}", col.name, sql_type.as_sql());
    if col.primary_key {
        sql.push_str(" PRIMARY KEY");
    }
    if col.auto_increment {
        sql.push_str(" AUTOINCREMENT");
    }
    if col.not_null {
        sql.push_str(" NOT NULL");
    }
    if col.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(fk) = &col.references {
        sql.push_str(&format!(" REFERENCES {}({})", fk.table, fk.column));
    }
    sql
}

impl StatementBuilder for CreateBuilder<'_> {
    fn build(&self) -> OrmResult<BuiltStatement> {
        let table = self.table.resolve()?;
        // Registered tables were validated on registration.
        if matches!(self.table, TableSource::Borrowed(_)) {
            table.validate()?;
        }

        let pks: Vec<&str> = table.primary_keys().map(|c| c.name.as_str()).collect();
        let mut columns: Vec<String> = table
            .columns
            .iter()
            .map(|col| {
                if pks.len() > 1 {
                    // Composite keys are declared as a table constraint.
                    let mut col = col.clone();
                    col.primary_key = false;
                    column_sql(&col)
                } else {
                    column_sql(col)
                }
            })
            .collect();
        if pks.len() > 1 {
            columns.push(format!("PRIMARY KEY ({})", pks.join(", ")));
        }

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table.name,
            columns.join(",")
        );
        Ok(BuiltStatement::new(
            &table.name,
            StatementKind::Create,
            QueryPart::new(sql),
        ))
    }
}
