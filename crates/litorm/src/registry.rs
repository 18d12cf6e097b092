//! Table and column metadata.
//!
//! Models are registered once at startup with an explicit [`TableDef`]. The
//! registry is then shared read-only (typically as `Arc<Registry>`) and every
//! builder resolves its column layout from it.
//!
//! ```ignore
//! let mut registry = Registry::new();
//! let todos = registry.register::<Todo>(
//!     TableDef::new("todos")
//!         .column(ColumnDef::new("id", SqlType::Integer).primary_key().auto_increment())
//!         .column(ColumnDef::new("label", SqlType::Text).not_null()),
//! )?;
//! let sql = todos.create().to_sql()?;
//! ```

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::builder::{BuiltStatement, CreateBuilder, StatementBuilder};
use crate::error::{OrmError, OrmResult};
use crate::ident::validate_ident;
use crate::model::Model;

/// Declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
    Boolean,
    DateTime,
    Json,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Numeric => "NUMERIC",
            SqlType::Boolean => "BOOLEAN",
            SqlType::DateTime => "DATETIME",
            SqlType::Json => "JSON",
        }
    }
}

/// A column referencing another table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
    /// Field read from a related model instance when flattening. Defaults to
    /// `column`.
    pub field: String,
}

/// Column descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Persisted column name.
    pub name: String,
    /// Model field the value is read from.
    pub field: String,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub not_null: bool,
    pub unique: bool,
    pub references: Option<ForeignKey>,
}

impl ColumnDef {
    /// Create a column whose model field has the same name.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            sql_type,
            primary_key: false,
            auto_increment: false,
            not_null: false,
            unique: false,
            references: None,
        }
    }

    /// Read values from a differently named model field.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declare a foreign key to `table(column)`.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        let column = column.into();
        self.references = Some(ForeignKey {
            table: table.into(),
            field: column.clone(),
            column,
        });
        self
    }

    /// Field read from the related model when it differs from the referenced
    /// column name. Has no effect without [`ColumnDef::references`].
    pub fn references_field(mut self, field: impl Into<String>) -> Self {
        if let Some(fk) = self.references.as_mut() {
            fk.field = field.into();
        }
        self
    }
}

/// Table descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Append a column.
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_by_field(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Primary-key columns in declaration order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Check the descriptor invariants.
    pub fn validate(&self) -> OrmResult<()> {
        validate_ident(&self.name)?;
        if self.columns.is_empty() {
            return Err(OrmError::configuration(format!(
                "table '{}' declares no columns",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            validate_ident(&col.name)?;
            if !seen.insert(col.name.as_str()) {
                return Err(OrmError::configuration(format!(
                    "duplicate column '{}' in table '{}'",
                    col.name, self.name
                )));
            }
            if col.auto_increment && !col.primary_key {
                return Err(OrmError::configuration(format!(
                    "column '{}.{}' is auto-increment but not a primary key",
                    self.name, col.name
                )));
            }
            if let Some(fk) = &col.references {
                validate_ident(&fk.table)?;
                validate_ident(&fk.column)?;
            }
        }

        let auto = self.columns.iter().filter(|c| c.auto_increment).count();
        let pks = self.primary_keys().count();
        if auto > 0 && pks > 1 {
            return Err(OrmError::configuration(format!(
                "table '{}' combines auto-increment with a composite primary key",
                self.name
            )));
        }

        Ok(())
    }
}

/// Handle returned by [`Registry::register`].
///
/// Builders created from a handle carry the table metadata with them and do
/// not need the registry again.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    table: Arc<TableDef>,
    type_id: TypeId,
    model_name: &'static str,
}

impl ModelHandle {
    pub fn table(&self) -> &TableDef {
        &self.table
    }

    pub fn table_arc(&self) -> Arc<TableDef> {
        Arc::clone(&self.table)
    }

    pub fn model_type(&self) -> TypeId {
        self.type_id
    }

    pub fn model_name(&self) -> &'static str {
        self.model_name
    }
}

struct Entry {
    model_name: &'static str,
    table: Arc<TableDef>,
}

/// Registry of model types and their tables.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
    by_type: HashMap<TypeId, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the table layout for model type `M`.
    ///
    /// Registering the same type twice is allowed only with an identical
    /// descriptor.
    pub fn register<M: Model>(&mut self, table: TableDef) -> OrmResult<ModelHandle> {
        let type_id = TypeId::of::<M>();
        let model_name = std::any::type_name::<M>();

        if let Some(&idx) = self.by_type.get(&type_id) {
            let entry = &self.entries[idx];
            if *entry.table != table {
                return Err(OrmError::configuration(format!(
                    "model {model_name} is already registered with a different table layout ('{}')",
                    entry.table.name
                )));
            }
            return Ok(ModelHandle {
                table: Arc::clone(&entry.table),
                type_id,
                model_name,
            });
        }

        table.validate()?;
        tracing::debug!(
            target: "litorm.registry",
            model = model_name,
            table = %table.name,
            columns = table.columns.len(),
            "registered model"
        );

        let table = Arc::new(table);
        self.by_type.insert(type_id, self.entries.len());
        self.entries.push(Entry {
            model_name,
            table: Arc::clone(&table),
        });

        Ok(ModelHandle {
            table,
            type_id,
            model_name,
        })
    }

    /// Table layout of model type `M`.
    pub fn resolve<M: Model>(&self) -> OrmResult<Arc<TableDef>> {
        self.resolve_type(TypeId::of::<M>(), std::any::type_name::<M>())
    }

    /// Table layout by type id; `name` is only used in the error message.
    pub fn resolve_type(&self, type_id: TypeId, name: &str) -> OrmResult<Arc<TableDef>> {
        self.entry(type_id, name).map(|e| Arc::clone(&e.table))
    }

    /// Table layout of a live instance's concrete type.
    pub fn resolve_instance(&self, model: &dyn Model) -> OrmResult<Arc<TableDef>> {
        self.resolve_type(model.model_type(), model.model_name())
    }

    /// Handle for an already registered model type.
    pub fn handle<M: Model>(&self) -> OrmResult<ModelHandle> {
        Ok(ModelHandle {
            table: self.resolve::<M>()?,
            type_id: TypeId::of::<M>(),
            model_name: std::any::type_name::<M>(),
        })
    }

    pub(crate) fn lookup(&self, type_id: TypeId, name: &str) -> OrmResult<&TableDef> {
        self.entry(type_id, name).map(|e| &*e.table)
    }

    fn entry(&self, type_id: TypeId, name: &str) -> OrmResult<&Entry> {
        self.by_type
            .get(&type_id)
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| OrmError::configuration(format!("unknown model {name}")))
    }

    /// Find a registered table by its SQL name.
    pub fn find_table(&self, name: &str) -> Option<&TableDef> {
        self.entries
            .iter()
            .map(|e| &*e.table)
            .find(|t| t.name == name)
    }

    /// Registered tables in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.entries.iter().map(|e| &*e.table)
    }

    /// Registered model names in registration order.
    pub fn model_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.model_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `CREATE TABLE IF NOT EXISTS` statements for every registered table, in
    /// registration order.
    pub fn create_statements(&self) -> OrmResult<Vec<BuiltStatement>> {
        self.tables().map(|t| CreateBuilder::new(t).build()).collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (e.model_name, &e.table.name)))
            .finish()
    }
}
