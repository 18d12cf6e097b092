//! Live model instances.
//!
//! A [`Model`] exposes its current field values by name. Builders read those
//! values when a statement targets an instance rather than a bare value map.
//!
//! ```ignore
//! struct Todo { id: Option<i64>, label: String }
//!
//! impl Model for Todo {
//!     fn field(&self, name: &str) -> FieldValue<'_> {
//!         match name {
//!             "id" => FieldValue::value(self.id),
//!             "label" => FieldValue::value(self.label.as_str()),
//!             _ => FieldValue::Missing,
//!         }
//!     }
//! }
//! ```

use std::any::TypeId;
use std::fmt;

use crate::value::Value;

/// The value a model holds for one field.
pub enum FieldValue<'a> {
    /// A plain scalar.
    Value(Value),
    /// Another mapped model (the field is a relation). Flattened through the
    /// column's declared foreign key when bound.
    Related(&'a dyn Model),
    /// The model has no such field, or it was never assigned. Binds `NULL`.
    Missing,
}

impl<'a> FieldValue<'a> {
    pub fn value(v: impl Into<Value>) -> Self {
        FieldValue::Value(v.into())
    }

    pub fn related(model: &'a dyn Model) -> Self {
        FieldValue::Related(model)
    }

    /// Whether this field is missing or holds `NULL`.
    pub fn is_unset(&self) -> bool {
        match self {
            FieldValue::Missing => true,
            FieldValue::Value(v) => v.is_null(),
            FieldValue::Related(_) => false,
        }
    }
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldValue::Related(m) => f.debug_tuple("Related").field(&m.model_name()).finish(),
            FieldValue::Missing => f.write_str("Missing"),
        }
    }
}

/// A mapped model instance.
///
/// Models are shared by reference with builders that may cross threads, so
/// they must be `Send + Sync`.
pub trait Model: Send + Sync + 'static {
    /// Current value of the named field.
    fn field(&self, name: &str) -> FieldValue<'_>;

    /// Storage-assigned row identifier, if this instance was loaded from (or
    /// written to) the database. When present it is used as the sole identity
    /// clause for update/delete/select, ahead of declared primary keys.
    /// Return `None` once the identifier may be stale.
    fn row_id(&self) -> Option<i64> {
        None
    }

    /// Human-readable model name for error messages.
    fn model_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Registry key of this instance's concrete type.
    fn model_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}
