//! Cross-builder tests.

use std::sync::{Arc, Mutex};

use crate::builder::{BuiltStatement, Order, StatementBuilder, StatementKind};
use crate::clause::{Clause, ClauseGroup, CompositeClause};
use crate::error::{OrmError, OrmResult};
use crate::gateway::{ExecResult, Gateway, RowStream};
use crate::model::{FieldValue, Model};
use crate::registry::{ColumnDef, ModelHandle, Registry, SqlType, TableDef};
use crate::row::Row;
use crate::value::{Value, ValueMap};

struct User {
    id: i64,
}

impl Model for User {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "id" => FieldValue::value(self.id),
            _ => FieldValue::Missing,
        }
    }
}

struct Todo {
    row_id: Option<i64>,
    id: Option<i64>,
    label: String,
    status: Option<String>,
    owner: Option<User>,
}

impl Todo {
    fn new(id: Option<i64>) -> Self {
        Self {
            row_id: None,
            id,
            label: "milk".to_string(),
            status: Some("open".to_string()),
            owner: Some(User { id: 9 }),
        }
    }
}

impl Model for Todo {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "id" => FieldValue::value(self.id),
            "label" => FieldValue::value(&self.label),
            "status" => FieldValue::value(self.status.clone()),
            "owner" => match &self.owner {
                Some(user) => FieldValue::related(user),
                None => FieldValue::value(Value::Null),
            },
            _ => FieldValue::Missing,
        }
    }

    fn row_id(&self) -> Option<i64> {
        self.row_id
    }
}

struct Membership {
    user_id: i64,
    group_id: i64,
}

impl Model for Membership {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "user_id" => FieldValue::value(self.user_id),
            "group_id" => FieldValue::value(self.group_id),
            _ => FieldValue::Missing,
        }
    }
}

/// A model whose relation field has no foreign key declared on its column.
struct Note {
    author: User,
}

impl Model for Note {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "author" => FieldValue::related(&self.author),
            _ => FieldValue::Missing,
        }
    }
}

struct Unregistered;

impl Model for Unregistered {
    fn field(&self, _name: &str) -> FieldValue<'_> {
        FieldValue::Missing
    }
}

fn registry() -> (Registry, ModelHandle) {
    let mut registry = Registry::new();
    registry
        .register::<User>(
            TableDef::new("users").column(
                ColumnDef::new("id", SqlType::Integer)
                    .primary_key()
                    .auto_increment(),
            ),
        )
        .unwrap();
    let todos = registry
        .register::<Todo>(
            TableDef::new("todos")
                .column(
                    ColumnDef::new("id", SqlType::Integer)
                        .primary_key()
                        .auto_increment(),
                )
                .column(ColumnDef::new("label", SqlType::Text).not_null())
                .column(ColumnDef::new("status", SqlType::Text))
                .column(
                    ColumnDef::new("owner_id", SqlType::Integer)
                        .field("owner")
                        .references("users", "id"),
                ),
        )
        .unwrap();
    registry
        .register::<Membership>(
            TableDef::new("memberships")
                .column(ColumnDef::new("user_id", SqlType::Integer).primary_key())
                .column(ColumnDef::new("group_id", SqlType::Integer).primary_key()),
        )
        .unwrap();
    registry
        .register::<Note>(
            TableDef::new("notes").column(ColumnDef::new("author_id", SqlType::Integer).field("author")),
        )
        .unwrap();
    (registry, todos)
}

fn v(value: impl Into<Value>) -> Value {
    value.into()
}

// ==================== UPDATE ====================

#[test]
fn test_update_value_map_orders_set_before_where() {
    let (registry, _) = registry();
    let stmt = registry
        .update::<Todo>()
        .set([("status", "done")])
        .filter([("id", 5)])
        .build()
        .unwrap();

    assert_eq!(stmt.sql(), "UPDATE todos SET status = (?) WHERE id = (?)");
    assert_eq!(stmt.params(), &[v("done"), v(5)]);
    assert_eq!(stmt.kind(), StatementKind::Update);
    assert_eq!(stmt.table(), "todos");
}

#[test]
fn test_update_set_merges_key_by_key() {
    let (registry, _) = registry();
    let stmt = registry
        .update::<Todo>()
        .set([("status", "open"), ("label", "eggs")])
        .set([("status", "done")])
        .filter([("id", 1)])
        .build()
        .unwrap();

    assert_eq!(
        stmt.sql(),
        "UPDATE todos SET status = (?), label = (?) WHERE id = (?)"
    );
    assert_eq!(stmt.params(), &[v("done"), v("eggs"), v(1)]);
}

#[test]
fn test_update_instance_uses_primary_key() {
    let (registry, _) = registry();
    let todo = Todo::new(Some(3));
    let stmt = registry.update_instance(&todo).build().unwrap();

    assert_eq!(
        stmt.sql(),
        "UPDATE todos SET id = (?), label = (?), status = (?), owner_id = (?) WHERE id = (?)"
    );
    // owner_id is flattened from the related user.
    assert_eq!(stmt.params(), &[v(3), v("milk"), v("open"), v(9), v(3)]);
}

#[test]
fn test_update_instance_row_id_takes_precedence() {
    let (registry, _) = registry();
    let mut todo = Todo::new(Some(3));
    todo.row_id = Some(42);
    let stmt = registry.update_instance(&todo).only(&["status"]).build().unwrap();

    assert_eq!(stmt.sql(), "UPDATE todos SET status = (?) WHERE rowid = (?)");
    assert_eq!(stmt.params(), &[v("open"), v(42)]);
}

#[test]
fn test_update_instance_composite_key_in_column_order() {
    let (registry, _) = registry();
    let m = Membership {
        user_id: 1,
        group_id: 2,
    };
    let stmt = registry.update_instance(&m).only(&["group_id"]).build().unwrap();
    assert_eq!(
        stmt.sql(),
        "UPDATE memberships SET group_id = (?) WHERE user_id = (?) AND group_id = (?)"
    );
    assert_eq!(stmt.params(), &[v(2), v(1), v(2)]);
}

#[test]
fn test_update_instance_merges_filter_with_identity() {
    let (registry, _) = registry();
    let todo = Todo::new(Some(3));
    let stmt = registry
        .update_instance(&todo)
        .only(&["label"])
        .filter(
            ClauseGroup::or()
                .add(Clause::eq("status", "open"))
                .add(Clause::is_null("status")),
        )
        .build()
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "UPDATE todos SET label = (?) WHERE id = (?) AND (status = (?) OR status IS NULL)"
    );
    assert_eq!(stmt.params(), &[v("milk"), v(3), v("open")]);
}

#[test]
fn test_update_set_on_instance_is_query_error() {
    let (registry, _) = registry();
    let todo = Todo::new(Some(3));
    let err = registry
        .update_instance(&todo)
        .set([("status", "done")])
        .build()
        .unwrap_err();
    assert!(err.is_query_error());
    assert!(err.to_string().contains("set()"));
}

#[test]
fn test_update_empty_value_map_is_query_error() {
    let (registry, _) = registry();
    let err = registry
        .update::<Todo>()
        .filter([("id", 1)])
        .build()
        .unwrap_err();
    assert!(err.is_query_error());
    assert!(err.to_string().contains("no values to update"));

    let err = registry
        .update::<Todo>()
        .set(ValueMap::new())
        .build()
        .unwrap_err();
    assert!(err.is_query_error());
}

#[test]
fn test_update_instance_without_identity() {
    let (registry, _) = registry();
    let todo = Todo::new(None);
    let err = registry.update_instance(&todo).build().unwrap_err();
    assert!(err.is_query_error());

    let stmt = registry
        .update_instance(&todo)
        .only(&["status"])
        .filter([("label", "milk")])
        .build()
        .unwrap();
    assert_eq!(stmt.sql(), "UPDATE todos SET status = (?) WHERE label = (?)");
}

#[test]
fn test_update_instance_skips_unset_auto_increment_key() {
    let (registry, _) = registry();
    let mut todo = Todo::new(None);
    todo.row_id = Some(1);
    let stmt = registry.update_instance(&todo).build().unwrap();
    assert_eq!(
        stmt.sql(),
        "UPDATE todos SET label = (?), status = (?), owner_id = (?) WHERE rowid = (?)"
    );
    assert_eq!(stmt.params(), &[v("milk"), v("open"), v(9), v(1)]);
}

#[test]
fn test_update_only_rejects_unknown_fields() {
    let (registry, _) = registry();
    let todo = Todo::new(Some(3));
    let err = registry
        .update_instance(&todo)
        .only(&["status", "stauts"])
        .build()
        .unwrap_err();
    assert!(err.is_query_error());
    assert!(err.to_string().contains("stauts"));

    // Field and column names are both accepted.
    let stmt = registry
        .update_instance(&todo)
        .only(&["owner", "label"])
        .build()
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "UPDATE todos SET label = (?), owner_id = (?) WHERE id = (?)"
    );
    let stmt = registry.update_instance(&todo).only(&["owner_id"]).build().unwrap();
    assert_eq!(stmt.sql(), "UPDATE todos SET owner_id = (?) WHERE id = (?)");
}

#[test]
fn test_update_without_filter_updates_every_row() {
    let (registry, todos) = registry();
    let stmt = todos.update().set([("status", "archived")]).build().unwrap();
    assert_eq!(stmt.sql(), "UPDATE todos SET status = (?)");
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_build_is_repeatable() {
    let (registry, _) = registry();
    let todo = Todo::new(Some(3));
    let builder = registry.update_instance(&todo).filter(CompositeClause::or(
        ClauseGroup::and().add(Clause::eq("status", "open")),
        ClauseGroup::and().add(Clause::gt("id", 1)),
    ));
    assert_eq!(builder.build().unwrap(), builder.build().unwrap());

    let select = registry
        .select::<Todo>()
        .filter(Clause::in_list("id", [1, 2, 3]))
        .limit(3);
    assert_eq!(select.build().unwrap(), select.build().unwrap());
}

// ==================== SELECT ====================

#[test]
fn test_select_default_projection() {
    let (registry, _) = registry();
    let stmt = registry.select::<Todo>().build().unwrap();
    assert_eq!(stmt.sql(), "SELECT id, label, status, owner_id FROM todos");
    assert!(stmt.params().is_empty());
    assert!(stmt.kind().returns_rows());
}

#[test]
fn test_select_with_modifiers() {
    let (registry, _) = registry();
    let stmt = registry
        .select::<Todo>()
        .columns(&["id", "label"])
        .filter(Clause::eq("status", "open"))
        .order_by_desc("id")
        .paginate(2, 10)
        .build()
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT id, label FROM todos WHERE status = (?) ORDER BY id DESC LIMIT 10 OFFSET 10"
    );
    assert_eq!(stmt.params(), &[v("open")]);
}

#[test]
fn test_select_offset_without_limit() {
    let (registry, _) = registry();
    let stmt = registry
        .select::<Todo>()
        .columns(&["id"])
        .order_by("label", Order::Asc)
        .offset(5)
        .build()
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT id FROM todos ORDER BY label ASC LIMIT -1 OFFSET 5");
}

#[test]
fn test_select_count_and_row_id() {
    let (registry, todos) = registry();
    let stmt = todos
        .select()
        .filter([("status", "open")])
        .order_by_desc("id")
        .limit(1)
        .count()
        .build()
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT COUNT(*) FROM todos WHERE status = (?)");

    let stmt = registry.select::<Todo>().with_row_id().build().unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT rowid AS rowid, id, label, status, owner_id FROM todos"
    );

    let stmt = registry
        .select::<Todo>()
        .columns(&["rowid", "label"])
        .build()
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT rowid AS rowid, label FROM todos");
}

#[test]
fn test_select_composite_filter() {
    let (registry, _) = registry();
    let stmt = registry
        .select::<Todo>()
        .columns(&["id"])
        .filter(CompositeClause::and(
            ClauseGroup::or()
                .add(Clause::eq("label", "a"))
                .add(Clause::eq("status", "b")),
            ClauseGroup::and().add(Clause::eq("id", 3)),
        ))
        .build()
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT id FROM todos WHERE ((label = (?) OR status = (?)) AND (id = (?)))"
    );
    assert_eq!(stmt.params(), &[v("a"), v("b"), v(3)]);
}

#[test]
fn test_select_instance_by_identity() {
    let (registry, _) = registry();
    let todo = Todo::new(Some(7));
    let stmt = registry
        .select_instance(&todo)
        .columns(&["label"])
        .build()
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT label FROM todos WHERE id = (?)");
    assert_eq!(stmt.params(), &[v(7)]);
}

#[test]
fn test_select_rejects_unknown_columns() {
    let (registry, _) = registry();
    assert!(
        registry
            .select::<Todo>()
            .columns(&["nope"])
            .build()
            .unwrap_err()
            .is_query_error()
    );
    assert!(
        registry
            .select::<Todo>()
            .filter([("nope", 1)])
            .build()
            .unwrap_err()
            .is_query_error()
    );
    assert!(
        registry
            .select::<Todo>()
            .order_by_desc("id; DROP TABLE todos")
            .build()
            .unwrap_err()
            .is_query_error()
    );
}

// ==================== DELETE ====================

#[test]
fn test_delete_requires_where() {
    let (registry, _) = registry();
    let err = registry.delete::<Todo>().build().unwrap_err();
    assert!(err.is_query_error());
    assert!(err.to_string().contains("refusing to delete all rows"));

    let stmt = registry
        .delete::<Todo>()
        .allow_delete_all(true)
        .build()
        .unwrap();
    assert_eq!(stmt.sql(), "DELETE FROM todos");
}

#[test]
fn test_delete_empty_group_does_not_count_as_where() {
    let (registry, _) = registry();
    let err = registry
        .delete::<Todo>()
        .filter(ClauseGroup::or())
        .build()
        .unwrap_err();
    assert!(err.is_query_error());
}

#[test]
fn test_delete_with_filter_and_instance() {
    let (registry, todos) = registry();
    let stmt = registry
        .delete::<Todo>()
        .filter(Clause::lt("id", 10))
        .filter(Clause::eq("status", "done"))
        .build()
        .unwrap();
    assert_eq!(stmt.sql(), "DELETE FROM todos WHERE id < (?) AND status = (?)");
    assert_eq!(stmt.params(), &[v(10), v("done")]);

    let m = Membership {
        user_id: 1,
        group_id: 2,
    };
    let stmt = registry.delete_instance(&m).build().unwrap();
    assert_eq!(
        stmt.sql(),
        "DELETE FROM memberships WHERE user_id = (?) AND group_id = (?)"
    );

    let todo = Todo::new(Some(4));
    let stmt = todos.delete_instance(&todo).build().unwrap();
    assert_eq!(stmt.sql(), "DELETE FROM todos WHERE id = (?)");
}

// ==================== INSERT ====================

#[test]
fn test_insert_instance_skips_unset_auto_increment() {
    let (registry, _) = registry();
    let todo = Todo::new(None);
    let stmt = registry.insert_instance(&todo).build().unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO todos (label, status, owner_id) VALUES ((?), (?), (?))"
    );
    assert_eq!(stmt.params(), &[v("milk"), v("open"), v(9)]);

    let todo = Todo::new(Some(12));
    let stmt = registry.insert_instance(&todo).build().unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO todos (id, label, status, owner_id) VALUES ((?), (?), (?), (?))"
    );
}

#[test]
fn test_insert_value_map() {
    let (_, todos) = registry();
    let stmt = todos
        .insert()
        .set([("label", "bread")])
        .set([("status", Value::Null)])
        .build()
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO todos (label, status) VALUES ((?), (?))"
    );
    assert_eq!(stmt.params(), &[v("bread"), Value::Null]);

    let err = todos.insert().build().unwrap_err();
    assert!(err.is_query_error());
}

#[test]
fn test_relation_without_foreign_key_is_query_error() {
    let (registry, _) = registry();
    let note = Note {
        author: User { id: 1 },
    };
    let err = registry.insert_instance(&note).build().unwrap_err();
    assert!(err.is_query_error());
    assert!(err.to_string().contains("foreign key"));
}

// ==================== Configuration ====================

#[test]
fn test_unregistered_model_fails_at_build() {
    let (registry, _) = registry();
    let err = registry.select::<Unregistered>().build().unwrap_err();
    assert!(err.is_configuration_error());

    let err = registry.update_instance(&Unregistered).build().unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_handle_rejects_foreign_instance() {
    let (_, todos) = registry();
    let m = Membership {
        user_id: 1,
        group_id: 2,
    };
    let err = todos.delete_instance(&m).build().unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_create_statements_in_registration_order() {
    let (registry, _) = registry();
    let stmts = registry.create_statements().unwrap();
    let tables: Vec<&str> = stmts.iter().map(BuiltStatement::table).collect();
    assert_eq!(tables, vec!["users", "todos", "memberships", "notes"]);
    assert_eq!(
        stmts[1].sql(),
        "CREATE TABLE IF NOT EXISTS todos (id INTEGER PRIMARY KEY AUTOINCREMENT,label TEXT NOT NULL,status TEXT,owner_id INTEGER REFERENCES users(id))"
    );
}

#[test]
fn test_placeholders_match_params_for_every_builder() {
    let (registry, _) = registry();
    let todo = Todo::new(Some(3));
    let stmts = vec![
        registry.insert_instance(&todo).build().unwrap(),
        registry.update_instance(&todo).build().unwrap(),
        registry.select_instance(&todo).build().unwrap(),
        registry.delete_instance(&todo).build().unwrap(),
        registry
            .select::<Todo>()
            .filter(Clause::between("id", 1, 5))
            .filter(Clause::not_in("status", ["a", "b"]))
            .build()
            .unwrap(),
    ];
    for stmt in stmts {
        assert_eq!(stmt.sql().matches('?').count(), stmt.params().len(), "{}", stmt.sql());
    }
}

// ==================== Execution ====================

/// Records every statement and answers queries with canned rows.
#[derive(Default)]
struct RecordingGateway {
    seen: Mutex<Vec<BuiltStatement>>,
    rows: Vec<Row>,
}

impl Gateway for RecordingGateway {
    fn execute(
        &self,
        statement: BuiltStatement,
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send {
        self.seen.lock().unwrap().push(statement);
        async move {
            Ok(ExecResult {
                rows_affected: 1,
                inserted_id: None,
            })
        }
    }

    fn query(
        &self,
        statement: BuiltStatement,
    ) -> impl std::future::Future<Output = OrmResult<RowStream>> + Send {
        self.seen.lock().unwrap().push(statement);
        let rows = self.rows.iter().cloned().map(Ok).collect();
        async move { Ok(RowStream::from_rows(rows)) }
    }
}

#[tokio::test]
async fn test_build_errors_never_reach_the_gateway() {
    let (registry, _) = registry();
    let gateway = RecordingGateway::default();

    let err = registry.delete::<Todo>().execute(&gateway).await.unwrap_err();
    assert!(err.is_query_error());
    assert!(gateway.seen.lock().unwrap().is_empty());

    registry
        .update::<Todo>()
        .set([("status", "done")])
        .filter([("id", 1)])
        .execute(&gateway)
        .await
        .unwrap();
    let seen = gateway.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].sql(), "UPDATE todos SET status = (?) WHERE id = (?)");
}

#[tokio::test]
async fn test_fetch_helpers() {
    let (registry, _) = registry();
    let columns: Arc<[String]> = Arc::from(vec!["id".to_string()]);
    let gateway = RecordingGateway {
        seen: Mutex::default(),
        rows: vec![
            Row::new(Arc::clone(&columns), vec![Value::Integer(1)]),
            Row::new(Arc::clone(&columns), vec![Value::Integer(2)]),
        ],
    };

    let rows: Vec<Row> = registry
        .select::<Todo>()
        .columns(&["id"])
        .fetch_all(&gateway)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].try_get::<i64>("id").unwrap(), 2);

    let first: Option<Row> = registry.select::<Todo>().fetch_opt(&gateway).await.unwrap();
    assert_eq!(first.unwrap().try_get::<i64>("id").unwrap(), 1);

    let empty = RecordingGateway::default();
    let err = registry
        .select::<Todo>()
        .fetch_one::<Row, _>(&empty)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::NotFound(_)));
}
