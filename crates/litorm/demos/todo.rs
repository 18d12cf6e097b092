//! Todo list walkthrough for litorm
//!
//! Run with: cargo run --example todo -p litorm
//!
//! Set LITORM_DB to use a file instead of an in-memory database, and
//! RUST_LOG=litorm.sql=debug to see every statement:
//! LITORM_DB=todo.db RUST_LOG=litorm.sql=debug cargo run --example todo -p litorm

use std::env;

use litorm::prelude::*;
use litorm::GatewayConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Todo {
    row_id: Option<i64>,
    id: Option<i64>,
    label: String,
    status: Option<String>,
}

impl Model for Todo {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "id" => FieldValue::value(self.id),
            "label" => FieldValue::value(&self.label),
            "status" => FieldValue::value(self.status.clone()),
            _ => FieldValue::Missing,
        }
    }

    fn row_id(&self) -> Option<i64> {
        self.row_id
    }
}

impl FromRow for Todo {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            row_id: row.try_get("rowid")?,
            id: row.try_get("id")?,
            label: row.try_get("label")?,
            status: row.try_get("status")?,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = Registry::new();
    let todos = registry.register::<Todo>(
        TableDef::new("todos")
            .column(
                ColumnDef::new("id", SqlType::Integer)
                    .primary_key()
                    .auto_increment(),
            )
            .column(ColumnDef::new("label", SqlType::Text).not_null())
            .column(ColumnDef::new("status", SqlType::Text)),
    )?;

    let mut config = GatewayConfig::new();
    if let Ok(path) = env::var("LITORM_DB") {
        config = config.path(path);
    }
    let db = SqliteGateway::open(config)?;
    db.create_tables(&registry).await?;

    // ============================================
    // Insert from instances and value maps
    // ============================================
    println!("=== Insert ===");

    let mut milk = Todo {
        row_id: None,
        id: None,
        label: "buy milk".to_string(),
        status: Some("open".to_string()),
    };
    let result = todos.insert_instance(&milk).execute(&db).await?;
    milk.id = result.inserted_id;
    milk.row_id = result.inserted_id;
    println!("Inserted {:?}", milk);

    todos
        .insert()
        .set([("label", "walk dog"), ("status", "open")])
        .execute(&db)
        .await?;
    todos
        .insert()
        .set([("label", "read book")])
        .execute(&db)
        .await?;

    // ============================================
    // Update an instance, then by filter
    // ============================================
    println!("\n=== Update ===");

    milk.status = Some("done".to_string());
    let result = todos
        .update_instance(&milk)
        .only(&["status"])
        .execute(&db)
        .await?;
    println!("Instance update touched {} row(s)", result.rows_affected);

    let stmt = todos
        .update()
        .set([("status", "snoozed")])
        .filter(Clause::like("label", "walk%"));
    println!("SQL: {}", stmt.to_sql()?);
    stmt.execute(&db).await?;

    // ============================================
    // Select with composite conditions
    // ============================================
    println!("\n=== Select ===");

    let pending: Vec<Todo> = todos
        .select()
        .with_row_id()
        .filter(
            ClauseGroup::or()
                .add(Clause::ne("status", "done"))
                .add(Clause::is_null("status")),
        )
        .order_by("id", Order::Asc)
        .fetch_all(&db)
        .await?;
    for todo in &pending {
        println!("  #{:?} {} [{:?}]", todo.id, todo.label, todo.status);
    }

    let done = todos
        .select()
        .filter(Clause::eq("status", "done"))
        .count()
        .fetch_one::<Row, _>(&db)
        .await?;
    println!("Done: {}", done.try_get_index::<i64>(0)?);

    // ============================================
    // Delete
    // ============================================
    println!("\n=== Delete ===");

    match todos.delete().execute(&db).await {
        Err(e) if e.is_query_error() => println!("Refused: {e}"),
        other => println!("Unexpected: {other:?}"),
    }

    let result = todos.delete_instance(&milk).execute(&db).await?;
    println!("Deleted {} row(s)", result.rows_affected);

    let result = todos
        .delete()
        .allow_delete_all(true)
        .execute(&db)
        .await?;
    println!("Cleared {} row(s)", result.rows_affected);

    db.close().await?;
    Ok(())
}
