//! Basic example for fluentdb
//!
//! Run with: cargo run --example basic -p fluentdb
//!
//! Set DATABASE_URL in .env file or environment variable:
//! DATABASE_URL=root:root@tcp(127.0.0.1:3306)/fluentdb_example

use fluentdb::{DbError, Direction, InsertRow, StderrLogger, Value};
use std::collections::HashMap;
use std::env;

#[tokio::main]
async fn main() -> Result<(), DbError> {
    dotenvy::dotenv().ok();

    let database_url =
        env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env or environment");

    let db = fluentdb::instance(&database_url).await?;
    db.set_logger(StderrLogger::new());

    db.exec(
        "CREATE TABLE IF NOT EXISTS products (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            category VARCHAR(32) NOT NULL,
            price_cents BIGINT NOT NULL,
            note VARCHAR(255) NULL
        )",
        &[],
    )
    .await?;
    db.exec("DELETE FROM products", &[]).await?;

    // ============================================
    // INSERT (multi-row; missing fields become NULL)
    // ============================================
    let rows: Vec<InsertRow> = [
        ("Keyboard", "input", 4_999, Some("mechanical")),
        ("Mouse", "input", 1_999, None),
        ("Monitor", "display", 19_999, None),
    ]
    .into_iter()
    .map(|(name, category, price, note)| {
        let mut row = HashMap::from([
            ("name".to_string(), Value::from(name)),
            ("category".to_string(), Value::from(category)),
            ("price_cents".to_string(), Value::from(price)),
        ]);
        if let Some(note) = note {
            row.insert("note".to_string(), Value::from(note));
        }
        row
    })
    .collect();

    let last_id = db
        .from("products")
        .insert(&["name", "category", "price_cents", "note"], &rows)
        .await?;
    println!("last insert id: {last_id}");

    // ============================================
    // SELECT
    // ============================================
    let cheap = db
        .from_as("products", "p")
        .field("p.id, p.name, p.note")
        .and_where("p.price_cents", "<", 10_000)
        .order("p.price_cents", Direction::Asc)
        .select()
        .await?;
    for row in &cheap {
        println!(
            "{} {} note={}",
            row.get("id").unwrap_or("?"),
            row.get("name").unwrap_or("?"),
            row.get("note").unwrap_or("<null>")
        );
    }

    // ============================================
    // GROUP BY / HAVING / COUNT
    // ============================================
    let per_category = db
        .from("products")
        .field("category, COUNT(*) AS n, SUM(price_cents) AS total")
        .group("category")
        .having("n", ">", 1)
        .select()
        .await?;
    println!("categories with several products: {per_category:?}");

    let total = db.from("products").count().await?;
    println!("products: {total}");

    // ============================================
    // UPDATE / DELETE
    // ============================================
    let updated = db
        .from("products")
        .and_where("category", "=", "input")
        .update([("price_cents", 999)])
        .await?;
    println!("updated: {updated}");
    println!("last sql: {}", db.last_sql());

    let deleted = db
        .from("products")
        .and_where("name", "LIKE", "Mon%")
        .delete()
        .await?;
    println!("deleted: {deleted}");

    Ok(())
}
