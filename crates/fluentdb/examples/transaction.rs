//! Transaction example for fluentdb
//!
//! Run with: cargo run --example transaction -p fluentdb
//!
//! Set DATABASE_URL in .env file or environment variable:
//! DATABASE_URL=root:root@tcp(127.0.0.1:3306)/fluentdb_example
//!
//! Demonstrates nested scopes: the outer `begin` starts a transaction, inner
//! ones open savepoints that can be rolled back on their own.

use fluentdb::{DbError, DbResult, MySqlDb, Value};
use std::env;

async fn balance(db: &MySqlDb, name: &str) -> DbResult<i64> {
    let row = db
        .from("accounts")
        .field("balance")
        .and_where("name", "=", name)
        .find()
        .await?;
    Ok(row.get_parsed::<i64>("balance")?.unwrap_or_default())
}

async fn transfer(db: &MySqlDb, from: &str, to: &str, amount: i64) -> DbResult<()> {
    if balance(db, from).await? < amount {
        return Err(DbError::backend(format!("insufficient balance for {from}")));
    }
    db.exec(
        "UPDATE accounts SET balance = balance - ? WHERE name = ?",
        &[Value::from(amount), Value::from(from)],
    )
    .await?;
    db.exec(
        "UPDATE accounts SET balance = balance + ? WHERE name = ?",
        &[Value::from(amount), Value::from(to)],
    )
    .await?;
    Ok(())
}

async fn print_balances(db: &MySqlDb) -> DbResult<()> {
    for name in ["Alice", "Bob"] {
        println!("  {name}: ${}", balance(db, name).await?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), DbError> {
    dotenvy::dotenv().ok();

    let database_url =
        env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env or environment");
    let db = MySqlDb::connect(&database_url).await?;

    db.exec(
        "CREATE TABLE IF NOT EXISTS accounts (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(64) NOT NULL UNIQUE,
            balance BIGINT NOT NULL DEFAULT 0
        ) ENGINE=InnoDB",
        &[],
    )
    .await?;
    db.exec("DELETE FROM accounts", &[]).await?;
    db.exec(
        "INSERT INTO accounts (name, balance) VALUES (?, ?), (?, ?)",
        &[
            Value::from("Alice"),
            Value::from(1000),
            Value::from("Bob"),
            Value::from(500),
        ],
    )
    .await?;

    println!("Initial balances:");
    print_balances(&db).await?;

    // ============================================
    // Successful transaction
    // ============================================
    println!("\n=== Successful Transaction ===");
    fluentdb::transaction!(db, { transfer(&db, "Alice", "Bob", 200).await })?;
    print_balances(&db).await?;

    // ============================================
    // Failed transaction (rolled back)
    // ============================================
    println!("\n=== Failed Transaction ===");
    let result = fluentdb::transaction!(db, { transfer(&db, "Bob", "Alice", 10_000).await });
    println!("  result: {result:?}");
    print_balances(&db).await?;

    // ============================================
    // Savepoint inside a transaction
    // ============================================
    println!("\n=== Nested Scope ===");
    db.begin().await?;
    transfer(&db, "Alice", "Bob", 100).await?;

    db.begin().await?;
    transfer(&db, "Bob", "Alice", 50).await?;
    println!("  inner scope depth: {}", db.transaction_depth().await);
    db.rollback().await?;

    db.commit().await?;
    print_balances(&db).await?;

    // Nothing left to commit
    let err = db.commit().await.unwrap_err();
    println!("\n  extra commit: {err}");

    Ok(())
}
