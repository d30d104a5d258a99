//! Round trips against a real MySQL server.
//!
//! Set `DATABASE_URL` (or put it in `.env`) to a connection string such as
//! `root:pw@tcp(127.0.0.1:3306)/fluentdb_test`; without it every test skips.

#![cfg(feature = "mysql")]

use fluentdb::{DbResult, Direction, InsertRow, MySqlDb, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

fn database_url(test: &str) -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var("DATABASE_URL") {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            None
        }
    }
}

fn unique_table(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    format!("{prefix}_{}_{}", std::process::id(), nanos % 1_000_000_000)
}

async fn create_people(db: &MySqlDb, table: &str) -> DbResult<()> {
    db.exec(
        &format!(
            "CREATE TABLE `{table}` (
                id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
                name VARCHAR(64) NOT NULL,
                age INT NULL,
                nick VARCHAR(32) NULL,
                born DATE NULL
            )"
        ),
        &[],
    )
    .await?;
    Ok(())
}

async fn drop_table(db: &MySqlDb, table: &str) {
    let _ = db.exec(&format!("DROP TABLE IF EXISTS `{table}`"), &[]).await;
}

#[tokio::test]
async fn crud_roundtrip() -> DbResult<()> {
    let Some(url) = database_url("crud_roundtrip") else {
        return Ok(());
    };
    let db = MySqlDb::connect(&url).await?;
    let table = unique_table("fluentdb_people");
    create_people(&db, &table).await?;

    let rows: Vec<InsertRow> = vec![
        HashMap::from([
            ("name".to_string(), Value::from("ann")),
            ("age".to_string(), Value::from(30)),
            ("nick".to_string(), Value::from("")),
        ]),
        HashMap::from([("name".to_string(), Value::from("bob"))]),
    ];
    let id = db.from(&table).insert(&["name", "age", "nick"], &rows).await?;
    assert!(id > 0);

    let ann = db.from(&table).and_where("name", "=", "ann").find().await?;
    assert_eq!(ann.get("age"), Some("30"));
    assert_eq!(ann.get("nick"), Some(""));

    let bob = db.from(&table).and_where("name", "=", "bob").find().await?;
    assert_eq!(bob.get("age"), None);
    assert!(bob.contains("name"));

    let adults = db
        .from_as(&table, "p")
        .and_where("p.age", ">", 18)
        .order("p.id", Direction::Desc)
        .select()
        .await?;
    assert_eq!(adults.len(), 1);

    assert_eq!(db.from(&table).count().await?, 2);
    assert_eq!(db.from(&table).count_field("age").await?, 1);

    let changed = db
        .from(&table)
        .and_where("name", "=", "bob")
        .update([("age", Value::from(41)), ("born", Value::from("1983-02-01"))])
        .await?;
    assert_eq!(changed, 1);

    let bob = db.from(&table).and_where("name", "=", "bob").find().await?;
    assert_eq!(bob.get("born"), Some("1983-02-01"));

    let grouped = db
        .from(&table)
        .field("age, COUNT(*) AS n")
        .group("age")
        .having("n", ">=", 1)
        .order("age", Direction::Asc)
        .select()
        .await?;
    assert_eq!(grouped.len(), 2);

    let removed = db.from(&table).and_where("age", ">", 40).delete().await?;
    assert_eq!(removed, 1);

    drop_table(&db, &table).await;
    Ok(())
}

#[tokio::test]
async fn nested_transactions() -> DbResult<()> {
    let Some(url) = database_url("nested_transactions") else {
        return Ok(());
    };
    let db = MySqlDb::connect(&url).await?;
    let table = unique_table("fluentdb_tx");
    create_people(&db, &table).await?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    db.set_logger(fluentdb::monitor::from_fn(move |sql: &str| {
        sink.lock().unwrap().push(sql.to_string())
    }));

    db.begin().await?;
    db.exec(&format!("INSERT INTO `{table}` (name) VALUES (?)"), &[Value::from("kept")])
        .await?;
    db.begin().await?;
    db.exec(&format!("INSERT INTO `{table}` (name) VALUES (?)"), &[Value::from("dropped")])
        .await?;
    db.rollback().await?;
    db.commit().await?;
    assert!(db.commit().await.unwrap_err().is_transaction_state());

    let names: Vec<String> = db
        .from(&table)
        .field("name")
        .select()
        .await?
        .into_iter()
        .filter_map(|r| r.get("name").map(str::to_string))
        .collect();
    assert_eq!(names, vec!["kept"]);

    let log = seen.lock().unwrap().clone();
    assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
    assert!(log.iter().any(|s| s == "COMMIT"));

    drop_table(&db, &table).await;
    Ok(())
}

#[tokio::test]
async fn registry_returns_same_handle() -> DbResult<()> {
    let Some(url) = database_url("registry_returns_same_handle") else {
        return Ok(());
    };
    let a = fluentdb::instance(&url).await?;
    let b = fluentdb::instance(&url).await?;
    assert!(Arc::ptr_eq(&a, &b));

    let one = a.query_raw("SELECT 1 AS one, NULL AS nothing", &[]).await?;
    assert_eq!(one[0].get("one"), Some("1"));
    assert!(!one[0].contains("nothing"));
    Ok(())
}
