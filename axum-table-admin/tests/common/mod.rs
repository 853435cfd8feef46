#![allow(dead_code)]

use axum_table_admin::{AdminConfig, SqliteProvider, TableAdmin};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;

/// One shared in-memory database per test
///
/// A single connection keeps every query on the same in-memory database.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

/// users (3 rows), orders (25 rows), order_lines (composite key),
/// audit_log (no key) and a denied schema_migrations table
pub async fn seeded_pool() -> SqlitePool {
    let pool = memory_pool().await;

    for statement in [
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            stripe_account TEXT,
            agreement_embed_url TEXT,
            active BOOLEAN NOT NULL DEFAULT 1,
            joined_on DATE
        )",
        "CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            user_id INTEGER REFERENCES users(id),
            status TEXT NOT NULL,
            total REAL NOT NULL
        )",
        "CREATE TABLE order_lines (
            order_id INTEGER NOT NULL,
            line_number INTEGER NOT NULL,
            sku TEXT NOT NULL,
            PRIMARY KEY (order_id, line_number)
        )",
        "CREATE TABLE audit_log (actor TEXT, action TEXT NOT NULL)",
        "CREATE TABLE schema_migrations (version TEXT PRIMARY KEY)",
        "INSERT INTO users (name, email) VALUES
            ('Alice', 'alice@example.com'),
            ('Bob', 'bob@example.com'),
            ('Carol', 'carol@example.com')",
        "INSERT INTO order_lines (order_id, line_number, sku) VALUES (1, 1, 'A-1'), (1, 2, 'B-2')",
        "INSERT INTO audit_log (actor, action) VALUES ('alice', 'login')",
    ] {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    let statuses = ["pending", "shipped", "cancelled"];
    for index in 0..25_i64 {
        sqlx::query("INSERT INTO orders (user_id, status, total) VALUES (?, ?, ?)")
            .bind(index % 3 + 1)
            .bind(statuses[index as usize % statuses.len()])
            .bind(index as f64 * 1.5)
            .execute(&pool)
            .await
            .unwrap();
    }

    pool
}

pub fn admin(pool: &SqlitePool, config: AdminConfig) -> TableAdmin<SqliteProvider> {
    TableAdmin::new(SqliteProvider::new(pool.clone()), config)
}

pub async fn row_count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{table}\""))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn attributes(value: serde_json::Value) -> axum_table_admin::Attributes {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
