#![allow(dead_code)]

use chrono::{DateTime, Utc};
use reposit_data::Entity;
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// A single-connection in-memory database, so every session sees the same data.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE owner_account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE test_item (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            quantity INTEGER NOT NULL DEFAULT 0,
            owner_id INTEGER REFERENCES owner_account(id)
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE tag (
            id BLOB PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE counter (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hits INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE audit_entry (
            message TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub owner_id: Option<i64>,
}

impl Entity for Item {
    type Id = i64;

    fn table_name() -> &'static str {
        "test_item"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name", "description", "quantity", "owner_id"]
    }

    fn id(&self) -> &i64 {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Owner {
    pub id: i64,
    pub name: String,
}

impl Entity for Owner {
    type Id = i64;

    fn table_name() -> &'static str {
        "owner_account"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn id(&self) -> &i64 {
        &self.id
    }
}

/// A UUID-keyed row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Tag {
    type Id = Uuid;

    fn table_name() -> &'static str {
        "tag"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name", "created_at"]
    }

    fn id(&self) -> &Uuid {
        &self.id
    }
}

/// A row whose every column has a default.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Counter {
    pub id: i64,
    pub hits: i64,
}

impl Entity for Counter {
    type Id = i64;

    fn table_name() -> &'static str {
        "counter"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "hits"]
    }

    fn id(&self) -> &i64 {
        &self.id
    }
}

/// A row type without an identifier column.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AuditEntry {
    pub message: String,
}

impl Entity for AuditEntry {
    type Id = String;

    fn table_name() -> &'static str {
        "audit_entry"
    }

    fn id_column() -> Option<&'static str> {
        None
    }

    fn columns() -> &'static [&'static str] {
        &["message"]
    }

    fn id(&self) -> &String {
        &self.message
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
}

impl CreateItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            quantity: None,
            owner_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTag {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

reposit_data::serde_payload!(CreateItem, UpdateItem, CreateTag);
