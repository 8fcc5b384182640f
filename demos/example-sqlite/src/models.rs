use reposit::reposit_data::Entity;
use serde::Serialize;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

impl Entity for Author {
    type Id = i64;

    fn table_name() -> &'static str {
        "author"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn id(&self) -> &i64 {
        &self.id
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub author_id: i64,
}

impl Entity for Article {
    type Id = i64;

    fn table_name() -> &'static str {
        "article"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "title", "body", "published", "author_id"]
    }

    fn id(&self) -> &i64 {
        &self.id
    }
}

#[derive(Debug, Serialize)]
pub struct CreateArticle {
    pub title: String,
    pub body: String,
    pub author_id: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateArticle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

reposit::reposit_data::serde_payload!(CreateArticle, UpdateArticle);

pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS author (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS article (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        published BOOLEAN NOT NULL DEFAULT 0,
        author_id INTEGER NOT NULL REFERENCES author(id)
    )",
];
