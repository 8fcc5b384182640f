use reposit::prelude::*;
use reposit::LogFormat;
use sqlx::Sqlite;

mod models;

use models::{Article, Author, CreateArticle, UpdateArticle, SCHEMA};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RepositConfig::load("dev")?.with_typed::<DatabaseConfig>()?;
    if let Err(err) = reposit::try_init_tracing(LogFormat::from_config(&config)) {
        eprintln!("tracing already initialised: {err}");
    }

    let pool = connect::<Sqlite>(&config).await?;
    for statement in SCHEMA {
        sqlx::query(*statement).execute(&pool).await?;
    }

    let mut session = Session::new(pool);

    let author = SqlxRepository::<Author, Sqlite>::new(&mut session)
        .create(&Record::new().set("name", "Ada Lovelace"))
        .await?;
    tracing::info!(id = author.id, name = %author.name, "author created");

    let mut articles = SqlxRepository::<Article, Sqlite>::new(&mut session);

    let drafts: Vec<CreateArticle> = ["Notes on the Engine", "On Bernoulli Numbers"]
        .into_iter()
        .map(|title| CreateArticle {
            title: title.to_string(),
            body: format!("{title}, a draft."),
            author_id: author.id,
        })
        .collect();
    let created = articles.create_many(&drafts).await?;
    tracing::info!(count = created.len(), "drafts created");

    let first = &created[0];
    let published = articles
        .update(
            &first.id,
            &UpdateArticle {
                published: Some(true),
                ..Default::default()
            },
        )
        .await?;
    tracing::info!(id = published.id, title = %published.title, "article published");

    // A dangling author reference is refused and nothing is written.
    let orphan = CreateArticle {
        title: "Orphan".into(),
        body: "No author".into(),
        author_id: author.id + 1000,
    };
    match articles.create(&orphan).await {
        Ok(article) => tracing::warn!(id = article.id, "orphan article accepted"),
        Err(err) => tracing::info!(error = %err, "orphan article rejected"),
    }

    // Both renames land together or not at all.
    let ids: Vec<i64> = created.iter().map(|a| a.id).collect();
    articles
        .transaction(true, |repo| {
            Box::pin(async move {
                for id in &ids {
                    let patch = Record::new().set("title", format!("Revised #{id}"));
                    repo.update(id, &patch).await?;
                }
                Ok(())
            })
        })
        .await?;

    let page = articles
        .get_page(&Pageable::new(0, 10).sorted_by("title"))
        .await?;
    for article in &page.content {
        tracing::info!(
            id = article.id,
            title = %article.title,
            published = article.published,
            "article"
        );
    }
    tracing::info!(total = page.total_elements, pages = page.total_pages, "page loaded");

    let last = created[created.len() - 1].id;
    articles.delete(&last).await?;
    match articles.delete(&last).await {
        Err(err) if err.is_not_found() => tracing::info!(error = %err, "already gone"),
        other => other?,
    }

    session.commit().await?;
    Ok(())
}
