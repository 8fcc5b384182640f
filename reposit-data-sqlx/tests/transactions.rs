mod common;

use common::{memory_pool, CreateItem, Item, Owner};
use reposit_data::{DataError, Record, Repository};
use reposit_data_sqlx::{Session, SqlxRepository};
use sqlx::Sqlite;
use std::time::Duration;

#[tokio::test]
async fn autocommit_scope_commits_once_at_the_end() {
    let mut session = Session::new(memory_pool().await);
    let mut repo = SqlxRepository::<Item, Sqlite>::new(&mut session);

    let created = repo
        .transaction(true, |repo| {
            Box::pin(async move {
                let first = repo.create(&CreateItem::named("first")).await?;
                let second = repo.create(&CreateItem::named("second")).await?;
                Ok(vec![first, second])
            })
        })
        .await
        .unwrap();
    assert_eq!(created.len(), 2);

    // Nothing is left pending: a rollback now cannot undo the scope.
    repo.session().rollback().await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn manual_scope_leaves_work_staged() {
    let mut session = Session::new(memory_pool().await);
    let mut repo = SqlxRepository::<Item, Sqlite>::new(&mut session);

    repo.transaction(false, |repo| {
        Box::pin(async move {
            repo.create(&CreateItem::named("staged")).await?;
            Ok(())
        })
    })
    .await
    .unwrap();

    assert!(repo.session().in_transaction());
    assert_eq!(repo.count().await.unwrap(), 1);

    repo.session().rollback().await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn manual_scope_is_committed_by_the_caller() {
    let mut session = Session::new(memory_pool().await);
    let mut repo = SqlxRepository::<Item, Sqlite>::new(&mut session);

    repo.transaction(false, |repo| {
        Box::pin(async move {
            repo.create(&CreateItem::named("kept")).await?;
            Ok(())
        })
    })
    .await
    .unwrap();

    session.commit().await.unwrap();
    session.rollback().await.unwrap();

    let mut repo = SqlxRepository::<Item, Sqlite>::new(&mut session);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn failing_scope_rolls_back_and_returns_the_same_error() {
    let mut session = Session::new(memory_pool().await);
    let mut repo = SqlxRepository::<Item, Sqlite>::new(&mut session);

    let err = repo
        .transaction(true, |repo| {
            Box::pin(async move {
                repo.create(&CreateItem::named("doomed")).await?;
                Err::<(), _>(DataError::InvalidPayload("stop here".into()))
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::InvalidPayload(ref msg) if msg == "stop here"));
    assert!(!repo.session().in_transaction());
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn not_found_inside_scope_undoes_earlier_writes() {
    let mut session = Session::new(memory_pool().await);
    let mut repo = SqlxRepository::<Item, Sqlite>::new(&mut session);

    let err = repo
        .transaction(true, |repo| {
            Box::pin(async move {
                repo.create(&CreateItem::named("first")).await?;
                repo.update(&9999, &Record::new().set("name", "nope")).await
            })
        })
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn repositories_share_one_session() {
    let mut session = Session::new(memory_pool().await);

    let owner = SqlxRepository::<Owner, Sqlite>::new(&mut session)
        .create(&Record::new().set("name", "Lin"))
        .await
        .unwrap();

    let mut items = SqlxRepository::<Item, Sqlite>::new(&mut session);
    items
        .create(&Record::new().set("name", "pen").set("owner_id", owner.id))
        .await
        .unwrap();

    let affected = session
        .execute(
            r#"DELETE FROM "test_item" WHERE "owner_id" = ?"#,
            vec![owner.id.into()],
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);
    session.commit().await.unwrap();

    let mut items = SqlxRepository::<Item, Sqlite>::new(&mut session);
    assert_eq!(items.count().await.unwrap(), 0);
}

#[tokio::test]
async fn cancelled_scope_rolls_back_its_writes() {
    let mut session = Session::new(memory_pool().await);
    let mut repo = SqlxRepository::<Item, Sqlite>::new(&mut session);

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        repo.transaction(true, |repo| {
            Box::pin(async move {
                repo.create(&CreateItem::named("abandoned")).await?;
                std::future::pending::<()>().await;
                Ok(())
            })
        }),
    )
    .await;

    assert!(outcome.is_err(), "scope should still be pending when cancelled");
    assert!(!repo.session().in_transaction());
    assert_eq!(repo.count().await.unwrap(), 0);
}
