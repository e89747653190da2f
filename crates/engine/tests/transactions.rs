use chrono::{Duration, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Engine, EngineError, MAX_AMOUNT_MINOR, NewTransaction, TransactionFilter, TransactionKind,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn workspace_with_owner(engine: &Engine, currency: &str) -> (Uuid, Uuid) {
    let user = engine
        .register_user("alice@example.com", "password123", Some("Alice"))
        .await
        .unwrap();
    let ws = engine
        .create_workspace_with_owner(user.id, "Main", currency)
        .await
        .unwrap();
    (ws.id, user.id)
}

fn expense(amount_minor: i64, days_ago: i64) -> NewTransaction {
    NewTransaction {
        kind: TransactionKind::Expense,
        amount_minor,
        currency: None,
        category_id: None,
        note: None,
        occurred_at: Some(Utc::now() - Duration::days(days_ago)),
    }
}

fn income(amount_minor: i64, days_ago: i64) -> NewTransaction {
    NewTransaction {
        kind: TransactionKind::Income,
        ..expense(amount_minor, days_ago)
    }
}

#[tokio::test]
async fn create_defaults_currency_and_trims_text() {
    let (engine, _db) = engine_with_db().await;
    let (ws, user) = workspace_with_owner(&engine, "eur").await;

    let tx = engine
        .create_transaction(
            ws,
            user,
            NewTransaction {
                note: Some("  lunch ".to_string()),
                ..expense(1250, 0)
            },
        )
        .await
        .unwrap();
    assert_eq!(tx.currency, "EUR");
    assert_eq!(tx.category_id, None);
    assert_eq!(tx.note.as_deref(), Some("lunch"));
    assert_eq!(tx.created_by, user);

    let tx = engine
        .create_transaction(
            ws,
            user,
            NewTransaction {
                currency: Some("usd".to_string()),
                note: Some("   ".to_string()),
                ..income(500, 0)
            },
        )
        .await
        .unwrap();
    assert_eq!(tx.currency, "USD");
    assert_eq!(tx.note, None);
}

#[tokio::test]
async fn create_rejects_bad_amounts_and_missing_workspace() {
    let (engine, _db) = engine_with_db().await;
    let (ws, user) = workspace_with_owner(&engine, "").await;

    for amount in [0, -100, MAX_AMOUNT_MINOR + 1, i64::MAX] {
        let err = engine
            .create_transaction(ws, user, expense(amount, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{amount}");
    }
    engine
        .create_transaction(ws, user, expense(MAX_AMOUNT_MINOR, 0))
        .await
        .unwrap();

    let err = engine
        .create_transaction(Uuid::new_v4(), user, expense(100, 0))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("workspace".to_string()));
}

#[tokio::test]
async fn create_checks_the_category() {
    let (engine, _db) = engine_with_db().await;
    let (ws, user) = workspace_with_owner(&engine, "").await;
    let food = engine
        .create_category(ws, "Food", TransactionKind::Expense)
        .await
        .unwrap();

    let tx = engine
        .create_transaction(
            ws,
            user,
            NewTransaction {
                category_id: Some(food.id),
                ..expense(100, 0)
            },
        )
        .await
        .unwrap();
    assert_eq!(tx.category_id, Some(food.id));

    let err = engine
        .create_transaction(
            ws,
            user,
            NewTransaction {
                category_id: Some(food.id),
                ..income(100, 0)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_transaction(
            ws,
            user,
            NewTransaction {
                category_id: Some(Uuid::new_v4()),
                ..expense(100, 0)
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("category".to_string()));
}

#[tokio::test]
async fn list_is_newest_first_and_filters() {
    let (engine, _db) = engine_with_db().await;
    let (ws, user) = workspace_with_owner(&engine, "").await;

    let old = engine
        .create_transaction(ws, user, expense(100, 10))
        .await
        .unwrap();
    let mid = engine
        .create_transaction(ws, user, income(900, 5))
        .await
        .unwrap();
    let new = engine
        .create_transaction(
            ws,
            user,
            NewTransaction {
                currency: Some("EUR".to_string()),
                ..expense(300, 1)
            },
        )
        .await
        .unwrap();

    let all = engine
        .list_transactions(ws, &TransactionFilter::default())
        .await
        .unwrap();
    let ids: Vec<_> = all.iter().map(|t| t.id).collect();
    assert_eq!(ids, [new.id, mid.id, old.id]);

    let expenses = engine
        .list_transactions(
            ws,
            &TransactionFilter {
                kind: Some(TransactionKind::Expense),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(expenses.len(), 2);

    let euros = engine
        .list_transactions(
            ws,
            &TransactionFilter {
                currency: Some(" eur".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(euros.len(), 1);
    assert_eq!(euros[0].id, new.id);

    let window = engine
        .list_transactions(
            ws,
            &TransactionFilter {
                from: Some(Utc::now() - Duration::days(7)),
                to: Some(Utc::now() - Duration::days(2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, mid.id);

    let limited = engine
        .list_transactions(
            ws,
            &TransactionFilter {
                limit: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, new.id);
}

#[tokio::test]
async fn summary_totals_income_and_expense() {
    let (engine, _db) = engine_with_db().await;
    let (ws, user) = workspace_with_owner(&engine, "").await;

    engine.create_transaction(ws, user, income(10_000, 3)).await.unwrap();
    engine.create_transaction(ws, user, expense(2_500, 2)).await.unwrap();
    engine.create_transaction(ws, user, expense(1_000, 1)).await.unwrap();

    let summary = engine
        .summary(ws, &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(summary.currency, "UAH");
    assert_eq!(summary.income_minor, 10_000);
    assert_eq!(summary.expense_minor, 3_500);
    assert_eq!(summary.balance_minor, 6_500);
    assert_eq!(summary.count, 3);

    let err = engine
        .summary(Uuid::new_v4(), &TransactionFilter::default())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("workspace".to_string()));
}

#[tokio::test]
async fn summary_never_mixes_currencies() {
    let (engine, _db) = engine_with_db().await;
    let (ws, user) = workspace_with_owner(&engine, "usd").await;

    engine.create_transaction(ws, user, income(10_000, 2)).await.unwrap();
    engine.create_transaction(ws, user, expense(1_000, 1)).await.unwrap();
    for tx in [income(700, 2), expense(200, 1), expense(50, 1)] {
        engine
            .create_transaction(
                ws,
                user,
                NewTransaction {
                    currency: Some("EUR".to_string()),
                    ..tx
                },
            )
            .await
            .unwrap();
    }

    let usd = engine
        .summary(ws, &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(usd.currency, "USD");
    assert_eq!(usd.income_minor, 10_000);
    assert_eq!(usd.expense_minor, 1_000);
    assert_eq!(usd.count, 2);

    let eur = engine
        .summary(
            ws,
            &TransactionFilter {
                currency: Some("eur".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(eur.currency, "EUR");
    assert_eq!(eur.income_minor, 700);
    assert_eq!(eur.expense_minor, 250);
    assert_eq!(eur.balance_minor, 450);
    assert_eq!(eur.count, 3);

    let err = engine
        .summary(
            ws,
            &TransactionFilter {
                currency: Some("euro".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn summary_overflow_is_an_error_not_a_wrap() {
    let (engine, db) = engine_with_db().await;
    let (ws, user) = workspace_with_owner(&engine, "").await;

    engine.create_transaction(ws, user, income(1, 2)).await.unwrap();
    engine.create_transaction(ws, user, income(2, 1)).await.unwrap();
    // Rows written before the amount cap existed can still hold anything.
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE transactions SET amount_minor = ? WHERE amount_minor = ?",
        vec![i64::MAX.into(), 2i64.into()],
    ))
    .await
    .unwrap();

    let err = engine
        .summary(ws, &TransactionFilter::default())
        .await
        .unwrap_err();
    assert!(err.is_internal(), "{err:?}");
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let (ws, _user) = workspace_with_owner(&engine, "").await;
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

    let err = engine
        .summary(
            ws,
            &TransactionFilter {
                from: Some(at),
                to: Some(at),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
