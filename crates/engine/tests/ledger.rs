use chrono::{Duration, TimeZone, Utc};
use sea_orm::Database;

use engine::{Engine, EngineError, MoneyCents, TransactionKind};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build()
}

#[tokio::test]
async fn deposit_then_withdraw_matches_history() {
    let engine = engine_with_db().await;
    let account = engine.create_account("Ada", Utc::now()).await.unwrap();
    let t0 = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();

    let tx = engine
        .deposit(account.id, MoneyCents::new(5000), t0, None)
        .await
        .unwrap();
    assert_eq!(tx.kind, TransactionKind::Deposit);
    assert_eq!(tx.amount, MoneyCents::new(5000));
    assert_eq!(tx.balance_after, MoneyCents::new(5000));

    let tx = engine
        .withdraw(account.id, MoneyCents::new(2000), t0 + Duration::minutes(1), None)
        .await
        .unwrap();
    assert_eq!(tx.kind, TransactionKind::Withdrawal);
    assert_eq!(tx.balance_after, MoneyCents::new(3000));

    let err = engine
        .withdraw(account.id, MoneyCents::new(3100), t0 + Duration::minutes(2), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    // The failed withdrawal left no trace.
    let account = engine.account(account.id).await.unwrap();
    assert_eq!(account.balance, MoneyCents::new(3000));
    let txs = engine.transactions(account.id).await.unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].balance_after, account.balance);
}

#[tokio::test]
async fn balance_equals_fold_of_log() {
    let engine = engine_with_db().await;
    let account = engine.create_account("Ada", Utc::now()).await.unwrap();
    let t0 = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();

    engine
        .deposit(account.id, MoneyCents::new(1234), t0, None)
        .await
        .unwrap();
    engine
        .deposit(
            account.id,
            MoneyCents::new(555),
            t0 + Duration::minutes(1),
            Some("pocket money"),
        )
        .await
        .unwrap();
    engine
        .withdraw(account.id, MoneyCents::new(789), t0 + Duration::minutes(2), None)
        .await
        .unwrap();
    engine
        .credit_interest(account.id, MoneyCents::new(100), t0 + Duration::minutes(3), None)
        .await
        .unwrap();

    let account = engine.account(account.id).await.unwrap();
    let txs = engine.transactions(account.id).await.unwrap();

    let fold = txs
        .iter()
        .fold(MoneyCents::ZERO, |sum, tx| sum + tx.signed_amount());
    assert_eq!(fold, account.balance);
    assert_eq!(account.balance, MoneyCents::new(1100));
    assert_eq!(txs[0].balance_after, account.balance);
}

#[tokio::test]
async fn rejects_non_positive_amounts() {
    let engine = engine_with_db().await;
    let account = engine.create_account("Ada", Utc::now()).await.unwrap();

    for amount in [MoneyCents::ZERO, MoneyCents::new(-100)] {
        let err = engine
            .deposit(account.id, amount, Utc::now(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));

        let err = engine
            .withdraw(account.id, amount, Utc::now(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    assert!(engine.transactions(account.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let engine = engine_with_db().await;
    let missing = Uuid::new_v4();

    let err = engine
        .deposit(missing, MoneyCents::new(100), Utc::now(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AccountNotFound(_)));

    let err = engine.transactions(missing).await.unwrap_err();
    assert!(matches!(err, EngineError::AccountNotFound(_)));
}

#[tokio::test]
async fn create_account_trims_name() {
    let engine = engine_with_db().await;
    let account = engine.create_account("  Ada  ", Utc::now()).await.unwrap();
    assert_eq!(account.name, "Ada");
    assert_eq!(account.balance, MoneyCents::ZERO);
    assert_eq!(account.interest_rate, 0.0);
    assert!(account.last_interest_at.is_none());

    let found = engine.account_by_name("ada").await.unwrap();
    assert_eq!(found.id, account.id);
}

#[tokio::test]
async fn interest_rate_must_be_a_finite_non_negative_number() {
    let engine = engine_with_db().await;
    let account = engine.create_account("Ada", Utc::now()).await.unwrap();

    for rate in [-0.01, f64::NAN, f64::INFINITY] {
        let err = engine
            .update_interest_rate(account.id, rate)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRate(_)));
    }

    let account = engine.update_interest_rate(account.id, 0.05).await.unwrap();
    assert_eq!(account.interest_rate, 0.05);
}

#[tokio::test]
async fn transactions_list_newest_first() {
    let engine = engine_with_db().await;
    let account = engine.create_account("Ada", Utc::now()).await.unwrap();

    let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap();
    let t3 = Utc.with_ymd_and_hms(2026, 1, 3, 9, 0, 0).unwrap();

    engine
        .deposit(account.id, MoneyCents::new(1000), t1, None)
        .await
        .unwrap();
    engine
        .deposit(account.id, MoneyCents::new(2000), t3, None)
        .await
        .unwrap();
    engine
        .withdraw(account.id, MoneyCents::new(500), t2, None)
        .await
        .unwrap();

    let txs = engine.transactions(account.id).await.unwrap();
    let timestamps: Vec<_> = txs.iter().map(|tx| tx.timestamp).collect();
    assert_eq!(timestamps, vec![t3, t2, t1]);
}

#[tokio::test]
async fn credit_interest_does_not_touch_accrual_date() {
    let engine = engine_with_db().await;
    let account = engine.create_account("Ada", Utc::now()).await.unwrap();

    let tx = engine
        .credit_interest(
            account.id,
            MoneyCents::new(42),
            Utc::now(),
            Some("Interest payment"),
        )
        .await
        .unwrap();
    assert_eq!(tx.kind, TransactionKind::Interest);

    let account = engine.account(account.id).await.unwrap();
    assert_eq!(account.balance, MoneyCents::new(42));
    assert!(account.last_interest_at.is_none());
}

#[tokio::test]
async fn clear_transactions_resets_the_account() {
    let engine = engine_with_db().await;
    let account = engine.create_account("Ada", Utc::now()).await.unwrap();

    engine
        .deposit(account.id, MoneyCents::new(1000), Utc::now(), None)
        .await
        .unwrap();
    engine
        .credit_interest(account.id, MoneyCents::new(50), Utc::now(), None)
        .await
        .unwrap();

    engine.clear_transactions(account.id).await.unwrap();

    let account = engine.account(account.id).await.unwrap();
    assert_eq!(account.balance, MoneyCents::ZERO);
    assert!(account.last_interest_at.is_none());
    assert!(engine.transactions(account.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_deposits_serialize_per_account() {
    let engine = engine_with_db().await;
    let account = engine.create_account("Ada", Utc::now()).await.unwrap();

    let (a, b, c) = tokio::join!(
        engine.deposit(account.id, MoneyCents::new(100), Utc::now(), None),
        engine.deposit(account.id, MoneyCents::new(200), Utc::now(), None),
        engine.deposit(account.id, MoneyCents::new(300), Utc::now(), None),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let account = engine.account(account.id).await.unwrap();
    assert_eq!(account.balance, MoneyCents::new(600));
    assert_eq!(engine.transactions(account.id).await.unwrap().len(), 3);
}
