use cashubux_entities::accounts;
use cashubux_ledger::NewAccount;
use cashubux_testing::TestFixture;
use sea_orm::{EntityTrait as _, PaginatorTrait as _};

/// Test two concurrent first-auth requests for one identity → one account row
///
/// Should test:
/// - Both registrations succeed
/// - Exactly one of them reports a new account
/// - Both callers see the same account data
/// - The referrer is credited once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration() {
    let test = TestFixture::new().await;
    test.register(1, None).await;

    let new = || NewAccount {
        id: 42,
        name: "racer".to_string(),
        referred_by: Some(1),
    };
    let (first, second) = futures::join!(
        test.ledger.register_account(new()),
        test.ledger.register_account(new())
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first.is_new, second.is_new);
    assert_eq!(first.account, second.account);

    let rows = accounts::Entity::find().count(test.ledger.db()).await.unwrap();
    assert_eq!(rows, 2);
    assert_eq!(test.account(1).await.referral_count, 1);

    println!("✅ Concurrent registration converged on one account");
}
