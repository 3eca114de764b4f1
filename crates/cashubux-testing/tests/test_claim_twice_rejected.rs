use cashubux_ledger::{LedgerError, NewCampaignKind};
use cashubux_testing::TestFixture;
use rust_decimal::dec;

/// Test claiming the same campaign twice → AlreadyClaimed, no second reward
///
/// Should test:
/// - First claim pays out
/// - Second claim fails with AlreadyClaimed
/// - Balances and campaign completions are unchanged by the second attempt
#[tokio::test]
async fn test_claim_twice_rejected() {
    let test = TestFixture::new().await;
    test.register(1, None).await;
    test.register(2, None).await;

    let campaign = test
        .create_campaign(
            1,
            NewCampaignKind::Social {
                requires_subscription_check: false,
            },
            "https://t.me/news",
            5,
            dec!(5),
        )
        .await;

    let paid = test.complete_task(2, &campaign).await;

    let err = test.ledger.claim_task(2, campaign.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyClaimed));
    assert!(err.is_state_conflict());

    assert_eq!(test.account(2).await, paid);
    assert_eq!(test.ledger.campaign(campaign.id).await.unwrap().completions, 1);

    println!("✅ Second claim rejected without paying twice");
}
