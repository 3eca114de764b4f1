use cashubux_chain::CollaboratorError;
use cashubux_ledger::{LedgerError, NewCampaignKind};
use cashubux_testing::TestFixture;
use rust_decimal::dec;

/// Test subscription-checked social task → claim requires channel membership
///
/// Should test:
/// - Start is allowed without membership
/// - Claim fails with ValidationFailed while not a member, and pays nothing
/// - A membership service outage surfaces as a collaborator error
/// - After joining, the claim succeeds
#[tokio::test]
async fn test_social_membership_gate() {
    let test = TestFixture::new().await;
    test.register(1, None).await;
    test.register(2, None).await;

    let campaign = test
        .create_campaign(
            1,
            NewCampaignKind::Social {
                requires_subscription_check: true,
            },
            "https://t.me/cashubux_news?boost",
            10,
            dec!(10),
        )
        .await;

    test.ledger.start_task(2, campaign.id).await.unwrap();
    let before = test.account(2).await;

    let err = test.ledger.claim_task(2, campaign.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::ValidationFailed(_)));
    assert_eq!(test.account(2).await, before);

    test.membership.set_unavailable(true);
    let err = test.ledger.claim_task(2, campaign.id).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Collaborator(CollaboratorError::Transient(_))
    ));
    test.membership.set_unavailable(false);

    test.membership.join("cashubux_news", 2);
    let receipt = test.ledger.claim_task(2, campaign.id).await.unwrap();
    assert_eq!(receipt.reward, 400_000);
    assert_eq!(receipt.account.total_social_tasks_completed, 1);

    println!("✅ Membership gate enforced at claim time");
}
