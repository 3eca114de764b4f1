use cashubux_ledger::{LedgerError, NewCampaignKind};
use cashubux_testing::TestFixture;
use rust_decimal::dec;

/// Test referred account earning R coins → referrer gets floor(R * 0.10) and one spin
///
/// Should test:
/// - Linking credits the referrer one spin and a referral count
/// - A task payout credits claimable and lifetime referral earnings
/// - The referred account's own reward is not reduced
/// - Claiming moves earnings into coins exactly once
#[tokio::test]
async fn test_referral_commission() {
    let test = TestFixture::new().await;
    test.register(1, None).await;
    test.register(10, None).await;

    let referrer = test.account(10).await;
    let referred = test.register(11, Some(10)).await;
    assert_eq!(referred.referred_by, Some(10));

    let linked = test.account(10).await;
    assert_eq!(linked.referral_count, 1);
    assert_eq!(linked.spin_tokens, referrer.spin_tokens + 1);
    assert_eq!(linked.friends_invited_today_for_spin, 1);

    let campaign = test
        .create_campaign(
            1,
            NewCampaignKind::Social {
                requires_subscription_check: false,
            },
            "@channel",
            3,
            dec!(1),
        )
        .await;
    test.ledger.start_task(11, campaign.id).await.unwrap();
    let receipt = test.ledger.claim_task(11, campaign.id).await.unwrap();
    assert_eq!(receipt.reward, 133_333);
    assert_eq!(receipt.referral_bonus, Some(13_333));
    assert_eq!(receipt.account.coins, 133_333);

    let paid = test.account(10).await;
    assert_eq!(paid.referral_earnings, 13_333);
    assert_eq!(paid.total_referral_earnings, 13_333);
    assert_eq!(paid.spin_tokens, linked.spin_tokens + 1);
    assert_eq!(paid.coins, 0);

    let friends = test.ledger.referral_friends(10).await.unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].earnings_generated, 13_333);

    let claim = test.ledger.claim_referral_earnings(10).await.unwrap();
    assert_eq!(claim.claimed, 13_333);
    assert_eq!(claim.account.coins, 13_333);
    assert_eq!(claim.account.referral_earnings, 0);
    assert_eq!(claim.account.total_referral_earnings, 13_333);

    assert!(matches!(
        test.ledger.claim_referral_earnings(10).await,
        Err(LedgerError::NoEarnings)
    ));

    println!("✅ Referral commission credited to the referrer");
}
