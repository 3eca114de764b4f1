use cashubux_chain::CollaboratorError;
use cashubux_entities::sea_orm_active_enums::{Currency, TransactionStatus};
use cashubux_ledger::{JobOutcome, WithdrawalSettings};
use cashubux_testing::TestFixture;
use rust_decimal::dec;

/// Test approved withdrawal whose payout cannot be sent → FAILED, coins stay reserved
///
/// Should test:
/// - Hot wallet balance below the amount fails the payout without sending
/// - A rejected transfer fails the payout
/// - Neither failure refunds coins
#[tokio::test]
async fn test_withdrawal_payout_failure() {
    let mut test = TestFixture::new().await;
    test.register(1, None).await;
    test.ledger.set_wallet_address(1, "UQ-user").await.unwrap();
    test.fund(1, Currency::Coins, dec!(4000000)).await;
    let settings = WithdrawalSettings::default();

    test.transfer.set_balance(dec!(1));
    let big = test.ledger.withdraw(1, dec!(2), &settings).await.unwrap();
    test.ledger.approve_withdrawal(big.transaction.id).await.unwrap();
    assert!(matches!(
        test.drain_one().await,
        JobOutcome::PayoutFailed { .. }
    ));
    assert!(test.transfer.sent().is_empty());

    let failed = test.ledger.transaction(big.transaction.id).await.unwrap();
    assert_eq!(failed.status, TransactionStatus::Failed);
    assert!(failed.note.unwrap().contains("hot wallet"));

    test.transfer.set_balance(dec!(100));
    test.transfer
        .fail_next_send(CollaboratorError::Rejected("bad destination".to_string()));
    let small = test.ledger.withdraw(1, dec!(1), &settings).await.unwrap();
    test.ledger.approve_withdrawal(small.transaction.id).await.unwrap();
    assert!(matches!(
        test.drain_one().await,
        JobOutcome::PayoutFailed { .. }
    ));
    assert_eq!(
        test.ledger.transaction(small.transaction.id).await.unwrap().status,
        TransactionStatus::Failed
    );

    assert_eq!(test.account(1).await.coins, 1_000_000);

    println!("✅ Failed payouts marked FAILED without refund");
}
