use cashubux_entities::sea_orm_active_enums::{Currency, TransactionStatus};
use cashubux_ledger::{JobOutcome, SpinPayment};
use cashubux_testing::TestFixture;
use rust_decimal::dec;

/// Test on-chain spin purchase that fails verification → bonus spins clawed back
///
/// Should test:
/// - Package spins plus the 10% bonus are credited optimistically
/// - A rejected payment reverses only what is still there
/// - The shortfall is recorded and balances never go negative
#[tokio::test]
async fn test_blockchain_spin_purchase_reversal() {
    let mut test = TestFixture::new().await;
    test.register(1, None).await;
    test.verifier.reject("0xspins");

    let purchase = test
        .ledger
        .buy_spins(
            1,
            "sp50",
            SpinPayment::Blockchain {
                external_ref: "0xspins".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(purchase.spins_added, 55);
    assert_eq!(purchase.account.spin_tokens, 65);

    // Spend most of them before the verifier answers.
    test.ledger
        .debit(1, Currency::Spins, dec!(60), "spent")
        .await
        .unwrap();

    let outcome = test.drain_one().await;
    assert_eq!(
        outcome,
        JobOutcome::Reversed {
            reversed: dec!(5),
            shortfall: dec!(50),
        }
    );
    assert_eq!(test.account(1).await.spin_tokens, 0);

    let failed = test.ledger.transaction(purchase.transaction_id).await.unwrap();
    assert_eq!(failed.status, TransactionStatus::Failed);
    assert!(failed.note.unwrap().contains("insufficient user balance"));

    println!("✅ Failed spin payment reversed within the available balance");
}
