use cashubux_chain::CollaboratorError;
use cashubux_ledger::{DepositMethod, JobOutcome};
use cashubux_testing::TestFixture;
use rust_decimal::dec;

/// Test verifier timing out then confirming → deposit completes after retry
///
/// Should test:
/// - Transient collaborator errors are retried
/// - The eventual answer decides the outcome
/// - A verifier that keeps failing ends in reversal, not a stuck row
#[tokio::test]
async fn test_verification_retries_transient() {
    let mut test = TestFixture::new().await;
    test.register(1, None).await;

    test.verifier.script(
        "0xslow",
        vec![
            Err(CollaboratorError::Transient("timeout".to_string())),
            Ok(true),
        ],
    );
    test.ledger
        .deposit(
            1,
            dec!(1),
            DepositMethod::Blockchain {
                external_ref: "0xslow".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(test.drain_one().await, JobOutcome::Completed);
    assert_eq!(test.verifier.calls(), 2);

    let down = || Err(CollaboratorError::Transient("down".to_string()));
    test.verifier.script("0xdown", vec![down(), down(), down()]);
    test.ledger
        .deposit(
            1,
            dec!(1),
            DepositMethod::Blockchain {
                external_ref: "0xdown".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(matches!(test.drain_one().await, JobOutcome::Reversed { .. }));
    assert_eq!(test.account(1).await.ad_credit, dec!(1));

    println!("✅ Transient verifier errors retried before settling");
}
