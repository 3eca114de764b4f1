use cashubux_entities::sea_orm_active_enums::PrizeType;
use cashubux_ledger::{LedgerConfig, LedgerError, Prize};
use cashubux_testing::TestFixture;
use rand::{SeedableRng as _, rngs::StdRng};
use rust_decimal::dec;

/// Test jackpot-only prize table → coins plus bonus spins, one history row per spin
///
/// Should test:
/// - The jackpot label adds the configured bonus spins
/// - TON prizes credit ad-credit
/// - Each spin appends a history row
/// - Spinning with no tokens fails with NoSpinsLeft
#[tokio::test]
async fn test_spin_jackpot_and_history() {
    let config = LedgerConfig {
        prize_table: vec![Prize {
            label: "Jackpot!".to_string(),
            prize_type: PrizeType::Coins,
            value: dec!(2000),
            weight: 1,
        }],
        ..LedgerConfig::default()
    };
    let test = TestFixture::with_config(config).await;
    test.register(1, None).await;
    let mut rng = StdRng::seed_from_u64(1);

    let outcome = test.ledger.spin_with_rng(1, &mut rng).await.unwrap();
    assert_eq!(outcome.bonus_spins, 5);
    assert_eq!(outcome.account.coins, 2000);
    assert_eq!(outcome.account.spin_tokens, 10 - 1 + 5);

    let config = LedgerConfig {
        prize_table: vec![Prize {
            label: "0.01 TON".to_string(),
            prize_type: PrizeType::Ton,
            value: dec!(0.01),
            weight: 1,
        }],
        welcome_spins: 2,
        ..LedgerConfig::default()
    };
    let test = TestFixture::with_config(config).await;
    test.register(2, None).await;

    test.ledger.spin_with_rng(2, &mut rng).await.unwrap();
    let last = test.ledger.spin_with_rng(2, &mut rng).await.unwrap();
    assert_eq!(last.account.ad_credit, dec!(0.02));
    assert_eq!(last.account.spin_tokens, 0);

    assert!(matches!(
        test.ledger.spin_with_rng(2, &mut rng).await,
        Err(LedgerError::NoSpinsLeft)
    ));
    let history = test.ledger.spin_history(2, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|h| h.prize_type == PrizeType::Ton));

    println!("✅ Spin payouts and history recorded");
}
