use cashubux_ledger::{LedgerConfig, draw_prize};
use rand::{SeedableRng as _, rngs::StdRng};

/// Test prize draw frequencies → weight / total_weight
///
/// Should test:
/// - Over many draws each prize of the default table converges to its share
#[test]
fn test_spin_distribution() {
    let config = LedgerConfig::default();
    let total = f64::from(config.total_prize_weight());
    let mut rng = StdRng::seed_from_u64(2026);

    let draws = 200_000;
    let mut counts = vec![0usize; config.prize_table.len()];
    for _ in 0..draws {
        let prize = draw_prize(&config.prize_table, &mut rng).unwrap();
        let index = config
            .prize_table
            .iter()
            .position(|p| p.label == prize.label)
            .unwrap();
        counts[index] += 1;
    }

    for (prize, count) in config.prize_table.iter().zip(counts) {
        let expected = f64::from(prize.weight) / total;
        let observed = count as f64 / draws as f64;
        assert!(
            (observed - expected).abs() < 0.005,
            "{}: observed {observed:.4}, expected {expected:.4}",
            prize.label
        );
    }

    println!("✅ Spin draw frequencies match prize weights");
}
