use cashubux_entities::sea_orm_active_enums::PrizeType;
use rust_decimal::Decimal;
use rust_decimal::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::LedgerResult;

/// Economy and pipeline settings. Every field has a default, so an empty
/// YAML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Coins per 1 unit of crypto.
    #[serde(default = "default_conversion_rate")]
    pub conversion_rate: i64,

    /// Share of `cost / goal` paid to the user completing a campaign.
    #[serde(default = "default_task_payout_share")]
    pub task_payout_share: Decimal,

    #[serde(default = "default_referral_commission")]
    pub referral_commission: Decimal,

    #[serde(default = "default_daily_cap")]
    pub daily_task_spin_cap: i32,

    #[serde(default = "default_daily_cap")]
    pub daily_ad_cap: i32,

    #[serde(default = "default_welcome_spins")]
    pub welcome_spins: i64,

    #[serde(default = "default_jackpot_bonus_spins")]
    pub jackpot_bonus_spins: i64,

    #[serde(default = "default_jackpot_label")]
    pub jackpot_label: String,

    /// Extra spins granted on on-chain spin purchases.
    #[serde(default = "default_blockchain_spin_bonus")]
    pub blockchain_spin_bonus: Decimal,

    #[serde(default = "default_spin_packages")]
    pub spin_packages: Vec<SpinPackage>,

    #[serde(default = "default_prize_table")]
    pub prize_table: Vec<Prize>,

    #[serde(default)]
    pub verification: VerificationSettings,

    #[serde(default)]
    pub withdrawals: WithdrawalSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinPackage {
    pub id: String,
    pub spins: i64,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prize {
    pub label: String,
    #[serde(rename = "type")]
    pub prize_type: PrizeType,
    pub value: Decimal,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSettings {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
        }
    }
}

/// Passed explicitly into `withdraw`; operators flip it without a restart by
/// handing in a different value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalSettings {
    #[serde(default)]
    pub auto_withdrawals: bool,
}

fn default_conversion_rate() -> i64 {
    1_000_000
}

fn default_task_payout_share() -> Decimal {
    dec!(0.4)
}

fn default_referral_commission() -> Decimal {
    dec!(0.10)
}

fn default_daily_cap() -> i32 {
    50
}

fn default_welcome_spins() -> i64 {
    10
}

fn default_jackpot_bonus_spins() -> i64 {
    5
}

fn default_jackpot_label() -> String {
    "Jackpot!".to_string()
}

fn default_blockchain_spin_bonus() -> Decimal {
    dec!(0.10)
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_workers() -> usize {
    4
}

fn default_spin_packages() -> Vec<SpinPackage> {
    [
        ("sp10", 10, dec!(0.02)),
        ("sp50", 50, dec!(0.1)),
        ("sp100", 100, dec!(0.2)),
        ("sp500", 500, dec!(1.0)),
        ("sp1000", 1_000, dec!(2.0)),
        ("sp5000", 5_000, dec!(10.0)),
        ("sp10000", 10_000, dec!(20.0)),
        ("sp50000", 50_000, dec!(100.0)),
    ]
    .into_iter()
    .map(|(id, spins, cost)| SpinPackage {
        id: id.to_string(),
        spins,
        cost,
    })
    .collect()
}

fn default_prize_table() -> Vec<Prize> {
    use PrizeType::*;
    [
        ("100 Coins", Coins, dec!(100), 25),
        ("250 Coins", Coins, dec!(250), 20),
        ("500 Coins", Coins, dec!(500), 12),
        ("1000 Coins", Coins, dec!(1000), 8),
        ("1 Spin", Spins, dec!(1), 15),
        ("2 Spins", Spins, dec!(2), 8),
        ("5 Spins", Spins, dec!(5), 3),
        ("0.001 TON", Ton, dec!(0.001), 4),
        ("0.005 TON", Ton, dec!(0.005), 2),
        ("0.01 TON", Ton, dec!(0.01), 1),
        ("Better luck!", Nothing, dec!(0), 1),
        ("Jackpot!", Coins, dec!(2000), 1),
    ]
    .into_iter()
    .map(|(label, prize_type, value, weight)| Prize {
        label: label.to_string(),
        prize_type,
        value,
        weight,
    })
    .collect()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            conversion_rate: default_conversion_rate(),
            task_payout_share: default_task_payout_share(),
            referral_commission: default_referral_commission(),
            daily_task_spin_cap: default_daily_cap(),
            daily_ad_cap: default_daily_cap(),
            welcome_spins: default_welcome_spins(),
            jackpot_bonus_spins: default_jackpot_bonus_spins(),
            jackpot_label: default_jackpot_label(),
            blockchain_spin_bonus: default_blockchain_spin_bonus(),
            spin_packages: default_spin_packages(),
            prize_table: default_prize_table(),
            verification: VerificationSettings::default(),
            withdrawals: WithdrawalSettings::default(),
        }
    }
}

impl LedgerConfig {
    pub fn from_yaml_str(yaml: &str) -> LedgerResult<Self> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn spin_package(&self, id: &str) -> Option<&SpinPackage> {
        self.spin_packages.iter().find(|p| p.id == id)
    }

    pub fn total_prize_weight(&self) -> u32 {
        self.prize_table.iter().map(|p| p.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.conversion_rate, 1_000_000);
        assert_eq!(config.task_payout_share, dec!(0.4));
        assert_eq!(config.daily_task_spin_cap, 50);
        assert_eq!(config.welcome_spins, 10);
        assert_eq!(config.prize_table.len(), 12);
        assert_eq!(config.total_prize_weight(), 100);
        assert_eq!(config.spin_package("sp100").unwrap().cost, dec!(0.2));
        assert!(!config.withdrawals.auto_withdrawals);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(
            LedgerConfig::from_yaml_str("").unwrap(),
            LedgerConfig::default()
        );
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
conversion_rate: 1000
withdrawals:
  auto_withdrawals: true
prize_table:
  - label: "Everything"
    type: coins
    value: 5
    weight: 1
"#;
        let config = LedgerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.conversion_rate, 1000);
        assert!(config.withdrawals.auto_withdrawals);
        assert_eq!(config.prize_table.len(), 1);
        assert_eq!(config.prize_table[0].prize_type, PrizeType::Coins);
        assert_eq!(config.daily_ad_cap, 50);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(LedgerConfig::from_yaml_str("conversion_rat: 5").is_err());
    }
}
