use cashubux_chain::CollaboratorError;
use cashubux_entities::sea_orm_active_enums::{Currency, TransactionStatus};
use rust_decimal::Decimal;

use crate::database::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Account {0} not found")]
    AccountNotFound(i64),

    #[error("Campaign {0} not found")]
    CampaignNotFound(i64),

    #[error("Daily task {0} not found")]
    DailyTaskNotFound(i64),

    #[error("Quest {0} not found")]
    QuestNotFound(String),

    #[error("Transaction {0} not found")]
    TransactionNotFound(i64),

    #[error("Task already completed")]
    AlreadyCompleted,

    #[error("Task already claimed")]
    AlreadyClaimed,

    #[error("Task not started")]
    NotStarted,

    #[error("Quest not completed: {current}/{target}")]
    NotCompleted { current: i32, target: i32 },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Reach level {required} in the game to claim rewards")]
    LevelNotReached { required: i32 },

    #[error("Insufficient {currency:?} balance: need {required}, have {available}")]
    InsufficientBalance {
        currency: Currency,
        required: Decimal,
        available: Decimal,
    },

    #[error("Insufficient coins: need {required} coins, have {available}")]
    InsufficientCoins { required: i64, available: i64 },

    #[error("No spins left")]
    NoSpinsLeft,

    #[error("Daily {what} limit reached ({limit} per day)")]
    DailyLimitReached { what: &'static str, limit: i32 },

    #[error("Wallet address not set")]
    NoWalletAddress,

    #[error("No earnings to claim")]
    NoEarnings,

    #[error("External reference {0} is already attached to another transaction")]
    DoubleSpend(String),

    #[error("Transaction {id} is {status:?}, expected {expected}")]
    InvalidTransition {
        id: i64,
        status: TransactionStatus,
        expected: &'static str,
    },

    #[error("Unknown spin package {0}")]
    UnknownPackage(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Decimal(#[from] rust_decimal::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SeaOrm(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// Repeated or out-of-order requests. Reported as a normal negative outcome.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            LedgerError::AlreadyCompleted
                | LedgerError::AlreadyClaimed
                | LedgerError::NotStarted
                | LedgerError::NotCompleted { .. }
                | LedgerError::NoEarnings
                | LedgerError::DoubleSpend(_)
                | LedgerError::InvalidTransition { .. }
        )
    }

    pub fn is_insufficient_balance(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientBalance { .. }
                | LedgerError::InsufficientCoins { .. }
                | LedgerError::NoSpinsLeft
        )
    }

    /// Bad input or a failed claim gate. Never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_)
                | LedgerError::ValidationFailed(_)
                | LedgerError::LevelNotReached { .. }
                | LedgerError::DailyLimitReached { .. }
                | LedgerError::NoWalletAddress
                | LedgerError::UnknownPackage(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountNotFound(_)
                | LedgerError::CampaignNotFound(_)
                | LedgerError::DailyTaskNotFound(_)
                | LedgerError::QuestNotFound(_)
                | LedgerError::TransactionNotFound(_)
        )
    }

    /// Anything the caller cannot act on: storage, configuration, collaborator outages.
    pub fn is_fatal(&self) -> bool {
        !(self.is_state_conflict()
            || self.is_insufficient_balance()
            || self.is_validation()
            || self.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifiers_are_disjoint() {
        let conflict = LedgerError::AlreadyClaimed;
        assert!(conflict.is_state_conflict());
        assert!(!conflict.is_fatal());

        let broke = LedgerError::InsufficientCoins {
            required: 10,
            available: 3,
        };
        assert!(broke.is_insufficient_balance());
        assert!(!broke.is_state_conflict());

        let gate = LedgerError::ValidationFailed("not a member".to_string());
        assert!(gate.is_validation());

        let db = LedgerError::SeaOrm(sea_orm::DbErr::Custom("boom".to_string()));
        assert!(db.is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = LedgerError::DailyLimitReached {
            what: "ad",
            limit: 50,
        };
        assert_eq!(err.to_string(), "Daily ad limit reached (50 per day)");
        assert_eq!(
            LedgerError::LevelNotReached { required: 7 }.to_string(),
            "Reach level 7 in the game to claim rewards"
        );
    }
}
