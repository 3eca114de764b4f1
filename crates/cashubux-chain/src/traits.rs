use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::CollaboratorResult;

/// Telegram-side membership lookups used by claim-time validation.
#[async_trait]
pub trait MembershipCheck: Send + Sync {
    /// Whether `user_id` is currently a member of `channel` (handle without `@`).
    async fn is_member(&self, channel: &str, user_id: i64) -> CollaboratorResult<bool>;

    /// Whether `user_id` has started the bot `bot_username`.
    async fn has_started_bot(&self, bot_username: &str, user_id: i64) -> CollaboratorResult<bool>;
}

/// Confirms on-chain deposits.
#[async_trait]
pub trait BlockchainVerifier: Send + Sync {
    /// Whether `reference` is a settled transfer of `expected_amount` to the platform wallet.
    async fn verify(&self, reference: &str, expected_amount: Decimal) -> CollaboratorResult<bool>;
}

/// Sends payouts from the platform hot wallet.
#[async_trait]
pub trait BlockchainTransfer: Send + Sync {
    async fn wallet_balance(&self) -> CollaboratorResult<Decimal>;

    /// Sends `amount` to `destination` and returns the external transaction reference.
    async fn send(
        &self,
        destination: &str,
        amount: Decimal,
        memo: &str,
    ) -> CollaboratorResult<String>;
}
