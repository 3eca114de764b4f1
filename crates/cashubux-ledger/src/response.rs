use serde::Serialize;

use crate::{
    AccountSnapshot, ClaimReceipt, DailyClaimReceipt, DepositReceipt, LedgerError, LedgerResult,
    QuestClaim, ReferralClaim, Registration, SpinOutcome, SpinPurchase, WithdrawalReceipt,
};

/// Wire shape of every operation result: `{success, message, user}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AccountSnapshot>,
}

/// Operation results that can be reported back to the client.
pub trait Reportable {
    fn message(&self) -> String;
    fn snapshot(&self) -> Option<&AccountSnapshot>;
}

impl Envelope {
    pub fn ok<R: Reportable>(result: &R) -> Self {
        Self {
            success: true,
            message: result.message(),
            user: result.snapshot().cloned(),
        }
    }

    pub fn error(err: &LedgerError) -> Self {
        let message = if err.is_fatal() {
            "Internal error, please try again later".to_string()
        } else {
            err.to_string()
        };
        Self {
            success: false,
            message,
            user: None,
        }
    }

    pub fn from_result<R: Reportable>(result: &LedgerResult<R>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(err) => Self::error(err),
        }
    }
}

impl Reportable for AccountSnapshot {
    fn message(&self) -> String {
        "OK".to_string()
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(self)
    }
}

impl Reportable for Registration {
    fn message(&self) -> String {
        if self.is_new {
            format!("Welcome, {}!", self.account.name)
        } else {
            format!("Welcome back, {}!", self.account.name)
        }
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(&self.account)
    }
}

impl Reportable for ClaimReceipt {
    fn message(&self) -> String {
        format!("Task completed! +{} coins and 1 spin", self.reward)
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(&self.account)
    }
}

impl Reportable for DailyClaimReceipt {
    fn message(&self) -> String {
        if self.spin_granted {
            format!("Daily task completed! +{} coins and 1 spin", self.reward)
        } else {
            format!("Daily task completed! +{} coins", self.reward)
        }
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(&self.account)
    }
}

impl Reportable for SpinOutcome {
    fn message(&self) -> String {
        if self.bonus_spins > 0 {
            format!("You won {} and {} bonus spins!", self.prize.label, self.bonus_spins)
        } else {
            format!("You won {}!", self.prize.label)
        }
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(&self.account)
    }
}

impl Reportable for SpinPurchase {
    fn message(&self) -> String {
        if self.pending_verification {
            format!("{} spins added, payment is being verified", self.spins_added)
        } else {
            format!("{} spins added", self.spins_added)
        }
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(&self.account)
    }
}

impl Reportable for DepositReceipt {
    fn message(&self) -> String {
        format!("Deposit of {} recorded", self.transaction.amount)
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(&self.account)
    }
}

impl Reportable for WithdrawalReceipt {
    fn message(&self) -> String {
        if self.requires_approval {
            "Withdrawal request submitted for approval".to_string()
        } else {
            "Withdrawal submitted".to_string()
        }
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(&self.account)
    }
}

impl Reportable for QuestClaim {
    fn message(&self) -> String {
        format!("Quest reward claimed! +{} coins", self.reward)
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(&self.account)
    }
}

impl Reportable for ReferralClaim {
    fn message(&self) -> String {
        format!("Claimed {} coins from referrals", self.claimed)
    }

    fn snapshot(&self) -> Option<&AccountSnapshot> {
        Some(&self.account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{register, test_ledger};

    #[tokio::test]
    async fn test_envelope_shapes() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;

        let result = ledger.watch_ad_for_spin(1).await;
        let envelope = Envelope::from_result(&result);
        assert!(envelope.success);
        assert_eq!(envelope.user.as_ref().map(|u| u.spin_tokens), Some(11));

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["user"]["spinTokens"], 11);
        assert_eq!(json["user"]["adsWatchedToday"], 1);

        let result = ledger.claim_referral_earnings(1).await;
        let envelope = Envelope::from_result(&result);
        assert!(!envelope.success);
        assert_eq!(envelope.message, "No earnings to claim");
        assert!(serde_json::to_value(&envelope).unwrap().get("user").is_none());
    }
}
