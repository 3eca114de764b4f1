use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use cashubux_chain::{
    BlockchainTransfer, BlockchainVerifier, CollaboratorError, CollaboratorResult, MembershipCheck,
};
use rust_decimal::Decimal;

/// Membership lookups answered from in-memory sets.
#[derive(Debug, Default)]
pub struct ScriptedMembership {
    members: Mutex<HashSet<(String, i64)>>,
    bot_users: Mutex<HashSet<(String, i64)>>,
    unavailable: AtomicBool,
}

impl ScriptedMembership {
    pub fn join(&self, channel: &str, user_id: i64) {
        self.members
            .lock()
            .unwrap()
            .insert((channel.to_owned(), user_id));
    }

    pub fn start_bot(&self, bot: &str, user_id: i64) {
        self.bot_users
            .lock()
            .unwrap()
            .insert((bot.to_owned(), user_id));
    }

    /// Make every lookup fail with a transient error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self, set: &Mutex<HashSet<(String, i64)>>, name: &str, user_id: i64) -> CollaboratorResult<bool> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Transient("telegram unavailable".to_string()));
        }
        Ok(set.lock().unwrap().contains(&(name.to_owned(), user_id)))
    }
}

#[async_trait]
impl MembershipCheck for ScriptedMembership {
    async fn is_member(&self, channel: &str, user_id: i64) -> CollaboratorResult<bool> {
        self.check(&self.members, channel, user_id)
    }

    async fn has_started_bot(&self, bot_username: &str, user_id: i64) -> CollaboratorResult<bool> {
        self.check(&self.bot_users, bot_username, user_id)
    }
}

/// Verifier with per-reference scripted answers. Unscripted references are
/// answered with `accept_unknown` (true unless changed).
#[derive(Debug)]
pub struct ScriptedVerifier {
    scripts: Mutex<HashMap<String, VecDeque<CollaboratorResult<bool>>>>,
    accept_unknown: AtomicBool,
    calls: AtomicUsize,
}

impl Default for ScriptedVerifier {
    fn default() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            accept_unknown: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedVerifier {
    /// Answers for `reference`, consumed in order.
    pub fn script(&self, reference: &str, answers: Vec<CollaboratorResult<bool>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(reference.to_owned(), answers.into());
    }

    pub fn reject(&self, reference: &str) {
        self.script(reference, vec![Ok(false)]);
    }

    pub fn set_accept_unknown(&self, accept: bool) {
        self.accept_unknown.store(accept, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockchainVerifier for ScriptedVerifier {
    async fn verify(&self, reference: &str, _expected_amount: Decimal) -> CollaboratorResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(reference)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(answer) => answer,
            None => Ok(self.accept_unknown.load(Ordering::SeqCst)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPayout {
    pub destination: String,
    pub amount: Decimal,
    pub memo: String,
    pub reference: String,
}

/// Hot wallet that records every transfer it is asked to make.
#[derive(Debug)]
pub struct ScriptedTransfer {
    balance: Mutex<Decimal>,
    fail_next_send: Mutex<Option<CollaboratorError>>,
    sent: Mutex<Vec<SentPayout>>,
}

impl ScriptedTransfer {
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance: Mutex::new(balance),
            fail_next_send: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_balance(&self, balance: Decimal) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn balance(&self) -> Decimal {
        *self.balance.lock().unwrap()
    }

    pub fn fail_next_send(&self, err: CollaboratorError) {
        *self.fail_next_send.lock().unwrap() = Some(err);
    }

    pub fn sent(&self) -> Vec<SentPayout> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockchainTransfer for ScriptedTransfer {
    async fn wallet_balance(&self) -> CollaboratorResult<Decimal> {
        Ok(self.balance())
    }

    async fn send(&self, destination: &str, amount: Decimal, memo: &str) -> CollaboratorResult<String> {
        if let Some(err) = self.fail_next_send.lock().unwrap().take() {
            return Err(err);
        }

        let mut sent = self.sent.lock().unwrap();
        let reference = format!("payout-{}", sent.len() + 1);
        *self.balance.lock().unwrap() -= amount;
        sent.push(SentPayout {
            destination: destination.to_owned(),
            amount,
            memo: memo.to_owned(),
            reference: reference.clone(),
        });
        Ok(reference)
    }
}
