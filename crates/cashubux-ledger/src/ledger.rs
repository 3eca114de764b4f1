use std::sync::Arc;

use cashubux_chain::MembershipCheck;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::{AccountLocks, Clock, LedgerConfig, SystemClock, VerificationJob, VerificationQueue};

/// Handle to the reward ledger. Cheap to clone; clones share the database
/// pool, the account locks and the verification queue.
#[derive(Clone)]
pub struct Ledger {
    pub(crate) db: DatabaseConnection,
    pub(crate) config: Arc<LedgerConfig>,
    pub(crate) locks: AccountLocks,
    pub(crate) membership: Arc<dyn MembershipCheck>,
    queue: VerificationQueue,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(
        db: DatabaseConnection,
        config: LedgerConfig,
        membership: Arc<dyn MembershipCheck>,
        queue: VerificationQueue,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            locks: AccountLocks::new(),
            membership,
            queue,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn today(&self) -> String {
        self.clock.today()
    }

    pub(crate) fn enqueue(&self, job: VerificationJob) {
        self.queue.enqueue(job);
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
