//! Test fixture for the reward ledger: an ephemeral database, scripted
//! collaborators, a settable clock and deterministic draining of the
//! verification queue.

mod clock;
mod collaborators;
mod test_fixture;

pub use clock::FixedClock;
pub use collaborators::{ScriptedMembership, ScriptedTransfer, ScriptedVerifier, SentPayout};
pub use test_fixture::TestFixture;

/// Hot wallet balance the scripted transfer starts with.
pub const TEST_HOT_WALLET_BALANCE: i64 = 1_000;
