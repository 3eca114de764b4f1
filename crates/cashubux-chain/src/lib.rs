/*!
# CashUBux Collaborator Boundary

The ledger never talks to Telegram or to the TON network directly. It talks to
the three traits in this crate, and the operator wires in real clients:

* [`MembershipCheck`] answers "is this user in that channel" and "did this user
  start that bot" for claim-time validation.
* [`BlockchainVerifier`] confirms that an external transaction reference moved
  the expected amount.
* [`BlockchainTransfer`] reports the hot wallet balance and sends payouts.

All three are treated as slow and unreliable. Calls made from the verification
worker go through [`with_retry`], which retries [`CollaboratorError::Transient`]
failures with exponential backoff and gives up on anything else.

## Quick Start

```rust
use cashubux_chain::{with_retry, CollaboratorError, RetryConfig};

# async fn example() -> Result<(), CollaboratorError> {
let config = RetryConfig::default();

let confirmed = with_retry(&config, "verify deposit", || async {
    // call the real verifier here
    Ok::<_, CollaboratorError>(true)
})
.await?;
assert!(confirmed);
# Ok(())
# }
```
*/

mod config;
mod error;
mod retry;
mod traits;

pub use config::RetryConfig;
pub use error::{CollaboratorError, CollaboratorResult};
pub use retry::with_retry;
pub use traits::{BlockchainTransfer, BlockchainVerifier, MembershipCheck};
