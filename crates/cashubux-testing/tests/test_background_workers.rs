use std::sync::Arc;
use std::time::Duration;

use cashubux_chain::RetryConfig;
use cashubux_entities::sea_orm_active_enums::TransactionStatus;
use cashubux_ledger::{
    DepositMethod, Ledger, LedgerConfig, NewAccount, VerificationWorker, new_ephemeral_ledger_db,
    spawn_workers, verification_queue,
};
use cashubux_testing::{ScriptedMembership, ScriptedTransfer, ScriptedVerifier};
use rust_decimal::dec;

/// Test worker pool → queued deposits settle without manual draining
///
/// Should test:
/// - Jobs queued by deposits are picked up by the spawned workers
/// - Accepted references complete, rejected ones are reversed
/// - Dropping the pool stops the workers
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_workers() {
    let config = LedgerConfig::default();
    let (queue, jobs) = verification_queue(config.verification.queue_capacity);
    let workers = config.verification.workers;

    let db = new_ephemeral_ledger_db().await.unwrap();
    let ledger = Ledger::new(db, config, Arc::new(ScriptedMembership::default()), queue);

    let verifier = Arc::new(ScriptedVerifier::default());
    verifier.reject("0xbad");
    let worker = VerificationWorker::new(
        ledger.clone(),
        verifier,
        Arc::new(ScriptedTransfer::new(dec!(100))),
        RetryConfig::immediate(2),
    );
    let pool = spawn_workers(Arc::new(worker), jobs, workers);

    ledger
        .register_account(NewAccount {
            id: 1,
            name: "worker-test".to_string(),
            referred_by: None,
        })
        .await
        .unwrap();

    let mut ids = Vec::new();
    for reference in ["0xgood-1", "0xbad", "0xgood-2"] {
        let receipt = ledger
            .deposit(
                1,
                dec!(1),
                DepositMethod::Blockchain {
                    external_ref: reference.to_string(),
                },
            )
            .await
            .unwrap();
        ids.push(receipt.transaction.id);
    }

    let mut statuses = Vec::new();
    for _ in 0..500 {
        statuses.clear();
        for id in &ids {
            statuses.push(ledger.transaction(*id).await.unwrap().status);
        }
        if !statuses.contains(&TransactionStatus::Pending) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(
        statuses,
        vec![
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Completed,
        ]
    );
    assert_eq!(ledger.account(1).await.unwrap().ad_credit, dec!(2));

    drop(pool);
    println!("✅ Background workers settled every queued deposit");
}
