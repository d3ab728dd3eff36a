//! Integration tests for the funding pool: refill accounting, idempotent
//! checkout, exhaustion, and full-consumption handling.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use txexec::builders::ExecutorBuilder;
use txexec::config::ExecutorConfig;
use txexec::core::{
    ExecutorError, ResourcePool, Signer, TransactionData, TransactionKind, TransactionTask,
};
use txexec::infra::{InMemoryLedger, StaticSigner};

fn config(max_pool_size: u32, coin_batch_size: u32) -> ExecutorConfig {
    txexec::util::init_tracing();
    ExecutorConfig {
        max_pool_size,
        coin_batch_size,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn submission_count_matches_refill_policy() {
    // 10 independent tasks, bound 3, batch 2, one real funding object:
    // 10 task submissions + the initial split + one more refill to reach
    // three concurrent handles = 12 total.
    let ledger = Arc::new(InMemoryLedger::new().with_latency(Duration::from_millis(20)));
    let signer = Arc::new(StaticSigner::random());
    let sender = signer.owner();
    ledger.mint(sender, 100_000);

    let executor = Arc::new(
        ExecutorBuilder::new(Arc::clone(&ledger), signer)
            .with_config(config(3, 2))
            .build_parallel()
            .unwrap(),
    );

    let recipient = txexec::core::OwnerId::random();
    let tasks = (0..10).map(|_| {
        let executor = Arc::clone(&executor);
        async move {
            let task = TransactionTask::new(move |handles| {
                TransactionData::new(
                    sender,
                    handles[0].reference(),
                    TransactionKind::Transfer {
                        recipient,
                        amount: Some(1),
                    },
                )
            });
            executor.execute_transaction_block(task).await
        }
    });
    let results = join_all(tasks).await;

    assert!(results.iter().all(Result::is_ok));
    let stats = ledger.stats();
    assert_eq!(stats.submissions, 12);
    assert_eq!(stats.fetches, 1);
    assert_eq!(executor.pool().stats().await.refills, 2);
}

#[tokio::test]
async fn unused_handle_comes_back_unchanged() {
    // Batch size 1 so the pool holds exactly one fragment: acquiring it
    // again after a put_back must observe the same id and version.
    let ledger = Arc::new(InMemoryLedger::new());
    let signer = Arc::new(StaticSigner::random());
    ledger.mint(signer.owner(), 10_000);

    let pool = ResourcePool::new(Arc::clone(&ledger), signer, &config(2, 1));

    let handle = pool.acquire().await.unwrap();
    let (id, version) = (handle.id, handle.version);
    pool.put_back(handle).await;

    let again = pool.acquire().await.unwrap();
    assert_eq!(again.id, id);
    assert_eq!(again.version, version);
    assert_eq!(ledger.current_version(id), Some(version));
}

#[tokio::test]
async fn empty_owner_exhausts_the_pool() {
    let ledger = Arc::new(InMemoryLedger::new());
    let signer = Arc::new(StaticSigner::random());
    let pool = ResourcePool::new(ledger, signer, &config(4, 4));

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, ExecutorError::PoolExhausted { .. }));
}

#[tokio::test]
async fn unsplittable_source_exhausts_the_pool() {
    // A one-unit source cannot fund a four-way split.
    let ledger = Arc::new(InMemoryLedger::new());
    let signer = Arc::new(StaticSigner::random());
    ledger.mint(signer.owner(), 1);
    let pool = ResourcePool::new(ledger, signer, &config(4, 4));

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, ExecutorError::PoolExhausted { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_checkout_is_all_or_nothing() {
    // Two callers each needing two handles from a pool bounded at two must
    // serialize instead of deadlocking on partial checkouts.
    let ledger = Arc::new(InMemoryLedger::new().with_latency(Duration::from_millis(5)));
    let signer = Arc::new(StaticSigner::random());
    ledger.mint(signer.owner(), 100_000);
    let pool = Arc::new(ResourcePool::new(Arc::clone(&ledger), signer, &config(2, 2)));

    let checkouts = join_all((0..2).map(|_| {
        let pool = Arc::clone(&pool);
        async move {
            let batch = pool.acquire_many(2).await?;
            tokio::time::sleep(Duration::from_millis(5)).await;
            for handle in batch {
                pool.put_back(handle).await;
            }
            Ok::<_, ExecutorError>(())
        }
    }))
    .await;

    assert!(checkouts.iter().all(Result::is_ok));
}

#[tokio::test]
async fn oversized_batch_fails_fast() {
    // A request the bound can never satisfy must error instead of waiting.
    let ledger = Arc::new(InMemoryLedger::new());
    let signer = Arc::new(StaticSigner::random());
    ledger.mint(signer.owner(), 10_000);
    let pool = ResourcePool::new(ledger, signer, &config(2, 2));

    let err = pool.acquire_many(3).await.unwrap_err();
    assert!(matches!(err, ExecutorError::PoolExhausted { .. }));
}

#[tokio::test]
async fn fully_consumed_handle_is_dropped() {
    // A task that transfers its whole funding object away must not see that
    // handle requeued; the pool replenishes on demand afterwards.
    let ledger = Arc::new(InMemoryLedger::new());
    let signer = Arc::new(StaticSigner::random());
    let sender = signer.owner();
    ledger.mint(sender, 10_000);

    let executor = ExecutorBuilder::new(Arc::clone(&ledger), signer)
        .with_config(config(2, 1))
        .build_parallel()
        .unwrap();

    let recipient = txexec::core::OwnerId::random();
    let task = TransactionTask::new(move |handles| {
        TransactionData::new(
            sender,
            handles[0].reference(),
            TransactionKind::Transfer {
                recipient,
                amount: None,
            },
        )
    });
    executor.execute_transaction_block(task).await.unwrap();

    let stats = executor.pool().stats().await;
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.available, 0);

    // The next task forces a refill and still succeeds.
    let task = TransactionTask::new(move |handles| {
        TransactionData::new(
            sender,
            handles[0].reference(),
            TransactionKind::Invoke { payload: vec![] },
        )
    });
    executor.execute_transaction_block(task).await.unwrap();
    assert_eq!(executor.pool().stats().await.refills, 2);
}
