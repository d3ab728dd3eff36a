//! Builder assembling executors from a configuration, client, and signer.

use std::sync::Arc;

use crate::config::ExecutorConfig;
use crate::core::error::ExecutorError;
use crate::core::ledger::{LedgerClient, Signer};
use crate::core::parallel::ParallelExecutor;
use crate::core::serial::SerialChainExecutor;

/// Assembles executors sharing one ledger client and signer.
pub struct ExecutorBuilder<C, S> {
    client: Arc<C>,
    signer: Arc<S>,
    config: ExecutorConfig,
}

impl<C, S> ExecutorBuilder<C, S>
where
    C: LedgerClient,
    S: Signer,
{
    /// Start a builder with the default configuration.
    pub fn new(client: Arc<C>, signer: Arc<S>) -> Self {
        Self {
            client,
            signer,
            config: ExecutorConfig::default(),
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound the number of concurrent in-flight submissions.
    #[must_use]
    pub fn with_max_pool_size(mut self, max_pool_size: u32) -> Self {
        self.config.max_pool_size = max_pool_size;
        self
    }

    /// Set the number of fragments minted per refill split.
    #[must_use]
    pub fn with_coin_batch_size(mut self, coin_batch_size: u32) -> Self {
        self.config.coin_batch_size = coin_batch_size;
        self
    }

    /// Build the bounded-concurrency parallel executor.
    pub fn build_parallel(&self) -> Result<ParallelExecutor<C, S>, ExecutorError> {
        ParallelExecutor::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signer),
            self.config.clone(),
        )
    }

    /// Build the single-chain serial executor.
    pub fn build_serial(&self) -> Result<SerialChainExecutor<C, S>, ExecutorError> {
        self.config
            .validate()
            .map_err(ExecutorError::InvalidConfig)?;
        Ok(SerialChainExecutor::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signer),
        ))
    }
}
