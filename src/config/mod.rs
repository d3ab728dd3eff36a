//! Configuration models for the executors.

pub mod executor;

pub use executor::ExecutorConfig;
