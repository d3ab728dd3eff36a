//! Builders to construct executors from configuration.

pub mod executor_builder;

pub use executor_builder::ExecutorBuilder;
