pub mod aggregate;
pub mod catalog;
pub mod classifier;
pub mod ingest;
pub mod limiter;
pub mod retry;
pub mod run_log;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
