//! Store contract against the in-memory repository used by the other suites.

mod common;

use std::sync::Arc;

use common::{contract, InMemoryJobStore};
use workout_queue::JobRepository;

fn store() -> Arc<dyn JobRepository> {
    InMemoryJobStore::new()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_are_mutually_exclusive() {
    contract::assert_mutual_exclusion(store(), 16).await;
}

#[tokio::test]
async fn test_empty_queue_claims_return_nothing() {
    contract::assert_empty_queue_idempotence(store()).await;
}

#[tokio::test]
async fn test_failed_updates_increment_once_and_dead_letter() {
    contract::assert_retry_monotonicity_and_dead_letter(store()).await;
}

#[tokio::test]
async fn test_claims_oldest_first() {
    contract::assert_oldest_first(store()).await;
}

#[tokio::test]
async fn test_completion_round_trip() {
    contract::assert_completion_round_trip(store()).await;
}

#[tokio::test]
async fn test_missing_job_handling() {
    contract::assert_missing_job_handling(store()).await;
}

#[tokio::test]
async fn test_failure_cannot_overwrite_completion() {
    contract::assert_completed_is_terminal(store()).await;
}
