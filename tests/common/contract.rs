//! Behavior every `JobRepository` must show, written against the trait only.

use std::sync::Arc;

use workout_queue::state_machine::JobStatus;
use workout_queue::{JobRepository, NewJob, MAX_RETRIES};

use super::message_payload;

/// K concurrent claims against one eligible job: one winner, K-1 empty results
pub async fn assert_mutual_exclusion(store: Arc<dyn JobRepository>, contenders: usize) {
    let job = store
        .create(NewJob::new(message_payload("5k run"), "user-1"))
        .await
        .unwrap();

    let attempts = (0..contenders).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.claim().await })
    });
    let results = futures::future::join_all(attempts).await;

    let claimed: Vec<_> = results
        .into_iter()
        .filter_map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(claimed.len(), 1, "exactly one claimant wins");
    assert_eq!(claimed[0].id, job.id);
    assert_eq!(claimed[0].status, JobStatus::Processing);
}

/// Repeated claims on an empty eligible set return `None` without error
pub async fn assert_empty_queue_idempotence(store: Arc<dyn JobRepository>) {
    for _ in 0..5 {
        assert!(store.claim().await.unwrap().is_none());
    }
    assert_eq!(store.pending_count().await.unwrap(), 0);
}

/// Each failed update adds exactly one retry, and the job dead-letters at the limit
pub async fn assert_retry_monotonicity_and_dead_letter(store: Arc<dyn JobRepository>) {
    let created = store
        .create(NewJob::new(message_payload("bench"), "user-1"))
        .await
        .unwrap();
    assert_eq!(created.retry_count, 0);

    for attempt in 1..=MAX_RETRIES {
        let mut job = store
            .claim()
            .await
            .unwrap()
            .expect("failed job with retries left is claimable");
        assert_eq!(job.id, created.id);

        job.mark_failed(format!("attempt {attempt} failed")).unwrap();
        // Caller-supplied counts are ignored
        job.retry_count = 99;
        let updated = store.update(&job).await.unwrap();

        assert_eq!(updated.status, JobStatus::Failed);
        assert_eq!(updated.retry_count, attempt);
    }

    assert_eq!(store.pending_count().await.unwrap(), 0);
    for _ in 0..3 {
        assert!(store.claim().await.unwrap().is_none());
    }

    let stored = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.retry_count, MAX_RETRIES);
}

/// Claims prefer the oldest eligible job
pub async fn assert_oldest_first(store: Arc<dyn JobRepository>) {
    let first = store
        .create(NewJob::new(message_payload("first"), "user-1"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = store
        .create(NewJob::new(message_payload("second"), "user-1"))
        .await
        .unwrap();

    assert_eq!(store.pending_count().await.unwrap(), 2);
    assert_eq!(store.claim().await.unwrap().unwrap().id, first.id);
    assert_eq!(store.claim().await.unwrap().unwrap().id, second.id);
    assert_eq!(store.pending_count().await.unwrap(), 0);
}

/// Completing keeps the retry count and records the result
pub async fn assert_completion_round_trip(store: Arc<dyn JobRepository>) {
    store
        .create(NewJob::new(message_payload("rows"), "user-1"))
        .await
        .unwrap();
    let mut job = store.claim().await.unwrap().unwrap();
    job.mark_completed(serde_json::json!([{ "exercise_name": "rows" }])).unwrap();

    let updated = store.update(&job).await.unwrap();
    assert_eq!(updated.status, JobStatus::Completed);
    assert_eq!(updated.retry_count, 0);
    assert_eq!(
        updated.result,
        Some(serde_json::json!([{ "exercise_name": "rows" }]))
    );
    assert!(updated.updated_at >= updated.created_at);
    assert!(store.claim().await.unwrap().is_none());
}

/// Missing ids are `None` for reads and an error for updates
pub async fn assert_missing_job_handling(store: Arc<dyn JobRepository>) {
    let phantom = NewJob::new(message_payload("ghost"), "user-1")
        .into_pending(uuid::Uuid::new_v4(), chrono::Utc::now());

    assert!(store.get(phantom.id).await.unwrap().is_none());
    assert_eq!(
        store.update(&phantom).await.unwrap_err(),
        workout_queue::QueueError::JobNotFound(phantom.id)
    );
}

/// Once completed, a late failure from a stale copy is rejected and the row is untouched
pub async fn assert_completed_is_terminal(store: Arc<dyn JobRepository>) {
    let created = store
        .create(NewJob::new(message_payload("deadlift"), "user-1"))
        .await
        .unwrap();
    let mut job = store.claim().await.unwrap().unwrap();
    let mut stale = job.clone();

    job.mark_completed(serde_json::json!([{ "exercise_name": "deadlift" }]))
        .unwrap();
    store.update(&job).await.unwrap();

    stale.mark_failed("extractor timeout").unwrap();
    let rejected = store.update(&stale).await.unwrap_err();
    assert!(
        matches!(rejected, workout_queue::QueueError::InvalidState(_)),
        "unexpected error: {rejected:?}"
    );

    let stored = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.retry_count, 0);
    assert!(stored.error.is_none());
    assert_eq!(
        stored.result,
        Some(serde_json::json!([{ "exercise_name": "deadlift" }]))
    );
    assert!(store.claim().await.unwrap().is_none());
}
