use std::time::Duration;

use edition_admin::models::job::{JobOutcome, JobSnapshot, JobSpec, JobState};
use edition_admin::services::queue::{JobQueue, JobStore, QueuedJob};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Integration test: Redis job lifecycle
///
/// Enqueue, poll, dequeue, start and complete a job against a live Redis.
///
/// Note: This requires a running Redis instance (REDIS_URL).
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_redis_job_lifecycle() {
    let queue = JobQueue::new(&redis_url(), Duration::from_secs(60)).expect("open Redis client");
    queue.health_check().await.expect("Redis is reachable");

    let spec = JobSpec::BakeChapters {
        start: 1,
        stop: 2,
        base_url: "http://localhost:3000/apparatus/estoria-digital/".to_string(),
        data_path: "/tmp/edition-data".into(),
    };
    let id = queue.enqueue(spec.clone()).await.expect("enqueue");

    let snapshot = queue.poll(&id.to_string()).await.expect("poll");
    assert_eq!(snapshot, JobSnapshot::unknown());

    // Other jobs may be queued by a shared instance; drain until ours appears.
    let job = loop {
        let job = queue
            .dequeue()
            .await
            .expect("dequeue")
            .expect("our job is queued");
        if job.job_id == id {
            break job;
        }
    };
    assert_eq!(job.spec, spec);

    queue.mark_started(id).await.expect("mark started");
    assert_eq!(
        queue.poll(&id.to_string()).await.unwrap().state,
        JobState::Started
    );

    queue
        .complete(&job, JobOutcome::Success(None))
        .await
        .expect("complete");
    let snapshot = queue.poll(&id.to_string()).await.unwrap();
    assert_eq!(snapshot.state, JobState::Success);
    assert_eq!(snapshot.result, None);
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_unknown_ids_read_as_pending() {
    let queue = JobQueue::new(&redis_url(), Duration::from_secs(60)).expect("open Redis client");
    assert_eq!(queue.poll("aaa").await.unwrap(), JobSnapshot::unknown());
    assert_eq!(
        queue
            .poll(&uuid::Uuid::new_v4().to_string())
            .await
            .unwrap(),
        JobSnapshot::unknown()
    );
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_abandon_recreates_missing_record() {
    let queue = JobQueue::new(&redis_url(), Duration::from_secs(60)).expect("open Redis client");
    let job = QueuedJob {
        job_id: uuid::Uuid::new_v4(),
        spec: JobSpec::ReaderXml {
            data_path: "/tmp/edition-data".into(),
            scripts_path: "/tmp/edition-scripts".into(),
        },
    };
    queue
        .abandon(&job, "Could not start job")
        .await
        .expect("abandon");
    let snapshot = queue.poll(&job.job_id.to_string()).await.unwrap();
    assert_eq!(snapshot.state, JobState::Failure);
    assert_eq!(snapshot.result_str(), Some("Could not start job"));
}
