//! Worker pool tests against the in-memory broker

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use hopper_queue::{Broker, JobPayload, MemoryBroker, Queue, QueueConfig, QueueHandler};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Greeting {
    name: String,
}

impl JobPayload for Greeting {
    const JOB_TYPE: &'static str = "Greeting";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct HashJob {
    input: String,
    count: u32,
}

impl JobPayload for HashJob {
    const JOB_TYPE: &'static str = "HashJob";
}

/// Records every call, keyed by job id
#[derive(Clone)]
struct Recorder<P> {
    calls: Arc<Mutex<Vec<(String, P, DateTime<Utc>)>>>,
    errors: Arc<Mutex<Vec<(String, P, String)>>>,
}

impl<P> Default for Recorder<P> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<P: Clone> Recorder<P> {
    fn calls(&self) -> Vec<(String, P, DateTime<Utc>)> {
        self.calls.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<(String, P, String)> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl Queue for Recorder<Greeting> {
    type Payload = Greeting;

    async fn dequeue(&self, job_id: &str, payload: &Greeting) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((job_id.to_string(), payload.clone(), Utc::now()));
        if payload.name.is_empty() {
            anyhow::bail!("greeting without a name");
        }
        Ok(())
    }

    async fn on_error(&self, job_id: &str, payload: &Greeting, error: anyhow::Error) {
        self.errors
            .lock()
            .unwrap()
            .push((job_id.to_string(), payload.clone(), error.to_string()));
    }
}

#[async_trait]
impl Queue for Recorder<HashJob> {
    type Payload = HashJob;

    async fn dequeue(&self, job_id: &str, payload: &HashJob) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.calls
            .lock()
            .unwrap()
            .push((job_id.to_string(), payload.clone(), Utc::now()));
        Ok(())
    }

    async fn on_error(&self, job_id: &str, payload: &HashJob, error: anyhow::Error) {
        self.errors
            .lock()
            .unwrap()
            .push((job_id.to_string(), payload.clone(), error.to_string()));
    }
}

struct Harness {
    handler: Arc<QueueHandler>,
    broker: MemoryBroker,
    greetings: Recorder<Greeting>,
    hashes: Recorder<HashJob>,
}

fn harness() -> Harness {
    let broker = MemoryBroker::new();
    let greetings = Recorder::<Greeting>::default();
    let hashes = Recorder::<HashJob>::default();

    let config = QueueConfig::default().with_backoff(Duration::from_millis(20));
    let mut handler = QueueHandler::new(broker.clone(), config);
    handler.register_queue(greetings.clone()).unwrap();
    handler.register_queue(hashes.clone()).unwrap();

    Harness {
        handler: Arc::new(handler),
        broker,
        greetings,
        hashes,
    }
}

fn start(
    handler: &Arc<QueueHandler>,
    workers: usize,
) -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let shutdown = CancellationToken::new();
    let pool = tokio::spawn({
        let handler = handler.clone();
        let shutdown = shutdown.clone();
        async move {
            handler.run(workers, shutdown).await.unwrap();
        }
    });
    (shutdown, pool)
}

async fn wait_for(mut done: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    done()
}

async fn stop(shutdown: CancellationToken, pool: tokio::task::JoinHandle<()>) {
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), pool)
        .await
        .expect("worker pool did not stop")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_greeting_dispatched_once() {
    let h = harness();
    let id = h
        .handler
        .add_job(&Greeting {
            name: "Ada".to_string(),
        })
        .await
        .unwrap();

    let (shutdown, pool) = start(&h.handler, 2);

    assert!(wait_for(|| !h.greetings.calls().is_empty(), Duration::from_secs(2)).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop(shutdown, pool).await;

    let calls = h.greetings.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, id.to_string());
    assert_eq!(calls[0].1.name, "Ada");
    assert!(h.greetings.errors().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_round_trip_per_type() {
    let h = harness();

    let greeting = Greeting {
        name: "Grace".to_string(),
    };
    let hash = HashJob {
        input: "hopper".to_string(),
        count: 12,
    };
    h.handler.add_job(&greeting).await.unwrap();
    h.handler.add_job(&hash).await.unwrap();

    let (shutdown, pool) = start(&h.handler, 3);

    assert!(
        wait_for(
            || h.greetings.calls().len() == 1 && h.hashes.calls().len() == 1,
            Duration::from_secs(2)
        )
        .await
    );
    stop(shutdown, pool).await;

    assert_eq!(h.greetings.calls()[0].1, greeting);
    assert_eq!(h.hashes.calls()[0].1, hash);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_error_callback_invoked_once_without_retry() {
    let h = harness();
    h.broker.push_back("jobs", "Greeting_abc").await.unwrap();
    h.broker.set("Greeting_abc", br#"{"name":""}"#).await.unwrap();

    let (shutdown, pool) = start(&h.handler, 2);
    assert!(wait_for(|| !h.greetings.errors().is_empty(), Duration::from_secs(2)).await);
    tokio::time::sleep(Duration::from_millis(150)).await;
    stop(shutdown, pool).await;

    let errors = h.greetings.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "abc");
    assert_eq!(errors[0].1.name, "");
    assert_eq!(errors[0].2, "greeting without a name");
    assert_eq!(h.greetings.calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_delay_honored() {
    let h = harness();
    let not_before = (Utc::now() + chrono::Duration::seconds(2)).trunc_subsecs(0);

    h.handler
        .add_job_with_delay(
            &Greeting {
                name: "later".to_string(),
            },
            not_before,
        )
        .await
        .unwrap();

    let (shutdown, pool) = start(&h.handler, 2);

    assert!(wait_for(|| !h.greetings.calls().is_empty(), Duration::from_secs(5)).await);
    stop(shutdown, pool).await;

    let calls = h.greetings.calls();
    assert_eq!(calls.len(), 1);
    let dispatched_at = calls[0].2;
    assert!(dispatched_at >= not_before, "dispatched before its time");
    assert!(dispatched_at < not_before + chrono::Duration::seconds(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_due_jobs_overtake_delayed_ones() {
    let h = harness();
    let later = Utc::now() + chrono::Duration::seconds(30);

    h.handler
        .add_job_with_delay(
            &Greeting {
                name: "later".to_string(),
            },
            later,
        )
        .await
        .unwrap();
    h.handler
        .add_job(&Greeting {
            name: "now".to_string(),
        })
        .await
        .unwrap();

    let (shutdown, pool) = start(&h.handler, 1);
    assert!(wait_for(|| !h.greetings.calls().is_empty(), Duration::from_secs(2)).await);
    stop(shutdown, pool).await;

    let calls = h.greetings.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.name, "now");
    // The delayed job is still waiting in the list
    assert_eq!(h.broker.len("jobs").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_malformed_keys_do_not_stop_workers() {
    let h = harness();
    for raw in ["solo", "a_b_c_d", "a_b_c_d_e", "Greeting_x_not-a-time"] {
        h.broker.push_back("jobs", raw).await.unwrap();
    }

    h.handler
        .add_job(&Greeting {
            name: "after".to_string(),
        })
        .await
        .unwrap();

    let (shutdown, pool) = start(&h.handler, 2);

    assert!(wait_for(|| !h.greetings.calls().is_empty(), Duration::from_secs(2)).await);
    stop(shutdown, pool).await;

    assert_eq!(h.greetings.calls()[0].1.name, "after");
    assert!(h.broker.is_empty("jobs").await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_workers_dispatch_each_job_once() {
    let h = harness();
    let total = 200;

    for i in 0..total {
        h.handler
            .add_job(&HashJob {
                input: format!("job-{i}"),
                count: i,
            })
            .await
            .unwrap();
    }

    let (shutdown, pool) = start(&h.handler, 8);
    assert!(
        wait_for(
            || h.hashes.calls().len() >= total as usize,
            Duration::from_secs(10)
        )
        .await
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop(shutdown, pool).await;

    let calls = h.hashes.calls();
    assert_eq!(calls.len(), total as usize);

    let mut per_id: HashMap<String, usize> = HashMap::new();
    for (id, _, _) in &calls {
        *per_id.entry(id.clone()).or_default() += 1;
    }
    assert_eq!(per_id.len(), total as usize);
    assert!(per_id.values().all(|n| *n == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_stops_every_worker() {
    let h = harness();
    let (shutdown, pool) = start(&h.handler, 6);

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop(shutdown, pool).await;

    // Nothing is popped once the pool has stopped
    h.handler
        .add_job(&Greeting {
            name: "too late".to_string(),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.broker.len("jobs").await, 1);
    assert!(h.greetings.calls().is_empty());
}
