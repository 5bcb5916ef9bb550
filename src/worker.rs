use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::error::InferenceError;
use crate::inference::InferenceBackend;
use crate::metrics::{INFERENCE_IN_FLIGHT, INFERENCE_LATENCY};
use crate::models::InferenceJob;

// handle to the worker pool queue, clones share it
#[derive(Clone)]
pub struct Forwarder {
    job_tx: mpsc::Sender<InferenceJob>,
}

impl Forwarder {
    // Start `workers` tasks that take jobs from one bounded queue
    pub fn spawn(
        backend: Arc<dyn InferenceBackend>,
        workers: usize,
        queue_capacity: usize,
        timeout: Option<Duration>,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<InferenceJob>(queue_capacity.max(1));
        let job_rx = Arc::new(Mutex::new(job_rx));

        for id in 0..workers.max(1) {
            let rx = Arc::clone(&job_rx);
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                inference_worker(id, rx, backend, timeout).await;
            });
        }

        tracing::info!(workers, queue_capacity, timeout = ?timeout, "Inference workers started");

        Self { job_tx }
    }

    // Run `prompt` through the backend and hand back its text unchanged.
    // Waits for queue space when every worker is busy and the queue is full.
    pub async fn forward(&self, prompt: String) -> Result<String, InferenceError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.job_tx
            .send(InferenceJob { prompt, response_tx })
            .await
            .map_err(|_| InferenceError::Unavailable)?;

        // wait for response from worker
        response_rx.await.map_err(|_| InferenceError::Unavailable)?
    }
}

// Worker loop -> takes jobs from the shared queue one at a time
async fn inference_worker(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<InferenceJob>>>,
    backend: Arc<dyn InferenceBackend>,
    timeout: Option<Duration>,
) {
    tracing::debug!(worker = id, "Inference worker started");

    loop {
        // the lock is only held while waiting for the next job
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else { break };

        // caller gave up already
        if job.response_tx.is_closed() {
            continue;
        }

        INFERENCE_IN_FLIGHT.inc();
        let timer = INFERENCE_LATENCY.start_timer();
        let result = run_job(&backend, job.prompt, timeout).await;
        timer.observe_duration();
        INFERENCE_IN_FLIGHT.dec();

        if let Err(e) = &result {
            tracing::warn!(worker = id, error = %e, "Inference call failed");
        }

        // Send response back to handler
        let _ = job.response_tx.send(result);
    }

    tracing::debug!(worker = id, "Inference worker stopped, queue closed");
}

// The call runs in its own task so a panicking backend only fails this job
async fn run_job(
    backend: &Arc<dyn InferenceBackend>,
    prompt: String,
    timeout: Option<Duration>,
) -> Result<String, InferenceError> {
    let backend = Arc::clone(backend);
    let mut task = tokio::spawn(async move { backend.infer(&prompt).await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                task.abort();
                return Err(InferenceError::Timeout(limit));
            }
        },
        None => task.await,
    };

    joined.map_err(|e| InferenceError::Backend(format!("Inference task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InferenceBackend for Echo {
        async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("echo: {}", prompt))
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    struct Failing;

    #[async_trait]
    impl InferenceBackend for Failing {
        async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
            Err(InferenceError::Backend("model exploded".to_string()))
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    struct Panicking;

    #[async_trait]
    impl InferenceBackend for Panicking {
        async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
            panic!("backend bug");
        }

        fn model(&self) -> &str {
            "panicking"
        }
    }

    struct Slow;

    #[async_trait]
    impl InferenceBackend for Slow {
        async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }

        fn model(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn forwards_and_returns_text_unchanged() {
        let backend = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let forwarder = Forwarder::spawn(backend.clone(), 2, 8, None);

        let out = forwarder.forward("hi".to_string()).await.unwrap();
        assert_eq!(out, "echo: hi");
    }

    #[tokio::test]
    async fn identical_prompts_each_reach_the_backend() {
        let backend = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let forwarder = Forwarder::spawn(backend.clone(), 2, 8, None);

        for _ in 0..3 {
            forwarder.forward("same".to_string()).await.unwrap();
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn backend_errors_keep_their_message() {
        let forwarder = Forwarder::spawn(Arc::new(Failing), 1, 4, None);

        let err = forwarder.forward("x".to_string()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Backend(ref m) if m == "model exploded"));
    }

    #[tokio::test]
    async fn panics_become_errors_and_worker_survives() {
        let forwarder = Forwarder::spawn(Arc::new(Panicking), 1, 4, None);

        for _ in 0..2 {
            let err = forwarder.forward("x".to_string()).await.unwrap_err();
            assert!(matches!(err, InferenceError::Backend(_)));
        }
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let forwarder = Forwarder::spawn(Arc::new(Slow), 1, 4, Some(Duration::from_millis(50)));

        let err = forwarder.forward("x".to_string()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn concurrent_forwards_all_complete() {
        let backend = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let forwarder = Forwarder::spawn(backend.clone(), 3, 2, None);

        let mut handles = Vec::new();
        for i in 0..10 {
            let f = forwarder.clone();
            handles.push(tokio::spawn(async move { f.forward(format!("p{}", i)).await }));
        }
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.await.unwrap().unwrap(), format!("echo: p{}", i));
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 10);
    }
}
