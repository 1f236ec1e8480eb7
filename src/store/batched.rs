use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};

use super::{Store, StoreError, StoreOp, StoreResult};

enum Request {
    Batch(Vec<StoreOp>, oneshot::Sender<Result<Vec<StoreResult>, StoreError>>),
}

/// Wraps a [`Store`] with a single background worker that, on each tick,
/// drains every request queued since its last pass and folds their
/// operations into one call to the inner store's `batch`, splitting the
/// combined result back out to each caller by the op-count it contributed —
/// concurrent callers share one backend round-trip per tick instead of
/// racing independent connections. Mirrors the event bus's sink-worker: a
/// queue feeding a spawned task, torn down with a oneshot shutdown signal
/// rather than an abrupt abort.
pub struct BatchedStore {
    queue: flume::Sender<Request>,
    worker: Option<JoinHandle<()>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl BatchedStore {
    pub fn new<S: Store + 'static>(inner: S) -> Self {
        let inner = Arc::new(inner);
        let (queue, rx) = flume::unbounded::<Request>();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let worker = task::spawn(async move {
            loop {
                let first = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    request = rx.recv_async() => match request {
                        Ok(request) => request,
                        Err(_) => break,
                    }
                };

                let Request::Batch(mut ops, reply) = first;
                let mut waiters = vec![(reply, ops.len())];
                // Drain whatever else is already queued so every caller
                // waiting at this tick rides the same backend call.
                while let Ok(Request::Batch(more_ops, more_reply)) = rx.try_recv() {
                    waiters.push((more_reply, more_ops.len()));
                    ops.extend(more_ops);
                }

                match inner.batch(ops).await {
                    Ok(results) => {
                        let mut results = results.into_iter();
                        for (reply, count) in waiters {
                            let chunk: Vec<StoreResult> = (&mut results).take(count).collect();
                            let _ = reply.send(Ok(chunk));
                        }
                    }
                    Err(err) => {
                        for (reply, _) in waiters {
                            let _ = reply.send(Err(err.clone()));
                        }
                    }
                }
            }
        });

        Self {
            queue,
            worker: Some(worker),
            shutdown: Some(shutdown_tx),
        }
    }

    pub async fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

#[async_trait::async_trait]
impl Store for BatchedStore {
    async fn batch(&self, ops: Vec<StoreOp>) -> Result<Vec<StoreResult>, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.queue
            .send_async(Request::Batch(ops, reply_tx))
            .await
            .map_err(|_| StoreError::Backend {
                message: "store worker has shut down".to_string(),
            })?;
        reply_rx.await.map_err(|_| StoreError::Backend {
            message: "store worker dropped the reply channel".to_string(),
        })?
    }
}

impl Drop for BatchedStore {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::Value;

    /// Records every batch it was called with, so tests can assert on how
    /// many backend round-trips a burst of concurrent callers produced.
    struct CountingStore {
        calls: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait::async_trait]
    impl Store for CountingStore {
        async fn batch(&self, ops: Vec<StoreOp>) -> Result<Vec<StoreResult>, StoreError> {
            self.calls.lock().push(ops.len());
            Ok(ops.into_iter().map(|_| StoreResult::Ack).collect())
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_backend_call() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let store = BatchedStore::new(CountingStore { calls: calls.clone() });

        let op = |key: &str| {
            vec![StoreOp::Put {
                namespace: vec!["ns".into()],
                key: key.into(),
                value: Some(Value::Null),
                index: super::IndexOption::Default,
            }]
        };

        let (a, b, c) = tokio::join!(store.batch(op("a")), store.batch(op("b")), store.batch(op("c")));
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 1);
        assert_eq!(c.unwrap().len(), 1);

        let calls = calls.lock();
        assert_eq!(calls.iter().sum::<usize>(), 3, "all three ops reach the backend");
        assert!(
            calls.len() <= 3,
            "coalescing should not issue more backend calls than callers"
        );
    }

    #[tokio::test]
    async fn each_caller_gets_its_own_slice_of_the_combined_result() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let store = BatchedStore::new(CountingStore { calls });

        let two_ops = vec![
            StoreOp::Get {
                namespace: vec!["ns".into()],
                key: "x".into(),
            },
            StoreOp::Get {
                namespace: vec!["ns".into()],
                key: "y".into(),
            },
        ];
        let one_op = vec![StoreOp::Get {
            namespace: vec!["ns".into()],
            key: "z".into(),
        }];

        let (pair, single) = tokio::join!(store.batch(two_ops), store.batch(one_op));
        assert_eq!(pair.unwrap().len(), 2);
        assert_eq!(single.unwrap().len(), 1);
    }
}
