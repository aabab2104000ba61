//! # Serial lane: one broker operation at a time.
//!
//! Subscribe/unsubscribe calls race on the broker when fired back-to-back
//! before the first is acknowledged. The lane removes the race by running
//! every scheduled operation (including its acknowledgement wait) to
//! completion before starting the next.
//!
//! ## Architecture
//! ```text
//! schedule(op) ──► [unbounded FIFO] ──► worker ──► op.await ──► oneshot ──► caller
//!                                         ▲
//!                        destroy() ───────┘ (stops after the in-flight op)
//! ```
//!
//! ## Rules
//! - Operations start in `schedule` call order (enqueue happens synchronously).
//! - An operation that resolves to an error value does not block the next one.
//! - `destroy()` lets the in-flight operation finish; queued ones are dropped.
//! - Dropped or refused operations resolve their caller with
//!   [`SessionError::SessionTerminated`].

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SessionError;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Single-consumer FIFO executor for broker operations.
pub struct SerialLane {
    tx: mpsc::UnboundedSender<Job>,
    closed: CancellationToken,
}

impl SerialLane {
    /// Creates the lane and spawns its worker.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();
        tokio::spawn(Self::worker(rx, closed.clone()));
        Self { tx, closed }
    }

    async fn worker(mut rx: mpsc::UnboundedReceiver<Job>, closed: CancellationToken) {
        loop {
            let job = tokio::select! {
                biased;
                _ = closed.cancelled() => break,
                job = rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            job.await;
        }
        rx.close();
        let mut dropped = 0usize;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "serial lane closed with queued operations");
        }
    }

    /// Enqueues `op` and returns a future resolving to its output.
    ///
    /// The operation is queued when this method is called, not when the
    /// returned future is first polled; dropping the future does not cancel it.
    pub fn schedule<F, T>(&self, op: F) -> impl Future<Output = Result<T, SessionError>> + use<F, T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = done_tx.send(op.await);
        });

        let queued = !self.closed.is_cancelled() && self.tx.send(job).is_ok();

        async move {
            if !queued {
                return Err(SessionError::SessionTerminated);
            }
            done_rx.await.map_err(|_| SessionError::SessionTerminated)
        }
    }

    /// Stops accepting work; the in-flight operation is allowed to finish.
    pub fn destroy(&self) {
        self.closed.cancel();
    }

    pub fn is_destroyed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl Drop for SerialLane {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_runs_in_submission_order_one_at_a_time() {
        let lane = SerialLane::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut pending = Vec::new();
        for (i, delay) in [30u64, 1, 10].into_iter().enumerate() {
            let log = log.clone();
            pending.push(lane.schedule(async move {
                log.lock().push(format!("start {i}"));
                tokio::time::sleep(Duration::from_millis(delay)).await;
                log.lock().push(format!("end {i}"));
                i
            }));
        }

        let mut results = Vec::new();
        for p in pending {
            results.push(p.await.unwrap());
        }
        assert_eq!(results, vec![0, 1, 2]);
        assert_eq!(
            *log.lock(),
            vec!["start 0", "end 0", "start 1", "end 1", "start 2", "end 2"]
        );
    }

    #[tokio::test]
    async fn test_failed_operation_does_not_block_next() {
        let lane = SerialLane::new();
        let first = lane.schedule(async { Err::<(), _>("boom") });
        let second = lane.schedule(async { Ok::<_, &str>(7) });

        assert_eq!(first.await.unwrap(), Err("boom"));
        assert_eq!(second.await.unwrap(), Ok(7));
    }

    #[tokio::test]
    async fn test_destroy_lets_in_flight_finish_and_drops_queue() {
        let lane = SerialLane::new();
        let gate = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());

        let (g, s) = (gate.clone(), started.clone());
        let in_flight = lane.schedule(async move {
            s.notify_one();
            g.notified().await;
            "finished"
        });
        let queued = lane.schedule(async { "never" });

        started.notified().await;
        lane.destroy();
        gate.notify_one();

        assert_eq!(in_flight.await, Ok("finished"));
        assert_eq!(queued.await, Err(SessionError::SessionTerminated));
    }

    #[tokio::test]
    async fn test_schedule_after_destroy_fails_fast() {
        let lane = SerialLane::new();
        lane.destroy();
        assert!(lane.is_destroyed());
        assert_eq!(
            lane.schedule(async { 1 }).await,
            Err(SessionError::SessionTerminated)
        );
    }

    #[tokio::test]
    async fn test_dropping_result_future_keeps_operation_queued() {
        let lane = SerialLane::new();
        let ran = Arc::new(Notify::new());

        let r = ran.clone();
        drop(lane.schedule(async move { r.notify_one() }));

        tokio::time::timeout(Duration::from_secs(1), ran.notified())
            .await
            .expect("operation should still run");
    }
}
