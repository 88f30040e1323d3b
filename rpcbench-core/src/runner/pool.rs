use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::aggregator::{Aggregator, AggregatorState, Outcome};
use super::config::{RequestKind, RunConfig};
use super::cursor::InputCursor;
use super::error::{Error, Result};
use super::gate::RunGate;
use super::invoker::Invoker;
use super::signal::StopSignal;

/// Drained state of a pool together with the wall time it ran for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRun {
    pub state: AggregatorState,
    pub elapsed: Duration,
}

/// Fixed-size set of workers driving one request kind until the deadline or a stop.
#[derive(Debug)]
pub struct WorkerPool<I> {
    config: RunConfig,
    invoker: Arc<I>,
    gate: Arc<RunGate>,
    aggregator: Arc<Aggregator>,
}

impl<I: Invoker> WorkerPool<I> {
    /// Fails with a configuration error instead of building a pool that could not make
    /// progress (empty input, zero workers, zero duration).
    pub fn new(config: RunConfig, invoker: Arc<I>, stop: Arc<StopSignal>) -> Result<Self> {
        config.validate()?;

        let gate = Arc::new(RunGate::new(config.duration, stop));
        Ok(Self {
            config,
            invoker,
            gate,
            aggregator: Arc::new(Aggregator::new()),
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Handle for read-only observers. Writers are the pool's own workers.
    pub fn aggregator(&self) -> Arc<Aggregator> {
        self.aggregator.clone()
    }

    /// Spawns the workers, waits for every one of them, then snapshots the aggregator.
    pub async fn run(self, started: Instant) -> Result<PoolRun> {
        self.gate.start_at(started);

        let kind = self.config.kind;
        let concurrency = self.config.concurrency;
        tracing::debug!(%kind, concurrency, duration = ?self.config.duration, inputs = self.config.input.len(), "starting worker pool");

        let cursors = (0..concurrency)
            .map(|worker_id| {
                InputCursor::new(kind, self.config.input.clone(), worker_id, concurrency)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut handles = Vec::with_capacity(cursors.len());
        for cursor in cursors {
            handles.push(tokio::spawn(worker(
                kind,
                cursor,
                self.invoker.clone(),
                self.gate.clone(),
                self.aggregator.clone(),
            )));
        }

        // Join every worker even if one of them panicked, so nothing is still writing
        // when the snapshot is taken.
        let mut first_err = None;
        for h in handles {
            if let Err(err) = h.await {
                first_err.get_or_insert(err);
            }
        }
        if let Some(err) = first_err {
            return Err(Error::Join(err));
        }

        Ok(PoolRun {
            state: self.aggregator.snapshot(),
            elapsed: started.elapsed(),
        })
    }
}

async fn worker<I: Invoker>(
    kind: RequestKind,
    mut cursor: InputCursor,
    invoker: Arc<I>,
    gate: Arc<RunGate>,
    aggregator: Arc<Aggregator>,
) {
    while gate.next() {
        let call = cursor.next_call();

        let begin = Instant::now();
        let res = invoker.invoke(call).await;
        let latency = begin.elapsed();

        match res {
            Ok(()) => aggregator.record(Outcome::success(latency)),
            Err(err) => {
                tracing::debug!(%kind, error = %err, "invocation failed");
                aggregator.record(Outcome::failure(latency));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::runner::input::InputSet;
    use crate::runner::invoker::{Call, FnInvoker};

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    fn config(input: InputSet, concurrency: u64, duration: Duration) -> RunConfig {
        RunConfig {
            kind: RequestKind::AccountInfo,
            concurrency,
            duration,
            input,
        }
    }

    #[tokio::test]
    async fn empty_input_refuses_to_build() {
        let calls = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let invoker = {
            let calls = calls.clone();
            Arc::new(FnInvoker::new(move |_call: Call<'_>| {
                calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                async { Ok::<(), Boom>(()) }
            }))
        };

        let res = WorkerPool::new(
            config(InputSet::default(), 2, Duration::from_secs(1)),
            invoker,
            Arc::new(StopSignal::new()),
        );
        assert!(matches!(res, Err(Error::EmptyInput)));
        assert_eq!(calls.load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_ends_the_run_early() {
        let invoker = Arc::new(FnInvoker::new(|_call: Call<'_>| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<(), Boom>(())
        }));
        let stop = Arc::new(StopSignal::new());
        let pool = WorkerPool::new(
            config(InputSet::new(["A"]), 2, Duration::from_secs(3600)),
            invoker,
            stop.clone(),
        )
        .unwrap();

        let started = Instant::now();
        let run = tokio::spawn(pool.run(started));
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.stop();

        let out = run.await.unwrap().unwrap();
        assert!(out.elapsed < Duration::from_secs(1));
        assert!(out.state.success_count >= 2);
        assert_eq!(out.state.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_calls_drain_after_deadline() {
        // One slow call straddles the deadline; it must still be recorded.
        let invoker = Arc::new(FnInvoker::new(|_call: Call<'_>| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok::<(), Boom>(())
        }));
        let pool = WorkerPool::new(
            config(InputSet::new(["A"]), 1, Duration::from_millis(500)),
            invoker,
            Arc::new(StopSignal::new()),
        )
        .unwrap();

        let out = pool.run(Instant::now()).await.unwrap();
        assert_eq!(out.state.success_count, 2);
        assert_eq!(out.elapsed, Duration::from_millis(600));
    }
}
