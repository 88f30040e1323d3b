use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use tokio::time::Instant;

use super::signal::StopSignal;

/// Decides whether a worker may start another invocation.
///
/// Each pool owns one gate. The deadline is `started + duration`, where `started` is the
/// instant the coordinator released every pool of the run.
#[derive(Debug)]
pub struct RunGate {
    duration: Duration,
    deadline: OnceLock<Instant>,
    stop: Arc<StopSignal>,
}

impl RunGate {
    pub fn new(duration: Duration, stop: Arc<StopSignal>) -> Self {
        Self {
            duration,
            deadline: OnceLock::new(),
            stop,
        }
    }

    pub fn start_at(&self, started: Instant) {
        let _ = self.deadline.set(started + self.duration);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.get().copied()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn next(&self) -> bool {
        if self.stop.is_stopped() {
            return false;
        }

        let now = Instant::now();

        // Lazily pin the deadline if the pool was driven without an explicit start.
        if self.deadline.get().is_none() {
            self.start_at(now);
        }

        match self.deadline.get() {
            Some(deadline) => now < *deadline,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn closes_at_deadline() {
        let gate = RunGate::new(Duration::from_millis(100), Arc::new(StopSignal::new()));
        gate.start_at(Instant::now());

        assert!(gate.next());
        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(gate.next());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!gate.next());
    }

    #[tokio::test(start_paused = true)]
    async fn closes_on_stop_before_deadline() {
        let stop = Arc::new(StopSignal::new());
        let gate = RunGate::new(Duration::from_secs(60), stop.clone());
        gate.start_at(Instant::now());

        assert!(gate.next());
        stop.stop();
        assert!(!gate.next());
    }

    #[tokio::test(start_paused = true)]
    async fn start_at_is_sticky() {
        let gate = RunGate::new(Duration::from_secs(1), Arc::new(StopSignal::new()));
        let first = Instant::now();
        gate.start_at(first);
        tokio::time::sleep(Duration::from_secs(5)).await;
        gate.start_at(Instant::now());
        assert_eq!(gate.deadline(), Some(first + Duration::from_secs(1)));
    }
}
