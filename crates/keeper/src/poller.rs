use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Repeatedly issues one read call per interval tick and hands the result to
/// an apply callback. One reader per value being mirrored.
///
/// Calls are issued and awaited sequentially: a slow call delays the next tick
/// instead of overlapping it. Failures are logged and passed through to
/// `apply`; they never terminate the loop. A reader is one-shot: once stopped
/// it cannot be restarted.
pub struct PollingReader {
    name: String,
    interval: Duration,
    is_running: Arc<AtomicBool>,
    cancellation_token: CancellationToken,
}

impl PollingReader {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            is_running: Arc::new(AtomicBool::new(false)),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Spawns the polling loop: one immediate call, then one per tick.
    /// A second start while the loop is running is a no-op.
    pub fn start<T, E, F, Fut, A>(&self, fetch: F, apply: A)
    where
        T: Send + 'static,
        E: std::fmt::Display + Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        A: Fn(Result<T, E>) + Send + 'static,
    {
        if self.is_running.swap(true, Ordering::SeqCst) {
            log::debug!("Polling reader {} already running, skipping start", self.name);
            return;
        }

        let name = self.name.clone();
        let interval = self.interval;
        let is_running = self.is_running.clone();
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            log::debug!("Polling reader {name} started");
            loop {
                if cancellation_token.is_cancelled() {
                    break;
                }

                let result = fetch().await;
                if let Err(e) = &result {
                    log::error!("Polling reader {name}: read call failed: {e}");
                }
                apply(result);

                tokio::select! {
                    _ = sleep(interval) => {}
                    _ = cancellation_token.cancelled() => break,
                }
            }
            is_running.store(false, Ordering::SeqCst);
            log::debug!("Polling reader {name} stopped");
        });
    }

    /// Stops the loop. No further calls are issued once the current tick ends.
    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

impl Clone for PollingReader {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            interval: self.interval,
            is_running: self.is_running.clone(),
            cancellation_token: self.cancellation_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[tokio::test]
    async fn polls_immediately_and_then_every_tick() {
        let reader = PollingReader::new("test", Duration::from_millis(20));
        let calls = Arc::new(AtomicUsize::new(0));
        let latest = Arc::new(Mutex::new(0usize));

        let fetch_calls = calls.clone();
        let apply_latest = latest.clone();
        reader.start(
            move || {
                let n = fetch_calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok::<usize, String>(n) }
            },
            move |result| {
                *apply_latest.lock().unwrap() = result.unwrap();
            },
        );

        sleep(Duration::from_millis(5)).await;
        assert!(calls.load(Ordering::SeqCst) >= 1, "first call is immediate");

        sleep(Duration::from_millis(70)).await;
        let seen = calls.load(Ordering::SeqCst);
        assert!(seen >= 3, "expected at least 3 calls, saw {seen}");
        assert_eq!(*latest.lock().unwrap(), seen);
        reader.stop();
    }

    #[tokio::test]
    async fn stop_clears_the_timer() {
        let reader = PollingReader::new("test", Duration::from_millis(10));
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch_calls = calls.clone();
        reader.start(
            move || {
                fetch_calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<(), String>(()) }
            },
            |_| {},
        );

        sleep(Duration::from_millis(35)).await;
        reader.stop();
        sleep(Duration::from_millis(20)).await;

        let after_stop = calls.load(Ordering::SeqCst);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
        assert!(!reader.is_active());
    }

    #[tokio::test]
    async fn fetch_failures_do_not_kill_the_loop() {
        let reader = PollingReader::new("test", Duration::from_millis(10));
        let calls = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));

        let fetch_calls = calls.clone();
        let apply_errors = errors.clone();
        reader.start(
            move || {
                let n = fetch_calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n % 2 == 0 {
                        Err("rpc unreachable".to_string())
                    } else {
                        Ok(n)
                    }
                }
            },
            move |result| {
                if result.is_err() {
                    apply_errors.fetch_add(1, Ordering::SeqCst);
                }
            },
        );

        sleep(Duration::from_millis(80)).await;
        reader.stop();

        assert!(calls.load(Ordering::SeqCst) >= 4);
        assert!(errors.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let reader = PollingReader::new("test", Duration::from_millis(10));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let fetch_calls = calls.clone();
            reader.start(
                move || {
                    fetch_calls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<(), String>(()) }
                },
                |_| {},
            );
        }

        sleep(Duration::from_millis(45)).await;
        reader.stop();

        // A doubled loop would poll roughly twice per tick.
        assert!(calls.load(Ordering::SeqCst) <= 7);
    }
}
