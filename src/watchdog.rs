//! Watchdog timer
//!
//! A countdown that fires its listeners once when no reset arrives in
//! time. Each [`Watchdog::run`] call is a single countdown; the caller
//! resubmits it after every expiry if continuous monitoring is wanted.
//! Keeping the contract to one cycle per invocation makes the concurrent
//! behavior trivial to reason about.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

/// Callback invoked with the elapsed time when the countdown expires
pub type TimeoutCallback = Box<dyn Fn(Duration) + Send + Sync>;

/// Handle used to deregister a timeout listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Countdown timer shared between the orchestrator and its tasks
///
/// `reset` may be called concurrently with a running countdown; it only
/// affects the next elapsed computation.
pub struct Watchdog {
    /// Elapsed time after which the countdown expires
    timeout: Duration,
    /// How often the countdown re-checks the elapsed time
    poll: Duration,
    /// When the current countdown started
    started: Mutex<Instant>,
    /// Elapsed time as of the last poll
    passed: Mutex<Duration>,
    /// Registered listeners, in registration order
    listeners: Mutex<Vec<(ListenerId, TimeoutCallback)>>,
    next_id: AtomicU64,
}

impl Watchdog {
    /// Create a watchdog with the given timeout and poll interval
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Self {
            timeout,
            poll,
            started: Mutex::new(Instant::now()),
            passed: Mutex::new(Duration::ZERO),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a listener; returns a handle for [`Watchdog::remove`]
    pub fn add(&self, callback: TimeoutCallback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((id, callback));
        id
    }

    /// Deregister a listener; returns whether it was registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Elapsed time as of the last poll of the current countdown
    pub fn passed(&self) -> Duration {
        *lock(&self.passed)
    }

    /// Restart the countdown clock
    pub fn reset(&self) {
        *lock(&self.started) = Instant::now();
        *lock(&self.passed) = Duration::ZERO;
    }

    /// Run one countdown cycle
    ///
    /// Resets the clock, then polls until the elapsed time reaches the
    /// timeout; fires every listener exactly once, in registration order,
    /// and returns. Does not rearm itself.
    pub async fn run(&self) {
        self.reset();

        loop {
            sleep(self.poll).await;

            let elapsed = lock(&self.started).elapsed();
            *lock(&self.passed) = elapsed;

            if elapsed >= self.timeout {
                debug!("watchdog expired after {:?}", elapsed);
                for (_, callback) in lock(&self.listeners).iter() {
                    callback(elapsed);
                }
                return;
            }
        }
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("timeout", &self.timeout)
            .field("poll", &self.poll)
            .field("listeners", &lock(&self.listeners).len())
            .finish()
    }
}

// A poisoned lock only means a listener panicked mid-fire; the guarded
// data is still valid.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_millis(300_000);
    const POLL: Duration = Duration::from_millis(30_000);

    fn counting(watchdog: &Watchdog) -> (Arc<AtomicU32>, ListenerId) {
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        let id = watchdog.add(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (count, id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_and_stops() {
        let watchdog = Arc::new(Watchdog::new(TIMEOUT, POLL));
        let (count, _) = counting(&watchdog);

        let runner = Arc::clone(&watchdog);
        tokio::spawn(async move { runner.run().await });

        // One poll interval of slack over the timeout.
        sleep(TIMEOUT + POLL).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(watchdog.passed() >= TIMEOUT);

        // Not resubmitted, so it must not fire again.
        sleep(TIMEOUT * 2).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_defers_expiry() {
        let watchdog = Arc::new(Watchdog::new(TIMEOUT, POLL));
        let (count, _) = counting(&watchdog);

        let runner = Arc::clone(&watchdog);
        tokio::spawn(async move { runner.run().await });

        sleep(Duration::from_millis(150_000)).await;
        watchdog.reset();

        // 200s after the reset: under the timeout, must not have fired.
        sleep(Duration::from_millis(200_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // 350s after the reset: past the timeout.
        sleep(Duration::from_millis(150_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listeners_fire_in_registration_order() {
        let watchdog = Arc::new(Watchdog::new(TIMEOUT, POLL));
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            watchdog.add(Box::new(move |_| {
                order.lock().unwrap().push(tag);
            }));
        }

        let runner = Arc::clone(&watchdog);
        tokio::spawn(async move { runner.run().await });
        sleep(TIMEOUT + POLL).await;

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_listener_does_not_fire() {
        let watchdog = Arc::new(Watchdog::new(TIMEOUT, POLL));
        let (count, id) = counting(&watchdog);

        assert!(watchdog.remove(id));
        assert!(!watchdog.remove(id));

        let runner = Arc::clone(&watchdog);
        tokio::spawn(async move { runner.run().await });
        sleep(TIMEOUT + POLL).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_receives_elapsed_time() {
        let watchdog = Arc::new(Watchdog::new(TIMEOUT, POLL));
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        watchdog.add(Box::new(move |elapsed| {
            *slot.lock().unwrap() = Some(elapsed);
        }));

        let runner = Arc::clone(&watchdog);
        tokio::spawn(async move { runner.run().await });
        sleep(TIMEOUT + POLL).await;

        let elapsed = seen.lock().unwrap().expect("listener fired");
        assert!(elapsed >= TIMEOUT);
        assert!(elapsed <= TIMEOUT + POLL);
    }
}
