//! Debounce Scheduler
//!
//! Coalesces bursts of persistence intents into one delayed write per key.
//! Each key owns at most one pending timer; a newer intent for the same key
//! aborts that timer and restarts the window with the newer payload. Once a
//! timer has fired, its write is in flight and can no longer be superseded.
//!
//! Must be driven from inside a Tokio runtime.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::SyncResult;

type PersistFn<K, P> = Arc<dyn Fn(K, P) -> BoxFuture<'static, SyncResult<()>> + Send + Sync>;
type PendingTable<K> = Arc<Mutex<HashMap<K, PendingWrite>>>;

struct PendingWrite {
    ticket: u64,
    handle: JoinHandle<()>,
}

pub struct Debouncer<K, P> {
    name: &'static str,
    window: Duration,
    persist: PersistFn<K, P>,
    pending: PendingTable<K>,
    next_ticket: AtomicU64,
}

impl<K, P> Debouncer<K, P>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    P: Send + 'static,
{
    /// `persist` is invoked with the latest payload once `window` passes
    /// without a newer intent for the same key.
    pub fn new<F, Fut>(name: &'static str, window: Duration, persist: F) -> Self
    where
        F: Fn(K, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SyncResult<()>> + Send + 'static,
    {
        Self {
            name,
            window,
            persist: Arc::new(move |key, payload| persist(key, payload).boxed()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Record an intent to persist `payload` under `key`, superseding any
    /// pending intent for the same key.
    pub fn schedule(&self, key: K, payload: P) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        // Held across the spawn so the new task cannot look up its entry before it exists.
        let mut pending = self.pending.lock();
        let handle = tokio::spawn(fire(
            self.name,
            self.window,
            key.clone(),
            payload,
            ticket,
            Arc::clone(&self.pending),
            Arc::clone(&self.persist),
        ));

        if let Some(previous) = pending.insert(key.clone(), PendingWrite { ticket, handle }) {
            previous.handle.abort();
            debug!(scheduler = self.name, ?key, "superseded pending write");
        } else {
            debug!(scheduler = self.name, ?key, "scheduled write");
        }
    }

    /// Drop the pending intent for `key`, if any. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.lock().remove(key) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop every pending intent. In-flight writes are not affected.
    pub fn cancel_all(&self) {
        let drained: Vec<PendingWrite> = self.pending.lock().drain().map(|(_, entry)| entry).collect();
        if !drained.is_empty() {
            debug!(scheduler = self.name, count = drained.len(), "cancelled pending writes");
        }
        for entry in drained {
            entry.handle.abort();
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.lock().contains_key(key)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl<K, P> Drop for Debouncer<K, P> {
    fn drop(&mut self) {
        for (_, entry) in self.pending.lock().drain() {
            entry.handle.abort();
        }
    }
}

async fn fire<K, P>(
    name: &'static str,
    window: Duration,
    key: K,
    payload: P,
    ticket: u64,
    pending: PendingTable<K>,
    persist: PersistFn<K, P>,
) where
    K: Eq + Hash + Clone + Debug,
{
    tokio::time::sleep(window).await;

    {
        let mut table = pending.lock();
        match table.get(&key) {
            Some(entry) if entry.ticket == ticket => {
                table.remove(&key);
            }
            // superseded or cancelled between wake-up and lock
            _ => return,
        }
    }

    debug!(scheduler = name, ?key, "window elapsed, persisting");
    if let Err(err) = persist(key.clone(), payload).await {
        warn!(scheduler = name, ?key, error = %err, "debounced write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    type Log<K, P> = Arc<Mutex<Vec<(K, P)>>>;

    fn recording<K, P>(window_ms: u64) -> (Debouncer<K, P>, Log<K, P>)
    where
        K: Eq + Hash + Clone + Debug + Send + 'static,
        P: Send + 'static,
    {
        let log: Log<K, P> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let debouncer = Debouncer::new("test", Duration::from_millis(window_ms), move |key, payload| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push((key, payload));
                Ok(())
            }
        });
        (debouncer, log)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_latest_payload() {
        let (debouncer, log) = recording::<u32, &'static str>(500);

        debouncer.schedule(1, "first");
        sleep_ms(100).await;
        debouncer.schedule(1, "second");
        sleep_ms(100).await;
        debouncer.schedule(1, "third");
        assert_eq!(debouncer.pending_len(), 1);

        sleep_ms(600).await;
        assert_eq!(*log.lock(), vec![(1, "third")]);
        assert!(!debouncer.is_pending(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_intent_restarts_window() {
        let (debouncer, log) = recording::<(), u32>(500);

        debouncer.schedule((), 1);
        sleep_ms(400).await;
        debouncer.schedule((), 2);
        sleep_ms(200).await;
        assert!(log.lock().is_empty(), "window restarted at 400ms");

        sleep_ms(400).await;
        assert_eq!(*log.lock(), vec![((), 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_debounce_independently() {
        let (debouncer, log) = recording::<u32, &'static str>(500);

        debouncer.schedule(1, "one");
        sleep_ms(100).await;
        debouncer.schedule(2, "two");

        sleep_ms(450).await;
        assert_eq!(*log.lock(), vec![(1, "one")]);

        sleep_ms(100).await;
        assert_eq!(*log.lock(), vec![(1, "one"), (2, "two")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_drops_pending_writes() {
        let (debouncer, log) = recording::<u32, u32>(500);

        debouncer.schedule(1, 10);
        debouncer.schedule(2, 20);
        debouncer.cancel_all();
        assert_eq!(debouncer.pending_len(), 0);

        sleep_ms(1000).await;
        assert!(log.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_single_key() {
        let (debouncer, log) = recording::<u32, u32>(500);

        debouncer.schedule(1, 10);
        debouncer.schedule(2, 20);
        assert!(debouncer.cancel(&1));
        assert!(!debouncer.cancel(&1));

        sleep_ms(600).await;
        assert_eq!(*log.lock(), vec![(2, 20)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_write_is_not_superseded() {
        let log: Log<u32, u32> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let debouncer = Debouncer::new("slow", Duration::from_millis(500), move |key, payload| {
            let sink = Arc::clone(&sink);
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                sink.lock().push((key, payload));
                Ok(())
            }
        });

        debouncer.schedule(7, 1);
        // fires at 500ms, completes at 800ms
        sleep_ms(550).await;
        debouncer.schedule(7, 2);

        sleep_ms(1000).await;
        assert_eq!(*log.lock(), vec![(7, 1), (7, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_clears_entry() {
        let debouncer: Debouncer<u32, u32> =
            Debouncer::new("failing", Duration::from_millis(100), |_, _| async {
                Err(SyncError::Remote("503 Service Unavailable".to_string()))
            });

        debouncer.schedule(1, 1);
        sleep_ms(200).await;
        assert_eq!(debouncer.pending_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_timers() {
        let (debouncer, log) = recording::<u32, u32>(500);
        debouncer.schedule(1, 1);
        drop(debouncer);

        sleep_ms(1000).await;
        assert!(log.lock().is_empty());
    }
}
