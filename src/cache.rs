//! Bounded TTL cache with a process-wide sweep.
//!
//! Each resolver build owns one [`Cache`]; the cache memoizes resolved
//! sub-graphs within and across resolution calls. The policy is LRU combined
//! with a TTL:
//!
//! - `get` refreshes the access stamp on a hit and expires-and-deletes a
//!   stale entry on the spot.
//! - `set` stamps the entry and registers the cache with a process-wide
//!   registry so the periodic sweep can find it.
//! - `vacuum` (also reachable as `evict(None)`) keeps the `max_size` most
//!   recently used entries that are still inside the TTL window; everything
//!   else is dropped. O(n log n) per pass.
//!
//! A background thread sweeps every registered cache on a fixed interval and
//! reclaims registry slots whose cache has been idle longer than its own
//! lifetime (or has been dropped). The thread starts lazily with the first
//! registration and must be stopped explicitly via
//! [`stop_background_sweep`] when a host (or a test harness) wants no timer
//! leaking past its lifecycle; a later registration starts it again.
//!
//! Entries sit behind a mutex, so concurrent resolutions against one
//! resolver cannot race on cache writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_SIZE: usize = 1024;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Entry<V> {
    value: V,
    stamp: Instant,
}

struct State<V> {
    entries: HashMap<String, Entry<V>>,
    /// Last get-hit or set; drives idle-cache reclamation.
    touched: Instant,
}

struct Shared<V> {
    name: String,
    lifetime: Duration,
    max_size: usize,
    state: Mutex<State<V>>,
}

impl<V> Shared<V> {
    fn vacuum_entries(&self) {
        let now = Instant::now();
        let mut state = lock(&self.state);
        let mut stamped: Vec<(String, Instant)> =
            state.entries.iter().map(|(id, entry)| (id.clone(), entry.stamp)).collect();
        stamped.sort_by(|a, b| b.1.cmp(&a.1));

        let keep: Vec<String> = stamped
            .into_iter()
            .take(self.max_size)
            .take_while(|(_, stamp)| now.duration_since(*stamp) <= self.lifetime)
            .map(|(id, _)| id)
            .collect();

        if keep.len() < state.entries.len() {
            let mut kept = HashMap::with_capacity(keep.len());
            for id in keep {
                if let Some(entry) = state.entries.remove(&id) {
                    kept.insert(id, entry);
                }
            }
            tracing::debug!(cache = %self.name, retained = kept.len(), "vacuumed cache");
            state.entries = kept;
        }
    }
}

/// Object-safe view of a cache used by the sweep registry.
trait Sweepable: Send + Sync {
    fn vacuum(&self);
    fn is_idle(&self, now: Instant) -> bool;
}

impl<V: Send + 'static> Sweepable for Shared<V> {
    fn vacuum(&self) {
        self.vacuum_entries();
    }

    fn is_idle(&self, now: Instant) -> bool {
        let state = lock(&self.state);
        now.duration_since(state.touched) > self.lifetime
    }
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static REGISTRY: Lazy<Mutex<HashMap<u64, Weak<dyn Sweepable>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Default)]
struct StopSignal {
    stop: Mutex<bool>,
    wake: Condvar,
}

struct Sweeper {
    handle: Option<thread::JoinHandle<()>>,
    signal: Arc<StopSignal>,
}

static SWEEPER: Lazy<Mutex<Sweeper>> =
    Lazy::new(|| Mutex::new(Sweeper { handle: None, signal: Arc::new(StopSignal::default()) }));

fn ensure_sweeper() {
    let mut sweeper = lock(&SWEEPER);
    if sweeper.handle.is_some() {
        return;
    }
    let signal = Arc::new(StopSignal::default());
    let thread_signal = Arc::clone(&signal);
    let spawned = thread::Builder::new().name("cache-sweep".to_string()).spawn(move || {
        // The stop flag is re-checked after every re-acquisition so a stop
        // request issued while a sweep pass runs is not missed.
        let mut stopped = lock(&thread_signal.stop);
        while !*stopped {
            let (guard, _) = thread_signal
                .wake
                .wait_timeout(stopped, SWEEP_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner);
            stopped = guard;
            if *stopped {
                break;
            }
            drop(stopped);
            sweep_once();
            stopped = lock(&thread_signal.stop);
        }
    });
    if let Ok(handle) = spawned {
        sweeper.signal = signal;
        sweeper.handle = Some(handle);
    }
}

/// One sweep pass: vacuum every registered cache and drop registry slots
/// whose cache is gone or idle beyond its own lifetime.
fn sweep_once() {
    let now = Instant::now();
    let mut registry = lock(&REGISTRY);
    registry.retain(|_, weak| match weak.upgrade() {
        Some(shared) => {
            shared.vacuum();
            !shared.is_idle(now)
        }
        None => false,
    });
}

/// Stop the background sweep thread and clear the sweep registry.
///
/// Hosts and test harnesses call this between independent runs so the timer
/// does not leak across lifecycle boundaries. Caches themselves stay valid;
/// the next registration starts a fresh sweeper.
pub fn stop_background_sweep() {
    let handle = {
        let mut sweeper = lock(&SWEEPER);
        *lock(&sweeper.signal.stop) = true;
        sweeper.signal.wake.notify_all();
        sweeper.handle.take()
    };
    if let Some(handle) = handle {
        let _ = handle.join();
    }
    lock(&REGISTRY).clear();
}

/// Generic key→value store with per-entry access stamps, a maximum entry
/// count and a lazy + periodic vacuum policy.
pub struct Cache<V> {
    id: u64,
    shared: Arc<Shared<V>>,
}

impl<V: Clone + Send + 'static> Cache<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Cache::with_limits(name, DEFAULT_LIFETIME, DEFAULT_MAX_SIZE)
    }

    pub fn with_limits(name: impl Into<String>, lifetime: Duration, max_size: usize) -> Self {
        Cache {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            shared: Arc::new(Shared {
                name: name.into(),
                lifetime,
                max_size,
                state: Mutex::new(State { entries: HashMap::new(), touched: Instant::now() }),
            }),
        }
    }

    /// Look up `key`. A stale entry is deleted as a side effect and reads as
    /// absent; a hit refreshes the entry's access stamp.
    pub fn get(&self, key: &str) -> Option<V> {
        let hit = {
            let now = Instant::now();
            let mut state = lock(&self.shared.state);
            match state.entries.get_mut(key) {
                Some(entry) if now.duration_since(entry.stamp) <= self.shared.lifetime => {
                    entry.stamp = now;
                    let value = entry.value.clone();
                    state.touched = now;
                    Some(value)
                }
                Some(_) => {
                    state.entries.remove(key);
                    None
                }
                None => None,
            }
        };
        if hit.is_some() {
            self.register();
        }
        hit
    }

    /// Insert or overwrite `key`, stamping the current time, and make sure
    /// the periodic sweep knows about this cache.
    pub fn set(&self, key: impl Into<String>, value: V) -> V {
        {
            let now = Instant::now();
            let mut state = lock(&self.shared.state);
            state.entries.insert(key.into(), Entry { value: value.clone(), stamp: now });
            state.touched = now;
        }
        self.register();
        value
    }

    /// Delete `key` if given, then run a vacuum pass. `evict(None)` is a
    /// plain vacuum.
    pub fn evict(&self, key: Option<&str>) -> &Self {
        if let Some(key) = key {
            lock(&self.shared.state).entries.remove(key);
        }
        self.shared.vacuum_entries();
        self
    }

    /// Drop every entry.
    pub fn flush(&self) -> &Self {
        lock(&self.shared.state).entries.clear();
        self
    }

    pub fn len(&self) -> usize {
        lock(&self.shared.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.shared.state).entries.contains_key(key)
    }

    fn register(&self) {
        // Never called with the state lock held; the sweep thread takes the
        // registry lock first and the cache state lock second.
        let weak = Arc::downgrade(&self.shared) as Weak<dyn Sweepable>;
        lock(&REGISTRY).insert(self.id, weak);
        ensure_sweeper();
    }
}

impl<V> Drop for Cache<V> {
    fn drop(&mut self) {
        lock(&REGISTRY).remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(id: u64) -> bool {
        lock(&REGISTRY).contains_key(&id)
    }

    #[test]
    fn vacuum_retains_the_most_recently_used_entries() {
        let cache: Cache<u32> = Cache::with_limits("vacuum", DEFAULT_LIFETIME, 3);
        for n in 0..5u32 {
            cache.set(format!("k{n}"), n);
            thread::sleep(Duration::from_millis(2));
        }
        // Touch k0 so it outranks the middle entries.
        assert_eq!(cache.get("k0"), Some(0));

        cache.evict(None);
        assert_eq!(cache.len(), 3);
        assert!(cache.contains("k0"));
        assert!(cache.contains("k4"));
        assert!(cache.contains("k3"));

        stop_background_sweep();
    }

    #[test]
    fn stale_entries_read_as_absent_and_are_deleted() {
        let cache: Cache<&'static str> = Cache::with_limits("ttl", Duration::from_millis(20), 16);
        cache.set("k", "v");
        assert_eq!(cache.get("k"), Some("v"));

        thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);

        stop_background_sweep();
    }

    #[test]
    fn vacuum_drops_expired_entries_even_under_the_size_limit() {
        let cache: Cache<u32> = Cache::with_limits("expiry", Duration::from_millis(10), 16);
        cache.set("a", 1);
        cache.set("b", 2);
        thread::sleep(Duration::from_millis(30));

        cache.evict(None);
        assert_eq!(cache.len(), 0);

        stop_background_sweep();
    }

    #[test]
    fn evict_with_a_key_deletes_that_entry() {
        let cache: Cache<u32> = Cache::new("evict");
        cache.set("a", 1);
        cache.set("b", 2);
        cache.evict(Some("a"));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));

        stop_background_sweep();
    }

    #[test]
    fn flush_clears_everything() {
        let cache: Cache<u32> = Cache::new("flush");
        cache.set("a", 1);
        cache.flush();
        assert!(cache.is_empty());

        stop_background_sweep();
    }

    #[test]
    fn dropped_caches_leave_the_registry_after_a_sweep() {
        let cache: Cache<u32> = Cache::new("sweep");
        cache.set("a", 1);
        let id = cache.id;
        assert!(registered(id));

        drop(cache);
        sweep_once();
        assert!(!registered(id));

        stop_background_sweep();
    }
}
