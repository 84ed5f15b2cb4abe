//! Generic object pool with an LRU idle store
//!
//! Items are created by a factory, handed out as Active, reset and parked as
//! Idle on release, and destroyed only when the idle store overflows. A
//! destroyed item first passes through the [`DisposalQueue`] so its disposer
//! runs outside the call that evicted it.
//!
//! # Usage
//!
//! ```rust
//! use sphere_engine::pool::{ObjectPool, PoolItem, PoolState};
//!
//! #[derive(Default)]
//! struct Bullet { state: Option<PoolState>, damage: u32 }
//!
//! impl PoolItem for Bullet {
//!     fn set_pool_state(&mut self, state: PoolState) {
//!         self.state = Some(state);
//!     }
//! }
//!
//! let mut pool = ObjectPool::builder("bullets", 8)
//!     .factory(|_id| Bullet::default())
//!     .reset(|mut b: Bullet| { b.damage = 0; b })
//!     .build()
//!     .unwrap();
//!
//! let id = pool.acquire(None);
//! pool.get_mut(id).unwrap().damage = 3;
//! pool.release(id).unwrap();
//! assert_eq!(pool.acquire(Some(&id)), id);
//! ```

use super::disposal::{DisposalQueue, DisposeResult, DrainReport};
use super::{PoolError, PoolItem, PoolState, PoolStats, SlotId};
use crate::foundation::collections::LruCache;
use std::collections::HashMap;
use std::hash::Hash;

type Factory<T> = Box<dyn FnMut(SlotId) -> T>;
type Reset<T> = Box<dyn FnMut(T) -> T>;
type Disposer<T> = Box<dyn FnMut(T) -> DisposeResult>;
type KeyOf<T, K> = Box<dyn Fn(SlotId, &T) -> K>;

/// Builder for [`ObjectPool`]
pub struct PoolBuilder<T, K = SlotId> {
    name: String,
    max_size: usize,
    factory: Option<Factory<T>>,
    reset: Option<Reset<T>>,
    disposer: Option<Disposer<T>>,
    key_of: KeyOf<T, K>,
}

impl<T: PoolItem + 'static> PoolBuilder<T, SlotId> {
    fn new(name: impl Into<String>, max_size: usize) -> Self {
        Self {
            name: name.into(),
            max_size,
            factory: None,
            reset: None,
            disposer: None,
            key_of: Box::new(|id, _| id),
        }
    }
}

impl<T: PoolItem + 'static, K: Hash + Eq + Clone + 'static> PoolBuilder<T, K> {
    /// Factory called on a miss; receives the id the new item will carry
    pub fn factory(mut self, factory: impl FnMut(SlotId) -> T + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Reset applied on release (defaults to identity)
    pub fn reset(mut self, reset: impl FnMut(T) -> T + 'static) -> Self {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Disposer run for evicted items (defaults to dropping)
    pub fn dispose(mut self, disposer: impl FnMut(T) -> DisposeResult + 'static) -> Self {
        self.disposer = Some(Box::new(disposer));
        self
    }

    /// Key idle items by something other than their id
    pub fn key_of<K2>(self, key_of: impl Fn(SlotId, &T) -> K2 + 'static) -> PoolBuilder<T, K2> {
        PoolBuilder {
            name: self.name,
            max_size: self.max_size,
            factory: self.factory,
            reset: self.reset,
            disposer: self.disposer,
            key_of: Box::new(key_of),
        }
    }

    /// Finish the pool. Fails if no factory was supplied.
    pub fn build(self) -> Result<ObjectPool<T, K>, PoolError> {
        let factory = self
            .factory
            .ok_or_else(|| PoolError::NotInitialized(self.name.clone()))?;

        log::info!("Created object pool '{}' with idle capacity {}", self.name, self.max_size);

        Ok(ObjectPool {
            name: self.name,
            max_size: self.max_size,
            next_id: 0,
            factory,
            reset: self.reset.unwrap_or_else(|| Box::new(|item| item)),
            disposer: self.disposer.unwrap_or_else(|| Box::new(|_| Ok(()))),
            key_of: self.key_of,
            active: HashMap::new(),
            idle: LruCache::new(self.max_size),
            states: HashMap::new(),
            disposal: DisposalQueue::new(),
            stats: PoolStats::default(),
        })
    }
}

/// Pool of reusable items with Active / Idle / Disposing bookkeeping
pub struct ObjectPool<T, K = SlotId> {
    name: String,
    max_size: usize,
    next_id: u64,
    factory: Factory<T>,
    reset: Reset<T>,
    disposer: Disposer<T>,
    key_of: KeyOf<T, K>,
    active: HashMap<SlotId, T>,
    idle: LruCache<K, (SlotId, T)>,
    /// Single source of truth for the state of every live id
    states: HashMap<SlotId, PoolState>,
    disposal: DisposalQueue<T>,
    stats: PoolStats,
}

impl<T: PoolItem + 'static> ObjectPool<T, SlotId> {
    /// Start building a pool whose idle store holds at most `max_size` items
    pub fn builder(name: impl Into<String>, max_size: usize) -> PoolBuilder<T, SlotId> {
        PoolBuilder::new(name, max_size)
    }
}

impl<T: PoolItem, K: Hash + Eq + Clone> ObjectPool<T, K> {
    /// Pool name used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Idle store capacity
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Check out an item.
    ///
    /// A keyed idle item wins, then the least recently used idle item, then
    /// the factory.
    pub fn acquire(&mut self, key: Option<&K>) -> SlotId {
        let reused = match key.and_then(|k| self.idle.remove(k)) {
            Some(entry) => Some(entry),
            None => self.idle.pop_lru().map(|(_, entry)| entry),
        };

        let (id, mut item) = match reused {
            Some(entry) => {
                self.stats.hits += 1;
                entry
            }
            None => {
                self.stats.misses += 1;
                let id = SlotId::new(self.next_id);
                self.next_id += 1;
                (id, (self.factory)(id))
            }
        };

        item.set_pool_state(PoolState::Active);
        self.active.insert(id, item);
        self.states.insert(id, PoolState::Active);
        self.stats.acquisitions += 1;
        log::trace!("Pool '{}' acquired {id}", self.name);
        id
    }

    /// Return an item to the idle store.
    ///
    /// The item is reset before it is parked. Parking may evict an older idle
    /// item into the disposal queue.
    pub fn release(&mut self, id: SlotId) -> Result<(), PoolError> {
        let item = self.active.remove(&id).ok_or_else(|| PoolError::NotActive {
            pool: self.name.clone(),
            id,
            state: self.states.get(&id).copied(),
        })?;

        let mut item = (self.reset)(item);
        item.set_pool_state(PoolState::Idle);
        let key = (self.key_of)(id, &item);
        self.states.insert(id, PoolState::Idle);
        self.stats.releases += 1;

        let name = &self.name;
        let states = &mut self.states;
        let disposal = &mut self.disposal;
        let stats = &mut self.stats;
        self.idle.put(key, (id, item), |_, (evicted_id, mut evicted)| {
            log::debug!("Pool '{name}' evicting idle {evicted_id}");
            evicted.set_pool_state(PoolState::Disposing);
            states.insert(evicted_id, PoolState::Disposing);
            stats.evictions += 1;
            disposal.enqueue(evicted_id, evicted);
        });

        if self.idle.len() > self.max_size {
            log::warn!(
                "Pool '{}' idle store holds {} items, above its maximum of {}",
                self.name,
                self.idle.len(),
                self.max_size
            );
        }
        Ok(())
    }

    /// Run the disposer for everything evicted since the last flush
    pub fn flush_disposals(&mut self) -> DrainReport {
        if self.disposal.is_empty() {
            return DrainReport::default();
        }
        let disposer = &mut self.disposer;
        let states = &mut self.states;
        // Only ids still marked Disposing are disposed; the state entry goes
        // with them, so a disposed id leaves nothing behind
        let report = self.disposal.drain(
            |id| {
                if states.get(&id) == Some(&PoolState::Disposing) {
                    states.remove(&id);
                    true
                } else {
                    false
                }
            },
            |_, item| disposer(item),
        );
        self.stats.disposals += report.disposed as u64;
        self.stats.disposal_failures += report.failed as u64;
        log::debug!(
            "Pool '{}' disposed {} items ({} failed)",
            self.name,
            report.disposed,
            report.failed
        );
        report
    }

    /// Dispose every item, active ones included, and drain immediately
    pub fn shutdown(&mut self) -> DrainReport {
        let mut active: Vec<_> = self.active.drain().collect();
        active.sort_by_key(|(id, _)| *id);
        let idle = self.idle.drain().into_iter().map(|(_, entry)| entry);

        for (id, mut item) in active.into_iter().chain(idle) {
            item.set_pool_state(PoolState::Disposing);
            self.states.insert(id, PoolState::Disposing);
            self.disposal.enqueue(id, item);
        }
        let report = self.flush_disposals();
        log::info!("Pool '{}' shut down, disposed {} items", self.name, report.disposed);
        report
    }

    /// Borrow an active item
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.active.get(&id)
    }

    /// Mutably borrow an active item
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.active.get_mut(&id)
    }

    /// Lifecycle state of an id, `None` once it has been disposed
    pub fn state_of(&self, id: SlotId) -> Option<PoolState> {
        self.states.get(&id).copied()
    }

    /// Number of ids the pool still tracks, one per live item
    pub fn tracked_ids(&self) -> usize {
        self.states.len()
    }

    /// Active ids in ascending order
    pub fn active_ids(&self) -> Vec<SlotId> {
        let mut ids: Vec<_> = self.active.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over active items (unordered)
    pub fn iter_active(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.active.iter().map(|(id, item)| (*id, item))
    }

    /// Mutably iterate over active items (unordered)
    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> {
        self.active.iter_mut().map(|(id, item)| (*id, item))
    }

    /// Number of active items
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of idle items
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Snapshot of counters and gauges
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.idle.len(),
            active: self.active.len(),
            disposing: self.disposal.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Probe {
        id: SlotId,
        state: Option<PoolState>,
        dirty: bool,
        group: u32,
    }

    impl PoolItem for Probe {
        fn set_pool_state(&mut self, state: PoolState) {
            self.state = Some(state);
        }
    }

    fn probe_pool(max_size: usize, disposed: Rc<RefCell<Vec<SlotId>>>) -> ObjectPool<Probe> {
        ObjectPool::builder("probes", max_size)
            .factory(|id| Probe { id, state: None, dirty: false, group: 0 })
            .reset(|mut p: Probe| {
                p.dirty = false;
                p
            })
            .dispose(move |p: Probe| {
                disposed.borrow_mut().push(p.id);
                Ok(())
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_without_factory_is_not_initialized() {
        let result = ObjectPool::<Probe>::builder("empty", 4).build();
        assert!(matches!(result, Err(PoolError::NotInitialized(name)) if name == "empty"));
    }

    #[test]
    fn test_release_then_keyed_acquire_returns_same_item() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut pool = probe_pool(4, disposed);

        let a = pool.acquire(None);
        let b = pool.acquire(None);
        pool.get_mut(a).unwrap().dirty = true;
        pool.release(a).unwrap();
        pool.release(b).unwrap();

        let again = pool.acquire(Some(&a));
        assert_eq!(again, a);
        let item = pool.get(again).unwrap();
        assert_eq!(item.id, a);
        assert!(!item.dirty, "reset must run on release");
        assert_eq!(item.state, Some(PoolState::Active));

        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.active, 1);
    }

    #[test]
    fn test_unkeyed_acquire_reuses_least_recent() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut pool = probe_pool(4, disposed);

        let ids: Vec<_> = (0..3).map(|_| pool.acquire(None)).collect();
        for id in &ids {
            pool.release(*id).unwrap();
        }
        assert_eq!(pool.acquire(None), ids[0]);
        assert_eq!(pool.acquire(Some(&SlotId::new(999))), ids[1]);
    }

    #[test]
    fn test_eviction_is_deferred_until_flush() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut pool = probe_pool(1, disposed.clone());

        let a = pool.acquire(None);
        let b = pool.acquire(None);
        pool.release(a).unwrap();
        pool.release(b).unwrap();

        // `a` was pushed out but nothing has been disposed yet
        assert!(disposed.borrow().is_empty());
        assert_eq!(pool.state_of(a), Some(PoolState::Disposing));
        assert_eq!(pool.state_of(b), Some(PoolState::Idle));
        assert_eq!(pool.stats().disposing, 1);

        let report = pool.flush_disposals();
        assert_eq!(report.disposed, 1);
        assert_eq!(*disposed.borrow(), vec![a]);
        assert_eq!(pool.state_of(a), None);
        assert_eq!(pool.stats().disposals, 1);
    }

    #[test]
    fn test_each_id_disposed_at_most_once_over_many_cycles() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut pool = probe_pool(2, disposed.clone());

        for round in 0..50 {
            let ids: Vec<_> = (0..(round % 5 + 1)).map(|_| pool.acquire(None)).collect();
            for id in ids {
                pool.release(id).unwrap();
            }
            if round % 3 == 0 {
                pool.flush_disposals();
            }
        }
        pool.shutdown();

        let mut seen = disposed.borrow().clone();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), total);
        assert_eq!(pool.stats().disposals as usize, total);
    }

    #[test]
    fn test_bookkeeping_stays_bounded_over_many_evictions() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut pool = probe_pool(3, disposed.clone());
        let keeper = pool.acquire(None);

        for _ in 0..1000 {
            let ids: Vec<_> = (0..6).map(|_| pool.acquire(None)).collect();
            for id in ids {
                pool.release(id).unwrap();
            }
            pool.flush_disposals();

            let stats = pool.stats();
            assert_eq!(pool.tracked_ids(), stats.active + stats.idle + stats.disposing);
            assert!(pool.tracked_ids() <= 1 + 3);
        }

        assert_eq!(pool.state_of(keeper), Some(PoolState::Active));
        assert!(disposed.borrow().len() >= 1000 * 3);
        assert_eq!(pool.stats().disposals as usize, disposed.borrow().len());
    }

    #[test]
    fn test_every_id_has_exactly_one_state() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut pool = probe_pool(2, disposed);

        let ids: Vec<_> = (0..5).map(|_| pool.acquire(None)).collect();
        for id in &ids[..4] {
            pool.release(*id).unwrap();
        }

        let active = ids.iter().filter(|id| pool.state_of(**id) == Some(PoolState::Active)).count();
        let idle = ids.iter().filter(|id| pool.state_of(**id) == Some(PoolState::Idle)).count();
        let disposing = ids.iter().filter(|id| pool.state_of(**id) == Some(PoolState::Disposing)).count();
        assert_eq!((active, idle, disposing), (1, 2, 2));
        assert_eq!(pool.stats().active + pool.stats().idle + pool.stats().disposing, 5);
    }

    #[test]
    fn test_release_of_inactive_id_is_an_error() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let mut pool = probe_pool(2, disposed);
        let id = pool.acquire(None);
        pool.release(id).unwrap();

        let err = pool.release(id).unwrap_err();
        assert!(matches!(err, PoolError::NotActive { state: Some(PoolState::Idle), .. }));
    }

    #[test]
    fn test_disposal_failure_does_not_block_others() {
        let mut pool = ObjectPool::builder("flaky", 0)
            .factory(|id| Probe { id, state: None, dirty: false, group: 0 })
            .dispose(|p: Probe| {
                if p.id == SlotId::new(0) {
                    Err("device lost".into())
                } else {
                    Ok(())
                }
            })
            .build()
            .unwrap();

        let a = pool.acquire(None);
        let b = pool.acquire(None);
        pool.release(a).unwrap();
        pool.release(b).unwrap();

        let report = pool.flush_disposals();
        assert_eq!((report.disposed, report.failed), (1, 1));
        assert_eq!(pool.stats().disposal_failures, 1);
        assert_eq!(pool.state_of(a), None);
        assert_eq!(pool.state_of(b), None);
    }

    #[test]
    fn test_custom_key_groups_items() {
        let mut pool = ObjectPool::builder("grouped", 4)
            .factory(|id| Probe { id, state: None, dirty: false, group: 0 })
            .key_of(|_, p: &Probe| p.group)
            .build()
            .unwrap();

        let a = pool.acquire(None);
        pool.get_mut(a).unwrap().group = 7;
        let b = pool.acquire(None);
        pool.get_mut(b).unwrap().group = 3;
        pool.release(a).unwrap();
        pool.release(b).unwrap();

        assert_eq!(pool.acquire(Some(&7)), a);
    }
}
