//! Specialized collection types

use std::collections::HashMap;
use std::hash::Hash;

pub use slotmap::{DefaultKey, SlotMap};

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<DefaultKey, T>;

struct LruNode<K, V> {
    key: K,
    value: V,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

/// Bounded least-recently-used map.
///
/// The cache never runs side effects of its own: whatever falls out of it
/// (capacity eviction or same-key replacement) is handed to the `on_evict`
/// hook supplied by the caller of [`LruCache::put`]. Nodes live in a slot map
/// so relinking is O(1) without unsafe pointers.
pub struct LruCache<K, V> {
    capacity: usize,
    index: HashMap<K, DefaultKey>,
    nodes: HandleMap<LruNode<K, V>>,
    /// Most recently used
    head: Option<DefaultKey>,
    /// Least recently used
    tail: Option<DefaultKey>,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            index: HashMap::new(),
            nodes: HandleMap::new(),
            head: None,
            tail: None,
        }
    }

    /// Maximum number of entries kept before eviction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `key` is present (does not touch recency)
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Look up a value and mark it most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.touch(slot);
        self.nodes.get(slot).map(|node| &node.value)
    }

    /// Look up a value without changing recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        let slot = self.index.get(key)?;
        self.nodes.get(*slot).map(|node| &node.value)
    }

    /// Insert `value` under `key` as the most recently used entry.
    ///
    /// A previous value under the same key, and every entry pushed out by the
    /// capacity bound, is passed to `on_evict`.
    pub fn put<F>(&mut self, key: K, value: V, mut on_evict: F)
    where
        F: FnMut(K, V),
    {
        if let Some(old) = self.remove_entry(&key) {
            on_evict(old.0, old.1);
        }

        let slot = self.nodes.insert(LruNode {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.index.insert(key, slot);
        self.push_front(slot);

        while self.nodes.len() > self.capacity {
            match self.pop_lru() {
                Some((evicted_key, evicted)) => on_evict(evicted_key, evicted),
                None => break,
            }
        }
    }

    /// Insert and silently drop anything evicted
    pub fn insert(&mut self, key: K, value: V) {
        self.put(key, value, |_, _| {});
    }

    /// Remove an entry by key
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Remove and return the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let slot = self.tail?;
        self.unlink(slot);
        let node = self.nodes.remove(slot)?;
        self.index.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Remove every entry, least recently used first
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut drained = Vec::with_capacity(self.len());
        while let Some(entry) = self.pop_lru() {
            drained.push(entry);
        }
        drained
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            match self.nodes.get(slot) {
                Some(node) => {
                    keys.push(node.key.clone());
                    cursor = node.next;
                }
                None => break,
            }
        }
        keys
    }

    fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let slot = self.index.remove(key)?;
        self.unlink(slot);
        self.nodes.remove(slot).map(|node| (node.key, node.value))
    }

    fn touch(&mut self, slot: DefaultKey) {
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }

    fn push_front(&mut self, slot: DefaultKey) {
        let old_head = self.head;
        if let Some(node) = self.nodes.get_mut(slot) {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(head) = old_head.and_then(|h| self.nodes.get_mut(h)) {
            head.prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn unlink(&mut self, slot: DefaultKey) {
        let (prev, next) = match self.nodes.get(slot) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.nodes.get_mut(n)) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }

        if let Some(node) = self.nodes.get_mut(slot) {
            node.prev = None;
            node.next = None;
        }
    }
}
