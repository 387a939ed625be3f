//! Recency-ordered hash map
//!
//! Entries live in a slab threaded into a doubly linked list, with a hash
//! index from key to slot. Insert, promote, remove and pop of the oldest
//! entry are all O(1). The front of the list is the most recently used
//! entry, the back the least.

use std::collections::HashMap;
use std::hash::Hash;
use ahash::RandomState;

#[derive(Clone, Copy, Default)]
struct Links {
    newer: Option<usize>,
    older: Option<usize>,
}

enum Slot<K, V> {
    Occupied { key: K, value: V, links: Links },
    /// Vacant slots form a singly linked chain of reusable indices
    Vacant { next_free: Option<usize> },
}

/// Hash map that remembers access order
pub(crate) struct LruList<K, V> {
    index: HashMap<K, usize, RandomState>,
    slots: Vec<Slot<K, V>>,
    newest: Option<usize>,
    oldest: Option<usize>,
    free: Option<usize>,
}

impl<K, V> LruList<K, V>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            slots: Vec::with_capacity(capacity),
            newest: None,
            oldest: None,
            free: None,
        }
    }

    /// Mark `key` most recently used; false if absent
    pub(crate) fn touch(&mut self, key: &K) -> bool {
        let Some(&slot) = self.index.get(key) else {
            return false;
        };
        if self.newest != Some(slot) {
            self.detach(slot);
            self.attach_newest(slot);
        }
        true
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Insert as most recently used, replacing any previous value
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let old = self.remove(&key);
        let slot = self.claim_slot(Slot::Occupied {
            key: key.clone(),
            value,
            links: Links::default(),
        });
        self.attach_newest(slot);
        self.index.insert(key, slot);
        old
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.index.remove(key)?;
        self.detach(slot);
        self.release_slot(slot).map(|(_, value)| value)
    }

    /// Remove and return the least recently used entry
    pub(crate) fn pop_lru(&mut self) -> Option<(K, V)> {
        let slot = self.oldest?;
        self.detach(slot);
        let (key, value) = self.release_slot(slot)?;
        self.index.remove(&key);
        Some((key, value))
    }

    /// Keys from least to most recently used
    pub(crate) fn keys_lru(&self) -> impl Iterator<Item = &K> + '_ {
        let mut cursor = self.oldest;
        std::iter::from_fn(move || match &self.slots[cursor?] {
            Slot::Occupied { key, links, .. } => {
                cursor = links.newer;
                Some(key)
            }
            Slot::Vacant { .. } => None,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    fn links_mut(&mut self, slot: usize) -> Option<&mut Links> {
        match &mut self.slots[slot] {
            Slot::Occupied { links, .. } => Some(links),
            Slot::Vacant { .. } => None,
        }
    }

    fn attach_newest(&mut self, slot: usize) {
        let previous = self.newest;
        if let Some(links) = self.links_mut(slot) {
            *links = Links {
                newer: None,
                older: previous,
            };
        }
        match previous {
            Some(prev) => {
                if let Some(links) = self.links_mut(prev) {
                    links.newer = Some(slot);
                }
            }
            None => self.oldest = Some(slot),
        }
        self.newest = Some(slot);
    }

    fn detach(&mut self, slot: usize) {
        let Some(links) = self.links_mut(slot).map(std::mem::take) else {
            return;
        };

        match links.newer {
            Some(newer) => {
                if let Some(l) = self.links_mut(newer) {
                    l.older = links.older;
                }
            }
            None => self.newest = links.older,
        }
        match links.older {
            Some(older) => {
                if let Some(l) = self.links_mut(older) {
                    l.newer = links.newer;
                }
            }
            None => self.oldest = links.newer,
        }
    }

    fn claim_slot(&mut self, occupied: Slot<K, V>) -> usize {
        match self.free {
            Some(slot) => {
                if let Slot::Vacant { next_free } = self.slots[slot] {
                    self.free = next_free;
                }
                self.slots[slot] = occupied;
                slot
            }
            None => {
                self.slots.push(occupied);
                self.slots.len() - 1
            }
        }
    }

    /// Vacate a detached slot, returning what it held
    fn release_slot(&mut self, slot: usize) -> Option<(K, V)> {
        let vacant = Slot::Vacant {
            next_free: self.free,
        };
        match std::mem::replace(&mut self.slots[slot], vacant) {
            Slot::Occupied { key, value, .. } => {
                self.free = Some(slot);
                Some((key, value))
            }
            previous => {
                self.slots[slot] = previous;
                None
            }
        }
    }
}
