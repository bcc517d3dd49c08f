use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Mutex;

/// Tracks submissions that are still running, one per key.
///
/// A second submission for a key that already holds a ticket is refused; the ticket
/// releases the key when dropped, including on early return or error.
#[derive(Debug)]
pub struct InFlight<K: Eq + Hash + Clone> {
    active: Mutex<HashSet<K>>,
}

impl<K: Eq + Hash + Clone> Default for InFlight<K> {
    fn default() -> Self {
        Self {
            active: Mutex::new(HashSet::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, key: K) -> Option<Ticket<'_, K>> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.clone()) {
            return None;
        }
        Some(Ticket { owner: self, key })
    }

    pub fn is_active(&self, key: &K) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }
}

#[must_use = "the key is released as soon as the ticket is dropped"]
#[derive(Debug)]
pub struct Ticket<'a, K: Eq + Hash + Clone> {
    owner: &'a InFlight<K>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for Ticket<'_, K> {
    fn drop(&mut self) {
        self.owner
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}
