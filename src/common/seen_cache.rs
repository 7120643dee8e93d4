// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use dashmap::DashSet;
use std::collections::VecDeque;
use std::hash::Hash;
use tokio::sync::Mutex;

/// Bounded first-seen set; the oldest key is forgotten once `capacity` is exceeded.
pub struct SeenCache<T> {
    seen: DashSet<T>,
    order: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> SeenCache<T>
where
    T: Copy + Eq + Hash,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: DashSet::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Returns `true` only for first-seen keys.
    pub async fn remember(&self, key: T) -> bool {
        if !self.seen.insert(key) {
            return false;
        }
        let mut guard = self.order.lock().await;
        guard.push_back(key);
        if guard.len() > self.capacity
            && let Some(oldest) = guard.pop_front()
        {
            self.seen.remove(&oldest);
        }
        true
    }

    pub fn contains(&self, key: &T) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_repeats_and_evicts_oldest() {
        let cache = SeenCache::new(2);
        assert!(cache.remember(1u64).await);
        assert!(!cache.remember(1u64).await);
        assert!(cache.remember(2u64).await);
        assert!(cache.remember(3u64).await);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&1));
        assert!(cache.remember(1u64).await);
    }
}
