// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::types::{Pool, Position};
use alloy::primitives::{Address, U256};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryOutcome {
    Added,
    Promoted,
    AlreadyTracked,
    CapacityReached,
    AlreadyHeld,
}

impl RegistryOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, RegistryOutcome::Added | RegistryOutcome::Promoted)
    }
}

/// Copy of both lists, safe to read while the registry keeps changing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub watchlist: Vec<Pool>,
    pub inventory: Vec<Position>,
}

/// Watchlist and inventory. An address lives in at most one of them.
///
/// Not synchronized on its own; the strategy owns it behind its state lock.
#[derive(Debug)]
pub struct PoolRegistry {
    watchlist: Vec<Pool>,
    inventory: Vec<Position>,
    capacity: usize,
}

impl PoolRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            watchlist: Vec::with_capacity(capacity),
            inventory: Vec::new(),
            capacity,
        }
    }

    pub fn add_to_watchlist(&mut self, mut pool: Pool) -> RegistryOutcome {
        if self.contains(&pool.address) {
            tracing::debug!(target: "registry", pool = %pool.address, "Pool already tracked; not added");
            return RegistryOutcome::AlreadyTracked;
        }
        if self.watchlist.len() >= self.capacity {
            tracing::debug!(target: "registry", pool = %pool.address, capacity = self.capacity, "Watchlist full");
            return RegistryOutcome::CapacityReached;
        }
        pool.inspect_attempts = 0;
        self.watchlist.push(pool);
        RegistryOutcome::Added
    }

    pub fn remove_from_watchlist(&mut self, address: &Address) -> bool {
        let before = self.watchlist.len();
        self.watchlist.retain(|p| p.address != *address);
        before != self.watchlist.len()
    }

    pub fn promote_to_inventory(&mut self, position: Position) -> RegistryOutcome {
        let address = position.address();
        if self.is_held(&address) {
            tracing::warn!(target: "registry", pool = %address, "Refusing double promotion");
            return RegistryOutcome::AlreadyHeld;
        }
        self.remove_from_watchlist(&address);
        self.inventory.push(position);
        RegistryOutcome::Promoted
    }

    pub fn remove_from_inventory(&mut self, address: &Address) -> Option<Position> {
        let idx = self.inventory.iter().position(|p| p.address() == *address)?;
        Some(self.inventory.remove(idx))
    }

    pub fn update_reserves(&mut self, address: &Address, reserve_token: U256, reserve_base: U256) {
        if let Some(pool) = self.watched_mut(address) {
            pool.reserve_token = reserve_token;
            pool.reserve_base = reserve_base;
        } else if let Some(position) = self.position_mut(address) {
            position.pool.reserve_token = reserve_token;
            position.pool.reserve_base = reserve_base;
        }
    }

    /// Fold swap activity flags from a fresh pool view.
    pub fn mark_activity(&mut self, address: &Address, buy_seen: bool, sell_seen: bool) {
        let pool = if self.is_watched(address) {
            self.watched_mut(address)
        } else {
            self.position_mut(address).map(|p| &mut p.pool)
        };
        let Some(pool) = pool else {
            return;
        };
        pool.has_buy_seen |= buy_seen;
        pool.has_sell_seen |= sell_seen;
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            watchlist: self.watchlist.clone(),
            inventory: self.inventory.clone(),
        }
    }

    pub fn watched_mut(&mut self, address: &Address) -> Option<&mut Pool> {
        self.watchlist.iter_mut().find(|p| p.address == *address)
    }

    pub fn position_mut(&mut self, address: &Address) -> Option<&mut Position> {
        self.inventory.iter_mut().find(|p| p.address() == *address)
    }

    pub fn positions_mut(&mut self) -> impl Iterator<Item = &mut Position> {
        self.inventory.iter_mut()
    }

    pub fn watchlist(&self) -> &[Pool] {
        &self.watchlist
    }

    pub fn inventory(&self) -> &[Position] {
        &self.inventory
    }

    pub fn spare_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.watchlist.len())
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.is_watched(address) || self.is_held(address)
    }

    pub fn is_watched(&self, address: &Address) -> bool {
        self.watchlist.iter().any(|p| p.address == *address)
    }

    pub fn is_held(&self, address: &Address) -> bool {
        self.inventory.iter().any(|p| p.address() == *address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: u8) -> Pool {
        Pool::new(Address::from([n; 20]), Address::from([n.wrapping_add(100); 20]), 0, 0, 1)
    }

    fn position(n: u8) -> Position {
        Position::open(pool(n), U256::from(10u64), U256::from(100u64), 0, None)
    }

    #[test]
    fn add_rejects_duplicates_and_overflow() {
        let mut reg = PoolRegistry::new(2);
        assert_eq!(reg.add_to_watchlist(pool(1)), RegistryOutcome::Added);
        assert_eq!(reg.add_to_watchlist(pool(1)), RegistryOutcome::AlreadyTracked);
        assert_eq!(reg.add_to_watchlist(pool(2)), RegistryOutcome::Added);
        assert_eq!(reg.add_to_watchlist(pool(3)), RegistryOutcome::CapacityReached);
        assert_eq!(reg.spare_capacity(), 0);

        reg.promote_to_inventory(position(1));
        assert_eq!(reg.add_to_watchlist(pool(1)), RegistryOutcome::AlreadyTracked);
    }

    #[test]
    fn promotion_moves_out_of_watchlist_once() {
        let mut reg = PoolRegistry::new(4);
        reg.add_to_watchlist(pool(7));
        assert_eq!(reg.promote_to_inventory(position(7)), RegistryOutcome::Promoted);
        assert!(!reg.is_watched(&pool(7).address));
        assert_eq!(reg.promote_to_inventory(position(7)), RegistryOutcome::AlreadyHeld);
        assert_eq!(reg.inventory().len(), 1);
    }

    #[test]
    fn removals_are_idempotent() {
        let mut reg = PoolRegistry::new(4);
        let addr = pool(3).address;
        assert!(!reg.remove_from_watchlist(&addr));
        assert!(reg.remove_from_inventory(&addr).is_none());
        reg.add_to_watchlist(pool(3));
        assert!(reg.remove_from_watchlist(&addr));
        assert!(!reg.remove_from_watchlist(&addr));
    }

    #[test]
    fn reserves_update_whichever_list_holds_the_pool() {
        let mut reg = PoolRegistry::new(4);
        reg.add_to_watchlist(pool(1));
        reg.promote_to_inventory(position(2));
        reg.update_reserves(&pool(1).address, U256::from(5u64), U256::from(6u64));
        reg.update_reserves(&pool(2).address, U256::from(7u64), U256::from(8u64));
        reg.update_reserves(&pool(9).address, U256::from(1u64), U256::from(1u64));

        let snap = reg.snapshot();
        assert_eq!(snap.watchlist[0].reserve_base, U256::from(6u64));
        assert_eq!(snap.inventory[0].pool.reserve_token, U256::from(7u64));
    }

    #[test]
    fn random_operations_keep_lists_disjoint_and_bounded() {
        let capacity = 5;
        let mut reg = PoolRegistry::new(capacity);
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..5_000 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let n = ((seed >> 33) % 12) as u8;
            match (seed >> 20) % 4 {
                0 => {
                    reg.add_to_watchlist(pool(n));
                }
                1 => {
                    reg.remove_from_watchlist(&pool(n).address);
                }
                2 => {
                    reg.promote_to_inventory(position(n));
                }
                _ => {
                    reg.remove_from_inventory(&pool(n).address);
                }
            }
            assert!(reg.watchlist().len() <= capacity);
            for p in reg.watchlist() {
                assert!(!reg.is_held(&p.address));
            }
            let mut held: Vec<_> = reg.inventory().iter().map(|p| p.address()).collect();
            held.sort();
            held.dedup();
            assert_eq!(held.len(), reg.inventory().len());
        }
    }
}
