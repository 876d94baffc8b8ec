use std::collections::HashMap;

use crate::page_id::PageId;
use crate::transaction_id::TransactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Derived status of a page's lock state: IDLE (empty), SINGLE_READ (one
/// SHARED holder), MULTI_READ (multiple SHARED holders), SINGLE_WRITE (one
/// EXCLUSIVE holder). No page is ever observed with both an EXCLUSIVE
/// holder and any other holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLockStatus {
    Idle,
    SingleRead,
    MultiRead,
    SingleWrite,
}

/// Two symmetric mappings — by-page and by-transaction — kept in sync under
/// a single critical section owned by the caller (`LockManager`). This type
/// holds no lock of its own; it is pure data plus the grant/deny decision
/// table from spec.md §4.2.
#[derive(Default)]
pub struct LockTable {
    by_page: HashMap<PageId, HashMap<TransactionId, LockMode>>,
    by_tx: HashMap<TransactionId, HashMap<PageId, LockMode>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, pid: &PageId) -> PageLockStatus {
        match self.by_page.get(pid) {
            None => PageLockStatus::Idle,
            Some(holders) if holders.is_empty() => PageLockStatus::Idle,
            Some(holders) if holders.len() == 1 => {
                match holders.values().next().unwrap() {
                    LockMode::Shared => PageLockStatus::SingleRead,
                    LockMode::Exclusive => PageLockStatus::SingleWrite,
                }
            }
            Some(_) => PageLockStatus::MultiRead,
        }
    }

    /// Attempt to grant `mode` to `tid` on `pid`, per the compatibility
    /// table in spec.md §4.2. Never mutates state on denial. Upgrade from
    /// SHARED to EXCLUSIVE when the requester is the sole reader is granted
    /// here atomically — there is no intermediate release.
    pub fn try_acquire(&mut self, tid: TransactionId, pid: PageId, mode: LockMode) -> bool {
        let granted = match self.by_page.get(&pid) {
            None => true,
            Some(holders) if holders.is_empty() => true,
            Some(holders) if holders.len() == 1 && holders.contains_key(&tid) => true,
            Some(holders) => match mode {
                LockMode::Shared => holders.values().all(|m| *m == LockMode::Shared),
                LockMode::Exclusive => false,
            },
        };

        if !granted {
            return false;
        }

        self.by_page
            .entry(pid)
            .or_insert_with(HashMap::new)
            .insert(tid, mode);
        self.by_tx
            .entry(tid)
            .or_insert_with(HashMap::new)
            .insert(pid, mode);
        true
    }

    /// Idempotent: a second call on an already-released (tid, pid) is a
    /// no-op.
    pub fn release(&mut self, tid: TransactionId, pid: PageId) {
        if let Some(holders) = self.by_page.get_mut(&pid) {
            holders.remove(&tid);
            if holders.is_empty() {
                self.by_page.remove(&pid);
            }
        }
        if let Some(pages) = self.by_tx.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.by_tx.remove(&tid);
            }
        }
    }

    /// Releases every lock `tid` holds and returns the set of pages that
    /// were released.
    pub fn release_all(&mut self, tid: TransactionId) -> Vec<PageId> {
        let pages: Vec<PageId> = self
            .by_tx
            .get(&tid)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        for pid in &pages {
            self.release(tid, *pid);
        }
        pages
    }

    pub fn holds(&self, tid: TransactionId, pid: PageId) -> bool {
        self.by_page
            .get(&pid)
            .map_or(false, |holders| holders.contains_key(&tid))
    }

    pub fn holders(&self, pid: &PageId) -> Vec<TransactionId> {
        self.by_page
            .get(pid)
            .map(|holders| holders.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn held_pages(&self, tid: TransactionId) -> Vec<PageId> {
        self.by_tx
            .get(&tid)
            .map(|pages| pages.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_locks_are_compatible() {
        let mut table = LockTable::new();
        let a = TransactionId::new();
        let b = TransactionId::new();
        let pid = PageId::new(0, 0);

        assert!(table.try_acquire(a, pid, LockMode::Shared));
        assert_eq!(table.status(&pid), PageLockStatus::SingleRead);
        assert!(table.try_acquire(b, pid, LockMode::Shared));
        assert_eq!(table.status(&pid), PageLockStatus::MultiRead);
    }

    #[test]
    fn exclusive_excludes_everyone_else() {
        let mut table = LockTable::new();
        let a = TransactionId::new();
        let b = TransactionId::new();
        let pid = PageId::new(0, 0);

        assert!(table.try_acquire(a, pid, LockMode::Exclusive));
        assert_eq!(table.status(&pid), PageLockStatus::SingleWrite);
        assert!(!table.try_acquire(b, pid, LockMode::Shared));
        assert!(!table.try_acquire(b, pid, LockMode::Exclusive));
        // re-requesting by the same holder is always a granted no-op
        assert!(table.try_acquire(a, pid, LockMode::Exclusive));
    }

    #[test]
    fn sole_reader_upgrades_atomically() {
        let mut table = LockTable::new();
        let a = TransactionId::new();
        let b = TransactionId::new();
        let pid = PageId::new(0, 0);

        assert!(table.try_acquire(a, pid, LockMode::Shared));
        assert!(table.try_acquire(a, pid, LockMode::Exclusive));
        assert_eq!(table.status(&pid), PageLockStatus::SingleWrite);
        assert!(!table.try_acquire(b, pid, LockMode::Shared));
    }

    #[test]
    fn release_is_idempotent() {
        let mut table = LockTable::new();
        let a = TransactionId::new();
        let pid = PageId::new(0, 0);

        assert!(table.try_acquire(a, pid, LockMode::Shared));
        table.release(a, pid);
        assert!(!table.holds(a, pid));
        table.release(a, pid);
        assert!(!table.holds(a, pid));
    }
}
