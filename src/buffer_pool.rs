use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::catalog::Catalog;
use crate::error::{StorageError, StorageResult};
use crate::lock_manager::LockManager;
use crate::lock_table::LockMode;
use crate::page::Page;
use crate::page_id::PageId;
use crate::transaction_id::TransactionId;
use crate::tuple::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    fn lock_mode(self) -> LockMode {
        match self {
            AccessMode::ReadOnly => LockMode::Shared,
            AccessMode::ReadWrite => LockMode::Exclusive,
        }
    }
}

struct PoolState {
    entries: HashMap<PageId, Page>,
    last_used: HashMap<PageId, u64>,
    clock: u64,
}

/// Bounded, process-wide page cache sitting above `Catalog`'s raw page
/// I/O, with NO-STEAL / FORCE discipline: dirty pages are never evicted
/// while their writer's transaction is in flight, and every dirty page a
/// transaction touched is flushed synchronously at commit. Eviction picks
/// the least-recently-touched *clean* page; `CapacityExhausted` is
/// returned when every buffered page is dirty.
pub struct BufferPool {
    catalog: Arc<Catalog>,
    lock_manager: Arc<LockManager>,
    capacity: usize,
    state: Mutex<PoolState>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, lock_manager: Arc<LockManager>, capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be positive");
        Self {
            catalog,
            lock_manager,
            capacity,
            state: Mutex::new(PoolState {
                entries: HashMap::new(),
                last_used: HashMap::new(),
                clock: 0,
            }),
        }
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Acquires the page lock appropriate to `mode` (blocking, with
    /// deadlock detection), loads the page from disk if not already
    /// cached, and returns a clone of its current bytes.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        mode: AccessMode,
    ) -> StorageResult<Page> {
        self.lock_manager
            .acquire_blocking(tid, pid, mode.lock_mode())?;

        let mut guard = self.state.lock().unwrap();
        if !guard.entries.contains_key(&pid) {
            self.ensure_capacity_locked(&mut guard)?;
            let bytes = self.catalog.read_page(pid)?;
            guard.entries.insert(pid, Page::new(pid, bytes));
            debug!("loaded {} into buffer pool", pid);
        }
        guard.clock += 1;
        let clock = guard.clock;
        guard.last_used.insert(pid, clock);
        Ok(guard.entries.get(&pid).unwrap().clone())
    }

    /// Applies `f` to the cached page's bytes and marks it dirty for
    /// `tid`. The caller must already hold an EXCLUSIVE lock on `pid`
    /// (i.e. have called `get_page` with `AccessMode::ReadWrite` first).
    pub fn mutate_page<F>(&self, tid: TransactionId, pid: PageId, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Vec<u8>),
    {
        if !self.lock_manager.holds(tid, pid) {
            return Err(StorageError::Precondition(format!(
                "{} does not hold a write lock on {}",
                tid, pid
            )));
        }
        let mut guard = self.state.lock().unwrap();
        let page = guard
            .entries
            .get_mut(&pid)
            .ok_or_else(|| StorageError::Precondition(format!("{} not buffered", pid)))?;
        f(&mut page.bytes);
        page.dirty_by = Some(tid);
        Ok(())
    }

    /// Unilaterally releases `tid`'s lock on `pid`, independent of
    /// transaction completion. This violates strict two-phase locking:
    /// only for callers in a narrowly-scoped operation that accept the
    /// risk (e.g. an access method releasing a page it's certain it will
    /// not revisit before `tid` ends).
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    /// Flushes `pid` if dirty, then removes it from the cache. Used by
    /// the access method when a page becomes ineligible for further
    /// buffered reuse and must be re-read fresh from disk on next access.
    /// Unlike abort rollback, this never silently drops unwritten bytes.
    pub fn discard_page(&self, pid: PageId) -> StorageResult<()> {
        let dirty_bytes = {
            let guard = self.state.lock().unwrap();
            guard
                .entries
                .get(&pid)
                .filter(|p| p.is_dirty())
                .map(|p| p.bytes.clone())
        };
        if let Some(bytes) = dirty_bytes {
            self.catalog.write_page(pid, &bytes)?;
        }
        let mut guard = self.state.lock().unwrap();
        guard.entries.remove(&pid);
        guard.last_used.remove(&pid);
        debug!("discarded {} from buffer pool", pid);
        Ok(())
    }

    /// Inserts `bytes` into the first page (page 0 upward) with a free
    /// slot, or appends a fresh page if none has room. The page
    /// `insert_tuple` lands on is acquired EXCLUSIVE, marked dirty for
    /// `tid` by `mutate_page`, and left re-asserted in the pool.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: i32,
        bytes: Vec<u8>,
    ) -> StorageResult<RecordId> {
        let layout = self.catalog.layout(table_id)?;
        if bytes.len() != layout.tuple_size {
            return Err(StorageError::Precondition(format!(
                "tuple is {} bytes, table expects {}",
                bytes.len(),
                layout.tuple_size
            )));
        }

        let num_pages = self.catalog.num_pages(table_id)?;
        for page_index in 0..num_pages {
            let pid = PageId::new(table_id, page_index);
            let page = self.get_page(tid, pid, AccessMode::ReadWrite)?;
            if let Some(slot) = layout.first_free_slot(&page.bytes) {
                self.mutate_page(tid, pid, |b| layout.write_slot(b, slot, &bytes))?;
                debug!("inserted tuple into {} slot {}", pid, slot);
                return Ok(RecordId::new(pid, slot));
            }
        }

        let pid = self.catalog.page_store(table_id)?.append_blank_page()?;
        self.get_page(tid, pid, AccessMode::ReadWrite)?;
        self.mutate_page(tid, pid, |b| layout.write_slot(b, 0, &bytes))?;
        debug!("inserted tuple into new page {} slot 0", pid);
        Ok(RecordId::new(pid, 0))
    }

    /// Acquires `rid`'s page EXCLUSIVE and clears its slot.
    pub fn delete_tuple(&self, tid: TransactionId, rid: RecordId) -> StorageResult<()> {
        let layout = self.catalog.layout(rid.page_id.table_id)?;
        let page = self.get_page(tid, rid.page_id, AccessMode::ReadWrite)?;
        if !layout.is_slot_used(&page.bytes, rid.slot) {
            return Err(StorageError::Precondition(format!(
                "slot {} of {} is not occupied",
                rid.slot, rid.page_id
            )));
        }
        self.mutate_page(tid, rid.page_id, |b| layout.clear_slot(b, rid.slot))?;
        Ok(())
    }

    /// Synchronously writes every dirty page to its backing file. No lock
    /// is held across the I/O itself: the set of pages to flush is
    /// snapshotted, then each is written, then marked clean.
    pub fn flush_all_pages(&self) -> StorageResult<()> {
        let dirty: Vec<(PageId, Vec<u8>)> = {
            let guard = self.state.lock().unwrap();
            guard
                .entries
                .values()
                .filter(|p| p.is_dirty())
                .map(|p| (p.id, p.bytes.clone()))
                .collect()
        };
        for (pid, bytes) in &dirty {
            self.catalog.write_page(*pid, bytes)?;
        }
        let mut guard = self.state.lock().unwrap();
        for (pid, _) in &dirty {
            if let Some(page) = guard.entries.get_mut(pid) {
                page.dirty_by = None;
            }
        }
        Ok(())
    }

    /// Commit or abort cleanup for `tid`: on commit, flush every page it
    /// dirtied (FORCE) before releasing its locks; on abort, discard every
    /// page it dirtied before releasing its locks. Either way `tid` holds
    /// no locks and appears in no wait-for entry once this returns.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> StorageResult<()> {
        let held = self.lock_manager.held_pages(tid);

        if commit {
            let dirty: Vec<(PageId, Vec<u8>)> = {
                let guard = self.state.lock().unwrap();
                held.iter()
                    .filter_map(|pid| {
                        guard
                            .entries
                            .get(pid)
                            .filter(|p| p.dirty_by == Some(tid))
                            .map(|p| (*pid, p.bytes.clone()))
                    })
                    .collect()
            };
            for (pid, bytes) in &dirty {
                self.catalog.write_page(*pid, bytes)?;
            }
            let mut guard = self.state.lock().unwrap();
            for (pid, _) in &dirty {
                if let Some(page) = guard.entries.get_mut(pid) {
                    page.dirty_by = None;
                }
            }
            info!("{} committed, flushed {} page(s)", tid, dirty.len());
        } else {
            let mut guard = self.state.lock().unwrap();
            for pid in &held {
                if guard
                    .entries
                    .get(pid)
                    .map_or(false, |p| p.dirty_by == Some(tid))
                {
                    guard.entries.remove(pid);
                    guard.last_used.remove(pid);
                }
            }
            info!("{} aborted, discarded dirty pages", tid);
        }

        self.lock_manager.release_all(tid);
        Ok(())
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds(tid, pid)
    }

    fn ensure_capacity_locked(&self, guard: &mut PoolState) -> StorageResult<()> {
        if guard.entries.len() < self.capacity {
            return Ok(());
        }
        let victim = guard
            .last_used
            .iter()
            .filter(|(pid, _)| !guard.entries.get(pid).map_or(true, Page::is_dirty))
            .min_by_key(|(_, &touched)| touched)
            .map(|(pid, _)| *pid);

        match victim {
            Some(pid) => {
                guard.entries.remove(&pid);
                guard.last_used.remove(&pid);
                debug!("evicted clean page {}", pid);
                Ok(())
            }
            None => Err(StorageError::CapacityExhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn setup(capacity: usize) -> (Arc<Catalog>, Arc<LockManager>, BufferPool, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        let catalog = Arc::new(Catalog::new());
        catalog.register_table(1, tmp.path(), 128, 20).unwrap();
        for _ in 0..4 {
            catalog.page_store(1).unwrap().append_blank_page().unwrap();
        }
        let lock_manager = Arc::new(LockManager::new());
        let bp = BufferPool::new(Arc::clone(&catalog), Arc::clone(&lock_manager), capacity);
        (catalog, lock_manager, bp, tmp)
    }

    #[test]
    fn evicts_least_recently_used_clean_page() {
        let (_catalog, _lm, bp, _tmp) = setup(2);
        let tid = TransactionId::new();
        let p0 = PageId::new(1, 0);
        let p1 = PageId::new(1, 1);
        let p2 = PageId::new(1, 2);

        bp.get_page(tid, p0, AccessMode::ReadOnly).unwrap();
        bp.get_page(tid, p1, AccessMode::ReadOnly).unwrap();
        // both clean, p0 touched least recently; loading p2 must evict p0
        bp.get_page(tid, p2, AccessMode::ReadOnly).unwrap();

        let guard = bp.state.lock().unwrap();
        assert!(!guard.entries.contains_key(&p0));
        assert!(guard.entries.contains_key(&p1));
        assert!(guard.entries.contains_key(&p2));
    }

    #[test]
    fn no_steal_refuses_to_evict_dirty_pages() {
        let (_catalog, _lm, bp, _tmp) = setup(2);
        let tid = TransactionId::new();
        let p0 = PageId::new(1, 0);
        let p1 = PageId::new(1, 1);
        let p2 = PageId::new(1, 2);

        bp.get_page(tid, p0, AccessMode::ReadWrite).unwrap();
        bp.mutate_page(tid, p0, |bytes| bytes[0] = 1).unwrap();
        bp.get_page(tid, p1, AccessMode::ReadOnly).unwrap();

        // p0 dirty, p1 clean: loading p2 must evict p1, not p0
        bp.get_page(tid, p2, AccessMode::ReadOnly).unwrap();
        let guard = bp.state.lock().unwrap();
        assert!(guard.entries.contains_key(&p0));
        assert!(!guard.entries.contains_key(&p1));
        drop(guard);

        // now dirty p1 too; both p0 and p1 dirty, no clean victim available
        bp.get_page(tid, p1, AccessMode::ReadWrite).unwrap();
        bp.mutate_page(tid, p1, |bytes| bytes[0] = 1).unwrap();
        let p3 = PageId::new(1, 3);
        let result = bp.get_page(tid, p3, AccessMode::ReadOnly);
        assert!(matches!(result, Err(StorageError::CapacityExhausted)));
    }

    #[test]
    fn commit_flushes_dirty_pages_to_disk() {
        let (catalog, _lm, bp, _tmp) = setup(4);
        let tid = TransactionId::new();
        let p0 = PageId::new(1, 0);

        bp.get_page(tid, p0, AccessMode::ReadWrite).unwrap();
        bp.mutate_page(tid, p0, |bytes| bytes[3] = 77).unwrap();
        bp.transaction_complete(tid, true).unwrap();

        assert_eq!(catalog.read_page(p0).unwrap()[3], 77);
        assert!(!bp.holds_lock(tid, p0));
    }

    #[test]
    fn abort_never_writes_dirty_bytes_to_disk() {
        let (catalog, _lm, bp, _tmp) = setup(4);
        let tid = TransactionId::new();
        let p0 = PageId::new(1, 0);

        bp.get_page(tid, p0, AccessMode::ReadWrite).unwrap();
        bp.mutate_page(tid, p0, |bytes| bytes[3] = 77).unwrap();
        bp.transaction_complete(tid, false).unwrap();

        assert_eq!(catalog.read_page(p0).unwrap()[3], 0);
        assert!(!bp.holds_lock(tid, p0));
    }

    #[test]
    fn discard_page_flushes_before_evicting() {
        let (catalog, _lm, bp, _tmp) = setup(4);
        let tid = TransactionId::new();
        let p0 = PageId::new(1, 0);

        bp.get_page(tid, p0, AccessMode::ReadWrite).unwrap();
        bp.mutate_page(tid, p0, |bytes| bytes[0] = 9).unwrap();
        bp.discard_page(p0).unwrap();

        assert_eq!(catalog.read_page(p0).unwrap()[0], 9);
        assert!(!bp.state.lock().unwrap().entries.contains_key(&p0));
    }

    #[test]
    fn release_page_drops_the_lock_unilaterally() {
        let (_catalog, _lm, bp, _tmp) = setup(4);
        let tid = TransactionId::new();
        let p0 = PageId::new(1, 0);

        bp.get_page(tid, p0, AccessMode::ReadOnly).unwrap();
        assert!(bp.holds_lock(tid, p0));
        bp.release_page(tid, p0);
        assert!(!bp.holds_lock(tid, p0));
    }

    #[test]
    fn insert_and_delete_tuple_delegate_through_the_pool() {
        let (_catalog, _lm, bp, _tmp) = setup(4);
        let tid = TransactionId::new();

        let rid = bp.insert_tuple(tid, 1, vec![3u8; 20]).unwrap();
        assert!(bp.holds_lock(tid, rid.page_id));
        bp.delete_tuple(tid, rid).unwrap();

        // deleting the same record id twice is a precondition violation
        assert!(bp.delete_tuple(tid, rid).is_err());
    }
}
