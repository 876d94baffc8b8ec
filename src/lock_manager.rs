use std::sync::{Condvar, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::lock_table::{LockMode, LockTable, PageLockStatus};
use crate::page_id::PageId;
use crate::transaction_id::TransactionId;
use crate::wait_for_graph::WaitForGraph;

/// The two stores that must move together: a lock grant/deny decision and a
/// deadlock check are both made while holding this single `Mutex`, but they
/// remain separate structs rather than one combined graph (see DESIGN.md).
struct LockManagerState {
    lock_table: LockTable,
    wait_for_graph: WaitForGraph,
}

/// Strict two-phase lock manager with wait-for-graph deadlock detection.
/// `acquire_blocking` parks the calling thread until the lock is granted or
/// the deadlock detector aborts the requester.
pub struct LockManager {
    state: Mutex<LockManagerState>,
    condvar: Condvar,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl LockManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockManagerState {
                lock_table: LockTable::new(),
                wait_for_graph: WaitForGraph::new(),
            }),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until `tid` holds `mode` on `pid`, or returns
    /// `StorageError::TransactionAborted` if granting the request would
    /// complete a wait-for cycle. On abort, `tid`'s pending wait is cleared
    /// before returning; its already-held locks are left for the caller to
    /// release via `transaction_complete`.
    pub fn acquire_blocking(
        &self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> StorageResult<()> {
        let mut guard = self.state.lock().unwrap();
        loop {
            let LockManagerState {
                lock_table,
                wait_for_graph,
            } = &mut *guard;

            if lock_table.try_acquire(tid, pid, mode) {
                wait_for_graph.remove_pending(tid);
                self.condvar.notify_all();
                return Ok(());
            }

            // Would waiting on `pid` complete a cycle back to `tid`?
            if wait_for_graph.has_path_to(tid, pid, |p| lock_table.holders(p)) {
                wait_for_graph.remove_pending(tid);
                warn!("{} aborted: deadlock detected waiting on {}", tid, pid);
                return Err(StorageError::TransactionAborted);
            }

            wait_for_graph.add_pending(tid, pid);
            debug!("{} blocked waiting for {:?} lock on {}", tid, mode, pid);

            let (g, timed_out) = self
                .condvar
                .wait_timeout(guard, POLL_INTERVAL)
                .unwrap();
            guard = g;
            let _ = timed_out;
        }
    }

    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut guard = self.state.lock().unwrap();
        guard.lock_table.release(tid, pid);
        self.condvar.notify_all();
    }

    pub fn release_all(&self, tid: TransactionId) -> Vec<PageId> {
        let mut guard = self.state.lock().unwrap();
        let pages = guard.lock_table.release_all(tid);
        guard.wait_for_graph.clear_tx(tid);
        self.condvar.notify_all();
        pages
    }

    pub fn holds(&self, tid: TransactionId, pid: PageId) -> bool {
        self.state.lock().unwrap().lock_table.holds(tid, pid)
    }

    pub fn held_pages(&self, tid: TransactionId) -> Vec<PageId> {
        self.state.lock().unwrap().lock_table.held_pages(tid)
    }

    pub fn status(&self, pid: &PageId) -> PageLockStatus {
        self.state.lock().unwrap().lock_table.status(pid)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration as StdDuration;

    #[test]
    fn grants_immediately_when_uncontended() {
        let mgr = LockManager::new();
        let tid = TransactionId::new();
        let pid = PageId::new(0, 0);
        assert!(mgr.acquire_blocking(tid, pid, LockMode::Exclusive).is_ok());
        assert!(mgr.holds(tid, pid));
    }

    #[test]
    fn second_writer_blocks_until_release() {
        let mgr = Arc::new(LockManager::new());
        let a = TransactionId::new();
        let b = TransactionId::new();
        let pid = PageId::new(0, 0);

        mgr.acquire_blocking(a, pid, LockMode::Exclusive).unwrap();

        let mgr2 = Arc::clone(&mgr);
        let handle = thread::spawn(move || mgr2.acquire_blocking(b, pid, LockMode::Exclusive));

        thread::sleep(StdDuration::from_millis(50));
        assert!(!mgr.holds(b, pid));

        mgr.release(a, pid);
        assert!(handle.join().unwrap().is_ok());
        assert!(mgr.holds(b, pid));
    }

    #[test]
    fn two_transaction_cycle_aborts_one_side() {
        let mgr = Arc::new(LockManager::new());
        let a = TransactionId::new();
        let b = TransactionId::new();
        let p1 = PageId::new(0, 1);
        let p2 = PageId::new(0, 2);

        mgr.acquire_blocking(a, p1, LockMode::Exclusive).unwrap();
        mgr.acquire_blocking(b, p2, LockMode::Exclusive).unwrap();

        let mgr_a = Arc::clone(&mgr);
        let handle_a = thread::spawn(move || mgr_a.acquire_blocking(a, p2, LockMode::Exclusive));

        thread::sleep(StdDuration::from_millis(30));

        // b now requests p1, held by a, which is waiting on p2 held by b:
        // granting this would complete a cycle back to b.
        let result_b = mgr.acquire_blocking(b, p1, LockMode::Exclusive);
        assert!(matches!(result_b, Err(StorageError::TransactionAborted)));

        mgr.release_all(b);
        assert!(handle_a.join().unwrap().is_ok());
    }
}
