use std::sync::Arc;

use crate::buffer_pool::{AccessMode, BufferPool};
use crate::catalog::Catalog;
use crate::error::StorageResult;
use crate::heap_page::PageLayout;
use crate::page_id::PageId;
use crate::transaction_id::TransactionId;
use crate::tuple::{RecordId, Tuple};

/// Heap access method over a single table: unordered fixed-size tuple
/// storage with insert-first-free-slot-or-append semantics and a
/// sequential scan. All page access is mediated by `BufferPool`, so every
/// read and write here is subject to 2PL and NO-STEAL/FORCE.
pub struct HeapFile {
    table_id: i32,
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl HeapFile {
    pub fn new(table_id: i32, catalog: Arc<Catalog>, buffer_pool: Arc<BufferPool>) -> Self {
        Self {
            table_id,
            catalog,
            buffer_pool,
        }
    }

    pub fn table_id(&self) -> i32 {
        self.table_id
    }

    pub fn num_pages(&self) -> StorageResult<usize> {
        self.catalog.num_pages(self.table_id)
    }

    fn layout(&self) -> StorageResult<PageLayout> {
        self.catalog.layout(self.table_id)
    }

    /// Delegates to `BufferPool::insert_tuple`: probes existing pages in
    /// order for a free slot, taking an EXCLUSIVE lock on each one
    /// visited, or appends a fresh page if none has room.
    pub fn insert_tuple(&self, tid: TransactionId, bytes: Vec<u8>) -> StorageResult<RecordId> {
        self.buffer_pool.insert_tuple(tid, self.table_id, bytes)
    }

    /// Delegates to `BufferPool::delete_tuple`.
    pub fn delete_tuple(&self, tid: TransactionId, rid: RecordId) -> StorageResult<()> {
        self.buffer_pool.delete_tuple(tid, rid)
    }

    /// Forces `pid` out of the buffer pool (flushing it first if dirty),
    /// used when a page becomes ineligible for further buffered reuse and
    /// must be re-read fresh from disk on next access.
    pub fn discard_page(&self, pid: PageId) -> StorageResult<()> {
        self.buffer_pool.discard_page(pid)
    }

    pub fn iter(&self, tid: TransactionId) -> HeapFileIterator<'_> {
        HeapFileIterator {
            heap_file: self,
            tid,
            page_index: 0,
            slot: 0,
            current_page: None,
        }
    }
}

/// Sequential scan over every occupied slot of every page, in page then
/// slot order. Does not release locks on page advance: locks accumulate
/// for the duration of the transaction per strict 2PL.
pub struct HeapFileIterator<'a> {
    heap_file: &'a HeapFile,
    tid: TransactionId,
    page_index: usize,
    slot: usize,
    current_page: Option<(PageLayout, Vec<u8>)>,
}

impl<'a> HeapFileIterator<'a> {
    /// Resets the scan to page 0, slot 0. Locks already acquired on prior
    /// pages are not released: per strict 2PL they stay held for `tid`'s
    /// lifetime regardless of where the scan itself currently stands.
    pub fn rewind(&mut self) {
        self.page_index = 0;
        self.slot = 0;
        self.current_page = None;
    }
}

impl<'a> Iterator for HeapFileIterator<'a> {
    type Item = StorageResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_page.is_none() {
                let num_pages = match self.heap_file.catalog.num_pages(self.heap_file.table_id) {
                    Ok(n) => n,
                    Err(e) => return Some(Err(e)),
                };
                if self.page_index >= num_pages {
                    return None;
                }
                let pid = PageId::new(self.heap_file.table_id, self.page_index);
                let page = match self
                    .heap_file
                    .buffer_pool
                    .get_page(self.tid, pid, AccessMode::ReadOnly)
                {
                    Ok(p) => p,
                    Err(e) => return Some(Err(e)),
                };
                let layout = match self.heap_file.layout() {
                    Ok(l) => l,
                    Err(e) => return Some(Err(e)),
                };
                self.current_page = Some((layout, page.bytes));
                self.slot = 0;
            }

            let (layout, bytes) = self.current_page.as_ref().unwrap();
            if self.slot >= layout.slots_per_page {
                self.current_page = None;
                self.page_index += 1;
                continue;
            }

            let slot = self.slot;
            self.slot += 1;
            if layout.is_slot_used(bytes, slot) {
                let pid = PageId::new(self.heap_file.table_id, self.page_index);
                let data = layout.read_slot(bytes, slot).to_vec();
                return Some(Ok(Tuple::with_record_id(data, RecordId::new(pid, slot))));
            }
        }
    }
}
