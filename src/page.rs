use crate::page_id::PageId;
use crate::transaction_id::TransactionId;

/// Fixed-size byte payload plus metadata. A page is dirty exactly when
/// `dirty_by` is set; the buffer pool never clears it except on flush.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: PageId,
    pub bytes: Vec<u8>,
    pub dirty_by: Option<TransactionId>,
}

impl Page {
    pub fn new(id: PageId, bytes: Vec<u8>) -> Self {
        Self {
            id,
            bytes,
            dirty_by: None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_by.is_some()
    }
}
