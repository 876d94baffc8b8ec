use crate::page_id::PageId;

/// Locates a tuple within a table: the page it lives on plus its slot
/// index within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

/// An opaque, fixed-size byte payload. The storage core does not interpret
/// tuple contents — typed field access for selectivity estimation is
/// layered on top via `TupleAccessor` (see `table_stats.rs`), not built
/// into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub record_id: Option<RecordId>,
    pub bytes: Vec<u8>,
}

impl Tuple {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            record_id: None,
            bytes,
        }
    }

    pub fn with_record_id(bytes: Vec<u8>, record_id: RecordId) -> Self {
        Self {
            record_id: Some(record_id),
            bytes,
        }
    }
}
