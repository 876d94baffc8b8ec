use bit_vec::BitVec;

/// Slot-bitmap geometry for a fixed-size page holding fixed-size tuples.
///
/// Layout: a header of `ceil(slots_per_page / 8)` bytes, one bit per slot
/// (packed the way `BitVec::from_bytes`/`to_bytes` pack them, MSB-first
/// within each byte), followed by `slots_per_page` fixed-size tuple slots
/// back to back. `slots_per_page` is derived from `page_size` and
/// `tuple_size` by the standard SimpleDB formula: each slot costs
/// `tuple_size` bytes plus one header bit, so
/// `slots_per_page = floor(page_size * 8 / (tuple_size * 8 + 1))`.
#[derive(Debug, Clone, Copy)]
pub struct PageLayout {
    pub page_size: usize,
    pub tuple_size: usize,
    pub slots_per_page: usize,
    pub header_bytes: usize,
}

impl PageLayout {
    pub fn new(page_size: usize, tuple_size: usize) -> Self {
        assert!(tuple_size > 0, "tuple_size must be positive");
        let slots_per_page = (page_size * 8) / (tuple_size * 8 + 1);
        let header_bytes = (slots_per_page + 7) / 8;
        Self {
            page_size,
            tuple_size,
            slots_per_page,
            header_bytes,
        }
    }

    fn slot_offset(&self, slot: usize) -> usize {
        self.header_bytes + slot * self.tuple_size
    }

    fn header(&self, bytes: &[u8]) -> BitVec {
        BitVec::from_bytes(&bytes[..self.header_bytes])
    }

    pub fn is_slot_used(&self, bytes: &[u8], slot: usize) -> bool {
        self.header(bytes)[slot]
    }

    fn set_slot_used(&self, bytes: &mut [u8], slot: usize, used: bool) {
        let mut header = self.header(bytes);
        header.set(slot, used);
        bytes[..self.header_bytes].copy_from_slice(&header.to_bytes());
    }

    pub fn first_free_slot(&self, bytes: &[u8]) -> Option<usize> {
        (0..self.slots_per_page).find(|&slot| !self.is_slot_used(bytes, slot))
    }

    pub fn read_slot<'a>(&self, bytes: &'a [u8], slot: usize) -> &'a [u8] {
        let start = self.slot_offset(slot);
        &bytes[start..start + self.tuple_size]
    }

    pub fn write_slot(&self, bytes: &mut [u8], slot: usize, data: &[u8]) {
        assert_eq!(data.len(), self.tuple_size, "tuple size mismatch");
        let start = self.slot_offset(slot);
        bytes[start..start + self.tuple_size].copy_from_slice(data);
        self.set_slot_used(bytes, slot, true);
    }

    pub fn clear_slot(&self, bytes: &mut [u8], slot: usize) {
        let start = self.slot_offset(slot);
        bytes[start..start + self.tuple_size].fill(0);
        self.set_slot_used(bytes, slot, false);
    }

    pub fn used_slots<'a>(&'a self, bytes: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
        (0..self.slots_per_page).filter(move |&slot| self.is_slot_used(bytes, slot))
    }
}
