use std::sync::Arc;

use crate::common::{PageId, RecordId, Result, SlotId, TarnError, TransactionId};
use crate::tuple::{Schema, Tuple};

/// Heap page layout:
///
/// +------------------------+
/// | Occupancy Bitmap       |  (ceil(num_slots / 8) bytes)
/// +------------------------+
/// | Slot 0                 |  (schema.size() bytes)
/// | Slot 1                 |
/// | ...                    |
/// | Slot num_slots - 1     |
/// +------------------------+
/// | Unused tail            |
/// +------------------------+
///
/// Bit `i` of the bitmap is bit `i % 8` of byte `i / 8`; a set bit means slot
/// `i` holds a valid tuple. Bytes of free slots carry no meaning.
///
/// A page is parsed eagerly: the in-memory form keeps one decoded tuple per
/// occupied slot and is written back out by [`HeapPage::page_data`].
#[derive(Debug, Clone)]
pub struct HeapPage {
    page_id: PageId,
    schema: Arc<Schema>,
    page_size: usize,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirty: bool,
    dirtier: Option<TransactionId>,
}

impl HeapPage {
    /// Returns the number of tuples of `tuple_size` bytes that fit on a page,
    /// counting one bitmap bit per tuple.
    pub fn max_slots(page_size: usize, tuple_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    /// Slot ids are 16 bits wide; slots past that have no record id.
    fn slot_id(slot: usize) -> Option<SlotId> {
        u16::try_from(slot).ok().map(SlotId::new)
    }

    /// Returns the all-zero image of an empty page.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Creates an empty page without going through bytes.
    pub fn empty(page_id: PageId, schema: Arc<Schema>, page_size: usize) -> Self {
        let num_slots = Self::max_slots(page_size, schema.size());
        Self {
            page_id,
            schema,
            page_size,
            header: vec![0u8; num_slots.div_ceil(8)],
            slots: vec![None; num_slots],
            dirty: false,
            dirtier: None,
        }
    }

    /// Parses a page image. The page size is the length of `data`.
    pub fn new(page_id: PageId, schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        let page_size = data.len();
        let mut page = Self::empty(page_id, schema, page_size);
        if page_size == 0 {
            return Err(TarnError::MalformedPage {
                page_id,
                reason: "empty page image".into(),
            });
        }

        let header_size = page.header_size();
        page.header.copy_from_slice(&data[..header_size]);

        let tuple_size = page.schema.size();
        for slot in 0..page.num_slots() {
            if !page.is_slot_used(slot) {
                continue;
            }
            let start = header_size + slot * tuple_size;
            let bytes = &data[start..start + tuple_size];
            let slot_id = Self::slot_id(slot).ok_or_else(|| TarnError::MalformedPage {
                page_id,
                reason: format!("slot {} is past the last addressable slot", slot),
            })?;
            let mut tuple = Tuple::from_bytes(page.schema.clone(), bytes)
                .ok_or(TarnError::CorruptTuple { page_id, slot })?;
            tuple.set_record_id(Some(RecordId::new(page_id, slot_id)));
            page.slots[slot] = Some(tuple);
        }

        Ok(page)
    }

    /// Parses a page image, checking it against the expected page size.
    pub fn from_bytes(
        page_id: PageId,
        schema: Arc<Schema>,
        data: &[u8],
        page_size: usize,
    ) -> Result<Self> {
        if data.len() != page_size {
            return Err(TarnError::MalformedPage {
                page_id,
                reason: format!("expected {} bytes, got {}", page_size, data.len()),
            });
        }
        Self::new(page_id, schema, data)
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of tuple slots on this page.
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Size of the occupancy bitmap in bytes.
    pub fn header_size(&self) -> usize {
        self.header.len()
    }

    /// Returns true if slot `slot` holds a tuple.
    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots() && self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot_used(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots())
            .filter(|&slot| !self.is_slot_used(slot))
            .count()
    }

    /// Returns the tuple in `slot`, if occupied.
    pub fn tuple(&self, slot: usize) -> Option<&Tuple> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Places `tuple` in the lowest free slot and stamps it with its record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        if **tuple.schema() != *self.schema {
            return Err(TarnError::SchemaMismatch);
        }

        let slot = (0..self.num_slots())
            .find(|&slot| !self.is_slot_used(slot))
            .ok_or(TarnError::PageFull(self.page_id))?;

        let slot_id = Self::slot_id(slot).ok_or_else(|| {
            TarnError::InvalidArgument(format!(
                "slot {} of {} is past the last addressable slot",
                slot, self.page_id
            ))
        })?;
        let record_id = RecordId::new(self.page_id, slot_id);
        tuple.set_record_id(Some(record_id));
        self.set_slot_used(slot, true);
        self.slots[slot] = Some(tuple.clone());

        Ok(record_id)
    }

    /// Frees the slot named by the tuple's record id and clears the record id.
    pub fn delete_tuple(&mut self, tuple: &mut Tuple) -> Result<()> {
        let record_id = match tuple.record_id() {
            Some(rid) if rid.page_id == self.page_id => rid,
            other => {
                return Err(TarnError::TupleNotOnPage {
                    record_id: other,
                    page_id: self.page_id,
                })
            }
        };

        let slot = record_id.slot_id.as_usize();
        if !self.is_slot_used(slot) {
            return Err(TarnError::EmptySlot {
                page_id: self.page_id,
                slot,
            });
        }

        self.set_slot_used(slot, false);
        self.slots[slot] = None;
        tuple.set_record_id(None);
        Ok(())
    }

    /// Records whether the page has unflushed changes and who made them.
    /// Marking a page clean forgets the dirtier.
    pub fn mark_dirty(&mut self, dirty: bool, tid: Option<TransactionId>) {
        self.dirty = dirty;
        self.dirtier = if dirty { tid } else { None };
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The transaction that last dirtied the page, if it is dirty.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// Iterates the occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().flatten()
    }

    /// Serializes the page. `HeapPage::new` on the result yields an equal page.
    pub fn page_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.page_size);
        data.extend_from_slice(&self.header);

        let tuple_size = self.schema.size();
        for slot in &self.slots {
            match slot {
                Some(tuple) => tuple.write_to(&mut data),
                None => data.resize(data.len() + tuple_size, 0),
            }
        }

        data.resize(self.page_size, 0);
        data
    }
}
