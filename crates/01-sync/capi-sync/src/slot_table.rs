//! Id-indexed slot table that remembers insertion order.
//!
//! Registries look records up by id and enumerate them in the order they were
//! installed. Enumeration is cursor based so callers can drop the table lock
//! between steps (for example to run a driver callback) and resume afterwards
//! without revisiting or skipping records that survived in the meantime.
//!
//! The table itself is not synchronised; owners wrap it in a lock.

/// Position in an insertion-ordered walk over a [`SlotTable`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(u64);

impl Cursor {
    /// Cursor positioned before the first record.
    pub const START: Cursor = Cursor(0);
}

struct Slot<T> {
    seq: u64,
    value: T,
}

/// Fixed-capacity table of values keyed by ids in `1..=capacity`.
pub struct SlotTable<T> {
    slots: Vec<Option<Slot<T>>>,
    order: Vec<(u64, u16)>,
    next_seq: u64,
}

impl<T> SlotTable<T> {
    /// Creates an empty table for ids `1..=capacity`.
    pub fn new(capacity: u16) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            order: Vec::new(),
            next_seq: 1,
        }
    }

    /// Stores `value` under `id`.
    ///
    /// Hands the value back if `id` is out of range or already occupied.
    pub fn insert(&mut self, id: u16, value: T) -> Result<(), T> {
        let Some(slot) = index(id).and_then(|i| self.slots.get_mut(i)) else {
            return Err(value);
        };
        if slot.is_some() {
            return Err(value);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        *slot = Some(Slot { seq, value });
        self.order.push((seq, id));
        Ok(())
    }

    /// Removes and returns the value stored under `id`.
    pub fn remove(&mut self, id: u16) -> Option<T> {
        let slot = self.slots.get_mut(index(id)?)?.take()?;
        if let Ok(pos) = self.order.binary_search_by_key(&slot.seq, |(seq, _)| *seq) {
            self.order.remove(pos);
        }
        Some(slot.value)
    }

    /// Value stored under `id`.
    pub fn get(&self, id: u16) -> Option<&T> {
        self.slots
            .get(index(id)?)?
            .as_ref()
            .map(|slot| &slot.value)
    }

    /// First record installed after `cursor`, with the cursor to resume from.
    pub fn next_after(&self, cursor: Cursor) -> Option<(Cursor, u16, &T)> {
        let pos = self.order.partition_point(|(seq, _)| *seq <= cursor.0);
        let &(seq, id) = self.order.get(pos)?;
        let value = self.get(id)?;
        Some((Cursor(seq), id, value))
    }

    /// Iterates `(id, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &T)> + '_ {
        self.order
            .iter()
            .filter_map(move |&(_, id)| self.get(id).map(|value| (id, value)))
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn index(id: u16) -> Option<usize> {
    (id as usize).checked_sub(1)
}
