//! Fixed-capacity set of small identifiers backed by atomic bit words.
//!
//! Membership tests, inserts and removals are single atomic operations, so the
//! set can be consulted from contexts that must not block (message routing)
//! while process-context code mutates it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: usize = u64::BITS as usize;

/// Set of identifiers in `1..=capacity`. Identifier 0 is reserved and never a member.
pub struct IdSet {
    capacity: u16,
    words: Box<[AtomicU64]>,
}

impl IdSet {
    /// Creates an empty set able to hold ids `1..=capacity`.
    pub fn new(capacity: u16) -> Self {
        let len = (capacity as usize).div_ceil(WORD_BITS);
        let words = (0..len).map(|_| AtomicU64::new(0)).collect();
        Self { capacity, words }
    }

    /// Largest id the set can hold.
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Inserts `id`; returns `true` if it was not already present.
    ///
    /// Out-of-range ids are rejected and report `false`.
    pub fn insert(&self, id: u16) -> bool {
        let Some((word, mask)) = self.locate(id) else {
            return false;
        };
        self.words[word].fetch_or(mask, Ordering::AcqRel) & mask == 0
    }

    /// Removes `id`; returns `true` if it was present.
    pub fn remove(&self, id: u16) -> bool {
        let Some((word, mask)) = self.locate(id) else {
            return false;
        };
        self.words[word].fetch_and(!mask, Ordering::AcqRel) & mask != 0
    }

    /// Returns `true` if `id` is a member.
    pub fn contains(&self, id: u16) -> bool {
        match self.locate(id) {
            Some((word, mask)) => self.words[word].load(Ordering::Acquire) & mask != 0,
            None => false,
        }
    }

    /// Number of members at the time of the call.
    pub fn len(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as usize)
            .sum()
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| w.load(Ordering::Acquire) == 0)
    }

    /// Iterates members in ascending order.
    ///
    /// Each word is sampled once, so concurrent updates may or may not be observed.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            set: self,
            word: 0,
            bits: self.words.first().map_or(0, |w| w.load(Ordering::Acquire)),
        }
    }

    /// Atomically claims the lowest id that is not a member.
    pub(crate) fn claim_lowest(&self) -> Option<u16> {
        for (index, word) in self.words.iter().enumerate() {
            let valid = self.valid_mask(index);
            let mut current = word.load(Ordering::Acquire);
            loop {
                let free = !current & valid;
                if free == 0 {
                    break;
                }
                let mask = 1u64 << free.trailing_zeros();
                let prev = word.fetch_or(mask, Ordering::AcqRel);
                if prev & mask == 0 {
                    return Some((index * WORD_BITS) as u16 + free.trailing_zeros() as u16 + 1);
                }
                current = prev | mask;
            }
        }
        None
    }

    fn locate(&self, id: u16) -> Option<(usize, u64)> {
        if id == 0 || id > self.capacity {
            return None;
        }
        let index = (id - 1) as usize;
        Some((index / WORD_BITS, 1u64 << (index % WORD_BITS)))
    }

    fn valid_mask(&self, word: usize) -> u64 {
        let remaining = self.capacity as usize - word * WORD_BITS;
        if remaining >= WORD_BITS {
            u64::MAX
        } else {
            (1u64 << remaining) - 1
        }
    }
}

impl fmt::Debug for IdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Ascending iterator over an [`IdSet`].
pub struct Iter<'a> {
    set: &'a IdSet,
    word: usize,
    bits: u64,
}

impl Iterator for Iter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        while self.bits == 0 {
            self.word += 1;
            let next = self.set.words.get(self.word)?;
            self.bits = next.load(Ordering::Acquire);
        }
        let bit = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some((self.word * WORD_BITS + bit) as u16 + 1)
    }
}
