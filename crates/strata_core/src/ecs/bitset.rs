//! # Entity Bitset
//!
//! Fixed-width bit vector recording which components and tags an entity
//! owns. Components occupy bits `0..component_count`, tags follow.
//!
//! The width is fixed at [`Bitset::CAPACITY`] so records stay `Copy` and
//! compaction swaps them without touching the heap. The schema refuses
//! any declaration that does not fit.

use std::fmt;

/// Number of `u64` words backing a bitset.
const WORDS: usize = 4;

/// Fixed-width bitset over the component + tag bit space.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bitset {
    /// 64 bits per word, bit `i` lives in word `i / 64`.
    words: [u64; WORDS],
}

impl Bitset {
    /// Maximum number of bits (components + tags) a bitset can hold.
    pub const CAPACITY: usize = WORDS * 64;

    /// Creates an empty bitset.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Sets a bit.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= Bitset::CAPACITY`.
    #[inline]
    pub fn set(&mut self, bit: usize) {
        assert!(bit < Self::CAPACITY, "bit {bit} out of range");
        self.words[bit / 64] |= 1u64 << (bit % 64);
    }

    /// Clears a bit.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= Bitset::CAPACITY`.
    #[inline]
    pub fn unset(&mut self, bit: usize) {
        assert!(bit < Self::CAPACITY, "bit {bit} out of range");
        self.words[bit / 64] &= !(1u64 << (bit % 64));
    }

    /// Checks a bit. Out-of-range bits read as unset.
    #[inline]
    #[must_use]
    pub fn contains(&self, bit: usize) -> bool {
        if bit >= Self::CAPACITY {
            return false;
        }
        (self.words[bit / 64] >> (bit % 64)) & 1 == 1
    }

    /// Returns `true` if every bit of `other` is also set in `self`.
    #[inline]
    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(mine, theirs)| mine & theirs == *theirs)
    }

    /// Clears every bit.
    #[inline]
    pub fn reset(&mut self) {
        self.words = [0; WORDS];
    }

    /// Iterates over set bit indices in ascending order.
    pub fn iter_ones(&self) -> Ones<'_> {
        Ones {
            words: &self.words,
            word_idx: 0,
            current_word: self.words[0],
        }
    }
}

impl FromIterator<usize> for Bitset {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bitset = Self::new();
        for bit in iter {
            bitset.set(bit);
        }
        bitset
    }
}

impl fmt::Debug for Bitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

/// Iterator over set bits of a [`Bitset`].
pub struct Ones<'a> {
    words: &'a [u64; WORDS],
    word_idx: usize,
    current_word: u64,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1;
                return Some(self.word_idx * 64 + bit);
            }

            self.word_idx += 1;
            if self.word_idx >= WORDS {
                return None;
            }
            self.current_word = self.words[self.word_idx];
        }
    }
}
