//! Dense free/used tracking over caller-owned words.
//!
//! ```text
//!   bit_count = 70
//!
//!   word 0                                word 1
//!   ┌───────────────────────────────────┐ ┌──────┬────────────────────────┐
//!   │ bits 0..64                        │ │ 64.. │ beyond range (always 0)│
//!   └───────────────────────────────────┘ └──────┴────────────────────────┘
//!                                           70 ──┘
//! ```
//!
//! Scans report `None` when nothing matches; [`NOT_FOUND`] is the matching
//! raw index for callers that prefer a sentinel.

use std::mem;

use crate::error::{Error, Result};

pub type Word = u64;

pub const WORD_BITS: usize = Word::BITS as usize;
pub const WORD_BYTES: usize = mem::size_of::<Word>();

/// Out-of-range index standing for "no match".
pub const NOT_FOUND: usize = usize::MAX;

#[derive(Debug)]
pub struct Bitmap<'a> {
  words: &'a mut [Word],
  bit_count: usize,
}

#[inline]
const fn word_index(index: usize) -> usize {
  index / WORD_BITS
}

#[inline]
const fn bit_mask(index: usize) -> Word {
  1 << (index % WORD_BITS)
}

/// Mask of the in-range bits of the last word.
#[inline]
const fn last_word_mask(bit_count: usize) -> Word {
  match bit_count % WORD_BITS {
    0 => Word::MAX,
    r => (1 << r) - 1,
  }
}

impl<'a> Bitmap<'a> {
  /// Words needed to hold `bit_count` bits.
  pub const fn words_required(bit_count: usize) -> usize {
    bit_count.div_ceil(WORD_BITS)
  }

  pub const fn bytes_required(bit_count: usize) -> usize {
    Self::words_required(bit_count) * WORD_BYTES
  }

  /// Binds a bitmap of `bit_count` bits to `storage` and clears it.
  pub fn init(
    storage: &'a mut [Word],
    bit_count: usize,
  ) -> Result<Self> {
    if storage.is_empty() {
      return Err(Error::InvalidArgument("bitmap storage is empty"));
    }
    if bit_count == 0 {
      return Err(Error::InvalidArgument("bitmap bit count is zero"));
    }

    let need = Self::words_required(bit_count);
    if storage.len() < need {
      return Err(Error::InsufficientCapacity {
        have: storage.len(),
        need,
      });
    }

    let mut bitmap = Self {
      words: storage,
      bit_count,
    };
    bitmap.zero();
    Ok(bitmap)
  }

  /// Like [`Bitmap::init`] over a raw byte buffer.
  ///
  /// The buffer must start on a word boundary; trailing bytes that do not
  /// make up a whole word are ignored.
  pub fn from_bytes(
    bytes: &'a mut [u8],
    bit_count: usize,
  ) -> Result<Self> {
    if bytes.is_empty() {
      return Err(Error::InvalidArgument("bitmap storage is empty"));
    }

    // SAFETY: every bit pattern is a valid `Word`.
    let (prefix, words, _) = unsafe { bytes.align_to_mut::<Word>() };
    if !prefix.is_empty() {
      return Err(Error::InvalidArgument("bitmap storage is not word aligned"));
    }
    if words.is_empty() && bit_count != 0 {
      return Err(Error::InsufficientCapacity {
        have: 0,
        need: Self::words_required(bit_count),
      });
    }

    Self::init(words, bit_count)
  }

  pub fn bit_count(&self) -> usize {
    self.bit_count
  }

  fn used_words(&self) -> usize {
    Self::words_required(self.bit_count)
  }

  pub fn set(
    &mut self,
    index: usize,
  ) {
    if index >= self.bit_count {
      return;
    }
    self.words[word_index(index)] |= bit_mask(index);
  }

  pub fn clear(
    &mut self,
    index: usize,
  ) {
    if index >= self.bit_count {
      return;
    }
    self.words[word_index(index)] &= !bit_mask(index);
  }

  /// Out-of-range bits read as clear.
  pub fn get(
    &self,
    index: usize,
  ) -> bool {
    if index >= self.bit_count {
      return false;
    }
    self.words[word_index(index)] & bit_mask(index) != 0
  }

  pub fn zero(&mut self) {
    let used = self.used_words();
    self.words[..used].fill(0);
  }

  pub fn one(&mut self) {
    let used = self.used_words();
    self.words[..used].fill(Word::MAX);
    self.words[used - 1] &= last_word_mask(self.bit_count);
  }

  pub fn count_set(&self) -> usize {
    let last = self.used_words() - 1;
    let full: usize = self.words[..last].iter().map(|w| w.count_ones() as usize).sum();

    full + (self.words[last] & last_word_mask(self.bit_count)).count_ones() as usize
  }

  pub fn find_first_set(&self) -> Option<usize> {
    self.words[..self.used_words()]
      .iter()
      .enumerate()
      .find(|(_, word)| **word != 0)
      .map(|(i, word)| i * WORD_BITS + word.trailing_zeros() as usize)
      .filter(|&index| index < self.bit_count)
  }

  pub fn find_first_clear(&self) -> Option<usize> {
    let used = self.used_words();

    for (i, &word) in self.words[..used].iter().enumerate() {
      let word = if i == used - 1 {
        word | !last_word_mask(self.bit_count)
      } else {
        word
      };

      if word == Word::MAX {
        continue;
      }

      let index = i * WORD_BITS + (!word).trailing_zeros() as usize;
      return (index < self.bit_count).then_some(index);
    }

    None
  }

  pub fn is_full(&self) -> bool {
    self.find_first_clear().is_none()
  }

  pub fn is_empty(&self) -> bool {
    self.find_first_set().is_none()
  }
}
