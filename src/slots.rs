//! Fixed-size slots carved out of a usable span.
//!
//! ```text
//!   span start                                                span end
//!   │                                                                │
//!   ▼                                                                ▼
//!   ┌─────┬──────────────┬─────┬────────┬────────┬─────┬────────┬─────┐
//!   │ pad │ bitmap words │ pad │ slot 0 │ slot 1 │ ... │ slot n │ ... │
//!   └─────┴──────────────┴─────┴────────┴────────┴─────┴────────┴─────┘
//! ```
//!
//! A set bit marks a slot in use.

use std::{cmp, marker::PhantomData, ptr::NonNull};

use log::trace;

use crate::{
  align::{align_up, is_power_of_two},
  bitmap::{Bitmap, WORD_BITS, WORD_BYTES},
  error::{Error, Result},
  mapper::page_size,
};

// Slot pointers are derived from `base`, never from a reborrow of the area.
pub struct Slots<'a> {
  bitmap: Bitmap<'a>,
  base: NonNull<u8>,
  len: usize,
  slot_size: usize,
  capacity: usize,
  in_use: usize,
  _span: PhantomData<&'a mut [u8]>,
}

impl<'a> Slots<'a> {
  /// Splits `span` into a bitmap and as many `slot_size` slots as fit.
  ///
  /// Slots are aligned to `slot_size`, capped at the page size.
  pub fn carve(
    span: &'a mut [u8],
    slot_size: usize,
  ) -> Result<Self> {
    if !is_power_of_two(slot_size) {
      return Err(Error::InvalidArgument("slot size must be a power of two"));
    }

    if slot_size > span.len() {
      return Err(Error::InvalidArgument("slot size larger than span"));
    }
    let per_slot_bits = slot_size
      .checked_mul(8)
      .and_then(|bits| bits.checked_add(1))
      .ok_or(Error::InvalidArgument("slot size too large"))?;

    let start = span.as_ptr() as usize;
    let end = start + span.len();
    let slot_align = cmp::min(slot_size, page_size());

    let words_at = align_up(start, WORD_BYTES);
    let slots_at = |capacity: usize| {
      align_up(
        words_at + Bitmap::bytes_required(capacity),
        slot_align,
      )
    };

    // One bit of bookkeeping per slot: start from the bound that ignores
    // padding and walk down until everything fits.
    let available = end.saturating_sub(words_at);
    let mut capacity = available
      .checked_mul(8)
      .map_or(available / slot_size, |bits| bits / per_slot_bits);
    while capacity > 0 && slots_at(capacity) + capacity * slot_size > end {
      capacity -= 1;
    }
    if capacity == 0 {
      return Err(Error::InvalidArgument("span too small for a single slot"));
    }

    let (head, tail) = span.split_at_mut(slots_at(capacity) - start);
    let words_offset = words_at - start;
    let bitmap = Bitmap::from_bytes(
      &mut head[words_offset..words_offset + Bitmap::bytes_required(capacity)],
      capacity,
    )?;
    let len = capacity * slot_size;
    let base = NonNull::from(&mut tail[..len]).cast::<u8>();

    trace!(
      "carved {} slots of {} bytes at {:?} ({} bitmap words)",
      capacity,
      slot_size,
      base,
      capacity.div_ceil(WORD_BITS)
    );

    Ok(Self {
      bitmap,
      base,
      len,
      slot_size,
      capacity,
      in_use: 0,
      _span: PhantomData,
    })
  }

  pub fn slot_size(&self) -> usize {
    self.slot_size
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn in_use(&self) -> usize {
    self.in_use
  }

  pub fn is_full(&self) -> bool {
    self.in_use == self.capacity
  }

  pub fn is_empty(&self) -> bool {
    self.in_use == 0
  }

  pub fn bitmap(&self) -> &Bitmap<'a> {
    &self.bitmap
  }

  /// Marks the lowest free slot used and returns its address.
  pub fn acquire(&mut self) -> Option<NonNull<u8>> {
    let index = self.bitmap.find_first_clear()?;
    self.bitmap.set(index);
    self.in_use += 1;

    // SAFETY: `index < capacity`, so the offset stays inside the slot area.
    Some(unsafe { self.base.add(index * self.slot_size) })
  }

  /// Returns a slot obtained from [`Slots::acquire`].
  pub fn release(
    &mut self,
    ptr: NonNull<u8>,
  ) -> Result<()> {
    let index = self.index_of(ptr)?;
    if !self.bitmap.get(index) {
      return Err(Error::InvalidArgument("slot is not in use"));
    }

    self.bitmap.clear(index);
    self.in_use -= 1;
    Ok(())
  }

  /// Slot index for a pointer to the start of a slot.
  pub fn index_of(
    &self,
    ptr: NonNull<u8>,
  ) -> Result<usize> {
    let base = self.base.as_ptr() as usize;
    let offset = (ptr.as_ptr() as usize)
      .checked_sub(base)
      .filter(|&offset| offset < self.len)
      .ok_or(Error::InvalidArgument("pointer outside the slot area"))?;

    if offset % self.slot_size != 0 {
      return Err(Error::InvalidArgument("pointer not on a slot boundary"));
    }
    Ok(offset / self.slot_size)
  }
}
