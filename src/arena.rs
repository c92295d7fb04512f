use std::ptr::NonNull;

use log::debug;

use crate::{
  config::ARENA_SEGMENT_SIZE,
  error::Result,
  mapper::Mapper,
  segment::{Chain, Segment},
};

/// A growable chain of equally sized segments.
///
/// Segments are linked through their own `next`/`prev` fields, oldest first.
/// The arena owns every segment in its chain and unmaps them when released
/// or dropped.
#[derive(Debug)]
pub struct Arena<M: Mapper> {
  head: Option<NonNull<Segment<M>>>,
  tail: Option<NonNull<Segment<M>>>,
  count: usize,
  segment_size: usize,
  mapper: M,
}

impl<M: Mapper> Arena<M> {
  pub const fn new(
    segment_size: usize,
    mapper: M,
  ) -> Self {
    Self {
      head: None,
      tail: None,
      count: 0,
      segment_size,
      mapper,
    }
  }

  pub const fn with_default_size(mapper: M) -> Self {
    Self::new(ARENA_SEGMENT_SIZE, mapper)
  }

  /// Maps one more segment and appends it to the chain.
  pub fn grow(&mut self) -> Result<NonNull<Segment<M>>> {
    let mut segment = Segment::init(self.segment_size, self.mapper)?;

    unsafe {
      segment.as_mut().set_prev(self.tail);
      match self.tail {
        Some(mut tail) => tail.as_mut().set_next(Some(segment)),
        None => self.head = Some(segment),
      }
    }

    self.tail = Some(segment);
    self.count += 1;

    debug!(
      "arena grew to {} segments of {} bytes",
      self.count, self.segment_size
    );
    Ok(segment)
  }

  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  pub fn segment_size(&self) -> usize {
    self.segment_size
  }

  pub fn head(&self) -> Option<NonNull<Segment<M>>> {
    self.head
  }

  pub fn tail(&self) -> Option<NonNull<Segment<M>>> {
    self.tail
  }

  /// Segments from oldest to newest.
  pub fn iter(&self) -> Chain<'_, M> {
    // The arena keeps every chained segment mapped while borrowed.
    unsafe { Segment::chain(self.head) }
  }

  /// Total usable bytes across the chain.
  pub fn usable(&self) -> usize {
    self.iter().map(|segment| unsafe { segment.as_ref().usable() }).sum()
  }

  /// Unmaps every segment. Calling it again does nothing.
  pub fn release(&mut self) {
    let mut current = self.head.take();
    self.tail = None;

    while let Some(segment) = current {
      unsafe {
        current = segment.as_ref().next();
        Segment::deinit(segment);
      }
    }

    if self.count > 0 {
      debug!("arena released {} segments", self.count);
    }
    self.count = 0;
  }
}

impl<M: Mapper> Drop for Arena<M> {
  fn drop(&mut self) {
    self.release();
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::{error::Error, mapper::{FnMapper, OsMapper}};

  #[test]
  fn test_arena_starts_empty() {
    let arena = Arena::new(4096, OsMapper);

    assert!(arena.is_empty());
    assert_eq!(0, arena.len());
    assert_eq!(0, arena.usable());
    assert!(arena.iter().next().is_none());
  }

  #[test]
  fn test_arena_default_size() {
    let arena = Arena::with_default_size(OsMapper);
    assert_eq!(ARENA_SEGMENT_SIZE, arena.segment_size());
  }

  #[test]
  fn test_arena_grow_links_in_order() {
    let mut arena = Arena::new(4096, OsMapper);

    let first = arena.grow().unwrap();
    let second = arena.grow().unwrap();
    let third = arena.grow().unwrap();

    assert_eq!(3, arena.len());
    assert_eq!(Some(first), arena.head());
    assert_eq!(Some(third), arena.tail());
    assert_eq!(vec![first, second, third], arena.iter().collect::<Vec<_>>());

    unsafe {
      assert_eq!(None, first.as_ref().prev());
      assert_eq!(Some(first), second.as_ref().prev());
      assert_eq!(Some(second), third.as_ref().prev());
      assert_eq!(None, third.as_ref().next());
    }

    let header = Segment::<OsMapper>::HEADER_SIZE;
    assert_eq!(3 * (4096 - header), arena.usable());
  }

  #[test]
  fn test_arena_segments_are_writable() {
    let mut arena = Arena::new(4096, OsMapper);
    arena.grow().unwrap();
    arena.grow().unwrap();

    for (n, mut segment) in arena.iter().enumerate() {
      let span = unsafe { segment.as_mut().as_mut_slice() };
      span.fill(n as u8 + 1);
    }

    for (n, segment) in arena.iter().enumerate() {
      let span = unsafe { segment.as_ref().as_slice() };
      assert!(span.iter().all(|&b| b == n as u8 + 1));
    }
  }

  #[test]
  fn test_arena_release_twice() {
    let mut arena = Arena::new(4096, OsMapper);
    arena.grow().unwrap();
    arena.grow().unwrap();

    arena.release();
    arena.release();

    assert!(arena.is_empty());
    assert!(arena.head().is_none());
    assert!(arena.tail().is_none());

    arena.grow().unwrap();
    assert_eq!(1, arena.len());
  }

  #[test]
  fn test_arena_grow_failure_leaves_chain_intact() {
    let mut arena = Arena::new(4096, FnMapper::default());
    assert_eq!(Some(Error::InvalidMapper), arena.grow().err());
    assert!(arena.is_empty());
  }
}
