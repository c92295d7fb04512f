//! Intrusive doubly-linked list.
//!
//! ```text
//!   head                                      tail
//!    │                                         │
//!    ▼                                         ▼
//!  ┌──────┐ next ┌──────┐ next ┌──────┐
//!  │ Link │ ───► │ Link │ ───► │ Link │ ───► None
//!  │      │ ◄─── │      │ ◄─── │      │
//!  └──┬───┘ prev └──┬───┘ prev └──┬───┘
//!     ▼             ▼             ▼
//!  payload       payload       payload      (not owned)
//! ```
//!
//! The list only ever touches linkage. A node must be unlinked before the
//! memory behind it or its payload goes away, and a list must not move while
//! it holds nodes.

use std::{fmt, marker::PhantomData, ptr::NonNull};

pub struct Link<T> {
  next: Option<NonNull<Link<T>>>,
  prev: Option<NonNull<Link<T>>>,
  payload: Option<NonNull<T>>,
}

impl<T> Link<T> {
  pub const fn new(payload: Option<NonNull<T>>) -> Self {
    Self {
      next: None,
      prev: None,
      payload,
    }
  }

  pub fn next(&self) -> Option<NonNull<Link<T>>> {
    self.next
  }

  pub fn prev(&self) -> Option<NonNull<Link<T>>> {
    self.prev
  }

  pub fn payload(&self) -> Option<NonNull<T>> {
    self.payload
  }

  pub fn set_payload(
    &mut self,
    payload: Option<NonNull<T>>,
  ) {
    self.payload = payload;
  }

  /// True when the node points at no neighbours. A lone node in a list of one
  /// is also detached by this measure.
  pub fn is_detached(&self) -> bool {
    self.next.is_none() && self.prev.is_none()
  }

  fn unlink(&mut self) {
    self.next = None;
    self.prev = None;
  }
}

impl<T> Default for Link<T> {
  fn default() -> Self {
    Self::new(None)
  }
}

impl<T> fmt::Debug for Link<T> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Link")
      .field("next", &self.next)
      .field("prev", &self.prev)
      .field("payload", &self.payload)
      .finish()
  }
}

pub struct List<T> {
  head: Option<NonNull<Link<T>>>,
  tail: Option<NonNull<Link<T>>>,
  count: usize,
}

impl<T> List<T> {
  pub const fn new() -> Self {
    Self {
      head: None,
      tail: None,
      count: 0,
    }
  }

  pub fn head(&self) -> Option<NonNull<Link<T>>> {
    self.head
  }

  pub fn tail(&self) -> Option<NonNull<Link<T>>> {
    self.tail
  }

  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Appends `node` at the tail.
  ///
  /// # Safety
  ///
  /// `node` must be valid for reads and writes for as long as it stays
  /// linked, and must not currently be linked into any list.
  pub unsafe fn push(
    &mut self,
    mut node: NonNull<Link<T>>,
  ) {
    unsafe {
      let link = node.as_mut();
      link.next = None;
      link.prev = self.tail;

      match self.tail {
        Some(mut tail) => tail.as_mut().next = Some(node),
        None => self.head = Some(node),
      }
    }

    self.tail = Some(node);
    self.count += 1;
  }

  /// Unlinks and returns the tail node.
  pub fn pop(&mut self) -> Option<NonNull<Link<T>>> {
    let mut node = self.tail?;

    // Every linked node was promised valid by `push`.
    unsafe {
      self.tail = node.as_ref().prev;
      match self.tail {
        Some(mut tail) => tail.as_mut().next = None,
        None => self.head = None,
      }
      node.as_mut().unlink();
    }

    self.count -= 1;
    Some(node)
  }

  /// Unlinks `node` from wherever it sits in the list.
  ///
  /// # Safety
  ///
  /// `node` must currently be linked into `self`.
  pub unsafe fn remove(
    &mut self,
    mut node: NonNull<Link<T>>,
  ) {
    unsafe {
      let link = node.as_mut();

      match link.prev {
        Some(mut prev) => prev.as_mut().next = link.next,
        None => self.head = link.next,
      }
      match link.next {
        Some(mut next) => next.as_mut().prev = link.prev,
        None => self.tail = link.prev,
      }

      link.unlink();
    }

    self.count -= 1;
  }

  /// Walks the list looking for `node`. Linear in the list length.
  pub fn contains(
    &self,
    node: NonNull<Link<T>>,
  ) -> bool {
    self.iter().any(|linked| linked == node)
  }

  /// Nodes from head to tail.
  pub fn iter(&self) -> Iter<'_, T> {
    Iter {
      current: self.head,
      _list: PhantomData,
    }
  }
}

impl<T> Default for List<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> fmt::Debug for List<T> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("List")
      .field("head", &self.head)
      .field("tail", &self.tail)
      .field("count", &self.count)
      .finish()
  }
}

pub struct Iter<'list, T> {
  current: Option<NonNull<Link<T>>>,
  _list: PhantomData<&'list List<T>>,
}

impl<T> Iterator for Iter<'_, T> {
  type Item = NonNull<Link<T>>;

  fn next(&mut self) -> Option<Self::Item> {
    let node = self.current?;
    self.current = unsafe { node.as_ref().next };
    Some(node)
  }
}
