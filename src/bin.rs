use std::ptr::NonNull;

use log::debug;

use crate::list::{Link, List};

/// A size class: one list of free nodes, one of used nodes.
///
/// Every node handed to a bin sits in exactly one of the two lists until it
/// is retired. Claims pop the most recently released node first. The bin
/// never grows itself; when [`Bin::claim`] comes back empty it is up to the
/// caller to map more memory and [`Bin::insert`] it.
#[derive(Debug)]
pub struct Bin<T> {
  slot_size: usize,
  free_list: List<T>,
  used_list: List<T>,
}

impl<T> Bin<T> {
  pub const fn new(slot_size: usize) -> Self {
    Self {
      slot_size,
      free_list: List::new(),
      used_list: List::new(),
    }
  }

  pub fn slot_size(&self) -> usize {
    self.slot_size
  }

  pub fn free_list(&self) -> &List<T> {
    &self.free_list
  }

  pub fn used_list(&self) -> &List<T> {
    &self.used_list
  }

  pub fn free_len(&self) -> usize {
    self.free_list.len()
  }

  pub fn used_len(&self) -> usize {
    self.used_list.len()
  }

  /// No free node left to claim.
  pub fn is_exhausted(&self) -> bool {
    self.free_list.is_empty()
  }

  /// Hands a fresh node to the bin as free.
  ///
  /// # Safety
  ///
  /// Same contract as [`List::push`]. The bin must not move while it holds
  /// nodes.
  pub unsafe fn insert(
    &mut self,
    node: NonNull<Link<T>>,
  ) {
    unsafe { self.free_list.push(node) };
  }

  /// Moves the most recently freed node to the used list and returns it.
  pub fn claim(&mut self) -> Option<NonNull<Link<T>>> {
    let node = self.free_list.pop()?;

    // Just popped, so it is valid and unlinked.
    unsafe { self.used_list.push(node) };

    debug!(
      "bin {}: claimed {:?} ({} free, {} used)",
      self.slot_size,
      node,
      self.free_list.len(),
      self.used_list.len()
    );
    Some(node)
  }

  /// Moves a claimed node back to the free list.
  ///
  /// # Safety
  ///
  /// `node` must have been returned by [`Bin::claim`] on this bin and not
  /// released since.
  pub unsafe fn release(
    &mut self,
    node: NonNull<Link<T>>,
  ) {
    debug_assert!(self.used_list.contains(node), "releasing a node that is not in use");

    unsafe {
      self.used_list.remove(node);
      self.free_list.push(node);
    }

    debug!(
      "bin {}: released {:?} ({} free, {} used)",
      self.slot_size,
      node,
      self.free_list.len(),
      self.used_list.len()
    );
  }

  /// Takes `node` out of the bin altogether. Returns false if the bin does
  /// not hold it. Linear in the number of nodes.
  ///
  /// # Safety
  ///
  /// `node` must be valid for reads and writes.
  pub unsafe fn retire(
    &mut self,
    node: NonNull<Link<T>>,
  ) -> bool {
    let list = if self.used_list.contains(node) {
      &mut self.used_list
    } else if self.free_list.contains(node) {
      &mut self.free_list
    } else {
      return false;
    };

    unsafe { list.remove(node) };
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn payload_of(node: NonNull<Link<u32>>) -> u32 {
    unsafe { *node.as_ref().payload().unwrap().as_ref() }
  }

  #[test]
  fn test_bin_create() {
    let bin: Bin<u32> = Bin::new(64);

    assert_eq!(64, bin.slot_size());
    assert_eq!(0, bin.free_len());
    assert_eq!(0, bin.used_len());
    assert!(bin.is_exhausted());
  }

  #[test]
  fn test_bin_claim_empty() {
    let mut bin: Bin<u32> = Bin::new(16);
    assert!(bin.claim().is_none());
  }

  #[test]
  fn test_bin_claim_moves_to_used() {
    let mut values = [1u32, 2];
    let mut items = values.each_mut().map(|v| Link::new(Some(NonNull::from(v))));
    let [a, b] = items.each_mut().map(NonNull::from);
    let mut bin = Bin::new(32);

    unsafe {
      bin.insert(a);
      bin.insert(b);
    }

    let claimed = bin.claim().unwrap();
    assert_eq!(b, claimed);
    assert_eq!(2, payload_of(claimed));
    assert_eq!(1, bin.free_len());
    assert_eq!(1, bin.used_len());
    assert!(bin.used_list().contains(b));
    assert!(!bin.free_list().contains(b));
  }

  #[test]
  fn test_bin_release_is_lifo() {
    let mut items = [Link::<u32>::default(), Link::default(), Link::default()];
    let [a, b, c] = items.each_mut().map(NonNull::from);
    let mut bin = Bin::new(8);

    unsafe {
      bin.insert(a);
      bin.insert(b);
      bin.insert(c);
    }

    let first = bin.claim().unwrap();
    let second = bin.claim().unwrap();
    let third = bin.claim().unwrap();
    assert_eq!([c, b, a], [first, second, third]);
    assert!(bin.is_exhausted());

    unsafe {
      bin.release(second);
      bin.release(first);
    }

    assert_eq!(Some(first), bin.claim());
    assert_eq!(Some(second), bin.claim());
    assert_eq!(3, bin.used_len());
  }

  #[test]
  fn test_bin_every_node_in_one_list() {
    let mut items = [Link::<u32>::default(), Link::default(), Link::default()];
    let nodes = items.each_mut().map(NonNull::from);
    let mut bin = Bin::new(8);

    for node in nodes {
      unsafe { bin.insert(node) };
    }
    let claimed = bin.claim().unwrap();
    unsafe { bin.release(claimed) };
    bin.claim().unwrap();

    for node in nodes {
      let in_free = bin.free_list().contains(node);
      let in_used = bin.used_list().contains(node);
      assert!(in_free ^ in_used);
    }
    assert_eq!(3, bin.free_len() + bin.used_len());
  }

  #[test]
  fn test_bin_retire() {
    let mut items = [Link::<u32>::default(), Link::default()];
    let [a, b] = items.each_mut().map(NonNull::from);
    let mut other = Link::<u32>::default();
    let mut bin = Bin::new(8);

    unsafe {
      bin.insert(a);
      bin.insert(b);
    }
    let claimed = bin.claim().unwrap();

    unsafe {
      assert!(bin.retire(claimed));
      assert!(bin.retire(a));
      assert!(!bin.retire(NonNull::from(&mut other)));
    }

    assert_eq!(0, bin.free_len());
    assert_eq!(0, bin.used_len());
  }
}
