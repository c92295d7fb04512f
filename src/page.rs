use std::{ptr, slice};

use crate::{
  error::{Error, Result},
  mapper::Mapper,
};

/// One live OS mapping and the mapper that releases it.
///
/// `ptr` is non-null exactly while the mapping is live, and `size` is
/// non-zero exactly when `ptr` is. Dropping a live page unmaps it.
#[derive(Debug)]
pub struct Page<M: Mapper> {
  ptr: *mut u8,
  size: usize,
  mapper: M,
}

impl<M: Mapper> Page<M> {
  pub fn init(
    size: usize,
    mapper: M,
  ) -> Result<Self> {
    if !mapper.is_valid() {
      return Err(Error::InvalidMapper);
    }
    if size == 0 {
      return Err(Error::InvalidArgument("page size must be non-zero"));
    }

    let ptr = mapper.map(size).ok_or(Error::OutOfMemory { size })?;

    Ok(Self {
      ptr: ptr.as_ptr(),
      size,
      mapper,
    })
  }

  /// A page in its torn-down state; `deinit` on it does nothing.
  pub const fn unmapped(mapper: M) -> Self {
    Self {
      ptr: ptr::null_mut(),
      size: 0,
      mapper,
    }
  }

  /// Unmaps the page. Safe to call any number of times.
  pub fn deinit(&mut self) {
    let Some(ptr) = ptr::NonNull::new(self.ptr) else {
      return;
    };
    if self.size == 0 {
      return;
    }

    // The mapping was produced by `self.mapper` and is released exactly once
    // since the fields are reset right after.
    unsafe { self.mapper.unmap(ptr, self.size) };
    self.ptr = ptr::null_mut();
    self.size = 0;
  }

  pub fn ptr(&self) -> *mut u8 {
    self.ptr
  }

  pub fn size(&self) -> usize {
    self.size
  }

  pub fn mapper(&self) -> M {
    self.mapper
  }

  pub fn is_mapped(&self) -> bool {
    !self.ptr.is_null() && self.size != 0
  }

  pub fn as_slice(&self) -> Option<&[u8]> {
    if !self.is_mapped() {
      return None;
    }
    Some(unsafe { slice::from_raw_parts(self.ptr, self.size) })
  }

  pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
    if !self.is_mapped() {
      return None;
    }
    Some(unsafe { slice::from_raw_parts_mut(self.ptr, self.size) })
  }
}

impl<M: Mapper> Drop for Page<M> {
  fn drop(&mut self) {
    self.deinit();
  }
}
