//! Page-backed regions that carry their own header.
//!
//! ```text
//!   page.ptr                          data                         page end
//!   │                                 │                                   │
//!   ▼                                 ▼                                   ▼
//!   ┌─────┬───────────────────────────┬───────────────────────────────────┐
//!   │ pad │      Segment header       │           usable bytes            │
//!   │     │ next prev link page data  │                                   │
//!   └─────┴───────────────────────────┴───────────────────────────────────┘
//!         ▲
//!         └── handle returned by `Segment::init`
//! ```
//!
//! The header is written into the memory it describes, so no allocator is
//! needed to host it. Unmapping the page invalidates the header too.
//!
//! A segment can be chained through its `next`/`prev` fields (as an
//! [`Arena`](crate::Arena) does) or linked into a [`List`](crate::List)
//! through its embedded [`Link`]. The two are independent.

use std::{marker::PhantomData, mem, ptr::NonNull, slice};

use log::trace;

use crate::{
  align::align_ptr_up,
  error::{Error, Result},
  list::Link,
  mapper::Mapper,
  page::Page,
};

#[repr(C)]
#[derive(Debug)]
pub struct Segment<M: Mapper> {
  next: Option<NonNull<Segment<M>>>,
  prev: Option<NonNull<Segment<M>>>,
  link: Link<Segment<M>>,
  page: Page<M>,
  data: NonNull<u8>,
  usable: usize,
}

impl<M: Mapper> Segment<M> {
  /// Bytes taken by the header when the page base is already aligned.
  pub const HEADER_SIZE: usize = mem::size_of::<Self>();

  /// Maps `size` bytes and places a header at the front of them.
  ///
  /// The returned pointer is both the handle and the header's address. It
  /// stays valid until [`Segment::deinit`].
  pub fn init(
    size: usize,
    mapper: M,
  ) -> Result<NonNull<Self>> {
    let page = Page::init(size, mapper)?;
    let base = page.ptr();

    let header = align_ptr_up(base, mem::align_of::<Self>()) as *mut Self;
    let data = header.wrapping_add(1) as *mut u8;
    let overhead = data as usize - base as usize;

    if overhead > page.size() {
      // `page` unmaps itself on the way out.
      return Err(Error::InvalidArgument("segment too small for its header"));
    }
    let usable = page.size() - overhead;

    trace!(
      "segment at {:?}: {} bytes mapped, {} overhead, {} usable",
      header, size, overhead, usable
    );

    unsafe {
      let header = NonNull::new_unchecked(header);
      header.as_ptr().write(Self {
        next: None,
        prev: None,
        link: Link::new(Some(header)),
        page,
        data: NonNull::new_unchecked(data),
        usable,
      });
      Ok(header)
    }
  }

  /// Unmaps the segment's page, header included.
  ///
  /// # Safety
  ///
  /// `segment` must come from [`Segment::init`] and not have been
  /// deinitialized. It must not be linked into any list or chain that will be
  /// walked afterwards, and nothing may touch it once this returns.
  pub unsafe fn deinit(segment: NonNull<Self>) {
    // Move the page out of the header: unmapping frees the header itself.
    let mut page = unsafe { (&raw const (*segment.as_ptr()).page).read() };
    page.deinit();
  }

  /// Start and length of the usable span.
  pub fn space(&self) -> (NonNull<u8>, usize) {
    (self.data, self.usable)
  }

  pub fn usable(&self) -> usize {
    self.usable
  }

  pub fn as_slice(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.data.as_ptr(), self.usable) }
  }

  /// The usable span. It never overlaps the header.
  pub fn as_mut_slice(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.usable) }
  }

  pub fn page(&self) -> &Page<M> {
    &self.page
  }

  pub fn next(&self) -> Option<NonNull<Self>> {
    self.next
  }

  pub fn prev(&self) -> Option<NonNull<Self>> {
    self.prev
  }

  pub fn set_next(
    &mut self,
    next: Option<NonNull<Self>>,
  ) {
    self.next = next;
  }

  pub fn set_prev(
    &mut self,
    prev: Option<NonNull<Self>>,
  ) {
    self.prev = prev;
  }

  /// The embedded list node. Its payload is `segment` itself.
  pub fn link(segment: NonNull<Self>) -> NonNull<Link<Self>> {
    unsafe { NonNull::new_unchecked(&raw mut (*segment.as_ptr()).link) }
  }

  /// Recovers the segment a list node belongs to.
  ///
  /// # Safety
  ///
  /// `link` must point to a live link node.
  pub unsafe fn from_link(link: NonNull<Link<Self>>) -> Option<NonNull<Self>> {
    unsafe { link.as_ref().payload() }
  }

  /// Follows `next` pointers starting at `segment`.
  ///
  /// # Safety
  ///
  /// Every segment reachable from `segment` must stay live while the
  /// iterator is in use.
  pub unsafe fn chain<'a>(segment: Option<NonNull<Self>>) -> Chain<'a, M> {
    Chain {
      current: segment,
      _chain: PhantomData,
    }
  }
}

pub struct Chain<'a, M: Mapper> {
  current: Option<NonNull<Segment<M>>>,
  _chain: PhantomData<&'a Segment<M>>,
}

impl<M: Mapper> Iterator for Chain<'_, M> {
  type Item = NonNull<Segment<M>>;

  fn next(&mut self) -> Option<Self::Item> {
    let segment = self.current?;
    self.current = unsafe { segment.as_ref().next };
    Some(segment)
  }
}

/// Owning handle over a segment. Tearing it down twice is harmless.
#[derive(Debug)]
pub struct OwnedSegment<M: Mapper> {
  segment: Option<NonNull<Segment<M>>>,
}

impl<M: Mapper> OwnedSegment<M> {
  pub fn new(
    size: usize,
    mapper: M,
  ) -> Result<Self> {
    Ok(Self {
      segment: Some(Segment::init(size, mapper)?),
    })
  }

  /// Takes ownership of a segment produced by [`Segment::init`].
  ///
  /// # Safety
  ///
  /// Nothing else may deinitialize `segment`.
  pub unsafe fn from_raw(segment: NonNull<Segment<M>>) -> Self {
    Self {
      segment: Some(segment),
    }
  }

  /// Gives up ownership without unmapping.
  pub fn into_raw(mut self) -> Option<NonNull<Segment<M>>> {
    self.segment.take()
  }

  pub fn deinit(&mut self) {
    if let Some(segment) = self.segment.take() {
      // Owned and taken out, so this runs once per segment.
      unsafe { Segment::deinit(segment) };
    }
  }

  pub fn is_live(&self) -> bool {
    self.segment.is_some()
  }

  pub fn as_ptr(&self) -> Option<NonNull<Segment<M>>> {
    self.segment
  }

  pub fn header(&self) -> Option<&Segment<M>> {
    self.segment.map(|segment| unsafe { &*segment.as_ptr() })
  }

  pub fn header_mut(&mut self) -> Option<&mut Segment<M>> {
    self.segment.map(|segment| unsafe { &mut *segment.as_ptr() })
  }

  pub fn space(&self) -> Option<(NonNull<u8>, usize)> {
    self.header().map(Segment::space)
  }

  pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
    self.header_mut().map(Segment::as_mut_slice)
  }
}

impl<M: Mapper> Drop for OwnedSegment<M> {
  fn drop(&mut self) {
    self.deinit();
  }
}
