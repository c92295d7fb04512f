use std::{
  ptr::NonNull,
  sync::atomic::{AtomicUsize, Ordering},
};

use log::{trace, warn};

use crate::{align::align_up, config::FALLBACK_PAGE_SIZE};

/// Capability for acquiring and releasing virtual memory.
///
/// Mappers are small `Copy` values handed down explicitly to every
/// [`Page`](crate::Page) that needs one.
pub trait Mapper: Copy {
  /// Maps `size` bytes of zero-filled read/write memory.
  ///
  /// Returns `None` if `size` is zero or the backend refuses.
  fn map(
    &self,
    size: usize,
  ) -> Option<NonNull<u8>>;

  /// Releases a span previously returned by [`Mapper::map`].
  ///
  /// # Safety
  ///
  /// `(ptr, size)` must be exactly a pair returned by `map` on this mapper
  /// that has not been unmapped yet, and nothing may touch the span after.
  unsafe fn unmap(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  );

  /// Whether both operations are usable.
  fn is_valid(&self) -> bool {
    true
  }
}

/// Anonymous private mappings from the OS: `mmap(2)` / `munmap(2)` on Unix,
/// `VirtualAlloc` / `VirtualFree` on Windows.
#[cfg(any(unix, windows))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OsMapper;

#[cfg(any(unix, windows))]
impl Mapper for OsMapper {
  fn map(
    &self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    os_map(size)
  }

  unsafe fn unmap(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) {
    unsafe { os_unmap(ptr, size) }
  }
}

#[cfg(unix)]
pub fn os_map(size: usize) -> Option<NonNull<u8>> {
  if size == 0 {
    return None;
  }

  let addr = unsafe {
    libc::mmap(
      std::ptr::null_mut(),
      size,
      libc::PROT_READ | libc::PROT_WRITE,
      libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
      -1,
      0,
    )
  };

  if addr == libc::MAP_FAILED {
    warn!("mmap refused {} bytes", size);
    return None;
  }

  trace!("mapped {} bytes at {:?}", size, addr);
  NonNull::new(addr as *mut u8)
}

/// # Safety
///
/// See [`Mapper::unmap`].
#[cfg(unix)]
pub unsafe fn os_unmap(
  ptr: NonNull<u8>,
  size: usize,
) {
  if size == 0 {
    return;
  }

  trace!("unmapping {} bytes at {:?}", size, ptr);
  unsafe {
    libc::munmap(ptr.as_ptr() as *mut libc::c_void, size);
  }
}

#[cfg(windows)]
pub fn os_map(size: usize) -> Option<NonNull<u8>> {
  use windows_sys::Win32::System::Memory::{
    MEM_COMMIT,
    MEM_RESERVE,
    PAGE_READWRITE,
    VirtualAlloc,
  };

  if size == 0 {
    return None;
  }

  let addr = unsafe {
    VirtualAlloc(
      std::ptr::null(),
      size,
      MEM_RESERVE | MEM_COMMIT,
      PAGE_READWRITE,
    )
  };
  if addr.is_null() {
    warn!("VirtualAlloc refused {} bytes", size);
    return None;
  }

  trace!("mapped {} bytes at {:?}", size, addr);
  NonNull::new(addr as *mut u8)
}

/// # Safety
///
/// See [`Mapper::unmap`].
#[cfg(windows)]
pub unsafe fn os_unmap(
  ptr: NonNull<u8>,
  size: usize,
) {
  use windows_sys::Win32::System::Memory::{MEM_RELEASE, VirtualFree};

  if size == 0 {
    return;
  }

  trace!("unmapping {} bytes at {:?}", size, ptr);
  // MEM_RELEASE frees the whole reservation and requires a zero size.
  unsafe {
    VirtualFree(ptr.as_ptr() as *mut core::ffi::c_void, 0, MEM_RELEASE);
  }
}

pub type MapFn = fn(usize) -> Option<NonNull<u8>>;
pub type UnmapFn = unsafe fn(NonNull<u8>, usize);

/// A mapper assembled from a pair of plain function pointers.
///
/// Either half may be missing, in which case the mapper is invalid and every
/// consumer rejects it before use.
#[derive(Debug, Default, Clone, Copy)]
pub struct FnMapper {
  pub map: Option<MapFn>,
  pub unmap: Option<UnmapFn>,
}

impl FnMapper {
  pub const fn new(
    map: MapFn,
    unmap: UnmapFn,
  ) -> Self {
    Self {
      map: Some(map),
      unmap: Some(unmap),
    }
  }

  #[cfg(any(unix, windows))]
  pub const fn os() -> Self {
    Self::new(os_map, os_unmap)
  }
}

impl Mapper for FnMapper {
  fn map(
    &self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    self.map.and_then(|map| map(size))
  }

  unsafe fn unmap(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) {
    if let Some(unmap) = self.unmap {
      unsafe { unmap(ptr, size) }
    }
  }

  fn is_valid(&self) -> bool {
    self.map.is_some() && self.unmap.is_some()
  }
}

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// The OS page granularity, queried once per process.
///
/// Racing first callers may each query the OS; the first value published
/// wins and is what every caller sees from then on.
pub fn page_size() -> usize {
  let cached = PAGE_SIZE.load(Ordering::Acquire);
  if cached != 0 {
    return cached;
  }

  let computed = query_page_size();
  match PAGE_SIZE.compare_exchange(0, computed, Ordering::Release, Ordering::Acquire) {
    Ok(_) => computed,
    Err(published) => published,
  }
}

/// Rounds `size` up to a whole number of pages.
pub fn page_align(size: usize) -> usize {
  align_up(size, page_size())
}

#[cfg(unix)]
fn query_page_size() -> usize {
  let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
  if value <= 0 {
    warn!("sysconf(_SC_PAGESIZE) returned {}, assuming {}", value, FALLBACK_PAGE_SIZE);
    return FALLBACK_PAGE_SIZE;
  }
  value as usize
}

#[cfg(windows)]
fn query_page_size() -> usize {
  use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

  let mut info: SYSTEM_INFO = unsafe { std::mem::zeroed() };
  unsafe { GetSystemInfo(&mut info) };
  if info.dwPageSize == 0 {
    warn!("GetSystemInfo reported a zero page size, assuming {}", FALLBACK_PAGE_SIZE);
    return FALLBACK_PAGE_SIZE;
  }
  info.dwPageSize as usize
}

#[cfg(not(any(unix, windows)))]
fn query_page_size() -> usize {
  FALLBACK_PAGE_SIZE
}

#[cfg(all(test, any(unix, windows)))]
mod tests {
  use super::*;

  /// Bytes of address space the process has mapped, from `/proc/self/statm`.
  #[cfg(target_os = "linux")]
  fn mapped_bytes() -> Option<usize> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: usize = statm.split_whitespace().next()?.parse().ok()?;
    Some(pages * page_size())
  }

  #[test]
  fn test_page_size_is_power_of_two() {
    let size = page_size();
    assert!(size > 0);
    assert!(size.is_power_of_two());
    assert_eq!(size, page_size());
  }

  #[test]
  fn test_page_size_same_across_threads() {
    let handles: Vec<_> = (0..8).map(|_| std::thread::spawn(page_size)).collect();
    let expected = page_size();

    for handle in handles {
      assert_eq!(expected, handle.join().unwrap());
    }
  }

  #[test]
  fn test_page_align() {
    let ps = page_size();
    assert_eq!(0, page_align(0));
    assert_eq!(ps, page_align(1));
    assert_eq!(ps, page_align(ps));
    assert_eq!(ps * 2, page_align(ps + 1));
  }

  #[test]
  fn test_os_map_zero_filled_and_writable() {
    let mapper = OsMapper;
    let ptr = mapper.map(4096).unwrap();

    unsafe {
      let bytes = std::slice::from_raw_parts_mut(ptr.as_ptr(), 4096);
      assert!(bytes.iter().all(|&b| b == 0));

      bytes[0] = 0xAA;
      bytes[4095] = 0x55;
      assert_eq!(bytes[0], 0xAA);
      assert_eq!(bytes[4095], 0x55);

      mapper.unmap(ptr, 4096);
    }
  }

  #[test]
  fn test_os_map_zero_size() {
    assert!(OsMapper.map(0).is_none());
  }

  #[test]
  fn test_map_unmap_round_trip() {
    const SIZE: usize = 4 * 1024 * 1024;
    let mapper = OsMapper;

    #[cfg(target_os = "linux")]
    let before = mapped_bytes().unwrap();

    for _ in 0..1000 {
      let ptr = mapper.map(SIZE).expect("mapping should succeed");
      unsafe {
        ptr.as_ptr().write(1);
        mapper.unmap(ptr, SIZE);
      }
    }

    // A single leaked mapping per cycle would add about 4 GiB. The slack
    // absorbs thread stacks and malloc arenas of tests running alongside.
    #[cfg(target_os = "linux")]
    {
      let after = mapped_bytes().unwrap();
      assert!(
        after.saturating_sub(before) < 256 * 1024 * 1024,
        "address space grew from {} to {} bytes",
        before,
        after
      );
    }
  }

  #[test]
  fn test_fn_mapper_validity() {
    assert!(FnMapper::os().is_valid());
    assert!(!FnMapper::default().is_valid());

    let half = FnMapper {
      map: Some(os_map),
      unmap: None,
    };
    assert!(!half.is_valid());
  }

  #[test]
  fn test_fn_mapper_functionality() {
    let mapper = FnMapper::os();

    let ptr = mapper.map(4096).unwrap();
    unsafe {
      ptr.as_ptr().write(7);
      assert_eq!(ptr.as_ptr().read(), 7);
      mapper.unmap(ptr, 4096);
    }
  }
}
