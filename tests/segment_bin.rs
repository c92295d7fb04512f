#![cfg(unix)]

use segalloc::{Arena, Bin, FnMapper, Mapper, OsMapper, OwnedSegment, Segment, Slots, page_size};

fn init_logging() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// Bytes of address space the process has mapped, from `/proc/self/statm`.
#[cfg(target_os = "linux")]
fn mapped_bytes() -> usize {
  let statm = std::fs::read_to_string("/proc/self/statm").unwrap();
  let pages: usize = statm.split_whitespace().next().unwrap().parse().unwrap();
  pages * page_size()
}

#[test]
fn arena_segments_cycle_through_a_bin() {
  init_logging();

  let mut arena = Arena::new(4 * page_size(), OsMapper);
  let mut bin: Bin<Segment<OsMapper>> = Bin::new(64);

  for _ in 0..3 {
    let segment = arena.grow().unwrap();
    unsafe { bin.insert(Segment::link(segment)) };
  }
  assert_eq!(3, bin.free_len());

  let newest = arena.tail().unwrap();
  let link = bin.claim().unwrap();
  let mut segment = unsafe { Segment::from_link(link) }.unwrap();
  assert_eq!(newest, segment);

  {
    let span = unsafe { segment.as_mut().as_mut_slice() };
    let mut slots = Slots::carve(span, bin.slot_size()).unwrap();

    let mut taken = Vec::new();
    while let Some(slot) = slots.acquire() {
      unsafe { slot.as_ptr().write_bytes(0xC3, 64) };
      taken.push(slot);
    }
    assert!(slots.is_full());

    for slot in taken {
      assert_eq!(0xC3, unsafe { slot.as_ptr().read() });
      slots.release(slot).unwrap();
    }
    assert!(slots.is_empty());
  }

  unsafe { bin.release(link) };
  assert_eq!(Some(link), bin.claim());

  // Unlink everything before the arena unmaps the headers holding the links.
  for segment in arena.iter() {
    unsafe { bin.retire(Segment::link(segment)) };
  }
  assert_eq!(0, bin.free_len() + bin.used_len());

  arena.release();
  arena.release();
}

#[test]
fn segment_pattern_round_trip() {
  init_logging();

  let mut segment = OwnedSegment::new(4096, OsMapper).unwrap();
  let (_, usable) = segment.space().unwrap();
  assert_eq!(4096 - Segment::<OsMapper>::HEADER_SIZE, usable);

  let span = segment.as_mut_slice().unwrap();
  for (i, byte) in span.iter_mut().enumerate() {
    *byte = (i % 256) as u8;
  }
  assert!(span.iter().enumerate().all(|(i, &b)| b == (i % 256) as u8));

  segment.deinit();
  segment.deinit();
}

#[test]
fn injected_mapper_backs_segments() {
  init_logging();

  let mut segment = OwnedSegment::new(8192, FnMapper::os()).unwrap();
  let header = segment.header().unwrap();
  assert_eq!(8192, header.page().size());
  assert!(header.page().mapper().is_valid());

  segment.deinit();
  assert!(!segment.is_live());
}

#[test]
fn map_unmap_repeats_without_growth() {
  init_logging();

  const SIZE: usize = 4 * 1024 * 1024;

  #[cfg(target_os = "linux")]
  let before = mapped_bytes();

  for _ in 0..1000 {
    let segment = OwnedSegment::new(SIZE, OsMapper).unwrap();
    drop(segment);
  }

  // Leaking every segment would add about 4 GiB; the slack covers thread
  // stacks and malloc arenas of the other tests in this binary.
  #[cfg(target_os = "linux")]
  {
    let grown = mapped_bytes().saturating_sub(before);
    assert!(grown < 256 * 1024 * 1024, "address space grew by {} bytes", grown);
  }
}
