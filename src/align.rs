/// Rounds `$value` up to the machine word size, or to `$align` when given.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use segalloc::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
///
/// assert_eq!(align!(9, 8), 16);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align::align_up($value, ::core::mem::size_of::<usize>())
  };
  ($value:expr, $align:expr) => {
    $crate::align::align_up($value, $align)
  };
}

/// Rounds `n` up to a multiple of `alignment`.
///
/// `alignment` must be a power of two; zero leaves `n` untouched. The result
/// wraps if `n` is within `alignment` of `usize::MAX`.
#[inline]
pub const fn align_up(
  n: usize,
  alignment: usize,
) -> usize {
  if alignment == 0 {
    return n;
  }
  n.wrapping_add(alignment - 1) & !(alignment - 1)
}

/// Rounds `n` down to a multiple of `alignment`. Zero leaves `n` untouched.
#[inline]
pub const fn align_down(
  n: usize,
  alignment: usize,
) -> usize {
  if alignment == 0 {
    return n;
  }
  n & !(alignment - 1)
}

/// Rounds a pointer up to `alignment`, keeping its provenance.
#[inline]
pub fn align_ptr_up<T>(
  ptr: *mut T,
  alignment: usize,
) -> *mut T {
  let addr = ptr as usize;
  ptr.wrapping_byte_add(align_up(addr, alignment) - addr)
}

#[inline]
pub const fn is_power_of_two(n: usize) -> bool {
  n != 0 && (n & (n - 1)) == 0
}

/// Smallest power of two `>= n`. Returns 1 for 0 and 0 on overflow.
pub const fn next_power_of_two(n: usize) -> usize {
  match n.checked_next_power_of_two() {
    Some(p) => p,
    None => 0,
  }
}

/// Largest power of two `<= n`, or 0 for 0.
pub const fn prev_power_of_two(n: usize) -> usize {
  if n == 0 {
    return 0;
  }
  1 << (usize::BITS - 1 - n.leading_zeros())
}
