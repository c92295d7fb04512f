//! Compile-time sizing constants.

pub const KIB: usize = 1 << 10;
pub const MIB: usize = KIB * KIB;

/// Size of each segment an [`Arena`](crate::Arena) maps when it grows without
/// an explicit size.
pub const ARENA_SEGMENT_SIZE: usize = 64 * MIB;

/// Used when the OS page-size query yields nothing sensible.
pub const FALLBACK_PAGE_SIZE: usize = 4096;
