//! # segalloc - Allocator Core Primitives
//!
//! This crate provides the bottom layer of a small general-purpose memory
//! allocator: it maps memory from the operating system, carves it into
//! regions that describe themselves, and tracks which parts are free.
//!
//! ## Overview
//!
//! ```text
//!   Component Stack (leaves first):
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │  Bin          free-list + used-list of one size class                │
//!   ├──────────────────────────────────────────────────────────────────────┤
//!   │  List         intrusive doubly-linked list of Link nodes             │
//!   ├──────────────────────────────────────────────────────────────────────┤
//!   │  Slots        per-slot Bitmap tracking inside a usable span          │
//!   ├──────────────────────────────────────────────────────────────────────┤
//!   │  Segment      Page + self-hosted header + usable span  (Arena chain) │
//!   ├──────────────────────────────────────────────────────────────────────┤
//!   │  Page         one live mapping and its release obligation            │
//!   ├──────────────────────────────────────────────────────────────────────┤
//!   │  Mapper       map / unmap capability (mmap, VirtualAlloc)            │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every layer depends only on the ones below it.
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - Alignment and power-of-two helpers (align!)
//!   ├── arena      - Arena: growable chain of segments
//!   ├── bin        - Bin: size-class free/used lists
//!   ├── bitmap     - Bitmap over caller-owned words
//!   ├── config     - Size constants
//!   ├── error      - Error and Result
//!   ├── list       - Intrusive List and Link
//!   ├── mapper     - Mapper trait, OsMapper, FnMapper, page_size()
//!   ├── page       - Page: one OS mapping
//!   ├── segment    - Segment and OwnedSegment
//!   └── slots      - Slots: bitmap-tracked slot carving
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use segalloc::{Bin, OsMapper, OwnedSegment, Segment, Slots};
//!
//! fn main() -> segalloc::Result<()> {
//!     // Map one page with its header at the front.
//!     let mut segment = OwnedSegment::new(4096, OsMapper)?;
//!
//!     // Track 64-byte slots inside the usable span.
//!     let span = segment.as_mut_slice().unwrap();
//!     let mut slots = Slots::carve(span, 64)?;
//!     let slot = slots.acquire().unwrap();
//!     slots.release(slot)?;
//!
//!     // Or hand whole segments to a size class.
//!     let mut bin = Bin::new(4096);
//!     let raw = OwnedSegment::new(4096, OsMapper)?.into_raw().unwrap();
//!     unsafe { bin.insert(Segment::link(raw)) };
//!     let claimed = bin.claim().unwrap();
//!     unsafe {
//!         bin.retire(claimed);
//!         Segment::deinit(raw);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## How It Works
//!
//! A segment's metadata has nowhere to live before the allocator exists, so
//! it lives inside the very mapping it describes:
//!
//! ```text
//!   Single Segment:
//!   ┌───────────────────────────┬──────────────────────────────────────┐
//!   │      Segment Header       │             Usable Span              │
//!   │  ┌─────────────────────┐  │                                      │
//!   │  │ next / prev         │  │  ┌────────────────────────────────┐  │
//!   │  │ link (List node)    │  │  │                                │  │
//!   │  │ page (ptr, size)    │  │  │ page.size - header bytes       │  │
//!   │  │ data, usable        │  │  │                                │  │
//!   │  └─────────────────────┘  │  └────────────────────────────────┘  │
//!   └───────────────────────────┴──────────────────────────────────────┘
//!   ▲                           ▲
//!   └── segment handle          └── Segment::space()
//! ```
//!
//! Free space inside a span is tracked with a [`Bitmap`]: `find_first_clear`
//! finds a free slot, `find_first_set` finds a used one, and `None` means the
//! span is full or empty respectively.
//!
//! ## Features
//!
//! - **Self-hosted metadata**: headers sit inside their own mapping
//! - **Idempotent teardown**: `Page::deinit`, `OwnedSegment::deinit` and
//!   `Arena::release` can be repeated safely
//! - **Injected backends**: any [`Mapper`] can stand in for the OS
//! - **Word-exact scans**: bitmap scans never report bits past `bit_count`
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no structure here is synchronized
//! - **No public malloc/free**: size-class policy belongs to the layer above
//! - **No decommit or purge**: pages stay committed until unmapped
//! - **Unix and Windows OS backends only**: elsewhere a [`Mapper`] must be
//!   injected
//!
//! ## Safety
//!
//! Intrusive lists and self-hosted headers are raw-pointer structures. The
//! operations that link, unlink or tear them down are `unsafe` and document
//! what the caller must uphold.

pub mod align;
mod arena;
mod bin;
mod bitmap;
pub mod config;
mod error;
mod list;
mod mapper;
mod page;
mod segment;
mod slots;

pub use arena::Arena;
pub use bin::Bin;
pub use bitmap::{Bitmap, NOT_FOUND, WORD_BITS, WORD_BYTES, Word};
pub use error::{Error, Result};
pub use list::{Iter, Link, List};
#[cfg(any(unix, windows))]
pub use mapper::{OsMapper, os_map, os_unmap};
pub use mapper::{FnMapper, MapFn, Mapper, UnmapFn, page_align, page_size};
pub use page::Page;
pub use segment::{Chain, OwnedSegment, Segment};
pub use slots::Slots;
