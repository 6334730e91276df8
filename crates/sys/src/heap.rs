//! Bump-pointer heap behind `_sbrk`.
//!
//! The cursor only ever moves by the increments it is given. There is no
//! upper bound: running past the end of RAM is the caller's (or the linker
//! script's) problem, exactly as with the classic newlib stub.

use core::cell::Cell;
use core::ptr;

/// A single heap cursor.
///
/// # Thread Safety
///
/// Uses a plain `Cell`; share it only through [`crate::Global`] on a single
/// hart with no preemption.
#[derive(Debug)]
pub struct BumpHeap {
    cursor: Cell<*mut u8>,
    placed: Cell<bool>,
}

impl BumpHeap {
    pub const fn new(start: *mut u8) -> Self {
        Self {
            cursor: Cell::new(start),
            placed: Cell::new(true),
        }
    }

    /// A heap whose start is supplied on first use, see
    /// [`BumpHeap::start_with`].
    pub const fn unplaced() -> Self {
        Self {
            cursor: Cell::new(ptr::null_mut()),
            placed: Cell::new(false),
        }
    }

    /// Whether a start address has been set. Independent of the cursor
    /// value, which may legitimately reach address zero.
    pub fn is_placed(&self) -> bool {
        self.placed.get()
    }

    /// Set the start address if the heap has not been placed yet.
    ///
    /// Used for linker symbols, whose address is not available to a
    /// `const` initializer.
    pub fn start_with(&self, start: impl FnOnce() -> *mut u8) {
        if !self.is_placed() {
            self.cursor.set(start());
            self.placed.set(true);
        }
    }

    pub fn cursor(&self) -> *mut u8 {
        self.cursor.get()
    }

    /// Advance the cursor by `incr` bytes and return its previous value.
    ///
    /// Negative increments move the cursor back; no address is ever
    /// dereferenced here, so wrapping arithmetic is enough.
    pub fn sbrk(&self, incr: isize) -> *mut u8 {
        let prev = self.cursor.get();
        self.cursor.set(prev.wrapping_offset(incr));
        prev
    }

    /// Bytes left before `end`, negative once the cursor has overrun it.
    ///
    /// Purely informational; [`BumpHeap::sbrk`] never consults it.
    pub fn remaining(&self, end: *const u8) -> isize {
        (end as isize).wrapping_sub(self.cursor.get() as isize)
    }
}
