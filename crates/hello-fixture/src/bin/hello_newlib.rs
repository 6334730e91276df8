//! The greeting again, this time only through the C entry points a newlib
//! program links against: `sys_io_init`, `_write` and `_exit`.

#![no_std]
#![no_main]

use core::cell::UnsafeCell;
use core::ffi::{c_int, c_void};

use metalcall_sys as _;
#[cfg(all(feature = "panic-halt", not(feature = "panic-exit")))]
use panic_halt as _;
use riscv_rt::entry;

extern "C" {
    fn sys_io_init();
    fn _write(fd: c_int, buf: *const c_void, len: usize) -> isize;
    fn _exit(code: c_int) -> !;
}

struct ErrnoSlot(UnsafeCell<c_int>);

// SAFETY: single hart, no interrupts enabled.
unsafe impl Sync for ErrnoSlot {}

static ERRNO: ErrnoSlot = ErrnoSlot(UnsafeCell::new(0));

/// Stands in for newlib's reentrancy hook; no libc is linked here.
#[no_mangle]
extern "C" fn __errno() -> *mut c_int {
    ERRNO.0.get()
}

#[entry]
fn main() -> ! {
    const MSG: &[u8] = b"Hello world from newlib\n";
    // SAFETY: `MSG` outlives the call and `len` matches it.
    unsafe {
        sys_io_init();
        _write(1, MSG.as_ptr().cast(), MSG.len());
        _exit(0)
    }
}
