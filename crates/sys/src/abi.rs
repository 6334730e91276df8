//! C calling convention for the syscall surface.
//!
//! Each function takes raw pointers the way newlib passes them, forwards to
//! [`System`], and reports failure as `-1` with the error code stored in
//! `errno`. The `#[no_mangle]` exports in `target` are one-line wrappers
//! around these; keeping the conversion here lets the host testbench call
//! exactly the code the target runs.

use core::ffi::{c_int, c_long, c_void};
use core::slice;

use crate::errno::{Errno, SysResult};
use crate::mmio::Mmio;
use crate::park::Park;
use crate::system::{Stat, System};

fn fail(errno: &mut c_int, err: Errno) {
    *errno = err.code();
}

fn ssize(result: SysResult<usize>, errno: &mut c_int) -> isize {
    match result {
        Ok(n) => n as isize,
        Err(err) => {
            fail(errno, err);
            -1
        }
    }
}

fn status(result: SysResult<()>, errno: &mut c_int) -> c_int {
    match result {
        Ok(()) => 0,
        Err(err) => {
            fail(errno, err);
            -1
        }
    }
}

/// `ssize_t _write(int fd, const void *buf, size_t len)`
///
/// # Safety
///
/// `buf` must be null or valid for reads of `len` bytes.
pub unsafe fn write<B: Mmio, P: Park>(
    sys: &System<B, P>,
    errno: &mut c_int,
    fd: c_int,
    buf: *const c_void,
    len: usize,
) -> isize {
    let result = if len == 0 {
        sys.write(fd, &[])
    } else if buf.is_null() {
        // Descriptor errors still take precedence.
        sys.write(fd, &[]).and(Err(Errno::Invalid))
    } else {
        // SAFETY: non-null and valid for `len` bytes per the contract.
        let bytes = unsafe { slice::from_raw_parts(buf.cast::<u8>(), len) };
        sys.write(fd, bytes)
    };
    ssize(result, errno)
}

/// `ssize_t _read(int fd, void *buf, size_t len)`
///
/// # Safety
///
/// `buf` must be null or valid for writes of `len` bytes.
pub unsafe fn read<B: Mmio, P: Park>(
    sys: &System<B, P>,
    errno: &mut c_int,
    fd: c_int,
    buf: *mut c_void,
    len: usize,
) -> isize {
    let result = if len == 0 {
        sys.read(fd, &mut [])
    } else if buf.is_null() {
        sys.read(fd, &mut []).and(Err(Errno::Invalid))
    } else {
        // SAFETY: non-null and valid for `len` bytes per the contract.
        let bytes = unsafe { slice::from_raw_parts_mut(buf.cast::<u8>(), len) };
        sys.read(fd, bytes)
    };
    ssize(result, errno)
}

/// `int _close(int fd)`
pub fn close<B: Mmio, P: Park>(sys: &System<B, P>, errno: &mut c_int, fd: c_int) -> c_int {
    status(sys.close(fd), errno)
}

/// `off_t _lseek(int fd, off_t offset, int whence)`
pub fn lseek<B: Mmio, P: Park>(
    sys: &System<B, P>,
    errno: &mut c_int,
    fd: c_int,
    offset: c_long,
    whence: c_int,
) -> c_long {
    match sys.lseek(fd, offset, whence) {
        Ok(pos) => pos,
        Err(err) => {
            fail(errno, err);
            -1
        }
    }
}

/// `int _fstat(int fd, struct stat *st)`
///
/// # Safety
///
/// `st` must be null or point to a writable newlib `struct stat`.
pub unsafe fn fstat<B: Mmio, P: Park>(
    sys: &System<B, P>,
    errno: &mut c_int,
    fd: c_int,
    st: *mut Stat,
) -> c_int {
    // SAFETY: null or a valid `struct stat` per the contract.
    let st = unsafe { st.as_mut() };
    status(sys.fstat(fd, st), errno)
}

/// `int _isatty(int fd)`
pub fn isatty<B: Mmio, P: Park>(sys: &System<B, P>, fd: c_int) -> c_int {
    c_int::from(sys.isatty(fd))
}

/// `int _kill(int pid, int sig)`
pub fn kill<B: Mmio, P: Park>(
    sys: &System<B, P>,
    errno: &mut c_int,
    pid: c_int,
    sig: c_int,
) -> c_int {
    status(sys.kill(pid, sig), errno)
}

/// `int _getpid(void)`
pub fn getpid<B: Mmio, P: Park>(sys: &System<B, P>) -> c_int {
    sys.getpid()
}

/// `void *_sbrk(ptrdiff_t incr)`
///
/// `heap_start` supplies the initial cursor on the first call.
pub fn sbrk<B: Mmio, P: Park>(
    sys: &System<B, P>,
    heap_start: impl FnOnce() -> *mut u8,
    incr: isize,
) -> *mut c_void {
    sys.heap().start_with(heap_start);
    sys.sbrk(incr).cast()
}

/// `void _exit(int code)`
pub fn exit<B: Mmio, P: Park>(sys: &System<B, P>, code: c_int) -> ! {
    sys.exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::BumpHeap;
    use crate::park::BusyBranch;
    use crate::system::S_IFCHR;
    use crate::uart::{ReadMode, Uart};
    use core::ptr;
    use std::cell::RefCell;
    use std::vec::Vec;

    #[derive(Default)]
    struct Sink(RefCell<Vec<u32>>);

    impl Mmio for Sink {
        fn read_u32(&self, addr: usize) -> u32 {
            // TX ready, RX empty.
            if addr == crate::uart::reg::RXDATA {
                1 << 31
            } else {
                0
            }
        }

        fn write_u32(&self, _addr: usize, value: u32) {
            self.0.borrow_mut().push(value);
        }
    }

    fn system(sink: &Sink) -> System<&Sink, BusyBranch> {
        System::new(
            Uart::new(sink, 0),
            None,
            BusyBranch,
            BumpHeap::unplaced(),
            ReadMode::NonBlocking,
        )
    }

    #[test]
    fn test_write_bad_fd_sets_errno() {
        let sink = Sink::default();
        let sys = system(&sink);
        let mut errno = 0;
        let buf = [b'x'; 10];
        let rc = unsafe { write(&sys, &mut errno, 5, buf.as_ptr().cast(), 10) };
        assert_eq!(rc, -1);
        assert_eq!(errno, Errno::BadFd.code());
    }

    #[test]
    fn test_write_null_buffer() {
        let sink = Sink::default();
        let sys = system(&sink);
        let mut errno = 0;
        assert_eq!(unsafe { write(&sys, &mut errno, 1, ptr::null(), 4) }, -1);
        assert_eq!(errno, Errno::Invalid.code());

        errno = 0;
        assert_eq!(unsafe { write(&sys, &mut errno, 9, ptr::null(), 4) }, -1);
        assert_eq!(errno, Errno::BadFd.code());
    }

    #[test]
    fn test_read_without_data_returns_zero() {
        let sink = Sink::default();
        let sys = system(&sink);
        let mut errno = 0;
        let mut buf = [0u8; 16];
        let rc = unsafe { read(&sys, &mut errno, 0, buf.as_mut_ptr().cast(), buf.len()) };
        assert_eq!(rc, 0);
        assert_eq!(errno, 0);
    }

    #[test]
    fn test_fstat_null_and_valid() {
        let sink = Sink::default();
        let sys = system(&sink);
        let mut errno = 0;
        assert_eq!(unsafe { fstat(&sys, &mut errno, 0, ptr::null_mut()) }, -1);
        assert_eq!(errno, Errno::Invalid.code());

        let mut st = Stat::default();
        assert_eq!(unsafe { fstat(&sys, &mut errno, 3, &mut st) }, 0);
        assert_eq!(st.st_mode, S_IFCHR);
    }

    #[test]
    fn test_sbrk_places_heap_on_first_call() {
        let sink = Sink::default();
        let sys = system(&sink);
        let p0 = sbrk(&sys, || 0x8000_8000 as *mut u8, 24);
        let p1 = sbrk(&sys, || unreachable!(), 8);
        assert_eq!(p0 as usize, 0x8000_8000);
        assert_eq!(p1 as usize, 0x8000_8018);
        assert_eq!(sys.heap().cursor() as usize, 0x8000_8020);
    }

    #[test]
    fn test_misc_stubs() {
        let sink = Sink::default();
        let sys = system(&sink);
        let mut errno = 0;
        assert_eq!(isatty(&sys, 2), 1);
        assert_eq!(isatty(&sys, 4), 0);
        assert_eq!(getpid(&sys), 1);
        assert_eq!(kill(&sys, &mut errno, 1, 15), -1);
        assert_eq!(errno, Errno::NoSys.code());
        assert_eq!(close(&sys, &mut errno, 8), -1);
        assert_eq!(errno, Errno::BadFd.code());
        assert_eq!(lseek(&sys, &mut errno, 1, 0, 0), -1);
        assert_eq!(errno, Errno::NoSys.code());
    }
}
