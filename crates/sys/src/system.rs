//! The syscall surface newlib expects, as a safe Rust API.
//!
//! [`crate::abi`] turns these `Result`s into the `-1` + `errno` convention.

use core::ffi::{c_int, c_long};

use crate::errno::{Errno, SysResult};
use crate::finisher::Finisher;
use crate::heap::BumpHeap;
use crate::mmio::Mmio;
use crate::park::Park;
use crate::platform::Platform;
use crate::uart::{ReadMode, Uart};

pub const STDIN_FILENO: c_int = 0;
pub const STDOUT_FILENO: c_int = 1;
pub const STDERR_FILENO: c_int = 2;

/// Character device, from newlib's `<sys/stat.h>`.
pub const S_IFCHR: u32 = 0o020000;

/// Leading fields of newlib's default `struct stat`.
///
/// Only `st_mode` is ever written; the remainder of the C structure is left
/// untouched and so does not need to be declared.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Stat {
    pub st_dev: i16,
    pub st_ino: u16,
    pub st_mode: u32,
}

fn is_std_stream(fd: c_int) -> bool {
    matches!(fd, STDIN_FILENO | STDOUT_FILENO | STDERR_FILENO)
}

/// UART-backed I/O, finisher-backed exit and the process heap.
#[derive(Debug)]
pub struct System<B, P> {
    uart: Uart<B>,
    finisher: Option<Finisher<B>>,
    parker: P,
    heap: BumpHeap,
    read_mode: ReadMode,
}

impl<B: Mmio, P: Park> System<B, P> {
    pub const fn new(
        uart: Uart<B>,
        finisher: Option<Finisher<B>>,
        parker: P,
        heap: BumpHeap,
        read_mode: ReadMode,
    ) -> Self {
        Self {
            uart,
            finisher,
            parker,
            heap,
            read_mode,
        }
    }

    pub fn from_platform(bus: B, platform: &Platform, parker: P, heap: BumpHeap) -> Self
    where
        B: Copy,
    {
        Self::new(
            platform.uart(bus),
            platform.finisher(bus),
            parker,
            heap,
            platform.read_mode,
        )
    }

    pub fn uart(&self) -> &Uart<B> {
        &self.uart
    }

    pub fn finisher(&self) -> Option<&Finisher<B>> {
        self.finisher.as_ref()
    }

    pub fn heap(&self) -> &BumpHeap {
        &self.heap
    }

    /// Default `sys_io_init` body. Call before the first write.
    pub fn init_io(&self) {
        self.uart.init();
    }

    /// `_write`: stdout and stderr go to the UART.
    pub fn write(&self, fd: c_int, buf: &[u8]) -> SysResult<usize> {
        if fd != STDOUT_FILENO && fd != STDERR_FILENO {
            sys_trace!(fd, "write to unsupported descriptor");
            return Err(Errno::BadFd);
        }
        let n = self.uart.write_bytes(buf);
        sys_trace!(fd, n, "write");
        Ok(n)
    }

    /// `_read`: stdin comes from the UART receive FIFO.
    pub fn read(&self, fd: c_int, buf: &mut [u8]) -> SysResult<usize> {
        if fd != STDIN_FILENO {
            sys_trace!(fd, "read from unsupported descriptor");
            return Err(Errno::BadFd);
        }
        let n = self.uart.read_into(buf, self.read_mode);
        sys_trace!(requested = buf.len(), n, "read");
        Ok(n)
    }

    /// `_close`: the standard streams cannot be closed.
    pub fn close(&self, fd: c_int) -> SysResult<()> {
        if is_std_stream(fd) {
            Err(Errno::NoSys)
        } else {
            Err(Errno::BadFd)
        }
    }

    /// `_lseek`: character devices do not seek.
    pub fn lseek(&self, fd: c_int, _offset: c_long, _whence: c_int) -> SysResult<c_long> {
        if is_std_stream(fd) {
            Err(Errno::NoSys)
        } else {
            Err(Errno::BadFd)
        }
    }

    /// `_fstat`: every descriptor is a character device, so newlib line
    /// buffers the standard streams instead of block buffering them.
    pub fn fstat(&self, _fd: c_int, st: Option<&mut Stat>) -> SysResult<()> {
        let st = st.ok_or(Errno::Invalid)?;
        st.st_mode = S_IFCHR;
        Ok(())
    }

    pub fn isatty(&self, fd: c_int) -> bool {
        is_std_stream(fd)
    }

    pub fn kill(&self, _pid: c_int, _sig: c_int) -> SysResult<()> {
        Err(Errno::NoSys)
    }

    pub fn getpid(&self) -> c_int {
        1
    }

    pub fn sbrk(&self, incr: isize) -> *mut u8 {
        let prev = self.heap.sbrk(incr);
        sys_trace!(incr, prev = prev as usize, "sbrk");
        prev
    }

    /// `_exit`: report `code` to the finisher (if any), then park.
    pub fn exit(&self, code: c_int) -> ! {
        if let Some(finisher) = &self.finisher {
            let _value = finisher.signal(code);
            sys_trace!(code, value = _value, "finisher written");
        }
        self.parker.park()
    }
}
