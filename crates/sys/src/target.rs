//! Process-wide state and the exported C symbols (RISC-V targets only).

use crate::fake_host::FakeHost;
use crate::finisher::Finisher;
use crate::global::Global;
use crate::heap::BumpHeap;
use crate::mmio::Volatile;
use crate::park::{BusyBranch, WaitForInterrupt};
use crate::platform::PLATFORM;
use crate::system::System;

// SAFETY: the only addresses reached through `BUS` are the UART and
// finisher windows configured at build time.
const BUS: Volatile = unsafe { Volatile::new() };

const FINISHER: Option<Finisher<Volatile>> = match PLATFORM.finisher {
    Some(cfg) => Some(Finisher::new(BUS, cfg.base, cfg.style)),
    None => None,
};

// SAFETY: single hart, and nothing here runs from a trap handler.
static SYSTEM: Global<System<Volatile, WaitForInterrupt>> = unsafe {
    Global::new(System::new(
        PLATFORM.uart(BUS),
        FINISHER,
        WaitForInterrupt,
        BumpHeap::unplaced(),
        PLATFORM.read_mode,
    ))
};

static FAKE_HOST: FakeHost<BusyBranch> = FakeHost::new(BusyBranch);

/// The hardware-backed syscall state of this program.
pub fn system() -> &'static System<Volatile, WaitForInterrupt> {
    SYSTEM.get()
}

pub fn fake_host() -> &'static FakeHost<BusyBranch> {
    &FAKE_HOST
}

#[cfg(feature = "newlib")]
mod newlib {
    use core::ffi::{c_int, c_long, c_void};

    use super::{fake_host, system};
    use crate::abi;
    use crate::platform::{HostMode, PLATFORM};
    use crate::system::Stat;

    extern "C" {
        /// End of `.bss`, provided by the linker script.
        static mut _end: u8;
        /// newlib's per-reent `errno` slot.
        fn __errno() -> *mut c_int;
    }

    fn heap_start() -> *mut u8 {
        // SAFETY: only the address is taken; `_end` itself is never accessed.
        unsafe { core::ptr::addr_of_mut!(_end) }
    }

    fn errno() -> &'static mut c_int {
        // SAFETY: newlib returns a valid slot for the current (only) thread.
        unsafe { &mut *__errno() }
    }

    #[no_mangle]
    pub unsafe extern "C" fn _write(fd: c_int, buf: *const c_void, len: usize) -> isize {
        match PLATFORM.host {
            HostMode::Fake => fake_host().write(fd, len) as isize,
            HostMode::Hardware => unsafe { abi::write(system(), errno(), fd, buf, len) },
        }
    }

    #[no_mangle]
    pub unsafe extern "C" fn _read(fd: c_int, buf: *mut c_void, len: usize) -> isize {
        match PLATFORM.host {
            HostMode::Fake => match fake_host().read(fd) {
                Ok(n) => n as isize,
                Err(err) => {
                    *errno() = err.code();
                    -1
                }
            },
            HostMode::Hardware => unsafe { abi::read(system(), errno(), fd, buf, len) },
        }
    }

    #[no_mangle]
    pub extern "C" fn _close(fd: c_int) -> c_int {
        abi::close(system(), errno(), fd)
    }

    #[no_mangle]
    pub extern "C" fn _lseek(fd: c_int, offset: c_long, whence: c_int) -> c_long {
        abi::lseek(system(), errno(), fd, offset, whence)
    }

    #[no_mangle]
    pub unsafe extern "C" fn _fstat(fd: c_int, st: *mut Stat) -> c_int {
        unsafe { abi::fstat(system(), errno(), fd, st) }
    }

    #[no_mangle]
    pub extern "C" fn _isatty(fd: c_int) -> c_int {
        match PLATFORM.host {
            HostMode::Fake => c_int::from(fake_host().isatty(fd)),
            HostMode::Hardware => abi::isatty(system(), fd),
        }
    }

    #[no_mangle]
    pub extern "C" fn _kill(pid: c_int, sig: c_int) -> c_int {
        abi::kill(system(), errno(), pid, sig)
    }

    #[no_mangle]
    pub extern "C" fn _getpid() -> c_int {
        abi::getpid(system())
    }

    #[no_mangle]
    pub extern "C" fn _sbrk(incr: isize) -> *mut c_void {
        abi::sbrk(system(), heap_start, incr)
    }

    #[no_mangle]
    pub extern "C" fn _exit(code: c_int) -> ! {
        match PLATFORM.host {
            HostMode::Fake => fake_host().exit(code),
            HostMode::Hardware => abi::exit(system(), code),
        }
    }

    /// Default UART bring-up; build without `default-io-init` to supply
    /// your own `sys_io_init`.
    #[cfg(feature = "default-io-init")]
    #[no_mangle]
    pub extern "C" fn sys_io_init() {
        if PLATFORM.host == HostMode::Hardware {
            system().init_io();
        }
    }
}

/// Targets for `-Wl,--wrap=htif_syscall,--wrap=_write,--wrap=_exit`.
#[cfg(feature = "fake-host")]
mod wrap {
    use core::ffi::{c_int, c_long, c_uint, c_ulong, c_void};

    use super::fake_host;

    #[no_mangle]
    pub extern "C" fn __wrap_htif_syscall(a0: u64, a1: u64, a2: u64, n: c_ulong) -> c_long {
        fake_host().syscall(a0, a1, a2, n as u64) as c_long
    }

    #[no_mangle]
    pub extern "C" fn __wrap__write(fd: c_int, _buf: *const c_void, len: c_uint) -> c_int {
        fake_host().write(fd, len as usize) as c_int
    }

    #[no_mangle]
    pub extern "C" fn __wrap__exit(code: c_int) -> ! {
        fake_host().exit(code)
    }
}
