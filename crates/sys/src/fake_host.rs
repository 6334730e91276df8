//! Fake host for simulators that cannot service HTIF.
//!
//! libgloss-htif funnels every syscall through `htif_syscall`, which writes
//! `tohost` and then spins on `fromhost`. Under a simulator with no host
//! side that spin never ends. The fake host answers immediately instead and
//! never touches a register.

use core::ffi::c_int;

use crate::errno::{Errno, SysResult};
use crate::park::Park;

/// libgloss-htif syscall numbers.
pub mod nr {
    pub const WRITE: u64 = 64;
    pub const EXIT: u64 = 93;
    pub const BRK: u64 = 214;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FakeHost<P> {
    parker: P,
}

impl<P: Park> FakeHost<P> {
    pub const fn new(parker: P) -> Self {
        Self { parker }
    }

    /// Replacement for `htif_syscall(a0, a1, a2, n)`.
    ///
    /// Writes claim the full length, `brk` succeeds, exit parks, and any
    /// other number fails with `-1`.
    pub fn syscall(&self, _a0: u64, _a1: u64, a2: u64, n: u64) -> i64 {
        match n {
            nr::WRITE => a2 as i64,
            nr::BRK => 0,
            nr::EXIT => self.parker.park(),
            _ => {
                sys_trace!(n, "unsupported fake-host syscall");
                -1
            }
        }
    }

    /// Every write "succeeds" on every descriptor.
    pub fn write(&self, _fd: c_int, len: usize) -> usize {
        len
    }

    /// There is no input behind the fake host.
    pub fn read(&self, _fd: c_int) -> SysResult<usize> {
        Err(Errno::NoSys)
    }

    pub fn isatty(&self, _fd: c_int) -> bool {
        true
    }

    pub fn exit(&self, _code: c_int) -> ! {
        self.parker.park()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::park::BusyBranch;

    #[test]
    fn test_write_reports_full_length() {
        let host = FakeHost::new(BusyBranch);
        assert_eq!(host.syscall(1, 0x8000_0000, 17, nr::WRITE), 17);
        assert_eq!(host.write(9, 3), 3);
    }

    #[test]
    fn test_brk_succeeds() {
        let host = FakeHost::new(BusyBranch);
        assert_eq!(host.syscall(0x8010_0000, 0, 0, nr::BRK), 0);
    }

    #[test]
    fn test_unknown_syscall_fails() {
        let host = FakeHost::new(BusyBranch);
        assert_eq!(host.syscall(0, 0, 0, 57), -1);
        assert_eq!(host.syscall(0, 0, 0, 63), -1);
    }

    #[test]
    fn test_file_surface() {
        let host = FakeHost::new(BusyBranch);
        assert_eq!(host.read(0), Err(Errno::NoSys));
        assert!(host.isatty(5));
    }
}
