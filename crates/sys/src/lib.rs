// MetalCall - Bare-Metal Syscall Layer
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! newlib platform layer for bare-metal RISC-V.
//!
//! This crate provides:
//! - A SiFive-style UART driver used for `_write` / `_read`
//! - Exit signalling through a memory-mapped finisher register
//! - A bump-pointer `_sbrk` heap starting at the linker's `_end`
//! - The constant stand-ins newlib expects (`_fstat`, `_isatty`, ...)
//! - A fake host that short-circuits the HTIF syscall trampoline
//!
//! Everything is written against the [`Mmio`] and [`Park`] traits so the
//! same code runs on hardware (volatile accesses, `wfi`) and inside the
//! host-side testbench.
//!
//! # Usage
//!
//! For a C program linked against newlib:
//!
//! ```toml
//! [dependencies]
//! metalcall-sys = { version = "0.1", features = ["newlib"] }
//! ```
//!
//! Register addresses come from `METALCALL_UART_BASE` and
//! `METALCALL_FINISHER_BASE` at build time, and the finisher encoding from
//! the `finisher-*` features.

#![cfg_attr(not(test), no_std)]

/// Trace-level event from the syscall surface; compiled out unless the
/// `tracing` feature is on.
macro_rules! sys_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

pub mod abi;
pub mod errno;
pub mod fake_host;
pub mod finisher;
pub mod global;
pub mod heap;
pub mod mmio;
pub mod park;
pub mod platform;
pub mod system;
pub mod uart;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub mod target;

mod panic;

pub use errno::{Errno, SysResult};
pub use fake_host::FakeHost;
pub use finisher::{ExitStatus, Finisher, FinisherStyle};
pub use global::Global;
pub use heap::BumpHeap;
pub use mmio::{Mmio, Volatile};
pub use park::{BusyBranch, Park, WaitForInterrupt};
pub use platform::{FinisherConfig, HostMode, Platform, PLATFORM};
pub use system::{Stat, System, S_IFCHR, STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
pub use uart::{ReadMode, Uart};
