//! Smallest program on top of the syscall layer: greet from the current
//! hart, then report success to the finisher.

#![no_std]
#![no_main]

use core::fmt::Write;

use metalcall_sys::{target, STDOUT_FILENO};
#[cfg(all(feature = "panic-halt", not(feature = "panic-exit")))]
use panic_halt as _;
use riscv_rt::entry;

#[entry]
fn main() -> ! {
    let sys = target::system();
    sys.init_io();

    let hart = riscv::register::mhartid::read();
    let mut uart = *sys.uart();
    let _ = writeln!(uart, "Hello world from core {}", hart);

    let _ = sys.write(STDOUT_FILENO, b"bye\n");
    sys.exit(0)
}
