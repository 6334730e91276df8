//! Panic handler that reports through the UART and exits with code 1.
//!
//! Enable with the `panic-exit` feature. The finisher then tells the host
//! the run failed instead of leaving it to time out.

#[cfg(all(
    feature = "panic-exit",
    any(target_arch = "riscv32", target_arch = "riscv64")
))]
#[panic_handler]
fn panic_exit(info: &core::panic::PanicInfo) -> ! {
    use core::fmt::Write;

    use crate::platform::{HostMode, PLATFORM};
    use crate::target::{fake_host, system};

    match PLATFORM.host {
        HostMode::Fake => fake_host().exit(1),
        HostMode::Hardware => {
            let sys = system();
            let mut uart = *sys.uart();
            let _ = writeln!(uart, "{info}");
            sys.exit(1)
        }
    }
}
