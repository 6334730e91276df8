//! Ways to stop the core for good once the program has exited.

/// Never-returning halt.
pub trait Park {
    fn park(&self) -> !;
}

/// `wfi` in a loop: low power, and a stray wake-up lands back in `wfi`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitForInterrupt;

/// `j .` in a loop, for simulators that never wake from `wfi`.
///
/// Emulators that detect termination by a stalled PC also rely on this.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusyBranch;

impl Park for WaitForInterrupt {
    fn park(&self) -> ! {
        loop {
            #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
            // SAFETY: `wfi` only stalls the hart.
            unsafe {
                riscv::asm::wfi();
            }

            #[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
            core::hint::spin_loop();
        }
    }
}

impl Park for BusyBranch {
    fn park(&self) -> ! {
        branch_to_self()
    }
}

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
fn branch_to_self() -> ! {
    // SAFETY: a branch to itself; never returns, touches no state.
    unsafe { core::arch::asm!("j .", options(noreturn)) }
}

#[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
fn branch_to_self() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

impl<P: Park + ?Sized> Park for &P {
    fn park(&self) -> ! {
        (**self).park()
    }
}
