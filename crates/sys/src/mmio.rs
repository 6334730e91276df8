/// 32-bit register access at absolute addresses.
///
/// Accesses have side effects (reading RXDATA pops the receive FIFO), so
/// implementations must not cache, merge or reorder them.
pub trait Mmio {
    fn read_u32(&self, addr: usize) -> u32;
    fn write_u32(&self, addr: usize, value: u32);
}

/// Direct volatile access to the physical address space.
#[derive(Debug, Clone, Copy)]
pub struct Volatile {
    _private: (),
}

impl Volatile {
    /// # Safety
    ///
    /// Every address later passed to [`Mmio::read_u32`] / [`Mmio::write_u32`]
    /// must be a 4-byte aligned device register (or RAM) of the running
    /// machine.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Mmio for Volatile {
    #[inline(always)]
    fn read_u32(&self, addr: usize) -> u32 {
        // SAFETY: guaranteed by the contract of `Volatile::new`.
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    #[inline(always)]
    fn write_u32(&self, addr: usize, value: u32) {
        // SAFETY: guaranteed by the contract of `Volatile::new`.
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }
}

impl<M: Mmio + ?Sized> Mmio for &M {
    #[inline(always)]
    fn read_u32(&self, addr: usize) -> u32 {
        (**self).read_u32(addr)
    }

    #[inline(always)]
    fn write_u32(&self, addr: usize, value: u32) {
        (**self).write_u32(addr, value)
    }
}
