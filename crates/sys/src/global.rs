/// Process-wide state on a single hart.
///
/// Bare-metal targets here have one thread of execution and no interrupt
/// handlers touching this state, so no lock is taken. The `Sync`
/// implementation exists only so the value can live in a `static`.
pub struct Global<T>(T);

impl<T> Global<T> {
    /// # Safety
    ///
    /// The wrapped value must only be reached from one hart, and never from
    /// an interrupt or exception handler that can preempt another access.
    pub const unsafe fn new(value: T) -> Self {
        Self(value)
    }

    pub fn get(&self) -> &T {
        &self.0
    }
}

// SAFETY: see `Global::new`; concurrent access is excluded by its contract.
unsafe impl<T> Sync for Global<T> {}
