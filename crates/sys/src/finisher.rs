//! Exit status encoding for the finisher register.

use crate::mmio::Mmio;

/// Value the simple encoding writes for a zero exit code.
pub const SIMPLE_PASS: u32 = 0x5555;
/// Base value the simple encoding ORs a non-zero exit code into.
pub const SIMPLE_FAIL: u32 = 0x3333;

/// Wire format understood by the host watching the finisher register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinisherStyle {
    /// `0x5555` for success, `0x3333 | (code & 0xFFFF)` otherwise.
    Simple,
    /// HTIF `tohost` exit: `(code << 1) | 1`.
    Htif,
}

/// What a host decodes from a finisher write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Pass,
    /// For [`FinisherStyle::Htif`] this is the exit code. The simple
    /// encoding ORs the code into `0x3333`, so only the raw low half-word
    /// survives.
    Fail(u32),
}

impl ExitStatus {
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl FinisherStyle {
    pub const fn encode(self, code: i32) -> u32 {
        match self {
            Self::Htif => ((code as u32) << 1) | 1,
            Self::Simple => {
                if code == 0 {
                    SIMPLE_PASS
                } else {
                    SIMPLE_FAIL | (code as u32 & 0xFFFF)
                }
            }
        }
    }

    /// Interpret a raw register write, or `None` if it is not an exit
    /// request in this encoding.
    pub const fn decode(self, value: u32) -> Option<ExitStatus> {
        match self {
            Self::Htif => {
                if value & 1 == 0 {
                    // Even values are HTIF syscall pointers, not exits.
                    return None;
                }
                match value >> 1 {
                    0 => Some(ExitStatus::Pass),
                    code => Some(ExitStatus::Fail(code)),
                }
            }
            Self::Simple => {
                if value == SIMPLE_PASS {
                    Some(ExitStatus::Pass)
                } else if value & !0xFFFF == 0 && value & SIMPLE_FAIL == SIMPLE_FAIL {
                    Some(ExitStatus::Fail(value & 0xFFFF))
                } else {
                    None
                }
            }
        }
    }
}

/// Handle to the finisher register.
#[derive(Debug, Clone, Copy)]
pub struct Finisher<B> {
    bus: B,
    base: usize,
    style: FinisherStyle,
}

impl<B: Mmio> Finisher<B> {
    pub const fn new(bus: B, base: usize, style: FinisherStyle) -> Self {
        Self { bus, base, style }
    }

    pub const fn style(&self) -> FinisherStyle {
        self.style
    }

    /// Write the encoded exit code; returns the value written.
    pub fn signal(&self, code: i32) -> u32 {
        let value = self.style.encode(code);
        self.bus.write_u32(self.base, value);
        value
    }
}
