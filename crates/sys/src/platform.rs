//! Build-time platform selection.
//!
//! Addresses are generated by `build.rs`; the finisher encoding and host
//! mode come from Cargo features. [`PLATFORM`] is a `const`, so every
//! branch on it folds away in target builds.

use crate::finisher::{Finisher, FinisherStyle};
use crate::mmio::Mmio;
use crate::uart::{ReadMode, Uart};

include!(concat!(env!("OUT_DIR"), "/platform.rs"));

#[cfg(all(feature = "finisher-htif", feature = "finisher-simple"))]
compile_error!("Features `finisher-htif` and `finisher-simple` are mutually exclusive");

#[cfg(all(feature = "finisher-htif", feature = "no-finisher"))]
compile_error!("Features `finisher-htif` and `no-finisher` are mutually exclusive");

#[cfg(all(feature = "finisher-simple", feature = "no-finisher"))]
compile_error!("Features `finisher-simple` and `no-finisher` are mutually exclusive");

/// Where the exported syscalls send their work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// UART and finisher registers.
    Hardware,
    /// No MMIO at all; see [`crate::FakeHost`].
    Fake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinisherConfig {
    pub base: usize,
    pub style: FinisherStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub uart_base: usize,
    pub finisher: Option<FinisherConfig>,
    pub host: HostMode,
    pub read_mode: ReadMode,
}

impl Platform {
    pub const fn uart<B: Mmio>(&self, bus: B) -> Uart<B> {
        Uart::new(bus, self.uart_base)
    }

    pub fn finisher<B: Mmio>(&self, bus: B) -> Option<Finisher<B>> {
        self.finisher
            .map(|cfg| Finisher::new(bus, cfg.base, cfg.style))
    }
}

const FINISHER_STYLE: Option<FinisherStyle> = if cfg!(feature = "no-finisher") {
    None
} else if cfg!(feature = "finisher-simple") {
    Some(FinisherStyle::Simple)
} else {
    Some(FinisherStyle::Htif)
};

/// The platform this crate was built for.
pub const PLATFORM: Platform = Platform {
    uart_base: UART_BASE,
    finisher: match FINISHER_STYLE {
        Some(style) => Some(FinisherConfig {
            base: FINISHER_BASE,
            style,
        }),
        None => None,
    },
    host: if cfg!(feature = "fake-host") {
        HostMode::Fake
    } else {
        HostMode::Hardware
    },
    read_mode: if cfg!(feature = "blocking-read") {
        ReadMode::Blocking
    } else {
        ReadMode::NonBlocking
    },
};
