//! SiFive-style UART: polled transmit and receive.

use core::fmt;

use bitflags::bitflags;

use crate::errno::{Errno, SysResult};
use crate::mmio::Mmio;

/// Register offsets from the UART base.
pub mod reg {
    pub const TXDATA: usize = 0x00;
    pub const RXDATA: usize = 0x04;
    pub const TXCTRL: usize = 0x08;
    pub const RXCTRL: usize = 0x0C;
    pub const IE: usize = 0x10;
    pub const IP: usize = 0x14;
    pub const DIV: usize = 0x18;
}

bitflags! {
    /// TXDATA status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxData: u32 {
        const FULL = 1 << 31;
    }

    /// RXDATA status bits; the received byte sits in bits 7:0.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxData: u32 {
        const EMPTY = 1 << 31;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxCtrl: u32 {
        const TXEN = 1 << 0;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxCtrl: u32 {
        const RXEN = 1 << 0;
    }
}

/// How `_read` treats an empty receive FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Return as soon as the FIFO reports empty, possibly with 0 bytes.
    #[default]
    NonBlocking,
    /// Spin until every requested byte has arrived.
    Blocking,
}

/// Handle to one UART register window.
///
/// Holds no state of its own; every method goes straight to the registers.
#[derive(Debug, Clone, Copy)]
pub struct Uart<B> {
    bus: B,
    base: usize,
}

impl<B: Mmio> Uart<B> {
    pub const fn new(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    fn read(&self, offset: usize) -> u32 {
        self.bus.read_u32(self.base + offset)
    }

    #[inline]
    fn write(&self, offset: usize, value: u32) {
        self.bus.write_u32(self.base + offset, value)
    }

    /// Enable transmit and receive, with interrupts off.
    ///
    /// The baud divisor is left alone; see [`Uart::set_baud`].
    pub fn init(&self) {
        self.write(reg::TXCTRL, TxCtrl::TXEN.bits());
        self.write(reg::RXCTRL, RxCtrl::RXEN.bits());
        self.write(reg::IE, 0);
    }

    /// Program `DIV = clock_hz / baud - 1`.
    pub fn set_baud(&self, clock_hz: u32, baud: u32) -> SysResult<()> {
        if baud == 0 || baud > clock_hz {
            return Err(Errno::Invalid);
        }
        self.write(reg::DIV, clock_hz / baud - 1);
        Ok(())
    }

    pub fn tx_full(&self) -> bool {
        TxData::from_bits_retain(self.read(reg::TXDATA)).contains(TxData::FULL)
    }

    /// Wait for room in the transmit FIFO, then push one raw byte.
    pub fn put_raw(&self, byte: u8) {
        while self.tx_full() {
            core::hint::spin_loop();
        }
        self.write(reg::TXDATA, u32::from(byte));
    }

    /// Push one byte, sending `\r` ahead of every `\n`.
    pub fn put(&self, byte: u8) {
        if byte == b'\n' {
            self.put_raw(b'\r');
        }
        self.put_raw(byte);
    }

    /// Transmit the whole buffer; blocks for as long as the FIFO stays full.
    ///
    /// Returns `bytes.len()`: injected carriage returns are not counted.
    pub fn write_bytes(&self, bytes: &[u8]) -> usize {
        for &byte in bytes {
            self.put(byte);
        }
        bytes.len()
    }

    /// Pop one byte, or `None` if the receive FIFO is empty.
    pub fn try_get(&self) -> Option<u8> {
        let raw = self.read(reg::RXDATA);
        if RxData::from_bits_retain(raw).contains(RxData::EMPTY) {
            None
        } else {
            Some((raw & 0xFF) as u8)
        }
    }

    pub fn get_blocking(&self) -> u8 {
        loop {
            if let Some(byte) = self.try_get() {
                return byte;
            }
            core::hint::spin_loop();
        }
    }

    /// Fill `buf` from the receive FIFO.
    ///
    /// In [`ReadMode::NonBlocking`] the FIFO is polled once per slot and the
    /// first empty poll ends the read.
    pub fn read_into(&self, buf: &mut [u8], mode: ReadMode) -> usize {
        match mode {
            ReadMode::NonBlocking => {
                let mut n = 0;
                while n < buf.len() {
                    match self.try_get() {
                        Some(byte) => {
                            buf[n] = byte;
                            n += 1;
                        }
                        None => break,
                    }
                }
                n
            }
            ReadMode::Blocking => {
                for slot in buf.iter_mut() {
                    *slot = self.get_blocking();
                }
                buf.len()
            }
        }
    }
}

impl<B: Mmio> fmt::Write for Uart<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}
