use crate::{SimResult, SimulationError};
use metalcall_sys::uart::{reg, RxCtrl, RxData, TxCtrl, TxData};
use std::any::Any;
use std::collections::VecDeque;

/// Consecutive "full" TXDATA polls after which the transmitter counts as
/// stuck.
pub const DEFAULT_STALL_LIMIT: u64 = 100_000;

const IP_TXWM: u32 = 1 << 0;
const IP_RXWM: u32 = 1 << 1;

fn watermark(ctrl: u32) -> usize {
    ((ctrl >> 16) & 0x7) as usize
}

/// SiFive UART model.
///
/// Each TXDATA poll shifts one queued byte out onto the line, provided
/// `txen` is set. `tx_busy_polls` adds that many extra "full" polls after
/// every accepted byte, to exercise the driver's wait loop.
#[derive(Debug)]
pub struct SifiveUart {
    txctrl: u32,
    rxctrl: u32,
    ie: u32,
    div: u32,
    tx_fifo: VecDeque<u8>,
    tx_depth: usize,
    rx_fifo: VecDeque<u8>,
    rx_depth: usize,
    line: Vec<u8>,
    busy_polls: u32,
    busy_left: u32,
    full_polls: u64,
    stall_limit: u64,
    overruns: u64,
}

impl SifiveUart {
    pub fn new(tx_depth: usize, rx_depth: usize, busy_polls: u32) -> Self {
        Self {
            txctrl: 0,
            rxctrl: 0,
            ie: 0,
            // Reset value of the divisor on SiFive parts.
            div: 0x0000_FFFF,
            tx_fifo: VecDeque::with_capacity(tx_depth),
            tx_depth,
            rx_fifo: VecDeque::with_capacity(rx_depth),
            rx_depth,
            line: Vec::new(),
            busy_polls,
            busy_left: 0,
            full_polls: 0,
            stall_limit: DEFAULT_STALL_LIMIT,
            overruns: 0,
        }
    }

    pub fn with_stall_limit(mut self, polls: u64) -> Self {
        self.stall_limit = polls;
        self
    }

    pub fn tx_enabled(&self) -> bool {
        TxCtrl::from_bits_retain(self.txctrl).contains(TxCtrl::TXEN)
    }

    pub fn rx_enabled(&self) -> bool {
        RxCtrl::from_bits_retain(self.rxctrl).contains(RxCtrl::RXEN)
    }

    pub fn interrupts_enabled(&self) -> u32 {
        self.ie
    }

    pub fn divisor(&self) -> u32 {
        self.div
    }

    /// Bytes on the line so far, followed by anything still queued.
    pub fn output(&self) -> Vec<u8> {
        let mut out = self.line.clone();
        out.extend(self.tx_fifo.iter().copied());
        out
    }

    /// TXDATA writes dropped because the FIFO was full.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Deliver bytes from the remote end; returns how many fit in the FIFO.
    pub fn receive(&mut self, bytes: &[u8]) -> usize {
        let room = self.rx_depth.saturating_sub(self.rx_fifo.len());
        let accepted = room.min(bytes.len());
        self.rx_fifo.extend(&bytes[..accepted]);
        accepted
    }

    pub fn rx_pending(&self) -> usize {
        self.rx_fifo.len()
    }

    fn shift_out(&mut self) {
        if self.tx_enabled() {
            if let Some(byte) = self.tx_fifo.pop_front() {
                self.line.push(byte);
            }
        }
    }

    fn tx_full(&mut self) -> bool {
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return true;
        }
        self.tx_fifo.len() >= self.tx_depth
    }

    fn read_txdata(&mut self) -> SimResult<u32> {
        self.shift_out();
        if self.tx_full() {
            self.full_polls += 1;
            if self.full_polls >= self.stall_limit {
                return Err(SimulationError::TxStalled(self.full_polls));
            }
            Ok(TxData::FULL.bits())
        } else {
            self.full_polls = 0;
            Ok(0)
        }
    }

    fn write_txdata(&mut self, value: u32) {
        if self.tx_fifo.len() >= self.tx_depth {
            self.overruns += 1;
            tracing::warn!("UART TX overrun, dropped {:#04x}", value as u8);
            return;
        }
        self.tx_fifo.push_back(value as u8);
        self.busy_left = self.busy_polls;
    }

    fn read_rxdata(&mut self) -> u32 {
        if !self.rx_enabled() {
            return RxData::EMPTY.bits();
        }
        match self.rx_fifo.pop_front() {
            Some(byte) => u32::from(byte),
            None => RxData::EMPTY.bits(),
        }
    }

    fn pending_interrupts(&self) -> u32 {
        let mut ip = 0;
        if self.tx_fifo.len() < watermark(self.txctrl) {
            ip |= IP_TXWM;
        }
        if self.rx_fifo.len() > watermark(self.rxctrl) {
            ip |= IP_RXWM;
        }
        ip
    }
}

impl crate::Peripheral for SifiveUart {
    fn read(&mut self, offset: u64) -> SimResult<u32> {
        match offset as usize {
            reg::TXDATA => self.read_txdata(),
            reg::RXDATA => Ok(self.read_rxdata()),
            reg::TXCTRL => Ok(self.txctrl),
            reg::RXCTRL => Ok(self.rxctrl),
            reg::IE => Ok(self.ie),
            reg::IP => Ok(self.pending_interrupts()),
            reg::DIV => Ok(self.div),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset as usize {
            reg::TXDATA => self.write_txdata(value),
            reg::TXCTRL => self.txctrl = value,
            reg::RXCTRL => self.rxctrl = value,
            reg::IE => self.ie = value & (IP_TXWM | IP_RXWM),
            reg::DIV => self.div = value & 0xFFFF,
            // RXDATA and IP are read-only.
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}
