use crate::memory::LinearMemory;
use crate::peripherals::finisher::FinisherDevice;
use crate::peripherals::uart::SifiveUart;
use crate::{Peripheral, SimResult, SimulationError};
use metalcall_config::{BoardDescriptor, FinisherKind, FINISHER_WINDOW, UART_WINDOW};
use metalcall_sys::FinisherStyle;
use std::any::Any;

#[derive(Debug)]
pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub dev: Box<dyn Peripheral>,
}

impl PeripheralEntry {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }
}

pub struct SystemBus {
    pub ram: LinearMemory,
    pub peripherals: Vec<PeripheralEntry>,
}

fn uart_from_config(board: &BoardDescriptor) -> SifiveUart {
    let uart = SifiveUart::new(
        board.uart.tx_fifo_depth,
        board.uart.rx_fifo_depth,
        board.uart.tx_busy_polls,
    );
    match board.uart.tx_stall_limit {
        Some(polls) => uart.with_stall_limit(polls),
        None => uart,
    }
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    /// The stock memory map; see [`BoardDescriptor::default`].
    pub fn new() -> Self {
        let board = BoardDescriptor::default();
        Self::from_config(&board).expect("the stock board descriptor is valid")
    }

    pub fn from_config(board: &BoardDescriptor) -> anyhow::Result<Self> {
        let ram_size = board.ram_size()?;
        let mut peripherals = vec![PeripheralEntry {
            name: "uart".to_string(),
            base: board.uart.base,
            size: UART_WINDOW,
            dev: Box::new(uart_from_config(board)),
        }];

        if let Some(fin) = &board.finisher {
            let style = match fin.style {
                FinisherKind::Htif => FinisherStyle::Htif,
                FinisherKind::Simple => FinisherStyle::Simple,
            };
            peripherals.push(PeripheralEntry {
                name: "finisher".to_string(),
                base: fin.base,
                size: FINISHER_WINDOW,
                dev: Box::new(FinisherDevice::new(style)),
            });
        }

        tracing::debug!(
            "Bus for '{}': {} peripherals, {} bytes of RAM at {:#x}",
            board.name,
            peripherals.len(),
            ram_size,
            board.ram.base
        );

        Ok(Self {
            ram: LinearMemory::new(ram_size as usize, board.ram.base),
            peripherals,
        })
    }

    pub fn entry(&self, name: &str) -> Option<&PeripheralEntry> {
        self.peripherals.iter().find(|p| p.name == name)
    }

    pub fn peripheral<T: Any>(&self, name: &str) -> Option<&T> {
        self.entry(name)?.dev.as_any()?.downcast_ref::<T>()
    }

    pub fn peripheral_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        self.peripherals
            .iter_mut()
            .find(|p| p.name == name)?
            .dev
            .as_any_mut()?
            .downcast_mut::<T>()
    }

    fn owner(&mut self, addr: u64) -> Option<&mut PeripheralEntry> {
        self.peripherals.iter_mut().find(|p| p.contains(addr))
    }
}

impl crate::Bus for SystemBus {
    fn read_u32(&mut self, addr: u64) -> SimResult<u32> {
        if addr % 4 != 0 {
            return Err(SimulationError::Misaligned(addr));
        }
        if let Some(entry) = self.owner(addr) {
            let offset = addr - entry.base;
            let value = entry.dev.read(offset)?;
            tracing::trace!("{} read  +{:#04x} -> {:#010x}", entry.name, offset, value);
            return Ok(value);
        }
        if let Some(value) = self.ram.read_u32(addr) {
            return Ok(value);
        }
        tracing::warn!("Read from unmapped address {:#x}", addr);
        Err(SimulationError::MemoryViolation(addr))
    }

    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        if addr % 4 != 0 {
            return Err(SimulationError::Misaligned(addr));
        }
        if let Some(entry) = self.owner(addr) {
            let offset = addr - entry.base;
            tracing::debug!("{} write +{:#04x} <- {:#010x}", entry.name, offset, value);
            return entry.dev.write(offset, value);
        }
        if self.ram.write_u32(addr, value) {
            return Ok(());
        }
        tracing::warn!("Write to unmapped address {:#x}", addr);
        Err(SimulationError::MemoryViolation(addr))
    }
}
