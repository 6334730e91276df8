// MetalCall - Bare-Metal Syscall Layer
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host-side stand-in for the machine under the syscall layer.
//!
//! A [`Testbench`] owns a [`bus::SystemBus`] with a SiFive UART model, an
//! optional finisher and a RAM window. It implements the driver's `Mmio` and
//! `Park` traits, so `metalcall_sys::System` runs against it unchanged.

pub mod bus;
pub mod memory;
pub mod metrics;
pub mod peripherals;
pub mod snapshot;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use metalcall_config::{BoardDescriptor, TestScript};
use metalcall_sys::{
    BumpHeap, ExitStatus, FakeHost, FinisherConfig, HostMode, Mmio, Park, Platform, ReadMode,
    System,
};

use peripherals::finisher::FinisherDevice;
use peripherals::uart::SifiveUart;
use snapshot::RunReport;


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Misaligned 32-bit access at {0:#x}")]
    Misaligned(u64),
    #[error("UART transmitter stalled: TXDATA reported full for {0} consecutive polls")]
    TxStalled(u64),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Panic payload used to unwind out of a parked core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halted;

/// Trait for observing bus traffic in a modular way.
pub trait BusObserver: std::fmt::Debug + Send + Sync {
    fn on_read(&self, _addr: u64, _value: u32) {}
    fn on_write(&self, _addr: u64, _value: u32) {}
    fn on_park(&self) {}
}

/// Trait representing a memory-mapped peripheral with 32-bit registers.
///
/// Reads take `&mut self` because reading can have side effects (popping
/// the receive FIFO, shifting out a transmitted byte).
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&mut self, offset: u64) -> SimResult<u32>;
    fn write(&mut self, offset: u64, value: u32) -> SimResult<()>;
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

/// Trait representing the system bus
pub trait Bus {
    fn read_u32(&mut self, addr: u64) -> SimResult<u32>;
    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()>;
}

pub struct Testbench {
    pub bus: RefCell<bus::SystemBus>,
    pub observers: Vec<Arc<dyn BusObserver>>,
    name: String,
    heap_start: u64,
    read_mode: ReadMode,
    parked: Cell<bool>,
}

impl Default for Testbench {
    fn default() -> Self {
        Self::new()
    }
}

impl Testbench {
    /// The stock board: UART at `0x1001_3000`, HTIF finisher at
    /// `0x0010_0000`, RAM at `0x8000_0000`.
    pub fn new() -> Self {
        let board = BoardDescriptor::default();
        Self::with_bus(
            bus::SystemBus::new(),
            board.name.clone(),
            board.heap_start(),
        )
    }

    pub fn with_bus(bus: bus::SystemBus, name: String, heap_start: u64) -> Self {
        Self {
            bus: RefCell::new(bus),
            observers: Vec::new(),
            name,
            heap_start,
            read_mode: ReadMode::NonBlocking,
            parked: Cell::new(false),
        }
    }

    pub fn from_board(board: &BoardDescriptor) -> anyhow::Result<Self> {
        board.validate()?;
        let bus = bus::SystemBus::from_config(board)?;
        tracing::info!("Testbench for board '{}'", board.name);
        Ok(Self::with_bus(bus, board.name.clone(), board.heap_start()))
    }

    pub fn with_observer(mut self, observer: Arc<dyn BusObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_read_mode(mut self, mode: ReadMode) -> Self {
        self.read_mode = mode;
        self
    }

    /// The platform description the driver would have been built with for
    /// this board.
    pub fn platform(&self) -> Platform {
        let bus = self.bus.borrow();
        let uart_base = bus
            .entry("uart")
            .map(|e| e.base as usize)
            .unwrap_or_default();
        let finisher = bus.entry("finisher").and_then(|entry| {
            let device = entry.dev.as_any()?.downcast_ref::<FinisherDevice>()?;
            Some(FinisherConfig {
                base: entry.base as usize,
                style: device.style(),
            })
        });
        Platform {
            uart_base,
            finisher,
            host: HostMode::Hardware,
            read_mode: self.read_mode,
        }
    }

    /// A fresh syscall layer wired to this testbench, with its heap at the
    /// board's heap start.
    pub fn system(&self) -> System<&Self, &Self> {
        System::from_platform(
            self,
            &self.platform(),
            self,
            BumpHeap::new(self.heap_start as usize as *mut u8),
        )
    }

    pub fn fake_host(&self) -> FakeHost<&Self> {
        FakeHost::new(self)
    }

    pub fn heap_start(&self) -> u64 {
        self.heap_start
    }

    /// Queue bytes in the UART receive FIFO; returns how many fit.
    pub fn push_stdin(&self, bytes: &[u8]) -> usize {
        self.with_uart(|uart| uart.receive(bytes))
    }

    pub fn uart_output(&self) -> Vec<u8> {
        self.with_uart(|uart| uart.output())
    }

    pub fn finisher_writes(&self) -> Vec<u32> {
        let bus = self.bus.borrow();
        bus.peripheral::<FinisherDevice>("finisher")
            .map(|f| f.writes().to_vec())
            .unwrap_or_default()
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        let bus = self.bus.borrow();
        bus.peripheral::<FinisherDevice>("finisher")
            .and_then(|f| f.status())
    }

    pub fn is_parked(&self) -> bool {
        self.parked.get()
    }

    fn with_uart<R>(&self, f: impl FnOnce(&mut SifiveUart) -> R) -> R {
        let mut bus = self.bus.borrow_mut();
        let uart = bus
            .peripheral_mut::<SifiveUart>("uart")
            .expect("every testbench bus carries a 'uart' peripheral");
        f(uart)
    }

    /// Run `program` against a fresh [`System`] until it returns or parks.
    ///
    /// A bus fault inside the program ends the run with that error; any
    /// other panic is propagated.
    pub fn run<F>(&self, program: F) -> SimResult<RunReport>
    where
        F: FnOnce(&System<&Self, &Self>),
    {
        let sys = self.system();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| program(&sys)));
        match outcome {
            Ok(()) => {}
            Err(payload) => {
                if payload.downcast_ref::<Halted>().is_none() {
                    match payload.downcast::<SimulationError>() {
                        Ok(err) => return Err(*err),
                        Err(other) => panic::resume_unwind(other),
                    }
                }
            }
        }
        Ok(self.report())
    }

    /// Run `program` for a scripted scenario and return the report. The
    /// board path in the script is resolved against `base_dir`.
    pub fn run_script<F>(script: &TestScript, base_dir: &Path, program: F) -> anyhow::Result<RunReport>
    where
        F: FnOnce(&System<&Testbench, &Testbench>),
    {
        script.validate()?;
        let board = match &script.inputs.board {
            Some(path) => BoardDescriptor::from_file(base_dir.join(path))?,
            None => BoardDescriptor::default(),
        };
        let bench = Self::from_board(&board)?;
        let accepted = bench.push_stdin(script.inputs.stdin.as_bytes());
        if accepted < script.inputs.stdin.len() {
            tracing::warn!(
                "stdin truncated to {} of {} bytes by the RX FIFO",
                accepted,
                script.inputs.stdin.len()
            );
        }
        Ok(bench.run(program)?)
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            board: self.name.clone(),
            uart_output: String::from_utf8_lossy(&self.uart_output()).into_owned(),
            tx_overruns: self.with_uart(|uart| uart.overruns()),
            finisher_writes: self.finisher_writes(),
            exit: self.exit_status().map(Into::into),
            parked: self.is_parked(),
        }
    }

    fn fault(&self, err: SimulationError) -> ! {
        tracing::error!("Bus fault: {}", err);
        panic::panic_any(err)
    }
}

impl Mmio for Testbench {
    fn read_u32(&self, addr: usize) -> u32 {
        let result = self.bus.borrow_mut().read_u32(addr as u64);
        let value = match result {
            Ok(value) => value,
            Err(err) => self.fault(err),
        };
        for observer in &self.observers {
            observer.on_read(addr as u64, value);
        }
        value
    }

    fn write_u32(&self, addr: usize, value: u32) {
        let result = self.bus.borrow_mut().write_u32(addr as u64, value);
        if let Err(err) = result {
            self.fault(err);
        }
        for observer in &self.observers {
            observer.on_write(addr as u64, value);
        }
    }
}

impl Park for Testbench {
    fn park(&self) -> ! {
        self.parked.set(true);
        tracing::info!("Core parked");
        for observer in &self.observers {
            observer.on_park();
        }
        panic::panic_any(Halted)
    }
}
