use crate::SimResult;
use metalcall_sys::{ExitStatus, FinisherStyle};
use std::any::Any;

/// Finisher register as a simulator host sees it.
///
/// Every write is recorded. The first write that decodes as an exit in the
/// configured style latches the run's [`ExitStatus`].
#[derive(Debug)]
pub struct FinisherDevice {
    style: FinisherStyle,
    writes: Vec<u32>,
    status: Option<ExitStatus>,
}

impl FinisherDevice {
    pub fn new(style: FinisherStyle) -> Self {
        Self {
            style,
            writes: Vec::new(),
            status: None,
        }
    }

    pub fn style(&self) -> FinisherStyle {
        self.style
    }

    pub fn writes(&self) -> &[u32] {
        &self.writes
    }

    pub fn status(&self) -> Option<ExitStatus> {
        self.status
    }
}

impl crate::Peripheral for FinisherDevice {
    fn read(&mut self, _offset: u64) -> SimResult<u32> {
        Ok(0)
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        if offset != 0 {
            return Ok(());
        }
        self.writes.push(value);
        match self.style.decode(value) {
            Some(status) if self.status.is_none() => {
                tracing::info!("Finisher: {:?} (raw {:#x})", status, value);
                self.status = Some(status);
            }
            Some(_) => {
                tracing::warn!("Finisher written again after exit: {:#x}", value);
            }
            None => {
                tracing::warn!("Finisher write {:#x} is not a {:?} exit", value, self.style);
            }
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
