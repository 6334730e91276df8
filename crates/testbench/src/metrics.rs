use crate::BusObserver;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessCount {
    pub reads: u64,
    pub writes: u64,
}

/// Counts register traffic per address.
#[derive(Debug, Default)]
pub struct AccessMetrics {
    per_addr: Mutex<BTreeMap<u64, AccessCount>>,
    parks: AtomicU64,
}

impl AccessMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.per_addr.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.parks.store(0, Ordering::SeqCst);
    }

    pub fn at(&self, addr: u64) -> AccessCount {
        self.per_addr
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&addr)
            .copied()
            .unwrap_or_default()
    }

    pub fn total(&self) -> AccessCount {
        self.per_addr
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .fold(AccessCount::default(), |acc, c| AccessCount {
                reads: acc.reads + c.reads,
                writes: acc.writes + c.writes,
            })
    }

    pub fn get_parks(&self) -> u64 {
        self.parks.load(Ordering::SeqCst)
    }
}

impl BusObserver for AccessMetrics {
    fn on_read(&self, addr: u64, _value: u32) {
        let mut map = self.per_addr.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(addr).or_default().reads += 1;
    }

    fn on_write(&self, addr: u64, _value: u32) {
        let mut map = self.per_addr.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(addr).or_default().writes += 1;
    }

    fn on_park(&self) {
        self.parks.fetch_add(1, Ordering::SeqCst);
    }
}
