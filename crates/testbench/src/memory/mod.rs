/// A simple flat memory storage
pub struct LinearMemory {
    pub data: Vec<u8>,
    pub base_addr: u64,
}

impl LinearMemory {
    pub fn new(size: usize, base_addr: u64) -> Self {
        Self {
            data: vec![0; size],
            base_addr,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn range(&self, addr: u64, width: usize) -> Option<std::ops::Range<usize>> {
        if addr < self.base_addr {
            return None;
        }
        let start = (addr - self.base_addr) as usize;
        let end = start.checked_add(width)?;
        (end <= self.data.len()).then_some(start..end)
    }

    pub fn read_u8(&self, addr: u64) -> Option<u8> {
        self.range(addr, 1).map(|r| self.data[r.start])
    }

    /// Little-endian word read.
    pub fn read_u32(&self, addr: u64) -> Option<u32> {
        let r = self.range(addr, 4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.data[r]);
        Some(u32::from_le_bytes(word))
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> bool {
        match self.range(addr, 4) {
            Some(r) => {
                self.data[r].copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }
}
