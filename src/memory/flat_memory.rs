/// size of the address space: 1 MiB, the 20-bit real mode limit
pub const MEMORY_SIZE: usize = 0x10_0000;

/// flat byte-addressable memory. accesses outside the address space
/// are absorbed here: reads yield 0xFF, writes are dropped.
#[derive(Clone)]
pub struct FlatMemory {
    pub memory: Vec<u8>,
}

impl Default for FlatMemory {
    fn default() -> Self {
        FlatMemory {
            memory: vec![0u8; MEMORY_SIZE],
        }
    }
}

impl FlatMemory {
    pub fn new() -> Self {
        FlatMemory::default()
    }

    pub fn read_u8(&self, addr: u32) -> u8 {
        match self.memory.get(addr as usize) {
            Some(v) => *v,
            None => 0xFF,
        }
    }

    pub fn write_u8(&mut self, addr: u32, data: u8) {
        if let Some(v) = self.memory.get_mut(addr as usize) {
            *v = data;
        }
    }

    /// little-endian; each byte clamps independently, so the high
    /// byte of a word read at the top of memory comes back 0xFF
    pub fn read_u16(&self, addr: u32) -> u16 {
        u16::from(self.read_u8(addr + 1)) << 8 | u16::from(self.read_u8(addr))
    }

    pub fn write_u16(&mut self, addr: u32, data: u16) {
        self.write_u8(addr, data as u8);
        self.write_u8(addr + 1, (data >> 8) as u8);
    }

    pub fn write(&mut self, addr: u32, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.write_u8(addr + i as u32, *b);
        }
    }
}
