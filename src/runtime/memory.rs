//! Linear memory
//!
//! A single zero-initialised byte array sized in 64 KiB pages. Every access is
//! bounds-checked; `i32` values are stored little-endian.

use super::RuntimeError;
use crate::ast::PAGE_SIZE;
use byteorder::{ByteOrder, LittleEndian};

/// Maximum number of pages (4 GiB).
pub const MAX_PAGES: u32 = 65536;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new(pages: u32) -> Result<Self, RuntimeError> {
        if pages > MAX_PAGES {
            return Err(RuntimeError::MemoryTooLarge(pages));
        }
        Ok(Memory {
            data: vec![0u8; pages as usize * PAGE_SIZE],
        })
    }

    /// A memory of zero bytes, used when the module declares none. Every
    /// access to it is out of bounds.
    pub fn empty() -> Self {
        Memory::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pages(&self) -> u32 {
        (self.data.len() / PAGE_SIZE) as u32
    }

    /// Check that `size` bytes at `addr` lie inside memory and return the
    /// start offset.
    fn check_bounds(&self, addr: i64, size: usize) -> Result<usize, RuntimeError> {
        if addr < 0 || addr as u64 + size as u64 > self.data.len() as u64 {
            return Err(RuntimeError::OutOfBounds {
                address: addr,
                size,
                len: self.data.len(),
            });
        }
        Ok(addr as usize)
    }

    pub fn read_i32(&self, addr: i64) -> Result<i32, RuntimeError> {
        let start = self.check_bounds(addr, 4)?;
        Ok(LittleEndian::read_i32(&self.data[start..start + 4]))
    }

    pub fn write_i32(&mut self, addr: i64, value: i32) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 4)?;
        LittleEndian::write_i32(&mut self.data[start..start + 4], value);
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}
