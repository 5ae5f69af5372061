//! The flat, fixed-capacity byte store that code, data, and the stack share.

use crate::fault::Fault;
use crate::numeric::{from_le_bytes, to_le_bytes, UWord, Width};

/**
  A `MemoryImage` is a contiguous buffer whose length never changes after construction.
  Addresses are unsigned byte offsets. Every access is bounds-checked as a whole before any
  byte is touched, so a failed write never leaves memory partially modified.
*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryImage {
  bytes: Vec<u8>
}

impl MemoryImage {

  pub fn new(capacity: usize) -> MemoryImage {
    MemoryImage {
      bytes: vec![0; capacity]
    }
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// The capacity as an address, i.e. one past the last valid byte.
  pub fn end(&self) -> UWord {
    self.bytes.len() as UWord
  }

  /// Converts `[address, address + length)` into a slice range, or faults with the base address.
  fn range(&self, address: UWord, length: usize) -> Result<std::ops::Range<usize>, Fault> {
    let start = address as usize;
    match address
      .checked_add(length as UWord)
      .filter(|end| *end <= self.end())
    {
      Some(end) => Ok(start..end as usize),
      None      => Err(Fault::MemoryOutOfBounds(address))
    }
  }

  /// Fails unless the whole range lies inside memory.
  pub fn check(&self, address: UWord, length: usize) -> Result<(), Fault> {
    self.range(address, length).map(|_| ())
  }

  pub fn read(&self, address: UWord, length: usize) -> Result<&[u8], Fault> {
    let range = self.range(address, length)?;
    Ok(&self.bytes[range])
  }

  pub fn write(&mut self, address: UWord, data: &[u8]) -> Result<(), Fault> {
    let range = self.range(address, data.len())?;
    self.bytes[range].copy_from_slice(data);
    Ok(())
  }

  /// Reads `width` bytes as a little-endian unsigned value.
  pub fn read_uint(&self, address: UWord, width: Width) -> Result<UWord, Fault> {
    self.read(address, width.bytes()).map(from_le_bytes)
  }

  /// Writes the low `width` bytes of `value` in little-endian order.
  pub fn write_uint(&mut self, address: UWord, width: Width, value: UWord) -> Result<(), Fault> {
    self.write(address, &to_le_bytes(value, width))
  }

  /// Copies `length` bytes between two (possibly overlapping) ranges.
  pub fn copy_within(&mut self, from: UWord, to: UWord, length: usize) -> Result<(), Fault> {
    let source = self.range(from, length)?;
    let target = self.range(to, length)?;
    self.bytes.copy_within(source, target.start);
    Ok(())
  }

  /// Bytes from `address` up to (not including) the first zero byte.
  pub fn read_terminated(&self, address: UWord) -> Result<&[u8], Fault> {
    let start = self.range(address, 0)?.start;
    match self.bytes[start..].iter().position(|b| *b == 0) {
      Some(length) => Ok(&self.bytes[start..start + length]),
      None         => Err(Fault::MemoryOutOfBounds(address))
    }
  }

  /// Loads `data` at offset zero.
  pub fn load(&mut self, data: &[u8]) -> Result<(), Fault> {
    self.write(0, data)
  }

  pub fn as_slice(&self) -> &[u8] {
    &self.bytes
  }
}
