/*!
  The stack discipline. There is no stack object: the stack is the top `ssize` bytes of
  memory, `sp` points at the most recently pushed byte, and it grows toward lower
  addresses. `StackManager` is a short-lived view over the register file and memory that
  enforces the bounds.

  The legal range of `sp` is `[end - ssize, end]`, where `end` is the memory size. Every
  operation validates the current `sp` against that range, then validates the adjusted
  `sp`, and only then moves any data. A push that would cross the floor raises
  `StackOverflow` carrying the would-be `sp`; a pop past `end` raises `StackUnderflow`.

  An activation record, from higher to lower addresses:

  ```text
      r0 r1 r2 r3 r4 | return address | frame size   <- fp = sp after `call`
  ```

  where the frame size is the byte distance from the new `fp` back to the caller's `fp`.
  `ret` finds the record through `fp`, not `sp`, so a callee may leave locals behind.
*/

use crate::fault::Fault;
use crate::memory::MemoryImage;
use crate::numeric::{from_le_bytes, UWord, Width, WORD_BYTES};
use crate::registers::{Register, RegisterFile, REG_RESV};

/// Bytes occupied by one activation record.
pub const FRAME_RECORD_BYTES: UWord = ((REG_RESV + 2) * WORD_BYTES) as UWord;

pub struct StackManager<'a> {
  registers : &'a mut RegisterFile,
  memory    : &'a mut MemoryImage
}

impl<'a> StackManager<'a> {

  pub fn new(registers: &'a mut RegisterFile, memory: &'a mut MemoryImage) -> StackManager<'a> {
    StackManager{ registers, memory }
  }

  // region Bounds

  /// Highest legal `sp`, the end of memory.
  pub fn ceiling(&self) -> UWord {
    self.memory.end()
  }

  /// Lowest legal `sp`.
  pub fn floor(&self) -> UWord {
    self.ceiling().saturating_sub(self.registers.get(Register::Ssize))
  }

  /// The current `sp`, provided it lies inside the stack region.
  fn current(&self) -> Result<UWord, Fault> {
    let sp = self.registers.get(Register::Sp);
    if sp > self.ceiling() {
      return Err(Fault::StackUnderflow);
    }
    if sp < self.floor() {
      return Err(Fault::StackOverflow(sp));
    }
    Ok(sp)
  }

  /// The `sp` a push of `length` bytes would produce, without moving it.
  fn after_push(&self, length: UWord) -> Result<UWord, Fault> {
    let sp = self.current()?;
    match sp.checked_sub(length).filter(|new_sp| *new_sp >= self.floor()) {
      Some(new_sp) => Ok(new_sp),
      None         => Err(Fault::StackOverflow(sp.wrapping_sub(length)))
    }
  }

  /// The `sp` a pop of `length` bytes would produce, without moving it.
  fn after_pop(&self, length: UWord) -> Result<UWord, Fault> {
    let sp = self.current()?;
    match sp.checked_add(length).filter(|new_sp| *new_sp <= self.ceiling()) {
      Some(new_sp) => Ok(new_sp),
      None         => Err(Fault::StackUnderflow)
    }
  }

  // endregion

  // region Push and pop

  pub fn push_bytes(&mut self, data: &[u8]) -> Result<(), Fault> {
    let sp = self.after_push(data.len() as UWord)?;
    self.memory.write(sp, data)?;
    self.registers.set(Register::Sp, sp);
    Ok(())
  }

  pub fn push_uint(&mut self, width: Width, value: UWord) -> Result<(), Fault> {
    self.push_bytes(&value.to_le_bytes()[..width.bytes()])
  }

  pub fn push_word(&mut self, value: UWord) -> Result<(), Fault> {
    self.push_uint(Width::W64, value)
  }

  /// Copies the top `length` bytes of the stack without popping them.
  pub fn peek_bytes(&self, length: usize) -> Result<Vec<u8>, Fault> {
    let sp = self.current()?;
    self.after_pop(length as UWord)?;
    Ok(self.memory.read(sp, length)?.to_vec())
  }

  pub fn pop_bytes(&mut self, length: usize) -> Result<Vec<u8>, Fault> {
    let data = self.peek_bytes(length)?;
    self.release(length as UWord)?;
    Ok(data)
  }

  pub fn pop_uint(&mut self, width: Width) -> Result<UWord, Fault> {
    self.pop_bytes(width.bytes()).map(|bytes| from_le_bytes(&bytes))
  }

  pub fn pop_word(&mut self) -> Result<UWord, Fault> {
    self.pop_uint(Width::W64)
  }

  /// Moves `sp` down by `length` bytes without writing them.
  pub fn reserve(&mut self, length: UWord) -> Result<(), Fault> {
    let sp = self.after_push(length)?;
    self.registers.set(Register::Sp, sp);
    Ok(())
  }

  /// Moves `sp` up by `length` bytes, discarding them.
  pub fn release(&mut self, length: UWord) -> Result<(), Fault> {
    let sp = self.after_pop(length)?;
    self.registers.set(Register::Sp, sp);
    Ok(())
  }

  // endregion

  // region Activation records

  /**
    Pushes an activation record and makes it the current frame. Headroom for the whole
    record is checked first, so a `call` that overflows changes nothing.
  */
  pub fn call(&mut self, return_address: UWord) -> Result<(), Fault> {
    let new_fp = self.after_push(FRAME_RECORD_BYTES)?;
    let frame_size = self.registers.get(Register::Fp).wrapping_sub(new_fp);

    for value in self.registers.general_purpose().iter() {
      self.push_word(*value)?;
    }
    self.push_word(return_address)?;
    self.push_word(frame_size)?;

    self.registers.set(Register::Fp, new_fp);
    Ok(())
  }

  /**
    Pops the activation record at `fp`, restoring the caller's registers and frame, and
    returns the saved return address. Anything the callee left above `sp` is discarded. An
    `fp` with no room for a whole record inside the stack region raises `StackUnderflow`.
  */
  pub fn ret(&mut self) -> Result<UWord, Fault> {
    self.current()?;
    let fp      = self.registers.get(Register::Fp);
    let in_span = fp >= self.floor()
      && fp.checked_add(FRAME_RECORD_BYTES).map_or(false, |top| top <= self.ceiling());
    if !in_span {
      return Err(Fault::StackUnderflow);
    }
    self.registers.set(Register::Sp, fp);

    let frame_size     = self.pop_word()?;
    let return_address = self.pop_word()?;
    for register in Register::general_purpose().iter().rev() {
      let value = self.pop_word()?;
      self.registers.set(*register, value);
    }

    let fp = self.registers.get(Register::Fp).wrapping_add(frame_size);
    self.registers.set(Register::Fp, fp);
    Ok(return_address)
  }

  // endregion
}
