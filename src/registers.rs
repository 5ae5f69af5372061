/*!
  The register file: sixteen word-sized slots addressed by a one byte index.

  Indices 0 through 4 are the general-purpose registers, and are the only registers an
  activation record saves. The rest have fixed roles:

    5  flag  (alias cmp)  comparison tri-state, carry/borrow out, remainder, fault auxiliary
    6  err                active fault code, zero when no fault is pending
    7  ccr                condition-code bits (carry, overflow, zero, negative)
    8  ip                 address of the next opcode
    9  sp                 stack pointer, grows downward from the end of memory
   10  ssize              maximum stack size in bytes
   11  fp                 frame pointer
   12..15  t0..t3         scratch registers, not preserved across `call`

  Nothing guards the special registers: an instruction naming `ip` or `sp` writes it like any
  other register.
*/

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

use crate::fault::Fault;
use crate::numeric::{merge_low, truncate, UWord, Width, Word};

pub const REGISTER_COUNT: usize = 16;
/// Number of general-purpose registers saved by an activation record.
pub const REG_RESV: usize = 5;

#[derive(
  StrumDisplay, EnumString, IntoStaticStr, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,       Eq,            PartialEq, Debug,           Hash
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(u8)]
pub enum Register {
  R0 = 0,
  R1,
  R2,
  R3,
  R4,
  #[strum(to_string = "flag", serialize = "cmp")]
  Flag,
  Err,
  Ccr,
  Ip,
  Sp,
  Ssize,
  Fp,
  T0,
  T1,
  T2,
  T3,
}

impl Register {
  pub fn index(&self) -> usize {
    Into::<u8>::into(*self) as usize
  }

  /// Resolves a register operand, faulting on indices outside the register file.
  pub fn from_index(index: UWord) -> Result<Register, Fault> {
    u8::try_from(index)
      .ok()
      .and_then(|byte| Register::try_from(byte).ok())
      .ok_or(Fault::InvalidRegister(index))
  }

  /// The general-purpose registers, in the order `call` saves them.
  pub fn general_purpose() -> [Register; REG_RESV] {
    [Register::R0, Register::R1, Register::R2, Register::R3, Register::R4]
  }
}

/// Bits of the condition-code register.
pub mod ccr {
  use crate::numeric::UWord;

  pub const CARRY    : UWord = 1;
  pub const OVERFLOW : UWord = 2;
  pub const ZERO     : UWord = 4;
  pub const NEGATIVE : UWord = 8;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisterFile {
  slots      : [UWord; REGISTER_COUNT],
  /// Set whenever `ip` is written; the engine uses it to tell a jump-by-write from fallthrough.
  ip_written : bool
}

impl RegisterFile {

  pub fn new() -> RegisterFile {
    RegisterFile {
      slots      : [0; REGISTER_COUNT],
      ip_written : false
    }
  }

  // region Index-based access

  pub fn read(&self, index: UWord) -> Result<UWord, Fault> {
    Register::from_index(index).map(|register| self.get(register))
  }

  pub fn write(&mut self, index: UWord, value: UWord) -> Result<(), Fault> {
    let register = Register::from_index(index)?;
    self.set(register, value);
    Ok(())
  }

  // endregion

  // region Typed access

  pub fn get(&self, register: Register) -> UWord {
    self.slots[register.index()]
  }

  pub fn get_signed(&self, register: Register) -> Word {
    self.get(register) as Word
  }

  /// The low `width` bytes of `register`, zero-extended.
  pub fn get_low(&self, register: Register, width: Width) -> UWord {
    truncate(self.get(register), width)
  }

  pub fn set(&mut self, register: Register, value: UWord) {
    if register == Register::Ip {
      self.ip_written = true;
    }
    self.slots[register.index()] = value;
  }

  pub fn set_signed(&mut self, register: Register, value: Word) {
    self.set(register, value as UWord);
  }

  /// Replaces only the low `width` bytes of `register`.
  pub fn set_low(&mut self, register: Register, width: Width, value: UWord) {
    let merged = merge_low(self.get(register), value, width);
    self.set(register, merged);
  }

  // endregion

  /// Reports and clears whether `ip` has been written since the last call.
  pub fn take_ip_written(&mut self) -> bool {
    std::mem::replace(&mut self.ip_written, false)
  }

  pub fn general_purpose(&self) -> [UWord; REG_RESV] {
    let mut values = [0; REG_RESV];
    for (slot, register) in values.iter_mut().zip(Register::general_purpose().iter()) {
      *slot = self.get(*register);
    }
    values
  }
}

impl Default for RegisterFile {
  fn default() -> Self {
    RegisterFile::new()
  }
}

impl Display for RegisterFile {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let text = self.slots
      .iter()
      .enumerate()
      .filter_map(|(i, value)| {
        Register::from_index(i as UWord)
          .ok()
          .map(|register| format!("{}={:#x}", register, value))
      })
      .collect::<Vec<String>>()
      .join(" ");
    write!(f, "{}", text)
  }
}
