/*!
  The fault taxonomy and the `ErrorSignal` that mirrors it into registers.

  A handler that finds a precondition violated returns a `Fault` before mutating anything.
  The engine then records the fault as an `ErrorSignal`, the (code, auxiliary) pair held in
  the `err` and `flag` registers, which is what programs and hosts observe. Both views are
  kept in step: `ErrorSignal::from(fault)` and `Fault::from_signal` are inverses.
*/

use thiserror::Error;

use crate::numeric::UWord;
use crate::registers::{Register, RegisterFile};

#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Fault {
  #[error("memory access out of bounds at address {0:#x}")]
  MemoryOutOfBounds(UWord),
  #[error("invalid register index {0}")]
  InvalidRegister(UWord),
  #[error("unknown instruction {0:#06x}")]
  UnknownInstruction(u16),
  #[error("stack underflow")]
  StackUnderflow,
  #[error("stack overflow at address {0:#x}")]
  StackOverflow(UWord),
  #[error("unknown syscall {0}")]
  UnknownSyscall(UWord),
  #[error("division by zero in instruction at {0:#x}")]
  DivisionByZero(UWord),
}

pub const CODE_NONE                 : UWord = 0;
pub const CODE_MEMORY_OUT_OF_BOUNDS : UWord = 1;
pub const CODE_INVALID_REGISTER     : UWord = 2;
pub const CODE_UNKNOWN_INSTRUCTION  : UWord = 3;
pub const CODE_STACK_UNDERFLOW      : UWord = 4;
pub const CODE_STACK_OVERFLOW       : UWord = 5;
pub const CODE_UNKNOWN_SYSCALL      : UWord = 6;
pub const CODE_DIVISION_BY_ZERO     : UWord = 7;

impl Fault {
  pub fn code(&self) -> UWord {
    match self {
      Fault::MemoryOutOfBounds(_)  => CODE_MEMORY_OUT_OF_BOUNDS,
      Fault::InvalidRegister(_)    => CODE_INVALID_REGISTER,
      Fault::UnknownInstruction(_) => CODE_UNKNOWN_INSTRUCTION,
      Fault::StackUnderflow        => CODE_STACK_UNDERFLOW,
      Fault::StackOverflow(_)      => CODE_STACK_OVERFLOW,
      Fault::UnknownSyscall(_)     => CODE_UNKNOWN_SYSCALL,
      Fault::DivisionByZero(_)     => CODE_DIVISION_BY_ZERO,
    }
  }

  pub fn aux(&self) -> UWord {
    match self {
      | Fault::MemoryOutOfBounds(value)
      | Fault::InvalidRegister(value)
      | Fault::StackOverflow(value)
      | Fault::UnknownSyscall(value)
      | Fault::DivisionByZero(value)  => *value,
      Fault::UnknownInstruction(opcode) => *opcode as UWord,
      Fault::StackUnderflow           => 0,
    }
  }

  /// Decodes a signal. Returns `None` for code zero and for codes outside the taxonomy.
  pub fn from_signal(code: UWord, aux: UWord) -> Option<Fault> {
    match code {
      CODE_MEMORY_OUT_OF_BOUNDS => Some(Fault::MemoryOutOfBounds(aux)),
      CODE_INVALID_REGISTER     => Some(Fault::InvalidRegister(aux)),
      CODE_UNKNOWN_INSTRUCTION  => Some(Fault::UnknownInstruction(aux as u16)),
      CODE_STACK_UNDERFLOW      => Some(Fault::StackUnderflow),
      CODE_STACK_OVERFLOW       => Some(Fault::StackOverflow(aux)),
      CODE_UNKNOWN_SYSCALL      => Some(Fault::UnknownSyscall(aux)),
      CODE_DIVISION_BY_ZERO     => Some(Fault::DivisionByZero(aux)),
      _                         => None
    }
  }
}

/// The out-of-band fault channel as programs see it: `err` holds the code, `flag` the auxiliary.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct ErrorSignal {
  pub code : UWord,
  pub aux  : UWord
}

impl ErrorSignal {
  pub const NONE: ErrorSignal = ErrorSignal{ code: CODE_NONE, aux: 0 };

  pub fn is_set(&self) -> bool {
    self.code != CODE_NONE
  }

  pub fn fault(&self) -> Option<Fault> {
    Fault::from_signal(self.code, self.aux)
  }

  /// Reads the signal currently mirrored in the register file.
  pub fn read(registers: &RegisterFile) -> ErrorSignal {
    ErrorSignal {
      code : registers.get(Register::Err),
      aux  : registers.get(Register::Flag)
    }
  }

  /// Mirrors the signal into `err` and `flag`.
  pub fn store(&self, registers: &mut RegisterFile) {
    registers.set(Register::Err, self.code);
    registers.set(Register::Flag, self.aux);
  }
}

impl From<Fault> for ErrorSignal {
  fn from(fault: Fault) -> Self {
    ErrorSignal {
      code : fault.code(),
      aux  : fault.aux()
    }
  }
}
