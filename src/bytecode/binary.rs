/*!
  This module is responsible for the encoding and decoding of binary programs and
  instruction operands.

  A program image is an eight byte little-endian entry address followed by the body, which
  is loaded at memory offset zero. Instructions have no length table: an opcode's operand
  fields are discovered by decoding them one at a time with a `Cursor`.
*/

use crate::bytecode::Opcode;
use crate::errors::VmError;
use crate::fault::Fault;
use crate::memory::MemoryImage;
use crate::numeric::{to_le_bytes, UWord, Width, WORD_BYTES};
use crate::registers::Register;

// If you change this you must also change `Program::decode` and `Program::encode`.
pub const HEADER_BYTES: usize = WORD_BYTES;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Program {
  pub entry : UWord,
  pub body  : Vec<u8>
}

impl Program {
  pub fn new(entry: UWord, body: Vec<u8>) -> Program {
    Program{ entry, body }
  }

  pub fn decode(image: &[u8]) -> Result<Program, VmError> {
    if image.len() < HEADER_BYTES {
      return Err(VmError::MissingHeader(image.len()));
    }
    let (header, body) = image.split_at(HEADER_BYTES);
    let mut entry = [0u8; HEADER_BYTES];
    entry.copy_from_slice(header);
    Ok(Program {
      entry : UWord::from_le_bytes(entry),
      body  : body.to_vec()
    })
  }

  pub fn encode(&self) -> Vec<u8> {
    let mut image = Vec::with_capacity(HEADER_BYTES + self.body.len());
    image.extend_from_slice(&self.entry.to_le_bytes());
    image.extend_from_slice(&self.body);
    image
  }
}

/**
  Reads an instruction's fields out of memory, starting at the opcode. Each read is bounds
  checked and advances the cursor; the engine commits the final position to `ip` only when
  the instruction succeeds.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cursor {
  position: UWord
}

impl Cursor {
  pub fn new(position: UWord) -> Cursor {
    Cursor{ position }
  }

  pub fn position(&self) -> UWord {
    self.position
  }

  /// Redirects the cursor, used by jumps, calls and returns.
  pub fn jump(&mut self, target: UWord) {
    self.position = target;
  }

  /// Reads a little-endian field of `width` bytes.
  pub fn literal(&mut self, memory: &MemoryImage, width: Width) -> Result<UWord, Fault> {
    let value = memory.read_uint(self.position, width)?;
    self.position = self.position.wrapping_add(width.bytes() as UWord);
    Ok(value)
  }

  pub fn opcode_bits(&mut self, memory: &MemoryImage) -> Result<u16, Fault> {
    self.literal(memory, Width::W16).map(|bits| bits as u16)
  }

  /// An address or byte count field.
  pub fn word(&mut self, memory: &MemoryImage) -> Result<UWord, Fault> {
    self.literal(memory, Width::W64)
  }

  /// A register index field, validated against the register file.
  pub fn register(&mut self, memory: &MemoryImage) -> Result<Register, Fault> {
    let index = self.literal(memory, Width::W8)?;
    Register::from_index(index)
  }
}

/**
  Builds a program body field by field. The emitter writes exactly what the decoder reads;
  the caller is responsible for following each opcode with the operands it expects.
*/
#[derive(Clone, Debug, Default)]
pub struct Emitter {
  bytes: Vec<u8>
}

impl Emitter {
  pub fn new() -> Emitter {
    Emitter{ bytes: vec![] }
  }

  /// The address the next emitted byte will occupy.
  pub fn position(&self) -> UWord {
    self.bytes.len() as UWord
  }

  pub fn op(&mut self, opcode: Opcode) -> &mut Emitter {
    self.raw_opcode(opcode.code())
  }

  /// Emits an opcode number whether or not it names a real instruction.
  pub fn raw_opcode(&mut self, code: u16) -> &mut Emitter {
    self.bytes.extend_from_slice(&code.to_le_bytes());
    self
  }

  pub fn reg(&mut self, register: Register) -> &mut Emitter {
    self.bytes.push(register.index() as u8);
    self
  }

  /// Emits a register index byte without validating it.
  pub fn raw_reg(&mut self, index: u8) -> &mut Emitter {
    self.bytes.push(index);
    self
  }

  pub fn lit(&mut self, width: Width, value: UWord) -> &mut Emitter {
    self.bytes.extend_from_slice(&to_le_bytes(value, width));
    self
  }

  /// An eight byte address, count, or word literal.
  pub fn word(&mut self, value: UWord) -> &mut Emitter {
    self.lit(Width::W64, value)
  }

  pub fn bytes(&mut self, data: &[u8]) -> &mut Emitter {
    self.bytes.extend_from_slice(data);
    self
  }

  /**
    Overwrites an already emitted word, for forward references.

    # Panics

    Panics if the eight bytes at `at` have not all been emitted yet.
  */
  pub fn patch_word(&mut self, at: UWord, value: UWord) -> &mut Emitter {
    let start = at as usize;
    self.bytes[start..start + WORD_BYTES].copy_from_slice(&value.to_le_bytes());
    self
  }

  pub fn body(&self) -> &[u8] {
    &self.bytes
  }

  pub fn program(&self, entry: UWord) -> Program {
    Program::new(entry, self.bytes.clone())
  }
}
