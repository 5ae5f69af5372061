//! Jumps, stack instructions, and procedure calls.

use std::io::{BufRead, Write};

use crate::bytecode::{Cursor, Opcode};
use crate::fault::Fault;
use crate::numeric::{UWord, Width};
use crate::registers::Register;

use super::{Flow, Machine, Outcome};

impl<R: BufRead, W: Write> Machine<R, W> {

  // region Jumps

  pub(crate) fn jmp(&mut self, cursor: &mut Cursor) -> Outcome {
    let target = cursor.word(&self.memory)?;
    cursor.jump(target);
    Ok(Flow::Continue)
  }

  pub(crate) fn jmp_reg(&mut self, cursor: &mut Cursor) -> Outcome {
    let source = cursor.register(&self.memory)?;
    cursor.jump(self.registers.get(source));
    Ok(Flow::Continue)
  }

  /// The address operand is consumed whether or not the branch is taken.
  pub(crate) fn jump_if(&mut self, cursor: &mut Cursor, opcode: Opcode) -> Outcome {
    let target = cursor.word(&self.memory)?;
    let condition = match opcode.condition() {
      Some(condition) => condition,
      None            => return Err(Fault::UnknownInstruction(opcode.code()).into())
    };
    if condition.holds(self.registers.get_signed(Register::Flag)) {
      cursor.jump(target);
    }
    Ok(Flow::Continue)
  }

  // endregion

  // region Push and pop

  pub(crate) fn push_lit(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let value = cursor.literal(&self.memory, width)?;
    self.stack().push_uint(width, value)?;
    Ok(Flow::Continue)
  }

  pub(crate) fn push_mem(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let address = cursor.word(&self.memory)?;
    let data    = self.memory.read(address, width.bytes())?.to_vec();
    self.stack().push_bytes(&data)?;
    Ok(Flow::Continue)
  }

  pub(crate) fn push_reg(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let source = cursor.register(&self.memory)?;
    let value  = self.registers.get(source);
    self.stack().push_uint(width, value)?;
    Ok(Flow::Continue)
  }

  pub(crate) fn push_ind(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let pointer = cursor.register(&self.memory)?;
    let data    = self.memory.read(self.registers.get(pointer), width.bytes())?.to_vec();
    self.stack().push_bytes(&data)?;
    Ok(Flow::Continue)
  }

  pub(crate) fn pop_reg(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let value  = self.stack().pop_uint(width)?;
    self.registers.set_low(target, width, value);
    Ok(Flow::Continue)
  }

  pub(crate) fn pop_mem(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let address = cursor.word(&self.memory)?;
    self.pop_into(address, width)
  }

  pub(crate) fn pop_ind(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let pointer = cursor.register(&self.memory)?;
    let address = self.registers.get(pointer);
    self.pop_into(address, width)
  }

  /// The destination is checked before the pop so that a bad address leaves `sp` alone.
  fn pop_into(&mut self, address: UWord, width: Width) -> Outcome {
    self.memory.check(address, width.bytes())?;
    let data = self.stack().pop_bytes(width.bytes())?;
    self.memory.write(address, &data)?;
    Ok(Flow::Continue)
  }

  pub(crate) fn push_raw(&mut self, cursor: &mut Cursor) -> Outcome {
    let count = cursor.word(&self.memory)?;
    self.stack().reserve(count)?;
    Ok(Flow::Continue)
  }

  pub(crate) fn pop_raw(&mut self, cursor: &mut Cursor) -> Outcome {
    let count = cursor.word(&self.memory)?;
    self.stack().release(count)?;
    Ok(Flow::Continue)
  }

  // endregion

  // region Calls

  /// The return address is the instruction after the `call`.
  pub(crate) fn call(&mut self, cursor: &mut Cursor) -> Outcome {
    let target = cursor.word(&self.memory)?;
    self.stack().call(cursor.position())?;
    cursor.jump(target);
    Ok(Flow::Continue)
  }

  pub(crate) fn call_reg(&mut self, cursor: &mut Cursor) -> Outcome {
    let source = cursor.register(&self.memory)?;
    let target = self.registers.get(source);
    self.stack().call(cursor.position())?;
    cursor.jump(target);
    Ok(Flow::Continue)
  }

  pub(crate) fn ret(&mut self, cursor: &mut Cursor) -> Outcome {
    let return_address = self.stack().ret()?;
    cursor.jump(return_address);
    Ok(Flow::Continue)
  }

  // endregion
}
