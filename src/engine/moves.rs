//! Data movement. Every form moves `width` bytes; a register destination keeps its bytes
//! above the moved width.

use std::io::{BufRead, Write};

use crate::bytecode::Cursor;
use crate::numeric::Width;

use super::{Flow, Machine, Outcome};

impl<R: BufRead, W: Write> Machine<R, W> {

  pub(crate) fn mov_lit_reg(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let value  = cursor.literal(&self.memory, width)?;
    self.registers.set_low(target, width, value);
    Ok(Flow::Continue)
  }

  pub(crate) fn mov_lit_mem(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let address = cursor.word(&self.memory)?;
    let value   = cursor.literal(&self.memory, width)?;
    self.memory.write_uint(address, width, value)?;
    Ok(Flow::Continue)
  }

  pub(crate) fn mov_reg_reg(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let source = cursor.register(&self.memory)?;
    let value  = self.registers.get(source);
    self.registers.set_low(target, width, value);
    Ok(Flow::Continue)
  }

  pub(crate) fn mov_reg_mem(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let address = cursor.word(&self.memory)?;
    let source  = cursor.register(&self.memory)?;
    self.memory.write_uint(address, width, self.registers.get(source))?;
    Ok(Flow::Continue)
  }

  pub(crate) fn mov_mem_reg(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let target  = cursor.register(&self.memory)?;
    let address = cursor.word(&self.memory)?;
    let value   = self.memory.read_uint(address, width)?;
    self.registers.set_low(target, width, value);
    Ok(Flow::Continue)
  }

  pub(crate) fn mov_mem_mem(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let target = cursor.word(&self.memory)?;
    let source = cursor.word(&self.memory)?;
    self.memory.copy_within(source, target, width.bytes())?;
    Ok(Flow::Continue)
  }

  /// `mov( dst reg, [addr reg] )`
  pub(crate) fn mov_ind_reg(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let target  = cursor.register(&self.memory)?;
    let pointer = cursor.register(&self.memory)?;
    let value   = self.memory.read_uint(self.registers.get(pointer), width)?;
    self.registers.set_low(target, width, value);
    Ok(Flow::Continue)
  }

  /// `mov( [addr reg], src reg )`
  pub(crate) fn mov_reg_ind(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let pointer = cursor.register(&self.memory)?;
    let source  = cursor.register(&self.memory)?;
    self.memory.write_uint(self.registers.get(pointer), width, self.registers.get(source))?;
    Ok(Flow::Continue)
  }

  pub(crate) fn mov_lit_ind(&mut self, cursor: &mut Cursor, width: Width) -> Outcome {
    let pointer = cursor.register(&self.memory)?;
    let value   = cursor.literal(&self.memory, width)?;
    self.memory.write_uint(self.registers.get(pointer), width, value)?;
    Ok(Flow::Continue)
  }
}
