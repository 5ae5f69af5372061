//! Bitwise, arithmetic, shift, conversion, and comparison handlers.

use std::cmp::Ordering;
use std::io::{BufRead, Write};

use crate::bytecode::{Cursor, Opcode};
use crate::fault::Fault;
use crate::numeric::{convert, f32_from_bits, f32_to_bits, f64_from_bits, f64_to_bits, UWord, Width, Word};
use crate::registers::{ccr, Register};

use super::{Flow, Machine, Outcome};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BitOp {
  And,
  Or,
  Xor,
}

impl BitOp {
  pub fn apply(&self, lhs: UWord, rhs: UWord) -> UWord {
    match self {
      BitOp::And => lhs & rhs,
      BitOp::Or  => lhs | rhs,
      BitOp::Xor => lhs ^ rhs,
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntOp {
  Add,
  Sub,
  Mul,
  Div,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FloatOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl FloatOp {
  pub fn apply64(&self, lhs: f64, rhs: f64) -> f64 {
    match self {
      FloatOp::Add => lhs + rhs,
      FloatOp::Sub => lhs - rhs,
      FloatOp::Mul => lhs * rhs,
      FloatOp::Div => lhs / rhs,
    }
  }

  pub fn apply32(&self, lhs: f32, rhs: f32) -> f32 {
    match self {
      FloatOp::Add => lhs + rhs,
      FloatOp::Sub => lhs - rhs,
      FloatOp::Mul => lhs * rhs,
      FloatOp::Div => lhs / rhs,
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShiftOp {
  Left,
  Right,
  Arithmetic,
}

impl ShiftOp {
  /// Shifts of 64 or more clear the word, or fill it with the sign bit for `Arithmetic`.
  pub fn apply(&self, value: UWord, amount: UWord) -> UWord {
    match (self, amount >= 64) {
      (ShiftOp::Left,       false) => value << amount,
      (ShiftOp::Right,      false) => value >> amount,
      (ShiftOp::Left,       true)  |
      (ShiftOp::Right,      true)  => 0,
      (ShiftOp::Arithmetic, _)     => ((value as Word) >> amount.min(63)) as UWord,
    }
  }
}

fn tri_state(ordering: Ordering) -> Word {
  match ordering {
    Ordering::Less    => -1,
    Ordering::Equal   => 0,
    Ordering::Greater => 1,
  }
}

/// Condition codes for an integer result.
fn condition_codes(result: Word, carry: bool, overflow: bool) -> UWord {
  let mut bits = 0;
  if carry      { bits |= ccr::CARRY; }
  if overflow   { bits |= ccr::OVERFLOW; }
  if result == 0 { bits |= ccr::ZERO; }
  if result < 0  { bits |= ccr::NEGATIVE; }
  bits
}

impl<R: BufRead, W: Write> Machine<R, W> {

  // region Bitwise

  pub(crate) fn bitwise_lit(&mut self, cursor: &mut Cursor, op: BitOp) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let value  = cursor.literal(&self.memory, Width::W64)?;
    let result = op.apply(self.registers.get(target), value);
    self.registers.set(target, result);
    Ok(Flow::Continue)
  }

  pub(crate) fn bitwise_reg(&mut self, cursor: &mut Cursor, op: BitOp) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let source = cursor.register(&self.memory)?;
    let result = op.apply(self.registers.get(target), self.registers.get(source));
    self.registers.set(target, result);
    Ok(Flow::Continue)
  }

  /// Combines `count` bytes at the source into the bytes at the destination.
  pub(crate) fn bitwise_mem(&mut self, cursor: &mut Cursor, op: BitOp) -> Outcome {
    let target = cursor.word(&self.memory)?;
    let source = cursor.word(&self.memory)?;
    let count  = cursor.word(&self.memory)? as usize;

    let result = {
      let lhs = self.memory.read(target, count)?;
      let rhs = self.memory.read(source, count)?;
      lhs
        .iter()
        .zip(rhs.iter())
        .map(|(a, b)| op.apply(*a as UWord, *b as UWord) as u8)
        .collect::<Vec<u8>>()
    };
    self.memory.write(target, &result)?;
    Ok(Flow::Continue)
  }

  pub(crate) fn not_reg(&mut self, cursor: &mut Cursor) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let result = !self.registers.get(target);
    self.registers.set(target, result);
    Ok(Flow::Continue)
  }

  pub(crate) fn not_mem(&mut self, cursor: &mut Cursor) -> Outcome {
    let target = cursor.word(&self.memory)?;
    let count  = cursor.word(&self.memory)? as usize;
    let result = self.memory.read(target, count)?.iter().map(|b| !b).collect::<Vec<u8>>();
    self.memory.write(target, &result)?;
    Ok(Flow::Continue)
  }

  // endregion

  // region Integer and floating point arithmetic

  pub(crate) fn integer_lit(&mut self, cursor: &mut Cursor, op: IntOp) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let value  = cursor.literal(&self.memory, Width::W64)? as Word;
    self.integer(target, value, op)
  }

  pub(crate) fn integer_reg(&mut self, cursor: &mut Cursor, op: IntOp) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let source = cursor.register(&self.memory)?;
    let value  = self.registers.get_signed(source);
    self.integer(target, value, op)
  }

  /**
    Signed arithmetic into `target`. Addition, subtraction, and multiplication wrap and
    record carry, overflow, zero, and negative in `ccr`. Division truncates toward zero,
    stores the remainder in `flag`, and faults on a zero divisor; `i64::MIN / -1` wraps.
  */
  fn integer(&mut self, target: Register, rhs: Word, op: IntOp) -> Outcome {
    let lhs = self.registers.get_signed(target);

    let (result, carry, overflow) = match op {
      IntOp::Add => {
        let (result, overflow) = lhs.overflowing_add(rhs);
        (result, (lhs as UWord).overflowing_add(rhs as UWord).1, overflow)
      }
      IntOp::Sub => {
        let (result, overflow) = lhs.overflowing_sub(rhs);
        (result, (lhs as UWord) < (rhs as UWord), overflow)
      }
      IntOp::Mul => {
        let (result, overflow) = lhs.overflowing_mul(rhs);
        (result, (lhs as UWord).overflowing_mul(rhs as UWord).1, overflow)
      }
      IntOp::Div => {
        if rhs == 0 {
          return Err(Fault::DivisionByZero(self.fetched_at).into());
        }
        self.registers.set_signed(target, lhs.wrapping_div(rhs));
        self.registers.set_signed(Register::Flag, lhs.wrapping_rem(rhs));
        return Ok(Flow::Continue);
      }
    };

    self.registers.set_signed(target, result);
    self.registers.set(Register::Ccr, condition_codes(result, carry, overflow));
    Ok(Flow::Continue)
  }

  /**
    Little-endian multi-byte addition or subtraction of `count` bytes, in place at the
    destination. The final carry or borrow is written to `flag`.
  */
  pub(crate) fn integer_mem(&mut self, cursor: &mut Cursor, op: IntOp) -> Outcome {
    let target = cursor.word(&self.memory)?;
    let source = cursor.word(&self.memory)?;
    let count  = cursor.word(&self.memory)? as usize;

    let (result, carry) = {
      let lhs = self.memory.read(target, count)?;
      let rhs = self.memory.read(source, count)?;
      let mut carry  = 0u16;
      let mut result = Vec::with_capacity(count);
      for (a, b) in lhs.iter().zip(rhs.iter()) {
        let (a, b) = (*a as u16, *b as u16);
        match op {
          IntOp::Sub => {
            let subtrahend = b + carry;
            carry = (subtrahend > a) as u16;
            result.push((a + 0x100 - subtrahend) as u8);
          }
          _ => {
            let sum = a + b + carry;
            carry = sum >> 8;
            result.push(sum as u8);
          }
        }
      }
      (result, carry)
    };

    self.memory.write(target, &result)?;
    self.registers.set(Register::Flag, carry as UWord);
    Ok(Flow::Continue)
  }

  /// Single precision operates on, and writes back only, the low four bytes.
  pub(crate) fn float32(&mut self, cursor: &mut Cursor, op: FloatOp) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let source = cursor.register(&self.memory)?;
    let lhs    = f32_from_bits(self.registers.get(target));
    let rhs    = f32_from_bits(self.registers.get(source));
    self.registers.set_low(target, Width::W32, f32_to_bits(op.apply32(lhs, rhs)));
    Ok(Flow::Continue)
  }

  pub(crate) fn float64(&mut self, cursor: &mut Cursor, op: FloatOp) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let source = cursor.register(&self.memory)?;
    let lhs    = f64_from_bits(self.registers.get(target));
    let rhs    = f64_from_bits(self.registers.get(source));
    self.registers.set(target, f64_to_bits(op.apply64(lhs, rhs)));
    Ok(Flow::Continue)
  }

  pub(crate) fn fneg32(&mut self, cursor: &mut Cursor) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let value  = -f32_from_bits(self.registers.get(target));
    self.registers.set_low(target, Width::W32, f32_to_bits(value));
    Ok(Flow::Continue)
  }

  pub(crate) fn fneg64(&mut self, cursor: &mut Cursor) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let value  = -f64_from_bits(self.registers.get(target));
    self.registers.set(target, f64_to_bits(value));
    Ok(Flow::Continue)
  }

  // endregion

  // region Shifts and conversions

  pub(crate) fn shift_lit(&mut self, cursor: &mut Cursor, op: ShiftOp) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let amount = cursor.literal(&self.memory, Width::W8)?;
    let result = op.apply(self.registers.get(target), amount);
    self.registers.set(target, result);
    Ok(Flow::Continue)
  }

  pub(crate) fn shift_reg(&mut self, cursor: &mut Cursor, op: ShiftOp) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let source = cursor.register(&self.memory)?;
    let result = op.apply(self.registers.get(target), self.registers.get(source));
    self.registers.set(target, result);
    Ok(Flow::Continue)
  }

  /// Converts a register in place, writing only the destination type's width.
  pub(crate) fn convert(&mut self, cursor: &mut Cursor, opcode: Opcode) -> Outcome {
    let target = cursor.register(&self.memory)?;
    let (from, to) = match opcode.conversion() {
      Some(pair) => pair,
      None       => return Err(Fault::UnknownInstruction(opcode.code()).into())
    };
    let result = convert(self.registers.get(target), from, to);
    self.registers.set_low(target, to.width(), result);
    Ok(Flow::Continue)
  }

  // endregion

  // region Comparisons

  fn compare(&mut self, ordering: Ordering) -> Outcome {
    self.registers.set_signed(Register::Flag, tri_state(ordering));
    Ok(Flow::Continue)
  }

  pub(crate) fn cmp_reg(&mut self, cursor: &mut Cursor) -> Outcome {
    let lhs = cursor.register(&self.memory)?;
    let rhs = cursor.register(&self.memory)?;
    let ordering = self.registers.get_signed(lhs).cmp(&self.registers.get_signed(rhs));
    self.compare(ordering)
  }

  pub(crate) fn cmp_lit(&mut self, cursor: &mut Cursor) -> Outcome {
    let lhs = cursor.register(&self.memory)?;
    let rhs = cursor.literal(&self.memory, Width::W64)? as Word;
    let ordering = self.registers.get_signed(lhs).cmp(&rhs);
    self.compare(ordering)
  }

  pub(crate) fn cmp_lit_lit(&mut self, cursor: &mut Cursor) -> Outcome {
    let lhs = cursor.literal(&self.memory, Width::W64)? as Word;
    let rhs = cursor.literal(&self.memory, Width::W64)? as Word;
    self.compare(lhs.cmp(&rhs))
  }

  /// Lexicographic comparison of two byte ranges.
  pub(crate) fn cmp_mem(&mut self, cursor: &mut Cursor) -> Outcome {
    let lhs   = cursor.word(&self.memory)?;
    let rhs   = cursor.word(&self.memory)?;
    let count = cursor.word(&self.memory)? as usize;
    let ordering = self.memory.read(lhs, count)?.cmp(self.memory.read(rhs, count)?);
    self.compare(ordering)
  }

  // endregion
}
