use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::numeric::{NumType, Width};

/**
  Opcodes of the virtual machine.

  Opcodes are 16 bits. The high byte names the instruction family and the low byte the
  member. In the width families (moves, pushes, pops) the members come in groups of four
  consecutive codes, one per operand width, and the low two bits select the width:
  `...0` is 8 bits, `...1` is 16, `...2` is 32 and `...3` is 64 bits, the word form.
  Consequently the numeric values below are significant and must not be reordered.
  Order-dependencies:
      ```
      Opcode::width()
      Opcode::conversion()
      ```

  The operand fields of each opcode follow it immediately, in the order given in the
  comments: `reg` is one byte, `lit` has the opcode's width (eight bytes where no width is
  given), `addr` and `count` are eight bytes, and `amount` is one byte.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[strum(serialize_all = "snake_case")]
#[repr(u16)]
pub enum Opcode {
  // Miscellaneous //
  Nop            = 0x0000,
  Halt           = 0x0001,
  Break          = 0x0002,
  Syscall        = 0x0003,  // syscall            (selector in r0)

  // Move //
  MovLitReg8     = 0x0100,  // mov( reg, lit )
  MovLitReg16,
  MovLitReg32,
  MovLitReg64,
  MovLitMem8     = 0x0110,  // mov( addr, lit )
  MovLitMem16,
  MovLitMem32,
  MovLitMem64,
  MovRegReg8     = 0x0120,  // mov( dst reg, src reg )
  MovRegReg16,
  MovRegReg32,
  MovRegReg64,
  MovRegMem8     = 0x0130,  // mov( addr, src reg )
  MovRegMem16,
  MovRegMem32,
  MovRegMem64,
  MovMemReg8     = 0x0140,  // mov( dst reg, addr )
  MovMemReg16,
  MovMemReg32,
  MovMemReg64,
  MovMemMem8     = 0x0150,  // mov( dst addr, src addr )
  MovMemMem16,
  MovMemMem32,
  MovMemMem64,
  MovIndReg8     = 0x0160,  // mov( dst reg, [addr reg] )
  MovIndReg16,
  MovIndReg32,
  MovIndReg64,
  MovRegInd8     = 0x0170,  // mov( [addr reg], src reg )
  MovRegInd16,
  MovRegInd32,
  MovRegInd64,
  MovLitInd8     = 0x0180,  // mov( [addr reg], lit )
  MovLitInd16,
  MovLitInd32,
  MovLitInd64,

  // Bitwise //
  AndLit         = 0x0200,  // and( reg, lit )
  AndReg,                   // and( dst reg, src reg )
  AndMem,                   // and( dst addr, src addr, count )
  OrLit          = 0x0210,
  OrReg,
  OrMem,
  XorLit         = 0x0220,
  XorReg,
  XorMem,
  NotReg         = 0x0230,  // not( reg )
  NotMem,                   // not( addr, count )

  // Arithmetic //
  AddLit         = 0x0300,  // add( reg, lit )
  AddReg,                   // add( dst reg, src reg )
  AddMem,                   // add( dst addr, src addr, count )
  SubLit         = 0x0310,
  SubReg,
  SubMem,
  MulLit         = 0x0320,
  MulReg,
  DivLit         = 0x0330,  // div( reg, lit )      remainder -> flag
  DivReg,
  Fadd32         = 0x0340,  // fadd32( dst reg, src reg )
  Fsub32,
  Fmul32,
  Fdiv32,
  Fneg32,                   // fneg32( reg )
  Fadd64         = 0x0350,
  Fsub64,
  Fmul64,
  Fdiv64,
  Fneg64,

  // Shift //
  ShlLit         = 0x0400,  // shl( reg, amount )
  ShlReg,                   // shl( reg, amount reg )
  ShrLit         = 0x0410,
  ShrReg,
  SarLit         = 0x0420,
  SarReg,

  // Conversion, all in place: op( reg ) //
  I8ToI16        = 0x0500,
  I8ToI32,
  I8ToI64,
  I16ToI8,
  I16ToI32,
  I16ToI64,
  I32ToI8,
  I32ToI16,
  I32ToI64,
  I64ToI8,
  I64ToI16,
  I64ToI32,
  I32ToF32,
  I32ToF64,
  I64ToF32,
  I64ToF64,
  F32ToI32,
  F32ToI64,
  F64ToI32,
  F64ToI64,
  F32ToF64,
  F64ToF32,

  // Comparison, result -> cmp //
  CmpReg         = 0x0600,  // cmp( reg, reg )
  CmpLit,                   // cmp( reg, lit )
  CmpLitLit,                // cmp( lit, lit )
  CmpMem,                   // cmp( addr, addr, count )

  // Control flow //
  Jmp            = 0x0700,  // jmp( addr )
  JmpReg,                   // jmp( reg )
  Jeq            = 0x0710,  // jeq( addr )
  Jne,
  Jgt,
  Jge,
  Jlt,
  Jle,

  // Stack //
  PushLit8       = 0x0800,  // push( lit )
  PushLit16,
  PushLit32,
  PushLit64,
  PushMem8       = 0x0810,  // push( addr )
  PushMem16,
  PushMem32,
  PushMem64,
  PushReg8       = 0x0820,  // push( reg )
  PushReg16,
  PushReg32,
  PushReg64,
  PushInd8       = 0x0830,  // push( [addr reg] )
  PushInd16,
  PushInd32,
  PushInd64,
  PopReg8        = 0x0840,  // pop( reg )
  PopReg16,
  PopReg32,
  PopReg64,
  PopMem8        = 0x0850,  // pop( addr )
  PopMem16,
  PopMem32,
  PopMem64,
  PopInd8        = 0x0860,  // pop( [addr reg] )
  PopInd16,
  PopInd32,
  PopInd64,
  PushRaw        = 0x0870,  // push_raw( count )
  PopRaw,                   // pop_raw( count )

  // Call/Return //
  Call           = 0x0900,  // call( addr )
  CallReg,                  // call( reg )
  Ret,

  // Output //
  PrintRegHex    = 0x0A00,  // print( reg )
  PrintRegBin,
  PrintRegDec,
  PrintRegText,
  PrintMemHex    = 0x0A10,  // print( addr, count )
  PrintMemBin,
  PrintMemDec,
  PrintMemText,
}

/// How a print opcode renders its operand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrintFormat {
  Hex,
  Binary,
  Decimal,
  Text,
}

/// Which stored comparison outcomes take a conditional branch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Condition {
  Equal,
  NotEqual,
  Greater,
  GreaterOrEqual,
  Less,
  LessOrEqual,
}

impl Condition {
  /// Tests a tri-state comparison result (negative, zero, positive).
  pub fn holds(&self, tri_state: i64) -> bool {
    match self {
      Condition::Equal          => tri_state == 0,
      Condition::NotEqual       => tri_state != 0,
      Condition::Greater        => tri_state > 0,
      Condition::GreaterOrEqual => tri_state >= 0,
      Condition::Less           => tri_state < 0,
      Condition::LessOrEqual    => tri_state <= 0,
    }
  }
}

impl Opcode {
  pub fn code(&self) -> u16 {
    Into::<u16>::into(*self)
  }

  pub fn family(&self) -> u8 {
    (self.code() >> 8) as u8
  }

  /// The operand width of a width-family opcode.
  pub fn width(&self) -> Width {
    Width::from_selector(self.code())
  }

  /// Source and destination types of a conversion opcode.
  pub fn conversion(&self) -> Option<(NumType, NumType)> {
    use NumType::*;
    let pair = match self {
      Opcode::I8ToI16  => (I8, I16),
      Opcode::I8ToI32  => (I8, I32),
      Opcode::I8ToI64  => (I8, I64),
      Opcode::I16ToI8  => (I16, I8),
      Opcode::I16ToI32 => (I16, I32),
      Opcode::I16ToI64 => (I16, I64),
      Opcode::I32ToI8  => (I32, I8),
      Opcode::I32ToI16 => (I32, I16),
      Opcode::I32ToI64 => (I32, I64),
      Opcode::I64ToI8  => (I64, I8),
      Opcode::I64ToI16 => (I64, I16),
      Opcode::I64ToI32 => (I64, I32),
      Opcode::I32ToF32 => (I32, F32),
      Opcode::I32ToF64 => (I32, F64),
      Opcode::I64ToF32 => (I64, F32),
      Opcode::I64ToF64 => (I64, F64),
      Opcode::F32ToI32 => (F32, I32),
      Opcode::F32ToI64 => (F32, I64),
      Opcode::F64ToI32 => (F64, I32),
      Opcode::F64ToI64 => (F64, I64),
      Opcode::F32ToF64 => (F32, F64),
      Opcode::F64ToF32 => (F64, F32),
      _                => return None
    };
    Some(pair)
  }

  pub fn condition(&self) -> Option<Condition> {
    match self {
      Opcode::Jeq => Some(Condition::Equal),
      Opcode::Jne => Some(Condition::NotEqual),
      Opcode::Jgt => Some(Condition::Greater),
      Opcode::Jge => Some(Condition::GreaterOrEqual),
      Opcode::Jlt => Some(Condition::Less),
      Opcode::Jle => Some(Condition::LessOrEqual),
      _           => None
    }
  }

  pub fn print_format(&self) -> Option<PrintFormat> {
    match self {
      Opcode::PrintRegHex  | Opcode::PrintMemHex  => Some(PrintFormat::Hex),
      Opcode::PrintRegBin  | Opcode::PrintMemBin  => Some(PrintFormat::Binary),
      Opcode::PrintRegDec  | Opcode::PrintMemDec  => Some(PrintFormat::Decimal),
      Opcode::PrintRegText | Opcode::PrintMemText => Some(PrintFormat::Text),
      _                                          => None
    }
  }
}
