/*!
  The scalar model of the machine. A register holds one 64 bit `UWord`; every other numeric
  view of it (signed, narrower, floating point) is produced here and nowhere else, so the
  truncation and sign-extension policy lives in one place.

  Narrower values always occupy the *low* bytes of a word. Writes of a narrower value
  replace only those bytes (`merge_low`); the bytes above are left as they were.
*/

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, IntoStaticStr};

/// Signed view of the native word.
pub type Word = i64;
/// Unsigned view of the native word; the representation registers actually store.
pub type UWord = u64;

/// Size of a word in bytes.
pub const WORD_BYTES: usize = 8;

/// Operand widths of the width-qualified opcodes.
#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[repr(u8)]
pub enum Width {
  #[strum(serialize = "8")]
  W8  = 1,
  #[strum(serialize = "16")]
  W16 = 2,
  #[strum(serialize = "32")]
  W32 = 4,
  #[strum(serialize = "64")]
  W64 = 8,
}

impl Width {
  /// The width selected by the low two bits of a width-family opcode.
  pub fn from_selector(selector: u16) -> Width {
    match selector & 0x3 {
      0 => Width::W8,
      1 => Width::W16,
      2 => Width::W32,
      _ => Width::W64,
    }
  }

  pub fn bytes(&self) -> usize {
    Into::<u8>::into(*self) as usize
  }

  pub fn bits(&self) -> u32 {
    (self.bytes() * 8) as u32
  }

  /// A mask covering the low `self.bytes()` bytes of a word.
  pub fn mask(&self) -> UWord {
    match self {
      Width::W64 => UWord::MAX,
      _          => (1 << self.bits()) - 1
    }
  }
}

/// Keeps only the low `width` bytes of `value`.
pub fn truncate(value: UWord, width: Width) -> UWord {
  value & width.mask()
}

/// Interprets the low `width` bytes of `value` as a signed integer and widens it to a word.
pub fn sign_extend(value: UWord, width: Width) -> UWord {
  let shift = 64 - width.bits();
  (((value << shift) as Word) >> shift) as UWord
}

/// Replaces the low `width` bytes of `prior` with the low `width` bytes of `value`.
pub fn merge_low(prior: UWord, value: UWord, width: Width) -> UWord {
  let mask = width.mask();
  (prior & !mask) | (value & mask)
}

/// Decodes `bytes` (at most eight) as a little-endian unsigned value.
pub fn from_le_bytes(bytes: &[u8]) -> UWord {
  bytes
    .iter()
    .take(WORD_BYTES)
    .enumerate()
    .fold(0, |acc, (i, b)| acc | ((*b as UWord) << (8 * i)))
}

/// The low `width` bytes of `value` in little-endian order.
pub fn to_le_bytes(value: UWord, width: Width) -> Vec<u8> {
  value.to_le_bytes()[..width.bytes()].to_vec()
}

pub fn f32_from_bits(bits: UWord) -> f32 {
  f32::from_bits(bits as u32)
}

pub fn f32_to_bits(value: f32) -> UWord {
  value.to_bits() as UWord
}

pub fn f64_from_bits(bits: UWord) -> f64 {
  f64::from_bits(bits)
}

pub fn f64_to_bits(value: f64) -> UWord {
  value.to_bits()
}

/// Numeric interpretations a conversion opcode can move between.
#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum NumType {
  I8,
  I16,
  I32,
  I64,
  F32,
  F64,
}

impl NumType {
  pub fn width(&self) -> Width {
    match self {
      NumType::I8                => Width::W8,
      NumType::I16               => Width::W16,
      NumType::I32 | NumType::F32 => Width::W32,
      NumType::I64 | NumType::F64 => Width::W64,
    }
  }
}

/// A decoded scalar, used only as the midpoint of `convert`.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Scalar {
  Int(Word),
  F32(f32),
  F64(f64),
}

fn decode_scalar(bits: UWord, from: NumType) -> Scalar {
  match from {
    NumType::F32 => Scalar::F32(f32_from_bits(bits)),
    NumType::F64 => Scalar::F64(f64_from_bits(bits)),
    int_type     => Scalar::Int(sign_extend(bits, int_type.width()) as Word),
  }
}

/**
  Converts the value held in the low bytes of `bits` from type `from` to type `to`.

  The result occupies the low `to.width()` bytes of the returned word; the caller merges it
  into the destination register. Integer narrowing truncates, integer widening sign-extends,
  integer to float rounds to nearest, float to integer saturates (NaN becomes zero).
*/
pub fn convert(bits: UWord, from: NumType, to: NumType) -> UWord {
  let scalar = decode_scalar(bits, from);
  let result = match (to, scalar) {
    (NumType::F32, Scalar::Int(i)) => f32_to_bits(i as f32),
    (NumType::F32, Scalar::F32(f)) => f32_to_bits(f),
    (NumType::F32, Scalar::F64(f)) => f32_to_bits(f as f32),
    (NumType::F64, Scalar::Int(i)) => f64_to_bits(i as f64),
    (NumType::F64, Scalar::F32(f)) => f64_to_bits(f as f64),
    (NumType::F64, Scalar::F64(f)) => f64_to_bits(f),
    (int_type,     Scalar::Int(i)) => i as UWord & int_type.width().mask(),
    (int_type,     Scalar::F32(f)) => float_to_int(f as f64, int_type),
    (int_type,     Scalar::F64(f)) => float_to_int(f, int_type),
  };
  truncate(result, to.width())
}

fn float_to_int(value: f64, to: NumType) -> UWord {
  let saturated = match to {
    NumType::I8  => value as i8 as Word,
    NumType::I16 => value as i16 as Word,
    NumType::I32 => value as i32 as Word,
    _            => value as Word,
  };
  saturated as UWord & to.width().mask()
}
