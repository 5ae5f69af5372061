/*!
  The syscall gateway: the bridge from a running program to the host console.

  The selector is taken from `r0` and the arguments from `r1`, `r2`, ... in order. Reads
  report their status in `flag`, zero on success and one at end of input or when the line
  does not parse, in which case the destination is zeroed. Output is written as is, with no
  trailing newline.
*/

use std::convert::TryFrom;
use std::io::{self, BufRead, Write};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, IntoStaticStr};

use crate::bytecode::PrintFormat;
use crate::dump::{memory_table, register_table, stack_table};
use crate::engine::{render_bytes, Flow, Machine, Outcome, StopReason, Trap};
use crate::fault::Fault;
use crate::numeric::{f32_from_bits, f32_to_bits, f64_from_bits, f64_to_bits, UWord, Width, Word};
use crate::registers::Register;

#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,               PartialEq,     Debug, Hash
)]
#[strum(serialize_all = "snake_case")]
#[repr(u64)]
pub enum Syscall {
  Exit          = 0,   // exit code in r1
  PrintInt      = 1,
  PrintUint     = 2,
  PrintHex      = 3,   // ( addr, count )
  PrintF32      = 4,
  PrintF64      = 5,
  PrintChar     = 6,
  PrintStr      = 7,   // ( addr, length )
  PrintCStr     = 8,   // ( addr )
  ReadChar      = 9,
  ReadInt       = 10,
  ReadUint      = 11,
  ReadHex       = 12,
  ReadF32       = 13,
  ReadF64       = 14,
  ReadBuf       = 15,  // ( addr, capacity ) -> r3 = bytes written
  DumpRegisters = 16,
  DumpMemory    = 17,  // ( addr, length )
  DumpStack     = 18,
}

fn parse_hex(text: &str) -> Option<UWord> {
  let digits = text
    .strip_prefix("0x")
    .or_else(|| text.strip_prefix("0X"))
    .unwrap_or(text);
  UWord::from_str_radix(digits, 16).ok()
}

impl<R: BufRead, W: Write> Machine<R, W> {

  pub(crate) fn syscall(&mut self) -> Outcome {
    let selector = self.registers.get(Register::R0);
    let call     = Syscall::try_from(selector).map_err(|_| Fault::UnknownSyscall(selector))?;
    let first    = self.registers.get(Register::R1);
    let second   = self.registers.get(Register::R2);
    tracing::debug!(%call, first, second, "syscall");

    match call {

      Syscall::Exit => {
        self.exit_code = Some(first as Word);
        return Ok(Flow::Stop(StopReason::Exited));
      }

      // region Output

      Syscall::PrintInt  => self.console.write_str(&(first as Word).to_string())?,
      Syscall::PrintUint => self.console.write_str(&first.to_string())?,
      Syscall::PrintHex  => {
        let text = render_bytes(self.memory.read(first, second as usize)?, PrintFormat::Hex);
        self.console.write_str(&text)?
      }
      Syscall::PrintF32  => self.console.write_str(&f32_from_bits(first).to_string())?,
      Syscall::PrintF64  => self.console.write_str(&f64_from_bits(first).to_string())?,
      Syscall::PrintChar => self.console.write_bytes(&[first as u8])?,
      Syscall::PrintStr  => {
        let text = render_bytes(self.memory.read(first, second as usize)?, PrintFormat::Text);
        self.console.write_str(&text)?
      }
      Syscall::PrintCStr => {
        let text = render_bytes(self.memory.read_terminated(first)?, PrintFormat::Text);
        self.console.write_str(&text)?
      }

      // endregion

      // region Input

      Syscall::ReadChar => {
        let byte = self.console.read_byte()?;
        self.store_input(byte.map(UWord::from), Width::W64);
      }
      Syscall::ReadInt  => {
        let value = self.read_parsed(|line| line.parse::<Word>().ok().map(|v| v as UWord))?;
        self.store_input(value, Width::W64);
      }
      Syscall::ReadUint => {
        let value = self.read_parsed(|line| line.parse::<UWord>().ok())?;
        self.store_input(value, Width::W64);
      }
      Syscall::ReadHex  => {
        let value = self.read_parsed(parse_hex)?;
        self.store_input(value, Width::W64);
      }
      Syscall::ReadF32  => {
        let value = self.read_parsed(|line| line.parse::<f32>().ok().map(f32_to_bits))?;
        self.store_input(value, Width::W32);
      }
      Syscall::ReadF64  => {
        let value = self.read_parsed(|line| line.parse::<f64>().ok().map(f64_to_bits))?;
        self.store_input(value, Width::W64);
      }
      Syscall::ReadBuf  => self.read_buffer(first, second as usize)?,

      // endregion

      // region Debug dumps

      Syscall::DumpRegisters => {
        let table = register_table(&self.registers, None);
        self.console.write_str(&table.to_string())?
      }
      Syscall::DumpMemory    => {
        self.memory.check(first, second as usize)?;
        let table = memory_table(&self.memory, first, second as usize, None);
        self.console.write_str(&table.to_string())?
      }
      Syscall::DumpStack     => {
        let sp    = self.registers.get(Register::Sp);
        let table = stack_table(&self.registers, &self.memory, sp, self.memory.end());
        self.console.write_str(&table.to_string())?
      }

      // endregion
    }

    Ok(Flow::Continue)
  }

  /// Reads one line and parses it with surrounding whitespace removed.
  fn read_parsed<F>(&mut self, parse: F) -> io::Result<Option<UWord>>
    where F: Fn(&str) -> Option<UWord>
  {
    Ok(self.console.read_line()?.and_then(|line| parse(line.trim())))
  }

  fn store_input(&mut self, value: Option<UWord>, width: Width) {
    let (value, status) = match value {
      Some(value) => (value, 0),
      None        => (0, 1)
    };
    self.registers.set_low(Register::R1, width, value);
    self.registers.set(Register::Flag, status);
  }

  /// Copies one input line into `[address, address + capacity)`, truncating it to fit.
  fn read_buffer(&mut self, address: UWord, capacity: usize) -> Result<(), Trap> {
    self.memory.check(address, capacity)?;
    let (written, status) = match self.console.read_line()? {
      Some(line) => {
        let data = &line.as_bytes()[..line.len().min(capacity)];
        self.memory.write(address, data)?;
        (data.len() as UWord, 0)
      }
      None       => (0, 1)
    };
    self.registers.set(Register::R3, written);
    self.registers.set(Register::Flag, status);
    Ok(())
  }
}
