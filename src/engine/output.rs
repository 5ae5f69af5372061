//! The print instructions. Nothing here appends a newline.

use std::io::{BufRead, Write};

use crate::bytecode::{Cursor, Opcode, PrintFormat};
use crate::fault::Fault;
use crate::numeric::{UWord, Word};

use super::{Flow, Machine, Outcome};

/// Renders a whole register.
pub fn render_word(value: UWord, format: PrintFormat) -> String {
  match format {
    PrintFormat::Hex     => format!("0x{:016X}", value),
    PrintFormat::Binary  => format!("0b{:064b}", value),
    PrintFormat::Decimal => format!("{}", value as Word),
    PrintFormat::Text    => {
      let bytes = value.to_le_bytes();
      let text  = bytes.iter().take_while(|b| **b != 0).copied().collect::<Vec<u8>>();
      String::from_utf8_lossy(&text).into_owned()
    }
  }
}

/// Renders a byte range, one space-separated group per byte except for `Text`.
pub fn render_bytes(bytes: &[u8], format: PrintFormat) -> String {
  let join = |render: fn(&u8) -> String| bytes.iter().map(render).collect::<Vec<String>>().join(" ");
  match format {
    PrintFormat::Hex     => join(|b| format!("{:02X}", b)),
    PrintFormat::Binary  => join(|b| format!("{:08b}", b)),
    PrintFormat::Decimal => join(|b| format!("{}", b)),
    PrintFormat::Text    => String::from_utf8_lossy(bytes).into_owned(),
  }
}

impl<R: BufRead, W: Write> Machine<R, W> {

  fn format_of(opcode: Opcode) -> Result<PrintFormat, Fault> {
    opcode.print_format().ok_or(Fault::UnknownInstruction(opcode.code()))
  }

  pub(crate) fn print_reg(&mut self, cursor: &mut Cursor, opcode: Opcode) -> Outcome {
    let format = Self::format_of(opcode)?;
    let source = cursor.register(&self.memory)?;
    let text   = render_word(self.registers.get(source), format);
    self.console.write_str(&text)?;
    Ok(Flow::Continue)
  }

  pub(crate) fn print_mem(&mut self, cursor: &mut Cursor, opcode: Opcode) -> Outcome {
    let format  = Self::format_of(opcode)?;
    let address = cursor.word(&self.memory)?;
    let count   = cursor.word(&self.memory)? as usize;
    let text    = render_bytes(self.memory.read(address, count)?, format);
    self.console.write_str(&text)?;
    Ok(Flow::Continue)
  }
}
