//! Tabular renderings of machine state, shared by the debug syscalls, the breakpoint menu,
//! and the `trace_computation` feature.

use prettytable::{format as TableFormat, row, Table};
use strum::IntoEnumIterator;

use crate::memory::MemoryImage;
use crate::numeric::{from_le_bytes, UWord, Word, WORD_BYTES};
use crate::registers::{Register, RegisterFile};

/// Bytes shown per memory table row.
pub const ROW_BYTES: usize = 16;

lazy_static::lazy_static! {
  pub static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

fn new_table() -> Table {
  let mut table = Table::new();
  table.set_format(*TABLE_DISPLAY_FORMAT);
  table
}

fn marker(highlight: bool) -> &'static str {
  match highlight {
    true  => "* --> ",
    false => ""
  }
}

/// One row per register: name, hex contents, signed decimal contents.
pub fn register_table(registers: &RegisterFile, highlight: Option<Register>) -> Table {
  let mut table = new_table();
  table.set_titles(row![ubr->"Register", ubl->"Hex", ubl->"Decimal"]);

  for register in Register::iter() {
    let value = registers.get(register);
    table.add_row(row![
      r->format!("{}{} =", marker(Some(register) == highlight), register),
      format!("{:#018x}", value),
      format!("{}", value as Word)
    ]);
  }
  table
}

/// A single register, for the breakpoint menu.
pub fn register_line(registers: &RegisterFile, register: Register) -> String {
  let value = registers.get(register);
  format!("{} = {:#018x} ({})", register, value, value as Word)
}

/**
  A hex dump of `[start, start + length)`, clamped to the end of memory, sixteen bytes per
  row with a printable-ASCII column. The row containing `highlight` is marked.
*/
pub fn memory_table(memory: &MemoryImage, start: UWord, length: usize, highlight: Option<UWord>)
  -> Table
{
  let mut table = new_table();
  table.set_titles(row![ubr->"Address", ubl->"Bytes", ubl->"Text"]);

  let start = start.min(memory.end());
  let end   = start.saturating_add(length as UWord).min(memory.end());
  let bytes = &memory.as_slice()[start as usize..end as usize];

  for (row_index, chunk) in bytes.chunks(ROW_BYTES).enumerate() {
    let address = start + (row_index * ROW_BYTES) as UWord;
    let here    = highlight
      .map(|h| h >= address && h < address + chunk.len() as UWord)
      .unwrap_or(false);
    let hex = chunk
      .iter()
      .map(|b| format!("{:02X}", b))
      .collect::<Vec<String>>()
      .join(" ");
    let text = chunk
      .iter()
      .map(|b| match b.is_ascii_graphic() || *b == b' ' { true => *b as char, false => '.' })
      .collect::<String>();

    table.add_row(row![r->format!("{}{:#010x}", marker(here), address), hex, text]);
  }
  table
}

/**
  The stack between `from` and `to`, one word per row from the lowest address up. `sp` and
  `fp` are labelled where they fall; a trailing partial word is shown as its raw bytes.
*/
pub fn stack_table(registers: &RegisterFile, memory: &MemoryImage, from: UWord, to: UWord) -> Table {
  let mut table = new_table();
  table.set_titles(row![ubr->"Address", ubl->"Word", ubl->""]);

  let sp    = registers.get(Register::Sp);
  let fp    = registers.get(Register::Fp);
  let to    = to.min(memory.end());
  let from  = from.min(to);
  let bytes = &memory.as_slice()[from as usize..to as usize];

  for (row_index, chunk) in bytes.chunks(WORD_BYTES).enumerate() {
    let address = from + (row_index * WORD_BYTES) as UWord;
    let labels  = [(sp, "sp"), (fp, "fp")]
      .iter()
      .filter(|(pointer, _)| *pointer == address)
      .map(|(_, name)| *name)
      .collect::<Vec<&str>>()
      .join(" ");
    let contents = match chunk.len() == WORD_BYTES {
      true  => format!("{:#018x}", from_le_bytes(chunk)),
      false => chunk.iter().map(|b| format!("{:02X}", b)).collect::<Vec<String>>().join(" ")
    };

    table.add_row(row![r->format!("{}{:#010x}", marker(address == sp), address), contents, labels]);
  }
  table
}
