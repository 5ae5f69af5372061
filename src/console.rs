//! The injected host console: the output sink programs print to and the input the
//! read syscalls and the breakpoint menu consume.

use std::io::{self, BufRead, Write};

pub struct Console<R, W> {
  reader : R,
  writer : W
}

impl<R: BufRead, W: Write> Console<R, W> {

  pub fn new(reader: R, writer: W) -> Console<R, W> {
    Console{ reader, writer }
  }

  pub fn write_str(&mut self, text: &str) -> io::Result<()> {
    self.writer.write_all(text.as_bytes())
  }

  pub fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
    self.writer.write_all(data)
  }

  pub fn flush(&mut self) -> io::Result<()> {
    self.writer.flush()
  }

  /// Reads one line without its line terminator. `None` at end of input.
  pub fn read_line(&mut self) -> io::Result<Option<String>> {
    self.flush()?;
    let mut line = String::new();
    match self.reader.read_line(&mut line)? {
      0 => Ok(None),
      _ => {
        let trimmed = line.trim_end_matches(|c| c == '\n' || c == '\r').len();
        line.truncate(trimmed);
        Ok(Some(line))
      }
    }
  }

  /// Reads a single byte. `None` at end of input.
  pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
    self.flush()?;
    let byte = match self.reader.fill_buf()?.first() {
      Some(byte) => *byte,
      None       => return Ok(None)
    };
    self.reader.consume(1);
    Ok(Some(byte))
  }

  pub fn writer(&self) -> &W {
    &self.writer
  }

  pub fn into_parts(self) -> (R, W) {
    (self.reader, self.writer)
  }
}
