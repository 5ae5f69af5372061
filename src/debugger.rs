/*!
  The interactive breakpoint. Executing `break` suspends the machine inside the current
  iteration and runs a line-oriented menu on the console until the user continues or halts.
  While the menu is open `ip` still holds the address of the `break` instruction. If the
  user writes `ip`, execution resumes at the written address instead of after the `break`.

  Commands:

  ```text
      c                    continue
      h                    halt the machine
      f                    dump the active stack frame
      m [addr]             dump 64 bytes of memory, optionally moving the window
      p                    CPU summary
      r <reg> [[=] value]  print or write a register, named or by index
      s                    dump the whole stack
      ?                    help
  ```

  Numbers are decimal, optionally negative, or hexadecimal with a `0x` prefix. End of input
  behaves like `c`.
*/

use std::convert::TryFrom;
use std::io::{BufRead, Write};
use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::tag_no_case,
  character::complete::{alphanumeric1, char as one_char, digit1, hex_digit1, space0, space1},
  combinator::{all_consuming, map, map_res, opt, recognize, value},
  sequence::{pair, preceded, terminated, tuple},
  IResult,
};

use crate::bytecode::Opcode;
use crate::dump::{memory_table, register_line, stack_table};
use crate::engine::{Flow, Machine, Outcome, StopReason};
use crate::numeric::{UWord, Width, Word};
use crate::registers::Register;
use crate::stack::FRAME_RECORD_BYTES;

/// Bytes shown by the `m` command.
pub const MEMORY_WINDOW_BYTES: usize = 64;

const HELP: &str = "\
c                    continue
h                    halt
f                    dump the active stack frame
m [addr]             dump memory at the window, or move the window to addr
p                    cpu summary
r <reg>              print a register
r <reg> [=] <value>  write a register
s                    dump the stack
?                    this help
";

/// Menu state that outlives a single breakpoint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DebuggerState {
  /// Start of the memory window; `None` until first moved, meaning the breakpoint address.
  pub window: Option<UWord>
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
  Continue,
  Halt,
  Frame,
  Memory(Option<UWord>),
  Cpu,
  Register(String, Option<UWord>),
  Stack,
  Help,
}

// region Command parsing

fn number(input: &str) -> IResult<&str, UWord> {
  alt((
    map_res(
      preceded(tag_no_case("0x"), hex_digit1),
      |digits: &str| UWord::from_str_radix(digits, 16)
    ),
    map_res(
      recognize(pair(opt(one_char('-')), digit1)),
      |digits: &str| digits.parse::<UWord>().or_else(|_| digits.parse::<Word>().map(|v| v as UWord))
    ),
  ))(input)
}

fn register_command(input: &str) -> IResult<&str, Command> {
  let assignment = preceded(tuple((space0, opt(one_char('=')), space0)), number);
  map(
    preceded(pair(one_char('r'), space1), pair(alphanumeric1, opt(assignment))),
    |(name, value): (&str, Option<UWord>)| Command::Register(name.to_string(), value)
  )(input)
}

fn command(input: &str) -> IResult<&str, Command> {
  alt((
    register_command,
    map(preceded(one_char('m'), opt(preceded(space1, number))), Command::Memory),
    value(Command::Continue, one_char('c')),
    value(Command::Halt,     one_char('h')),
    value(Command::Frame,    one_char('f')),
    value(Command::Cpu,      one_char('p')),
    value(Command::Stack,    one_char('s')),
    value(Command::Help,     one_char('?')),
  ))(input)
}

/// Parses one menu line. Surrounding whitespace is ignored.
pub fn parse_command(line: &str) -> Option<Command> {
  all_consuming(terminated(command, space0))(line.trim_start())
    .ok()
    .map(|(_, command)| command)
}

/// Resolves a register by name (`sp`, `cmp`, `R2`) or by index.
pub fn resolve_register(name: &str) -> Result<Register, String> {
  if let Ok(register) = Register::from_str(name) {
    return Ok(register);
  }
  name
    .parse::<UWord>()
    .map_err(|_| format!("unknown register '{}'", name))
    .and_then(|index| Register::from_index(index).map_err(|fault| fault.to_string()))
}

// endregion

impl<R: BufRead, W: Write> Machine<R, W> {

  /// Runs the menu until the user continues or halts.
  pub(crate) fn breakpoint(&mut self) -> Outcome {
    let at = self.fetched_at;
    tracing::debug!(address = at, "breakpoint");

    loop {
      self.console.write_str(&format!("break @ {:#x} > ", at))?;
      let line = match self.console.read_line()? {
        Some(line) => line,
        None       => {
          self.console.write_str("\n")?;
          return Ok(Flow::Continue);
        }
      };

      let text = match parse_command(&line) {
        Some(Command::Continue) => return Ok(Flow::Continue),
        Some(Command::Halt)     => return Ok(Flow::Stop(StopReason::DebuggerHalt)),
        Some(Command::Help)     => HELP.to_string(),
        Some(Command::Frame)    => self.frame_dump(),
        Some(Command::Stack)    => {
          let sp = self.registers.get(Register::Sp);
          stack_table(&self.registers, &self.memory, sp, self.memory.end()).to_string()
        }
        Some(Command::Memory(address)) => {
          if address.is_some() {
            self.debugger.window = address;
          }
          let start = self.debugger.window.unwrap_or(at);
          memory_table(&self.memory, start, MEMORY_WINDOW_BYTES, Some(at)).to_string()
        }
        Some(Command::Cpu)      => self.cpu_summary(),
        Some(Command::Register(name, new_value)) => match resolve_register(&name) {
          Ok(register) => {
            if let Some(new_value) = new_value {
              self.registers.set(register, new_value);
            }
            format!("{}\n", register_line(&self.registers, register))
          }
          Err(message) => format!("{}\n", message)
        },
        None => format!("unknown command '{}', ? for help\n", line.trim())
      };
      self.console.write_str(&text)?;
    }
  }

  /// The current activation record, from `sp` up to the end of the record at `fp`.
  fn frame_dump(&self) -> String {
    let sp  = self.registers.get(Register::Sp);
    let top = self.registers
      .get(Register::Fp)
      .saturating_add(FRAME_RECORD_BYTES)
      .min(self.memory.end());
    stack_table(&self.registers, &self.memory, sp, top).to_string()
  }

  fn cpu_summary(&self) -> String {
    let at     = self.fetched_at;
    let opcode = match self.memory.read_uint(at, Width::W16) {
      Ok(bits) => match Opcode::try_from(bits as u16) {
        Ok(opcode) => opcode.to_string(),
        Err(_)     => format!("unknown {:#06x}", bits)
      },
      Err(fault) => fault.to_string()
    };
    let used = self.memory.end().saturating_sub(self.registers.get(Register::Sp));

    let mut lines = vec![
      format!("iteration {}, opcode at ip: {}", self.iterations(), opcode),
      format!("stack: {} of {} bytes used", used, self.registers.get(Register::Ssize)),
    ];
    for register in [
      Register::Ip, Register::Sp, Register::Fp, Register::Ssize,
      Register::Flag, Register::Err, Register::Ccr,
    ].iter() {
      lines.push(register_line(&self.registers, *register));
    }
    lines.join("\n") + "\n"
  }
}
