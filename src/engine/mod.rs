/*!
  The fetch-execute loop.

  Each iteration reads the opcode at `ip` with a `Cursor`, dispatches to the opcode's
  handler, and lets the handler pull its own operands from the cursor. A handler returns a
  `Flow` on success or a `Trap`; it checks every precondition before its first mutation, so a
  faulting instruction has no effect beyond the recorded `ErrorSignal`.

  After the handler returns, the signal in `err` is consulted exactly once. A non-zero
  signal halts the machine and `ip` keeps pointing at the faulting instruction. Otherwise
  the cursor is committed to `ip`, unless the instruction wrote `ip` itself, in which case
  that write stands.
*/

mod alu;
mod control;
mod moves;
mod output;

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, Stdout, StdinLock, Write};

use prettytable::{row, table};

use crate::bytecode::{Cursor, Opcode, Program};
use crate::config::VmConfig;
use crate::console::Console;
use crate::debugger::DebuggerState;
use crate::dump::{register_table, stack_table, TABLE_DISPLAY_FORMAT};
use crate::errors::VmError;
use crate::fault::{ErrorSignal, Fault};
use crate::memory::MemoryImage;
use crate::numeric::{UWord, Word};
use crate::registers::{Register, RegisterFile};
use crate::stack::StackManager;

pub use alu::{BitOp, FloatOp, IntOp, ShiftOp};
pub use output::{render_bytes, render_word};

/// Why a run ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StopReason {
  /// A `halt` instruction.
  Halted,
  /// The exit syscall.
  Exited,
  /// An instruction left a non-zero `ErrorSignal`.
  Faulted,
  /// Halt chosen from the breakpoint menu.
  DebuggerHalt,
  /// The configured step limit was reached.
  StepLimit,
}

/// What a finished run reports to the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunReport {
  /// Iterations of the fetch-execute loop, including the last one.
  pub iterations : u64,
  /// The final error signal; `ErrorSignal::NONE` for a clean stop.
  pub signal     : ErrorSignal,
  pub stop       : StopReason,
  /// `r1` at the exit syscall, if the program exited that way.
  pub exit_code  : Option<Word>
}

impl RunReport {
  pub fn fault(&self) -> Option<Fault> {
    self.signal.fault()
  }

  pub fn is_clean(&self) -> bool {
    !self.signal.is_set()
  }
}

/// Outcome of a handler that ran to completion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Flow {
  Continue,
  Stop(StopReason),
}

/// Outcome of a handler that could not complete.
#[derive(Debug)]
pub(crate) enum Trap {
  /// A precondition of the instruction failed; nothing was mutated.
  Fault(Fault),
  /// The host console failed.
  Host(io::Error),
}

impl From<Fault> for Trap {
  fn from(fault: Fault) -> Self {
    Trap::Fault(fault)
  }
}

impl From<io::Error> for Trap {
  fn from(error: io::Error) -> Self {
    Trap::Host(error)
  }
}

pub(crate) type Outcome = Result<Flow, Trap>;

/**
  One virtual machine: it exclusively owns its memory and register file for the whole run.
  The console's reader feeds the read syscalls and the breakpoint menu; everything the
  program prints goes to its writer.
*/
pub struct Machine<R, W> {
  pub(crate) memory     : MemoryImage,
  pub(crate) registers  : RegisterFile,
  pub(crate) console    : Console<R, W>,
  pub(crate) debugger   : DebuggerState,
  /// Address of the opcode currently executing.
  pub(crate) fetched_at : UWord,
  pub(crate) exit_code  : Option<Word>,
  config                : VmConfig,
  iterations            : u64,
  stop                  : Option<StopReason>
}

impl Machine<StdinLock<'static>, Stdout> {
  /// A machine wired to the process's standard input and output.
  pub fn with_stdio(config: VmConfig, program: &Program) -> Result<Self, VmError> {
    Machine::new(config, program, io::stdin().lock(), io::stdout())
  }
}

impl<R: BufRead, W: Write> Machine<R, W> {

  // region Construction and accessors

  pub fn new(config: VmConfig, program: &Program, reader: R, writer: W) -> Result<Self, VmError> {
    config.validate()?;

    let mut memory = MemoryImage::new(config.memory_size);
    memory
      .load(&program.body)
      .map_err(|_| VmError::ProgramTooLarge {
        length   : program.body.len(),
        capacity : config.memory_size
      })?;

    let mut registers = RegisterFile::new();
    registers.set(Register::Ip,    program.entry);
    registers.set(Register::Sp,    memory.end());
    registers.set(Register::Fp,    memory.end());
    registers.set(Register::Ssize, config.stack_size as UWord);
    registers.take_ip_written();

    Ok(Machine {
      memory,
      registers,
      console    : Console::new(reader, writer),
      debugger   : DebuggerState::default(),
      fetched_at : program.entry,
      exit_code  : None,
      config,
      iterations : 0,
      stop       : None
    })
  }

  pub fn registers(&self) -> &RegisterFile {
    &self.registers
  }

  pub fn registers_mut(&mut self) -> &mut RegisterFile {
    &mut self.registers
  }

  pub fn memory(&self) -> &MemoryImage {
    &self.memory
  }

  pub fn memory_mut(&mut self) -> &mut MemoryImage {
    &mut self.memory
  }

  pub fn console(&self) -> &Console<R, W> {
    &self.console
  }

  pub fn into_console(self) -> Console<R, W> {
    self.console
  }

  pub fn config(&self) -> &VmConfig {
    &self.config
  }

  pub fn iterations(&self) -> u64 {
    self.iterations
  }

  pub fn is_halted(&self) -> bool {
    self.stop.is_some()
  }

  pub fn signal(&self) -> ErrorSignal {
    ErrorSignal::read(&self.registers)
  }

  pub(crate) fn stack(&mut self) -> StackManager<'_> {
    StackManager::new(&mut self.registers, &mut self.memory)
  }

  // endregion

  // region The fetch-execute loop

  /// Runs until the machine halts, exits, faults, or reaches the step limit.
  pub fn run(&mut self) -> Result<RunReport, VmError> {
    let stop = loop {
      if let Some(reason) = self.step()? {
        break reason;
      }
    };
    self.console.flush()?;
    Ok(self.report(stop))
  }

  /**
    Executes one instruction. Returns the stop reason once the machine has stopped; calling
    `step` again after that does nothing and returns the same reason.
  */
  pub fn step(&mut self) -> Result<Option<StopReason>, VmError> {
    if let Some(reason) = self.stop {
      return Ok(Some(reason));
    }
    if let Some(limit) = self.config.step_limit {
      if self.iterations >= limit {
        return Ok(Some(self.finish(StopReason::StepLimit)));
      }
    }

    self.iterations += 1;
    let ip = self.registers.get(Register::Ip);
    let mut cursor = Cursor::new(ip);
    self.fetched_at = ip;
    self.registers.take_ip_written();

    let flow = match self.execute(&mut cursor) {
      Ok(flow)                => flow,
      Err(Trap::Fault(fault)) => {
        tracing::debug!(ip, %fault, "fault");
        ErrorSignal::from(fault).store(&mut self.registers);
        Flow::Continue
      }
      Err(Trap::Host(error))  => return Err(VmError::Io(error))
    };

    let ip_written = self.registers.take_ip_written();
    if self.signal().is_set() {
      return Ok(Some(self.finish(StopReason::Faulted)));
    }
    if !ip_written {
      self.registers.set(Register::Ip, cursor.position());
      self.registers.take_ip_written();
    }

    #[cfg(feature = "trace_computation")] { eprintln!("{}", self); }

    match flow {
      Flow::Continue     => Ok(None),
      Flow::Stop(reason) => Ok(Some(self.finish(reason)))
    }
  }

  fn finish(&mut self, reason: StopReason) -> StopReason {
    tracing::debug!(?reason, iterations = self.iterations, "machine stopped");
    self.stop = Some(reason);
    reason
  }

  pub fn report(&self, stop: StopReason) -> RunReport {
    let signal = self.signal();
    RunReport {
      iterations : self.iterations,
      signal     : match signal.is_set() { true => signal, false => ErrorSignal::NONE },
      stop,
      exit_code  : self.exit_code
    }
  }

  /// Decodes the opcode under the cursor and runs its handler.
  fn execute(&mut self, cursor: &mut Cursor) -> Outcome {
    let bits   = cursor.opcode_bits(&self.memory)?;
    let opcode = Opcode::try_from(bits).map_err(|_| Fault::UnknownInstruction(bits))?;
    tracing::trace!(ip = self.fetched_at, %opcode, "execute");

    match opcode {
      Opcode::Nop     => Ok(Flow::Continue),
      Opcode::Halt    => Ok(Flow::Stop(StopReason::Halted)),
      Opcode::Break   => self.breakpoint(),
      Opcode::Syscall => self.syscall(),

      | Opcode::MovLitReg8 | Opcode::MovLitReg16
      | Opcode::MovLitReg32 | Opcode::MovLitReg64   => self.mov_lit_reg(cursor, opcode.width()),
      | Opcode::MovLitMem8 | Opcode::MovLitMem16
      | Opcode::MovLitMem32 | Opcode::MovLitMem64   => self.mov_lit_mem(cursor, opcode.width()),
      | Opcode::MovRegReg8 | Opcode::MovRegReg16
      | Opcode::MovRegReg32 | Opcode::MovRegReg64   => self.mov_reg_reg(cursor, opcode.width()),
      | Opcode::MovRegMem8 | Opcode::MovRegMem16
      | Opcode::MovRegMem32 | Opcode::MovRegMem64   => self.mov_reg_mem(cursor, opcode.width()),
      | Opcode::MovMemReg8 | Opcode::MovMemReg16
      | Opcode::MovMemReg32 | Opcode::MovMemReg64   => self.mov_mem_reg(cursor, opcode.width()),
      | Opcode::MovMemMem8 | Opcode::MovMemMem16
      | Opcode::MovMemMem32 | Opcode::MovMemMem64   => self.mov_mem_mem(cursor, opcode.width()),
      | Opcode::MovIndReg8 | Opcode::MovIndReg16
      | Opcode::MovIndReg32 | Opcode::MovIndReg64   => self.mov_ind_reg(cursor, opcode.width()),
      | Opcode::MovRegInd8 | Opcode::MovRegInd16
      | Opcode::MovRegInd32 | Opcode::MovRegInd64   => self.mov_reg_ind(cursor, opcode.width()),
      | Opcode::MovLitInd8 | Opcode::MovLitInd16
      | Opcode::MovLitInd32 | Opcode::MovLitInd64   => self.mov_lit_ind(cursor, opcode.width()),

      Opcode::AndLit => self.bitwise_lit(cursor, BitOp::And),
      Opcode::AndReg => self.bitwise_reg(cursor, BitOp::And),
      Opcode::AndMem => self.bitwise_mem(cursor, BitOp::And),
      Opcode::OrLit  => self.bitwise_lit(cursor, BitOp::Or),
      Opcode::OrReg  => self.bitwise_reg(cursor, BitOp::Or),
      Opcode::OrMem  => self.bitwise_mem(cursor, BitOp::Or),
      Opcode::XorLit => self.bitwise_lit(cursor, BitOp::Xor),
      Opcode::XorReg => self.bitwise_reg(cursor, BitOp::Xor),
      Opcode::XorMem => self.bitwise_mem(cursor, BitOp::Xor),
      Opcode::NotReg => self.not_reg(cursor),
      Opcode::NotMem => self.not_mem(cursor),

      Opcode::AddLit => self.integer_lit(cursor, IntOp::Add),
      Opcode::AddReg => self.integer_reg(cursor, IntOp::Add),
      Opcode::AddMem => self.integer_mem(cursor, IntOp::Add),
      Opcode::SubLit => self.integer_lit(cursor, IntOp::Sub),
      Opcode::SubReg => self.integer_reg(cursor, IntOp::Sub),
      Opcode::SubMem => self.integer_mem(cursor, IntOp::Sub),
      Opcode::MulLit => self.integer_lit(cursor, IntOp::Mul),
      Opcode::MulReg => self.integer_reg(cursor, IntOp::Mul),
      Opcode::DivLit => self.integer_lit(cursor, IntOp::Div),
      Opcode::DivReg => self.integer_reg(cursor, IntOp::Div),
      Opcode::Fadd32 => self.float32(cursor, FloatOp::Add),
      Opcode::Fsub32 => self.float32(cursor, FloatOp::Sub),
      Opcode::Fmul32 => self.float32(cursor, FloatOp::Mul),
      Opcode::Fdiv32 => self.float32(cursor, FloatOp::Div),
      Opcode::Fneg32 => self.fneg32(cursor),
      Opcode::Fadd64 => self.float64(cursor, FloatOp::Add),
      Opcode::Fsub64 => self.float64(cursor, FloatOp::Sub),
      Opcode::Fmul64 => self.float64(cursor, FloatOp::Mul),
      Opcode::Fdiv64 => self.float64(cursor, FloatOp::Div),
      Opcode::Fneg64 => self.fneg64(cursor),

      Opcode::ShlLit => self.shift_lit(cursor, ShiftOp::Left),
      Opcode::ShlReg => self.shift_reg(cursor, ShiftOp::Left),
      Opcode::ShrLit => self.shift_lit(cursor, ShiftOp::Right),
      Opcode::ShrReg => self.shift_reg(cursor, ShiftOp::Right),
      Opcode::SarLit => self.shift_lit(cursor, ShiftOp::Arithmetic),
      Opcode::SarReg => self.shift_reg(cursor, ShiftOp::Arithmetic),

      | Opcode::I8ToI16  | Opcode::I8ToI32  | Opcode::I8ToI64
      | Opcode::I16ToI8  | Opcode::I16ToI32 | Opcode::I16ToI64
      | Opcode::I32ToI8  | Opcode::I32ToI16 | Opcode::I32ToI64
      | Opcode::I64ToI8  | Opcode::I64ToI16 | Opcode::I64ToI32
      | Opcode::I32ToF32 | Opcode::I32ToF64 | Opcode::I64ToF32 | Opcode::I64ToF64
      | Opcode::F32ToI32 | Opcode::F32ToI64 | Opcode::F64ToI32 | Opcode::F64ToI64
      | Opcode::F32ToF64 | Opcode::F64ToF32  => self.convert(cursor, opcode),

      Opcode::CmpReg    => self.cmp_reg(cursor),
      Opcode::CmpLit    => self.cmp_lit(cursor),
      Opcode::CmpLitLit => self.cmp_lit_lit(cursor),
      Opcode::CmpMem    => self.cmp_mem(cursor),

      Opcode::Jmp    => self.jmp(cursor),
      Opcode::JmpReg => self.jmp_reg(cursor),
      | Opcode::Jeq | Opcode::Jne | Opcode::Jgt
      | Opcode::Jge | Opcode::Jlt | Opcode::Jle    => self.jump_if(cursor, opcode),

      | Opcode::PushLit8 | Opcode::PushLit16
      | Opcode::PushLit32 | Opcode::PushLit64 => self.push_lit(cursor, opcode.width()),
      | Opcode::PushMem8 | Opcode::PushMem16
      | Opcode::PushMem32 | Opcode::PushMem64 => self.push_mem(cursor, opcode.width()),
      | Opcode::PushReg8 | Opcode::PushReg16
      | Opcode::PushReg32 | Opcode::PushReg64 => self.push_reg(cursor, opcode.width()),
      | Opcode::PushInd8 | Opcode::PushInd16
      | Opcode::PushInd32 | Opcode::PushInd64 => self.push_ind(cursor, opcode.width()),
      | Opcode::PopReg8 | Opcode::PopReg16
      | Opcode::PopReg32 | Opcode::PopReg64   => self.pop_reg(cursor, opcode.width()),
      | Opcode::PopMem8 | Opcode::PopMem16
      | Opcode::PopMem32 | Opcode::PopMem64   => self.pop_mem(cursor, opcode.width()),
      | Opcode::PopInd8 | Opcode::PopInd16
      | Opcode::PopInd32 | Opcode::PopInd64   => self.pop_ind(cursor, opcode.width()),
      Opcode::PushRaw => self.push_raw(cursor),
      Opcode::PopRaw  => self.pop_raw(cursor),

      Opcode::Call    => self.call(cursor),
      Opcode::CallReg => self.call_reg(cursor),
      Opcode::Ret     => self.ret(cursor),

      | Opcode::PrintRegHex | Opcode::PrintRegBin
      | Opcode::PrintRegDec | Opcode::PrintRegText => self.print_reg(cursor, opcode),
      | Opcode::PrintMemHex | Opcode::PrintMemBin
      | Opcode::PrintMemDec | Opcode::PrintMemText => self.print_mem(cursor, opcode),
    }
  }

  // endregion
}

impl<R: BufRead, W: Write> Display for Machine<R, W> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let sp          = self.registers.get(Register::Sp);
    let r_table     = register_table(&self.registers, None);
    let s_table     = stack_table(&self.registers, &self.memory, sp, self.memory.end());

    let mut combined_table = table!([r_table, s_table]);
    combined_table.set_titles(row![ub->"Registers", ub->"Stack"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let status = match self.stop {
      Some(reason) => format!("Stopped: {:?}.", reason),
      None         => "Running.".to_string()
    };

    write!(f, "Iteration {}\t{}\n{}", self.iterations, status, combined_table)
  }
}
