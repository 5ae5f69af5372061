/*!
  A process-level register virtual machine.

  A `Machine` owns a flat `MemoryImage`, a sixteen slot `RegisterFile`, and a `Console`. It
  runs a bytecode `Program` one instruction per iteration until the program halts, exits
  through the syscall gateway, faults, or the host's step limit is reached. Faults are not
  Rust errors: they are recorded as an `ErrorSignal` in the `err` and `flag` registers and
  reported in the `RunReport`. `VmError` is reserved for the host's side, such as a program
  that does not fit or a failing console.

  ```
  use std::io::Cursor as Input;
  use regvm::{Emitter, Machine, Opcode, Register, VmConfig, Width};

  let mut code = Emitter::new();
  code.op(Opcode::MovLitReg64).reg(Register::R1).lit(Width::W64, 42)
      .op(Opcode::AddLit).reg(Register::R1).lit(Width::W64, 8)
      .op(Opcode::PrintRegDec).reg(Register::R1)
      .op(Opcode::Halt);

  let config  = VmConfig::default();
  let mut vm  = Machine::new(config, &code.program(0), Input::new(Vec::new()), Vec::new()).unwrap();
  let report  = vm.run().unwrap();
  assert!(report.is_clean());
  assert_eq!(vm.console().writer(), b"50");
  ```
*/

pub mod bytecode;
pub mod config;
pub mod console;
pub mod debugger;
pub mod dump;
pub mod engine;
pub mod errors;
pub mod fault;
pub mod memory;
pub mod numeric;
pub mod registers;
pub mod stack;
pub mod syscall;

pub use bytecode::{Condition, Cursor, Emitter, Opcode, PrintFormat, Program, HEADER_BYTES};
pub use config::VmConfig;
pub use console::Console;
pub use engine::{Machine, RunReport, StopReason};
pub use errors::VmError;
pub use fault::{ErrorSignal, Fault};
pub use memory::MemoryImage;
pub use numeric::{NumType, UWord, Width, Word};
pub use registers::{Register, RegisterFile};
pub use stack::{StackManager, FRAME_RECORD_BYTES};
pub use syscall::Syscall;
