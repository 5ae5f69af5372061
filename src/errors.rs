use thiserror::Error;

/// Errors the host sees from constructing or driving a machine. Faults raised by the
/// program itself are not errors at this level; they end the run and are reported in
/// `RunReport::signal`.
#[derive(Debug, Error)]
pub enum VmError {
  /// The program image is shorter than the entry address header.
  #[error("program image is {0} bytes, too short for the 8 byte entry header")]
  MissingHeader(usize),
  /// The program body does not fit in memory.
  #[error("program body of {length} bytes does not fit in {capacity} bytes of memory")]
  ProgramTooLarge { length: usize, capacity: usize },
  /// The stack cannot be larger than memory.
  #[error("stack size {stack} exceeds memory size {memory}")]
  StackTooLarge { stack: usize, memory: usize },
  /// Reading from or writing to the host console failed.
  #[error("host i/o error: {0}")]
  Io(#[from] std::io::Error),
}
