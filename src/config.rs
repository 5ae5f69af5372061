//! Construction parameters supplied by the host.

use crate::errors::VmError;

pub const DEFAULT_MEMORY_SIZE : usize = 64 * 1024;
pub const DEFAULT_STACK_SIZE  : usize = 4 * 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VmConfig {
  /// Capacity of the memory image in bytes.
  pub memory_size : usize,
  /// Initial value of `ssize`, the maximum number of bytes the stack may hold.
  pub stack_size  : usize,
  /// Stop after this many iterations. `None` runs until halt, exit, or fault.
  pub step_limit  : Option<u64>
}

impl VmConfig {
  pub fn new(memory_size: usize, stack_size: usize) -> VmConfig {
    VmConfig {
      memory_size,
      stack_size,
      step_limit: None
    }
  }

  pub fn with_memory_size(mut self, memory_size: usize) -> VmConfig {
    self.memory_size = memory_size;
    self
  }

  pub fn with_stack_size(mut self, stack_size: usize) -> VmConfig {
    self.stack_size = stack_size;
    self
  }

  pub fn with_step_limit(mut self, step_limit: u64) -> VmConfig {
    self.step_limit = Some(step_limit);
    self
  }

  pub fn validate(&self) -> Result<(), VmError> {
    match self.stack_size > self.memory_size {
      true  => Err(VmError::StackTooLarge{ stack: self.stack_size, memory: self.memory_size }),
      false => Ok(())
    }
  }
}

impl Default for VmConfig {
  fn default() -> Self {
    VmConfig::new(DEFAULT_MEMORY_SIZE, DEFAULT_STACK_SIZE)
  }
}
