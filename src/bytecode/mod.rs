/*!

  The VM uses a 64 bit little-endian word and byte addresses. An instruction is a 16 bit
  opcode followed directly by its operand fields; there is no padding or alignment, and no
  instruction object is ever materialized. Operand fields are:

    Register:   8 bits, an index into the register file
    Literal:    8, 16, 32, or 64 bits, as selected by the opcode
    Address:   64 bits
    Count:     64 bits, a byte count for the memory-range forms
    Amount:     8 bits, a literal shift amount

  The opcode alone determines which fields follow and in what order, so an instruction's
  length is only known once it has been decoded.

*/

mod binary;
mod opcode;

pub use binary::{Cursor, Emitter, Program, HEADER_BYTES};
pub use opcode::{Condition, Opcode, PrintFormat};
