use std::io::Cursor as Input;

use regvm::numeric::{f32_to_bits, f64_to_bits};
use regvm::{
  Emitter, ErrorSignal, Fault, Machine, Opcode, Register, StopReason, Syscall, UWord, VmConfig,
  VmError, Width, Word, FRAME_RECORD_BYTES,
};

type TestMachine = Machine<Input<Vec<u8>>, Vec<u8>>;

fn machine(config: VmConfig, code: &Emitter, input: &str) -> TestMachine {
  Machine::new(config, &code.program(0), Input::new(input.as_bytes().to_vec()), Vec::new()).unwrap()
}

fn output(vm: &TestMachine) -> String {
  String::from_utf8_lossy(vm.console().writer()).into_owned()
}

fn config() -> VmConfig {
  VmConfig::new(1024, 256)
}

fn mov(code: &mut Emitter, register: Register, value: UWord) {
  code.op(Opcode::MovLitReg64).reg(register).word(value);
}

fn syscall(code: &mut Emitter, call: Syscall) {
  mov(code, Register::R0, call.into());
  code.op(Opcode::Syscall);
}

// region Scenarios

#[test]
fn add_and_print(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 42);
  mov(&mut code, Register::R2, 8);
  code.op(Opcode::AddReg).reg(Register::R1).reg(Register::R2);
  code.op(Opcode::PrintRegDec).reg(Register::R1);
  code.op(Opcode::Halt);

  let mut vm = machine(VmConfig::new(64, 16), &code, "");
  let report = vm.run().unwrap();

  assert_eq!(report.iterations, 5);
  assert_eq!(report.signal, ErrorSignal::NONE);
  assert_eq!(report.stop, StopReason::Halted);
  assert_eq!(output(&vm), "50");
}

#[test]
fn one_byte_stack(){
  let mut code = Emitter::new();
  code.op(Opcode::PushLit8).lit(Width::W8, 0xFF);
  code.op(Opcode::PopReg8).reg(Register::R1);
  code.op(Opcode::Halt);

  let mut vm = machine(VmConfig::new(64, 1), &code, "");
  let report = vm.run().unwrap();

  assert!(report.is_clean());
  assert_eq!(vm.registers().get(Register::R1), 0xFF);
  assert_eq!(vm.registers().get(Register::Sp), 64);
}

#[test]
fn one_byte_stack_overflows_on_second_push(){
  let mut code = Emitter::new();
  code.op(Opcode::PushLit8).lit(Width::W8, 1);
  code.op(Opcode::PushLit8).lit(Width::W8, 2);
  code.op(Opcode::Halt);

  let mut vm = machine(VmConfig::new(64, 1), &code, "");
  let report = vm.run().unwrap();

  assert_eq!(report.fault(), Some(Fault::StackOverflow(62)));
  assert_eq!(report.iterations, 2);
  assert_eq!(vm.registers().get(Register::Sp), 63);
}

#[test]
fn store_out_of_bounds(){
  let mut code = Emitter::new();
  code.op(Opcode::MovLitMem32).word(1000).lit(Width::W32, 0xFFFF_FFFF);
  code.op(Opcode::Halt);

  let mut vm = machine(VmConfig::new(512, 64), &code, "");
  let report = vm.run().unwrap();

  assert_eq!(report.iterations, 1);
  assert_eq!(report.stop, StopReason::Faulted);
  assert_eq!(report.fault(), Some(Fault::MemoryOutOfBounds(1000)));
  assert_eq!(vm.registers().get(Register::Err), 1);
  assert_eq!(vm.registers().get(Register::Flag), 1000);
  assert_eq!(vm.registers().get(Register::Ip), 0);
}

#[test]
fn unknown_opcode(){
  let mut code = Emitter::new();
  code.raw_opcode(0xBEEF);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();

  assert_eq!(report.iterations, 1);
  assert_eq!(report.fault(), Some(Fault::UnknownInstruction(0xBEEF)));
  assert_eq!(report.signal, ErrorSignal{ code: 3, aux: 0xBEEF });
}

#[test]
fn nested_calls_restore_caller_registers(){
  let saved = Register::general_purpose();
  let mut code = Emitter::new();
  for (i, register) in saved.iter().enumerate() {
    mov(&mut code, *register, 10 + i as UWord);
  }
  code.op(Opcode::Call);
  let call_f = code.position();
  code.word(0);
  let after_f = code.position();
  code.op(Opcode::Halt);

  let f = code.position();
  for (i, register) in saved.iter().enumerate() {
    mov(&mut code, *register, 20 + i as UWord);
  }
  code.op(Opcode::Call);
  let call_g = code.position();
  code.word(0);
  for (i, register) in saved.iter().enumerate() {
    code.op(Opcode::MovRegMem64).word(0x200 + 8 * i as UWord).reg(*register);
  }
  code.op(Opcode::Ret);

  let g = code.position();
  for register in saved.iter() {
    mov(&mut code, *register, 99);
  }
  code.op(Opcode::Ret);
  code.patch_word(call_f, f).patch_word(call_g, g);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();

  assert!(report.is_clean());
  assert_eq!(report.iterations, 25);
  assert_eq!(vm.registers().get(Register::Ip), after_f + 2);
  assert_eq!(vm.registers().general_purpose(), [10, 11, 12, 13, 14]);
  for i in 0..saved.len() as UWord {
    assert_eq!(vm.memory().read_uint(0x200 + 8 * i, Width::W64), Ok(20 + i));
  }
  assert_eq!(vm.registers().get(Register::Sp), 1024);
  assert_eq!(vm.registers().get(Register::Fp), 1024);
}

// endregion

// region Control flow

#[test]
fn counting_loop(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 0);
  let top = code.position();
  code.op(Opcode::AddLit).reg(Register::R1).word(1);
  code.op(Opcode::CmpLit).reg(Register::R1).word(5);
  code.op(Opcode::Jlt).word(top);
  code.op(Opcode::PrintRegDec).reg(Register::R1);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();

  assert_eq!(report.iterations, 1 + 5 * 3 + 2);
  assert_eq!(output(&vm), "5");
}

#[test]
fn untaken_branch_skips_its_operand(){
  let mut code = Emitter::new();
  code.op(Opcode::CmpLitLit).word(1).word(2);
  code.op(Opcode::Jeq).word(0);
  code.op(Opcode::PrintRegDec).reg(Register::Flag);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.run().unwrap();
  assert_eq!(output(&vm), "-1");
}

#[test]
fn writing_ip_jumps(){
  let mut code = Emitter::new();
  code.op(Opcode::MovLitReg64).reg(Register::Ip);
  let slot = code.position();
  code.word(0);
  code.op(Opcode::PrintRegDec).reg(Register::R1);
  let target = code.position();
  code.op(Opcode::Halt);
  code.patch_word(slot, target);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();
  assert_eq!(report.iterations, 2);
  assert_eq!(output(&vm), "");
}

#[test]
fn step_limit(){
  let mut code = Emitter::new();
  code.op(Opcode::Jmp).word(0);

  let mut vm = machine(config().with_step_limit(10), &code, "");
  let report = vm.run().unwrap();

  assert_eq!(report.stop, StopReason::StepLimit);
  assert_eq!(report.iterations, 10);
  assert!(report.is_clean());
  assert_eq!(vm.step().unwrap(), Some(StopReason::StepLimit));
}

#[test]
fn runaway_recursion_overflows(){
  let mut code = Emitter::new();
  code.op(Opcode::Call).word(0);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();

  let depth = 256 / FRAME_RECORD_BYTES;
  assert_eq!(report.iterations, depth + 1);
  assert_eq!(report.fault(), Some(Fault::StackOverflow(1024 - (depth + 1) * FRAME_RECORD_BYTES)));
  assert_eq!(vm.registers().get(Register::Sp), 1024 - depth * FRAME_RECORD_BYTES);
}

#[test]
fn ret_discards_callee_locals(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 11);
  code.op(Opcode::Call);
  let call_f = code.position();
  code.word(0);
  code.op(Opcode::PrintRegDec).reg(Register::R1);
  code.op(Opcode::Halt);

  let f = code.position();
  code.op(Opcode::PushLit64).lit(Width::W64, 7);
  code.op(Opcode::PushLit8).lit(Width::W8, 3);
  mov(&mut code, Register::R1, 99);
  code.op(Opcode::Ret);
  code.patch_word(call_f, f);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();

  assert!(report.is_clean());
  assert_eq!(report.stop, StopReason::Halted);
  assert_eq!(report.iterations, 8);
  assert_eq!(output(&vm), "11");
  assert_eq!(vm.registers().get(Register::Sp), 1024);
  assert_eq!(vm.registers().get(Register::Fp), 1024);
}

#[test]
fn jumping_and_calling_through_registers(){
  let mut code = Emitter::new();
  code.op(Opcode::MovLitReg64).reg(Register::R3);
  let skip_slot = code.position();
  code.word(0);
  code.op(Opcode::MovLitReg64).reg(Register::R2);
  let f_slot = code.position();
  code.word(0);
  code.op(Opcode::JmpReg).reg(Register::R3);
  code.op(Opcode::PrintRegDec).reg(Register::R3);

  let skip = code.position();
  code.op(Opcode::CallReg).reg(Register::R2);
  code.op(Opcode::PrintRegDec).reg(Register::R1);
  code.op(Opcode::Halt);

  let f = code.position();
  mov(&mut code, Register::R1, 5);
  code.op(Opcode::PrintRegDec).reg(Register::R1);
  code.op(Opcode::Ret);
  code.patch_word(skip_slot, skip).patch_word(f_slot, f);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();

  assert!(report.is_clean());
  assert_eq!(output(&vm), "50");
  assert_eq!(vm.registers().get(Register::Sp), 1024);
}

#[test]
fn ret_with_fp_outside_the_stack_underflows(){
  let mut code = Emitter::new();
  mov(&mut code, Register::Fp, 16);
  code.op(Opcode::Ret);

  let mut vm = machine(config(), &code, "");
  assert_eq!(vm.run().unwrap().fault(), Some(Fault::StackUnderflow));
  assert_eq!(vm.registers().get(Register::Sp), 1024);
}

#[test]
fn ret_without_frame_underflows(){
  let mut code = Emitter::new();
  code.op(Opcode::Ret);

  let mut vm = machine(config(), &code, "");
  assert_eq!(vm.run().unwrap().fault(), Some(Fault::StackUnderflow));
}

// endregion

// region Data and arithmetic

#[test]
fn narrow_moves_merge(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 0xAAAA_AAAA_AAAA_AAAA);
  code.op(Opcode::MovLitReg8).reg(Register::R1).lit(Width::W8, 0x11);
  code.op(Opcode::MovRegMem16).word(0x300).reg(Register::R1);
  code.op(Opcode::MovMemReg32).reg(Register::R2).word(0x300);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.run().unwrap();
  assert_eq!(vm.registers().get(Register::R1), 0xAAAA_AAAA_AAAA_AA11);
  assert_eq!(vm.memory().read(0x300, 3).unwrap(), &[0x11, 0xAA, 0x00]);
  assert_eq!(vm.registers().get(Register::R2), 0xAA11);
}

#[test]
fn invalid_register_changes_nothing(){
  let mut code = Emitter::new();
  code.op(Opcode::MovLitReg64).raw_reg(16).word(7);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();
  assert_eq!(report.fault(), Some(Fault::InvalidRegister(16)));
  assert_eq!(vm.registers().general_purpose(), [0; 5]);
}

#[test]
fn division_and_remainder(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, -17i64 as UWord);
  code.op(Opcode::DivLit).reg(Register::R1).word(5);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  assert!(vm.run().unwrap().is_clean());
  assert_eq!(vm.registers().get_signed(Register::R1), -3);
  assert_eq!(vm.registers().get_signed(Register::Flag), -2);
}

#[test]
fn division_by_zero_reports_the_instruction(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 17);
  mov(&mut code, Register::R2, 0);
  let at = code.position();
  code.op(Opcode::DivReg).reg(Register::R1).reg(Register::R2);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();
  assert_eq!(report.fault(), Some(Fault::DivisionByZero(at)));
  assert_eq!(vm.registers().get(Register::R1), 17);
  assert_eq!(vm.registers().get(Register::Ip), at);
}

#[test]
fn overflow_sets_condition_codes(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, Word::MAX as UWord);
  code.op(Opcode::AddLit).reg(Register::R1).word(1);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.run().unwrap();
  assert_eq!(vm.registers().get_signed(Register::R1), Word::MIN);
  let ccr = vm.registers().get(Register::Ccr);
  assert_eq!(ccr & regvm::registers::ccr::OVERFLOW, regvm::registers::ccr::OVERFLOW);
  assert_eq!(ccr & regvm::registers::ccr::NEGATIVE, regvm::registers::ccr::NEGATIVE);
  assert_eq!(ccr & regvm::registers::ccr::CARRY, 0);
}

#[test]
fn multi_byte_add_carries_into_flag(){
  let mut code = Emitter::new();
  code.op(Opcode::AddMem).word(0x300).word(0x310).word(2);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.memory_mut().write(0x300, &[0xFF, 0xFF]).unwrap();
  vm.memory_mut().write(0x310, &[0x01, 0x00]).unwrap();
  vm.run().unwrap();
  assert_eq!(vm.memory().read(0x300, 2).unwrap(), &[0x00, 0x00]);
  assert_eq!(vm.registers().get(Register::Flag), 1);
}

#[test]
fn float_arithmetic_and_conversion(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, -3i64 as UWord);
  code.op(Opcode::I64ToF64).reg(Register::R1);
  mov(&mut code, Register::R2, f64_to_bits(0.5));
  code.op(Opcode::Fmul64).reg(Register::R1).reg(Register::R2);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.run().unwrap();
  assert_eq!(vm.registers().get(Register::R1), f64_to_bits(-1.5));
}

#[test]
fn bitwise_memory_and_not(){
  let mut code = Emitter::new();
  code.op(Opcode::AndMem).word(0x200).word(0x210).word(2);
  code.op(Opcode::OrMem).word(0x202).word(0x210).word(2);
  code.op(Opcode::XorMem).word(0x204).word(0x210).word(2);
  code.op(Opcode::NotMem).word(0x206).word(2);
  mov(&mut code, Register::R1, 0x00FF);
  code.op(Opcode::NotReg).reg(Register::R1);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.memory_mut().write(0x200, &[0x0C, 0xF0, 0x0C, 0xF0, 0x0C, 0xF0, 0x00, 0xFF]).unwrap();
  vm.memory_mut().write(0x210, &[0x0A, 0x0F]).unwrap();
  assert!(vm.run().unwrap().is_clean());
  assert_eq!(
    vm.memory().read(0x200, 8).unwrap(),
    &[0x08, 0x00, 0x0E, 0xFF, 0x06, 0xFF, 0xFF, 0x00]
  );
  assert_eq!(vm.registers().get(Register::R1), 0xFFFF_FFFF_FFFF_FF00);
}

#[test]
fn multi_byte_sub_borrows_into_flag(){
  let mut code = Emitter::new();
  code.op(Opcode::SubMem).word(0x200).word(0x210).word(2);
  code.op(Opcode::MovRegMem64).word(0x220).reg(Register::Flag);
  code.op(Opcode::SubMem).word(0x208).word(0x210).word(2);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.memory_mut().write(0x200, &[0x00, 0x01]).unwrap();
  vm.memory_mut().write(0x210, &[0x01, 0x00]).unwrap();
  vm.run().unwrap();
  assert_eq!(vm.memory().read(0x200, 2).unwrap(), &[0xFF, 0x00]);
  assert_eq!(vm.memory().read_uint(0x220, Width::W64), Ok(0));
  assert_eq!(vm.memory().read(0x208, 2).unwrap(), &[0xFF, 0xFF]);
  assert_eq!(vm.registers().get(Register::Flag), 1);
}

#[test]
fn most_negative_divided_by_minus_one_wraps(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, Word::MIN as UWord);
  code.op(Opcode::DivLit).reg(Register::R1).word(-1i64 as UWord);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  assert!(vm.run().unwrap().is_clean());
  assert_eq!(vm.registers().get_signed(Register::R1), Word::MIN);
  assert_eq!(vm.registers().get(Register::Flag), 0);
}

#[test]
fn register_and_memory_compares(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, -1i64 as UWord);
  mov(&mut code, Register::R2, 1);
  code.op(Opcode::CmpReg).reg(Register::R1).reg(Register::R2);
  code.op(Opcode::MovRegMem64).word(0x200).reg(Register::Flag);
  code.op(Opcode::CmpMem).word(0x210).word(0x218).word(2);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.memory_mut().write(0x210, &[1, 2]).unwrap();
  vm.memory_mut().write(0x218, &[1, 1]).unwrap();
  vm.run().unwrap();
  assert_eq!(vm.memory().read_uint(0x200, Width::W64), Ok(-1i64 as UWord));
  assert_eq!(vm.registers().get_signed(Register::Flag), 1);
}

#[test]
fn memory_and_indirect_moves(){
  let mut code = Emitter::new();
  code.op(Opcode::MovMemMem16).word(0x210).word(0x200);
  mov(&mut code, Register::R1, 0x200);
  code.op(Opcode::MovIndReg32).reg(Register::R2).reg(Register::R1);
  mov(&mut code, Register::R3, 0x220);
  code.op(Opcode::MovRegInd16).reg(Register::R3).reg(Register::R2);
  code.op(Opcode::MovLitInd8).reg(Register::R3).lit(Width::W8, 0x99);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.memory_mut().write(0x200, &[0x11, 0x22, 0x33, 0x44]).unwrap();
  assert!(vm.run().unwrap().is_clean());
  assert_eq!(vm.memory().read(0x210, 3).unwrap(), &[0x11, 0x22, 0x00]);
  assert_eq!(vm.registers().get(Register::R2), 0x4433_2211);
  assert_eq!(vm.memory().read(0x220, 3).unwrap(), &[0x99, 0x22, 0x00]);
}

#[test]
fn single_precision_keeps_the_high_half(){
  let high = 0xFFFF_FFFF_0000_0000;
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, high | f32_to_bits(1.5));
  mov(&mut code, Register::R2, f32_to_bits(2.0));
  code.op(Opcode::Fadd32).reg(Register::R1).reg(Register::R2);
  code.op(Opcode::Fmul32).reg(Register::R1).reg(Register::R2);
  code.op(Opcode::Fsub32).reg(Register::R1).reg(Register::R2);
  code.op(Opcode::Fdiv32).reg(Register::R1).reg(Register::R2);
  code.op(Opcode::Fneg32).reg(Register::R1);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.run().unwrap();
  assert_eq!(vm.registers().get(Register::R1), high | f32_to_bits(-2.5));
}

#[test]
fn double_precision_negation_and_division(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, f64_to_bits(9.0));
  mov(&mut code, Register::R2, f64_to_bits(4.0));
  code.op(Opcode::Fdiv64).reg(Register::R1).reg(Register::R2);
  code.op(Opcode::Fneg64).reg(Register::R1);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.run().unwrap();
  assert_eq!(vm.registers().get(Register::R1), f64_to_bits(-2.25));
}

#[test]
fn logical_and_arithmetic_right_shifts(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, -16i64 as UWord);
  mov(&mut code, Register::R2, -16i64 as UWord);
  code.op(Opcode::ShrLit).reg(Register::R1).lit(Width::W8, 4);
  code.op(Opcode::SarLit).reg(Register::R2).lit(Width::W8, 4);
  mov(&mut code, Register::R3, 2);
  mov(&mut code, Register::R4, -256i64 as UWord);
  code.op(Opcode::SarReg).reg(Register::R4).reg(Register::R3);
  mov(&mut code, Register::R0, 8);
  code.op(Opcode::ShrReg).reg(Register::R0).reg(Register::R3);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.run().unwrap();
  assert_eq!(vm.registers().get(Register::R1), 0x0FFF_FFFF_FFFF_FFFF);
  assert_eq!(vm.registers().get_signed(Register::R2), -1);
  assert_eq!(vm.registers().get_signed(Register::R4), -64);
  assert_eq!(vm.registers().get(Register::R0), 2);
}

#[test]
fn printing_memory_ranges(){
  let mut code = Emitter::new();
  code.op(Opcode::PrintMemHex).word(0x200).word(2);
  code.op(Opcode::PrintMemDec).word(0x200).word(2);
  code.op(Opcode::PrintMemBin).word(0x200).word(1);
  code.op(Opcode::PrintMemText).word(0x200).word(2);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.memory_mut().write(0x200, b"Hi").unwrap();
  assert!(vm.run().unwrap().is_clean());
  assert_eq!(output(&vm), "48 6972 10501001000Hi");
}

#[test]
fn shifts_and_hex_output(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 1);
  code.op(Opcode::ShlLit).reg(Register::R1).lit(Width::W8, 12);
  code.op(Opcode::PrintRegHex).reg(Register::R1);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.run().unwrap();
  assert_eq!(output(&vm), "0x0000000000001000");
}

// endregion

// region Stack

#[test]
fn pushing_and_popping_through_memory(){
  let mut code = Emitter::new();
  code.op(Opcode::PushMem16).word(0x200);
  mov(&mut code, Register::R1, 0x200);
  code.op(Opcode::PushInd8).reg(Register::R1);
  code.op(Opcode::PopMem8).word(0x210);
  mov(&mut code, Register::R2, 0x220);
  code.op(Opcode::PopInd16).reg(Register::R2);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.memory_mut().write(0x200, &[0xAB, 0xCD]).unwrap();
  assert!(vm.run().unwrap().is_clean());
  assert_eq!(vm.memory().read(0x210, 1).unwrap(), &[0xAB]);
  assert_eq!(vm.memory().read(0x220, 2).unwrap(), &[0xAB, 0xCD]);
  assert_eq!(vm.registers().get(Register::Sp), 1024);
}

#[test]
fn raw_stack_space(){
  let mut code = Emitter::new();
  code.op(Opcode::PushRaw).word(16);
  code.op(Opcode::MovRegMem64).word(0x200).reg(Register::Sp);
  code.op(Opcode::PopRaw).word(16);
  code.op(Opcode::PopRaw).word(1);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();
  assert_eq!(vm.memory().read_uint(0x200, Width::W64), Ok(1008));
  assert_eq!(report.fault(), Some(Fault::StackUnderflow));
  assert_eq!(report.iterations, 4);
  assert_eq!(vm.registers().get(Register::Sp), 1024);
}

#[test]
fn pop_to_a_bad_address_leaves_sp(){
  let mut code = Emitter::new();
  code.op(Opcode::PushLit64).lit(Width::W64, 7);
  mov(&mut code, Register::R1, 2000);
  code.op(Opcode::PopInd64).reg(Register::R1);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();
  assert_eq!(report.fault(), Some(Fault::MemoryOutOfBounds(2000)));
  assert_eq!(vm.registers().get(Register::Sp), 1016);
  assert_eq!(vm.memory().read_uint(1016, Width::W64), Ok(7));
}

// endregion

// region Syscalls

#[test]
fn exit_code_is_reported(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 7);
  syscall(&mut code, Syscall::Exit);
  code.op(Opcode::PrintRegDec).reg(Register::R1);

  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();
  assert_eq!(report.stop, StopReason::Exited);
  assert_eq!(report.exit_code, Some(7));
  assert!(report.is_clean());
  assert_eq!(output(&vm), "");
}

#[test]
fn unknown_syscall(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R0, 99);
  code.op(Opcode::Syscall);

  let mut vm = machine(config(), &code, "");
  assert_eq!(vm.run().unwrap().fault(), Some(Fault::UnknownSyscall(99)));
}

#[test]
fn printing_syscalls(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, -5i64 as UWord);
  syscall(&mut code, Syscall::PrintInt);
  mov(&mut code, Register::R1, b' ' as UWord);
  syscall(&mut code, Syscall::PrintChar);
  mov(&mut code, Register::R1, 0x300);
  syscall(&mut code, Syscall::PrintCStr);
  mov(&mut code, Register::R2, 2);
  syscall(&mut code, Syscall::PrintHex);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.memory_mut().write(0x300, b"hi\0").unwrap();
  assert!(vm.run().unwrap().is_clean());
  assert_eq!(output(&vm), "-5 hi68 69");
}

#[test]
fn unterminated_string_faults(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 1020);
  syscall(&mut code, Syscall::PrintCStr);

  let mut vm = machine(config(), &code, "");
  vm.memory_mut().write(1020, b"abcd").unwrap();
  assert_eq!(vm.run().unwrap().fault(), Some(Fault::MemoryOutOfBounds(1020)));
}

#[test]
fn reading_numbers(){
  let mut code = Emitter::new();
  syscall(&mut code, Syscall::ReadInt);
  mov(&mut code, Register::T0, 0);
  code.op(Opcode::AddReg).reg(Register::T0).reg(Register::R1);
  syscall(&mut code, Syscall::ReadHex);
  code.op(Opcode::AddReg).reg(Register::T0).reg(Register::R1);
  syscall(&mut code, Syscall::ReadUint);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "-12\n0x20\nnot a number\n");
  vm.run().unwrap();
  assert_eq!(vm.registers().get(Register::T0), 20);
  assert_eq!(vm.registers().get(Register::R1), 0);
  assert_eq!(vm.registers().get(Register::Flag), 1);
}

#[test]
fn reading_into_a_buffer(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 0x300);
  mov(&mut code, Register::R2, 5);
  syscall(&mut code, Syscall::ReadBuf);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "hello world\n");
  vm.run().unwrap();
  assert_eq!(vm.memory().read(0x300, 6).unwrap(), b"hello\0");
  assert_eq!(vm.registers().get(Register::R3), 5);
  assert_eq!(vm.registers().get(Register::Flag), 0);
}

#[test]
fn buffer_must_fit_in_memory(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 1020);
  mov(&mut code, Register::R2, 16);
  syscall(&mut code, Syscall::ReadBuf);

  let mut vm = machine(config(), &code, "x\n");
  assert_eq!(vm.run().unwrap().fault(), Some(Fault::MemoryOutOfBounds(1020)));
}

#[test]
fn reading_past_end_of_input(){
  let mut code = Emitter::new();
  mov(&mut code, Register::R1, 9);
  syscall(&mut code, Syscall::ReadChar);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "");
  vm.run().unwrap();
  assert_eq!(vm.registers().get(Register::R1), 0);
  assert_eq!(vm.registers().get(Register::Flag), 1);
}

// endregion

// region Breakpoints

fn breakpoint_program() -> (Emitter, UWord) {
  let mut code = Emitter::new();
  code.op(Opcode::Break);
  mov(&mut code, Register::R1, 1);
  let print = code.position();
  code.op(Opcode::PrintRegDec).reg(Register::R1);
  code.op(Opcode::Halt);
  (code, print)
}

#[test]
fn breakpoint_continue(){
  let (code, _) = breakpoint_program();
  let mut vm = machine(config(), &code, "p\nc\n");
  let report = vm.run().unwrap();

  assert_eq!(report.iterations, 4);
  let text = output(&vm);
  assert!(text.starts_with("break @ 0x0 > "));
  assert!(text.contains("ip = 0x0000000000000000"));
  assert!(text.ends_with("1"));
}

#[test]
fn breakpoint_halt(){
  let (code, _) = breakpoint_program();
  let mut vm = machine(config(), &code, "h\n");
  let report = vm.run().unwrap();

  assert_eq!(report.stop, StopReason::DebuggerHalt);
  assert_eq!(report.iterations, 1);
  assert!(report.is_clean());
}

#[test]
fn breakpoint_edits_registers(){
  let (code, print) = breakpoint_program();
  let input = format!("r r1 = 9\nr ip {:#x}\nbogus\nc\n", print);
  let mut vm = machine(config(), &code, &input);
  let report = vm.run().unwrap();

  assert_eq!(report.iterations, 3);
  let text = output(&vm);
  assert!(text.contains("r1 = 0x0000000000000009 (9)"));
  assert!(text.contains("unknown command 'bogus'"));
  assert!(text.ends_with("9"));
}

#[test]
fn breakpoint_at_end_of_input_continues(){
  let (code, _) = breakpoint_program();
  let mut vm = machine(config(), &code, "");
  let report = vm.run().unwrap();
  assert_eq!(report.stop, StopReason::Halted);
  assert!(output(&vm).ends_with("1"));
}

#[test]
fn memory_window_persists(){
  let mut code = Emitter::new();
  code.op(Opcode::Break);
  code.op(Opcode::Break);
  code.op(Opcode::Halt);

  let mut vm = machine(config(), &code, "m 0x200\nc\nm\nc\n");
  vm.memory_mut().write(0x200, b"WXYZ").unwrap();
  vm.run().unwrap();
  assert_eq!(output(&vm).matches("WXYZ").count(), 2);
}

// endregion

// region Host errors

#[test]
fn program_must_fit(){
  let code = Emitter::new().bytes(&[0; 65]).clone();
  let result = Machine::new(VmConfig::new(64, 8), &code.program(0), Input::new(Vec::new()), Vec::new());
  assert!(matches!(result, Err(VmError::ProgramTooLarge{ length: 65, capacity: 64 })));
}

#[test]
fn stack_must_fit(){
  let code = Emitter::new();
  let result = Machine::new(VmConfig::new(64, 128), &code.program(0), Input::new(Vec::new()), Vec::new());
  assert!(matches!(result, Err(VmError::StackTooLarge{ .. })));
}

#[test]
fn initial_registers(){
  let vm = Machine::new(
    VmConfig::new(512, 64),
    &Emitter::new().op(Opcode::Halt).program(0),
    Input::new(Vec::new()),
    Vec::new()
  ).unwrap();
  assert_eq!(vm.registers().get(Register::Sp), 512);
  assert_eq!(vm.registers().get(Register::Fp), 512);
  assert_eq!(vm.registers().get(Register::Ssize), 64);
  assert_eq!(vm.iterations(), 0);
  assert!(!vm.is_halted());
}

// endregion
