//! The six concrete scenarios spelled out as acceptance tests against the
//! public `Vm` API, rather than against the executor directly.

use mips_core::cpu::opcode::raw;
use mips_core::cpu::LlStatus;
use mips_core::oracle::StaticOracle;
use mips_core::syscall::{self, nr};
use mips_core::word::{Word32, Word64};
use mips_core::{Fault, InitialState, Vm, VmConfig};

fn encode_i(op: u32, rs: u32, rt: u32, imm: u16) -> u32 {
    (op << 26) | (rs << 21) | (rt << 16) | u32::from(imm)
}

fn encode_r(op: u32, rs: u32, rt: u32, rd: u32, shamt: u32, funct: u32) -> u32 {
    (op << 26) | (rs << 21) | (rt << 16) | (rd << 11) | (shamt << 6) | funct
}

// Lets `RUST_LOG=trace cargo test -- --nocapture` surface the executor's
// `trace!`/`debug!`/`warn!` logging; `try_init` tolerates being called from
// every test in the binary instead of panicking on the second call.
fn init_logging() {
    let _ = env_logger::try_init();
}

fn vm32() -> Vm<Word32, StaticOracle> {
    init_logging();
    let initial = InitialState {
        registers: [Word32::ZERO; 32],
        pc: Word32(0x1000),
        heap: Word32(syscall::HEAP_START as u32),
    };
    Vm::new(initial, StaticOracle::new(), VmConfig::default())
}

fn vm64() -> Vm<Word64, StaticOracle> {
    init_logging();
    let initial = InitialState {
        registers: [Word64::ZERO; 32],
        pc: Word64(0x1000),
        heap: Word64(syscall::HEAP_START),
    };
    Vm::new(initial, StaticOracle::new(), VmConfig::default())
}

const V0: usize = 2;
const A0: usize = 4;
const A1: usize = 5;
const A2: usize = 6;
const A3: usize = 7;

/// Scenario 1: a 64-bit `LL` with an unaligned effective address loads the
/// word containing it and sign-extends the result into the 64-bit
/// register, with the reservation anchored at the containing word.
#[test]
fn ll_unaligned_address_sign_extends_and_reserves_containing_word() {
    let mut vm = vm64();
    let ll = encode_i(raw::LL, 1, 2, 0x8405);
    vm.memory.write_word_aligned(Word64(0x1000), ll);
    vm.threads.current_mut().unwrap().set_reg(1, Word64(0xFF12_0001));
    vm.memory.write_word_aligned(Word64(0xFF11_8404), 0x8000_0000);

    vm.step(false);

    let ll_res = &vm.threads.ll;
    assert_eq!(ll_res.status, Some(LlStatus::Active32));
    assert_eq!(ll_res.addr, Word64(0xFF11_8404));
    assert_eq!(ll_res.owner_thread, Word64(0));
    let loaded = vm.threads.current().unwrap().registers[2];
    assert_eq!(loaded, Word64(0xFFFF_FFFF_8000_0000));
}

/// Scenario 2: `SC` from a thread that does not own the reservation fails
/// without touching memory, leaving the reservation exactly as it was.
#[test]
fn sc_from_non_owning_thread_fails_and_leaves_memory_untouched() {
    let mut vm = vm32();
    vm.threads.push_active(mips_core::thread::Thread::new(Word32(1), Word32(0x2000)));

    let ll = encode_i(raw::LL, 0, 2, 0);
    vm.memory.write_word_aligned(Word32(0x2000), ll);
    vm.step(false); // thread 1 runs LL at addr 0

    // flip back to thread 0 by preempting once more.
    vm.threads.preempt();
    assert_eq!(vm.threads.current().unwrap().id, Word32(0));

    let sc = encode_i(raw::SC, 0, 3, 0);
    vm.memory.write_word_aligned(vm.threads.current().unwrap().cpu.pc, sc);
    vm.threads.current_mut().unwrap().set_reg(3, Word32(0xDEAD_BEEF));
    vm.step(false);

    assert_eq!(vm.threads.current().unwrap().registers[3], Word32::ZERO);
    assert_eq!(vm.memory.read_word_unaligned(Word32(0)), 0);
}

/// Scenario 3: a successful `clone` pushes a second thread onto the
/// currently active stack with the requested child stack pointer and the
/// parent/child `v0`/`a3` split the contract requires.
#[test]
fn clone_success_spawns_second_thread() {
    let mut vm = vm32();
    let syscall_instr = encode_r(raw::SPECIAL, 0, 0, 0, 0, raw::SYSCALL);
    vm.memory.write_word_aligned(Word32(0x1000), syscall_instr);
    {
        let t = vm.threads.current_mut().unwrap();
        t.set_reg(V0, Word32(nr::CLONE));
        t.set_reg(A0, Word32(syscall::VALID_CLONE_FLAGS));
        t.set_reg(A1, Word32(0x7FFF_0000));
    }
    vm.threads.steps_since_context_switch = 42;

    vm.step(false);

    assert_eq!(vm.threads.left.len(), 2);
    let child = &vm.threads.left[1];
    assert_eq!(child.registers[29], Word32(0x7FFF_0000));
    assert_eq!(child.registers[V0], Word32::ZERO);
    assert_eq!(child.registers[A3], Word32::ZERO); // a3
    let parent = &vm.threads.left[0];
    assert_eq!(parent.registers[V0], Word32::ONE);
    assert_eq!(vm.threads.steps_since_context_switch, 0);
}

/// Scenario 4: the single remaining thread exiting ends the process
/// globally with that thread's exit code once the scheduler pops it.
#[test]
fn exit_of_last_thread_ends_process_globally() {
    let mut vm = vm32();
    let syscall_instr = encode_r(raw::SPECIAL, 0, 0, 0, 0, raw::SYSCALL);
    vm.memory.write_word_aligned(Word32(0x1000), syscall_instr);
    {
        let t = vm.threads.current_mut().unwrap();
        t.set_reg(V0, Word32(nr::EXIT));
        t.set_reg(A0, Word32(3));
    }
    vm.step(false);
    assert!(vm.threads.current().unwrap().exited);
    assert_eq!(vm.threads.current().unwrap().exit_code, 3);

    let (_, fault) = vm.step(false);
    assert_eq!(fault, Some(Fault::ActiveThreadStackEmpty));
    assert_eq!(vm.threads.global_exit_code, Some(3));
}

/// Scenario 5: `futex(WAKE)` always succeeds and preempts, without
/// touching memory.
#[test]
fn futex_wake_preempts_without_touching_memory() {
    let mut vm = vm32();
    let syscall_instr = encode_r(raw::SPECIAL, 0, 0, 0, 0, raw::SYSCALL);
    vm.memory.write_word_aligned(Word32(0x1000), syscall_instr);
    {
        let t = vm.threads.current_mut().unwrap();
        t.set_reg(V0, Word32(nr::FUTEX));
        t.set_reg(A0, Word32(0x3000));
        t.set_reg(A1, Word32(syscall::FUTEX_WAKE_PRIVATE));
    }
    let root_before = vm.memory.merkle_root();

    vm.step(false);

    let regs = vm.threads.current().unwrap().registers;
    assert_eq!(regs[V0], Word32::ZERO);
    assert_eq!(regs[A3], Word32::ZERO);
    assert!(vm.threads.traverse_right);
    assert_eq!(vm.memory.merkle_root(), root_before);
}

/// Scenario 6: `clock_gettime` clears an LL reservation sitting on the
/// nsec word it writes, but leaves a reservation just past that word
/// alone.
#[test]
fn clock_gettime_clears_reservation_on_touched_word_only() {
    let mut vm = vm32();
    let syscall_instr = encode_r(raw::SPECIAL, 0, 0, 0, 0, raw::SYSCALL);
    vm.memory.write_word_aligned(Word32(0x1000), syscall_instr);
    {
        let t = vm.threads.current_mut().unwrap();
        t.set_reg(V0, Word32(nr::CLOCK_GETTIME));
        t.set_reg(A0, Word32(syscall::CLOCK_MONOTONIC));
        t.set_reg(A1, Word32(0x5000));
    }
    vm.threads.ll.status = Some(LlStatus::Active32);
    vm.threads.ll.addr = Word32(0x5004); // nsec word for a 4-byte Word32
    vm.threads.ll.owner_thread = Word32(99);

    vm.step(false);
    assert_eq!(vm.threads.ll.status, None);

    vm.threads.ll.status = Some(LlStatus::Active32);
    vm.threads.ll.addr = Word32(0x500C); // well past the touched pair
    vm.threads.ll.owner_thread = Word32(99);
    let next_pc = vm.threads.current().unwrap().cpu.pc;
    vm.memory.write_word_aligned(next_pc, syscall_instr);
    {
        let t = vm.threads.current_mut().unwrap();
        t.set_reg(V0, Word32(nr::CLOCK_GETTIME));
        t.set_reg(A0, Word32(syscall::CLOCK_MONOTONIC));
        t.set_reg(A1, Word32(0x5000));
    }
    vm.step(false);
    assert_eq!(vm.threads.ll.status, Some(LlStatus::Active32));
}
