//! The top-level VM: owns memory, the thread set, the oracle, and the
//! handful of process-global scalars (heap pointer, step counter, preimage
//! bookkeeping, last-hint buffer) that `ThreadSet`/`Memory` don't carry
//! themselves. `step` is the only entry point a caller needs.

use log::{debug, trace, warn};

use crate::cpu;
use crate::error::Fault;
use crate::memory::Memory;
use crate::oracle::PreimageOracle;
use crate::state_hash::{self, StateHashInputs, VmStatus};
use crate::syscall::{self, nr};
use crate::thread::Thread;
use crate::thread_set::ThreadSet;
use crate::witness::{OracleConsumption, Witness};
use crate::word::Word;

const V0: usize = 2;
const A0: usize = 4;
const A1: usize = 5;
const A2: usize = 6;
const A3: usize = 7;
const SP: usize = 29;

/// User-clock ticks per second used by `clock_gettime`'s MONOTONIC/REALTIME
/// conversion. Linux's `USER_HZ`; the spec leaves the numeric value
/// unspecified beyond naming it `HZ`.
const HZ: u64 = 100;

/// Build-time/version knobs a verifier must agree on ahead of time.
#[derive(Clone, Copy, Debug)]
pub struct VmConfig {
    /// Whether `getrandom` is wired up at all; older VM versions treat it
    /// as a pure no-op (spec.md §4.3, §9's open question).
    pub getrandom_supported: bool,
    pub quantum: u64,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            getrandom_supported: true,
            quantum: syscall::SCHED_QUANTUM,
        }
    }
}

/// What an external loader hands the VM to begin execution: the single
/// initial thread's register file and program counter, plus the starting
/// heap pointer.
pub struct InitialState<W: Word> {
    pub registers: [W; 32],
    pub pc: W,
    pub heap: W,
}

pub struct Vm<W: Word, O: PreimageOracle> {
    pub memory: Memory<W>,
    pub threads: ThreadSet<W>,
    pub heap: W,
    pub step_counter: u64,
    pub preimage_key: [u8; 32],
    preimage_value: Vec<u8>,
    preimage_loaded: bool,
    pub preimage_offset: u64,
    pub last_hint: Vec<u8>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub oracle: O,
    pub config: VmConfig,
    /// Sticky once set: the fault that ended the run, if any. Drives
    /// [`Vm::status`] after the VM has stopped stepping.
    pub fault: Option<Fault>,
}

impl<W: Word, O: PreimageOracle> Vm<W, O> {
    pub fn new(initial: InitialState<W>, oracle: O, config: VmConfig) -> Self {
        let mut thread = Thread::new(W::ZERO, initial.pc);
        thread.registers = initial.registers;
        Vm {
            memory: Memory::new(),
            threads: ThreadSet::new(thread),
            heap: initial.heap,
            step_counter: 0,
            preimage_key: [0u8; 32],
            preimage_value: Vec::new(),
            preimage_loaded: false,
            preimage_offset: 0,
            last_hint: Vec::new(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            oracle,
            config,
            fault: None,
        }
    }

    pub fn is_globally_exited(&self) -> bool {
        self.threads.is_globally_exited() && self.fault.is_none()
    }

    /// Top byte of the state hash: terminal status once the run has ended,
    /// `Unfinished` otherwise. All fatal faults collapse to `Panic` except
    /// `InvalidInstruction`, which is surfaced as `InvalidMips` since it is
    /// a decode-time rejection rather than an execution-time trap.
    pub fn status(&self) -> VmStatus {
        match self.fault {
            Some(Fault::InvalidInstruction) => VmStatus::InvalidMips,
            Some(_) => VmStatus::Panic,
            None if self.threads.is_globally_exited() => VmStatus::Valid,
            None => VmStatus::Unfinished,
        }
    }

    fn exit_code(&self) -> u8 {
        self.threads.global_exit_code.unwrap_or(0)
    }

    pub fn state_hash(&mut self) -> [u8; 32] {
        let status = self.status();
        let memory_root = self.memory.merkle_root();
        let exited = self.threads.is_globally_exited();
        let inputs = StateHashInputs {
            status,
            memory_root,
            preimage_key: self.preimage_key,
            preimage_offset: self.preimage_offset,
            heap: self.heap,
            exit_code: self.exit_code(),
            exited,
            step_counter: self.step_counter,
            steps_since_ctx_switch: self.threads.steps_since_context_switch,
            wakeup_bytes: &self.last_hint,
            traverse_right: self.threads.traverse_right,
            left: &self.threads.left,
            right: &self.threads.right,
            next_thread_id: self.threads.next_thread_id,
            ll: &self.threads.ll,
        };
        state_hash::compute(inputs)
    }

    /// Execute exactly one guest instruction, or one pure preemption.
    /// Returns the witness for the step (if requested and one was
    /// produced) and any fatal fault. A fault still carries a witness when
    /// one could be assembled, per the propagation rule: the verifier must
    /// be able to reproduce the faulting step.
    pub fn step(&mut self, emit_witness: bool) -> (Option<Witness<W>>, Option<Fault>) {
        if let Err(fault) = self.threads.pop_exited() {
            self.fault = Some(fault);
            self.step_counter += 1;
            return (None, Some(fault));
        }

        if self.threads.quantum_exceeded(self.config.quantum) {
            trace!("quantum exceeded, preempting thread {:?}", self.threads.current_thread_id);
            self.threads.preempt();
            self.step_counter += 1;
            return (None, None);
        }

        let pc = self.threads.current().expect("pop_exited ensures a current thread").cpu.pc;
        if pc.to_u64() & 0b11 != 0 {
            self.fault = Some(Fault::InvalidPc);
            self.step_counter += 1;
            return (None, Some(Fault::InvalidPc));
        }

        let instruction_proof = if emit_witness { Some(self.memory.proof(pc)) } else { None };
        let word = self.memory.read_word_unaligned(pc);

        let (cpu, regs, ll, thread_id) = self.threads.current_split_mut();
        let outcome = cpu::step(word, cpu, regs, &mut self.memory, ll, thread_id, emit_witness);

        self.step_counter += 1;

        let mut witness = instruction_proof.map(|proof| Witness::new(word, pc, proof));

        let mut outcome = match outcome {
            Ok(outcome) => outcome,
            Err(fault) => {
                warn!("fatal fault at pc={pc:?}: {fault}");
                self.fault = Some(fault);
                return (witness, Some(fault));
            }
        };

        // Stores already captured their proof before the write landed
        // (`outcome.touch_proof`); a load never mutated memory, so proving
        // it here is equally a pre-step proof.
        if let Some(addr) = outcome.touched_addr {
            if let Some(w) = witness.as_mut() {
                let proof = outcome.touch_proof.take().unwrap_or_else(|| self.memory.proof(addr));
                w.memory_touch = Some((addr, proof));
            }
        }

        self.threads.steps_since_context_switch += 1;

        if outcome.syscall {
            match self.handle_syscall(thread_id) {
                Ok(consumption) => {
                    if let (Some(c), Some(w)) = (consumption, witness.as_mut()) {
                        w.oracle = Some(c);
                    }
                }
                Err(fault) => {
                    warn!("syscall fault: {fault}");
                    self.fault = Some(fault);
                    return (witness, Some(fault));
                }
            }
        }

        (witness, None)
    }

    fn current_regs(&self) -> [W; 32] {
        self.threads.current().expect("current thread exists").registers
    }

    fn set_return(&mut self, v0: u64, a3: u64) {
        let thread = self.threads.current_mut().expect("current thread exists");
        thread.set_reg(V0, W::from_u64(v0));
        thread.set_reg(A3, W::from_u64(a3));
    }

    fn handle_syscall(&mut self, thread_id: W) -> Result<Option<OracleConsumption>, Fault> {
        let regs = self.current_regs();
        let number = regs[V0].low_u32();
        let a0 = regs[A0];
        let a1 = regs[A1];
        let a2 = regs[A2];

        debug!("syscall {number} on thread {thread_id:?} (a0={a0:?} a1={a1:?} a2={a2:?})");

        if syscall::NOOP_SYSCALLS.contains(&number) {
            self.set_return(0, 0);
            return Ok(None);
        }

        match number {
            nr::CLONE => self.sys_clone(a0, a1),
            nr::EXIT | nr::EXIT_GROUP => {
                self.sys_exit(a0);
                Ok(None)
            }
            nr::GETTID => {
                self.set_return(thread_id.to_u64(), 0);
                Ok(None)
            }
            nr::GETPID => {
                self.set_return(0, 0);
                Ok(None)
            }
            nr::SCHED_YIELD | nr::NANOSLEEP => {
                self.set_return(0, 0);
                self.threads.preempt();
                Ok(None)
            }
            nr::FUTEX => self.sys_futex(a0, a1, a2),
            nr::OPEN => {
                self.set_return(u64::from(syscall::EBADF), 1);
                Ok(None)
            }
            nr::READ => Ok(self.sys_read(a0, a1, a2)),
            nr::WRITE => {
                self.sys_write(a0, a1, a2);
                Ok(None)
            }
            nr::CLOCK_GETTIME => {
                self.sys_clock_gettime(a0, a1);
                Ok(None)
            }
            nr::MMAP => {
                self.sys_mmap(a0, a1);
                Ok(None)
            }
            nr::BRK => {
                self.set_return(syscall::BRK_SENTINEL, 0);
                Ok(None)
            }
            nr::GETRANDOM => {
                self.sys_getrandom(a0, a1);
                Ok(None)
            }
            _ => {
                warn!("unsupported syscall {number}, returning EINVAL");
                self.set_return(u64::from(syscall::EINVAL), 1);
                Ok(None)
            }
        }
    }

    fn sys_clone(&mut self, flags: W, child_sp: W) -> Result<Option<OracleConsumption>, Fault> {
        if flags.to_u64() != u64::from(syscall::VALID_CLONE_FLAGS) {
            return Err(Fault::UnsupportedCloneFlags);
        }
        let parent = self.threads.current().expect("current thread exists");
        let parent_cpu = parent.cpu.clone();
        let mut registers = parent.registers;
        registers[SP] = child_sp;
        registers[V0] = W::ZERO;
        registers[A3] = W::ZERO;

        let child_id = self.threads.allocate_thread_id();
        let mut child = Thread::new(child_id, parent_cpu.pc);
        child.cpu = parent_cpu;
        child.registers = registers;

        // Set the parent's return values while it is still `current`: once
        // the child is pushed, it becomes the top of the active stack and
        // thus `current_thread_id`.
        self.set_return(1, 0);
        debug!("clone: spawning thread {child_id:?} from {:?}", self.threads.current_thread_id);
        self.threads.push_active(child);
        self.threads.steps_since_context_switch = 0;

        Ok(None)
    }

    fn sys_exit(&mut self, code: W) {
        let thread = self.threads.current_mut().expect("current thread exists");
        thread.exited = true;
        thread.exit_code = (code.to_u64() & 0xFF) as u8;
        debug!("thread {:?} exited with code {}", thread.id, thread.exit_code);
    }

    fn sys_futex(&mut self, addr: W, op: W, val: W) -> Result<Option<OracleConsumption>, Fault> {
        match op.low_u32() {
            syscall::FUTEX_WAIT_PRIVATE => {
                let aligned = W::from_u64(addr.to_u64() & !0b11);
                let observed = self.memory.read_word_unaligned(aligned);
                if observed != val.low_u32() {
                    warn!("futex_wait at {aligned:?} observed mismatch, returning EAGAIN");
                    self.set_return(u64::from(syscall::EAGAIN), 1);
                } else {
                    self.set_return(0, 0);
                    self.threads.preempt();
                }
                Ok(None)
            }
            syscall::FUTEX_WAKE_PRIVATE => {
                self.set_return(0, 0);
                self.threads.preempt();
                Ok(None)
            }
            _ => {
                self.set_return(u64::from(syscall::EINVAL), 1);
                Ok(None)
            }
        }
    }

    fn sys_read(&mut self, fd: W, buf: W, len: W) -> Option<OracleConsumption> {
        let fd = fd.low_u32();
        let len = len.to_u64() as usize;
        if fd == syscall::FD_PREIMAGE_READ {
            if !self.preimage_loaded {
                self.preimage_value = self.oracle.get_preimage(self.preimage_key);
                self.preimage_loaded = true;
            }
            let offset = self.preimage_offset as usize;
            let available = self.preimage_value.len().saturating_sub(offset);
            let n = len.min(available);
            let bytes = self.preimage_value[offset..offset + n].to_vec();
            self.memory.write_range(buf, &bytes);
            self.preimage_offset += n as u64;
            self.set_return(n as u64, 0);
            Some(OracleConsumption {
                preimage_key: self.preimage_key,
                bytes,
            })
        } else if fd == syscall::FD_HINT_READ || fd == syscall::FD_STDIN {
            self.set_return(0, 0);
            None
        } else {
            self.set_return(u64::from(syscall::EBADF), 1);
            None
        }
    }

    fn sys_write(&mut self, fd: W, buf: W, len: W) {
        let fd = fd.low_u32();
        let len = len.to_u64() as usize;
        match fd {
            syscall::FD_STDOUT | syscall::FD_STDERR => {
                let bytes = self.memory.read_range(buf, len);
                if fd == syscall::FD_STDOUT {
                    self.stdout.extend_from_slice(&bytes);
                } else {
                    self.stderr.extend_from_slice(&bytes);
                }
                self.set_return(len as u64, 0);
            }
            syscall::FD_HINT_WRITE => {
                let bytes = self.memory.read_range(buf, len);
                self.last_hint.extend_from_slice(&bytes);
                if self.last_hint.len() >= 4 {
                    let length = u32::from_be_bytes(self.last_hint[0..4].try_into().unwrap()) as usize;
                    if self.last_hint.len() >= 4 + length {
                        self.oracle.hint(&self.last_hint[4..4 + length]);
                        self.last_hint.clear();
                    }
                }
                self.set_return(len as u64, 0);
            }
            syscall::FD_PREIMAGE_WRITE => {
                let bytes = self.memory.read_range(buf, len);
                for b in bytes {
                    self.preimage_key.rotate_left(1);
                    *self.preimage_key.last_mut().unwrap() = b;
                }
                self.preimage_offset = 0;
                self.preimage_value.clear();
                self.preimage_loaded = false;
                self.set_return(len as u64, 0);
            }
            _ => self.set_return(u64::from(syscall::EBADF), 1),
        }
    }

    fn sys_clock_gettime(&mut self, clk: W, ts: W) {
        match clk.low_u32() {
            syscall::CLOCK_MONOTONIC => {
                let secs = self.step_counter / HZ;
                let nsecs = (self.step_counter % HZ) * (1_000_000_000 / HZ);
                self.write_timespec(ts, secs, nsecs);
                self.set_return(0, 0);
            }
            syscall::CLOCK_REALTIME => {
                self.write_timespec(ts, 0, 0);
                self.set_return(0, 0);
            }
            _ => self.set_return(u64::from(syscall::EINVAL), 1),
        }
    }

    fn write_timespec(&mut self, ts: W, secs: u64, nsecs: u64) {
        let second_word = ts;
        let nsec_word = W::from_u64(ts.to_u64().wrapping_add(W::BYTES as u64));
        self.memory.write_range(second_word, &secs.to_be_bytes()[8 - W::BYTES..]);
        self.memory.write_range(nsec_word, &nsecs.to_be_bytes()[8 - W::BYTES..]);
        self.threads.ll.invalidate_on_addr_touch(second_word);
        self.threads.ll.invalidate_on_addr_touch(nsec_word);
    }

    fn sys_mmap(&mut self, addr: W, size: W) {
        if addr.is_zero() {
            let page = syscall::PAGE_SIZE;
            let rounded = (size.to_u64().wrapping_add(page - 1)) & !(page - 1);
            let old_heap = self.heap.to_u64();
            match old_heap.checked_add(rounded) {
                Some(new_heap) if new_heap <= syscall::HEAP_END => {
                    self.heap = W::from_u64(new_heap);
                    self.set_return(old_heap, 0);
                }
                _ => self.set_return(u64::from(syscall::EINVAL), 1),
            }
        } else {
            self.set_return(addr.to_u64(), 0);
        }
    }

    fn sys_getrandom(&mut self, buf: W, len: W) {
        if !self.config.getrandom_supported {
            self.set_return(0, 0);
            return;
        }
        let n = (len.to_u64() as usize).min(8);
        let bytes = syscall::split_mix64(self.step_counter).to_le_bytes();
        self.memory.write_range(buf, &bytes[..n]);
        self.set_return(n as u64, 0);
    }
}
