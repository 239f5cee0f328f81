//! Canonical state serialization and the verifier-facing state hash.

use sha2::{Digest, Sha256};

use mips_util::hash::{tagged_hash, Digest32};

use crate::cpu::{LlReservation, LlStatus};
use crate::thread::Thread;
use crate::word::Word;

/// Top byte of the 32-byte state hash. `Unfinished` covers every step that
/// neither faulted nor reached a graceful exit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VmStatus {
    Valid = 0,
    InvalidMips = 1,
    Panic = 2,
    Unfinished = 3,
}

impl VmStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, VmStatus::Unfinished)
    }
}

fn word_be_bytes<W: Word>(w: W) -> Vec<u8> {
    let full = w.to_u64().to_be_bytes();
    full[8 - W::BYTES..].to_vec()
}

/// Hash of one thread's full state: CPU registers, PC/HI/LO, and the
/// exit/dropped bits.
pub fn thread_hash<W: Word>(t: &Thread<W>) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(word_be_bytes(t.id));
    hasher.update(word_be_bytes(t.cpu.pc));
    hasher.update(word_be_bytes(t.cpu.next_pc));
    hasher.update(word_be_bytes(t.cpu.hi));
    hasher.update(word_be_bytes(t.cpu.lo));
    for r in t.registers {
        hasher.update(word_be_bytes(r));
    }
    hasher.update([t.exited as u8, t.exit_code, t.dropped as u8]);
    let out = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&out);
    digest
}

/// Fold a thread stack (bottom-to-top) into a single digest with the
/// standard tagged-hash combiner; an empty stack hashes to the all-zero
/// digest.
pub fn stack_hash<W: Word>(stack: &[Thread<W>]) -> Digest32 {
    let mut acc = [0u8; 32];
    for t in stack {
        acc = tagged_hash(&acc, &thread_hash(t));
    }
    acc
}

#[allow(clippy::too_many_arguments)]
pub struct StateHashInputs<'a, W: Word> {
    pub status: VmStatus,
    pub memory_root: Digest32,
    pub preimage_key: [u8; 32],
    pub preimage_offset: u64,
    pub heap: W,
    pub exit_code: u8,
    pub exited: bool,
    pub step_counter: u64,
    pub steps_since_ctx_switch: u64,
    /// Accumulated bytes of the last-hint buffer; doubles as the
    /// "wakeup_bytes" field of the canonical tuple since it is the one
    /// remaining piece of process-global byte state not already covered
    /// by a thread hash.
    pub wakeup_bytes: &'a [u8],
    pub traverse_right: bool,
    pub left: &'a [Thread<W>],
    pub right: &'a [Thread<W>],
    pub next_thread_id: W,
    pub ll: &'a LlReservation<W>,
}

/// Deterministic SHA-256 over the canonical state tuple, with the VM
/// status as the returned digest's top byte.
pub fn compute<W: Word>(inputs: StateHashInputs<'_, W>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(inputs.memory_root);
    hasher.update(inputs.preimage_key);
    hasher.update(inputs.preimage_offset.to_be_bytes());
    hasher.update(word_be_bytes(inputs.heap));
    hasher.update([inputs.exit_code, inputs.exited as u8]);
    hasher.update(inputs.step_counter.to_be_bytes());
    hasher.update(inputs.steps_since_ctx_switch.to_be_bytes());
    hasher.update((inputs.wakeup_bytes.len() as u64).to_be_bytes());
    hasher.update(inputs.wakeup_bytes);
    hasher.update([inputs.traverse_right as u8]);
    hasher.update(stack_hash(inputs.left));
    hasher.update(stack_hash(inputs.right));
    hasher.update(word_be_bytes(inputs.next_thread_id));
    let ll_status_byte = match inputs.ll.status {
        None => 0u8,
        Some(LlStatus::Active32) => 1u8,
        Some(LlStatus::Active64) => 2u8,
    };
    hasher.update([ll_status_byte]);
    hasher.update(word_be_bytes(inputs.ll.addr));
    hasher.update(word_be_bytes(inputs.ll.owner_thread));

    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out[0] = inputs.status as u8;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::Word32;

    fn ll_none() -> LlReservation<Word32> {
        LlReservation::none()
    }

    #[test]
    fn status_byte_is_top_byte() {
        let threads: Vec<Thread<Word32>> = Vec::new();
        let ll = ll_none();
        let inputs = StateHashInputs {
            status: VmStatus::Panic,
            memory_root: [0u8; 32],
            preimage_key: [0u8; 32],
            preimage_offset: 0,
            heap: Word32(0),
            exit_code: 0,
            exited: false,
            step_counter: 0,
            steps_since_ctx_switch: 0,
            wakeup_bytes: &[],
            traverse_right: false,
            left: &threads,
            right: &threads,
            next_thread_id: Word32(1),
            ll: &ll,
        };
        let hash = compute(inputs);
        assert_eq!(hash[0], VmStatus::Panic as u8);
    }

    #[test]
    fn differing_step_counter_changes_hash() {
        let threads: Vec<Thread<Word32>> = Vec::new();
        let ll = ll_none();
        let base = |step: u64| StateHashInputs {
            status: VmStatus::Unfinished,
            memory_root: [0u8; 32],
            preimage_key: [0u8; 32],
            preimage_offset: 0,
            heap: Word32(0),
            exit_code: 0,
            exited: false,
            step_counter: step,
            steps_since_ctx_switch: 0,
            wakeup_bytes: &[],
            traverse_right: false,
            left: &threads,
            right: &threads,
            next_thread_id: Word32(1),
            ll: &ll,
        };
        assert_ne!(compute(base(0)), compute(base(1)));
    }

    #[test]
    fn empty_stack_hash_is_zero() {
        let threads: Vec<Thread<Word32>> = Vec::new();
        assert_eq!(stack_hash(&threads), [0u8; 32]);
    }
}
