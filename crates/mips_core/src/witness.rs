//! The minimal per-step proof a verifier needs to re-derive the post-state
//! hash from the pre-state hash.

use mips_util::hash::Digest32;

use crate::memory::Proof;
use crate::word::Word;

/// Oracle bytes consumed during a syscall step, if any.
#[derive(Debug, Clone)]
pub struct OracleConsumption {
    pub preimage_key: [u8; 32],
    pub bytes: Vec<u8>,
}

/// The pre-state register snapshot is not carried here: it is implicit in
/// the state hash plus the active thread's inclusion proof, which the
/// verifier already has from the preceding step.
#[derive(Debug, Clone)]
pub struct Witness<W: Word> {
    pub instruction: u32,
    pub instruction_addr: W,
    pub instruction_proof: Proof,
    pub memory_touch: Option<(W, Proof)>,
    pub oracle: Option<OracleConsumption>,
}

impl<W: Word> Witness<W> {
    pub fn new(instruction: u32, instruction_addr: W, instruction_proof: Proof) -> Self {
        Witness {
            instruction,
            instruction_addr,
            instruction_proof,
            memory_touch: None,
            oracle: None,
        }
    }
}

pub fn digest_hex(d: &Digest32) -> String {
    d.iter().map(|b| format!("{b:02x}")).collect()
}
