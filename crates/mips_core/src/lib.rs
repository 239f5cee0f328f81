//! A deterministic, single-stepping, multithreaded MIPS32/MIPS64 interpreter
//! whose every state transition is cryptographically witnessable, so an
//! on-chain verifier can re-execute any one instruction of an off-chain run
//! and prove the post-state hash given the pre-state hash plus a bounded
//! witness.
//!
//! [`vm::Vm`] is the entry point: construct one from an [`vm::InitialState`]
//! plus a [`oracle::PreimageOracle`] implementation, then call
//! [`vm::Vm::step`] once per guest instruction.

pub mod cpu;
pub mod error;
pub mod memory;
pub mod oracle;
pub mod state_hash;
pub mod syscall;
pub mod thread;
pub mod thread_set;
pub mod vm;
pub mod witness;
pub mod word;

pub use error::Fault;
pub use vm::{InitialState, Vm, VmConfig};
pub use word::{Word, Word32, Word64};
