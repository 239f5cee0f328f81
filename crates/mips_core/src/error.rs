//! Fatal VM faults.
//!
//! These are distinct from guest-visible syscall errnos (`EINVAL`, `EAGAIN`,
//! `EBADF`), which never bubble out of [`crate::vm::Vm::step`] as a `Fault` —
//! they are ordinary syscall return values in `v0`/`a3`.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("invalid instruction")]
    InvalidInstruction,

    #[error("pc is not word-aligned")]
    InvalidPc,

    #[error("branch in delay slot")]
    BranchInDelaySlot,

    #[error("jump in delay slot")]
    JumpInDelaySlot,

    #[error("divide by zero")]
    DivideByZero,

    #[error("active thread stack is empty")]
    ActiveThreadStackEmpty,

    #[error("unsupported clone flags")]
    UnsupportedCloneFlags,
}
