//! Register width as a build-time type parameter.
//!
//! The VM is generic over [`Word`] rather than branching on a runtime flag:
//! the state hash differs between 32- and 64-bit builds, so a verifier must
//! agree on which one it is running ahead of time.

use std::fmt;

/// A MIPS machine word: either [`Word32`] or [`Word64`].
///
/// Methods are spelled out explicitly (`wrapping_add`, `shr_logical`, ...)
/// rather than going through `std::ops`, mirroring the sign/width-aware
/// accessors a MIPS core needs at every arithmetic site.
pub trait Word:
    Copy + Clone + Eq + PartialEq + Ord + PartialOrd + fmt::Debug + fmt::Display + Default + 'static
{
    /// Width in bits: 32 or 64.
    const BITS: u32;
    /// Width in bytes, used for LL/SC granularity and LD/SD addressing.
    const BYTES: usize;
    const ZERO: Self;
    const ONE: Self;

    /// Build a word from a zero-extended 64-bit value, truncating on 32-bit builds.
    fn from_u64(v: u64) -> Self;
    /// Zero-extend to a `u64`.
    fn to_u64(self) -> u64;
    /// Sign-extend to an `i64`.
    fn to_i64(self) -> i64;
    /// Low 32 bits, as used by register reads feeding 32-bit-only opcodes.
    fn low_u32(self) -> u32;
    /// Construct a word by sign-extending a 32-bit value to the word width.
    /// Identity on [`Word32`].
    fn sign_extend_32(v: u32) -> Self;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn wrapping_mul(self, rhs: Self) -> Self;

    fn bit_and(self, rhs: Self) -> Self;
    fn bit_or(self, rhs: Self) -> Self;
    fn bit_xor(self, rhs: Self) -> Self;
    fn bit_not(self) -> Self;

    fn shl(self, amount: u32) -> Self;
    fn shr_logical(self, amount: u32) -> Self;
    fn shr_arithmetic(self, amount: u32) -> Self;

    fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Signed less-than, used by SLT/SLTI.
    fn signed_lt(self, rhs: Self) -> bool {
        self.to_i64() < rhs.to_i64()
    }

    /// Unsigned less-than, used by SLTU/SLTIU.
    fn unsigned_lt(self, rhs: Self) -> bool {
        self.to_u64() < rhs.to_u64()
    }

    fn wrapping_add_u64(self, rhs: u64) -> Self {
        self.wrapping_add(Self::from_u64(rhs))
    }
}

/// MIPS32 register: all arithmetic truncates to 32 bits.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default, Hash)]
pub struct Word32(pub u32);

impl fmt::Debug for Word32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Display for Word32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Word for Word32 {
    const BITS: u32 = 32;
    const BYTES: usize = 4;
    const ZERO: Self = Word32(0);
    const ONE: Self = Word32(1);

    fn from_u64(v: u64) -> Self {
        Word32(v as u32)
    }

    fn to_u64(self) -> u64 {
        u64::from(self.0)
    }

    fn to_i64(self) -> i64 {
        i64::from(self.0 as i32)
    }

    fn low_u32(self) -> u32 {
        self.0
    }

    fn sign_extend_32(v: u32) -> Self {
        Word32(v)
    }

    fn wrapping_add(self, rhs: Self) -> Self {
        Word32(self.0.wrapping_add(rhs.0))
    }

    fn wrapping_sub(self, rhs: Self) -> Self {
        Word32(self.0.wrapping_sub(rhs.0))
    }

    fn wrapping_mul(self, rhs: Self) -> Self {
        Word32(self.0.wrapping_mul(rhs.0))
    }

    fn bit_and(self, rhs: Self) -> Self {
        Word32(self.0 & rhs.0)
    }

    fn bit_or(self, rhs: Self) -> Self {
        Word32(self.0 | rhs.0)
    }

    fn bit_xor(self, rhs: Self) -> Self {
        Word32(self.0 ^ rhs.0)
    }

    fn bit_not(self) -> Self {
        Word32(!self.0)
    }

    fn shl(self, amount: u32) -> Self {
        Word32(self.0.wrapping_shl(amount))
    }

    fn shr_logical(self, amount: u32) -> Self {
        Word32(self.0.wrapping_shr(amount))
    }

    fn shr_arithmetic(self, amount: u32) -> Self {
        Word32(((self.0 as i32).wrapping_shr(amount)) as u32)
    }
}

/// MIPS64 register: 32-bit sub-ops sign-extend their result into the full
/// 64 bits, per the instruction set's `N64`/`N32` ABI rules.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default, Hash)]
pub struct Word64(pub u64);

impl fmt::Debug for Word64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl fmt::Display for Word64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl Word for Word64 {
    const BITS: u32 = 64;
    const BYTES: usize = 8;
    const ZERO: Self = Word64(0);
    const ONE: Self = Word64(1);

    fn from_u64(v: u64) -> Self {
        Word64(v)
    }

    fn to_u64(self) -> u64 {
        self.0
    }

    fn to_i64(self) -> i64 {
        self.0 as i64
    }

    fn low_u32(self) -> u32 {
        self.0 as u32
    }

    fn sign_extend_32(v: u32) -> Self {
        Word64((v as i32) as i64 as u64)
    }

    fn wrapping_add(self, rhs: Self) -> Self {
        Word64(self.0.wrapping_add(rhs.0))
    }

    fn wrapping_sub(self, rhs: Self) -> Self {
        Word64(self.0.wrapping_sub(rhs.0))
    }

    fn wrapping_mul(self, rhs: Self) -> Self {
        Word64(self.0.wrapping_mul(rhs.0))
    }

    fn bit_and(self, rhs: Self) -> Self {
        Word64(self.0 & rhs.0)
    }

    fn bit_or(self, rhs: Self) -> Self {
        Word64(self.0 | rhs.0)
    }

    fn bit_xor(self, rhs: Self) -> Self {
        Word64(self.0 ^ rhs.0)
    }

    fn bit_not(self) -> Self {
        Word64(!self.0)
    }

    fn shl(self, amount: u32) -> Self {
        Word64(self.0.wrapping_shl(amount))
    }

    fn shr_logical(self, amount: u32) -> Self {
        Word64(self.0.wrapping_shr(amount))
    }

    fn shr_arithmetic(self, amount: u32) -> Self {
        Word64(((self.0 as i64).wrapping_shr(amount)) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word32_add_wraps() {
        let a = Word32(u32::MAX);
        assert_eq!(a.wrapping_add(Word32::ONE), Word32(0));
    }

    #[test]
    fn word32_signed_lt() {
        assert!(Word32(u32::MAX).signed_lt(Word32(0)));
        assert!(!Word32(u32::MAX).unsigned_lt(Word32(0)));
    }

    #[test]
    fn word64_sign_extend_32() {
        let v = Word64::sign_extend_32(0xFFFF_FFFF);
        assert_eq!(v.0, u64::MAX);
        let v = Word64::sign_extend_32(1);
        assert_eq!(v.0, 1);
    }

    #[test]
    fn word64_shr_arithmetic_preserves_sign() {
        let v = Word64(0x8000_0000_0000_0000);
        let shifted = v.shr_arithmetic(4);
        assert_eq!(shifted.0, 0xF800_0000_0000_0000);
    }
}
