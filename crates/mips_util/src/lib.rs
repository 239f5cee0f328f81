pub mod bit;
pub mod hash;

pub use bit::{Bit, BitSet};
pub use hash::tagged_hash;
