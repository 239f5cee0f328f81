//! Pre-image oracle: the external collaborator the `read`/`write` syscalls
//! on fds 3-6 talk to. The core only ever sees synchronous bytes in,
//! bytes out; an implementer may wrap an async source behind this trait.

/// `get_preimage` returns the full value; the core itself tracks the read
/// offset and paginates (see [`crate::vm::Vm`]'s preimage bookkeeping).
pub trait PreimageOracle {
    fn hint(&mut self, data: &[u8]);
    fn get_preimage(&mut self, key: [u8; 32]) -> Vec<u8>;
}

/// In-memory double used by tests and by callers that pre-load every
/// preimage the guest program will ask for.
#[derive(Default)]
pub struct StaticOracle {
    preimages: std::collections::HashMap<[u8; 32], Vec<u8>>,
    pub hints: Vec<Vec<u8>>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: [u8; 32], value: Vec<u8>) {
        self.preimages.insert(key, value);
    }
}

impl PreimageOracle for StaticOracle {
    fn hint(&mut self, data: &[u8]) {
        self.hints.push(data.to_vec());
    }

    fn get_preimage(&mut self, key: [u8; 32]) -> Vec<u8> {
        self.preimages.get(&key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_oracle_returns_inserted_value() {
        let mut oracle = StaticOracle::new();
        oracle.insert([1u8; 32], vec![9, 8, 7]);
        assert_eq!(oracle.get_preimage([1u8; 32]), vec![9, 8, 7]);
        assert_eq!(oracle.get_preimage([2u8; 32]), Vec::<u8>::new());
    }

    #[test]
    fn hints_are_recorded_in_order() {
        let mut oracle = StaticOracle::new();
        oracle.hint(b"first");
        oracle.hint(b"second");
        assert_eq!(oracle.hints, vec![b"first".to_vec(), b"second".to_vec()]);
    }
}
