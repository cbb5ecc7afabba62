use std::fmt;

const HASH_SEED: u32 = 5381;
const HASH_MULTIPLIER: u32 = 33;

/// DetectorId is the 32-bit identifier used to register and dispatch converters.
///
/// It is a stable hash of the canonical, human-readable detector-type name (e.g.
/// `CaribouAD9249Event`), so producers and converters only need to agree on the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetectorId(u32);

impl DetectorId {
    /// Construct a DetectorId by hashing a detector-type name
    pub const fn from_name(name: &str) -> Self {
        Self(hash_name(name.as_bytes()))
    }

    /// Wrap an already computed identifier
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The name hash folds from the last character to the first:
/// h("") = 5381, h(s) = h(s[1..]) * 33 ^ s[0]
const fn hash_name(bytes: &[u8]) -> u32 {
    let mut hash = HASH_SEED;
    let mut idx = bytes.len();
    while idx > 0 {
        idx -= 1;
        hash = hash.wrapping_mul(HASH_MULTIPLIER) ^ (bytes[idx] as u32);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name() {
        assert_eq!(DetectorId::from_name("").as_u32(), 5381);
    }

    #[test]
    fn test_single_character() {
        // 5381 * 33 ^ 'A'
        assert_eq!(DetectorId::from_name("A").as_u32(), (5381 * 33) ^ 65);
    }

    #[test]
    fn test_fold_order() {
        // "AB": h("B") = 5381*33 ^ 'B', then h("AB") = h("B")*33 ^ 'A'
        let h_b = 5381u32.wrapping_mul(33) ^ 66;
        let expected = h_b.wrapping_mul(33) ^ 65;
        assert_eq!(DetectorId::from_name("AB").as_u32(), expected);
        assert_ne!(DetectorId::from_name("AB"), DetectorId::from_name("BA"));
    }

    #[test]
    fn test_const_evaluation() {
        const ID: DetectorId = DetectorId::from_name("CaribouAD9249Event");
        assert_eq!(ID, DetectorId::from_name("CaribouAD9249Event"));
        assert_ne!(ID, DetectorId::from_name("CaribouCLICTDEvent"));
    }
}
