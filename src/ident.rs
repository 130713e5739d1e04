use crate::config::{ID_ALPHABET, ID_MAX_ATTEMPTS};
use crate::error::{CorpusError, Result};
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};

/// Mints random Base32 identifiers whose first character is a letter.
///
/// Uniqueness is not checked here; the stamper validates every draw
/// against the [`IdentifierRegistry`](crate::registry::IdentifierRegistry).
pub struct IdGenerator<R = OsRng> {
    rng: R,
}

impl IdGenerator<OsRng> {
    pub fn new() -> Self {
        Self { rng: OsRng }
    }
}

impl Default for IdGenerator<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + CryptoRng> IdGenerator<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Draws identifiers until one starts with a letter, giving up after
    /// [`ID_MAX_ATTEMPTS`] tries.
    pub fn generate(&mut self, length: usize) -> Result<String> {
        if length == 0 {
            return Err(CorpusError::InvalidIdLength);
        }

        for _ in 0..ID_MAX_ATTEMPTS {
            let id = self.draw(length);
            if id.starts_with(|c: char| c.is_ascii_alphabetic()) {
                return Ok(id);
            }
        }

        Err(CorpusError::GenerationExhausted {
            attempts: ID_MAX_ATTEMPTS,
        })
    }

    // gen_range samples by rejection, so every symbol is equally likely
    fn draw(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| ID_ALPHABET[self.rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect()
    }
}

/// True for a well-formed identifier of the given length.
pub fn is_valid_id(id: &str, length: usize) -> bool {
    id.len() == length
        && id.starts_with(|c: char| c.is_ascii_alphabetic())
        && id.bytes().all(|b| ID_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ID_LENGTH;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    /// Every draw lands on the same digit of the alphabet.
    struct DigitRng;

    impl RngCore for DigitRng {
        fn next_u32(&mut self) -> u32 {
            0xF000_0000
        }

        fn next_u64(&mut self) -> u64 {
            0xF000_0000_0000_0000
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0xF0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for DigitRng {}

    #[test]
    fn alphabet_has_32_unique_symbols() {
        let unique: HashSet<u8> = ID_ALPHABET.iter().copied().collect();
        assert_eq!(unique.len(), 32);
    }

    #[test]
    fn generated_ids_are_well_formed() {
        let mut generator = IdGenerator::new();
        for _ in 0..2000 {
            let id = generator.generate(ID_LENGTH).unwrap();
            assert!(is_valid_id(&id, ID_LENGTH), "malformed id: {id}");
        }
    }

    #[test]
    fn respects_requested_length() {
        let mut generator = IdGenerator::from_rng(StdRng::seed_from_u64(7));
        for length in [1, 4, 16, 32] {
            let id = generator.generate(length).unwrap();
            assert_eq!(id.len(), length);
            assert!(id.as_bytes()[0].is_ascii_alphabetic());
        }
    }

    #[test]
    fn zero_length_is_rejected() {
        let mut generator = IdGenerator::new();
        assert!(matches!(
            generator.generate(0),
            Err(CorpusError::InvalidIdLength)
        ));
    }

    #[test]
    fn digit_only_source_exhausts_attempts() {
        let mut generator = IdGenerator::from_rng(DigitRng);
        match generator.generate(ID_LENGTH) {
            Err(e @ CorpusError::GenerationExhausted { attempts }) => {
                assert_eq!(attempts, ID_MAX_ATTEMPTS);
                assert_eq!(attempts, 100);
                assert!(e.is_fatal());
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn seeded_generators_repeat() {
        let mut a = IdGenerator::from_rng(StdRng::seed_from_u64(42));
        let mut b = IdGenerator::from_rng(StdRng::seed_from_u64(42));
        assert_eq!(a.generate(ID_LENGTH).unwrap(), b.generate(ID_LENGTH).unwrap());
    }

    #[test]
    fn draws_are_spread_over_the_alphabet() {
        let mut generator = IdGenerator::from_rng(StdRng::seed_from_u64(1));
        let seen: HashSet<char> = (0..500)
            .flat_map(|_| generator.generate(ID_LENGTH).unwrap().chars().collect::<Vec<_>>())
            .collect();
        assert_eq!(seen.len(), 32);
    }

    #[test]
    fn is_valid_id_rejects_bad_input() {
        assert!(is_valid_id("abcdefgh27", 10));
        assert!(!is_valid_id("2bcdefghij", 10));
        assert!(!is_valid_id("abcdefghi1", 10));
        assert!(!is_valid_id("Abcdefghij", 10));
        assert!(!is_valid_id("abc", 10));
    }
}
