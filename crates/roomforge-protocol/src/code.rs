//! Room code generation.
//!
//! A room code is the public handle for a room: players type it to find
//! a room, and the compute backend uses it as the instance name. Codes
//! are drawn uniformly at random from 52 letters. Nothing here guarantees
//! uniqueness; the registry rejects collisions and the orchestrator
//! cleans up after a rejected insert.

use rand::Rng;

use crate::RoomCode;

/// The 52-letter alphabet codes are drawn from (lower then upper case).
pub const CODE_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Code length used when nothing else is configured.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Produces random room codes of a fixed length.
///
/// Holds no mutable state: every call pulls from the calling thread's
/// RNG, so one generator can be shared by any number of request
/// handlers without locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeGenerator {
    len: usize,
}

impl CodeGenerator {
    /// Creates a generator for codes of `len` characters.
    ///
    /// A length of zero is bumped to one; an empty code could never be
    /// looked up.
    pub fn new(len: usize) -> Self {
        Self { len: len.max(1) }
    }

    /// The number of characters in each generated code.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Generates a fresh code.
    pub fn generate(&self) -> RoomCode {
        let mut rng = rand::rng();
        let code: String = (0..self.len)
            .map(|_| {
                let idx = rng.random_range(0..CODE_ALPHABET.len());
                CODE_ALPHABET[idx] as char
            })
            .collect();
        RoomCode::from_generated(code)
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generate_has_requested_length() {
        let generator = CodeGenerator::new(6);
        for _ in 0..100 {
            assert_eq!(generator.generate().as_str().len(), 6);
        }
    }

    #[test]
    fn test_generate_uses_only_letters() {
        let generator = CodeGenerator::new(32);
        for _ in 0..100 {
            let code = generator.generate();
            assert!(code.as_str().bytes().all(|b| b.is_ascii_alphabetic()));
        }
    }

    #[test]
    fn test_generated_codes_parse_back() {
        let generator = CodeGenerator::default();
        let code = generator.generate();
        assert_eq!(RoomCode::parse(code.as_str()).unwrap(), code);
    }

    #[test]
    fn test_zero_length_is_bumped_to_one() {
        let generator = CodeGenerator::new(0);
        assert_eq!(generator.len(), 1);
        assert_eq!(generator.generate().as_str().len(), 1);
    }

    #[test]
    fn test_generate_covers_both_cases() {
        // 2000 draws of 6 chars: missing either case is astronomically unlikely.
        let generator = CodeGenerator::default();
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            for b in generator.generate().as_str().bytes() {
                seen.insert(b);
            }
        }
        assert!(seen.iter().any(u8::is_ascii_lowercase));
        assert!(seen.iter().any(u8::is_ascii_uppercase));
    }

    #[test]
    fn test_generator_is_usable_across_threads() {
        let generator = CodeGenerator::default();
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(move || generator.generate()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().as_str().len(), DEFAULT_CODE_LENGTH);
        }
    }
}
