//! Password generation backed by the operating system CSPRNG.

use crate::constants::{DEFAULT_PASSWORD_LENGTH, PASSWORD_PUNCTUATION};
use rand::rngs::OsRng;
use rand::Rng;

const LETTERS_AND_DIGITS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Shape of generated passwords.
///
/// Characters are drawn uniformly from letters, digits and
/// [`PASSWORD_PUNCTUATION`]. No per-class minimum is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_PASSWORD_LENGTH,
        }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Every character a generated password may contain
    #[must_use]
    pub fn alphabet() -> Vec<char> {
        LETTERS_AND_DIGITS
            .chars()
            .chain(PASSWORD_PUNCTUATION.chars())
            .collect()
    }

    #[must_use]
    pub fn generate(&self) -> String {
        let alphabet = Self::alphabet();
        let mut rng = OsRng;
        (0..self.length)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_length_is_32() {
        let password = PasswordPolicy::default().generate();
        assert_eq!(password.chars().count(), 32);
    }

    #[test]
    fn test_configured_length() {
        for length in [1, 8, 64, 128] {
            assert_eq!(PasswordPolicy::new(length).generate().chars().count(), length);
        }
    }

    #[test]
    fn test_only_alphabet_characters() {
        let alphabet: HashSet<char> = PasswordPolicy::alphabet().into_iter().collect();
        for _ in 0..50 {
            let password = PasswordPolicy::new(64).generate();
            assert!(
                password.chars().all(|c| alphabet.contains(&c)),
                "unexpected character in {password}"
            );
        }
    }

    #[test]
    fn test_alphabet_excludes_characters_rds_rejects() {
        let alphabet = PasswordPolicy::alphabet();
        for forbidden in ['/', '\'', '"', '@', ' '] {
            assert!(!alphabet.contains(&forbidden), "{forbidden:?} allowed");
        }
        assert_eq!(alphabet.len(), 26 + 26 + 10 + PASSWORD_PUNCTUATION.len());
    }

    #[test]
    fn test_passwords_differ_between_calls() {
        let policy = PasswordPolicy::default();
        let generated: HashSet<String> = (0..20).map(|_| policy.generate()).collect();
        assert_eq!(generated.len(), 20);
    }
}
