//! Random secret generation.

use rand::seq::{IndexedRandom, SliceRandom};
use zeroize::Zeroizing;

use crate::errors::{CaskError, Result};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!#$%&()*+,-./:;<=>?@[]^_{|}~";

/// Upper bound on generated length.
pub const MAX_LENGTH: usize = 1024;

/// Which character classes a generated secret draws from.
///
/// Letters (both cases) are always included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharsetPolicy {
    pub include_symbols: bool,
    pub include_digits: bool,
    /// Requested lengths below this are raised to it.
    pub min_length: usize,
}

impl Default for CharsetPolicy {
    fn default() -> Self {
        Self {
            include_symbols: true,
            include_digits: true,
            min_length: 12,
        }
    }
}

impl CharsetPolicy {
    fn classes(&self) -> Vec<&'static [u8]> {
        let mut classes = vec![LOWERCASE, UPPERCASE];
        if self.include_digits {
            classes.push(DIGITS);
        }
        if self.include_symbols {
            classes.push(SYMBOLS);
        }
        classes
    }
}

/// Generate a random secret using the thread-local CSPRNG.
///
/// Every enabled class appears at least once; the effective length is
/// the largest of `length`, `policy.min_length` and the number of
/// enabled classes.
pub fn generate(length: usize, policy: &CharsetPolicy) -> Result<Zeroizing<String>> {
    let classes = policy.classes();
    let length = length.max(policy.min_length).max(classes.len());
    if length > MAX_LENGTH {
        return Err(CaskError::Usage(format!(
            "generated secrets are limited to {MAX_LENGTH} characters"
        )));
    }

    let alphabet: Vec<u8> = classes.iter().flat_map(|c| c.iter().copied()).collect();
    let mut rng = rand::rng();
    let mut chars: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::with_capacity(length));

    // One guaranteed pick from each class, the rest from the full alphabet.
    for class in &classes {
        if let Some(&c) = class.choose(&mut rng) {
            chars.push(c);
        }
    }
    while chars.len() < length {
        if let Some(&c) = alphabet.choose(&mut rng) {
            chars.push(c);
        }
    }
    chars.shuffle(&mut rng);

    let secret: String = chars.iter().map(|&b| char::from(b)).collect();
    Ok(Zeroizing::new(secret))
}
