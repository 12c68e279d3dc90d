//! Entropy-based short code generation and validation.

use std::sync::{Mutex, PoisonError};

use rand::Rng;

use super::entropy::{MachineTag, SeedSources, combine_seed};

/// Symbols legal in a short code. `0`, `i`, `l`, `o` and their uppercase
/// look-alikes are left out for legibility.
pub const ALPHABET: &[u8; 55] = b"abcdefghjkmnpqrstuvwxyzABCDEFGHJKMNPQRSTUVWXYZ123456789";

/// Shortest code accepted by [`is_valid_code`].
pub const MIN_CODE_LENGTH: usize = 4;

/// Longest code accepted by [`is_valid_code`].
pub const MAX_CODE_LENGTH: usize = 12;

/// Checks that `code` is 4..=12 characters drawn only from [`ALPHABET`].
pub fn is_valid_code(code: &str) -> bool {
    (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.len())
        && code.bytes().all(|b| ALPHABET.contains(&b))
}

/// Generator of short codes mixing a UUID, a nanosecond timestamp, an instance
/// counter, a machine tag and fresh randomness.
///
/// Codes are unlikely to collide but are not guaranteed unique; uniqueness is
/// enforced by the allocation loop against storage.
pub struct ShortCodeGenerator {
    default_length: usize,
    counter: Mutex<u64>,
    machine_tag: MachineTag,
}

impl ShortCodeGenerator {
    /// Creates a generator producing `default_length` codes from [`Self::generate`].
    pub fn new(default_length: usize) -> Self {
        Self {
            default_length,
            counter: Mutex::new(0),
            machine_tag: MachineTag::random(),
        }
    }

    pub fn default_length(&self) -> usize {
        self.default_length
    }

    pub fn machine_tag(&self) -> &MachineTag {
        &self.machine_tag
    }

    /// Generates a code of the configured default length.
    pub fn generate(&self) -> String {
        self.generate_with_length(self.default_length)
    }

    /// Generates a code of exactly `length` alphabet symbols.
    pub fn generate_with_length(&self, length: usize) -> String {
        let counter = self.next_counter();
        let seed = combine_seed(&SeedSources::capture(counter, &self.machine_tag));

        let mut rng = rand::rng();
        (0..length)
            .map(|i| {
                let drawn = rng.random_range(0..ALPHABET.len());
                let index = (drawn + usize::from(seed[i % seed.len()])) % ALPHABET.len();
                char::from(ALPHABET[index])
            })
            .collect()
    }

    /// Same rule as [`is_valid_code`].
    pub fn is_valid(&self, code: &str) -> bool {
        is_valid_code(code)
    }

    fn next_counter(&self) -> u64 {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        *counter = counter.wrapping_add(1);
        *counter
    }
}
