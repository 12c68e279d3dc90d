//! Short code and ID generation.
//!
//! - [`shortcode`] - entropy-seeded codes over a legibility-friendly alphabet
//! - [`entropy`] - seed construction from several uniqueness sources
//! - [`snowflake`] - time-ordered 63-bit IDs
//! - [`base62`] - compact integer encoding used for Snowflake-derived codes
//! - [`clock`] - millisecond clock seam for the Snowflake generator
//!
//! None of these guarantee global uniqueness of a code on their own; see
//! [`crate::application::services::CodeAllocator`].

pub mod base62;
pub mod clock;
pub mod entropy;
pub mod shortcode;
pub mod snowflake;

pub use base62::{base62_decode, base62_encode};
pub use clock::{Clock, SystemClock};
pub use shortcode::{ALPHABET, ShortCodeGenerator, is_valid_code};
pub use snowflake::{SnowflakeGenerator, SnowflakeParts};

/// Anything able to propose a candidate short code.
pub trait CodeSource: Send + Sync {
    fn next_code(&self) -> String;
}

impl CodeSource for ShortCodeGenerator {
    fn next_code(&self) -> String {
        self.generate()
    }
}

impl<C: Clock> CodeSource for SnowflakeGenerator<C> {
    fn next_code(&self) -> String {
        self.generate_as_short_code()
    }
}
