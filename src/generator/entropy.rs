//! Seed construction from several independent uniqueness sources.

use base64::Engine as _;
use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

/// Size of a generation seed in bytes.
pub const SEED_LEN: usize = 32;

const UUID_RANGE: std::ops::Range<usize> = 0..16;
const TIMESTAMP_RANGE: std::ops::Range<usize> = 16..24;
const COUNTER_RANGE: std::ops::Range<usize> = 24..28;
const MACHINE_TAG_RANGE: std::ops::Range<usize> = 28..32;

/// Length of the textual machine tag.
const MACHINE_TAG_LEN: usize = 8;

/// Transient seed for a single code generation.
pub type GenerationSeed = [u8; SEED_LEN];

/// Per-instance random tag distinguishing generator instances.
///
/// Eight random bytes rendered as URL-safe base64 and cut to eight characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineTag(String);

impl MachineTag {
    /// Draws a fresh tag.
    pub fn random() -> Self {
        let bytes: [u8; 8] = rand::rng().random();
        let mut encoded = base64::engine::general_purpose::URL_SAFE.encode(bytes);
        encoded.truncate(MACHINE_TAG_LEN);
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Inputs mixed into a seed, captured at the start of one generation call.
#[derive(Debug, Clone)]
pub struct SeedSources<'a> {
    pub unique_id: Uuid,
    pub timestamp_nanos: i64,
    pub counter: u64,
    pub machine_tag: &'a MachineTag,
}

impl<'a> SeedSources<'a> {
    /// Captures a fresh UUID and the current time for `counter` and `machine_tag`.
    pub fn capture(counter: u64, machine_tag: &'a MachineTag) -> Self {
        Self {
            unique_id: Uuid::new_v4(),
            timestamp_nanos: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            counter,
            machine_tag,
        }
    }
}

/// Overlays every source at its fixed position, then XORs the whole buffer
/// with 32 freshly drawn random bytes.
pub fn combine_seed(sources: &SeedSources<'_>) -> GenerationSeed {
    let mask: GenerationSeed = rand::rng().random();
    overlay_sources(sources, &mask)
}

fn overlay_sources(sources: &SeedSources<'_>, mask: &GenerationSeed) -> GenerationSeed {
    let mut seed = [0u8; SEED_LEN];

    seed[UUID_RANGE].copy_from_slice(sources.unique_id.as_bytes());
    seed[TIMESTAMP_RANGE].copy_from_slice(&sources.timestamp_nanos.to_le_bytes());
    seed[COUNTER_RANGE].copy_from_slice(&sources.counter.to_le_bytes()[..4]);

    let tag = sources.machine_tag.as_bytes();
    let tag_len = tag.len().min(MACHINE_TAG_RANGE.len());
    seed[MACHINE_TAG_RANGE.start..MACHINE_TAG_RANGE.start + tag_len].copy_from_slice(&tag[..tag_len]);

    for (byte, m) in seed.iter_mut().zip(mask) {
        *byte ^= m;
    }

    seed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_sources(tag: &MachineTag) -> SeedSources<'_> {
        SeedSources {
            unique_id: Uuid::from_bytes([0xAB; 16]),
            timestamp_nanos: 0x0102_0304_0506_0708,
            counter: 0x1122_3344_5566_7788,
            machine_tag: tag,
        }
    }

    #[test]
    fn test_machine_tag_shape() {
        let tag = MachineTag::random();
        assert_eq!(tag.as_str().len(), 8);
        assert!(
            tag.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_overlay_positions_with_zero_mask() {
        let tag = MachineTag("wxyzWXYZ".to_string());
        let seed = overlay_sources(&fixed_sources(&tag), &[0u8; SEED_LEN]);

        assert_eq!(&seed[0..16], &[0xAB; 16]);
        assert_eq!(&seed[16..24], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&seed[24..28], &[0x88, 0x77, 0x66, 0x55]);
        assert_eq!(&seed[28..32], b"wxyz");
    }

    #[test]
    fn test_mask_is_xored_over_whole_buffer() {
        let tag = MachineTag("wxyzWXYZ".to_string());
        let sources = fixed_sources(&tag);
        let plain = overlay_sources(&sources, &[0u8; SEED_LEN]);
        let masked = overlay_sources(&sources, &[0xFF; SEED_LEN]);

        for (p, m) in plain.iter().zip(masked.iter()) {
            assert_eq!(*m, !*p);
        }
    }

    #[test]
    fn test_combined_seeds_differ_between_calls() {
        let tag = MachineTag::random();
        let a = combine_seed(&SeedSources::capture(1, &tag));
        let b = combine_seed(&SeedSources::capture(1, &tag));
        assert_ne!(a, b);
    }
}
