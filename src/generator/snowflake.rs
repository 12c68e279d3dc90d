//! Snowflake-style distributed ID generation.
//!
//! Layout of a generated ID (63 significant bits):
//!
//! ```text
//! | 41 bits elapsed ms since epoch | 10 bits machine id | 12 bits sequence |
//! ```

use std::sync::{Mutex, PoisonError};

use tracing::warn;

use super::base62::base62_encode;
use super::clock::{Clock, SystemClock};

/// Reference instant for the timestamp field: 2024-01-01T00:00:00Z.
pub const SNOWFLAKE_EPOCH_MILLIS: i64 = 1_704_067_200_000;

const MACHINE_ID_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_BITS: u32 = 41;

/// Largest backwards clock step that is waited out. Larger steps are ridden
/// out on the last issued timestamp instead of blocking the caller.
pub const MAX_BACKWARD_WAIT_MILLIS: i64 = 100;

pub const MAX_MACHINE_ID: u64 = (1 << MACHINE_ID_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << TIMESTAMP_BITS) - 1;
const MACHINE_ID_SHIFT: u32 = SEQUENCE_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + MACHINE_ID_BITS;

/// Fields of a decoded Snowflake ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnowflakeParts {
    pub elapsed_millis: u64,
    pub machine_id: u64,
    pub sequence: u64,
}

impl SnowflakeParts {
    /// Splits an ID into its timestamp, machine and sequence fields.
    pub fn decompose(id: u64) -> Self {
        Self {
            elapsed_millis: (id >> TIMESTAMP_SHIFT) & TIMESTAMP_MASK,
            machine_id: (id >> MACHINE_ID_SHIFT) & MAX_MACHINE_ID,
            sequence: id & SEQUENCE_MASK,
        }
    }
}

#[derive(Debug, Default)]
struct SequenceState {
    sequence: u64,
    last_timestamp: i64,
}

/// Snowflake ID generator owned by one process or component.
///
/// Two generators produce disjoint IDs as long as their machine ids differ.
pub struct SnowflakeGenerator<C: Clock = SystemClock> {
    epoch_millis: i64,
    machine_id: u64,
    clock: C,
    state: Mutex<SequenceState>,
}

impl SnowflakeGenerator<SystemClock> {
    /// Creates a generator on the system clock. `machine_id` is masked to 10 bits.
    pub fn new(machine_id: u16) -> Self {
        Self::with_clock(machine_id, SystemClock)
    }
}

impl<C: Clock> SnowflakeGenerator<C> {
    /// Creates a generator reading time from `clock`.
    pub fn with_clock(machine_id: u16, clock: C) -> Self {
        Self {
            epoch_millis: SNOWFLAKE_EPOCH_MILLIS,
            machine_id: u64::from(machine_id) & MAX_MACHINE_ID,
            clock,
            state: Mutex::new(SequenceState::default()),
        }
    }

    /// The machine id embedded in every ID from this generator.
    pub fn machine_id(&self) -> u64 {
        self.machine_id
    }

    /// Produces the next ID.
    ///
    /// When the 4096 sequence values of the current millisecond are used up, the
    /// call blocks until the clock moves on. A clock that went backwards by at
    /// most [`MAX_BACKWARD_WAIT_MILLIS`] is waited out the same way. A larger
    /// step keeps issuing IDs from the last timestamp, advancing it by one
    /// millisecond per exhausted sequence, until the clock catches up. Either
    /// way IDs strictly increase and never carry an older timestamp.
    pub fn generate(&self) -> u64 {
        // The state is two integers updated together; a panic elsewhere cannot leave it torn.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut now = self.clock.now_millis();

        if now < state.last_timestamp {
            let drift = state.last_timestamp - now;
            if drift <= MAX_BACKWARD_WAIT_MILLIS {
                warn!(drift, "Clock moved backwards, waiting for it to catch up");
                now = self.clock.wait_past(state.last_timestamp - 1);
            } else {
                warn!(drift, "Clock moved backwards, issuing from the last timestamp");
                now = state.last_timestamp;
            }
        }

        if now == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                now = if self.clock.now_millis() < state.last_timestamp {
                    state.last_timestamp + 1
                } else {
                    self.clock.wait_past(state.last_timestamp)
                };
            }
        } else {
            state.sequence = 0;
        }

        state.last_timestamp = now;

        let elapsed = ((now - self.epoch_millis).max(0) as u64) & TIMESTAMP_MASK;

        (elapsed << TIMESTAMP_SHIFT) | (self.machine_id << MACHINE_ID_SHIFT) | state.sequence
    }

    /// Produces the next ID rendered as Base62.
    pub fn generate_as_short_code(&self) -> String {
        base62_encode(self.generate())
    }
}
