//! Millisecond clock abstraction used by the Snowflake generator.

use std::time::Duration;

use chrono::Utc;

const SPIN_POLLS: u32 = 64;
const BACKOFF_SLEEP: Duration = Duration::from_micros(200);

/// Source of wall-clock milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;

    /// Blocks until the clock reads strictly later than `millis`, returning the new reading.
    fn wait_past(&self, millis: i64) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn wait_past(&self, millis: i64) -> i64 {
        // Sequence exhaustion clears within a millisecond, so yield first and
        // only fall back to sleeping for longer gaps.
        let mut polls = 0u32;
        loop {
            let now = self.now_millis();
            if now > millis {
                return now;
            }
            if polls < SPIN_POLLS {
                polls += 1;
                std::thread::yield_now();
            } else {
                std::thread::sleep(BACKOFF_SLEEP);
            }
        }
    }
}
