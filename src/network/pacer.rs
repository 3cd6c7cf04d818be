//! Outgoing-bandwidth pacing (`spec.md` §4.4 "Pacing").
//!
//! A simple token bucket: bytes refill continuously up to `capacity`, and a
//! send is allowed only if enough tokens are available. Under congestion the
//! transport drops `Ping` messages first and queues `Input` messages rather
//! than dropping them (`spec.md`: "`Input` is never dropped locally").

use web_time::Duration;

/// Default bucket capacity: 16 KiB.
pub const DEFAULT_CAPACITY_BYTES: u32 = 16 * 1024;
/// Default refill rate: 4 KiB/s.
pub const DEFAULT_REFILL_BYTES_PER_SEC: u32 = 4 * 1024;

/// A token bucket gating how many bytes may be sent per unit time.
#[derive(Debug, Clone, Copy)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
}

impl TokenBucket {
    /// Creates a bucket starting full, with the given capacity and refill
    /// rate, both in bytes.
    #[must_use]
    pub fn new(capacity_bytes: u32, refill_bytes_per_sec: u32) -> Self {
        Self {
            capacity: f64::from(capacity_bytes),
            tokens: f64::from(capacity_bytes),
            refill_per_sec: f64::from(refill_bytes_per_sec),
        }
    }

    /// Adds tokens for the elapsed duration, never exceeding capacity.
    pub fn refill(&mut self, elapsed: Duration) {
        self.tokens = (self.tokens + self.refill_per_sec * elapsed.as_secs_f64()).min(self.capacity);
    }

    /// Attempts to withdraw `bytes` tokens. Returns `true` and deducts them
    /// on success; returns `false` and leaves the bucket untouched if
    /// insufficient tokens are available.
    #[must_use]
    pub fn try_consume(&mut self, bytes: u32) -> bool {
        let bytes = f64::from(bytes);
        if self.tokens >= bytes {
            self.tokens -= bytes;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, in bytes (fractional tokens truncated).
    #[must_use]
    pub fn available(&self) -> u32 {
        self.tokens as u32
    }
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_BYTES, DEFAULT_REFILL_BYTES_PER_SEC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full() {
        let bucket = TokenBucket::new(1000, 100);
        assert_eq!(bucket.available(), 1000);
    }

    #[test]
    fn consume_drains_tokens() {
        let mut bucket = TokenBucket::new(1000, 100);
        assert!(bucket.try_consume(400));
        assert_eq!(bucket.available(), 600);
    }

    #[test]
    fn consume_fails_when_insufficient() {
        let mut bucket = TokenBucket::new(100, 10);
        assert!(!bucket.try_consume(200));
        assert_eq!(bucket.available(), 100);
    }

    #[test]
    fn refill_caps_at_capacity() {
        let mut bucket = TokenBucket::new(100, 1000);
        bucket.try_consume(100);
        bucket.refill(Duration::from_secs(10));
        assert_eq!(bucket.available(), 100);
    }

    #[test]
    fn refill_adds_proportional_tokens() {
        let mut bucket = TokenBucket::new(1000, 100);
        bucket.try_consume(1000);
        bucket.refill(Duration::from_millis(500));
        assert_eq!(bucket.available(), 50);
    }

    #[test]
    fn default_matches_spec_capacity_and_refill() {
        let bucket = TokenBucket::default();
        assert_eq!(bucket.available(), DEFAULT_CAPACITY_BYTES);
    }
}
