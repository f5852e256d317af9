//! Exponential backoff shared by chunk writes and resumable steps.

use std::time::Duration;

/// Delay before retrying after failed attempt number `attempt` (0-based).
///
/// The delay is `base * 2^attempt`, saturating instead of overflowing.
///
/// # Arguments
/// * `attempt` - Index of the attempt that just failed (0 = first attempt)
/// * `base` - The base delay duration
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let multiplier: u32 = 2_u32.saturating_pow(attempt);
    base.saturating_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(0, base), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1, base), Duration::from_millis(2000));
        assert_eq!(backoff_delay(2, base), Duration::from_millis(4000));
        assert_eq!(backoff_delay(3, base), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_zero_base() {
        assert_eq!(backoff_delay(10, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_backoff_saturates() {
        let delay = backoff_delay(64, Duration::from_secs(u64::MAX / 2));
        assert!(delay >= Duration::from_secs(u64::MAX / 2));
    }
}
