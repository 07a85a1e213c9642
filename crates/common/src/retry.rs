//! Shared exponential backoff schedule for C3 (L3 judgement), C4 (Post-L3
//! review), and the L1 preprint-fetch 503 handling.
//!
//! The original batch code computes `base * 2^attempt` and never clamps it
//! against its own `BACKOFF_MAX_SEC` constant, so the 32s cap is defined but
//! dead. `backoff_delay` below clamps unconditionally, making the cap real.

use std::time::Duration;

/// `base * 2^attempt`, capped at `cap`. `attempt` is zero-based (first retry
/// is attempt 0).
pub fn backoff_delay(base: Duration, attempt: u32, cap: Duration) -> Duration {
    let scaled = base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    std::cmp::min(scaled, cap)
}

/// `rate_limit * 3^attempt`, used for the L1 preprint-API 503 backoff.
/// Uncapped by contract, bounded in practice by R1=3: 3s, 9s, 27s.
pub fn arxiv_backoff_delay(rate_limit: Duration, attempt: u32) -> Duration {
    let factor = 3u32.checked_pow(attempt).unwrap_or(u32::MAX);
    rate_limit.saturating_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_each_attempt() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(32);
        assert_eq!(backoff_delay(base, 0, cap), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1, cap), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2, cap), Duration::from_secs(4));
    }

    #[test]
    fn never_exceeds_cap() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(32);
        assert_eq!(backoff_delay(base, 10, cap), cap);
        assert_eq!(backoff_delay(base, 100, cap), cap);
    }

    #[test]
    fn arxiv_backoff_matches_reference_schedule() {
        let rate_limit = Duration::from_secs(3);
        assert_eq!(arxiv_backoff_delay(rate_limit, 0), Duration::from_secs(3));
        assert_eq!(arxiv_backoff_delay(rate_limit, 1), Duration::from_secs(9));
        assert_eq!(arxiv_backoff_delay(rate_limit, 2), Duration::from_secs(27));
    }
}
