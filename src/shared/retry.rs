use std::time::Duration;

/// Delay before retry attempt `attempt` (0-based), with full jitter: a uniform
/// random duration in `[0, min(base * 2^attempt, max))`. Every retried call in
/// the crate routes through this one function; many devices regaining
/// connectivity at once must not hammer the server in lockstep.
pub fn backoff(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let capped = base_delay_ms.saturating_mul(factor).min(max_delay_ms);
    let jittered = (capped as f64 * rand::random::<f64>()) as u64;
    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_below_exponential_cap() {
        for attempt in 0..8 {
            let cap = 1_000u64.saturating_mul(1 << attempt).min(60_000);
            for _ in 0..200 {
                let delay = backoff(attempt, 1_000, 60_000);
                assert!(delay < Duration::from_millis(cap.max(1)));
            }
        }
    }

    #[test]
    fn first_retry_is_uniform_over_base_window() {
        let samples: Vec<u64> = (0..1_000)
            .map(|_| backoff(0, 1_000, 60_000).as_millis() as u64)
            .collect();
        assert!(samples.iter().all(|&ms| ms < 1_000));
        let mean = samples.iter().sum::<u64>() as f64 / samples.len() as f64;
        // Uniform over [0, 1000) has mean 500; allow a wide band for sampling noise.
        assert!((mean - 500.0).abs() < 50.0, "mean was {mean}");
        // Not a fixed value: repeated calls with the same attempt must vary.
        let distinct: std::collections::HashSet<u64> = samples.iter().copied().collect();
        assert!(distinct.len() > 100);
    }

    #[test]
    fn saturates_at_max_delay_for_large_attempts() {
        for _ in 0..200 {
            let delay = backoff(63, 1_000, 60_000);
            assert!(delay < Duration::from_millis(60_000));
        }
        // No overflow panic even past the shift width.
        let _ = backoff(200, 1_000, 60_000);
    }
}
