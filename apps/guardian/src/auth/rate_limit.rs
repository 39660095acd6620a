// [apps/guardian/src/auth/rate_limit.rs]
//! In-memory per-IP login rate limiter: window = 1 minute, cap = 10
//! attempts (`spec.md` §4.6). Guarded by its own mutex, independent of the
//! runner's and collector's locks (`spec.md` §5).

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);
const MAX_ATTEMPTS: u32 = 10;

struct AttemptWindow {
    count: u32,
    window_started: Instant,
}

/// Tracks login attempts per source IP over a sliding one-minute window.
/// Entries are pruned opportunistically on each check rather than on a
/// background timer, matching the teacher's guarded-map idiom.
pub struct LoginRateLimiter {
    attempts: Mutex<HashMap<IpAddr, AttemptWindow>>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self { attempts: Mutex::new(HashMap::new()) }
    }

    /// Records an attempt from `ip` and reports whether it is allowed.
    /// Returns `false` once the cap has been reached for the remainder of
    /// the window.
    pub fn check_and_record(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().unwrap();

        attempts.retain(|_, window| now.duration_since(window.window_started) < WINDOW);

        let window = attempts.entry(ip).or_insert_with(|| AttemptWindow { count: 0, window_started: now });
        if now.duration_since(window.window_started) >= WINDOW {
            window.count = 0;
            window.window_started = now;
        }

        if window.count >= MAX_ATTEMPTS {
            return false;
        }
        window.count += 1;
        true
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    #[test]
    fn tenth_attempt_allowed_eleventh_rejected() {
        let limiter = LoginRateLimiter::new();
        for _ in 0..10 {
            assert!(limiter.check_and_record(ip()));
        }
        assert!(!limiter.check_and_record(ip()));
    }

    #[test]
    fn different_ips_have_independent_budgets() {
        let limiter = LoginRateLimiter::new();
        for _ in 0..10 {
            assert!(limiter.check_and_record(ip()));
        }
        assert!(!limiter.check_and_record(ip()));
        assert!(limiter.check_and_record(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
    }
}
