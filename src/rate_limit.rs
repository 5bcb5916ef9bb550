use dashmap::DashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;

// Rate limit bucket key, one per caller address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    // used when neither a peer address nor a forwarded header is available
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IpAddr> for ClientIdentity {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Rate window - tracks admitted requests per client
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub count: u32,
    pub window_start: Instant,
}

impl RateWindow {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }
}

// Fixed window counter per client, process local.
// check + increment happen under the entry lock
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    max_requests: u32,
    window: Duration,
    windows: DashMap<ClientIdentity, RateWindow>,
}

impl RateLimiter {
    // max_requests = 0 turns limiting off
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                max_requests,
                window,
                windows: DashMap::new(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.max_requests > 0
    }

    pub fn max_requests(&self) -> u32 {
        self.inner.max_requests
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    pub fn check(&self, client: &ClientIdentity) -> Result<(), Duration> {
        self.check_at(client, Instant::now())
    }

    // Counts one request for `client` at `now`.
    // Returns `Err(retry_after)` once the window's quota is spent, with the
    // time left until the window resets. Rejected calls don't count.
    pub fn check_at(&self, client: &ClientIdentity, now: Instant) -> Result<(), Duration> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut entry = self
            .inner
            .windows
            .entry(client.clone())
            .or_insert_with(|| RateWindow::fresh(now));

        let elapsed = now.saturating_duration_since(entry.window_start);

        // window expired..? start a new one
        if elapsed >= self.inner.window {
            *entry = RateWindow::fresh(now);
        }

        // over limit
        if entry.count >= self.inner.max_requests {
            let elapsed = now.saturating_duration_since(entry.window_start);
            return Err(self.inner.window.saturating_sub(elapsed));
        }

        entry.count += 1;
        Ok(())
    }

    // Snapshot of one client's window, mostly for tests and debugging
    pub fn window_for(&self, client: &ClientIdentity) -> Option<RateWindow> {
        self.inner.windows.get(client).map(|entry| *entry)
    }

    pub fn tracked_clients(&self) -> usize {
        self.inner.windows.len()
    }

    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    // Drop windows that have run out, returns how many were removed
    pub fn cleanup_at(&self, now: Instant) -> usize {
        let window = self.inner.window;
        let before = self.inner.windows.len();
        self.inner
            .windows
            .retain(|_, w| now.saturating_duration_since(w.window_start) < window);
        before.saturating_sub(self.inner.windows.len())
    }

    // Human form of the quota, e.g. "5 per 1 minute"
    pub fn describe_quota(&self) -> String {
        format!(
            "{} per {}",
            self.inner.max_requests,
            describe_window(self.inner.window)
        )
    }
}

fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    let (amount, unit) = if secs > 0 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs > 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if amount == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", amount, unit)
    }
}

// Sweeper - removes expired windows every `every`
pub async fn cleanup_loop(limiter: RateLimiter, every: Duration) {
    let mut interval = interval(every);

    tracing::debug!(interval = ?every, "Rate limit sweeper started");

    loop {
        interval.tick().await;

        let removed = limiter.cleanup();
        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = limiter.tracked_clients(),
                "Swept expired rate windows"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str) -> ClientIdentity {
        ClientIdentity::new(id)
    }

    #[test]
    fn fifth_request_allowed_sixth_rejected() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let c = client("10.0.0.1");
        let t0 = Instant::now();

        for i in 0..5 {
            assert!(
                limiter.check_at(&c, t0 + Duration::from_secs(i)).is_ok(),
                "request {} should pass",
                i + 1
            );
        }
        assert!(limiter.check_at(&c, t0 + Duration::from_secs(5)).is_err());
        assert!(limiter.check_at(&c, t0 + Duration::from_secs(59)).is_err());
    }

    #[test]
    fn new_window_after_expiry() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let c = client("10.0.0.1");
        let t0 = Instant::now();

        for _ in 0..5 {
            limiter.check_at(&c, t0).unwrap();
        }
        assert!(limiter.check_at(&c, t0).is_err());

        let later = t0 + Duration::from_secs(60);
        assert!(limiter.check_at(&c, later).is_ok());

        let window = limiter.window_for(&c).unwrap();
        assert_eq!(window.count, 1);
        assert_eq!(window.window_start, later);
    }

    #[test]
    fn retry_after_is_time_left_in_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let c = client("10.0.0.1");
        let t0 = Instant::now();

        limiter.check_at(&c, t0).unwrap();
        let retry = limiter
            .check_at(&c, t0 + Duration::from_secs(20))
            .unwrap_err();
        assert_eq!(retry, Duration::from_secs(40));
    }

    #[test]
    fn rejected_requests_do_not_count() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let c = client("10.0.0.1");
        let t0 = Instant::now();

        limiter.check_at(&c, t0).unwrap();
        limiter.check_at(&c, t0).unwrap();
        for _ in 0..10 {
            let _ = limiter.check_at(&c, t0);
        }
        assert_eq!(limiter.window_for(&c).unwrap().count, 2);
    }

    #[test]
    fn clients_have_separate_windows() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.check_at(&client("a"), t0).is_ok());
        assert!(limiter.check_at(&client("b"), t0).is_ok());
        assert!(limiter.check_at(&client("a"), t0).is_err());
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn zero_limit_disables() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        let c = client("a");
        for _ in 0..100 {
            assert!(limiter.check(&c).is_ok());
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn cleanup_drops_only_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let t0 = Instant::now();

        limiter.check_at(&client("old"), t0).unwrap();
        limiter
            .check_at(&client("new"), t0 + Duration::from_secs(30))
            .unwrap();

        let removed = limiter.cleanup_at(t0 + Duration::from_secs(61));
        assert_eq!(removed, 1);
        assert!(limiter.window_for(&client("old")).is_none());
        assert!(limiter.window_for(&client("new")).is_some());
    }

    #[test]
    fn concurrent_checks_never_exceed_quota() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let c = client("10.0.0.1");
        let t0 = Instant::now();

        let admitted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| limiter.check_at(&c, t0).is_ok() as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(admitted, 5);
    }

    #[test]
    fn quota_reads_like_a_sentence() {
        assert_eq!(
            RateLimiter::new(5, Duration::from_secs(60)).describe_quota(),
            "5 per 1 minute"
        );
        assert_eq!(
            RateLimiter::new(10, Duration::from_secs(120)).describe_quota(),
            "10 per 2 minutes"
        );
        assert_eq!(
            RateLimiter::new(3, Duration::from_secs(45)).describe_quota(),
            "3 per 45 seconds"
        );
        assert_eq!(
            RateLimiter::new(100, Duration::from_secs(3600)).describe_quota(),
            "100 per 1 hour"
        );
    }
}
