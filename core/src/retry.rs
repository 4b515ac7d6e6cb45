//! Bounded polling helper
//!
//! Every wait in the manager (link up, DHCP address, auto-negotiation) is a
//! probe repeated at a fixed interval until it yields a value or a ceiling
//! passes.

use core::future::Future;

use embassy_time::{Duration, Instant, Timer};

/// Interval and ceiling of one bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Run `probe` until it returns `Some`, sleeping `policy.interval` between
/// attempts. Returns `None` once `policy.timeout` has elapsed.
///
/// The probe always runs at least once, even with a zero timeout.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + policy.timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        Timer::after(policy.interval).await;
    }
}
