use std::time::Duration;

/// How often and how patiently a request is repeated while the target answers `WAIT`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total number of sends per request, including the first one. Never below 1.
    pub max_attempts: u32,
    /// Pause after the first `WAIT`. Doubles after every further `WAIT`.
    pub delay: Duration,
    /// Upper bound for the pause between two attempts
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            delay: Duration::ZERO,
            max_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// A policy that sends every request exactly once.
    pub fn no_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        }
    }

    /// The pause after the `attempt`-th send (counting from 1) answered `WAIT`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Builder to create a [crate::SwdClient] and modify its retry behavior
///
/// # Example
///
/// ```
/// use swd_client::Builder;
/// use swd_protocol::transport::Loopback;
/// use std::time::Duration;
///
/// let client = Builder::new()
///     .max_attempts(10)
///     .delay(Duration::from_micros(50))
///     .max_delay(Duration::from_millis(1))
///     .build(Loopback::new());
/// assert_eq!(client.retry_policy().max_attempts, 10);
/// ```
#[derive(Default)]
pub struct Builder {
    policy: RetryPolicy,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the number of sends per request. Values below 1 are raised to 1.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts.max(1);
        self
    }

    /// Set the pause after the first `WAIT`
    pub fn delay(mut self, delay: Duration) -> Self {
        self.policy.delay = delay;
        self
    }

    /// Set the upper bound for the pause between two attempts
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.policy.max_delay = max_delay;
        self
    }

    /// Build and return the client
    pub fn build<T: swd_protocol::transport::Transport>(self, transport: T) -> crate::SwdClient<T> {
        crate::SwdClient::with_retry_policy(transport, self.policy)
    }
}

#[test]
fn delay_doubles_up_to_the_limit() {
    let policy = RetryPolicy {
        max_attempts: 10,
        delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    };
    assert_eq!(policy.delay_for(1), Duration::from_millis(1));
    assert_eq!(policy.delay_for(2), Duration::from_millis(2));
    assert_eq!(policy.delay_for(3), Duration::from_millis(4));
    assert_eq!(policy.delay_for(4), Duration::from_millis(5));
    assert_eq!(policy.delay_for(40), Duration::from_millis(5));
}

#[test]
fn zero_delay_stays_zero() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(1), Duration::ZERO);
    assert_eq!(policy.delay_for(100), Duration::ZERO);
}

#[test]
fn builder_never_goes_below_one_attempt() {
    let builder = Builder::new().max_attempts(0);
    assert_eq!(builder.policy.max_attempts, 1);
}
