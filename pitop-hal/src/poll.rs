//! Retry-until-plausible polling.
//!
//! The gauge and the hub both return transient zero or garbage values, so no
//! reading is trusted on first sight. Every bus operation in this crate goes
//! through [`Poller::poll`].
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::error::BusFailure;

/// Outcome of a polled bus operation.
pub type PollResult<T> = Result<T, BusFailure>;

/// Attempt budget and inter-attempt delay for polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of times the operation is tried.
    pub max_attempts: u32,
    /// Time slept before each retry. No delay precedes the first attempt.
    pub delay: Duration,
}

impl PollPolicy {
    /// Attempts made before giving up unless configured otherwise.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
    /// Delay between attempts unless configured otherwise.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

    /// Create a policy with the given budget and delay.
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}

/// Runs bus operations until they yield a plausible value.
///
/// The poller owns the delay provider so that the same sleeping strategy is
/// used for every register and status read in a process.
#[derive(Debug)]
pub struct Poller<D> {
    policy: PollPolicy,
    delay: D,
}

impl<D: DelayNs> Poller<D> {
    /// Create a poller with the given policy, sleeping through `delay`.
    pub fn new(policy: PollPolicy, delay: D) -> Self {
        Self { policy, delay }
    }

    /// The policy in force.
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Repeat `operation` until it returns a value accepted by `is_plausible`.
    ///
    /// A `None` from the operation counts as an implausible attempt. After the
    /// first attempt, the policy delay is slept before every retry.
    ///
    /// # Errors
    ///
    /// [`BusFailure`] carrying the attempt budget if no attempt was plausible.
    pub fn poll<T>(
        &mut self,
        mut operation: impl FnMut() -> Option<T>,
        is_plausible: impl Fn(&T) -> bool,
    ) -> PollResult<T> {
        let max_attempts = self.policy.max_attempts;
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                self.sleep();
            }
            match operation() {
                Some(value) if is_plausible(&value) => return Ok(value),
                Some(_) => tracing::debug!(attempt, "discarding implausible reading"),
                None => tracing::debug!(attempt, "no reading"),
            }
        }
        tracing::warn!(attempts = max_attempts, "polling exhausted without a plausible reading");
        Err(BusFailure {
            attempts: max_attempts,
        })
    }

    fn sleep(&mut self) {
        let ms = u32::try_from(self.policy.delay.as_millis()).unwrap_or(u32::MAX);
        self.delay.delay_ms(ms);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Records every millisecond delay requested.
    #[derive(Debug, Default)]
    struct RecordingDelay(Vec<u32>);

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, _ns: u32) {}

        fn delay_ms(&mut self, ms: u32) {
            self.0.push(ms);
        }
    }

    fn poller() -> Poller<RecordingDelay> {
        Poller::new(PollPolicy::default(), RecordingDelay::default())
    }

    #[test]
    fn plausible_on_third_attempt() {
        let mut poller = poller();
        let mut readings = [250u16, 300, 47].into_iter();
        let value = poller.poll(|| readings.next(), |v| *v <= 100);
        assert_eq!(value, Ok(47));
        // Two discarded readings, two sleeps.
        assert_eq!(poller.delay.0, [100, 100]);
    }

    #[test]
    fn exhaustion_reports_attempt_budget() {
        let mut poller = poller();
        let mut calls = 0;
        let result = poller.poll(
            || {
                calls += 1;
                Some(101u16)
            },
            |v| *v <= 100,
        );
        assert_eq!(result, Err(BusFailure { attempts: 20 }));
        assert_eq!(calls, 20);
        assert_eq!(poller.delay.0.len(), 19);
    }

    #[test]
    fn none_counts_as_an_attempt() {
        let mut poller = Poller::new(
            PollPolicy::new(3, Duration::from_millis(5)),
            RecordingDelay::default(),
        );
        let result = poller.poll(|| None::<u8>, |_| true);
        assert_eq!(result, Err(BusFailure { attempts: 3 }));
        assert_eq!(poller.delay.0, [5, 5]);
    }

    #[test]
    fn first_attempt_is_not_delayed() {
        let mut poller = poller();
        assert_eq!(poller.poll(|| Some(1), |_| true), Ok(1));
        assert!(poller.delay.0.is_empty());
    }
}
