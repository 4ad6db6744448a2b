//! Rate-limited recompute trigger.
//!
//! Decides whether a dataset may be evaluated: the window must be full and the
//! cooldown started by the previous evaluation must have elapsed.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of a trigger check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerDecision {
    /// The dataset may be evaluated now.
    Ready,
    /// The window holds fewer rows than required.
    InsufficientData {
        /// Rows currently held.
        len: usize,
        /// Rows required.
        required: usize,
    },
    /// A previous evaluation's cooldown has not elapsed.
    CoolingDown {
        /// Earliest time of the next evaluation.
        next_allowed: DateTime<Utc>,
    },
}

impl TriggerDecision {
    /// Returns true if the dataset may be evaluated.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Per-dataset throttle state.
#[derive(Debug, Clone)]
pub struct Throttle {
    period: TimeDelta,
    next_allowed: Option<DateTime<Utc>>,
}

impl Throttle {
    /// Creates a throttle that allows one evaluation per `period`.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: TimeDelta::from_std(period).unwrap_or(TimeDelta::MAX),
            next_allowed: None,
        }
    }

    /// Decides whether an evaluation may run at `now`.
    #[must_use]
    pub fn decide(&self, window_len: usize, window_size: usize, now: DateTime<Utc>) -> TriggerDecision {
        if window_len < window_size {
            return TriggerDecision::InsufficientData {
                len: window_len,
                required: window_size,
            };
        }

        match self.next_allowed {
            Some(next_allowed) if next_allowed > now => TriggerDecision::CoolingDown { next_allowed },
            _ => TriggerDecision::Ready,
        }
    }

    /// Records an evaluation at `now`, starting a new cooldown.
    pub fn mark_evaluated(&mut self, now: DateTime<Utc>) {
        self.next_allowed = Some(
            now.checked_add_signed(self.period)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
    }

    /// Earliest time of the next evaluation, if one has run.
    #[must_use]
    pub fn next_allowed(&self) -> Option<DateTime<Utc>> {
        self.next_allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_insufficient_data() {
        let throttle = Throttle::new(Duration::from_secs(5));

        for len in 0..10 {
            assert_eq!(
                throttle.decide(len, 10, t(0)),
                TriggerDecision::InsufficientData {
                    len,
                    required: 10
                }
            );
        }
        assert!(throttle.decide(10, 10, t(0)).is_ready());
    }

    #[test]
    fn test_cooldown_boundaries() {
        let mut throttle = Throttle::new(Duration::from_secs(5));
        throttle.mark_evaluated(t(0));

        assert_eq!(throttle.next_allowed(), Some(t(5)));
        assert_eq!(
            throttle.decide(10, 10, t(4)),
            TriggerDecision::CoolingDown {
                next_allowed: t(5)
            }
        );
        assert!(throttle.decide(10, 10, t(5)).is_ready());
        assert!(throttle.decide(10, 10, t(6)).is_ready());
    }

    #[test]
    fn test_insufficient_data_wins_over_cooldown() {
        let mut throttle = Throttle::new(Duration::from_secs(5));
        throttle.mark_evaluated(t(0));

        assert!(matches!(
            throttle.decide(3, 10, t(1)),
            TriggerDecision::InsufficientData { .. }
        ));
    }

    #[test]
    fn test_zero_period_never_cools_down() {
        let mut throttle = Throttle::new(Duration::ZERO);
        throttle.mark_evaluated(t(0));
        assert!(throttle.decide(1, 1, t(0)).is_ready());
    }

    #[test]
    fn test_huge_period_saturates() {
        let mut throttle = Throttle::new(Duration::from_secs(u64::MAX));
        throttle.mark_evaluated(t(0));
        assert!(!throttle.decide(1, 1, t(1_000_000)).is_ready());
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_value(TriggerDecision::InsufficientData {
            len: 3,
            required: 10,
        })
        .unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["len"], 3);
    }
}
