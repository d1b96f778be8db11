//! Pool configuration.

use codec::{max_record_len, CodecLimits, NoiseThresholds, Tick};
use world::{Fixed, TICRATE};

use crate::error::ConfigError;

/// Distance-based update throttling.
///
/// Elements near the client's viewpoint may be resent every
/// `min_update_ticks`; elements at or beyond `far_distance` wait
/// `max_update_ticks` between updates. In between the interval grows
/// linearly. Distances are in whole map units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ThrottleConfig {
    pub min_update_ticks: u32,
    pub max_update_ticks: u32,
    pub near_distance: i32,
    pub far_distance: i32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_update_ticks: 1,
            max_update_ticks: TICRATE,
            near_distance: 1024,
            far_distance: 4096,
        }
    }
}

impl ThrottleConfig {
    /// Every element is eligible on every tick.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            min_update_ticks: 1,
            max_update_ticks: 1,
            near_distance: 0,
            far_distance: 0,
        }
    }

    /// Ticks that must pass between two updates of an element at
    /// `distance` from the viewpoint. `None` means the distance is unknown.
    #[must_use]
    pub fn interval(&self, distance: Option<Fixed>) -> u32 {
        let min = self.min_update_ticks;
        let max = self.max_update_ticks.max(min);
        let Some(distance) = distance else {
            return min;
        };
        // 16.16 in i64: configured distances beyond the Fixed range stay exact.
        let near = i64::from(self.near_distance) << 16;
        let far = i64::from(self.far_distance) << 16;
        let d = i64::from(distance.raw());
        if d <= near || far <= near {
            return min;
        }
        if d >= far {
            return max;
        }
        let span = i64::from(max - min);
        let offset = span * (d - near) / (far - near);
        min + u32::try_from(offset).unwrap_or(0)
    }

    /// Whether an element last sent at `last_sent` may be sent at `now`.
    #[must_use]
    pub fn is_due(&self, distance: Option<Fixed>, last_sent: Option<Tick>, now: Tick) -> bool {
        last_sent.map_or(true, |last| now.since(last) >= self.interval(distance))
    }
}

/// Per-pool behavior shared by every client of a server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Set size budgets and the client receive window.
    pub limits: CodecLimits,
    pub thresholds: NoiseThresholds,
    /// Unacknowledged sets allowed before the builder stops (backpressure).
    pub max_outstanding_sets: usize,
    /// New incremental sets built per pool per tick.
    pub max_sets_per_tick: usize,
    /// Ticks without an ack before an in-flight set is resent.
    pub resend_ticks: u32,
    /// Resends of one set before the client is presumed gone.
    pub max_resends: u32,
    pub throttle: ThrottleConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            limits: CodecLimits::default(),
            thresholds: NoiseThresholds::default(),
            max_outstanding_sets: 16,
            max_sets_per_tick: 1,
            resend_ticks: 2 * TICRATE,
            max_resends: 10,
            throttle: ThrottleConfig::default(),
        }
    }
}

impl PoolConfig {
    /// Small budgets, exact comparison and no throttling.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            limits: CodecLimits::for_testing(),
            thresholds: NoiseThresholds::exact(),
            max_outstanding_sets: 8,
            max_sets_per_tick: 1,
            resend_ticks: 2 * TICRATE,
            max_resends: 3,
            throttle: ThrottleConfig::disabled(),
        }
    }

    /// Checks that every pool built with this config can make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let budgets = [
            ("max_deltas_per_set", self.limits.max_deltas_per_set),
            ("max_outstanding_sets", self.max_outstanding_sets),
            ("max_sets_per_tick", self.max_sets_per_tick),
        ];
        if let Some((name, _)) = budgets.into_iter().find(|&(_, value)| value == 0) {
            return Err(ConfigError::ZeroBudget { name });
        }
        let required = max_record_len();
        let max_set_bytes = self.limits.max_set_bytes.min(u16::MAX as usize);
        if max_set_bytes < required {
            return Err(ConfigError::SetTooSmall {
                max_set_bytes,
                required,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_tic_rate() {
        let config = PoolConfig::default();
        assert_eq!(config.resend_ticks, 70);
        assert_eq!(config.max_sets_per_tick, 1);
        assert_eq!(config.throttle.max_update_ticks, 35);
    }

    #[test]
    fn interval_is_linear_between_near_and_far() {
        let throttle = ThrottleConfig {
            min_update_ticks: 2,
            max_update_ticks: 12,
            near_distance: 100,
            far_distance: 200,
        };
        assert_eq!(throttle.interval(None), 2);
        assert_eq!(throttle.interval(Some(Fixed::from_int(50))), 2);
        assert_eq!(throttle.interval(Some(Fixed::from_int(100))), 2);
        assert_eq!(throttle.interval(Some(Fixed::from_int(150))), 7);
        assert_eq!(throttle.interval(Some(Fixed::from_int(200))), 12);
        assert_eq!(throttle.interval(Some(Fixed::from_int(5000))), 12);
    }

    #[test]
    fn distances_beyond_fixed_range_do_not_wrap() {
        let throttle = ThrottleConfig {
            min_update_ticks: 1,
            max_update_ticks: 36,
            near_distance: 40_000,
            far_distance: 100_000,
        };
        assert_eq!(throttle.interval(Some(Fixed::from_int(30_000))), 1);

        let throttle = ThrottleConfig {
            near_distance: 0,
            far_distance: 70_000,
            ..throttle
        };
        // 35 * 30000 / 70000 = 15
        assert_eq!(throttle.interval(Some(Fixed::from_int(30_000))), 16);
    }

    #[test]
    fn shipped_configs_validate() {
        assert_eq!(PoolConfig::default().validate(), Ok(()));
        assert_eq!(PoolConfig::for_testing().validate(), Ok(()));
    }

    #[test]
    fn set_budget_must_hold_the_widest_record() {
        let mut config = PoolConfig::for_testing();
        config.limits.max_set_bytes = 40;
        assert_eq!(
            config.validate(),
            Err(ConfigError::SetTooSmall {
                max_set_bytes: 40,
                required: max_record_len(),
            })
        );
        config.limits.max_set_bytes = max_record_len();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_budgets_are_rejected() {
        let mut config = PoolConfig::default();
        config.max_sets_per_tick = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroBudget {
                name: "max_sets_per_tick"
            })
        );
    }

    #[test]
    fn never_sent_is_always_due() {
        let throttle = ThrottleConfig::default();
        let far = Some(Fixed::from_int(10_000));
        assert!(throttle.is_due(far, None, Tick::new(0)));
        assert!(!throttle.is_due(far, Some(Tick::new(10)), Tick::new(20)));
        assert!(throttle.is_due(far, Some(Tick::new(10)), Tick::new(45)));
    }

    #[test]
    fn disabled_throttle_allows_every_tick() {
        let throttle = ThrottleConfig::disabled();
        let far = Some(Fixed::from_int(10_000));
        assert!(throttle.is_due(far, Some(Tick::new(4)), Tick::new(5)));
    }
}
