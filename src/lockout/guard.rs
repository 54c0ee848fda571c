//! Failed-attempt tracking and cooldown enforcement.
//!
//! The guard's state machine per profile:
//!
//! ```text
//! Normal --failure--> Cooldown(delay) --success--> Normal
//!                          |
//!                          +--failures >= threshold--> Destroyed
//! ```
//!
//! The cooldown delay is a non-decreasing function of the consecutive
//! failure count; the schedule is policy from `Settings`, not code.
//! Every state change is committed to the protected store **before**
//! the result returns to the caller, so a crash-and-restart cannot
//! bypass the accounting. The failure counter is monotonic until an
//! explicit reset by a successful unlock (or by destruction, which
//! erases the state with everything else).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::errors::{AuthFailure, CoreError, Result};
use crate::store::{record_keys, ProtectedStore};

/// Persisted lockout state for one profile. Survives process restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub failure_count: u32,
    pub next_allowed_at: Option<DateTime<Utc>>,
}

/// Cooldown and destruction policy, sourced from `Settings`.
#[derive(Debug, Clone, Copy)]
pub struct CooldownPolicy {
    pub free_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    pub destroy_threshold: u32,
}

impl CooldownPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            free_attempts: settings.lockout_free_attempts,
            base_delay_secs: settings.lockout_base_delay_secs,
            max_delay_secs: settings.lockout_max_delay_secs,
            destroy_threshold: settings.destroy_threshold,
        }
    }

    /// Delay imposed after the `failures`-th consecutive failure.
    ///
    /// `None` within the free-attempt budget; afterwards the base delay
    /// doubles per failure up to the ceiling. Non-decreasing in
    /// `failures` by construction.
    pub fn delay_for(&self, failures: u32) -> Option<Duration> {
        if failures <= self.free_attempts {
            return None;
        }
        let exponent = (failures - self.free_attempts - 1).min(32);
        let secs = self
            .base_delay_secs
            .checked_shl(exponent)
            .unwrap_or(self.max_delay_secs)
            .min(self.max_delay_secs);
        Some(Duration::seconds(secs as i64))
    }
}

/// Outcome of recording a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Failure counted; the profile may now be cooling down.
    Recorded {
        failure_count: u32,
        next_allowed_at: Option<DateTime<Utc>>,
    },
    /// The destruction threshold was reached. The caller must invoke
    /// the destruction coordinator before reporting anything else.
    DestroyThresholdReached,
}

pub struct LockoutGuard {
    store: Arc<dyn ProtectedStore>,
    policy: CooldownPolicy,
}

impl LockoutGuard {
    pub fn new(store: Arc<dyn ProtectedStore>, policy: CooldownPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    /// Current state for `profile` (default state if none persisted).
    pub fn state(&self, profile: &str) -> Result<LockoutState> {
        match self.store.get(profile, record_keys::LOCKOUT)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::SerializationError(format!("lockout state: {e}"))),
            None => Ok(LockoutState::default()),
        }
    }

    fn persist(&self, profile: &str, state: &LockoutState) -> Result<()> {
        let bytes = serde_json::to_vec(state)
            .map_err(|e| CoreError::SerializationError(format!("lockout state: {e}")))?;
        self.store.put(profile, record_keys::LOCKOUT, &bytes)
    }

    /// Gate an unlock attempt: inside a cooldown window this fails with
    /// `AuthFailure::CoolingDown` and the attempt must not proceed.
    pub fn ensure_allowed(&self, profile: &str, now: DateTime<Utc>) -> Result<()> {
        let state = self.state(profile)?;
        if let Some(until) = state.next_allowed_at {
            if now < until {
                return Err(AuthFailure::CoolingDown { until }.into());
            }
        }
        Ok(())
    }

    /// Count a failed attempt. The updated state is persisted before
    /// this returns.
    pub fn record_failure(&self, profile: &str, now: DateTime<Utc>) -> Result<AttemptOutcome> {
        let mut state = self.state(profile)?;
        state.failure_count = state.failure_count.saturating_add(1);

        if state.failure_count >= self.policy.destroy_threshold {
            self.persist(profile, &state)?;
            log::warn!("profile reached the destruction threshold");
            return Ok(AttemptOutcome::DestroyThresholdReached);
        }

        state.next_allowed_at = self
            .policy
            .delay_for(state.failure_count)
            .map(|delay| now + delay);
        self.persist(profile, &state)?;

        if let Some(until) = state.next_allowed_at {
            log::info!(
                "unlock failure {} — cooling down until {until}",
                state.failure_count
            );
        }

        Ok(AttemptOutcome::Recorded {
            failure_count: state.failure_count,
            next_allowed_at: state.next_allowed_at,
        })
    }

    /// Reset the counter after a successful unlock. Persisted before
    /// this returns.
    pub fn record_success(&self, profile: &str) -> Result<()> {
        self.persist(profile, &LockoutState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn guard() -> LockoutGuard {
        let policy = CooldownPolicy {
            free_attempts: 2,
            base_delay_secs: 10,
            max_delay_secs: 300,
            destroy_threshold: 8,
        };
        LockoutGuard::new(Arc::new(MemoryStore::new()), policy)
    }

    #[test]
    fn free_attempts_have_no_cooldown() {
        let g = guard();
        let now = Utc::now();
        for expected in 1..=2 {
            match g.record_failure("p", now).unwrap() {
                AttemptOutcome::Recorded {
                    failure_count,
                    next_allowed_at,
                } => {
                    assert_eq!(failure_count, expected);
                    assert!(next_allowed_at.is_none());
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        g.ensure_allowed("p", now).unwrap();
    }

    #[test]
    fn cooldown_delay_is_non_decreasing() {
        let g = guard();
        let now = Utc::now();
        let mut last_until = now;
        for _ in 0..5 {
            if let AttemptOutcome::Recorded {
                next_allowed_at, ..
            } = g.record_failure("p", now).unwrap()
            {
                if let Some(until) = next_allowed_at {
                    assert!(until >= last_until);
                    last_until = until;
                }
            }
        }
        // 3rd failure: 10s, 4th: 20s, 5th: 40s.
        assert_eq!(last_until, now + Duration::seconds(40));
    }

    #[test]
    fn delay_caps_at_the_ceiling() {
        let policy = CooldownPolicy {
            free_attempts: 0,
            base_delay_secs: 100,
            max_delay_secs: 250,
            destroy_threshold: u32::MAX,
        };
        assert_eq!(policy.delay_for(1), Some(Duration::seconds(100)));
        assert_eq!(policy.delay_for(2), Some(Duration::seconds(200)));
        assert_eq!(policy.delay_for(3), Some(Duration::seconds(250)));
        assert_eq!(policy.delay_for(40), Some(Duration::seconds(250)));
    }

    #[test]
    fn cooldown_blocks_until_elapsed() {
        let g = guard();
        let now = Utc::now();
        for _ in 0..3 {
            g.record_failure("p", now).unwrap();
        }

        let err = g.ensure_allowed("p", now).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Auth(AuthFailure::CoolingDown { .. })
        ));

        // Past the window the attempt is allowed again.
        g.ensure_allowed("p", now + Duration::seconds(11)).unwrap();
    }

    #[test]
    fn success_resets_the_counter() {
        let g = guard();
        let now = Utc::now();
        for _ in 0..4 {
            g.record_failure("p", now).unwrap();
        }
        g.record_success("p").unwrap();

        let state = g.state("p").unwrap();
        assert_eq!(state.failure_count, 0);
        assert!(state.next_allowed_at.is_none());
        g.ensure_allowed("p", now).unwrap();
    }

    #[test]
    fn threshold_reports_destruction() {
        let g = guard();
        let now = Utc::now();
        let mut destroyed = false;
        for _ in 0..8 {
            if g.record_failure("p", now).unwrap() == AttemptOutcome::DestroyThresholdReached {
                destroyed = true;
                break;
            }
        }
        assert!(destroyed);
        // The counter itself was still committed.
        assert_eq!(g.state("p").unwrap().failure_count, 8);
    }

    #[test]
    fn state_survives_guard_reconstruction() {
        let store: Arc<dyn ProtectedStore> = Arc::new(MemoryStore::new());
        let policy = CooldownPolicy {
            free_attempts: 0,
            base_delay_secs: 60,
            max_delay_secs: 600,
            destroy_threshold: 100,
        };
        let now = Utc::now();

        let g1 = LockoutGuard::new(Arc::clone(&store), policy);
        g1.record_failure("p", now).unwrap();

        // A new guard over the same store sees the committed state —
        // the crash-and-restart bypass is closed.
        let g2 = LockoutGuard::new(store, policy);
        assert_eq!(g2.state("p").unwrap().failure_count, 1);
        assert!(g2.ensure_allowed("p", now).is_err());
    }
}
