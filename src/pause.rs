//! Per-hop delay used to make the interleaving of participants observable.

use crate::error::{Result, RingError};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{hint::black_box, str::FromStr, time::Duration};

/// Busy-loop iterations per unit of pause factor.
pub const SPIN_UNIT: u64 = 1_000_000;
/// Sleep length per unit of pause factor.
pub const SLEEP_UNIT: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PauseMode {
    /// Burn CPU like the lab's empty `for` loop.
    #[default]
    Spin,
    /// Sleep a fixed `factor * SLEEP_UNIT`.
    Sleep,
    /// Sleep an exponentially distributed delay with mean `factor * SLEEP_UNIT`.
    Poisson,
}

impl FromStr for PauseMode {
    type Err = RingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spin" => Ok(Self::Spin),
            "sleep" => Ok(Self::Sleep),
            "poisson" => Ok(Self::Poisson),
            _ => Err(RingError::InvalidArgument {
                name: "pause-mode",
                value: s.to_string(),
                reason: "expected one of spin, sleep, poisson",
            }),
        }
    }
}

pub struct Pause {
    pub factor: u64,
    pub mode: PauseMode,
    rng: SmallRng,
}

impl Pause {
    pub fn new(factor: u64, mode: PauseMode, seed: u64) -> Self {
        Self {
            factor,
            mode,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn none() -> Self {
        Self::new(0, PauseMode::Spin, 0)
    }

    /// Length of the next sleep, `None` when the pause does not sleep.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.factor == 0 {
            return None;
        }
        let mean = SLEEP_UNIT.saturating_mul(u32::try_from(self.factor).unwrap_or(u32::MAX));

        match self.mode {
            PauseMode::Spin => None,
            PauseMode::Sleep => Some(mean),
            PauseMode::Poisson => Some(mean.mul_f64(self.time_for_next_event())),
        }
    }

    /// Exponential variate with rate 1.
    fn time_for_next_event(&mut self) -> f64 {
        -(1.0f64 - self.rng.random::<f64>()).ln()
    }

    pub async fn wait(&mut self) {
        if self.factor == 0 {
            return;
        }
        match self.next_delay() {
            Some(delay) => tokio::time::sleep(delay).await,
            None => {
                spin(self.factor);
                tokio::task::yield_now().await;
            }
        }
    }
}

fn spin(factor: u64) {
    let mut acc = 0u64;
    for i in 0..factor.saturating_mul(SPIN_UNIT) {
        acc = black_box(acc.wrapping_add(i));
    }
    black_box(acc);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes() {
        assert_eq!("sleep".parse::<PauseMode>().unwrap(), PauseMode::Sleep);
        assert_eq!("poisson".parse::<PauseMode>().unwrap(), PauseMode::Poisson);
        assert!("nap".parse::<PauseMode>().is_err());
    }

    #[test]
    fn zero_factor_never_delays() {
        for mode in [PauseMode::Spin, PauseMode::Sleep, PauseMode::Poisson] {
            assert_eq!(Pause::new(0, mode, 1).next_delay(), None);
        }
    }

    #[test]
    fn sleep_scales_with_factor() {
        let mut pause = Pause::new(3, PauseMode::Sleep, 0);
        assert_eq!(pause.next_delay(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn poisson_delays_are_seeded() {
        let mut a = Pause::new(2, PauseMode::Poisson, 42);
        let mut b = Pause::new(2, PauseMode::Poisson, 42);
        for _ in 0..5 {
            let delay = a.next_delay().unwrap();
            assert_eq!(Some(delay), b.next_delay());
        }
    }

    #[tokio::test]
    async fn spin_returns() {
        Pause::new(1, PauseMode::Spin, 0).wait().await;
    }
}
