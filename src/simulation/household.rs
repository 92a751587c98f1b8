use chrono::{DateTime, FixedOffset};
use rand::{SeedableRng, rngs::StdRng};

use super::noise::{gaussian_noise, hour_of_day};

/// Phase putting the daily minimum around 04:00 and the maximum around 16:00.
const PHASE_RAD: f64 = -5.0 * std::f64::consts::PI / 6.0;

/// Household consumption outside the regulated equipment.
///
/// A sinusoid over the day around `base_w` plus additive Gaussian noise,
/// never negative.
#[derive(Debug, Clone)]
pub struct HouseholdLoad {
    pub base_w: f64,
    pub amplitude_w: f64,
    pub noise_std: f64,
    rng: StdRng,
}

impl HouseholdLoad {
    /// Creates a household load generator.
    ///
    /// # Arguments
    ///
    /// * `base_w` - Mean demand in watts
    /// * `amplitude_w` - Amplitude of the daily sinusoid in watts
    /// * `noise_std` - Standard deviation of the additive noise in watts
    /// * `seed` - Random seed for reproducible noise
    pub fn new(base_w: f64, amplitude_w: f64, noise_std: f64, seed: u64) -> Self {
        Self {
            base_w,
            amplitude_w,
            noise_std: noise_std.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Demand at `t` (W).
    pub fn demand_w(&mut self, t: DateTime<FixedOffset>) -> i64 {
        let day_pos = hour_of_day(&t) / 24.0;
        let angle = 2.0 * std::f64::consts::PI * day_pos + PHASE_RAD;
        let noise = gaussian_noise(&mut self.rng, self.noise_std);
        (self.base_w + self.amplitude_w * angle.sin() + noise)
            .max(0.0)
            .round() as i64
    }
}
