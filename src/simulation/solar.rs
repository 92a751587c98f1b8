use chrono::{DateTime, FixedOffset};
use rand::{SeedableRng, rngs::StdRng};

use super::noise::{gaussian_noise, hour_of_day};

/// A solar array following a half-cosine profile between sunrise and sunset.
///
/// Output is scaled by multiplicative Gaussian noise to mimic passing clouds
/// and is never negative.
#[derive(Debug, Clone)]
pub struct SolarProfile {
    /// Output at solar noon under a clear sky (W).
    pub peak_w: f64,
    /// Sunrise, as a fractional hour.
    pub sunrise_hour: f64,
    /// Sunset, as a fractional hour.
    pub sunset_hour: f64,
    /// Standard deviation of the noise as a fraction of output.
    pub noise_std: f64,
    rng: StdRng,
}

impl SolarProfile {
    /// Creates a solar profile.
    ///
    /// Negative peak or noise values are clamped to zero.
    pub fn new(peak_w: f64, sunrise_hour: f64, sunset_hour: f64, noise_std: f64, seed: u64) -> Self {
        Self {
            peak_w: peak_w.max(0.0),
            sunrise_hour,
            sunset_hour,
            noise_std: noise_std.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Clear-sky fraction of peak at `hour`: 0 at night, 1 at solar noon.
    pub fn daylight_frac(&self, hour: f64) -> f64 {
        if hour < self.sunrise_hour || hour >= self.sunset_hour {
            return 0.0;
        }
        let day_len = self.sunset_hour - self.sunrise_hour;
        let x = (hour - self.sunrise_hour) / day_len;
        (std::f64::consts::PI * (x - 0.5)).cos().max(0.0)
    }

    /// Production at `t` (W).
    pub fn production_w(&mut self, t: DateTime<FixedOffset>) -> i64 {
        let frac = self.daylight_frac(hour_of_day(&t));
        if frac <= 0.0 {
            return 0;
        }

        let noise_mult = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
        (self.peak_w * frac * noise_mult).max(0.0).round() as i64
    }
}
