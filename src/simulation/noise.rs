use rand::{Rng, rngs::StdRng};

/// Gaussian noise with mean 0 and standard deviation `std_dev`, via Box-Muller.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Fractional hour of day, in `[0, 24)`.
pub fn hour_of_day(t: &impl chrono::Timelike) -> f64 {
    f64::from(t.num_seconds_from_midnight()) / 3600.0
}
