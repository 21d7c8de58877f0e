//! Signal processing building blocks shared by the kernels.
//!
//! - [`Biquad`] - Direct Form I second-order section
//! - [`Coefficients`] - RBJ cookbook designs (low-pass, high-pass, peaking)
//! - [`EnvelopeFollower`] - attack/release peak tracker
//! - level helpers in dB

use core::f32::consts::{LN_10, PI};

use libm::{cosf, expf, logf, sinf, sqrtf};

/// Normalised biquad coefficients, `a0` folded in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    /// Pass-through.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Normalises raw cookbook terms by `a0`.
    pub fn new(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let inv = 1.0 / a0;
        Self {
            b0: b0 * inv,
            b1: b1 * inv,
            b2: b2 * inv,
            a1: a1 * inv,
            a2: a2 * inv,
        }
    }

    /// Second-order low-pass at `freq` Hz.
    pub fn lowpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w, alpha) = omega_terms(freq, q, sample_rate);
        Self::new(
            (1.0 - cos_w) / 2.0,
            1.0 - cos_w,
            (1.0 - cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    /// Second-order high-pass at `freq` Hz.
    pub fn highpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w, alpha) = omega_terms(freq, q, sample_rate);
        Self::new(
            (1.0 + cos_w) / 2.0,
            -(1.0 + cos_w),
            (1.0 + cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    /// Peaking bell of `gain_db` around `freq` Hz.
    pub fn peaking(freq: f32, q: f32, gain_db: f32, sample_rate: f32) -> Self {
        let a = expf(gain_db * LN_10 / 40.0);
        let (cos_w, alpha) = omega_terms(freq, q, sample_rate);
        Self::new(
            1.0 + alpha * a,
            -2.0 * cos_w,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w,
            1.0 - alpha / a,
        )
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn omega_terms(freq: f32, q: f32, sample_rate: f32) -> (f32, f32) {
    // keep the corner below Nyquist so the design stays stable
    let freq = freq.clamp(1.0, sample_rate * 0.49);
    let omega = 2.0 * PI * freq / sample_rate;
    (cosf(omega), sinf(omega) / (2.0 * q.max(0.1)))
}

/// Second-order IIR section.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Clone, Debug, Default)]
pub struct Biquad {
    c: Coefficients,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Section with the given coefficients and cleared state.
    pub fn new(c: Coefficients) -> Self {
        Self {
            c,
            ..Self::default()
        }
    }

    /// Replaces the coefficients, keeping the delay lines.
    pub fn set(&mut self, c: Coefficients) {
        self.c = c;
    }

    /// Filters one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let c = &self.c;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    /// Zeroes the delay lines.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Peak envelope with separate attack and release time constants.
#[derive(Clone, Debug)]
pub struct EnvelopeFollower {
    level: f32,
    attack: f32,
    release: f32,
}

impl EnvelopeFollower {
    /// Follower with the given times in milliseconds.
    pub fn new(attack_ms: f32, release_ms: f32, sample_rate: f32) -> Self {
        Self {
            level: 0.0,
            attack: smoothing_coeff(attack_ms, sample_rate),
            release: smoothing_coeff(release_ms, sample_rate),
        }
    }

    /// Updates both time constants.
    pub fn set_times(&mut self, attack_ms: f32, release_ms: f32, sample_rate: f32) {
        self.attack = smoothing_coeff(attack_ms, sample_rate);
        self.release = smoothing_coeff(release_ms, sample_rate);
    }

    /// Tracks `x` and returns the new envelope.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let x = x.abs();
        let coeff = if x > self.level { self.attack } else { self.release };
        self.level = coeff * self.level + (1.0 - coeff) * x;
        self.level
    }

    /// Current envelope.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Drops the envelope to zero.
    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

/// One-pole coefficient reaching 63% of a step after `ms`.
pub fn smoothing_coeff(ms: f32, sample_rate: f32) -> f32 {
    let samples = ms.max(0.01) * sample_rate / 1000.0;
    expf(-1.0 / samples.max(1.0))
}

/// dB to linear amplitude.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    expf(db * LN_10 / 20.0)
}

/// Linear amplitude to dB, floored at -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    logf(linear.max(1e-10)) * 20.0 / LN_10
}

/// Root mean square of `samples`, zero when empty.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    sqrtf(sum / samples.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_gain(c: Coefficients, freq: f32, sr: f32) -> f32 {
        let mut f = Biquad::new(c);
        let mut peak = 0.0f32;
        for n in 0..(sr as usize) {
            let y = f.process(sinf(2.0 * PI * freq * n as f32 / sr));
            if n > sr as usize / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn identity_passes_through() {
        let mut f = Biquad::default();
        for x in [0.5, -0.25, 1.0] {
            assert_eq!(f.process(x), x);
        }
    }

    #[test]
    fn lowpass_attenuates_above_corner() {
        let c = Coefficients::lowpass(500.0, 0.707, 16_000.0);
        assert!(tone_gain(c, 100.0, 16_000.0) > 0.9);
        assert!(tone_gain(c, 4000.0, 16_000.0) < 0.05);
    }

    #[test]
    fn highpass_attenuates_below_corner() {
        let c = Coefficients::highpass(1000.0, 0.707, 16_000.0);
        assert!(tone_gain(c, 50.0, 16_000.0) < 0.01);
        assert!(tone_gain(c, 5000.0, 16_000.0) > 0.9);
    }

    #[test]
    fn peaking_boosts_center() {
        let c = Coefficients::peaking(1000.0, 1.0, 6.0, 16_000.0);
        let g = tone_gain(c, 1000.0, 16_000.0);
        assert!((g - db_to_linear(6.0)).abs() < 0.05, "{g}");
    }

    #[test]
    fn envelope_rises_then_decays() {
        let mut env = EnvelopeFollower::new(1.0, 50.0, 16_000.0);
        for _ in 0..160 {
            env.process(1.0);
        }
        let peak = env.level();
        assert!(peak > 0.99);
        for _ in 0..800 {
            env.process(0.0);
        }
        assert!(env.level() < peak * 0.5);
        env.reset();
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn db_round_trip() {
        for db in [-60.0, -6.0, 0.0, 12.0] {
            assert!((linear_to_db(db_to_linear(db)) - db).abs() < 1e-3);
        }
        assert!((rms(&[1.0, -1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }
}
