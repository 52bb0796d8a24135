/// Easing curves for dash and action speed profiles.
///
/// `apply(start, end, t)` maps normalized time `t` in [0, 1] to a value
/// between `start` and `end`. Every curve passes through both endpoints.

use std::f32::consts::FRAC_PI_2;

use serde::Deserialize;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ease {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    SineIn,
    SineOut,
    SineInOut,
    ExpoOut,
}

impl Ease {
    pub fn apply(self, start: f32, end: f32, t: f32) -> f32 {
        start + (end - start) * self.curve(t.clamp(0.0, 1.0))
    }

    /// Normalized curve: 0 → 0, 1 → 1.
    pub fn curve(self, t: f32) -> f32 {
        match self {
            Ease::Linear => t,
            Ease::QuadIn => t * t,
            Ease::QuadOut => t * (2.0 - t),
            Ease::QuadInOut => {
                if t < 0.5 { 2.0 * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(2) / 2.0 }
            }
            Ease::CubicIn => t * t * t,
            Ease::CubicOut => 1.0 - (1.0 - t).powi(3),
            Ease::CubicInOut => {
                if t < 0.5 { 4.0 * t * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(3) / 2.0 }
            }
            Ease::SineIn => 1.0 - (t * FRAC_PI_2).cos(),
            Ease::SineOut => (t * FRAC_PI_2).sin(),
            Ease::SineInOut => -((std::f32::consts::PI * t).cos() - 1.0) / 2.0,
            Ease::ExpoOut => {
                if t >= 1.0 { 1.0 } else { 1.0 - 2f32.powf(-10.0 * t) }
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Ease::Linear => "linear",
            Ease::QuadIn => "quad-in",
            Ease::QuadOut => "quad-out",
            Ease::QuadInOut => "quad-in-out",
            Ease::CubicIn => "cubic-in",
            Ease::CubicOut => "cubic-out",
            Ease::CubicInOut => "cubic-in-out",
            Ease::SineIn => "sine-in",
            Ease::SineOut => "sine-out",
            Ease::SineInOut => "sine-in-out",
            Ease::ExpoOut => "expo-out",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Ease; 11] = [
        Ease::Linear, Ease::QuadIn, Ease::QuadOut, Ease::QuadInOut,
        Ease::CubicIn, Ease::CubicOut, Ease::CubicInOut,
        Ease::SineIn, Ease::SineOut, Ease::SineInOut, Ease::ExpoOut,
    ];

    #[test]
    fn endpoints_are_fixed() {
        for e in ALL {
            assert!(e.curve(0.0).abs() < 1e-5, "{} at 0", e.name());
            assert!((e.curve(1.0) - 1.0).abs() < 1e-5, "{} at 1", e.name());
        }
    }

    #[test]
    fn curves_are_monotonic() {
        for e in ALL {
            let mut prev = e.curve(0.0);
            for i in 1..=100 {
                let v = e.curve(i as f32 / 100.0);
                assert!(v >= prev - 1e-6, "{} dips at {i}", e.name());
                prev = v;
            }
        }
    }

    #[test]
    fn apply_scales_and_clamps() {
        assert!((Ease::Linear.apply(0.0, 3.0, 0.5) - 1.5).abs() < 1e-6);
        assert!((Ease::QuadIn.apply(2.0, 4.0, 0.5) - 2.5).abs() < 1e-6);
        assert!((Ease::Linear.apply(0.0, 3.0, 2.0) - 3.0).abs() < 1e-6);
    }
}
