use serde::{Deserialize, Serialize};

/// Named easing curves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EasingCurve {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    Smoothstep,
}

/// Maps linear progress onto the value fed to the shader.
///
/// Serialized either as a curve name (`"easeInOut"`) or as explicit CSS-style
/// control points (`{ "cubicBezier": [x1, y1, x2, y2] }`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Easing {
    Named(EasingCurve),
    CubicBezier {
        #[serde(rename = "cubicBezier")]
        cubic_bezier: [f32; 4],
    },
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Named(EasingCurve::Linear)
    }
}

impl From<EasingCurve> for Easing {
    fn from(curve: EasingCurve) -> Self {
        Easing::Named(curve)
    }
}

impl EasingCurve {
    fn sample(self, t: f32) -> f32 {
        match self {
            EasingCurve::Linear => t,
            EasingCurve::EaseIn => t * t,
            EasingCurve::EaseOut => t * (2.0 - t),
            EasingCurve::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            EasingCurve::Smoothstep => t * t * (3.0 - 2.0 * t),
        }
    }
}

impl Easing {
    pub const fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Easing::CubicBezier {
            cubic_bezier: [x1, y1, x2, y2],
        }
    }

    /// Evaluates the curve at `t`, clamped to `[0, 1]`. Both ends map exactly
    /// onto themselves.
    pub fn sample(&self, t: f32) -> f32 {
        let clamped = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        if clamped <= 0.0 {
            return 0.0;
        }
        if clamped >= 1.0 {
            return 1.0;
        }
        match *self {
            Easing::Named(curve) => curve.sample(clamped),
            Easing::CubicBezier {
                cubic_bezier: [x1, y1, x2, y2],
            } => solve_cubic_bezier(x1, y1, x2, y2, clamped),
        }
    }

    /// Control-point x coordinates must stay in `[0, 1]` so the curve is a
    /// function of time.
    pub fn validate(&self) -> Result<(), String> {
        if let Easing::CubicBezier { cubic_bezier } = self {
            if cubic_bezier.iter().any(|value| !value.is_finite()) {
                return Err("cubic-bezier control points must be finite".into());
            }
            let [x1, _, x2, _] = *cubic_bezier;
            if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
                return Err(format!(
                    "cubic-bezier x control points must lie in [0, 1] (got {x1}, {x2})"
                ));
            }
        }
        Ok(())
    }
}

fn bezier_component(a1: f32, a2: f32, t: f32) -> f32 {
    let inv = 1.0 - t;
    3.0 * inv * inv * t * a1 + 3.0 * inv * t * t * a2 + t * t * t
}

fn bezier_slope(a1: f32, a2: f32, t: f32) -> f32 {
    let inv = 1.0 - t;
    3.0 * inv * inv * a1 + 6.0 * inv * t * (a2 - a1) + 3.0 * t * t * (1.0 - a2)
}

fn solve_cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, x: f32) -> f32 {
    const NEWTON_ITERATIONS: usize = 8;
    const EPSILON: f32 = 1e-6;

    let mut t = x;
    for _ in 0..NEWTON_ITERATIONS {
        let error = bezier_component(x1, x2, t) - x;
        if error.abs() < EPSILON {
            return bezier_component(y1, y2, t);
        }
        let slope = bezier_slope(x1, x2, t);
        if slope.abs() < EPSILON {
            break;
        }
        t -= error / slope;
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    t = x;
    for _ in 0..32 {
        let value = bezier_component(x1, x2, t);
        if (value - x).abs() < EPSILON {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = 0.5 * (lo + hi);
    }
    bezier_component(y1, y2, t)
}
