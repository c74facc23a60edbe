//! Easing curves and the name registry tweens resolve them through.
//!
//! An easing maps normalized time `t ∈ [0, 1]` to eased progress. Progress
//! may leave `[0, 1]` (the `back` and `elastic` families overshoot); the
//! interpolation downstream simply follows it.
//!
//! Built-in names are `linear` plus `<family>-<in|out|in-out>` for the
//! families quad, cubic, quart, sine, expo, circ, back, elastic and bounce.
//! Lookups are canonicalized, so `QuadInOut`, `quad_in_out` and
//! `quad-in-out` all resolve to the same curve.

use std::f32::consts::{FRAC_PI_2, PI};

use crate::error::ConfigError;
use crate::names::NameMap;

/// A pure easing curve.
pub type EasingFn = fn(f32) -> f32;

/// The built-in easing curves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EaseFunction {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    SineIn,
    SineOut,
    SineInOut,
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    CircIn,
    CircOut,
    CircInOut,
    BackIn,
    BackOut,
    BackInOut,
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    BounceIn,
    BounceOut,
    BounceInOut,
}

impl EaseFunction {
    pub const ALL: [Self; 28] = [
        Self::Linear,
        Self::QuadIn,
        Self::QuadOut,
        Self::QuadInOut,
        Self::CubicIn,
        Self::CubicOut,
        Self::CubicInOut,
        Self::QuartIn,
        Self::QuartOut,
        Self::QuartInOut,
        Self::SineIn,
        Self::SineOut,
        Self::SineInOut,
        Self::ExpoIn,
        Self::ExpoOut,
        Self::ExpoInOut,
        Self::CircIn,
        Self::CircOut,
        Self::CircInOut,
        Self::BackIn,
        Self::BackOut,
        Self::BackInOut,
        Self::ElasticIn,
        Self::ElasticOut,
        Self::ElasticInOut,
        Self::BounceIn,
        Self::BounceOut,
        Self::BounceInOut,
    ];

    /// Canonical registry name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::QuadIn => "quad-in",
            Self::QuadOut => "quad-out",
            Self::QuadInOut => "quad-in-out",
            Self::CubicIn => "cubic-in",
            Self::CubicOut => "cubic-out",
            Self::CubicInOut => "cubic-in-out",
            Self::QuartIn => "quart-in",
            Self::QuartOut => "quart-out",
            Self::QuartInOut => "quart-in-out",
            Self::SineIn => "sine-in",
            Self::SineOut => "sine-out",
            Self::SineInOut => "sine-in-out",
            Self::ExpoIn => "expo-in",
            Self::ExpoOut => "expo-out",
            Self::ExpoInOut => "expo-in-out",
            Self::CircIn => "circ-in",
            Self::CircOut => "circ-out",
            Self::CircInOut => "circ-in-out",
            Self::BackIn => "back-in",
            Self::BackOut => "back-out",
            Self::BackInOut => "back-in-out",
            Self::ElasticIn => "elastic-in",
            Self::ElasticOut => "elastic-out",
            Self::ElasticInOut => "elastic-in-out",
            Self::BounceIn => "bounce-in",
            Self::BounceOut => "bounce-out",
            Self::BounceInOut => "bounce-in-out",
        }
    }

    pub fn function(self) -> EasingFn {
        match self {
            Self::Linear => linear,
            Self::QuadIn => |t: f32| t * t,
            Self::QuadOut => |t: f32| 1.0 - (1.0 - t) * (1.0 - t),
            Self::QuadInOut => |t: f32| {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            },
            Self::CubicIn => |t: f32| t * t * t,
            Self::CubicOut => |t: f32| 1.0 - (1.0 - t).powi(3),
            Self::CubicInOut => |t: f32| {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            },
            Self::QuartIn => |t: f32| t.powi(4),
            Self::QuartOut => |t: f32| 1.0 - (1.0 - t).powi(4),
            Self::QuartInOut => |t: f32| {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            },
            Self::SineIn => |t: f32| 1.0 - (t * FRAC_PI_2).cos(),
            Self::SineOut => |t: f32| (t * FRAC_PI_2).sin(),
            Self::SineInOut => |t: f32| -(PI * t).cos() / 2.0 + 0.5,
            Self::ExpoIn => |t: f32| if t <= 0.0 { 0.0 } else { 2f32.powf(10.0 * t - 10.0) },
            Self::ExpoOut => |t: f32| if t >= 1.0 { 1.0 } else { 1.0 - 2f32.powf(-10.0 * t) },
            Self::ExpoInOut => |t: f32| {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else if t < 0.5 {
                    2f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            },
            Self::CircIn => |t: f32| 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Self::CircOut => |t: f32| (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt(),
            Self::CircInOut => |t: f32| {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            },
            Self::BackIn => |t: f32| BACK_C3 * t * t * t - BACK_C1 * t * t,
            Self::BackOut => |t: f32| 1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2),
            Self::BackInOut => |t: f32| {
                let c2 = BACK_C1 * 1.525;
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((c2 + 1.0) * 2.0 * t - c2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((c2 + 1.0) * (t * 2.0 - 2.0) + c2) + 2.0) / 2.0
                }
            },
            Self::ElasticIn => |t: f32| {
                if t <= 0.0 || t >= 1.0 {
                    t.clamp(0.0, 1.0)
                } else {
                    -(2f32.powf(10.0 * t - 10.0)) * ((10.0 * t - 10.75) * ELASTIC_C4).sin()
                }
            },
            Self::ElasticOut => |t: f32| {
                if t <= 0.0 || t >= 1.0 {
                    t.clamp(0.0, 1.0)
                } else {
                    2f32.powf(-10.0 * t) * ((10.0 * t - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            },
            Self::ElasticInOut => |t: f32| {
                if t <= 0.0 || t >= 1.0 {
                    t.clamp(0.0, 1.0)
                } else if t < 0.5 {
                    -(2f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                } else {
                    (2f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                        + 1.0
                }
            },
            Self::BounceIn => |t: f32| 1.0 - bounce_out(1.0 - t),
            Self::BounceOut => bounce_out,
            Self::BounceInOut => |t: f32| {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            },
        }
    }

    /// Evaluate the easing function at `t` (clamped to \[0, 1\]).
    pub fn sample(self, t: f32) -> f32 {
        (self.function())(t.clamp(0.0, 1.0))
    }
}

const BACK_C1: f32 = 1.70158;
const BACK_C3: f32 = BACK_C1 + 1.0;
const ELASTIC_C4: f32 = (2.0 * PI) / 3.0;
const ELASTIC_C5: f32 = (2.0 * PI) / 4.5;

fn linear(t: f32) -> f32 {
    t
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EasingId(u32);

/// Named easing registry, stored as a world resource.
///
/// Starts with every [`EaseFunction`]; applications can add their own curves
/// or replace a built-in under the same name.
pub struct Easings {
    functions: Vec<EasingFn>,
    names: NameMap<EasingId>,
}

impl Easings {
    /// An empty registry, without the built-ins.
    pub fn empty() -> Self {
        Self {
            functions: Vec::new(),
            names: NameMap::new(),
        }
    }

    /// Register or replace a curve.
    pub fn register(&mut self, name: &str, function: EasingFn) {
        match self.names.get(name) {
            Some(id) => self.functions[id.0 as usize] = function,
            None => {
                let id = EasingId(self.functions.len() as u32);
                self.functions.push(function);
                self.names.insert(name, id);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<EasingFn> {
        self.names.get(name).map(|id| self.functions[id.0 as usize])
    }

    /// Like [`get`](Self::get), but an unknown name is a configuration error.
    pub fn resolve(&self, name: &str) -> Result<EasingFn, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::UnknownEasing(name.to_string()))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.names()
    }
}

impl Default for Easings {
    fn default() -> Self {
        let mut easings = Self::empty();
        for ease in EaseFunction::ALL {
            easings.register(ease.name(), ease.function());
        }
        easings
    }
}
