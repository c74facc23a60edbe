//! Convenience re-exports — `use smidja::prelude::*` for the common items.

// Core
pub use crate::ecs::{
    Component, ComponentId, Entity, FaultPolicy, FieldError, FieldInfo, FieldKind, Parent,
    Phase, System, TransformPlugin, World, WorldTransform,
};
pub use crate::error::{ConfigError, RuntimeError};
pub use crate::math::{Mat4, Quat, Transform, Vec3, Vec4};
pub use crate::runtime::{DefaultPlugins, Plugin, Runtime, RuntimeConfig};
pub use crate::time::Time;

// Composition
pub use crate::compose::{Composed, Element, Recipe, RecipeRegistry};

// Tweens
pub use crate::tween::{EaseFunction, Easings, Sequence, Target, Tween, TweenPlugin, TweenSpec};

// Collaborators
pub use crate::collab::{NetworkSync, PhysicsBackend, RenderBackend};
