//! # Tweens — Timed Interpolation of Component Fields
//!
//! A tween drives one reflected field (or one axis of it) of one target
//! entity from a start value to an end value over a duration:
//!
//! ```text
//! tween entity                       TweenValue entities (owned)
//! ┌─────────────────────────┐        ┌───────────────────────┐
//! │ Tween                   │ ─────► │ lane 0: from → to     │
//! │  target: ship           │ ─────► │ lane 1: from → to     │
//! │  field:  transform.pos  │ ─────► │ lane 2: from → to     │
//! │  elapsed / duration     │        └───────────────────────┘
//! └─────────────────────────┘
//! ```
//!
//! Every tick [`advance_tweens`] adds the frame delta to `elapsed`, eases
//! `clamp(elapsed / duration)`, interpolates each [`TweenValue`] and writes
//! the lanes back into the target's field. Orientation fields interpolate
//! all four lanes together with [`slerp`](crate::math::slerp).
//!
//! ## Lifecycle
//!
//! `Running` until `elapsed ≥ duration`. On that tick the field snaps to
//! exactly `to`, and the tween entity is despawned. The value entities are
//! owned by the tween (see [`World::attach_owned`]) and go with it, so no
//! value can outlive its tween however the tween is destroyed.
//!
//! A tween whose target dies or loses the component is cancelled with a
//! warning. A tween without an attribute is a pure timer; sequences use
//! those for pauses.

pub mod easing;
pub mod sequence;

use crate::ecs::reflect::find_field;
use crate::ecs::{
    Component, ComponentId, Entity, FieldError, FieldInfo, FieldKind, Phase, System, World,
};
use crate::error::ConfigError;
use crate::math::{Quat, lerp, slerp};
use crate::runtime::{Plugin, Runtime};
use crate::time::Time;

pub use easing::{EaseFunction, Easings, EasingFn};
pub use sequence::{Sequence, advance_sequences, play_sequence, reset_sequence};

// ── Specs ───────────────────────────────────────────────────────────

/// Reference to a tween's target entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Entity(Entity),
    /// Resolved through the entity registry when the tween is instantiated.
    Named(String),
}

impl From<Entity> for Target {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

/// Declaration of a tween, instantiated with [`spawn_tween`].
#[derive(Debug, Clone, PartialEq)]
pub struct TweenSpec {
    /// `None` means the caller's default target.
    pub target: Option<Target>,
    /// `component.field` or `component.field.axis`. `None` makes a timer.
    pub attribute: Option<String>,
    /// Start value. `None` captures the current value at instantiation.
    pub from: Option<Vec<f32>>,
    pub to: Vec<f32>,
    pub duration: f32,
    pub easing: String,
}

impl TweenSpec {
    pub fn new(attribute: &str, to: &[f32], duration: f32) -> Self {
        Self {
            target: None,
            attribute: Some(attribute.to_string()),
            from: None,
            to: to.to_vec(),
            duration,
            easing: EaseFunction::Linear.name().to_string(),
        }
    }

    /// A step that only waits.
    pub fn pause(duration: f32) -> Self {
        Self {
            target: None,
            attribute: None,
            from: None,
            to: Vec::new(),
            duration,
            easing: EaseFunction::Linear.name().to_string(),
        }
    }

    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn starting_at(mut self, from: &[f32]) -> Self {
        self.from = Some(from.to_vec());
        self
    }

    pub fn easing(mut self, name: &str) -> Self {
        self.easing = name.to_string();
        self
    }

    pub fn is_pause(&self) -> bool {
        self.attribute.is_none()
    }
}

// ── Components ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Binding {
    target: Entity,
    component: ComponentId,
    field: &'static str,
    /// Which lanes of the field each value entity drives, in order.
    lanes: Vec<usize>,
    /// Start and end orientation when the whole quaternion is tweened.
    orientation: Option<(Quat, Quat)>,
}

/// A running tween. Despawned on completion.
#[derive(Debug, Clone)]
pub struct Tween {
    binding: Option<Binding>,
    values: Vec<Entity>,
    elapsed: f32,
    duration: f32,
    easing: EasingFn,
}

impl Tween {
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Linear progress in `[0, 1]`, before easing.
    pub fn progress(&self) -> f32 {
        if self.duration > 0.0 {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn target(&self) -> Option<Entity> {
        self.binding.as_ref().map(|b| b.target)
    }

    /// The TweenValue entities, in lane order.
    pub fn values(&self) -> &[Entity] {
        &self.values
    }
}

impl Component for Tween {
    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::read_only("elapsed", FieldKind::Scalar),
            FieldInfo::read_only("duration", FieldKind::Scalar),
            FieldInfo::read_only("progress", FieldKind::Scalar),
        ];
        FIELDS
    }

    fn read(&self, field: &str) -> Option<Vec<f32>> {
        match field {
            "elapsed" => Some(vec![self.elapsed]),
            "duration" => Some(vec![self.duration]),
            "progress" => Some(vec![self.progress()]),
            _ => None,
        }
    }
}

/// One interpolated scalar of a tween. Owned by, and despawned with, its
/// [`Tween`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenValue {
    tween: Entity,
    lane: usize,
    from: f32,
    to: f32,
    value: f32,
}

impl TweenValue {
    /// The owning tween entity.
    pub fn tween(&self) -> Entity {
        self.tween
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    pub fn from(&self) -> f32 {
        self.from
    }

    pub fn to(&self) -> f32 {
        self.to
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

impl Component for TweenValue {
    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[FieldInfo::read_only("value", FieldKind::Scalar)];
        FIELDS
    }

    fn read(&self, field: &str) -> Option<Vec<f32>> {
        (field == "value").then(|| vec![self.value])
    }
}

// ── Instantiation ───────────────────────────────────────────────────

fn malformed(attribute: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedAttribute {
        element: "tween".to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn format_values(values: &[f32]) -> String {
    values
        .iter()
        .map(f32::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve a target reference against the world.
pub fn resolve_target(
    world: &World,
    target: Option<&Target>,
    default_target: Option<Entity>,
) -> Result<Entity, ConfigError> {
    match target {
        Some(Target::Entity(entity)) if world.is_alive(*entity) => Ok(*entity),
        Some(Target::Entity(entity)) => Err(ConfigError::UnknownEntity(entity.to_string())),
        Some(Target::Named(name)) => world
            .named(name)
            .ok_or_else(|| ConfigError::UnknownEntity(name.clone())),
        None => default_target
            .filter(|&e| world.is_alive(e))
            .ok_or_else(|| malformed("target", "", "tween has no target entity")),
    }
}

/// Instantiate a tween. `default_target` is used when `spec.target` is `None`.
///
/// Fails when the target, component, field or easing can't be resolved, or
/// when `from`/`to` don't match the field's arity. A single `from`/`to`
/// number broadcasts to every lane.
pub fn spawn_tween(
    world: &mut World,
    spec: &TweenSpec,
    default_target: Option<Entity>,
) -> Result<Entity, ConfigError> {
    if !spec.duration.is_finite() || spec.duration < 0.0 {
        return Err(malformed(
            "duration",
            &spec.duration.to_string(),
            "duration must be a non-negative number of seconds",
        ));
    }
    let easing = match world.get_resource::<Easings>() {
        Some(easings) => easings.resolve(&spec.easing)?,
        None => Easings::default().resolve(&spec.easing)?,
    };

    let Some(path) = spec.attribute.as_deref() else {
        let entity = world.spawn_one(Tween {
            binding: None,
            values: Vec::new(),
            elapsed: 0.0,
            duration: spec.duration,
            easing,
        });
        return Ok(entity);
    };

    let target = resolve_target(world, spec.target.as_ref(), default_target)?;
    let (binding, from, to) = bind(world, target, path, spec)?;

    let tween = world.spawn();
    let mut values = Vec::with_capacity(binding.lanes.len());
    for (i, &lane) in binding.lanes.iter().enumerate() {
        let value = world.spawn_one(TweenValue {
            tween,
            lane,
            from: from[i],
            to: to[i],
            value: from[i],
        });
        world.attach_owned(tween, value);
        values.push(value);
    }
    world.insert(
        tween,
        Tween {
            binding: Some(binding),
            values,
            elapsed: 0.0,
            duration: spec.duration,
            easing,
        },
    );
    log::debug!(
        "tween {} drives `{}` of {} over {}s",
        tween,
        path,
        world.describe(target),
        spec.duration
    );
    Ok(tween)
}

fn bind(
    world: &World,
    target: Entity,
    path: &str,
    spec: &TweenSpec,
) -> Result<(Binding, Vec<f32>, Vec<f32>), ConfigError> {
    let parts: Vec<&str> = path.split('.').map(str::trim).collect();
    let (component_name, field_name, axis) = match parts.as_slice() {
        [c, f] => (*c, *f, None),
        [c, f, a] => (*c, *f, Some(*a)),
        _ => {
            return Err(malformed(
                "attribute",
                path,
                "expected `component.field` or `component.field.axis`",
            ));
        }
    };

    let component = world
        .component_by_name(component_name)
        .ok_or_else(|| ConfigError::UnknownComponent(component_name.to_string()))?;
    let field: &'static FieldInfo = find_field(world.component_fields(component), field_name)
        .ok_or_else(|| ConfigError::UnknownField {
            component: component_name.to_string(),
            field: field_name.to_string(),
        })?;
    if !field.writable {
        return Err(malformed("attribute", path, "field is read-only"));
    }
    let current = world.read_field(target, component, field.name).ok_or_else(|| {
        malformed(
            "attribute",
            path,
            format!("{} has no `{component_name}`", world.describe(target)),
        )
    })?;

    let lanes: Vec<usize> = match axis {
        None => (0..field.kind.arity()).collect(),
        Some(axis) => {
            let lane = match axis {
                "x" | "r" => 0,
                "y" | "g" => 1,
                "z" | "b" => 2,
                "w" | "a" => 3,
                _ => return Err(malformed("attribute", path, format!("unknown axis `{axis}`"))),
            };
            if lane >= field.kind.arity() {
                return Err(malformed(
                    "attribute",
                    path,
                    format!("`{}` has no axis `{axis}`", field.name),
                ));
            }
            if field.kind.is_orientation() {
                return Err(malformed(
                    "attribute",
                    path,
                    format!("`{}` is an orientation and tweens as a whole", field.name),
                ));
            }
            vec![lane]
        }
    };

    let lanes_of = |values: &[f32], attribute: &str| -> Result<Vec<f32>, ConfigError> {
        match values.len() {
            1 => Ok(vec![values[0]; lanes.len()]),
            n if n == lanes.len() => Ok(values.to_vec()),
            n => Err(malformed(
                attribute,
                &format_values(values),
                format!("expected {} value(s) for `{path}`, got {n}", lanes.len()),
            )),
        }
    };
    let from = match &spec.from {
        Some(values) => lanes_of(values, "from")?,
        None => lanes.iter().map(|&l| current[l]).collect(),
    };
    let to = lanes_of(&spec.to, "to")?;

    let orientation = if field.kind.is_orientation() {
        let unit = |values: &[f32], attribute: &str| -> Result<Quat, ConfigError> {
            let quat = Quat::from_slice(values);
            if quat.length_squared() <= f32::EPSILON {
                return Err(malformed(
                    attribute,
                    &format_values(values),
                    format!("zero-length rotation for `{path}`"),
                ));
            }
            Ok(quat.normalize())
        };
        Some((unit(&from, "from")?, unit(&to, "to")?))
    } else {
        None
    };

    Ok((
        Binding {
            target,
            component,
            field: field.name,
            lanes,
            orientation,
        },
        from,
        to,
    ))
}

/// Despawn a tween and its values. Safe on stale or non-tween entities.
pub fn cancel_tween(world: &mut World, tween: Entity) -> bool {
    world.has::<Tween>(tween) && world.despawn(tween)
}

/// Live tweens driving `target`.
pub fn tweens_on(world: &World, target: Entity) -> Vec<Entity> {
    world
        .store::<Tween>()
        .map(|store| {
            store
                .iter()
                .filter(|(_, t)| t.target() == Some(target))
                .map(|(e, _)| e)
                .collect()
        })
        .unwrap_or_default()
}

// ── Advance ─────────────────────────────────────────────────────────

/// System: advance all tweens by the phase delta, write their values, and
/// tear down the ones that finished or lost their target.
pub fn advance_tweens(world: &mut World) {
    let dt = world.get_resource::<Time>().map_or(0.0, Time::delta_secs);
    for entity in world.entities_with::<Tween>() {
        step_tween(world, entity, dt);
    }
}

fn step_tween(world: &mut World, entity: Entity, dt: f32) {
    let Some(tween) = world.get_mut::<Tween>(entity) else {
        return;
    };
    tween.elapsed += dt;
    let finished = tween.is_finished();
    let progress = if finished {
        1.0
    } else {
        (tween.easing)(tween.progress())
    };
    let binding = tween.binding.clone();
    let values = tween.values.clone();

    if let Some(binding) = binding {
        if let Err(reason) = apply(world, &binding, &values, progress, finished) {
            log::warn!(
                "cancelling tween {} on {}: {}",
                entity,
                world.describe(binding.target),
                reason
            );
            world.despawn(entity);
            return;
        }
    }

    if finished {
        world.despawn(entity);
    }
}

fn apply(
    world: &mut World,
    binding: &Binding,
    values: &[Entity],
    progress: f32,
    finished: bool,
) -> Result<(), String> {
    if !world.is_alive(binding.target) {
        return Err("target was despawned".to_string());
    }
    let mut current = world
        .read_field(binding.target, binding.component, binding.field)
        .ok_or_else(|| format!("target lost `{}`", world.component_label(binding.component)))?;

    let rotation = binding
        .orientation
        .map(|(from, to)| if finished { to } else { slerp(from, to, progress) })
        .map(|q| q.to_array());

    for (i, &value_entity) in values.iter().enumerate() {
        let Some(value) = world.get_mut::<TweenValue>(value_entity) else {
            continue;
        };
        value.value = match rotation {
            Some(q) => q[value.lane],
            None if finished => value.to,
            None => lerp(value.from, value.to, progress),
        };
        if let Some(slot) = binding.lanes.get(i).and_then(|&l| current.get_mut(l)) {
            *slot = value.value;
        }
    }

    world
        .write_field(binding.target, binding.component, binding.field, &current)
        .map_err(|err: FieldError| err.to_string())
}

// ── Plugin ──────────────────────────────────────────────────────────

/// Registers the tween components, the [`Easings`] resource, and the
/// [`advance_tweens`] and [`advance_sequences`] systems.
pub struct TweenPlugin;

impl TweenPlugin {
    pub const ADVANCE: &'static str = "tween-advance";
    pub const SEQUENCES: &'static str = "sequence-advance";
}

impl Plugin for TweenPlugin {
    fn build(&self, runtime: &mut Runtime) {
        let world = runtime.world_mut();
        if !world.has_resource::<Easings>() {
            world.insert_resource(Easings::default());
        }
        world.register_opaque_component::<Tween>("tween");
        world.register_opaque_component::<TweenValue>("tween-value");
        world.register_opaque_component::<Sequence>("sequence");

        runtime.add_system(
            System::new(Self::ADVANCE)
                .in_phase(Phase::Simulation)
                .on_update(advance_tweens),
        );
        runtime.add_system(
            System::new(Self::SEQUENCES)
                .in_phase(Phase::Simulation)
                .after(Self::ADVANCE)
                .on_update(advance_sequences),
        );
    }
}
